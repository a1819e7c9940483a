//! Session-scoped state store.
//!
//! Controllers never hold mutable annotation state directly; they read and
//! write it through opaque [`StateHandle`]s into a [`Store`] owned by the
//! session. This keeps controller instances freely shareable, keeps teardown
//! a single drop, and keeps the engine independent of any particular
//! state-management library on the embedding side.
//!
//! Values are JSON so that the store can hold anything the wire format can:
//! selection lists, region flags, offset snapshots.

use parking_lot::RwLock;
use serde_json::Value;
use slotmap::{new_key_type, SlotMap};

use crate::error::{StoreError, StoreResult};

new_key_type! {
    /// An opaque handle to one slot of session state.
    ///
    /// Handles are stable for the lifetime of the owning [`Store`] and become
    /// invalid when the slot is freed or the store is dropped.
    pub struct StateHandle;
}

/// Session-scoped dynamic state, addressed by [`StateHandle`].
///
/// One `Store` exists per labeling session. It is never shared across
/// sessions and is dropped wholesale when the session is torn down.
pub struct Store {
    slots: RwLock<SlotMap<StateHandle, Value>>,
}

impl Store {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            slots: RwLock::new(SlotMap::with_key()),
        }
    }

    /// Allocate a new state slot with an initial value.
    pub fn alloc(&self, value: Value) -> StateHandle {
        let handle = self.slots.write().insert(value);
        tracing::trace!(target: "horizon_annotate_core::store", ?handle, "allocated state slot");
        handle
    }

    /// Get a clone of the value in a slot.
    pub fn get(&self, handle: StateHandle) -> StoreResult<Value> {
        self.slots
            .read()
            .get(handle)
            .cloned()
            .ok_or(StoreError::InvalidHandle)
    }

    /// Access a slot's value through a closure without cloning.
    pub fn with<F, R>(&self, handle: StateHandle, f: F) -> StoreResult<R>
    where
        F: FnOnce(&Value) -> R,
    {
        let slots = self.slots.read();
        slots
            .get(handle)
            .map(f)
            .ok_or(StoreError::InvalidHandle)
    }

    /// Replace the value in a slot.
    pub fn set(&self, handle: StateHandle, value: Value) -> StoreResult<()> {
        let mut slots = self.slots.write();
        let slot = slots.get_mut(handle).ok_or(StoreError::InvalidHandle)?;
        *slot = value;
        Ok(())
    }

    /// Shallow-merge a JSON object into the slot's current object value.
    ///
    /// Keys present in `patch` overwrite keys in the target; keys absent from
    /// `patch` are left intact. Both the target and the patch must be JSON
    /// objects.
    pub fn patch(&self, handle: StateHandle, patch: Value) -> StoreResult<()> {
        let Value::Object(patch) = patch else {
            return Err(StoreError::NotAnObject);
        };
        let mut slots = self.slots.write();
        let slot = slots.get_mut(handle).ok_or(StoreError::InvalidHandle)?;
        let Value::Object(target) = slot else {
            return Err(StoreError::NotAnObject);
        };
        for (key, value) in patch {
            target.insert(key, value);
        }
        Ok(())
    }

    /// Free a slot, returning its final value.
    pub fn free(&self, handle: StateHandle) -> StoreResult<Value> {
        self.slots
            .write()
            .remove(handle)
            .ok_or(StoreError::InvalidHandle)
    }

    /// Check whether a handle refers to a live slot.
    pub fn contains(&self, handle: StateHandle) -> bool {
        self.slots.read().contains_key(handle)
    }

    /// Number of live slots.
    pub fn len(&self) -> usize {
        self.slots.read().len()
    }

    /// Whether the store holds no slots.
    pub fn is_empty(&self) -> bool {
        self.slots.read().is_empty()
    }
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("slots", &self.len())
            .finish()
    }
}
