//! The session handle passed to every controller.
//!
//! Controllers never own cross-cutting state directly. The [`Sdk`] gives them
//! the session [`Store`], the annotation's [`RegionsController`], and
//! per-node persistent slots — state and readiness keyed by the stable node
//! id, so that a fresh controller instance created for a re-render picks up
//! exactly where the previous instance for the same node left off.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use serde_json::Value;

use horizon_annotate_core::{ReadyLatch, StateHandle, Store};

use crate::regions::RegionsController;

/// A reference to the annotation being edited.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Annotation {
    id: String,
}

impl Annotation {
    /// Create an annotation reference.
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }

    /// The annotation id.
    pub fn id(&self) -> &str {
        &self.id
    }
}

/// The per-session handle shared by all controllers.
#[derive(Clone)]
pub struct Sdk {
    store: Arc<Store>,
    regions: Arc<RegionsController>,
    annotation: Annotation,
    /// Persistent state slots keyed by node id.
    node_states: Arc<RwLock<HashMap<String, StateHandle>>>,
    /// Persistent ready latches keyed by node id.
    node_ready: Arc<RwLock<HashMap<String, Arc<ReadyLatch>>>>,
}

impl Sdk {
    /// Build the handle for one session.
    pub fn new(store: Arc<Store>, regions: Arc<RegionsController>, annotation: Annotation) -> Self {
        Self {
            store,
            regions,
            annotation,
            node_states: Arc::new(RwLock::new(HashMap::new())),
            node_ready: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// The session store.
    pub fn store(&self) -> &Arc<Store> {
        &self.store
    }

    /// The annotation's region collection.
    pub fn regions(&self) -> &Arc<RegionsController> {
        &self.regions
    }

    /// The annotation being edited.
    pub fn annotation(&self) -> &Annotation {
        &self.annotation
    }

    /// The persistent state slot for a node, allocating it on first use.
    ///
    /// Re-rendered controller instances for the same node share one slot, so
    /// selection state survives re-renders.
    pub fn node_state(&self, node_id: &str, default: Value) -> StateHandle {
        if let Some(handle) = self.node_states.read().get(node_id) {
            return *handle;
        }
        let mut states = self.node_states.write();
        // A racing allocation may have won; re-check under the write lock.
        if let Some(handle) = states.get(node_id) {
            return *handle;
        }
        let handle = self.store.alloc(default);
        states.insert(node_id.to_string(), handle);
        handle
    }

    /// The persistent ready latch for a node, allocating it on first use.
    pub fn node_ready(&self, node_id: &str) -> Arc<ReadyLatch> {
        if let Some(latch) = self.node_ready.read().get(node_id) {
            return latch.clone();
        }
        let mut latches = self.node_ready.write();
        if let Some(latch) = latches.get(node_id) {
            return latch.clone();
        }
        let latch = Arc::new(ReadyLatch::new());
        latches.insert(node_id.to_string(), latch.clone());
        latch
    }
}

impl std::fmt::Debug for Sdk {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sdk")
            .field("annotation", &self.annotation.id)
            .finish()
    }
}
