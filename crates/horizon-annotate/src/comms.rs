//! The communication bus: tag-to-tag coordination.
//!
//! A per-session registry of live controllers. Each registered controller
//! gets a [`CommunicationNode`] holding its own event map; *connections*
//! determine where subscriptions land.
//!
//! Two registered controllers A and B are connected when any of:
//!
//! - B's `name` equals one of A's `toname` targets
//! - B's `toname` targets include A's `name`
//! - B's node is a direct child of A's node
//! - B's node is the direct parent of A's node
//!
//! This lets `<Labels toName="text">` reach `<Text name="text">` and vice
//! versa, and lets a `<Label>` reach its parent `<Labels>`.
//!
//! The asymmetry is deliberate and load-bearing: the connection graph is
//! consulted at *subscribe* time — [`CommunicationBus::on`] installs the
//! callback on every current connection's event map — while
//! [`CommunicationBus::invoke`] dispatches only to the invoking controller's
//! own event map. An event named `label-selected` fired by one label reaches
//! controllers actually wired to it, never every label in the document.
//!
//! Connection sets are cached per node and invalidated by a monotonic
//! topology counter bumped on every registration and unregistration, so a
//! same-size membership change (one controller replacing another between
//! renders) still recomputes.
//!
//! Subscriptions made before their targets exist are kept and installed when
//! a matching controller registers (postponed-subscription flush); calling
//! [`on`](CommunicationBus::on) for a not-yet-registered subscriber queues
//! softly, while [`off`](CommunicationBus::off) and
//! [`invoke`](CommunicationBus::invoke) for an unregistered controller are
//! hard errors — those indicate a programming mistake in a collaborating tag,
//! not a data problem.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use slotmap::{new_key_type, SlotMap};

use horizon_annotate_core::{EventPayload, Events, ListenerId};
use horizon_annotate_config::ElementKey;

use crate::tags::{LifecycleStage, TagController};

new_key_type! {
    /// A key for one registered controller in the bus registry.
    pub struct ControllerId;
}

/// Errors from bus usage.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum BusError {
    /// `off`/`invoke` was called for a controller that is not registered.
    #[error("Controller not registered with CommunicationBus")]
    NotRegistered,

    /// A controller that was unregistered tried to register again.
    #[error("Controller was unregistered and cannot register again")]
    Reregistration,
}

/// Result type for bus operations.
pub type BusResult<T> = std::result::Result<T, BusError>;

type Callback = Arc<dyn Fn(&EventPayload) + Send + Sync>;

/// One registered controller's bus-side state.
struct CommunicationNode {
    controller: Arc<dyn TagController>,
    events: Arc<Events>,
    /// Cached connection set plus the topology counter it was computed at.
    connections: RwLock<Option<ConnectionCache>>,
}

struct ConnectionCache {
    topology: u64,
    targets: Vec<ControllerId>,
}

/// A live subscription: who subscribed, to what, and where the callback is
/// currently installed.
struct Subscription {
    subscriber_uid: u64,
    event: String,
    callback: Callback,
    installed: Vec<(ControllerId, ListenerId)>,
}

#[derive(Default)]
struct Registry {
    nodes: SlotMap<ControllerId, CommunicationNode>,
    /// Registration order; document order during a mount.
    order: Vec<ControllerId>,
    by_uid: HashMap<u64, ControllerId>,
    by_element: HashMap<ElementKey, ControllerId>,
}

/// The per-session controller registry and event fabric.
pub struct CommunicationBus {
    registry: RwLock<Registry>,
    /// Instance uids that have been unregistered; they may never return.
    retired: RwLock<HashSet<u64>>,
    subscriptions: Mutex<Vec<Subscription>>,
    /// Bumped on every registration/unregistration; connection caches
    /// compare against it.
    topology: AtomicU64,
}

impl CommunicationBus {
    /// Create an empty bus.
    pub fn new() -> Self {
        Self {
            registry: RwLock::new(Registry::default()),
            retired: RwLock::new(HashSet::new()),
            subscriptions: Mutex::new(Vec::new()),
            topology: AtomicU64::new(0),
        }
    }

    // =========================================================================
    // Registration
    // =========================================================================

    /// Register a controller.
    ///
    /// Registering the same controller twice is a no-op. Registering a fresh
    /// controller for a node that already has one (a re-render) replaces the
    /// old controller, which is unregistered first. A controller that was
    /// ever unregistered cannot come back.
    pub fn register(&self, controller: Arc<dyn TagController>) -> BusResult<ControllerId> {
        let uid = controller.base().uid();
        if self.retired.read().contains(&uid) {
            return Err(BusError::Reregistration);
        }

        let mut replaced: Option<(ControllerId, Arc<Events>, Arc<dyn TagController>)> = None;
        let id = {
            let mut registry = self.registry.write();
            if let Some(&existing) = registry.by_uid.get(&uid) {
                // Idempotent: same controller, same registration.
                return Ok(existing);
            }

            let element = controller.base().element();
            let previous = registry.by_element.get(&element).copied();
            if let Some(old_id) = previous {
                if let Some(old) = registry.nodes.remove(old_id) {
                    registry.order.retain(|&candidate| candidate != old_id);
                    registry.by_uid.remove(&old.controller.base().uid());
                    replaced = Some((old_id, old.events.clone(), old.controller.clone()));
                }
            }

            let node = CommunicationNode {
                controller: controller.clone(),
                events: Arc::new(Events::new()),
                connections: RwLock::new(None),
            };
            let id = registry.nodes.insert(node);
            registry.order.push(id);
            registry.by_uid.insert(uid, id);
            registry.by_element.insert(element, id);
            id
        };

        if let Some((old_id, old_events, old_controller)) = replaced {
            old_events.clear();
            let old_uid = old_controller.base().uid();
            self.retired.write().insert(old_uid);
            old_controller.base().set_stage(LifecycleStage::Unregistered);
            self.prune_subscriptions(old_uid, old_id);
            tracing::trace!(
                target: "horizon_annotate::comms",
                node_id = old_controller.base().node_id(),
                "replaced controller for re-rendered node"
            );
        }

        self.topology.fetch_add(1, Ordering::SeqCst);
        controller.base().set_stage(LifecycleStage::Registered);
        tracing::trace!(
            target: "horizon_annotate::comms",
            uid,
            node_id = controller.base().node_id(),
            tag = controller.tag_type(),
            "controller registered"
        );

        self.flush_subscriptions(id, uid);
        controller.on_registered(self);
        Ok(id)
    }

    /// Take a controller off the bus, clearing its event map.
    ///
    /// Returns `false` if the controller was not registered (teardown of an
    /// already-gone controller is a soft miss, not an error).
    pub fn unregister(&self, controller: &dyn TagController) -> bool {
        let uid = controller.base().uid();
        let removed = {
            let mut registry = self.registry.write();
            let Some(id) = registry.by_uid.remove(&uid) else {
                return false;
            };
            registry.order.retain(|&candidate| candidate != id);
            let element = controller.base().element();
            if registry.by_element.get(&element) == Some(&id) {
                registry.by_element.remove(&element);
            }
            registry.nodes.remove(id).map(|node| (id, node.events))
        };

        let Some((id, events)) = removed else {
            return false;
        };
        events.clear();
        self.retired.write().insert(uid);
        self.topology.fetch_add(1, Ordering::SeqCst);
        controller.base().set_stage(LifecycleStage::Unregistered);
        self.prune_subscriptions(uid, id);
        tracing::trace!(target: "horizon_annotate::comms", uid, "controller unregistered");
        true
    }

    /// Whether a controller is currently registered.
    pub fn is_registered(&self, controller: &dyn TagController) -> bool {
        self.registry
            .read()
            .by_uid
            .contains_key(&controller.base().uid())
    }

    /// Number of registered controllers.
    pub fn len(&self) -> usize {
        self.registry.read().order.len()
    }

    /// Whether no controller is registered.
    pub fn is_empty(&self) -> bool {
        self.registry.read().order.is_empty()
    }

    /// Registered controllers in registration order.
    pub fn controllers(&self) -> Vec<Arc<dyn TagController>> {
        let registry = self.registry.read();
        registry
            .order
            .iter()
            .filter_map(|&id| registry.nodes.get(id).map(|n| n.controller.clone()))
            .collect()
    }

    /// The first registered controller with the given `name` attribute.
    pub fn find_by_name(&self, name: &str) -> Option<Arc<dyn TagController>> {
        let registry = self.registry.read();
        registry.order.iter().find_map(|&id| {
            let node = registry.nodes.get(id)?;
            (node.controller.base().name() == Some(name)).then(|| node.controller.clone())
        })
    }

    /// The controller currently registered for a configuration element.
    pub fn controller_for_element(&self, element: ElementKey) -> Option<Arc<dyn TagController>> {
        let registry = self.registry.read();
        let id = *registry.by_element.get(&element)?;
        registry.nodes.get(id).map(|n| n.controller.clone())
    }

    // =========================================================================
    // Connections
    // =========================================================================

    /// The controllers connected to the given one, in registration order.
    pub fn connections(
        &self,
        controller: &dyn TagController,
    ) -> BusResult<Vec<Arc<dyn TagController>>> {
        let registry = self.registry.read();
        let id = *registry
            .by_uid
            .get(&controller.base().uid())
            .ok_or(BusError::NotRegistered)?;
        let targets = self.connection_ids(&registry, id);
        Ok(targets
            .iter()
            .filter_map(|&target| registry.nodes.get(target).map(|n| n.controller.clone()))
            .collect())
    }

    fn connection_ids(&self, registry: &Registry, id: ControllerId) -> Vec<ControllerId> {
        let topology = self.topology.load(Ordering::SeqCst);
        let Some(node) = registry.nodes.get(id) else {
            return Vec::new();
        };

        if let Some(cache) = node.connections.read().as_ref() {
            if cache.topology == topology {
                return cache.targets.clone();
            }
        }

        let base = node.controller.base();
        let mut targets = Vec::new();
        for &other_id in &registry.order {
            if other_id == id {
                continue;
            }
            let Some(other) = registry.nodes.get(other_id) else {
                continue;
            };
            let other_base = other.controller.base();

            let name_matches_to_name = other_base
                .name()
                .is_some_and(|name| base.to_name().iter().any(|target| target == name));
            let to_name_matches_name = base
                .name()
                .is_some_and(|name| other_base.to_name().iter().any(|target| target == name));
            let is_child = other_base.parent_element() == Some(base.element());
            let is_parent = base.parent_element() == Some(other_base.element());

            if name_matches_to_name || to_name_matches_name || is_child || is_parent {
                targets.push(other_id);
            }
        }

        *node.connections.write() = Some(ConnectionCache {
            topology,
            targets: targets.clone(),
        });
        targets
    }

    // =========================================================================
    // Events
    // =========================================================================

    /// Subscribe a callback to a named event across the controller's current
    /// connections.
    ///
    /// If the subscriber is not registered yet, the subscription is queued
    /// and installed when it (and its connections) register. Connections that
    /// register later receive the callback at their registration.
    pub fn on<F>(&self, controller: &dyn TagController, event: &str, callback: F)
    where
        F: Fn(&EventPayload) + Send + Sync + 'static,
    {
        let uid = controller.base().uid();
        let callback: Callback = Arc::new(callback);
        let mut installed = Vec::new();

        {
            let registry = self.registry.read();
            if let Some(&id) = registry.by_uid.get(&uid) {
                for target in self.connection_ids(&registry, id) {
                    if let Some(node) = registry.nodes.get(target) {
                        let cb = callback.clone();
                        let listener = node.events.on(event, move |payload| cb(payload));
                        installed.push((target, listener));
                    }
                }
            }
        }

        tracing::trace!(
            target: "horizon_annotate::comms",
            uid,
            event,
            installed_on = installed.len(),
            "subscription added"
        );
        self.subscriptions.lock().push(Subscription {
            subscriber_uid: uid,
            event: event.to_string(),
            callback,
            installed,
        });
    }

    /// Remove every subscription this controller holds for the named event.
    ///
    /// Hard error for an unregistered controller.
    pub fn off(&self, controller: &dyn TagController, event: &str) -> BusResult<usize> {
        let uid = controller.base().uid();
        if !self.is_registered(controller) {
            return Err(BusError::NotRegistered);
        }

        let mut removed_listeners = Vec::new();
        {
            let mut subscriptions = self.subscriptions.lock();
            subscriptions.retain_mut(|subscription| {
                if subscription.subscriber_uid == uid && subscription.event == event {
                    removed_listeners.append(&mut subscription.installed);
                    false
                } else {
                    true
                }
            });
        }

        let count = removed_listeners.len();
        let registry = self.registry.read();
        for (target, listener) in removed_listeners {
            if let Some(node) = registry.nodes.get(target) {
                node.events.off(event, listener);
            }
        }
        Ok(count)
    }

    /// Dispatch an event on the controller's own event map.
    ///
    /// Fan-out across connections happened at subscribe time; emission only
    /// consults the invoking controller's listeners. Hard error for an
    /// unregistered controller.
    pub fn invoke(
        &self,
        controller: &dyn TagController,
        event: &str,
        payload: &EventPayload,
    ) -> BusResult<usize> {
        let events = {
            let registry = self.registry.read();
            let id = *registry
                .by_uid
                .get(&controller.base().uid())
                .ok_or(BusError::NotRegistered)?;
            registry
                .nodes
                .get(id)
                .map(|node| node.events.clone())
                .ok_or(BusError::NotRegistered)?
        };
        // Dispatch with no bus lock held; callbacks may re-enter the bus.
        Ok(events.invoke(event, payload))
    }

    /// The event map of a registered controller.
    pub fn events_of(&self, controller: &dyn TagController) -> Option<Arc<Events>> {
        let registry = self.registry.read();
        let id = *registry.by_uid.get(&controller.base().uid())?;
        registry.nodes.get(id).map(|node| node.events.clone())
    }

    // =========================================================================
    // Teardown
    // =========================================================================

    /// Unregister everything and drop all subscriptions.
    pub fn clear(&self) {
        let nodes = {
            let mut registry = self.registry.write();
            registry.order.clear();
            registry.by_uid.clear();
            registry.by_element.clear();
            let mut drained = Vec::new();
            for (_, node) in registry.nodes.drain() {
                drained.push(node);
            }
            drained
        };

        let mut retired = self.retired.write();
        for node in &nodes {
            node.events.clear();
            node.controller.base().set_stage(LifecycleStage::Unregistered);
            retired.insert(node.controller.base().uid());
        }
        drop(retired);

        self.subscriptions.lock().clear();
        self.topology.fetch_add(1, Ordering::SeqCst);
        tracing::debug!(
            target: "horizon_annotate::comms",
            controller_count = nodes.len(),
            "bus cleared"
        );
    }

    // =========================================================================
    // Internal
    // =========================================================================

    /// Install queued/standing subscriptions on a newly registered controller.
    fn flush_subscriptions(&self, new_id: ControllerId, new_uid: u64) {
        let registry = self.registry.read();
        let mut subscriptions = self.subscriptions.lock();

        for subscription in subscriptions.iter_mut() {
            if subscription.subscriber_uid == new_uid {
                // The subscriber itself just registered; install across its
                // current connections.
                for target in self.connection_ids(&registry, new_id) {
                    if subscription.installed.iter().any(|(t, _)| *t == target) {
                        continue;
                    }
                    if let Some(node) = registry.nodes.get(target) {
                        let cb = subscription.callback.clone();
                        let listener =
                            node.events.on(&subscription.event, move |payload| cb(payload));
                        subscription.installed.push((target, listener));
                    }
                }
                continue;
            }

            // A standing subscription from an already-registered controller:
            // install on the newcomer if the two are connected.
            let Some(&subscriber_id) = registry.by_uid.get(&subscription.subscriber_uid) else {
                continue;
            };
            if !self
                .connection_ids(&registry, subscriber_id)
                .contains(&new_id)
            {
                continue;
            }
            if subscription.installed.iter().any(|(t, _)| *t == new_id) {
                continue;
            }
            if let Some(node) = registry.nodes.get(new_id) {
                let cb = subscription.callback.clone();
                let listener = node.events.on(&subscription.event, move |payload| cb(payload));
                subscription.installed.push((new_id, listener));
            }
        }
    }

    /// Drop subscription records owned by a departing controller — removing
    /// their callbacks from every event map they were installed on — and
    /// prune install records pointing at the departing node (those listeners
    /// died with its event map).
    fn prune_subscriptions(&self, uid: u64, id: ControllerId) {
        let mut orphaned: Vec<(String, Vec<(ControllerId, ListenerId)>)> = Vec::new();
        {
            let mut subscriptions = self.subscriptions.lock();
            subscriptions.retain_mut(|subscription| {
                if subscription.subscriber_uid == uid {
                    orphaned.push((
                        subscription.event.clone(),
                        std::mem::take(&mut subscription.installed),
                    ));
                    false
                } else {
                    subscription.installed.retain(|(target, _)| *target != id);
                    true
                }
            });
        }

        let registry = self.registry.read();
        for (event, installed) in orphaned {
            for (target, listener) in installed {
                if let Some(node) = registry.nodes.get(target) {
                    node.events.off(&event, listener);
                }
            }
        }
    }
}

impl Default for CommunicationBus {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CommunicationBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommunicationBus")
            .field("controllers", &self.len())
            .field("topology", &self.topology.load(Ordering::SeqCst))
            .finish()
    }
}
