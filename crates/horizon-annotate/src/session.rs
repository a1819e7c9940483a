//! The annotation session: one configuration, one annotation, one registry
//! of live controllers.
//!
//! A session is built from a configuration string plus optional pre-existing
//! results, and owns everything with session lifetime: the parsed
//! [`ConfigTree`], the [`CommunicationBus`], the [`RegionsController`], the
//! [`Store`], and the controller/view registries. Loading a different task or
//! annotation means dropping the session and building a new one — teardown is
//! drop-and-rebuild, never incremental patching.
//!
//! Building a session:
//!
//! 1. checks that every registered controller type has a view (startup
//!    configuration error otherwise),
//! 2. parses and validates the configuration,
//! 3. mounts: instantiates and registers a controller per node in document
//!    order,
//! 4. hydrates the supplied results — validated against the configuration's
//!    taxonomy first, so either every region hydrates or the error propagates
//!    before any is committed.

use std::sync::Arc;

use horizon_annotate_config::{ConfigTree, ElementKey, MarkupChild, TagKind};
use horizon_annotate_core::Store;

use crate::comms::CommunicationBus;
use crate::error::{AnnotateError, Result};
use crate::regions::RegionsController;
use crate::result::RawResult;
use crate::sdk::{Annotation, Sdk};
use crate::tags::{ControllerRegistry, TagController};
use crate::view::{ChildRenderer, RenderNode, ViewContext, ViewRegistry};

/// A live labeling session.
///
/// Owns the configuration tree, the communication bus, the region
/// collection, the store, and the registries. See the module docs for the
/// build sequence.
pub struct Session {
    tree: ConfigTree,
    bus: Arc<CommunicationBus>,
    store: Arc<Store>,
    regions: Arc<RegionsController>,
    controllers: ControllerRegistry,
    views: ViewRegistry,
    annotation: Annotation,
    sdk: Sdk,
}

/// Builds a [`Session`].
pub struct SessionBuilder {
    config: String,
    results: Vec<RawResult>,
    annotation_id: Option<String>,
    controllers: ControllerRegistry,
    views: ViewRegistry,
}

impl SessionBuilder {
    /// Start a builder for the given configuration string.
    pub fn new(config: impl Into<String>) -> Self {
        Self {
            config: config.into(),
            results: Vec::new(),
            annotation_id: None,
            controllers: ControllerRegistry::builtin(),
            views: ViewRegistry::builtin(),
        }
    }

    /// Supply pre-existing results to hydrate.
    pub fn results(mut self, results: Vec<RawResult>) -> Self {
        self.results = results;
        self
    }

    /// Set the annotation id (a fresh one is generated otherwise).
    pub fn annotation_id(mut self, id: impl Into<String>) -> Self {
        self.annotation_id = Some(id.into());
        self
    }

    /// Replace the controller registry.
    pub fn controllers(mut self, controllers: ControllerRegistry) -> Self {
        self.controllers = controllers;
        self
    }

    /// Replace the view registry.
    pub fn views(mut self, views: ViewRegistry) -> Self {
        self.views = views;
        self
    }

    /// Build the session: parse, validate, mount, hydrate.
    pub fn build(self) -> Result<Session> {
        // A controller type with no view cannot be rendered; refuse up front.
        for tag in self.controllers.types() {
            if !self.views.has_view(tag) {
                return Err(AnnotateError::MissingView(tag.to_string()));
            }
        }

        let tree = ConfigTree::parse(&self.config, &self.controllers.tag_set())?;
        tree.validate()?;

        let store = Arc::new(Store::new());
        let regions = Arc::new(RegionsController::new());
        let bus = Arc::new(CommunicationBus::new());
        let annotation = Annotation::new(
            self.annotation_id
                .unwrap_or_else(horizon_annotate_core::generate_id),
        );
        let sdk = Sdk::new(store.clone(), regions.clone(), annotation.clone());

        let session = Session {
            tree,
            bus,
            store,
            regions,
            controllers: self.controllers,
            views: self.views,
            annotation,
            sdk,
        };
        session.mount()?;
        session.hydrate(&self.results)?;
        Ok(session)
    }
}

impl Session {
    /// The configuration tree.
    pub fn tree(&self) -> &ConfigTree {
        &self.tree
    }

    /// The communication bus.
    pub fn bus(&self) -> &Arc<CommunicationBus> {
        &self.bus
    }

    /// The session store.
    pub fn store(&self) -> &Arc<Store> {
        &self.store
    }

    /// The annotation's regions.
    pub fn regions(&self) -> &Arc<RegionsController> {
        &self.regions
    }

    /// The annotation being edited.
    pub fn annotation(&self) -> &Annotation {
        &self.annotation
    }

    /// Instantiate and register a controller for every node, in document
    /// order.
    fn mount(&self) -> Result<()> {
        for node in self.tree.nodes() {
            let factory = self
                .controllers
                .factory(node.tag_type())
                .ok_or_else(|| AnnotateError::MissingController(node.tag_type().to_string()))?;
            let controller = factory(&self.tree, node, &self.sdk)?;
            self.check_children_allowed(controller.as_ref(), node.element());
            self.bus.register(controller)?;
        }
        tracing::debug!(
            target: "horizon_annotate::comms",
            controller_count = self.bus.len(),
            annotation = self.annotation.id(),
            "session mounted"
        );
        Ok(())
    }

    /// Log a diagnostic for child tags their parent does not accept.
    /// Resilience over strictness: the children still render.
    fn check_children_allowed(&self, controller: &dyn TagController, element: ElementKey) {
        let child_types: Vec<&str> = self
            .tree
            .node(element)
            .map(|node| {
                node.children()
                    .iter()
                    .filter_map(|&key| self.tree.node(key))
                    .map(|child| child.tag_type())
                    .collect()
            })
            .unwrap_or_default();
        if child_types.is_empty() {
            return;
        }

        if !controller.allow_children() {
            tracing::warn!(
                target: "horizon_annotate_config::tree",
                tag = controller.tag_type(),
                children = ?child_types,
                "tag does not accept children"
            );
            return;
        }
        if let Some(allowed) = controller.allowed_children() {
            for child in child_types {
                if !allowed.iter().any(|candidate| *candidate == child) {
                    tracing::warn!(
                        target: "horizon_annotate_config::tree",
                        tag = controller.tag_type(),
                        child,
                        ?allowed,
                        "child tag not allowed here"
                    );
                }
            }
        }
    }

    /// Validate raw results against the configuration, then hydrate regions.
    fn hydrate(&self, results: &[RawResult]) -> Result<()> {
        if results.is_empty() {
            return Ok(());
        }
        for raw in results {
            self.validate_result(raw)?;
        }
        self.regions.create_regions_from_results(results)?;
        Ok(())
    }

    /// One result's cross-checks: its control and object must exist, and any
    /// labels it claims must be declared in the control's taxonomy. A label
    /// outside the taxonomy is a data error — dropping it silently would
    /// corrupt the annotation on save.
    fn validate_result(&self, raw: &RawResult) -> Result<()> {
        let control = self
            .tree
            .find_node_by_name(&raw.from_name)
            .filter(|node| node.kind() == TagKind::Control)
            .ok_or_else(|| AnnotateError::UnknownFromName(raw.from_name.clone()))?;
        self.tree
            .find_node_by_name(&raw.to_name)
            .filter(|node| node.kind() == TagKind::Object)
            .ok_or_else(|| AnnotateError::UnknownToName(raw.to_name.clone()))?;

        let claimed = match raw.result_type.as_str() {
            "labels" | "hypertextlabels" => raw.value.get("labels"),
            "choices" => raw.value.get("choices"),
            _ => None,
        };
        let Some(claimed) = claimed.and_then(|v| v.as_array()) else {
            return Ok(());
        };

        let declared: Vec<&str> = control
            .children()
            .iter()
            .filter_map(|&key| self.tree.node(key))
            .filter(|child| matches!(child.tag_type(), "label" | "choice"))
            .filter_map(|child| child.attributes().raw("value"))
            .collect();

        for label in claimed.iter().filter_map(|v| v.as_str()) {
            if !declared.contains(&label) {
                return Err(AnnotateError::UnknownLabel {
                    label: label.to_string(),
                    control: raw.from_name.clone(),
                });
            }
        }
        Ok(())
    }

    // =========================================================================
    // Render dispatch
    // =========================================================================

    /// Render the root container.
    pub fn render_root(&self) -> Result<RenderNode> {
        self.render(self.tree.root())
    }

    /// Render one configuration node.
    ///
    /// A fresh controller is instantiated for the dispatch — render-scoped,
    /// never cached across renders — replacing the controller previously
    /// registered for this node on the bus. The view receives the tree, the
    /// node, the annotation reference, and the controller.
    pub fn render(&self, element: ElementKey) -> Result<RenderNode> {
        let node = self.tree.node(element).ok_or(AnnotateError::NodeNotFound)?;
        let factory = self
            .controllers
            .factory(node.tag_type())
            .ok_or_else(|| AnnotateError::MissingController(node.tag_type().to_string()))?;
        let controller = factory(&self.tree, node, &self.sdk)?;
        self.bus.register(controller.clone())?;
        controller.base().mark_rendered();

        let view = self
            .views
            .view(node.tag_type())
            .ok_or_else(|| AnnotateError::MissingView(node.tag_type().to_string()))?;
        let ctx = ViewContext {
            tree: &self.tree,
            node,
            controller: &controller,
            annotation: &self.annotation,
            renderer: self,
        };
        view(&ctx)
    }

    /// Render an element's immediate children in document order.
    ///
    /// Raw text passes through as-is; child elements with configuration nodes
    /// render recursively; anything else is skipped.
    pub fn render_children(&self, element: ElementKey) -> Result<Vec<RenderNode>> {
        let markup = self
            .tree
            .doc()
            .element(element)
            .ok_or(AnnotateError::NodeNotFound)?;
        let mut rendered = Vec::new();
        for child in markup.children() {
            match child {
                MarkupChild::Text(text) => rendered.push(RenderNode::Text(text.clone())),
                MarkupChild::Element(key) => {
                    if self.tree.node(*key).is_some() {
                        rendered.push(self.render(*key)?);
                    }
                }
            }
        }
        Ok(rendered)
    }

    // =========================================================================
    // Controller and object access
    // =========================================================================

    /// The live controller for the node with the given `name` attribute.
    ///
    /// Resolved against the bus on every call: the registered set changes
    /// between renders, so this never caches.
    pub fn find_active_controller(&self, name: &str) -> Option<Arc<dyn TagController>> {
        let node = self.tree.find_node_by_name(name)?;
        self.bus.controller_for_element(node.element())
    }

    /// Resolve the ready latch of the named object tag.
    ///
    /// Returns `false` when the tag is missing, has no latch, or had already
    /// loaded.
    pub fn mark_object_loaded(&self, name: &str) -> bool {
        self.find_active_controller(name)
            .and_then(|controller| {
                controller
                    .ready_latch()
                    .map(horizon_annotate_core::ReadyLatch::mark_loaded)
            })
            .unwrap_or(false)
    }

    // =========================================================================
    // Persistence / teardown
    // =========================================================================

    /// Export the annotation's results in wire shape.
    pub fn export(&self) -> Vec<RawResult> {
        self.regions.export()
    }

    /// Unregister every controller and destroy every region.
    ///
    /// The session is unusable afterwards; load a new task by building a new
    /// session.
    pub fn teardown(&self) {
        self.bus.clear();
        self.regions.destroy();
        tracing::debug!(
            target: "horizon_annotate::comms",
            annotation = self.annotation.id(),
            "session torn down"
        );
    }
}

impl ChildRenderer for Session {
    fn render_children_of(&self, element: ElementKey) -> Result<Vec<RenderNode>> {
        self.render_children(element)
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("annotation", &self.annotation.id())
            .field("controllers", &self.bus.len())
            .field("regions", &self.regions.len())
            .finish()
    }
}
