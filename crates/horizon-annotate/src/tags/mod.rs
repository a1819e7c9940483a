//! The tag controller hierarchy.
//!
//! Every configuration node is driven by a typed controller. [`TagController`]
//! is the common behavior trait; the [`control`], [`object`] and [`visual`]
//! submodules hold the concrete tags of each category:
//!
//! - Control tags select or label things (`Labels`, `Label`, `Choices`,
//!   `Choice`, `TextArea`)
//! - Object tags hold the source data being annotated (`Text`, `Hypertext`)
//! - Visual tags are pure layout (`View`, `Header`)
//!
//! Controllers go through a fixed lifecycle: constructed →
//! attributes-configured → registered → rendered (any number of times) →
//! unregistered. Attribute configuration happens inside [`TagBase::new`]
//! (schema resolution fails fast on missing required attributes), bus
//! registration follows construction, and a controller that has been
//! unregistered can never register again.

pub mod control;
pub mod object;
mod registry;
pub mod visual;

pub use registry::{ControllerFactory, ControllerRegistry};

use std::any::Any;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

use horizon_annotate_config::{
    AttributeSchema, ConfigTreeNode, ElementKey, ResolvedAttributes, TagKind,
};

use crate::comms::CommunicationBus;
use crate::error::Result;
use crate::sdk::Sdk;

/// Monotonic instance ids; every constructed controller gets a fresh one.
static NEXT_UID: AtomicU64 = AtomicU64::new(0);

/// Where a controller is in its life.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleStage {
    /// Attributes resolved, not yet on the bus.
    Configured,
    /// Live on the communication bus.
    Registered,
    /// Rendered at least once.
    Rendered,
    /// Taken off the bus; terminal.
    Unregistered,
}

/// Common state shared by every controller.
///
/// Concrete tags embed a `TagBase` and delegate to it, the same way widgets
/// embed a common base in a retained-mode UI toolkit.
pub struct TagBase {
    uid: u64,
    node_id: String,
    name: Option<String>,
    to_name: Vec<String>,
    element: ElementKey,
    parent_element: Option<ElementKey>,
    attributes: ResolvedAttributes,
    sdk: Sdk,
    stage: Mutex<LifecycleStage>,
    render_count: AtomicU64,
}

impl TagBase {
    /// Construct and configure the base for one node.
    ///
    /// Resolving the schema is the configure step: a required attribute with
    /// no value and no default fails here, before the controller can reach
    /// the bus or a view.
    pub fn new(node: &ConfigTreeNode, schema: &AttributeSchema, sdk: &Sdk) -> Result<Self> {
        let attributes = schema.resolve(node.attributes())?;
        Ok(Self {
            uid: NEXT_UID.fetch_add(1, Ordering::Relaxed),
            node_id: node.id().to_string(),
            name: node.name_attr().map(str::to_string),
            to_name: node.to_name().to_vec(),
            element: node.element(),
            parent_element: node.parent(),
            attributes,
            sdk: sdk.clone(),
            stage: Mutex::new(LifecycleStage::Configured),
            render_count: AtomicU64::new(0),
        })
    }

    /// This instance's unique id.
    pub fn uid(&self) -> u64 {
        self.uid
    }

    /// The owning node's stable id.
    pub fn node_id(&self) -> &str {
        &self.node_id
    }

    /// The `name` attribute, if declared.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// The `toname` targets.
    pub fn to_name(&self) -> &[String] {
        &self.to_name
    }

    /// The underlying markup element.
    pub fn element(&self) -> ElementKey {
        self.element
    }

    /// The parent node's markup element, if any.
    pub fn parent_element(&self) -> Option<ElementKey> {
        self.parent_element
    }

    /// The resolved, typed attributes.
    pub fn attributes(&self) -> &ResolvedAttributes {
        &self.attributes
    }

    /// The session handle.
    pub fn sdk(&self) -> &Sdk {
        &self.sdk
    }

    /// Current lifecycle stage.
    pub fn stage(&self) -> LifecycleStage {
        *self.stage.lock()
    }

    /// Number of completed renders.
    pub fn render_count(&self) -> u64 {
        self.render_count.load(Ordering::Relaxed)
    }

    pub(crate) fn set_stage(&self, stage: LifecycleStage) {
        *self.stage.lock() = stage;
    }

    pub(crate) fn mark_rendered(&self) {
        self.render_count.fetch_add(1, Ordering::Relaxed);
        let mut stage = self.stage.lock();
        if matches!(*stage, LifecycleStage::Registered | LifecycleStage::Rendered) {
            *stage = LifecycleStage::Rendered;
        }
    }
}

impl std::fmt::Debug for TagBase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TagBase")
            .field("uid", &self.uid)
            .field("node_id", &self.node_id)
            .field("name", &self.name)
            .field("stage", &self.stage())
            .finish()
    }
}

/// The behavior shared by every tag controller.
pub trait TagController: Send + Sync {
    /// The embedded base.
    fn base(&self) -> &TagBase;

    /// The lowercased tag type this controller drives.
    fn tag_type(&self) -> &'static str;

    /// The tag category.
    fn kind(&self) -> TagKind;

    /// Whether the tag accepts child tags at all.
    fn allow_children(&self) -> bool {
        true
    }

    /// The tag types allowed as children; `None` means unrestricted.
    fn allowed_children(&self) -> Option<&'static [&'static str]> {
        None
    }

    /// Hook invoked by the bus right after registration.
    ///
    /// Controllers subscribe to connected-controller events here; subscribing
    /// to a connection that has not registered yet is queued and installed
    /// once it does.
    fn on_registered(&self, bus: &CommunicationBus) {
        let _ = bus;
    }

    /// Resolved state the view layer needs, as a JSON object.
    fn view_props(&self) -> serde_json::Value {
        serde_json::json!({})
    }

    /// The readiness latch, for object tags with late-loading content.
    fn ready_latch(&self) -> Option<&horizon_annotate_core::ReadyLatch> {
        None
    }

    /// Downcasting support.
    fn as_any(&self) -> &dyn Any;
}

/// Safe downcast for [`TagController`] trait objects.
pub fn tag_cast<T: TagController + 'static>(tag: &dyn TagController) -> Option<&T> {
    tag.as_any().downcast_ref::<T>()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::regions::RegionsController;
    use crate::sdk::Annotation;
    use horizon_annotate_config::{AttributeDescriptor, ConfigTree, TagSet};
    use horizon_annotate_core::Store;
    use std::sync::Arc;

    fn sdk() -> Sdk {
        Sdk::new(
            Arc::new(Store::new()),
            Arc::new(RegionsController::new()),
            Annotation::new("a1"),
        )
    }

    fn tag_set() -> TagSet {
        let mut tags = TagSet::new();
        tags.register("view", TagKind::Visual);
        tags.register("labels", TagKind::Control);
        tags
    }

    #[test]
    fn test_base_configures_from_node() {
        let tree = ConfigTree::parse(
            r#"<View><Labels name="sentiment" toName="article"/></View>"#,
            &tag_set(),
        )
        .unwrap();
        let node = tree.find_node_by_name("sentiment").unwrap();
        let schema = AttributeSchema::new([AttributeDescriptor::string("name").required()]);

        let base = TagBase::new(node, &schema, &sdk()).unwrap();
        assert_eq!(base.name(), Some("sentiment"));
        assert_eq!(base.to_name(), &["article".to_string()]);
        assert_eq!(base.stage(), LifecycleStage::Configured);
        assert_eq!(base.attributes().get_str("name"), Some("sentiment"));
    }

    #[test]
    fn test_missing_required_attribute_fails_configure() {
        let tree = ConfigTree::parse(r#"<View><Labels toName="article"/></View>"#, &tag_set())
            .unwrap();
        let node = tree.nodes().find(|n| n.tag_type() == "labels").unwrap();
        let schema = AttributeSchema::new([AttributeDescriptor::string("name").required()]);

        assert!(TagBase::new(node, &schema, &sdk()).is_err());
    }

    #[test]
    fn test_uids_are_unique() {
        let tree = ConfigTree::parse(
            r#"<View><Labels name="a" toName="t"/></View>"#,
            &tag_set(),
        )
        .unwrap();
        let node = tree.find_node_by_name("a").unwrap();
        let schema = AttributeSchema::empty();

        let first = TagBase::new(node, &schema, &sdk()).unwrap();
        let second = TagBase::new(node, &schema, &sdk()).unwrap();
        assert_ne!(first.uid(), second.uid());
    }
}
