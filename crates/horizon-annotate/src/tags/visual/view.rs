//! The `View` layout container.

use std::sync::Arc;

use horizon_annotate_config::{
    AttributeDescriptor, AttributeSchema, ConfigTreeNode, TagKind,
};

use crate::error::Result;
use crate::sdk::Sdk;
use crate::tags::{TagBase, TagController};

/// The layout container; also the designated root tag of every
/// configuration.
pub struct ViewTag {
    base: TagBase,
}

impl ViewTag {
    /// Tag type.
    pub const TYPE: &'static str = "view";

    /// The attribute declarations for this controller type.
    pub fn schema() -> AttributeSchema {
        AttributeSchema::new([
            AttributeDescriptor::string("style"),
            AttributeDescriptor::string("classname"),
        ])
    }

    /// Build the controller for a node.
    pub fn from_node(node: &ConfigTreeNode, sdk: &Sdk) -> Result<Arc<Self>> {
        let base = TagBase::new(node, &Self::schema(), sdk)?;
        Ok(Arc::new(Self { base }))
    }
}

impl TagController for ViewTag {
    fn base(&self) -> &TagBase {
        &self.base
    }

    fn tag_type(&self) -> &'static str {
        Self::TYPE
    }

    fn kind(&self) -> TagKind {
        TagKind::Visual
    }

    fn view_props(&self) -> serde_json::Value {
        serde_json::json!({
            "style": self.base.attributes().get_str("style"),
            "classname": self.base.attributes().get_str("classname"),
        })
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}
