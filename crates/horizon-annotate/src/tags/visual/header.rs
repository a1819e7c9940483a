//! The `Header` heading tag.

use std::sync::Arc;

use horizon_annotate_config::{
    AttributeDescriptor, AttributeSchema, ConfigTree, ConfigTreeNode, TagKind,
};

use crate::error::Result;
use crate::sdk::Sdk;
use crate::tags::{TagBase, TagController};

/// A static heading. The text comes from the `value` attribute, falling back
/// to the element's own text content.
pub struct HeaderTag {
    base: TagBase,
    text: String,
}

impl HeaderTag {
    /// Tag type.
    pub const TYPE: &'static str = "header";

    /// The attribute declarations for this controller type.
    pub fn schema() -> AttributeSchema {
        AttributeSchema::new([
            AttributeDescriptor::string("value"),
            AttributeDescriptor::number("size").min(1.0).max(6.0).default_num(4.0),
            AttributeDescriptor::boolean("underline").default_bool(false),
        ])
    }

    /// Build the controller for a node.
    pub fn from_node(tree: &ConfigTree, node: &ConfigTreeNode, sdk: &Sdk) -> Result<Arc<Self>> {
        let base = TagBase::new(node, &Self::schema(), sdk)?;
        let text = match base.attributes().get_str("value") {
            Some(value) => value.to_string(),
            None => tree
                .doc()
                .element(node.element())
                .map(|element| element.text())
                .unwrap_or_default(),
        };
        Ok(Arc::new(Self { base, text }))
    }

    /// The heading text.
    pub fn text(&self) -> &str {
        &self.text
    }
}

impl TagController for HeaderTag {
    fn base(&self) -> &TagBase {
        &self.base
    }

    fn tag_type(&self) -> &'static str {
        Self::TYPE
    }

    fn kind(&self) -> TagKind {
        TagKind::Visual
    }

    fn allow_children(&self) -> bool {
        false
    }

    fn view_props(&self) -> serde_json::Value {
        serde_json::json!({
            "value": self.text,
            "size": self.base.attributes().get_num("size"),
            "underline": self.base.attributes().get_bool("underline"),
        })
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}
