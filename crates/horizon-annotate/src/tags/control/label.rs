//! The `Label` controller.

use std::sync::Arc;

use serde_json::json;

use horizon_annotate_config::{
    AttrValue, AttributeDescriptor, AttributeSchema, ConfigTreeNode, TagKind,
};

use super::EVENT_LABEL_SELECTED;
use crate::comms::{BusResult, CommunicationBus};
use crate::error::Result;
use crate::regions::style::label_color;
use crate::sdk::Sdk;
use crate::tags::{TagBase, TagController};

/// One selectable label inside a `<Labels>` group.
pub struct LabelTag {
    base: TagBase,
    value: String,
    background: String,
}

impl LabelTag {
    /// Tag type.
    pub const TYPE: &'static str = "label";

    /// The attribute declarations for this controller type.
    ///
    /// `background` derives a stable color from `value` when not configured
    /// explicitly, so a taxonomy renders consistently across runs without a
    /// color in the markup.
    pub fn schema() -> AttributeSchema {
        AttributeSchema::new([
            AttributeDescriptor::string("value").required(),
            AttributeDescriptor::parsed("background", |ctx| {
                Ok(match ctx.value {
                    Some(raw) => AttrValue::Str(raw.to_string()),
                    None => AttrValue::Str(label_color(ctx.attributes.raw("value").unwrap_or(""))),
                })
            }),
            AttributeDescriptor::string("alias"),
            AttributeDescriptor::string("hotkey"),
            AttributeDescriptor::boolean("selected").default_bool(false),
        ])
    }

    /// Build the controller for a node.
    pub fn from_node(node: &ConfigTreeNode, sdk: &Sdk) -> Result<Arc<Self>> {
        let base = TagBase::new(node, &Self::schema(), sdk)?;
        let value = base
            .attributes()
            .get_str("value")
            .unwrap_or_default()
            .to_string();
        let background = base
            .attributes()
            .get_str("background")
            .unwrap_or_default()
            .to_string();
        Ok(Arc::new(Self {
            base,
            value,
            background,
        }))
    }

    /// The label's value.
    pub fn value(&self) -> &str {
        &self.value
    }

    /// The resolved background color.
    pub fn background(&self) -> &str {
        &self.background
    }

    /// The display alias, if declared.
    pub fn alias(&self) -> Option<&str> {
        self.base.attributes().get_str("alias")
    }

    /// Handle a click: emit `label-selected` so the owning group toggles
    /// membership.
    pub fn click(&self, bus: &CommunicationBus) -> BusResult<usize> {
        bus.invoke(self, EVENT_LABEL_SELECTED, &json!({"value": self.value}))
    }
}

impl TagController for LabelTag {
    fn base(&self) -> &TagBase {
        &self.base
    }

    fn tag_type(&self) -> &'static str {
        Self::TYPE
    }

    fn kind(&self) -> TagKind {
        TagKind::Control
    }

    fn allow_children(&self) -> bool {
        false
    }

    fn allowed_children(&self) -> Option<&'static [&'static str]> {
        Some(&[])
    }

    fn view_props(&self) -> serde_json::Value {
        json!({
            "value": self.value,
            "background": self.background,
            "alias": self.alias(),
            "hotkey": self.base.attributes().get_str("hotkey"),
        })
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}
