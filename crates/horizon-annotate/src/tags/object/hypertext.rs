//! The `Hypertext` object controller.

use std::sync::Arc;

use serde_json::json;

use horizon_annotate_config::{
    AttributeDescriptor, AttributeSchema, ConfigTreeNode, TagKind,
};
use horizon_annotate_core::{ReadyLatch, StateHandle};

use super::EVENT_REGION_CREATED;
use crate::comms::CommunicationBus;
use crate::error::Result;
use crate::regions::{HypertextValue, RegionController, ResultAtom};
use crate::sdk::Sdk;
use crate::tags::control::LabelsTag;
use crate::tags::{tag_cast, TagBase, TagController};

/// A rich-text (markup) data source.
///
/// Selections address container paths plus in-container offsets; the global
/// offset tier is computed by the embedding application against the flattened
/// text and recorded on the region when available.
pub struct HypertextTag {
    base: TagBase,
    value_ref: String,
    content: StateHandle,
    ready: Arc<ReadyLatch>,
}

impl HypertextTag {
    /// Tag type.
    pub const TYPE: &'static str = "hypertext";

    /// The attribute declarations for this controller type.
    pub fn schema() -> AttributeSchema {
        AttributeSchema::new([
            AttributeDescriptor::string("name").required(),
            AttributeDescriptor::string("value").required(),
            AttributeDescriptor::boolean("showlabels").default_bool(true),
            AttributeDescriptor::boolean("clickablelinks").default_bool(false),
            AttributeDescriptor::string("highlightcolor"),
        ])
    }

    /// Build the controller for a node.
    pub fn from_node(node: &ConfigTreeNode, sdk: &Sdk) -> Result<Arc<Self>> {
        let base = TagBase::new(node, &Self::schema(), sdk)?;
        let value_ref = base
            .attributes()
            .get_str("value")
            .unwrap_or_default()
            .to_string();
        let content = sdk.node_state(node.id(), json!({"content": null}));
        let ready = sdk.node_ready(node.id());
        Ok(Arc::new(Self {
            base,
            value_ref,
            content,
            ready,
        }))
    }

    /// The task-data reference from the `value` attribute.
    pub fn value_ref(&self) -> &str {
        &self.value_ref
    }

    /// Store the resolved markup content.
    pub fn set_content(&self, markup: &str) {
        let _ = self
            .base
            .sdk()
            .store()
            .set(self.content, json!({"content": markup}));
    }

    /// The resolved markup content, if loaded.
    pub fn content(&self) -> Option<String> {
        self.base
            .sdk()
            .store()
            .with(self.content, |value| {
                value["content"].as_str().map(str::to_string)
            })
            .ok()
            .flatten()
    }

    /// Resolve the ready latch; selections are accepted afterwards.
    pub fn mark_loaded(&self) -> bool {
        self.ready.mark_loaded()
    }

    /// Create a labeled region from a rich-text selection.
    ///
    /// `start`/`end` are container paths; `start_offset`/`end_offset` are
    /// character offsets within those containers. Label sets come from
    /// connected `<HypertextLabels>` groups targeting this object.
    pub fn create_region(
        &self,
        bus: &CommunicationBus,
        start: &str,
        end: &str,
        start_offset: usize,
        end_offset: usize,
        text: Option<&str>,
    ) -> Result<Option<Arc<RegionController>>> {
        if !self.ready.is_loaded() {
            tracing::trace!(
                target: "horizon_annotate::regions",
                node_id = self.base.node_id(),
                "selection ignored: object not loaded"
            );
            return Ok(None);
        }
        let Some(name) = self.base.name().map(str::to_string) else {
            return Ok(None);
        };

        let mut atoms = Vec::new();
        for connection in bus.connections(self)? {
            let Some(labels) = tag_cast::<LabelsTag>(connection.as_ref()) else {
                continue;
            };
            if !labels.base().to_name().iter().any(|target| target == &name) {
                continue;
            }
            let selected = labels.selected_labels();
            if selected.is_empty() {
                continue;
            }
            let Some(from_name) = labels.base().name().map(str::to_string) else {
                continue;
            };
            atoms.push(ResultAtom::new(
                from_name,
                name.clone(),
                Box::new(HypertextValue::new(
                    start,
                    end,
                    start_offset,
                    end_offset,
                    text.map(str::to_string),
                    selected,
                )),
            ));
        }

        let mut atoms = atoms.into_iter();
        let Some(first) = atoms.next() else {
            return Ok(None);
        };
        let region = RegionController::new(None, first);
        for atom in atoms {
            region.add_result(atom);
        }

        let region = Arc::new(region);
        self.base.sdk().regions().add(region.clone());
        bus.invoke(self, EVENT_REGION_CREATED, &json!({"id": region.id()}))?;
        Ok(Some(region))
    }
}

impl TagController for HypertextTag {
    fn base(&self) -> &TagBase {
        &self.base
    }

    fn tag_type(&self) -> &'static str {
        Self::TYPE
    }

    fn kind(&self) -> TagKind {
        TagKind::Object
    }

    fn allow_children(&self) -> bool {
        false
    }

    fn allowed_children(&self) -> Option<&'static [&'static str]> {
        Some(&[])
    }

    fn view_props(&self) -> serde_json::Value {
        json!({
            "value": self.value_ref,
            "loaded": self.ready.is_loaded(),
            "clickablelinks": self.base.attributes().get_bool("clickablelinks"),
        })
    }

    fn ready_latch(&self) -> Option<&ReadyLatch> {
        Some(&self.ready)
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}
