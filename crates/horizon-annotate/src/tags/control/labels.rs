//! The `Labels` / `HypertextLabels` group controllers.

use std::sync::Arc;

use serde_json::json;

use horizon_annotate_config::{
    AttributeDescriptor, AttributeSchema, ConfigTreeNode, TagKind,
};
use horizon_annotate_core::StateHandle;

use super::{EVENT_LABELS_SELECTION_CHANGED, EVENT_LABEL_SELECTED};
use crate::comms::CommunicationBus;
use crate::error::Result;
use crate::regions::{HypertextValue, TextValue};
use crate::sdk::Sdk;
use crate::tags::{TagBase, TagController};

/// A group of labels the annotator picks from when highlighting spans.
///
/// One struct drives both `<Labels>` (plain text spans, `labels` results) and
/// `<HypertextLabels>` (rich text spans, `hypertextlabels` results); the two
/// registrations differ only in type name and result discriminator.
///
/// The current selection lives in the session store, keyed by the node id, so
/// it survives the controller being re-instantiated on re-render.
pub struct LabelsTag {
    base: TagBase,
    type_name: &'static str,
    result_type: &'static str,
    choice: String,
    selection: StateHandle,
}

impl LabelsTag {
    /// Tag type for plain-text span labeling.
    pub const TYPE: &'static str = "labels";
    /// Tag type for hypertext span labeling.
    pub const HYPERTEXT_TYPE: &'static str = "hypertextlabels";

    /// The attribute declarations for this controller type.
    pub fn schema() -> AttributeSchema {
        AttributeSchema::new([
            AttributeDescriptor::string("name").required(),
            AttributeDescriptor::string("toname").required(),
            AttributeDescriptor::one_of("choice", &["single", "multiple"]).default_str("single"),
            AttributeDescriptor::boolean("showinline").default_bool(true),
            AttributeDescriptor::number("maxusages"),
            AttributeDescriptor::number("opacity").min(0.0).max(1.0).default_num(0.6),
            AttributeDescriptor::string("fillcolor"),
            AttributeDescriptor::string("strokecolor"),
            AttributeDescriptor::number("strokewidth").default_num(1.0),
        ])
    }

    /// Build the `<Labels>` controller for a node.
    pub fn from_node(node: &ConfigTreeNode, sdk: &Sdk) -> Result<Arc<Self>> {
        Self::build(node, sdk, Self::TYPE, TextValue::TYPE)
    }

    /// Build the `<HypertextLabels>` controller for a node.
    pub fn hypertext_from_node(node: &ConfigTreeNode, sdk: &Sdk) -> Result<Arc<Self>> {
        Self::build(node, sdk, Self::HYPERTEXT_TYPE, HypertextValue::TYPE)
    }

    fn build(
        node: &ConfigTreeNode,
        sdk: &Sdk,
        type_name: &'static str,
        result_type: &'static str,
    ) -> Result<Arc<Self>> {
        let base = TagBase::new(node, &Self::schema(), sdk)?;
        let choice = base
            .attributes()
            .get_str("choice")
            .unwrap_or("single")
            .to_string();
        let selection = sdk.node_state(node.id(), json!({"selected": []}));
        Ok(Arc::new(Self {
            base,
            type_name,
            result_type,
            choice,
            selection,
        }))
    }

    /// The result discriminator regions created from this group carry.
    pub fn result_type(&self) -> &'static str {
        self.result_type
    }

    /// The configured selection mode.
    pub fn choice(&self) -> &str {
        &self.choice
    }

    /// The currently selected label values, in selection order.
    pub fn selected_labels(&self) -> Vec<String> {
        self.base
            .sdk()
            .store()
            .with(self.selection, |value| {
                value["selected"]
                    .as_array()
                    .map(|items| {
                        items
                            .iter()
                            .filter_map(|v| v.as_str().map(str::to_string))
                            .collect()
                    })
                    .unwrap_or_default()
            })
            .unwrap_or_default()
    }

    /// Clear the selection without emitting.
    pub fn clear_selection(&self) {
        let _ = self
            .base
            .sdk()
            .store()
            .set(self.selection, json!({"selected": []}));
    }
}

impl TagController for LabelsTag {
    fn base(&self) -> &TagBase {
        &self.base
    }

    fn tag_type(&self) -> &'static str {
        self.type_name
    }

    fn kind(&self) -> TagKind {
        TagKind::Control
    }

    fn allowed_children(&self) -> Option<&'static [&'static str]> {
        Some(&["label"])
    }

    fn on_registered(&self, bus: &CommunicationBus) {
        let store = self.base.sdk().store().clone();
        let selection = self.selection;
        let single = self.choice == "single";
        // Our own event map, for re-emitting after the selection mutates.
        let own_events = bus.events_of(self);

        bus.on(self, EVENT_LABEL_SELECTED, move |payload| {
            let Some(value) = payload.get("value").and_then(|v| v.as_str()) else {
                return;
            };
            let mut selected: Vec<String> = store
                .with(selection, |state| {
                    state["selected"]
                        .as_array()
                        .map(|items| {
                            items
                                .iter()
                                .filter_map(|v| v.as_str().map(str::to_string))
                                .collect()
                        })
                        .unwrap_or_default()
                })
                .unwrap_or_default();

            if let Some(at) = selected.iter().position(|s| s == value) {
                // Deselect on a repeated click, in either mode.
                selected.remove(at);
            } else if single {
                selected = vec![value.to_string()];
            } else {
                selected.push(value.to_string());
            }

            let _ = store.set(selection, json!({"selected": selected}));
            if let Some(events) = &own_events {
                events.invoke(
                    EVENT_LABELS_SELECTION_CHANGED,
                    &json!({"selected": selected}),
                );
            }
        });
    }

    fn view_props(&self) -> serde_json::Value {
        json!({
            "choice": self.choice,
            "selected": self.selected_labels(),
            "showinline": self.base.attributes().get_bool("showinline"),
            "opacity": self.base.attributes().get_num("opacity"),
        })
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}
