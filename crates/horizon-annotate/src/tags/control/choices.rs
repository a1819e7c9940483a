//! The `Choices` / `Choice` classification controllers.

use std::sync::Arc;

use serde_json::json;

use horizon_annotate_config::{
    AttributeDescriptor, AttributeSchema, ConfigTreeNode, TagKind,
};
use horizon_annotate_core::StateHandle;

use super::{EVENT_CHOICES_SELECTION_CHANGED, EVENT_CHOICE_SELECTED};
use crate::comms::{BusResult, CommunicationBus};
use crate::error::Result;
use crate::regions::{ChoicesValue, RegionController, ResultAtom};
use crate::sdk::Sdk;
use crate::tags::{TagBase, TagController};

/// A classification group: the annotator picks one or more `<Choice>`s for
/// the whole object.
pub struct ChoicesTag {
    base: TagBase,
    choice: String,
    selection: StateHandle,
}

impl ChoicesTag {
    /// Tag type.
    pub const TYPE: &'static str = "choices";

    /// The attribute declarations for this controller type.
    pub fn schema() -> AttributeSchema {
        AttributeSchema::new([
            AttributeDescriptor::string("name").required(),
            AttributeDescriptor::string("toname").required(),
            AttributeDescriptor::one_of("choice", &["single", "multiple"]).default_str("single"),
            AttributeDescriptor::boolean("required").default_bool(false),
            AttributeDescriptor::boolean("showinline").default_bool(true),
        ])
    }

    /// Build the controller for a node.
    pub fn from_node(node: &ConfigTreeNode, sdk: &Sdk) -> Result<Arc<Self>> {
        let base = TagBase::new(node, &Self::schema(), sdk)?;
        let choice = base
            .attributes()
            .get_str("choice")
            .unwrap_or("single")
            .to_string();
        let selection = sdk.node_state(node.id(), json!({"selected": []}));
        Ok(Arc::new(Self {
            base,
            choice,
            selection,
        }))
    }

    /// The configured selection mode.
    pub fn choice(&self) -> &str {
        &self.choice
    }

    /// The currently selected choice values.
    pub fn selected_choices(&self) -> Vec<String> {
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

    /// Commit the current selection as a classification region.
    ///
    /// Returns `None` when nothing is selected.
    pub fn commit_selection(&self) -> Option<Arc<RegionController>> {
        let selected = self.selected_choices();
        if selected.is_empty() {
            return None;
        }
        let from_name = self.base.name()?.to_string();
        let to_name = self.base.to_name().first()?.clone();

        let atom = ResultAtom::new(from_name, to_name, Box::new(ChoicesValue::new(selected)));
        let region = Arc::new(RegionController::new(None, atom));
        self.base.sdk().regions().add(region.clone());
        Some(region)
    }
}

impl TagController for ChoicesTag {
    fn base(&self) -> &TagBase {
        &self.base
    }

    fn tag_type(&self) -> &'static str {
        Self::TYPE
    }

    fn kind(&self) -> TagKind {
        TagKind::Control
    }

    fn allowed_children(&self) -> Option<&'static [&'static str]> {
        Some(&["choice"])
    }

    fn on_registered(&self, bus: &CommunicationBus) {
        let store = self.base.sdk().store().clone();
        let selection = self.selection;
        let single = self.choice == "single";
        let own_events = bus.events_of(self);

        bus.on(self, EVENT_CHOICE_SELECTED, move |payload| {
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
                selected.remove(at);
            } else if single {
                selected = vec![value.to_string()];
            } else {
                selected.push(value.to_string());
            }

            let _ = store.set(selection, json!({"selected": selected}));
            if let Some(events) = &own_events {
                events.invoke(
                    EVENT_CHOICES_SELECTION_CHANGED,
                    &json!({"selected": selected}),
                );
            }
        });
    }

    fn view_props(&self) -> serde_json::Value {
        json!({
            "choice": self.choice,
            "selected": self.selected_choices(),
            "required": self.base.attributes().get_bool("required"),
        })
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

/// One selectable option inside a `<Choices>` group.
pub struct ChoiceTag {
    base: TagBase,
    value: String,
}

impl ChoiceTag {
    /// Tag type.
    pub const TYPE: &'static str = "choice";

    /// The attribute declarations for this controller type.
    pub fn schema() -> AttributeSchema {
        AttributeSchema::new([
            AttributeDescriptor::string("value").required(),
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
        Ok(Arc::new(Self { base, value }))
    }

    /// The choice's value.
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Handle a click: emit `choice-selected` so the owning group toggles
    /// membership.
    pub fn click(&self, bus: &CommunicationBus) -> BusResult<usize> {
        bus.invoke(self, EVENT_CHOICE_SELECTED, &json!({"value": self.value}))
    }
}

impl TagController for ChoiceTag {
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
            "alias": self.base.attributes().get_str("alias"),
            "hotkey": self.base.attributes().get_str("hotkey"),
        })
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}
