//! The `TextArea` free-text controller.

use std::sync::Arc;

use horizon_annotate_config::{
    AttributeDescriptor, AttributeSchema, ConfigTreeNode, TagKind,
};

use crate::error::Result;
use crate::regions::{RegionController, ResultAtom, TextAreaValue};
use crate::sdk::Sdk;
use crate::tags::{TagBase, TagController};

/// Free-text entry, attached either to an existing region (a note on a span)
/// or to the object as a whole.
pub struct TextAreaTag {
    base: TagBase,
    editable: bool,
    max_submissions: Option<f64>,
}

impl TextAreaTag {
    /// Tag type.
    pub const TYPE: &'static str = "textarea";

    /// The attribute declarations for this controller type.
    pub fn schema() -> AttributeSchema {
        AttributeSchema::new([
            AttributeDescriptor::string("name").required(),
            AttributeDescriptor::string("toname").required(),
            AttributeDescriptor::string("placeholder"),
            AttributeDescriptor::number("maxsubmissions").min(1.0),
            AttributeDescriptor::boolean("editable").default_bool(true),
            AttributeDescriptor::number("rows").default_num(1.0),
        ])
    }

    /// Build the controller for a node.
    pub fn from_node(node: &ConfigTreeNode, sdk: &Sdk) -> Result<Arc<Self>> {
        let base = TagBase::new(node, &Self::schema(), sdk)?;
        let editable = base.attributes().get_bool("editable").unwrap_or(true);
        let max_submissions = base.attributes().get_num("maxsubmissions");
        Ok(Arc::new(Self {
            base,
            editable,
            max_submissions,
        }))
    }

    /// Number of submissions this control has produced so far.
    pub fn submission_count(&self) -> usize {
        let Some(name) = self.base.name() else {
            return 0;
        };
        self.base
            .sdk()
            .regions()
            .regions()
            .iter()
            .map(|region| {
                region.with_results(|atoms| {
                    atoms.iter().filter(|atom| atom.from_name() == name).count()
                })
            })
            .sum()
    }

    /// Submit text, either onto an existing region or as a new one.
    ///
    /// Soft-misses — a non-editable control, an exhausted submission budget,
    /// or a vanished target region — return `None` rather than raising.
    pub fn submit(
        &self,
        text: &str,
        region_id: Option<&str>,
    ) -> Result<Option<Arc<RegionController>>> {
        if !self.editable {
            tracing::trace!(
                target: "horizon_annotate::regions",
                node_id = self.base.node_id(),
                "submission ignored: control is not editable"
            );
            return Ok(None);
        }
        if let Some(limit) = self.max_submissions {
            if (self.submission_count() as f64) >= limit {
                tracing::trace!(
                    target: "horizon_annotate::regions",
                    node_id = self.base.node_id(),
                    limit,
                    "submission ignored: limit reached"
                );
                return Ok(None);
            }
        }
        let Some(from_name) = self.base.name().map(str::to_string) else {
            return Ok(None);
        };

        if let Some(id) = region_id {
            let Some(region) = self.base.sdk().regions().get(id) else {
                return Ok(None);
            };
            let atom = ResultAtom::new(
                from_name,
                region.to_name(),
                Box::new(TextAreaValue::new(vec![text.to_string()])),
            );
            region.add_result(atom);
            return Ok(Some(region));
        }

        let Some(to_name) = self.base.to_name().first().cloned() else {
            return Ok(None);
        };
        let atom = ResultAtom::new(
            from_name,
            to_name,
            Box::new(TextAreaValue::new(vec![text.to_string()])),
        );
        let region = Arc::new(RegionController::new(None, atom));
        self.base.sdk().regions().add(region.clone());
        Ok(Some(region))
    }
}

impl TagController for TextAreaTag {
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
        serde_json::json!({
            "placeholder": self.base.attributes().get_str("placeholder"),
            "editable": self.editable,
            "rows": self.base.attributes().get_num("rows"),
        })
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}
