//! A single annotated region and its result atoms.

use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::RwLock;

use horizon_annotate_core::generate_id;

use super::style::{RegionStyle, StyleOverride};
use super::value::{find_region_value, RegionValue};
use super::RegionError;
use crate::result::{Origin, RawResult};

/// One typed result carried by a region.
///
/// A region can carry several atoms — a labels result and a free-text note on
/// the same span, for example — each owned exclusively by that region.
pub struct ResultAtom {
    /// The control tag that produced this result.
    from_name: String,
    /// The object tag this result annotates.
    to_name: String,
    /// The typed payload.
    value: Box<dyn RegionValue>,
    /// Provenance, when known.
    origin: Option<Origin>,
    /// Prediction confidence, when known.
    score: Option<f64>,
    /// Explicit per-result style, when set.
    style: RwLock<Option<StyleOverride>>,
    /// Result-level fields the engine does not model, kept for round-trip.
    extra: serde_json::Map<String, serde_json::Value>,
}

impl ResultAtom {
    /// Build an atom from a freshly created payload.
    ///
    /// Annotator-created atoms carry `manual` provenance; hydrated atoms keep
    /// whatever the wire said.
    pub fn new(
        from_name: impl Into<String>,
        to_name: impl Into<String>,
        value: Box<dyn RegionValue>,
    ) -> Self {
        Self {
            from_name: from_name.into(),
            to_name: to_name.into(),
            value,
            origin: Some(Origin::Manual),
            score: None,
            style: RwLock::new(None),
            extra: serde_json::Map::new(),
        }
    }

    /// Hydrate an atom from one wire result.
    ///
    /// Fails when the result `type` does not resolve to a payload
    /// implementation or the payload is malformed.
    pub fn from_raw(raw: &RawResult) -> Result<Self, RegionError> {
        let value = find_region_value(&raw.result_type, &raw.value)?;
        Ok(Self {
            from_name: raw.from_name.clone(),
            to_name: raw.to_name.clone(),
            value,
            origin: raw.origin,
            score: raw.score,
            style: RwLock::new(None),
            extra: raw.extra.clone(),
        })
    }

    /// The producing control tag's name.
    pub fn from_name(&self) -> &str {
        &self.from_name
    }

    /// The annotated object tag's name.
    pub fn to_name(&self) -> &str {
        &self.to_name
    }

    /// The typed payload.
    pub fn value(&self) -> &dyn RegionValue {
        self.value.as_ref()
    }

    /// The wire discriminator of the payload.
    pub fn result_type(&self) -> &'static str {
        self.value.type_name()
    }

    /// Provenance, when known.
    pub fn origin(&self) -> Option<Origin> {
        self.origin
    }

    /// Set the provenance.
    pub fn set_origin(&mut self, origin: Option<Origin>) {
        self.origin = origin;
    }

    /// Set an explicit per-result style.
    pub fn set_style(&self, style: StyleOverride) {
        *self.style.write() = Some(style);
    }

    /// Resolve the display style against the owning tag's background.
    pub fn resolve_style(&self, tag_background: Option<&str>) -> RegionStyle {
        RegionStyle::resolve(self.style.read().as_ref(), tag_background)
    }

    /// Rebuild the wire result for this atom.
    pub fn export(&self, region_id: &str) -> RawResult {
        RawResult {
            id: region_id.to_string(),
            from_name: self.from_name.clone(),
            to_name: self.to_name.clone(),
            result_type: self.value.type_name().to_string(),
            origin: self.origin,
            score: self.score,
            value: self.value.export(),
            extra: self.extra.clone(),
        }
    }
}

impl std::fmt::Debug for ResultAtom {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResultAtom")
            .field("from_name", &self.from_name)
            .field("type", &self.value.type_name())
            .finish()
    }
}

/// One annotated region: an id, the object it annotates, and its result
/// atoms in order.
///
/// A region always carries at least one atom; both constructors require the
/// first one up front.
pub struct RegionController {
    id: String,
    to_name: String,
    results: RwLock<Vec<ResultAtom>>,
    hidden: AtomicBool,
    is_drawing: AtomicBool,
    parent_id: RwLock<Option<String>>,
}

impl RegionController {
    /// Create a region around its first result atom.
    ///
    /// An id is generated when `id` is `None` (a fresh user-drawn region);
    /// hydrated regions keep their wire id.
    pub fn new(id: Option<String>, first: ResultAtom) -> Self {
        let id = id.unwrap_or_else(generate_id);
        tracing::trace!(target: "horizon_annotate::regions", %id, "region created");
        Self {
            id,
            to_name: first.to_name().to_string(),
            results: RwLock::new(vec![first]),
            hidden: AtomicBool::new(false),
            is_drawing: AtomicBool::new(false),
            parent_id: RwLock::new(None),
        }
    }

    /// The region's stable id.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The name of the object tag this region annotates.
    pub fn to_name(&self) -> &str {
        &self.to_name
    }

    /// Append a result atom.
    pub fn add_result(&self, atom: ResultAtom) {
        self.results.write().push(atom);
    }

    /// Number of result atoms.
    pub fn result_count(&self) -> usize {
        self.results.read().len()
    }

    /// Access the result atoms through a closure.
    pub fn with_results<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&[ResultAtom]) -> R,
    {
        f(&self.results.read())
    }

    /// Whether any atom carries the given result type.
    pub fn has_result_type(&self, result_type: &str) -> bool {
        self.results
            .read()
            .iter()
            .any(|atom| atom.result_type() == result_type)
    }

    /// Record global offsets on every offset-bearing atom.
    pub fn set_global_offsets(&self, start: usize, end: usize) {
        for atom in self.results.read().iter() {
            atom.value().set_global_offsets(start, end);
        }
    }

    /// Whether the region is hidden from display.
    pub fn hidden(&self) -> bool {
        self.hidden.load(Ordering::SeqCst)
    }

    /// Hide or show the region.
    pub fn set_hidden(&self, hidden: bool) {
        self.hidden.store(hidden, Ordering::SeqCst);
    }

    /// Whether the region is still being drawn.
    pub fn is_drawing(&self) -> bool {
        self.is_drawing.load(Ordering::SeqCst)
    }

    /// Mark the region as in-progress or finished.
    pub fn set_drawing(&self, drawing: bool) {
        self.is_drawing.store(drawing, Ordering::SeqCst);
    }

    /// The enclosing region's id, for nested/grouped regions.
    pub fn parent_id(&self) -> Option<String> {
        self.parent_id.read().clone()
    }

    /// Group this region under another.
    pub fn set_parent_id(&self, parent: Option<String>) {
        *self.parent_id.write() = parent;
    }

    /// Rebuild the wire results for this region, in atom order.
    pub fn export(&self) -> Vec<RawResult> {
        self.results
            .read()
            .iter()
            .map(|atom| atom.export(&self.id))
            .collect()
    }

    /// Drop every result atom.
    ///
    /// Called by the owning collection before the region is released, so no
    /// atom outlives its region.
    pub fn destroy(&self) {
        self.results.write().clear();
        tracing::trace!(target: "horizon_annotate::regions", id = %self.id, "region destroyed");
    }
}

impl std::fmt::Debug for RegionController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegionController")
            .field("id", &self.id)
            .field("to_name", &self.to_name)
            .field("results", &self.result_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::regions::value::TextValue;
    use serde_json::json;

    fn labels_atom(from: &str, to: &str, labels: &[&str]) -> ResultAtom {
        ResultAtom::new(
            from,
            to,
            Box::new(TextValue::new(
                0,
                4,
                Some("Good".into()),
                labels.iter().map(|s| s.to_string()).collect(),
            )),
        )
    }

    #[test]
    fn test_generated_id_when_absent() {
        let region = RegionController::new(None, labels_atom("l", "t", &["X"]));
        assert!(!region.id().is_empty());
        assert_eq!(region.to_name(), "t");
        assert_eq!(region.result_count(), 1);
    }

    #[test]
    fn test_export_reconstructs_wire_shape() {
        let raw = RawResult::new(
            "r1",
            "label",
            "text",
            "labels",
            json!({"start": 0, "end": 4, "labels": ["X"]}),
        );
        let atom = ResultAtom::from_raw(&raw).unwrap();
        let region = RegionController::new(Some(raw.id.clone()), atom);

        let exported = region.export();
        assert_eq!(exported.len(), 1);
        assert_eq!(exported[0], raw);
    }

    #[test]
    fn test_destroy_clears_atoms() {
        let region = RegionController::new(None, labels_atom("l", "t", &["X"]));
        region.add_result(labels_atom("ta", "t", &[]));
        assert_eq!(region.result_count(), 2);

        region.destroy();
        assert_eq!(region.result_count(), 0);
    }

    #[test]
    fn test_style_resolution_per_atom() {
        let atom = labels_atom("l", "t", &["X"]);
        let resolved = atom.resolve_style(Some("#123456"));
        assert_eq!(resolved.fill_color, "#123456");

        atom.set_style(StyleOverride {
            fill_color: Some("#ffffff".into()),
            ..Default::default()
        });
        assert_eq!(atom.resolve_style(Some("#123456")).fill_color, "#ffffff");
    }

    #[test]
    fn test_flags_and_grouping() {
        let region = RegionController::new(None, labels_atom("l", "t", &["X"]));
        assert!(!region.hidden());
        region.set_hidden(true);
        assert!(region.hidden());

        region.set_drawing(true);
        assert!(region.is_drawing());

        region.set_parent_id(Some("outer".into()));
        assert_eq!(region.parent_id(), Some("outer".into()));
    }
}
