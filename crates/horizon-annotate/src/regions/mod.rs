//! The region model: annotated spans and their typed result payloads.
//!
//! - [`RegionsController`] owns every region of one annotation and handles
//!   hydration from and export to the wire result format
//! - [`RegionController`] is one annotated region carrying ordered
//!   [`ResultAtom`]s
//! - [`RegionValue`] implementations are the typed payloads selected by the
//!   wire `type` discriminator
//!
//! Hydration is all-or-nothing: either every raw result becomes part of a
//! region, or the error propagates before any region is committed.

mod region;
pub mod style;
mod value;

pub use region::{RegionController, ResultAtom};
pub use style::{RegionStyle, StyleOverride};
pub use value::{
    find_region_value, ChoicesValue, HypertextValue, RegionValue, TextAreaValue, TextValue,
};

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::result::RawResult;

/// Errors from the region model.
#[derive(Debug, thiserror::Error)]
pub enum RegionError {
    /// The result `type` discriminator has no payload implementation.
    #[error("Region value type {0} not found")]
    UnknownValueType(String),

    /// A payload object was missing required fields or had the wrong shape.
    #[error("Malformed {kind} value: {message}")]
    Malformed { kind: String, message: String },
}

/// The collection of regions for one annotation.
pub struct RegionsController {
    /// Regions in first-occurrence order.
    regions: RwLock<Vec<Arc<RegionController>>>,
    /// Ids of currently selected regions, in selection order.
    selection: RwLock<Vec<String>>,
}

impl RegionsController {
    /// Create an empty collection.
    pub fn new() -> Self {
        Self {
            regions: RwLock::new(Vec::new()),
            selection: RwLock::new(Vec::new()),
        }
    }

    /// Reconstruct regions from raw wire results.
    ///
    /// Results sharing an `id` are grouped into one region, ordered by the
    /// first occurrence of each id; atom order within a region follows input
    /// order. Every region is built before any is committed, so a malformed
    /// or unresolvable result leaves the collection untouched.
    pub fn create_regions_from_results(
        &self,
        results: &[RawResult],
    ) -> Result<usize, RegionError> {
        let mut built: Vec<Arc<RegionController>> = Vec::new();
        let mut index: HashMap<&str, usize> = HashMap::new();

        for raw in results {
            let atom = ResultAtom::from_raw(raw)?;
            match index.get(raw.id.as_str()) {
                Some(&at) => built[at].add_result(atom),
                None => {
                    index.insert(raw.id.as_str(), built.len());
                    built.push(Arc::new(RegionController::new(
                        Some(raw.id.clone()),
                        atom,
                    )));
                }
            }
        }

        let count = built.len();
        self.regions.write().extend(built);
        tracing::debug!(
            target: "horizon_annotate::regions",
            result_count = results.len(),
            region_count = count,
            "hydrated regions from results"
        );
        Ok(count)
    }

    /// Add a freshly created region.
    pub fn add(&self, region: Arc<RegionController>) {
        self.regions.write().push(region);
    }

    /// Look up a region by id.
    pub fn get(&self, id: &str) -> Option<Arc<RegionController>> {
        self.regions
            .read()
            .iter()
            .find(|region| region.id() == id)
            .cloned()
    }

    /// Remove a region by id, destroying it.
    ///
    /// Removing an id with no region is a no-op returning `false` — deleting
    /// an already-deleted region must not raise.
    pub fn remove(&self, id: &str) -> bool {
        let mut regions = self.regions.write();
        let Some(at) = regions.iter().position(|region| region.id() == id) else {
            return false;
        };
        let region = regions.remove(at);
        drop(regions);

        region.destroy();
        self.selection.write().retain(|selected| selected != id);
        true
    }

    /// Number of regions.
    pub fn len(&self) -> usize {
        self.regions.read().len()
    }

    /// Whether the collection holds no regions.
    pub fn is_empty(&self) -> bool {
        self.regions.read().is_empty()
    }

    /// Snapshot of the regions in order.
    pub fn regions(&self) -> Vec<Arc<RegionController>> {
        self.regions.read().clone()
    }

    // =========================================================================
    // Selection
    // =========================================================================

    /// Select a region by id. Returns `false` for unknown or already-selected
    /// ids.
    pub fn select(&self, id: &str) -> bool {
        if self.get(id).is_none() {
            return false;
        }
        let mut selection = self.selection.write();
        if selection.iter().any(|selected| selected == id) {
            return false;
        }
        selection.push(id.to_string());
        true
    }

    /// Unselect a region by id.
    pub fn unselect(&self, id: &str) -> bool {
        let mut selection = self.selection.write();
        let before = selection.len();
        selection.retain(|selected| selected != id);
        selection.len() != before
    }

    /// Ids of selected regions, in selection order.
    pub fn selected(&self) -> Vec<String> {
        self.selection.read().clone()
    }

    /// Clear the selection.
    pub fn clear_selection(&self) {
        self.selection.write().clear();
    }

    // =========================================================================
    // Export / teardown
    // =========================================================================

    /// Flatten every region back to wire results, preserving region order and
    /// atom order.
    pub fn export(&self) -> Vec<RawResult> {
        self.regions
            .read()
            .iter()
            .flat_map(|region| region.export())
            .collect()
    }

    /// Destroy every region, then clear the selection.
    ///
    /// No region controller survives its owning collection.
    pub fn destroy(&self) {
        let regions = std::mem::take(&mut *self.regions.write());
        for region in &regions {
            region.destroy();
        }
        self.selection.write().clear();
    }
}

impl Default for RegionsController {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for RegionsController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegionsController")
            .field("regions", &self.len())
            .field("selected", &self.selection.read().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn labels_result(id: &str, labels: &[&str]) -> RawResult {
        RawResult::new(
            id,
            "label",
            "text",
            "labels",
            json!({"start": 0, "end": 4, "labels": labels}),
        )
    }

    fn textarea_result(id: &str, text: &str) -> RawResult {
        RawResult::new(id, "ta", "text", "textarea", json!({"text": [text]}))
    }

    #[test]
    fn test_grouping_by_shared_id() {
        let controller = RegionsController::new();
        let results = vec![
            labels_result("a", &["X"]),
            textarea_result("a", "note"),
            labels_result("b", &["Y"]),
        ];

        assert_eq!(controller.create_regions_from_results(&results).unwrap(), 2);

        let regions = controller.regions();
        assert_eq!(regions[0].id(), "a");
        assert_eq!(regions[0].result_count(), 2);
        assert_eq!(regions[1].id(), "b");
        assert_eq!(regions[1].result_count(), 1);
    }

    #[test]
    fn test_hydration_is_all_or_nothing() {
        let controller = RegionsController::new();
        let results = vec![
            labels_result("a", &["X"]),
            RawResult::new("b", "l", "t", "holographiclabels", json!({})),
        ];

        assert!(controller.create_regions_from_results(&results).is_err());
        // The valid first result was not committed either.
        assert!(controller.is_empty());
    }

    #[test]
    fn test_export_round_trip() {
        let controller = RegionsController::new();
        let results = vec![
            labels_result("a", &["X"]),
            textarea_result("a", "note"),
            labels_result("b", &["Y"]),
        ];
        controller.create_regions_from_results(&results).unwrap();

        assert_eq!(controller.export(), results);
    }

    #[test]
    fn test_remove_missing_region_is_noop() {
        let controller = RegionsController::new();
        controller
            .create_regions_from_results(&[labels_result("a", &["X"])])
            .unwrap();

        assert!(controller.remove("a"));
        assert!(!controller.remove("a"));
        assert!(!controller.remove("never-existed"));
    }

    #[test]
    fn test_selection_lifecycle() {
        let controller = RegionsController::new();
        controller
            .create_regions_from_results(&[labels_result("a", &["X"]), labels_result("b", &["Y"])])
            .unwrap();

        assert!(controller.select("a"));
        assert!(!controller.select("a"));
        assert!(!controller.select("zzz"));
        assert!(controller.select("b"));
        assert_eq!(controller.selected(), vec!["a", "b"]);

        assert!(controller.unselect("a"));
        assert_eq!(controller.selected(), vec!["b"]);

        // Removing a selected region drops it from the selection too.
        controller.remove("b");
        assert!(controller.selected().is_empty());
    }

    #[test]
    fn test_destroy_clears_everything() {
        let controller = RegionsController::new();
        controller
            .create_regions_from_results(&[labels_result("a", &["X"])])
            .unwrap();
        let region = controller.get("a").unwrap();
        controller.select("a");

        controller.destroy();

        assert!(controller.is_empty());
        assert!(controller.selected().is_empty());
        // The region controller itself was destroyed before release.
        assert_eq!(region.result_count(), 0);
    }
}
