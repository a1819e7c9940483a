//! The annotation result wire format.
//!
//! An annotation travels as an ordered list of result entries. Each entry
//! names the control that produced it (`from_name`), the object it annotates
//! (`to_name`), a `type` discriminator selecting the value payload shape, and
//! the payload itself. Fields the engine does not model are preserved through
//! a flattened `extra` map so that hydrate → export round-trips losslessly.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// How a result came to exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Origin {
    /// Drawn or entered by the annotator.
    Manual,
    /// Produced by a model prediction.
    Prediction,
    /// A prediction subsequently edited by the annotator.
    PredictionChanged,
}

/// One wire-format result entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawResult {
    /// Region id; results sharing an id belong to one region.
    pub id: String,
    /// Name of the control tag that produced this result.
    pub from_name: String,
    /// Name of the object tag this result annotates.
    pub to_name: String,
    /// Discriminator selecting the value payload shape.
    #[serde(rename = "type")]
    pub result_type: String,
    /// Provenance, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub origin: Option<Origin>,
    /// Prediction confidence, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    /// The type-specific payload.
    pub value: Value,
    /// Any fields not modeled above, preserved for round-trip.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

impl RawResult {
    /// Build a result with only the required fields set.
    pub fn new(
        id: impl Into<String>,
        from_name: impl Into<String>,
        to_name: impl Into<String>,
        result_type: impl Into<String>,
        value: Value,
    ) -> Self {
        Self {
            id: id.into(),
            from_name: from_name.into(),
            to_name: to_name.into(),
            result_type: result_type.into(),
            origin: None,
            score: None,
            value,
            extra: serde_json::Map::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_round_trip_preserves_unknown_fields() {
        let raw = json!({
            "id": "a",
            "from_name": "label",
            "to_name": "text",
            "type": "labels",
            "origin": "prediction-changed",
            "score": 0.87,
            "value": {"start": 0, "end": 4, "labels": ["X"]},
            "readonly": true,
            "meta": {"lead_time": 12.5}
        });

        let result: RawResult = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(result.origin, Some(Origin::PredictionChanged));
        assert_eq!(result.extra["readonly"], json!(true));

        let back = serde_json::to_value(&result).unwrap();
        assert_eq!(back, raw);
    }

    #[test]
    fn test_optional_fields_omitted_when_absent() {
        let result = RawResult::new("r1", "label", "text", "labels", json!({"labels": []}));
        let serialized = serde_json::to_value(&result).unwrap();

        assert!(serialized.get("origin").is_none());
        assert!(serialized.get("score").is_none());
    }
}
