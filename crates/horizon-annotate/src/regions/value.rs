//! Typed region value payloads.
//!
//! Every result entry carries a `type` discriminator and a `value` object;
//! [`find_region_value`] maps the discriminator to the matching
//! [`RegionValue`] implementation. An unresolvable type is a hard error —
//! silently dropping a result would corrupt the annotation on save.
//!
//! Value payloads keep any fields the engine does not model in an `extra`
//! map, re-emitted verbatim on export, so hydrate → export reproduces the
//! original wire shape.

use std::any::Any;

use parking_lot::RwLock;
use serde_json::{json, Map, Value};

use super::RegionError;

/// A typed result payload owned by one region.
pub trait RegionValue: std::fmt::Debug + Send + Sync {
    /// The wire discriminator this payload serializes under.
    fn type_name(&self) -> &'static str;

    /// Rebuild the wire `value` object.
    fn export(&self) -> Value;

    /// The label set carried by this payload, if it has one.
    fn labels(&self) -> Option<Vec<String>> {
        None
    }

    /// Record offsets computed against the canonical flattened text.
    ///
    /// Payloads without an offset model ignore this.
    fn set_global_offsets(&self, _start: usize, _end: usize) {}

    /// Downcasting support.
    fn as_any(&self) -> &dyn Any;
}

/// Resolve a result `type` discriminator to its payload implementation.
pub fn find_region_value(
    result_type: &str,
    value: &Value,
) -> Result<Box<dyn RegionValue>, RegionError> {
    match result_type {
        TextValue::TYPE => Ok(Box::new(TextValue::from_value(value)?)),
        HypertextValue::TYPE => Ok(Box::new(HypertextValue::from_value(value)?)),
        ChoicesValue::TYPE => Ok(Box::new(ChoicesValue::from_value(value)?)),
        TextAreaValue::TYPE => Ok(Box::new(TextAreaValue::from_value(value)?)),
        other => Err(RegionError::UnknownValueType(other.to_string())),
    }
}

fn object_of(value: &Value, kind: &str) -> Result<Map<String, Value>, RegionError> {
    value
        .as_object()
        .cloned()
        .ok_or_else(|| RegionError::Malformed {
            kind: kind.to_string(),
            message: "value must be an object".to_string(),
        })
}

fn take_usize(map: &mut Map<String, Value>, key: &str, kind: &str) -> Result<usize, RegionError> {
    map.remove(key)
        .and_then(|v| v.as_u64())
        .map(|v| v as usize)
        .ok_or_else(|| RegionError::Malformed {
            kind: kind.to_string(),
            message: format!("missing or non-integer '{key}'"),
        })
}

fn take_string(map: &mut Map<String, Value>, key: &str, kind: &str) -> Result<String, RegionError> {
    match map.remove(key) {
        Some(Value::String(s)) => Ok(s),
        _ => Err(RegionError::Malformed {
            kind: kind.to_string(),
            message: format!("missing or non-string '{key}'"),
        }),
    }
}

fn take_string_list(map: &mut Map<String, Value>, key: &str) -> Vec<String> {
    match map.remove(key) {
        Some(Value::Array(items)) => items
            .into_iter()
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect(),
        Some(Value::String(s)) => vec![s],
        _ => Vec::new(),
    }
}

// =============================================================================
// TextValue — plain-text span labels
// =============================================================================

/// A labeled span over a plain-text object.
///
/// Offsets come in two tiers: the raw `start`/`end` captured from an in-page
/// selection (which can shift when content reflows) and the global offsets
/// computed once against the canonical text buffer. Export prefers the global
/// tier whenever it has been computed.
#[derive(Debug)]
pub struct TextValue {
    start: usize,
    end: usize,
    text: Option<String>,
    labels: Vec<String>,
    global_offsets: RwLock<Option<(usize, usize)>>,
    extra: Map<String, Value>,
}

impl TextValue {
    /// Wire discriminator.
    pub const TYPE: &'static str = "labels";

    /// Build a value from a fresh selection.
    pub fn new(start: usize, end: usize, text: Option<String>, labels: Vec<String>) -> Self {
        Self {
            start,
            end,
            text,
            labels,
            global_offsets: RwLock::new(None),
            extra: Map::new(),
        }
    }

    /// Hydrate from a wire `value` object.
    pub fn from_value(value: &Value) -> Result<Self, RegionError> {
        let mut map = object_of(value, Self::TYPE)?;
        let start = take_usize(&mut map, "start", Self::TYPE)?;
        let end = take_usize(&mut map, "end", Self::TYPE)?;
        let text = match map.remove("text") {
            Some(Value::String(s)) => Some(s),
            _ => None,
        };
        let labels = take_string_list(&mut map, "labels");
        Ok(Self {
            start,
            end,
            text,
            labels,
            global_offsets: RwLock::new(None),
            extra: map,
        })
    }

    /// The raw selection offsets.
    pub fn offsets(&self) -> (usize, usize) {
        (self.start, self.end)
    }

    /// The global offsets, if computed.
    pub fn global_offsets(&self) -> Option<(usize, usize)> {
        *self.global_offsets.read()
    }

    /// The covered text, if captured.
    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }
}

impl RegionValue for TextValue {
    fn type_name(&self) -> &'static str {
        Self::TYPE
    }

    fn export(&self) -> Value {
        // Global offsets are stable across re-renders; prefer them.
        let (start, end) = self.global_offsets().unwrap_or((self.start, self.end));
        let mut map = self.extra.clone();
        map.insert("start".to_string(), json!(start));
        map.insert("end".to_string(), json!(end));
        if let Some(text) = &self.text {
            map.insert("text".to_string(), json!(text));
        }
        map.insert("labels".to_string(), json!(self.labels));
        Value::Object(map)
    }

    fn labels(&self) -> Option<Vec<String>> {
        Some(self.labels.clone())
    }

    fn set_global_offsets(&self, start: usize, end: usize) {
        *self.global_offsets.write() = Some((start, end));
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

// =============================================================================
// HypertextValue — rich-text span labels
// =============================================================================

/// A labeled span over a hypertext object.
///
/// `start`/`end` are container paths into the markup; `start_offset`/
/// `end_offset` are character offsets within those containers. The global
/// offset tier is serialized alongside, never in place of, the container
/// addressing, so a reload can re-anchor the highlight either way.
#[derive(Debug)]
pub struct HypertextValue {
    start: String,
    end: String,
    start_offset: usize,
    end_offset: usize,
    text: Option<String>,
    labels: Vec<String>,
    global_offsets: RwLock<Option<(usize, usize)>>,
    extra: Map<String, Value>,
}

impl HypertextValue {
    /// Wire discriminator.
    pub const TYPE: &'static str = "hypertextlabels";

    /// Build a value from a fresh selection.
    pub fn new(
        start: impl Into<String>,
        end: impl Into<String>,
        start_offset: usize,
        end_offset: usize,
        text: Option<String>,
        labels: Vec<String>,
    ) -> Self {
        Self {
            start: start.into(),
            end: end.into(),
            start_offset,
            end_offset,
            text,
            labels,
            global_offsets: RwLock::new(None),
            extra: Map::new(),
        }
    }

    /// Hydrate from a wire `value` object.
    pub fn from_value(value: &Value) -> Result<Self, RegionError> {
        let mut map = object_of(value, Self::TYPE)?;
        let start = take_string(&mut map, "start", Self::TYPE)?;
        let end = take_string(&mut map, "end", Self::TYPE)?;
        let start_offset = take_usize(&mut map, "startOffset", Self::TYPE)?;
        let end_offset = take_usize(&mut map, "endOffset", Self::TYPE)?;
        let text = match map.remove("text") {
            Some(Value::String(s)) => Some(s),
            _ => None,
        };
        let labels = take_string_list(&mut map, "labels");
        let global_offsets = map.remove("globalOffsets").and_then(|g| {
            Some((
                g.get("start")?.as_u64()? as usize,
                g.get("end")?.as_u64()? as usize,
            ))
        });
        Ok(Self {
            start,
            end,
            start_offset,
            end_offset,
            text,
            labels,
            global_offsets: RwLock::new(global_offsets),
            extra: map,
        })
    }

    /// The container paths.
    pub fn containers(&self) -> (&str, &str) {
        (&self.start, &self.end)
    }

    /// The in-container offsets.
    pub fn offsets(&self) -> (usize, usize) {
        (self.start_offset, self.end_offset)
    }

    /// The global offsets, if known.
    pub fn global_offsets(&self) -> Option<(usize, usize)> {
        *self.global_offsets.read()
    }
}

impl RegionValue for HypertextValue {
    fn type_name(&self) -> &'static str {
        Self::TYPE
    }

    fn export(&self) -> Value {
        let mut map = self.extra.clone();
        map.insert("start".to_string(), json!(self.start));
        map.insert("end".to_string(), json!(self.end));
        map.insert("startOffset".to_string(), json!(self.start_offset));
        map.insert("endOffset".to_string(), json!(self.end_offset));
        if let Some((start, end)) = self.global_offsets() {
            map.insert(
                "globalOffsets".to_string(),
                json!({"start": start, "end": end}),
            );
        }
        if let Some(text) = &self.text {
            map.insert("text".to_string(), json!(text));
        }
        map.insert("labels".to_string(), json!(self.labels));
        Value::Object(map)
    }

    fn labels(&self) -> Option<Vec<String>> {
        Some(self.labels.clone())
    }

    fn set_global_offsets(&self, start: usize, end: usize) {
        *self.global_offsets.write() = Some((start, end));
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

// =============================================================================
// ChoicesValue — classification
// =============================================================================

/// A classification answer.
#[derive(Debug)]
pub struct ChoicesValue {
    choices: Vec<String>,
    extra: Map<String, Value>,
}

impl ChoicesValue {
    /// Wire discriminator.
    pub const TYPE: &'static str = "choices";

    /// Build a value from selected choices.
    pub fn new(choices: Vec<String>) -> Self {
        Self {
            choices,
            extra: Map::new(),
        }
    }

    /// Hydrate from a wire `value` object.
    pub fn from_value(value: &Value) -> Result<Self, RegionError> {
        let mut map = object_of(value, Self::TYPE)?;
        match map.remove("choices") {
            Some(Value::Array(items)) => Ok(Self {
                choices: items
                    .into_iter()
                    .filter_map(|v| v.as_str().map(str::to_string))
                    .collect(),
                extra: map,
            }),
            _ => Err(RegionError::Malformed {
                kind: Self::TYPE.to_string(),
                message: "missing 'choices' array".to_string(),
            }),
        }
    }

    /// The selected choice values.
    pub fn choices(&self) -> &[String] {
        &self.choices
    }
}

impl RegionValue for ChoicesValue {
    fn type_name(&self) -> &'static str {
        Self::TYPE
    }

    fn export(&self) -> Value {
        let mut map = self.extra.clone();
        map.insert("choices".to_string(), json!(self.choices));
        Value::Object(map)
    }

    fn labels(&self) -> Option<Vec<String>> {
        Some(self.choices.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

// =============================================================================
// TextAreaValue — free-text entry
// =============================================================================

/// One or more free-text submissions.
#[derive(Debug)]
pub struct TextAreaValue {
    text: RwLock<Vec<String>>,
    extra: Map<String, Value>,
}

impl TextAreaValue {
    /// Wire discriminator.
    pub const TYPE: &'static str = "textarea";

    /// Build a value from submitted text.
    pub fn new(text: Vec<String>) -> Self {
        Self {
            text: RwLock::new(text),
            extra: Map::new(),
        }
    }

    /// Hydrate from a wire `value` object. A bare string is accepted as a
    /// single submission.
    pub fn from_value(value: &Value) -> Result<Self, RegionError> {
        let mut map = object_of(value, Self::TYPE)?;
        let text = match map.remove("text") {
            Some(Value::Array(items)) => items
                .into_iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect(),
            Some(Value::String(s)) => vec![s],
            _ => {
                return Err(RegionError::Malformed {
                    kind: Self::TYPE.to_string(),
                    message: "missing 'text'".to_string(),
                })
            }
        };
        Ok(Self {
            text: RwLock::new(text),
            extra: map,
        })
    }

    /// The submissions, in entry order.
    pub fn text(&self) -> Vec<String> {
        self.text.read().clone()
    }

    /// Append a submission.
    pub fn push(&self, entry: impl Into<String>) {
        self.text.write().push(entry.into());
    }
}

impl RegionValue for TextAreaValue {
    fn type_name(&self) -> &'static str {
        Self::TYPE
    }

    fn export(&self) -> Value {
        let mut map = self.extra.clone();
        map.insert("text".to_string(), json!(self.text()));
        Value::Object(map)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_unknown_type_is_hard_error() {
        let err = find_region_value("polygonlabels", &json!({})).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Region value type polygonlabels not found"
        );
    }

    #[test]
    fn test_text_value_round_trip() {
        let value = json!({"start": 0, "end": 4, "text": "Good", "labels": ["Positive"]});
        let parsed = find_region_value("labels", &value).unwrap();
        assert_eq!(parsed.export(), value);
    }

    #[test]
    fn test_text_value_prefers_global_offsets() {
        let parsed = TextValue::new(3, 7, None, vec!["X".into()]);
        parsed.set_global_offsets(103, 107);

        let exported = parsed.export();
        assert_eq!(exported["start"], json!(103));
        assert_eq!(exported["end"], json!(107));
    }

    #[test]
    fn test_text_value_unknown_fields_survive() {
        let value = json!({"start": 1, "end": 2, "labels": [], "htmllabels": ["em"]});
        let parsed = find_region_value("labels", &value).unwrap();
        assert_eq!(parsed.export()["htmllabels"], json!(["em"]));
    }

    #[test]
    fn test_text_value_requires_offsets() {
        assert!(matches!(
            TextValue::from_value(&json!({"labels": []})),
            Err(RegionError::Malformed { .. })
        ));
    }

    #[test]
    fn test_hypertext_round_trip_with_global_offsets() {
        let value = json!({
            "start": "/div[1]/p[2]/text()[1]",
            "end": "/div[1]/p[2]/text()[1]",
            "startOffset": 5,
            "endOffset": 12,
            "globalOffsets": {"start": 105, "end": 112},
            "labels": ["Mention"]
        });
        let parsed = find_region_value("hypertextlabels", &value).unwrap();
        assert_eq!(parsed.export(), value);
    }

    #[test]
    fn test_choices_round_trip() {
        let value = json!({"choices": ["Spam", "Urgent"]});
        let parsed = find_region_value("choices", &value).unwrap();
        assert_eq!(parsed.export(), value);
        assert_eq!(
            parsed.labels(),
            Some(vec!["Spam".to_string(), "Urgent".to_string()])
        );
    }

    #[test]
    fn test_textarea_accepts_bare_string() {
        let parsed = find_region_value("textarea", &json!({"text": "a note"})).unwrap();
        assert_eq!(parsed.export()["text"], json!(["a note"]));
    }
}
