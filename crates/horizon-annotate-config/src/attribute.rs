//! Typed attribute descriptors and schemas.
//!
//! Every controller type declares its attributes as a static
//! [`AttributeSchema`]: an ordered list of [`AttributeDescriptor`]s. At
//! controller construction the schema is resolved against the node's
//! [`ConfigAttributes`] into a per-instance [`ResolvedAttributes`] map — the
//! descriptors themselves are shared, immutable declarations and never carry
//! per-instance state.
//!
//! Resolution coerces the raw string by descriptor kind, falls back to the
//! declared default when the raw value is absent or empty, and validates
//! `required` and `one_of` membership. Numeric `min`/`max` bounds are carried
//! as metadata but are not enforced.
//!
//! # Example
//!
//! ```
//! use horizon_annotate_config::{AttributeDescriptor, AttributeSchema, ConfigAttributes};
//! use std::collections::HashMap;
//!
//! let schema = AttributeSchema::new([
//!     AttributeDescriptor::string("name").required(),
//!     AttributeDescriptor::one_of("choice", &["single", "multiple"]).default_str("single"),
//!     AttributeDescriptor::boolean("showinline").default_bool(true),
//! ]);
//!
//! let mut raw = HashMap::new();
//! raw.insert("name".to_string(), "sentiment".to_string());
//! let attrs = ConfigAttributes::new("labels", raw);
//!
//! let resolved = schema.resolve(&attrs).unwrap();
//! assert_eq!(resolved.get_str("choice"), Some("single"));
//! assert_eq!(resolved.get_bool("showinline"), Some(true));
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use crate::attributes::ConfigAttributes;
use crate::error::{Error, Result};

/// A resolved, typed attribute value.
#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    /// A string value.
    Str(String),
    /// A boolean value.
    Bool(bool),
    /// A numeric value.
    Num(f64),
}

impl AttrValue {
    /// The value as a string slice, if it is one.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    /// The value as a boolean, if it is one.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// The value as a number, if it is one.
    pub fn as_num(&self) -> Option<f64> {
        match self {
            Self::Num(n) => Some(*n),
            _ => None,
        }
    }
}

impl From<&str> for AttrValue {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<bool> for AttrValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<f64> for AttrValue {
    fn from(value: f64) -> Self {
        Self::Num(value)
    }
}

/// Context handed to a [`Parsed`](AttributeDescriptor::parsed) attribute's
/// parser function.
///
/// The parser can read the raw value of the attribute being resolved (absent
/// attributes arrive as `None`) and the sibling attributes of the same node —
/// which is how a label's background color can be derived from its `value`
/// when no explicit color is configured.
pub struct ParseContext<'a> {
    /// The attribute name being resolved.
    pub name: &'a str,
    /// The raw string, if the attribute is present and non-empty.
    pub value: Option<&'a str>,
    /// The owning node's attribute map, for sibling access.
    pub attributes: &'a ConfigAttributes,
}

type ParserFn =
    Arc<dyn Fn(&ParseContext<'_>) -> std::result::Result<AttrValue, String> + Send + Sync>;

#[derive(Clone)]
enum AttrKind {
    Str,
    Bool,
    Num,
    OneOf(Vec<&'static str>),
    Parsed(ParserFn),
}

/// The declaration of one typed attribute on a controller type.
///
/// Descriptors are immutable and shared across every instance of the
/// declaring controller; per-instance resolved values live in
/// [`ResolvedAttributes`].
#[derive(Clone)]
pub struct AttributeDescriptor {
    name: &'static str,
    kind: AttrKind,
    default: Option<AttrValue>,
    required: bool,
    min: Option<f64>,
    max: Option<f64>,
}

impl AttributeDescriptor {
    fn new(name: &'static str, kind: AttrKind) -> Self {
        Self {
            name,
            kind,
            default: None,
            required: false,
            min: None,
            max: None,
        }
    }

    /// Declare a string attribute.
    pub fn string(name: &'static str) -> Self {
        Self::new(name, AttrKind::Str)
    }

    /// Declare a boolean attribute.
    ///
    /// Accepts `true`/`false`, `1`/`0`, `yes`/`no` (case-insensitive); an
    /// empty value falls through to the default like any other attribute.
    pub fn boolean(name: &'static str) -> Self {
        Self::new(name, AttrKind::Bool)
    }

    /// Declare a numeric attribute.
    pub fn number(name: &'static str) -> Self {
        Self::new(name, AttrKind::Num)
    }

    /// Declare an enumerated attribute restricted to the given values.
    pub fn one_of(name: &'static str, values: &[&'static str]) -> Self {
        Self::new(name, AttrKind::OneOf(values.to_vec()))
    }

    /// Declare an attribute resolved by a custom parser.
    ///
    /// The parser runs even when the attribute is absent, so it can derive a
    /// value from sibling attributes.
    pub fn parsed<F>(name: &'static str, parser: F) -> Self
    where
        F: Fn(&ParseContext<'_>) -> std::result::Result<AttrValue, String>
            + Send
            + Sync
            + 'static,
    {
        Self::new(name, AttrKind::Parsed(Arc::new(parser)))
    }

    /// Mark the attribute as required.
    ///
    /// Resolving a required attribute with no value and no default fails
    /// before any controller is handed to a view.
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Set the default value used when the attribute is absent or empty.
    pub fn default_value(mut self, value: AttrValue) -> Self {
        self.default = Some(value);
        self
    }

    /// Set a string default.
    pub fn default_str(self, value: &str) -> Self {
        self.default_value(AttrValue::Str(value.to_string()))
    }

    /// Set a boolean default.
    pub fn default_bool(self, value: bool) -> Self {
        self.default_value(AttrValue::Bool(value))
    }

    /// Set a numeric default.
    pub fn default_num(self, value: f64) -> Self {
        self.default_value(AttrValue::Num(value))
    }

    /// Record a minimum bound. Metadata only; not enforced at resolution.
    pub fn min(mut self, value: f64) -> Self {
        self.min = Some(value);
        self
    }

    /// Record a maximum bound. Metadata only; not enforced at resolution.
    pub fn max(mut self, value: f64) -> Self {
        self.max = Some(value);
        self
    }

    /// The declared attribute name.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Whether the attribute is required.
    pub fn is_required(&self) -> bool {
        self.required
    }

    /// Declared bounds, if any.
    pub fn bounds(&self) -> (Option<f64>, Option<f64>) {
        (self.min, self.max)
    }

    /// Resolve this descriptor against a node's attribute map.
    fn resolve(&self, attrs: &ConfigAttributes) -> Result<Option<AttrValue>> {
        let tag = attrs.tag_type();
        // Absent and empty raw values both fall through to the default.
        let raw = attrs.raw(self.name).filter(|v| !v.is_empty());

        if let AttrKind::Parsed(parser) = &self.kind {
            let context = ParseContext {
                name: self.name,
                value: raw,
                attributes: attrs,
            };
            return match parser(&context) {
                Ok(value) => Ok(Some(value)),
                Err(message) => Err(Error::invalid_value(
                    self.name,
                    tag,
                    raw.unwrap_or(""),
                    message,
                )),
            };
        }

        let Some(raw) = raw else {
            if let Some(default) = &self.default {
                return Ok(Some(default.clone()));
            }
            if self.required {
                return Err(Error::missing_attribute(self.name, tag));
            }
            // A bare boolean attribute (`granularity=""` or just present)
            // was filtered above; true absence resolves to nothing.
            return Ok(None);
        };

        let value = match &self.kind {
            AttrKind::Str => AttrValue::Str(raw.to_string()),
            AttrKind::Bool => match raw.to_ascii_lowercase().as_str() {
                "true" | "1" | "yes" => AttrValue::Bool(true),
                "false" | "0" | "no" => AttrValue::Bool(false),
                _ => {
                    return Err(Error::invalid_value(
                        self.name,
                        tag,
                        raw,
                        "expected a boolean",
                    ))
                }
            },
            AttrKind::Num => match raw.parse::<f64>() {
                Ok(n) => AttrValue::Num(n),
                Err(_) => {
                    return Err(Error::invalid_value(
                        self.name,
                        tag,
                        raw,
                        "expected a number",
                    ))
                }
            },
            AttrKind::OneOf(values) => {
                if values.iter().any(|allowed| *allowed == raw) {
                    AttrValue::Str(raw.to_string())
                } else {
                    return Err(Error::invalid_value(
                        self.name,
                        tag,
                        raw,
                        format!("expected one of {}", values.join(", ")),
                    ));
                }
            }
            AttrKind::Parsed(_) => unreachable!("handled above"),
        };
        Ok(Some(value))
    }
}

impl std::fmt::Debug for AttributeDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match &self.kind {
            AttrKind::Str => "string",
            AttrKind::Bool => "boolean",
            AttrKind::Num => "number",
            AttrKind::OneOf(_) => "one-of",
            AttrKind::Parsed(_) => "parsed",
        };
        f.debug_struct("AttributeDescriptor")
            .field("name", &self.name)
            .field("kind", &kind)
            .field("required", &self.required)
            .finish()
    }
}

/// The ordered attribute declarations of one controller type.
#[derive(Debug, Clone)]
pub struct AttributeSchema {
    fields: Vec<AttributeDescriptor>,
}

impl AttributeSchema {
    /// Build a schema from descriptors, resolved in the given order.
    pub fn new(fields: impl IntoIterator<Item = AttributeDescriptor>) -> Self {
        Self {
            fields: fields.into_iter().collect(),
        }
    }

    /// An empty schema, for tags with no declared attributes.
    pub fn empty() -> Self {
        Self { fields: Vec::new() }
    }

    /// The declared descriptors, in resolution order.
    pub fn fields(&self) -> &[AttributeDescriptor] {
        &self.fields
    }

    /// Resolve every declared attribute against a node's attribute map.
    ///
    /// This is the configure-time validation step: a missing required
    /// attribute or an out-of-set enumerated value fails here, before the
    /// owning controller can be rendered.
    pub fn resolve(&self, attrs: &ConfigAttributes) -> Result<ResolvedAttributes> {
        let mut values = HashMap::new();
        for field in &self.fields {
            if let Some(value) = field.resolve(attrs)? {
                values.insert(field.name, value);
            }
        }
        Ok(ResolvedAttributes { values })
    }
}

/// The typed attribute values of one controller instance.
#[derive(Debug, Clone)]
pub struct ResolvedAttributes {
    values: HashMap<&'static str, AttrValue>,
}

impl ResolvedAttributes {
    /// An empty value map.
    pub fn empty() -> Self {
        Self {
            values: HashMap::new(),
        }
    }

    /// Get a resolved value.
    pub fn get(&self, name: &str) -> Option<&AttrValue> {
        self.values.get(name)
    }

    /// Get a resolved string value.
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.values.get(name).and_then(AttrValue::as_str)
    }

    /// Get a resolved boolean value.
    pub fn get_bool(&self, name: &str) -> Option<bool> {
        self.values.get(name).and_then(AttrValue::as_bool)
    }

    /// Get a resolved numeric value.
    pub fn get_num(&self, name: &str) -> Option<f64> {
        self.values.get(name).and_then(AttrValue::as_num)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attrs(tag: &str, pairs: &[(&str, &str)]) -> ConfigAttributes {
        let raw = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ConfigAttributes::new(tag, raw)
    }

    #[test]
    fn test_required_missing_fails() {
        let schema = AttributeSchema::new([AttributeDescriptor::string("name").required()]);
        let result = schema.resolve(&attrs("labels", &[]));

        assert!(matches!(
            result,
            Err(Error::MissingAttribute { attribute, tag })
                if attribute == "name" && tag == "labels"
        ));
    }

    #[test]
    fn test_required_with_default_passes() {
        let schema = AttributeSchema::new([
            AttributeDescriptor::string("choice").required().default_str("single"),
        ]);
        let resolved = schema.resolve(&attrs("labels", &[])).unwrap();
        assert_eq!(resolved.get_str("choice"), Some("single"));
    }

    #[test]
    fn test_empty_raw_falls_back_to_default() {
        let schema =
            AttributeSchema::new([AttributeDescriptor::string("value").default_str("fallback")]);
        let resolved = schema.resolve(&attrs("label", &[("value", "")])).unwrap();
        assert_eq!(resolved.get_str("value"), Some("fallback"));
    }

    #[test]
    fn test_boolean_coercion() {
        let schema = AttributeSchema::new([
            AttributeDescriptor::boolean("a"),
            AttributeDescriptor::boolean("b"),
            AttributeDescriptor::boolean("c"),
        ]);
        let resolved = schema
            .resolve(&attrs("text", &[("a", "true"), ("b", "0"), ("c", "Yes")]))
            .unwrap();

        assert_eq!(resolved.get_bool("a"), Some(true));
        assert_eq!(resolved.get_bool("b"), Some(false));
        assert_eq!(resolved.get_bool("c"), Some(true));
    }

    #[test]
    fn test_boolean_rejects_garbage() {
        let schema = AttributeSchema::new([AttributeDescriptor::boolean("selected")]);
        assert!(schema
            .resolve(&attrs("label", &[("selected", "maybe")]))
            .is_err());
    }

    #[test]
    fn test_number_coercion() {
        let schema = AttributeSchema::new([AttributeDescriptor::number("opacity")]);
        let resolved = schema.resolve(&attrs("labels", &[("opacity", "0.6")])).unwrap();
        assert_eq!(resolved.get_num("opacity"), Some(0.6));
    }

    #[test]
    fn test_one_of_membership() {
        let schema = AttributeSchema::new([
            AttributeDescriptor::one_of("choice", &["single", "multiple"]),
        ]);

        let ok = schema.resolve(&attrs("labels", &[("choice", "multiple")])).unwrap();
        assert_eq!(ok.get_str("choice"), Some("multiple"));

        let err = schema.resolve(&attrs("labels", &[("choice", "several")]));
        assert!(matches!(err, Err(Error::InvalidValue { .. })));
    }

    #[test]
    fn test_min_max_not_enforced() {
        // Bounds are declaration metadata, not validation.
        let schema = AttributeSchema::new([
            AttributeDescriptor::number("opacity").min(0.0).max(1.0),
        ]);
        let resolved = schema.resolve(&attrs("labels", &[("opacity", "4.5")])).unwrap();
        assert_eq!(resolved.get_num("opacity"), Some(4.5));
    }

    #[test]
    fn test_parsed_reads_sibling_attributes() {
        let schema = AttributeSchema::new([AttributeDescriptor::parsed(
            "background",
            |ctx| match ctx.value {
                Some(raw) => Ok(AttrValue::Str(raw.to_string())),
                None => {
                    let value = ctx.attributes.raw("value").unwrap_or("");
                    Ok(AttrValue::Str(format!("derived-from-{value}")))
                }
            },
        )]);

        let explicit = schema
            .resolve(&attrs("label", &[("background", "#ff0000"), ("value", "A")]))
            .unwrap();
        assert_eq!(explicit.get_str("background"), Some("#ff0000"));

        let derived = schema.resolve(&attrs("label", &[("value", "A")])).unwrap();
        assert_eq!(derived.get_str("background"), Some("derived-from-A"));
    }

    #[test]
    fn test_parsed_error_becomes_invalid_value() {
        let schema = AttributeSchema::new([AttributeDescriptor::parsed("hotkey", |_| {
            Err("unparseable".to_string())
        })]);
        assert!(matches!(
            schema.resolve(&attrs("label", &[("hotkey", "??")])),
            Err(Error::InvalidValue { .. })
        ));
    }
}
