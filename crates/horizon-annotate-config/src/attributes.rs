//! Per-node lazily-evaluated attribute map.
//!
//! [`ConfigAttributes`] is the low-level attribute layer: one instance per
//! configuration node, holding the node's raw attribute strings (names
//! lowercased at parse time) plus optional named parsers. Reading an
//! attribute applies its parser if one is registered, otherwise yields the
//! raw string; results are cached per instance.
//!
//! The typed, validated layer — schemas of
//! [`AttributeDescriptor`](crate::AttributeDescriptor)s resolved at
//! controller construction — sits on top of this map and is defined in
//! [`crate::attribute`].

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::attribute::AttrValue;

/// A parser applied when a named attribute is read.
///
/// Receives the raw attribute string and produces the typed value exposed to
/// callers of [`ConfigAttributes::get`].
pub type NamedParser = Arc<dyn Fn(&str) -> AttrValue + Send + Sync>;

/// The raw attribute map of one configuration node.
pub struct ConfigAttributes {
    /// Owning tag type, for diagnostics.
    tag_type: String,
    /// Raw attribute strings, keyed by lowercased name.
    raw: HashMap<String, String>,
    /// Named parsers applied on read.
    parsers: HashMap<String, NamedParser>,
    /// Parsed-value cache.
    cache: RwLock<HashMap<String, AttrValue>>,
}

impl ConfigAttributes {
    /// Build the attribute map for a node of the given tag type.
    ///
    /// `raw` must already use lowercased attribute names; the markup parser
    /// guarantees this.
    pub fn new(tag_type: impl Into<String>, raw: HashMap<String, String>) -> Self {
        Self {
            tag_type: tag_type.into(),
            raw,
            parsers: HashMap::new(),
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Owning tag type.
    pub fn tag_type(&self) -> &str {
        &self.tag_type
    }

    /// Register a parser for a named attribute.
    ///
    /// The parser runs the first time the attribute is read; the result is
    /// cached for subsequent reads.
    pub fn register_parser<F>(&mut self, name: &str, parser: F)
    where
        F: Fn(&str) -> AttrValue + Send + Sync + 'static,
    {
        self.parsers
            .insert(name.to_ascii_lowercase(), Arc::new(parser));
    }

    /// Read an attribute, applying its parser if one is registered.
    ///
    /// Returns `None` when the attribute is absent from the markup.
    pub fn get(&self, name: &str) -> Option<AttrValue> {
        let name = name.to_ascii_lowercase();
        if let Some(cached) = self.cache.read().get(&name) {
            return Some(cached.clone());
        }

        let raw = self.raw.get(&name)?;
        let value = match self.parsers.get(&name) {
            Some(parser) => parser(raw),
            None => AttrValue::Str(raw.clone()),
        };
        self.cache
            .write()
            .insert(name, value.clone());
        Some(value)
    }

    /// The raw string value of an attribute, bypassing parsers.
    pub fn raw(&self, name: &str) -> Option<&str> {
        self.raw.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    /// Whether the attribute is present in the markup.
    pub fn has(&self, name: &str) -> bool {
        self.raw.contains_key(&name.to_ascii_lowercase())
    }

    /// All attribute names present on the node.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.raw.keys().map(String::as_str)
    }
}

impl std::fmt::Debug for ConfigAttributes {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigAttributes")
            .field("tag_type", &self.tag_type)
            .field("raw", &self.raw)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_get_returns_raw_string_without_parser() {
        let attrs = ConfigAttributes::new("labels", raw(&[("toname", "text")]));
        assert_eq!(attrs.get("toname"), Some(AttrValue::Str("text".into())));
        assert_eq!(attrs.get("missing"), None);
    }

    #[test]
    fn test_parser_applied_on_read() {
        let mut attrs = ConfigAttributes::new("labels", raw(&[("maxusages", "3")]));
        attrs.register_parser("maxusages", |raw| {
            AttrValue::Num(raw.parse().unwrap_or(0.0))
        });

        assert_eq!(attrs.get("maxusages"), Some(AttrValue::Num(3.0)));
    }

    #[test]
    fn test_parser_result_cached() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        let calls = Arc::new(AtomicUsize::new(0));

        let mut attrs = ConfigAttributes::new("label", raw(&[("value", "Positive")]));
        let calls_clone = calls.clone();
        attrs.register_parser("value", move |raw| {
            calls_clone.fetch_add(1, Ordering::SeqCst);
            AttrValue::Str(raw.to_uppercase())
        });

        attrs.get("value");
        attrs.get("value");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        let attrs = ConfigAttributes::new("text", raw(&[("granularity", "word")]));
        assert_eq!(
            attrs.get("Granularity"),
            Some(AttrValue::Str("word".into()))
        );
        assert!(attrs.has("GRANULARITY"));
    }
}
