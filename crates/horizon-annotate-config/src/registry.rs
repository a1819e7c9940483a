//! The table of tag types known to the engine.
//!
//! Parsing consults a [`TagSet`] to decide which elements become
//! configuration nodes. The set carries only names and categories; the
//! controller factories and views for those names are registered by the
//! engine crate, keyed by the same lowercased type names.

use std::collections::HashMap;

/// The category of a tag type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TagKind {
    /// Holds source data (text, hypertext) that gets annotated.
    Object,
    /// Selects or labels things on an object tag.
    Control,
    /// Pure layout or presentation.
    Visual,
}

/// The set of registered tag types, keyed by lowercased name.
#[derive(Debug, Clone, Default)]
pub struct TagSet {
    kinds: HashMap<String, TagKind>,
}

impl TagSet {
    /// An empty tag set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tag type. Re-registering a name overwrites its kind.
    pub fn register(&mut self, type_name: &str, kind: TagKind) {
        self.kinds.insert(type_name.to_ascii_lowercase(), kind);
    }

    /// Look up the kind of a (case-insensitive) tag type.
    pub fn kind(&self, type_name: &str) -> Option<TagKind> {
        self.kinds.get(&type_name.to_ascii_lowercase()).copied()
    }

    /// Whether the tag type is registered.
    pub fn contains(&self, type_name: &str) -> bool {
        self.kinds.contains_key(&type_name.to_ascii_lowercase())
    }

    /// Sorted list of registered type names, for diagnostics.
    pub fn supported(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.kinds.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Number of registered tag types.
    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    /// Whether no tag types are registered.
    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_case_insensitive_lookup() {
        let mut tags = TagSet::new();
        tags.register("Labels", TagKind::Control);

        assert_eq!(tags.kind("labels"), Some(TagKind::Control));
        assert_eq!(tags.kind("LABELS"), Some(TagKind::Control));
        assert_eq!(tags.kind("unknown"), None);
    }

    #[test]
    fn test_supported_is_sorted() {
        let mut tags = TagSet::new();
        tags.register("view", TagKind::Visual);
        tags.register("labels", TagKind::Control);
        tags.register("text", TagKind::Object);

        assert_eq!(tags.supported(), vec!["labels", "text", "view"]);
    }
}
