//! The controller factory table.
//!
//! Maps lowercased tag type names to the factories that build their
//! controllers. The [`TagSet`](horizon_annotate_config::TagSet) handed to the
//! configuration parser is derived from this table, so a type is parseable
//! exactly when it is constructible.

use std::collections::HashMap;
use std::sync::Arc;

use horizon_annotate_config::{ConfigTree, ConfigTreeNode, TagKind, TagSet};

use super::control::{ChoiceTag, ChoicesTag, LabelTag, LabelsTag, TextAreaTag};
use super::object::{HypertextTag, TextTag};
use super::visual::{HeaderTag, ViewTag};
use super::TagController;
use crate::error::Result;
use crate::sdk::Sdk;

/// Builds one controller for one node.
pub type ControllerFactory =
    Arc<dyn Fn(&ConfigTree, &ConfigTreeNode, &Sdk) -> Result<Arc<dyn TagController>> + Send + Sync>;

/// The registered controller types of a session.
#[derive(Clone)]
pub struct ControllerRegistry {
    factories: HashMap<String, (TagKind, ControllerFactory)>,
}

impl ControllerRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// The registry with every built-in tag.
    pub fn builtin() -> Self {
        let mut registry = Self::new();

        registry.register(ViewTag::TYPE, TagKind::Visual, |_, node, sdk| {
            Ok(ViewTag::from_node(node, sdk)?)
        });
        registry.register(HeaderTag::TYPE, TagKind::Visual, |tree, node, sdk| {
            Ok(HeaderTag::from_node(tree, node, sdk)?)
        });

        registry.register(LabelsTag::TYPE, TagKind::Control, |_, node, sdk| {
            Ok(LabelsTag::from_node(node, sdk)?)
        });
        registry.register(
            LabelsTag::HYPERTEXT_TYPE,
            TagKind::Control,
            |_, node, sdk| Ok(LabelsTag::hypertext_from_node(node, sdk)?),
        );
        registry.register(LabelTag::TYPE, TagKind::Control, |_, node, sdk| {
            Ok(LabelTag::from_node(node, sdk)?)
        });
        registry.register(ChoicesTag::TYPE, TagKind::Control, |_, node, sdk| {
            Ok(ChoicesTag::from_node(node, sdk)?)
        });
        registry.register(ChoiceTag::TYPE, TagKind::Control, |_, node, sdk| {
            Ok(ChoiceTag::from_node(node, sdk)?)
        });
        registry.register(TextAreaTag::TYPE, TagKind::Control, |_, node, sdk| {
            Ok(TextAreaTag::from_node(node, sdk)?)
        });

        registry.register(TextTag::TYPE, TagKind::Object, |_, node, sdk| {
            Ok(TextTag::from_node(node, sdk)?)
        });
        registry.register(HypertextTag::TYPE, TagKind::Object, |_, node, sdk| {
            Ok(HypertextTag::from_node(node, sdk)?)
        });

        registry
    }

    /// Register a controller type.
    pub fn register<F>(&mut self, type_name: &str, kind: TagKind, factory: F)
    where
        F: Fn(&ConfigTree, &ConfigTreeNode, &Sdk) -> Result<Arc<dyn TagController>>
            + Send
            + Sync
            + 'static,
    {
        self.factories
            .insert(type_name.to_ascii_lowercase(), (kind, Arc::new(factory)));
    }

    /// The factory for a tag type.
    pub fn factory(&self, type_name: &str) -> Option<ControllerFactory> {
        self.factories
            .get(&type_name.to_ascii_lowercase())
            .map(|(_, factory)| factory.clone())
    }

    /// The category of a tag type.
    pub fn kind(&self, type_name: &str) -> Option<TagKind> {
        self.factories
            .get(&type_name.to_ascii_lowercase())
            .map(|(kind, _)| *kind)
    }

    /// Registered type names, sorted.
    pub fn types(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Derive the tag table handed to the configuration parser.
    pub fn tag_set(&self) -> TagSet {
        let mut tags = TagSet::new();
        for (name, (kind, _)) in &self.factories {
            tags.register(name, *kind);
        }
        tags
    }
}

impl Default for ControllerRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl std::fmt::Debug for ControllerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ControllerRegistry")
            .field("types", &self.types())
            .finish()
    }
}
