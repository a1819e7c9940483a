//! The configuration tree.
//!
//! [`ConfigTree::parse`] builds the markup document, then walks every element
//! exactly once in document order. Elements whose lowercased tag name is
//! found in the [`TagSet`] each get exactly one [`ConfigTreeNode`], indexed by
//! the underlying markup element. Elements with an unrecognized type are
//! logged together with the supported-type list and skipped — parsing is
//! resilient: one bad tag never aborts the rest of the document — but their
//! descendants are still visited.
//!
//! Document order matters beyond parsing: controller registration follows it,
//! and connection computation and label ordering downstream rely on it for
//! deterministic tie-breaking between same-named siblings.

use slotmap::SecondaryMap;

use crate::attributes::ConfigAttributes;
use crate::error::{Error, Result};
use crate::markup::{ElementKey, MarkupChild, MarkupDocument};
use crate::registry::{TagKind, TagSet};
use crate::ROOT_TAG;

/// One node of the configuration tree.
///
/// Created once during [`ConfigTree::parse`] and immutable thereafter; the
/// node dies with the owning tree on task reload.
#[derive(Debug)]
pub struct ConfigTreeNode {
    /// Stable generated id, used as the reconciliation key by renderers.
    id: String,
    /// Tag name as written in the source.
    name: String,
    /// Lowercased tag type.
    tag_type: String,
    /// Tag category from the registered tag table.
    kind: TagKind,
    /// The underlying markup element.
    element: ElementKey,
    /// Nearest ancestor element that is also a configuration node.
    parent: Option<ElementKey>,
    /// Child markup elements (nodes or not), in document order.
    children: Vec<ElementKey>,
    /// The node's raw attribute map.
    attributes: ConfigAttributes,
    /// The `name` attribute, if present.
    name_attr: Option<String>,
    /// The `toname` attribute split on commas, if present.
    to_name: Vec<String>,
}

impl ConfigTreeNode {
    /// Stable generated id.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Tag name as written in the source.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Lowercased tag type.
    pub fn tag_type(&self) -> &str {
        &self.tag_type
    }

    /// Tag category.
    pub fn kind(&self) -> TagKind {
        self.kind
    }

    /// Key of the underlying markup element.
    pub fn element(&self) -> ElementKey {
        self.element
    }

    /// Nearest ancestor element that is also a configuration node.
    pub fn parent(&self) -> Option<ElementKey> {
        self.parent
    }

    /// Child markup elements in document order.
    pub fn children(&self) -> &[ElementKey] {
        &self.children
    }

    /// The node's attribute map.
    pub fn attributes(&self) -> &ConfigAttributes {
        &self.attributes
    }

    /// The `name` attribute, if present.
    pub fn name_attr(&self) -> Option<&str> {
        self.name_attr.as_deref()
    }

    /// The `toname` targets (comma-separated in the markup), if any.
    pub fn to_name(&self) -> &[String] {
        &self.to_name
    }
}

/// A parsed configuration: markup document plus the node forest.
pub struct ConfigTree {
    doc: MarkupDocument,
    nodes: SecondaryMap<ElementKey, ConfigTreeNode>,
    /// Node keys in document order.
    order: Vec<ElementKey>,
}

impl ConfigTree {
    /// Parse a configuration string against the registered tag table.
    pub fn parse(source: &str, tags: &TagSet) -> Result<Self> {
        let doc = MarkupDocument::parse(source)?;
        let mut nodes: SecondaryMap<ElementKey, ConfigTreeNode> = SecondaryMap::new();
        let mut order = Vec::new();
        let mut seq = 0usize;

        for key in doc.document_order() {
            let element = match doc.element(key) {
                Some(element) => element,
                None => continue,
            };
            let Some(kind) = tags.kind(element.tag_type()) else {
                tracing::warn!(
                    target: "horizon_annotate_config::tree",
                    tag = element.name(),
                    supported = ?tags.supported(),
                    "unsupported tag, skipping"
                );
                continue;
            };

            // Document order guarantees ancestors were processed first.
            let mut parent = element.parent();
            while let Some(candidate) = parent {
                if nodes.contains_key(candidate) {
                    break;
                }
                parent = doc.element(candidate).and_then(|e| e.parent());
            }

            let attributes =
                ConfigAttributes::new(element.tag_type(), element.attributes().clone());
            let name_attr = element.attribute("name").map(str::to_string);
            let to_name = element
                .attribute("toname")
                .map(|raw| {
                    raw.split(',')
                        .map(str::trim)
                        .filter(|s| !s.is_empty())
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default();

            let node = ConfigTreeNode {
                id: format!("{}-{}", element.tag_type(), seq),
                name: element.name().to_string(),
                tag_type: element.tag_type().to_string(),
                kind,
                element: key,
                parent,
                children: element.child_elements().collect(),
                attributes,
                name_attr,
                to_name,
            };
            seq += 1;
            nodes.insert(key, node);
            order.push(key);
        }

        tracing::debug!(
            target: "horizon_annotate_config::tree",
            node_count = order.len(),
            element_count = doc.element_count(),
            "configuration parsed"
        );

        Ok(Self { doc, nodes, order })
    }

    /// Check that the outermost element is the designated root container.
    pub fn validate(&self) -> Result<()> {
        let root = self
            .doc
            .element(self.doc.root())
            .ok_or(Error::EmptyDocument)?;
        if root.tag_type() != ROOT_TAG {
            return Err(Error::InvalidRoot {
                expected: ROOT_TAG.to_string(),
                found: root.name().to_string(),
            });
        }
        Ok(())
    }

    /// The underlying markup document.
    pub fn doc(&self) -> &MarkupDocument {
        &self.doc
    }

    /// The root element key.
    pub fn root(&self) -> ElementKey {
        self.doc.root()
    }

    /// The node for a markup element, if the element's type was registered.
    pub fn node(&self, key: ElementKey) -> Option<&ConfigTreeNode> {
        self.nodes.get(key)
    }

    /// Number of configuration nodes.
    pub fn node_count(&self) -> usize {
        self.order.len()
    }

    /// Nodes in document order.
    pub fn nodes(&self) -> impl Iterator<Item = &ConfigTreeNode> {
        self.order.iter().filter_map(|key| self.nodes.get(*key))
    }

    /// Visit every node in document order, root first.
    pub fn walk_tree<F>(&self, mut callback: F)
    where
        F: FnMut(&ConfigTreeNode),
    {
        for node in self.nodes() {
            callback(node);
        }
    }

    /// Find the first node whose `name` attribute matches.
    ///
    /// Deliberately uncached: callers use this against the live registered
    /// controller set, which can change between renders.
    pub fn find_node_by_name(&self, name: &str) -> Option<&ConfigTreeNode> {
        self.nodes().find(|node| node.name_attr() == Some(name))
    }

    /// Find every node whose `toname` targets include the given name.
    pub fn find_nodes_by_to_name(&self, name: &str) -> Vec<&ConfigTreeNode> {
        self.nodes()
            .filter(|node| node.to_name().iter().any(|t| t == name))
            .collect()
    }

    /// Debug dump of the node tree.
    pub fn dump_tree(&self) -> String {
        let mut output = String::new();
        self.dump_tree_recursive(self.doc.root(), 0, &mut output);
        output
    }

    fn dump_tree_recursive(&self, key: ElementKey, depth: usize, output: &mut String) {
        if let Some(node) = self.nodes.get(key) {
            let indent = "  ".repeat(depth);
            let name_display = node.name_attr().unwrap_or("(unnamed)");
            output.push_str(&format!(
                "{}[{}] {} ({:?})\n",
                indent,
                node.id(),
                name_display,
                node.kind()
            ));
        }
        if let Some(element) = self.doc.element(key) {
            let next_depth = if self.nodes.contains_key(key) {
                depth + 1
            } else {
                depth
            };
            for child in element.child_elements() {
                self.dump_tree_recursive(child, next_depth, output);
            }
        }
    }
}

impl std::fmt::Debug for ConfigTree {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigTree")
            .field("nodes", &self.order.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tag_set() -> TagSet {
        let mut tags = TagSet::new();
        tags.register("view", TagKind::Visual);
        tags.register("header", TagKind::Visual);
        tags.register("labels", TagKind::Control);
        tags.register("label", TagKind::Control);
        tags.register("text", TagKind::Object);
        tags
    }

    const CONFIG: &str = r#"
<View>
  <Labels name="sentiment" toName="article" choice="single">
    <Label value="Positive"/>
    <Label value="Negative"/>
  </Labels>
  <Text name="article" value="$text"/>
</View>
"#;

    #[test]
    fn test_parse_builds_nodes_in_document_order() {
        let tree = ConfigTree::parse(CONFIG, &tag_set()).unwrap();

        let types: Vec<&str> = tree.nodes().map(ConfigTreeNode::tag_type).collect();
        assert_eq!(types, vec!["view", "labels", "label", "label", "text"]);
    }

    #[test]
    fn test_node_ids_are_stable_and_unique() {
        let tree = ConfigTree::parse(CONFIG, &tag_set()).unwrap();
        let ids: Vec<&str> = tree.nodes().map(ConfigTreeNode::id).collect();
        assert_eq!(ids, vec!["view-0", "labels-1", "label-2", "label-3", "text-4"]);
    }

    #[test]
    fn test_unknown_tags_skipped_but_descendants_kept() {
        let source = r#"
<View>
  <Wizard>
    <Labels name="l" toName="t"><Label value="A"/></Labels>
  </Wizard>
  <Text name="t"/>
</View>
"#;
        let tree = ConfigTree::parse(source, &tag_set()).unwrap();

        let types: Vec<&str> = tree.nodes().map(ConfigTreeNode::tag_type).collect();
        // `wizard` is absent; its labeled descendants survive.
        assert_eq!(types, vec!["view", "labels", "label", "text"]);

        // The labels node's parent skips the unknown wrapper up to the view.
        let labels = tree.find_node_by_name("l").unwrap();
        assert_eq!(labels.parent(), Some(tree.root()));
    }

    #[test]
    fn test_validate_accepts_view_root() {
        let tree = ConfigTree::parse(CONFIG, &tag_set()).unwrap();
        assert!(tree.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_foreign_root() {
        let mut tags = tag_set();
        tags.register("foo", TagKind::Visual);
        let tree = ConfigTree::parse("<foo><Text name=\"t\"/></foo>", &tags).unwrap();

        assert!(matches!(
            tree.validate(),
            Err(Error::InvalidRoot { found, .. }) if found == "foo"
        ));
    }

    #[test]
    fn test_find_node_by_name() {
        let tree = ConfigTree::parse(CONFIG, &tag_set()).unwrap();

        let text = tree.find_node_by_name("article").unwrap();
        assert_eq!(text.tag_type(), "text");

        assert!(tree.find_node_by_name("nonexistent").is_none());
    }

    #[test]
    fn test_find_nodes_by_to_name() {
        let tree = ConfigTree::parse(CONFIG, &tag_set()).unwrap();

        let controls = tree.find_nodes_by_to_name("article");
        assert_eq!(controls.len(), 1);
        assert_eq!(controls[0].tag_type(), "labels");
    }

    #[test]
    fn test_to_name_splits_on_commas() {
        let source = r#"<View><Labels name="l" toName="a, b"/><Text name="a"/><Text name="b"/></View>"#;
        let tree = ConfigTree::parse(source, &tag_set()).unwrap();

        let labels = tree.find_node_by_name("l").unwrap();
        assert_eq!(labels.to_name(), &["a".to_string(), "b".to_string()]);
        assert_eq!(tree.find_nodes_by_to_name("b").len(), 1);
    }

    #[test]
    fn test_parent_and_children_links() {
        let tree = ConfigTree::parse(CONFIG, &tag_set()).unwrap();

        let labels = tree.find_node_by_name("sentiment").unwrap();
        assert_eq!(labels.children().len(), 2);
        assert_eq!(labels.parent(), Some(tree.root()));

        let first_label = tree.node(labels.children()[0]).unwrap();
        assert_eq!(first_label.tag_type(), "label");
        assert_eq!(first_label.parent(), Some(labels.element()));
    }

    #[test]
    fn test_dump_tree_mentions_every_node() {
        let tree = ConfigTree::parse(CONFIG, &tag_set()).unwrap();
        let dump = tree.dump_tree();
        assert!(dump.contains("labels-1"));
        assert!(dump.contains("sentiment"));
    }
}
