//! Render dispatch for the external rendering collaborator.
//!
//! The engine does not paint anything. A rendering layer walks the
//! configuration tree through [`Session::render`](crate::Session::render) and
//! receives [`RenderNode`] values: fully-resolved controller state plus
//! children, keyed by the node's stable id so the collaborator can preserve
//! reconciliation identity across renders. Raw text between tags passes
//! through untouched.
//!
//! Every registered controller type must have exactly one view. A session
//! refuses to build when a type has none — that is a startup configuration
//! error, not a runtime one.

use std::collections::HashMap;
use std::sync::Arc;

use horizon_annotate_config::{ConfigTree, ConfigTreeNode, ElementKey};

use crate::error::{AnnotateError, Result};
use crate::sdk::Annotation;
use crate::tags::TagController;

/// One node of rendered output.
#[derive(Debug, Clone, PartialEq)]
pub enum RenderNode {
    /// A rendered tag: its stable id, type, view props, and children.
    Element {
        id: String,
        tag_type: String,
        props: serde_json::Value,
        children: Vec<RenderNode>,
    },
    /// Raw text passed through from the markup.
    Text(String),
}

impl RenderNode {
    /// The stable id, for element nodes.
    pub fn id(&self) -> Option<&str> {
        match self {
            Self::Element { id, .. } => Some(id),
            Self::Text(_) => None,
        }
    }

    /// The children, for element nodes.
    pub fn children(&self) -> &[RenderNode] {
        match self {
            Self::Element { children, .. } => children,
            Self::Text(_) => &[],
        }
    }
}

/// Recursion hook handed to views so they can render their children without
/// the view layer owning the session.
pub(crate) trait ChildRenderer {
    fn render_children_of(&self, element: ElementKey) -> Result<Vec<RenderNode>>;
}

/// Everything a view receives.
pub struct ViewContext<'a> {
    /// The configuration tree.
    pub tree: &'a ConfigTree,
    /// The node being rendered.
    pub node: &'a ConfigTreeNode,
    /// The fresh controller instance for this render.
    pub controller: &'a Arc<dyn TagController>,
    /// The annotation being edited.
    pub annotation: &'a Annotation,
    pub(crate) renderer: &'a dyn ChildRenderer,
}

impl ViewContext<'_> {
    /// Render this node's children in document order: text passes through,
    /// child elements with configuration nodes render recursively, anything
    /// else is skipped.
    pub fn render_children(&self) -> Result<Vec<RenderNode>> {
        self.renderer.render_children_of(self.node.element())
    }
}

/// A pure rendering function for one tag type.
pub type ViewFn = Arc<dyn for<'a> Fn(&ViewContext<'a>) -> Result<RenderNode> + Send + Sync>;

/// The one-view-per-tag-type table.
#[derive(Clone)]
pub struct ViewRegistry {
    views: HashMap<String, ViewFn>,
}

impl ViewRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self {
            views: HashMap::new(),
        }
    }

    /// The registry with the generic built-in view bound to every built-in
    /// tag type.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        for tag in [
            "view",
            "header",
            "labels",
            "label",
            "hypertextlabels",
            "choices",
            "choice",
            "textarea",
            "text",
            "hypertext",
        ] {
            // Registration over a fresh registry cannot collide.
            let _ = registry.define_view(tag, generic_view);
        }
        registry
    }

    /// Associate a view with a tag type. One view per type: a second
    /// definition for the same type is an error.
    pub fn define_view<F>(&mut self, type_name: &str, view: F) -> Result<()>
    where
        F: for<'a> Fn(&ViewContext<'a>) -> Result<RenderNode> + Send + Sync + 'static,
    {
        let key = type_name.to_ascii_lowercase();
        if self.views.contains_key(&key) {
            return Err(AnnotateError::DuplicateView(key));
        }
        self.views.insert(key, Arc::new(view));
        Ok(())
    }

    /// The view for a tag type.
    pub fn view(&self, type_name: &str) -> Option<ViewFn> {
        self.views.get(&type_name.to_ascii_lowercase()).cloned()
    }

    /// Whether a view is defined for the tag type.
    pub fn has_view(&self, type_name: &str) -> bool {
        self.views.contains_key(&type_name.to_ascii_lowercase())
    }
}

impl Default for ViewRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl std::fmt::Debug for ViewRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut types: Vec<&str> = self.views.keys().map(String::as_str).collect();
        types.sort_unstable();
        f.debug_struct("ViewRegistry").field("types", &types).finish()
    }
}

/// The built-in view: the node's identity, the controller's resolved props,
/// and the rendered children.
fn generic_view(ctx: &ViewContext<'_>) -> Result<RenderNode> {
    Ok(RenderNode::Element {
        id: ctx.node.id().to_string(),
        tag_type: ctx.node.tag_type().to_string(),
        props: ctx.controller.view_props(),
        children: ctx.render_children()?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_view_rejected() {
        let mut registry = ViewRegistry::new();
        registry.define_view("labels", generic_view).unwrap();

        let err = registry.define_view("Labels", generic_view).unwrap_err();
        assert!(matches!(err, AnnotateError::DuplicateView(t) if t == "labels"));
    }

    #[test]
    fn test_builtin_has_view_for_every_builtin_tag() {
        let registry = ViewRegistry::builtin();
        for tag in ["view", "labels", "label", "text", "hypertext", "textarea"] {
            assert!(registry.has_view(tag), "missing view for {tag}");
        }
        assert!(!registry.has_view("wizard"));
    }
}
