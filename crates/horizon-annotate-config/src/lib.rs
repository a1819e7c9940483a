//! Declarative labeling configuration parsing for Horizon Annotate.
//!
//! A labeling interface is described by an XML-like configuration string:
//!
//! ```xml
//! <View>
//!   <Labels name="sentiment" toName="article" choice="single">
//!     <Label value="Positive"/>
//!     <Label value="Negative"/>
//!   </Labels>
//!   <Text name="article" value="$text"/>
//! </View>
//! ```
//!
//! This crate turns that string into a typed tree:
//!
//! - [`MarkupDocument`] — an arena-backed document model preserving every
//!   element and text node in document order
//! - [`ConfigTree`] / [`ConfigTreeNode`] — one node per element whose type is
//!   found in the registered [`TagSet`]; unknown tags are logged and skipped
//!   while their descendants are still visited
//! - [`ConfigAttributes`] — the per-node lazily-evaluated attribute map, with
//!   optional named parsers
//! - [`AttributeDescriptor`] / [`AttributeSchema`] — the typed, validated
//!   attribute layer resolved once at controller construction
//!
//! Tag names and attribute names are matched case-insensitively; both are
//! lowercased at parse time.

mod attribute;
mod attributes;
mod error;
mod markup;
mod registry;
mod tree;

pub use attribute::{
    AttrValue, AttributeDescriptor, AttributeSchema, ParseContext, ResolvedAttributes,
};
pub use attributes::ConfigAttributes;
pub use error::{Error, Result};
pub use markup::{Element, ElementKey, MarkupChild, MarkupDocument};
pub use registry::{TagKind, TagSet};
pub use tree::{ConfigTree, ConfigTreeNode};

/// The designated root container tag for labeling configurations.
pub const ROOT_TAG: &str = "view";
