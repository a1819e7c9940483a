//! Arena-backed markup document model.
//!
//! Configuration markup is parsed once with a streaming `quick-xml` reader
//! into a [`MarkupDocument`]: a slotmap arena of [`Element`]s plus interleaved
//! text, with parent back-references. Every element and text node survives
//! parsing — including elements whose tag type is unknown to the engine — so
//! that the render layer can pass raw text through and still walk the
//! descendants of unrecognized wrappers.
//!
//! Tag names keep their raw spelling for diagnostics; the lowercased form is
//! precomputed as `tag_type`. Attribute names are lowercased at parse time,
//! which is the only form the rest of the engine ever sees.

use std::collections::HashMap;

use quick_xml::events::Event;
use quick_xml::Reader;
use slotmap::{new_key_type, SlotMap};

use crate::error::{Error, Result};

new_key_type! {
    /// A stable key for one element in a [`MarkupDocument`] arena.
    ///
    /// Keys are only meaningful for the document that produced them and do
    /// not survive the document being dropped.
    pub struct ElementKey;
}

/// One child slot of an element, in document order.
#[derive(Debug, Clone, PartialEq)]
pub enum MarkupChild {
    /// A child element.
    Element(ElementKey),
    /// A run of raw text (or CDATA) content.
    Text(String),
}

/// One parsed markup element.
#[derive(Debug, Clone)]
pub struct Element {
    /// Tag name as written in the source.
    name: String,
    /// Lowercased tag name, used for all type lookups.
    tag_type: String,
    /// Attributes with lowercased names. Later duplicates win.
    attributes: HashMap<String, String>,
    /// Children in document order.
    children: Vec<MarkupChild>,
    /// Parent element, `None` for the root.
    parent: Option<ElementKey>,
}

impl Element {
    /// Tag name as written in the source.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Lowercased tag name.
    pub fn tag_type(&self) -> &str {
        &self.tag_type
    }

    /// Get an attribute value by (case-insensitive) name.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    /// The full lowercased-name attribute map.
    pub fn attributes(&self) -> &HashMap<String, String> {
        &self.attributes
    }

    /// Children in document order.
    pub fn children(&self) -> &[MarkupChild] {
        &self.children
    }

    /// Child element keys only, in document order.
    pub fn child_elements(&self) -> impl Iterator<Item = ElementKey> + '_ {
        self.children.iter().filter_map(|child| match child {
            MarkupChild::Element(key) => Some(*key),
            MarkupChild::Text(_) => None,
        })
    }

    /// Parent element, `None` for the root.
    pub fn parent(&self) -> Option<ElementKey> {
        self.parent
    }

    /// Concatenated text content of direct text children.
    pub fn text(&self) -> String {
        let mut result = String::new();
        for child in &self.children {
            if let MarkupChild::Text(t) = child {
                result.push_str(t);
            }
        }
        result
    }
}

/// A fully parsed markup document.
pub struct MarkupDocument {
    elements: SlotMap<ElementKey, Element>,
    root: ElementKey,
}

impl MarkupDocument {
    /// Parse a markup string into a document.
    ///
    /// Fails on syntax errors, mismatched end tags, or an empty document.
    pub fn parse(source: &str) -> Result<Self> {
        let mut reader = Reader::from_str(source);
        reader.config_mut().trim_text(true);

        let mut elements: SlotMap<ElementKey, Element> = SlotMap::with_key();
        let mut stack: Vec<ElementKey> = Vec::new();
        let mut root: Option<ElementKey> = None;

        loop {
            let position = reader.buffer_position() as u64;
            match reader.read_event() {
                Ok(Event::Start(start)) => {
                    let key = push_element(&mut elements, &stack, &start, root.is_some())
                        .map_err(|message| Error::parse(message, position))?;
                    if root.is_none() {
                        root = Some(key);
                    }
                    stack.push(key);
                }
                Ok(Event::Empty(start)) => {
                    let key = push_element(&mut elements, &stack, &start, root.is_some())
                        .map_err(|message| Error::parse(message, position))?;
                    if root.is_none() {
                        root = Some(key);
                    }
                }
                Ok(Event::End(_)) => {
                    stack.pop();
                }
                Ok(Event::Text(text)) => {
                    let content = text
                        .unescape()
                        .map_err(|e| Error::parse(e.to_string(), position))?
                        .to_string();
                    push_text(&mut elements, &stack, content);
                }
                Ok(Event::CData(cdata)) => {
                    let content = String::from_utf8_lossy(&cdata).to_string();
                    push_text(&mut elements, &stack, content);
                }
                // Declarations, comments, processing instructions and DOCTYPE
                // carry nothing the engine needs.
                Ok(Event::Decl(_))
                | Ok(Event::Comment(_))
                | Ok(Event::PI(_))
                | Ok(Event::DocType(_)) => {}
                Ok(Event::Eof) => break,
                Err(e) => return Err(Error::parse(e.to_string(), position)),
            }
        }

        let root = root.ok_or(Error::EmptyDocument)?;
        Ok(Self { elements, root })
    }

    /// The root element key.
    pub fn root(&self) -> ElementKey {
        self.root
    }

    /// Look up an element by key.
    pub fn element(&self, key: ElementKey) -> Option<&Element> {
        self.elements.get(key)
    }

    /// Number of elements in the document.
    pub fn element_count(&self) -> usize {
        self.elements.len()
    }

    /// Every element key in document (pre-)order, root first.
    pub fn document_order(&self) -> Vec<ElementKey> {
        let mut result = Vec::with_capacity(self.elements.len());
        self.collect_preorder(self.root, &mut result);
        result
    }

    fn collect_preorder(&self, key: ElementKey, result: &mut Vec<ElementKey>) {
        result.push(key);
        if let Some(element) = self.elements.get(key) {
            for child in element.child_elements() {
                self.collect_preorder(child, result);
            }
        }
    }
}

impl std::fmt::Debug for MarkupDocument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MarkupDocument")
            .field("elements", &self.elements.len())
            .finish()
    }
}

/// Create an element from a start tag and attach it to the open element stack.
///
/// Returns an error message for markup with content outside the root element.
fn push_element(
    elements: &mut SlotMap<ElementKey, Element>,
    stack: &[ElementKey],
    start: &quick_xml::events::BytesStart<'_>,
    root_seen: bool,
) -> std::result::Result<ElementKey, String> {
    let parent = stack.last().copied();
    if parent.is_none() && root_seen {
        return Err("multiple root elements".to_string());
    }

    let name = String::from_utf8_lossy(start.name().as_ref()).to_string();
    let mut attributes = HashMap::new();
    for attr in start.attributes() {
        let attr = attr.map_err(|e| e.to_string())?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).to_ascii_lowercase();
        let value = String::from_utf8_lossy(&attr.value).to_string();
        attributes.insert(key, value);
    }

    let element = Element {
        tag_type: name.to_ascii_lowercase(),
        name,
        attributes,
        children: Vec::new(),
        parent,
    };
    let key = elements.insert(element);

    if let Some(parent_key) = parent {
        if let Some(parent_element) = elements.get_mut(parent_key) {
            parent_element.children.push(MarkupChild::Element(key));
        }
    }
    Ok(key)
}

fn push_text(elements: &mut SlotMap<ElementKey, Element>, stack: &[ElementKey], content: String) {
    if content.is_empty() {
        return;
    }
    if let Some(&parent) = stack.last() {
        if let Some(element) = elements.get_mut(parent) {
            element.children.push(MarkupChild::Text(content));
        }
    }
}
