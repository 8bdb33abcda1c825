use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Normalized view of a captured page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageStructure {
    /// Contents of `<title>` (empty when absent)
    pub title: String,

    /// `<meta name="description">` content (empty when absent)
    pub description: String,

    /// `<meta name="keywords">` content (empty when absent)
    pub keywords: String,

    /// Depth-bounded tree rooted at `<body>`
    pub root: DomNode,

    /// External stylesheet references and inline style blocks
    pub styles: StyleInfo,

    /// Heuristically identified UI elements
    pub key_elements: KeyElementIndex,

    /// Asset references gathered from the full, unpruned document
    #[serde(default)]
    pub resources: ResourceRefs,
}

/// One element (or text run) in the normalized tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DomNode {
    pub tag: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class: Option<String>,

    /// Allow-listed attributes only (id, class, href, src, alt, title, data-*)
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<DomNode>,

    /// Set only on text nodes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl DomNode {
    /// Tag used for text nodes.
    pub const TEXT_TAG: &'static str = "#text";

    /// Create an element node with no attributes or children.
    pub fn element(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            id: None,
            class: None,
            attributes: BTreeMap::new(),
            children: Vec::new(),
            text: None,
        }
    }

    /// Create a text node.
    pub fn text_node(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Self::element(Self::TEXT_TAG)
        }
    }

    pub fn is_text(&self) -> bool {
        self.tag == Self::TEXT_TAG
    }

    /// Number of levels in this subtree; a leaf has depth 1.
    pub fn depth(&self) -> usize {
        1 + self.children.iter().map(DomNode::depth).max().unwrap_or(0)
    }

    /// Element children, skipping text nodes.
    pub fn element_children(&self) -> impl Iterator<Item = &DomNode> {
        self.children.iter().filter(|child| !child.is_text())
    }

    /// Whether the class attribute contains `needle` (case-insensitive).
    pub fn class_contains(&self, needle: &str) -> bool {
        self.class
            .as_deref()
            .map(|class| class.to_lowercase().contains(needle))
            .unwrap_or(false)
    }
}

/// A `<link rel="stylesheet">` reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StylesheetRef {
    pub href: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StyleInfo {
    pub stylesheets: Vec<StylesheetRef>,

    /// Verbatim text of every `<style>` block, in document order
    pub inline_styles: Vec<String>,
}

/// Full-fidelity copy of a key element, independent of the pruned tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementSnapshot {
    pub tag: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class: Option<String>,
    /// Trimmed text content
    pub text: String,
    /// Serialized outer markup
    pub html: String,
    pub attributes: BTreeMap<String, String>,
}

impl ElementSnapshot {
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyElementIndex {
    pub logos: Vec<ElementSnapshot>,
    pub navigation: Vec<ElementSnapshot>,
    pub search_boxes: Vec<ElementSnapshot>,
    pub buttons: Vec<ElementSnapshot>,
    pub forms: Vec<ElementSnapshot>,
}

impl KeyElementIndex {
    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    pub fn total(&self) -> usize {
        self.logos.len()
            + self.navigation.len()
            + self.search_boxes.len()
            + self.buttons.len()
            + self.forms.len()
    }
}

/// Raw (unresolved) asset references found anywhere in the document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceRefs {
    pub images: Vec<String>,
    pub scripts: Vec<String>,
    pub fonts: Vec<String>,
}
