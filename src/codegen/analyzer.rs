use serde::{Deserialize, Serialize};

use crate::extract::{DomNode, ElementSnapshot, PageStructure};

/// Most top-level elements a page may have and still count as centered
const CENTERED_MAX_CHILDREN: usize = 8;

/// Coarse page layout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LayoutClassification {
    HeaderBodyFooter,
    Centered,
    Sidebar,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CandidateKind {
    Logo,
    Navigation,
    SearchBox,
    Button,
    Form,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Medium,
}

/// A key element category proposed as a component
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentCandidate {
    #[serde(rename = "type")]
    pub kind: CandidateKind,
    pub source_elements: Vec<ElementSnapshot>,
    pub priority: Priority,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageAnalysis {
    pub layout: LayoutClassification,
    pub candidates: Vec<ComponentCandidate>,
}

impl PageAnalysis {
    pub fn candidate(&self, kind: CandidateKind) -> Option<&ComponentCandidate> {
        self.candidates.iter().find(|candidate| candidate.kind == kind)
    }
}

/// Classify the layout of `page` and list its component candidates
pub fn analyze(page: &PageStructure) -> PageAnalysis {
    PageAnalysis {
        layout: classify_layout(page),
        candidates: candidates(page),
    }
}

/// One candidate per non-empty key element category, in category order
pub fn candidates(page: &PageStructure) -> Vec<ComponentCandidate> {
    let index = &page.key_elements;
    let categories = [
        (CandidateKind::Logo, &index.logos, Priority::High),
        (CandidateKind::Navigation, &index.navigation, Priority::High),
        (CandidateKind::SearchBox, &index.search_boxes, Priority::High),
        (CandidateKind::Button, &index.buttons, Priority::Medium),
        (CandidateKind::Form, &index.forms, Priority::Medium),
    ];

    categories
        .into_iter()
        .filter(|(_, elements, _)| !elements.is_empty())
        .map(|(kind, elements, priority)| ComponentCandidate {
            kind,
            source_elements: elements.clone(),
            priority,
        })
        .collect()
}

pub fn classify_layout(page: &PageStructure) -> LayoutClassification {
    let root = &page.root;

    let has_header = contains(root, &|node| node.tag == "header" || node.class_contains("header"));
    let has_footer = contains(root, &|node| node.tag == "footer" || node.class_contains("footer"));
    if has_header && has_footer {
        return LayoutClassification::HeaderBodyFooter;
    }

    if contains(root, &|node| node.tag == "aside" || node.class_contains("sidebar")) {
        return LayoutClassification::Sidebar;
    }

    let keys = &page.key_elements;
    let focal = !keys.search_boxes.is_empty() || !keys.logos.is_empty();
    if focal && root.element_children().count() <= CENTERED_MAX_CHILDREN {
        return LayoutClassification::Centered;
    }

    LayoutClassification::Unknown
}

fn contains(node: &DomNode, predicate: &dyn Fn(&DomNode) -> bool) -> bool {
    node.element_children()
        .any(|child| predicate(child) || contains(child, predicate))
}
