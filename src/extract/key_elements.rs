use scraper::{ElementRef, Html, Selector};
use std::collections::{BTreeMap, HashSet};
use tracing::warn;

use super::model::{ElementSnapshot, KeyElementIndex};

/// Logo heuristics, applied in order.
pub const LOGO_SELECTORS: &[&str] = &["img[alt*=logo]", ".logo", "#logo", "[class*=logo]"];

pub const NAVIGATION_SELECTORS: &[&str] = &["nav", ".nav", ".navigation", "[role=navigation]"];

pub const SEARCH_BOX_SELECTORS: &[&str] = &[
    "input[type=search]",
    "input[name*=search]",
    "input[placeholder*=search]",
    "input[name*=\"搜索\"]",
    "input[placeholder*=\"搜索\"]",
];

pub const BUTTON_SELECTORS: &[&str] = &[
    "button",
    "input[type=submit]",
    "input[type=button]",
    ".btn",
];

pub const FORM_SELECTORS: &[&str] = &["form"];

/// Run every category's heuristics against the full document.
///
/// Works on the parsed document rather than the pruned `DomNode` tree, so
/// elements below the depth bound are still found.
pub fn identify(document: &Html) -> KeyElementIndex {
    KeyElementIndex {
        logos: collect(document, LOGO_SELECTORS),
        navigation: collect(document, NAVIGATION_SELECTORS),
        search_boxes: collect(document, SEARCH_BOX_SELECTORS),
        buttons: collect(document, BUTTON_SELECTORS),
        forms: collect(document, FORM_SELECTORS),
    }
}

/// Matches of all selectors in order, each element reported once.
fn collect(document: &Html, selectors: &[&str]) -> Vec<ElementSnapshot> {
    let mut seen = HashSet::new();
    let mut snapshots = Vec::new();

    for selector_str in selectors {
        let selector = match Selector::parse(selector_str) {
            Ok(selector) => selector,
            Err(e) => {
                warn!("Invalid key element selector '{}': {:?}", selector_str, e);
                continue;
            }
        };

        for element in document.select(&selector) {
            if seen.insert(element.id()) {
                snapshots.push(snapshot(element));
            }
        }
    }

    snapshots
}

/// Copy an element's tag, attributes, text and markup.
pub fn snapshot(element: ElementRef<'_>) -> ElementSnapshot {
    let value = element.value();
    let attributes: BTreeMap<String, String> = value
        .attrs()
        .map(|(name, value)| (name.to_string(), value.to_string()))
        .collect();

    ElementSnapshot {
        tag: value.name().to_string(),
        id: value.id().map(str::to_string),
        class: value.attr("class").map(str::to_string),
        text: element.text().collect::<String>().trim().to_string(),
        html: element.html(),
        attributes,
    }
}
