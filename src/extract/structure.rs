use regex::Regex;
use scraper::{ElementRef, Html, Node, Selector};
use std::sync::OnceLock;
use tracing::debug;

use super::key_elements;
use super::model::{DomNode, PageStructure, ResourceRefs, StyleInfo, StylesheetRef};

/// Default bound on the depth of the normalized tree.
pub const DEFAULT_MAX_DEPTH: usize = 10;

/// Attributes kept on `DomNode`s besides `data-*`.
const ALLOWED_ATTRIBUTES: &[&str] = &["id", "class", "href", "src", "alt", "title"];

/// Elements never copied into the normalized tree.
const SKIPPED_TAGS: &[&str] = &["script", "style", "noscript", "template"];

/// Parses raw HTML into a `PageStructure`.
#[derive(Debug, Clone)]
pub struct PageExtractor {
    max_depth: usize,
}

impl Default for PageExtractor {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_DEPTH)
    }
}

impl PageExtractor {
    /// Create an extractor that prunes the tree below `max_depth` levels.
    pub fn new(max_depth: usize) -> Self {
        Self {
            max_depth: max_depth.max(1),
        }
    }

    /// Extract title, metadata, the bounded body tree, styles, key elements
    /// and asset references from `html`.
    pub fn extract(&self, html: &str) -> PageStructure {
        let document = Html::parse_document(html);

        let root = first_match(&document, "body")
            .map(|body| build_node(body, 1, self.max_depth))
            .unwrap_or_else(|| DomNode::element("body"));

        let structure = PageStructure {
            title: first_match(&document, "title")
                .map(|title| title.text().collect::<String>().trim().to_string())
                .unwrap_or_default(),
            description: meta_content(&document, "description"),
            keywords: meta_content(&document, "keywords"),
            root,
            styles: extract_styles(&document),
            key_elements: key_elements::identify(&document),
            resources: collect_resources(&document),
        };

        debug!(
            title = %structure.title,
            depth = structure.root.depth(),
            stylesheets = structure.styles.stylesheets.len(),
            key_elements = structure.key_elements.total(),
            "Extracted page structure"
        );

        structure
    }
}

/// Build a `DomNode` for `element`, which sits at `depth` (the body is 1).
///
/// Children that would land deeper than `max_depth` are dropped whole.
pub fn build_node(element: ElementRef<'_>, depth: usize, max_depth: usize) -> DomNode {
    let value = element.value();
    let mut node = DomNode::element(value.name());
    node.id = value.id().map(str::to_string);
    node.class = value.attr("class").map(str::to_string);
    node.attributes = value
        .attrs()
        .filter(|(name, _)| is_allowed_attribute(name))
        .map(|(name, value)| (name.to_string(), value.to_string()))
        .collect();

    if depth >= max_depth {
        return node;
    }

    for child in element.children() {
        match child.value() {
            Node::Element(child_element) => {
                if SKIPPED_TAGS.contains(&child_element.name()) {
                    continue;
                }
                if let Some(child_ref) = ElementRef::wrap(child) {
                    node.children.push(build_node(child_ref, depth + 1, max_depth));
                }
            }
            Node::Text(text) => {
                let trimmed = text.trim();
                if !trimmed.is_empty() {
                    node.children.push(DomNode::text_node(trimmed));
                }
            }
            _ => {}
        }
    }

    node
}

fn is_allowed_attribute(name: &str) -> bool {
    ALLOWED_ATTRIBUTES.contains(&name) || name.starts_with("data-")
}

fn first_match<'a>(document: &'a Html, selector: &str) -> Option<ElementRef<'a>> {
    let selector = Selector::parse(selector).ok()?;
    document.select(&selector).next()
}

fn select_all<'a>(document: &'a Html, selector: &str) -> Vec<ElementRef<'a>> {
    match Selector::parse(selector) {
        Ok(selector) => document.select(&selector).collect(),
        Err(_) => Vec::new(),
    }
}

/// Content of `<meta name="{name}">`, matched case-insensitively.
fn meta_content(document: &Html, name: &str) -> String {
    select_all(document, "meta[name]")
        .into_iter()
        .find(|meta| {
            meta.value()
                .attr("name")
                .map(|value| value.eq_ignore_ascii_case(name))
                .unwrap_or(false)
        })
        .and_then(|meta| meta.value().attr("content"))
        .map(|content| content.trim().to_string())
        .unwrap_or_default()
}

fn extract_styles(document: &Html) -> StyleInfo {
    let stylesheets = select_all(document, "link[rel~=stylesheet][href]")
        .into_iter()
        .filter_map(|link| {
            let href = link.value().attr("href")?.trim();
            (!href.is_empty()).then(|| StylesheetRef {
                href: href.to_string(),
                media: link.value().attr("media").map(str::to_string),
            })
        })
        .collect();

    let inline_styles = select_all(document, "style")
        .into_iter()
        .map(|style| style.text().collect::<String>())
        .filter(|text| !text.trim().is_empty())
        .collect();

    StyleInfo {
        stylesheets,
        inline_styles,
    }
}

fn font_url_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| {
            Regex::new(r#"url\(\s*['"]?([^'")\s]+\.(?:woff2?|ttf|otf|eot)(?:[?#][^'")\s]*)?)['"]?\s*\)"#).ok()
        })
        .as_ref()
}

/// Walk the whole document (not the pruned tree) for asset references.
fn collect_resources(document: &Html) -> ResourceRefs {
    let mut resources = ResourceRefs::default();

    for img in select_all(document, "img[src]") {
        push_reference(&mut resources.images, img.value().attr("src"));
    }

    for script in select_all(document, "script[src]") {
        push_reference(&mut resources.scripts, script.value().attr("src"));
    }

    for link in select_all(document, "link[rel~=preload][as=font][href]") {
        push_reference(&mut resources.fonts, link.value().attr("href"));
    }

    if let Some(pattern) = font_url_pattern() {
        for style in select_all(document, "style") {
            let css = style.text().collect::<String>();
            for captures in pattern.captures_iter(&css) {
                push_reference(&mut resources.fonts, captures.get(1).map(|m| m.as_str()));
            }
        }
    }

    resources
}

fn push_reference(list: &mut Vec<String>, reference: Option<&str>) {
    let Some(reference) = reference.map(str::trim) else {
        return;
    };
    if reference.is_empty() || reference.starts_with("data:") {
        return;
    }
    if !list.iter().any(|existing| existing == reference) {
        list.push(reference.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"<!DOCTYPE html>
<html>
<head>
    <title> Example Home </title>
    <meta name="Description" content="An example page">
    <link rel="stylesheet" href="/css/main.css" media="screen">
    <style>body { margin: 0; } @font-face { src: url('/fonts/brand.woff2'); }</style>
    <script src="/js/app.js"></script>
</head>
<body>
    <div id="wrap" class="page" onclick="steal()" data-role="shell" style="color:red">
        <img class="logo" src="/img/logo.png" alt="Example">
        <input placeholder="search" name="q">
        <script>inline()</script>
    </div>
</body>
</html>"#;

    #[test]
    fn test_extracts_metadata() {
        let page = PageExtractor::default().extract(SAMPLE);

        assert_eq!(page.title, "Example Home");
        assert_eq!(page.description, "An example page");
        assert_eq!(page.keywords, "");
    }

    #[test]
    fn test_attributes_are_allow_listed() {
        let page = PageExtractor::default().extract(SAMPLE);
        let wrap = &page.root.children[0];

        assert_eq!(wrap.tag, "div");
        assert_eq!(wrap.id.as_deref(), Some("wrap"));
        assert_eq!(wrap.class.as_deref(), Some("page"));
        assert_eq!(wrap.attributes.get("data-role").map(String::as_str), Some("shell"));
        assert!(!wrap.attributes.contains_key("onclick"));
        assert!(!wrap.attributes.contains_key("style"));
    }

    #[test]
    fn test_skips_scripts_in_tree() {
        let page = PageExtractor::default().extract(SAMPLE);
        let wrap = &page.root.children[0];
        let tags: Vec<&str> = wrap.children.iter().map(|c| c.tag.as_str()).collect();

        assert_eq!(tags, vec!["img", "input"]);
    }

    #[test]
    fn test_extracts_styles() {
        let page = PageExtractor::default().extract(SAMPLE);

        assert_eq!(page.styles.stylesheets.len(), 1);
        assert_eq!(page.styles.stylesheets[0].href, "/css/main.css");
        assert_eq!(page.styles.stylesheets[0].media.as_deref(), Some("screen"));
        assert_eq!(page.styles.inline_styles.len(), 1);
        assert!(page.styles.inline_styles[0].contains("margin: 0"));
    }

    #[test]
    fn test_collects_resources() {
        let page = PageExtractor::default().extract(SAMPLE);

        assert_eq!(page.resources.images, vec!["/img/logo.png"]);
        assert_eq!(page.resources.scripts, vec!["/js/app.js"]);
        assert_eq!(page.resources.fonts, vec!["/fonts/brand.woff2"]);
    }

    #[test]
    fn test_missing_metadata_is_empty() {
        let page = PageExtractor::default().extract("<p>bare</p>");

        assert_eq!(page.title, "");
        assert_eq!(page.description, "");
        assert_eq!(page.root.tag, "body");
        assert_eq!(page.root.children[0].tag, "p");
    }

    fn nested(levels: usize) -> String {
        let mut html = String::from("<html><body>");
        for _ in 0..levels {
            html.push_str("<div>");
        }
        html.push_str("<button class=\"btn\">deep</button>");
        for _ in 0..levels {
            html.push_str("</div>");
        }
        html.push_str("</body></html>");
        html
    }

    #[test]
    fn test_depth_bound_prunes_deep_nesting() {
        let page = PageExtractor::new(DEFAULT_MAX_DEPTH).extract(&nested(200));

        assert_eq!(page.root.depth(), DEFAULT_MAX_DEPTH);
    }

    #[test]
    fn test_depth_bound_is_a_parameter() {
        let page = PageExtractor::new(4).extract(&nested(50));

        assert_eq!(page.root.depth(), 4);
    }

    #[test]
    fn test_key_elements_survive_pruning() {
        let page = PageExtractor::new(3).extract(&nested(30));

        assert_eq!(page.key_elements.buttons.len(), 1);
        assert_eq!(page.key_elements.buttons[0].text, "deep");
    }
}
