use scraper::{Html, Selector};
use std::collections::HashSet;

use super::analyzer::{CandidateKind, ComponentCandidate, LayoutClassification, PageAnalysis};
use super::component::{ComponentKind, ComponentNode, ContainerRole, FormField, NavLink};
use super::options::{Fidelity, GenerationOptions};
use crate::extract::{ElementSnapshot, PageStructure};

pub const DEFAULT_LOGO_SRC: &str = "/logo.png";
pub const DEFAULT_LOGO_ALT: &str = "Logo";
const DEFAULT_PAGE_NAME: &str = "CapturedPage";
const DEFAULT_SEARCH_PLACEHOLDER: &str = "Search";
const DEFAULT_SEARCH_NAME: &str = "q";

/// Builds the component tree for an analyzed page
pub struct ComponentTreeBuilder<'a> {
    page: &'a PageStructure,
    analysis: &'a PageAnalysis,
    options: &'a GenerationOptions,
    names: HashSet<String>,
}

impl<'a> ComponentTreeBuilder<'a> {
    pub fn new(page: &'a PageStructure, analysis: &'a PageAnalysis, options: &'a GenerationOptions) -> Self {
        Self {
            page,
            analysis,
            options,
            names: HashSet::new(),
        }
    }

    /// Build a tree rooted at a Page node
    pub fn build(mut self) -> ComponentNode {
        let page_name = self.unique_name(&page_component_name(&self.page.title));
        let inline_styles = match self.options.fidelity {
            Fidelity::High => self.page.styles.inline_styles.clone(),
            _ => Vec::new(),
        };
        let page_kind = ComponentKind::Page {
            title: self.page.title.clone(),
            description: self.page.description.clone(),
            layout: self.analysis.layout,
            inline_styles,
        };

        let children = match self.analysis.layout {
            LayoutClassification::Centered => self.centered(),
            LayoutClassification::HeaderBodyFooter => self.header_body_footer(),
            LayoutClassification::Sidebar => self.sidebar(),
            LayoutClassification::Unknown => self.content(),
        };

        ComponentNode::new(page_name, page_kind).with_children(children)
    }

    /// Logo, then search box, then everything else by priority
    fn centered(&mut self) -> Vec<ComponentNode> {
        let mut order = vec![CandidateKind::Logo, CandidateKind::SearchBox];
        order.extend(
            self.by_priority()
                .into_iter()
                .filter(|kind| !matches!(kind, CandidateKind::Logo | CandidateKind::SearchBox)),
        );
        self.components(&order)
    }

    fn header_body_footer(&mut self) -> Vec<ComponentNode> {
        let header = self.container(ContainerRole::Header, &[CandidateKind::Logo, CandidateKind::Navigation]);
        let main = self.container(
            ContainerRole::Main,
            &[CandidateKind::SearchBox, CandidateKind::Form, CandidateKind::Button],
        );
        let footer = self.container(ContainerRole::Footer, &[]);
        vec![header, main, footer]
    }

    fn sidebar(&mut self) -> Vec<ComponentNode> {
        let sidebar = self.container(ContainerRole::Sidebar, &[CandidateKind::Navigation]);
        let main = self.container(
            ContainerRole::Main,
            &[CandidateKind::Logo, CandidateKind::SearchBox, CandidateKind::Form, CandidateKind::Button],
        );
        vec![sidebar, main]
    }

    fn content(&mut self) -> Vec<ComponentNode> {
        let order = self.by_priority();
        vec![self.container(ContainerRole::Content, &order)]
    }

    fn container(&mut self, role: ContainerRole, order: &[CandidateKind]) -> ComponentNode {
        let name = self.unique_name(role.component_name());
        let children = self.components(order);
        ComponentNode::new(name, ComponentKind::Container { role }).with_children(children)
    }

    fn components(&mut self, order: &[CandidateKind]) -> Vec<ComponentNode> {
        order
            .iter()
            .filter_map(|kind| self.analysis.candidate(*kind))
            .map(|candidate| self.component(candidate))
            .collect()
    }

    fn by_priority(&self) -> Vec<CandidateKind> {
        let mut candidates: Vec<&ComponentCandidate> = self.analysis.candidates.iter().collect();
        candidates.sort_by_key(|candidate| candidate.priority);
        candidates.into_iter().map(|candidate| candidate.kind).collect()
    }

    fn component(&mut self, candidate: &ComponentCandidate) -> ComponentNode {
        let elements = &candidate.source_elements;
        let (base_name, kind) = match candidate.kind {
            CandidateKind::Logo => ("Logo", logo_props(elements.first())),
            CandidateKind::Navigation => ("Navigation", navigation_props(elements)),
            CandidateKind::SearchBox => ("SearchBox", search_box_props(elements.first())),
            CandidateKind::Button => ("Buttons", button_props(elements)),
            CandidateKind::Form => ("Form", form_props(elements.first())),
        };
        let name = self.unique_name(base_name);
        ComponentNode::new(name, kind)
    }

    fn unique_name(&mut self, base: &str) -> String {
        let mut name = base.to_string();
        let mut suffix = 2;
        while !self.names.insert(name.clone()) {
            name = format!("{}{}", base, suffix);
            suffix += 1;
        }
        name
    }
}

/// PascalCase component name derived from the page title
pub fn page_component_name(title: &str) -> String {
    let pascal: String = title
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|word| !word.is_empty())
        .take(4)
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_ascii_uppercase().to_string() + &chars.as_str().to_ascii_lowercase(),
                None => String::new(),
            }
        })
        .collect();

    match pascal.chars().next() {
        Some(first) if first.is_ascii_alphabetic() => format!("{}Page", pascal),
        _ => DEFAULT_PAGE_NAME.to_string(),
    }
}

fn logo_props(element: Option<&ElementSnapshot>) -> ComponentKind {
    let image = element.and_then(|element| {
        if element.tag == "img" {
            Some((
                element.attr("src").map(str::to_string),
                element.attr("alt").map(str::to_string),
            ))
        } else {
            first_attrs(&element.html, "img", &["src", "alt"]).map(|mut values| {
                let alt = values.pop().flatten();
                let src = values.pop().flatten();
                (src, alt)
            })
        }
    });
    let (src, alt) = image.unwrap_or((None, None));

    ComponentKind::Logo {
        src: non_empty(src).unwrap_or_else(|| DEFAULT_LOGO_SRC.to_string()),
        alt: non_empty(alt).unwrap_or_else(|| DEFAULT_LOGO_ALT.to_string()),
    }
}

fn navigation_props(elements: &[ElementSnapshot]) -> ComponentKind {
    let selector = Selector::parse("a[href]").ok();
    let mut links = Vec::new();

    if let Some(selector) = selector {
        for element in elements {
            let fragment = Html::parse_fragment(&element.html);
            for anchor in fragment.select(&selector) {
                let label = anchor.text().collect::<String>().trim().to_string();
                let href = anchor.value().attr("href").unwrap_or("#").to_string();
                if !label.is_empty() && !links.iter().any(|link: &NavLink| link.href == href && link.label == label) {
                    links.push(NavLink { label, href });
                }
            }
        }
    }

    ComponentKind::Navigation { links }
}

fn search_box_props(element: Option<&ElementSnapshot>) -> ComponentKind {
    let placeholder = element.and_then(|element| element.attr("placeholder")).map(str::to_string);
    let name = element.and_then(|element| element.attr("name")).map(str::to_string);

    ComponentKind::SearchBox {
        placeholder: non_empty(placeholder).unwrap_or_else(|| DEFAULT_SEARCH_PLACEHOLDER.to_string()),
        name: non_empty(name).unwrap_or_else(|| DEFAULT_SEARCH_NAME.to_string()),
        button_text: "Search".to_string(),
    }
}

fn button_props(elements: &[ElementSnapshot]) -> ComponentKind {
    let mut labels: Vec<String> = Vec::new();
    for element in elements {
        let label = if element.text.is_empty() {
            element.attr("value").unwrap_or("").trim().to_string()
        } else {
            element.text.clone()
        };
        if !label.is_empty() && !labels.contains(&label) {
            labels.push(label);
        }
    }

    ComponentKind::Buttons { labels }
}

fn form_props(element: Option<&ElementSnapshot>) -> ComponentKind {
    let action = element.and_then(|element| element.attr("action")).unwrap_or("#").to_string();
    let method = element
        .and_then(|element| element.attr("method"))
        .unwrap_or("get")
        .to_lowercase();

    let mut fields = Vec::new();
    if let (Some(element), Ok(selector)) = (element, Selector::parse("input[name], textarea[name], select[name]")) {
        let fragment = Html::parse_fragment(&element.html);
        for input in fragment.select(&selector) {
            let value = input.value();
            let input_type = value.attr("type").unwrap_or("text").to_lowercase();
            if matches!(input_type.as_str(), "hidden" | "submit" | "button") {
                continue;
            }
            fields.push(FormField {
                name: value.attr("name").unwrap_or_default().to_string(),
                input_type,
                placeholder: value.attr("placeholder").unwrap_or_default().to_string(),
            });
        }
    }

    ComponentKind::Form { action, method, fields }
}

/// Attribute values of the first `tag` element inside `html`
fn first_attrs(html: &str, tag: &str, names: &[&str]) -> Option<Vec<Option<String>>> {
    let selector = Selector::parse(tag).ok()?;
    let fragment = Html::parse_fragment(html);
    let element = fragment.select(&selector).next()?;
    Some(
        names
            .iter()
            .map(|name| element.value().attr(name).map(str::to_string))
            .collect(),
    )
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codegen::analyzer::analyze;
    use crate::extract::PageExtractor;

    fn build(html: &str, options: &GenerationOptions) -> ComponentNode {
        let page = PageExtractor::default().extract(html);
        let analysis = analyze(&page);
        ComponentTreeBuilder::new(&page, &analysis, options).build()
    }

    fn names(node: &ComponentNode) -> Vec<String> {
        node.children.iter().map(|child| child.name.clone()).collect()
    }

    #[test]
    fn test_centered_orders_logo_then_search() {
        let tree = build(
            r#"<html><head><title>Example Search</title></head><body>
                <button>Lucky</button>
                <input placeholder="search the web" name="query">
                <div class="logo">Brand</div>
            </body></html>"#,
            &GenerationOptions::default(),
        );

        assert_eq!(tree.name, "ExampleSearchPage");
        assert_eq!(names(&tree), vec!["Logo", "SearchBox", "Buttons"]);
        assert_eq!(
            tree.children[0].kind,
            ComponentKind::Logo {
                src: DEFAULT_LOGO_SRC.to_string(),
                alt: DEFAULT_LOGO_ALT.to_string(),
            }
        );
        assert_eq!(
            tree.children[1].kind,
            ComponentKind::SearchBox {
                placeholder: "search the web".to_string(),
                name: "query".to_string(),
                button_text: "Search".to_string(),
            }
        );
    }

    #[test]
    fn test_header_body_footer_containers() {
        let tree = build(
            r#"<body>
                <header><img class="logo" src="/brand.svg" alt="Brand"><nav><a href="/a">A</a><a href="/b">B</a></nav></header>
                <main><form action="/signup" method="POST"><input name="email" type="email"><input type="submit"></form></main>
                <footer></footer>
            </body>"#,
            &GenerationOptions::default(),
        );

        assert_eq!(names(&tree), vec!["Header", "Main", "Footer"]);
        assert_eq!(names(&tree.children[0]), vec!["Logo", "Navigation"]);

        match &tree.children[0].children[1].kind {
            ComponentKind::Navigation { links } => {
                assert_eq!(links.len(), 2);
                assert_eq!(links[1].href, "/b");
            }
            other => panic!("unexpected {:?}", other),
        }
        match &tree.children[1].children.iter().find(|c| c.name == "Form").unwrap().kind {
            ComponentKind::Form { action, method, fields } => {
                assert_eq!(action, "/signup");
                assert_eq!(method, "post");
                assert_eq!(fields.len(), 1);
                assert_eq!(fields[0].input_type, "email");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_unknown_layout_builds_single_container() {
        let tree = build("<body><p>Nothing to see</p></body>", &GenerationOptions::default());

        assert_eq!(tree.name, "CapturedPage");
        assert_eq!(tree.children.len(), 1);
        assert!(tree.children[0].children.is_empty());
    }

    #[test]
    fn test_high_fidelity_keeps_inline_styles() {
        let html = "<html><head><style>body { margin: 0; }</style></head><body></body></html>";
        let options = GenerationOptions {
            fidelity: Fidelity::High,
            ..GenerationOptions::default()
        };

        match build(html, &options).kind {
            ComponentKind::Page { inline_styles, .. } => assert_eq!(inline_styles.len(), 1),
            other => panic!("unexpected {:?}", other),
        }
        match build(html, &GenerationOptions::default()).kind {
            ComponentKind::Page { inline_styles, .. } => assert!(inline_styles.is_empty()),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_page_component_name() {
        assert_eq!(page_component_name("Google"), "GooglePage");
        assert_eq!(page_component_name("my cool-site | home"), "MyCoolSiteHomePage");
        assert_eq!(page_component_name(""), "CapturedPage");
        assert_eq!(page_component_name("404"), "CapturedPage");
    }
}
