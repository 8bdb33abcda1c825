use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

use super::analyzer::LayoutClassification;
use super::component::{ComponentKind, ComponentNode, ContainerRole};
use super::options::{Componentization, Fidelity, GenerationOptions, Interactivity, OutputFormat, StyleHandling};
use super::templates::{self, render};

/// Code and styles for one component
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedComponent {
    pub name: String,
    pub code: String,
    pub styles: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedCode {
    pub format: OutputFormat,
    pub components: Vec<GeneratedComponent>,
    /// Barrel file re-exporting every component
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<String>,
}

/// `SearchBox` -> `search-box`
pub fn to_kebab_case(name: &str) -> String {
    static BOUNDARY: OnceLock<Option<Regex>> = OnceLock::new();
    match BOUNDARY.get_or_init(|| Regex::new("([a-z])([A-Z])").ok()) {
        Some(boundary) => boundary.replace_all(name, "$1-$2").to_lowercase(),
        None => name.to_lowercase(),
    }
}

/// `SearchBox` -> `searchBox`
fn to_camel_case(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_ascii_lowercase().to_string() + chars.as_str(),
        None => String::new(),
    }
}

/// Escape text for use in markup, including JSX and Vue interpolation braces
fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            '{' => escaped.push_str("&#123;"),
            '}' => escaped.push_str("&#125;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Escape text for a single-quoted JavaScript string
fn escape_js(text: &str) -> String {
    text.replace('\\', "\\\\").replace('\'', "\\'").replace('\n', "\\n")
}

/// Escape CSS for a JavaScript template literal
fn escape_template_literal(text: &str) -> String {
    text.replace('\\', "\\\\").replace('`', "\\`").replace("${", "\\${")
}

fn indent(lines: &[String], level: usize) -> String {
    let pad = "  ".repeat(level);
    lines
        .iter()
        .map(|line| format!("{}{}", pad, line))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Component state and event handlers collected while rendering markup
#[derive(Debug, Default)]
struct Logic {
    state: Vec<String>,
    handlers: Vec<Handler>,
}

#[derive(Debug)]
struct Handler {
    name: String,
    param: &'static str,
    body: Vec<String>,
}

impl Logic {
    fn is_empty(&self) -> bool {
        self.state.is_empty() && self.handlers.is_empty()
    }
}

/// Renders a component tree to source code in one output format
pub struct CodeGenerator<'a> {
    options: &'a GenerationOptions,
}

impl<'a> CodeGenerator<'a> {
    pub fn new(options: &'a GenerationOptions) -> Self {
        Self { options }
    }

    pub fn generate(&self, root: &ComponentNode) -> GeneratedCode {
        let format = self.options.format;

        if format == OutputFormat::Html {
            return GeneratedCode {
                format,
                components: vec![self.html_document(root)],
                index: None,
            };
        }

        match self.options.componentization {
            Componentization::Single => GeneratedCode {
                format,
                components: vec![self.component(root, true)],
                index: None,
            },
            Componentization::PerComponent => {
                let nodes = root.walk();
                let components = nodes.iter().map(|node| self.component(node, false)).collect();
                let entry = match format {
                    OutputFormat::Vue => templates::VUE_BARREL_ENTRY,
                    _ => templates::REACT_BARREL_ENTRY,
                };
                let index = nodes
                    .iter()
                    .map(|node| render(entry, &[("componentName", node.name.as_str())]))
                    .collect::<String>();
                GeneratedCode {
                    format,
                    components,
                    index: Some(index),
                }
            }
        }
    }

    /// Whole page as one self-contained document
    fn html_document(&self, root: &ComponentNode) -> GeneratedComponent {
        let mut logic = Logic::default();
        let body = indent(&self.markup(root, true, &mut logic), 1);
        let styles: String = root.walk().iter().map(|node| self.styles(node)).collect();

        let (title, description) = match &root.kind {
            ComponentKind::Page { title, description, .. } => (title.as_str(), description.as_str()),
            _ => ("", ""),
        };

        let code = render(
            templates::HTML_DOCUMENT,
            &[
                ("title", escape_html(title).as_str()),
                ("description", escape_html(description).as_str()),
                ("styles", styles.as_str()),
                ("componentBody", body.as_str()),
            ],
        );

        GeneratedComponent {
            name: root.name.clone(),
            code,
            styles: String::new(),
        }
    }

    /// React or Vue component for `node`; children are inlined or referenced
    fn component(&self, node: &ComponentNode, inline_children: bool) -> GeneratedComponent {
        let mut logic = Logic::default();
        let markup = self.markup(node, inline_children, &mut logic);
        let styles: String = if inline_children {
            node.walk().iter().map(|n| self.styles(n)).collect()
        } else {
            self.styles(node)
        };
        let child_names: Vec<&str> = if inline_children {
            Vec::new()
        } else {
            node.children.iter().map(|child| child.name.as_str()).collect()
        };

        let code = match self.options.format {
            OutputFormat::Vue => self.vue_component(node, &markup, &styles, &child_names, &logic),
            _ => self.react_component(node, &markup, &styles, &child_names, &logic),
        };

        let styles = match self.options.style_handling {
            StyleHandling::Separate => styles,
            StyleHandling::Inline => String::new(),
        };

        GeneratedComponent {
            name: node.name.clone(),
            code,
            styles,
        }
    }

    fn react_component(
        &self,
        node: &ComponentNode,
        markup: &[String],
        styles: &str,
        child_names: &[&str],
        logic: &Logic,
    ) -> String {
        let mut imports = String::new();
        let inline_styles = self.options.style_handling == StyleHandling::Inline && !styles.is_empty();
        if !inline_styles && !styles.is_empty() {
            imports.push_str(&render(templates::REACT_STYLE_IMPORT, &[("componentName", node.name.as_str())]));
        }
        for child in child_names {
            imports.push_str(&render(templates::REACT_CHILD_IMPORT, &[("componentName", *child)]));
        }

        let mut component_logic = String::new();
        let body = if inline_styles {
            let style_const = format!("{}Styles", to_camel_case(&node.name));
            component_logic.push_str(&render(
                templates::REACT_INLINE_STYLES,
                &[("styleConst", style_const.as_str()), ("styles", escape_template_literal(styles).as_str())],
            ));
            let mut wrapped = vec!["<>".to_string(), format!("  <style>{{{}}}</style>", style_const)];
            wrapped.extend(markup.iter().map(|line| format!("  {}", line)));
            wrapped.push("</>".to_string());
            indent(&wrapped, 2)
        } else {
            indent(markup, 2)
        };
        component_logic.push_str(&react_logic(logic));

        let hook_imports = if logic.state.is_empty() { "" } else { ", { useState }" };

        render(
            templates::REACT_COMPONENT,
            &[
                ("hookImports", hook_imports),
                ("imports", imports.as_str()),
                ("componentName", node.name.as_str()),
                ("componentLogic", component_logic.as_str()),
                ("componentBody", body.as_str()),
            ],
        )
    }

    fn vue_component(
        &self,
        node: &ComponentNode,
        markup: &[String],
        styles: &str,
        child_names: &[&str],
        logic: &Logic,
    ) -> String {
        let imports: String = child_names
            .iter()
            .map(|child| render(templates::VUE_CHILD_IMPORT, &[("componentName", *child)]))
            .collect();

        let mut component_logic = String::new();
        if !child_names.is_empty() {
            component_logic.push_str(&format!("  components: {{ {} }},\n", child_names.join(", ")));
        }
        component_logic.push_str(&vue_logic(logic));

        let style_block = match (self.options.style_handling, styles.is_empty()) {
            (_, true) => String::new(),
            (StyleHandling::Inline, false) => render(templates::VUE_SCOPED_STYLE, &[("styles", styles)]),
            (StyleHandling::Separate, false) => {
                render(templates::VUE_STYLE_SRC, &[("componentName", node.name.as_str())])
            }
        };

        render(
            templates::VUE_COMPONENT,
            &[
                ("imports", imports.as_str()),
                ("componentName", node.name.as_str()),
                ("componentLogic", component_logic.as_str()),
                ("styleBlock", style_block.as_str()),
                ("componentBody", indent(markup, 1).as_str()),
            ],
        )
    }

    fn class_attr(&self) -> &'static str {
        match self.options.format {
            OutputFormat::React => "className",
            _ => "class",
        }
    }

    fn interactive(&self) -> bool {
        self.options.interactivity == Interactivity::Interactive && self.options.format != OutputFormat::Html
    }

    /// Markup lines for `node` at relative indentation zero
    fn markup(&self, node: &ComponentNode, inline_children: bool, logic: &mut Logic) -> Vec<String> {
        let class = format!("{}=\"{}\"", self.class_attr(), to_kebab_case(&node.name));

        match (&node.kind, self.options.format) {
            (ComponentKind::Logo { src, alt }, _) => vec![
                format!("<div {}>", class),
                format!("  <img src=\"{}\" alt=\"{}\" />", escape_html(src), escape_html(alt)),
                "</div>".to_string(),
            ],
            (ComponentKind::Navigation { links }, _) => {
                let mut lines = vec![format!("<nav {}>", class), "  <ul>".to_string()];
                for link in links {
                    lines.push(format!(
                        "    <li><a href=\"{}\">{}</a></li>",
                        escape_html(&link.href),
                        escape_html(&link.label)
                    ));
                }
                lines.push("  </ul>".to_string());
                lines.push("</nav>".to_string());
                lines
            }
            (ComponentKind::SearchBox { placeholder, name, button_text }, format) => {
                let input = format!(
                    "type=\"search\" name=\"{}\" placeholder=\"{}\"",
                    escape_html(name),
                    escape_html(placeholder)
                );
                let button = format!("  <button type=\"submit\">{}</button>", escape_html(button_text));

                if !self.interactive() {
                    return vec![
                        format!("<form {} action=\"/search\" role=\"search\">", class),
                        format!("  <input {} />", input),
                        button,
                        "</form>".to_string(),
                    ];
                }

                let query = format!("{}Query", to_camel_case(&node.name));
                let submit = format!("handle{}Submit", node.name);
                logic.state.push(query.clone());

                match format {
                    OutputFormat::Vue => {
                        logic.handlers.push(Handler {
                            name: submit.clone(),
                            param: "",
                            body: vec![format!(
                                "window.location.href = `/search?{}=${{encodeURIComponent(this.{})}}`;",
                                escape_js(name),
                                query
                            )],
                        });
                        vec![
                            format!("<form {} role=\"search\" @submit.prevent=\"{}\">", class, submit),
                            format!("  <input {} v-model=\"{}\" />", input, query),
                            button,
                            "</form>".to_string(),
                        ]
                    }
                    _ => {
                        logic.handlers.push(Handler {
                            name: submit.clone(),
                            param: "event",
                            body: vec![
                                "event.preventDefault();".to_string(),
                                format!(
                                    "window.location.href = `/search?{}=${{encodeURIComponent({})}}`;",
                                    escape_js(name),
                                    query
                                ),
                            ],
                        });
                        vec![
                            format!("<form {} role=\"search\" onSubmit={{{}}}>", class, submit),
                            format!(
                                "  <input {} value={{{}}} onChange={{(event) => set{}(event.target.value)}} />",
                                input, query, capitalize(&query)
                            ),
                            button,
                            "</form>".to_string(),
                        ]
                    }
                }
            }
            (ComponentKind::Buttons { labels }, format) => {
                let click = format!("handle{}Click", node.name);
                let interactive = self.interactive();
                if interactive {
                    logic.handlers.push(Handler {
                        name: click.clone(),
                        param: "label",
                        body: vec!["console.log(`${label} clicked`);".to_string()],
                    });
                }

                let mut lines = vec![format!("<div {}>", class)];
                for label in labels {
                    let handler = match (interactive, format) {
                        (false, _) => String::new(),
                        (true, OutputFormat::Vue) => {
                            format!(" @click=\"{}('{}')\"", click, escape_html(&escape_js(label)))
                        }
                        (true, _) => format!(" onClick={{() => {}('{}')}}", click, escape_js(label)),
                    };
                    lines.push(format!(
                        "  <button type=\"button\"{}>{}</button>",
                        handler,
                        escape_html(label)
                    ));
                }
                lines.push("</div>".to_string());
                lines
            }
            (ComponentKind::Form { action, method, fields }, _) => {
                let mut lines = vec![format!(
                    "<form {} action=\"{}\" method=\"{}\">",
                    class,
                    escape_html(action),
                    escape_html(method)
                )];
                for field in fields {
                    let placeholder = if field.placeholder.is_empty() {
                        String::new()
                    } else {
                        format!(" placeholder=\"{}\"", escape_html(&field.placeholder))
                    };
                    lines.push(format!(
                        "  <input type=\"{}\" name=\"{}\"{} />",
                        escape_html(&field.input_type),
                        escape_html(&field.name),
                        placeholder
                    ));
                }
                lines.push("  <button type=\"submit\">Submit</button>".to_string());
                lines.push("</form>".to_string());
                lines
            }
            (ComponentKind::Container { role }, _) => {
                self.wrap(role.tag(), &class, node, inline_children, logic)
            }
            _ => self.wrap("div", &class, node, inline_children, logic),
        }
    }

    /// Element wrapping the node's children, inlined or as component references
    fn wrap(
        &self,
        tag: &str,
        class: &str,
        node: &ComponentNode,
        inline_children: bool,
        logic: &mut Logic,
    ) -> Vec<String> {
        let mut lines = vec![format!("<{} {}>", tag, class)];
        for child in &node.children {
            if inline_children || self.options.format == OutputFormat::Html {
                lines.extend(
                    self.markup(child, true, logic)
                        .into_iter()
                        .map(|line| format!("  {}", line)),
                );
            } else {
                lines.push(format!("  <{} />", child.name));
            }
        }
        lines.push(format!("</{}>", tag));
        lines
    }

    /// Stylesheet text for a single node
    fn styles(&self, node: &ComponentNode) -> String {
        if self.options.fidelity == Fidelity::Low {
            return String::new();
        }

        let template = match &node.kind {
            ComponentKind::Page { layout: LayoutClassification::Centered, .. } => templates::CENTERED_PAGE_STYLES,
            ComponentKind::Page { .. } => templates::PAGE_STYLES,
            ComponentKind::Container { role: ContainerRole::Main } => templates::MAIN_STYLES,
            ComponentKind::Container { .. } => templates::CONTAINER_STYLES,
            ComponentKind::Logo { .. } => templates::LOGO_STYLES,
            ComponentKind::Navigation { .. } => templates::NAVIGATION_STYLES,
            ComponentKind::SearchBox { .. } => templates::SEARCH_BOX_STYLES,
            ComponentKind::Buttons { .. } => templates::BUTTONS_STYLES,
            ComponentKind::Form { .. } => templates::FORM_STYLES,
        };

        let kebab = to_kebab_case(&node.name);
        let mut css = render(template, &[("kebabName", kebab.as_str())]);
        if self.options.responsive {
            css.push('\n');
            css.push_str(&render(templates::RESPONSIVE_STYLES, &[("kebabName", kebab.as_str())]));
        }
        if let ComponentKind::Page { inline_styles, .. } = &node.kind {
            for block in inline_styles {
                css.push('\n');
                css.push_str(block.trim());
                css.push('\n');
            }
        }
        css
    }
}

fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
        None => String::new(),
    }
}

fn react_logic(logic: &Logic) -> String {
    if logic.is_empty() {
        return String::new();
    }

    let mut out = String::new();
    for state in &logic.state {
        out.push_str(&format!("  const [{}, set{}] = useState('');\n", state, capitalize(state)));
    }
    for handler in &logic.handlers {
        out.push_str(&format!("\n  const {} = ({}) => {{\n", handler.name, handler.param));
        for line in &handler.body {
            out.push_str(&format!("    {}\n", line));
        }
        out.push_str("  };\n");
    }
    out.push('\n');
    out
}

fn vue_logic(logic: &Logic) -> String {
    let mut out = String::new();

    if !logic.state.is_empty() {
        out.push_str("  data() {\n    return {\n");
        for state in &logic.state {
            out.push_str(&format!("      {}: '',\n", state));
        }
        out.push_str("    };\n  },\n");
    }

    if !logic.handlers.is_empty() {
        out.push_str("  methods: {\n");
        for handler in &logic.handlers {
            out.push_str(&format!("    {}({}) {{\n", handler.name, handler.param));
            for line in &handler.body {
                out.push_str(&format!("      {}\n", line));
            }
            out.push_str("    },\n");
        }
        out.push_str("  },\n");
    }

    out
}
