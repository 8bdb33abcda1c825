use serde::{Deserialize, Serialize};

use super::analyzer::LayoutClassification;

/// A link inside a navigation component
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavLink {
    pub label: String,
    pub href: String,
}

/// An input inside a form component
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormField {
    pub name: String,
    #[serde(rename = "type")]
    pub input_type: String,
    pub placeholder: String,
}

/// Component type together with its type-specific props
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "props", rename_all = "camelCase")]
pub enum ComponentKind {
    #[serde(rename_all = "camelCase")]
    Page {
        title: String,
        description: String,
        layout: LayoutClassification,
        /// Captured `<style>` text, carried only at high fidelity
        inline_styles: Vec<String>,
    },
    Container {
        role: ContainerRole,
    },
    Logo {
        src: String,
        alt: String,
    },
    Navigation {
        links: Vec<NavLink>,
    },
    #[serde(rename_all = "camelCase")]
    SearchBox {
        placeholder: String,
        name: String,
        button_text: String,
    },
    Buttons {
        labels: Vec<String>,
    },
    Form {
        action: String,
        method: String,
        fields: Vec<FormField>,
    },
}

/// Structural role of a container component
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainerRole {
    Header,
    Main,
    Sidebar,
    Footer,
    Content,
}

impl ContainerRole {
    /// Semantic HTML tag for this role
    pub fn tag(&self) -> &'static str {
        match self {
            ContainerRole::Header => "header",
            ContainerRole::Main => "main",
            ContainerRole::Sidebar => "aside",
            ContainerRole::Footer => "footer",
            ContainerRole::Content => "div",
        }
    }

    pub fn component_name(&self) -> &'static str {
        match self {
            ContainerRole::Header => "Header",
            ContainerRole::Main => "Main",
            ContainerRole::Sidebar => "Sidebar",
            ContainerRole::Footer => "Footer",
            ContainerRole::Content => "Content",
        }
    }
}

/// Node of the component tree. Built once per generation request and only
/// read afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentNode {
    pub name: String,
    #[serde(flatten)]
    pub kind: ComponentKind,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<ComponentNode>,
}

impl ComponentNode {
    pub fn new(name: impl Into<String>, kind: ComponentKind) -> Self {
        Self {
            name: name.into(),
            kind,
            children: Vec::new(),
        }
    }

    pub fn with_children(mut self, children: Vec<ComponentNode>) -> Self {
        self.children = children;
        self
    }

    /// This node followed by all descendants, depth first
    pub fn walk(&self) -> Vec<&ComponentNode> {
        let mut nodes = vec![self];
        for child in &self.children {
            nodes.extend(child.walk());
        }
        nodes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serializes_type_and_props() {
        let node = ComponentNode::new(
            "Logo",
            ComponentKind::Logo {
                src: "/logo.png".to_string(),
                alt: "Logo".to_string(),
            },
        );

        let value = serde_json::to_value(&node).unwrap();
        assert_eq!(value["type"], "logo");
        assert_eq!(value["props"]["src"], "/logo.png");
        assert_eq!(value["name"], "Logo");

        let back: ComponentNode = serde_json::from_value(value).unwrap();
        assert_eq!(back, node);
    }

    #[test]
    fn test_walk_is_depth_first() {
        let header = ComponentNode::new("Header", ComponentKind::Container { role: ContainerRole::Header })
            .with_children(vec![ComponentNode::new(
                "Logo",
                ComponentKind::Logo {
                    src: String::new(),
                    alt: String::new(),
                },
            )]);
        let main = ComponentNode::new("Main", ComponentKind::Container { role: ContainerRole::Main });
        let root = ComponentNode::new("Root", ComponentKind::Container { role: ContainerRole::Content })
            .with_children(vec![header, main]);

        let names: Vec<&str> = root.walk().iter().map(|node| node.name.as_str()).collect();
        assert_eq!(names, vec!["Root", "Header", "Logo", "Main"]);
    }
}
