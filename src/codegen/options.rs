use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How closely generated styles follow the captured page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Fidelity {
    Low,
    #[default]
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Componentization {
    /// One page component with every child inlined
    Single,
    /// One generated entry per component node
    #[default]
    PerComponent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum StyleHandling {
    /// Styles embedded in the component code
    Inline,
    /// Styles emitted as separate stylesheet files
    #[default]
    Separate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Interactivity {
    #[default]
    Static,
    /// Search boxes and buttons get state and handlers
    Interactive,
}

/// Target output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    React,
    Vue,
    Html,
}

impl OutputFormat {
    /// File extension for component files
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::React => "jsx",
            OutputFormat::Vue => "vue",
            OutputFormat::Html => "html",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            OutputFormat::React => "react",
            OutputFormat::Vue => "vue",
            OutputFormat::Html => "html",
        };
        write!(f, "{}", name)
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "react" => Ok(OutputFormat::React),
            "vue" => Ok(OutputFormat::Vue),
            "html" => Ok(OutputFormat::Html),
            other => Err(format!("unknown output format: {}", other)),
        }
    }
}

/// Options for one code generation request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationOptions {
    #[serde(default)]
    pub fidelity: Fidelity,
    #[serde(default)]
    pub componentization: Componentization,
    #[serde(default)]
    pub style_handling: StyleHandling,
    #[serde(default)]
    pub interactivity: Interactivity,
    #[serde(default = "default_responsive")]
    pub responsive: bool,
    #[serde(default)]
    pub format: OutputFormat,
}

fn default_responsive() -> bool {
    true
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            fidelity: Fidelity::default(),
            componentization: Componentization::default(),
            style_handling: StyleHandling::default(),
            interactivity: Interactivity::default(),
            responsive: default_responsive(),
            format: OutputFormat::default(),
        }
    }
}

impl GenerationOptions {
    pub fn with_format(format: OutputFormat) -> Self {
        Self {
            format,
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_options_use_defaults() {
        let options: GenerationOptions =
            serde_json::from_str(r#"{"format":"html","styleHandling":"inline"}"#).unwrap();

        assert_eq!(options.format, OutputFormat::Html);
        assert_eq!(options.style_handling, StyleHandling::Inline);
        assert_eq!(options.fidelity, Fidelity::Medium);
        assert_eq!(options.componentization, Componentization::PerComponent);
        assert!(options.responsive);
    }

    #[test]
    fn test_format_parsing() {
        assert_eq!("Vue".parse::<OutputFormat>().unwrap(), OutputFormat::Vue);
        assert!("svelte".parse::<OutputFormat>().is_err());
        assert_eq!(OutputFormat::React.to_string(), "react");
    }
}
