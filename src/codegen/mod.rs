pub mod analyzer;
pub mod builder;
pub mod component;
pub mod generator;
pub mod options;
pub mod service;
pub mod templates;

// Re-export common types
pub use analyzer::{analyze, CandidateKind, ComponentCandidate, LayoutClassification, PageAnalysis, Priority};
pub use builder::ComponentTreeBuilder;
pub use component::{ComponentKind, ComponentNode, ContainerRole};
pub use generator::{CodeGenerator, GeneratedCode, GeneratedComponent};
pub use options::{
    Componentization, Fidelity, GenerationOptions, Interactivity, OutputFormat, StyleHandling,
};
pub use service::{
    generate_page, ExportDescriptor, GenerationOutput, GenerationRecord, GenerationService,
    PreviewHandle,
};
