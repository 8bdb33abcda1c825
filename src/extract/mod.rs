pub mod key_elements;
pub mod model;
pub mod structure;

// Re-export common types
pub use model::{
    DomNode, ElementSnapshot, KeyElementIndex, PageStructure, ResourceRefs, StyleInfo,
    StylesheetRef,
};
pub use structure::{PageExtractor, DEFAULT_MAX_DEPTH};
