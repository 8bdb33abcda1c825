//! Capture a live web page, normalize its structure and assets, and
//! regenerate it as React, Vue or HTML components.

pub mod assets;
pub mod cli;
pub mod codegen;
pub mod crawler;
pub mod error;
pub mod extract;
pub mod storage;
pub mod utils;

pub use error::{CaptureError, Result};
