//! Preprocessing pipeline for affective-computing signals
//!
//! This crate implements chainable signal preprocessors. Each [`PreprocessorNode`] wraps one
//! [`SignalPreprocessor`] and may link to a parent (run before it) and a child (run after it).
//! Chains are built directly in code, wired by name through a [`ChainGraph`], or described in
//! configuration and created through a [`PreprocessorRegistry`].

pub mod config;
pub mod error;
pub mod graph;
pub mod preprocessor;
pub mod preprocessors;
pub mod registry;

// Re-export commonly used types
pub use config::*;
pub use error::*;
pub use graph::*;
pub use preprocessor::*;
pub use preprocessors::*;
pub use registry::*;
