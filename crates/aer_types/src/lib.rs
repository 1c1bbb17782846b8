//! Shared types for the affective-computing dataset toolkit
//!
//! This crate contains the vocabulary used by the preprocessing pipeline and the dataset
//! layer: signal types and arrays, signal metadata, ground-truth labels and configuration.

pub mod config;
pub mod signal;

// Re-export commonly used types
pub use config::*;
pub use signal::*;
