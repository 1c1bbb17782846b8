//! Dataset layer for affective-computing recordings
//!
//! A concrete dataset implements [`DatasetReader`]. [`AerDataset`] wraps a reader and manages the
//! rest: converting raw sources into a per-dataset working directory once ([`AerDataset::preload`]),
//! enumerating trials without touching signal data ([`AerDataset::load_trials`]) and loading each
//! trial's signals lazily through the preprocessor chain installed for that signal type.

pub mod dataset;
pub mod error;
pub mod multi;
pub mod preload;
pub mod reader;
pub mod splits;
pub mod store;
pub mod synthetic;
pub mod trial;

// Re-export commonly used types
pub use dataset::*;
pub use error::*;
pub use multi::*;
pub use preload::*;
pub use reader::*;
pub use splits::*;
pub use store::*;
pub use synthetic::*;
pub use trial::*;
