//! Package assembly: runs the extractor over every unit of a provider and
//! nests the resulting module trees into one package arena.

pub mod builder;

pub use builder::{assemble_package, build_package, extract_units, Extracted};
