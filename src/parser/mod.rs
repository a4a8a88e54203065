//
//  mod.rs
//  apisig
//

pub mod extractor;
pub mod language;

pub use extractor::{extract_module, Extraction};
pub use language::{python_parser, SourceFlavor};
