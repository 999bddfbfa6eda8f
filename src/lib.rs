//! svg-translate
//!
//! Extracts translations from multilingual SVG files (`<switch>` groups of
//! `<text systemLanguage="..">` variants) and injects them into other SVGs.

pub mod batch;
pub mod config;
pub mod discover;
pub mod error;
pub mod extract;
pub mod inject;
pub mod mapping;
pub mod prepare;
pub mod svg;
pub mod text;
pub mod workflow;

mod test_utils;

pub use error::Error;
pub use extract::extract;
pub use inject::inject;
pub use mapping::TranslationMapping;
pub use prepare::make_translation_ready;
pub use workflow::{
    svg_extract_and_inject,
    svg_extract_and_injects,
};
