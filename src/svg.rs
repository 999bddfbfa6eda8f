//! Owned SVG document tree.
//!
//! Documents are parsed with `quick-xml` into an arena of nodes that keeps
//! explicit parent links, mutated in place, and written back out.

/// Arena tree and navigation/mutation API
mod document;
/// `quick-xml` event reader building a [`Document`]
mod parse;
/// `quick-xml` writer serializing a [`Document`]
mod write;

use thiserror::Error;

pub use document::{
    Attribute,
    Document,
    Element,
    NodeId,
    NodeKind,
};

/// The SVG namespace URI.
pub const SVG_NS: &str = "http://www.w3.org/2000/svg";

/// Markup that could not be read or written.
#[derive(Error, Debug)]
pub enum XmlError {
    /// The reader rejected the markup.
    #[error("Failed to parse XML at byte {position}: {message}")]
    Parse {
        /// Byte offset of the event that failed.
        position: u64,
        /// Reader error message.
        message: String,
    },

    /// Only a prolog, comments or nothing at all.
    #[error("Document has no root element")]
    NoRootElement,

    /// Input ended inside this element.
    #[error("Unclosed element <{0}>")]
    UnclosedElement(String),

    /// The writer failed.
    #[error("Failed to write XML: {0}")]
    Write(String),
}
