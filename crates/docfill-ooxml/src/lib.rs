//! OOXML package access for docfill.
//!
//! This crate owns the `.docx` side of template rendering: it opens the ZIP
//! container, parses `word/document.xml` into a mutable element tree, hands
//! out the `w:body` composite for rewriting, registers image parts (media
//! entry + relationship + content type), and writes the package back out.
//!
//! The XML model is deliberately small: qualified names kept verbatim,
//! ordered children, no namespace resolution. Template rendering only needs
//! faithful round-tripping and targeted edits, not schema awareness.

pub mod error;
pub mod package;
pub mod parser;
pub mod types;
pub mod writer;

pub use error::{Error, Result};
pub use package::DocxPackage;
pub use parser::parse;
pub use types::{XmlAttribute, XmlElement, XmlNode};
pub use writer::{write_document, write_fragment};
