//! Error types for package and XML handling.

use thiserror::Error;

/// Result type alias for docfill-ooxml operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while reading or writing an OOXML package.
#[derive(Debug, Error)]
pub enum Error {
    /// ZIP container error.
    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// I/O error while reading or writing package bytes.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// XML syntax error from quick-xml.
    #[error("XML syntax error: {0}")]
    XmlSyntax(String),

    /// Mismatched end tag.
    #[error("Mismatched end tag: expected </{expected}>, found </{found}>")]
    MismatchedEndTag { expected: String, found: String },

    /// Unexpected end of input while an element was still open.
    #[error("Unexpected end of input, expected closing tag </{0}>")]
    UnexpectedEof(String),

    /// Invalid XML structure.
    #[error("Invalid XML structure: {0}")]
    InvalidStructure(String),

    /// Empty document (no root element).
    #[error("Empty XML document: no root element found")]
    EmptyDocument,

    /// A required package part is missing.
    #[error("Package part not found: {0}")]
    MissingPart(String),
}

impl From<quick_xml::Error> for Error {
    fn from(err: quick_xml::Error) -> Self {
        Error::XmlSyntax(err.to_string())
    }
}

impl From<quick_xml::events::attributes::AttrError> for Error {
    fn from(err: quick_xml::events::attributes::AttrError) -> Self {
        Error::XmlSyntax(format!("Attribute error: {}", err))
    }
}
