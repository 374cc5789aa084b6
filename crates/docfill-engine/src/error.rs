/*
 * error.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Error types for template rendering.

use thiserror::Error;

/// Errors that can occur during a render call.
///
/// All of these abort the render; there is no local recovery. Text that
/// merely looks like a directive but is not one renders through verbatim
/// instead of raising.
#[derive(Debug, Error)]
pub enum RenderError {
    /// Null or invalid caller arguments.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The data document failed to parse or has a null root.
    #[error("Invalid JSON data: {0}")]
    InvalidJson(String),

    /// A closing control tag whose expression differs from its opener.
    #[error("Closing tag expression '{found}' does not match opening tag expression '{expected}'")]
    UnmatchedTag { expected: String, found: String },

    /// A start control marker with no matching end in the same composite.
    #[error("Control tag '{0}' has no matching closing tag")]
    UnclosedTag(String),

    /// Malformed path expression (bad bracket segment, non-numeric index).
    #[error("Invalid path '{path}': {message}")]
    InvalidPath { path: String, message: String },

    /// Unknown pipe operator name.
    #[error("Unknown pipe operator: {0}")]
    UnknownOperator(String),

    /// Missing or malformed operator argument.
    #[error("Invalid argument for operator '{operator}': {message}")]
    InvalidOperatorArg { operator: String, message: String },

    /// Image source is neither base64, a data URI, nor an existing file.
    #[error("Invalid image source: {0}")]
    InvalidImageSource(String),

    /// Image bytes match no supported format and no hint helps.
    #[error("Unrecognized image format")]
    UnknownImageFormat,

    /// Non-positive explicit dimension or degenerate resolved size.
    #[error("Invalid image size: {0}")]
    InvalidImageSize(String),

    /// Error from the OOXML package layer.
    #[error(transparent)]
    Package(#[from] docfill_ooxml::Error),

    /// I/O error (template/output streams, image file reads).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for render operations.
pub type RenderResult<T> = Result<T, RenderError>;

impl RenderError {
    pub(crate) fn op_arg(operator: &str, message: impl Into<String>) -> Self {
        RenderError::InvalidOperatorArg {
            operator: operator.to_string(),
            message: message.into(),
        }
    }

    pub(crate) fn path(path: &str, message: impl Into<String>) -> Self {
        RenderError::InvalidPath {
            path: path.to_string(),
            message: message.into(),
        }
    }
}
