/*
 * tag.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Directive lexing and control-marker classification.
//!
//! Directives are single-brace tokens inside visible text. A paragraph (or
//! row) whose entire trimmed text is one token is a candidate control
//! marker (`#`, `?`, `/?`, `/`) or image tag (`%`, `%%`); anything else is
//! inline content handled during substitution.

use once_cell::sync::Lazy;
use regex::Regex;

/// An inline directive token anywhere in a string.
pub static INLINE_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"\{([^{}]+)\}").unwrap());

/// A string that consists of exactly one directive token.
pub static WHOLE_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\{([^{}]+)\}$").unwrap());

/// The kind of a control marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerKind {
    LoopStart,
    LoopEnd,
    IfStart,
    IfEnd,
}

impl MarkerKind {
    /// Whether this marker opens a block.
    pub fn is_start(self) -> bool {
        matches!(self, MarkerKind::LoopStart | MarkerKind::IfStart)
    }

    /// Loop markers and conditional markers nest independently.
    pub fn same_category(self, other: MarkerKind) -> bool {
        use MarkerKind::*;
        matches!(
            (self, other),
            (LoopStart | LoopEnd, LoopStart | LoopEnd) | (IfStart | IfEnd, IfStart | IfEnd)
        )
    }
}

/// A classified control marker.
#[derive(Debug, Clone, PartialEq)]
pub struct ControlMarker {
    pub kind: MarkerKind,
    /// The expression after the control prefix, trimmed.
    pub expression: String,
    /// The full token as it appeared, for error messages.
    pub raw: String,
}

/// Classify text as a control marker, if its entire trimmed content is one
/// directive with a control prefix.
pub fn classify_marker(text: &str) -> Option<ControlMarker> {
    let trimmed = text.trim();
    let captures = WHOLE_TAG.captures(trimmed)?;
    let inner = captures.get(1)?.as_str().trim();

    // `/?` must be tested before `?` and `/`.
    let (kind, expression) = if let Some(rest) = inner.strip_prefix('#') {
        (MarkerKind::LoopStart, rest)
    } else if let Some(rest) = inner.strip_prefix("/?") {
        (MarkerKind::IfEnd, rest)
    } else if let Some(rest) = inner.strip_prefix('?') {
        (MarkerKind::IfStart, rest)
    } else if let Some(rest) = inner.strip_prefix('/') {
        (MarkerKind::LoopEnd, rest)
    } else {
        return None;
    };

    Some(ControlMarker {
        kind,
        expression: expression.trim().to_string(),
        raw: trimmed.to_string(),
    })
}

/// A whole-paragraph image directive.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageTag {
    /// The expression after the `%`/`%%` prefix, trimmed.
    pub expression: String,
    /// Whether the paragraph should be centered (`%%`).
    pub centered: bool,
}

/// Parse text as an image tag, if its entire trimmed content is one
/// `{%…}` or `{%%…}` directive.
pub fn parse_image_tag(text: &str) -> Option<ImageTag> {
    let trimmed = text.trim();
    let captures = WHOLE_TAG.captures(trimmed)?;
    let inner = captures.get(1)?.as_str().trim();

    let (centered, expression) = if let Some(rest) = inner.strip_prefix("%%") {
        (true, rest)
    } else if let Some(rest) = inner.strip_prefix('%') {
        (false, rest)
    } else {
        return None;
    };

    Some(ImageTag {
        expression: expression.trim().to_string(),
        centered,
    })
}

/// Whether a token's inner text is an expression directive.
///
/// The gate looks at the pipeline head only: it must be `.`, `$`, or a path
/// whose trimmed name segments contain no whitespace and none of `:`, `{`,
/// `}`, and whose bracket groups are closed. Tokens that fail the gate are
/// ordinary text and render through verbatim; operator validity is checked
/// later, during evaluation.
pub fn is_expression_directive(inner: &str) -> bool {
    let head = match inner.split('|').find(|segment| !segment.trim().is_empty()) {
        Some(head) => head.trim(),
        None => return false,
    };
    if head == "." || head == "$" {
        return true;
    }
    let body = head.strip_prefix("$.").unwrap_or(head);
    if body.is_empty() || body.contains([':', '{', '}']) {
        return false;
    }

    let mut rest = body;
    loop {
        match rest.find('[') {
            None => return segment_names_ok(rest),
            Some(open) => {
                if !segment_names_ok(&rest[..open]) {
                    return false;
                }
                match rest[open..].find(']') {
                    None => return false,
                    Some(off) => rest = &rest[open + off + 1..],
                }
            }
        }
    }
}

fn segment_names_ok(part: &str) -> bool {
    part.split('.')
        .map(str::trim)
        .all(|name| !name.contains(char::is_whitespace))
}
