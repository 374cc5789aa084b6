/*
 * path.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Path expressions: `a.b[0].c`, `.`, `$`, `$.a`.
//!
//! Two resolution modes exist. [`resolve`] walks the scope chain (current
//! frame, then enclosing frames, then the root) and returns the first
//! non-null hit. [`resolve_from`] is a pure traversal inside one value,
//! used by operators that project within their operand (`sort:key`,
//! `get:path`).

use crate::context::Context;
use crate::error::{RenderError, RenderResult};
use crate::value::Value;

static NULL: Value = Value::Null;

/// One step of a path.
#[derive(Debug, Clone, PartialEq)]
pub enum Segment {
    /// Object property access (case-sensitive, exact).
    Name(String),

    /// Zero-based array index.
    Index(i64),
}

/// Where a path starts resolving.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Anchor {
    /// `.` or a bare path: the current frame (bare paths then walk scopes).
    Scope,

    /// `$` or `$.`: the root value.
    Root,
}

/// A parsed path expression.
#[derive(Debug, Clone, PartialEq)]
pub struct PathExpr {
    pub anchor: Anchor,
    pub segments: Vec<Segment>,
}

impl PathExpr {
    /// Parse a path expression. Name segments are trimmed and empty names
    /// are skipped; a bracket segment must hold an integer.
    pub fn parse(raw: &str) -> RenderResult<PathExpr> {
        let trimmed = raw.trim();
        if trimmed == "." {
            return Ok(PathExpr {
                anchor: Anchor::Scope,
                segments: Vec::new(),
            });
        }
        if trimmed == "$" {
            return Ok(PathExpr {
                anchor: Anchor::Root,
                segments: Vec::new(),
            });
        }

        let (anchor, rest) = match trimmed.strip_prefix("$.") {
            Some(rest) => (Anchor::Root, rest),
            None => (Anchor::Scope, trimmed),
        };
        Ok(PathExpr {
            anchor,
            segments: parse_segments(rest, raw)?,
        })
    }
}

fn parse_segments(input: &str, raw: &str) -> RenderResult<Vec<Segment>> {
    let mut segments = Vec::new();
    let mut name = String::new();
    let mut chars = input.char_indices().peekable();

    let flush = |name: &mut String, segments: &mut Vec<Segment>| {
        let trimmed = name.trim();
        if !trimmed.is_empty() {
            segments.push(Segment::Name(trimmed.to_string()));
        }
        name.clear();
    };

    while let Some((i, c)) = chars.next() {
        match c {
            '.' => flush(&mut name, &mut segments),
            '[' => {
                flush(&mut name, &mut segments);
                let close = input[i..]
                    .find(']')
                    .map(|off| i + off)
                    .ok_or_else(|| RenderError::path(raw, "unterminated bracket segment"))?;
                let index: i64 = input[i + 1..close].trim().parse().map_err(|_| {
                    RenderError::path(raw, "array index must be an integer")
                })?;
                segments.push(Segment::Index(index));
                while let Some((j, _)) = chars.peek().copied() {
                    if j <= close {
                        chars.next();
                    } else {
                        break;
                    }
                }
                if let Some((_, next)) = chars.peek() {
                    if *next != '.' && *next != '[' {
                        return Err(RenderError::path(raw, "unexpected character after index"));
                    }
                }
            }
            _ => name.push(c),
        }
    }
    flush(&mut name, &mut segments);
    Ok(segments)
}

/// Pure traversal of `path`'s segments starting at `start`. Missing
/// properties and out-of-range indices resolve to null.
pub fn resolve_from<'v>(start: &'v Value, path: &PathExpr) -> &'v Value {
    let mut current = start;
    for segment in &path.segments {
        current = match (segment, current) {
            (Segment::Name(name), Value::Object(map)) => map.get(name).unwrap_or(&NULL),
            (Segment::Index(index), Value::Array(items)) => {
                usize::try_from(*index)
                    .ok()
                    .and_then(|i| items.get(i))
                    .unwrap_or(&NULL)
            }
            _ => &NULL,
        };
        if current.is_null() {
            return &NULL;
        }
    }
    current
}

/// Resolve a path against the context chain.
///
/// Root-anchored paths go straight to the root. Scope paths try the current
/// frame first, then each enclosing frame, then the root, returning the
/// first non-null resolution.
pub fn resolve<'v>(path: &PathExpr, ctx: &Context<'v>) -> &'v Value {
    match path.anchor {
        Anchor::Root => resolve_from(ctx.root(), path),
        Anchor::Scope => {
            let mut frame = Some(*ctx);
            while let Some(f) = frame {
                let found = resolve_from(f.current(), path);
                if !found.is_null() {
                    return found;
                }
                frame = f.parent().copied();
            }
            resolve_from(ctx.root(), path)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn value(json: &str) -> Value {
        Value::from_json(serde_json::from_str(json).unwrap())
    }

    fn resolve_str<'v>(path: &str, ctx: &Context<'v>) -> &'v Value {
        resolve(&PathExpr::parse(path).unwrap(), ctx)
    }

    #[test]
    fn test_parse_segments() {
        let path = PathExpr::parse("a.b[0].c").unwrap();
        assert_eq!(path.anchor, Anchor::Scope);
        assert_eq!(
            path.segments,
            vec![
                Segment::Name("a".into()),
                Segment::Name("b".into()),
                Segment::Index(0),
                Segment::Name("c".into()),
            ]
        );
    }

    #[test]
    fn test_parse_anchors() {
        assert_eq!(PathExpr::parse(".").unwrap().anchor, Anchor::Scope);
        assert!(PathExpr::parse(".").unwrap().segments.is_empty());
        assert_eq!(PathExpr::parse("$").unwrap().anchor, Anchor::Root);
        let rooted = PathExpr::parse("$.a").unwrap();
        assert_eq!(rooted.anchor, Anchor::Root);
        assert_eq!(rooted.segments, vec![Segment::Name("a".into())]);
    }

    #[test]
    fn test_parse_trims_and_skips_empty_names() {
        let path = PathExpr::parse(" a . .b ").unwrap();
        assert_eq!(
            path.segments,
            vec![Segment::Name("a".into()), Segment::Name("b".into())]
        );
    }

    #[test]
    fn test_parse_bad_bracket() {
        assert!(matches!(
            PathExpr::parse("a[x]"),
            Err(RenderError::InvalidPath { .. })
        ));
        assert!(matches!(
            PathExpr::parse("a[1"),
            Err(RenderError::InvalidPath { .. })
        ));
    }

    #[test]
    fn test_resolve_nested() {
        let root = value(r#"{"patient":{"name":"Alice"},"items":[{"code":"A1"},{"code":"B2"}]}"#);
        let ctx = Context::new(&root);
        assert_eq!(resolve_str("patient.name", &ctx).to_text(), "Alice");
        assert_eq!(resolve_str("items[1].code", &ctx).to_text(), "B2");
        assert_eq!(resolve_str("items[9].code", &ctx), &Value::Null);
        assert_eq!(resolve_str("patient.age", &ctx), &Value::Null);
    }

    #[test]
    fn test_resolve_dot_and_root() {
        let root = value(r#"{"a":1}"#);
        let item = value(r#"{"b":2}"#);
        let ctx = Context::new(&root);
        let child = ctx.child(&item);

        assert_eq!(resolve_str(".", &child), &item);
        assert_eq!(resolve_str("$", &child), &root);
        assert_eq!(resolve_str("$.a", &child).to_text(), "1");
    }

    #[test]
    fn test_scope_walk_falls_back_to_parent() {
        let root = value(r#"{"company":"Acme","orders":[{"id":"X"}]}"#);
        let item = value(r#"{"id":"X"}"#);
        let ctx = Context::new(&root);
        let child = ctx.child(&item);

        // Found on the loop item.
        assert_eq!(resolve_str("id", &child).to_text(), "X");
        // Not on the item: falls back to the enclosing scope.
        assert_eq!(resolve_str("company", &child).to_text(), "Acme");
        // Nowhere: null.
        assert_eq!(resolve_str("missing", &child), &Value::Null);
    }

    #[test]
    fn test_resolve_from_does_not_walk_scopes() {
        let root = value(r#"{"company":"Acme"}"#);
        let item = value(r#"{"id":"X"}"#);
        let path = PathExpr::parse("company").unwrap();
        assert_eq!(resolve_from(&item, &path), &Value::Null);
        assert_eq!(resolve_from(&root, &path).to_text(), "Acme");
    }

    #[test]
    fn test_negative_index_is_out_of_range() {
        let root = value(r#"{"a":[1,2]}"#);
        let ctx = Context::new(&root);
        assert_eq!(resolve_str("a[-1]", &ctx), &Value::Null);
    }
}
