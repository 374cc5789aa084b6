/*
 * lib.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Template execution engine for docfill.
//!
//! Renders WordprocessingML (`.docx`) templates against a JSON data tree.
//! Directives are single-brace tokens in visible text:
//!
//! - Expressions: `{patient.name}`, `{orders|sort:amount:desc|take:2}`
//! - Loops: a paragraph `{#items}`, a block of siblings, `{/items}`
//! - Conditionals: `{?flag}` … `{/?flag}`
//! - Inline images: a paragraph `{%chart}` (or `{%%chart}` to center)
//!
//! Expressions are a path head piped through operators (`sort`, `take`,
//! `count`, `first`, `last`, `nth`, `at`, `maxby`, `minby`, `get`/`pick`,
//! `if`, `format`). Paths resolve against a scope chain: the loop item
//! first, then enclosing scopes, then the root (`$`).
//!
//! # Example
//!
//! ```ignore
//! use docfill_engine::DocxTemplateEngine;
//!
//! let engine = DocxTemplateEngine::new();
//! let rendered = engine.render_bytes(&template_bytes, r#"{"name":"Ada"}"#)?;
//! std::fs::write("out.docx", rendered)?;
//! ```
//!
//! The OOXML container itself (ZIP access, part trees, image parts) lives
//! in the `docfill-ooxml` crate.

pub mod context;
pub mod engine;
pub mod error;
pub mod format;
pub mod image;
pub mod path;
pub mod pipeline;
pub mod render;
pub mod tag;
pub mod value;

// Re-export the main types at the crate root.
pub use context::Context;
pub use engine::DocxTemplateEngine;
pub use error::{RenderError, RenderResult};
pub use image::{ImageFormat, ImagePayload};
pub use pipeline::evaluate;
pub use render::TemplateRenderer;
pub use tag::{ControlMarker, ImageTag, MarkerKind};
pub use value::Value;
