/*
 * engine.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! The rendering façade: template bytes in, rendered document out.

use std::io::{Read, Seek, SeekFrom, Write};
use std::path::PathBuf;

use docfill_ooxml::DocxPackage;
use tracing::debug;

use crate::context::Context;
use crate::error::{RenderError, RenderResult};
use crate::render::TemplateRenderer;
use crate::value::Value;

/// Renders `.docx` templates against JSON data.
///
/// An engine is stateless between calls; each render constructs its own
/// renderer (and image id counter), so distinct engine instances may render
/// concurrently.
#[derive(Debug, Clone)]
pub struct DocxTemplateEngine {
    base_dir: PathBuf,
}

impl DocxTemplateEngine {
    /// Create an engine resolving relative image paths against the current
    /// working directory.
    pub fn new() -> Self {
        Self {
            base_dir: PathBuf::from("."),
        }
    }

    /// Create an engine resolving relative image paths against `base_dir`.
    pub fn with_base_dir(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    /// Render template bytes with a JSON data document, returning the
    /// rendered `.docx` bytes.
    pub fn render_bytes(&self, template: &[u8], json_data: &str) -> RenderResult<Vec<u8>> {
        if template.is_empty() {
            return Err(RenderError::InvalidArgument(
                "template bytes must not be empty".into(),
            ));
        }
        let root = parse_data(json_data)?;

        let mut package = DocxPackage::open(template)?;
        let ctx = Context::new(&root);
        let mut renderer = TemplateRenderer::new(&mut package, &self.base_dir);
        renderer.render_body(&ctx)?;

        let bytes = package.save()?;
        debug!(bytes = bytes.len(), "rendered document");
        Ok(bytes)
    }

    /// Streaming variant: reads the template from `template`, writes the
    /// rendered document to `output`, and leaves `output` positioned at the
    /// start.
    pub fn render<R, W>(&self, template: &mut R, output: &mut W, json_data: &str) -> RenderResult<()>
    where
        R: Read,
        W: Write + Seek,
    {
        let mut template_bytes = Vec::new();
        template.read_to_end(&mut template_bytes)?;

        let rendered = self.render_bytes(&template_bytes, json_data)?;
        output.write_all(&rendered)?;
        output.flush()?;
        output.seek(SeekFrom::Start(0))?;
        Ok(())
    }
}

impl Default for DocxTemplateEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse the data document. A root of JSON `null` is rejected: there is
/// nothing to resolve directives against.
fn parse_data(json_data: &str) -> RenderResult<Value> {
    let parsed: serde_json::Value = serde_json::from_str(json_data)
        .map_err(|e| RenderError::InvalidJson(e.to_string()))?;
    if parsed.is_null() {
        return Err(RenderError::InvalidJson("JSON root must not be null".into()));
    }
    Ok(Value::from_json(parsed))
}
