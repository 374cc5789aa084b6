/*
 * input.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Resolving data values into normalized image payloads.
//!
//! A source value is either a string (data URI, file path, or raw base64)
//! or an object carrying the source plus sizing options. The resolved
//! payload has bytes, a detected format, and final pixel dimensions after
//! the sizing rules (explicit size, aspect inference, scale, max box).

use crate::error::{RenderError, RenderResult};
use crate::image::probe::{self, ImageFormat, ImageSize};
use crate::value::Value;
use base64::prelude::*;
use hashlink::LinkedHashMap;
use std::path::Path;

/// Default edge length when nothing pins a dimension.
const DEFAULT_EDGE: u32 = 120;

/// A fully resolved inline image.
#[derive(Debug, Clone)]
pub struct ImagePayload {
    pub bytes: Vec<u8>,
    pub format: ImageFormat,
    pub width_px: u32,
    pub height_px: u32,
}

/// Sizing options read from an image object.
#[derive(Debug, Clone, Copy, Default)]
struct SizeOptions {
    width: Option<i64>,
    height: Option<i64>,
    max_width: Option<i64>,
    max_height: Option<i64>,
    scale: Option<f64>,
    preserve_aspect: Option<bool>,
}

/// Resolve an evaluated image expression into payloads.
///
/// Arrays yield one payload per non-null element, null yields none, and
/// anything else yields one.
pub fn resolve_many(value: &Value, base_dir: &Path) -> RenderResult<Vec<ImagePayload>> {
    match value {
        Value::Null => Ok(Vec::new()),
        Value::Array(items) => {
            let mut payloads = Vec::new();
            for item in items {
                if let Some(payload) = resolve_one(item, base_dir)? {
                    payloads.push(payload);
                }
            }
            Ok(payloads)
        }
        other => Ok(resolve_one(other, base_dir)?.into_iter().collect()),
    }
}

fn resolve_one(value: &Value, base_dir: &Path) -> RenderResult<Option<ImagePayload>> {
    let (source, options) = match value {
        Value::Null => return Ok(None),
        Value::String(s) => (s.clone(), SizeOptions::default()),
        Value::Object(map) => {
            let source = ci_first(map, &["src", "data", "base64", "path", "value"])
                .map(Value::to_text)
                .ok_or_else(|| {
                    RenderError::InvalidImageSource("image object has no source property".into())
                })?;
            (source, read_options(map)?)
        }
        other => {
            return Err(RenderError::InvalidImageSource(format!(
                "image source must be a string or object, got {}",
                other.to_text()
            )))
        }
    };

    let (bytes, mime_hint, ext_hint) = acquire_bytes(&source, base_dir)?;

    let format = mime_hint
        .as_deref()
        .and_then(ImageFormat::from_mime)
        .or_else(|| probe::sniff(&bytes))
        .or_else(|| ext_hint.as_deref().and_then(ImageFormat::from_extension))
        .ok_or(RenderError::UnknownImageFormat)?;

    let intrinsic = probe::intrinsic_size(&bytes, format);
    let (width_px, height_px) = resolve_size(&options, intrinsic)?;

    Ok(Some(ImagePayload {
        bytes,
        format,
        width_px,
        height_px,
    }))
}

/// Case-insensitive first non-null property lookup. Image objects are the
/// one place where key matching is relaxed.
fn ci_first<'v>(map: &'v LinkedHashMap<String, Value>, names: &[&str]) -> Option<&'v Value> {
    for name in names {
        let found = map
            .iter()
            .find(|(key, value)| key.eq_ignore_ascii_case(name) && !value.is_null())
            .map(|(_, value)| value);
        if found.is_some() {
            return found;
        }
    }
    None
}

fn read_options(map: &LinkedHashMap<String, Value>) -> RenderResult<SizeOptions> {
    let options = SizeOptions {
        width: ci_int(map, &["width", "widthPx"]),
        height: ci_int(map, &["height", "heightPx"]),
        max_width: ci_int(map, &["maxWidth"]),
        max_height: ci_int(map, &["maxHeight"]),
        scale: ci_float(map, &["scale"]),
        preserve_aspect: ci_bool(
            map,
            &["preserveAspectRatio", "keepAspectRatio", "lockAspectRatio"],
        ),
    };

    for (name, dim) in [
        ("width", options.width),
        ("height", options.height),
        ("maxWidth", options.max_width),
        ("maxHeight", options.max_height),
    ] {
        if let Some(d) = dim {
            if d <= 0 {
                return Err(RenderError::InvalidImageSize(format!(
                    "{} must be positive, got {}",
                    name, d
                )));
            }
        }
    }
    Ok(options)
}

fn ci_int(map: &LinkedHashMap<String, Value>, names: &[&str]) -> Option<i64> {
    match ci_first(map, names)? {
        Value::Int(i) => Some(*i),
        Value::Float(f) if f.fract() == 0.0 => Some(*f as i64),
        _ => None,
    }
}

fn ci_float(map: &LinkedHashMap<String, Value>, names: &[&str]) -> Option<f64> {
    ci_first(map, names)?.as_number()
}

fn ci_bool(map: &LinkedHashMap<String, Value>, names: &[&str]) -> Option<bool> {
    match ci_first(map, names)? {
        Value::Bool(b) => Some(*b),
        _ => None,
    }
}

/// Acquire bytes for a source string, returning optional MIME and
/// extension hints for format detection.
fn acquire_bytes(
    source: &str,
    base_dir: &Path,
) -> RenderResult<(Vec<u8>, Option<String>, Option<String>)> {
    let trimmed = source.trim();

    if let Some(rest) = trimmed.strip_prefix("data:") {
        let (header, payload) = rest.split_once(',').ok_or_else(|| {
            RenderError::InvalidImageSource("data URI has no comma separator".into())
        })?;
        let mut parts = header.split(';');
        let mime = parts.next().unwrap_or("").trim().to_string();
        if !header.split(';').any(|p| p.trim().eq_ignore_ascii_case("base64")) {
            return Err(RenderError::InvalidImageSource(
                "data URI must be base64-encoded".into(),
            ));
        }
        let bytes = BASE64_STANDARD.decode(payload.trim()).map_err(|e| {
            RenderError::InvalidImageSource(format!("data URI payload is not valid base64: {}", e))
        })?;
        let mime = if mime.is_empty() { None } else { Some(mime) };
        return Ok((bytes, mime, None));
    }

    let path = Path::new(trimmed);
    let candidate = if path.is_absolute() {
        path.to_path_buf()
    } else {
        base_dir.join(path)
    };
    if candidate.is_file() {
        let bytes = std::fs::read(&candidate)?;
        let ext = candidate
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_string);
        return Ok((bytes, None, ext));
    }

    match BASE64_STANDARD.decode(trimmed) {
        Ok(bytes) => Ok((bytes, None, None)),
        Err(_) => Err(RenderError::InvalidImageSource(format!(
            "'{}' is not a data URI, an existing file, or base64 data",
            truncate_for_message(trimmed)
        ))),
    }
}

fn truncate_for_message(s: &str) -> &str {
    match s.char_indices().nth(60) {
        Some((i, _)) => &s[..i],
        None => s,
    }
}

/// Apply the sizing rules to produce the final pixel dimensions.
fn resolve_size(options: &SizeOptions, intrinsic: Option<ImageSize>) -> RenderResult<(u32, u32)> {
    let keep_aspect = options.preserve_aspect.unwrap_or(
        options.scale.is_some()
            || options.max_width.is_some()
            || options.max_height.is_some()
            || (options.width.is_some() != options.height.is_some()),
    );

    let (mut w, mut h) = match (options.width, options.height) {
        (Some(w), Some(h)) => match intrinsic {
            Some(size) if keep_aspect => fit_into_box(size, w as f64, h as f64, true),
            _ => (w as f64, h as f64),
        },
        (Some(w), None) => {
            let h = match intrinsic {
                Some(size) if keep_aspect => {
                    (size.height as f64 * w as f64 / size.width as f64).round()
                }
                Some(size) => size.height as f64,
                None => DEFAULT_EDGE as f64,
            };
            (w as f64, h)
        }
        (None, Some(h)) => {
            let w = match intrinsic {
                Some(size) if keep_aspect => {
                    (size.width as f64 * h as f64 / size.height as f64).round()
                }
                Some(size) => size.width as f64,
                None => DEFAULT_EDGE as f64,
            };
            (w, h as f64)
        }
        (None, None) => match intrinsic {
            Some(size) => (size.width as f64, size.height as f64),
            None => (DEFAULT_EDGE as f64, DEFAULT_EDGE as f64),
        },
    };

    if let Some(scale) = options.scale {
        w = (w * scale).round().max(1.0);
        h = (h * scale).round().max(1.0);
    }

    if options.max_width.is_some() || options.max_height.is_some() {
        if keep_aspect {
            let mut ratio = 1.0f64;
            if let Some(max_w) = options.max_width {
                ratio = ratio.min(max_w as f64 / w);
            }
            if let Some(max_h) = options.max_height {
                ratio = ratio.min(max_h as f64 / h);
            }
            w = (w * ratio).round().max(1.0);
            h = (h * ratio).round().max(1.0);
        } else {
            if let Some(max_w) = options.max_width {
                w = w.min(max_w as f64);
            }
            if let Some(max_h) = options.max_height {
                h = h.min(max_h as f64);
            }
        }
    }

    if w < 1.0 || h < 1.0 || !w.is_finite() || !h.is_finite() {
        return Err(RenderError::InvalidImageSize(format!(
            "resolved dimensions {}x{} are not positive",
            w, h
        )));
    }
    Ok((w as u32, h as u32))
}

/// Scale `src` to fit inside a box, preserving aspect ratio. With
/// `allow_upscale` the image may grow; otherwise the ratio caps at 1.
fn fit_into_box(src: ImageSize, box_w: f64, box_h: f64, allow_upscale: bool) -> (f64, f64) {
    let mut ratio = (box_w / src.width as f64).min(box_h / src.height as f64);
    if !allow_upscale {
        ratio = ratio.min(1.0);
    }
    (
        (src.width as f64 * ratio).round().max(1.0),
        (src.height as f64 * ratio).round().max(1.0),
    )
}
