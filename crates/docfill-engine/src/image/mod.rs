/*
 * mod.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! The inline image subsystem: binary probing, payload resolution, and
//! drawing construction.

pub mod drawing;
pub mod input;
pub mod probe;

pub use drawing::{inline_image_run, EMU_PER_PIXEL};
pub use input::{resolve_many, ImagePayload};
pub use probe::{sniff, ImageFormat, ImageSize};
