/*
 * drawing.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Construction of inline `w:drawing` runs for resolved image payloads.
//!
//! Namespaces for the drawing, DrawingML, and picture elements are declared
//! inline so the output stays valid even when the template's root element
//! does not declare them.

use crate::image::input::ImagePayload;
use docfill_ooxml::XmlElement;

/// EMU per pixel at 96 DPI.
pub const EMU_PER_PIXEL: u64 = 9525;

const NS_WP: &str = "http://schemas.openxmlformats.org/drawingml/2006/wordprocessingDrawing";
const NS_A: &str = "http://schemas.openxmlformats.org/drawingml/2006/main";
const NS_PIC: &str = "http://schemas.openxmlformats.org/drawingml/2006/picture";
const NS_R: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";

/// Build a run holding one inline picture.
///
/// `id` feeds the non-visual properties (`wp:docPr/@id`, `pic:cNvPr/@id`);
/// `rel_id` is the image relationship registered with the package.
pub fn inline_image_run(rel_id: &str, id: u32, payload: &ImagePayload) -> XmlElement {
    let cx = (payload.width_px as u64 * EMU_PER_PIXEL).to_string();
    let cy = (payload.height_px as u64 * EMU_PER_PIXEL).to_string();
    let name = format!("Picture {}", id);

    let pic = XmlElement::new("pic:pic")
        .with_attribute("xmlns:pic", NS_PIC)
        .with_child(
            XmlElement::new("pic:nvPicPr")
                .with_child(
                    XmlElement::new("pic:cNvPr")
                        .with_attribute("id", id.to_string())
                        .with_attribute("name", name.as_str()),
                )
                .with_child(XmlElement::new("pic:cNvPicPr")),
        )
        .with_child(
            XmlElement::new("pic:blipFill")
                .with_child(
                    XmlElement::new("a:blip")
                        .with_attribute("r:embed", rel_id)
                        .with_attribute("xmlns:r", NS_R),
                )
                .with_child(XmlElement::new("a:stretch").with_child(XmlElement::new("a:fillRect"))),
        )
        .with_child(
            XmlElement::new("pic:spPr")
                .with_child(
                    XmlElement::new("a:xfrm")
                        .with_child(
                            XmlElement::new("a:off")
                                .with_attribute("x", "0")
                                .with_attribute("y", "0"),
                        )
                        .with_child(
                            XmlElement::new("a:ext")
                                .with_attribute("cx", cx.as_str())
                                .with_attribute("cy", cy.as_str()),
                        ),
                )
                .with_child(
                    XmlElement::new("a:prstGeom")
                        .with_attribute("prst", "rect")
                        .with_child(XmlElement::new("a:avLst")),
                ),
        );

    let inline = XmlElement::new("wp:inline")
        .with_attribute("distT", "0")
        .with_attribute("distB", "0")
        .with_attribute("distL", "0")
        .with_attribute("distR", "0")
        .with_attribute("xmlns:wp", NS_WP)
        .with_child(
            XmlElement::new("wp:extent")
                .with_attribute("cx", cx.as_str())
                .with_attribute("cy", cy.as_str()),
        )
        .with_child(
            XmlElement::new("wp:docPr")
                .with_attribute("id", id.to_string())
                .with_attribute("name", name.as_str()),
        )
        .with_child(
            XmlElement::new("wp:cNvGraphicFramePr").with_child(
                XmlElement::new("a:graphicFrameLocks")
                    .with_attribute("xmlns:a", NS_A)
                    .with_attribute("noChangeAspect", "1"),
            ),
        )
        .with_child(
            XmlElement::new("a:graphic")
                .with_attribute("xmlns:a", NS_A)
                .with_child(
                    XmlElement::new("a:graphicData")
                        .with_attribute("uri", NS_PIC)
                        .with_child(pic),
                ),
        );

    XmlElement::new("w:r")
        .with_child(XmlElement::new("w:drawing").with_child(inline))
}
