//! The `.docx` package: ZIP container access and image part registration.
//!
//! A package keeps every ZIP entry it was opened with, in order, and parses
//! the three parts the engine mutates: the main document, its relationship
//! part, and `[Content_Types].xml`. Everything else is copied through
//! byte-identical on save.

use crate::writer::write_document;
use crate::{parser, Error, Result, XmlElement};
use std::io::{Cursor, Read, Write};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

/// Main document part name.
const DOCUMENT_PART: &str = "word/document.xml";

/// Relationship part of the main document.
const DOCUMENT_RELS_PART: &str = "word/_rels/document.xml.rels";

/// Content types part name.
const CONTENT_TYPES_PART: &str = "[Content_Types].xml";

/// Relationship type URI for images.
const IMAGE_RELATIONSHIP_TYPE: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/image";

/// An opened `.docx` package with a mutable main document tree.
#[derive(Debug)]
pub struct DocxPackage {
    /// All ZIP entries in original order. The three parsed parts keep their
    /// slot here and are re-serialized into it on save.
    entries: Vec<(String, Vec<u8>)>,
    document: XmlElement,
    rels: XmlElement,
    content_types: XmlElement,
}

impl DocxPackage {
    /// Open a package from `.docx` bytes.
    pub fn open(bytes: &[u8]) -> Result<Self> {
        let mut archive = ZipArchive::new(Cursor::new(bytes.to_vec()))?;

        let mut entries: Vec<(String, Vec<u8>)> = Vec::with_capacity(archive.len());
        for i in 0..archive.len() {
            let mut file = archive.by_index(i)?;
            let name = file.name().to_string();
            if name.ends_with('/') {
                continue;
            }
            let mut contents = Vec::new();
            file.read_to_end(&mut contents)?;
            entries.push((name, contents));
        }

        let document = match entry_text(&entries, DOCUMENT_PART) {
            Some(text) => parser::parse(&text)?,
            None => return Err(Error::MissingPart(DOCUMENT_PART.to_string())),
        };
        let rels = match entry_text(&entries, DOCUMENT_RELS_PART) {
            Some(text) => parser::parse(&text)?,
            None => empty_relationships(),
        };
        let content_types = match entry_text(&entries, CONTENT_TYPES_PART) {
            Some(text) => parser::parse(&text)?,
            None => default_content_types(),
        };

        Ok(Self {
            entries,
            document,
            rels,
            content_types,
        })
    }

    /// The root element of the main document part (`w:document`).
    pub fn document(&self) -> &XmlElement {
        &self.document
    }

    /// Mutable access to the `w:body` element of the main document.
    pub fn body_mut(&mut self) -> Result<&mut XmlElement> {
        self.document
            .find_child_mut("w:body")
            .ok_or_else(|| Error::InvalidStructure("document has no w:body element".to_string()))
    }

    /// Read-only access to the `w:body` element.
    pub fn body(&self) -> Result<&XmlElement> {
        self.document
            .find_child("w:body")
            .ok_or_else(|| Error::InvalidStructure("document has no w:body element".to_string()))
    }

    /// Register an image part: store the bytes under `word/media/`, add an
    /// image relationship to the main document, and make sure the content
    /// type for the extension is declared. Returns the relationship id.
    pub fn add_image_part(
        &mut self,
        bytes: &[u8],
        extension: &str,
        content_type: &str,
    ) -> Result<String> {
        let media_name = format!("word/media/image{}.{}", self.next_media_index(), extension);
        self.entries.push((media_name.clone(), bytes.to_vec()));

        let rel_id = format!("rId{}", self.next_relationship_number());
        let target = media_name.trim_start_matches("word/").to_string();
        self.rels.push_element(
            XmlElement::new("Relationship")
                .with_attribute("Id", rel_id.as_str())
                .with_attribute("Type", IMAGE_RELATIONSHIP_TYPE)
                .with_attribute("Target", target),
        );

        let declared = self.content_types.child_elements().any(|el| {
            el.name == "Default"
                && el
                    .get_attribute("Extension")
                    .is_some_and(|ext| ext.eq_ignore_ascii_case(extension))
        });
        if !declared {
            self.content_types.push_element(
                XmlElement::new("Default")
                    .with_attribute("Extension", extension)
                    .with_attribute("ContentType", content_type),
            );
        }

        Ok(rel_id)
    }

    /// Serialize the mutated parts and rebuild the ZIP container.
    pub fn save(&mut self) -> Result<Vec<u8>> {
        set_entry(
            &mut self.entries,
            DOCUMENT_PART,
            write_document(&self.document)?.into_bytes(),
        );
        set_entry(
            &mut self.entries,
            DOCUMENT_RELS_PART,
            write_document(&self.rels)?.into_bytes(),
        );
        set_entry(
            &mut self.entries,
            CONTENT_TYPES_PART,
            write_document(&self.content_types)?.into_bytes(),
        );

        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        for (name, contents) in &self.entries {
            // Media entries are stored: image bytes do not compress well.
            let method = if name.starts_with("word/media/") {
                CompressionMethod::Stored
            } else {
                CompressionMethod::Deflated
            };
            let options = SimpleFileOptions::default().compression_method(method);
            writer.start_file(name.as_str(), options)?;
            writer.write_all(contents)?;
        }
        Ok(writer.finish()?.into_inner())
    }

    fn next_media_index(&self) -> u32 {
        let mut max = 0u32;
        for (name, _) in &self.entries {
            if let Some(rest) = name.strip_prefix("word/media/image") {
                let digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
                if let Ok(n) = digits.parse::<u32>() {
                    max = max.max(n);
                }
            }
        }
        max + 1
    }

    fn next_relationship_number(&self) -> u32 {
        let mut max = 0u32;
        for el in self.rels.child_elements() {
            if let Some(id) = el.get_attribute("Id") {
                if let Some(n) = id.strip_prefix("rId").and_then(|d| d.parse::<u32>().ok()) {
                    max = max.max(n);
                }
            }
        }
        max + 1
    }
}

fn entry_text(entries: &[(String, Vec<u8>)], name: &str) -> Option<String> {
    entries
        .iter()
        .find(|(n, _)| n == name)
        .map(|(_, contents)| String::from_utf8_lossy(contents).into_owned())
}

fn set_entry(entries: &mut Vec<(String, Vec<u8>)>, name: &str, contents: Vec<u8>) {
    match entries.iter_mut().find(|(n, _)| n == name) {
        Some((_, slot)) => *slot = contents,
        None => entries.push((name.to_string(), contents)),
    }
}

fn empty_relationships() -> XmlElement {
    XmlElement::new("Relationships").with_attribute(
        "xmlns",
        "http://schemas.openxmlformats.org/package/2006/relationships",
    )
}

fn default_content_types() -> XmlElement {
    XmlElement::new("Types")
        .with_attribute(
            "xmlns",
            "http://schemas.openxmlformats.org/package/2006/content-types",
        )
        .with_child(
            XmlElement::new("Default")
                .with_attribute("Extension", "rels")
                .with_attribute(
                    "ContentType",
                    "application/vnd.openxmlformats-package.relationships+xml",
                ),
        )
        .with_child(
            XmlElement::new("Default")
                .with_attribute("Extension", "xml")
                .with_attribute("ContentType", "application/xml"),
        )
}
