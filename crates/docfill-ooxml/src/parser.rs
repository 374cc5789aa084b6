//! XML parser that builds mutable element trees.

use crate::{Error, Result, XmlAttribute, XmlElement, XmlNode};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

/// Parse an XML document (or fragment with a single root) into a tree.
///
/// Comments, processing instructions, the XML declaration, and DOCTYPE are
/// dropped. Text content is unescaped; whitespace between elements is kept
/// so that a parse/write round trip preserves the part.
pub fn parse(content: &str) -> Result<XmlElement> {
    let mut reader = Reader::from_str(content);
    reader.config_mut().trim_text_start = false;
    reader.config_mut().trim_text_end = false;
    // End-tag matching is reported through our own error type.
    reader.config_mut().check_end_names = false;

    let mut root: Option<XmlElement> = None;
    let mut stack: Vec<XmlElement> = Vec::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                stack.push(element_from_start(&e)?);
            }
            Ok(Event::End(e)) => {
                let element = match stack.pop() {
                    Some(el) => el,
                    None => {
                        return Err(Error::InvalidStructure(format!(
                            "closing tag </{}> with no open element",
                            String::from_utf8_lossy(e.name().as_ref())
                        )))
                    }
                };
                let end_name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                if element.name != end_name {
                    return Err(Error::MismatchedEndTag {
                        expected: element.name,
                        found: end_name,
                    });
                }
                attach(element, &mut stack, &mut root)?;
            }
            Ok(Event::Empty(e)) => {
                let element = element_from_start(&e)?;
                attach(element, &mut stack, &mut root)?;
            }
            Ok(Event::Text(e)) => {
                let text = e.unescape()?.into_owned();
                match stack.last_mut() {
                    Some(parent) => parent.children.push(XmlNode::Text(text)),
                    // Whitespace around the root is insignificant.
                    None if text.trim().is_empty() => {}
                    None => {
                        return Err(Error::InvalidStructure(
                            "character data outside the root element".to_string(),
                        ))
                    }
                }
            }
            Ok(Event::CData(e)) => {
                let text = String::from_utf8_lossy(&e.into_inner()).into_owned();
                if let Some(parent) = stack.last_mut() {
                    parent.children.push(XmlNode::Text(text));
                }
            }
            Ok(Event::Comment(_) | Event::PI(_) | Event::Decl(_) | Event::DocType(_)) => {}
            Ok(Event::Eof) => break,
            Err(e) => return Err(Error::XmlSyntax(e.to_string())),
        }
    }

    if let Some(open) = stack.last() {
        return Err(Error::UnexpectedEof(open.name.clone()));
    }
    root.ok_or(Error::EmptyDocument)
}

fn element_from_start(e: &BytesStart<'_>) -> Result<XmlElement> {
    let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
    let mut element = XmlElement::new(name);
    for attr in e.attributes() {
        let attr = attr?;
        element.attributes.push(XmlAttribute {
            name: String::from_utf8_lossy(attr.key.as_ref()).into_owned(),
            value: attr.unescape_value()?.into_owned(),
        });
    }
    Ok(element)
}

fn attach(
    element: XmlElement,
    stack: &mut Vec<XmlElement>,
    root: &mut Option<XmlElement>,
) -> Result<()> {
    match stack.last_mut() {
        Some(parent) => {
            parent.children.push(XmlNode::Element(element));
            Ok(())
        }
        None if root.is_some() => Err(Error::InvalidStructure(
            "multiple root elements".to_string(),
        )),
        None => {
            *root = Some(element);
            Ok(())
        }
    }
}
