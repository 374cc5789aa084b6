//! Mutable XML tree types for WordprocessingML parts.
//!
//! Element and attribute names keep their qualified form (`w:p`, `w:tbl`)
//! exactly as they appear in the part, so a parse/write round trip does not
//! disturb prefixes or namespace declarations.

/// An XML attribute.
#[derive(Debug, Clone, PartialEq)]
pub struct XmlAttribute {
    /// Qualified attribute name (e.g. `w:val`, `xmlns:wp`).
    pub name: String,

    /// The attribute value (unescaped).
    pub value: String,
}

/// A child of an XML element: either a nested element or character data.
#[derive(Debug, Clone, PartialEq)]
pub enum XmlNode {
    /// A child element.
    Element(XmlElement),

    /// Text content (unescaped).
    Text(String),
}

impl XmlNode {
    /// The contained element, if this node is one.
    pub fn as_element(&self) -> Option<&XmlElement> {
        match self {
            XmlNode::Element(el) => Some(el),
            XmlNode::Text(_) => None,
        }
    }

    /// Mutable access to the contained element, if this node is one.
    pub fn as_element_mut(&mut self) -> Option<&mut XmlElement> {
        match self {
            XmlNode::Element(el) => Some(el),
            XmlNode::Text(_) => None,
        }
    }
}

/// An XML element with ordered attributes and children.
#[derive(Debug, Clone, PartialEq)]
pub struct XmlElement {
    /// Qualified element name (e.g. `w:p`).
    pub name: String,

    /// Attributes in document order.
    pub attributes: Vec<XmlAttribute>,

    /// Child nodes in document order.
    pub children: Vec<XmlNode>,
}

impl XmlElement {
    /// Create a new empty element.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    /// The local part of the element name (after any `prefix:`).
    pub fn local_name(&self) -> &str {
        match self.name.split_once(':') {
            Some((_, local)) => local,
            None => &self.name,
        }
    }

    /// Get an attribute value by qualified name.
    pub fn get_attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.value.as_str())
    }

    /// Set an attribute, replacing any existing value for the same name.
    pub fn set_attribute(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.attributes.iter_mut().find(|a| a.name == name) {
            Some(attr) => attr.value = value,
            None => self.attributes.push(XmlAttribute { name, value }),
        }
    }

    /// Builder-style attribute setter for constructing subtrees.
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_attribute(name, value);
        self
    }

    /// Append a child element.
    pub fn push_element(&mut self, element: XmlElement) {
        self.children.push(XmlNode::Element(element));
    }

    /// Builder-style child appender for constructing subtrees.
    pub fn with_child(mut self, element: XmlElement) -> Self {
        self.push_element(element);
        self
    }

    /// Replace all children with a single text node.
    pub fn set_text(&mut self, text: impl Into<String>) {
        self.children = vec![XmlNode::Text(text.into())];
    }

    /// Iterate over child elements.
    pub fn child_elements(&self) -> impl Iterator<Item = &XmlElement> {
        self.children.iter().filter_map(XmlNode::as_element)
    }

    /// Iterate mutably over child elements.
    pub fn child_elements_mut(&mut self) -> impl Iterator<Item = &mut XmlElement> {
        self.children.iter_mut().filter_map(XmlNode::as_element_mut)
    }

    /// First child element with the given qualified name.
    pub fn find_child(&self, name: &str) -> Option<&XmlElement> {
        self.child_elements().find(|el| el.name == name)
    }

    /// Mutable first child element with the given qualified name.
    pub fn find_child_mut(&mut self, name: &str) -> Option<&mut XmlElement> {
        self.child_elements_mut().find(|el| el.name == name)
    }

    /// Concatenated text of all descendant text nodes.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        for child in &self.children {
            match child {
                XmlNode::Text(text) => out.push_str(text),
                XmlNode::Element(el) => el.collect_text(out),
            }
        }
    }

    /// Concatenated text of descendant `w:t` elements, in document order.
    ///
    /// This is the visible text of a paragraph, row, or cell as Word shows
    /// it; inter-element whitespace in the part does not contribute.
    pub fn run_text(&self) -> String {
        let mut out = String::new();
        self.visit_named("w:t", &mut |el| out.push_str(&el.text_content()));
        out
    }

    /// Visit every descendant element with the given qualified name, in
    /// document order.
    pub fn visit_named<F: FnMut(&XmlElement)>(&self, name: &str, f: &mut F) {
        for el in self.child_elements() {
            if el.name == name {
                f(el);
            } else {
                el.visit_named(name, f);
            }
        }
    }

    /// Mutable variant of [`visit_named`](Self::visit_named).
    pub fn visit_named_mut<F: FnMut(&mut XmlElement)>(&mut self, name: &str, f: &mut F) {
        for el in self.child_elements_mut() {
            if el.name == name {
                f(el);
            } else {
                el.visit_named_mut(name, f);
            }
        }
    }
}
