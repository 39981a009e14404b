//! In-memory element tree for one record

use quick_xml::escape::escape;
use std::fmt;

/// An element with its attributes, text and child elements
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct XmlElement {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub text: String,
    pub children: Vec<XmlElement>,
}

impl XmlElement {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn set_attribute(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.attributes.iter_mut().find(|(key, _)| *key == name) {
            Some((_, existing)) => *existing = value,
            None => self.attributes.push((name, value)),
        }
    }

    /// The `occurrence`-th child named `name`
    pub fn child(&self, name: &str, occurrence: usize) -> Option<&XmlElement> {
        self.children.iter().filter(|c| c.name == name).nth(occurrence)
    }

    /// The `occurrence`-th child named `name`, creating it and any
    /// earlier occurrences as needed
    pub fn child_mut(&mut self, name: &str, occurrence: usize) -> &mut XmlElement {
        let existing = self.children.iter().filter(|c| c.name == name).count();
        for _ in existing..=occurrence {
            self.children.push(XmlElement::new(name));
        }
        let index = self
            .children
            .iter()
            .enumerate()
            .filter(|(_, c)| c.name == name)
            .nth(occurrence)
            .map_or(self.children.len() - 1, |(i, _)| i);
        &mut self.children[index]
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty() && self.children.is_empty()
    }
}

/// Compact markup, used as the raw text of a record in diagnostics
impl fmt::Display for XmlElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}", self.name)?;
        for (key, value) in &self.attributes {
            write!(f, " {key}=\"{}\"", escape(value.as_str()))?;
        }
        if self.is_empty() {
            return write!(f, "/>");
        }
        write!(f, ">{}", escape(self.text.as_str()))?;
        for child in &self.children {
            write!(f, "{child}")?;
        }
        write!(f, "</{}>", self.name)
    }
}
