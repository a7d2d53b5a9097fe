//! Playlist lines and the `#NAME[:VALUE]` directives they hold.

use std::fmt;

use crate::attributes::{parse_attribute_list, AttributeList};
use crate::error::FormatError;

/// A `#NAME` or `#NAME:VALUE` line.
///
/// The attribute list is parsed on first request and cached. Changes made
/// through [`Tag::attributes_mut`] are only written back into the raw value
/// by [`Tag::update_value`].
#[derive(Debug, Clone, PartialEq)]
pub struct Tag {
    /// Spaces and tabs before the `#`.
    indent: String,
    name: String,
    value: String,
    has_separator: bool,
    attributes: Option<AttributeList>,
}

impl Tag {
    /// `value` is `None` for a directive without `:`.
    pub fn new<S: Into<String>>(name: S, value: Option<String>) -> Tag {
        Tag {
            indent: String::new(),
            name: name.into(),
            has_separator: value.is_some(),
            value: value.unwrap_or_default(),
            attributes: None,
        }
    }

    /// Split a line starting with `#` on its first `:`. Leading spaces and
    /// tabs are kept as the indent.
    pub fn from_line(line: &str) -> Tag {
        let rest = line.trim_start_matches([' ', '\t']);
        let indent = &line[..line.len() - rest.len()];
        let rest = rest.strip_prefix('#').unwrap_or(rest);
        let mut tag = match rest.split_once(':') {
            Some((name, value)) => Tag::new(name, Some(value.to_string())),
            None => Tag::new(rest, None),
        };
        tag.indent = indent.to_string();
        tag
    }

    pub fn indent(&self) -> &str {
        &self.indent
    }

    /// Name without the leading `#`.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The text after `:`; empty when there is no separator.
    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn has_separator(&self) -> bool {
        self.has_separator
    }

    pub fn set_value<S: Into<String>>(&mut self, value: S) {
        self.value = value.into();
        self.has_separator = true;
        self.attributes = None;
    }

    pub fn attributes(&mut self) -> Result<&AttributeList, FormatError> {
        self.attributes_mut().map(|attrs| &*attrs)
    }

    pub fn attributes_mut(&mut self) -> Result<&mut AttributeList, FormatError> {
        let attrs = match self.attributes.take() {
            Some(attrs) => attrs,
            None => parse_attribute_list(&self.value)?,
        };
        Ok(self.attributes.insert(attrs))
    }

    /// The cached attribute list, if it has been parsed.
    pub fn parsed_attributes(&self) -> Option<&AttributeList> {
        self.attributes.as_ref()
    }

    /// Re-render the raw value from the cached attribute list. A tag whose
    /// attributes were never parsed is left untouched.
    pub fn update_value(&mut self) {
        if let Some(attrs) = &self.attributes {
            self.value = attrs.to_string();
            self.has_separator = true;
        }
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.has_separator {
            write!(f, "{}#{}:{}", self.indent, self.name, self.value)
        } else {
            write!(f, "{}#{}", self.indent, self.name)
        }
    }
}

/// One line of a playlist, kept so the text can be rebuilt.
#[derive(Debug, Clone, PartialEq)]
pub enum Line {
    Tag(Tag),
    /// The URI text as written, indent included, before resolution.
    Uri(String),
    /// Empty or whitespace-only line, verbatim.
    Blank(String),
}

impl Line {
    pub fn as_tag(&self) -> Option<&Tag> {
        match self {
            Line::Tag(tag) => Some(tag),
            _ => None,
        }
    }

    pub fn as_tag_mut(&mut self) -> Option<&mut Tag> {
        match self {
            Line::Tag(tag) => Some(tag),
            _ => None,
        }
    }
}

impl fmt::Display for Line {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Line::Tag(tag) => write!(f, "{}", tag),
            Line::Uri(uri) => f.write_str(uri),
            Line::Blank(text) => f.write_str(text),
        }
    }
}
