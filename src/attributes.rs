//! Attribute lists: `NAME=VALUE,NAME=VALUE,...`
//!
//! [`parse_attribute_list`] tokenizes the value of a directive such as
//! `#EXT-X-STREAM-INF` into typed [`Value`]s. The value kind is not declared
//! in the text, it is inferred from the characters of the value:
//!
//! | Starts with | Becomes                                                      |
//! |-------------|--------------------------------------------------------------|
//! | `"`         | String, verbatim up to the next `"`                          |
//! | `-`         | Integer, or Float once a `.` shows up                        |
//! | `.`         | Float                                                        |
//! | `1`-`9`     | Integer, Float after `.`, Resolution after `x`               |
//! | `0`         | Integer `0`, Bytes after `0x`, otherwise as `1`-`9` or Enum  |
//! | other       | Enum                                                         |
//!
//! The lexer is a single pass over the bytes with one character of
//! lookahead. The only backtracking is the re-examine step: the `0` and `0x`
//! states may decide that the run consumed so far was an Enum after all,
//! switch to the Enum state and look at the current character again.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::error::{FormatError, FormatErrorKind};
use crate::value::{Resolution, Value};

#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    pub name: String,
    pub value: Value,
}

impl Attribute {
    pub fn new<S: Into<String>>(name: S, value: Value) -> Attribute {
        Attribute {
            name: name.into(),
            value,
        }
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}={}", self.name, self.value)
    }
}

/// Attributes in declaration order, indexed by name.
///
/// Duplicate names are kept. Decoders use [`AttributeList::get_last`], so the
/// last declaration of a name wins.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttributeList {
    attrs: Vec<Attribute>,
    index: HashMap<String, Vec<usize>>,
}

impl AttributeList {
    pub fn new() -> AttributeList {
        Default::default()
    }

    pub fn push(&mut self, attr: Attribute) {
        self.index
            .entry(attr.name.clone())
            .or_default()
            .push(self.attrs.len());
        self.attrs.push(attr);
    }

    pub fn get_all<'a>(&'a self, name: &str) -> impl Iterator<Item = &'a Attribute> + 'a {
        self.index
            .get(name)
            .into_iter()
            .flatten()
            .map(move |&i| &self.attrs[i])
    }

    pub fn get_first(&self, name: &str) -> Option<&Attribute> {
        self.index
            .get(name)
            .and_then(|positions| positions.first())
            .map(|&i| &self.attrs[i])
    }

    pub fn get_last(&self, name: &str) -> Option<&Attribute> {
        self.index
            .get(name)
            .and_then(|positions| positions.last())
            .map(|&i| &self.attrs[i])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Removes every attribute called `name`.
    pub fn remove(&mut self, name: &str) {
        if self.index.remove(name).is_some() {
            self.attrs.retain(|attr| attr.name != name);
            self.reindex();
        }
    }

    /// Replaces the value of the first `name` in place and drops any later
    /// duplicates. Appends when `name` isn't present.
    pub fn set<S: Into<String>>(&mut self, name: S, value: Value) {
        let name = name.into();
        let positions = self.index.get(&name).map(|p| (p[0], p.len()));
        match positions {
            None => self.push(Attribute::new(name, value)),
            Some((first, count)) => {
                self.attrs[first].value = value;
                if count > 1 {
                    let mut position = 0;
                    self.attrs.retain(|attr| {
                        let keep = attr.name != name || position == first;
                        position += 1;
                        keep
                    });
                    self.reindex();
                }
            }
        }
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Attribute> {
        self.attrs.iter()
    }

    pub fn len(&self) -> usize {
        self.attrs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attrs.is_empty()
    }

    fn reindex(&mut self) {
        self.index.clear();
        for (i, attr) in self.attrs.iter().enumerate() {
            self.index.entry(attr.name.clone()).or_default().push(i);
        }
    }
}

impl<'a> IntoIterator for &'a AttributeList {
    type Item = &'a Attribute;
    type IntoIter = std::slice::Iter<'a, Attribute>;

    fn into_iter(self) -> Self::IntoIter {
        self.attrs.iter()
    }
}

impl FromIterator<Attribute> for AttributeList {
    fn from_iter<I: IntoIterator<Item = Attribute>>(iter: I) -> Self {
        let mut list = AttributeList::new();
        for attr in iter {
            list.push(attr);
        }
        list
    }
}

impl fmt::Display for AttributeList {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for (i, attr) in self.attrs.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{}", attr)?;
        }
        Ok(())
    }
}

impl FromStr for AttributeList {
    type Err = FormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_attribute_list(s)
    }
}

// -----------------------------------------------------------------------------------------------
// Lexer
// -----------------------------------------------------------------------------------------------

/// Parse the comma separated attribute list following a directive's `:`.
pub fn parse_attribute_list(input: &str) -> Result<AttributeList, FormatError> {
    let mut lexer = Lexer::new(input);
    let bytes = input.as_bytes();
    let mut pos = 0;
    while pos < bytes.len() {
        match lexer.step(bytes[pos], pos)? {
            Step::Advance => pos += 1,
            Step::Reexamine => {}
        }
    }
    lexer.finish()
}

fn is_space(c: u8) -> bool {
    c == b' ' || c == b'\t'
}

fn is_separator(c: u8) -> bool {
    c == b',' || is_space(c)
}

fn is_name_char(c: u8) -> bool {
    c.is_ascii_uppercase() || c.is_ascii_digit() || c == b'-' || c == b'_'
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// Before an attribute name.
    Start,
    Name,
    /// Whitespace after a name, waiting for `=`.
    NameEnd,
    /// After `=`, before the first value character.
    ValueStart,
    QuotedString,
    Enum,
    Integer { signed: bool },
    Float,
    /// A single `0` has been consumed.
    Zero,
    /// `0x` or `0X` has been consumed.
    Hex,
    /// Resolution height digits, the width is in `Lexer::width`.
    Height,
    /// A value is complete; only separators may follow.
    ValueEnd,
}

#[derive(Debug, PartialEq, Eq)]
enum Step {
    /// Move on to the next character.
    Advance,
    /// The state changed; feed the same character again.
    Reexamine,
}

struct Lexer<'a> {
    input: &'a str,
    state: State,
    /// Start of the current name or value run.
    start: usize,
    name: &'a str,
    width: u64,
    attrs: AttributeList,
}

impl<'a> Lexer<'a> {
    fn new(input: &'a str) -> Lexer<'a> {
        Lexer {
            input,
            state: State::Start,
            start: 0,
            name: "",
            width: 0,
            attrs: AttributeList::new(),
        }
    }

    fn unexpected(&self, pos: usize, expected: &'static str) -> FormatError {
        let found = self.input[pos..].chars().next().unwrap_or('\0');
        FormatError::new(FormatErrorKind::UnexpectedChar { found, expected }).at_column(pos)
    }

    fn step(&mut self, c: u8, pos: usize) -> Result<Step, FormatError> {
        match self.state {
            State::Start => {
                if is_name_char(c) {
                    self.start = pos;
                    self.state = State::Name;
                } else if !is_separator(c) {
                    return Err(self.unexpected(pos, "space, comma or start of attribute name"));
                }
            }
            State::Name => {
                if c == b'=' || is_space(c) {
                    let input = self.input;
                    self.name = &input[self.start..pos];
                    self.state = if c == b'=' {
                        State::ValueStart
                    } else {
                        State::NameEnd
                    };
                } else if !is_name_char(c) {
                    return Err(self.unexpected(pos, "space, '=' or attribute name character"));
                }
            }
            State::NameEnd => {
                if c == b'=' {
                    self.state = State::ValueStart;
                } else if !is_space(c) {
                    return Err(self.unexpected(pos, "'='"));
                }
            }
            State::ValueStart => {
                self.start = pos;
                match c {
                    c if is_space(c) => {}
                    b',' => return Err(self.unexpected(pos, "attribute value")),
                    b'"' => {
                        self.start = pos + 1;
                        self.state = State::QuotedString;
                    }
                    b'-' => self.state = State::Integer { signed: true },
                    b'.' => self.state = State::Float,
                    b'0' => self.state = State::Zero,
                    b'1'..=b'9' => self.state = State::Integer { signed: false },
                    _ => self.state = State::Enum,
                }
            }
            State::QuotedString => {
                if c == b'"' {
                    let input = self.input;
                    let value = &input[self.start..pos];
                    self.emit(Value::String(value.to_string()));
                    self.state = State::ValueEnd;
                }
            }
            State::Enum => {
                if is_separator(c) {
                    self.finish_value(pos)?;
                    self.after_value(c);
                } else if c == b'"' {
                    return Err(self.unexpected(pos, "non-double-quote character inside Enum"));
                }
            }
            State::Integer { signed } => match c {
                b'.' => self.state = State::Float,
                b'x' | b'X' => {
                    if signed {
                        return Err(FormatError::new(FormatErrorKind::SignedResolution)
                            .at_column(self.start));
                    }
                    self.width = parse_decimal(&self.input[self.start..pos])
                        .ok_or_else(|| self.invalid_integer(pos))?;
                    self.start = pos + 1;
                    self.state = State::Height;
                }
                c if is_separator(c) => {
                    self.finish_value(pos)?;
                    self.after_value(c);
                }
                _ => {}
            },
            State::Zero => match c {
                b'.' => self.state = State::Float,
                b'0'..=b'9' => self.state = State::Integer { signed: false },
                b'x' | b'X' => self.state = State::Hex,
                c if is_separator(c) => {
                    self.finish_value(pos)?;
                    self.after_value(c);
                }
                _ => {
                    self.state = State::Enum;
                    return Ok(Step::Reexamine);
                }
            },
            State::Hex => {
                if is_separator(c) {
                    self.finish_value(pos)?;
                    self.after_value(c);
                } else if !c.is_ascii_hexdigit() {
                    self.state = State::Enum;
                    return Ok(Step::Reexamine);
                }
            }
            State::Float | State::Height => {
                if is_separator(c) {
                    self.finish_value(pos)?;
                    self.after_value(c);
                }
            }
            State::ValueEnd => {
                if c == b',' {
                    self.state = State::Start;
                } else if !is_space(c) {
                    return Err(self.unexpected(pos, "space or comma"));
                }
            }
        }
        Ok(Step::Advance)
    }

    /// End of input closes the open value the same way a separator would.
    fn finish(mut self) -> Result<AttributeList, FormatError> {
        let end = self.input.len();
        match self.state {
            State::Start | State::ValueEnd => {}
            State::Name | State::NameEnd => {
                return Err(FormatError::new(FormatErrorKind::UnexpectedEnd { expected: "'='" })
                    .at_column(end))
            }
            State::ValueStart => {
                return Err(FormatError::new(FormatErrorKind::UnexpectedEnd {
                    expected: "attribute value",
                })
                .at_column(end))
            }
            State::QuotedString => {
                return Err(
                    FormatError::new(FormatErrorKind::UnterminatedString).at_column(self.start - 1)
                )
            }
            _ => self.finish_value(end)?,
        }
        Ok(self.attrs)
    }

    /// Convert `input[start..end]` according to the current value state.
    fn finish_value(&mut self, end: usize) -> Result<(), FormatError> {
        let input = self.input;
        let text = &input[self.start..end];
        let value = match self.state {
            State::Enum => Value::Enum(text.to_string()),
            State::Integer { .. } | State::Zero => {
                Value::Integer(text.parse().map_err(|_| self.invalid_integer(end))?)
            }
            State::Float => Value::Float(text.parse().map_err(|_| {
                FormatError::new(FormatErrorKind::InvalidFloat {
                    text: text.to_string(),
                })
                .at_column(self.start)
            })?),
            State::Hex => {
                let digits = &text[2..];
                if digits.len() % 2 != 0 {
                    return Err(FormatError::new(FormatErrorKind::OddHexLength {
                        text: text.to_string(),
                    })
                    .at_column(self.start));
                }
                Value::Bytes(hex::decode(digits).map_err(|_| {
                    FormatError::new(FormatErrorKind::InvalidHex {
                        text: text.to_string(),
                    })
                    .at_column(self.start)
                })?)
            }
            State::Height => {
                if text.is_empty() {
                    return Err(FormatError::new(FormatErrorKind::MissingHeight).at_column(end));
                }
                let height = parse_decimal(text).ok_or_else(|| self.invalid_integer(end))?;
                Value::Resolution(Resolution::new(self.width, height))
            }
            state => unreachable!("no value is open in state {:?}", state),
        };
        self.emit(value);
        Ok(())
    }

    fn invalid_integer(&self, end: usize) -> FormatError {
        FormatError::new(FormatErrorKind::InvalidInteger {
            text: self.input[self.start..end].to_string(),
        })
        .at_column(self.start)
    }

    fn emit(&mut self, value: Value) {
        self.attrs.push(Attribute::new(self.name, value));
    }

    fn after_value(&mut self, separator: u8) {
        self.state = if separator == b',' {
            State::Start
        } else {
            State::ValueEnd
        };
    }
}

/// An unsigned decimal digit run.
fn parse_decimal(text: &str) -> Option<u64> {
    if text.is_empty() || !text.bytes().all(|c| c.is_ascii_digit()) {
        return None;
    }
    text.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(input: &str) -> AttributeList {
        parse_attribute_list(input).unwrap()
    }

    fn single(input: &str) -> Value {
        let list = parse(input);
        assert_eq!(list.len(), 1, "{:?}", list);
        list.iter().next().unwrap().value.clone()
    }

    fn error_kind(input: &str) -> FormatErrorKind {
        parse_attribute_list(input).unwrap_err().kind
    }

    #[test]
    fn mixed_list_parses_and_renders_back() {
        let line = "TYPE=AUDIO,GROUP-ID=\"aac\",BITRATE=600000,SCORE=-3.14159,\
                    KEY=0xDEADBEEF00112233,RESOLUTION=1920x1080,NAME=\"English\",\
                    DEFAULT=YES,AUTOSELECT=YES,LANGUAGE=\"en\",\
                    URI=\"main/english-audio.m3u8\",EXTRA=0";
        let attrs = parse(line);

        assert_eq!(attrs.get_last("TYPE").unwrap().value, Value::enumerated("AUDIO"));
        assert_eq!(attrs.get_last("GROUP-ID").unwrap().value, Value::string("aac"));
        assert_eq!(attrs.get_last("BITRATE").unwrap().value, Value::integer(600000));
        assert_eq!(attrs.get_last("SCORE").unwrap().value, Value::float(-3.14159));
        assert_eq!(
            attrs.get_last("KEY").unwrap().value,
            Value::bytes(vec![0xDE, 0xAD, 0xBE, 0xEF, 0x00, 0x11, 0x22, 0x33])
        );
        assert_eq!(
            attrs.get_last("RESOLUTION").unwrap().value,
            Value::resolution(1920, 1080)
        );
        assert_eq!(attrs.get_last("DEFAULT").unwrap().value, Value::yes_no(true));
        assert_eq!(attrs.get_last("EXTRA").unwrap().value, Value::integer(0));
        assert_eq!(attrs.to_string(), line);
    }

    #[test]
    fn rendition_attributes_round_trip() {
        let line = "TYPE=AUDIO,GROUP-ID=\"aac\",BANDWIDTH=600000";
        let attrs = parse(line);
        assert_eq!(attrs.get_first("GROUP-ID").unwrap().value, Value::string("aac"));
        assert_eq!(attrs.get_first("BANDWIDTH").unwrap().value, Value::integer(600000));
        assert_eq!(attrs.to_string(), line);
    }

    #[test]
    fn separators_are_normalized() {
        let attrs = parse("  A=1 ,\tB=\"x\" ,, C=YES  ");
        assert_eq!(attrs.to_string(), "A=1,B=\"x\",C=YES");
    }

    #[test]
    fn whitespace_between_name_and_equals() {
        let attrs = parse("A =1,B= 2");
        assert_eq!(attrs.get_last("A").unwrap().value, Value::integer(1));
        assert_eq!(attrs.get_last("B").unwrap().value, Value::integer(2));
    }

    #[test]
    fn empty_list() {
        assert!(parse("").is_empty());
        assert!(parse(" , ").is_empty());
    }

    #[test]
    fn quoted_strings_are_verbatim() {
        assert_eq!(
            single("CODECS=\"avc1.4d001f,mp4a.40.2\""),
            Value::string("avc1.4d001f,mp4a.40.2")
        );
        assert_eq!(single("NAME=\"\""), Value::string(""));
        assert_eq!(single("NAME=\"Fran\u{e7}ais\""), Value::string("Fran\u{e7}ais"));
    }

    #[test]
    fn numbers() {
        assert_eq!(single("N=0"), Value::integer(0));
        assert_eq!(single("N=42"), Value::integer(42));
        assert_eq!(single("N=-42"), Value::integer(-42));
        assert_eq!(single("N=007"), Value::integer(7));
        assert_eq!(single("N=2.5"), Value::float(2.5));
        assert_eq!(single("N=-0.5"), Value::float(-0.5));
        assert_eq!(single("N=0.25"), Value::float(0.25));
        assert_eq!(single("N=.75"), Value::float(0.75));
        assert_eq!(single("N=1.5e3"), Value::float(1500.0));
    }

    #[test]
    fn bytes() {
        assert_eq!(
            single("KEY=0xDEADBEEF"),
            Value::bytes(vec![0xDE, 0xAD, 0xBE, 0xEF])
        );
        assert_eq!(single("IV=0Xa0b1"), Value::bytes(vec![0xA0, 0xB1]));
        assert_eq!(single("IV=0x"), Value::bytes(vec![]));
        assert_eq!(
            parse("IV=0x,N=1").get_last("IV").map(|a| &a.value),
            Some(&Value::bytes(vec![]))
        );
    }

    #[test]
    fn odd_hex_length_is_an_error() {
        assert_eq!(
            error_kind("KEY=0xABC"),
            FormatErrorKind::OddHexLength {
                text: "0xABC".into()
            }
        );
        assert!(parse_attribute_list("KEY=0xABC,N=1").is_err());
    }

    #[test]
    fn resolution() {
        assert_eq!(single("RES=1920x1080"), Value::resolution(1920, 1080));
        assert_eq!(single("RES=640X480"), Value::resolution(640, 480));
        assert_eq!(single("RES=0640x480"), Value::resolution(640, 480));
    }

    #[test]
    fn resolution_errors() {
        assert_eq!(error_kind("RES=1920x"), FormatErrorKind::MissingHeight);
        assert_eq!(error_kind("RES=1920x,N=1"), FormatErrorKind::MissingHeight);
        assert_eq!(error_kind("RES=-1920x1080"), FormatErrorKind::SignedResolution);
        assert!(matches!(
            error_kind("RES=1920x10a0"),
            FormatErrorKind::InvalidInteger { .. }
        ));
    }

    #[test]
    fn zero_width_resolution_reads_back_as_hex() {
        let even = format!("RES={}", Value::resolution(0, 1080));
        assert_eq!(even, "RES=0x1080");
        assert_eq!(single(&even), Value::bytes(vec![0x10, 0x80]));

        let odd = format!("RES={}", Value::resolution(0, 108));
        assert_eq!(
            error_kind(&odd),
            FormatErrorKind::OddHexLength {
                text: "0x108".into()
            }
        );
    }

    #[test]
    fn zero_run_redispatches_to_enum() {
        assert_eq!(single("E=0ABC"), Value::enumerated("0ABC"));
        assert_eq!(single("E=0xZZ"), Value::enumerated("0xZZ"));
        assert_eq!(single("E=0x12G4"), Value::enumerated("0x12G4"));
        assert_eq!(single("E=0-1"), Value::enumerated("0-1"));
    }

    #[test]
    fn enums() {
        assert_eq!(single("METHOD=AES-128"), Value::enumerated("AES-128"));
        assert_eq!(single("CC=NONE"), Value::enumerated("NONE"));
        assert_eq!(single("X=a/b:c"), Value::enumerated("a/b:c"));
    }

    #[test]
    fn quote_inside_enum_is_an_error() {
        assert!(matches!(
            error_kind("E=AB\"C\""),
            FormatErrorKind::UnexpectedChar { found: '"', .. }
        ));
    }

    #[test]
    fn invalid_numbers() {
        assert!(matches!(error_kind("N=12ab"), FormatErrorKind::InvalidInteger { .. }));
        assert!(matches!(error_kind("N=-"), FormatErrorKind::InvalidInteger { .. }));
        assert!(matches!(error_kind("N=."), FormatErrorKind::InvalidFloat { .. }));
        assert!(matches!(error_kind("N=1.2.3"), FormatErrorKind::InvalidFloat { .. }));
        assert!(matches!(
            error_kind("N=99999999999999999999"),
            FormatErrorKind::InvalidInteger { .. }
        ));
    }

    #[test]
    fn unterminated_string_is_an_error() {
        let err = parse_attribute_list("A=1,URI=\"main.m3u8").unwrap_err();
        assert_eq!(err.kind, FormatErrorKind::UnterminatedString);
        assert_eq!(err.column(), Some(8));
    }

    #[test]
    fn structural_errors() {
        let err = parse_attribute_list("A=1 B=2").unwrap_err();
        assert_eq!(
            err.kind,
            FormatErrorKind::UnexpectedChar {
                found: 'B',
                expected: "space or comma"
            }
        );
        assert_eq!(err.column(), Some(4));

        assert!(matches!(
            error_kind("A=\"x\"y"),
            FormatErrorKind::UnexpectedChar { found: 'y', .. }
        ));
        assert!(matches!(
            error_kind("lower=1"),
            FormatErrorKind::UnexpectedChar { found: 'l', .. }
        ));
        assert!(matches!(
            error_kind("A=,B=1"),
            FormatErrorKind::UnexpectedChar { found: ',', .. }
        ));
        assert!(matches!(
            error_kind("A B=1"),
            FormatErrorKind::UnexpectedChar { found: 'B', .. }
        ));
        assert_eq!(
            error_kind("NAME"),
            FormatErrorKind::UnexpectedEnd { expected: "'='" }
        );
        assert_eq!(
            error_kind("NAME="),
            FormatErrorKind::UnexpectedEnd {
                expected: "attribute value"
            }
        );
    }

    #[test]
    fn duplicates_are_kept() {
        let attrs = parse("A=1,B=2,A=3");
        assert_eq!(attrs.get_all("A").count(), 2);
        assert_eq!(attrs.get_first("A").unwrap().value, Value::integer(1));
        assert_eq!(attrs.get_last("A").unwrap().value, Value::integer(3));
        assert!(attrs.get_first("C").is_none());
        assert_eq!(attrs.get_all("C").count(), 0);
    }

    #[test]
    fn set_replaces_first_and_drops_duplicates() {
        let mut attrs = parse("A=1,B=2,A=3,C=4");
        attrs.set("A", Value::enumerated("X"));
        assert_eq!(attrs.to_string(), "A=X,B=2,C=4");
        assert_eq!(attrs.get_all("A").count(), 1);
        assert_eq!(attrs.get_last("C").unwrap().value, Value::integer(4));

        attrs.set("B", Value::integer(5));
        assert_eq!(attrs.to_string(), "A=X,B=5,C=4");

        attrs.set("D", Value::string("d"));
        assert_eq!(attrs.to_string(), "A=X,B=5,C=4,D=\"d\"");
        assert_eq!(attrs.get_first("D").unwrap().value, Value::string("d"));
    }

    #[test]
    fn remove_keeps_index_consistent() {
        let mut attrs = parse("A=1,B=2,A=3,C=4");
        attrs.remove("A");
        assert_eq!(attrs.to_string(), "B=2,C=4");
        assert!(!attrs.contains("A"));
        assert_eq!(attrs.get_last("C").unwrap().value, Value::integer(4));
        attrs.remove("MISSING");
        assert_eq!(attrs.len(), 2);
    }

    #[test]
    fn float_normalizes_after_one_pass() {
        let first = parse("F=3.140").to_string();
        assert_eq!(first, "F=3.14");
        assert_eq!(parse(&first).to_string(), first);
    }
}
