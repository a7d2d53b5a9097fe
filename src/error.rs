//! Error types returned by the attribute grammar, the typed value accessors
//! and the playlist scanner.

use std::fmt;

use thiserror::Error;

use crate::value::ValueKind;

/// Any failure of a scan. Parsing is all-or-nothing: when one of these is
/// returned no playlist was produced.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Format(#[from] FormatError),

    #[error(transparent)]
    WrongType(#[from] WrongTypeError),

    #[error("failed reading playlist: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// A [`Value`](crate::Value) was consumed as a kind it doesn't hold.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("consuming {found} value as {expected}")]
pub struct WrongTypeError {
    pub expected: &'static str,
    pub found: ValueKind,
}

/// Where in the input a [`FormatError`] was detected.
///
/// `line` is 1-based and only known once the error has passed through the
/// scanner. `column` is the 0-based byte offset inside a directive value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Location {
    pub line: Option<usize>,
    pub column: Option<usize>,
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match (self.line, self.column) {
            (Some(line), Some(column)) => write!(f, "line {}, column {}: ", line, column),
            (Some(line), None) => write!(f, "line {}: ", line),
            (None, Some(column)) => write!(f, "column {}: ", column),
            (None, None) => Ok(()),
        }
    }
}

/// A syntax or structure violation in the playlist text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{location}{kind}")]
pub struct FormatError {
    pub location: Location,
    pub kind: FormatErrorKind,
}

impl FormatError {
    pub fn new(kind: FormatErrorKind) -> FormatError {
        FormatError {
            location: Location::default(),
            kind,
        }
    }

    /// Attach the playlist line number, keeping an already known one.
    pub fn at_line(mut self, line: usize) -> FormatError {
        self.location.line.get_or_insert(line);
        self
    }

    pub fn at_column(mut self, column: usize) -> FormatError {
        self.location.column = Some(column);
        self
    }

    pub fn line(&self) -> Option<usize> {
        self.location.line
    }

    pub fn column(&self) -> Option<usize> {
        self.location.column
    }
}

impl From<FormatErrorKind> for FormatError {
    fn from(kind: FormatErrorKind) -> Self {
        FormatError::new(kind)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormatErrorKind {
    #[error("expecting {expected}, but got '{found}'")]
    UnexpectedChar { found: char, expected: &'static str },

    #[error("unexpected end of attribute list, expecting {expected}")]
    UnexpectedEnd { expected: &'static str },

    #[error("quoted string is missing its closing '\"'")]
    UnterminatedString,

    #[error("invalid integer {text:?}")]
    InvalidInteger { text: String },

    #[error("invalid float {text:?}")]
    InvalidFloat { text: String },

    #[error("hexadecimal sequence {text:?} must have an even number of digits")]
    OddHexLength { text: String },

    #[error("invalid hexadecimal sequence {text:?}")]
    InvalidHex { text: String },

    #[error("resolution is missing its height")]
    MissingHeight,

    #[error("resolution width cannot be signed")]
    SignedResolution,

    #[error("{tag} is missing the {name} attribute")]
    MissingAttribute { tag: &'static str, name: &'static str },

    #[error("{name} has invalid enumerated value {value:?}")]
    InvalidEnum { name: &'static str, value: String },

    #[error("attribute {name}: {source}")]
    InvalidAttribute {
        name: &'static str,
        source: WrongTypeError,
    },

    #[error("{tag} value {value:?} is not {expected}")]
    InvalidValue {
        tag: &'static str,
        value: String,
        expected: &'static str,
    },

    #[error("failed parsing {text:?} as URL: {source}")]
    InvalidUrl {
        text: String,
        source: url::ParseError,
    },

    #[error("invalid timestamp {text:?}: {source}")]
    InvalidTimestamp {
        text: String,
        source: chrono::ParseError,
    },

    #[error("mixing media and master playlist tags")]
    MixedPlaylist,

    #[error("ambiguous playlist: neither a media nor a master playlist")]
    AmbiguousPlaylist,

    #[error("URI line without a preceding EXT-X-STREAM-INF")]
    OrphanUri,

    #[error("{tag} overflows a 64-bit counter")]
    CounterOverflow { tag: &'static str },

    #[error("playlist line longer than {max} bytes")]
    LineTooLong { max: usize },

    #[error("playlist line is not valid UTF-8")]
    InvalidUtf8,
}
