//! Typed attribute values.
//!
//! The attribute grammar distinguishes six kinds of values by their first
//! characters. A [`Value`] holds exactly one of them; the `as_*` accessors
//! return a [`WrongTypeError`] when the caller asks for a kind the value
//! doesn't hold.

use std::fmt;

use crate::error::WrongTypeError;

/// `<width>x<height>`, e.g. `RESOLUTION=1920x1080`.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Resolution {
    pub width: u64,
    pub height: u64,
}

impl Resolution {
    pub fn new(width: u64, height: u64) -> Resolution {
        Resolution { width, height }
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// The kind of a [`Value`], without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    String,
    Enum,
    Integer,
    Float,
    Bytes,
    Resolution,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            ValueKind::String => "String",
            ValueKind::Enum => "Enum",
            ValueKind::Integer => "Integer",
            ValueKind::Float => "Float",
            ValueKind::Bytes => "Bytes",
            ValueKind::Resolution => "Resolution",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// `"quoted-string"`, stored without the quotes.
    String(String),
    /// Bare enumerated string, e.g. `AUDIO` or `YES`.
    Enum(String),
    Integer(i64),
    Float(f64),
    /// `0x` prefixed hexadecimal sequence.
    Bytes(Vec<u8>),
    Resolution(Resolution),
}

impl Value {
    pub fn string<S: Into<String>>(value: S) -> Value {
        Value::String(value.into())
    }

    pub fn enumerated<S: Into<String>>(value: S) -> Value {
        Value::Enum(value.into())
    }

    pub fn integer(value: i64) -> Value {
        Value::Integer(value)
    }

    pub fn float(value: f64) -> Value {
        Value::Float(value)
    }

    pub fn bytes<B: Into<Vec<u8>>>(value: B) -> Value {
        Value::Bytes(value.into())
    }

    /// A zero `width` renders as `0x<height>`, which reads back as a
    /// hexadecimal byte sequence, or fails with
    /// [`FormatErrorKind::OddHexLength`](crate::FormatErrorKind::OddHexLength)
    /// when `height` has an odd number of digits.
    pub fn resolution(width: u64, height: u64) -> Value {
        Value::Resolution(Resolution::new(width, height))
    }

    /// The `YES` / `NO` enumerated string.
    pub fn yes_no(value: bool) -> Value {
        Value::Enum(if value { "YES" } else { "NO" }.to_string())
    }

    pub fn kind(&self) -> ValueKind {
        match self {
            Value::String(_) => ValueKind::String,
            Value::Enum(_) => ValueKind::Enum,
            Value::Integer(_) => ValueKind::Integer,
            Value::Float(_) => ValueKind::Float,
            Value::Bytes(_) => ValueKind::Bytes,
            Value::Resolution(_) => ValueKind::Resolution,
        }
    }

    fn wrong_type(&self, expected: &'static str) -> WrongTypeError {
        WrongTypeError {
            expected,
            found: self.kind(),
        }
    }

    pub fn as_string(&self) -> Result<&str, WrongTypeError> {
        match self {
            Value::String(s) => Ok(s),
            _ => Err(self.wrong_type("String")),
        }
    }

    pub fn as_enum(&self) -> Result<&str, WrongTypeError> {
        match self {
            Value::Enum(s) => Ok(s),
            _ => Err(self.wrong_type("Enum")),
        }
    }

    pub fn as_yes_no(&self) -> Result<bool, WrongTypeError> {
        match self {
            Value::Enum(s) if s == "YES" => Ok(true),
            Value::Enum(s) if s == "NO" => Ok(false),
            _ => Err(self.wrong_type("YES/NO Enum")),
        }
    }

    /// Accepts both a quoted string and a bare token. Some attributes (e.g.
    /// `CLOSED-CAPTIONS`) are either a quoted group id or the `NONE` enum.
    pub fn as_string_or_enum(&self) -> Result<&str, WrongTypeError> {
        match self {
            Value::String(s) | Value::Enum(s) => Ok(s),
            _ => Err(self.wrong_type("String or Enum")),
        }
    }

    pub fn as_integer(&self) -> Result<i64, WrongTypeError> {
        match self {
            Value::Integer(n) => Ok(*n),
            _ => Err(self.wrong_type("Integer")),
        }
    }

    /// A non-negative Integer.
    pub fn as_unsigned(&self) -> Result<u64, WrongTypeError> {
        match self {
            Value::Integer(n) if *n >= 0 => Ok(*n as u64),
            Value::Integer(_) => Err(self.wrong_type("non-negative Integer")),
            _ => Err(self.wrong_type("Integer")),
        }
    }

    pub fn as_float(&self) -> Result<f64, WrongTypeError> {
        match self {
            Value::Float(n) => Ok(*n),
            _ => Err(self.wrong_type("Float")),
        }
    }

    /// Integer or Float, widened to `f64`.
    pub fn as_number(&self) -> Result<f64, WrongTypeError> {
        match self {
            Value::Integer(n) => Ok(*n as f64),
            Value::Float(n) => Ok(*n),
            _ => Err(self.wrong_type("Number")),
        }
    }

    pub fn as_bytes(&self) -> Result<&[u8], WrongTypeError> {
        match self {
            Value::Bytes(b) => Ok(b),
            _ => Err(self.wrong_type("Bytes")),
        }
    }

    pub fn as_resolution(&self) -> Result<Resolution, WrongTypeError> {
        match self {
            Value::Resolution(r) => Ok(*r),
            _ => Err(self.wrong_type("Resolution")),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Value::String(s) => write!(f, "\"{}\"", s),
            Value::Enum(s) => f.write_str(s),
            Value::Integer(n) => write!(f, "{}", n),
            Value::Float(n) => {
                let text = n.to_string();
                // Integral floats keep a fraction so they read back as Float.
                if n.is_finite() && !text.contains('.') {
                    write!(f, "{}.0", text)
                } else {
                    f.write_str(&text)
                }
            }
            Value::Bytes(b) => write!(f, "0x{}", hex::encode_upper(b)),
            Value::Resolution(r) => write!(f, "{}", r),
        }
    }
}
