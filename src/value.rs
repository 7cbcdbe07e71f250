//! Decoded physical values.

use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;

/// A field's physical value after sentinel checks and scaling.
///
/// A field holding its invalid sentinel never becomes a `Value`; absence is
/// modeled by the field not appearing in its message at all. Scaled fields
/// are always [`Value::Float`]; unscaled fields keep their wire signedness.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// An unscaled unsigned integer, including enumeration raw values.
    Unsigned(u64),
    /// An unscaled signed integer.
    Signed(i64),
    /// A floating point value, either from the wire or produced by scaling.
    Float(f64),
    /// A null-terminated string, decoded as UTF-8.
    Text(String),
    /// An opaque byte array.
    Bytes(Vec<u8>),
    /// An array field with more than one element; invalid elements are
    /// dropped.
    Array(Vec<Value>),
}

impl Value {
    /// The value as an unsigned integer, if it is one.
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Self::Unsigned(x) => Some(*x),
            Self::Signed(x) => u64::try_from(*x).ok(),
            _ => None,
        }
    }

    /// The value as a signed integer, if it is integral.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Unsigned(x) => i64::try_from(*x).ok(),
            Self::Signed(x) => Some(*x),
            _ => None,
        }
    }

    /// The value widened to a float, if it is numeric.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Unsigned(x) => Some(*x as f64),
            Self::Signed(x) => Some(*x as f64),
            Self::Float(x) => Some(*x),
            _ => None,
        }
    }

    /// The value as a string slice, if it is text.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(x) => Some(x),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unsigned(x) => write!(f, "{x}"),
            Self::Signed(x) => write!(f, "{x}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::Text(x) => write!(f, "{x}"),
            Self::Bytes(x) => {
                for b in x {
                    write!(f, "{b:02X}")?;
                }
                Ok(())
            }
            Self::Array(x) => {
                for (i, v) in x.iter().enumerate() {
                    if i != 0 {
                        write!(f, ",")?;
                    }
                    write!(f, "{v}")?;
                }
                Ok(())
            }
        }
    }
}
