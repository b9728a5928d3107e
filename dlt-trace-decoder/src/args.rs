//! Decoded argument values
//!
//! An [`Argument`] is the decoded form of one payload argument. Numeric
//! kinds keep their byte width so the value can be formatted exactly as it
//! was transmitted; formatting itself is done by the `Display` impl.

use crate::types::{DecodeError, StringEncoding};
use std::fmt;

/// Outcome of decoding one argument: the bytes consumed and the value
pub type ArgResult = std::result::Result<(usize, Argument), DecodeError>;

/// A decoded DLT argument
#[derive(Debug, Clone, PartialEq)]
pub enum Argument {
    Bool(bool),
    SignedInt { value: i64, width: usize },
    UnsignedInt { value: u64, width: usize },
    /// Integer with a hexadecimal display hint
    HexInt { value: u64, width: usize },
    /// Integer with a binary display hint
    BinaryInt { value: u64, width: usize },
    Float32(f32),
    Float64(f64),
    String { text: String, encoding: StringEncoding },
    Raw(Vec<u8>),
    /// A non-verbose argument whose type tag has no registered decoder
    Unknown(Vec<u8>),
    /// A verbose argument that is valid on the wire but not decoded
    /// (128-bit integers and floats, 16-bit floats)
    UnknownVerbose {
        type_info: u32,
        bytes: Vec<u8>,
        big_endian: bool,
    },
    /// The payload of a non-verbose message without a frame description
    NonVerbose { message_id: u32, bytes: Vec<u8> },
    /// An argument that could not be read, kept in place of its value
    ///
    /// The built-in decoders never produce it: they fail the whole line
    /// instead. A registered [`NonVerboseArgDecode`](crate::nonverbose::NonVerboseArgDecode)
    /// returns it to report a bad argument and let the line continue.
    Error(String),
}

impl Argument {
    /// Byte width for numeric kinds
    pub fn width(&self) -> Option<usize> {
        match self {
            Argument::SignedInt { width, .. }
            | Argument::UnsignedInt { width, .. }
            | Argument::HexInt { width, .. }
            | Argument::BinaryInt { width, .. } => Some(*width),
            Argument::Float32(_) => Some(4),
            Argument::Float64(_) => Some(8),
            _ => None,
        }
    }

    /// Convenience constructor for string arguments
    pub fn string(text: impl Into<String>, encoding: StringEncoding) -> Self {
        Argument::String {
            text: text.into(),
            encoding,
        }
    }

    /// True if this argument reports a decoding failure
    pub fn is_error(&self) -> bool {
        matches!(self, Argument::Error(_))
    }
}

/// Mask a value to the low `width` bytes
fn masked(value: u64, width: usize) -> u64 {
    if width >= 8 {
        value
    } else {
        value & ((1u64 << (width * 8)) - 1)
    }
}

pub(crate) fn write_hex(f: &mut fmt::Formatter<'_>, bytes: &[u8]) -> fmt::Result {
    for (i, byte) in bytes.iter().enumerate() {
        if i > 0 {
            write!(f, " ")?;
        }
        write!(f, "{:02x}", byte)?;
    }
    Ok(())
}

impl fmt::Display for Argument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Argument::Bool(v) => write!(f, "{}", if *v { "true" } else { "false" }),
            Argument::SignedInt { value, .. } => write!(f, "{}", value),
            Argument::UnsignedInt { value, .. } => write!(f, "{}", value),
            Argument::HexInt { value, width } => {
                write!(f, "0x{:0w$x}", masked(*value, *width), w = width * 2)
            }
            Argument::BinaryInt { value, width } => {
                write!(f, "0b{:0w$b}", masked(*value, *width), w = width * 8)
            }
            Argument::Float32(v) => write_float(f, *v as f64),
            Argument::Float64(v) => write_float(f, *v),
            Argument::String { text, .. } => write!(f, "{}", text),
            Argument::Raw(bytes) | Argument::Unknown(bytes) => write_hex(f, bytes),
            Argument::UnknownVerbose { bytes, .. } => write_hex(f, bytes),
            Argument::NonVerbose { message_id, bytes } => {
                write!(f, "[{}] ", message_id)?;
                if bytes.is_empty() {
                    return Ok(());
                }
                for byte in bytes {
                    let c = if (32..=126).contains(byte) { *byte as char } else { '-' };
                    write!(f, "{}", c)?;
                }
                write!(f, "|")?;
                write_hex(f, bytes)
            }
            Argument::Error(message) => write!(f, "{}", message),
        }
    }
}

fn write_float(f: &mut fmt::Formatter<'_>, value: f64) -> fmt::Result {
    if value.is_nan() {
        write!(f, "nan")
    } else if value.is_infinite() {
        write!(f, "{}", if value > 0.0 { "inf" } else { "-inf" })
    } else {
        write!(f, "{}", value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_display() {
        assert_eq!(Argument::SignedInt { value: -5, width: 1 }.to_string(), "-5");
        assert_eq!(Argument::UnsignedInt { value: 300, width: 2 }.to_string(), "300");
        assert_eq!(Argument::HexInt { value: 0x1F, width: 2 }.to_string(), "0x001f");
        // Sign extended values are shown at their wire width
        assert_eq!(
            Argument::HexInt { value: u64::MAX, width: 1 }.to_string(),
            "0xff"
        );
        assert_eq!(
            Argument::BinaryInt { value: 0x05, width: 1 }.to_string(),
            "0b00000101"
        );
    }

    #[test]
    fn test_float_display() {
        assert_eq!(Argument::Float32(1.5).to_string(), "1.5");
        assert_eq!(Argument::Float64(f64::INFINITY).to_string(), "inf");
        assert_eq!(Argument::Float64(f64::NEG_INFINITY).to_string(), "-inf");
        assert_eq!(Argument::Float64(f64::NAN).to_string(), "nan");
    }

    #[test]
    fn test_bytes_display() {
        assert_eq!(Argument::Raw(vec![0xDE, 0xAD]).to_string(), "de ad");
        assert_eq!(Argument::Raw(vec![]).to_string(), "");
        let arg = Argument::NonVerbose {
            message_id: 10,
            bytes: vec![b'A', 0x00, b'z'],
        };
        assert_eq!(arg.to_string(), "[10] A-z|41 00 7a");
    }

    #[test]
    fn test_width() {
        assert_eq!(Argument::UnsignedInt { value: 1, width: 4 }.width(), Some(4));
        assert_eq!(Argument::Float64(0.0).width(), Some(8));
        assert_eq!(Argument::Bool(true).width(), None);
        assert!(Argument::Error("x".into()).is_error());
    }
}
