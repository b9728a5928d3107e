//! Core types for the DLT trace decoder library
//!
//! This module defines the error types shared by every decoder and the small
//! enumerations describing DLT message types and argument encodings.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Timestamp type used throughout the decoder
pub type Timestamp = DateTime<Utc>;

/// Result type for decoder operations
pub type Result<T> = std::result::Result<T, DecoderError>;

/// Errors that can occur while loading descriptions or reading trace files
#[derive(Debug, thiserror::Error)]
pub enum DecoderError {
    #[error("Failed to parse FIBEX file: {0}")]
    FibexParseError(String),

    #[error("Invalid packet: {0}")]
    PacketError(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    #[error("Constraint error: {0}")]
    Constraint(#[from] ConstraintError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Failure to decode a single argument or a single line
///
/// Malformed input is always reported through this type. A fault caught at
/// the outer decoder boundary is reported as [`DecodeError::Unexpected`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    /// The payload does not match what the type information announced
    #[error("{0}")]
    Malformed(String),

    /// An unexpected fault while decoding, with the cause that was caught
    #[error("{message}: {cause}")]
    Unexpected { message: String, cause: String },
}

impl DecodeError {
    /// Create a malformed-input error from a message
    pub fn malformed(message: impl Into<String>) -> Self {
        DecodeError::Malformed(message.into())
    }

    /// The human readable message, without any cause
    pub fn message(&self) -> &str {
        match self {
            DecodeError::Malformed(message) => message,
            DecodeError::Unexpected { message, .. } => message,
        }
    }
}

/// Configuration errors of the constraint expression engine
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConstraintError {
    #[error("No constraints defined")]
    NoConstraints,

    #[error("Operator 'Or' without left operand")]
    OrWithoutLeftOperand,

    #[error("Operator 'Or' without right operand")]
    OrWithoutRightOperand,

    #[error("Operator 'Not' without right operand")]
    NotWithoutRightOperand,

    #[error("Undefined 'Not.Or' operation")]
    NotOr,

    #[error("Constraints expression is read only")]
    ReadOnly,

    #[error("Invalid regular expression '{pattern}': {reason}")]
    InvalidRegex { pattern: String, reason: String },

    #[error("Error evaluating expression: {0}")]
    Evaluation(String),
}

/// DLT message type and subtype, as carried in the extended header
///
/// The value is the message info byte without the verbose bit. The bare
/// class values (`Log`, `AppTrace`, `NwTrace`) are used when a description
/// names a message class without a subtype.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(u8)]
pub enum DltType {
    Log = 0x00,
    LogFatal = 0x10,
    LogError = 0x20,
    LogWarn = 0x30,
    LogInfo = 0x40,
    LogDebug = 0x50,
    LogVerbose = 0x60,
    AppTrace = 0x02,
    AppTraceVariable = 0x12,
    AppTraceFunctionIn = 0x22,
    AppTraceFunctionOut = 0x32,
    AppTraceState = 0x42,
    AppTraceVfb = 0x52,
    NwTrace = 0x04,
    NwTraceIpc = 0x14,
    NwTraceCan = 0x24,
    NwTraceFlexray = 0x34,
    NwTraceMost = 0x44,
    NwTraceEthernet = 0x54,
    NwTraceSomeip = 0x64,
    NwTraceUserDefined0 = 0x74,
    NwTraceUserDefined1 = 0x84,
    NwTraceUserDefined2 = 0x94,
    NwTraceUserDefined3 = 0xA4,
    NwTraceUserDefined4 = 0xB4,
    NwTraceUserDefined5 = 0xC4,
    NwTraceUserDefined6 = 0xD4,
    NwTraceUserDefined7 = 0xE4,
    NwTraceUserDefined8 = 0xF4,
    ControlRequest = 0x16,
    ControlResponse = 0x26,
    ControlTime = 0x36,
    Unknown = 0xFF,
}

impl DltType {
    /// Convert a raw type value into a `DltType`
    ///
    /// Values that do not name a known type or class map to `Unknown`.
    pub fn from_u8(value: u8) -> Self {
        use DltType::*;
        match value {
            0x00 => Log,
            0x10 => LogFatal,
            0x20 => LogError,
            0x30 => LogWarn,
            0x40 => LogInfo,
            0x50 => LogDebug,
            0x60 => LogVerbose,
            0x02 => AppTrace,
            0x12 => AppTraceVariable,
            0x22 => AppTraceFunctionIn,
            0x32 => AppTraceFunctionOut,
            0x42 => AppTraceState,
            0x52 => AppTraceVfb,
            0x04 => NwTrace,
            0x14 => NwTraceIpc,
            0x24 => NwTraceCan,
            0x34 => NwTraceFlexray,
            0x44 => NwTraceMost,
            0x54 => NwTraceEthernet,
            0x64 => NwTraceSomeip,
            0x74 => NwTraceUserDefined0,
            0x84 => NwTraceUserDefined1,
            0x94 => NwTraceUserDefined2,
            0xA4 => NwTraceUserDefined3,
            0xB4 => NwTraceUserDefined4,
            0xC4 => NwTraceUserDefined5,
            0xD4 => NwTraceUserDefined6,
            0xE4 => NwTraceUserDefined7,
            0xF4 => NwTraceUserDefined8,
            0x16 => ControlRequest,
            0x26 => ControlResponse,
            0x36 => ControlTime,
            _ => Unknown,
        }
    }

    /// Derive the type from the extended header's message info byte
    pub fn from_message_info(message_info: u8) -> Self {
        Self::from_u8(message_info & 0xFE)
    }

    /// The raw type value
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// True for the control message types
    pub fn is_control(self) -> bool {
        matches!(
            self,
            DltType::ControlRequest | DltType::ControlResponse | DltType::ControlTime
        )
    }
}

impl fmt::Display for DltType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DltType::Log => "log",
            DltType::LogFatal => "log fatal",
            DltType::LogError => "log error",
            DltType::LogWarn => "log warn",
            DltType::LogInfo => "log info",
            DltType::LogDebug => "log debug",
            DltType::LogVerbose => "log verbose",
            DltType::AppTrace => "app",
            DltType::AppTraceVariable => "app variable",
            DltType::AppTraceFunctionIn => "app func_in",
            DltType::AppTraceFunctionOut => "app func_out",
            DltType::AppTraceState => "app state",
            DltType::AppTraceVfb => "app vfb",
            DltType::NwTrace => "nw",
            DltType::NwTraceIpc => "nw ipc",
            DltType::NwTraceCan => "nw can",
            DltType::NwTraceFlexray => "nw flexray",
            DltType::NwTraceMost => "nw most",
            DltType::NwTraceEthernet => "nw ethernet",
            DltType::NwTraceSomeip => "nw someip",
            DltType::NwTraceUserDefined0 => "nw user0",
            DltType::NwTraceUserDefined1 => "nw user1",
            DltType::NwTraceUserDefined2 => "nw user2",
            DltType::NwTraceUserDefined3 => "nw user3",
            DltType::NwTraceUserDefined4 => "nw user4",
            DltType::NwTraceUserDefined5 => "nw user5",
            DltType::NwTraceUserDefined6 => "nw user6",
            DltType::NwTraceUserDefined7 => "nw user7",
            DltType::NwTraceUserDefined8 => "nw user8",
            DltType::ControlRequest => "control request",
            DltType::ControlResponse => "control response",
            DltType::ControlTime => "control time",
            DltType::Unknown => "unknown",
        };
        write!(f, "{}", name)
    }
}

/// Character encoding of a string argument
///
/// Verbose messages carry the coding as a 3-bit field. Codings other than
/// ASCII and UTF-8 are retained and decoded as UTF-8.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StringEncoding {
    /// Single byte code page (ISO-8859-15)
    Ascii,
    /// UTF-8
    Utf8,
    /// A coding value this decoder does not know
    Other(u8),
}

impl StringEncoding {
    /// Build from the coding field of a verbose type info
    pub fn from_coding(coding: u8) -> Self {
        match coding {
            0 => StringEncoding::Ascii,
            1 => StringEncoding::Utf8,
            n => StringEncoding::Other(n),
        }
    }

    /// The coding field value
    pub fn coding(self) -> u8 {
        match self {
            StringEncoding::Ascii => 0,
            StringEncoding::Utf8 => 1,
            StringEncoding::Other(n) => n,
        }
    }
}

/// Display hint for integer arguments
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IntegerEncoding {
    Decimal,
    Hex,
    Binary,
}

impl IntegerEncoding {
    /// Build from the coding field of a verbose type info
    pub fn from_coding(coding: u8) -> Self {
        match coding {
            2 => IntegerEncoding::Hex,
            3 => IntegerEncoding::Binary,
            _ => IntegerEncoding::Decimal,
        }
    }
}
