//! Trace line records and the builder the line decoders fill in
//!
//! The packet reader sets the header fields on a [`DltLineBuilder`], the
//! verbose or non-verbose line decoder adds the arguments, and
//! [`DltLineBuilder::build`] produces an immutable [`DltTraceLine`].

use crate::args::Argument;
use crate::types::{DltType, Timestamp};
use std::any::Any;
use std::time::Duration;

/// A decoded line that constraint predicates can be checked against
pub trait TraceLine: Any {
    /// The text of the line
    fn text(&self) -> &str;

    /// Access to the concrete line type, for type specific predicates
    fn as_any(&self) -> &dyn Any;
}

/// One decoded DLT message
#[derive(Debug, Clone, PartialEq)]
pub struct DltTraceLine {
    /// Sequence number of the line within its source
    pub line: u64,
    /// Byte offset of the packet in its source
    pub position: u64,
    /// Storage or reception time, if known
    pub timestamp: Option<Timestamp>,
    /// Time since the device started, if the header carried one
    pub device_timestamp: Option<Duration>,
    pub ecu_id: Option<String>,
    pub application_id: Option<String>,
    pub context_id: Option<String>,
    pub session_id: Option<u32>,
    /// Message counter from the standard header
    pub count: u8,
    pub dlt_type: DltType,
    pub is_verbose: bool,
    pub big_endian: bool,
    /// Message id for non-verbose messages
    pub message_id: Option<u32>,
    pub arguments: Vec<Argument>,
    /// Set if the payload could not be decoded
    pub error_message: Option<String>,
    text: String,
}

impl DltTraceLine {
    fn format_text(arguments: &[Argument], error_message: Option<&str>) -> String {
        let mut text = arguments
            .iter()
            .map(|arg| arg.to_string())
            .collect::<Vec<_>>()
            .join(" ");
        if let Some(error) = error_message {
            if !text.is_empty() {
                text.push(' ');
            }
            text.push_str(error);
        }
        text
    }
}

impl TraceLine for DltTraceLine {
    fn text(&self) -> &str {
        &self.text
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Accumulates the state of one line while it is being decoded
#[derive(Debug, Clone, Default)]
pub struct DltLineBuilder {
    line: u64,
    position: u64,
    timestamp: Option<Timestamp>,
    device_timestamp: Option<Duration>,
    ecu_id: Option<String>,
    application_id: Option<String>,
    context_id: Option<String>,
    session_id: Option<u32>,
    count: u8,
    dlt_type: Option<DltType>,
    is_verbose: bool,
    big_endian: bool,
    number_of_args: u8,
    message_id: Option<u32>,
    arguments: Vec<Argument>,
    error_message: Option<String>,
}

impl DltLineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_position(&mut self, position: u64) -> &mut Self {
        self.position = position;
        self
    }

    pub fn set_timestamp(&mut self, timestamp: Timestamp) -> &mut Self {
        self.timestamp = Some(timestamp);
        self
    }

    pub fn set_device_timestamp(&mut self, device_timestamp: Duration) -> &mut Self {
        self.device_timestamp = Some(device_timestamp);
        self
    }

    pub fn set_ecu_id(&mut self, ecu_id: impl Into<String>) -> &mut Self {
        self.ecu_id = Some(ecu_id.into());
        self
    }

    pub fn set_application_id(&mut self, application_id: impl Into<String>) -> &mut Self {
        self.application_id = Some(application_id.into());
        self
    }

    pub fn set_context_id(&mut self, context_id: impl Into<String>) -> &mut Self {
        self.context_id = Some(context_id.into());
        self
    }

    pub fn set_session_id(&mut self, session_id: u32) -> &mut Self {
        self.session_id = Some(session_id);
        self
    }

    pub fn set_count(&mut self, count: u8) -> &mut Self {
        self.count = count;
        self
    }

    pub fn set_dlt_type(&mut self, dlt_type: DltType) -> &mut Self {
        self.dlt_type = Some(dlt_type);
        self
    }

    pub fn set_is_verbose(&mut self, is_verbose: bool) -> &mut Self {
        self.is_verbose = is_verbose;
        self
    }

    pub fn set_big_endian(&mut self, big_endian: bool) -> &mut Self {
        self.big_endian = big_endian;
        self
    }

    pub fn set_number_of_args(&mut self, number_of_args: u8) -> &mut Self {
        self.number_of_args = number_of_args;
        self
    }

    pub fn set_message_id(&mut self, message_id: u32) -> &mut Self {
        self.message_id = Some(message_id);
        self
    }

    pub fn add_argument(&mut self, argument: Argument) -> &mut Self {
        self.arguments.push(argument);
        self
    }

    /// Record why the line could not be decoded
    pub fn set_error_message(&mut self, message: impl Into<String>) -> &mut Self {
        self.error_message = Some(message.into());
        self
    }

    pub fn ecu_id(&self) -> Option<&str> {
        self.ecu_id.as_deref()
    }

    pub fn application_id(&self) -> Option<&str> {
        self.application_id.as_deref()
    }

    pub fn context_id(&self) -> Option<&str> {
        self.context_id.as_deref()
    }

    pub fn dlt_type(&self) -> Option<DltType> {
        self.dlt_type
    }

    pub fn big_endian(&self) -> bool {
        self.big_endian
    }

    pub fn number_of_args(&self) -> u8 {
        self.number_of_args
    }

    pub fn message_id(&self) -> Option<u32> {
        self.message_id
    }

    pub fn arguments(&self) -> &[Argument] {
        &self.arguments
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    /// Produce the line and reset the builder for the next one
    ///
    /// The line counter keeps incrementing across lines.
    pub fn build(&mut self) -> DltTraceLine {
        let line = self.line;
        let state = std::mem::take(self);
        self.line = line + 1;

        let text = DltTraceLine::format_text(&state.arguments, state.error_message.as_deref());
        DltTraceLine {
            line,
            position: state.position,
            timestamp: state.timestamp,
            device_timestamp: state.device_timestamp,
            ecu_id: state.ecu_id,
            application_id: state.application_id,
            context_id: state.context_id,
            session_id: state.session_id,
            count: state.count,
            dlt_type: state.dlt_type.unwrap_or(DltType::Unknown),
            is_verbose: state.is_verbose,
            big_endian: state.big_endian,
            message_id: state.message_id,
            arguments: state.arguments,
            error_message: state.error_message,
            text,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::StringEncoding;

    #[test]
    fn test_builder_produces_line() {
        let mut builder = DltLineBuilder::new();
        builder
            .set_ecu_id("ECU1")
            .set_application_id("APP1")
            .set_context_id("CTX1")
            .set_dlt_type(DltType::LogInfo)
            .set_is_verbose(true)
            .add_argument(Argument::string("hello", StringEncoding::Utf8))
            .add_argument(Argument::UnsignedInt { value: 42, width: 4 });

        let line = builder.build();
        assert_eq!(line.text(), "hello 42");
        assert_eq!(line.ecu_id.as_deref(), Some("ECU1"));
        assert_eq!(line.dlt_type, DltType::LogInfo);
        assert_eq!(line.line, 0);
        assert!(line.is_verbose);
    }

    #[test]
    fn test_builder_resets_between_lines() {
        let mut builder = DltLineBuilder::new();
        builder.set_application_id("APP1").set_message_id(5);
        let first = builder.build();
        assert_eq!(first.message_id, Some(5));

        let second = builder.build();
        assert_eq!(second.line, 1);
        assert_eq!(second.application_id, None);
        assert_eq!(second.message_id, None);
        assert_eq!(second.dlt_type, DltType::Unknown);
    }

    #[test]
    fn test_error_message_in_text() {
        let mut builder = DltLineBuilder::new();
        builder.set_error_message("Verbose message with insufficient buffer length decoding arg 1 of 1");
        let line = builder.build();
        assert_eq!(
            line.text(),
            "Verbose message with insufficient buffer length decoding arg 1 of 1"
        );
        assert!(line.arguments.is_empty());
    }
}
