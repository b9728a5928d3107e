//! Frame and PDU descriptions
//!
//! A [`Frame`] describes one non-verbose message: its id, where it comes
//! from and the ordered list of [`Pdu`]s that make up its payload.

use crate::types::DltType;
use std::fmt;
use std::sync::Arc;

/// Description of one argument slot in a non-verbose payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pdu {
    /// Type tag of the argument, e.g. `S_UINT32`. Empty for PDUs that only
    /// carry a description
    pub pdu_type: String,
    /// Byte length of the argument. 0 means the argument is length prefixed
    pub pdu_length: usize,
    /// Static text. When set, the argument is this text and no payload bytes
    /// are read
    pub description: Option<String>,
}

impl Pdu {
    /// A PDU that decodes `pdu_length` bytes of type `pdu_type`
    pub fn new(pdu_type: impl Into<String>, pdu_length: usize) -> Self {
        Self {
            pdu_type: pdu_type.into(),
            pdu_length,
            description: None,
        }
    }

    /// A PDU that always produces `text`
    pub fn with_description(text: impl Into<String>) -> Self {
        Self {
            pdu_type: String::new(),
            pdu_length: 0,
            description: Some(text.into()),
        }
    }
}

impl fmt::Display for Pdu {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.description {
            Some(text) => write!(f, "\"{}\"", text),
            None => write!(f, "[{}:{}]", self.pdu_type, self.pdu_length),
        }
    }
}

/// Description of one non-verbose message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Message id carried as the first 32 bits of the payload
    pub id: u32,
    /// Application id from the description, if any
    pub application_id: Option<String>,
    /// Context id from the description, if any
    pub context_id: Option<String>,
    /// ECU the frame was described for
    pub ecu_id: Option<String>,
    /// Message type to report for lines decoded with this frame
    pub message_type: DltType,
    /// PDUs in payload order. PDUs are shared between frames that
    /// reference the same description
    pub arguments: Vec<Arc<Pdu>>,
}

impl Frame {
    pub fn new(id: u32) -> Self {
        Self {
            id,
            application_id: None,
            context_id: None,
            ecu_id: None,
            message_type: DltType::Unknown,
            arguments: Vec::new(),
        }
    }

    pub fn with_application_id(mut self, application_id: impl Into<String>) -> Self {
        self.application_id = Some(application_id.into());
        self
    }

    pub fn with_context_id(mut self, context_id: impl Into<String>) -> Self {
        self.context_id = Some(context_id.into());
        self
    }

    pub fn with_ecu_id(mut self, ecu_id: impl Into<String>) -> Self {
        self.ecu_id = Some(ecu_id.into());
        self
    }

    pub fn with_message_type(mut self, message_type: DltType) -> Self {
        self.message_type = message_type;
        self
    }

    pub fn with_argument(mut self, pdu: Pdu) -> Self {
        self.arguments.push(Arc::new(pdu));
        self
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "EcuID={} AppId={} CtxId={} {} ({})",
            self.ecu_id.as_deref().unwrap_or(""),
            self.application_id.as_deref().unwrap_or(""),
            self.context_id.as_deref().unwrap_or(""),
            self.id,
            self.message_type
        )?;
        for pdu in &self.arguments {
            write!(f, " {}", pdu)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_display() {
        let frame = Frame::new(10)
            .with_application_id("APP1")
            .with_context_id("CTX1")
            .with_message_type(DltType::LogInfo)
            .with_argument(Pdu::with_description("Temp:"))
            .with_argument(Pdu::new("S_SINT16", 2));
        assert_eq!(
            frame.to_string(),
            "EcuID= AppId=APP1 CtxId=CTX1 10 (log info) \"Temp:\" [S_SINT16:2]"
        );
    }
}
