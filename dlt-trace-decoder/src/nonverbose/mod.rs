//! Non-verbose payload decoding
//!
//! A non-verbose payload starts with a 32-bit message id. The layout of the
//! rest is not on the wire; it comes from a [`Frame`] found in a
//! [`FrameMap`], whose PDUs name the type of each argument.
//!
//! # Architecture
//!
//! - [`NonVerboseArgDecode`] - decodes one argument for one PDU type tag
//! - [`NonVerboseArgDecoder`] - registry from type tag to decoder, with a
//!   fallback for unknown tags
//! - [`NonVerboseDltDecoder`] - looks up the frame and decodes its PDUs
//!   into a [`DltLineBuilder`]

mod numeric;
mod string;

pub use numeric::{
    BinaryIntDecoder, BoolDecoder, Float32Decoder, Float64Decoder, HexIntDecoder,
    SignedIntDecoder, UnsignedIntDecoder,
};
pub use string::{RawDecoder, StringDecoder, UnknownDecoder};

use crate::args::{ArgResult, Argument};
use crate::bits;
use crate::fibex::{Frame, FrameMap, Pdu};
use crate::line::DltLineBuilder;
use crate::types::{DecodeError, StringEncoding};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Decoder for the argument of one PDU
///
/// `buffer` starts at the argument. Returns the bytes consumed and the
/// decoded argument.
pub trait NonVerboseArgDecode: Send + Sync {
    fn decode(&self, buffer: &[u8], big_endian: bool, pdu: &Pdu) -> ArgResult;
}

/// Decodes PDUs by looking up their type tag
///
/// The standard DLT tags are registered on construction. Further tags can
/// be added with [`register`](Self::register).
pub struct NonVerboseArgDecoder {
    decoders: HashMap<String, Box<dyn NonVerboseArgDecode>>,
    unknown: UnknownDecoder,
}

impl NonVerboseArgDecoder {
    pub fn new() -> Self {
        let mut decoders: HashMap<String, Box<dyn NonVerboseArgDecode>> = HashMap::new();
        decoders.insert("S_BOOL".into(), Box::new(BoolDecoder));
        for width in [1usize, 2, 4, 8] {
            let size = width * 8;
            decoders.insert(format!("S_SINT{}", size), Box::new(SignedIntDecoder::new(width)));
            decoders.insert(format!("S_UINT{}", size), Box::new(UnsignedIntDecoder::new(width)));
            decoders.insert(format!("S_BIN{}", size), Box::new(BinaryIntDecoder::new(width)));
            decoders.insert(format!("S_HEX{}", size), Box::new(HexIntDecoder::new(width)));
        }
        decoders.insert("S_FLOA32".into(), Box::new(Float32Decoder));
        decoders.insert("S_FLOA64".into(), Box::new(Float64Decoder));
        decoders.insert("S_RAW".into(), Box::new(RawDecoder));
        decoders.insert("S_RAWD".into(), Box::new(RawDecoder));
        decoders.insert(
            "S_STRG_ASCII".into(),
            Box::new(StringDecoder::new(StringEncoding::Ascii)),
        );
        decoders.insert(
            "S_STRG_UTF8".into(),
            Box::new(StringDecoder::new(StringEncoding::Utf8)),
        );
        decoders.insert(
            "S_UTF8".into(),
            Box::new(StringDecoder::new(StringEncoding::Utf8)),
        );

        Self {
            decoders,
            unknown: UnknownDecoder,
        }
    }

    /// Add a decoder for a type tag
    ///
    /// Returns false, leaving the registry unchanged, if the tag already has
    /// a decoder.
    pub fn register(&mut self, pdu_type: impl Into<String>, decoder: Box<dyn NonVerboseArgDecode>) -> bool {
        let pdu_type = pdu_type.into();
        if self.decoders.contains_key(&pdu_type) {
            return false;
        }
        self.decoders.insert(pdu_type, decoder);
        true
    }

    /// Remove the decoder for a type tag. Returns false if there was none
    pub fn unregister(&mut self, pdu_type: &str) -> bool {
        self.decoders.remove(pdu_type).is_some()
    }

    /// True if a decoder is registered for the tag
    pub fn is_registered(&self, pdu_type: &str) -> bool {
        self.decoders.contains_key(pdu_type)
    }

    /// Decode the argument for `pdu`
    ///
    /// A PDU with a description always gives that text and consumes nothing.
    pub fn decode(&self, buffer: &[u8], big_endian: bool, pdu: &Pdu) -> ArgResult {
        if let Some(description) = &pdu.description {
            return Ok((0, Argument::string(description.clone(), StringEncoding::Utf8)));
        }

        match self.decoders.get(&pdu.pdu_type) {
            Some(decoder) => decoder.decode(buffer, big_endian, pdu),
            None => self.unknown.decode(buffer, big_endian, pdu),
        }
    }
}

impl Default for NonVerboseArgDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for NonVerboseArgDecoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut tags: Vec<&String> = self.decoders.keys().collect();
        tags.sort();
        f.debug_struct("NonVerboseArgDecoder")
            .field("tags", &tags)
            .finish()
    }
}

/// Decodes the payload of a non-verbose message into a line
///
/// Each decoder instance remembers which message ids it has already warned
/// about, so one decoder should be used per decoding pipeline.
#[derive(Debug, Default)]
pub struct NonVerboseDltDecoder {
    arg_decoder: NonVerboseArgDecoder,
    frame_map: Option<Arc<FrameMap>>,
    missing_ids: HashSet<u32>,
}

impl NonVerboseDltDecoder {
    /// Create a decoder. Without a frame map every payload is kept opaque
    pub fn new(frame_map: Option<Arc<FrameMap>>) -> Self {
        Self::with_arg_decoder(NonVerboseArgDecoder::new(), frame_map)
    }

    pub fn with_arg_decoder(arg_decoder: NonVerboseArgDecoder, frame_map: Option<Arc<FrameMap>>) -> Self {
        Self {
            arg_decoder,
            frame_map,
            missing_ids: HashSet::new(),
        }
    }

    pub fn frame_map(&self) -> Option<&Arc<FrameMap>> {
        self.frame_map.as_ref()
    }

    /// Give back the argument decoder registry
    pub fn into_arg_decoder(self) -> NonVerboseArgDecoder {
        self.arg_decoder
    }

    /// Decode a payload
    ///
    /// The application, context and ECU ids already on the builder take
    /// part in the frame lookup. On failure the error message is also
    /// recorded on the builder. Returns the number of payload bytes
    /// consumed.
    pub fn decode(
        &mut self,
        buffer: &[u8],
        builder: &mut DltLineBuilder,
    ) -> Result<usize, DecodeError> {
        if buffer.len() < 4 {
            builder.set_message_id(0).add_argument(Argument::NonVerbose {
                message_id: 0,
                bytes: Vec::new(),
            });
            return Ok(buffer.len());
        }

        let big_endian = builder.big_endian();
        let message_id = bits::read_u32(buffer, big_endian);
        builder.set_message_id(message_id);

        let frame = self.frame_map.as_ref().and_then(|map| {
            map.try_get_frame(
                message_id,
                builder.application_id(),
                builder.context_id(),
                builder.ecu_id(),
            )
            .cloned()
        });

        match frame {
            Some(frame) => self.decode_frame(&frame, message_id, &buffer[4..], builder),
            None => {
                if self.frame_map.is_some() && self.missing_ids.insert(message_id) {
                    log::warn!(
                        "No frame for non-verbose message id 0x{:x} (continuing...)",
                        message_id
                    );
                }
                builder.add_argument(Argument::NonVerbose {
                    message_id,
                    bytes: buffer[4..].to_vec(),
                });
                Ok(buffer.len())
            }
        }
    }

    fn decode_frame(
        &self,
        frame: &Frame,
        message_id: u32,
        mut payload: &[u8],
        builder: &mut DltLineBuilder,
    ) -> Result<usize, DecodeError> {
        builder.set_dlt_type(frame.message_type);
        if builder.application_id().is_none() {
            if let Some(application_id) = &frame.application_id {
                builder.set_application_id(application_id.as_str());
            }
        }
        if builder.context_id().is_none() {
            if let Some(context_id) = &frame.context_id {
                builder.set_context_id(context_id.as_str());
            }
        }
        if builder.ecu_id().is_none() {
            if let Some(ecu_id) = &frame.ecu_id {
                builder.set_ecu_id(ecu_id.as_str());
            }
        }

        let big_endian = builder.big_endian();
        let total = frame.arguments.len();
        let mut consumed = 4;
        for (index, pdu) in frame.arguments.iter().enumerate() {
            match self.arg_decoder.decode(payload, big_endian, pdu) {
                Ok((length, argument)) => {
                    log::trace!("Non-verbose arg {} of {}: {:?}", index + 1, total, argument);
                    builder.add_argument(argument);
                    payload = &payload[length..];
                    consumed += length;
                }
                Err(err) => {
                    let message = format!(
                        "Non-verbose message 0x{:x} arg {} of {}, {}",
                        message_id,
                        index + 1,
                        total,
                        err.message()
                    );
                    builder.set_error_message(message.clone());
                    return Err(DecodeError::Malformed(message));
                }
            }
        }
        Ok(consumed)
    }
}
