//! Length prefixed non-verbose decoders, and the fallback for unknown tags

use super::NonVerboseArgDecode;
use crate::args::{ArgResult, Argument};
use crate::bits;
use crate::fibex::Pdu;
use crate::strings;
use crate::types::{DecodeError, StringEncoding};

const LENGTH_PREFIX: usize = 2;

/// `S_STRG_ASCII`, `S_STRG_UTF8` and `S_UTF8`
#[derive(Debug, Clone, Copy)]
pub struct StringDecoder {
    encoding: StringEncoding,
}

impl StringDecoder {
    pub fn new(encoding: StringEncoding) -> Self {
        Self { encoding }
    }
}

impl NonVerboseArgDecode for StringDecoder {
    fn decode(&self, buffer: &[u8], big_endian: bool, _pdu: &Pdu) -> ArgResult {
        if buffer.len() < LENGTH_PREFIX {
            return Err(DecodeError::malformed(
                "Insufficient payload buffer for string argument length",
            ));
        }

        let length = bits::read_u16(buffer, big_endian) as usize;
        if buffer.len() < LENGTH_PREFIX + length {
            return Err(DecodeError::malformed(format!(
                "Insufficient payload buffer for string argument length {}",
                length
            )));
        }

        let text = strings::decode_payload(
            &buffer[LENGTH_PREFIX..LENGTH_PREFIX + length],
            self.encoding,
        );
        Ok((
            LENGTH_PREFIX + length,
            Argument::String {
                text,
                encoding: self.encoding,
            },
        ))
    }
}

/// `S_RAW` and `S_RAWD`
#[derive(Debug, Clone, Copy, Default)]
pub struct RawDecoder;

impl NonVerboseArgDecode for RawDecoder {
    fn decode(&self, buffer: &[u8], big_endian: bool, _pdu: &Pdu) -> ArgResult {
        if buffer.len() < LENGTH_PREFIX {
            return Err(DecodeError::malformed(
                "Insufficient payload buffer for raw argument length",
            ));
        }

        let length = bits::read_u16(buffer, big_endian) as usize;
        if buffer.len() < LENGTH_PREFIX + length {
            return Err(DecodeError::malformed(format!(
                "Insufficient payload buffer for raw argument length {}",
                length
            )));
        }

        let data = buffer[LENGTH_PREFIX..LENGTH_PREFIX + length].to_vec();
        Ok((LENGTH_PREFIX + length, Argument::Raw(data)))
    }
}

/// Used for tags with no registered decoder
///
/// A PDU with a length takes that many bytes; otherwise the argument is
/// taken to be length prefixed. The bytes are kept as they are.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnknownDecoder;

impl NonVerboseArgDecode for UnknownDecoder {
    fn decode(&self, buffer: &[u8], big_endian: bool, pdu: &Pdu) -> ArgResult {
        if pdu.pdu_length > 0 {
            if buffer.len() < pdu.pdu_length {
                return Err(DecodeError::malformed(format!(
                    "Insufficient payload buffer {} for unknown argument",
                    pdu.pdu_length
                )));
            }
            if pdu.pdu_length > u16::MAX as usize {
                return Err(DecodeError::malformed(format!(
                    "PDU Payload length exceeds 16-bit for unknown argument length {}",
                    pdu.pdu_length
                )));
            }
            let data = buffer[..pdu.pdu_length].to_vec();
            return Ok((pdu.pdu_length, Argument::Unknown(data)));
        }

        if buffer.len() < LENGTH_PREFIX {
            return Err(DecodeError::malformed(
                "Insufficient payload buffer for unknown argument length",
            ));
        }
        let length = bits::read_u16(buffer, big_endian) as usize;
        if buffer.len() < LENGTH_PREFIX + length {
            return Err(DecodeError::malformed(format!(
                "Insufficient payload buffer {} for unknown argument length {}",
                buffer.len(),
                length
            )));
        }

        let data = buffer[LENGTH_PREFIX..LENGTH_PREFIX + length].to_vec();
        Ok((LENGTH_PREFIX + length, Argument::Unknown(data)))
    }
}
