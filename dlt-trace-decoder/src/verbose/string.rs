//! Verbose string and raw decoders
//!
//! Both carry a 16-bit length after the type info word, in the message's
//! byte order, followed by that many payload bytes.

use super::type_info::*;
use crate::args::{ArgResult, Argument};
use crate::bits;
use crate::strings;
use crate::types::{DecodeError, StringEncoding};

const DATA_OFFSET: usize = TYPE_INFO_SIZE + 2;

/// Read the length prefix and return the payload span
fn payload<'a>(kind: &str, buffer: &'a [u8], big_endian: bool) -> Result<&'a [u8], DecodeError> {
    if buffer.len() < DATA_OFFSET {
        return Err(DecodeError::malformed(format!(
            "'{}' insufficient buffer length {}",
            kind,
            buffer.len()
        )));
    }

    let length = bits::read_u16(&buffer[TYPE_INFO_SIZE..], big_endian) as usize;
    if buffer.len() < DATA_OFFSET + length {
        return Err(DecodeError::malformed(format!(
            "'{}' insufficient buffer length {} for payload length {}",
            kind,
            buffer.len(),
            length
        )));
    }
    Ok(&buffer[DATA_OFFSET..DATA_OFFSET + length])
}

pub fn decode_string(type_info: u32, buffer: &[u8], big_endian: bool) -> ArgResult {
    if type_info & VARIABLE_INFO != 0 {
        log::debug!("String argument with unsupported type info of 0x{:x}", type_info);
        return Err(DecodeError::malformed("'String' unsupported type info"));
    }

    let encoding = StringEncoding::from_coding(coding(type_info));
    let data = payload("String", buffer, big_endian)?;
    let text = strings::decode_payload(data, encoding);
    Ok((DATA_OFFSET + data.len(), Argument::String { text, encoding }))
}

pub fn decode_raw(type_info: u32, buffer: &[u8], big_endian: bool) -> ArgResult {
    if type_info & VARIABLE_INFO != 0 {
        return Err(DecodeError::malformed("'Raw' unsupported type info"));
    }

    let data = payload("Raw", buffer, big_endian)?;
    Ok((DATA_OFFSET + data.len(), Argument::Raw(data.to_vec())))
}
