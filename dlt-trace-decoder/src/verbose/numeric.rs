//! Verbose bool, integer and float decoders
//!
//! Each decoder receives the buffer starting at the type info word and
//! returns the number of bytes consumed including the type info.

use super::type_info::*;
use crate::args::{ArgResult, Argument};
use crate::bits;
use crate::types::{DecodeError, IntegerEncoding};

fn unknown_verbose(type_info: u32, buffer: &[u8], width: usize, big_endian: bool) -> ArgResult {
    let length = TYPE_INFO_SIZE + width;
    Ok((
        length,
        Argument::UnknownVerbose {
            type_info,
            bytes: buffer[..length].to_vec(),
            big_endian,
        },
    ))
}

/// Check the buffer holds the type info and `width` payload bytes
fn check_length(kind: &str, buffer: &[u8], width: usize) -> Result<(), DecodeError> {
    if buffer.len() < TYPE_INFO_SIZE + width {
        return Err(DecodeError::malformed(format!(
            "'{}' insufficient buffer length {}",
            kind,
            buffer.len()
        )));
    }
    Ok(())
}

pub fn decode_bool(type_info: u32, buffer: &[u8], _big_endian: bool) -> ArgResult {
    if type_info & VARIABLE_INFO != 0 {
        return Err(DecodeError::malformed("'Bool' unsupported type info"));
    }

    let length = type_length(type_info);
    let width = width_of(length).ok_or_else(|| {
        DecodeError::malformed(format!("'Bool' unsupported type length 0x{:x}", length))
    })?;
    check_length("Bool", buffer, width)?;

    let value = buffer[TYPE_INFO_SIZE..TYPE_INFO_SIZE + width]
        .iter()
        .any(|&b| b != 0);
    Ok((TYPE_INFO_SIZE + width, Argument::Bool(value)))
}

pub fn decode_signed(type_info: u32, buffer: &[u8], big_endian: bool) -> ArgResult {
    decode_integer(type_info, buffer, big_endian, true)
}

pub fn decode_unsigned(type_info: u32, buffer: &[u8], big_endian: bool) -> ArgResult {
    decode_integer(type_info, buffer, big_endian, false)
}

fn decode_integer(type_info: u32, buffer: &[u8], big_endian: bool, signed: bool) -> ArgResult {
    if type_info & (VARIABLE_INFO | FIXED_POINT) != 0 {
        return Err(DecodeError::malformed("'Integer' unsupported type info"));
    }

    let length = type_length(type_info);
    let width = width_of(length).ok_or_else(|| {
        DecodeError::malformed(format!("'Integer' unsupported type length 0x{:x}", length))
    })?;
    check_length("Integer", buffer, width)?;

    if width == 16 {
        return unknown_verbose(type_info, buffer, width, big_endian);
    }

    let data = &buffer[TYPE_INFO_SIZE..];
    let arg = if signed {
        Argument::SignedInt {
            value: bits::read_int(data, width, big_endian),
            width,
        }
    } else {
        let value = bits::read_uint(data, width, big_endian);
        match IntegerEncoding::from_coding(coding(type_info)) {
            IntegerEncoding::Hex => Argument::HexInt { value, width },
            IntegerEncoding::Binary => Argument::BinaryInt { value, width },
            IntegerEncoding::Decimal => Argument::UnsignedInt { value, width },
        }
    };
    Ok((TYPE_INFO_SIZE + width, arg))
}

pub fn decode_float(type_info: u32, buffer: &[u8], big_endian: bool) -> ArgResult {
    if type_info & VARIABLE_INFO != 0 {
        return Err(DecodeError::malformed("'Float' unsupported type info"));
    }

    let length = type_length(type_info);
    let width = match length {
        TYPE_LENGTH_16BIT => 2,
        TYPE_LENGTH_32BIT => 4,
        TYPE_LENGTH_64BIT => 8,
        TYPE_LENGTH_128BIT => 16,
        _ => {
            return Err(DecodeError::malformed(format!(
                "'Float' unsupported type length 0x{:x}",
                length
            )))
        }
    };
    check_length("Float", buffer, width)?;

    let data = &buffer[TYPE_INFO_SIZE..];
    match width {
        4 => Ok((
            TYPE_INFO_SIZE + 4,
            Argument::Float32(bits::read_f32(data, big_endian)),
        )),
        8 => Ok((
            TYPE_INFO_SIZE + 8,
            Argument::Float64(bits::read_f64(data, big_endian)),
        )),
        // Half and quad precision are carried through undecoded
        _ => unknown_verbose(type_info, buffer, width, big_endian),
    }
}
