//! Verbose payload decoding
//!
//! A verbose payload is a sequence of self-describing arguments. Each
//! argument starts with a 32-bit type info word (in the message's byte
//! order) that selects the decoder for the bytes that follow.
//!
//! # Architecture
//!
//! - [`VerboseArgDecoder`] - dispatches one argument on its type class
//! - [`VerboseDltDecoder`] - loops over the argument count from the
//!   extended header and fills a [`DltLineBuilder`]
//!
//! The individual decoders are free functions in `numeric` and `string`.

mod numeric;
mod string;
pub mod type_info;

use crate::args::{ArgResult, Argument};
use crate::bits;
use crate::line::DltLineBuilder;
use crate::types::DecodeError;
use type_info::*;

/// Selects and runs the decoder for one verbose argument
#[derive(Debug, Clone, Copy, Default)]
pub struct VerboseArgDecoder;

impl VerboseArgDecoder {
    pub fn new() -> Self {
        Self
    }

    /// Decode one argument
    ///
    /// `buffer` starts at the type info word. Returns the number of bytes
    /// consumed including the type info.
    pub fn decode(&self, type_info: u32, buffer: &[u8], big_endian: bool) -> ArgResult {
        match type_info & TYPE_INFO_MASK {
            BOOL_TYPE => numeric::decode_bool(type_info, buffer, big_endian),
            SIGNED_INTEGER_TYPE => numeric::decode_signed(type_info, buffer, big_endian),
            UNSIGNED_INTEGER_TYPE => numeric::decode_unsigned(type_info, buffer, big_endian),
            FLOAT_TYPE => numeric::decode_float(type_info, buffer, big_endian),
            STRING_TYPE => string::decode_string(type_info, buffer, big_endian),
            RAW_TYPE => string::decode_raw(type_info, buffer, big_endian),
            _ => Err(DecodeError::malformed("unknown type info")),
        }
    }
}

/// Decodes the payload of a verbose message into a line
#[derive(Debug, Clone, Default)]
pub struct VerboseDltDecoder {
    arg_decoder: VerboseArgDecoder,
}

impl VerboseDltDecoder {
    pub fn new(arg_decoder: VerboseArgDecoder) -> Self {
        Self { arg_decoder }
    }

    /// Decode `number_of_args` arguments from the payload
    ///
    /// The argument count and byte order are taken from the builder, which
    /// the packet reader has already filled from the headers. On failure the
    /// error message is also recorded on the builder so the line can still be
    /// emitted. Returns the number of payload bytes consumed.
    pub fn decode(
        &self,
        mut buffer: &[u8],
        builder: &mut DltLineBuilder,
    ) -> Result<usize, DecodeError> {
        let number_of_args = builder.number_of_args();
        let big_endian = builder.big_endian();
        let mut consumed = 0;

        for arg in 1..=number_of_args {
            if buffer.len() < TYPE_INFO_SIZE {
                let message = format!(
                    "Verbose message with insufficient buffer length decoding arg {} of {}",
                    arg, number_of_args
                );
                builder.set_error_message(message.clone());
                return Err(DecodeError::Malformed(message));
            }

            let type_info = bits::read_u32(buffer, big_endian);
            let (length, argument) = match self.arg_decoder.decode(type_info, buffer, big_endian) {
                Ok(decoded) => decoded,
                Err(err) => {
                    let message = format!(
                        "Verbose Message 0x{:x} arg {} of {}, {}",
                        type_info,
                        arg,
                        number_of_args,
                        err.message()
                    );
                    builder.set_error_message(message.clone());
                    return Err(DecodeError::Malformed(message));
                }
            };

            log::trace!("Verbose arg {} of {}: {:?}", arg, number_of_args, argument);
            builder.add_argument(argument);
            buffer = &buffer[length..];
            consumed += length;
        }

        Ok(consumed)
    }
}

/// Decoded arguments without a builder, for callers that only need values
pub fn decode_arguments(
    buffer: &[u8],
    number_of_args: u8,
    big_endian: bool,
) -> Result<Vec<Argument>, DecodeError> {
    let mut builder = DltLineBuilder::new();
    builder
        .set_number_of_args(number_of_args)
        .set_big_endian(big_endian);
    VerboseDltDecoder::default().decode(buffer, &mut builder)?;
    Ok(builder.arguments().to_vec())
}
