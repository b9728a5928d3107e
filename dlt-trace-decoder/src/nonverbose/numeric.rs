//! Fixed width non-verbose decoders
//!
//! The PDU length gives the number of bytes the argument occupies. It may be
//! larger than the value's width, in which case the extra bytes are skipped.

use super::NonVerboseArgDecode;
use crate::args::{ArgResult, Argument};
use crate::bits;
use crate::fibex::Pdu;
use crate::types::DecodeError;

/// Check the PDU fits in the buffer and is wide enough for the value
fn check_pdu(
    buffer: &[u8],
    pdu: &Pdu,
    width: usize,
    kind: &str,
    tag: &str,
) -> Result<(), DecodeError> {
    if buffer.len() < pdu.pdu_length {
        return Err(DecodeError::malformed(format!(
            "Insufficient payload buffer {} for {} argument",
            pdu.pdu_length, kind
        )));
    }
    if pdu.pdu_length < width {
        return Err(DecodeError::malformed(format!(
            "{} invalid length in PDU",
            tag
        )));
    }
    Ok(())
}

fn check_width(width: usize) -> usize {
    match width {
        1 | 2 | 4 | 8 => width,
        _ => unreachable!("unsupported integer width {}", width),
    }
}

/// `S_SINTn`
#[derive(Debug, Clone, Copy)]
pub struct SignedIntDecoder {
    width: usize,
}

impl SignedIntDecoder {
    pub fn new(width: usize) -> Self {
        Self {
            width: check_width(width),
        }
    }
}

impl NonVerboseArgDecode for SignedIntDecoder {
    fn decode(&self, buffer: &[u8], big_endian: bool, pdu: &Pdu) -> ArgResult {
        let tag = format!("S_SINT{}", self.width * 8);
        check_pdu(buffer, pdu, self.width, "signed int", &tag)?;
        let value = bits::read_int(buffer, self.width, big_endian);
        Ok((
            pdu.pdu_length,
            Argument::SignedInt {
                value,
                width: self.width,
            },
        ))
    }
}

/// `S_UINTn`
#[derive(Debug, Clone, Copy)]
pub struct UnsignedIntDecoder {
    width: usize,
}

impl UnsignedIntDecoder {
    pub fn new(width: usize) -> Self {
        Self {
            width: check_width(width),
        }
    }
}

impl NonVerboseArgDecode for UnsignedIntDecoder {
    fn decode(&self, buffer: &[u8], big_endian: bool, pdu: &Pdu) -> ArgResult {
        let tag = format!("S_UINT{}", self.width * 8);
        check_pdu(buffer, pdu, self.width, "unsigned int", &tag)?;
        let value = bits::read_uint(buffer, self.width, big_endian);
        Ok((
            pdu.pdu_length,
            Argument::UnsignedInt {
                value,
                width: self.width,
            },
        ))
    }
}

/// `S_HEXn`
#[derive(Debug, Clone, Copy)]
pub struct HexIntDecoder {
    width: usize,
}

impl HexIntDecoder {
    pub fn new(width: usize) -> Self {
        Self {
            width: check_width(width),
        }
    }
}

impl NonVerboseArgDecode for HexIntDecoder {
    fn decode(&self, buffer: &[u8], big_endian: bool, pdu: &Pdu) -> ArgResult {
        let tag = format!("S_HEX{}", self.width * 8);
        check_pdu(buffer, pdu, self.width, "hex int", &tag)?;
        let value = bits::read_uint(buffer, self.width, big_endian);
        Ok((
            pdu.pdu_length,
            Argument::HexInt {
                value,
                width: self.width,
            },
        ))
    }
}

/// `S_BINn`
#[derive(Debug, Clone, Copy)]
pub struct BinaryIntDecoder {
    width: usize,
}

impl BinaryIntDecoder {
    pub fn new(width: usize) -> Self {
        Self {
            width: check_width(width),
        }
    }
}

impl NonVerboseArgDecode for BinaryIntDecoder {
    fn decode(&self, buffer: &[u8], big_endian: bool, pdu: &Pdu) -> ArgResult {
        let tag = format!("S_BIN{}", self.width * 8);
        check_pdu(buffer, pdu, self.width, "binary int", &tag)?;
        let value = bits::read_uint(buffer, self.width, big_endian);
        Ok((
            pdu.pdu_length,
            Argument::BinaryInt {
                value,
                width: self.width,
            },
        ))
    }
}

/// `S_BOOL`
#[derive(Debug, Clone, Copy, Default)]
pub struct BoolDecoder;

impl NonVerboseArgDecode for BoolDecoder {
    fn decode(&self, buffer: &[u8], _big_endian: bool, pdu: &Pdu) -> ArgResult {
        check_pdu(buffer, pdu, 1, "bool", "S_BOOL")?;
        Ok((pdu.pdu_length, Argument::Bool(buffer[0] != 0)))
    }
}

/// `S_FLOA32`
#[derive(Debug, Clone, Copy, Default)]
pub struct Float32Decoder;

impl NonVerboseArgDecode for Float32Decoder {
    fn decode(&self, buffer: &[u8], big_endian: bool, pdu: &Pdu) -> ArgResult {
        check_pdu(buffer, pdu, 4, "float", "S_FLOA32")?;
        Ok((
            pdu.pdu_length,
            Argument::Float32(bits::read_f32(buffer, big_endian)),
        ))
    }
}

/// `S_FLOA64`
#[derive(Debug, Clone, Copy, Default)]
pub struct Float64Decoder;

impl NonVerboseArgDecode for Float64Decoder {
    fn decode(&self, buffer: &[u8], big_endian: bool, pdu: &Pdu) -> ArgResult {
        check_pdu(buffer, pdu, 8, "float", "S_FLOA64")?;
        Ok((
            pdu.pdu_length,
            Argument::Float64(bits::read_f64(buffer, big_endian)),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsigned_endianness() {
        let pdu = Pdu::new("S_UINT32", 4);
        let data = [0xDE, 0xAD, 0xBE, 0xEF];
        let decoder = UnsignedIntDecoder::new(4);
        assert_eq!(
            decoder.decode(&data, false, &pdu).unwrap(),
            (4, Argument::UnsignedInt { value: 0xEFBEADDE, width: 4 })
        );
        assert_eq!(
            decoder.decode(&data, true, &pdu).unwrap(),
            (4, Argument::UnsignedInt { value: 0xDEADBEEF, width: 4 })
        );
    }

    #[test]
    fn test_round_trip_widths() {
        for width in [1usize, 2, 4, 8] {
            let value: i64 = -0x12;
            let bytes = value.to_le_bytes();
            let pdu = Pdu::new(format!("S_SINT{}", width * 8), width);
            let (len, arg) = SignedIntDecoder::new(width)
                .decode(&bytes[..width], false, &pdu)
                .unwrap();
            assert_eq!(len, width);
            assert_eq!(arg, Argument::SignedInt { value, width });

            let bytes = 0x7Au64.to_be_bytes();
            let pdu = Pdu::new(format!("S_HEX{}", width * 8), width);
            let (_, arg) = HexIntDecoder::new(width)
                .decode(&bytes[8 - width..], true, &pdu)
                .unwrap();
            assert_eq!(arg, Argument::HexInt { value: 0x7A, width });
        }
    }

    #[test]
    fn test_pdu_longer_than_value() {
        let pdu = Pdu::new("S_UINT8", 3);
        let (len, arg) = UnsignedIntDecoder::new(1)
            .decode(&[0x05, 0xFF, 0xFF, 0x01], false, &pdu)
            .unwrap();
        assert_eq!(len, 3);
        assert_eq!(arg, Argument::UnsignedInt { value: 5, width: 1 });
    }

    #[test]
    fn test_insufficient_buffer() {
        let pdu = Pdu::new("S_UINT32", 4);
        let err = UnsignedIntDecoder::new(4)
            .decode(&[0x01, 0x02], false, &pdu)
            .unwrap_err();
        assert_eq!(err.message(), "Insufficient payload buffer 4 for unsigned int argument");

        let pdu = Pdu::new("S_BOOL", 1);
        let err = BoolDecoder.decode(&[], false, &pdu).unwrap_err();
        assert_eq!(err.message(), "Insufficient payload buffer 1 for bool argument");

        let pdu = Pdu::new("S_FLOA64", 8);
        let err = Float64Decoder.decode(&[0; 4], false, &pdu).unwrap_err();
        assert_eq!(err.message(), "Insufficient payload buffer 8 for float argument");
    }

    #[test]
    fn test_pdu_too_short() {
        let pdu = Pdu::new("S_SINT16", 1);
        let err = SignedIntDecoder::new(2).decode(&[0; 4], false, &pdu).unwrap_err();
        assert_eq!(err.message(), "S_SINT16 invalid length in PDU");

        let pdu = Pdu::new("S_BIN32", 2);
        let err = BinaryIntDecoder::new(4).decode(&[0; 4], false, &pdu).unwrap_err();
        assert_eq!(err.message(), "S_BIN32 invalid length in PDU");

        let pdu = Pdu::new("S_BOOL", 0);
        let err = BoolDecoder.decode(&[1], false, &pdu).unwrap_err();
        assert_eq!(err.message(), "S_BOOL invalid length in PDU");
    }

    #[test]
    fn test_bool_and_floats() {
        let pdu = Pdu::new("S_BOOL", 1);
        assert_eq!(BoolDecoder.decode(&[2], false, &pdu).unwrap(), (1, Argument::Bool(true)));
        assert_eq!(BoolDecoder.decode(&[0], true, &pdu).unwrap(), (1, Argument::Bool(false)));

        let pdu = Pdu::new("S_FLOA32", 4);
        let (len, arg) = Float32Decoder
            .decode(&0.5f32.to_be_bytes(), true, &pdu)
            .unwrap();
        assert_eq!(len, 4);
        assert_eq!(arg, Argument::Float32(0.5));

        let pdu = Pdu::new("S_FLOA64", 8);
        let (_, arg) = Float64Decoder
            .decode(&1e10f64.to_le_bytes(), false, &pdu)
            .unwrap();
        assert_eq!(arg, Argument::Float64(1e10));
    }

    #[test]
    fn test_binary() {
        let pdu = Pdu::new("S_BIN16", 2);
        let (_, arg) = BinaryIntDecoder::new(2)
            .decode(&[0x01, 0x80], false, &pdu)
            .unwrap();
        assert_eq!(arg.to_string(), "0b1000000000000001");
    }
}
