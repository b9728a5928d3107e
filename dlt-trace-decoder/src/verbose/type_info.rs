//! Bit layout of the 32-bit verbose type info word

/// Size of the type info word at the start of every verbose argument
pub const TYPE_INFO_SIZE: usize = 4;

pub const TYPE_LENGTH_MASK: u32 = 0x0000_000F;
pub const TYPE_LENGTH_8BIT: u32 = 0x1;
pub const TYPE_LENGTH_16BIT: u32 = 0x2;
pub const TYPE_LENGTH_32BIT: u32 = 0x3;
pub const TYPE_LENGTH_64BIT: u32 = 0x4;
pub const TYPE_LENGTH_128BIT: u32 = 0x5;

pub const BOOL_TYPE: u32 = 0x0000_0010;
pub const SIGNED_INTEGER_TYPE: u32 = 0x0000_0020;
pub const UNSIGNED_INTEGER_TYPE: u32 = 0x0000_0040;
pub const FLOAT_TYPE: u32 = 0x0000_0080;
pub const ARRAY_TYPE: u32 = 0x0000_0100;
pub const STRING_TYPE: u32 = 0x0000_0200;
pub const RAW_TYPE: u32 = 0x0000_0400;
pub const VARIABLE_INFO: u32 = 0x0000_0800;
pub const FIXED_POINT: u32 = 0x0000_1000;
pub const TRACE_INFO: u32 = 0x0000_2000;
pub const STRUCT_TYPE: u32 = 0x0000_4000;

pub const CODING_MASK: u32 = 0x0003_8000;
pub const CODING_SHIFT: u32 = 15;

/// Bits that select the argument decoder. Anything other than exactly one
/// supported type class is rejected.
pub const TYPE_INFO_MASK: u32 = 0x0000_67F0;

/// The TYLE code of a type info word
pub fn type_length(type_info: u32) -> u32 {
    type_info & TYPE_LENGTH_MASK
}

/// The SCOD field of a type info word
pub fn coding(type_info: u32) -> u8 {
    ((type_info & CODING_MASK) >> CODING_SHIFT) as u8
}

/// Byte width for a TYLE code, `None` for reserved codes
pub fn width_of(type_length: u32) -> Option<usize> {
    match type_length {
        TYPE_LENGTH_8BIT => Some(1),
        TYPE_LENGTH_16BIT => Some(2),
        TYPE_LENGTH_32BIT => Some(4),
        TYPE_LENGTH_64BIT => Some(8),
        TYPE_LENGTH_128BIT => Some(16),
        _ => None,
    }
}
