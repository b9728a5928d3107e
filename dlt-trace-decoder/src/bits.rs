//! Endian-aware reads of fixed-width values from byte spans
//!
//! Every function reads from the start of `buf` and panics if `buf` is too
//! short. Callers validate the length first and report malformed input
//! themselves, so a panic here is an engine fault.

use byteorder::{BigEndian, ByteOrder, LittleEndian};

pub fn read_u16(buf: &[u8], big_endian: bool) -> u16 {
    if big_endian {
        BigEndian::read_u16(buf)
    } else {
        LittleEndian::read_u16(buf)
    }
}

pub fn read_u32(buf: &[u8], big_endian: bool) -> u32 {
    if big_endian {
        BigEndian::read_u32(buf)
    } else {
        LittleEndian::read_u32(buf)
    }
}

pub fn read_u64(buf: &[u8], big_endian: bool) -> u64 {
    if big_endian {
        BigEndian::read_u64(buf)
    } else {
        LittleEndian::read_u64(buf)
    }
}

pub fn read_f32(buf: &[u8], big_endian: bool) -> f32 {
    if big_endian {
        BigEndian::read_f32(buf)
    } else {
        LittleEndian::read_f32(buf)
    }
}

pub fn read_f64(buf: &[u8], big_endian: bool) -> f64 {
    if big_endian {
        BigEndian::read_f64(buf)
    } else {
        LittleEndian::read_f64(buf)
    }
}

/// Read an unsigned integer of `width` bytes (1, 2, 4 or 8)
pub fn read_uint(buf: &[u8], width: usize, big_endian: bool) -> u64 {
    match width {
        1 => buf[0] as u64,
        2 => read_u16(buf, big_endian) as u64,
        4 => read_u32(buf, big_endian) as u64,
        8 => read_u64(buf, big_endian),
        _ => unreachable!("unsupported integer width {}", width),
    }
}

/// Read a signed integer of `width` bytes (1, 2, 4 or 8), sign extended
pub fn read_int(buf: &[u8], width: usize, big_endian: bool) -> i64 {
    match width {
        1 => buf[0] as i8 as i64,
        2 => read_u16(buf, big_endian) as i16 as i64,
        4 => read_u32(buf, big_endian) as i32 as i64,
        8 => read_u64(buf, big_endian) as i64,
        _ => unreachable!("unsupported integer width {}", width),
    }
}
