//! DLT packet framing
//!
//! A DLT file is a sequence of packets. Each packet is an optional storage
//! header written by the logger, the standard header, an optional extended
//! header and the payload. This module splits a byte stream into
//! [`DltPacket`]s and copies their header fields onto a
//! [`DltLineBuilder`]. Decoding the payload is left to the line decoders.

use crate::line::DltLineBuilder;
use crate::types::{DecoderError, DltType, Result, Timestamp};
use byteorder::{BigEndian, ByteOrder, LittleEndian};
use chrono::{TimeZone, Utc};
use std::fs::File;
use std::io::{BufReader, ErrorKind, Read};
use std::path::Path;
use std::time::Duration;

/// Marker at the start of every storage header
pub const STORAGE_MAGIC: &[u8; 4] = b"DLT\x01";
pub const STORAGE_HEADER_SIZE: usize = 16;
pub const STANDARD_HEADER_SIZE: usize = 4;
pub const EXTENDED_HEADER_SIZE: usize = 10;

/// Use extended header
pub const HTYP_UEH: u8 = 0x01;
/// Payload is big endian
pub const HTYP_MSBF: u8 = 0x02;
/// With ECU id
pub const HTYP_WEID: u8 = 0x04;
/// With session id
pub const HTYP_WSID: u8 = 0x08;
/// With timestamp
pub const HTYP_WTMS: u8 = 0x10;
const HTYP_VERSION_SHIFT: u8 = 5;
const HTYP_VERSION_MASK: u8 = 0x07;

/// Verbose bit of the message info byte
pub const MSIN_VERB: u8 = 0x01;

/// Header added when the packet was written to a file
#[derive(Debug, Clone, PartialEq)]
pub struct StorageHeader {
    /// `None` if the stored seconds and microseconds are not a valid time
    pub timestamp: Option<Timestamp>,
    pub ecu_id: Option<String>,
}

/// Header present in every packet
#[derive(Debug, Clone, PartialEq)]
pub struct StandardHeader {
    pub header_type: u8,
    pub count: u8,
    /// Length from the start of this header to the end of the payload
    pub length: u16,
    pub ecu_id: Option<String>,
    pub session_id: Option<u32>,
    /// Device uptime in ticks of 0.1 ms
    pub timestamp: Option<u32>,
}

impl StandardHeader {
    pub fn version(&self) -> u8 {
        (self.header_type >> HTYP_VERSION_SHIFT) & HTYP_VERSION_MASK
    }

    pub fn big_endian(&self) -> bool {
        self.header_type & HTYP_MSBF != 0
    }

    pub fn has_extended_header(&self) -> bool {
        self.header_type & HTYP_UEH != 0
    }

    /// Number of bytes of this header including its optional fields
    pub fn size(&self) -> usize {
        Self::size_for(self.header_type)
    }

    fn size_for(header_type: u8) -> usize {
        let mut size = STANDARD_HEADER_SIZE;
        if header_type & HTYP_WEID != 0 {
            size += 4;
        }
        if header_type & HTYP_WSID != 0 {
            size += 4;
        }
        if header_type & HTYP_WTMS != 0 {
            size += 4;
        }
        size
    }

    pub fn device_timestamp(&self) -> Option<Duration> {
        self.timestamp
            .map(|ticks| Duration::from_micros(u64::from(ticks) * 100))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExtendedHeader {
    pub message_info: u8,
    pub number_of_args: u8,
    pub application_id: Option<String>,
    pub context_id: Option<String>,
}

impl ExtendedHeader {
    pub fn is_verbose(&self) -> bool {
        self.message_info & MSIN_VERB != 0
    }

    pub fn dlt_type(&self) -> DltType {
        DltType::from_message_info(self.message_info)
    }
}

/// One framed DLT packet
#[derive(Debug, Clone, PartialEq)]
pub struct DltPacket {
    /// Byte offset of the packet in its source
    pub position: u64,
    pub storage_header: Option<StorageHeader>,
    pub header: StandardHeader,
    pub extended_header: Option<ExtendedHeader>,
    pub payload: Vec<u8>,
}

impl DltPacket {
    /// Frame one packet from the start of `buf`
    ///
    /// Returns the packet and the number of bytes it occupies, storage
    /// header included.
    pub fn parse(buf: &[u8], storage_header: bool) -> Result<(Self, usize)> {
        let mut offset = 0;

        let storage = if storage_header {
            let header = parse_storage_header(buf)?;
            offset += STORAGE_HEADER_SIZE;
            Some(header)
        } else {
            None
        };

        let rest = &buf[offset..];
        if rest.len() < STANDARD_HEADER_SIZE {
            return Err(DecoderError::PacketError(format!(
                "Truncated standard header, {} bytes",
                rest.len()
            )));
        }
        let header_type = rest[0];
        let count = rest[1];
        let length = BigEndian::read_u16(&rest[2..4]);
        let length_usize = usize::from(length);

        if rest.len() < length_usize {
            return Err(DecoderError::PacketError(format!(
                "Packet length {} exceeds the {} bytes available",
                length,
                rest.len()
            )));
        }

        let header_size = StandardHeader::size_for(header_type);
        let extended_size = if header_type & HTYP_UEH != 0 {
            EXTENDED_HEADER_SIZE
        } else {
            0
        };
        if length_usize < header_size + extended_size {
            return Err(DecoderError::PacketError(format!(
                "Packet length {} is shorter than its headers ({} bytes)",
                length,
                header_size + extended_size
            )));
        }

        let packet = &rest[..length_usize];
        let mut cursor = STANDARD_HEADER_SIZE;
        let ecu_id = optional_field(packet, &mut cursor, header_type & HTYP_WEID != 0).and_then(read_id);
        let session_id =
            optional_field(packet, &mut cursor, header_type & HTYP_WSID != 0).map(BigEndian::read_u32);
        let timestamp =
            optional_field(packet, &mut cursor, header_type & HTYP_WTMS != 0).map(BigEndian::read_u32);

        let header = StandardHeader {
            header_type,
            count,
            length,
            ecu_id,
            session_id,
            timestamp,
        };

        let extended_header = if extended_size > 0 {
            let ext = &packet[header_size..header_size + EXTENDED_HEADER_SIZE];
            Some(ExtendedHeader {
                message_info: ext[0],
                number_of_args: ext[1],
                application_id: read_id(&ext[2..6]),
                context_id: read_id(&ext[6..10]),
            })
        } else {
            None
        };

        let payload = packet[header_size + extended_size..].to_vec();
        Ok((
            Self {
                position: 0,
                storage_header: storage,
                header,
                extended_header,
                payload,
            },
            offset + length_usize,
        ))
    }

    /// Verbose packets carry self describing arguments
    pub fn is_verbose(&self) -> bool {
        self.extended_header
            .as_ref()
            .map(ExtendedHeader::is_verbose)
            .unwrap_or(false)
    }

    /// The ECU id from the standard header, else from the storage header
    pub fn ecu_id(&self) -> Option<&str> {
        self.header
            .ecu_id
            .as_deref()
            .or_else(|| self.storage_header.as_ref().and_then(|s| s.ecu_id.as_deref()))
    }

    /// Copy the header fields onto a line builder
    pub fn fill_builder(&self, builder: &mut DltLineBuilder) {
        builder
            .set_position(self.position)
            .set_count(self.header.count)
            .set_big_endian(self.header.big_endian())
            .set_is_verbose(self.is_verbose());

        if let Some(timestamp) = self.storage_header.as_ref().and_then(|s| s.timestamp) {
            builder.set_timestamp(timestamp);
        }
        if let Some(ecu_id) = self.ecu_id() {
            builder.set_ecu_id(ecu_id);
        }
        if let Some(session_id) = self.header.session_id {
            builder.set_session_id(session_id);
        }
        if let Some(uptime) = self.header.device_timestamp() {
            builder.set_device_timestamp(uptime);
        }
        if let Some(ext) = &self.extended_header {
            builder
                .set_dlt_type(ext.dlt_type())
                .set_number_of_args(ext.number_of_args);
            if let Some(application_id) = &ext.application_id {
                builder.set_application_id(application_id.as_str());
            }
            if let Some(context_id) = &ext.context_id {
                builder.set_context_id(context_id.as_str());
            }
        }
    }
}

fn parse_storage_header(buf: &[u8]) -> Result<StorageHeader> {
    if buf.len() < STORAGE_HEADER_SIZE {
        return Err(DecoderError::PacketError(format!(
            "Truncated storage header, {} bytes",
            buf.len()
        )));
    }
    if &buf[0..4] != STORAGE_MAGIC {
        return Err(DecoderError::PacketError(format!(
            "Invalid storage header marker {:02x?}",
            &buf[0..4]
        )));
    }
    let seconds = LittleEndian::read_u32(&buf[4..8]);
    let microseconds = LittleEndian::read_u32(&buf[8..12]);
    let timestamp = Utc
        .timestamp_opt(i64::from(seconds), microseconds.saturating_mul(1000))
        .single();
    Ok(StorageHeader {
        timestamp,
        ecu_id: read_id(&buf[12..16]),
    })
}

fn optional_field<'a>(packet: &'a [u8], cursor: &mut usize, present: bool) -> Option<&'a [u8]> {
    if !present {
        return None;
    }
    let field = &packet[*cursor..*cursor + 4];
    *cursor += 4;
    Some(field)
}

/// A four character id, padded with NUL bytes. An all-NUL id is `None`
fn read_id(bytes: &[u8]) -> Option<String> {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    if end == 0 {
        return None;
    }
    Some(String::from_utf8_lossy(&bytes[..end]).into_owned())
}

/// Reads packets one by one from a DLT file
pub struct DltPacketReader<R> {
    reader: R,
    storage_header: bool,
    position: u64,
    finished: bool,
}

impl DltPacketReader<BufReader<File>> {
    /// Open a DLT file
    pub fn open(path: &Path, storage_header: bool) -> Result<Self> {
        log::info!("Opening DLT file: {:?}", path);
        let file = File::open(path)?;
        Ok(Self::new(BufReader::new(file), storage_header))
    }
}

impl<R: Read> DltPacketReader<R> {
    pub fn new(reader: R, storage_header: bool) -> Self {
        Self {
            reader,
            storage_header,
            position: 0,
            finished: false,
        }
    }

    /// Byte offset of the next packet
    pub fn position(&self) -> u64 {
        self.position
    }

    fn read_packet(&mut self) -> Result<Option<DltPacket>> {
        let prefix = if self.storage_header {
            STORAGE_HEADER_SIZE
        } else {
            0
        };
        let mut buf = vec![0u8; prefix + STANDARD_HEADER_SIZE];

        let read = read_full(&mut self.reader, &mut buf)?;
        if read == 0 {
            return Ok(None);
        }
        if read < buf.len() {
            return Err(DecoderError::PacketError(format!(
                "Truncated packet header at offset {}, {} bytes",
                self.position, read
            )));
        }

        let length = usize::from(BigEndian::read_u16(&buf[prefix + 2..prefix + 4]));
        if length < STANDARD_HEADER_SIZE {
            return Err(DecoderError::PacketError(format!(
                "Invalid packet length {} at offset {}",
                length, self.position
            )));
        }
        buf.resize(prefix + length, 0);
        let read = read_full(&mut self.reader, &mut buf[prefix + STANDARD_HEADER_SIZE..])?;
        if read < length - STANDARD_HEADER_SIZE {
            return Err(DecoderError::PacketError(format!(
                "Truncated packet at offset {}, expected {} bytes, got {}",
                self.position,
                prefix + length,
                prefix + STANDARD_HEADER_SIZE + read
            )));
        }

        let (mut packet, size) = DltPacket::parse(&buf, self.storage_header)?;
        packet.position = self.position;
        self.position += size as u64;
        Ok(Some(packet))
    }
}

impl<R: Read> Iterator for DltPacketReader<R> {
    type Item = Result<DltPacket>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        match self.read_packet() {
            Ok(Some(packet)) => Some(Ok(packet)),
            Ok(None) => {
                self.finished = true;
                None
            }
            Err(e) => {
                // Framing is lost, so nothing after this point can be trusted
                log::warn!("Stopping at offset {}: {}", self.position, e);
                self.finished = true;
                Some(Err(e))
            }
        }
    }
}

/// Like `read_exact`, but a short read at end of input returns the count
fn read_full<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(filled)
}
