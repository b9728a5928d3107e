//! Main decoder API
//!
//! This module provides the primary interface for the decoder library.
//! The Decoder struct is the entry point for loading FIBEX descriptions and
//! decoding DLT files into lines.

use crate::args::Argument;
use crate::bits;
use crate::config::DecoderConfig;
use crate::fibex::{FibexFile, FrameMap};
use crate::line::{DltLineBuilder, DltTraceLine};
use crate::nonverbose::{NonVerboseArgDecoder, NonVerboseDltDecoder};
use crate::packet::{DltPacket, DltPacketReader};
use crate::types::{DecodeError, Result};
use crate::verbose::VerboseDltDecoder;
use std::io::Read;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use std::sync::Arc;

/// The main decoder struct - entry point for all decoding operations
///
/// A decoder holds per-pipeline state: the line counter and the set of
/// non-verbose message ids it has already warned about. Use one decoder
/// per input and share the frame map between them with
/// [`with_frame_map`](Self::with_frame_map).
pub struct Decoder {
    config: DecoderConfig,
    verbose: VerboseDltDecoder,
    non_verbose: NonVerboseDltDecoder,
    builder: DltLineBuilder,
}

impl Decoder {
    /// Create a new decoder instance with the default configuration
    pub fn new() -> Self {
        Self::with_config(DecoderConfig::default())
    }

    /// Create a decoder without loading anything
    ///
    /// The FIBEX paths of the configuration are ignored; use
    /// [`from_config`](Self::from_config) to load them.
    pub fn with_config(config: DecoderConfig) -> Self {
        Self {
            config,
            verbose: VerboseDltDecoder::default(),
            non_verbose: NonVerboseDltDecoder::new(None),
            builder: DltLineBuilder::new(),
        }
    }

    /// Create a decoder and load the FIBEX paths named by the configuration
    ///
    /// # Example
    /// ```no_run
    /// use dlt_trace_decoder::{Decoder, DecoderConfig};
    ///
    /// let config = DecoderConfig::new().add_fibex_path("fibex/");
    /// let decoder = Decoder::from_config(config).unwrap();
    /// ```
    pub fn from_config(config: DecoderConfig) -> Result<Self> {
        let paths = config.fibex_paths.clone();
        let mut decoder = Self::with_config(config);
        if !paths.is_empty() {
            decoder.load_fibex(&paths)?;
        }
        Ok(decoder)
    }

    /// Use a frame map that was loaded elsewhere
    pub fn with_frame_map(mut self, frame_map: Arc<FrameMap>) -> Self {
        self.set_frame_map(Some(frame_map));
        self
    }

    /// Replace the argument decoder registry used for non-verbose payloads
    pub fn with_non_verbose_decoder(mut self, arg_decoder: NonVerboseArgDecoder) -> Self {
        let frame_map = self.non_verbose.frame_map().cloned();
        self.non_verbose = NonVerboseDltDecoder::with_arg_decoder(arg_decoder, frame_map);
        self
    }

    /// Load FIBEX files and directories into a new frame map
    ///
    /// Warnings are logged and loading continues. A file that cannot be read
    /// or parsed stops the load.
    ///
    /// # Arguments
    /// * `paths` - FIBEX files, or directories whose `*.xml` files are loaded
    ///
    /// # Returns
    /// * `Result<bool>` - Ok(true) if every file loaded without warnings
    ///
    /// # Example
    /// ```no_run
    /// use dlt_trace_decoder::Decoder;
    /// use std::path::PathBuf;
    ///
    /// let mut decoder = Decoder::new();
    /// decoder.load_fibex(&[PathBuf::from("tcb.xml")]).unwrap();
    /// ```
    pub fn load_fibex<P: AsRef<Path>>(&mut self, paths: &[P]) -> Result<bool> {
        let mut fibex = FibexFile::new(self.config.fibex);
        let mut clean = true;
        for path in paths {
            log::info!("Loading FIBEX: {:?}", path.as_ref());
            clean &= fibex.load_path(path)?;
        }
        log::info!(
            "FIBEX loaded with {} warning(s) from {} path(s)",
            fibex.warning_count(),
            paths.len()
        );
        self.set_frame_map(Some(Arc::new(fibex.into_frame_map())));
        Ok(clean)
    }

    /// The frame map used for non-verbose payloads, if any
    pub fn frame_map(&self) -> Option<&Arc<FrameMap>> {
        self.non_verbose.frame_map()
    }

    pub fn config(&self) -> &DecoderConfig {
        &self.config
    }

    fn set_frame_map(&mut self, frame_map: Option<Arc<FrameMap>>) {
        let arg_decoder = std::mem::take(&mut self.non_verbose).into_arg_decoder();
        self.non_verbose = NonVerboseDltDecoder::with_arg_decoder(arg_decoder, frame_map);
    }

    /// Decode one framed packet into a line
    ///
    /// Malformed payloads never fail: the line carries whatever was decoded
    /// before the problem and an error message. An unexpected fault while
    /// decoding is caught here, logged, and reported the same way, so one
    /// bad record never ends a stream.
    pub fn decode_packet(&mut self, packet: &DltPacket) -> DltTraceLine {
        packet.fill_builder(&mut self.builder);

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.decode_payload(packet)));
        match outcome {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => {
                log::debug!("Malformed packet at offset {}: {}", packet.position, e);
            }
            Err(cause) => {
                let reason = cause
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| cause.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown cause".to_string());
                let error = DecodeError::Unexpected {
                    message: format!("Unexpected error decoding packet at offset {}", packet.position),
                    cause: reason,
                };
                log::error!("{}", error);
                self.builder.set_error_message(error.to_string());
            }
        }

        self.builder.build()
    }

    /// Frame and decode the packet at the start of `bytes`
    ///
    /// Returns the line and the number of bytes the packet occupied.
    pub fn decode_bytes(&mut self, bytes: &[u8]) -> Result<(DltTraceLine, usize)> {
        let (packet, size) = DltPacket::parse(bytes, self.config.storage_header)?;
        Ok((self.decode_packet(&packet), size))
    }

    fn decode_payload(&mut self, packet: &DltPacket) -> std::result::Result<usize, DecodeError> {
        let payload = packet.payload.as_slice();
        if packet.is_verbose() {
            return self.verbose.decode(payload, &mut self.builder);
        }

        let is_control = packet
            .extended_header
            .as_ref()
            .map(|ext| ext.dlt_type().is_control())
            .unwrap_or(false);
        if is_control || !self.config.decode_non_verbose {
            let big_endian = self.builder.big_endian();
            let (message_id, bytes) = if payload.len() >= 4 {
                (bits::read_u32(payload, big_endian), payload[4..].to_vec())
            } else {
                (0, payload.to_vec())
            };
            self.builder
                .set_message_id(message_id)
                .add_argument(Argument::NonVerbose { message_id, bytes });
            return Ok(payload.len());
        }

        self.non_verbose.decode(payload, &mut self.builder)
    }

    /// Decode a DLT file and return an iterator of lines
    ///
    /// This is the main decoding function. It returns an iterator that lazily
    /// decodes the file packet by packet. Packets from ECUs excluded by the
    /// configuration are skipped. A framing error is yielded once and ends
    /// the iteration.
    ///
    /// # Arguments
    /// * `path` - Path to the DLT file
    ///
    /// # Example
    /// ```no_run
    /// use dlt_trace_decoder::{Decoder, TraceLine};
    /// use std::path::Path;
    ///
    /// let mut decoder = Decoder::new();
    /// for line in decoder.decode_file(Path::new("trace.dlt")).unwrap() {
    ///     match line {
    ///         Ok(line) => println!("{}", line.text()),
    ///         Err(e) => eprintln!("Error: {}", e),
    ///     }
    /// }
    /// ```
    pub fn decode_file(
        &mut self,
        path: &Path,
    ) -> Result<Box<dyn Iterator<Item = Result<DltTraceLine>> + '_>> {
        log::info!("Decoding DLT file: {:?}", path);
        let packets = DltPacketReader::open(path, self.config.storage_header)?;
        Ok(Box::new(DecodingIterator::new(packets, self)))
    }

    /// Decode DLT packets from any reader
    pub fn decode_reader<R: Read + 'static>(
        &mut self,
        reader: R,
    ) -> Box<dyn Iterator<Item = Result<DltTraceLine>> + '_> {
        let packets = DltPacketReader::new(reader, self.config.storage_header);
        Box::new(DecodingIterator::new(packets, self))
    }
}

impl Default for Decoder {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Decoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Decoder")
            .field("config", &self.config)
            .field("has_frame_map", &self.frame_map().is_some())
            .finish()
    }
}

/// Iterator that decodes packets into lines
struct DecodingIterator<'a, I>
where
    I: Iterator<Item = Result<DltPacket>>,
{
    packets: I,
    decoder: &'a mut Decoder,
}

impl<'a, I> DecodingIterator<'a, I>
where
    I: Iterator<Item = Result<DltPacket>>,
{
    fn new(packets: I, decoder: &'a mut Decoder) -> Self {
        Self { packets, decoder }
    }
}

impl<'a, I> Iterator for DecodingIterator<'a, I>
where
    I: Iterator<Item = Result<DltPacket>>,
{
    type Item = Result<DltTraceLine>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.packets.next()? {
                Ok(packet) => {
                    if !self.decoder.config.should_process_ecu(packet.ecu_id()) {
                        log::trace!("Skipping packet at offset {} from {:?}", packet.position, packet.ecu_id());
                        continue;
                    }
                    return Some(Ok(self.decoder.decode_packet(&packet)));
                }
                Err(e) => return Some(Err(e)),
            }
        }
    }
}
