//! DLT Trace Decoder Library
//!
//! A reusable library for decoding AUTOSAR DLT trace files, with
//! non-verbose message descriptions loaded from FIBEX files, and for
//! selecting decoded lines with constraint expressions.
//!
//! # Architecture
//!
//! The library is split into small layers:
//! - `packet` frames a byte stream into DLT packets and reads their headers
//! - `verbose` decodes self describing arguments from their type info
//! - `nonverbose` decodes arguments through a frame description looked up
//!   by message id
//! - `fibex` loads frame descriptions into a read-only [`FrameMap`]
//! - `constraints` builds and evaluates boolean expressions over lines
//! - [`Decoder`] ties the layers together for one input stream
//!
//! The library does NOT:
//! - Read from live connections (files and byte buffers only)
//! - Format or write output
//! - Install a logger
//!
//! All higher-level functionality is in the application layer (dlt-trace-cli).
//!
//! # Example Usage
//!
//! ```no_run
//! use dlt_trace_decoder::{Constraint, Decoder, DecoderConfig, TraceLine};
//! use std::path::Path;
//!
//! // Create a decoder and load non-verbose descriptions
//! let config = DecoderConfig::new()
//!     .with_ecu_id(true)
//!     .add_fibex_path("fibex/");
//! let mut decoder = Decoder::from_config(config).unwrap();
//!
//! // Only warnings from the temperature monitor
//! let filter = Constraint::new()
//!     .dlt_app_id("TEMP")
//!     .text_istring("warning")
//!     .end()
//!     .unwrap();
//!
//! for line in decoder.decode_file(Path::new("trace.dlt")).unwrap() {
//!     match line {
//!         Ok(line) => {
//!             if filter.check(&line).unwrap() {
//!                 println!("{}", line.text());
//!             }
//!         }
//!         Err(e) => eprintln!("Decode error: {}", e),
//!     }
//! }
//! ```

// Public modules
pub mod args;
pub mod config;
pub mod constraints;
pub mod decoder;
pub mod fibex;
pub mod line;
pub mod nonverbose;
pub mod packet;
pub mod types;
pub mod verbose;

// Re-export main types for convenience
pub use args::{ArgResult, Argument};
pub use config::DecoderConfig;
pub use constraints::{Constraint, ConstraintOptions, ConstraintState, MatchConstraint};
pub use decoder::Decoder;
pub use fibex::{FibexFile, FibexLoadEvent, FibexOptions, FibexWarning, Frame, FrameMap, Pdu};
pub use line::{DltLineBuilder, DltTraceLine, TraceLine};
pub use nonverbose::{NonVerboseArgDecode, NonVerboseArgDecoder, NonVerboseDltDecoder};
pub use packet::{DltPacket, DltPacketReader};
pub use types::{
    ConstraintError, DecodeError, DecoderError, DltType, IntegerEncoding, Result,
    StringEncoding, Timestamp,
};
pub use verbose::{VerboseArgDecoder, VerboseDltDecoder};

// Internal modules (not exposed in public API)
mod bits;
mod strings;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
