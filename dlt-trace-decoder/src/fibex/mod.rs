//! FIBEX descriptions of non-verbose messages
//!
//! A non-verbose DLT message carries only a 32-bit message id followed by
//! packed argument values. The FIBEX file says what the id means: which
//! application and context sent it, its message type and the list of PDUs
//! that make up the payload.
//!
//! # Architecture
//!
//! - [`FibexFile`] reads one or more XML files and reports problems as
//!   [`FibexLoadEvent`]s
//! - the frames end up in a [`FrameMap`], whose key shape is chosen by
//!   [`FibexOptions`]
//! - once loading is done the map is read-only and is shared between
//!   decoders behind an `Arc`

mod frame;
mod loader;
mod map;
mod warnings;

pub use frame::{Frame, Pdu};
pub use loader::FibexFile;
pub use map::{
    FibexOptions, FrameMap, FrameMapDefault, FrameMapEcu, FrameMapEcuSimple, FrameMapSimple,
};
pub use warnings::{FibexLoadEvent, FibexWarning};
