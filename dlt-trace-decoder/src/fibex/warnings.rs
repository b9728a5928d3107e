//! Warnings raised while loading FIBEX descriptions
//!
//! Loading never stops at a bad element. Each problem is reported as a
//! [`FibexLoadEvent`] and the element is kept, repaired or discarded as
//! described on the individual [`FibexWarning`] variants.

use std::fmt;
use std::path::PathBuf;

/// Kind of problem found in a FIBEX file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FibexWarning {
    /// `ECU` element without an `ID`. Frames in the file get no ECU
    EcuIdMissing,
    /// More than one `ECU` in a file. The first is kept
    EcusMultipleDefined,
    /// `ECUS` came after `FRAMES`. Frames in the file get no ECU
    EcuIdMustBeBeforeFrames,
    /// Two `PDU`s with the same id. The first is kept
    PduIdDuplicate,
    /// `PDU` without an id. The PDU is discarded
    PduIdMissing,
    /// `BYTE-LENGTH` is not a decimal number. The PDU is kept with length 0
    PduInvalidByteLength,
    /// The same frame id twice in one file. The second is discarded
    FrameIdDuplicate,
    /// `FRAME` without an id. The frame is discarded
    FrameIdMissing,
    /// Frame id is not of the form `ID_<number>`. The frame is discarded
    FrameIdInvalid,
    /// Unknown message type or info. The frame is kept with type unknown
    FrameMessageTypeInvalid,
    /// `PDU-INSTANCE` without a reference. The frame is discarded
    FramePduRefIdMissing,
    /// `PDU-REF` to a PDU not defined before it. The frame is discarded
    FramePduRefIdUnknown,
    /// No `APPLICATION_ID` while frames are keyed by it. The frame is
    /// discarded
    FrameApplicationIdMissing,
    /// No `CONTEXT_ID` while frames are keyed by it. The frame is discarded
    FrameContextIdMissing,
    /// No `MESSAGE_TYPE`. The frame is discarded
    FrameMessageTypeMissing,
    /// No `MESSAGE_INFO`. The frame is discarded
    FrameMessageInfoMissing,
    /// Signal instance without a signal reference. The PDU is kept with no type
    MissingSignalIdRef,
    /// More than one signal in a PDU. The first is kept
    MultipleSignalsInPduDefined,
    /// The frame clashes with one already in the map, typically from
    /// another file. The frame is discarded
    DuplicateEntry,
}

impl FibexWarning {
    /// True if the element the warning is about was not added
    pub fn is_discarded(self) -> bool {
        use FibexWarning::*;
        matches!(
            self,
            PduIdMissing
                | FrameIdDuplicate
                | FrameIdMissing
                | FrameIdInvalid
                | FramePduRefIdMissing
                | FramePduRefIdUnknown
                | FrameApplicationIdMissing
                | FrameContextIdMissing
                | FrameMessageTypeMissing
                | FrameMessageInfoMissing
                | DuplicateEntry
        )
    }
}

impl fmt::Display for FibexWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// A warning together with where it was found
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FibexLoadEvent {
    pub warning: FibexWarning,
    /// File being loaded, `None` when loading from a string
    pub file: Option<PathBuf>,
    /// Byte offset in the XML just after the element's start tag
    pub position: u64,
    /// 1-based line of `position`
    pub line: usize,
    /// Frame id, 0 if the warning is not about a frame or the id is unusable
    pub message_id: u32,
    pub application_id: Option<String>,
    pub context_id: Option<String>,
    pub ecu_id: Option<String>,
}

impl FibexLoadEvent {
    pub(crate) fn new(warning: FibexWarning, position: u64, line: usize) -> Self {
        Self {
            warning,
            file: None,
            position,
            line,
            message_id: 0,
            application_id: None,
            context_id: None,
            ecu_id: None,
        }
    }
}

impl fmt::Display for FibexLoadEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.position == 0 {
            return write!(f, "{}", self.warning);
        }

        write!(f, "{} : ", self.warning)?;
        if let Some(file) = &self.file {
            write!(f, "{} ", file.display())?;
        }
        write!(
            f,
            "XML line {} pos {}",
            self.line, self.position
        )?;
        if self.message_id != 0 {
            write!(f, " ID_{}", self.message_id)?;
        }
        for id in [&self.application_id, &self.context_id, &self.ecu_id] {
            write!(f, " {}", id.as_deref().unwrap_or(""))?;
        }
        Ok(())
    }
}
