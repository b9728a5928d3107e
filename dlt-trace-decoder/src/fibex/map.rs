//! Frame lookup maps
//!
//! How a frame is found depends on what the trace carries. Without an
//! extended header there is no application or context id, so the message
//! id alone must be unique. With several ECUs described, the ECU id becomes
//! part of the key. [`FibexOptions`] selects one of four map shapes:
//!
//! | `with_ecu_id` | `without_ext_header` | shape                  |
//! |---------------|----------------------|------------------------|
//! | false         | false                | [`FrameMapDefault`]    |
//! | false         | true                 | [`FrameMapSimple`]     |
//! | true          | false                | [`FrameMapEcu`]        |
//! | true          | true                 | [`FrameMapEcuSimple`]  |
//!
//! Maps are populated once while loading and are read-only afterwards.

use super::frame::Frame;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// Options that decide the key shape of a [`FrameMap`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FibexOptions {
    /// Frames are keyed by ECU id as well as by message id
    #[serde(default)]
    pub with_ecu_id: bool,

    /// Messages have no extended header, so application and context ids
    /// are not part of the key
    #[serde(default)]
    pub without_ext_header: bool,
}

impl FibexOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ecu_id(mut self, enabled: bool) -> Self {
        self.with_ecu_id = enabled;
        self
    }

    pub fn without_ext_header(mut self, enabled: bool) -> Self {
        self.without_ext_header = enabled;
        self
    }
}

/// Frames keyed by message id only. The first frame added for an id wins
#[derive(Debug, Clone, Default)]
pub struct FrameMapSimple {
    frames: HashMap<u32, Arc<Frame>>,
}

impl FrameMapSimple {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn try_add_frame(&mut self, id: u32, frame: Arc<Frame>) -> bool {
        if self.frames.contains_key(&id) {
            return false;
        }
        self.frames.insert(id, frame);
        true
    }

    pub fn try_get_frame(&self, id: u32) -> Option<&Arc<Frame>> {
        self.frames.get(&id)
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

/// Frames keyed by message id, optionally scoped by ECU id
///
/// Every frame is also added to a global id map, so lookups without an ECU
/// still find the first frame described for an id.
#[derive(Debug, Clone, Default)]
pub struct FrameMapEcuSimple {
    frames: FrameMapSimple,
    ecu_frames: HashMap<String, FrameMapSimple>,
}

impl FrameMapEcuSimple {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn try_add_frame(&mut self, id: u32, ecu_id: Option<&str>, frame: Arc<Frame>) -> bool {
        let added = self.frames.try_add_frame(id, Arc::clone(&frame));
        match ecu_id {
            Some(ecu_id) => self
                .ecu_frames
                .entry(ecu_id.to_string())
                .or_default()
                .try_add_frame(id, frame),
            None => added,
        }
    }

    pub fn try_get_frame(&self, id: u32, ecu_id: Option<&str>) -> Option<&Arc<Frame>> {
        match ecu_id {
            Some(ecu_id) => self.ecu_frames.get(ecu_id)?.try_get_frame(id),
            None => self.frames.try_get_frame(id),
        }
    }
}

/// Frames keyed by application id, context id and message id
///
/// Adding requires both ids. Frames are also kept in an id-only map for
/// lines that arrive without an extended header.
#[derive(Debug, Clone, Default)]
pub struct FrameMapDefault {
    frames: FrameMapSimple,
    scoped: HashMap<String, HashMap<String, FrameMapSimple>>,
}

impl FrameMapDefault {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn try_add_frame(
        &mut self,
        id: u32,
        application_id: Option<&str>,
        context_id: Option<&str>,
        frame: Arc<Frame>,
    ) -> bool {
        let (Some(application_id), Some(context_id)) = (application_id, context_id) else {
            return false;
        };

        let scoped = self
            .scoped
            .entry(application_id.to_string())
            .or_default()
            .entry(context_id.to_string())
            .or_default();
        if !scoped.try_add_frame(id, Arc::clone(&frame)) {
            return false;
        }

        self.frames.try_add_frame(id, frame);
        true
    }

    pub fn try_get_frame(
        &self,
        id: u32,
        application_id: Option<&str>,
        context_id: Option<&str>,
    ) -> Option<&Arc<Frame>> {
        match (application_id, context_id) {
            (Some(application_id), Some(context_id)) => self
                .scoped
                .get(application_id)?
                .get(context_id)?
                .try_get_frame(id),
            _ => self.frames.try_get_frame(id),
        }
    }
}

/// A [`FrameMapDefault`] per ECU, plus one covering every ECU
#[derive(Debug, Clone, Default)]
pub struct FrameMapEcu {
    frames: FrameMapDefault,
    ecu_frames: HashMap<String, FrameMapDefault>,
}

impl FrameMapEcu {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn try_add_frame(
        &mut self,
        id: u32,
        application_id: Option<&str>,
        context_id: Option<&str>,
        ecu_id: Option<&str>,
        frame: Arc<Frame>,
    ) -> bool {
        let added = self
            .frames
            .try_add_frame(id, application_id, context_id, Arc::clone(&frame));
        match ecu_id {
            Some(ecu_id) => self
                .ecu_frames
                .entry(ecu_id.to_string())
                .or_default()
                .try_add_frame(id, application_id, context_id, frame),
            None => added,
        }
    }

    pub fn try_get_frame(
        &self,
        id: u32,
        application_id: Option<&str>,
        context_id: Option<&str>,
        ecu_id: Option<&str>,
    ) -> Option<&Arc<Frame>> {
        match ecu_id {
            Some(ecu_id) => self
                .ecu_frames
                .get(ecu_id)?
                .try_get_frame(id, application_id, context_id),
            None => self.frames.try_get_frame(id, application_id, context_id),
        }
    }
}

/// A frame map of any shape
#[derive(Debug, Clone)]
pub enum FrameMap {
    Simple(FrameMapSimple),
    EcuSimple(FrameMapEcuSimple),
    Default(FrameMapDefault),
    Ecu(FrameMapEcu),
}

impl FrameMap {
    /// Create an empty map with the shape selected by `options`
    pub fn new(options: FibexOptions) -> Self {
        match (options.with_ecu_id, options.without_ext_header) {
            (false, false) => FrameMap::Default(FrameMapDefault::new()),
            (false, true) => FrameMap::Simple(FrameMapSimple::new()),
            (true, false) => FrameMap::Ecu(FrameMapEcu::new()),
            (true, true) => FrameMap::EcuSimple(FrameMapEcuSimple::new()),
        }
    }

    /// Add a frame under its key
    ///
    /// Returns false if a frame with the same key already exists, in which
    /// case the map is unchanged for that key. Ids that are not part of the
    /// key shape are ignored.
    pub fn try_add_frame(
        &mut self,
        id: u32,
        application_id: Option<&str>,
        context_id: Option<&str>,
        ecu_id: Option<&str>,
        frame: Arc<Frame>,
    ) -> bool {
        match self {
            FrameMap::Simple(map) => map.try_add_frame(id, frame),
            FrameMap::EcuSimple(map) => map.try_add_frame(id, ecu_id, frame),
            FrameMap::Default(map) => map.try_add_frame(id, application_id, context_id, frame),
            FrameMap::Ecu(map) => map.try_add_frame(id, application_id, context_id, ecu_id, frame),
        }
    }

    /// Find the frame for a message
    pub fn try_get_frame(
        &self,
        id: u32,
        application_id: Option<&str>,
        context_id: Option<&str>,
        ecu_id: Option<&str>,
    ) -> Option<&Arc<Frame>> {
        match self {
            FrameMap::Simple(map) => map.try_get_frame(id),
            FrameMap::EcuSimple(map) => map.try_get_frame(id, ecu_id),
            FrameMap::Default(map) => map.try_get_frame(id, application_id, context_id),
            FrameMap::Ecu(map) => map.try_get_frame(id, application_id, context_id, ecu_id),
        }
    }
}

impl Default for FrameMap {
    fn default() -> Self {
        FrameMap::new(FibexOptions::default())
    }
}
