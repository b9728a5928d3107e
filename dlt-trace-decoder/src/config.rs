//! Decoder configuration types
//!
//! This module defines the configuration needed by the decoder library.
//! Filtering of decoded lines is done with a [`Constraint`](crate::Constraint)
//! by the application layer; the options here only describe the input.

use crate::constraints::ConstraintOptions;
use crate::fibex::FibexOptions;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration for the decoder library
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecoderConfig {
    /// Key shape of the frame map built from FIBEX files
    #[serde(default)]
    pub fibex: FibexOptions,

    /// FIBEX files or directories of FIBEX files to load
    #[serde(default)]
    pub fibex_paths: Vec<PathBuf>,

    /// Whether each packet in a file starts with a storage header
    #[serde(default = "default_true")]
    pub storage_header: bool,

    /// Whether non-verbose payloads are decoded (false = emit them opaque)
    #[serde(default = "default_true")]
    pub decode_non_verbose: bool,

    /// Optional: only decode packets from these ECUs
    #[serde(default)]
    pub ecu_filter: Option<Vec<String>>,

    /// How constraints built from this configuration are evaluated
    #[serde(default)]
    pub constraint_options: ConstraintOptions,
}

fn default_true() -> bool {
    true
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            fibex: FibexOptions::default(),
            fibex_paths: Vec::new(),
            storage_header: true,
            decode_non_verbose: true,
            ecu_filter: None,
            constraint_options: ConstraintOptions::default(),
        }
    }
}

impl DecoderConfig {
    /// Create a new decoder configuration with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method: key frames by ECU id as well
    pub fn with_ecu_id(mut self, enabled: bool) -> Self {
        self.fibex.with_ecu_id = enabled;
        self
    }

    /// Builder method: frames are looked up without application and context id
    pub fn without_ext_header(mut self, enabled: bool) -> Self {
        self.fibex.without_ext_header = enabled;
        self
    }

    /// Builder method: add a FIBEX file or directory
    pub fn add_fibex_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.fibex_paths.push(path.into());
        self
    }

    /// Builder method: whether files carry storage headers
    pub fn with_storage_header(mut self, enabled: bool) -> Self {
        self.storage_header = enabled;
        self
    }

    /// Builder method: enable or disable non-verbose decoding
    pub fn with_non_verbose_decoding(mut self, enabled: bool) -> Self {
        self.decode_non_verbose = enabled;
        self
    }

    /// Builder method: set ECU filter
    pub fn with_ecu_filter(mut self, ecus: Vec<String>) -> Self {
        self.ecu_filter = Some(ecus);
        self
    }

    /// Builder method: set the constraint evaluation strategy
    pub fn with_constraint_options(mut self, options: ConstraintOptions) -> Self {
        self.constraint_options = options;
        self
    }

    /// Check if a packet from this ECU should be decoded
    ///
    /// Packets without an ECU id only pass when there is no filter.
    pub fn should_process_ecu(&self, ecu_id: Option<&str>) -> bool {
        match (&self.ecu_filter, ecu_id) {
            (None, _) => true,
            (Some(ecus), Some(id)) => ecus.iter().any(|e| e == id),
            (Some(_), None) => false,
        }
    }
}
