//! Streaming FIBEX reader
//!
//! Each file is read in a single pass with `quick-xml`. Element names are
//! matched on their local part so any namespace prefix is accepted. Because
//! nothing is read twice, a file must define its ECU and its PDUs before the
//! frames that use them.
//!
//! Problems in the description are never fatal. They are reported as
//! [`FibexLoadEvent`]s, logged, and handed to an optional callback. Only an
//! XML syntax error or an I/O error stops a load.

use super::frame::{Frame, Pdu};
use super::map::{FibexOptions, FrameMap};
use super::warnings::{FibexLoadEvent, FibexWarning};
use crate::types::{DecoderError, DltType, Result};
use quick_xml::escape::resolve_predefined_entity;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

type WarningHandler = Box<dyn FnMut(&FibexLoadEvent) + Send>;

/// Loads FIBEX descriptions into a [`FrameMap`]
///
/// Several files may be loaded into the same map, typically one per ECU.
/// A frame that clashes with one loaded earlier is reported as
/// [`FibexWarning::DuplicateEntry`] and the earlier frame is kept.
pub struct FibexFile {
    options: FibexOptions,
    frames: FrameMap,
    on_warning: Option<WarningHandler>,
    warnings: usize,
}

impl FibexFile {
    pub fn new(options: FibexOptions) -> Self {
        Self {
            options,
            frames: FrameMap::new(options),
            on_warning: None,
            warnings: 0,
        }
    }

    /// Call `handler` for every warning raised while loading
    pub fn with_warning_handler<F>(mut self, handler: F) -> Self
    where
        F: FnMut(&FibexLoadEvent) + Send + 'static,
    {
        self.on_warning = Some(Box::new(handler));
        self
    }

    pub fn options(&self) -> FibexOptions {
        self.options
    }

    /// Total number of warnings raised by all loads so far
    pub fn warning_count(&self) -> usize {
        self.warnings
    }

    pub fn frame_map(&self) -> &FrameMap {
        &self.frames
    }

    /// Take the loaded frames, ready to be shared between decoders
    pub fn into_frame_map(self) -> FrameMap {
        self.frames
    }

    pub fn try_get_frame(
        &self,
        id: u32,
        application_id: Option<&str>,
        context_id: Option<&str>,
        ecu_id: Option<&str>,
    ) -> Option<&Arc<Frame>> {
        self.frames.try_get_frame(id, application_id, context_id, ecu_id)
    }

    /// Load a description held in memory
    ///
    /// Returns `Ok(true)` if no warnings were raised.
    pub fn load_str(&mut self, xml: &str) -> Result<bool> {
        self.load(xml, None)
    }

    /// Load one FIBEX file
    ///
    /// Returns `Ok(true)` if no warnings were raised.
    pub fn load_file(&mut self, path: impl AsRef<Path>) -> Result<bool> {
        let path = path.as_ref();
        log::info!("Loading FIBEX file: {:?}", path);

        let bytes = std::fs::read(path)?;
        let xml = String::from_utf8_lossy(&bytes);
        self.load(&xml, Some(path))
    }

    /// Load every `*.xml` file in a directory, in name order
    ///
    /// A file that is not well formed is logged and skipped. Returns
    /// `Ok(true)` if every file loaded without warnings.
    pub fn load_dir(&mut self, dir: impl AsRef<Path>) -> Result<bool> {
        let dir = dir.as_ref();
        let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.is_file() && is_xml(path))
            .collect();
        paths.sort();

        log::info!("Loading {} FIBEX files from {:?}", paths.len(), dir);

        let mut clean = true;
        for path in &paths {
            match self.load_file(path) {
                Ok(no_warnings) => clean &= no_warnings,
                Err(e) => {
                    log::error!("Failed to load FIBEX file {:?}: {} (continuing...)", path, e);
                    clean = false;
                }
            }
        }
        Ok(clean)
    }

    /// Load a file, or every file of a directory
    pub fn load_path(&mut self, path: impl AsRef<Path>) -> Result<bool> {
        let path = path.as_ref();
        if path.is_dir() {
            self.load_dir(path)
        } else {
            self.load_file(path)
        }
    }

    fn load(&mut self, xml: &str, file: Option<&Path>) -> Result<bool> {
        let xml = xml.trim_start_matches('\u{feff}');
        let mut parser = FibexParser::new(xml, self.options, &mut self.frames);
        let outcome = parser.run();
        let added = parser.added;
        let events = parser.events;

        let raised = events.len();
        for mut event in events {
            event.file = file.map(Path::to_path_buf);
            self.report(&event);
        }
        outcome?;

        log::info!(
            "Loaded {} frames from {} with {} warnings",
            added,
            file.map(|p| p.display().to_string())
                .unwrap_or_else(|| "string".to_string()),
            raised
        );
        Ok(raised == 0)
    }

    fn report(&mut self, event: &FibexLoadEvent) {
        self.warnings += 1;
        log::warn!("FIBEX {} (continuing...)", event);
        if let Some(handler) = self.on_warning.as_mut() {
            handler(event);
        }
    }
}

impl Default for FibexFile {
    fn default() -> Self {
        Self::new(FibexOptions::default())
    }
}

impl fmt::Debug for FibexFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FibexFile")
            .field("options", &self.options)
            .field("frames", &self.frames)
            .field("warnings", &self.warnings)
            .finish()
    }
}

fn is_xml(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.eq_ignore_ascii_case("xml"))
        .unwrap_or(false)
}

/// Parse `ID_<decimal>` into a message id
fn parse_frame_id(text: &str) -> Option<u32> {
    let digits = text.strip_prefix("ID_")?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// Map the manufacturer extension's type and info names to a [`DltType`]
///
/// An empty info gives the bare message class. `None` if the pair is not a
/// valid combination.
fn parse_message_type(message_type: &str, message_info: &str) -> Option<DltType> {
    use DltType::*;
    let dlt_type = match (message_type, message_info) {
        ("DLT_TYPE_LOG", "") => Log,
        ("DLT_TYPE_LOG", "DLT_LOG_FATAL") => LogFatal,
        ("DLT_TYPE_LOG", "DLT_LOG_ERROR") => LogError,
        ("DLT_TYPE_LOG", "DLT_LOG_WARN") => LogWarn,
        ("DLT_TYPE_LOG", "DLT_LOG_INFO") => LogInfo,
        ("DLT_TYPE_LOG", "DLT_LOG_DEBUG") => LogDebug,
        ("DLT_TYPE_LOG", "DLT_LOG_VERBOSE") => LogVerbose,
        ("DLT_TYPE_APP_TRACE", "") => AppTrace,
        ("DLT_TYPE_APP_TRACE", "DLT_TRACE_VARIABLE") => AppTraceVariable,
        ("DLT_TYPE_APP_TRACE", "DLT_TRACE_FUNCTION_IN") => AppTraceFunctionIn,
        ("DLT_TYPE_APP_TRACE", "DLT_TRACE_FUNCTION_OUT") => AppTraceFunctionOut,
        ("DLT_TYPE_APP_TRACE", "DLT_TRACE_STATE") => AppTraceState,
        ("DLT_TYPE_APP_TRACE", "DLT_TRACE_VFB") => AppTraceVfb,
        ("DLT_TYPE_NW_TRACE", "") => NwTrace,
        ("DLT_TYPE_NW_TRACE", "DLT_NW_TRACE_IPC") => NwTraceIpc,
        ("DLT_TYPE_NW_TRACE", "DLT_NW_TRACE_CAN") => NwTraceCan,
        ("DLT_TYPE_NW_TRACE", "DLT_NW_TRACE_FLEXRAY") => NwTraceFlexray,
        ("DLT_TYPE_NW_TRACE", "DLT_NW_TRACE_MOST") => NwTraceMost,
        ("DLT_TYPE_NW_TRACE", "DLT_NW_TRACE_ETHERNET") => NwTraceEthernet,
        ("DLT_TYPE_NW_TRACE", "DLT_NW_TRACE_SOMEIP") => NwTraceSomeip,
        _ => return None,
    };
    Some(dlt_type)
}

/// Value of attribute `name`, ignoring any prefix
fn attribute(element: &BytesStart, name: &str) -> Option<String> {
    element
        .attributes()
        .flatten()
        .find(|attr| attr.key.local_name().as_ref() == name.as_bytes())
        .map(|attr| String::from_utf8_lossy(&attr.value).into_owned())
}

/// Where an element started
#[derive(Debug, Clone, Copy)]
struct Location {
    position: u64,
    line: usize,
}

#[derive(Debug)]
struct PduState {
    id: Option<String>,
    location: Location,
    description: Option<String>,
    byte_length: Option<String>,
    signal_lists: usize,
    signal_instances: usize,
    signal_refs: Vec<Option<String>>,
}

#[derive(Debug, Default)]
struct PduInstance {
    reference: Option<String>,
    sequence: Option<u32>,
}

#[derive(Debug)]
struct FrameState {
    id: Option<String>,
    location: Location,
    instances: Vec<PduInstance>,
    message_type: Option<String>,
    message_info: Option<String>,
    application_id: Option<String>,
    context_id: Option<String>,
}

/// State for reading one file
struct FibexParser<'a> {
    xml: &'a str,
    options: FibexOptions,
    frames: &'a mut FrameMap,
    events: Vec<FibexLoadEvent>,
    added: usize,

    /// Local names of the open elements
    path: Vec<String>,
    text: String,

    /// Newlines are counted up to `counted`, which only moves forward
    counted: usize,
    line: usize,

    ecu_id: Option<String>,
    ecu_count: usize,
    frames_seen: bool,
    pdus: HashMap<String, Arc<Pdu>>,
    frame_ids: HashSet<u32>,

    pdu: Option<PduState>,
    frame: Option<FrameState>,
}

impl<'a> FibexParser<'a> {
    fn new(xml: &'a str, options: FibexOptions, frames: &'a mut FrameMap) -> Self {
        Self {
            xml,
            options,
            frames,
            events: Vec::new(),
            added: 0,
            path: Vec::new(),
            text: String::new(),
            counted: 0,
            line: 1,
            ecu_id: None,
            ecu_count: 0,
            frames_seen: false,
            pdus: HashMap::new(),
            frame_ids: HashSet::new(),
            pdu: None,
            frame: None,
        }
    }

    fn run(&mut self) -> Result<()> {
        // Text is trimmed per element, after entity references are joined
        let mut reader = Reader::from_str(self.xml);

        loop {
            match reader.read_event() {
                Ok(Event::Start(e)) => {
                    let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                    let location = self.location(reader.buffer_position() as u64);
                    self.start_element(&name, &e, location);
                    self.path.push(name);
                }
                Ok(Event::Empty(e)) => {
                    let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                    let location = self.location(reader.buffer_position() as u64);
                    self.start_element(&name, &e, location);
                    self.end_element(&name);
                }
                Ok(Event::End(e)) => {
                    let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                    self.path.pop();
                    self.end_element(&name);
                }
                Ok(Event::Text(e)) => {
                    self.text.push_str(&String::from_utf8_lossy(e.as_ref()));
                }
                Ok(Event::GeneralRef(e)) => match e.resolve_char_ref() {
                    Ok(Some(c)) => self.text.push(c),
                    Ok(None) => {
                        let name = String::from_utf8_lossy(e.as_ref());
                        match resolve_predefined_entity(&name) {
                            Some(value) => self.text.push_str(value),
                            None => log::debug!("FIBEX ignoring entity &{};", name),
                        }
                    }
                    Err(err) => log::debug!("FIBEX ignoring character reference: {}", err),
                },
                Ok(Event::Eof) => break,
                Err(e) => {
                    return Err(DecoderError::FibexParseError(format!(
                        "{} at position {}",
                        e,
                        reader.buffer_position()
                    )));
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn location(&mut self, position: u64) -> Location {
        let end = (position as usize).min(self.xml.len());
        if end > self.counted {
            self.line += self.xml.as_bytes()[self.counted..end]
                .iter()
                .filter(|&&b| b == b'\n')
                .count();
            self.counted = end;
        }
        Location {
            position,
            line: self.line,
        }
    }

    fn parent(&self) -> Option<String> {
        self.path.last().cloned()
    }

    fn start_element(&mut self, name: &str, element: &BytesStart, location: Location) {
        self.text.clear();

        match (name, self.parent().as_deref()) {
            ("ECU", Some("ECUS")) => self.ecu(element, location),
            ("FRAMES", _) => self.frames_seen = true,
            ("PDU", Some("PDUS")) => {
                self.pdu = Some(PduState {
                    id: attribute(element, "ID"),
                    location,
                    description: None,
                    byte_length: None,
                    signal_lists: 0,
                    signal_instances: 0,
                    signal_refs: Vec::new(),
                });
            }
            ("FRAME", Some("FRAMES")) => {
                self.frame = Some(FrameState {
                    id: attribute(element, "ID"),
                    location,
                    instances: Vec::new(),
                    message_type: None,
                    message_info: None,
                    application_id: None,
                    context_id: None,
                });
            }
            _ => {}
        }

        let parent = self.path.last().map(String::as_str);
        if let Some(pdu) = self.pdu.as_mut() {
            match (name, parent) {
                ("SIGNAL-INSTANCES", Some("PDU")) => pdu.signal_lists += 1,
                ("SIGNAL-INSTANCE", Some("SIGNAL-INSTANCES")) => pdu.signal_instances += 1,
                ("SIGNAL-REF", Some("SIGNAL-INSTANCE")) => {
                    pdu.signal_refs.push(attribute(element, "ID-REF"));
                }
                _ => {}
            }
        }
        if let Some(frame) = self.frame.as_mut() {
            match (name, parent) {
                ("PDU-INSTANCE", Some("PDU-INSTANCES")) => {
                    frame.instances.push(PduInstance::default());
                }
                ("PDU-REF", Some("PDU-INSTANCE")) => {
                    if let Some(instance) = frame.instances.last_mut() {
                        instance.reference = attribute(element, "ID-REF");
                    }
                }
                _ => {}
            }
        }
    }

    fn end_element(&mut self, name: &str) {
        let text = std::mem::take(&mut self.text);

        match (name, self.parent().as_deref()) {
            ("PDU", Some("PDUS")) => {
                if let Some(pdu) = self.pdu.take() {
                    self.finish_pdu(pdu);
                }
                return;
            }
            ("FRAME", Some("FRAMES")) => {
                if let Some(frame) = self.frame.take() {
                    self.finish_frame(frame);
                }
                return;
            }
            _ => {}
        }

        let parent = self.path.last().map(String::as_str);
        if let Some(pdu) = self.pdu.as_mut() {
            match (name, parent) {
                ("DESC", Some("PDU")) => pdu.description = Some(text.trim().to_string()),
                ("BYTE-LENGTH", Some("PDU")) => pdu.byte_length = Some(text.clone()),
                _ => {}
            }
        }
        if let Some(frame) = self.frame.as_mut() {
            let value = Some(text.trim().to_string());
            match (name, parent) {
                ("SEQUENCE-NUMBER", Some("PDU-INSTANCE")) => {
                    if let Some(instance) = frame.instances.last_mut() {
                        instance.sequence = text.trim().parse().ok();
                    }
                }
                ("MESSAGE_TYPE", Some("MANUFACTURER-EXTENSION")) => frame.message_type = value,
                ("MESSAGE_INFO", Some("MANUFACTURER-EXTENSION")) => frame.message_info = value,
                ("APPLICATION_ID", Some("MANUFACTURER-EXTENSION")) => {
                    frame.application_id = value
                }
                ("CONTEXT_ID", Some("MANUFACTURER-EXTENSION")) => frame.context_id = value,
                _ => {}
            }
        }
    }

    fn ecu(&mut self, element: &BytesStart, location: Location) {
        self.ecu_count += 1;
        if self.frames_seen {
            self.warn(FibexWarning::EcuIdMustBeBeforeFrames, location);
            return;
        }
        if self.ecu_count > 1 {
            self.warn(FibexWarning::EcusMultipleDefined, location);
            return;
        }

        match attribute(element, "ID") {
            Some(id) if !id.trim().is_empty() => {
                log::debug!("FIBEX ECU {}", id.trim());
                self.ecu_id = Some(id.trim().to_string());
            }
            _ => self.warn(FibexWarning::EcuIdMissing, location),
        }
    }

    fn finish_pdu(&mut self, pdu: PduState) {
        let id = match pdu.id.as_deref().map(str::trim) {
            Some(id) if !id.is_empty() => id.to_string(),
            _ => {
                self.warn(FibexWarning::PduIdMissing, pdu.location);
                return;
            }
        };
        if self.pdus.contains_key(&id) {
            self.warn(FibexWarning::PduIdDuplicate, pdu.location);
            return;
        }

        let mut pdu_length = 0;
        if let Some(text) = &pdu.byte_length {
            match text.trim().parse::<u32>() {
                Ok(length) => pdu_length = length as usize,
                Err(_) => self.warn(FibexWarning::PduInvalidByteLength, pdu.location),
            }
        }

        let mut pdu_type = String::new();
        let has_signals =
            pdu.signal_lists > 0 || pdu.signal_instances > 0 || !pdu.signal_refs.is_empty();
        if has_signals {
            match pdu.signal_refs.first() {
                Some(Some(reference)) if !reference.trim().is_empty() => {
                    pdu_type = reference.trim().to_string();
                }
                _ => self.warn(FibexWarning::MissingSignalIdRef, pdu.location),
            }
            if pdu.signal_lists > 1 || pdu.signal_instances > 1 || pdu.signal_refs.len() > 1 {
                self.warn(FibexWarning::MultipleSignalsInPduDefined, pdu.location);
            }
        }

        self.pdus.insert(
            id,
            Arc::new(Pdu {
                pdu_type,
                pdu_length,
                description: pdu.description,
            }),
        );
    }

    fn finish_frame(&mut self, mut frame: FrameState) {
        let mut warnings = Vec::new();

        let id = match frame.id.as_deref().map(str::trim) {
            None | Some("") => {
                warnings.push(FibexWarning::FrameIdMissing);
                None
            }
            Some(text) => match parse_frame_id(text) {
                Some(id) => Some(id),
                None => {
                    warnings.push(FibexWarning::FrameIdInvalid);
                    None
                }
            },
        };
        if let Some(id) = id {
            if !self.frame_ids.insert(id) {
                warnings.push(FibexWarning::FrameIdDuplicate);
            }
        }

        if frame.message_info.is_none() {
            warnings.push(FibexWarning::FrameMessageInfoMissing);
        }
        if frame.message_type.is_none() {
            warnings.push(FibexWarning::FrameMessageTypeMissing);
        }
        // Application and context ids are only keys with an extended header
        if !self.options.without_ext_header {
            if frame.application_id.is_none() {
                warnings.push(FibexWarning::FrameApplicationIdMissing);
            }
            if frame.context_id.is_none() {
                warnings.push(FibexWarning::FrameContextIdMissing);
            }
        }

        let message_type = match (&frame.message_type, &frame.message_info) {
            (Some(message_type), Some(message_info)) => {
                match parse_message_type(message_type, message_info) {
                    Some(dlt_type) => dlt_type,
                    None => {
                        warnings.push(FibexWarning::FrameMessageTypeInvalid);
                        DltType::Unknown
                    }
                }
            }
            _ => DltType::Unknown,
        };

        if frame.instances.iter().all(|instance| instance.sequence.is_some()) {
            frame.instances.sort_by_key(|instance| instance.sequence);
        }
        let mut arguments = Vec::with_capacity(frame.instances.len());
        for instance in &frame.instances {
            let reference = instance.reference.as_deref().map(str::trim).unwrap_or("");
            if reference.is_empty() {
                if !warnings.contains(&FibexWarning::FramePduRefIdMissing) {
                    warnings.push(FibexWarning::FramePduRefIdMissing);
                }
                continue;
            }
            match self.pdus.get(reference) {
                Some(pdu) => arguments.push(Arc::clone(pdu)),
                None => {
                    if !warnings.contains(&FibexWarning::FramePduRefIdUnknown) {
                        warnings.push(FibexWarning::FramePduRefIdUnknown);
                    }
                }
            }
        }

        let discarded = warnings.iter().any(|warning| warning.is_discarded());
        for warning in warnings {
            self.warn_frame(warning, &frame, id.unwrap_or(0));
        }
        let id = match id {
            Some(id) if !discarded => id,
            _ => return,
        };

        let frame_entry = Frame {
            id,
            application_id: frame.application_id.clone(),
            context_id: frame.context_id.clone(),
            ecu_id: self.ecu_id.clone(),
            message_type,
            arguments,
        };
        let added = self.frames.try_add_frame(
            id,
            frame.application_id.as_deref(),
            frame.context_id.as_deref(),
            self.ecu_id.as_deref(),
            Arc::new(frame_entry),
        );
        if added {
            log::debug!("FIBEX frame ID_{} added", id);
            self.added += 1;
        } else {
            self.warn_frame(FibexWarning::DuplicateEntry, &frame, id);
        }
    }

    fn warn(&mut self, warning: FibexWarning, location: Location) {
        let mut event = FibexLoadEvent::new(warning, location.position, location.line);
        event.ecu_id = self.ecu_id.clone();
        self.events.push(event);
    }

    fn warn_frame(&mut self, warning: FibexWarning, frame: &FrameState, id: u32) {
        let location = frame.location;
        let mut event = FibexLoadEvent::new(warning, location.position, location.line);
        event.message_id = id;
        event.application_id = frame.application_id.clone();
        event.context_id = frame.context_id.clone();
        event.ecu_id = self.ecu_id.clone();
        self.events.push(event);
    }
}
