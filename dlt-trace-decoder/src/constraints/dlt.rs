//! Predicates on the DLT header fields of a line
//!
//! These only match [`DltTraceLine`]s. Any other kind of line fails them.

use super::MatchConstraint;
use crate::line::{DltTraceLine, TraceLine};
use crate::types::{DltType, Timestamp};
use std::time::Duration;

fn dlt_line(line: &dyn TraceLine) -> Option<&DltTraceLine> {
    line.as_any().downcast_ref::<DltTraceLine>()
}

#[derive(Debug, Clone)]
pub struct DltEcuId {
    id: String,
}

impl DltEcuId {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

impl MatchConstraint for DltEcuId {
    fn check(&self, line: &dyn TraceLine) -> bool {
        dlt_line(line).and_then(|l| l.ecu_id.as_deref()) == Some(self.id.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct DltAppId {
    id: String,
}

impl DltAppId {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

impl MatchConstraint for DltAppId {
    fn check(&self, line: &dyn TraceLine) -> bool {
        dlt_line(line).and_then(|l| l.application_id.as_deref()) == Some(self.id.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct DltCtxId {
    id: String,
}

impl DltCtxId {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

impl MatchConstraint for DltCtxId {
    fn check(&self, line: &dyn TraceLine) -> bool {
        dlt_line(line).and_then(|l| l.context_id.as_deref()) == Some(self.id.as_str())
    }
}

/// The message type matches exactly
#[derive(Debug, Clone, Copy)]
pub struct DltMessageType {
    dlt_type: DltType,
}

impl DltMessageType {
    pub fn new(dlt_type: DltType) -> Self {
        Self { dlt_type }
    }
}

impl MatchConstraint for DltMessageType {
    fn check(&self, line: &dyn TraceLine) -> bool {
        dlt_line(line).map(|l| l.dlt_type) == Some(self.dlt_type)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct DltIsVerbose {
    is_verbose: bool,
}

impl DltIsVerbose {
    pub fn new(is_verbose: bool) -> Self {
        Self { is_verbose }
    }
}

impl MatchConstraint for DltIsVerbose {
    fn check(&self, line: &dyn TraceLine) -> bool {
        dlt_line(line).map(|l| l.is_verbose) == Some(self.is_verbose)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct DltSessionId {
    session_id: u32,
}

impl DltSessionId {
    pub fn new(session_id: u32) -> Self {
        Self { session_id }
    }
}

impl MatchConstraint for DltSessionId {
    fn check(&self, line: &dyn TraceLine) -> bool {
        dlt_line(line).and_then(|l| l.session_id) == Some(self.session_id)
    }
}

/// The device has been running for at least the given time
///
/// Lines without a device timestamp never match.
#[derive(Debug, Clone, Copy)]
pub struct Awake {
    uptime: Duration,
}

impl Awake {
    pub fn new(uptime: Duration) -> Self {
        Self { uptime }
    }

    pub fn from_millis(milliseconds: u64) -> Self {
        Self::new(Duration::from_millis(milliseconds))
    }
}

impl MatchConstraint for Awake {
    fn check(&self, line: &dyn TraceLine) -> bool {
        dlt_line(line)
            .and_then(|l| l.device_timestamp)
            .map(|uptime| uptime >= self.uptime)
            .unwrap_or(false)
    }
}

/// The line's timestamp is at or after a point in time
#[derive(Debug, Clone, Copy)]
pub struct DltNotBefore {
    time: Timestamp,
}

impl DltNotBefore {
    pub fn new(time: Timestamp) -> Self {
        Self { time }
    }
}

impl MatchConstraint for DltNotBefore {
    fn check(&self, line: &dyn TraceLine) -> bool {
        dlt_line(line)
            .and_then(|l| l.timestamp)
            .map(|ts| ts >= self.time)
            .unwrap_or(false)
    }
}

/// The line's timestamp is at or before a point in time
#[derive(Debug, Clone, Copy)]
pub struct DltNotAfter {
    time: Timestamp,
}

impl DltNotAfter {
    pub fn new(time: Timestamp) -> Self {
        Self { time }
    }
}

impl MatchConstraint for DltNotAfter {
    fn check(&self, line: &dyn TraceLine) -> bool {
        dlt_line(line)
            .and_then(|l| l.timestamp)
            .map(|ts| ts <= self.time)
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::line::DltLineBuilder;
    use chrono::TimeZone;
    use chrono::Utc;

    fn line() -> DltTraceLine {
        let mut builder = DltLineBuilder::new();
        builder
            .set_ecu_id("TCB")
            .set_application_id("APP1")
            .set_context_id("CON1")
            .set_session_id(42)
            .set_dlt_type(DltType::LogWarn)
            .set_device_timestamp(Duration::from_millis(1500))
            .set_timestamp(Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap());
        builder.build()
    }

    #[test]
    fn test_header_predicates() {
        let line = line();
        assert!(DltEcuId::new("TCB").check(&line));
        assert!(!DltEcuId::new("ECU1").check(&line));
        assert!(DltAppId::new("APP1").check(&line));
        assert!(DltCtxId::new("CON1").check(&line));
        assert!(!DltCtxId::new("con1").check(&line));
        assert!(DltMessageType::new(DltType::LogWarn).check(&line));
        assert!(!DltMessageType::new(DltType::Log).check(&line));
        assert!(DltIsVerbose::new(false).check(&line));
        assert!(DltSessionId::new(42).check(&line));
        assert!(!DltSessionId::new(0).check(&line));
    }

    #[test]
    fn test_awake() {
        let line = line();
        assert!(Awake::from_millis(1500).check(&line));
        assert!(!Awake::from_millis(1501).check(&line));

        let bare = DltLineBuilder::new().build();
        assert!(!Awake::from_millis(0).check(&bare));
    }

    #[test]
    fn test_time_window() {
        let line = line();
        let noon = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let later = Utc.with_ymd_and_hms(2024, 3, 1, 13, 0, 0).unwrap();
        assert!(DltNotBefore::new(noon).check(&line));
        assert!(!DltNotBefore::new(later).check(&line));
        assert!(DltNotAfter::new(later).check(&line));
        assert!(DltNotAfter::new(noon).check(&line));
    }
}
