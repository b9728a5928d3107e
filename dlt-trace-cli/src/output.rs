//! Formatting of decoded lines

use crate::config::OutputFormat;
use anyhow::Result;
use dlt_trace_decoder::{DltTraceLine, TraceLine};
use serde::Serialize;
use std::path::Path;

const TIME_FORMAT: &str = "%Y/%m/%d %H:%M:%S%.6f";

/// One line as written in JSON output
#[derive(Debug, Serialize)]
pub struct LineRecord<'a> {
    pub file: &'a str,
    pub line: u64,
    pub position: u64,
    pub timestamp: Option<String>,
    /// Device uptime in seconds
    pub uptime: Option<f64>,
    pub count: u8,
    pub ecu_id: Option<&'a str>,
    pub app_id: Option<&'a str>,
    pub ctx_id: Option<&'a str>,
    pub session_id: Option<u32>,
    pub dlt_type: String,
    pub verbose: bool,
    pub message_id: Option<u32>,
    pub text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<&'a str>,
}

impl<'a> LineRecord<'a> {
    pub fn new(file: &'a str, line: &'a DltTraceLine) -> Self {
        Self {
            file,
            line: line.line,
            position: line.position,
            timestamp: line.timestamp.map(|ts| ts.format(TIME_FORMAT).to_string()),
            uptime: line.device_timestamp.map(|d| d.as_secs_f64()),
            count: line.count,
            ecu_id: line.ecu_id.as_deref(),
            app_id: line.application_id.as_deref(),
            ctx_id: line.context_id.as_deref(),
            session_id: line.session_id,
            dlt_type: line.dlt_type.to_string(),
            verbose: line.is_verbose,
            message_id: line.message_id,
            text: line.text(),
            error: line.error_message.as_deref(),
        }
    }
}

/// Render a line in the requested format
pub fn format_line(format: OutputFormat, file: &Path, line: &DltTraceLine) -> Result<String> {
    match format {
        OutputFormat::Json => {
            let file = file.to_string_lossy();
            Ok(serde_json::to_string(&LineRecord::new(&file, line))?)
        }
        OutputFormat::Text => Ok(format_text(line)),
    }
}

fn format_text(line: &DltTraceLine) -> String {
    let timestamp = line
        .timestamp
        .map(|ts| ts.format(TIME_FORMAT).to_string())
        .unwrap_or_else(|| "-".to_string());
    let uptime = line
        .device_timestamp
        .map(|d| format!("{:.4}", d.as_secs_f64()))
        .unwrap_or_else(|| "-".to_string());
    format!(
        "{} {} {} {:03} {} {} {} {} {} {}",
        line.line,
        timestamp,
        uptime,
        line.count,
        line.ecu_id.as_deref().unwrap_or("-"),
        line.application_id.as_deref().unwrap_or("-"),
        line.context_id.as_deref().unwrap_or("-"),
        line.dlt_type,
        if line.is_verbose { "V" } else { "N" },
        line.text()
    )
}
