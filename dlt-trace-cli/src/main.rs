//! DLT Trace Reader CLI Application
//!
//! This is the command-line interface for the DLT trace decoder.
//! It uses the dlt-trace-decoder library and adds:
//! - TOML configuration merged with command line options
//! - Declarative filters turned into constraint expressions
//! - Parallel decoding of several input files
//! - Text and JSON line output

use anyhow::{Context, Result};
use clap::Parser;
use dlt_trace_decoder::{Constraint, Decoder, DecoderConfig, DltType, FibexFile, FrameMap};
use rayon::prelude::*;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

mod config;
mod filter;
mod output;

use config::{AppConfig, OutputFormat};

/// DLT Trace Reader - Decode and filter DLT trace files
#[derive(Parser, Debug)]
#[command(name = "dlt-trace-cli")]
#[command(about = "Decode and filter AUTOSAR DLT trace files", long_about = None)]
#[command(version)]
struct Args {
    /// DLT files to decode
    #[arg(value_name = "FILE")]
    files: Vec<PathBuf>,

    /// FIBEX file or directory for non-verbose messages (can be repeated)
    #[arg(long, value_name = "PATH")]
    fibex: Vec<PathBuf>,

    /// Path to configuration file (config.toml)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Output file for decoded lines (default: stdout)
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Output format
    #[arg(long, value_enum)]
    format: Option<OutputFormat>,

    /// Files have no storage header (raw packet stream)
    #[arg(long)]
    no_storage_header: bool,

    /// Key FIBEX frames by ECU id
    #[arg(long)]
    with_ecu_id: bool,

    /// Look up FIBEX frames by message id only
    #[arg(long)]
    without_ext_header: bool,

    /// Use the compiled constraint evaluator
    #[arg(long)]
    compiled: bool,

    /// Only lines from this ECU
    #[arg(long, value_name = "ID")]
    ecu: Option<String>,

    /// Only lines from this application
    #[arg(long, value_name = "ID")]
    app: Option<String>,

    /// Only lines from this context
    #[arg(long, value_name = "ID")]
    ctx: Option<String>,

    /// Only lines containing this text
    #[arg(long)]
    text: Option<String>,

    /// Only lines containing this text, ignoring case
    #[arg(long)]
    itext: Option<String>,

    /// Only lines matching this regular expression
    #[arg(long)]
    regex: Option<String>,

    /// Only lines matching this regular expression, ignoring case
    #[arg(long)]
    iregex: Option<String>,

    /// Only lines of this message type (e.g. LOG_WARN)
    #[arg(long = "type", value_name = "TYPE", value_parser = parse_dlt_type)]
    dlt_type: Option<DltType>,

    /// Only lines with this session id
    #[arg(long, value_name = "ID")]
    session: Option<u32>,

    /// Only lines logged at least this many milliseconds after startup
    #[arg(long, value_name = "MS")]
    awake_ms: Option<u64>,

    /// Negate the named filter field (can be repeated, e.g. --not app_id)
    #[arg(long, value_name = "FIELD")]
    not: Vec<String>,

    /// Maximum number of lines to print per file
    #[arg(long, value_name = "COUNT")]
    max_lines: Option<usize>,

    /// Verbosity level (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long)]
    quiet: bool,
}

fn parse_dlt_type(value: &str) -> std::result::Result<DltType, String> {
    use serde::de::IntoDeserializer;
    use serde::Deserialize;

    let upper = value.trim().to_uppercase();
    let name = upper.strip_prefix("DLT_").unwrap_or(&upper);
    let deserializer: serde::de::value::StrDeserializer<'_, serde::de::value::Error> =
        name.into_deserializer();
    DltType::deserialize(deserializer).map_err(|_| format!("unknown message type '{}'", value))
}

/// Counters for one input file
#[derive(Debug, Default)]
struct FileStats {
    lines: usize,
    matched: usize,
    errors: usize,
}

fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Initialize logging
    init_logging(args.verbose, args.quiet);

    log::info!("DLT Trace Reader CLI v{}", env!("CARGO_PKG_VERSION"));
    log::info!("Using decoder library v{}", dlt_trace_decoder::VERSION);

    let config = match &args.config {
        Some(path) => {
            log::info!("Loading configuration from: {:?}", path);
            config::load_config(path)?
        }
        None => AppConfig::default(),
    };
    let config = merge_args(config, &args);

    if config.input.files.is_empty() {
        println!("DLT Trace Reader - No input specified");
        println!("\nQuick Start:");
        println!("  dlt-trace-cli trace.dlt");
        println!("  dlt-trace-cli --fibex tcb.xml --app APP1 --type LOG_WARN trace.dlt");
        println!("\nFor advanced features:");
        println!("  dlt-trace-cli --config config.toml");
        println!("\nUse --help for more options");
        return Ok(());
    }

    run(&config)
}

/// Command line options take precedence over the configuration file
fn merge_args(mut config: AppConfig, args: &Args) -> AppConfig {
    config.input.files.extend(args.files.iter().cloned());
    config.decoder.fibex_paths.extend(args.fibex.iter().cloned());
    if args.no_storage_header {
        config.decoder.storage_header = false;
    }
    if args.with_ecu_id {
        config.decoder.fibex.with_ecu_id = true;
    }
    if args.without_ext_header {
        config.decoder.fibex.without_ext_header = true;
    }
    if args.compiled {
        config.decoder.constraint_options = dlt_trace_decoder::ConstraintOptions::Compiled;
    }

    if let Some(format) = args.format {
        config.output.format = format;
    }
    if args.output.is_some() {
        config.output.file = args.output.clone();
    }
    if args.max_lines.is_some() {
        config.output.max_lines = args.max_lines;
    }

    let filter = &mut config.filter;
    macro_rules! set {
        ($field:ident, $value:expr) => {
            if let Some(value) = $value {
                filter.$field = Some(value);
            }
        };
    }
    set!(ecu_id, args.ecu.clone());
    set!(app_id, args.app.clone());
    set!(ctx_id, args.ctx.clone());
    set!(text, args.text.clone());
    set!(itext, args.itext.clone());
    set!(regex, args.regex.clone());
    set!(iregex, args.iregex.clone());
    set!(dlt_type, args.dlt_type);
    set!(session_id, args.session);
    set!(awake_ms, args.awake_ms);
    filter.not.extend(args.not.iter().cloned());

    config
}

fn run(config: &AppConfig) -> Result<()> {
    let constraint = config
        .filter
        .to_constraint(config.decoder.constraint_options)
        .context("Invalid filter")?;
    log::debug!("Filter: {:?}", constraint);

    let frame_map = load_frame_map(&config.decoder)?;

    // Each file gets its own decoder; the frame map and filter are shared
    let results: Vec<(PathBuf, Result<(Vec<String>, FileStats)>)> = config
        .input
        .files
        .par_iter()
        .map(|path| {
            let result = decode_file(path, config, frame_map.clone(), &constraint);
            (path.clone(), result)
        })
        .collect();

    let mut writer: Box<dyn Write> = match &config.output.file {
        Some(path) => Box::new(BufWriter::new(
            File::create(path).with_context(|| format!("Failed to create output file: {:?}", path))?,
        )),
        None => Box::new(BufWriter::new(io::stdout().lock())),
    };

    let mut failed = 0;
    for (path, result) in results {
        match result {
            Ok((lines, stats)) => {
                for line in &lines {
                    writeln!(writer, "{}", line)?;
                }
                log::info!(
                    "{:?}: {} line(s), {} matched, {} with decode errors",
                    path,
                    stats.lines,
                    stats.matched,
                    stats.errors
                );
            }
            Err(e) => {
                failed += 1;
                log::error!("{:?}: {:#}", path, e);
            }
        }
    }
    writer.flush()?;

    if failed > 0 {
        anyhow::bail!("{} of {} file(s) failed", failed, config.input.files.len());
    }
    Ok(())
}

fn load_frame_map(config: &DecoderConfig) -> Result<Option<Arc<FrameMap>>> {
    if config.fibex_paths.is_empty() {
        return Ok(None);
    }

    let mut fibex = FibexFile::new(config.fibex);
    for path in &config.fibex_paths {
        fibex
            .load_path(path)
            .with_context(|| format!("Failed to load FIBEX: {:?}", path))?;
    }
    if fibex.warning_count() > 0 {
        log::warn!("FIBEX loaded with {} warning(s)", fibex.warning_count());
    }
    Ok(Some(Arc::new(fibex.into_frame_map())))
}

fn decode_file(
    path: &Path,
    config: &AppConfig,
    frame_map: Option<Arc<FrameMap>>,
    constraint: &Constraint,
) -> Result<(Vec<String>, FileStats)> {
    let mut decoder = Decoder::with_config(config.decoder.clone());
    if let Some(frame_map) = frame_map {
        decoder = decoder.with_frame_map(frame_map);
    }

    let mut stats = FileStats::default();
    let mut lines = Vec::new();
    let limit = config.output.max_lines.unwrap_or(usize::MAX);

    for line in decoder
        .decode_file(path)
        .with_context(|| format!("Failed to open DLT file: {:?}", path))?
    {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                // Framing errors end the file, but what was decoded is kept
                log::warn!("{:?}: {}", path, e);
                stats.errors += 1;
                break;
            }
        };
        stats.lines += 1;
        if line.error_message.is_some() {
            stats.errors += 1;
        }
        if !constraint.check(&line)? {
            continue;
        }
        stats.matched += 1;
        lines.push(output::format_line(config.output.format, path, &line)?);
        if stats.matched >= limit {
            log::debug!("{:?}: stopping after {} line(s)", path, limit);
            break;
        }
    }

    Ok((lines, stats))
}

/// Initialize logging based on verbosity level
fn init_logging(verbose: u8, quiet: bool) {
    use env_logger::Builder;
    use log::LevelFilter;

    let level = if quiet {
        LevelFilter::Error
    } else {
        match verbose {
            0 => LevelFilter::Info,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    };

    Builder::new()
        .filter_level(level)
        .format(|buf, record| {
            writeln!(
                buf,
                "[{} {}] {}",
                record.level(),
                record.target(),
                record.args()
            )
        })
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_dlt_type() {
        assert_eq!(parse_dlt_type("LOG_WARN"), Ok(DltType::LogWarn));
        assert_eq!(parse_dlt_type("dlt_log_warn"), Ok(DltType::LogWarn));
        assert_eq!(parse_dlt_type("nw_trace_someip"), Ok(DltType::NwTraceSomeip));
        assert!(parse_dlt_type("LOG_LOUD").is_err());
    }

    #[test]
    fn test_merge_args() {
        let args = Args::parse_from([
            "dlt-trace-cli",
            "--fibex",
            "tcb.xml",
            "--app",
            "APP1",
            "--not",
            "app_id",
            "--type",
            "log_info",
            "--format",
            "json",
            "--no-storage-header",
            "trace.dlt",
        ]);
        let mut base = AppConfig::default();
        base.filter.ctx_id = Some("CTX1".to_string());

        let config = merge_args(base, &args);
        assert_eq!(config.input.files, vec![PathBuf::from("trace.dlt")]);
        assert_eq!(config.decoder.fibex_paths, vec![PathBuf::from("tcb.xml")]);
        assert!(!config.decoder.storage_header);
        assert_eq!(config.output.format, OutputFormat::Json);
        assert_eq!(config.filter.app_id.as_deref(), Some("APP1"));
        assert_eq!(config.filter.ctx_id.as_deref(), Some("CTX1"));
        assert_eq!(config.filter.dlt_type, Some(DltType::LogInfo));
        assert_eq!(config.filter.not, vec!["app_id".to_string()]);
    }

    #[test]
    fn test_decode_file_applies_filter() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trace.dlt");

        // Two verbose packets without storage header, one string argument each
        let mut bytes = Vec::new();
        for (app, text) in [(b"APP1", b"hello\0"), (b"APP2", b"world\0")] {
            let mut payload = (0x200u32 | (1 << 15)).to_le_bytes().to_vec();
            payload.extend_from_slice(&6u16.to_le_bytes());
            payload.extend_from_slice(text);
            bytes.extend_from_slice(&[0x21, 0]);
            bytes.extend_from_slice(&((14 + payload.len()) as u16).to_be_bytes());
            bytes.extend_from_slice(&[0x41, 1]);
            bytes.extend_from_slice(app);
            bytes.extend_from_slice(b"CTX1");
            bytes.extend_from_slice(&payload);
        }
        std::fs::write(&path, bytes).unwrap();

        let mut config = AppConfig::default();
        config.decoder.storage_header = false;
        config.filter.app_id = Some("APP2".to_string());
        let constraint = config.filter.to_constraint(Default::default()).unwrap();

        let (lines, stats) = decode_file(&path, &config, None, &constraint).unwrap();
        assert_eq!(stats.lines, 2);
        assert_eq!(stats.matched, 1);
        assert_eq!(lines.len(), 1);
        assert!(lines[0].ends_with("APP2 CTX1 log info V world"), "{}", lines[0]);
    }
}
