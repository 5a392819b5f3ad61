//! Command-line configuration.
//!
//! This module provides the configuration for the `omexml-planes` binary:
//! - Command-line arguments via clap
//! - Environment variables with `OMEXML_` prefix
//! - Sensible defaults for all optional settings
//!
//! # Commands
//!
//! - `info <FILE> [--json]` - Series overview
//! - `offsets <FILE> --series N` - Plane offset table of one series
//! - `extract <FILE> --series N (--plane P | --all) --output PATH [--format raw|png]`
//!
//! # Environment Variables
//!
//! - `OMEXML_WINDOW_SIZE` - Scan window in bytes (default: 8192)
//! - `OMEXML_CACHE_BYTES` - Decoded plane cache in bytes (default: 64MB)
//! - `OMEXML_VERBOSE` - Enable debug logging
//! - `OMEXML_JSON` - `info` prints JSON
//! - `OMEXML_SERIES`, `OMEXML_PLANE`, `OMEXML_OUTPUT`, `OMEXML_FORMAT` - `extract`/`offsets` selections

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::format::{CodecSupport, ReaderOptions};
use crate::io::DEFAULT_WINDOW_SIZE;
use crate::plane::DEFAULT_PLANE_CACHE_CAPACITY;

// =============================================================================
// Default Values
// =============================================================================

/// Smallest accepted scan window.
pub const MIN_WINDOW_SIZE: usize = 64;

/// Largest accepted scan window (16MB).
pub const MAX_WINDOW_SIZE: usize = 16 * 1024 * 1024;

// =============================================================================
// CLI Arguments
// =============================================================================

/// OME-XML Planes - index and decode pixel planes of OME-XML files.
///
/// Locates every embedded plane of every series without parsing the
/// document, then decodes planes on demand.
#[derive(Parser, Debug, Clone)]
#[command(name = "omexml-planes")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    pub fn into_command(self) -> Command {
        self.command
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Print the series of a container.
    Info(InfoConfig),

    /// Print the plane offset table of one series.
    Offsets(OffsetsConfig),

    /// Decode planes to raw or PNG files.
    Extract(ExtractConfig),
}

/// Options shared by every command.
#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct ScanOptions {
    /// Scan window in bytes.
    #[arg(long, default_value_t = DEFAULT_WINDOW_SIZE, env = "OMEXML_WINDOW_SIZE")]
    pub window_size: usize,

    /// Capacity of the decoded plane cache in bytes.
    #[arg(long, default_value_t = DEFAULT_PLANE_CACHE_CAPACITY, env = "OMEXML_CACHE_BYTES")]
    pub cache_bytes: usize,

    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false, env = "OMEXML_VERBOSE")]
    pub verbose: bool,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            window_size: DEFAULT_WINDOW_SIZE,
            cache_bytes: DEFAULT_PLANE_CACHE_CAPACITY,
            verbose: false,
        }
    }
}

impl ScanOptions {
    /// Validate the options and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.window_size < MIN_WINDOW_SIZE || self.window_size > MAX_WINDOW_SIZE {
            return Err(format!(
                "window_size must be between {} bytes and 16MB",
                MIN_WINDOW_SIZE
            ));
        }

        if self.cache_bytes == 0 {
            return Err("cache_bytes must be greater than 0".to_string());
        }

        Ok(())
    }

    /// Reader settings for these options, with the codecs of this build.
    pub fn reader_options(&self) -> ReaderOptions {
        ReaderOptions {
            window_size: self.window_size,
            codecs: CodecSupport::detect(),
        }
    }
}

// =============================================================================
// Info Command
// =============================================================================

#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct InfoConfig {
    /// OME-XML file to inspect.
    pub file: PathBuf,

    /// Print JSON instead of a table.
    #[arg(long, default_value_t = false, env = "OMEXML_JSON")]
    pub json: bool,

    #[command(flatten)]
    pub scan: ScanOptions,
}

impl InfoConfig {
    pub fn validate(&self) -> Result<(), String> {
        self.scan.validate()
    }
}

// =============================================================================
// Offsets Command
// =============================================================================

#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct OffsetsConfig {
    /// OME-XML file to inspect.
    pub file: PathBuf,

    /// Series index (0-based).
    #[arg(short, long, default_value_t = 0, env = "OMEXML_SERIES")]
    pub series: usize,

    #[command(flatten)]
    pub scan: ScanOptions,
}

impl OffsetsConfig {
    pub fn validate(&self) -> Result<(), String> {
        self.scan.validate()
    }
}

// =============================================================================
// Extract Command
// =============================================================================

/// Output encoding of extracted planes.
#[derive(ValueEnum, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Decoded bytes as stored, in the series byte order
    #[default]
    Raw,
    /// Grayscale PNG
    Png,
}

impl OutputFormat {
    pub const fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Raw => "raw",
            OutputFormat::Png => "png",
        }
    }
}

#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct ExtractConfig {
    /// OME-XML file to read.
    pub file: PathBuf,

    /// Series index (0-based).
    #[arg(short, long, default_value_t = 0, env = "OMEXML_SERIES")]
    pub series: usize,

    /// Plane index (0-based).
    #[arg(short, long, env = "OMEXML_PLANE", conflicts_with = "all")]
    pub plane: Option<u32>,

    /// Extract every plane of the series into the output directory.
    #[arg(long, default_value_t = false)]
    pub all: bool,

    /// Output file, or output directory with `--all`.
    #[arg(short, long, env = "OMEXML_OUTPUT")]
    pub output: PathBuf,

    /// Output encoding.
    #[arg(long, value_enum, default_value_t = OutputFormat::Raw, env = "OMEXML_FORMAT")]
    pub format: OutputFormat,

    #[command(flatten)]
    pub scan: ScanOptions,
}

impl ExtractConfig {
    /// Validate the configuration and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        match (self.plane, self.all) {
            (Some(_), true) => return Err("--plane and --all are mutually exclusive".to_string()),
            (None, false) => return Err("Either --plane or --all is required".to_string()),
            _ => {}
        }

        if self.output.as_os_str().is_empty() {
            return Err("output path is required. Set --output or OMEXML_OUTPUT".to_string());
        }

        self.scan.validate()
    }

    /// Output path of one plane.
    ///
    /// With `--all` each plane gets its own file in the output directory.
    pub fn output_path(&self, plane: u32) -> PathBuf {
        if self.all {
            self.output.join(format!(
                "series{}_plane{}.{}",
                self.series,
                plane,
                self.format.extension()
            ))
        } else {
            self.output.clone()
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
