//! OME-XML Planes - index and decode pixel planes of OME-XML files.
//!
//! This binary opens one container per invocation and runs a single command.

use clap::Parser;
use std::fs;
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use omexml_planes::{
    config::{Cli, Command, ExtractConfig, InfoConfig, OffsetsConfig, OutputFormat, ScanOptions},
    error::ServiceError,
    io::FileRangeReader,
    plane::{save_png, PlaneService},
    OmeXmlReader,
};

fn main() -> ExitCode {
    let cli = Cli::parse();

    match cli.into_command() {
        Command::Info(config) => run_info(config),
        Command::Offsets(config) => run_offsets(config),
        Command::Extract(config) => run_extract(config),
    }
}

/// Initialize the tracing/logging subsystem.
fn init_logging(verbose: bool) {
    let env_filter = if verbose {
        "omexml_planes=debug"
    } else {
        "omexml_planes=warn"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Validate options, then open and index the container.
fn open_service(
    file: &std::path::Path,
    scan: &ScanOptions,
    validation: Result<(), String>,
) -> Option<PlaneService<FileRangeReader, OmeXmlReader>> {
    init_logging(scan.verbose);

    if let Err(e) = validation {
        error!("Configuration error: {}", e);
        return None;
    }

    let source = match FileRangeReader::open(file) {
        Ok(source) => source,
        Err(e) => {
            error!("Cannot open {}: {}", file.display(), e);
            return None;
        }
    };

    match PlaneService::open(source, &scan.reader_options(), scan.cache_bytes) {
        Ok(service) => Some(service),
        Err(e) => {
            error!("Cannot index {}: {}", file.display(), e);
            None
        }
    }
}

// =============================================================================
// Info Command
// =============================================================================

fn run_info(config: InfoConfig) -> ExitCode {
    let service = match open_service(&config.file, &config.scan, config.validate()) {
        Some(service) => service,
        None => return ExitCode::FAILURE,
    };

    let summaries: Vec<_> = service.reader().all_series().map(|s| s.summary()).collect();

    if config.json {
        match serde_json::to_string_pretty(&summaries) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                error!("Cannot serialize series: {}", e);
                return ExitCode::FAILURE;
            }
        }
        return ExitCode::SUCCESS;
    }

    println!("{}", config.file.display());
    println!("Series: {}", summaries.len());
    println!();
    println!(
        "{:>6}  {:<13}  {:>20}  {:<7}  {:<5}  {:<11}  {:>15}  {:<10}",
        "series", "byte order", "X x Y x Z x C x T", "type", "order", "compression", "planes", "index pass"
    );
    for s in &summaries {
        let dims = format!(
            "{}x{}x{}x{}x{}",
            s.size_x, s.size_y, s.size_z, s.size_c, s.size_t
        );
        let planes = format!("{}/{}", s.discovered_planes, s.declared_planes);
        println!(
            "{:>6}  {:<13}  {:>20}  {:<7}  {:<5}  {:<11}  {:>15}  {:<10}",
            s.index,
            format!("{:?}", s.byte_order),
            dims,
            s.pixel_type,
            s.dimension_order,
            s.compression,
            planes,
            format!("{:?}", s.index_pass).to_lowercase()
        );
    }

    ExitCode::SUCCESS
}

// =============================================================================
// Offsets Command
// =============================================================================

fn run_offsets(config: OffsetsConfig) -> ExitCode {
    let service = match open_service(&config.file, &config.scan, config.validate()) {
        Some(service) => service,
        None => return ExitCode::FAILURE,
    };

    let table = match service.reader().plane_offsets(config.series) {
        Ok(table) => table,
        Err(e) => {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    println!("{:>6}  {:>14}  {:>14}", "plane", "offset", "length");
    for plane in 0..table.len() {
        if let Some((start, end)) = table.slice_bounds(plane) {
            println!("{:>6}  {:>14}  {:>14}", plane, start, end - start);
        }
    }
    if table.shortfall() > 0 {
        println!(
            "{} of {} declared planes not found",
            table.shortfall(),
            table.declared()
        );
    }

    ExitCode::SUCCESS
}

// =============================================================================
// Extract Command
// =============================================================================

fn run_extract(config: ExtractConfig) -> ExitCode {
    let service = match open_service(&config.file, &config.scan, config.validate()) {
        Some(service) => service,
        None => return ExitCode::FAILURE,
    };

    let planes: Vec<u32> = match (config.plane, config.all) {
        (Some(plane), _) => vec![plane],
        (None, _) => match service.reader().plane_count(config.series) {
            Ok(count) => (0..count).collect(),
            Err(e) => {
                error!("{}", e);
                return ExitCode::FAILURE;
            }
        },
    };

    if config.all {
        if let Err(e) = fs::create_dir_all(&config.output) {
            error!("Cannot create {}: {}", config.output.display(), e);
            return ExitCode::FAILURE;
        }
    }

    let mut failures = 0usize;
    for plane in planes {
        let path = config.output_path(plane);
        match extract_plane(&service, &config, plane, &path) {
            Ok(()) => info!(series = config.series, plane, path = %path.display(), "wrote plane"),
            Err(e) => {
                // A failing plane does not stop the remaining ones
                error!("Plane {}: {}", plane, e);
                failures += 1;
            }
        }
    }

    if failures > 0 {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

fn extract_plane(
    service: &PlaneService<FileRangeReader, OmeXmlReader>,
    config: &ExtractConfig,
    plane: u32,
    path: &std::path::Path,
) -> Result<(), ServiceError> {
    match config.format {
        OutputFormat::Raw => {
            let response = service.plane(config.series, plane)?;
            fs::write(path, &response.data).map_err(omexml_planes::IoError::from)?;
        }
        OutputFormat::Png => {
            let image = service.image(config.series, plane)?;
            save_png(&image, path)?;
        }
    }
    Ok(())
}
