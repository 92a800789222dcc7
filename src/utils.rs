//! Utility functions for file handling and common operations

use crate::{CnvGenoError, CnvGenoResult};
use flate2::read::MultiGzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Read, Write};
use std::path::Path;

/// Check if a file is gzip compressed
pub fn is_gzipped<P: AsRef<Path>>(path: P) -> CnvGenoResult<bool> {
    let mut file = File::open(path)?;
    let mut buffer = [0; 2];

    match file.read_exact(&mut buffer) {
        Ok(()) => Ok(buffer == [0x1f, 0x8b]),
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => Ok(false),
        Err(e) => Err(CnvGenoError::Io(e)),
    }
}

/// Validate file paths and check if they exist
pub fn validate_file_exists<P: AsRef<Path>>(path: P) -> CnvGenoResult<()> {
    if !path.as_ref().exists() {
        return Err(CnvGenoError::FileNotFound(
            path.as_ref().to_string_lossy().to_string(),
        ));
    }
    Ok(())
}

/// Validate that a file is readable
pub fn validate_file_readable<P: AsRef<Path>>(path: P) -> CnvGenoResult<()> {
    validate_file_exists(&path)?;

    File::open(&path)
        .map_err(|_| CnvGenoError::FileNotFound(path.as_ref().to_string_lossy().to_string()))?;

    Ok(())
}

/// Validate that a path exists and is a directory
pub fn validate_dir_exists<P: AsRef<Path>>(path: P) -> CnvGenoResult<()> {
    if !path.as_ref().is_dir() {
        return Err(CnvGenoError::FileNotFound(format!(
            "{} (expected a directory)",
            path.as_ref().to_string_lossy()
        )));
    }
    Ok(())
}

/// Check if a path has a specific extension
pub fn has_extension<P: AsRef<Path>>(path: P, extension: &str) -> bool {
    path.as_ref()
        .extension()
        .and_then(|s| s.to_str())
        .map(|s| s.eq_ignore_ascii_case(extension))
        .unwrap_or(false)
}

/// Create a directory and all of its parents if they don't exist
pub fn ensure_dir<P: AsRef<Path>>(path: P) -> CnvGenoResult<()> {
    std::fs::create_dir_all(path)?;
    Ok(())
}

/// Create parent directories if they don't exist
pub fn ensure_parent_dirs<P: AsRef<Path>>(path: P) -> CnvGenoResult<()> {
    if let Some(parent) = path.as_ref().parent() {
        std::fs::create_dir_all(parent)?;
    }
    Ok(())
}

/// Open a text file for reading, transparently decompressing gzip input
pub fn open_reader<P: AsRef<Path>>(path: P) -> CnvGenoResult<Box<dyn BufRead>> {
    let file = File::open(&path)
        .map_err(|_| CnvGenoError::FileNotFound(path.as_ref().to_string_lossy().to_string()))?;

    let reader: Box<dyn BufRead> = if is_gzipped(&path)? {
        let gz_decoder = MultiGzDecoder::new(file);
        Box::new(BufReader::new(gz_decoder))
    } else {
        Box::new(BufReader::new(file))
    };

    Ok(reader)
}

/// Create a file for writing, gzip compressed when the path ends in `.gz`
pub fn create_writer<P: AsRef<Path>>(path: P) -> CnvGenoResult<Box<dyn Write>> {
    ensure_parent_dirs(&path)?;
    let file = File::create(&path)?;

    let writer: Box<dyn Write> = if has_extension(&path, "gz") {
        Box::new(GzEncoder::new(BufWriter::new(file), Compression::default()))
    } else {
        Box::new(BufWriter::new(file))
    };

    Ok(writer)
}

/// Tab-delimited table writer. Headers are written explicitly by the caller so
/// that empty tables still carry their header line. Fields are never quoted,
/// matching `tsv_reader`.
pub fn tsv_writer<P: AsRef<Path>>(path: P) -> CnvGenoResult<csv::Writer<Box<dyn Write>>> {
    let writer = create_writer(path)?;
    Ok(csv::WriterBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .quote_style(csv::QuoteStyle::Never)
        .from_writer(writer))
}

/// Tab-delimited table reader expecting a header line
pub fn tsv_reader<P: AsRef<Path>>(path: P) -> CnvGenoResult<csv::Reader<Box<dyn BufRead>>> {
    let reader = open_reader(path)?;
    Ok(csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .quoting(false)
        .from_reader(reader))
}

/// Initialize env_logger: `--debug` wins over `--verbose`, default is warn.
/// `RUST_LOG` still overrides both.
pub fn init_logging(verbose: bool, debug: bool) {
    let log_level = if debug {
        "debug"
    } else if verbose {
        "info"
    } else {
        "warn"
    };

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp_secs()
        .init();
}

/// Timer utility for measuring execution time
pub struct Timer {
    start: std::time::Instant,
    name: String,
}

impl Timer {
    pub fn new(name: &str) -> Self {
        log::info!("Starting timer: {}", name);
        Timer {
            start: std::time::Instant::now(),
            name: name.to_string(),
        }
    }

    pub fn elapsed(&self) -> std::time::Duration {
        self.start.elapsed()
    }

    pub fn log_elapsed(&self) {
        let duration = self.elapsed();
        log::info!("Timer '{}' elapsed: {:.2?}", self.name, duration);
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        self.log_elapsed();
    }
}
