//! Copy-number segmentation loading

use crate::{utils::open_reader, CnvGenoError, CnvGenoResult};
use regex::Regex;
use std::io::BufRead;
use std::path::{Path, PathBuf};

/// One copy-number segment of a tumor, covering the half-open range [start, stop)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyNumberEvent {
    pub tumor_id: String,
    pub chrom: String,
    pub start: u64,
    pub stop: u64,
    pub event: String,
}

impl CopyNumberEvent {
    /// Return true if pos falls inside the segment (stop is exclusive)
    pub fn contains(&self, pos: u64) -> bool {
        pos >= self.start && pos < self.stop
    }
}

/// Extracts `chr<chrom>:<start>-<stop>` regions and their event label from
/// segmentation lines
pub struct EventLineParser {
    region: Regex,
}

impl EventLineParser {
    pub fn new() -> CnvGenoResult<Self> {
        let region = Regex::new(r#"chr([^:\s"]+):([0-9,]+)-([0-9,]+)"#)?;
        Ok(Self { region })
    }

    /// Parse one line. Lines without a region token give `Ok(None)`; a region
    /// token without a usable label or coordinates is an error.
    pub fn parse_line(&self, line: &str, tumor_id: &str) -> CnvGenoResult<Option<CopyNumberEvent>> {
        let line = line.trim_end_matches(['\n', '\r']);
        let Some(caps) = self.region.captures(line) else {
            return Ok(None);
        };

        let chrom = caps[1].to_string();
        let start = parse_coordinate(&caps[2], line)?;
        let stop = parse_coordinate(&caps[3], line)?;
        if start > stop {
            return Err(CnvGenoError::InvalidEvent(format!(
                "segment start {} after stop {}: {}",
                start, stop, line
            )));
        }

        let region_end = caps.get(0).map(|m| m.end()).unwrap_or(line.len());
        let event = line[region_end..]
            .split('\t')
            .nth(1)
            .map(|label| label.trim().trim_matches('"').trim())
            .filter(|label| !label.is_empty())
            .ok_or_else(|| CnvGenoError::InvalidEvent(format!("missing event label: {}", line)))?;

        Ok(Some(CopyNumberEvent {
            tumor_id: tumor_id.to_string(),
            chrom,
            start,
            stop,
            event: event.to_string(),
        }))
    }
}

fn parse_coordinate(value: &str, line: &str) -> CnvGenoResult<u64> {
    value
        .replace(',', "")
        .parse::<u64>()
        .map_err(|_| CnvGenoError::InvalidEvent(format!("invalid coordinate {:?}: {}", value, line)))
}

/// All copy-number events of a cohort, loaded once and read-only afterwards
#[derive(Debug, Clone, Default)]
pub struct EventStore {
    pub events: Vec<CopyNumberEvent>,
    /// Tumor identifiers in file-encounter order
    pub tumor_ids: Vec<String>,
}

impl EventStore {
    /// Load every segmentation file in `dir` whose name ends with `suffix`
    pub fn load_dir<P: AsRef<Path>>(dir: P, suffix: &str) -> CnvGenoResult<Self> {
        let parser = EventLineParser::new()?;
        let mut store = EventStore::default();

        for (path, tumor_id) in event_files(dir.as_ref(), suffix)? {
            let loaded = store.load_file(&parser, &path, &tumor_id)?;
            log::info!("Loaded {} events for tumor {} from {:?}", loaded, tumor_id, path);
            store.tumor_ids.push(tumor_id);
        }

        Ok(store)
    }

    /// Append the events of one tumor's segmentation file, returning how many were added
    pub fn load_file(
        &mut self,
        parser: &EventLineParser,
        path: &Path,
        tumor_id: &str,
    ) -> CnvGenoResult<usize> {
        let reader = open_reader(path)?;
        let before = self.events.len();

        for (line_no, line) in reader.lines().enumerate() {
            let line = line?;
            match parser.parse_line(&line, tumor_id) {
                Ok(Some(event)) => self.events.push(event),
                Ok(None) => continue,
                Err(e) => {
                    log::warn!("Skipping {:?} line {}: {}", path, line_no + 1, e);
                }
            }
        }

        Ok(self.events.len() - before)
    }

    pub fn events_for<'a>(&'a self, tumor_id: &'a str) -> impl Iterator<Item = &'a CopyNumberEvent> + 'a {
        self.events.iter().filter(move |e| e.tumor_id == tumor_id)
    }
}

/// Segmentation files in `dir` paired with their tumor identifier, sorted by file name
pub fn event_files(dir: &Path, suffix: &str) -> CnvGenoResult<Vec<(PathBuf, String)>> {
    let mut entries = Vec::new();

    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        // Path::is_file follows symlinks
        if !entry.path().is_file() {
            continue;
        }
        let file_name = entry.file_name().to_string_lossy().to_string();
        match tumor_id_from_file_name(&file_name, suffix) {
            Some(tumor_id) => entries.push((entry.path(), tumor_id)),
            None => log::warn!(
                "Ignoring {:?}: file name does not end with {:?}",
                entry.path(),
                suffix
            ),
        }
    }

    entries.sort();
    Ok(entries)
}

/// Tumor identifier encoded in a segmentation file name
pub fn tumor_id_from_file_name(file_name: &str, suffix: &str) -> Option<String> {
    file_name
        .strip_suffix(suffix)
        .filter(|id| !id.is_empty())
        .map(|id| id.to_string())
}
