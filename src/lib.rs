//! # cnvgeno - Copy-number aware genotype hypotheses
//!
//! A Rust tool for turning raw variant calls into allele-level genotype
//! hypotheses annotated with copy-number events, ready for clonal-evolution
//! clustering.

pub mod events;
pub mod genotype;
pub mod overlay;
pub mod pipeline;
pub mod pyclone;
pub mod utils;
pub mod vcf;

use serde::{Deserialize, Serialize};
use std::fmt;

/// A read count as reported in a VCF sample field.
///
/// Missing values (`.`) are kept as the explicit sentinel `-1` so they still
/// order below every observed count when alleles are compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Depth(pub i64);

impl Depth {
    pub const MISSING: Depth = Depth(-1);

    pub fn parse(value: &str) -> CnvGenoResult<Self> {
        let value = value.trim();
        if value == "." {
            return Ok(Self::MISSING);
        }
        value
            .parse::<i64>()
            .map(Depth)
            .map_err(|_| CnvGenoError::InvalidVariant(format!("Invalid depth value: {:?}", value)))
    }

    pub fn is_missing(&self) -> bool {
        *self == Self::MISSING
    }
}

impl fmt::Display for Depth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Strip an optional `chr` prefix so `chr7` and `7` name the same chromosome
pub fn normalize_chrom(chrom: &str) -> &str {
    chrom.strip_prefix("chr").unwrap_or(chrom)
}

/// One sample carrying a somatic variant that passed the variant filter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilteredMutationRow {
    #[serde(rename = "sample")]
    pub sample_id: String,
    pub chrom: String,
    pub position: u64,
    #[serde(rename = "ref")]
    pub ref_allele: String,
    #[serde(rename = "alt")]
    pub alt_allele: String,
    #[serde(rename = "gt")]
    pub genotype: String,
    #[serde(rename = "dp")]
    pub depth: Depth,
    pub ref_counts: Depth,
    pub var_counts: Depth,
    pub cn_n: u32,
}

impl FilteredMutationRow {
    pub const HEADER: [&'static str; 10] = [
        "sample", "chrom", "position", "ref", "alt", "gt", "dp", "ref_counts", "var_counts", "cn_n",
    ];

    /// Column values in table order
    pub fn to_fields(&self) -> Vec<String> {
        vec![
            self.sample_id.clone(),
            self.chrom.clone(),
            self.position.to_string(),
            self.ref_allele.clone(),
            self.alt_allele.clone(),
            self.genotype.clone(),
            self.depth.to_string(),
            self.ref_counts.to_string(),
            self.var_counts.to_string(),
            self.cn_n.to_string(),
        ]
    }
}

/// A filtered mutation overlapping one copy-number event of its tumor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnotatedMutationRow {
    pub mutation: FilteredMutationRow,
    pub event_code: u32,
    pub event: String,
}

impl AnnotatedMutationRow {
    pub const HEADER: [&'static str; 12] = [
        "sample", "chrom", "position", "ref", "alt", "gt", "dp", "ref_counts", "var_counts", "cn_n",
        "cn_v", "event",
    ];

    pub fn new(mutation: FilteredMutationRow, event_code: u32, event: String) -> Self {
        Self {
            mutation,
            event_code,
            event,
        }
    }

    pub fn to_fields(&self) -> Vec<String> {
        let mut fields = self.mutation.to_fields();
        fields.push(self.event_code.to_string());
        fields.push(self.event.clone());
        fields
    }
}

/// Which sample columns hold the matched normal used to reject germline calls
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ControlSample {
    /// Every line is evaluated without a control gate
    #[default]
    None,
    /// 0-based index into the sample columns
    Index(usize),
    /// Every sample whose identifier ends with this suffix
    Suffix(String),
}

/// Thresholds applied by the variant filter
#[derive(Debug, Clone)]
pub struct FilterConfig {
    pub quality_limit: f64,
    pub allele_length_limit: usize,
    pub germline_copy_number: u32,
    pub excluded_chromosomes: Vec<String>,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            quality_limit: 50.0,
            allele_length_limit: 10,
            germline_copy_number: 2,
            excluded_chromosomes: vec!["X".to_string(), "Y".to_string()],
        }
    }
}

impl FilterConfig {
    pub fn is_excluded_chrom(&self, chrom: &str) -> bool {
        let chrom = normalize_chrom(chrom);
        self.excluded_chromosomes.iter().any(|c| c == chrom)
    }
}

/// Numeric codes for the copy-number event labels that can be genotyped
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventCodes {
    codes: Vec<(String, u32)>,
}

impl EventCodes {
    pub fn new(codes: Vec<(String, u32)>) -> Self {
        Self { codes }
    }

    /// Look up the code for an event label, `None` if the label is not mapped
    pub fn get(&self, label: &str) -> Option<u32> {
        self.codes
            .iter()
            .find(|(known, _)| known == label)
            .map(|(_, code)| *code)
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }
}

impl Default for EventCodes {
    fn default() -> Self {
        Self::new(vec![
            ("Homozygous Copy Loss".to_string(), 0),
            ("CN Loss".to_string(), 1),
            ("CN Gain".to_string(), 3),
            ("High Copy Gain".to_string(), 4),
        ])
    }
}

/// Rules for matching mutations against copy-number events
#[derive(Debug, Clone)]
pub struct MatchConfig {
    pub event_codes: EventCodes,
    pub disregarded_event: String,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            event_codes: EventCodes::default(),
            disregarded_event: "Allelic Imbalance".to_string(),
        }
    }
}

/// Configuration for a full pipeline run
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub filter: FilterConfig,
    pub matching: MatchConfig,
    /// Suffix stripped from segmentation file names to get the tumor identifier
    pub event_file_suffix: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            filter: FilterConfig::default(),
            matching: MatchConfig::default(),
            event_file_suffix: ".txt".to_string(),
        }
    }
}

/// Validate pipeline configuration parameters
pub fn validate_config(config: &PipelineConfig) -> CnvGenoResult<()> {
    let filter = &config.filter;
    if !filter.quality_limit.is_finite() || filter.quality_limit < 0.0 {
        return Err(CnvGenoError::InvalidConfig(
            "quality limit must be a non-negative number".to_string(),
        ));
    }

    if filter.allele_length_limit == 0 {
        return Err(CnvGenoError::InvalidConfig(
            "allele length limit must be at least 1".to_string(),
        ));
    }

    if filter.germline_copy_number == 0 {
        return Err(CnvGenoError::InvalidConfig(
            "germline copy number must be at least 1".to_string(),
        ));
    }

    let matching = &config.matching;
    if matching.event_codes.is_empty() {
        return Err(CnvGenoError::InvalidConfig(
            "at least one event code is required".to_string(),
        ));
    }

    if matching.event_codes.get(&matching.disregarded_event).is_some() {
        return Err(CnvGenoError::InvalidConfig(format!(
            "disregarded event {:?} must not carry an event code",
            matching.disregarded_event
        )));
    }

    if config.event_file_suffix.is_empty() {
        return Err(CnvGenoError::InvalidConfig(
            "event file suffix must not be empty".to_string(),
        ));
    }

    Ok(())
}

/// Error types for the cnvgeno library
#[derive(Debug, thiserror::Error)]
pub enum CnvGenoError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),

    #[error("Invalid variant format: {0}")]
    InvalidVariant(String),

    #[error("Invalid header: {0}")]
    InvalidHeader(String),

    #[error("Invalid copy-number event: {0}")]
    InvalidEvent(String),

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type CnvGenoResult<T> = Result<T, CnvGenoError>;
