//! VCF parsing and somatic mutation filtering

use crate::{
    utils::{open_reader, tsv_reader, tsv_writer},
    CnvGenoError, CnvGenoResult, ControlSample, Depth, FilterConfig, FilteredMutationRow,
};
use std::io::BufRead;
use std::path::Path;

/// Fixed VCF columns preceding the per-sample fields
const FIXED_COLUMNS: usize = 9;

/// Sample identifiers declared on the `#CHROM` header line
#[derive(Debug, Clone)]
pub struct VcfHeader {
    pub samples: Vec<String>,
}

impl VcfHeader {
    /// Sample identifiers are everything after the `FORMAT` token
    pub fn from_line(header_line: &str) -> CnvGenoResult<Self> {
        let format_end = header_line
            .rfind("FORMAT")
            .map(|idx| idx + "FORMAT".len())
            .ok_or_else(|| {
                CnvGenoError::InvalidHeader("FORMAT column not found in VCF header".to_string())
            })?;

        let samples: Vec<String> = header_line[format_end..]
            .trim()
            .split('\t')
            .filter(|s| !s.is_empty())
            .map(|s| s.to_string())
            .collect();

        if samples.is_empty() {
            return Err(CnvGenoError::InvalidHeader(
                "VCF header declares no samples".to_string(),
            ));
        }

        Ok(VcfHeader { samples })
    }

    /// Resolve the control designation into sample column indices
    pub fn control_indices(&self, control: &ControlSample) -> CnvGenoResult<Vec<usize>> {
        match control {
            ControlSample::None => Ok(Vec::new()),
            ControlSample::Index(idx) => {
                if *idx >= self.samples.len() {
                    return Err(CnvGenoError::InvalidConfig(format!(
                        "control sample index {} out of range ({} samples)",
                        idx,
                        self.samples.len()
                    )));
                }
                Ok(vec![*idx])
            }
            ControlSample::Suffix(suffix) => {
                let indices: Vec<usize> = self
                    .samples
                    .iter()
                    .enumerate()
                    .filter(|(_, name)| name.ends_with(suffix.as_str()))
                    .map(|(idx, _)| idx)
                    .collect();
                if indices.is_empty() {
                    return Err(CnvGenoError::InvalidConfig(format!(
                        "no sample name ends with control suffix {:?}",
                        suffix
                    )));
                }
                Ok(indices)
            }
        }
    }
}

/// One raw VCF data line
#[derive(Debug, Clone)]
pub struct VariantCall {
    pub chrom: String,
    pub pos: u64,
    pub ref_allele: String,
    pub alt_allele: String,
    /// `None` when QUAL is `.`
    pub quality: Option<f64>,
    pub samples: Vec<String>,
}

impl VariantCall {
    pub fn from_line(line: &str) -> CnvGenoResult<Self> {
        let fields: Vec<&str> = line.split('\t').collect();

        if fields.len() < FIXED_COLUMNS {
            return Err(CnvGenoError::InvalidVariant(format!(
                "Invalid VCF line format - not enough columns: {}",
                line
            )));
        }

        let chrom = fields[0].to_string();
        let pos = fields[1]
            .parse::<u64>()
            .map_err(|_| CnvGenoError::InvalidVariant(format!("Invalid position: {}", fields[1])))?;
        let ref_allele = fields[3].to_string();
        let alt_allele = fields[4].to_string();
        let quality = match fields[5] {
            "." => None,
            qual => Some(qual.parse::<f64>().map_err(|_| {
                CnvGenoError::InvalidVariant(format!("Invalid quality: {}", qual))
            })?),
        };
        let samples = fields[FIXED_COLUMNS..].iter().map(|s| s.to_string()).collect();

        Ok(VariantCall {
            chrom,
            pos,
            ref_allele,
            alt_allele,
            quality,
            samples,
        })
    }

    /// Quality above the limit and both alleles short enough to genotype
    pub fn passes_quality(&self, config: &FilterConfig) -> bool {
        let quality_ok = self.quality.is_some_and(|q| q > config.quality_limit);
        quality_ok
            && self.ref_allele.len() <= config.allele_length_limit
            && self.alt_allele.len() <= config.allele_length_limit
    }
}

/// Parsed `GT:AD:DP` sample field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleGenotypeCall {
    pub genotype: String,
    pub allele_depths: Vec<Depth>,
    pub depth: Depth,
}

impl SampleGenotypeCall {
    pub fn parse(field: &str) -> CnvGenoResult<Self> {
        let mut parts = field.split(':');

        let genotype = parts
            .next()
            .filter(|gt| !gt.is_empty())
            .ok_or_else(|| CnvGenoError::InvalidVariant(format!("Missing genotype: {:?}", field)))?
            .to_string();

        // Empty AD values count as missing so a truncated field stays a short AD
        let allele_depths = match parts.next() {
            Some(ad) if !ad.is_empty() => ad
                .split(',')
                .map(|value| {
                    if value.is_empty() {
                        Ok(Depth::MISSING)
                    } else {
                        Depth::parse(value)
                    }
                })
                .collect::<CnvGenoResult<Vec<_>>>()?,
            _ => Vec::new(),
        };

        let depth = match parts.next() {
            Some(dp) => Depth::parse(dp)?,
            None => Depth::MISSING,
        };

        Ok(SampleGenotypeCall {
            genotype,
            allele_depths,
            depth,
        })
    }

    pub fn ref_depth(&self) -> Depth {
        self.allele_depths.first().copied().unwrap_or(Depth::MISSING)
    }

    /// `None` when the AD field carries fewer than two values
    pub fn alt_depth(&self) -> Option<Depth> {
        self.allele_depths.get(1).copied()
    }

    pub fn is_hom_ref(&self) -> bool {
        self.genotype == "0/0"
    }

    pub fn has_mutation(&self) -> bool {
        if self.is_hom_ref() {
            return false;
        }
        match self.alt_depth() {
            Some(alt) if alt.is_missing() => {
                log::debug!("Missing alternative allele depth, treating sample as not mutated");
                false
            }
            Some(alt) => alt > Depth(0),
            None => {
                log::debug!(
                    "Short allele depth field {:?}, treating sample as not mutated",
                    self.allele_depths
                );
                false
            }
        }
    }
}

/// Counters collected while filtering a VCF
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterStats {
    pub lines_read: usize,
    pub lines_passing_quality: usize,
    pub lines_control_rejected: usize,
    pub rows_emitted: usize,
    pub rows_excluded_chrom: usize,
}

impl FilterStats {
    pub fn log_summary(&self) {
        log::info!("Variant filter summary:");
        log::info!("  Data lines read: {}", self.lines_read);
        log::info!("  Passing quality/length limits: {}", self.lines_passing_quality);
        log::info!("  Rejected by control sample: {}", self.lines_control_rejected);
        log::info!("  Mutation rows emitted: {}", self.rows_emitted);
        log::info!("  Rows dropped on excluded chromosomes: {}", self.rows_excluded_chrom);
    }
}

/// Streaming somatic mutation filter over VCF lines
pub struct VariantFilter<'a> {
    config: &'a FilterConfig,
    control: &'a ControlSample,
    header: Option<VcfHeader>,
    control_indices: Vec<usize>,
    stats: FilterStats,
}

impl<'a> VariantFilter<'a> {
    pub fn new(config: &'a FilterConfig, control: &'a ControlSample) -> Self {
        Self {
            config,
            control,
            header: None,
            control_indices: Vec::new(),
            stats: FilterStats::default(),
        }
    }

    pub fn stats(&self) -> &FilterStats {
        &self.stats
    }

    /// Feed one line of the VCF, appending any emitted rows to `rows`
    pub fn process_line(
        &mut self,
        line: &str,
        rows: &mut Vec<FilteredMutationRow>,
    ) -> CnvGenoResult<()> {
        let line = line.trim_end_matches(['\n', '\r']);
        if line.is_empty() || line.starts_with("##") {
            return Ok(());
        }

        if line.starts_with('#') {
            let header = VcfHeader::from_line(line)?;
            self.control_indices = header.control_indices(self.control)?;
            log::info!(
                "VCF declares {} samples, {} designated as control",
                header.samples.len(),
                self.control_indices.len()
            );
            self.header = Some(header);
            return Ok(());
        }

        let header = self.header.as_ref().ok_or_else(|| {
            CnvGenoError::InvalidHeader("VCF data line found before #CHROM header".to_string())
        })?;

        self.stats.lines_read += 1;
        let call = VariantCall::from_line(line)?;
        if !call.passes_quality(self.config) {
            return Ok(());
        }
        self.stats.lines_passing_quality += 1;

        if call.samples.len() != header.samples.len() {
            return Err(CnvGenoError::InvalidVariant(format!(
                "Expected {} sample columns at {}:{}, found {}",
                header.samples.len(),
                call.chrom,
                call.pos,
                call.samples.len()
            )));
        }

        let sample_calls = call
            .samples
            .iter()
            .map(|s| SampleGenotypeCall::parse(s))
            .collect::<CnvGenoResult<Vec<_>>>()?;

        if !self
            .control_indices
            .iter()
            .all(|&idx| sample_calls[idx].is_hom_ref())
        {
            self.stats.lines_control_rejected += 1;
            return Ok(());
        }

        for (sample_id, sample) in header.samples.iter().zip(&sample_calls) {
            if !sample.has_mutation() {
                continue;
            }
            if self.config.is_excluded_chrom(&call.chrom) {
                self.stats.rows_excluded_chrom += 1;
                continue;
            }
            rows.push(FilteredMutationRow {
                sample_id: sample_id.clone(),
                chrom: call.chrom.clone(),
                position: call.pos,
                ref_allele: call.ref_allele.clone(),
                alt_allele: call.alt_allele.clone(),
                genotype: sample.genotype.clone(),
                depth: sample.depth,
                ref_counts: sample.ref_depth(),
                var_counts: sample.alt_depth().unwrap_or(Depth::MISSING),
                cn_n: self.config.germline_copy_number,
            });
            self.stats.rows_emitted += 1;
        }

        Ok(())
    }
}

/// Filter all somatic mutations out of a (possibly gzipped) VCF file
pub fn filter_variants<P: AsRef<Path>>(
    path: P,
    control: &ControlSample,
    config: &FilterConfig,
) -> CnvGenoResult<(Vec<FilteredMutationRow>, FilterStats)> {
    let reader = open_reader(&path)?;
    let mut filter = VariantFilter::new(config, control);
    let mut rows = Vec::new();

    for line in reader.lines() {
        filter.process_line(&line?, &mut rows)?;
    }

    if filter.header.is_none() {
        return Err(CnvGenoError::InvalidHeader(format!(
            "No #CHROM header line in {}",
            path.as_ref().display()
        )));
    }

    Ok((rows, filter.stats))
}

/// Write the filtered-mutation table
pub fn write_filtered_mutations<P: AsRef<Path>>(
    rows: &[FilteredMutationRow],
    output_path: P,
) -> CnvGenoResult<()> {
    let mut writer = tsv_writer(output_path)?;
    writer.write_record(FilteredMutationRow::HEADER)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

/// Read a filtered-mutation table back in file order
pub fn read_filtered_mutations<P: AsRef<Path>>(path: P) -> CnvGenoResult<Vec<FilteredMutationRow>> {
    let mut reader = tsv_reader(path)?;
    let mut rows = Vec::new();
    for result in reader.deserialize() {
        rows.push(result?);
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const HEADER: &str = "#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\tFORMAT\tP1.C\tP1.T1\tP1.T2";

    fn write_vcf(lines: &[&str]) -> NamedTempFile {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(temp_file, "##fileformat=VCFv4.2").unwrap();
        writeln!(temp_file, "{}", HEADER).unwrap();
        for line in lines {
            writeln!(temp_file, "{}", line).unwrap();
        }
        temp_file
    }

    fn run_filter(lines: &[&str], control: ControlSample) -> Vec<FilteredMutationRow> {
        let vcf = write_vcf(lines);
        let (rows, _) = filter_variants(vcf.path(), &control, &FilterConfig::default()).unwrap();
        rows
    }

    #[test]
    fn test_header_samples() {
        let header = VcfHeader::from_line(HEADER).unwrap();
        assert_eq!(header.samples, vec!["P1.C", "P1.T1", "P1.T2"]);

        assert!(VcfHeader::from_line("#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO").is_err());
    }

    #[test]
    fn test_control_indices() {
        let header = VcfHeader::from_line(HEADER).unwrap();
        assert!(header.control_indices(&ControlSample::None).unwrap().is_empty());
        assert_eq!(header.control_indices(&ControlSample::Index(0)).unwrap(), vec![0]);
        assert_eq!(
            header.control_indices(&ControlSample::Suffix("C".to_string())).unwrap(),
            vec![0]
        );
        assert!(header.control_indices(&ControlSample::Index(3)).is_err());
        assert!(header.control_indices(&ControlSample::Suffix("N".to_string())).is_err());
    }

    #[test]
    fn test_sample_genotype_parse() {
        let call = SampleGenotypeCall::parse("0/1:12,18:30:99").unwrap();
        assert_eq!(call.genotype, "0/1");
        assert_eq!(call.ref_depth(), Depth(12));
        assert_eq!(call.alt_depth(), Some(Depth(18)));
        assert_eq!(call.depth, Depth(30));
        assert!(call.has_mutation());

        let missing = SampleGenotypeCall::parse("./.:.,.:.").unwrap();
        assert_eq!(missing.ref_depth(), Depth::MISSING);
        assert_eq!(missing.alt_depth(), Some(Depth::MISSING));
        assert_eq!(missing.depth, Depth::MISSING);
        assert!(!missing.has_mutation());

        assert!(SampleGenotypeCall::parse("0/1:a,3:10").is_err());
    }

    #[test]
    fn test_short_allele_depth_is_not_mutated() {
        let call = SampleGenotypeCall::parse("0/1:.:12").unwrap();
        assert_eq!(call.alt_depth(), None);
        assert!(!call.has_mutation());

        let call = SampleGenotypeCall::parse("0/1").unwrap();
        assert!(!call.has_mutation());

        let call = SampleGenotypeCall::parse("0/1::20").unwrap();
        assert!(call.allele_depths.is_empty());
        assert_eq!(call.depth, Depth(20));
        assert!(!call.has_mutation());

        let call = SampleGenotypeCall::parse("0/1:12,:20").unwrap();
        assert_eq!(call.ref_depth(), Depth(12));
        assert_eq!(call.alt_depth(), Some(Depth::MISSING));
        assert!(!call.has_mutation());
    }

    #[test]
    fn test_empty_allele_depth_does_not_abort_filter() {
        let rows = run_filter(
            &["1\t1000\t.\tA\tT\t60\tPASS\t.\tGT:AD:DP\t0/0:20,0:20\t0/1::20\t0/1:5,5:10"],
            ControlSample::Index(0),
        );
        let samples: Vec<&str> = rows.iter().map(|r| r.sample_id.as_str()).collect();
        assert_eq!(samples, vec!["P1.T2"]);
    }

    #[test]
    fn test_hom_ref_never_mutated() {
        let call = SampleGenotypeCall::parse("0/0:10,5:15").unwrap();
        assert!(!call.has_mutation());
    }

    #[test]
    fn test_filter_emits_mutated_samples() {
        let rows = run_filter(
            &["1\t1000\t.\tA\tT\t60\tPASS\t.\tGT:AD:DP\t0/0:20,0:20\t0/1:12,8:20\t0/0:15,0:15"],
            ControlSample::Index(0),
        );

        assert_eq!(rows.len(), 1);
        let row = &rows[0];
        assert_eq!(row.sample_id, "P1.T1");
        assert_eq!(row.chrom, "1");
        assert_eq!(row.position, 1000);
        assert_eq!(row.ref_allele, "A");
        assert_eq!(row.alt_allele, "T");
        assert_eq!(row.genotype, "0/1");
        assert_eq!(row.depth, Depth(20));
        assert_eq!(row.ref_counts, Depth(12));
        assert_eq!(row.var_counts, Depth(8));
        assert_eq!(row.cn_n, 2);
    }

    #[test]
    fn test_low_quality_lines_dropped() {
        let rows = run_filter(
            &[
                "1\t1000\t.\tA\tT\t50\tPASS\t.\tGT:AD:DP\t0/0:20,0:20\t0/1:12,8:20\t0/1:5,5:10",
                "1\t1001\t.\tA\tT\t12.5\tPASS\t.\tGT:AD:DP\t0/0:20,0:20\t0/1:12,8:20\t0/1:5,5:10",
                "1\t1002\t.\tA\tT\t.\tPASS\t.\tGT:AD:DP\t0/0:20,0:20\t0/1:12,8:20\t0/1:5,5:10",
            ],
            ControlSample::None,
        );
        assert!(rows.is_empty());
    }

    #[test]
    fn test_long_alleles_dropped() {
        let rows = run_filter(
            &[
                "1\t1000\t.\tAAAAAAAAAAA\tT\t99\tPASS\t.\tGT:AD:DP\t0/0:20,0:20\t0/1:12,8:20\t0/0:5,0:5",
                "1\t2000\t.\tA\tTTTTTTTTTTT\t99\tPASS\t.\tGT:AD:DP\t0/0:20,0:20\t0/1:12,8:20\t0/0:5,0:5",
                "1\t3000\t.\tAAAAAAAAAA\tT\t99\tPASS\t.\tGT:AD:DP\t0/0:20,0:20\t0/1:12,8:20\t0/0:5,0:5",
            ],
            ControlSample::Index(0),
        );
        // Only the ten-base reference allele stays within the limit
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].position, 3000);
    }

    #[test]
    fn test_mutated_control_rejects_line() {
        let vcf = write_vcf(&[
            "1\t1000\t.\tA\tT\t99\tPASS\t.\tGT:AD:DP\t0/1:15,5:20\t0/1:12,8:20\t1/1:0,9:9",
            "1\t1100\t.\tA\tT\t99\tPASS\t.\tGT:AD:DP\t./.:.,.:.\t0/1:12,8:20\t1/1:0,9:9",
        ]);
        let (rows, stats) =
            filter_variants(vcf.path(), &ControlSample::Index(0), &FilterConfig::default()).unwrap();
        assert!(rows.is_empty());
        assert_eq!(stats.lines_control_rejected, 2);
    }

    #[test]
    fn test_control_by_suffix() {
        let rows = run_filter(
            &["2\t500\t.\tG\tC\t99\tPASS\t.\tGT:AD:DP\t0/0:30,0:30\t0/1:10,10:20\t1/1:0,9:9"],
            ControlSample::Suffix("C".to_string()),
        );
        let samples: Vec<&str> = rows.iter().map(|r| r.sample_id.as_str()).collect();
        assert_eq!(samples, vec!["P1.T1", "P1.T2"]);
    }

    #[test]
    fn test_without_control_all_samples_evaluated() {
        let rows = run_filter(
            &["2\t500\t.\tG\tC\t99\tPASS\t.\tGT:AD:DP\t0/1:30,2:32\t0/1:10,0:10\t1/1:0,9:9"],
            ControlSample::None,
        );
        let samples: Vec<&str> = rows.iter().map(|r| r.sample_id.as_str()).collect();
        assert_eq!(samples, vec!["P1.C", "P1.T2"]);
    }

    #[test]
    fn test_sex_chromosomes_dropped() {
        let vcf = write_vcf(&[
            "X\t1000\t.\tA\tT\t99\tPASS\t.\tGT:AD:DP\t0/0:20,0:20\t0/1:12,8:20\t0/0:5,0:5",
            "chrY\t1000\t.\tA\tT\t99\tPASS\t.\tGT:AD:DP\t0/0:20,0:20\t0/1:12,8:20\t0/0:5,0:5",
            "3\t1000\t.\tA\tT\t99\tPASS\t.\tGT:AD:DP\t0/0:20,0:20\t0/1:12,8:20\t0/0:5,0:5",
        ]);
        let (rows, stats) =
            filter_variants(vcf.path(), &ControlSample::Index(0), &FilterConfig::default()).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].chrom, "3");
        assert_eq!(stats.rows_excluded_chrom, 2);
        assert!(rows.iter().all(|r| r.chrom != "X" && r.chrom != "Y"));
    }

    #[test]
    fn test_thresholds_can_be_overridden() {
        let vcf = write_vcf(&["1\t1000\t.\tA\tT\t20\tPASS\t.\tGT:AD:DP\t0/0:20,0:20\t0/1:12,8:20\t0/0:5,0:5"]);
        let config = FilterConfig {
            quality_limit: 10.0,
            ..FilterConfig::default()
        };
        let (rows, _) = filter_variants(vcf.path(), &ControlSample::Index(0), &config).unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[test]
    fn test_malformed_lines_are_fatal() {
        let vcf = write_vcf(&["1\tabc\t.\tA\tT\t99\tPASS\t.\tGT:AD:DP\t0/0:20,0:20\t0/1:12,8:20\t0/0:5,0:5"]);
        assert!(filter_variants(vcf.path(), &ControlSample::None, &FilterConfig::default()).is_err());

        let vcf = write_vcf(&["1\t100\t.\tA\tT\t99\tPASS\t.\tGT:AD:DP\t0/0:20,0:20"]);
        assert!(filter_variants(vcf.path(), &ControlSample::None, &FilterConfig::default()).is_err());

        let vcf = write_vcf(&["1\t100\t.\tA\tT\t99\tPASS\t.\tGT:AD:DP\t0/0:20,0:20\t0/1:x,8:20\t0/0:5,0:5"]);
        assert!(filter_variants(vcf.path(), &ControlSample::None, &FilterConfig::default()).is_err());
    }

    #[test]
    fn test_missing_header_is_fatal() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(temp_file, "1\t1000\t.\tA\tT\t99\tPASS\t.\tGT:AD:DP\t0/1:12,8:20").unwrap();
        assert!(matches!(
            filter_variants(temp_file.path(), &ControlSample::None, &FilterConfig::default()),
            Err(CnvGenoError::InvalidHeader(_))
        ));
    }

    #[test]
    fn test_filtered_table_round_trip() {
        let rows = run_filter(
            &["1\t1000\t.\tA\tT\t60\tPASS\t.\tGT:AD:DP\t0/0:20,0:20\t0/1:12,8:.\t0/1:.,4:9"],
            ControlSample::Index(0),
        );
        assert_eq!(rows.len(), 2);

        let output = NamedTempFile::new().unwrap();
        write_filtered_mutations(&rows, output.path()).unwrap();

        let content = std::fs::read_to_string(output.path()).unwrap();
        let mut lines = content.lines();
        assert_eq!(
            lines.next(),
            Some("sample\tchrom\tposition\tref\talt\tgt\tdp\tref_counts\tvar_counts\tcn_n")
        );
        assert_eq!(lines.next(), Some("P1.T1\t1\t1000\tA\tT\t0/1\t-1\t12\t8\t2"));
        assert_eq!(lines.next(), Some("P1.T2\t1\t1000\tA\tT\t0/1\t9\t-1\t4\t2"));

        assert_eq!(read_filtered_mutations(output.path()).unwrap(), rows);
    }

    #[test]
    fn test_empty_table_keeps_header() {
        let output = NamedTempFile::new().unwrap();
        write_filtered_mutations(&[], output.path()).unwrap();
        let content = std::fs::read_to_string(output.path()).unwrap();
        assert_eq!(content.lines().count(), 1);
        assert!(read_filtered_mutations(output.path()).unwrap().is_empty());
    }
}
