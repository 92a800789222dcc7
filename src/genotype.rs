//! Genotype hypothesis enumeration from copy-number state

use crate::{utils::tsv_writer, AnnotatedMutationRow, CnvGenoResult, Depth};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// One candidate genotype for an annotated mutation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenotypeHypothesisRow {
    #[serde(rename = "ID")]
    pub sample_id: String,
    #[serde(rename = "CHROM")]
    pub chrom: String,
    #[serde(rename = "POS")]
    pub position: u64,
    #[serde(rename = "REF")]
    pub ref_allele: String,
    #[serde(rename = "ALT")]
    pub alt_allele: String,
    #[serde(rename = "AD_REF")]
    pub ref_depth: Depth,
    #[serde(rename = "AD_ALT")]
    pub alt_depth: Depth,
    #[serde(rename = "EVENT_CODE")]
    pub event_code: u32,
    #[serde(rename = "GENOTYPE")]
    pub genotype: String,
}

impl GenotypeHypothesisRow {
    pub const HEADER: [&'static str; 9] = [
        "ID", "CHROM", "POS", "REF", "ALT", "AD_REF", "AD_ALT", "EVENT_CODE", "GENOTYPE",
    ];
}

/// Order the two alleles by read support as (dominant, recessive).
///
/// The reference allele is dominant only with strictly more reads, so ties go
/// to the alternative allele.
pub fn dominant_alleles<'a>(
    ref_allele: &'a str,
    alt_allele: &'a str,
    ref_depth: Depth,
    alt_depth: Depth,
) -> (&'a str, &'a str) {
    if ref_depth > alt_depth {
        (ref_allele, alt_allele)
    } else {
        (alt_allele, ref_allele)
    }
}

/// Every composition of `copy_number` allele copies, dominant copies ascending.
///
/// A single-copy state yields only the dominant allele; copy number 0 yields a
/// single empty genotype.
pub fn enumerate_genotypes(dominant: &str, recessive: &str, copy_number: u32) -> Vec<String> {
    if copy_number == 1 {
        return vec![dominant.to_string()];
    }

    let n = copy_number as usize;
    (0..=n)
        .map(|i| {
            let mut genotype = dominant.repeat(i);
            genotype.push_str(&recessive.repeat(n - i));
            genotype
        })
        .collect()
}

/// Genotype hypotheses for one annotated mutation
pub fn generate_hypotheses(row: &AnnotatedMutationRow) -> Vec<GenotypeHypothesisRow> {
    let mutation = &row.mutation;
    let (dominant, recessive) = dominant_alleles(
        &mutation.ref_allele,
        &mutation.alt_allele,
        mutation.ref_counts,
        mutation.var_counts,
    );

    enumerate_genotypes(dominant, recessive, row.event_code)
        .into_iter()
        .map(|genotype| GenotypeHypothesisRow {
            sample_id: mutation.sample_id.clone(),
            chrom: mutation.chrom.clone(),
            position: mutation.position,
            ref_allele: mutation.ref_allele.clone(),
            alt_allele: mutation.alt_allele.clone(),
            ref_depth: mutation.ref_counts,
            alt_depth: mutation.var_counts,
            event_code: row.event_code,
            genotype,
        })
        .collect()
}

/// Write the genotype table for a sequence of annotated mutations, returning
/// the number of hypotheses written
pub fn write_genotype_table<'a, I, P>(rows: I, output_path: P) -> CnvGenoResult<usize>
where
    I: IntoIterator<Item = &'a AnnotatedMutationRow>,
    P: AsRef<Path>,
{
    let mut writer = tsv_writer(output_path)?;
    writer.write_record(GenotypeHypothesisRow::HEADER)?;

    let mut written = 0;
    for row in rows {
        for hypothesis in generate_hypotheses(row) {
            writer.serialize(&hypothesis)?;
            written += 1;
        }
    }

    writer.flush()?;
    Ok(written)
}
