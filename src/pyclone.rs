//! PyClone-style clustering input generation

use crate::{
    overlay::read_annotated_rows, utils::tsv_writer, AnnotatedMutationRow, CnvGenoResult, Depth,
};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterInputRow {
    pub position_id: String,
    pub mutation_id: usize,
    pub ref_counts: Depth,
    pub var_counts: Depth,
    pub cn_n: u32,
    pub cn_v: u32,
}

impl ClusterInputRow {
    pub const HEADER: [&'static str; 6] = [
        "position_id", "mutation_id", "ref_counts", "var_counts", "cn_n", "cn_v",
    ];
}

/// Reformat annotated rows; `mutation_id` is the row's ordinal in `rows`
pub fn cluster_input_rows(rows: &[AnnotatedMutationRow]) -> Vec<ClusterInputRow> {
    rows.iter()
        .enumerate()
        .map(|(mutation_id, row)| {
            let mutation = &row.mutation;
            ClusterInputRow {
                position_id: format!("{}{}{}", mutation.sample_id, mutation.chrom, mutation.position),
                mutation_id,
                ref_counts: mutation.ref_counts,
                var_counts: mutation.var_counts,
                cn_n: mutation.cn_n,
                cn_v: row.event_code,
            }
        })
        .collect()
}

pub fn write_cluster_input<P: AsRef<Path>>(
    rows: &[ClusterInputRow],
    output_path: P,
) -> CnvGenoResult<()> {
    let mut writer = tsv_writer(output_path)?;
    writer.write_record(ClusterInputRow::HEADER)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

/// Convert one annotated-mutation table into clustering input, returning the
/// number of rows written
pub fn convert_annotated_table<P: AsRef<Path>, Q: AsRef<Path>>(
    input_path: P,
    output_path: Q,
) -> CnvGenoResult<usize> {
    let annotated = read_annotated_rows(input_path)?;
    let rows = cluster_input_rows(&annotated);
    write_cluster_input(&rows, output_path)?;
    Ok(rows.len())
}
