//! Copy-number event overlay for filtered mutations

use crate::{
    events::{CopyNumberEvent, EventStore},
    normalize_chrom,
    utils::{tsv_reader, tsv_writer},
    AnnotatedMutationRow, CnvGenoError, CnvGenoResult, FilteredMutationRow, MatchConfig,
};
use std::path::Path;

/// Annotated rows of one tumor, in mutation order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TumorAnnotations {
    pub tumor_id: String,
    pub rows: Vec<AnnotatedMutationRow>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OverlayStats {
    pub mutations_considered: usize,
    pub rows_emitted: usize,
    pub unknown_event_matches: usize,
}

impl OverlayStats {
    pub fn log_summary(&self) {
        log::info!("Event overlay summary:");
        log::info!("  Tumor mutations considered: {}", self.mutations_considered);
        log::info!("  Annotated rows emitted: {}", self.rows_emitted);
        log::info!("  Matches dropped for unknown event labels: {}", self.unknown_event_matches);
    }
}

/// True if the event lies on the mutation's chromosome, covers its position and
/// is not the disregarded label
pub fn event_covers(
    mutation: &FilteredMutationRow,
    event: &CopyNumberEvent,
    config: &MatchConfig,
) -> bool {
    normalize_chrom(&event.chrom) == normalize_chrom(&mutation.chrom)
        && event.contains(mutation.position)
        && event.event != config.disregarded_event
}

/// Events of `tumor_id` covering the mutation, excluding the disregarded label.
///
/// Every overlapping event is returned; overlapping segments are not merged or
/// ranked.
pub fn matching_events<'a>(
    mutation: &'a FilteredMutationRow,
    tumor_id: &'a str,
    store: &'a EventStore,
    config: &'a MatchConfig,
) -> impl Iterator<Item = &'a CopyNumberEvent> + 'a {
    store
        .events_for(tumor_id)
        .filter(move |event| event_covers(mutation, event, config))
}

/// Annotate the mutations of a single tumor
pub fn annotate_tumor(
    tumor_id: &str,
    mutations: &[FilteredMutationRow],
    store: &EventStore,
    config: &MatchConfig,
    stats: &mut OverlayStats,
) -> Vec<AnnotatedMutationRow> {
    let mut rows = Vec::new();

    for mutation in mutations.iter().filter(|m| m.sample_id == tumor_id) {
        stats.mutations_considered += 1;
        for event in matching_events(mutation, tumor_id, store, config) {
            match config.event_codes.get(&event.event) {
                Some(code) => {
                    rows.push(AnnotatedMutationRow::new(
                        mutation.clone(),
                        code,
                        event.event.clone(),
                    ));
                    stats.rows_emitted += 1;
                }
                None => {
                    log::warn!(
                        "Unknown event label {:?} for {} at {}:{}, match dropped",
                        event.event,
                        tumor_id,
                        mutation.chrom,
                        mutation.position
                    );
                    stats.unknown_event_matches += 1;
                }
            }
        }
    }

    rows
}

/// Annotate mutations with every overlapping event, one group per tumor in
/// the store's tumor order
pub fn annotate_mutations(
    mutations: &[FilteredMutationRow],
    store: &EventStore,
    config: &MatchConfig,
) -> (Vec<TumorAnnotations>, OverlayStats) {
    let mut stats = OverlayStats::default();

    let annotations: Vec<TumorAnnotations> = store
        .tumor_ids
        .iter()
        .map(|tumor_id| TumorAnnotations {
            tumor_id: tumor_id.clone(),
            rows: annotate_tumor(tumor_id, mutations, store, config, &mut stats),
        })
        .collect();

    (annotations, stats)
}

/// Write one tumor's annotated-mutation table
pub fn write_annotated_rows<P: AsRef<Path>>(
    rows: &[AnnotatedMutationRow],
    output_path: P,
) -> CnvGenoResult<()> {
    let mut writer = tsv_writer(output_path)?;
    writer.write_record(AnnotatedMutationRow::HEADER)?;
    for row in rows {
        writer.write_record(row.to_fields())?;
    }
    writer.flush()?;
    Ok(())
}

/// Read an annotated-mutation table back in file order
pub fn read_annotated_rows<P: AsRef<Path>>(path: P) -> CnvGenoResult<Vec<AnnotatedMutationRow>> {
    let mut reader = tsv_reader(&path)?;
    let headers = reader.headers()?.clone();
    let mut rows = Vec::new();

    for result in reader.records() {
        let record = result?;
        if record.len() < AnnotatedMutationRow::HEADER.len() {
            return Err(CnvGenoError::InvalidVariant(format!(
                "Annotated row with {} columns in {}",
                record.len(),
                path.as_ref().display()
            )));
        }

        let mutation: FilteredMutationRow = record.deserialize(Some(&headers))?;
        let event_code = record[10].parse::<u32>().map_err(|_| {
            CnvGenoError::InvalidVariant(format!("Invalid event code: {}", &record[10]))
        })?;
        rows.push(AnnotatedMutationRow::new(mutation, event_code, record[11].to_string()));
    }

    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Depth, EventCodes};
    use tempfile::NamedTempFile;

    fn mutation(sample: &str, chrom: &str, position: u64) -> FilteredMutationRow {
        FilteredMutationRow {
            sample_id: sample.to_string(),
            chrom: chrom.to_string(),
            position,
            ref_allele: "A".to_string(),
            alt_allele: "T".to_string(),
            genotype: "0/1".to_string(),
            depth: Depth(20),
            ref_counts: Depth(12),
            var_counts: Depth(8),
            cn_n: 2,
        }
    }

    fn event(tumor: &str, chrom: &str, start: u64, stop: u64, label: &str) -> CopyNumberEvent {
        CopyNumberEvent {
            tumor_id: tumor.to_string(),
            chrom: chrom.to_string(),
            start,
            stop,
            event: label.to_string(),
        }
    }

    fn store(events: Vec<CopyNumberEvent>, tumor_ids: &[&str]) -> EventStore {
        EventStore {
            events,
            tumor_ids: tumor_ids.iter().map(|t| t.to_string()).collect(),
        }
    }

    #[test]
    fn test_match_requires_same_tumor_chrom_and_region() {
        let store = store(
            vec![
                event("T1", "1", 100, 200, "CN Gain"),
                event("T2", "1", 100, 200, "CN Loss"),
                event("T1", "2", 100, 200, "CN Loss"),
                event("T1", "1", 200, 300, "High Copy Gain"),
            ],
            &["T1", "T2"],
        );
        let mutations = vec![mutation("T1", "1", 150), mutation("T1", "1", 200)];

        let (annotations, stats) = annotate_mutations(&mutations, &store, &MatchConfig::default());

        assert_eq!(annotations.len(), 2);
        assert_eq!(annotations[0].tumor_id, "T1");
        let codes: Vec<(u64, u32)> = annotations[0]
            .rows
            .iter()
            .map(|r| (r.mutation.position, r.event_code))
            .collect();
        assert_eq!(codes, vec![(150, 3), (200, 4)]);
        assert!(annotations[1].rows.is_empty());
        assert_eq!(stats.rows_emitted, 2);
    }

    #[test]
    fn test_overlapping_events_fan_out() {
        let store = store(
            vec![
                event("T1", "5", 0, 1000, "CN Gain"),
                event("T1", "5", 400, 600, "Homozygous Copy Loss"),
            ],
            &["T1"],
        );
        let mutations = vec![mutation("T1", "5", 500)];

        let (annotations, _) = annotate_mutations(&mutations, &store, &MatchConfig::default());
        let rows = &annotations[0].rows;
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].event, "CN Gain");
        assert_eq!(rows[0].event_code, 3);
        assert_eq!(rows[1].event, "Homozygous Copy Loss");
        assert_eq!(rows[1].event_code, 0);
    }

    #[test]
    fn test_disregarded_and_unknown_events() {
        let store = store(
            vec![
                event("T1", "1", 0, 1000, "Allelic Imbalance"),
                event("T1", "1", 0, 1000, "LOH"),
                event("T1", "1", 0, 1000, "CN Loss"),
            ],
            &["T1"],
        );
        let mutations = vec![mutation("T1", "1", 10)];

        let (annotations, stats) = annotate_mutations(&mutations, &store, &MatchConfig::default());
        let rows = &annotations[0].rows;
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].event, "CN Loss");
        assert_eq!(rows[0].event_code, 1);
        assert_eq!(stats.unknown_event_matches, 1);
        assert!(rows.iter().all(|r| r.event != "Allelic Imbalance"));
    }

    #[test]
    fn test_custom_event_codes() {
        let config = MatchConfig {
            event_codes: EventCodes::new(vec![("LOH".to_string(), 2)]),
            ..MatchConfig::default()
        };
        let store = store(vec![event("T1", "1", 0, 1000, "LOH")], &["T1"]);
        let (annotations, _) = annotate_mutations(&[mutation("T1", "1", 10)], &store, &config);
        assert_eq!(annotations[0].rows[0].event_code, 2);
    }

    #[test]
    fn test_chr_prefix_ignored_when_matching() {
        let store = store(vec![event("T1", "7", 0, 1000, "CN Gain")], &["T1"]);
        let (annotations, _) =
            annotate_mutations(&[mutation("T1", "chr7", 10)], &store, &MatchConfig::default());
        assert_eq!(annotations[0].rows.len(), 1);
        assert_eq!(annotations[0].rows[0].mutation.chrom, "chr7");
    }

    #[test]
    fn test_other_samples_ignored() {
        let store = store(vec![event("T1", "1", 0, 1000, "CN Gain")], &["T1"]);
        let (annotations, stats) =
            annotate_mutations(&[mutation("T2", "1", 10)], &store, &MatchConfig::default());
        assert!(annotations[0].rows.is_empty());
        assert_eq!(stats.mutations_considered, 0);
    }

    #[test]
    fn test_annotated_table_round_trip() {
        let rows = vec![
            AnnotatedMutationRow::new(mutation("T1", "1", 150), 3, "CN Gain".to_string()),
            AnnotatedMutationRow::new(mutation("T1", "1", 150), 0, "Homozygous Copy Loss".to_string()),
        ];
        let output = NamedTempFile::new().unwrap();
        write_annotated_rows(&rows, output.path()).unwrap();

        let content = std::fs::read_to_string(output.path()).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(
            lines[0],
            "sample\tchrom\tposition\tref\talt\tgt\tdp\tref_counts\tvar_counts\tcn_n\tcn_v\tevent"
        );
        assert_eq!(lines[1], "T1\t1\t150\tA\tT\t0/1\t20\t12\t8\t2\t3\tCN Gain");

        assert_eq!(read_annotated_rows(output.path()).unwrap(), rows);
    }
}
