//! End-to-end pipeline: VCF + segmentation files → annotated tables,
//! genotype hypotheses and clustering input

use crate::{
    events::EventStore,
    genotype::write_genotype_table,
    overlay::{annotate_mutations, read_annotated_rows, write_annotated_rows, OverlayStats},
    pyclone::convert_annotated_table,
    utils::{ensure_dir, validate_dir_exists, validate_file_readable, Timer},
    validate_config,
    vcf::{filter_variants, read_filtered_mutations, write_filtered_mutations, FilterStats},
    CnvGenoResult, ControlSample, PipelineConfig,
};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct PipelineInputs {
    pub vcf: PathBuf,
    pub event_dir: PathBuf,
    pub output_dir: PathBuf,
    pub control: ControlSample,
}

/// File locations under the output directory
#[derive(Debug, Clone)]
pub struct OutputLayout {
    root: PathBuf,
}

impl OutputLayout {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn filtered_mutations(&self) -> PathBuf {
        self.root.join("filtered_mutations.tsv")
    }

    pub fn events_dir(&self) -> PathBuf {
        self.root.join("events")
    }

    pub fn annotated(&self, tumor_id: &str) -> PathBuf {
        self.events_dir().join(format!("{}.tsv", tumor_id))
    }

    pub fn genotypes(&self) -> PathBuf {
        self.root.join("genotypes.tsv")
    }

    pub fn pyclone_dir(&self) -> PathBuf {
        self.root.join("pyclone")
    }

    pub fn pyclone(&self, tumor_id: &str) -> PathBuf {
        self.pyclone_dir().join(format!("{}.tsv", tumor_id))
    }

    /// True if a previous run already left results here
    pub fn has_results(&self) -> bool {
        self.filtered_mutations().exists() || self.genotypes().exists()
    }

    /// Remove the tables of a previous run, including per-tumor tables of
    /// tumors that may not be part of the next run
    pub fn clear_results(&self) -> CnvGenoResult<()> {
        for table in [self.filtered_mutations(), self.genotypes()] {
            if table.exists() {
                std::fs::remove_file(&table)?;
            }
        }
        for dir in [self.events_dir(), self.pyclone_dir()] {
            if dir.is_dir() {
                std::fs::remove_dir_all(&dir)?;
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct PipelineSummary {
    pub filter: FilterStats,
    pub overlay: OverlayStats,
    pub tumor_ids: Vec<String>,
    pub genotype_rows: usize,
    pub cluster_rows: usize,
}

impl PipelineSummary {
    pub fn log_summary(&self) {
        self.filter.log_summary();
        self.overlay.log_summary();
        log::info!("Tumors processed: {}", self.tumor_ids.len());
        log::info!("Genotype hypotheses written: {}", self.genotype_rows);
        log::info!("Clustering input rows written: {}", self.cluster_rows);
    }
}

/// Run all stages. Each stage writes its table in full before the next stage
/// reads it back.
pub fn run_pipeline(inputs: &PipelineInputs, config: &PipelineConfig) -> CnvGenoResult<PipelineSummary> {
    validate_config(config)?;
    validate_file_readable(&inputs.vcf)?;
    validate_dir_exists(&inputs.event_dir)?;

    let layout = OutputLayout::new(&inputs.output_dir);
    ensure_dir(&inputs.output_dir)?;
    ensure_dir(layout.events_dir())?;
    ensure_dir(layout.pyclone_dir())?;

    let mut summary = PipelineSummary::default();

    // Stage 1: somatic mutation filter
    {
        let _timer = Timer::new("Filtering variants");
        let (rows, stats) = filter_variants(&inputs.vcf, &inputs.control, &config.filter)?;
        write_filtered_mutations(&rows, layout.filtered_mutations())?;
        log::info!(
            "Wrote {} filtered mutations to {:?}",
            rows.len(),
            layout.filtered_mutations()
        );
        summary.filter = stats;
    }

    // Stage 2: copy-number events
    let store = {
        let _timer = Timer::new("Loading copy-number events");
        EventStore::load_dir(&inputs.event_dir, &config.event_file_suffix)?
    };
    if store.tumor_ids.is_empty() {
        log::warn!(
            "No segmentation files ending with {:?} in {:?}",
            config.event_file_suffix,
            inputs.event_dir
        );
    }
    log::info!(
        "Loaded {} copy-number events for {} tumors",
        store.events.len(),
        store.tumor_ids.len()
    );

    // Stage 3: event overlay
    {
        let _timer = Timer::new("Matching mutations to events");
        let mutations = read_filtered_mutations(layout.filtered_mutations())?;
        for tumor_id in &store.tumor_ids {
            if !mutations.iter().any(|m| &m.sample_id == tumor_id) {
                log::warn!("No filtered mutations for tumor {}", tumor_id);
            }
        }

        let (annotations, stats) = annotate_mutations(&mutations, &store, &config.matching);
        for tumor in &annotations {
            write_annotated_rows(&tumor.rows, layout.annotated(&tumor.tumor_id))?;
            log::info!("Tumor {}: {} annotated rows", tumor.tumor_id, tumor.rows.len());
        }
        summary.overlay = stats;
    }

    // Stage 4: genotype hypotheses
    {
        let _timer = Timer::new("Enumerating genotypes");
        let mut annotated = Vec::new();
        for tumor_id in &store.tumor_ids {
            annotated.extend(read_annotated_rows(layout.annotated(tumor_id))?);
        }
        summary.genotype_rows = write_genotype_table(&annotated, layout.genotypes())?;
    }

    // Clustering input
    for tumor_id in &store.tumor_ids {
        summary.cluster_rows +=
            convert_annotated_table(layout.annotated(tumor_id), layout.pyclone(tumor_id))?;
    }

    summary.tumor_ids = store.tumor_ids;
    Ok(summary)
}
