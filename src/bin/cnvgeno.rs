//! Combined CLI binary for cnvgeno - filters somatic mutations, overlays
//! copy-number events and enumerates genotype hypotheses in one run

use clap::Parser;
use cnvgeno_rs::{
    pipeline::{run_pipeline, OutputLayout, PipelineInputs},
    utils::{init_logging, Timer},
    CnvGenoError, CnvGenoResult, ControlSample, EventCodes, FilterConfig, MatchConfig,
    PipelineConfig,
};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "cnvgeno")]
#[command(about = "Copy-number aware genotype hypotheses from somatic variant calls")]
#[command(long_about = "
cnvgeno turns a multi-sample VCF and per-tumor copy-number segmentation files
into genotype hypotheses for clonal-evolution clustering:
1. Filters somatic mutations (quality, allele length, clean control sample)
2. Overlays each tumor's copy-number events on its mutations
3. Enumerates every dominant/recessive allele composition for the copy number
4. Writes clustering-tool input tables for each tumor

Segmentation files are read from --event-dir; the tumor identifier is the file
name with --event-suffix removed and must match a VCF sample name.

Output layout under --output-dir:
  filtered_mutations.tsv   somatic mutation rows
  events/<tumor>.tsv       mutations annotated with overlapping events
  genotypes.tsv            genotype hypotheses
  pyclone/<tumor>.tsv      clustering input
")]
struct Args {
    /// Path to the input VCF file (plain or gzipped)
    #[arg(long, value_name = "FILE")]
    input_vcf: PathBuf,

    /// Directory with one copy-number segmentation file per tumor
    #[arg(long, value_name = "DIR")]
    event_dir: PathBuf,

    /// Output directory
    #[arg(long, value_name = "DIR")]
    output_dir: PathBuf,

    /// 0-based sample column of the control (normal) sample
    #[arg(long, conflicts_with = "control_suffix")]
    control_index: Option<usize>,

    /// Treat every sample whose name ends with this suffix as a control
    #[arg(long)]
    control_suffix: Option<String>,

    /// Variant lines need a QUAL strictly above this value
    #[arg(long, default_value_t = 50.0)]
    quality_limit: f64,

    /// Maximum REF/ALT allele length
    #[arg(long, default_value_t = 10)]
    allele_length_limit: usize,

    /// Suffix removed from segmentation file names to get the tumor identifier
    #[arg(long, default_value = ".txt")]
    event_suffix: String,

    /// Event label never used for annotation
    #[arg(long, default_value = "Allelic Imbalance")]
    disregarded_event: String,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Force overwrite of results left in the output directory
    #[arg(short, long)]
    force: bool,
}

impl Args {
    fn control(&self) -> ControlSample {
        match (&self.control_index, &self.control_suffix) {
            (Some(idx), _) => ControlSample::Index(*idx),
            (None, Some(suffix)) => ControlSample::Suffix(suffix.clone()),
            (None, None) => ControlSample::None,
        }
    }

    fn config(&self) -> PipelineConfig {
        PipelineConfig {
            filter: FilterConfig {
                quality_limit: self.quality_limit,
                allele_length_limit: self.allele_length_limit,
                ..FilterConfig::default()
            },
            matching: MatchConfig {
                event_codes: EventCodes::default(),
                disregarded_event: self.disregarded_event.clone(),
            },
            event_file_suffix: self.event_suffix.clone(),
        }
    }
}

fn run() -> CnvGenoResult<()> {
    let args = Args::parse();
    init_logging(args.verbose, args.debug);

    log::info!("Starting cnvgeno analysis");
    log::info!("Input VCF: {:?}", args.input_vcf);
    log::info!("Event directory: {:?}", args.event_dir);
    log::info!("Output directory: {:?}", args.output_dir);

    let control = args.control();
    if control == ControlSample::None {
        log::warn!("No control sample designated; germline variants will not be removed");
    }

    let layout = OutputLayout::new(&args.output_dir);
    if layout.has_results() {
        if !args.force {
            return Err(CnvGenoError::Io(std::io::Error::new(
                std::io::ErrorKind::AlreadyExists,
                format!(
                    "Output directory {:?} already holds results. Use --force to overwrite.",
                    args.output_dir
                ),
            )));
        }
        log::warn!("Removing previous results in {:?}", args.output_dir);
        layout.clear_results()?;
    }

    let config = args.config();
    log::info!(
        "Configuration: quality > {}, allele length <= {}, {} event codes, disregarded event {:?}",
        config.filter.quality_limit,
        config.filter.allele_length_limit,
        config.matching.event_codes.len(),
        config.matching.disregarded_event
    );

    let inputs = PipelineInputs {
        vcf: args.input_vcf.clone(),
        event_dir: args.event_dir.clone(),
        output_dir: args.output_dir.clone(),
        control,
    };

    let _timer = Timer::new("cnvgeno pipeline");
    let summary = run_pipeline(&inputs, &config)?;
    summary.log_summary();

    log::info!("Analysis completed successfully");
    log::info!("Genotypes written to: {:?}", layout.genotypes());

    Ok(())
}

/// Handle application errors and provide user-friendly messages
fn handle_error(error: CnvGenoError) -> ! {
    match error {
        CnvGenoError::FileNotFound(path) => {
            eprintln!("Error: File not found: {}", path);
            eprintln!("Please check that the VCF file and event directory exist and are readable.");
        }
        CnvGenoError::InvalidVariant(msg) => {
            eprintln!("Error: Invalid variant data: {}", msg);
            eprintln!("Please check that your VCF file is properly formatted.");
        }
        CnvGenoError::InvalidHeader(msg) => {
            eprintln!("Error: Invalid header: {}", msg);
            eprintln!("The VCF needs a #CHROM header line with a FORMAT column and sample names.");
        }
        CnvGenoError::InvalidEvent(msg) => {
            eprintln!("Error: Invalid copy-number event: {}", msg);
        }
        CnvGenoError::InvalidConfig(msg) => {
            eprintln!("Error: Invalid configuration: {}", msg);
            eprintln!("Please check the thresholds and control sample options.");
        }
        CnvGenoError::Io(ref e) => {
            eprintln!("Error: I/O error: {}", e);
            eprintln!("Please check file permissions and disk space.");
        }
        CnvGenoError::Csv(ref e) => {
            eprintln!("Error: Table processing error: {}", e);
            eprintln!("An intermediate table could not be read back. Please report this issue.");
        }
        CnvGenoError::Regex(ref e) => {
            eprintln!("Error: Internal pattern error: {}", e);
        }
    }
    std::process::exit(1);
}

fn main() {
    if let Err(e) = run() {
        handle_error(e);
    }
}
