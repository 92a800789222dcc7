//! CLI binary for the somatic mutation filter alone

use clap::Parser;
use cnvgeno_rs::{
    utils::{init_logging, validate_file_readable, Timer},
    validate_config,
    vcf::{filter_variants, write_filtered_mutations},
    CnvGenoError, CnvGenoResult, ControlSample, FilterConfig, PipelineConfig,
};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "filter_vcf")]
#[command(about = "Extract somatic mutation rows from a multi-sample VCF")]
#[command(long_about = "
Reads a multi-sample VCF and writes one row per (sample, variant) for every
sample carrying the variant. Lines must have QUAL above --quality-limit and
REF/ALT no longer than --allele-length-limit. When a control sample is given,
lines where the control is not homozygous reference (0/0) are dropped.
Variants on chromosomes X and Y are never reported.

Output columns: sample chrom position ref alt gt dp ref_counts var_counts cn_n
")]
struct Args {
    /// Path to the input VCF file (plain or gzipped)
    #[arg(long, value_name = "FILE")]
    input_vcf: PathBuf,

    /// Path to the output TSV file (gzipped if it ends in .gz)
    #[arg(long, value_name = "FILE")]
    output: PathBuf,

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

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Force overwrite of output file if it exists
    #[arg(short, long)]
    force: bool,
}

fn run() -> CnvGenoResult<()> {
    let args = Args::parse();
    init_logging(args.verbose, args.debug);

    log::info!("Starting somatic mutation filter");
    log::info!("VCF file: {:?}", args.input_vcf);
    log::info!("Output file: {:?}", args.output);

    validate_file_readable(&args.input_vcf)?;

    if args.output.exists() && !args.force {
        return Err(CnvGenoError::Io(std::io::Error::new(
            std::io::ErrorKind::AlreadyExists,
            format!("Output file {:?} already exists. Use --force to overwrite.", args.output),
        )));
    }

    let config = PipelineConfig {
        filter: FilterConfig {
            quality_limit: args.quality_limit,
            allele_length_limit: args.allele_length_limit,
            ..FilterConfig::default()
        },
        ..PipelineConfig::default()
    };
    validate_config(&config)?;

    let control = match (args.control_index, args.control_suffix) {
        (Some(idx), _) => ControlSample::Index(idx),
        (None, Some(suffix)) => ControlSample::Suffix(suffix),
        (None, None) => ControlSample::None,
    };

    let _timer = Timer::new("Filtering variants");
    let (rows, stats) = filter_variants(&args.input_vcf, &control, &config.filter)?;
    stats.log_summary();

    if rows.is_empty() {
        log::warn!("No somatic mutations passed the filter");
    }

    write_filtered_mutations(&rows, &args.output)?;
    log::info!("Wrote {} rows to {:?}", rows.len(), args.output);

    Ok(())
}

/// Handle application errors and provide user-friendly messages
fn handle_error(error: CnvGenoError) -> ! {
    match error {
        CnvGenoError::FileNotFound(path) => {
            eprintln!("Error: File not found: {}", path);
            eprintln!("Please check that the file exists and is readable.");
        }
        CnvGenoError::InvalidVariant(msg) => {
            eprintln!("Error: Invalid variant data: {}", msg);
            eprintln!("Please check that your VCF file is properly formatted.");
        }
        CnvGenoError::InvalidHeader(msg) => {
            eprintln!("Error: Invalid header: {}", msg);
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
            eprintln!("Error: Output table error: {}", e);
        }
        CnvGenoError::InvalidEvent(msg) => {
            eprintln!("Error: {}", msg);
        }
        CnvGenoError::Regex(ref e) => {
            eprintln!("Error: {}", e);
        }
    }
    std::process::exit(1);
}

fn main() {
    if let Err(e) = run() {
        handle_error(e);
    }
}
