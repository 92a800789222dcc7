//! CLI binary for clustering-input generation from annotated mutation tables

use anyhow::{Context, Result};
use clap::Parser;
use cnvgeno_rs::{
    pyclone::convert_annotated_table,
    utils::{ensure_dir, init_logging, validate_file_readable},
};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "pyclone_input")]
#[command(about = "Convert annotated mutation tables into PyClone-style input")]
#[command(long_about = "
Reads one or more annotated mutation tables (the events/<tumor>.tsv files
written by cnvgeno) and writes a clustering input table for each into
--output-dir, keeping the input file name.

Output columns: position_id mutation_id ref_counts var_counts cn_n cn_v
position_id joins sample, chromosome and position; mutation_id is the row's
0-based ordinal within its input table.
")]
struct Args {
    /// Annotated mutation tables
    #[arg(value_name = "TABLE", required = true)]
    inputs: Vec<PathBuf>,

    /// Directory for the clustering input tables
    #[arg(long, value_name = "DIR")]
    output_dir: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

fn output_path(input: &Path, output_dir: &Path) -> Result<PathBuf> {
    let file_name = input
        .file_name()
        .with_context(|| format!("{:?} has no file name", input))?;
    Ok(output_dir.join(file_name))
}

fn run() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose, args.debug);

    ensure_dir(&args.output_dir)
        .with_context(|| format!("creating output directory {:?}", args.output_dir))?;

    let mut total = 0;
    for input in &args.inputs {
        validate_file_readable(input)?;
        let output = output_path(input, &args.output_dir)?;
        let written = convert_annotated_table(input, &output)
            .with_context(|| format!("converting {:?}", input))?;
        log::info!("{:?}: {} rows written to {:?}", input, written, output);
        total += written;
    }

    log::info!("Wrote {} clustering input rows from {} tables", total, args.inputs.len());
    Ok(())
}

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
