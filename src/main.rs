fn main() {
    println!("cnvgeno-rs - Copy-number aware genotype hypotheses");
    println!();
    println!("RECOMMENDED: Use the combined tool for most workflows:");
    println!("  cnvgeno        - Complete analysis: VCF + segmentation files → genotypes (one step)");
    println!();
    println!("Advanced tools for specialized workflows:");
    println!("  filter_vcf     - Somatic mutation filter only (VCF → TSV)");
    println!("  pyclone_input  - Clustering input from annotated tables (TSV → TSV)");
    println!();
    println!("For help with each tool:");
    println!("  cargo run -- --help                          # Combined tool");
    println!("  cargo run --bin filter_vcf -- --help         # Filter only");
    println!("  cargo run --bin pyclone_input -- --help      # Clustering input only");
    println!();
    println!("Quick start example:");
    println!("  cargo run -- --input-vcf calls.vcf --event-dir events/ --output-dir out/ --control-suffix C");
}
