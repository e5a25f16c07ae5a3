// ==============================================================================
// main.rs - Genomic Analysis CLI
// ==============================================================================
// Description: Runs one analysis offline and prints the AnalysisRun as JSON
// Created: 2026-10-18
// Modified: 2026-10-18
// Version: 2.0.0
// ==============================================================================

use anyhow::{Context, Result};
use clap::Parser;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use genomic_analysis::annotation::AnnotationTable;
use genomic_analysis::models::AnalysisOptions;
use genomic_analysis::{AnalysisEngine, Analyzer};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Raw input payload ({"format": "vcf"|"json", "variants": [...]})
    #[arg(short, long)]
    input: PathBuf,

    /// Patient the input belongs to
    #[arg(short, long)]
    patient_id: String,

    /// Minimum call quality for a variant to be analysed
    #[arg(long, default_value_t = 20.0)]
    quality_threshold: f64,

    /// Skip the pharmacogenomics sub-analysis
    #[arg(long)]
    no_pharmacogenomics: bool,

    /// Run the structural-variant sub-analysis
    #[arg(long)]
    structural: bool,

    /// Run the copy-number sub-analysis
    #[arg(long)]
    cnv: bool,

    /// JSON annotation table keyed by "chrom:pos:ref:alt"
    #[arg(long, env = "ANNOTATION_TABLE_PATH")]
    annotations: Option<PathBuf>,
}

impl Args {
    fn options(&self) -> AnalysisOptions {
        AnalysisOptions {
            include_pharmacogenomics: !self.no_pharmacogenomics,
            include_structural_variants: self.structural,
            include_copy_number_variants: self.cnv,
            quality_threshold: self.quality_threshold,
        }
    }
}

fn load_input(path: &Path) -> Result<Value> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read input file {:?}", path))?;
    serde_json::from_str(&contents).with_context(|| format!("Input file {:?} is not valid JSON", path))
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "genomic_analysis=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();

    let table = match &args.annotations {
        Some(path) => AnnotationTable::from_path(path).context("Failed to load annotation table")?,
        None => AnnotationTable::empty(),
    };
    info!("Annotation table: {} entries", table.len());

    let raw_input = load_input(&args.input)?;
    let engine = AnalysisEngine::with_table(table);

    let run = engine
        .analyze(&args.patient_id, &raw_input, &args.options(), None)
        .await
        .context("Analysis failed")?;

    println!("{}", serde_json::to_string_pretty(&run)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_input() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"format": "json", "variants": []}}"#).unwrap();
        let value = load_input(file.path()).unwrap();
        assert_eq!(value["format"], "json");
    }

    #[test]
    fn test_load_input_rejects_invalid_json() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "format: vcf").unwrap();
        assert!(load_input(file.path()).is_err());
    }

    #[test]
    fn test_flags_map_to_options() {
        let args = Args::parse_from([
            "genomic-analysis", "--input", "in.json", "--patient-id", "p1",
            "--no-pharmacogenomics", "--cnv", "--quality-threshold", "30",
        ]);
        let options = args.options();
        assert!(!options.include_pharmacogenomics);
        assert!(!options.include_structural_variants);
        assert!(options.include_copy_number_variants);
        assert_eq!(options.quality_threshold, 30.0);
    }
}
