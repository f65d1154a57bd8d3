//! audioval - validation study analysis CLI
//!
//! One subcommand per experiment type: organize and clean paired-comparison
//! data, compute real-ear deviations from targets, or test speech-in-noise
//! scores.

use audioval::prelude::*;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

/// Validation study analysis
#[derive(Parser)]
#[command(name = "audioval")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Organize paired-comparison data and remove incomplete cells
    Dam {
        /// Directory of exported session CSVs
        #[arg(short, long)]
        data: PathBuf,

        /// Output path for the cleaned CSV
        #[arg(short, long, default_value = "dam_clean.csv")]
        output: PathBuf,

        /// Optional output path for the organized, unfiltered CSV
        #[arg(long)]
        raw_output: Option<PathBuf>,
    },

    /// Compute real-ear deviations from targets and score them
    Rem {
        /// Path to the measured (probe-microphone) export CSV
        #[arg(short, long)]
        measured: PathBuf,

        /// Path to the prescriptive-target export CSV
        #[arg(short, long)]
        targets: PathBuf,

        /// Optional analysis configuration YAML (defaults to the study
        /// protocol parameters)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Directory for deviation CSVs and criterion reports
        #[arg(short, long, default_value = ".")]
        output_dir: PathBuf,

        /// Stdout format for the criterion reports: text, json, or yaml
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Run Friedman and pairwise Wilcoxon tests on speech-in-noise scores
    Sin {
        /// Path to the combined word/sentence score CSV
        #[arg(short, long)]
        data: PathBuf,
    },

    /// Write the default analysis configuration as YAML
    Example {
        /// Output path for the example YAML
        #[arg(short, long, default_value = "analysis.yaml")]
        output: PathBuf,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Dam {
            data,
            output,
            raw_output,
        } => cmd_dam(&data, &output, raw_output.as_deref()),
        Commands::Rem {
            measured,
            targets,
            config,
            output_dir,
            format,
        } => cmd_rem(&measured, &targets, config.as_deref(), &output_dir, &format),
        Commands::Sin { data } => cmd_sin(&data),
        Commands::Example { output } => cmd_example(&output),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Organize and clean a directory of paired-comparison session files.
fn cmd_dam(data: &Path, output: &Path, raw_output: Option<&Path>) -> Result<()> {
    eprintln!("Importing session files from {:?}...", data);
    let raw = read_observations_dir(data)?;
    eprintln!("Imported {} trials", raw.len());

    let organized = organize(&raw)?;
    if let Some(path) = raw_output {
        write_observations_csv(path, &organized)?;
        eprintln!("Wrote organized data to {:?}", path);
    }

    let (clean, stats) = remove_incomplete_with_stats(&organized, EXPECTED_TRIALS);
    eprint!("{}", stats);
    write_observations_csv(output, &clean)?;
    eprintln!("Wrote {} trials to {:?}", clean.len(), output);
    Ok(())
}

/// Compute and score real-ear deviations, split and collapsed.
fn cmd_rem(
    measured_path: &Path,
    targets_path: &Path,
    config_path: Option<&Path>,
    output_dir: &Path,
    format: &str,
) -> Result<()> {
    let config = match config_path {
        Some(path) => AnalysisConfig::from_yaml(&std::fs::read_to_string(path)?)?,
        None => AnalysisConfig::default(),
    };

    eprintln!("Loading data...");
    let measured = read_verifit(measured_path)?;
    let targets = read_targets(targets_path)?;
    let model = DataModel::new(measured, targets)?.retain_freqs(&config.freqs);
    eprintln!(
        "Loaded {} measured and {} target rows",
        model.measured().len(),
        model.targets().len()
    );

    std::fs::create_dir_all(output_dir)?;

    // Per-form-factor analysis.
    let deviations = model.diff_from_target()?;
    deviations.write_csv(output_dir.join("estat_diffs.csv"))?;
    eprintln!(
        "Wrote {} deviation rows in {} groups",
        deviations.n_records(),
        deviations.n_groups()
    );

    let report = model.analyze(&config.criteria)?;
    report.write_csv(output_dir.join("criterion_report.csv"))?;
    print_report(&report, format)?;

    // Fine-tuning differences between fitting stages.
    for (minuend, name) in [
        ("EndStudy", "endstudy_diffs.csv"),
        ("BestFit", "bestfit_targetmatch_diffs.csv"),
    ] {
        let diffs = model.diff_between_conditions(minuend, "TargetMatch")?;
        if !diffs.is_empty() {
            diffs.write_csv(output_dir.join(name))?;
            eprintln!("Wrote {} {} rows", diffs.n_records(), minuend);
        }
    }

    // Aggregate analysis with collapsed form factors.
    let collapsed = model.collapse_form_factors(&config.collapse);
    let collapsed_deviations = collapsed.diff_from_target()?;
    collapsed_deviations.write_csv(output_dir.join("estat_diffs_collapsed.csv"))?;
    let collapsed_report = collapsed.analyze(&config.criteria)?;
    collapsed_report.write_csv(output_dir.join("criterion_report_collapsed.csv"))?;
    print_report(&collapsed_report, format)?;

    eprintln!("Done");
    Ok(())
}

/// Print a criterion report to stdout in the requested format.
fn print_report(report: &AnalysisReport, format: &str) -> Result<()> {
    match format {
        "json" => println!("{}", serde_json::to_string_pretty(report).unwrap()),
        "yaml" => println!("{}", serde_yaml::to_string(report).unwrap()),
        _ => println!("{}", report),
    }
    Ok(())
}

/// Test speech-in-noise scores for condition effects.
fn cmd_sin(data: &Path) -> Result<()> {
    eprintln!("Loading scores from {:?}...", data);
    let (words, sentences) = organize_scores(data)?;

    for (label, table) in [("words", &words), ("sentences", &sentences)] {
        println!("Friedman test for {}: {}", label, table.friedman()?);
        for pair in table.wilcoxon_pairwise()? {
            println!("Wilcoxon for {}: {} vs. {}: {}", label, pair.a, pair.b, pair.test);
        }
        println!();
    }
    Ok(())
}

/// Write the default configuration for editing.
fn cmd_example(output: &Path) -> Result<()> {
    let yaml = AnalysisConfig::default().to_yaml()?;
    std::fs::write(output, &yaml)?;
    eprintln!("Wrote example configuration to {:?}", output);
    println!("{}", yaml);
    Ok(())
}
