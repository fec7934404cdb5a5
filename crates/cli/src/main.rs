//! krigeo CLI - kriging estimation from JSON run files

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use krigeo_algorithms::kriging::{
    CrossValidation, CrossValidationMode, EstimationRun, Estimator, KrigingOptions, KrigingType,
};
use krigeo_algorithms::search::SearchParameters;
use krigeo_algorithms::variogram::VariogramModel;
use krigeo_core::{Discretization, GridDefinition, Sample, Target};
use krigeo_parallel::{available_threads, ProcessingMode};

// ─── CLI structure ──────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "krigeo")]
#[command(author, version, about = "Geostatistical kriging estimation", long_about = None)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Worker threads (default: all cores)
    #[arg(short, long, global = true)]
    threads: Option<usize>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Estimate every target of a run file
    Estimate {
        /// JSON run file
        input: PathBuf,
        /// Output CSV file
        output: PathBuf,
    },
    /// Validate a run file and print the model summary
    Validate {
        /// JSON run file
        input: PathBuf,
    },
    /// Estimate every sample from the others
    CrossValidate {
        /// JSON run file
        input: PathBuf,
        /// Output CSV file
        output: PathBuf,
        /// Hide the whole source group (drillhole) of each sample
        #[arg(short, long)]
        group_out: bool,
    },
}

// ─── Run file ───────────────────────────────────────────────────────────

/// Everything needed for one estimation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct RunFile {
    samples: Vec<Sample>,
    model: VariogramModel,
    #[serde(default)]
    search: SearchParameters,
    #[serde(default)]
    kriging: KrigingType,
    #[serde(default)]
    options: KrigingOptions,
    #[serde(default)]
    targets: Option<TargetSpec>,
}

/// Targets as a regular grid or an explicit list.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
enum TargetSpec {
    Grid {
        #[serde(flatten)]
        grid: GridDefinition,
        /// Block discretization; point targets at cell centers when absent
        #[serde(default, skip_serializing_if = "Option::is_none")]
        discretization: Option<Discretization>,
    },
    List(Vec<Target>),
}

impl TargetSpec {
    fn targets(&self) -> Result<Vec<Target>> {
        match self {
            TargetSpec::Grid {
                grid,
                discretization,
            } => {
                grid.validate()?;
                Ok(grid.targets(*discretization))
            }
            TargetSpec::List(targets) => Ok(targets.clone()),
        }
    }
}

impl RunFile {
    fn load(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("Failed to open run file {}", path.display()))?;
        serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("Failed to parse run file {}", path.display()))
    }

    fn estimator(self, threads: Option<usize>) -> Result<(Estimator, Option<TargetSpec>)> {
        let mut options = self.options;
        if let Some(n) = threads {
            options.mode = ProcessingMode::ParallelWith(n);
        }
        let estimator = Estimator::new(self.samples, self.model, self.search, self.kriging, options)
            .context("Invalid run configuration")?;
        Ok((estimator, self.targets))
    }
}

// ─── Helpers ────────────────────────────────────────────────────────────

fn setup_logging(verbose: bool) -> Result<()> {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set default subscriber")
}

fn spinner(msg: &str) -> Result<ProgressBar> {
    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?);
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    Ok(pb)
}

fn create_output(path: &Path) -> Result<BufWriter<File>> {
    let file = File::create(path)
        .with_context(|| format!("Failed to create output {}", path.display()))?;
    Ok(BufWriter::new(file))
}

fn fmt_opt(v: Option<f64>) -> String {
    v.map(|v| v.to_string()).unwrap_or_default()
}

fn write_estimates(
    path: &Path,
    targets: &[Target],
    run: &EstimationRun,
    options: &KrigingOptions,
) -> Result<()> {
    let mut out = create_output(path)?;
    write!(out, "x,y,z,estimate,variance,neighbors,status")?;
    if options.auxiliary.nearest {
        write!(out, ",nearest")?;
    }
    if options.auxiliary.idw {
        write!(out, ",idw")?;
    }
    writeln!(out)?;

    for (t, r) in targets.iter().zip(&run.results) {
        let c = &t.center;
        write!(
            out,
            "{},{},{},{},{},{},{}",
            c.x,
            c.y,
            c.z,
            fmt_opt(r.estimate),
            fmt_opt(r.variance),
            r.diagnostics.neighbor_count,
            r.status.as_str()
        )?;
        if options.auxiliary.nearest {
            write!(out, ",{}", fmt_opt(r.auxiliary.and_then(|a| a.nearest)))?;
        }
        if options.auxiliary.idw {
            write!(out, ",{}", fmt_opt(r.auxiliary.and_then(|a| a.idw)))?;
        }
        writeln!(out)?;
    }
    out.flush()?;
    Ok(())
}

fn write_cross_validation(path: &Path, samples: &[Sample], cv: &CrossValidation) -> Result<()> {
    let mut out = create_output(path)?;
    writeln!(out, "x,y,z,value,estimate,variance,error,neighbors,status")?;
    for r in &cv.records {
        let s = &samples[r.index];
        writeln!(
            out,
            "{},{},{},{},{},{},{},{},{}",
            s.x,
            s.y,
            s.z,
            r.truth,
            fmt_opt(r.result.estimate),
            fmt_opt(r.result.variance),
            fmt_opt(r.error),
            r.result.diagnostics.neighbor_count,
            r.result.status.as_str()
        )?;
    }
    out.flush()?;
    Ok(())
}

fn done(name: &str, path: &Path, elapsed: std::time::Duration) {
    println!("{} saved to: {}", name, path.display());
    println!("  Processing time: {:.2?}", elapsed);
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose)?;

    match cli.command {
        // ── Estimate ─────────────────────────────────────────────────
        Commands::Estimate { input, output } => {
            let (estimator, targets) = RunFile::load(&input)?.estimator(cli.threads)?;
            let Some(targets) = targets else {
                bail!("Run file {} has no targets", input.display());
            };
            let targets = targets.targets()?;
            let workers = match estimator.options().mode {
                ProcessingMode::Sequential => 1,
                ProcessingMode::Parallel => available_threads(),
                ProcessingMode::ParallelWith(n) => n,
            };
            info!(
                "{} kriging: {} samples, {} targets, {} threads",
                estimator.kind().name(),
                estimator.samples().len(),
                targets.len(),
                workers
            );

            let pb = spinner("Estimating...")?;
            let start = Instant::now();
            let run = estimator
                .estimate(&targets)
                .context("Failed to run estimation")?;
            let elapsed = start.elapsed();
            pb.finish_and_clear();

            let s = &run.summary;
            info!(
                "{} ok, {} repaired, {} too few neighbors, {} not estimated ({:.1} neighbors avg)",
                s.ok, s.repaired, s.too_few, s.not_estimated, s.mean_neighbors
            );
            if s.not_estimated > 0 {
                warn!("{} targets hit numerical anomalies, rerun with --verbose for details", s.not_estimated);
            }
            write_estimates(&output, &targets, &run, estimator.options())?;
            done("Estimates", &output, elapsed);
        }

        // ── Validate ─────────────────────────────────────────────────
        Commands::Validate { input } => {
            let (estimator, targets) = RunFile::load(&input)?.estimator(cli.threads)?;
            let targets = targets.map(|t| t.targets()).transpose()?;
            if let Some(targets) = &targets {
                estimator.validate_targets(targets)?;
            }
            let search = estimator.search_index().params();

            println!("File: {}", input.display());
            println!("Kriging: {}", estimator.kind().name());
            println!("Model: {}", estimator.model());
            println!("Samples: {}", estimator.samples().len());
            println!(
                "Search: radii {:?}, {}..{} samples, {} sectors",
                search.ellipsoid.ranges(),
                search.min_samples,
                search.max_samples,
                search.sectors.count()
            );
            if let Some(mean) = estimator.simple_mean() {
                println!("Simple kriging mean: {:.4}", mean);
            }
            match targets {
                Some(t) => println!("Targets: {}", t.len()),
                None => println!("Targets: none"),
            }
        }

        // ── Cross validation ─────────────────────────────────────────
        Commands::CrossValidate {
            input,
            output,
            group_out,
        } => {
            let (estimator, _) = RunFile::load(&input)?.estimator(cli.threads)?;
            let mode = if group_out {
                CrossValidationMode::LeaveGroupOut
            } else {
                CrossValidationMode::LeaveOneOut
            };

            let pb = spinner("Cross validating...")?;
            let start = Instant::now();
            let cv = estimator
                .cross_validate(mode)
                .context("Failed to run cross validation")?;
            let elapsed = start.elapsed();
            pb.finish_and_clear();

            let s = &cv.summary;
            println!("Estimated: {} / {}", s.estimated, s.count);
            println!("  Mean error: {:.4}", s.mean_error);
            println!("  Mean squared error: {:.4}", s.mean_squared_error);
            println!(
                "  Mean standardized squared error: {:.4}",
                s.mean_standardized_squared_error
            );
            write_cross_validation(&output, estimator.samples(), &cv)?;
            done("Cross validation", &output, elapsed);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const RUN: &str = r#"{
        "samples": [
            {"x": 0.0, "y": 0.0, "z": 0.0, "value": 10.0, "group": 1},
            {"x": 1.0, "y": 0.0, "z": 0.0, "value": 20.0, "group": 1},
            {"x": 0.0, "y": 1.0, "z": 0.0, "value": 15.0, "group": 2},
            {"x": 1.0, "y": 1.0, "z": 0.0, "value": 25.0, "group": 2}
        ],
        "model": {
            "nugget": 0.0,
            "structures": [
                {"type": "spherical", "sill": 1.0,
                 "anisotropy": {"major": 2.0, "minor": 2.0, "vertical": 2.0}}
            ]
        },
        "search": {"ellipsoid": {"major": 10.0, "minor": 10.0, "vertical": 10.0}},
        "kriging": {"type": "ordinary"},
        "options": {"mode": "sequential", "auxiliary": {"nearest": true}},
        "targets": {"grid": {
            "nx": 2, "ny": 2, "nz": 1,
            "xmn": 0.25, "ymn": 0.25, "zmn": 0.0,
            "xsiz": 0.5, "ysiz": 0.5, "zsiz": 1.0,
            "discretization": {"nx": 2, "ny": 2, "nz": 1}
        }}
    }"#;

    #[test]
    fn test_parse_grid_run() {
        let run: RunFile = serde_json::from_str(RUN).unwrap();
        assert_eq!(run.samples.len(), 4);
        assert_eq!(run.kriging, KrigingType::Ordinary);
        assert!(run.options.auxiliary.nearest);
        let targets = run.targets.as_ref().unwrap().targets().unwrap();
        assert_eq!(targets.len(), 4);
        assert_eq!(targets[0].point_count(), 4);
    }

    #[test]
    fn test_parse_target_list() {
        let spec: TargetSpec = serde_json::from_str(
            r#"{"list": [
                {"center": {"x": 0.5, "y": 0.5, "z": 0.0}, "support": {"type": "point"}},
                {"center": {"x": 0.2, "y": 0.8, "z": 0.0}, "support": {"type": "point"}, "secondary": 1.5}
            ]}"#,
        )
        .unwrap();
        let targets = spec.targets().unwrap();
        assert_eq!(targets.len(), 2);
        assert_eq!(targets[1].secondary, Some(1.5));
    }

    #[test]
    fn test_threads_override() {
        let run: RunFile = serde_json::from_str(RUN).unwrap();
        let (estimator, _) = run.estimator(Some(2)).unwrap();
        assert_eq!(estimator.options().mode, ProcessingMode::ParallelWith(2));
    }

    #[test]
    fn test_run_file_estimates() {
        let run: RunFile = serde_json::from_str(RUN).unwrap();
        let (estimator, targets) = run.estimator(None).unwrap();
        let targets = targets.unwrap().targets().unwrap();
        let result = estimator.estimate(&targets).unwrap();
        assert_eq!(result.summary.ok, 4);
        assert!(result.results.iter().all(|r| r.auxiliary.is_some()));
    }

    #[test]
    fn test_invalid_model_rejected() {
        let bad = RUN.replace(r#""sill": 1.0"#, r#""sill": -1.0"#);
        let run: Result<RunFile, _> = serde_json::from_str(&bad);
        assert!(run.is_err());
    }
}
