//! dockgate - Pre-flight validation and stall recovery for docking pipelines.
//! Entry point for the operator CLI.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use dockgate_common::GateConfig;
use dockgate_recovery::report::{self, CategoryHint, RecoveryReport};
use dockgate_recovery::sweep;
use dockgate_structure::preprocess;
use dockgate_structure::validate;

#[derive(Parser, Debug)]
#[command(name = "dockgate", version)]
#[command(about = "Structure validation and stall recovery gate for molecular docking runs")]
struct Cli {
    /// Path to dockgate.toml (default: DOCKGATE_CONFIG env var, then ./dockgate.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Classify a structure file; exits 0 only when it is docking-ready
    Validate {
        /// Structure file to classify
        input: PathBuf,
    },
    /// Rewrite a structure into canonical columns and re-validate the result
    Preprocess {
        /// Structure file to read (never modified)
        input: PathBuf,
        /// Destination for the rewritten structure
        output: PathBuf,
        /// Extract a single chain instead of keeping all records
        #[arg(long)]
        chain: Option<char>,
    },
    /// Classify many files; one file's failure never blocks the rest
    Batch {
        /// Structure files to classify
        inputs: Vec<PathBuf>,
    },
    /// Detect and terminate stalled workers, then print a diagnosis
    Recover {
        /// Override the configured worker process pattern
        #[arg(long)]
        pattern: Option<String>,
        /// Directory of worker logs to check for staleness
        #[arg(long)]
        log_dir: Option<PathBuf>,
        /// Input file of a stalled run, for a root-cause hint (repeatable)
        #[arg(long = "input")]
        inputs: Vec<PathBuf>,
        /// Report only; send no signals
        #[arg(long)]
        dry_run: bool,
        /// Emit the report as JSON instead of tables
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .init();

    let config = match load_config(cli.config.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("dockgate: {e:#}");
            return ExitCode::FAILURE;
        }
    };

    match run(cli.command, config).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("dockgate: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn load_config(explicit: Option<&Path>) -> Result<GateConfig> {
    match explicit {
        Some(path) => Ok(GateConfig::load_from(path)?),
        None => Ok(GateConfig::load()?),
    }
}

async fn run(command: Command, config: GateConfig) -> Result<ExitCode> {
    match command {
        Command::Validate { input } => {
            let verdict = validate::classify(&input, &config.validation).await?;
            if verdict.is_valid() {
                println!("PASS  {}  [{}]", input.display(), verdict.code());
                Ok(ExitCode::SUCCESS)
            } else {
                println!(
                    "FAIL  {}  [{}] {}",
                    input.display(),
                    verdict.code(),
                    verdict.detail()
                );
                Ok(ExitCode::FAILURE)
            }
        }

        Command::Preprocess { input, output, chain } => {
            // Extraction already re-serialises canonically, so a separate
            // normalisation pass is only needed when keeping all chains.
            match chain {
                Some(c) => {
                    let n = preprocess::extract_chain(&input, &output, c).await?;
                    info!("Extracted {} chain-{} records", n, c);
                }
                None => {
                    let n = preprocess::normalize_columns(&input, &output).await?;
                    info!("Rewrote {} records into canonical columns", n);
                }
            }
            let verdict = validate::classify(&output, &config.validation).await?;
            if verdict.is_valid() {
                println!("PASS  {}  [{}]", output.display(), verdict.code());
                Ok(ExitCode::SUCCESS)
            } else {
                println!(
                    "FAIL  {}  [{}] {}",
                    output.display(),
                    verdict.code(),
                    verdict.detail()
                );
                Ok(ExitCode::FAILURE)
            }
        }

        Command::Batch { inputs } => {
            let entries = preprocess::batch_preprocess(&inputs, &config.validation).await;
            let mut valid = 0;
            for entry in &entries {
                match &entry.outcome {
                    Ok(verdict) => {
                        if verdict.is_valid() {
                            valid += 1;
                            println!("PASS  {}  [{}]", entry.path.display(), verdict.code());
                        } else {
                            println!(
                                "FAIL  {}  [{}] {}",
                                entry.path.display(),
                                verdict.code(),
                                verdict.detail()
                            );
                        }
                    }
                    Err(e) => println!("ERROR {}  {}", entry.path.display(), e),
                }
            }
            println!("{}/{} files docking-ready", valid, entries.len());
            Ok(ExitCode::SUCCESS)
        }

        Command::Recover { pattern, log_dir, inputs, dry_run, json } => {
            let mut recovery = config.recovery.clone();
            if let Some(p) = pattern {
                recovery.process_pattern = p;
            }
            if let Some(d) = log_dir {
                recovery.log_dir = Some(d);
            }

            let mut rep = sweep::run_sweep(&recovery, dry_run).await?;
            rep.hints = hints_for(&inputs, &config).await;

            if json {
                println!("{}", serde_json::to_string_pretty(&rep)?);
            } else {
                print_report(&rep, dry_run);
            }
            // Diagnostic/advisory: never fails the caller's script.
            Ok(ExitCode::SUCCESS)
        }
    }
}

async fn hints_for(inputs: &[PathBuf], config: &GateConfig) -> Vec<CategoryHint> {
    let mut hints = Vec::new();
    for input in inputs {
        match validate::count_atoms(input).await {
            Ok(atom_count) => hints.push(CategoryHint {
                input: input.clone(),
                atom_count,
                category: report::categorize(atom_count, &config.validation),
            }),
            Err(e) => warn!("No category for {}: {}", input.display(), e),
        }
    }
    hints
}

fn print_report(rep: &RecoveryReport, dry_run: bool) {
    if rep.stalled.is_empty() {
        println!("No stalled workers detected ({} matching).", rep.workers.len());
    } else {
        println!("Stalled workers:");
        println!("  {:>8}  {:>6}  {:>8}  COMMAND", "PID", "CPU%", "RUNTIME");
        for w in &rep.stalled {
            println!(
                "  {:>8}  {:>6.1}  {:>7}m  {}",
                w.pid,
                w.cpu_percent,
                w.run_time_secs / 60,
                w.cmd
            );
        }
    }

    if dry_run {
        println!("Dry run: no signals sent.");
    } else {
        for o in &rep.outcomes {
            println!("  PID {} -> {:?}", o.pid, o.result);
        }
        if !rep.survivors().is_empty() {
            println!("Anomaly: pids still resident after KILL: {:?}", rep.survivors());
        }
    }

    if !rep.stale_logs.is_empty() {
        println!("Stale logs:");
        for log in &rep.stale_logs {
            println!("  {} (idle {}m)", log.path.display(), log.age_minutes);
            if let Some(line) = &log.last_line {
                println!("    last: {}", line);
            }
        }
    }

    if !rep.hints.is_empty() {
        println!("Recommendations:");
        for h in &rep.hints {
            println!(
                "  {}: {} atoms [{}] {}",
                h.input.display(),
                h.atom_count,
                h.category.code(),
                h.category.recommendation()
            );
        }
    }

    if rep.all_clear {
        println!("All clear: no matching processes remain.");
    }
}
