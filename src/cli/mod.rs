//! Command-line interface for the station replacement pipeline.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use log::{error, info, warn};
use std::path::PathBuf;
use std::time::Instant;

use crate::config::PairingMode;
use crate::core::loaders::{self, E57Importer, ScanImporter};
use crate::core::writers;
use crate::processors::replace::run_replace;
use crate::ReplaceConfig;

#[derive(Parser)]
#[command(name = "station-replace")]
#[command(about = "TLS station replacement pipeline for E57 scan deliveries", version)]
pub struct Cli {
    /// Path to YAML config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Increase verbosity
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List importable scans found in a delivery directory
    Inspect {
        /// Directory containing scan files
        directory: PathBuf,
    },

    /// Match scans against project stations without importing anything
    Match {
        /// Directory containing scan files
        directory: PathBuf,
        /// Project manifest describing the active chunk
        #[arg(short, long)]
        project: PathBuf,
    },

    /// Replace matching stations with imported scans
    Replace {
        /// Directory containing scan files
        directory: PathBuf,
        /// Project manifest describing the active chunk
        #[arg(short, long)]
        project: PathBuf,
        /// Write the updated project manifest to this path
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Camera pairing rule for mask transfer
        #[arg(long)]
        pairing: Option<PairingArg>,
        /// Preview matches without importing or mutating the chunk
        #[arg(long)]
        dry_run: bool,
    },
}

/// CLI-facing spelling of [`PairingMode`].
#[derive(Debug, Clone, Copy, ValueEnum)]
enum PairingArg {
    ByIndex,
    ByLabel,
}

impl From<PairingArg> for PairingMode {
    fn from(arg: PairingArg) -> Self {
        match arg {
            PairingArg::ByIndex => PairingMode::ByIndex,
            PairingArg::ByLabel => PairingMode::ByLabel,
        }
    }
}

/// Create a spinner for indeterminate operations
fn create_spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap(),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

/// Print a summary box
fn print_summary(title: &str, items: &[(&str, String)]) {
    println!();
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║ {:<62} ║", title);
    println!("╠══════════════════════════════════════════════════════════════╣");
    for (key, value) in items {
        let display_value = if value.len() > 39 {
            format!("{}...", &value[..36])
        } else {
            value.clone()
        };
        println!("║ {:<20}: {:<39} ║", key, display_value);
    }
    println!("╚══════════════════════════════════════════════════════════════╝");
    println!();
}

pub fn run() {
    let cli = Cli::parse();

    // Initialize logging based on verbosity (must come first)
    env_logger::Builder::new()
        .filter_level(match cli.verbose {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            _ => log::LevelFilter::Debug,
        })
        .format_timestamp_secs()
        .init();

    // Load config
    let config = match &cli.config {
        Some(path) => match ReplaceConfig::from_yaml(path) {
            Ok(cfg) => {
                info!("Loaded config from: {}", path.display());
                cfg
            }
            Err(e) => {
                warn!(
                    "Failed to load config from {}: {}, using defaults",
                    path.display(),
                    e
                );
                ReplaceConfig::default()
            }
        },
        None => ReplaceConfig::default(),
    };

    // Dispatch to subcommands
    let result = match cli.command {
        Commands::Inspect { directory } => cmd_inspect(&directory, &config),
        Commands::Match { directory, project } => cmd_match(&directory, &project, &config),
        Commands::Replace {
            directory,
            project,
            output,
            pairing,
            dry_run,
        } => cmd_replace(&directory, &project, output, pairing, dry_run, &config),
    };

    if let Err(e) = result {
        error!("{:#}", e);
        std::process::exit(1);
    }
}

fn cmd_inspect(directory: &PathBuf, config: &ReplaceConfig) -> Result<()> {
    let start = Instant::now();

    let spinner = create_spinner("Scanning directory for scan files...");

    let candidates = match loaders::find_scan_candidates(directory, &config.import.extensions) {
        Ok(c) => c,
        Err(e) => {
            spinner.finish_and_clear();
            return Err(e).context("Scan discovery failed");
        }
    };

    spinner.finish_and_clear();

    let importer = E57Importer::new();
    let mut assets = 0usize;
    let mut total_points = 0u64;
    let mut unreadable = 0usize;

    for candidate in &candidates {
        match importer.import(&candidate.path) {
            Ok(stations) => {
                for station in &stations {
                    println!(
                        "{}: asset '{}' | {} points | {} camera(s)",
                        candidate.base_name,
                        station.label,
                        station.points,
                        station.cameras.len()
                    );
                    assets += 1;
                    total_points += station.points;
                }
            }
            Err(e) => {
                warn!("Unreadable scan '{}': {}", candidate.path.display(), e);
                unreadable += 1;
            }
        }
    }

    print_summary(
        "Inspect Complete",
        &[
            ("Directory", directory.display().to_string()),
            ("Scan files", candidates.len().to_string()),
            ("Assets", assets.to_string()),
            ("Total points", total_points.to_string()),
            ("Unreadable", unreadable.to_string()),
            ("Duration", format!("{:.2?}", start.elapsed())),
        ],
    );

    Ok(())
}

fn cmd_match(directory: &PathBuf, project: &PathBuf, config: &ReplaceConfig) -> Result<()> {
    let start = Instant::now();

    let mut chunk = loaders::load_chunk(project)
        .with_context(|| format!("Failed to load project manifest {}", project.display()))?;

    let report = run_replace(&mut chunk, directory, &E57Importer::new(), config, true)
        .context("Matching failed")?;

    for replaced in &report.replaced {
        println!("MATCH: '{}' -> station '{}'", replaced.file, replaced.source_label);
    }
    for skipped in &report.skipped {
        println!("SKIP: '{}' ({})", skipped.file, skipped.reason);
    }

    print_summary(
        "Match Complete",
        &[
            ("Chunk", report.chunk_label.clone()),
            ("Directory", directory.display().to_string()),
            ("Scan files", report.candidates.to_string()),
            ("Matched", report.replaced.len().to_string()),
            ("Skipped", report.skipped.len().to_string()),
            ("Duration", format!("{:.2?}", start.elapsed())),
        ],
    );

    Ok(())
}

fn cmd_replace(
    directory: &PathBuf,
    project: &PathBuf,
    output: Option<PathBuf>,
    pairing: Option<PairingArg>,
    dry_run: bool,
    config: &ReplaceConfig,
) -> Result<()> {
    let start = Instant::now();

    if dry_run {
        println!("DRY RUN: No scans will be imported");
    }

    println!("Warning: the input point clouds must be generated using the same");
    println!("software as the point clouds already loaded in this project.");
    println!("Otherwise, different axis conventions (e.g., yaw) may cause");
    println!("incorrect orientations.");
    println!();

    let mut chunk = loaders::load_chunk(project)
        .with_context(|| format!("Failed to load project manifest {}", project.display()))?;

    // Apply CLI overrides on top of the file config
    let mut effective_config = config.clone();
    if let Some(arg) = pairing {
        effective_config.masks.pairing = arg.into();
    }

    let spinner = create_spinner("Importing and aligning scans...");

    let report = match run_replace(
        &mut chunk,
        directory,
        &E57Importer::new(),
        &effective_config,
        dry_run,
    ) {
        Ok(r) => r,
        Err(e) => {
            spinner.finish_and_clear();
            return Err(e).context("Replacement failed");
        }
    };

    spinner.finish_and_clear();

    let mut items = vec![
        ("Chunk", report.chunk_label.clone()),
        ("Directory", directory.display().to_string()),
        ("Scan files", report.candidates.to_string()),
        ("Replaced", report.replaced.len().to_string()),
        ("Skipped", report.skipped.len().to_string()),
        ("Masks complete", report.masks_complete().to_string()),
        ("Dry run", dry_run.to_string()),
    ];

    if let Some(path) = output {
        if dry_run {
            info!("Dry run: not writing {}", path.display());
        } else {
            let spinner = create_spinner("Saving updated project manifest...");
            match writers::save_chunk(&path, &chunk) {
                Ok(()) => {
                    spinner.finish_and_clear();
                    items.push(("Saved to", path.display().to_string()));
                }
                Err(e) => {
                    spinner.finish_and_clear();
                    return Err(e)
                        .with_context(|| format!("Failed to save project manifest {}", path.display()));
                }
            }
        }
    } else if !dry_run {
        info!("Chunk mutated in memory only; pass --output to write a manifest");
    }

    items.push(("Duration", format!("{:.2?}", start.elapsed())));

    print_summary("Replacement Complete", &items);

    Ok(())
}
