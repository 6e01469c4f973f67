//! # Surgeryvis CLI
//!
//! Command-line front end for the schedule viewer. Each input file is one
//! frame: it is loaded, staged and committed on the headless backend, and
//! the frame statistics are reported.
//!
//! ## Commands
//! - `defects` - Show defect frames (circuit, connections, debug graphs, boxes)
//! - `plumbing` - Show plumbing-piece schedules
//! - `lattice` - Show lattice-surgery layouts
//! - `config` - Print the effective configuration

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use surgeryvis_core::{DrawOptions, VisualiserConfig};
use surgeryvis_scene::schedule::from_json;
use surgeryvis_scene::{FrameSummary, HeadlessBackend, SceneLifecycleManager};

/// Lattice-surgery schedule viewer
#[derive(Parser)]
#[command(name = "surgeryvis")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// JSON configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Draw options, e.g. `noboxes&noduals`
    #[arg(short, long)]
    pub query: Option<String>,

    /// Verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Print frame summaries as JSON
    #[arg(long)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Show defect frames
    Defects {
        /// Defect scene files, one frame each
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Show plumbing-piece schedules
    Plumbing {
        /// Plumbing schedule files, one frame each
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Show lattice-surgery layouts
    Lattice {
        /// Layout files, one frame each
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Print the effective configuration
    Config,
}

/// Summary of one input file
#[derive(Debug, Serialize)]
pub struct FrameReport {
    pub file: PathBuf,
    #[serde(flatten)]
    pub summary: FrameSummary,
}

/// Load the configuration file, if any, and apply the draw-option query
pub fn load_config(path: Option<&Path>, query: Option<&str>) -> Result<VisualiserConfig> {
    let mut config = match path {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("reading config {}", path.display()))?;
            serde_json::from_str(&text)
                .with_context(|| format!("parsing config {}", path.display()))?
        }
        None => VisualiserConfig::default(),
    };

    if let Some(query) = query {
        config.draw = DrawOptions::from_query(query);
    }

    Ok(config)
}

fn read_schedule(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))
}

/// Run every file of a frame command through one lifecycle manager
pub fn run_frames(command: &Commands, config: VisualiserConfig) -> Result<Vec<FrameReport>> {
    let mut manager = SceneLifecycleManager::new(HeadlessBackend::new(), config);
    let mut reports = Vec::new();

    let files = match command {
        Commands::Defects { files }
        | Commands::Plumbing { files }
        | Commands::Lattice { files } => files,
        Commands::Config => return Ok(reports),
    };

    for file in files {
        let text = read_schedule(file)?;
        let summary = match command {
            Commands::Defects { .. } => manager.show_defects(&from_json(&text)?),
            Commands::Plumbing { .. } => manager.show_plumbing(&from_json(&text)?),
            Commands::Lattice { .. } => manager.show_lattice(&from_json(&text)?),
            Commands::Config => continue,
        }
        .with_context(|| format!("building frame from {}", file.display()))?;

        reports.push(FrameReport {
            file: file.clone(),
            summary,
        });
    }

    log::debug!(
        "{} meshes resident, peak {} bytes",
        manager.backend().resident_count(),
        manager.backend().stats().peak_usage()
    );
    Ok(reports)
}

fn print_report(report: &FrameReport) {
    let summary = &report.summary;
    println!(
        "{}: frame {}, {} meshes ({} attached), {} vertices, {} bytes",
        report.file.display(),
        summary.frame,
        summary.meshes,
        summary.attached,
        summary.vertices,
        summary.bytes
    );
    if let Some([w, h, d]) = summary.pieces {
        println!("  bounding box plumbing pieces: {} {} {}", w, h, d);
    }
}

/// Execute the CLI command
pub fn execute(cli: Cli) -> Result<()> {
    let level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let config = load_config(cli.config.as_deref(), cli.query.as_deref())?;

    if let Commands::Config = cli.command {
        println!("{}", serde_json::to_string_pretty(&config)?);
        return Ok(());
    }

    let reports = run_frames(&cli.command, config)?;
    if cli.json {
        println!("{}", serde_json::to_string_pretty(&reports)?);
    } else {
        reports.iter().for_each(print_report);
    }

    Ok(())
}
