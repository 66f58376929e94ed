//! Headless village raid replay runner.
//!
//! # Usage
//!
//! ```bash
//! # Replay a recorded attack
//! cargo run -p raid_headless -- replay --layout village.json --record attack.json
//!
//! # Keep simulating 30 seconds past the last placement
//! cargo run -p raid_headless -- replay --layout village.json --record attack.json --extra-seconds 30
//!
//! # Verify determinism
//! cargo run -p raid_headless -- verify --layout village.json --record attack.json --runs 8
//!
//! # Check a stat catalog
//! cargo run -p raid_headless -- validate --catalog stats.ron
//! ```

use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use raid_core::grid::GridParameters;
use raid_core::math::{Fixed, Vec2Fixed};
use raid_headless::{load_catalog, load_layout, load_record, ReplayJob};

#[derive(Parser)]
#[command(name = "raid_headless")]
#[command(about = "Headless village raid replay runner for CI")]
#[command(version)]
struct Cli {
    /// Enable verbose logging to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a recorded battle and print a JSON summary
    Replay {
        #[command(flatten)]
        battle: BattleArgs,

        /// Seconds to keep simulating after the log ends
        #[arg(long, default_value = "0")]
        extra_seconds: u32,
    },

    /// Verify determinism by replaying the same battle in parallel
    Verify {
        #[command(flatten)]
        battle: BattleArgs,

        /// Number of verification runs
        #[arg(long, default_value = "5")]
        runs: u32,

        /// Seconds to keep simulating after the log ends
        #[arg(long, default_value = "0")]
        extra_seconds: u32,
    },

    /// Parse a stat catalog and report problems
    Validate {
        /// Catalog RON file
        #[arg(short, long)]
        catalog: PathBuf,
    },
}

#[derive(Args)]
struct BattleArgs {
    /// Village layout JSON file
    #[arg(short, long)]
    layout: PathBuf,

    /// Placement log JSON file
    #[arg(short, long)]
    record: PathBuf,

    /// Catalog RON file (built-in catalog if omitted)
    #[arg(short, long)]
    catalog: Option<PathBuf>,

    /// Grid side length in cells
    #[arg(long, default_value = "44")]
    grid_size: u32,

    /// Horizontal world offset per grid step
    #[arg(long, default_value = "32")]
    delta_x: f64,

    /// Vertical world offset per grid step
    #[arg(long, default_value = "16")]
    delta_y: f64,

    /// World position of cell (0, 0) as "x,y"
    #[arg(long, default_value = "0,0", value_parser = parse_point)]
    origin: (f64, f64),
}

fn parse_point(s: &str) -> Result<(f64, f64), String> {
    let (x, y) = s
        .split_once(',')
        .ok_or_else(|| format!("expected \"x,y\", got \"{s}\""))?;
    let x = x.trim().parse().map_err(|e| format!("bad x: {e}"))?;
    let y = y.trim().parse().map_err(|e| format!("bad y: {e}"))?;
    Ok((x, y))
}

fn to_fixed(value: f64, name: &str) -> Result<Fixed, String> {
    Fixed::checked_from_num(value).ok_or_else(|| format!("{name} out of range: {value}"))
}

impl BattleArgs {
    fn grid(&self) -> Result<GridParameters, String> {
        let p00 = Vec2Fixed::new(
            to_fixed(self.origin.0, "origin x")?,
            to_fixed(self.origin.1, "origin y")?,
        );
        GridParameters::try_new(
            p00,
            to_fixed(self.delta_x, "delta-x")?,
            to_fixed(self.delta_y, "delta-y")?,
            self.grid_size,
        )
        .map_err(|e| e.to_string())
    }

    fn job(&self, extra_seconds: u32) -> Result<ReplayJob, String> {
        let catalog = load_catalog(self.catalog.as_deref()).map_err(|e| e.to_string())?;
        let layout = load_layout(&self.layout).map_err(|e| e.to_string())?;
        let log = load_record(&self.record).map_err(|e| e.to_string())?;
        Ok(ReplayJob {
            grid: self.grid()?,
            catalog,
            layout,
            log,
            extra_seconds,
        })
    }
}

fn main() {
    let cli = Cli::parse();

    // Logs go to stderr; stdout is for JSON
    let log_level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(true),
        )
        .with(tracing_subscriber::filter::LevelFilter::from_level(
            log_level,
        ))
        .init();

    let result = match cli.command {
        Commands::Replay {
            battle,
            extra_seconds,
        } => cmd_replay(&battle, extra_seconds),
        Commands::Verify {
            battle,
            runs,
            extra_seconds,
        } => cmd_verify(&battle, runs, extra_seconds),
        Commands::Validate { catalog } => cmd_validate(&catalog),
    };

    if let Err(e) = result {
        tracing::error!(error = %e, "command failed");
        eprintln!("FATAL: {e}");
        std::process::exit(1);
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<(), String> {
    let json = serde_json::to_string_pretty(value).map_err(|e| e.to_string())?;
    println!("{json}");
    Ok(())
}

/// Replay a recorded battle
fn cmd_replay(battle: &BattleArgs, extra_seconds: u32) -> Result<(), String> {
    tracing::info!(
        layout = %battle.layout.display(),
        record = %battle.record.display(),
        "Playing replay"
    );
    let summary = battle.job(extra_seconds)?.run().map_err(|e| e.to_string())?;
    print_json(&summary)
}

/// Verify determinism across parallel runs
fn cmd_verify(battle: &BattleArgs, runs: u32, extra_seconds: u32) -> Result<(), String> {
    tracing::info!(runs, record = %battle.record.display(), "Verifying determinism");

    let report = battle.job(extra_seconds)?.verify(runs).map_err(|e| e.to_string())?;
    print_json(&report)?;

    if report.is_deterministic() {
        eprintln!("PASS: All {} runs produced identical results", report.runs);
        Ok(())
    } else {
        eprintln!("FAIL: Non-determinism detected!");
        std::process::exit(1);
    }
}

/// Parse a catalog and list what it defines
fn cmd_validate(path: &Path) -> Result<(), String> {
    let catalog = load_catalog(Some(path)).map_err(|e| e.to_string())?;
    let issues = catalog.validate();

    eprintln!("Catalog: {}", path.display());
    eprintln!("  Troops:    {}", catalog.troops.len());
    eprintln!("  Spells:    {}", catalog.spells.len());
    eprintln!("  Buildings: {}", catalog.buildings.len());

    if issues.is_empty() {
        eprintln!("PASS: catalog is valid");
        return Ok(());
    }
    for issue in &issues {
        eprintln!("  - {issue}");
    }
    Err(format!("{} catalog issue(s)", issues.len()))
}
