#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Headless command-line runner for Siegeline sessions.

mod layout;

use std::{fs, path::PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use siegeline_core::{Difficulty, Event, GamePhase, SimulationConfig};
use siegeline_simulation::Simulation;
use tracing::{info, warn};

use crate::layout::Layout;

/// Difficulty names accepted on the command line.
#[derive(Clone, Copy, Debug, ValueEnum)]
enum DifficultyArg {
    Easy,
    Normal,
    Hard,
}

impl From<DifficultyArg> for Difficulty {
    fn from(value: DifficultyArg) -> Self {
        match value {
            DifficultyArg::Easy => Difficulty::Easy,
            DifficultyArg::Normal => Difficulty::Normal,
            DifficultyArg::Hard => Difficulty::Hard,
        }
    }
}

/// Runs a tower-defense session without a display and prints a summary.
#[derive(Debug, Parser)]
#[command(name = "siegeline", version)]
struct Cli {
    /// TOML file with session settings.
    #[arg(long)]
    config: Option<PathBuf>,
    /// TOML file listing towers to build before the first wave.
    #[arg(long)]
    layout: Option<PathBuf>,
    /// Saved session to resume instead of starting fresh.
    #[arg(long)]
    load: Option<PathBuf>,
    /// Where to write the session when the run ends.
    #[arg(long)]
    save: Option<PathBuf>,
    /// Overrides the configured seed.
    #[arg(long)]
    seed: Option<u64>,
    /// Overrides the configured difficulty.
    #[arg(long, value_enum)]
    difficulty: Option<DifficultyArg>,
    /// Overrides the configured final wave.
    #[arg(long)]
    final_wave: Option<u32>,
    /// Upper bound on simulated ticks.
    #[arg(long, default_value_t = 200_000)]
    max_ticks: u64,
    /// Skip the countdown before the first wave.
    #[arg(long)]
    rush: bool,
}

impl Cli {
    fn session_config(&self) -> Result<SimulationConfig> {
        let mut config = match &self.config {
            Some(path) => {
                let source = fs::read_to_string(path)
                    .with_context(|| format!("failed to read config {}", path.display()))?;
                toml::from_str(&source)
                    .with_context(|| format!("failed to parse config {}", path.display()))?
            }
            None => SimulationConfig::default(),
        };
        if let Some(seed) = self.seed {
            config.seed = seed;
        }
        if let Some(difficulty) = self.difficulty {
            config.difficulty = difficulty.into();
        }
        if let Some(final_wave) = self.final_wave {
            config.final_wave = final_wave;
        }
        Ok(config)
    }

    fn layout(&self) -> Result<Option<Layout>> {
        let Some(path) = &self.layout else {
            return Ok(None);
        };
        let source = fs::read_to_string(path)
            .with_context(|| format!("failed to read layout {}", path.display()))?;
        let layout = Layout::parse(&source)
            .with_context(|| format!("failed to parse layout {}", path.display()))?;
        Ok(Some(layout))
    }
}

#[derive(Debug, Default)]
struct Tally {
    kills: u32,
    leaks: u32,
    waves: u32,
}

impl Tally {
    fn record(&mut self, events: &[Event]) {
        for event in events {
            match event {
                Event::EnemyKilled { .. } => self.kills += 1,
                Event::EnemyLeaked { .. } => self.leaks += 1,
                Event::WaveStarted { .. } => self.waves += 1,
                _ => {}
            }
        }
    }
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let json = matches!(std::env::var("LOG_FORMAT").as_deref(), Ok("json"));
    if json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .compact()
            .init();
    }
}

/// Entry point for the Siegeline command-line interface.
fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let config = cli.session_config()?;
    info!(seed = config.seed, difficulty = ?config.difficulty, "starting session");
    let mut simulation = Simulation::new(config);

    if let Some(path) = &cli.load {
        let payload = fs::read_to_string(path)
            .with_context(|| format!("failed to read save {}", path.display()))?;
        if let Err(error) = simulation.load(&payload) {
            warn!(%error, path = %path.display(), "starting fresh instead");
        } else if simulation.phase().is_terminal() {
            warn!(phase = ?simulation.phase(), "loaded session has already ended");
        }
    }

    if let Some(layout) = cli.layout()? {
        let report = layout.apply(&mut simulation);
        for (tower, reason) in &report.rejected {
            warn!(kind = ?tower.kind, column = tower.column, row = tower.row, %reason, "tower not built");
        }
        for (tower, reason) in &report.refused_upgrades {
            warn!(kind = ?tower.kind, column = tower.column, row = tower.row, %reason, "upgrade refused");
        }
        info!(placed = report.placed, upgrades = report.upgrades, "layout applied");
    }

    match simulation.phase() {
        GamePhase::Paused => simulation.resume(),
        _ => simulation.start(),
    }
    if cli.rush {
        simulation.call_next_wave();
    }

    let mut tally = Tally::default();
    let mut ticks = 0_u64;
    while ticks < cli.max_ticks && !simulation.phase().is_terminal() {
        tally.record(simulation.advance_tick());
        ticks += 1;
    }

    if let Some(path) = &cli.save {
        let payload = simulation.save_string().context("failed to encode save")?;
        fs::write(path, payload)
            .with_context(|| format!("failed to write save {}", path.display()))?;
    }

    let snapshot = simulation.snapshot();
    let outcome = match snapshot.phase {
        GamePhase::Won => "victory",
        GamePhase::Lost => "defeat",
        _ => "unfinished",
    };
    println!("outcome:     {outcome}");
    println!("ticks:       {ticks}");
    println!("wave:        {}", snapshot.wave);
    println!("waves run:   {}", tally.waves);
    println!("kills:       {}", tally.kills);
    println!("leaks:       {}", tally.leaks);
    println!("score:       {}", snapshot.score);
    println!("currency:    {}", snapshot.currency);
    println!("base health: {}", snapshot.base_health);
    println!("towers:      {}", snapshot.towers.len());
    Ok(())
}
