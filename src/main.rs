//! Microgrid federation simulator entry point: CLI wiring and config-driven construction.

mod cli;

use anyhow::{Context, Result, bail};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use minigrid_sim::config::ScenarioConfig;
use minigrid_sim::io::export::export_logs;
use minigrid_sim::sim::FederationKpi;

use crate::cli::Cli;

fn load_scenario(cli: &Cli) -> Result<ScenarioConfig> {
    let mut scenario = match (&cli.scenario, &cli.preset) {
        (Some(path), _) => ScenarioConfig::from_toml_file(path)
            .with_context(|| format!("loading scenario {}", path.display()))?,
        (None, Some(name)) => ScenarioConfig::from_preset(name)?,
        (None, None) => ScenarioConfig::from_preset(Cli::DEFAULT_PRESET)?,
    };

    if let Some(seed) = cli.seed {
        scenario.simulation.seed = seed;
    }
    if let Some(days) = cli.days {
        scenario.simulation.days = days;
    }
    Ok(scenario)
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let scenario = load_scenario(&cli)?;

    let errors = scenario.validate();
    if !errors.is_empty() {
        for e in &errors {
            eprintln!("{e}");
        }
        bail!("scenario has {} invalid setting(s)", errors.len());
    }
    let mut federation = scenario.build_federation()?;

    if cli.initial_state {
        let state = serde_json::to_string_pretty(&federation.initial_state())?;
        println!("{state}");
    }

    info!(
        grids = federation.grids().len(),
        days = scenario.simulation.days,
        seed = scenario.simulation.seed,
        "simulation started"
    );
    for _ in 0..federation.config().days {
        federation.simulate_days(1);
        for record in federation.drain_records() {
            if !cli.quiet {
                println!("{record}");
            }
        }
    }
    info!(hours = federation.next_hour(), "simulation finished");

    let kpi = FederationKpi::from_federation(&federation);
    println!("\n{kpi}");
    println!("\n{}", federation.utility());

    if let Some(dir) = &cli.log_dir {
        let files = export_logs(&federation, dir)
            .with_context(|| format!("writing logs to {}", dir.display()))?;
        eprintln!("{} log files written to {}", files.len(), dir.display());
    }

    Ok(())
}
