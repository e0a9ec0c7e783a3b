//! Command-line arguments for the simulator binary.

use std::path::PathBuf;

use clap::{ArgGroup, Parser};

#[derive(Debug, Parser)]
#[command(name = "minigrid-sim")]
#[command(version, about = "Microgrid federation energy simulator")]
#[command(
    long_about = "Simulates a federation of solar-plus-battery microgrids hour by hour.\n\
    \nGrids serve their houses from generation, trade surplus and deficit with\n\
    peer grids, and settle the rest with a fixed-price utility.\n\
    \nExamples:\n  \
    minigrid-sim                                   # federation preset\n  \
    minigrid-sim --preset undersized --days 2\n  \
    minigrid-sim --scenario scenarios/federation.toml --log-dir out"
)]
#[command(group(ArgGroup::new("source").args(["scenario", "preset"])))]
pub struct Cli {
    /// Load the scenario from a TOML file
    #[arg(long, value_name = "PATH")]
    pub scenario: Option<PathBuf>,

    /// Use a built-in preset (federation, single_grid, undersized)
    #[arg(long, value_name = "NAME")]
    pub preset: Option<String>,

    /// Override the random seed
    #[arg(long)]
    pub seed: Option<u64>,

    /// Override the number of simulated days
    #[arg(long)]
    pub days: Option<usize>,

    /// Write CSV logs into this directory
    #[arg(long, value_name = "DIR")]
    pub log_dir: Option<PathBuf>,

    /// Print the initial state of every grid as JSON before running
    #[arg(long, default_value_t = false)]
    pub initial_state: bool,

    /// Suppress per-hour output
    #[arg(long, short, default_value_t = false)]
    pub quiet: bool,
}

impl Cli {
    /// Preset used when no source is given.
    pub const DEFAULT_PRESET: &str = "federation";
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_overrides() {
        let cli = Cli::try_parse_from([
            "minigrid-sim",
            "--preset",
            "undersized",
            "--seed",
            "9",
            "--days",
            "2",
            "--quiet",
        ])
        .unwrap();
        assert_eq!(cli.preset.as_deref(), Some("undersized"));
        assert_eq!(cli.seed, Some(9));
        assert_eq!(cli.days, Some(2));
        assert!(cli.quiet);
        assert!(!cli.initial_state);
    }

    #[test]
    fn scenario_and_preset_are_exclusive() {
        let result = Cli::try_parse_from([
            "minigrid-sim",
            "--preset",
            "federation",
            "--scenario",
            "a.toml",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn rejects_bad_seed() {
        assert!(Cli::try_parse_from(["minigrid-sim", "--seed", "abc"]).is_err());
    }
}
