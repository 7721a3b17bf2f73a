use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use tracing::level_filters::LevelFilter;

use metacache_service::config::Config;

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Outputs the totals as JSON.
    Json,
    /// Outputs the totals as a table.
    Compact,
}

/// Sums up the sizes of files and directory trees.
///
/// Directories are walked breadth first. Files that cannot be read are skipped and reported in
/// the logs, the totals cover everything else.
#[derive(Clone, Parser, Debug)]
#[command(author, version, about, long_about)]
struct Cli {
    /// The files and directories to sum up.
    #[arg(required = true, value_name = "PATH")]
    paths: Vec<PathBuf>,

    /// Path to a YAML configuration file.
    #[arg(long, short, value_name = "FILE")]
    config: Option<PathBuf>,

    /// The output format.
    #[arg(long, value_enum, default_value = "compact")]
    format: OutputFormat,

    /// The severity level of logging output.
    ///
    /// Possible values:
    /// off, error, warn, info, debug, trace
    ///
    /// Overrides the level of the configuration file.
    #[arg(long, value_name = "LEVEL")]
    log_level: Option<LevelFilter>,

    /// The property to sum up.
    #[arg(long)]
    property: Option<String>,

    /// How many files may be read at the same time.
    #[arg(long, value_name = "N")]
    max_concurrent_loads: Option<usize>,
}

#[derive(Clone, Debug)]
pub struct Settings {
    pub paths: Vec<PathBuf>,
    pub config: Config,
    pub output_format: OutputFormat,
}

impl Settings {
    pub fn get() -> Result<Self> {
        let cli = Cli::parse();
        let mut config = Config::get(cli.config.as_deref()).context("failed loading config")?;

        if let Some(level) = cli.log_level {
            config.logging.level = level;
        }
        if let Some(property) = cli.property {
            config.aggregation.property = property;
        }
        if let Some(max) = cli.max_concurrent_loads {
            anyhow::ensure!(max > 0, "--max-concurrent-loads must be at least 1");
            config.aggregation.max_concurrent_loads = max;
        }

        Ok(Settings {
            paths: cli.paths,
            config,
            output_format: cli.format,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overrides() {
        let cli = Cli::try_parse_from([
            "metacli",
            "--format",
            "json",
            "--log-level",
            "debug",
            "--property",
            "blocks",
            "a",
            "b",
        ])
        .unwrap();

        assert_eq!(cli.paths, [PathBuf::from("a"), PathBuf::from("b")]);
        assert_eq!(cli.format, OutputFormat::Json);
        assert_eq!(cli.log_level, Some(LevelFilter::DEBUG));
        assert_eq!(cli.property.as_deref(), Some("blocks"));
        assert_eq!(cli.max_concurrent_loads, None);
    }

    #[test]
    fn test_paths_required() {
        assert!(Cli::try_parse_from(["metacli"]).is_err());
    }
}
