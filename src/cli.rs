use std::{path::PathBuf, time::Duration};

use anyhow::{Context, Result};
use clap::Parser;

use crate::types::{
    Config, DEFAULT_BASE_LABEL, DEFAULT_INPUT_DIR, DisplayMode, ResolverConfig,
};

const BUILD_INFO_HUMAN: &str = env!("BUILD_INFO_HUMAN");

#[derive(Parser, Default, Debug)]
#[command(
    name = "prdups",
    about = "Find duplicate and already-satisfied package update PRs in a nixpkgs PR dump"
)]
#[command(long_version = BUILD_INFO_HUMAN)]
struct CliArgs {
    /// Path to the nixpkgs checkout used to look up current versions
    #[arg(long, env = "NIXPKGS_PATH", value_name = "PATH")]
    pub nixpkgs: PathBuf,

    /// Directory containing JSON dumps of pull requests
    #[arg(short = 'i', long, default_value = DEFAULT_INPUT_DIR, value_name = "DIR")]
    pub input: PathBuf,

    /// Only consider PRs whose base has this label
    #[arg(long = "base-label", default_value = DEFAULT_BASE_LABEL, value_name = "LABEL")]
    pub base_label: String,

    /// Maximum number of concurrent version lookups
    #[arg(short = 'j', long, default_value = "4", value_name = "NUM")]
    pub jobs: usize,

    /// Give up on a single version lookup after this long (e.g. 30, 30s, 2m; unitless implies seconds)
    #[arg(long, default_value = "30s", value_name = "DURATION")]
    pub timeout: String,

    /// Program used to evaluate nixpkgs attributes
    #[arg(long = "nix", default_value = "nix", value_name = "PROGRAM")]
    pub nix_program: String,

    /// Print the URLs of reported PRs only
    #[arg(short = 'q', long)]
    pub quiet: bool,
}

impl CliArgs {
    pub fn validate(&self) -> Result<()> {
        if self.base_label.trim().is_empty() {
            anyhow::bail!("--base-label must not be empty");
        }

        if self.nix_program.trim().is_empty() {
            anyhow::bail!("--nix must not be empty");
        }

        Ok(())
    }
}

fn parse_timeout(timeout_str: &str) -> Result<Duration> {
    let timeout_str = timeout_str.trim();

    if let Ok(seconds) = timeout_str.parse::<u64>() {
        return Ok(Duration::from_secs(seconds));
    }

    if let Some(millis_str) = timeout_str.strip_suffix("ms") {
        let millis: u64 = millis_str
            .parse()
            .with_context(|| format!("Invalid timeout milliseconds: '{}'", millis_str))?;
        return Ok(Duration::from_millis(millis));
    }

    if let Some(seconds_str) = timeout_str.strip_suffix('s') {
        let seconds: u64 = seconds_str
            .parse()
            .with_context(|| format!("Invalid timeout seconds: '{}'", seconds_str))?;
        return Ok(Duration::from_secs(seconds));
    }

    if let Some(minutes_str) = timeout_str.strip_suffix('m') {
        let minutes: u64 = minutes_str
            .parse()
            .with_context(|| format!("Invalid timeout minutes: '{}'", minutes_str))?;
        let seconds = minutes
            .checked_mul(60)
            .with_context(|| format!("Timeout too large: '{}'", timeout_str))?;
        return Ok(Duration::from_secs(seconds));
    }

    anyhow::bail!(
        "Invalid timeout format '{}'. Supported formats: unitless number (seconds), '500ms', '30s', '2m'",
        timeout_str
    )
}

fn determine_display_mode(cli: &CliArgs) -> DisplayMode {
    if cli.quiet {
        DisplayMode::Quiet
    } else {
        DisplayMode::Normal
    }
}

fn create_config(cli: CliArgs) -> Result<Config> {
    cli.validate()?;

    let timeout = parse_timeout(&cli.timeout)?;
    if timeout.is_zero() {
        anyhow::bail!("--timeout must be greater than zero");
    }

    let config = Config {
        input_dir: cli.input,
        base_label: cli.base_label,
        jobs: cli.jobs,
        resolver: ResolverConfig {
            nixpkgs_path: cli.nixpkgs,
            program: cli.nix_program,
            timeout,
        },
    };
    config.validate()?;

    Ok(config)
}

/// Parses command-line arguments into a run configuration and display mode.
///
/// Rejects the invocation if the nixpkgs path does not exist, before any
/// input is read.
pub fn parse_args<I, T>(args: I) -> Result<(Config, DisplayMode)>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    let cli = CliArgs::try_parse_from(args)?;
    let display_mode = determine_display_mode(&cli);
    let config = create_config(cli)?;
    Ok((config, display_mode))
}
