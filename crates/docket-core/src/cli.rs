use std::ffi::OsString;
use std::io::IsTerminal;
use std::path::PathBuf;

use anyhow::anyhow;
use clap::{ArgAction, Parser, ValueEnum};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::config::Config;

#[derive(Debug, Clone)]
pub struct PreprocessedArgs {
    pub cleaned_args: Vec<OsString>,
    pub rc_overrides: Vec<(String, String)>,
}

#[derive(Debug, Clone)]
pub struct KeyVal {
    pub key: String,
    pub value: String,
}

impl std::str::FromStr for KeyVal {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (k, v) = s
            .split_once('=')
            .ok_or_else(|| anyhow!("expected KEY=VALUE, got: {s}"))?;
        Ok(Self {
            key: k.trim().to_string(),
            value: v.trim().to_string(),
        })
    }
}

/// Which derived structure to print.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ViewKind {
    /// Week blocks of day blocks, with week markers.
    Weeks,
    /// Active work first, then dated, then undated tasks.
    Status,
    /// One row per task and context.
    Context,
    /// Tasks grouped by project.
    Project,
    /// Partition counts only.
    Summary,
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "docket",
    version,
    about = "Docket: calendar and status views over a task batch",
    disable_help_subcommand = true
)]
pub struct GlobalCli {
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    pub verbose: u8,

    #[arg(short = 'q', long = "quiet", action = ArgAction::Count)]
    pub quiet: u8,

    #[arg(
        long = "rc",
        value_parser = clap::builder::ValueParser::new(|s: &str| s.parse::<KeyVal>()),
        action = ArgAction::Append
    )]
    pub rc_overrides: Vec<KeyVal>,

    /// Path to the docketrc file.
    #[arg(long = "docketrc")]
    pub docketrc: Option<PathBuf>,

    /// Task batch file (JSON array or JSON lines).
    #[arg(long = "source")]
    pub source: Option<PathBuf>,

    /// Day the views are computed for: today, tomorrow, yesterday, a weekday
    /// name, YYYYMMDD or YYYY-MM-DD.
    #[arg(long = "as-of", default_value = "today")]
    pub as_of: String,

    /// Only tasks in this project (raw or without the .md suffix).
    #[arg(long)]
    pub project: Option<String>,

    /// Only tasks carrying this context.
    #[arg(long)]
    pub context: Option<String>,

    /// Toggle a status in or out of the selection. May be repeated.
    #[arg(long = "status")]
    pub statuses: Vec<String>,

    /// Add a marker row for the as-of day in the weeks view.
    #[arg(long)]
    pub today_marker: bool,

    #[arg(value_enum)]
    pub view: Option<ViewKind>,
}

pub fn init_tracing(verbose: u8, quiet: u8) -> anyhow::Result<()> {
    let default_level = match (quiet, verbose) {
        (q, _) if q >= 2 => "error",
        (1, _) => "warn",
        (_, v) if v >= 3 => "trace",
        (_, 2) => "debug",
        (_, 1) => "info",
        _ => "warn",
    };

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .map_err(|e| anyhow!("invalid RUST_LOG / log filter: {e}"))?;

    let init_result = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_level(true)
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .try_init();

    if let Err(err) = init_result {
        debug!(error = %err, "tracing subscriber already set, continuing");
    }

    Ok(())
}

/// Pulls positional `rc.key=value` / `rc.key:value` tokens out of the
/// argument list so clap never sees them.
#[tracing::instrument(skip_all)]
pub fn preprocess_args(raw: &[OsString]) -> anyhow::Result<PreprocessedArgs> {
    let mut cleaned = Vec::with_capacity(raw.len());
    let mut overrides: Vec<(String, String)> = Vec::new();

    let mut iter = raw.iter().cloned();
    if let Some(bin) = iter.next() {
        cleaned.push(bin);
    }

    for arg in iter {
        let parsed = arg
            .to_string_lossy()
            .strip_prefix("rc.")
            .and_then(|rest| rest.split_once('=').or_else(|| rest.split_once(':')))
            .map(|(k, v)| (format!("rc.{k}"), v.to_string()));

        match parsed {
            Some((k, v)) => {
                debug!(key = %k, value = %v, "captured positional rc override");
                overrides.push((k, v));
            }
            None => cleaned.push(arg),
        }
    }

    Ok(PreprocessedArgs {
        cleaned_args: cleaned,
        rc_overrides: overrides,
    })
}

/// The view named on the command line, else `default.view` from config.
pub fn resolve_view(cli: &GlobalCli, cfg: &Config) -> anyhow::Result<ViewKind> {
    if let Some(view) = cli.view {
        return Ok(view);
    }
    let raw = cfg
        .get("default.view")
        .unwrap_or_else(|| "weeks".to_string());
    ViewKind::from_str(&raw, true).map_err(|e| anyhow!("invalid default.view {raw:?}: {e}"))
}
