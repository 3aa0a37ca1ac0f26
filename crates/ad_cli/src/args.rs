//! Argument surface for `adspend`.
//!
//! Inputs are local files only: anything that looks like a URL is rejected
//! before loading, and every input must exist as a regular file.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use ad_core::variables::{RankScope, SortDirection, SortKey};
use ad_core::Level;
use clap::{ArgAction, Parser, Subcommand};

#[derive(Debug, Parser, Clone)]
#[command(
    name = "adspend",
    version,
    disable_help_subcommand = true,
    about = "Offline inspection of an ad-expense snapshot (Region / Branch / Centre)"
)]
pub struct Args {
    /// Hierarchy snapshot JSON (object with regions/branches/centres, or a bare Centre array).
    #[arg(long)]
    pub snapshot: PathBuf,
    /// Monthly records JSON (map by Centre id, or a flat list).
    #[arg(long)]
    pub monthly: Option<PathBuf>,
    /// Params JSON. Flags below override its values.
    #[arg(long)]
    pub params: Option<PathBuf>,

    /// Select an id before querying, as LEVEL=ID. Repeatable.
    #[arg(long = "select", value_name = "LEVEL=ID", value_parser = parse_scoped)]
    pub select: Vec<Scoped>,
    /// Search term for one level, as LEVEL=TERM. Repeatable.
    #[arg(long = "search", value_name = "LEVEL=TERM", value_parser = parse_scoped)]
    pub search: Vec<Scoped>,
    /// Drop selections hidden by higher-level choices before querying.
    #[arg(long)]
    pub prune: bool,

    /// Write canonical JSON to this file instead of stdout.
    #[arg(long)]
    pub out: Option<PathBuf>,
    /// Raise log verbosity on stderr (-v info, -vv debug). RUST_LOG wins when set.
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Load the inputs and report repairs and diagnostics.
    Check,
    /// Options a level currently offers, with selection flags.
    Options {
        #[arg(long, default_value = "centre", value_parser = parse_token::<Level>)]
        level: Level,
    },
    /// Aggregate metrics for one entity.
    Aggregates {
        #[arg(long, default_value = "centre", value_parser = parse_token::<Level>)]
        level: Level,
        id: String,
    },
    /// Ranked rows for the current scope.
    Rank {
        #[arg(long, default_value = "centre", value_parser = parse_token::<Level>)]
        level: Level,
        #[arg(long, value_parser = parse_token::<SortKey>)]
        sort: Option<SortKey>,
        #[arg(long, value_parser = parse_token::<SortDirection>)]
        direction: Option<SortDirection>,
        #[arg(long, value_parser = parse_token::<RankScope>)]
        scope: Option<RankScope>,
        #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
        top: Option<u32>,
    },
    /// Per-period chart series for one entity.
    Series {
        #[arg(long, default_value = "centre", value_parser = parse_token::<Level>)]
        level: Level,
        id: String,
    },
}

/// `LEVEL=VALUE` pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scoped {
    pub level: Level,
    pub value: String,
}

fn parse_token<T>(s: &str) -> Result<T, String>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    s.parse::<T>().map_err(|e| e.to_string())
}

pub fn parse_scoped(s: &str) -> Result<Scoped, String> {
    let (level, value) = s.split_once('=').ok_or_else(|| format!("expected LEVEL=VALUE, got {s:?}"))?;
    Ok(Scoped { level: parse_token(level)?, value: value.to_string() })
}

#[derive(Debug)]
pub enum CliError {
    NonLocalPath(String),
    NotFound(String),
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::NonLocalPath(p) => write!(f, "path must be a local file (no scheme): {p}"),
            CliError::NotFound(p) => write!(f, "file not found: {p}"),
        }
    }
}

impl std::error::Error for CliError {}

pub fn parse_and_validate() -> Result<Args, CliError> {
    let args = Args::parse();
    validate(&args)?;
    Ok(args)
}

fn validate(args: &Args) -> Result<(), CliError> {
    if let Some(out) = &args.out {
        ensure_local_path(out)?;
    }
    ensure_local_exists(&args.snapshot, "--snapshot")?;
    if let Some(m) = &args.monthly {
        ensure_local_exists(m, "--monthly")?;
    }
    if let Some(p) = &args.params {
        ensure_local_exists(p, "--params")?;
    }
    Ok(())
}

#[inline]
fn has_scheme(s: &str) -> bool {
    let lower = s.trim().to_ascii_lowercase();
    lower.contains("://") || lower.starts_with("http:") || lower.starts_with("https:") || lower.starts_with("file:")
}

fn ensure_local_path(p: &Path) -> Result<(), CliError> {
    match p.to_str() {
        Some(s) if has_scheme(s) => Err(CliError::NonLocalPath(s.to_string())),
        _ => Ok(()),
    }
}

fn ensure_local_exists(p: &Path, label: &'static str) -> Result<(), CliError> {
    ensure_local_path(p)?;
    match fs::metadata(p) {
        Ok(meta) if meta.is_file() => Ok(()),
        _ => Err(CliError::NotFound(format!("{label} {}", p.display()))),
    }
}
