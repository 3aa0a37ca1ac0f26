//! `adspend`: load a snapshot, apply selections, print one query as JSON.
//!
//! stdout carries only the JSON result; diagnostics go to stderr through
//! `tracing`.

mod args;

mod exitcodes {
    pub const OK: u8 = 0;
    /// Usage errors, unreadable JSON, out-of-domain params.
    pub const VALIDATION: u8 = 2;
    pub const IO: u8 = 4;
}

use std::fmt;
use std::io::{self, Write};
use std::process::ExitCode;

use serde::Serialize;
use serde_json::{json, Value};
use tracing_subscriber::EnvFilter;

use ad_core::rounding::{format_one_decimal, format_percent_one_decimal};
use ad_io::canonical_json;
use ad_pipeline::{load_dashboard, Dashboard, LoadReport, PipelineError};

use args::{Args, Command};

#[derive(Debug)]
enum MainError {
    Validation(String),
    Io(String),
}

impl fmt::Display for MainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MainError::Validation(m) => write!(f, "{m}"),
            MainError::Io(m) => write!(f, "{m}"),
        }
    }
}

impl From<PipelineError> for MainError {
    fn from(e: PipelineError) -> Self {
        match e {
            PipelineError::Io(m) => MainError::Io(m),
            PipelineError::Input(m) | PipelineError::Token(m) => MainError::Validation(m),
        }
    }
}

impl From<ad_io::IoError> for MainError {
    fn from(e: ad_io::IoError) -> Self {
        PipelineError::from(e).into()
    }
}

fn main() -> ExitCode {
    let args = match args::parse_and_validate() {
        Ok(a) => a,
        Err(e) => {
            eprintln!("adspend: error: {e}");
            return ExitCode::from(exitcodes::VALIDATION);
        }
    };
    init_tracing(args.verbose);

    match run(&args) {
        Ok(()) => ExitCode::from(exitcodes::OK),
        Err(e) => {
            eprintln!("adspend: error: {e}");
            ExitCode::from(map_error(&e))
        }
    }
}

fn map_error(e: &MainError) -> u8 {
    match e {
        MainError::Validation(_) => exitcodes::VALIDATION,
        MainError::Io(_) => exitcodes::IO,
    }
}

fn init_tracing(verbose: u8) {
    let fallback = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    let _ = tracing_subscriber::fmt().with_writer(io::stderr).with_env_filter(filter).with_target(false).try_init();
}

fn run(args: &Args) -> Result<(), MainError> {
    let (mut dash, report) = load_dashboard(&args.snapshot, args.monthly.as_deref(), args.params.as_deref())?;
    apply_overrides(&mut dash, args)?;
    prepare(&mut dash, args);

    let out = match &args.command {
        Command::Check => check(&dash, &report),
        Command::Options { level } => json!({
            "level": level,
            "options": dash.available_options(*level),
            "outOfScope": dash.out_of_scope(),
        }),
        Command::Aggregates { level, id } => {
            let m = dash.level_aggregates(*level, id);
            json!({
                "level": level,
                "id": id,
                "metrics": m.rounded_for_display(),
                "classification": m.classification(),
                "display": {
                    "adPercentage": format_percent_one_decimal(m.ad_percentage),
                    "roi": format_one_decimal(m.roi),
                    "performanceScore": format_one_decimal(m.performance_score),
                },
            })
        }
        Command::Rank { level, sort, direction, .. } => {
            let p = dash.params();
            let key = sort.unwrap_or(p.default_sort_key);
            let dir = direction.unwrap_or(p.default_direction);
            let rows: Vec<Value> = dash
                .ranked_at(*level, key, dir)
                .into_iter()
                .map(|e| {
                    json!({
                        "position": e.position,
                        "id": e.id,
                        "name": e.name,
                        "metrics": e.metrics.rounded_for_display(),
                        "classification": e.classification,
                    })
                })
                .collect();
            json!({ "level": level, "sortKey": key, "direction": dir, "rows": rows })
        }
        Command::Series { level, id } => json!({
            "level": level,
            "id": id,
            "periods": dash.series(*level, id),
        }),
    };
    emit(args, &out)
}

/// Flag values win over the params file.
fn apply_overrides(dash: &mut Dashboard, args: &Args) -> Result<(), MainError> {
    let Command::Rank { scope, top, .. } = &args.command else {
        return Ok(());
    };
    let mut params = dash.params().clone();
    if let Some(s) = scope {
        params.rank_scope = *s;
    }
    if top.is_some() {
        params.top_n = *top;
    }
    params.validate_domains().map_err(|e| MainError::Validation(e.to_string()))?;
    dash.set_params(params);
    Ok(())
}

/// Replay `--search`, then `--select` in the order given, then the optional prune.
fn prepare(dash: &mut Dashboard, args: &Args) {
    for s in &args.search {
        dash.set_search(s.level, &s.value);
    }
    for s in &args.select {
        if !dash.mutate_selection(s.level, &[s.value.as_str()], ad_algo::SelectionOp::Add) {
            tracing::warn!(level = %s.level, id = %s.value, "selection ignored (unknown or already selected)");
        }
    }
    if args.prune {
        let dropped = dash.prune_out_of_scope();
        if !dropped.is_empty() {
            tracing::info!(branches = dropped.branches.len(), centres = dropped.centres.len(), "pruned");
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SkippedJson<'a> {
    section: &'a str,
    position: usize,
    reason: &'a str,
}

fn check(dash: &Dashboard, report: &LoadReport) -> Value {
    let skipped: Vec<SkippedJson<'_>> = report
        .skipped
        .iter()
        .map(|s| SkippedJson { section: s.section, position: s.position, reason: &s.reason })
        .collect();
    let index = dash.index();
    json!({
        "clean": report.is_clean(),
        "counts": {
            "regions": index.regions().len(),
            "branches": index.branches().len(),
            "centres": index.centres().len(),
            "incomplete": index.incomplete_centres().count(),
        },
        "skipped": skipped,
        "issues": dash.issues(),
        "seriesIssues": dash.series_issues(),
    })
}

fn emit(args: &Args, v: &Value) -> Result<(), MainError> {
    if let Some(path) = &args.out {
        canonical_json::write_canonical_file(path, v)?;
        tracing::info!(path = %path.display(), "result written");
        return Ok(());
    }
    let text = canonical_json::to_canonical_string(v)?;
    let mut stdout = io::stdout().lock();
    writeln!(stdout, "{text}").map_err(|e| MainError::Io(format!("stdout: {e}")))
}
