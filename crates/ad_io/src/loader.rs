//! Loader: read local JSON inputs (snapshot, monthly records, params) into
//! the raw `ad_core` shapes. No network I/O.
//!
//! Whole-document problems (unreadable file, invalid JSON, wrong top-level
//! shape) are errors. A single bad element inside a list is skipped and
//! reported as a [`SkippedRow`], so one malformed record never hides the rest.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde_json::Value;

use ad_core::{
    raw::{RawMonthly, RawMonthlyRow, RawScalar, RawSnapshot},
    variables::Params,
    CentreId,
};

use crate::{IoError, IoResult};

/// Upper bound for any single input file.
pub const MAX_INPUT_BYTES: u64 = 16 * 1024 * 1024;

// ----------------------------- Public wire-facing types -----------------------------

/// A list element that could not be read.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SkippedRow {
    pub section: &'static str,
    pub position: usize,
    pub reason: String,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct SnapshotInput {
    pub snapshot: RawSnapshot,
    pub skipped: Vec<SkippedRow>,
}

/// Monthly rows grouped by Centre, in file order per Centre.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MonthlyInput {
    pub by_centre: BTreeMap<CentreId, Vec<RawMonthly>>,
    pub skipped: Vec<SkippedRow>,
}

// ----------------------------- Reading -----------------------------

pub fn read_json_value(path: &Path) -> IoResult<Value> {
    let f = File::open(path).map_err(|e| IoError::Path(format!("{} ({e})", path.display())))?;
    let mut buf = Vec::new();
    f.take(MAX_INPUT_BYTES + 1)
        .read_to_end(&mut buf)
        .map_err(|e| IoError::Path(format!("{} ({e})", path.display())))?;
    if buf.len() as u64 > MAX_INPUT_BYTES {
        return Err(IoError::TooLarge { path: path.display().to_string(), limit: MAX_INPUT_BYTES });
    }
    serde_json::from_slice(&buf)
        .map_err(|e| IoError::Json { pointer: "/".into(), msg: format!("{}: {e}", path.display()) })
}

fn shape_error(pointer: &str, msg: &str) -> IoError {
    IoError::Json { pointer: pointer.to_string(), msg: msg.to_string() }
}

fn skip(skipped: &mut Vec<SkippedRow>, section: &'static str, position: usize, reason: String) {
    tracing::warn!(section, position, reason = %reason, "skipping malformed record");
    skipped.push(SkippedRow { section, position, reason });
}

/// Deserialize each array element on its own; `null` reads as empty.
fn lenient_list<T: DeserializeOwned>(
    section: &'static str,
    v: Value,
    skipped: &mut Vec<SkippedRow>,
) -> IoResult<Vec<(usize, T)>> {
    let items = match v {
        Value::Null => return Ok(Vec::new()),
        Value::Array(items) => items,
        _ => return Err(shape_error(&format!("/{section}"), "expected an array")),
    };
    let mut out = Vec::with_capacity(items.len());
    for (position, item) in items.into_iter().enumerate() {
        match serde_json::from_value::<T>(item) {
            Ok(t) => out.push((position, t)),
            Err(e) => skip(skipped, section, position, e.to_string()),
        }
    }
    Ok(out)
}

fn values<T>(rows: Vec<(usize, T)>) -> Vec<T> {
    rows.into_iter().map(|(_, t)| t).collect()
}

// ----------------------------- Snapshot -----------------------------

/// Accepts a bare array of Centres, or an object with any of `regions`,
/// `branches`, `centres` (alias `centers`).
pub fn snapshot_from_value(v: Value) -> IoResult<SnapshotInput> {
    let mut skipped = Vec::new();
    let snapshot = match v {
        Value::Array(_) => RawSnapshot::from_centres(values(lenient_list("centres", v, &mut skipped)?)),
        Value::Object(mut map) => {
            let regions = map.remove("regions");
            let branches = map.remove("branches");
            let centres = map.remove("centres").or_else(|| map.remove("centers"));
            if regions.is_none() && branches.is_none() && centres.is_none() {
                return Err(shape_error("/", "expected `centres`, `regions` or `branches`"));
            }
            let regions = values(lenient_list("regions", regions.unwrap_or(Value::Null), &mut skipped)?);
            let branches = values(lenient_list("branches", branches.unwrap_or(Value::Null), &mut skipped)?);
            let centres = values(lenient_list("centres", centres.unwrap_or(Value::Null), &mut skipped)?);
            RawSnapshot { regions, branches, centres }
        }
        _ => return Err(shape_error("/", "expected an array of centres or a snapshot object")),
    };
    tracing::debug!(
        regions = snapshot.regions.len(),
        branches = snapshot.branches.len(),
        centres = snapshot.centres.len(),
        skipped = skipped.len(),
        "snapshot loaded"
    );
    Ok(SnapshotInput { snapshot, skipped })
}

pub fn load_snapshot(path: &Path) -> IoResult<SnapshotInput> {
    snapshot_from_value(read_json_value(path)?)
}

// ----------------------------- Monthly records -----------------------------

/// Accepts `{ "<centreId>": [records] }` or a flat list of
/// `{ centreId, period, adExpenseTotal, businessTotal }`.
pub fn monthly_from_value(v: Value) -> IoResult<MonthlyInput> {
    let mut out = MonthlyInput::default();
    match v {
        Value::Object(map) => {
            for (position, (key, rows)) in map.into_iter().enumerate() {
                let Ok(id) = key.parse::<CentreId>() else {
                    skip(&mut out.skipped, "monthly", position, format!("invalid centre id `{key}`"));
                    continue;
                };
                match lenient_list::<RawMonthly>("monthly", rows, &mut out.skipped) {
                    Ok(recs) => out.by_centre.entry(id).or_default().extend(values(recs)),
                    Err(e) => skip(&mut out.skipped, "monthly", position, e.to_string()),
                }
            }
        }
        Value::Array(_) => {
            for (position, row) in lenient_list::<RawMonthlyRow>("monthly", v, &mut out.skipped)? {
                let id = row
                    .centre_id
                    .as_ref()
                    .and_then(RawScalar::canonical)
                    .and_then(|s| s.parse::<CentreId>().ok());
                match id {
                    Some(id) => out.by_centre.entry(id).or_default().push(row.record),
                    None => skip(&mut out.skipped, "monthly", position, "missing centreId".to_string()),
                }
            }
        }
        _ => return Err(shape_error("/", "expected a centre→records map or a list of records")),
    }
    Ok(out)
}

pub fn load_monthly(path: &Path) -> IoResult<MonthlyInput> {
    monthly_from_value(read_json_value(path)?)
}

// ----------------------------- Params -----------------------------

pub fn params_from_value(v: Value) -> IoResult<Params> {
    let ps: Params = serde_json::from_value(v)?;
    ps.validate_domains()?;
    Ok(ps)
}

pub fn load_params(path: &Path) -> IoResult<Params> {
    params_from_value(read_json_value(path)?)
}
