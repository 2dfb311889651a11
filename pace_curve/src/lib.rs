//! Fastest-split pace curves across an activity history.
//!
//! For each activity the split engine finds the quickest time in which every
//! target distance was covered; the batch evaluator does this for a whole
//! history in parallel, and the reducer keeps the best pace per distance.
//!
//! ```
//! use pace_curve::{compute_report, Activity, ActivitySummary, Params, Streams};
//!
//! let streams = Streams::new(vec![0, 300, 600, 900], vec![0.0, 1000.0, 2000.0, 3000.0]);
//! let activity = Activity::new(ActivitySummary::new("morning", 3000.0), Some(streams));
//! let report = compute_report(vec![activity], &Params::default()).unwrap();
//! assert!(report.best.leaderboard().count() > 0);
//! ```

use std::fmt::Write as _;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::{info, warn};

use crate::scale::scale_factor;
use crate::targets::MAX_GRID_POINTS;

pub mod batch;
pub mod best;
pub mod format;
pub mod ingest;
pub mod matrix;
pub mod scale;
pub mod source;
pub mod split;
pub mod targets;
pub mod units;

pub use batch::{evaluate_batch, BatchDiagnostics, BatchResult, MissingPolicy};
pub use best::{reduce_best_efforts, BestEffort, BestEffortCurve, BestEffortRow};
pub use format::{pace_to_string, seconds_to_string};
pub use ingest::{parse_activity, ParsedActivity};
pub use matrix::{PaceMatrix, SplitMatrix};
pub use scale::{correct_distance, ScaleOutcome, DEFAULT_SCALE_THRESHOLD};
pub use source::{
    collect_activities, Activity, ActivityId, ActivitySource, ActivitySummary, Streams,
};
pub use split::{fastest_split, fastest_splits, fastest_splits_into, Seconds, NO_SPLIT};
pub use targets::{build_target_distances, STANDARD_RACE_DISTANCES_MILES};
pub use units::DistanceUnit;

#[derive(Error, Debug)]
pub enum SplitError {
    #[error("time and distance streams differ in length ({time} vs {distance} samples)")]
    LengthMismatch { time: usize, distance: usize },
    #[error("output buffer holds {buffer} values but {targets} target distances were given")]
    BufferMismatch { buffer: usize, targets: usize },
    #[error("malformed stream: {0}")]
    MalformedStream(String),
    #[error("unsupported file format: {0}")]
    UnsupportedFormat(String),
    #[error("failed to parse FIT file: {0}")]
    FitParse(String),
    #[error("failed to parse GPX file: {0}")]
    GpxParse(String),
    #[error("failed to parse stream JSON: {0}")]
    JsonParse(String),
    #[error("insufficient data for split computation")]
    InsufficientData,
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
    #[error("activity source failed: {0}")]
    Source(String),
}

impl SplitError {
    /// Contract violations by the immediate caller (shape or buffer errors).
    pub fn is_invalid_input(&self) -> bool {
        matches!(
            self,
            SplitError::LengthMismatch { .. }
                | SplitError::BufferMismatch { .. }
                | SplitError::MalformedStream(_)
        )
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct Params {
    /// Unit paces are expressed in (minutes per unit).
    pub unit: DistanceUnit,
    /// Race distances always evaluated, in miles.
    pub interesting_miles: Vec<f64>,
    /// Spacing of the regular distance grid in miles; `0` disables it.
    pub grid_step_miles: f64,
    /// Caps the grid below the longest activity.
    pub max_grid_miles: Option<f64>,
    pub scale_threshold: f64,
    /// Clamp distance streams to their running maximum before searching.
    pub clamp_monotonic: bool,
    pub missing_policy: MissingPolicy,
    pub parallel: bool,
    /// Only evaluate these sport types (case-insensitive); empty keeps all.
    pub sport_types: Vec<String>,
}

impl Default for Params {
    fn default() -> Self {
        Self {
            unit: DistanceUnit::Miles,
            interesting_miles: STANDARD_RACE_DISTANCES_MILES.to_vec(),
            grid_step_miles: 0.5,
            max_grid_miles: None,
            scale_threshold: DEFAULT_SCALE_THRESHOLD,
            clamp_monotonic: false,
            missing_policy: MissingPolicy::Record,
            parallel: true,
            sport_types: Vec::new(),
        }
    }
}

impl Params {
    pub fn validate(&self) -> Result<(), SplitError> {
        if !self.scale_threshold.is_finite() || self.scale_threshold < 0.0 {
            return Err(SplitError::InvalidParameter(format!(
                "scale threshold must be a non-negative number, got {}",
                self.scale_threshold
            )));
        }
        if let Some(cap) = self.max_grid_miles {
            if !cap.is_finite() || cap <= 0.0 {
                return Err(SplitError::InvalidParameter(format!(
                    "max grid distance must be positive, got {cap}"
                )));
            }
        }
        Ok(())
    }

    /// SHA-256 over the serialized parameters.
    pub fn fingerprint(&self) -> Result<String, SplitError> {
        let bytes =
            serde_json::to_vec(self).map_err(|e| SplitError::InvalidParameter(e.to_string()))?;
        Ok(sha256_hex(&bytes))
    }

    fn keeps_sport(&self, sport: Option<&str>) -> bool {
        if self.sport_types.is_empty() {
            return true;
        }
        sport.is_some_and(|sport| {
            self.sport_types
                .iter()
                .any(|wanted| wanted.eq_ignore_ascii_case(sport))
        })
    }
}

/// Everything one run produces, ready for reporting.
#[derive(Clone, Debug)]
pub struct Report {
    pub params_hash: String,
    /// Every activity that passed the sport filter, in input order, including
    /// ones left out of the matrix by [`MissingPolicy::Exclude`].
    pub activities: Vec<ActivitySummary>,
    pub splits: SplitMatrix,
    pub paces: PaceMatrix,
    pub best: BestEffortCurve,
    pub diagnostics: BatchDiagnostics,
}

impl Report {
    pub fn summary(&self, id: &str) -> Option<&ActivitySummary> {
        self.activities.iter().find(|summary| summary.id == id)
    }

    /// Elapsed seconds behind a best effort row.
    pub fn best_elapsed(&self, row: usize) -> Option<Seconds> {
        let best = self.best.rows.get(row)?.best.as_ref()?;
        self.splits.get(row, best.activity_index)
    }

    pub fn document(&self) -> ReportDocument<'_> {
        let (rows, cols) = self.splits.shape();
        let splits = (0..rows)
            .map(|row| (0..cols).map(|col| self.splits.get(row, col)).collect())
            .collect();
        ReportDocument {
            params_hash: &self.params_hash,
            unit: self.best.unit,
            targets_m: self.splits.targets_m(),
            activity_ids: self.splits.activity_ids(),
            splits_s: splits,
            best: &self.best,
            diagnostics: &self.diagnostics,
            activities: &self.activities,
        }
    }
}

/// Serializable view of a [`Report`].
#[derive(Debug, Serialize)]
pub struct ReportDocument<'a> {
    pub params_hash: &'a str,
    pub unit: DistanceUnit,
    pub targets_m: &'a [f64],
    pub activity_ids: &'a [ActivityId],
    /// Row per target, column per activity; `null` where no split exists.
    pub splits_s: Vec<Vec<Option<Seconds>>>,
    pub best: &'a BestEffortCurve,
    pub diagnostics: &'a BatchDiagnostics,
    pub activities: &'a [ActivitySummary],
}

/// Compute split matrix, paces and best-effort curve for a set of activities.
pub fn compute_report(activities: Vec<Activity>, params: &Params) -> Result<Report, SplitError> {
    params.validate()?;

    let activities: Vec<Activity> = activities
        .into_iter()
        .filter(|a| params.keeps_sport(a.summary.sport_type.as_deref()))
        .collect();
    if activities.is_empty() {
        return Err(SplitError::InsufficientData);
    }

    let longest = activities
        .iter()
        .filter_map(|a| observed_distance(a, params))
        .fold(0.0, f64::max);
    let mut grid_max = match params.max_grid_miles {
        Some(cap) => units::miles_to_meters(cap).min(longest),
        None => longest,
    };
    let grid_limit = units::miles_to_meters(params.grid_step_miles * MAX_GRID_POINTS as f64);
    if params.grid_step_miles > 0.0 && grid_max > grid_limit {
        warn!(
            longest_m = grid_max,
            limit_m = grid_limit,
            "distance grid capped at {MAX_GRID_POINTS} points"
        );
        grid_max = grid_limit;
    }
    let targets =
        build_target_distances(&params.interesting_miles, params.grid_step_miles, grid_max)?;
    if targets.is_empty() {
        return Err(SplitError::InvalidParameter(
            "no target distances to evaluate".into(),
        ));
    }

    let BatchResult {
        matrix,
        diagnostics,
    } = evaluate_batch(&activities, &targets, params);
    let paces = matrix.pace_matrix(params.unit);
    let best = reduce_best_efforts(&paces);

    info!(
        activities = activities.len(),
        targets = targets.len(),
        failed = diagnostics.failed(),
        rescaled = diagnostics.scale_applied,
        "split batch finished"
    );

    Ok(Report {
        params_hash: params.fingerprint()?,
        activities: activities.into_iter().map(|a| a.summary).collect(),
        splits: matrix,
        paces,
        best,
        diagnostics,
    })
}

/// Farthest point of an activity's corrected stream, if it has a usable one.
fn observed_distance(activity: &Activity, params: &Params) -> Option<f64> {
    if activity.fetch_error.is_some() {
        return None;
    }
    let streams = activity.streams.as_ref()?;
    if streams.is_empty() || streams.validate().is_err() {
        return None;
    }
    let peak = streams.distance.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let last = if params.clamp_monotonic {
        peak
    } else {
        streams.final_distance()?
    };
    let scale = match scale_factor(&[last], activity.summary.reported_total_distance) {
        Some(scale) if (scale - 1.0).abs() > params.scale_threshold => scale,
        _ => 1.0,
    };
    Some(peak * scale).filter(|d| d.is_finite() && *d > 0.0)
}

fn sha256_hex(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    let mut out = String::with_capacity(digest.len() * 2);
    for b in digest {
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}
