//! Split engine applied across a whole activity history.
//!
//! Activities are independent: each one gets a private corrected copy of its
//! distance stream and fills only its own column. With the `parallel` feature
//! the columns are computed on the rayon pool; assembly is always by activity
//! index.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::matrix::SplitMatrix;
use crate::scale::{correct_distance, enforce_monotonic, ScaleOutcome};
use crate::source::{Activity, ActivityId};
use crate::split::{fastest_splits_into, Seconds, NO_SPLIT};
use crate::Params;

/// What to do with activities that produced no usable data.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum MissingPolicy {
    /// Keep a column of "no split" values.
    #[default]
    Record,
    /// Leave the activity out of the matrix.
    Exclude,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NoDataReason {
    Absent,
    Empty,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct NoDataEntry {
    pub activity_id: ActivityId,
    pub reason: NoDataReason,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct InvalidEntry {
    pub activity_id: ActivityId,
    pub message: String,
}

/// Per-run account of skipped activities and scale corrections.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct BatchDiagnostics {
    pub evaluated: usize,
    pub no_data: Vec<NoDataEntry>,
    pub invalid: Vec<InvalidEntry>,
    pub scale_applied: usize,
    pub scale_within_tolerance: usize,
    pub scale_skipped: usize,
    pub samples_clamped: usize,
}

impl BatchDiagnostics {
    pub fn failed(&self) -> usize {
        self.no_data.len() + self.invalid.len()
    }

    pub fn failed_ids(&self) -> impl Iterator<Item = &str> + '_ {
        self.no_data
            .iter()
            .map(|entry| entry.activity_id.as_str())
            .chain(self.invalid.iter().map(|entry| entry.activity_id.as_str()))
    }
}

#[derive(Clone, Debug)]
pub struct BatchResult {
    pub matrix: SplitMatrix,
    pub diagnostics: BatchDiagnostics,
}

#[derive(Debug)]
enum ColumnStatus {
    Evaluated { scale: ScaleOutcome, clamped: usize },
    NoData(NoDataReason),
    Invalid(String),
}

#[derive(Debug)]
struct Column {
    values: Vec<Seconds>,
    status: ColumnStatus,
}

/// Fastest split of every activity for every target distance.
pub fn evaluate_batch(activities: &[Activity], targets: &[f64], params: &Params) -> BatchResult {
    let columns = run_columns(activities, targets, params);

    let mut diagnostics = BatchDiagnostics::default();
    let mut kept = Vec::with_capacity(columns.len());
    for (activity, column) in activities.iter().zip(columns) {
        let id = activity.id();
        let usable = match column.status {
            ColumnStatus::Evaluated { scale, clamped } => {
                diagnostics.evaluated += 1;
                diagnostics.samples_clamped += clamped;
                match scale {
                    ScaleOutcome::Applied { scale } => {
                        debug!(activity = %id, scale, "distance stream rescaled");
                        diagnostics.scale_applied += 1;
                    }
                    ScaleOutcome::WithinTolerance { .. } => diagnostics.scale_within_tolerance += 1,
                    ScaleOutcome::SkippedEmpty | ScaleOutcome::SkippedDegenerate => {
                        debug!(activity = %id, ?scale, "scale correction skipped");
                        diagnostics.scale_skipped += 1;
                    }
                }
                true
            }
            ColumnStatus::NoData(reason) => {
                warn!(activity = %id, ?reason, "activity has no stream data");
                diagnostics.no_data.push(NoDataEntry {
                    activity_id: id.to_string(),
                    reason,
                });
                false
            }
            ColumnStatus::Invalid(message) => {
                warn!(activity = %id, "activity streams rejected: {message}");
                diagnostics.invalid.push(InvalidEntry {
                    activity_id: id.to_string(),
                    message,
                });
                false
            }
        };
        if usable || params.missing_policy == MissingPolicy::Record {
            kept.push((id.to_string(), column.values));
        }
    }

    BatchResult {
        matrix: SplitMatrix::from_columns(targets.to_vec(), kept),
        diagnostics,
    }
}

#[cfg(feature = "parallel")]
fn run_columns(activities: &[Activity], targets: &[f64], params: &Params) -> Vec<Column> {
    use rayon::prelude::*;

    if !params.parallel {
        return run_columns_serial(activities, targets, params);
    }
    activities
        .par_iter()
        .map_init(Vec::new, |scratch, activity| {
            evaluate_activity(activity, targets, params, scratch)
        })
        .collect()
}

#[cfg(not(feature = "parallel"))]
fn run_columns(activities: &[Activity], targets: &[f64], params: &Params) -> Vec<Column> {
    run_columns_serial(activities, targets, params)
}

fn run_columns_serial(activities: &[Activity], targets: &[f64], params: &Params) -> Vec<Column> {
    let mut scratch = Vec::new();
    activities
        .iter()
        .map(|activity| evaluate_activity(activity, targets, params, &mut scratch))
        .collect()
}

fn evaluate_activity(
    activity: &Activity,
    targets: &[f64],
    params: &Params,
    scratch: &mut Vec<f64>,
) -> Column {
    let mut values = vec![NO_SPLIT; targets.len()];
    if let Some(err) = activity.fetch_error.as_ref() {
        return Column {
            values,
            status: ColumnStatus::Invalid(format!("stream fetch failed: {err}")),
        };
    }
    let status = match activity.streams.as_ref() {
        None => ColumnStatus::NoData(NoDataReason::Absent),
        Some(streams) if streams.is_empty() => ColumnStatus::NoData(NoDataReason::Empty),
        Some(streams) => match streams.validate() {
            Err(err) => ColumnStatus::Invalid(err.to_string()),
            Ok(()) => {
                scratch.clear();
                scratch.extend_from_slice(&streams.distance);
                let clamped = if params.clamp_monotonic {
                    enforce_monotonic(scratch)
                } else {
                    0
                };
                let scale = correct_distance(
                    scratch,
                    activity.summary.reported_total_distance,
                    params.scale_threshold,
                );
                match fastest_splits_into(&streams.time, scratch, targets, &mut values) {
                    Ok(()) => ColumnStatus::Evaluated { scale, clamped },
                    Err(err) => ColumnStatus::Invalid(err.to_string()),
                }
            }
        },
    };
    Column { values, status }
}
