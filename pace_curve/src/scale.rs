//! GPS drift correction for cumulative distance streams.

use serde::{Deserialize, Serialize};

/// Relative deviation from the reported total that triggers a rescale.
pub const DEFAULT_SCALE_THRESHOLD: f64 = 0.01;

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ScaleOutcome {
    /// Every sample was multiplied by `scale`.
    Applied { scale: f64 },
    /// Stream already agrees with the reported total closely enough.
    WithinTolerance { scale: f64 },
    /// No samples to correct.
    SkippedEmpty,
    /// Reported total or final sample unusable (zero, negative, not finite).
    SkippedDegenerate,
}

impl ScaleOutcome {
    pub fn is_skipped(&self) -> bool {
        matches!(self, ScaleOutcome::SkippedEmpty | ScaleOutcome::SkippedDegenerate)
    }
}

/// `reported / distance[last]`, when both ends are usable.
pub fn scale_factor(distance: &[f64], reported_total_distance: f64) -> Option<f64> {
    let last = *distance.last()?;
    if !(last > 0.0) || !last.is_finite() {
        return None;
    }
    if !(reported_total_distance > 0.0) || !reported_total_distance.is_finite() {
        return None;
    }
    Some(reported_total_distance / last)
}

/// Rescales `distance` in place so it ends at `reported_total_distance`.
///
/// The data is only touched when `|scale - 1| > threshold`.
pub fn correct_distance(
    distance: &mut [f64],
    reported_total_distance: f64,
    threshold: f64,
) -> ScaleOutcome {
    if distance.is_empty() {
        return ScaleOutcome::SkippedEmpty;
    }
    let Some(scale) = scale_factor(distance, reported_total_distance) else {
        return ScaleOutcome::SkippedDegenerate;
    };
    if (scale - 1.0).abs() > threshold {
        for d in distance.iter_mut() {
            *d *= scale;
        }
        ScaleOutcome::Applied { scale }
    } else {
        ScaleOutcome::WithinTolerance { scale }
    }
}

/// Raises every sample to the running maximum so the series never decreases.
///
/// Returns how many samples were raised.
pub fn enforce_monotonic(distance: &mut [f64]) -> usize {
    let mut raised = 0;
    let mut high = f64::NEG_INFINITY;
    for d in distance.iter_mut() {
        if *d < high {
            *d = high;
            raised += 1;
        } else {
            high = *d;
        }
    }
    raised
}
