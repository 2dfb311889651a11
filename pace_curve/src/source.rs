//! Activity records and the contract for whatever fetches them.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value as JsonValue;
use tracing::warn;

use crate::split::Seconds;
use crate::SplitError;

pub type ActivityId = String;

/// Per-sample elapsed time (seconds) and cumulative distance (meters).
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct Streams {
    pub time: Vec<Seconds>,
    pub distance: Vec<f64>,
}

impl Streams {
    pub fn new(time: Vec<Seconds>, distance: Vec<f64>) -> Self {
        Self { time, distance }
    }

    pub fn len(&self) -> usize {
        self.time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_empty() && self.distance.is_empty()
    }

    /// Checks the shape contract the split engine relies on.
    pub fn validate(&self) -> Result<(), SplitError> {
        if self.time.len() != self.distance.len() {
            return Err(SplitError::LengthMismatch {
                time: self.time.len(),
                distance: self.distance.len(),
            });
        }
        if let Some(idx) = self.distance.iter().position(|d| !d.is_finite()) {
            return Err(SplitError::MalformedStream(format!(
                "distance sample {idx} is not finite"
            )));
        }
        Ok(())
    }

    /// Number of samples where distance drops below an earlier sample.
    pub fn monotonic_violations(&self) -> usize {
        let mut high = f64::NEG_INFINITY;
        let mut violations = 0;
        for &d in &self.distance {
            if d < high {
                violations += 1;
            } else {
                high = d;
            }
        }
        violations
    }

    pub fn span_s(&self) -> Seconds {
        match (self.time.first(), self.time.last()) {
            (Some(start), Some(end)) => end - start,
            _ => 0,
        }
    }

    pub fn final_distance(&self) -> Option<f64> {
        self.distance.last().copied()
    }
}

/// Activity metadata as listed by the source.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ActivitySummary {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: ActivityId,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub start_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub sport_type: Option<String>,
    /// Total distance reported by the activity metadata (meters).
    #[serde(alias = "distance")]
    pub reported_total_distance: f64,
    /// Anything else the source provided; handed to reporting untouched.
    #[serde(flatten)]
    pub extra: BTreeMap<String, JsonValue>,
}

impl ActivitySummary {
    pub fn new(id: impl Into<ActivityId>, reported_total_distance: f64) -> Self {
        Self {
            id: id.into(),
            name: None,
            start_date: None,
            sport_type: None,
            reported_total_distance,
            extra: BTreeMap::new(),
        }
    }
}

// Listings carry numeric ids; files and tests use strings.
fn deserialize_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<ActivityId, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Number(u64),
    }

    Ok(match RawId::deserialize(deserializer)? {
        RawId::Text(text) => text,
        RawId::Number(number) => number.to_string(),
    })
}

#[derive(Clone, Debug)]
pub struct Activity {
    pub summary: ActivitySummary,
    /// `None` when the source had no streams for this activity.
    pub streams: Option<Streams>,
    /// Set when the source failed to deliver streams; kept apart from "absent".
    pub fetch_error: Option<String>,
}

impl Activity {
    pub fn new(summary: ActivitySummary, streams: Option<Streams>) -> Self {
        Self {
            summary,
            streams,
            fetch_error: None,
        }
    }

    /// An activity whose streams could not be fetched or decoded.
    pub fn fetch_failed(summary: ActivitySummary, error: impl Into<String>) -> Self {
        Self {
            summary,
            streams: None,
            fetch_error: Some(error.into()),
        }
    }

    pub fn id(&self) -> &str {
        &self.summary.id
    }
}

/// Supplier of activity listings and their streams.
pub trait ActivitySource {
    type Error: std::error::Error + Send + Sync + 'static;

    fn list_activities(&self) -> Result<Vec<ActivitySummary>, Self::Error>;

    /// `Ok(None)` means the activity has no recorded streams.
    fn streams(&self, id: &str) -> Result<Option<Streams>, Self::Error>;
}

/// Pulls every listed activity and its streams out of `source`.
///
/// A listing failure aborts; a failed stream fetch is kept on that activity
/// and reported as invalid by the batch.
pub fn collect_activities<S: ActivitySource>(source: &S) -> Result<Vec<Activity>, SplitError> {
    let summaries = source
        .list_activities()
        .map_err(|e| SplitError::Source(e.to_string()))?;

    let activities = summaries
        .into_iter()
        .map(|summary| {
            match source.streams(&summary.id) {
                Ok(streams) => Activity::new(summary, streams),
                Err(err) => {
                    warn!(activity = %summary.id, "stream fetch failed: {err}");
                    Activity::fetch_failed(summary, err.to_string())
                }
            }
        })
        .collect();
    Ok(activities)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate() {
        assert!(Streams::new(vec![0, 1], vec![0.0, 1.0]).validate().is_ok());
        assert!(matches!(
            Streams::new(vec![0, 1], vec![0.0]).validate(),
            Err(SplitError::LengthMismatch { .. })
        ));
        assert!(matches!(
            Streams::new(vec![0, 1], vec![0.0, f64::NAN]).validate(),
            Err(SplitError::MalformedStream(_))
        ));
    }

    #[test]
    fn test_monotonic_violations() {
        let streams = Streams::new(vec![0, 1, 2, 3], vec![0.0, 5.0, 4.0, 6.0]);
        assert_eq!(streams.monotonic_violations(), 1);
        assert_eq!(streams.span_s(), 3);
    }

    #[test]
    fn test_summary_from_strava_listing() {
        let json = r#"{
            "id": 9001,
            "name": "Lunch Run",
            "type": "Run",
            "sport_type": "Run",
            "distance": 5012.3,
            "start_date": "2024-05-01T12:00:00Z",
            "moving_time": 1500
        }"#;
        let summary: ActivitySummary = serde_json::from_str(json).unwrap();
        assert_eq!(summary.id, "9001");
        assert_eq!(summary.sport_type.as_deref(), Some("Run"));
        assert_eq!(summary.reported_total_distance, 5012.3);
        assert_eq!(summary.extra.get("moving_time"), Some(&JsonValue::from(1500)));
        assert_eq!(summary.extra.get("type"), Some(&JsonValue::from("Run")));
    }
}
