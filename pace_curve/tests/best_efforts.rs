//! End-to-end tests: streams in, best-effort curve out.

use std::collections::HashMap;
use std::io;

use pace_curve::batch::NoDataReason;
use pace_curve::{
    collect_activities, compute_report, evaluate_batch, pace_to_string, reduce_best_efforts,
    Activity, ActivitySource, ActivitySummary, DistanceUnit, MissingPolicy, Params, Streams,
    NO_SPLIT,
};

const MILE_M: f64 = 1609.34;

fn activity(id: &str, time: Vec<i64>, distance: Vec<f64>) -> Activity {
    let total = *distance.last().unwrap();
    Activity::new(ActivitySummary::new(id, total), Some(Streams::new(time, distance)))
}

fn three_runs() -> Vec<Activity> {
    vec![
        activity("A", vec![0, 300, 1200], vec![0.0, MILE_M, 5000.0]),
        activity("B", vec![0, 400, 800], vec![0.0, MILE_M, 2.0 * MILE_M]),
        activity("C", vec![0, 280, 600], vec![0.0, MILE_M, 3000.0]),
    ]
}

#[test]
fn test_three_activity_leaderboard() {
    let targets = [MILE_M, 5000.0];
    let batch = evaluate_batch(&three_runs(), &targets, &Params::default());
    let matrix = &batch.matrix;

    assert_eq!(matrix.row(0).to_vec(), vec![300, 400, 280]);
    assert_eq!(matrix.row(1).to_vec(), vec![1200, NO_SPLIT, NO_SPLIT]);

    let curve = reduce_best_efforts(&matrix.pace_matrix(DistanceUnit::Kilometers));
    let mile = curve.rows[0].best.as_ref().unwrap();
    assert_eq!(mile.activity_id, "C");
    assert_eq!(matrix.get(0, mile.activity_index), Some(280));

    let five_k = curve.rows[1].best.as_ref().unwrap();
    assert_eq!(five_k.activity_id, "A");
    assert_eq!(matrix.get(1, five_k.activity_index), Some(1200));
    assert_eq!(pace_to_string(five_k.pace), "4:00");
}

#[test]
fn test_report_marks_uncovered_distances() {
    let params = Params {
        interesting_miles: vec![1.0, 26.21875],
        grid_step_miles: 0.0,
        ..Params::default()
    };
    let report = compute_report(three_runs(), &params).unwrap();

    assert_eq!(report.best.rows.len(), 2);
    assert!(report.best.rows[0].best.is_some());
    assert!(report.best.rows[1].best.is_none());
    assert_eq!(report.best.missing().count(), 1);
    assert_eq!(report.best_elapsed(1), None);

    let doc = serde_json::to_value(report.document()).unwrap();
    assert_eq!(doc["best"]["rows"][1]["best"], serde_json::Value::Null);
    assert_eq!(doc["splits_s"][1][0], serde_json::Value::Null);
}

#[test]
fn test_fetched_streams_are_not_mutated() {
    // Stream under-reads by 10%; metadata is authoritative.
    let mut summary = ActivitySummary::new("drifty", 5000.0);
    summary.name = Some("Parkrun".into());
    let streams = Streams::new(vec![0, 600, 1200], vec![0.0, 2250.0, 4500.0]);
    let activities = vec![Activity::new(summary, Some(streams.clone()))];

    let batch = evaluate_batch(&activities, &[5000.0], &Params::default());
    assert_eq!(batch.matrix.get(0, 0), Some(1200));
    assert_eq!(activities[0].streams.as_ref(), Some(&streams));
}

#[derive(Default)]
struct MemorySource {
    summaries: Vec<ActivitySummary>,
    streams: HashMap<String, Option<Streams>>,
}

impl ActivitySource for MemorySource {
    type Error = io::Error;

    fn list_activities(&self) -> Result<Vec<ActivitySummary>, Self::Error> {
        Ok(self.summaries.clone())
    }

    fn streams(&self, id: &str) -> Result<Option<Streams>, Self::Error> {
        self.streams
            .get(id)
            .cloned()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, format!("no streams for {id}")))
    }
}

#[test]
fn test_source_failures_are_reported_apart_from_absent_streams() {
    let mut source = MemorySource::default();
    for run in three_runs() {
        source.summaries.push(run.summary.clone());
        source.streams.insert(run.summary.id.clone(), run.streams);
    }
    source.summaries.push(ActivitySummary::new("deleted", 10_000.0));
    source.summaries.push(ActivitySummary::new("manual", 8000.0));
    source.streams.insert("manual".into(), None);

    let activities = collect_activities(&source).unwrap();
    assert_eq!(activities.len(), 5);
    assert!(activities[3].fetch_error.is_some());
    assert!(activities[4].fetch_error.is_none());

    let params = Params {
        missing_policy: MissingPolicy::Exclude,
        ..Params::default()
    };
    let report = compute_report(activities, &params).unwrap();
    assert_eq!(report.splits.activity_ids(), ["A", "B", "C"]);
    // Excluded from the matrix, still listed with their metadata.
    assert_eq!(report.activities.len(), 5);
    assert!(report.summary("manual").is_some());

    let diagnostics = &report.diagnostics;
    assert_eq!(diagnostics.no_data.len(), 1);
    assert_eq!(diagnostics.no_data[0].activity_id, "manual");
    assert_eq!(diagnostics.no_data[0].reason, NoDataReason::Absent);
    assert_eq!(diagnostics.invalid.len(), 1);
    assert_eq!(diagnostics.invalid[0].activity_id, "deleted");
    assert!(diagnostics.invalid[0].message.contains("no streams for deleted"));
}

#[test]
fn test_zero_and_negative_targets_have_no_split() {
    let batch = evaluate_batch(&three_runs(), &[0.0, -100.0], &Params::default());
    assert!(batch.matrix.row(0).iter().all(|&v| v == NO_SPLIT));
    assert!(batch.matrix.row(1).iter().all(|&v| v == NO_SPLIT));
    let curve = reduce_best_efforts(&batch.matrix.pace_matrix(DistanceUnit::Miles));
    assert_eq!(curve.leaderboard().count(), 0);
}
