use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

use anyhow::{Context, Result};
use pace_curve::{pace_to_string, seconds_to_string, Report};

/// Opens `path` for writing, or stdout when the path is `-`.
fn open_output(path: &Path) -> Result<Box<dyn Write>> {
    if path.as_os_str() == "-" {
        Ok(Box::new(io::stdout().lock()))
    } else {
        let file =
            File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
        Ok(Box::new(file))
    }
}

/// One row per target distance with the best effort, or `no data`.
pub fn write_leaderboard(report: &Report, path: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_writer(open_output(path)?);
    let unit = report.best.unit;
    let distance_col = format!("distance_{}", unit.label());
    let pace_col = format!("pace_min_per_{}", unit.label());
    writer.write_record([
        distance_col.as_str(),
        "distance_m",
        pace_col.as_str(),
        "elapsed",
        "activity_id",
        "activity_name",
        "start_date",
    ])?;

    for (row, entry) in report.best.rows.iter().enumerate() {
        let distance = format!("{:.3}", unit.from_meters(entry.distance_m));
        let meters = format!("{:.1}", entry.distance_m);
        match entry.best.as_ref() {
            Some(best) => {
                let summary = report.summary(&best.activity_id);
                let elapsed = report
                    .best_elapsed(row)
                    .map(seconds_to_string)
                    .unwrap_or_default();
                writer.write_record([
                    distance,
                    meters,
                    pace_to_string(best.pace),
                    elapsed,
                    best.activity_id.clone(),
                    summary
                        .and_then(|s| s.name.clone())
                        .unwrap_or_default(),
                    summary
                        .and_then(|s| s.start_date)
                        .map(|d| d.format("%Y-%m-%d").to_string())
                        .unwrap_or_default(),
                ])?;
            }
            None => {
                writer.write_record([
                    distance,
                    meters,
                    "no data".to_string(),
                    String::new(),
                    String::new(),
                    String::new(),
                    String::new(),
                ])?;
            }
        }
    }
    writer.flush()?;
    Ok(())
}

/// Full split matrix: a row per target, a column per activity, elapsed seconds.
pub fn write_split_matrix(report: &Report, path: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_writer(open_output(path)?);
    let mut header = vec!["distance_m".to_string()];
    header.extend(report.splits.activity_ids().iter().cloned());
    writer.write_record(&header)?;

    let (rows, cols) = report.splits.shape();
    for (row, distance) in report.splits.targets_m().iter().enumerate().take(rows) {
        let mut record = Vec::with_capacity(cols + 1);
        record.push(format!("{distance:.1}"));
        for col in 0..cols {
            record.push(
                report
                    .splits
                    .get(row, col)
                    .map(|s| s.to_string())
                    .unwrap_or_default(),
            );
        }
        writer.write_record(&record)?;
    }
    writer.flush()?;
    Ok(())
}

pub fn write_json(report: &Report, path: &Path) -> Result<()> {
    let mut out = open_output(path)?;
    serde_json::to_writer_pretty(&mut out, &report.document())
        .with_context(|| format!("failed to write {}", path.display()))?;
    writeln!(out)?;
    Ok(())
}
