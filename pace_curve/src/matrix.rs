//! Target-distance × activity result tables.

use ndarray::{Array2, ArrayView1, Axis};

use crate::source::ActivityId;
use crate::split::{Seconds, NO_SPLIT};
use crate::units::DistanceUnit;
use crate::SplitError;

/// Fastest elapsed seconds per (target distance, activity).
#[derive(Clone, Debug)]
pub struct SplitMatrix {
    targets_m: Vec<f64>,
    activity_ids: Vec<ActivityId>,
    times: Array2<Seconds>,
}

impl SplitMatrix {
    /// Assembles a matrix from per-activity columns, in activity order.
    pub(crate) fn from_columns(
        targets_m: Vec<f64>,
        columns: Vec<(ActivityId, Vec<Seconds>)>,
    ) -> Self {
        let mut times = Array2::from_elem((targets_m.len(), columns.len()), NO_SPLIT);
        let mut activity_ids = Vec::with_capacity(columns.len());
        for (col, (id, values)) in columns.into_iter().enumerate() {
            times
                .column_mut(col)
                .assign(&ArrayView1::from(values.as_slice()));
            activity_ids.push(id);
        }
        Self {
            targets_m,
            activity_ids,
            times,
        }
    }

    pub fn targets_m(&self) -> &[f64] {
        &self.targets_m
    }

    pub fn activity_ids(&self) -> &[ActivityId] {
        &self.activity_ids
    }

    /// `(targets, activities)`
    pub fn shape(&self) -> (usize, usize) {
        self.times.dim()
    }

    /// Elapsed seconds, `None` when the activity never covered the distance.
    pub fn get(&self, row: usize, col: usize) -> Option<Seconds> {
        self.times
            .get((row, col))
            .copied()
            .filter(|&value| value != NO_SPLIT)
    }

    pub fn column(&self, col: usize) -> ArrayView1<'_, Seconds> {
        self.times.column(col)
    }

    pub fn row(&self, row: usize) -> ArrayView1<'_, Seconds> {
        self.times.row(row)
    }

    /// Minutes per `unit`; uncovered cells become `+inf`.
    pub fn pace_matrix(&self, unit: DistanceUnit) -> PaceMatrix {
        let mut paces = Array2::from_elem(self.times.dim(), f64::INFINITY);
        for ((row, target_m), mut pace_row) in self
            .targets_m
            .iter()
            .enumerate()
            .zip(paces.axis_iter_mut(Axis(0)))
        {
            let units = unit.from_meters(*target_m);
            if !(units > 0.0) {
                continue;
            }
            for (pace, &seconds) in pace_row.iter_mut().zip(self.times.row(row)) {
                if seconds != NO_SPLIT {
                    *pace = seconds as f64 / 60.0 / units;
                }
            }
        }
        PaceMatrix {
            unit,
            targets_m: self.targets_m.clone(),
            activity_ids: self.activity_ids.clone(),
            paces,
        }
    }
}

/// Pace (minutes per unit) per (target distance, activity); `+inf` when missing.
#[derive(Clone, Debug)]
pub struct PaceMatrix {
    unit: DistanceUnit,
    targets_m: Vec<f64>,
    activity_ids: Vec<ActivityId>,
    paces: Array2<f64>,
}

impl PaceMatrix {
    /// Builds a pace matrix from row-major values, one row per target.
    ///
    /// `NaN` is read as missing and stored as `+inf`.
    pub fn from_rows(
        unit: DistanceUnit,
        targets_m: Vec<f64>,
        activity_ids: Vec<ActivityId>,
        rows: Vec<Vec<f64>>,
    ) -> Result<Self, SplitError> {
        if rows.len() != targets_m.len() {
            return Err(SplitError::MalformedStream(format!(
                "{} pace rows for {} targets",
                rows.len(),
                targets_m.len()
            )));
        }
        let width = activity_ids.len();
        let mut flat = Vec::with_capacity(rows.len() * width);
        for (idx, row) in rows.into_iter().enumerate() {
            if row.len() != width {
                return Err(SplitError::MalformedStream(format!(
                    "pace row {idx} has {} values for {width} activities",
                    row.len()
                )));
            }
            flat.extend(
                row.into_iter()
                    .map(|v| if v.is_nan() { f64::INFINITY } else { v }),
            );
        }
        let paces = Array2::from_shape_vec((targets_m.len(), width), flat)
            .map_err(|e| SplitError::MalformedStream(e.to_string()))?;
        Ok(Self {
            unit,
            targets_m,
            activity_ids,
            paces,
        })
    }

    pub fn unit(&self) -> DistanceUnit {
        self.unit
    }

    pub fn targets_m(&self) -> &[f64] {
        &self.targets_m
    }

    pub fn activity_ids(&self) -> &[ActivityId] {
        &self.activity_ids
    }

    pub fn shape(&self) -> (usize, usize) {
        self.paces.dim()
    }

    /// Pace, `None` when missing.
    pub fn get(&self, row: usize, col: usize) -> Option<f64> {
        self.paces
            .get((row, col))
            .copied()
            .filter(|value| value.is_finite())
    }

    pub fn row(&self, row: usize) -> ArrayView1<'_, f64> {
        self.paces.row(row)
    }
}
