//! Best effort per distance across the whole activity history.

use serde::{Deserialize, Serialize};

use crate::matrix::PaceMatrix;
use crate::source::ActivityId;
use crate::units::DistanceUnit;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct BestEffort {
    /// Minutes per unit of the curve.
    pub pace: f64,
    /// Column of the achieving activity in the pace matrix.
    pub activity_index: usize,
    pub activity_id: ActivityId,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct BestEffortRow {
    pub distance_m: f64,
    /// `None` when no activity ever covered this distance.
    pub best: Option<BestEffort>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct BestEffortCurve {
    pub unit: DistanceUnit,
    pub rows: Vec<BestEffortRow>,
}

impl BestEffortCurve {
    /// Rows that have a best effort, in target order.
    pub fn leaderboard(&self) -> impl Iterator<Item = (f64, &BestEffort)> + '_ {
        self.rows
            .iter()
            .filter_map(|row| row.best.as_ref().map(|best| (row.distance_m, best)))
    }

    /// Target distances nobody covered.
    pub fn missing(&self) -> impl Iterator<Item = f64> + '_ {
        self.rows
            .iter()
            .filter(|row| row.best.is_none())
            .map(|row| row.distance_m)
    }
}

/// Picks the lowest finite pace in every row.
///
/// Equal paces keep the earliest activity column.
pub fn reduce_best_efforts(paces: &PaceMatrix) -> BestEffortCurve {
    let ids = paces.activity_ids();
    let rows = paces
        .targets_m()
        .iter()
        .enumerate()
        .map(|(row, &distance_m)| {
            let mut best: Option<(usize, f64)> = None;
            for (col, &pace) in paces.row(row).iter().enumerate() {
                if !pace.is_finite() {
                    continue;
                }
                match best {
                    Some((_, current)) if pace >= current => {}
                    _ => best = Some((col, pace)),
                }
            }
            BestEffortRow {
                distance_m,
                best: best.map(|(col, pace)| BestEffort {
                    pace,
                    activity_index: col,
                    activity_id: ids[col].clone(),
                }),
            }
        })
        .collect();

    BestEffortCurve {
        unit: paces.unit(),
        rows,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(n: usize) -> Vec<ActivityId> {
        (1..=n).map(|i| format!("activity-{i}")).collect()
    }

    #[test]
    fn test_row_minimum_and_no_data() {
        let paces = PaceMatrix::from_rows(
            DistanceUnit::Miles,
            vec![1000.0, 2000.0, 3000.0],
            ids(3),
            vec![
                vec![5.0, 4.5, f64::INFINITY],
                vec![6.0, 4.0, f64::INFINITY],
                vec![f64::INFINITY, f64::NAN, f64::INFINITY],
            ],
        )
        .unwrap();
        let curve = reduce_best_efforts(&paces);

        let first = curve.rows[0].best.as_ref().unwrap();
        assert_eq!(first.pace, 4.5);
        assert_eq!(first.activity_id, "activity-2");
        let second = curve.rows[1].best.as_ref().unwrap();
        assert_eq!(second.pace, 4.0);
        assert_eq!(second.activity_index, 1);
        assert!(curve.rows[2].best.is_none());

        assert_eq!(curve.leaderboard().count(), 2);
        assert_eq!(curve.missing().collect::<Vec<_>>(), vec![3000.0]);
    }

    #[test]
    fn test_ties_keep_first_activity() {
        let paces = PaceMatrix::from_rows(
            DistanceUnit::Kilometers,
            vec![5000.0],
            ids(4),
            vec![vec![f64::INFINITY, 4.25, 4.25, 4.25]],
        )
        .unwrap();
        let curve = reduce_best_efforts(&paces);
        assert_eq!(curve.rows[0].best.as_ref().unwrap().activity_id, "activity-2");
        assert_eq!(curve, reduce_best_efforts(&paces));
    }

    #[test]
    fn test_empty_history() {
        let paces =
            PaceMatrix::from_rows(DistanceUnit::Miles, vec![1609.344], Vec::new(), vec![vec![]])
                .unwrap();
        let curve = reduce_best_efforts(&paces);
        assert_eq!(curve.rows.len(), 1);
        assert!(curve.rows[0].best.is_none());
    }
}
