use std::collections::BTreeSet;

use ordered_float::OrderedFloat;

use crate::units::{meters_to_miles, miles_to_meters};
use crate::SplitError;

/// 400 m, 1 mi, 5 km, 10 km, half marathon, marathon (in miles).
pub const STANDARD_RACE_DISTANCES_MILES: &[f64] = &[
    0.248_548, 1.0, 3.106_856, 6.213_712, 13.109_375, 26.218_75,
];

/// Decimal places (in miles) kept before two targets are considered equal.
pub const GRID_RESOLUTION_DECIMALS: i32 = 6;

/// Upper bound on generated grid points.
pub const MAX_GRID_POINTS: usize = 100_000;

/// Builds the sorted, duplicate-free list of target distances in meters.
///
/// `interesting_miles` are always kept. A regular grid of `grid_step_miles`
/// is added up to `max_distance_m`; a non-positive step disables it.
pub fn build_target_distances(
    interesting_miles: &[f64],
    grid_step_miles: f64,
    max_distance_m: f64,
) -> Result<Vec<f64>, SplitError> {
    let mut miles: BTreeSet<OrderedFloat<f64>> = interesting_miles
        .iter()
        .copied()
        .filter(|m| m.is_finite() && *m > 0.0)
        .map(|m| OrderedFloat(quantize(m)))
        .collect();

    let max_miles = meters_to_miles(max_distance_m);
    if grid_step_miles.is_finite() && grid_step_miles > 0.0 && max_miles.is_finite() {
        let count = (max_miles / grid_step_miles).floor();
        if count > MAX_GRID_POINTS as f64 {
            return Err(SplitError::InvalidParameter(format!(
                "grid step {grid_step_miles} mi over {max_miles:.1} mi yields more than {MAX_GRID_POINTS} targets"
            )));
        }
        for k in 1..=(count as usize) {
            let value = quantize(grid_step_miles * k as f64);
            if value > 0.0 {
                miles.insert(OrderedFloat(value));
            }
        }
    }

    Ok(miles.into_iter().map(|m| miles_to_meters(m.0)).collect())
}

fn quantize(miles: f64) -> f64 {
    let scale = 10f64.powi(GRID_RESOLUTION_DECIMALS);
    (miles * scale).round() / scale
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::units::METERS_PER_MILE;

    #[test]
    fn test_union_sorted_and_deduplicated() {
        let targets = build_target_distances(&[1.0, 3.106_856, 0.5], 0.5, 2.2 * METERS_PER_MILE)
            .unwrap();
        let miles: Vec<f64> = targets.iter().map(|m| meters_to_miles(*m)).collect();
        let expected = [0.5, 1.0, 1.5, 2.0, 3.106_856];
        assert_eq!(miles.len(), expected.len());
        for (got, want) in miles.iter().zip(expected) {
            assert!((got - want).abs() < 1e-9, "{got} vs {want}");
        }
        assert!(targets.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_near_duplicates_collapse() {
        let targets = build_target_distances(&[1.0, 1.000_000_1, 0.999_999_9], 0.0, 0.0).unwrap();
        assert_eq!(targets.len(), 1);
    }

    #[test]
    fn test_invalid_entries_dropped() {
        let targets = build_target_distances(&[-1.0, 0.0, f64::NAN, 2.0], -1.0, 10_000.0).unwrap();
        assert_eq!(targets.len(), 1);
        assert!((targets[0] - 2.0 * METERS_PER_MILE).abs() < 1e-6);
    }

    #[test]
    fn test_grid_too_dense() {
        let err = build_target_distances(&[], 1e-6, 100_000.0).unwrap_err();
        assert!(matches!(err, SplitError::InvalidParameter(_)));
    }
}
