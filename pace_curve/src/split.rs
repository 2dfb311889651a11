//! Fastest-split search over a single activity.
//!
//! For every target distance the engine runs a two-pointer sweep over the
//! cumulative distance series. Both pointers only move forward, so a sweep
//! costs at most `2 * n` pointer advances and a full request is `O(n * m)`.
//! The series must be non-decreasing; callers that cannot guarantee this
//! should clamp it first (see [`crate::scale::enforce_monotonic`]).

use crate::SplitError;

/// Elapsed seconds.
pub type Seconds = i64;

/// Marker written for targets that were never covered.
pub const NO_SPLIT: Seconds = Seconds::MAX;

/// Pointer movement counters collected by [`fastest_splits_counted`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SweepStats {
    pub pointer_advances: u64,
    pub sweeps: u64,
}

/// Fastest time covering `target` meters, or `None` when no window reaches it.
pub fn fastest_split(
    time: &[Seconds],
    distance: &[f64],
    target: f64,
) -> Result<Option<Seconds>, SplitError> {
    check_streams(time, distance)?;
    let best = sweep(time, distance, target, &mut SweepStats::default());
    Ok((best != NO_SPLIT).then_some(best))
}

/// Fastest times for every target, [`NO_SPLIT`] where a target is never covered.
pub fn fastest_splits(
    time: &[Seconds],
    distance: &[f64],
    targets: &[f64],
) -> Result<Vec<Seconds>, SplitError> {
    let mut out = vec![NO_SPLIT; targets.len()];
    fastest_splits_into(time, distance, targets, &mut out)?;
    Ok(out)
}

/// Writes the fastest time for `targets[k]` into `out[k]`.
///
/// `out` must have exactly one slot per target; it is left untouched when the
/// inputs are rejected.
pub fn fastest_splits_into(
    time: &[Seconds],
    distance: &[f64],
    targets: &[f64],
    out: &mut [Seconds],
) -> Result<(), SplitError> {
    check_streams(time, distance)?;
    if out.len() != targets.len() {
        return Err(SplitError::BufferMismatch {
            buffer: out.len(),
            targets: targets.len(),
        });
    }
    let mut stats = SweepStats::default();
    for (slot, &target) in out.iter_mut().zip(targets) {
        *slot = sweep(time, distance, target, &mut stats);
    }
    Ok(())
}

/// Same as [`fastest_splits`] but also reports how far the pointers travelled.
pub fn fastest_splits_counted(
    time: &[Seconds],
    distance: &[f64],
    targets: &[f64],
) -> Result<(Vec<Seconds>, SweepStats), SplitError> {
    check_streams(time, distance)?;
    let mut stats = SweepStats::default();
    let out = targets
        .iter()
        .map(|&target| sweep(time, distance, target, &mut stats))
        .collect();
    Ok((out, stats))
}

fn check_streams(time: &[Seconds], distance: &[f64]) -> Result<(), SplitError> {
    if time.len() != distance.len() {
        return Err(SplitError::LengthMismatch {
            time: time.len(),
            distance: distance.len(),
        });
    }
    Ok(())
}

fn sweep(time: &[Seconds], distance: &[f64], target: f64, stats: &mut SweepStats) -> Seconds {
    let n = distance.len();
    // Also rejects NaN.
    if n == 0 || !(target > 0.0) {
        return NO_SPLIT;
    }
    stats.sweeps += 1;

    let mut best = NO_SPLIT;
    let mut i = 0usize;
    let mut j = 0usize;
    while j < n {
        if distance[j] - distance[i] >= target {
            let elapsed = time[j].saturating_sub(time[i]);
            if elapsed < best {
                best = elapsed;
            }
            i += 1;
            stats.pointer_advances += 1;
            if i > j {
                j = i;
            }
        } else {
            j += 1;
            stats.pointer_advances += 1;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ladder() -> (Vec<Seconds>, Vec<f64>) {
        (vec![0, 300, 600, 900], vec![0.0, 1000.0, 2000.0, 3000.0])
    }

    /// Deterministic monotonic series with uneven pacing and standing stops.
    fn wandering_series(n: usize, seed: u64) -> (Vec<Seconds>, Vec<f64>) {
        let mut state = seed;
        let mut next = move || {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            state
        };
        let mut time = Vec::with_capacity(n);
        let mut distance = Vec::with_capacity(n);
        let (mut t, mut d) = (0i64, 0.0f64);
        for _ in 0..n {
            time.push(t);
            distance.push(d);
            t += 1 + (next() % 4) as i64;
            let r = next() % 10;
            if r > 1 {
                d += (r as f64) * 1.7;
            }
        }
        (time, distance)
    }

    fn brute_force(time: &[Seconds], distance: &[f64], target: f64) -> Seconds {
        if !(target > 0.0) {
            return NO_SPLIT;
        }
        let mut best = NO_SPLIT;
        for i in 0..distance.len() {
            for j in i..distance.len() {
                if distance[j] - distance[i] >= target {
                    best = best.min(time[j] - time[i]);
                    break;
                }
            }
        }
        best
    }

    #[test]
    fn test_ladder_splits() {
        let (time, distance) = ladder();
        let out = fastest_splits(&time, &distance, &[1000.0, 2000.0, 2500.0, 3500.0]).unwrap();
        assert_eq!(out, vec![300, 600, 900, NO_SPLIT]);
    }

    #[test]
    fn test_exact_target_counts() {
        let (time, distance) = ladder();
        assert_eq!(fastest_split(&time, &distance, 3000.0).unwrap(), Some(900));
        assert_eq!(fastest_split(&time, &distance, 3000.0001).unwrap(), None);
    }

    #[test]
    fn test_non_positive_targets_never_split() {
        let (time, distance) = ladder();
        let out = fastest_splits(&time, &distance, &[0.0, -5.0, f64::NAN]).unwrap();
        assert!(out.iter().all(|&v| v == NO_SPLIT));
    }

    #[test]
    fn test_empty_stream() {
        let out = fastest_splits(&[], &[], &[1.0, 400.0, 1609.34]).unwrap();
        assert_eq!(out, vec![NO_SPLIT; 3]);
    }

    #[test]
    fn test_picks_fastest_window() {
        // Slow first kilometer, fast second one.
        let time = vec![0, 400, 500, 700, 1000];
        let distance = vec![0.0, 500.0, 1000.0, 1500.0, 2000.0];
        assert_eq!(fastest_split(&time, &distance, 500.0).unwrap(), Some(100));
        assert_eq!(fastest_split(&time, &distance, 1000.0).unwrap(), Some(300));
    }

    #[test]
    fn test_length_mismatch_rejected() {
        let err = fastest_splits(&[0, 1], &[0.0], &[1.0]).unwrap_err();
        assert!(matches!(
            err,
            SplitError::LengthMismatch {
                time: 2,
                distance: 1
            }
        ));
        assert!(err.is_invalid_input());
    }

    #[test]
    fn test_buffer_mismatch_rejected() {
        let (time, distance) = ladder();
        let mut out = vec![7; 1];
        let err = fastest_splits_into(&time, &distance, &[1000.0, 2000.0], &mut out).unwrap_err();
        assert!(matches!(
            err,
            SplitError::BufferMismatch {
                buffer: 1,
                targets: 2
            }
        ));
        assert_eq!(out, vec![7]);
    }

    #[test]
    fn test_matches_brute_force() {
        for seed in [3u64, 17, 91, 2024] {
            let (time, distance) = wandering_series(400, seed);
            let total = *distance.last().unwrap();
            let targets: Vec<f64> = (1..=12).map(|k| total * k as f64 / 11.0).collect();
            let fast = fastest_splits(&time, &distance, &targets).unwrap();
            for (k, &target) in targets.iter().enumerate() {
                assert_eq!(
                    fast[k],
                    brute_force(&time, &distance, target),
                    "seed {seed}, target {target}"
                );
            }
        }
    }

    #[test]
    fn test_pointer_advances_stay_linear() {
        let n = 200_000;
        let (time, distance) = wandering_series(n, 7);
        let targets = [100.0, 1609.344, 5000.0, 21_097.5, 1.0e9];
        let (out, stats) = fastest_splits_counted(&time, &distance, &targets).unwrap();
        assert_eq!(out.len(), targets.len());
        assert_eq!(out[4], NO_SPLIT);
        assert_eq!(stats.sweeps, targets.len() as u64);
        assert!(stats.pointer_advances <= 2 * n as u64 * targets.len() as u64);
    }

    #[test]
    fn test_extreme_timestamps_do_not_overflow() {
        // A corrupt first sample; its windows saturate instead of wrapping.
        let time = vec![i64::MIN, 100, 130];
        let distance = vec![0.0, 10.0, 20.0];
        assert_eq!(fastest_split(&time, &distance, 10.0).unwrap(), Some(30));
        assert_eq!(fastest_split(&time, &distance, 20.0).unwrap(), None);
    }
}
