//! Human-readable pace and elapsed time strings.

use crate::split::{Seconds, NO_SPLIT};

/// Renders a pace given in minutes as `M:SS`, or `H:MM:SS` from one hour up.
///
/// Seconds come from the fractional part of the total minutes, rounded to
/// the nearest second and carried upward when they reach 60. Non-finite or
/// negative input renders as `N/A`.
pub fn pace_to_string(minutes: f64) -> String {
    if !minutes.is_finite() || minutes < 0.0 {
        return "N/A".to_string();
    }
    let mut whole = minutes.floor();
    let mut seconds = ((minutes - whole) * 60.0).round();
    if seconds >= 60.0 {
        whole += 1.0;
        seconds -= 60.0;
    }
    let whole = whole as u64;
    hms(whole / 60, whole % 60, seconds as u64)
}

/// Renders elapsed seconds the same way; [`NO_SPLIT`] and negatives give `N/A`.
pub fn seconds_to_string(seconds: Seconds) -> String {
    if seconds == NO_SPLIT || seconds < 0 {
        return "N/A".to_string();
    }
    let seconds = seconds as u64;
    hms(seconds / 3600, (seconds / 60) % 60, seconds % 60)
}

fn hms(hours: u64, minutes: u64, seconds: u64) -> String {
    if hours > 0 {
        format!("{hours}:{minutes:02}:{seconds:02}")
    } else {
        format!("{minutes}:{seconds:02}")
    }
}
