//! Utility functions for the sky map tools

use std::time::Duration;

/// Format an elapsed time as `H:MM:SS.ffffff`.
///
/// The fractional part is omitted when it is exactly zero, matching the
/// run-time line printed by earlier versions of the list builder.
pub fn format_elapsed(elapsed: Duration) -> String {
    let total_secs = elapsed.as_secs();
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;
    let micros = elapsed.subsec_micros();

    if micros == 0 {
        format!("{}:{:02}:{:02}", hours, minutes, seconds)
    } else {
        format!("{}:{:02}:{:02}.{:06}", hours, minutes, seconds, micros)
    }
}

/// Format a value for a colour bar label
pub fn format_value(value: f64) -> String {
    let magnitude = value.abs();
    if value == 0.0 {
        "0".to_string()
    } else if !(1e-3..1e5).contains(&magnitude) {
        format!("{:.2e}", value)
    } else if value.fract() == 0.0 {
        format!("{}", value as i64)
    } else {
        format!("{:.3}", value)
    }
}
