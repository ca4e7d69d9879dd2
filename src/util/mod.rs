//! Timecode parsing and human-readable formatting helpers

use thiserror::Error;

/// Error returned when a timecode string cannot be parsed
#[derive(Error, Debug, Clone, PartialEq)]
#[error("invalid timecode '{input}'. Expected seconds (e.g. 123.45), MM:SS.ms, or HH:MM:SS.ms")]
pub struct TimecodeError {
    /// The rejected input string
    pub input: String,
}

/// Parse a timecode string into fractional seconds.
///
/// Accepts plain seconds (`123.45`), `MM:SS.ms` (`2:30.5`) and
/// `HH:MM:SS.ms` (`1:02:30.5`). Negative values are rejected.
pub fn parse_timecode(input: &str) -> Result<f64, TimecodeError> {
    let trimmed = input.trim();
    let err = || TimecodeError {
        input: input.to_string(),
    };

    // Plain seconds
    if let Ok(seconds) = trimmed.parse::<f64>() {
        if seconds < 0.0 || !seconds.is_finite() {
            return Err(err());
        }
        return Ok(seconds);
    }

    let parts: Vec<&str> = trimmed.split(':').collect();
    match parts.len() {
        2 => {
            let minutes = parts[0].parse::<u32>().map_err(|_| err())?;
            let seconds = parts[1].parse::<f64>().map_err(|_| err())?;
            if !(0.0..60.0).contains(&seconds) {
                return Err(err());
            }
            Ok(minutes as f64 * 60.0 + seconds)
        }
        3 => {
            let hours = parts[0].parse::<u32>().map_err(|_| err())?;
            let minutes = parts[1].parse::<u32>().map_err(|_| err())?;
            let seconds = parts[2].parse::<f64>().map_err(|_| err())?;
            if minutes >= 60 || !(0.0..60.0).contains(&seconds) {
                return Err(err());
            }
            Ok(hours as f64 * 3600.0 + minutes as f64 * 60.0 + seconds)
        }
        _ => Err(err()),
    }
}

/// Format a duration in seconds as `M:SS` for display
pub fn format_duration(seconds: f64) -> String {
    let total = seconds.max(0.0) as u64;
    let mins = total / 60;
    let secs = total % 60;
    format!("{}:{:02}", mins, secs)
}

/// Format a byte count as megabytes for display
pub fn format_size(bytes: u64) -> String {
    let mb = bytes as f64 / (1024.0 * 1024.0);
    format!("{:.2} MB", mb)
}
