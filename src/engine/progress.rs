//! Engine progress event parsing

use serde::{Deserialize, Serialize};

/// One progress event reported by the engine during a run
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineProgress {
    /// Output timestamp reached so far, in milliseconds
    pub out_time_ms: i64,
    /// Processing speed relative to realtime, when reported
    pub speed: Option<f64>,
}

/// Feed one `key=value` line of an ffmpeg `-progress` stream into `current`.
///
/// Returns `true` when the line terminates a progress frame (`progress=...`),
/// meaning `current` is complete and should be delivered.
pub(crate) fn parse_progress_line(line: &str, current: &mut EngineProgress) -> bool {
    let Some((key, value)) = line.trim().split_once('=') else {
        return false;
    };
    match key {
        // ffmpeg reports microseconds under both keys
        "out_time_ms" | "out_time_us" => {
            if let Ok(us) = value.trim().parse::<i64>() {
                current.out_time_ms = us / 1000;
            }
        }
        "speed" => {
            current.speed = value.trim().trim_end_matches('x').parse::<f64>().ok();
        }
        "progress" => return true,
        _ => {}
    }
    false
}
