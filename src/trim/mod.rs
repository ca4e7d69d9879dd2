//! Trim window selection and clip policy validation

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Longest clip a job may produce, in seconds.
pub const MAX_CLIP_SECONDS: f64 = 300.0;

/// Policy violation that refuses a submission without failing the job
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PolicyError {
    /// Selected range exceeds the clip length limit
    #[error("selected clip is {length:.1}s long, the limit is {limit:.0}s")]
    ClipTooLong {
        /// Length of the selected range in seconds
        length: f64,
        /// Policy limit in seconds
        limit: f64,
    },

    /// Selected range has zero or negative length
    #[error("selected clip range is empty")]
    EmptyWindow,
}

/// User-selected start/end range over a probed media duration.
///
/// The window is always kept in a usable state: `set_start` and `set_end`
/// clamp into `[0, duration]` and refuse any move that would put the start
/// at or past the end, leaving the previous value in place instead.
/// Exceeding [`MAX_CLIP_SECONDS`] is allowed while editing and only checked
/// at submission through [`TrimWindow::validate`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrimWindow {
    start_seconds: f64,
    end_seconds: f64,
    duration_seconds: f64,
}

impl TrimWindow {
    /// Create a window spanning the start of the media, capped at the clip limit
    pub fn new(duration_seconds: f64) -> Self {
        let duration = duration_seconds.max(0.0);
        Self {
            start_seconds: 0.0,
            end_seconds: duration.min(MAX_CLIP_SECONDS),
            duration_seconds: duration,
        }
    }

    /// Start of the selected range in seconds
    pub fn start(&self) -> f64 {
        self.start_seconds
    }

    /// End of the selected range in seconds
    pub fn end(&self) -> f64 {
        self.end_seconds
    }

    /// Duration of the underlying media in seconds
    pub fn media_duration(&self) -> f64 {
        self.duration_seconds
    }

    /// Length of the selected range in seconds
    pub fn len_seconds(&self) -> f64 {
        self.end_seconds - self.start_seconds
    }

    /// Move the range start. Returns whether the value was applied.
    pub fn set_start(&mut self, t: f64) -> bool {
        let clamped = t.clamp(0.0, self.duration_seconds);
        if clamped >= self.end_seconds {
            return false;
        }
        self.start_seconds = clamped;
        true
    }

    /// Move the range end. Returns whether the value was applied.
    pub fn set_end(&mut self, t: f64) -> bool {
        let clamped = t.clamp(0.0, self.duration_seconds);
        if clamped <= self.start_seconds {
            return false;
        }
        self.end_seconds = clamped;
        true
    }

    /// Whether the selected range respects the clip length limit
    pub fn is_within_limit(&self) -> bool {
        self.len_seconds() <= MAX_CLIP_SECONDS
    }

    /// Check the window against submission policy
    pub fn validate(&self) -> Result<(), PolicyError> {
        let length = self.len_seconds();
        if length <= 0.0 {
            return Err(PolicyError::EmptyWindow);
        }
        if length > MAX_CLIP_SECONDS {
            return Err(PolicyError::ClipTooLong {
                length,
                limit: MAX_CLIP_SECONDS,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_window_spans_start_capped_at_limit() {
        let w = TrimWindow::new(600.0);
        assert_eq!(w.start(), 0.0);
        assert_eq!(w.end(), 300.0);

        let short = TrimWindow::new(42.0);
        assert_eq!(short.end(), 42.0);
    }

    #[test]
    fn set_start_clamps_into_media_range() {
        let mut w = TrimWindow::new(100.0);
        assert!(w.set_start(-5.0));
        assert_eq!(w.start(), 0.0);
        assert!(w.set_start(10.0));
        assert_eq!(w.start(), 10.0);
    }

    #[test]
    fn set_end_clamps_to_media_duration() {
        let mut w = TrimWindow::new(100.0);
        assert!(w.set_end(250.0));
        assert_eq!(w.end(), 100.0);
    }

    #[test]
    fn start_never_reaches_end() {
        let mut w = TrimWindow::new(100.0);
        assert!(w.set_end(50.0));
        assert!(!w.set_start(50.0));
        assert!(!w.set_start(80.0));
        assert_eq!(w.start(), 0.0);
        assert_eq!(w.end(), 50.0);
    }

    #[test]
    fn end_never_reaches_start() {
        let mut w = TrimWindow::new(100.0);
        assert!(w.set_start(40.0));
        assert!(!w.set_end(40.0));
        assert!(!w.set_end(10.0));
        assert_eq!(w.end(), 100.0);
    }

    #[test]
    fn adversarial_set_sequences_keep_window_valid() {
        let mut w = TrimWindow::new(200.0);
        let moves = [
            (true, 150.0),
            (false, 10.0),
            (true, 180.0),
            (false, 190.0),
            (true, -3.0),
            (false, 0.0),
            (true, 999.0),
            (false, 999.0),
        ];
        for (is_start, t) in moves {
            if is_start {
                w.set_start(t);
            } else {
                w.set_end(t);
            }
            assert!(w.start() < w.end(), "window collapsed at move ({is_start}, {t})");
            assert!(w.start() >= 0.0);
            assert!(w.end() <= w.media_duration());
        }
    }

    #[test]
    fn validate_enforces_length_policy() {
        let mut w = TrimWindow::new(600.0);
        assert!(w.validate().is_ok());

        assert!(w.set_end(400.0));
        assert!(!w.is_within_limit());
        assert!(matches!(
            w.validate(),
            Err(PolicyError::ClipTooLong { .. })
        ));

        let empty = TrimWindow::new(0.0);
        assert_eq!(empty.validate(), Err(PolicyError::EmptyWindow));
    }
}
