// crates/shortify-core/src/info.rs
//
// VideoInfo: metadata snapshot of one inspected file. Read-only value,
// produced by shortify_media::probe::inspect and discarded after use.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::options::SHORTS_MAX_SECS;

/// Metadata for one source video file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoInfo {
    pub path:      PathBuf,
    /// Duration in seconds.
    pub duration:  f64,
    /// Display width in pixels (visible area, not coded dimensions).
    pub width:     u32,
    pub height:    u32,
    pub fps:       f64,
    pub has_audio: bool,
}

impl VideoInfo {
    /// True when the source already fits the shorts cap without trimming or
    /// speed adjustment. Strictly `< 60.0` — a source of exactly 60 s still
    /// goes through validation (where exactly 60 s of *output* is valid).
    /// The asymmetry is deliberate; do not make these consistent.
    pub fn is_short(&self) -> bool {
        self.duration < SHORTS_MAX_SECS
    }

    /// Width / height, or 0.0 for a degenerate zero-height stream.
    pub fn aspect_ratio(&self) -> f64 {
        if self.height > 0 {
            self.width as f64 / self.height as f64
        } else {
            0.0
        }
    }

    pub fn is_landscape(&self) -> bool {
        self.width > self.height
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(duration: f64, width: u32, height: u32) -> VideoInfo {
        VideoInfo {
            path: PathBuf::from("data/test.mp4"),
            duration,
            width,
            height,
            fps: 30.0,
            has_audio: true,
        }
    }

    #[test]
    fn is_short_under_60() {
        assert!(info(45.0, 1920, 1080).is_short());
    }

    #[test]
    fn is_short_over_60() {
        assert!(!info(90.0, 1920, 1080).is_short());
    }

    #[test]
    fn is_short_exactly_60_is_not_short() {
        assert!(!info(60.0, 1920, 1080).is_short());
    }

    #[test]
    fn aspect_ratio_16_9() {
        let r = info(45.0, 1920, 1080).aspect_ratio();
        assert!((r - 16.0 / 9.0).abs() < 0.01);
    }

    #[test]
    fn aspect_ratio_zero_height() {
        assert_eq!(info(45.0, 1920, 0).aspect_ratio(), 0.0);
    }

    #[test]
    fn landscape_detection() {
        assert!(info(45.0, 1920, 1080).is_landscape());
        assert!(!info(45.0, 1080, 1920).is_landscape());
    }
}
