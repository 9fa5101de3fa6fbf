// crates/shortify-core/src/options.rs
//
// ConversionOptions: immutable parameter set for one conversion request,
// plus the output-duration arithmetic and the validation predicate.
//
// Every field carries a serde default so a partial JSON preset (just the
// knobs a host cares about) deserializes against the stock values.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ShortsError;
use crate::info::VideoInfo;

/// Hard output-duration cap for the shorts format.
pub const SHORTS_MAX_SECS: f64 = 60.0;

/// Options for one conversion request. Built per request, never mutated
/// after construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConversionOptions {
    // Segment selection (for videos over 60 seconds)
    /// Seconds into the source at which the clip begins.
    pub start_time: f64,
    /// Seconds to include from `start_time`. `None` means until the end.
    pub duration:   Option<f64>,

    // Speed multiplier (alternative to segment selection)
    pub speed: f64,

    // Output settings
    pub target_width:   u32,
    pub target_height:  u32,
    /// Bitrate string as handed to the encoder, e.g. "8000k".
    pub output_bitrate: String,
    pub output_fps:     u32,

    // Visual effects
    /// Gaussian blur kernel size for the background. Even values round up to
    /// the next odd; 0 or negative disables the blur.
    pub blur_kernel:     i32,
    pub blur_sigma:      f64,
    /// Background brightness multiplier.
    pub blur_brightness: f64,
    /// Background brightness offset (negative = darken).
    pub blur_darken:     i32,

    /// Fade-to-black applied to the last N seconds of video. 0 disables.
    pub video_fadeout: f64,
    /// Gain ramp applied to the last N seconds of audio. 0 disables.
    pub audio_fadeout: f64,
}

impl Default for ConversionOptions {
    fn default() -> Self {
        Self {
            start_time:      0.0,
            duration:        None,
            speed:           1.0,
            target_width:    1080,
            target_height:   1920,
            output_bitrate:  "8000k".into(),
            output_fps:      30,
            blur_kernel:     99,
            blur_sigma:      80.0,
            blur_brightness: 0.6,
            blur_darken:     -50,
            video_fadeout:   1.0,
            audio_fadeout:   3.0,
        }
    }
}

impl ConversionOptions {
    /// Expected output duration in seconds for a source of `original_duration`.
    ///
    /// Segment mode uses the specified duration (clamped to what remains after
    /// `start_time`); speed mode uses everything from `start_time` to the end.
    /// The speed divide applies in both modes. This is the single source of
    /// truth — validation and the pipeline both call it.
    pub fn calculate_output_duration(&self, original_duration: f64) -> f64 {
        let actual = match self.duration {
            Some(d) => d.min(original_duration - self.start_time),
            None => original_duration - self.start_time,
        };
        actual / self.speed
    }

    /// Validate these options against a source video. Rules apply in order;
    /// the first failure wins. Pure — safe to call repeatedly with candidate
    /// options while a host tweaks its inputs.
    pub fn validate(&self, video: &VideoInfo) -> Result<(), String> {
        // Videos under 60 seconds are always OK — segment and speed settings
        // are ignored for them entirely, even nonsensical ones.
        if video.is_short() {
            return Ok(());
        }

        if self.start_time < 0.0 {
            return Err("Start time must be 0 or greater".into());
        }

        if self.start_time >= video.duration {
            return Err(format!(
                "Start time exceeds video duration ({:.1}s)",
                video.duration
            ));
        }

        if self.speed <= 0.0 {
            return Err("Speed must be greater than 0".into());
        }

        if let Some(duration) = self.duration {
            if duration <= 0.0 {
                return Err("Duration must be greater than 0".into());
            }
            if self.start_time + duration > video.duration {
                return Err("Selected segment exceeds video duration".into());
            }
        }

        let output_duration = self.calculate_output_duration(video.duration);
        // Exactly 60.0 is valid — the platform cap is inclusive.
        if output_duration > SHORTS_MAX_SECS {
            return Err(format!(
                "Output duration ({output_duration:.1}s) exceeds 60 seconds limit"
            ));
        }

        Ok(())
    }

    /// Load an options preset from a JSON file. Missing fields take defaults.
    pub fn load(path: &Path) -> Result<Self, ShortsError> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            ShortsError::Processing(format!("read preset '{}': {e}", path.display()))
        })?;
        serde_json::from_str(&text).map_err(|e| {
            ShortsError::Processing(format!("parse preset '{}': {e}", path.display()))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn info(duration: f64) -> VideoInfo {
        VideoInfo {
            path: PathBuf::from("data/test.mp4"),
            duration,
            width: 1920,
            height: 1080,
            fps: 30.0,
            has_audio: true,
        }
    }

    #[test]
    fn output_duration_with_speed() {
        let options = ConversionOptions { speed: 2.0, ..Default::default() };
        assert_eq!(options.calculate_output_duration(120.0), 60.0);
    }

    #[test]
    fn output_duration_with_segment() {
        let options = ConversionOptions { duration: Some(30.0), ..Default::default() };
        assert_eq!(options.calculate_output_duration(120.0), 30.0);
    }

    #[test]
    fn output_duration_segment_and_speed() {
        let options = ConversionOptions {
            duration: Some(60.0),
            speed: 2.0,
            ..Default::default()
        };
        assert_eq!(options.calculate_output_duration(120.0), 30.0);
    }

    #[test]
    fn output_duration_segment_clamped_to_remainder() {
        // 100s left after start_time=20, so duration=500 clamps to 100.
        let options = ConversionOptions {
            start_time: 20.0,
            duration: Some(500.0),
            ..Default::default()
        };
        assert_eq!(options.calculate_output_duration(120.0), 100.0);
    }

    #[test]
    fn validate_short_video_always_ok() {
        let options = ConversionOptions::default();
        assert!(options.validate(&info(45.0)).is_ok());
    }

    #[test]
    fn validate_short_video_ignores_bad_fields() {
        // is_short short-circuits before any other rule fires.
        let options = ConversionOptions {
            start_time: -10.0,
            speed: 0.0,
            ..Default::default()
        };
        assert!(options.validate(&info(45.0)).is_ok());
    }

    #[test]
    fn validate_long_video_with_speed() {
        let options = ConversionOptions { speed: 2.0, ..Default::default() };
        assert!(options.validate(&info(120.0)).is_ok());
    }

    #[test]
    fn validate_long_video_with_segment() {
        let options = ConversionOptions {
            start_time: 30.0,
            duration: Some(40.0),
            ..Default::default()
        };
        assert!(options.validate(&info(120.0)).is_ok());
    }

    #[test]
    fn validate_exceeds_60_seconds() {
        // 120 / 1.5 = 80 seconds
        let options = ConversionOptions { speed: 1.5, ..Default::default() };
        let err = options.validate(&info(120.0)).unwrap_err();
        assert!(err.to_lowercase().contains("exceeds 60 seconds"));
    }

    #[test]
    fn validate_negative_start_time() {
        let options = ConversionOptions { start_time: -10.0, ..Default::default() };
        let err = options.validate(&info(120.0)).unwrap_err();
        assert!(err.to_lowercase().contains("start time"));
    }

    #[test]
    fn validate_start_exceeds_duration() {
        let options = ConversionOptions { start_time: 70.0, ..Default::default() };
        let err = options.validate(&info(60.0)).unwrap_err();
        assert!(err.to_lowercase().contains("exceeds video duration"));
    }

    #[test]
    fn validate_segment_exceeds_video() {
        // 30 + 40 = 70 > 60
        let options = ConversionOptions {
            start_time: 30.0,
            duration: Some(40.0),
            ..Default::default()
        };
        let err = options.validate(&info(60.0)).unwrap_err();
        assert!(err.to_lowercase().contains("exceeds"));
    }

    #[test]
    fn validate_invalid_speed() {
        let options = ConversionOptions { speed: 0.0, ..Default::default() };
        let err = options.validate(&info(60.0)).unwrap_err();
        assert!(err.to_lowercase().contains("speed"));
    }

    #[test]
    fn validate_negative_duration() {
        let options = ConversionOptions { duration: Some(-10.0), ..Default::default() };
        let err = options.validate(&info(60.0)).unwrap_err();
        assert!(err.to_lowercase().contains("duration"));
    }

    #[test]
    fn exactly_60_seconds_output_is_valid() {
        // 90 / 1.5 = 60.0 — boundary-valid.
        let options = ConversionOptions { speed: 1.5, ..Default::default() };
        assert!(options.validate(&info(90.0)).is_ok());
        // 90 / 1.4 ≈ 64.3 — over the cap.
        let options = ConversionOptions { speed: 1.4, ..Default::default() };
        assert!(options.validate(&info(90.0)).is_err());
    }

    #[test]
    fn just_over_60_seconds_output_is_invalid() {
        let options = ConversionOptions::default();
        assert!(options.validate(&info(60.0000001)).is_err());
    }

    #[test]
    fn extreme_speed_boundary() {
        // 240 / 4 = 60 exactly → valid; 240 / 3.99 ≈ 60.15 → invalid.
        let options = ConversionOptions { speed: 4.0, ..Default::default() };
        assert!(options.validate(&info(240.0)).is_ok());
        let options = ConversionOptions { speed: 3.99, ..Default::default() };
        assert!(options.validate(&info(240.0)).is_err());
    }

    #[test]
    fn partial_preset_fills_defaults() {
        let opts: ConversionOptions =
            serde_json::from_str(r#"{ "speed": 1.5, "start_time": 4.0 }"#).unwrap();
        assert_eq!(opts.speed, 1.5);
        assert_eq!(opts.start_time, 4.0);
        assert_eq!(opts.target_width, 1080);
        assert_eq!(opts.target_height, 1920);
        assert_eq!(opts.output_bitrate, "8000k");
        assert_eq!(opts.duration, None);
    }
}
