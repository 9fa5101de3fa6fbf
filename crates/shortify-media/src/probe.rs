// crates/shortify-media/src/probe.rs
//
// In-process FFmpeg probing: duration, display dimensions, fps, audio
// presence. One open/read/close per call — the input context is dropped on
// every exit path before the VideoInfo is returned.

use std::path::Path;

use ffmpeg_the_third as ffmpeg;
use ffmpeg::format::input;
use ffmpeg::media::Type;

use shortify_core::{ShortsError, VideoInfo};

/// Inspect a media file and return its metadata.
///
/// Fails with `ShortsError::Processing` when the file cannot be opened or
/// carries no usable video stream — never a partially-filled VideoInfo.
pub fn inspect(path: &Path) -> Result<VideoInfo, ShortsError> {
    read_info(path)
        .map_err(|e| ShortsError::Processing(format!("failed to read video info: {e}")))
}

fn read_info(path: &Path) -> Result<VideoInfo, String> {
    let ictx = input(path).map_err(|e| format!("open '{}': {e}", path.display()))?;

    let stream = ictx
        .streams()
        .best(Type::Video)
        .ok_or_else(|| format!("no video stream in '{}'", path.display()))?;

    // Container duration first; fall back to the video stream's own duration
    // for containers that don't carry a global one.
    let mut duration = ictx.duration() as f64 / ffmpeg::ffi::AV_TIME_BASE as f64;
    if duration <= 0.0 {
        let tb = stream.time_base();
        duration = stream.duration() as f64 * tb.numerator() as f64 / tb.denominator() as f64;
    }
    if duration <= 0.0 {
        return Err(format!("duration unknown for '{}'", path.display()));
    }

    // Display dimensions from codec parameters (visible area, not the
    // macroblock-padded coded size).
    let (width, height) = unsafe {
        let p = stream.parameters().as_ptr();
        ((*p).width as u32, (*p).height as u32)
    };
    if width == 0 || height == 0 {
        return Err(format!("no decodable video dimensions in '{}'", path.display()));
    }

    // avg_frame_rate covers VFR sources; r_frame_rate is the fallback for
    // streams that don't record an average.
    let fps = rational_fps(stream.avg_frame_rate())
        .or_else(|| rational_fps(stream.rate()))
        .ok_or_else(|| format!("frame rate unknown for '{}'", path.display()))?;

    let has_audio = ictx.streams().best(Type::Audio).is_some();

    eprintln!(
        "[shortify] probed {}: {duration:.1}s {width}x{height} @ {fps:.2} fps, audio={has_audio}",
        path.display()
    );

    Ok(VideoInfo {
        path: path.to_path_buf(),
        duration,
        width,
        height,
        fps,
        has_audio,
    })
}

fn rational_fps(r: ffmpeg::util::rational::Rational) -> Option<f64> {
    if r.numerator() > 0 && r.denominator() > 0 {
        Some(r.numerator() as f64 / r.denominator() as f64)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_is_a_processing_error() {
        let err = inspect(Path::new("/nonexistent/clip.mp4")).unwrap_err();
        assert!(err.to_string().contains("failed to read video info"));
        assert!(!err.is_validation());
    }

    #[test]
    fn rational_fps_rejects_degenerate_rates() {
        use ffmpeg::util::rational::Rational;
        assert_eq!(rational_fps(Rational::new(30, 1)), Some(30.0));
        assert_eq!(rational_fps(Rational::new(30000, 1001)).map(|f| f.round()), Some(30.0));
        assert_eq!(rational_fps(Rational::new(0, 1)), None);
        assert_eq!(rational_fps(Rational::new(30, 0)), None);
    }
}
