// crates/shortify-core/src/fade.rs
//
// Fade-out math shared by the video (fade-to-black) and audio (gain ramp)
// tails. Linear — the ramp is short enough that easing buys nothing visible.

use crate::frame::RgbFrame;

/// Gain at output time `t` for a clip of `total` seconds with a `fadeout`
/// second tail. 1.0 until the fade window starts, then a linear ramp to 0.0
/// at `total`. `fadeout <= 0` disables the fade entirely.
#[inline]
pub fn fadeout_gain(t: f64, total: f64, fadeout: f64) -> f32 {
    if fadeout <= 0.0 {
        return 1.0;
    }
    (((total - t) / fadeout).clamp(0.0, 1.0)) as f32
}

/// Scale every pixel toward black by `gain` ∈ [0.0, 1.0], in place.
///
/// Gamma-encoded byte multiply — the same SDR approximation the rest of the
/// pixel math uses.
pub fn apply_video_fade(frame: &mut RgbFrame, gain: f32) {
    if gain >= 1.0 {
        return;
    }
    for px in &mut frame.data {
        *px = (*px as f32 * gain).round() as u8;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gain_is_one_before_fade_window() {
        assert_eq!(fadeout_gain(0.0, 60.0, 3.0), 1.0);
        assert_eq!(fadeout_gain(56.9, 60.0, 3.0), 1.0);
    }

    #[test]
    fn gain_ramps_linearly_inside_window() {
        let g = fadeout_gain(58.5, 60.0, 3.0);
        assert!((g - 0.5).abs() < 1e-6);
    }

    #[test]
    fn gain_is_zero_at_end() {
        assert_eq!(fadeout_gain(60.0, 60.0, 3.0), 0.0);
        // Past the end (frame timing jitter) still clamps to zero.
        assert_eq!(fadeout_gain(60.5, 60.0, 3.0), 0.0);
    }

    #[test]
    fn zero_fadeout_disables() {
        assert_eq!(fadeout_gain(59.99, 60.0, 0.0), 1.0);
        assert_eq!(fadeout_gain(59.99, 60.0, -1.0), 1.0);
    }

    #[test]
    fn video_fade_scales_pixels() {
        let mut f = RgbFrame::from_packed(1, 1, vec![200, 100, 0]);
        apply_video_fade(&mut f, 0.5);
        assert_eq!(f.data, vec![100, 50, 0]);
    }

    #[test]
    fn full_gain_leaves_frame_untouched() {
        let mut f = RgbFrame::from_packed(1, 1, vec![200, 100, 0]);
        apply_video_fade(&mut f, 1.0);
        assert_eq!(f.data, vec![200, 100, 0]);
    }
}
