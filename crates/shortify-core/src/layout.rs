// crates/shortify-core/src/layout.rs
//
// The 9:16 vertical-layout compositor: blurred stretched background behind a
// width-fitted, undistorted foreground.
//
// VerticalLayout is built once per conversion — it precomputes the Gaussian
// kernel — and then applied once per output frame. compose() is pure and
// deterministic: same input frame, same output bytes. All math runs on
// packed RGB24 buffers (see frame.rs); rows are processed in parallel with
// rayon since a 1080×1920 99-tap blur dominates the per-frame cost.

use rayon::prelude::*;

use crate::frame::{RgbFrame, CHANNELS};
use crate::options::ConversionOptions;

/// Per-conversion frame compositor.
pub struct VerticalLayout {
    target_w:   u32,
    target_h:   u32,
    /// Normalized 1-D Gaussian weights; empty when the blur is disabled.
    kernel:     Vec<f32>,
    brightness: f32,
    darken:     f32,
}

impl VerticalLayout {
    pub fn new(options: &ConversionOptions) -> Self {
        let kernel = match effective_kernel_size(options.blur_kernel) {
            Some(size) => gaussian_kernel(size, options.blur_sigma as f32),
            None => Vec::new(),
        };
        Self {
            target_w:   options.target_width,
            target_h:   options.target_height,
            kernel,
            brightness: options.blur_brightness as f32,
            darken:     options.blur_darken as f32,
        }
    }

    /// Compose one source frame into a `target_w × target_h` vertical frame.
    ///
    /// 1. Background: stretch the source to the full canvas (aspect ratio
    ///    intentionally distorted — it is only a backdrop), blur, darken.
    /// 2. Foreground: scale to `target_w` wide preserving aspect ratio, then
    ///    center vertically, or center-crop when taller than the canvas.
    pub fn compose(&self, src: &RgbFrame) -> RgbFrame {
        debug_assert!(src.width > 0 && src.height > 0, "compose: empty source frame");

        let mut canvas = self.background(src);

        // Fit width, maintain aspect ratio. Truncating matches the integer
        // pixel grid; the ±1-row error disappears into the centering below.
        let scale = self.target_w as f64 / src.width as f64;
        let new_h = ((src.height as f64 * scale) as u32).max(1);
        let fg = resize_bilinear(src, self.target_w, new_h);

        if new_h <= self.target_h {
            // Center vertically over the blurred backdrop.
            let y_offset = ((self.target_h - new_h) / 2) as usize;
            for y in 0..new_h as usize {
                canvas.row_mut(y_offset + y).copy_from_slice(fg.row(y));
            }
        } else {
            // Taller than the canvas: center-crop. No background visible.
            let crop_y = ((new_h - self.target_h) / 2) as usize;
            for y in 0..self.target_h as usize {
                canvas.row_mut(y).copy_from_slice(fg.row(crop_y + y));
            }
        }

        canvas
    }

    /// Stretched + blurred + darkened backdrop filling the whole canvas.
    fn background(&self, src: &RgbFrame) -> RgbFrame {
        let mut bg = resize_bilinear(src, self.target_w, self.target_h);
        if !self.kernel.is_empty() {
            bg = blur_separable(&bg, &self.kernel);
        }
        brighten(&mut bg, self.brightness, self.darken);
        bg
    }
}

/// Resolve the configured kernel size: even sizes round up to the next odd
/// (a Gaussian kernel needs a center tap), non-positive disables the blur.
pub fn effective_kernel_size(configured: i32) -> Option<usize> {
    if configured <= 0 {
        return None;
    }
    let k = configured as usize;
    Some(if k % 2 == 1 { k } else { k + 1 })
}

/// Normalized 1-D Gaussian, `size` odd.
fn gaussian_kernel(size: usize, sigma: f32) -> Vec<f32> {
    let radius = (size / 2) as i32;
    let sigma = sigma.max(f32::EPSILON);
    let denom = 2.0 * sigma * sigma;
    let mut weights: Vec<f32> = (-radius..=radius)
        .map(|i| (-(i * i) as f32 / denom).exp())
        .collect();
    let sum: f32 = weights.iter().sum();
    for w in &mut weights {
        *w /= sum;
    }
    weights
}

/// Bilinear resize of a packed RGB24 frame.
///
/// Sample positions use the half-pixel-center mapping, so a same-size resize
/// is the identity and downscales stay centered.
fn resize_bilinear(src: &RgbFrame, dst_w: u32, dst_h: u32) -> RgbFrame {
    if src.width == dst_w && src.height == dst_h {
        return src.clone();
    }

    let sw = src.width as usize;
    let sh = src.height as usize;
    let x_ratio = src.width as f32 / dst_w as f32;
    let y_ratio = src.height as f32 / dst_h as f32;

    let mut dst = RgbFrame::black(dst_w, dst_h);
    let row_bytes = dst.row_bytes();

    dst.data
        .par_chunks_mut(row_bytes)
        .enumerate()
        .for_each(|(y, out_row)| {
            let sy = ((y as f32 + 0.5) * y_ratio - 0.5).max(0.0);
            let y0 = (sy as usize).min(sh - 1);
            let y1 = (y0 + 1).min(sh - 1);
            let fy = sy - y0 as f32;

            for x in 0..dst_w as usize {
                let sx = ((x as f32 + 0.5) * x_ratio - 0.5).max(0.0);
                let x0 = (sx as usize).min(sw - 1);
                let x1 = (x0 + 1).min(sw - 1);
                let fx = sx - x0 as f32;

                let p00 = (y0 * sw + x0) * CHANNELS;
                let p01 = (y0 * sw + x1) * CHANNELS;
                let p10 = (y1 * sw + x0) * CHANNELS;
                let p11 = (y1 * sw + x1) * CHANNELS;

                for c in 0..CHANNELS {
                    let top = src.data[p00 + c] as f32 * (1.0 - fx)
                        + src.data[p01 + c] as f32 * fx;
                    let bot = src.data[p10 + c] as f32 * (1.0 - fx)
                        + src.data[p11 + c] as f32 * fx;
                    out_row[x * CHANNELS + c] =
                        (top * (1.0 - fy) + bot * fy).round().clamp(0.0, 255.0) as u8;
                }
            }
        });

    dst
}

/// Separable Gaussian blur: horizontal pass, then vertical pass.
///
/// Edges clamp to the border pixel. f32 accumulation per channel keeps the
/// two passes from compounding rounding error.
fn blur_separable(src: &RgbFrame, kernel: &[f32]) -> RgbFrame {
    let w = src.width as usize;
    let h = src.height as usize;
    let radius = (kernel.len() / 2) as i64;
    let row_bytes = src.row_bytes();

    // Horizontal pass.
    let mut mid = RgbFrame::black(src.width, src.height);
    mid.data
        .par_chunks_mut(row_bytes)
        .enumerate()
        .for_each(|(y, out_row)| {
            let in_row = src.row(y);
            for x in 0..w {
                let mut acc = [0.0f32; CHANNELS];
                for (k, &weight) in kernel.iter().enumerate() {
                    let sx = (x as i64 + k as i64 - radius).clamp(0, w as i64 - 1) as usize;
                    for c in 0..CHANNELS {
                        acc[c] += in_row[sx * CHANNELS + c] as f32 * weight;
                    }
                }
                for c in 0..CHANNELS {
                    out_row[x * CHANNELS + c] = acc[c].round().clamp(0.0, 255.0) as u8;
                }
            }
        });

    // Vertical pass — reads whole rows from the intermediate, writes one
    // output row per task, so the parallel split stays row-aligned.
    let mut dst = RgbFrame::black(src.width, src.height);
    dst.data
        .par_chunks_mut(row_bytes)
        .enumerate()
        .for_each(|(y, out_row)| {
            for x in 0..w {
                let mut acc = [0.0f32; CHANNELS];
                for (k, &weight) in kernel.iter().enumerate() {
                    let sy = (y as i64 + k as i64 - radius).clamp(0, h as i64 - 1) as usize;
                    let in_row = mid.row(sy);
                    for c in 0..CHANNELS {
                        acc[c] += in_row[x * CHANNELS + c] as f32 * weight;
                    }
                }
                for c in 0..CHANNELS {
                    out_row[x * CHANNELS + c] = acc[c].round().clamp(0.0, 255.0) as u8;
                }
            }
        });

    dst
}

/// In-place brightness affine transform: `px' = clamp(px * a + b, 0, 255)`.
fn brighten(frame: &mut RgbFrame, a: f32, b: f32) {
    for px in &mut frame.data {
        *px = (*px as f32 * a + b).round().clamp(0.0, 255.0) as u8;
    }
}
