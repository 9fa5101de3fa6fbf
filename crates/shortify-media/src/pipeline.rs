// crates/shortify-media/src/pipeline.rs
//
// The conversion pipeline: inspect → validate → trim → speed-adjust → fade →
// per-frame vertical layout → export as H.264 + AAC MP4.
//
// Single blocking pass over the source. Video and audio are multiplexed from
// the same demuxer packet loop; frames are decoded, composed, and encoded one
// at a time, so memory stays bounded to a handful of in-flight frames no
// matter how long the clip is.
//
// Timing model:
//   The output runs on its own clock — frame i of the output sits at source
//   time `start + i * speed / output_fps`. The OutputClock tracks which
//   output frames become due as decoded source frames arrive, duplicating
//   frames when the source is slower than the output rate and dropping them
//   when it is faster (or when speed > 1). Audio is time-scaled by routing
//   it through a resampler whose output rate is 44100 / speed and stamping
//   the result as 44100 Hz — uniform speedup, pitch following.
//
// Failure semantics:
//   Validation failures propagate verbatim as ShortsError::Validation before
//   anything is written. Every other failure becomes ShortsError::Processing
//   carrying the cause's message. All FFmpeg contexts are dropped on every
//   exit path; on failure the progress callback never sees 100.

use std::ops::Range;
use std::path::{Path, PathBuf};

use ffmpeg_the_third as ffmpeg;
use ffmpeg::codec;
use ffmpeg::format::sample::Type as SampleType;
use ffmpeg::format::{input as open_input, output as open_output, Pixel, Sample};
use ffmpeg::media::Type as MediaType;
use ffmpeg::software::resampling;
use ffmpeg::software::scaling::{Context as ScaleCtx, Flags as ScaleFlags};
use ffmpeg::util::channel_layout::ChannelLayout;
use ffmpeg::util::frame::audio::Audio as AudioFrame;
use ffmpeg::util::frame::video::Video as VideoFrame;
use ffmpeg::util::rational::Rational;
use ffmpeg::Packet;

use shortify_core::fade::{apply_video_fade, fadeout_gain};
use shortify_core::progress::ProgressReporter;
use shortify_core::{ConversionOptions, RgbFrame, ShortsError, VerticalLayout, VideoInfo};

use crate::encode::{self, AudioEncState, AUDIO_RATE};
use crate::probe;

/// Report encode progress every this many output frames.
const PROGRESS_INTERVAL: u64 = 15;

/// True when emitting frame `idx` completes a progress interval. Keyed on
/// the index itself so duplicated-frame batches tick once per interval
/// crossed, not once per batch.
#[inline]
fn report_tick(idx: u64) -> bool {
    (idx + 1) % PROGRESS_INTERVAL == 0
}

// ── Public entry points ───────────────────────────────────────────────────────

/// Convert `input` into a vertical shorts clip at `output`.
///
/// Returns the output path on success. `progress_callback` (if provided) is
/// invoked synchronously on this thread with values in [0, 100], never
/// decreasing; 100 is reported only after the file is fully written.
pub fn convert(
    input:             &Path,
    output:            &Path,
    options:           &ConversionOptions,
    progress_callback: Option<&mut dyn FnMut(f64)>,
) -> Result<PathBuf, ShortsError> {
    let mut progress = ProgressReporter::new(progress_callback);
    progress.report(0.0);

    eprintln!("[shortify] loading video: {}", input.display());
    let info = probe::inspect(input)?;

    options.validate(&info).map_err(ShortsError::Validation)?;
    progress.report(10.0);

    run_convert(input, output, options, &info, &mut progress)
        .map_err(ShortsError::Processing)?;

    progress.report(100.0);
    eprintln!("[shortify] conversion complete: {}", output.display());
    Ok(output.to_path_buf())
}

/// Convert with smart defaults: short sources pass through unchanged, longer
/// ones get the speedup required to land just under the 60-second cap.
pub fn auto_convert(input: &Path, output: &Path) -> Result<PathBuf, ShortsError> {
    let info = probe::inspect(input)?;

    let options = if info.is_short() {
        ConversionOptions::default()
    } else {
        // Leave a 1-second margin under the cap.
        let required_speed = info.duration / 59.0;
        eprintln!(
            "[shortify] video is {:.1}s, using {required_speed:.2}x speed",
            info.duration
        );
        ConversionOptions { speed: required_speed, ..Default::default() }
    };

    convert(input, output, &options, None)
}

/// Convert a specific segment of the source.
pub fn convert_segment(
    input:    &Path,
    output:   &Path,
    start:    f64,
    duration: f64,
) -> Result<PathBuf, ShortsError> {
    let options = ConversionOptions {
        start_time: start,
        duration: Some(duration),
        ..Default::default()
    };
    convert(input, output, &options, None)
}

/// Convert the whole source at a given speed multiplier.
pub fn convert_with_speed(
    input:  &Path,
    output: &Path,
    speed:  f64,
) -> Result<PathBuf, ShortsError> {
    let options = ConversionOptions { speed, ..Default::default() };
    convert(input, output, &options, None)
}

// ── Trim window ───────────────────────────────────────────────────────────────

/// Resolve the source interval `[start, end)` to convert.
///
/// Short sources are passed through whole — segment options are ignored for
/// them, mirroring the validation short-circuit. A segment end is clamped to
/// the source duration.
fn trim_window(info: &VideoInfo, options: &ConversionOptions) -> (f64, f64) {
    if info.is_short() {
        return (0.0, info.duration);
    }
    match options.duration {
        Some(d) => (
            options.start_time,
            (options.start_time + d).min(info.duration),
        ),
        None => (options.start_time, info.duration),
    }
}

// ── Output clock ──────────────────────────────────────────────────────────────

/// Maps decoded source timestamps onto the output frame timeline.
struct OutputClock {
    start:    f64,
    speed:    f64,
    fps:      f64,
    total:    u64,
    next_idx: u64,
}

impl OutputClock {
    fn new(start: f64, speed: f64, fps: u32, output_duration: f64) -> Self {
        Self {
            start,
            speed,
            fps: fps as f64,
            total: (output_duration * fps as f64).ceil().max(1.0) as u64,
            next_idx: 0,
        }
    }

    /// Time of output frame `idx` on the output timeline.
    fn out_time(&self, idx: u64) -> f64 {
        idx as f64 / self.fps
    }

    /// Source time at which output frame `idx` becomes due.
    fn deadline(&self, idx: u64) -> f64 {
        self.start + self.out_time(idx) * self.speed
    }

    /// Output frame indices that become due once the decoder reaches `src_t`.
    /// Empty when the source is running ahead of the output rate (frames are
    /// dropped); longer than one when it lags (frames are duplicated).
    fn due(&mut self, src_t: f64) -> Range<usize> {
        let first = self.next_idx;
        while self.next_idx < self.total && self.deadline(self.next_idx) <= src_t + 1e-9 {
            self.next_idx += 1;
        }
        first as usize..self.next_idx as usize
    }

    /// Indices still owed at end of stream (rounding tail / early EOF).
    fn remaining(&mut self) -> Range<usize> {
        let first = self.next_idx;
        self.next_idx = self.total;
        first as usize..self.total as usize
    }

    fn done(&self) -> u64 {
        self.next_idx
    }

    fn total(&self) -> u64 {
        self.total
    }
}

// ── Internal implementation ───────────────────────────────────────────────────

fn run_convert(
    input_path:  &Path,
    output_path: &Path,
    options:     &ConversionOptions,
    info:        &VideoInfo,
    progress:    &mut ProgressReporter,
) -> Result<(), String> {
    // ── Trim window ───────────────────────────────────────────────────────────
    let (start, end) = trim_window(info, options);
    if !info.is_short() && (start > 0.0 || end < info.duration) {
        eprintln!("[shortify] using segment: {start:.1}s - {end:.1}s");
    }
    progress.report(20.0);

    // Actual output duration for this window — anchors both fade ramps.
    let output_duration = (end - start) / options.speed;

    // ── Open input ────────────────────────────────────────────────────────────
    let mut ictx = open_input(input_path)
        .map_err(|e| format!("open '{}': {e}", input_path.display()))?;

    let video_stream_idx = ictx
        .streams()
        .best(MediaType::Video)
        .ok_or_else(|| format!("no video stream in '{}'", input_path.display()))?
        .index();

    let audio_stream_idx: Option<usize> = if info.has_audio {
        ictx.streams().best(MediaType::Audio).map(|s| s.index())
    } else {
        None
    };

    let in_video_tb = ictx.stream(video_stream_idx).unwrap().time_base();

    // ── Video decoder ─────────────────────────────────────────────────────────
    let vdec_ctx = codec::context::Context::from_parameters(
        ictx.stream(video_stream_idx).unwrap().parameters(),
    )
    .map_err(|e| format!("video decoder context: {e}"))?;

    let mut video_decoder = vdec_ctx
        .decoder()
        .video()
        .map_err(|e| format!("open video decoder: {e}"))?;

    // ── Audio decoder (when the source has audio) ─────────────────────────────
    let mut audio_decoder: Option<ffmpeg::decoder::audio::Audio> = None;
    let mut in_audio_tb = Rational::new(1, AUDIO_RATE);

    if let Some(asi) = audio_stream_idx {
        let ast = ictx.stream(asi).unwrap();
        in_audio_tb = ast.time_base();
        let ctx = codec::context::Context::from_parameters(ast.parameters())
            .map_err(|e| format!("audio decoder context: {e}"))?;
        audio_decoder = Some(
            ctx.decoder()
                .audio()
                .map_err(|e| format!("open audio decoder: {e}"))?,
        );
    }

    // ── Display dimensions (visible pixels, no macroblock padding) ────────────
    // AVCodecParameters carries the display size; decoded frame width/height
    // are the coded size, padded to macroblock alignment (e.g. 1920×1088).
    let (src_w, src_h) = {
        let stream = ictx.stream(video_stream_idx).unwrap();
        let params = stream.parameters();
        let w = params.width() as u32;
        let h = params.height() as u32;
        if w > 0 && h > 0 {
            (w, h)
        } else {
            (video_decoder.width(), video_decoder.height())
        }
    };

    // ── Seek to the trim in-point ─────────────────────────────────────────────
    // Lands on the keyframe at or before `start`; the pre-roll check in the
    // decode loop burns forward to the exact in-point.
    if start > 0.0 {
        let seek_ts = (start * ffmpeg::ffi::AV_TIME_BASE as f64) as i64;
        ictx.seek(seek_ts, ..=seek_ts)
            .map_err(|e| format!("seek in '{}': {e}", input_path.display()))?;
    }

    // ── Speed handling ────────────────────────────────────────────────────────
    // Audio is routed through a resampler targeting 44100 / speed, then
    // stamped as 44100 Hz — a uniform time-scale of the audio track.
    if options.speed != 1.0 {
        eprintln!("[shortify] applying speed: {:.2}x", options.speed);
    }
    let resample_rate = ((AUDIO_RATE as f64) / options.speed).round().max(1.0) as u32;
    progress.report(40.0);

    // ── Fade + layout setup ───────────────────────────────────────────────────
    if options.video_fadeout > 0.0 {
        eprintln!("[shortify] video fadeout: {:.1}s", options.video_fadeout);
    }
    let layout = VerticalLayout::new(options);
    progress.report(50.0);

    // ── Output context ────────────────────────────────────────────────────────
    if let Some(parent) = output_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .map_err(|e| format!("create output directory '{}': {e}", parent.display()))?;
        }
    }

    eprintln!("[shortify] exporting to: {}", output_path.display());
    let mut octx = open_output(output_path)
        .map_err(|e| format!("could not open output '{}': {e}", output_path.display()))?;

    let bitrate = encode::parse_bitrate(&options.output_bitrate)?;
    let mut video_encoder = encode::add_video_stream(
        &mut octx,
        options.target_width,
        options.target_height,
        options.output_fps,
        bitrate,
    )?;

    let mut audio_state = if audio_decoder.is_some() {
        Some(AudioEncState::add_to(
            &mut octx,
            output_duration,
            options.audio_fadeout,
        )?)
    } else {
        None
    };

    octx.write_header()
        .map_err(|e| format!("write output header: {e}"))?;
    progress.report(60.0);

    let frame_tb = Rational::new(1, options.output_fps as i32);
    let ost_video_tb = octx.stream(0).unwrap().time_base();

    let mut clock = OutputClock::new(start, options.speed, options.output_fps, output_duration);
    let half_frame = 0.5 / info.fps.max(1.0);

    // Decode scaler is deferred until the first frame reveals the input pixel
    // format; the encode scaler's input (our RGB canvas) is fixed up front.
    let mut decode_scaler: Option<ScaleCtx> = None;
    let mut encode_scaler = ScaleCtx::get(
        Pixel::RGB24,
        options.target_width,
        options.target_height,
        Pixel::YUV420P,
        options.target_width,
        options.target_height,
        ScaleFlags::BILINEAR,
    )
    .map_err(|e| format!("create encode scaler: {e}"))?;

    let mut audio_resampler: Option<resampling::Context> = None;

    // Most recent composed (pre-fade) frame — duplicated for output frames
    // that come due between source frames and for the EOF tail.
    let mut last_composed: Option<RgbFrame> = None;

    // ── Packet loop ───────────────────────────────────────────────────────────
    'packet_loop: for result in ictx.packets() {
        let (stream, packet) = result
            .map_err(|e| format!("read packet from '{}': {e}", input_path.display()))?;

        let sidx = stream.index();

        // ── Video packet ──────────────────────────────────────────────────────
        if sidx == video_stream_idx {
            video_decoder
                .send_packet(&packet)
                .map_err(|e| format!("send video packet to decoder: {e}"))?;

            let mut decoded = VideoFrame::empty();
            while video_decoder.receive_frame(&mut decoded).is_ok() {
                let src_t = decoded
                    .pts()
                    .map(|pts| pts as f64 * f64::from(in_video_tb))
                    .unwrap_or(0.0);

                // Skip pre-roll frames before the trim in-point.
                if src_t < start - half_frame {
                    continue;
                }
                // Stop once past the out-point; audio is cut by the same check.
                if src_t >= end {
                    break 'packet_loop;
                }

                let due = clock.due(src_t);
                if due.is_empty() {
                    continue; // source running ahead of the output rate
                }

                if decode_scaler.is_none() {
                    decode_scaler = Some(make_decode_scaler(decoded.format(), src_w, src_h)?);
                }
                let sc = decode_scaler
                    .as_mut()
                    .ok_or_else(|| "decode scaler not initialised".to_string())?;

                let mut rgb = VideoFrame::empty();
                sc.run(&decoded, &mut rgb)
                    .map_err(|e| format!("scale video frame: {e}"))?;

                let composed = layout.compose(&destripe_rgb(&rgb, src_w, src_h));

                for idx in due {
                    let idx = idx as u64;
                    encode_output_frame(
                        &composed,
                        idx,
                        clock.out_time(idx),
                        output_duration,
                        options.video_fadeout,
                        &mut encode_scaler,
                        &mut video_encoder,
                        &mut octx,
                        frame_tb,
                        ost_video_tb,
                    )?;
                    if report_tick(idx) {
                        progress.report_span(60.0, 99.0, idx + 1, clock.total());
                    }
                }
                last_composed = Some(composed);
            }
        }
        // ── Audio packet ──────────────────────────────────────────────────────
        else if Some(sidx) == audio_stream_idx {
            if let (Some(adec), Some(astate)) = (&mut audio_decoder, &mut audio_state) {
                // Soft-fail: one bad audio packet should not abort the export.
                if adec.send_packet(&packet).is_err() {
                    continue;
                }

                let mut raw = AudioFrame::empty();
                while adec.receive_frame(&mut raw).is_ok() {
                    let t = raw
                        .pts()
                        .map(|pts| pts as f64 * f64::from(in_audio_tb))
                        .unwrap_or(0.0);

                    // Generous in-point window so frames spanning the trim
                    // boundary aren't silenced.
                    if t < start - 0.05 || t >= end {
                        continue;
                    }

                    push_audio(&raw, resample_rate, &mut audio_resampler, astate)?;
                    astate.drain_fifo(&mut octx, false)?;
                }
            }
        }
    }

    // ── Drain video decoder ───────────────────────────────────────────────────
    // Codecs with B-frames hold frames internally; flush them through the
    // same emit path.
    let _ = video_decoder.send_eof();
    let mut decoded = VideoFrame::empty();
    while video_decoder.receive_frame(&mut decoded).is_ok() {
        let src_t = decoded
            .pts()
            .map(|pts| pts as f64 * f64::from(in_video_tb))
            .unwrap_or(0.0);
        if src_t < start - half_frame {
            continue;
        }
        if src_t >= end {
            break;
        }

        let due = clock.due(src_t);
        if due.is_empty() {
            continue;
        }
        if let Some(sc) = &mut decode_scaler {
            let mut rgb = VideoFrame::empty();
            if sc.run(&decoded, &mut rgb).is_ok() {
                let composed = layout.compose(&destripe_rgb(&rgb, src_w, src_h));
                for idx in due {
                    let idx = idx as u64;
                    encode_output_frame(
                        &composed,
                        idx,
                        clock.out_time(idx),
                        output_duration,
                        options.video_fadeout,
                        &mut encode_scaler,
                        &mut video_encoder,
                        &mut octx,
                        frame_tb,
                        ost_video_tb,
                    )?;
                }
                last_composed = Some(composed);
            }
        }
    }

    // ── Drain audio decoder ───────────────────────────────────────────────────
    if let (Some(adec), Some(astate)) = (&mut audio_decoder, &mut audio_state) {
        let _ = adec.send_eof();
        let mut raw = AudioFrame::empty();
        while adec.receive_frame(&mut raw).is_ok() {
            let t = raw
                .pts()
                .map(|pts| pts as f64 * f64::from(in_audio_tb))
                .unwrap_or(0.0);
            if t < start - 0.05 || t >= end {
                continue;
            }
            push_audio(&raw, resample_rate, &mut audio_resampler, astate)?;
        }
        astate.drain_fifo(&mut octx, false)?;
    }

    // ── Pad the output tail ───────────────────────────────────────────────────
    // Duration rounding and early EOF can leave the last few output frames
    // unemitted; duplicate the final composed frame so the clip runs exactly
    // its advertised length.
    let remaining = clock.remaining();
    if !remaining.is_empty() {
        let composed = last_composed
            .as_ref()
            .ok_or_else(|| format!("no video frames decoded in '{}'", input_path.display()))?;
        for idx in remaining {
            let idx = idx as u64;
            encode_output_frame(
                composed,
                idx,
                clock.out_time(idx),
                output_duration,
                options.video_fadeout,
                &mut encode_scaler,
                &mut video_encoder,
                &mut octx,
                frame_tb,
                ost_video_tb,
            )?;
        }
    } else if last_composed.is_none() {
        return Err(format!("no video frames decoded in '{}'", input_path.display()));
    }

    // ── Flush video encoder ───────────────────────────────────────────────────
    video_encoder
        .send_eof()
        .map_err(|e| format!("send EOF to video encoder: {e}"))?;
    let mut pkt = Packet::empty();
    while video_encoder.receive_packet(&mut pkt).is_ok() {
        pkt.set_stream(0);
        pkt.rescale_ts(frame_tb, ost_video_tb);
        pkt.write_interleaved(&mut octx)
            .map_err(|e| format!("write flush video packet: {e}"))?;
    }

    // ── Flush audio FIFO then encoder ─────────────────────────────────────────
    if let Some(astate) = &mut audio_state {
        astate.drain_fifo(&mut octx, true)?;
        astate.flush_encoder(&mut octx)?;
    }

    octx.write_trailer()
        .map_err(|e| format!("write trailer: {e}"))?;

    Ok(())
}

// ── Frame helpers ─────────────────────────────────────────────────────────────

/// Copy a scaled RGB24 VideoFrame into a packed RgbFrame, stripping strides.
fn destripe_rgb(frame: &VideoFrame, w: u32, h: u32) -> RgbFrame {
    let stride = frame.stride(0);
    let raw = frame.data(0);
    let row_bytes = w as usize * 3;
    let data: Vec<u8> = (0..h as usize)
        .flat_map(|row| &raw[row * stride..row * stride + row_bytes])
        .copied()
        .collect();
    RgbFrame::from_packed(w, h, data)
}

/// Fade, convert to YUV420P, and encode one composed output frame.
#[allow(clippy::too_many_arguments)]
fn encode_output_frame(
    composed:      &RgbFrame,
    idx:           u64,
    out_time:      f64,
    output_total:  f64,
    video_fadeout: f64,
    scaler:        &mut ScaleCtx,
    encoder:       &mut ffmpeg::encoder::Video,
    octx:          &mut ffmpeg::format::context::Output,
    frame_tb:      Rational,
    ost_tb:        Rational,
) -> Result<(), String> {
    let gain = fadeout_gain(out_time, output_total, video_fadeout);
    let faded;
    let frame = if gain < 1.0 {
        let mut f = composed.clone();
        apply_video_fade(&mut f, gain);
        faded = f;
        &faded
    } else {
        composed
    };

    // Re-stride the packed canvas into an FFmpeg frame.
    let mut rgb = VideoFrame::new(Pixel::RGB24, frame.width, frame.height);
    let stride = rgb.stride(0);
    let data = rgb.data_mut(0);
    let row_bytes = frame.row_bytes();
    for row in 0..frame.height as usize {
        data[row * stride..row * stride + row_bytes].copy_from_slice(frame.row(row));
    }

    let mut yuv = VideoFrame::empty();
    scaler
        .run(&rgb, &mut yuv)
        .map_err(|e| format!("convert frame to YUV: {e}"))?;
    yuv.set_pts(Some(idx as i64));
    // swscale inherits the source SAR; force square pixels so players don't
    // letterbox. No safe setter exists in this version of ffmpeg-the-third.
    unsafe {
        (*yuv.as_mut_ptr()).sample_aspect_ratio = ffmpeg::ffi::AVRational { num: 1, den: 1 };
    }

    encoder
        .send_frame(&yuv)
        .map_err(|e| format!("send video frame to encoder: {e}"))?;

    let mut pkt = Packet::empty();
    while encoder.receive_packet(&mut pkt).is_ok() {
        pkt.set_stream(0);
        pkt.rescale_ts(frame_tb, ost_tb);
        pkt.write_interleaved(octx)
            .map_err(|e| format!("write video packet: {e}"))?;
    }
    Ok(())
}

/// Scaler from the decoded pixel format to packed-compatible RGB24 at the
/// source display size.
fn make_decode_scaler(format: Pixel, w: u32, h: u32) -> Result<ScaleCtx, String> {
    ScaleCtx::get(
        format,       w, h,
        Pixel::RGB24, w, h,
        ScaleFlags::BILINEAR,
    )
    .map_err(|e| format!("create decode scaler: {e}"))
}

/// Resampler from `raw`'s format to stereo FLTP at `resample_rate`.
fn make_resampler(raw: &AudioFrame, resample_rate: u32) -> Result<resampling::Context, String> {
    // Mono sources must be declared as MONO or swr misreads the layout.
    let src_layout = if raw.ch_layout().channels() >= 2 {
        raw.ch_layout()
    } else {
        ChannelLayout::MONO
    };
    resampling::Context::get2(
        raw.format(),                 src_layout,            raw.rate(),
        Sample::F32(SampleType::Planar), ChannelLayout::STEREO, resample_rate,
    )
    .map_err(|e| format!("create audio resampler: {e}"))
}

/// Resample (if needed) and push one decoded audio frame into the FIFO.
///
/// The resampler is created lazily on the first frame so the real input
/// format is known before the SwrContext is built.
fn push_audio(
    raw:           &AudioFrame,
    resample_rate: u32,
    resampler:     &mut Option<resampling::Context>,
    state:         &mut AudioEncState,
) -> Result<(), String> {
    let target_fmt = Sample::F32(SampleType::Planar);
    let needs_resample = raw.format() != target_fmt
        || raw.rate() != resample_rate
        || raw.ch_layout().channels() != 2;

    if !needs_resample {
        state.fifo.push(raw);
        return Ok(());
    }

    if resampler.is_none() {
        *resampler = Some(make_resampler(raw, resample_rate)?);
    }
    let rs = resampler
        .as_mut()
        .ok_or_else(|| "audio resampler not initialised".to_string())?;

    let mut resampled = AudioFrame::empty();
    if rs.run(raw, &mut resampled).is_ok() && resampled.samples() > 0 {
        state.fifo.push(&resampled);
    }
    Ok(())
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
    fn trim_window_short_source_is_untouched() {
        let options = ConversionOptions {
            start_time: 10.0,
            duration: Some(20.0),
            ..Default::default()
        };
        assert_eq!(trim_window(&info(45.0), &options), (0.0, 45.0));
    }

    #[test]
    fn trim_window_segment() {
        let options = ConversionOptions {
            start_time: 30.0,
            duration: Some(20.0),
            ..Default::default()
        };
        assert_eq!(trim_window(&info(120.0), &options), (30.0, 50.0));
    }

    #[test]
    fn trim_window_segment_clamps_to_source_end() {
        let options = ConversionOptions {
            start_time: 100.0,
            duration: Some(50.0),
            ..Default::default()
        };
        assert_eq!(trim_window(&info(120.0), &options), (100.0, 120.0));
    }

    #[test]
    fn trim_window_start_only() {
        let options = ConversionOptions { start_time: 30.0, ..Default::default() };
        assert_eq!(trim_window(&info(120.0), &options), (30.0, 120.0));
    }

    #[test]
    fn clock_total_rounds_up() {
        let clock = OutputClock::new(0.0, 1.0, 30, 1.05);
        assert_eq!(clock.total(), 32); // ceil(31.5)
    }

    #[test]
    fn clock_matched_rates_emit_one_frame_each() {
        let mut clock = OutputClock::new(0.0, 1.0, 30, 1.0);
        let mut emitted = 0;
        for j in 0..30 {
            emitted += clock.due(j as f64 / 30.0).len();
        }
        assert_eq!(emitted, 30);
        assert!(clock.remaining().is_empty());
    }

    #[test]
    fn clock_duplicates_when_source_is_slow() {
        // 10 fps source feeding a 30 fps output: 3 output frames per source frame.
        let mut clock = OutputClock::new(0.0, 1.0, 30, 1.0);
        let mut per_frame = Vec::new();
        for j in 0..10 {
            per_frame.push(clock.due(j as f64 / 10.0).len());
        }
        assert_eq!(per_frame[0], 1); // only frame 0 due at t=0
        assert!(per_frame[1..].iter().all(|&n| n == 3));
        // The tail (deadlines past the last source frame) pads at EOF.
        assert_eq!(clock.remaining().len() + per_frame.iter().sum::<usize>(), 30);
    }

    #[test]
    fn clock_drops_when_speed_doubles() {
        // 2x speed: output deadlines advance twice as fast through source
        // time, so half the 30 fps source frames are dropped.
        let mut clock = OutputClock::new(0.0, 2.0, 30, 1.0);
        let mut emitted = 0;
        for j in 0..60 {
            emitted += clock.due(j as f64 / 30.0).len();
        }
        assert_eq!(emitted, 30);
    }

    #[test]
    fn clock_honors_trim_start() {
        let mut clock = OutputClock::new(10.0, 1.0, 30, 1.0);
        // Frames before the in-point never come due.
        assert!(clock.due(9.9).is_empty());
        assert_eq!(clock.due(10.0).len(), 1);
    }

    #[test]
    fn clock_remaining_covers_early_eof() {
        let mut clock = OutputClock::new(0.0, 1.0, 30, 2.0);
        let emitted = clock.due(0.5).len() as u64;
        let rest = clock.remaining();
        assert_eq!(emitted + rest.len() as u64, clock.total());
        assert_eq!(clock.done(), clock.total());
    }

    #[test]
    fn progress_ticks_fire_once_per_interval_across_batches() {
        // Every output index is emitted exactly once regardless of how due()
        // batches them, so filtering over the indices themselves gives the
        // full tick sequence — one per interval, none skipped.
        let ticks: Vec<u64> = (0..90).filter(|&i| report_tick(i)).map(|i| i + 1).collect();
        assert_eq!(ticks, vec![15, 30, 45, 60, 75, 90]);
    }

    #[test]
    fn unsupported_decode_format_is_an_error_not_a_panic() {
        let err = make_decode_scaler(Pixel::None, 1920, 1080).err().unwrap();
        assert!(err.contains("create decode scaler"));
    }

    #[test]
    fn bad_resampler_config_is_an_error_not_a_panic() {
        use ffmpeg::util::channel_layout::ChannelLayoutMask;
        // A frame that never had its sample rate set cannot seed a resampler.
        let raw = AudioFrame::new(Sample::F32(SampleType::Planar), 64, ChannelLayoutMask::STEREO);
        let err = make_resampler(&raw, 44_100).err().unwrap();
        assert!(err.contains("create audio resampler"));
    }

    #[test]
    fn validation_failure_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.mp4");
        let out = dir.path().join("out/clip.mp4");
        // Inspect fails before anything else happens; no output dir created.
        let err = convert(&missing, &out, &ConversionOptions::default(), None).unwrap_err();
        assert!(!err.is_validation());
        assert!(!out.parent().unwrap().exists());
    }
}
