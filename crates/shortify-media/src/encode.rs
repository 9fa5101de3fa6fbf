// crates/shortify-media/src/encode.rs
//
// Output-side plumbing for the conversion pipeline: H.264 + AAC MP4 muxing.
//
// Stream layout in the output MP4:
//   Stream 0 — H.264 video (YUV420P, configured bitrate, preset medium)
//   Stream 1 — AAC audio  (FLTP stereo, 44100 Hz, 128 kbps) — only when the
//              source has audio; silent sources produce a video-only file.
//
// PTS strategy:
//   Video: monotonically increasing output frame index in 1/output_fps.
//   Audio: monotonically increasing sample counter in 1/44100.
//   Both start at zero, so source trimming and speed scaling never leak
//   timestamp discontinuities into the output.
//
// Audio FIFO:
//   AAC wants exactly `encoder.frame_size()` samples per input frame, while
//   decoded/resampled PCM arrives in arbitrary chunks. Everything is drained
//   into a stereo FLTP ring buffer; full frames are popped off the front and
//   the tail is zero-padded at the final flush. The audio fade-out gain is
//   applied at pop time, where the absolute output sample index is known.

use ffmpeg_the_third as ffmpeg;
use ffmpeg::codec::{self, Id as CodecId};
use ffmpeg::encoder;
use ffmpeg::format::sample::Type as SampleType;
use ffmpeg::format::{Pixel, Sample};
use ffmpeg::util::channel_layout::{ChannelLayout, ChannelLayoutMask};
use ffmpeg::util::frame::audio::Audio as AudioFrame;
use ffmpeg::util::rational::Rational;
use ffmpeg::Packet;

use shortify_core::fade::fadeout_gain;

/// Output audio sample rate for all exports.
pub const AUDIO_RATE: i32 = 44100;

/// AAC bitrate for all exports.
const AUDIO_BITRATE: usize = 128_000;

/// Bounded encoder thread count handed to libx264.
const ENCODER_THREADS: &str = "4";

// ── Bitrate parsing ───────────────────────────────────────────────────────────

/// Parse a bitrate string ("8000k", "8M", "8000000") into bits per second.
pub fn parse_bitrate(spec: &str) -> Result<usize, String> {
    let trimmed = spec.trim();
    let (digits, multiplier) = match trimmed.chars().last() {
        Some('k') | Some('K') => (&trimmed[..trimmed.len() - 1], 1_000.0),
        Some('m') | Some('M') => (&trimmed[..trimmed.len() - 1], 1_000_000.0),
        _ => (trimmed, 1.0),
    };
    let value: f64 = digits
        .parse()
        .map_err(|_| format!("invalid bitrate '{spec}'"))?;
    if value <= 0.0 {
        return Err(format!("invalid bitrate '{spec}'"));
    }
    Ok((value * multiplier) as usize)
}

// ── Video encoder (stream 0) ──────────────────────────────────────────────────

/// Add the H.264 stream to `octx` and open its encoder.
///
/// The codec context is created independently of the output stream — Stream
/// does not expose a .codec() accessor in this version of ffmpeg-the-third —
/// and the opened context's parameters are copied into the stream's codecpar
/// via FFI, the only place libavcodec leaves them intact after open.
pub fn add_video_stream(
    octx:    &mut ffmpeg::format::context::Output,
    width:   u32,
    height:  u32,
    fps:     u32,
    bitrate: usize,
) -> Result<ffmpeg::encoder::Video, String> {
    let out_tb = Rational::new(1, fps as i32);

    let h264 = encoder::find(CodecId::H264)
        .ok_or_else(|| "H.264 encoder not found — is libx264 available?".to_string())?;

    let mut ost = octx
        .add_stream(h264)
        .map_err(|e| format!("add video stream: {e}"))?;
    ost.set_time_base(out_tb);

    let enc_ctx = codec::context::Context::new_with_codec(h264);
    let mut enc = enc_ctx
        .encoder()
        .video()
        .map_err(|e| format!("create video encoder context: {e}"))?;

    enc.set_width(width);
    enc.set_height(height);
    enc.set_format(Pixel::YUV420P);
    enc.set_time_base(out_tb);
    enc.set_frame_rate(Some(Rational::new(fps as i32, 1)));
    enc.set_bit_rate(bitrate);

    let mut opts = ffmpeg::Dictionary::new();
    opts.set("preset", "medium");
    opts.set("threads", ENCODER_THREADS);

    let mut opened = enc
        .open_as_with(h264, opts)
        .map_err(|e| format!("open H.264 encoder: {e}"))?;

    // Square pixels. Must be set on the OPENED context — libavcodec resets
    // sample_aspect_ratio during codec initialisation.
    opened.set_aspect_ratio(Rational::new(1, 1));

    unsafe {
        let ret = ffmpeg::ffi::avcodec_parameters_from_context(
            (**(*octx.as_mut_ptr()).streams.add(0)).codecpar,
            opened.as_ptr() as *mut ffmpeg::ffi::AVCodecContext,
        );
        if ret < 0 {
            return Err(format!("avcodec_parameters_from_context (video) failed: {ret}"));
        }
    }

    Ok(opened)
}

// ── Audio FIFO ────────────────────────────────────────────────────────────────

/// Stereo FLTP (float planar) sample ring buffer.
///
/// Left channel samples are in `left`; right in `right`. Mono sources fill
/// both planes from channel 0 so the output is always properly stereo.
pub struct AudioFifo {
    left:  Vec<f32>,
    right: Vec<f32>,
    /// Total output duration in seconds — the fade ramp's anchor.
    total_secs: f64,
    /// Fade-out tail length; 0 disables the gain ramp.
    fade_secs: f64,
}

impl AudioFifo {
    pub fn new(total_secs: f64, fade_secs: f64) -> Self {
        Self {
            left: Vec::new(),
            right: Vec::new(),
            total_secs,
            fade_secs,
        }
    }

    /// How many samples are currently buffered (per channel).
    pub fn len(&self) -> usize {
        self.left.len()
    }

    pub fn is_empty(&self) -> bool {
        self.left.is_empty()
    }

    /// Append one decoded / resampled FLTP audio frame (stereo or mono;
    /// mono frames are duplicated to both output channels).
    pub fn push(&mut self, frame: &AudioFrame) {
        let n = frame.samples();
        if n == 0 {
            return;
        }
        unsafe {
            let l_bytes = frame.data(0);
            let l_f32 = std::slice::from_raw_parts(l_bytes.as_ptr() as *const f32, n);
            self.left.extend_from_slice(l_f32);

            let r_bytes = if frame.ch_layout().channels() >= 2 {
                frame.data(1)
            } else {
                frame.data(0)
            };
            let r_f32 = std::slice::from_raw_parts(r_bytes.as_ptr() as *const f32, n);
            self.right.extend_from_slice(r_f32);
        }
    }

    /// Pop one encoder-sized frame from the front of the FIFO, applying the
    /// fade-out gain per sample. If fewer than `n` samples remain the tail is
    /// zero-padded (final flush only). PTS is `sample_idx` in 1/44100.
    pub fn pop_frame(&mut self, n: usize, sample_idx: i64) -> AudioFrame {
        let available = self.left.len().min(n);

        let mut frame = AudioFrame::new(
            Sample::F32(SampleType::Planar),
            n,
            ChannelLayoutMask::STEREO,
        );
        frame.set_rate(AUDIO_RATE as u32);
        frame.set_pts(Some(sample_idx));

        unsafe {
            let ldata = frame.data_mut(0);
            let ldst = std::slice::from_raw_parts_mut(ldata.as_mut_ptr() as *mut f32, n);
            let rdata = frame.data_mut(1);
            let rdst = std::slice::from_raw_parts_mut(rdata.as_mut_ptr() as *mut f32, n);

            for j in 0..available {
                let t = (sample_idx + j as i64) as f64 / AUDIO_RATE as f64;
                let gain = fadeout_gain(t, self.total_secs, self.fade_secs);
                ldst[j] = self.left[j] * gain;
                rdst[j] = self.right[j] * gain;
            }
            ldst[available..].fill(0.0);
            rdst[available..].fill(0.0);
        }

        self.left.drain(..available);
        self.right.drain(..available);

        frame
    }
}

// ── Audio encoder state (stream 1) ────────────────────────────────────────────

/// Everything needed to drive the AAC encoder across the whole conversion.
pub struct AudioEncState {
    encoder:        ffmpeg::encoder::Audio,
    /// Next output frame's PTS in samples (audio stream timebase = 1/44100).
    out_sample_idx: i64,
    /// AAC frame size in samples (typically 1024).
    frame_size:     usize,
    pub fifo:       AudioFifo,
    /// 1/AUDIO_RATE — used for PTS rescaling when writing packets.
    audio_tb:       Rational,
    /// The muxer-assigned timebase for stream 1 (may differ from audio_tb).
    ost_audio_tb:   Rational,
}

impl AudioEncState {
    /// Add the AAC stream to `octx`, open its encoder, and wire up the FIFO.
    ///
    /// Must be called after `add_video_stream` — the audio stream index is
    /// hard-wired to 1.
    pub fn add_to(
        octx:       &mut ffmpeg::format::context::Output,
        total_secs: f64,
        fade_secs:  f64,
    ) -> Result<Self, String> {
        let audio_tb = Rational::new(1, AUDIO_RATE);

        let aac = encoder::find(CodecId::AAC)
            .ok_or_else(|| "AAC encoder not found".to_string())?;

        let mut ost = octx
            .add_stream(aac)
            .map_err(|e| format!("add audio stream: {e}"))?;
        ost.set_time_base(audio_tb);

        let enc_ctx = codec::context::Context::new_with_codec(aac);
        let mut enc = enc_ctx
            .encoder()
            .audio()
            .map_err(|e| format!("create audio encoder context: {e}"))?;

        enc.set_rate(AUDIO_RATE);
        enc.set_ch_layout(ChannelLayout::STEREO);
        enc.set_format(Sample::F32(SampleType::Planar));
        enc.set_bit_rate(AUDIO_BITRATE);

        let encoder = enc
            .open_as_with(aac, ffmpeg::Dictionary::new())
            .map_err(|e| format!("open AAC encoder: {e}"))?;

        // Guard against a codec that reports 0 (shouldn't happen with AAC).
        let frame_size = (encoder.frame_size() as usize).max(1024);

        // Muxer-assigned timebase for stream 1, read before the header write.
        let ost_audio_tb = octx.stream(1).unwrap().time_base();

        unsafe {
            let ret = ffmpeg::ffi::avcodec_parameters_from_context(
                (**(*octx.as_mut_ptr()).streams.add(1)).codecpar,
                encoder.as_ptr() as *mut ffmpeg::ffi::AVCodecContext,
            );
            if ret < 0 {
                return Err(format!("avcodec_parameters_from_context (audio) failed: {ret}"));
            }
        }

        Ok(Self {
            encoder,
            out_sample_idx: 0,
            frame_size,
            fifo: AudioFifo::new(total_secs, fade_secs),
            audio_tb,
            ost_audio_tb,
        })
    }

    /// Drain buffered samples → encode → write interleaved to `octx`.
    ///
    /// In normal operation (`flush = false`) only full frames are sent. At
    /// the end of the conversion (`flush = true`) the partial tail frame is
    /// zero-padded and sent so no PCM is lost.
    pub fn drain_fifo(
        &mut self,
        octx:  &mut ffmpeg::format::context::Output,
        flush: bool,
    ) -> Result<(), String> {
        while self.fifo.len() >= self.frame_size || (flush && !self.fifo.is_empty()) {
            let frame = self.fifo.pop_frame(self.frame_size, self.out_sample_idx);
            self.out_sample_idx += self.frame_size as i64;

            self.encoder
                .send_frame(&frame)
                .map_err(|e| format!("send audio frame to encoder: {e}"))?;

            self.drain_packets(octx)?;
        }
        Ok(())
    }

    /// Receive all available encoded packets and write them to the muxer.
    fn drain_packets(
        &mut self,
        octx: &mut ffmpeg::format::context::Output,
    ) -> Result<(), String> {
        let mut pkt = Packet::empty();
        while self.encoder.receive_packet(&mut pkt).is_ok() {
            pkt.set_stream(1);
            pkt.rescale_ts(self.audio_tb, self.ost_audio_tb);
            pkt.write_interleaved(octx)
                .map_err(|e| format!("write audio packet: {e}"))?;
        }
        Ok(())
    }

    /// Send EOF to the AAC encoder and flush any remaining output packets.
    pub fn flush_encoder(
        &mut self,
        octx: &mut ffmpeg::format::context::Output,
    ) -> Result<(), String> {
        self.encoder
            .send_eof()
            .map_err(|e| format!("send EOF to audio encoder: {e}"))?;
        self.drain_packets(octx)
    }
}
