// crates/shortify-media/src/lib.rs
//
// FFmpeg-backed side of shortify: probing, the conversion pipeline, and the
// background ConvertWorker. No pixel math lives here — that is all in
// shortify-core, which this crate feeds with packed RGB frames.

pub mod encode;
pub mod pipeline;
pub mod probe;
pub mod worker;

// Re-export the main public API so hosts get one import path.
pub use pipeline::{auto_convert, convert, convert_segment, convert_with_speed};
pub use probe::inspect;
pub use worker::{ConvertEvent, ConvertJob, ConvertWorker};

pub use shortify_core::{ConversionOptions, ShortsError, VideoInfo};
