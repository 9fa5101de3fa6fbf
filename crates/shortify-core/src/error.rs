// crates/shortify-core/src/error.rs
//
// The two error kinds that cross the pipeline boundary. Validation failures
// are user-correctable (fix the options, retry); processing failures are
// terminal for the invocation. Lower-level failure types (FFmpeg, I/O, JSON)
// never escape — they are mapped to Processing with the cause's message.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ShortsError {
    /// Conversion options are inconsistent with the source video or the
    /// 60-second cap. Surfaced verbatim before any file I/O happens.
    #[error("invalid conversion options: {0}")]
    Validation(String),

    /// File unreadable, decode/encode failure, disk error. Carries the
    /// underlying cause's message; no automatic retry.
    #[error("video processing failed: {0}")]
    Processing(String),
}

impl ShortsError {
    pub fn is_validation(&self) -> bool {
        matches!(self, ShortsError::Validation(_))
    }
}
