// crates/shortify-core/src/lib.rs
//
// Pure conversion logic — no FFmpeg dependency. Everything here operates on
// plain values and raw RGB byte buffers, so it unit-tests without media files.
//
// shortify-media layers the decode/encode machinery on top of these types.

pub mod error;
pub mod fade;
pub mod frame;
pub mod info;
pub mod layout;
pub mod options;
pub mod progress;

// Re-export the main public API so shortify-media imports are simple.
pub use error::ShortsError;
pub use frame::RgbFrame;
pub use info::VideoInfo;
pub use layout::VerticalLayout;
pub use options::{ConversionOptions, SHORTS_MAX_SECS};
pub use progress::ProgressReporter;
