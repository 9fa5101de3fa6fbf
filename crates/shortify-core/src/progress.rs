// crates/shortify-core/src/progress.rs
//
// ProgressReporter: enforces the progress contract on behalf of the pipeline.
// The host's callback only ever sees values in [0, 100] that never decrease,
// and 100 is reported exactly when the pipeline says the export succeeded.

/// Wraps an optional host callback, clamping values to [0, 100] and dropping
/// any report that would move backwards. The callback runs synchronously on
/// the pipeline's own thread; marshaling to a UI thread is the caller's
/// concern.
pub struct ProgressReporter<'a> {
    callback: Option<&'a mut dyn FnMut(f64)>,
    last:     f64,
}

impl<'a> ProgressReporter<'a> {
    pub fn new(callback: Option<&'a mut dyn FnMut(f64)>) -> Self {
        Self { callback, last: 0.0 }
    }

    /// Report `value` percent complete.
    pub fn report(&mut self, value: f64) {
        let value = value.clamp(0.0, 100.0);
        if value < self.last {
            return;
        }
        self.last = value;
        if let Some(cb) = self.callback.as_mut() {
            cb(value);
        }
    }

    /// Interpolate within a stage: `report(lo + (hi - lo) * done/total)`.
    /// Used for the per-frame 60→100 export stretch.
    pub fn report_span(&mut self, lo: f64, hi: f64, done: u64, total: u64) {
        let frac = if total == 0 { 1.0 } else { done as f64 / total as f64 };
        self.report(lo + (hi - lo) * frac.clamp(0.0, 1.0));
    }
}
