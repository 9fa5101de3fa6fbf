// crates/shortify-media/src/worker.rs
//
// ConvertWorker: fire-and-forget background conversions. Each submitted job
// runs on its own thread; progress and completion come back over a shared
// bounded channel the host drains at its leisure.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use crossbeam_channel::{bounded, Receiver, Sender};
use uuid::Uuid;

use shortify_core::{ConversionOptions, ShortsError};

use crate::pipeline::convert;

/// One conversion request.
#[derive(Debug, Clone)]
pub struct ConvertJob {
    pub input:   PathBuf,
    pub output:  PathBuf,
    pub options: ConversionOptions,
}

/// Events emitted by a running job.
#[derive(Debug)]
pub enum ConvertEvent {
    Progress { job_id: Uuid, percent: f64 },
    Done     { job_id: Uuid, output: PathBuf },
    Failed   { job_id: Uuid, error: ShortsError },
}

pub struct ConvertWorker {
    /// Shared event channel: progress ticks and terminal results for all jobs.
    pub rx:   Receiver<ConvertEvent>,
    tx:       Sender<ConvertEvent>,
    shutdown: Arc<AtomicBool>,
}

impl ConvertWorker {
    pub fn new() -> Self {
        let (tx, rx) = bounded(512);
        Self {
            rx,
            tx,
            shutdown: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Spawn a background thread to run `job`. Returns the job id; every
    /// event for this job carries it, so hosts can run several jobs at once
    /// off one channel.
    pub fn submit(&self, job: ConvertJob) -> Uuid {
        let job_id = Uuid::new_v4();
        let tx = self.tx.clone();
        let sd = Arc::clone(&self.shutdown);

        thread::spawn(move || {
            if sd.load(Ordering::Relaxed) {
                let _ = tx.send(ConvertEvent::Failed {
                    job_id,
                    error: ShortsError::Processing("worker shutting down".into()),
                });
                return;
            }

            // Progress ticks are best-effort: a full channel drops the tick
            // rather than stalling the encode behind a slow consumer.
            let ptx = tx.clone();
            let mut on_progress = move |percent: f64| {
                let _ = ptx.try_send(ConvertEvent::Progress { job_id, percent });
            };

            let event = match convert(&job.input, &job.output, &job.options, Some(&mut on_progress)) {
                Ok(output) => ConvertEvent::Done { job_id, output },
                Err(error) => ConvertEvent::Failed { job_id, error },
            };
            let _ = tx.send(event);
        });

        job_id
    }

    /// Refuse new jobs. Jobs already running finish normally — conversion is
    /// a single blocking pass and leaves no partial state worth interrupting.
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::Relaxed);
    }
}

impl Default for ConvertWorker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn failed_job_reports_over_channel() {
        let worker = ConvertWorker::new();
        let dir = tempfile::tempdir().unwrap();
        let job_id = worker.submit(ConvertJob {
            input:   dir.path().join("missing.mp4"),
            output:  dir.path().join("out.mp4"),
            options: ConversionOptions::default(),
        });

        // Drain until the terminal event; progress ticks may precede it.
        loop {
            match worker.rx.recv_timeout(Duration::from_secs(10)).unwrap() {
                ConvertEvent::Progress { job_id: id, percent } => {
                    assert_eq!(id, job_id);
                    assert!((0.0..=100.0).contains(&percent));
                }
                ConvertEvent::Failed { job_id: id, error } => {
                    assert_eq!(id, job_id);
                    assert!(!error.is_validation());
                    break;
                }
                ConvertEvent::Done { .. } => panic!("job against a missing file succeeded"),
            }
        }
    }

    #[test]
    fn shutdown_refuses_new_jobs() {
        let worker = ConvertWorker::new();
        worker.shutdown();
        let dir = tempfile::tempdir().unwrap();
        worker.submit(ConvertJob {
            input:   dir.path().join("a.mp4"),
            output:  dir.path().join("b.mp4"),
            options: ConversionOptions::default(),
        });

        match worker.rx.recv_timeout(Duration::from_secs(10)).unwrap() {
            ConvertEvent::Failed { error, .. } => {
                assert!(error.to_string().contains("shutting down"));
            }
            other => panic!("expected Failed, got {other:?}"),
        }
    }
}
