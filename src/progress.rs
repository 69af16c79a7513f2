//! Progress observers notified once per completed iteration.

use std::time::Instant;

use log::info;

/// Returned by an observer to abort the batch.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct ProgressError(pub String);

/// Observer called between iterations.
///
/// `on_step` runs inside the iteration loop, so an error it returns fails
/// the whole batch like any other iteration failure.
pub trait Progress {
    /// Iteration `index` (of `total`) has completed.
    fn on_step(&mut self, index: usize, total: usize) -> Result<(), ProgressError>;

    /// All iterations completed successfully.
    fn finish(&mut self) {}
}

/// Disabled observer.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoProgress;

impl Progress for NoProgress {
    #[inline]
    fn on_step(&mut self, _index: usize, _total: usize) -> Result<(), ProgressError> {
        Ok(())
    }
}

/// Reports progress through the `log` facade every `every` iterations.
#[derive(Debug)]
pub struct LogProgress {
    label: String,
    every: usize,
    started: Instant,
}

impl LogProgress {
    pub fn new(label: impl Into<String>, every: usize) -> Self {
        Self {
            label: label.into(),
            every: every.max(1),
            started: Instant::now(),
        }
    }
}

impl Progress for LogProgress {
    fn on_step(&mut self, index: usize, total: usize) -> Result<(), ProgressError> {
        let done = index + 1;
        if done % self.every == 0 && done != total {
            info!("{}: {done}/{total}", self.label);
        }
        Ok(())
    }

    fn finish(&mut self) {
        info!(
            "{}: done in {:.3}s",
            self.label,
            self.started.elapsed().as_secs_f64()
        );
    }
}

/// Observer backed by a closure.
pub struct FnProgress<F>(pub F)
where
    F: FnMut(usize, usize) -> Result<(), ProgressError>;

impl<F> Progress for FnProgress<F>
where
    F: FnMut(usize, usize) -> Result<(), ProgressError>,
{
    fn on_step(&mut self, index: usize, total: usize) -> Result<(), ProgressError> {
        (self.0)(index, total)
    }
}
