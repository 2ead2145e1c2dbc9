//! Progress observation for the long-running simulation loops.
//!
//! Observers implement [`ProgressSink`] (any `Fn(ProgressStage, usize,
//! usize) + Send + Sync` closure does). The simulation loops never call a
//! sink directly; they tick a [`ThrottledProgress`], which forwards at most
//! one update per interval plus a final completion update.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::constants::PROGRESS_INTERVAL_SECS;

/// Which simulation loop is reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProgressStage {
    /// Resampling the no-advertising distribution to build the null.
    NullDistribution,
    /// Annual projection trials.
    Projection,
}

/// Receiver of `(stage, completed_trials, total_trials)` updates.
///
/// Sinks may be called from worker threads when the `parallel` feature is
/// enabled. Within one stage, `completed_trials` never decreases.
pub trait ProgressSink: Send + Sync {
    /// Called with the number of finished trials out of `total`.
    fn report(&self, stage: ProgressStage, completed: usize, total: usize);
}

impl<F> ProgressSink for F
where
    F: Fn(ProgressStage, usize, usize) + Send + Sync,
{
    fn report(&self, stage: ProgressStage, completed: usize, total: usize) {
        self(stage, completed, total)
    }
}

#[derive(Debug)]
struct EmitState {
    last_emit: Instant,
    last_reported: usize,
}

/// Rate-limited, thread-safe trial counter in front of an optional sink.
pub struct ThrottledProgress<'a> {
    sink: Option<&'a dyn ProgressSink>,
    stage: ProgressStage,
    total: usize,
    interval: Duration,
    completed: AtomicUsize,
    state: Mutex<EmitState>,
}

impl<'a> ThrottledProgress<'a> {
    /// Counter for `total` trials of `stage`, forwarding at most once per second.
    pub fn new(sink: Option<&'a dyn ProgressSink>, stage: ProgressStage, total: usize) -> Self {
        Self::with_interval(
            sink,
            stage,
            total,
            Duration::from_secs_f64(PROGRESS_INTERVAL_SECS),
        )
    }

    /// Counter with a custom forwarding interval.
    pub fn with_interval(
        sink: Option<&'a dyn ProgressSink>,
        stage: ProgressStage,
        total: usize,
        interval: Duration,
    ) -> Self {
        Self {
            sink,
            stage,
            total,
            interval,
            completed: AtomicUsize::new(0),
            state: Mutex::new(EmitState {
                last_emit: Instant::now(),
                last_reported: 0,
            }),
        }
    }

    /// Trials finished so far.
    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::Relaxed)
    }

    /// Record one finished trial.
    pub fn tick(&self) {
        let done = self.completed.fetch_add(1, Ordering::Relaxed) + 1;
        let Some(sink) = self.sink else {
            return;
        };

        // Skip rather than wait when another thread is emitting.
        if let Ok(mut state) = self.state.try_lock() {
            if state.last_emit.elapsed() >= self.interval && done > state.last_reported {
                state.last_emit = Instant::now();
                state.last_reported = done;
                sink.report(self.stage, done, self.total);
            }
        }
    }

    /// Send the final `(completed, total)` update.
    pub fn finish(&self) {
        let Some(sink) = self.sink else {
            return;
        };
        let mut state = match self.state.lock() {
            Ok(state) => state,
            Err(poisoned) => poisoned.into_inner(),
        };
        let done = self.completed().max(state.last_reported);
        state.last_reported = done;
        sink.report(self.stage, done, self.total);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_closure_is_sink() {
        let seen = Mutex::new(Vec::new());
        let sink = |stage: ProgressStage, done: usize, total: usize| {
            seen.lock().unwrap().push((stage, done, total));
        };
        let progress = ThrottledProgress::new(Some(&sink), ProgressStage::Projection, 3);
        for _ in 0..3 {
            progress.tick();
        }
        progress.finish();

        let seen = seen.into_inner().unwrap();
        // Ticks within the first second are throttled away.
        assert_eq!(seen, vec![(ProgressStage::Projection, 3, 3)]);
    }

    #[test]
    fn test_zero_interval_reports_monotonically() {
        let seen = Mutex::new(Vec::new());
        let sink = |_: ProgressStage, done: usize, _: usize| seen.lock().unwrap().push(done);
        let progress = ThrottledProgress::with_interval(
            Some(&sink),
            ProgressStage::NullDistribution,
            50,
            Duration::ZERO,
        );
        std::thread::scope(|scope| {
            for _ in 0..5 {
                scope.spawn(|| {
                    for _ in 0..10 {
                        progress.tick();
                    }
                });
            }
        });
        progress.finish();

        let seen = std::mem::take(&mut *seen.lock().unwrap());
        assert!(seen.windows(2).all(|w| w[0] <= w[1]), "{seen:?}");
        assert_eq!(*seen.last().unwrap(), 50);
        assert_eq!(progress.completed(), 50);
    }

    #[test]
    fn test_without_sink_only_counts() {
        let progress = ThrottledProgress::new(None, ProgressStage::Projection, 10);
        progress.tick();
        progress.tick();
        progress.finish();
        assert_eq!(progress.completed(), 2);
    }
}
