//! Trial execution, serial or on a shared rayon thread pool.
//!
//! Every simulation trial writes only to its own output slot and seeds its
//! own generator from the trial index, so the serial and parallel paths
//! produce identical outputs for the same seed.

use crate::error::EvalResult;

#[cfg(feature = "parallel")]
use rayon::prelude::*;
#[cfg(feature = "parallel")]
use rayon::ThreadPool;
#[cfg(feature = "parallel")]
use std::sync::OnceLock;

#[cfg(feature = "parallel")]
static THREAD_POOL: OnceLock<Option<ThreadPool>> = OnceLock::new();

/// Get or initialize the shared thread pool.
///
/// Returns `None` if the pool could not be built, in which case work runs
/// on rayon's global pool.
#[cfg(feature = "parallel")]
pub fn get_thread_pool() -> Option<&'static ThreadPool> {
    THREAD_POOL
        .get_or_init(|| match rayon::ThreadPoolBuilder::new().build() {
            Ok(pool) => Some(pool),
            Err(err) => {
                tracing::warn!(error = %err, "failed to build thread pool; using the global pool");
                None
            }
        })
        .as_ref()
}

/// Execute a parallel operation using the shared thread pool.
#[cfg(feature = "parallel")]
pub fn install<OP, R>(op: OP) -> R
where
    OP: FnOnce() -> R + Send,
    R: Send,
{
    match get_thread_pool() {
        Some(pool) => pool.install(op),
        None => op(),
    }
}

/// Run `op` on the current thread.
#[cfg(not(feature = "parallel"))]
pub fn install<OP, R>(op: OP) -> R
where
    OP: FnOnce() -> R,
{
    op()
}

/// Run `trial(state, index, slot)` for every slot of `out`.
///
/// `init` builds per-worker scratch state (buffers, generators). The first
/// failing trial aborts the whole run.
#[cfg(feature = "parallel")]
pub(crate) fn run_trials<T, S, I, F>(out: &mut [T], init: I, trial: F) -> EvalResult<()>
where
    T: Send,
    I: Fn() -> S + Send + Sync,
    F: Fn(&mut S, usize, &mut T) -> EvalResult<()> + Send + Sync,
{
    install(|| {
        out.par_iter_mut()
            .enumerate()
            .try_for_each_init(&init, |state, (index, slot)| trial(state, index, slot))
    })
}

#[cfg(not(feature = "parallel"))]
pub(crate) fn run_trials<T, S, I, F>(out: &mut [T], init: I, trial: F) -> EvalResult<()>
where
    I: Fn() -> S,
    F: Fn(&mut S, usize, &mut T) -> EvalResult<()>,
{
    run_trials_serial(out, init, trial)
}

/// Serial reference path of [`run_trials`].
#[cfg_attr(all(feature = "parallel", not(test)), allow(dead_code))]
pub(crate) fn run_trials_serial<T, S, I, F>(out: &mut [T], init: I, trial: F) -> EvalResult<()>
where
    I: Fn() -> S,
    F: Fn(&mut S, usize, &mut T) -> EvalResult<()>,
{
    let mut state = init();
    for (index, slot) in out.iter_mut().enumerate() {
        trial(&mut state, index, slot)?;
    }
    Ok(())
}
