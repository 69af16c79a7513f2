//! Distributed executor: fan iterations out to a task runtime.
//!
//! The runtime may run tasks on any number of workers and hand results back
//! in completion order. The executor slots every result by its iteration
//! index, then feeds the ordered outputs to the same concatenation policies
//! the sequential executor uses, so both backends return identical buffers
//! for identical inputs.
//!
//! Scheduling, retries and worker lifecycle belong to the runtime. Any task
//! the runtime reports as failed fails the whole batch; when several fail,
//! the lowest iteration index is reported.

use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};

use crate::buffer::{Buffer, IntoBuffers};
use crate::concat::{Accumulator, Arity, IterationOutput, Stacked};
use crate::error::{ConcatError, Result};
use crate::params::{Context, Kwargs};
use crate::progress::{NoProgress, Progress};

/// Failure of a single task as reported by the runtime.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct TaskError(pub String);

impl TaskError {
    /// Describe a panic payload caught on a worker.
    pub fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "task panicked".to_string()
        };
        TaskError(message)
    }
}

/// One task's result, tagged with the iteration it belongs to.
#[derive(Debug)]
pub struct TaskOutcome {
    pub index: usize,
    pub result: std::result::Result<IterationOutput, TaskError>,
}

/// A task body as seen by the runtime.
pub type Task<'a> = dyn Fn(usize) -> IterationOutput + Sync + 'a;

/// A runtime that executes `n` independent, stateless tasks.
///
/// Implementations return one outcome per index in any order. They need not
/// guarantee ordering; the executor enforces it.
pub trait TaskRuntime: Sync {
    fn submit_many(&self, n: usize, task: &Task<'_>) -> Vec<TaskOutcome>;
}

/// Run one task, converting a panic into a [`TaskError`].
pub fn run_task(task: &Task<'_>, index: usize) -> TaskOutcome {
    let result = catch_unwind(AssertUnwindSafe(|| task(index))).map_err(TaskError::from_panic);
    TaskOutcome { index, result }
}

/// Runs tasks one after another on the calling thread.
#[derive(Clone, Copy, Debug, Default)]
pub struct InlineRuntime;

impl TaskRuntime for InlineRuntime {
    fn submit_many(&self, n: usize, task: &Task<'_>) -> Vec<TaskOutcome> {
        (0..n).map(|i| run_task(task, i)).collect()
    }
}

/// Runs tasks on a dedicated rayon thread pool.
///
/// Outcomes are returned in completion order.
#[cfg(feature = "parallel")]
pub struct ThreadPoolRuntime {
    pool: rayon::ThreadPool,
}

#[cfg(feature = "parallel")]
impl ThreadPoolRuntime {
    /// Build a pool with `workers` threads (`0` lets rayon pick).
    pub fn new(workers: usize) -> Result<Self> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("nanosweep-worker-{i}"))
            .build()
            .map_err(|e| ConcatError::Runtime(e.to_string()))?;
        Ok(Self { pool })
    }

    pub fn workers(&self) -> usize {
        self.pool.current_num_threads()
    }
}

#[cfg(feature = "parallel")]
impl TaskRuntime for ThreadPoolRuntime {
    fn submit_many(&self, n: usize, task: &Task<'_>) -> Vec<TaskOutcome> {
        use rayon::prelude::*;
        use std::sync::mpsc;

        log::debug!("submitting {n} tasks to {} workers", self.workers());
        let (tx, rx) = mpsc::channel();
        self.pool.install(|| {
            (0..n).into_par_iter().for_each_with(tx, |tx, i| {
                // The receiver outlives the pool scope, so sends cannot fail.
                let _ = tx.send(run_task(task, i));
            });
        });
        let outcomes: Vec<TaskOutcome> = rx.into_iter().collect();
        let failed = outcomes.iter().filter(|o| o.result.is_err()).count();
        if failed > 0 {
            log::warn!("{failed} of {n} tasks failed");
        }
        outcomes
    }
}

/// Slot outcomes by index. Every index in `0..n` must appear exactly once.
pub(crate) fn reorder(n: usize, outcomes: Vec<TaskOutcome>) -> Result<Vec<IterationOutput>> {
    let mut slots: Vec<Option<IterationOutput>> = (0..n).map(|_| None).collect();
    let mut first_failure: Option<(usize, TaskError)> = None;

    for TaskOutcome { index, result } in outcomes {
        let Some(slot) = slots.get_mut(index) else {
            return Err(ConcatError::Remote {
                index,
                message: format!("runtime returned an index outside 0..{n}"),
            });
        };
        match result {
            Ok(output) => {
                if slot.replace(output).is_some() {
                    return Err(ConcatError::Remote {
                        index,
                        message: "runtime returned a duplicate result".into(),
                    });
                }
            }
            Err(err) => {
                if first_failure.as_ref().is_none_or(|(i, _)| index < *i) {
                    first_failure = Some((index, err));
                }
            }
        }
    }

    if let Some((index, err)) = first_failure {
        return Err(ConcatError::Remote {
            index,
            message: err.0,
        });
    }

    slots
        .into_iter()
        .enumerate()
        .map(|(index, slot)| {
            slot.ok_or_else(|| ConcatError::Remote {
                index,
                message: "runtime returned no result".into(),
            })
        })
        .collect()
}

/// Fan out `n` iterations, reorder, and aggregate with the policy for `arity`.
///
/// The observer sees the ordered results, once per iteration.
pub fn run<A, F>(
    runtime: &dyn TaskRuntime,
    n: usize,
    arity: Arity,
    ctx: &Context<A>,
    apply: F,
    progress: &mut dyn Progress,
) -> Result<Stacked>
where
    A: Sync,
    F: Fn(usize, &A, &Kwargs) -> IterationOutput + Sync,
{
    let task = |i: usize| apply(i, &ctx.args, &ctx.kwargs);
    let ordered = reorder(n, runtime.submit_many(n, &task))?;

    let mut acc = Accumulator::new(arity, n);
    for (i, output) in ordered.into_iter().enumerate() {
        acc.push(i, output)?;
        progress
            .on_step(i, n)
            .map_err(|source| ConcatError::Progress { index: i, source })?;
    }
    progress.finish();
    acc.finish()
}

/// Distributed version of [`crate::sequential::apply_and_concat_none`].
pub fn apply_and_concat_none<A, F>(
    runtime: &dyn TaskRuntime,
    n: usize,
    ctx: &Context<A>,
    apply: F,
) -> Result<()>
where
    A: Sync,
    F: Fn(usize, &A, &Kwargs) + Sync,
{
    run(
        runtime,
        n,
        Arity::Discard,
        ctx,
        |i, args, kwargs| {
            apply(i, args, kwargs);
            IterationOutput::Nothing
        },
        &mut NoProgress,
    )
    .map(|_| ())
}

/// Distributed version of [`crate::sequential::apply_and_concat_one`].
pub fn apply_and_concat_one<A, F, R>(
    runtime: &dyn TaskRuntime,
    n: usize,
    ctx: &Context<A>,
    apply: F,
) -> Result<Buffer>
where
    A: Sync,
    F: Fn(usize, &A, &Kwargs) -> R + Sync,
    R: Into<Buffer>,
{
    match run(
        runtime,
        n,
        Arity::Single,
        ctx,
        |i, args, kwargs| IterationOutput::One(apply(i, args, kwargs).into()),
        &mut NoProgress,
    )? {
        Stacked::One(buffer) => Ok(buffer),
        _ => unreachable!("single policy yields one buffer"),
    }
}

/// Distributed version of [`crate::sequential::apply_and_concat_multiple`].
pub fn apply_and_concat_multiple<A, F, R>(
    runtime: &dyn TaskRuntime,
    n: usize,
    ctx: &Context<A>,
    apply: F,
) -> Result<Vec<Buffer>>
where
    A: Sync,
    F: Fn(usize, &A, &Kwargs) -> R + Sync,
    R: IntoBuffers,
{
    match run(
        runtime,
        n,
        Arity::Multi,
        ctx,
        |i, args, kwargs| IterationOutput::Many(apply(i, args, kwargs).into_buffers()),
        &mut NoProgress,
    )? {
        Stacked::Many(buffers) => Ok(buffers),
        _ => unreachable!("multi policy yields buffers"),
    }
}
