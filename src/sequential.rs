//! Sequential executor: the baseline, always-correct path.
//!
//! Iterations run in ascending order on the calling thread. Apply functions
//! receive the iteration index plus the shared [`Context`] (positional and
//! keyed arguments) and may return buffers of any shape and dtype; outputs
//! are collected and stacked once at the end, with dtype promotion.

use crate::buffer::{Buffer, IntoBuffers};
use crate::concat::{Accumulator, Arity, IterationOutput, Stacked};
use crate::error::{ConcatError, Result};
use crate::params::{Context, Kwargs};
use crate::progress::Progress;

/// Run `n` iterations in order and aggregate them with the policy for `arity`.
///
/// The observer is notified exactly once per completed iteration, also for
/// [`Arity::Discard`].
pub fn run<A, F>(
    n: usize,
    arity: Arity,
    ctx: &Context<A>,
    mut apply: F,
    progress: &mut dyn Progress,
) -> Result<Stacked>
where
    F: FnMut(usize, &A, &Kwargs) -> IterationOutput,
{
    let mut acc = Accumulator::new(arity, n);
    for i in 0..n {
        acc.push(i, apply(i, &ctx.args, &ctx.kwargs))?;
        progress
            .on_step(i, n)
            .map_err(|source| ConcatError::Progress { index: i, source })?;
    }
    progress.finish();
    acc.finish()
}

/// For each `i` in `0..n`, call `apply` for its side effects. Returns nothing.
pub fn apply_and_concat_none<A, F>(
    n: usize,
    ctx: &Context<A>,
    mut apply: F,
    progress: &mut dyn Progress,
) -> Result<()>
where
    F: FnMut(usize, &A, &Kwargs),
{
    run(
        n,
        Arity::Discard,
        ctx,
        |i, args, kwargs| {
            apply(i, args, kwargs);
            IterationOutput::Nothing
        },
        progress,
    )
    .map(|_| ())
}

/// For each `i` in `0..n`, call `apply` and stack the results column-wise.
///
/// Each result must be a single 1-D or 2-D buffer. Column blocks appear in
/// iteration order; column counts may differ between iterations.
///
/// # Example
///
/// ```
/// use nanosweep::{Context, NoProgress, sequential};
///
/// let ctx = Context::new(vec![1.0, 2.0, 3.0]);
/// let out = sequential::apply_and_concat_one(
///     3,
///     &ctx,
///     |i, close, _| close.iter().map(|c| c * (i + 1) as f64).collect::<Vec<_>>(),
///     &mut NoProgress,
/// )
/// .unwrap();
/// assert_eq!(out.shape(), (3, 3));
/// ```
pub fn apply_and_concat_one<A, F, R>(
    n: usize,
    ctx: &Context<A>,
    mut apply: F,
    progress: &mut dyn Progress,
) -> Result<Buffer>
where
    F: FnMut(usize, &A, &Kwargs) -> R,
    R: Into<Buffer>,
{
    let stacked = run(
        n,
        Arity::Single,
        ctx,
        |i, args, kwargs| IterationOutput::One(apply(i, args, kwargs).into()),
        progress,
    )?;
    Ok(stacked.into_one().unwrap_or_else(|| unreachable!("single policy yields one buffer")))
}

/// Like [`apply_and_concat_one`], but each result is a tuple of buffers.
///
/// The buffers at position `j` of every iteration are stacked into output
/// `j`. The tuple length must stay the same across iterations.
pub fn apply_and_concat_multiple<A, F, R>(
    n: usize,
    ctx: &Context<A>,
    mut apply: F,
    progress: &mut dyn Progress,
) -> Result<Vec<Buffer>>
where
    F: FnMut(usize, &A, &Kwargs) -> R,
    R: IntoBuffers,
{
    let stacked = run(
        n,
        Arity::Multi,
        ctx,
        |i, args, kwargs| IterationOutput::Many(apply(i, args, kwargs).into_buffers()),
        progress,
    )?;
    Ok(stacked.into_many().unwrap_or_else(|| unreachable!("multi policy yields buffers")))
}
