//! Combine adapters: turn a binary combine function into an apply function
//! or a left fold.
//!
//! [`combine_and_concat`] maps one pivot object against a fixed list of
//! candidates and stacks the results, one column block per candidate.
//! [`combine_multiple`] reduces a list into a single object.
//!
//! The fold is strictly sequential: each step consumes the previous result,
//! so it is only parallelizable if the combine function is associative,
//! which these adapters do not assume.

use crate::buffer::Buffer;
use crate::compiled;
use crate::distributed::{self, TaskRuntime};
use crate::error::{ConcatError, Result};
use crate::params::{Context, Kwargs};
use crate::progress::NoProgress;
use crate::sequential;

/// Combine `obj` with `others[i]`.
///
/// # Panics
///
/// Panics if `i >= others.len()`; executors only call it with `i` in range.
#[inline]
pub fn select_and_combine<T, O, A, R, F>(
    i: usize,
    obj: &T,
    others: &[O],
    combine: F,
    args: &A,
    kwargs: &Kwargs,
) -> R
where
    T: ?Sized,
    F: Fn(&T, &O, &A, &Kwargs) -> R,
{
    combine(obj, &others[i], args, kwargs)
}

/// Combine `obj` with every element of `others` and stack the results.
///
/// Column blocks are ordered like `others`.
///
/// # Example
///
/// ```
/// use nanosweep::{Context, combine};
///
/// let close = vec![10.0, 11.0, 12.0];
/// let thresholds = [10.5, 11.5];
/// let above = combine::combine_and_concat(
///     &close,
///     &thresholds,
///     &Context::new(()),
///     |c: &Vec<f64>, t: &f64, _: &(), _| c.iter().map(|v| v > t).collect::<Vec<bool>>(),
/// )
/// .unwrap();
/// assert_eq!(above.shape(), (3, 2));
/// ```
pub fn combine_and_concat<T, O, A, R, F>(
    obj: &T,
    others: &[O],
    ctx: &Context<A>,
    combine: F,
) -> Result<Buffer>
where
    T: ?Sized,
    F: Fn(&T, &O, &A, &Kwargs) -> R,
    R: Into<Buffer>,
{
    sequential::apply_and_concat_one(
        others.len(),
        ctx,
        |i, args, kwargs| select_and_combine(i, obj, others, &combine, args, kwargs),
        &mut NoProgress,
    )
}

/// [`combine_and_concat`] on the preallocated path: positional arguments only,
/// homogeneous results required.
pub fn combine_and_concat_compiled<T, O, A, R, F>(
    obj: &T,
    others: &[O],
    args: &A,
    combine: F,
) -> Result<Buffer>
where
    T: ?Sized,
    A: ?Sized,
    F: Fn(&T, &O, &A) -> R,
    R: Into<Buffer>,
{
    compiled::apply_and_concat_one(others.len(), args, |i, a| combine(obj, &others[i], a))
}

/// [`combine_and_concat`] with the combinations fanned out to `runtime`.
pub fn combine_and_concat_distributed<T, O, A, R, F>(
    runtime: &dyn TaskRuntime,
    obj: &T,
    others: &[O],
    ctx: &Context<A>,
    combine: F,
) -> Result<Buffer>
where
    T: Sync + ?Sized,
    O: Sync,
    A: Sync,
    F: Fn(&T, &O, &A, &Kwargs) -> R + Sync,
    R: Into<Buffer>,
{
    distributed::apply_and_concat_one(runtime, others.len(), ctx, |i, args, kwargs| {
        select_and_combine(i, obj, others, &combine, args, kwargs)
    })
}

/// Left-fold `objs` with `combine`: `combine(combine(objs[0], objs[1]), objs[2])...`.
///
/// A single object is returned unchanged without calling `combine`.
///
/// # Example
///
/// ```
/// use nanosweep::{Context, combine};
///
/// let joined = combine::combine_multiple(
///     &["a".to_string(), "b".into(), "c".into()],
///     &Context::new(()),
///     |acc: &String, next: &String, _: &(), _| format!("({acc}{next})"),
/// )
/// .unwrap();
/// assert_eq!(joined, "((ab)c)");
/// ```
pub fn combine_multiple<T, A, F>(objs: &[T], ctx: &Context<A>, mut combine: F) -> Result<T>
where
    T: Clone,
    F: FnMut(&T, &T, &A, &Kwargs) -> T,
{
    let (first, rest) = objs.split_first().ok_or(ConcatError::EmptyBatch)?;
    let mut result = first.clone();
    for obj in rest {
        result = combine(&result, obj, &ctx.args, &ctx.kwargs);
    }
    Ok(result)
}

/// [`combine_multiple`] with the narrower positional-only signature.
pub fn combine_multiple_compiled<T, A, F>(objs: &[T], args: &A, combine: F) -> Result<T>
where
    T: Clone,
    A: ?Sized,
    F: Fn(&T, &T, &A) -> T,
{
    let (first, rest) = objs.split_first().ok_or(ConcatError::EmptyBatch)?;
    Ok(rest
        .iter()
        .fold(first.clone(), |acc, obj| combine(&acc, obj, args)))
}
