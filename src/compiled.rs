//! Compiled executor: the preallocated fast path.
//!
//! Apply functions here have the narrower signature `Fn(usize, &A) -> R`:
//! positional arguments only, no keyed arguments. The function must behave
//! as a pure function of its arguments.
//!
//! Iteration 0 runs first and fixes the homogeneity descriptor of every
//! output position (row count and dtype, plus the tuple length for the
//! multi variant). Output storage is then reserved once, column-major, for
//! `rows x (n * cols_0)` elements, and each iteration's columns are written
//! at the running column offset in a single ascending pass. Nothing is
//! stacked afterwards.
//!
//! Column counts may still differ between iterations: the backing store
//! grows past the reservation when an iteration is wider than iteration 0
//! and the final buffer is sized to the columns actually written. Row count
//! or dtype drift is fatal; unlike [`crate::sequential`], no promotion
//! happens.

use ndarray::{Array2, ShapeBuilder};

use crate::buffer::{Buffer, DType, Element, IntoBuffers};
use crate::concat::{Arity, IterationOutput, Stacked, tuple_len_mismatch};
use crate::error::{ConcatError, Result};
use crate::progress::{NoProgress, Progress};

/// Column-major storage for one output position.
struct ColumnSink<T> {
    rows: usize,
    cols: usize,
    data: Vec<T>,
}

impl<T: Element> ColumnSink<T> {
    fn with_capacity(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols: 0,
            data: Vec::with_capacity(rows * cols),
        }
    }

    fn write(&mut self, block: &Array2<T>) {
        // Transposed logical order is column-major order of `block`.
        self.data.extend(block.t().iter().copied());
        self.cols += block.ncols();
    }

    /// Release the unused reservation before handing the storage over.
    fn into_array(mut self) -> Result<Array2<T>> {
        self.data.shrink_to_fit();
        Ok(Array2::from_shape_vec((self.rows, self.cols).f(), self.data)?)
    }

    fn finish(self) -> Result<Buffer> {
        Ok(T::wrap(self.into_array()?))
    }
}

/// A [`ColumnSink`] for whichever dtype iteration 0 produced.
enum Sink {
    Bool(ColumnSink<bool>),
    I64(ColumnSink<i64>),
    F64(ColumnSink<f64>),
}

impl Sink {
    /// Reserve room for `n` iterations shaped like `first`.
    fn preallocate(first: &Buffer, n: usize) -> Self {
        let (rows, cols) = first.shape();
        let reserved = cols.saturating_mul(n);
        match first.dtype() {
            DType::Bool => Sink::Bool(ColumnSink::with_capacity(rows, reserved)),
            DType::I64 => Sink::I64(ColumnSink::with_capacity(rows, reserved)),
            DType::F64 => Sink::F64(ColumnSink::with_capacity(rows, reserved)),
        }
    }

    fn dtype(&self) -> DType {
        match self {
            Sink::Bool(_) => DType::Bool,
            Sink::I64(_) => DType::I64,
            Sink::F64(_) => DType::F64,
        }
    }

    fn rows(&self) -> usize {
        match self {
            Sink::Bool(s) => s.rows,
            Sink::I64(s) => s.rows,
            Sink::F64(s) => s.rows,
        }
    }

    /// Write `block` at the current column offset after checking it against
    /// the descriptor fixed by iteration 0.
    fn write(&mut self, block: &Buffer, position: usize, iteration: usize) -> Result<()> {
        if block.rows() != self.rows() {
            return Err(ConcatError::ShapeMismatch {
                position,
                iteration,
                expected: self.rows(),
                found: block.rows(),
            });
        }
        match (self, block) {
            (Sink::Bool(s), Buffer::Bool(a)) => s.write(a),
            (Sink::I64(s), Buffer::I64(a)) => s.write(a),
            (Sink::F64(s), Buffer::F64(a)) => s.write(a),
            (sink, block) => {
                return Err(ConcatError::DTypeMismatch {
                    position,
                    iteration,
                    expected: sink.dtype(),
                    found: block.dtype(),
                });
            }
        }
        Ok(())
    }

    fn finish(self) -> Result<Buffer> {
        match self {
            Sink::Bool(s) => s.finish(),
            Sink::I64(s) => s.finish(),
            Sink::F64(s) => s.finish(),
        }
    }
}

fn notify(progress: &mut dyn Progress, index: usize, n: usize) -> Result<()> {
    progress
        .on_step(index, n)
        .map_err(|source| ConcatError::Progress { index, source })
}

pub(crate) fn run_none<A, F>(
    n: usize,
    args: &A,
    apply: F,
    progress: &mut dyn Progress,
) -> Result<()>
where
    A: ?Sized,
    F: Fn(usize, &A) -> Result<()>,
{
    for i in 0..n {
        apply(i, args)?;
        notify(progress, i, n)?;
    }
    progress.finish();
    Ok(())
}

pub(crate) fn run_one<A, F>(
    n: usize,
    args: &A,
    apply: F,
    progress: &mut dyn Progress,
) -> Result<Buffer>
where
    A: ?Sized,
    F: Fn(usize, &A) -> Result<Buffer>,
{
    if n == 0 {
        return Err(ConcatError::EmptyBatch);
    }

    let first = apply(0, args)?;
    let mut sink = Sink::preallocate(&first, n);
    sink.write(&first, 0, 0)?;
    drop(first);
    notify(progress, 0, n)?;

    for i in 1..n {
        sink.write(&apply(i, args)?, 0, i)?;
        notify(progress, i, n)?;
    }
    progress.finish();
    sink.finish()
}

pub(crate) fn run_multiple<A, F>(
    n: usize,
    args: &A,
    apply: F,
    progress: &mut dyn Progress,
) -> Result<Vec<Buffer>>
where
    A: ?Sized,
    F: Fn(usize, &A) -> Result<Vec<Buffer>>,
{
    if n == 0 {
        return Err(ConcatError::EmptyBatch);
    }

    let first = apply(0, args)?;
    let arity = first.len();
    let mut sinks: Vec<Sink> = first.iter().map(|b| Sink::preallocate(b, n)).collect();
    for (position, (sink, block)) in sinks.iter_mut().zip(&first).enumerate() {
        sink.write(block, position, 0)?;
    }
    drop(first);
    notify(progress, 0, n)?;

    for i in 1..n {
        let outputs = apply(i, args)?;
        if outputs.len() != arity {
            return Err(tuple_len_mismatch(i, arity, outputs.len()));
        }
        for (position, (sink, block)) in sinks.iter_mut().zip(&outputs).enumerate() {
            sink.write(block, position, i)?;
        }
        notify(progress, i, n)?;
    }
    progress.finish();
    sinks.into_iter().map(Sink::finish).collect()
}

/// Dispatch on `arity` with an [`IterationOutput`]-returning function.
pub(crate) fn run<A, F>(
    n: usize,
    arity: Arity,
    args: &A,
    apply: F,
    progress: &mut dyn Progress,
) -> Result<Stacked>
where
    A: ?Sized,
    F: Fn(usize, &A) -> IterationOutput,
{
    let mismatch = |iteration: usize, found: &IterationOutput| ConcatError::ArityMismatch {
        iteration,
        expected: arity.to_string(),
        found: found.arity().to_string(),
    };

    match arity {
        Arity::Discard => run_none(
            n,
            args,
            |i, a| {
                apply(i, a);
                Ok(())
            },
            progress,
        )
        .map(|()| Stacked::Nothing),
        Arity::Single => run_one(
            n,
            args,
            |i, a| match apply(i, a) {
                IterationOutput::One(b) => Ok(b),
                other => Err(mismatch(i, &other)),
            },
            progress,
        )
        .map(Stacked::One),
        Arity::Multi => run_multiple(
            n,
            args,
            |i, a| match apply(i, a) {
                IterationOutput::Many(v) => Ok(v),
                other => Err(mismatch(i, &other)),
            },
            progress,
        )
        .map(Stacked::Many),
    }
}

/// For each `i` in `0..n`, call `apply(i, args)` for its side effects.
pub fn apply_and_concat_none<A, F>(n: usize, args: &A, apply: F)
where
    A: ?Sized,
    F: Fn(usize, &A),
{
    for i in 0..n {
        apply(i, args);
    }
}

/// Preallocated version of [`crate::sequential::apply_and_concat_one`].
///
/// Every iteration must match iteration 0's row count and dtype.
///
/// # Example
///
/// ```
/// use nanosweep::compiled;
///
/// let close = [1.0, 2.0, 3.0];
/// let out = compiled::apply_and_concat_one(2, &close[..], |i, c| {
///     c.iter().map(|v| v + i as f64).collect::<Vec<_>>()
/// })
/// .unwrap();
/// assert_eq!(out.shape(), (3, 2));
/// assert_eq!(out.column_f64(1), Some(vec![2.0, 3.0, 4.0]));
/// ```
pub fn apply_and_concat_one<A, F, R>(n: usize, args: &A, apply: F) -> Result<Buffer>
where
    A: ?Sized,
    F: Fn(usize, &A) -> R,
    R: Into<Buffer>,
{
    run_one(n, args, |i, a| Ok(apply(i, a).into()), &mut NoProgress)
}

/// Preallocated version of [`crate::sequential::apply_and_concat_multiple`].
pub fn apply_and_concat_multiple<A, F, R>(n: usize, args: &A, apply: F) -> Result<Vec<Buffer>>
where
    A: ?Sized,
    F: Fn(usize, &A) -> R,
    R: IntoBuffers,
{
    run_multiple(
        n,
        args,
        |i, a| Ok(apply(i, a).into_buffers()),
        &mut NoProgress,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn one_matches_iteration_order() {
        let out = apply_and_concat_one(4, &(), |i, _| vec![i as i64; 3]).unwrap();
        assert_eq!(
            out.as_i64().unwrap(),
            array![[0, 1, 2, 3], [0, 1, 2, 3], [0, 1, 2, 3]]
        );
    }

    #[test]
    fn one_handles_wide_blocks() {
        let out = apply_and_concat_one(2, &10.0, |i, base: &f64| {
            array![[*base, i as f64], [-base, -(i as f64)]]
        })
        .unwrap();
        assert_eq!(
            out.as_f64().unwrap(),
            array![[10.0, 0.0, 10.0, 1.0], [-10.0, -0.0, -10.0, -1.0]]
        );
    }

    #[test]
    fn one_grows_past_reservation() {
        let out = apply_and_concat_one(3, &(), |i, _| Array2::from_elem((2, i + 1), i as f64))
            .unwrap();
        assert_eq!(out.shape(), (2, 6));
        assert_eq!(out.column_f64(5), Some(vec![2.0, 2.0]));
        assert_eq!(out.column_f64(1), Some(vec![1.0, 1.0]));
    }

    #[test]
    fn row_drift_is_fatal() {
        let result = apply_and_concat_one(5, &(), |i, _| {
            let rows = if i == 2 { 4 } else { 3 };
            vec![0.0; rows]
        });
        match result {
            Err(ConcatError::ShapeMismatch {
                iteration,
                expected,
                found,
                ..
            }) => assert_eq!((iteration, expected, found), (2, 3, 4)),
            other => panic!("expected shape mismatch, got {other:?}"),
        }
    }

    #[test]
    fn dtype_drift_is_fatal() {
        let result = apply_and_concat_one(3, &(), |i, _| -> Buffer {
            if i == 1 { vec![1_i64].into() } else { vec![1.0].into() }
        });
        assert!(matches!(
            result,
            Err(ConcatError::DTypeMismatch {
                iteration: 1,
                expected: DType::F64,
                found: DType::I64,
                ..
            })
        ));
    }

    #[test]
    fn zero_iterations_fail() {
        assert!(matches!(
            apply_and_concat_one(0, &(), |_, _| vec![1.0]),
            Err(ConcatError::EmptyBatch)
        ));
        assert!(matches!(
            apply_and_concat_multiple(0, &(), |_, _| (vec![1.0],)),
            Err(ConcatError::EmptyBatch)
        ));
    }

    #[test]
    fn multiple_positions_keep_own_dtype() {
        let out = apply_and_concat_multiple(3, &(), |i, _| {
            (vec![i as f64], vec![i % 2 == 0, true])
        })
        .unwrap();
        assert_eq!(out[0].as_f64().unwrap(), array![[0.0, 1.0, 2.0]]);
        assert_eq!(
            out[1].as_bool().unwrap(),
            array![[true, false, true], [true, true, true]]
        );
    }

    #[test]
    fn multiple_tuple_drift_is_fatal() {
        let result = apply_and_concat_multiple(3, &(), |i, _| {
            if i == 2 { vec![vec![1.0]] } else { vec![vec![1.0], vec![2.0]] }
        });
        assert!(matches!(
            result,
            Err(ConcatError::ArityMismatch { iteration: 2, .. })
        ));
    }

    #[test]
    fn run_rejects_wrong_output_variant() {
        let result = run(
            3,
            Arity::Single,
            &(),
            |i, _| {
                if i == 1 {
                    IterationOutput::Nothing
                } else {
                    IterationOutput::One(vec![1.0].into())
                }
            },
            &mut NoProgress,
        );
        assert!(matches!(
            result,
            Err(ConcatError::ArityMismatch { iteration: 1, .. })
        ));
    }

    #[test]
    fn sink_releases_unused_reservation() {
        let mut sink = ColumnSink::<f64>::with_capacity(2, 50);
        sink.write(&array![[1.0, 2.0], [3.0, 4.0]]);
        let (raw, _) = sink.into_array().unwrap().into_raw_vec_and_offset();
        assert_eq!(raw, vec![1.0, 3.0, 2.0, 4.0]);
        assert!(raw.capacity() < 100);
    }

    #[test]
    fn run_discard_ignores_returned_values() {
        let calls = std::cell::Cell::new(0);
        let out = run(
            4,
            Arity::Discard,
            &(),
            |_, _| {
                calls.set(calls.get() + 1);
                IterationOutput::One(vec![1.0].into())
            },
            &mut NoProgress,
        )
        .unwrap();
        assert!(out.is_nothing());
        assert_eq!(calls.get(), 4);
    }

    #[test]
    fn none_visits_all() {
        let count = std::cell::Cell::new(0);
        apply_and_concat_none(5, &(), |_, _| count.set(count.get() + 1));
        assert_eq!(count.get(), 5);
    }
}
