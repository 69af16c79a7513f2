//! Property-based tests for the stacking invariants.
//!
//! These tests use proptest to check that every backend produces the same
//! ordered layout for randomly generated batches.

use nanosweep::ndarray::Array2;
use nanosweep::{
    Buffer, ConcatError, Context, DType, Kwargs, NoProgress, Task, TaskOutcome, TaskRuntime,
    combine, compiled, distributed, sequential,
};
use proptest::prelude::*;

/// Completes tasks in a pre-drawn permutation of `0..n`.
struct Shuffled(Vec<usize>);

impl TaskRuntime for Shuffled {
    fn submit_many(&self, n: usize, task: &Task<'_>) -> Vec<TaskOutcome> {
        self.0
            .iter()
            .copied()
            .filter(|i| *i < n)
            .map(|i| distributed::run_task(task, i))
            .collect()
    }
}

/// A batch: row count, per-iteration column counts, and a seed for values.
fn batch_strategy() -> impl Strategy<Value = (usize, Vec<usize>, i64)> {
    (1usize..=6, prop::collection::vec(1usize..=4, 1..=12), -1_000i64..1_000)
}

/// Deterministic block for iteration `i`: every cell encodes its origin.
fn block(i: usize, rows: usize, cols: usize, seed: i64) -> Array2<i64> {
    Array2::from_shape_fn((rows, cols), |(r, c)| {
        seed + (i as i64) * 1_000 + (c as i64) * 10 + r as i64
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    // ========================================================================
    // LAYOUT INVARIANTS
    // ========================================================================

    /// Total columns is the sum of per-iteration columns, rows are preserved
    #[test]
    fn output_shape_is_sum_of_blocks((rows, widths, seed) in batch_strategy()) {
        let ctx = Context::new(widths.clone());
        let out = sequential::apply_and_concat_one(
            widths.len(),
            &ctx,
            |i, w: &Vec<usize>, _| block(i, rows, w[i], seed),
            &mut NoProgress,
        ).unwrap();

        prop_assert_eq!(out.shape(), (rows, widths.iter().sum::<usize>()));
        prop_assert_eq!(out.dtype(), DType::I64);
    }

    /// Column block i equals the output of iteration i
    #[test]
    fn blocks_follow_iteration_order((rows, widths, seed) in batch_strategy()) {
        let ctx = Context::new(widths.clone());
        let out = sequential::apply_and_concat_one(
            widths.len(),
            &ctx,
            |i, w: &Vec<usize>, _| block(i, rows, w[i], seed),
            &mut NoProgress,
        ).unwrap();
        let view = out.as_i64().unwrap();

        let mut offset = 0;
        for (i, &w) in widths.iter().enumerate() {
            let expected = block(i, rows, w, seed);
            let got = view.slice(nanosweep::ndarray::s![.., offset..offset + w]);
            prop_assert_eq!(got, expected.view());
            offset += w;
        }
    }

    // ========================================================================
    // BACKEND EQUIVALENCE
    // ========================================================================

    /// Compiled path matches the sequential path, including varying widths
    #[test]
    fn compiled_matches_sequential((rows, widths, seed) in batch_strategy()) {
        let ctx = Context::new(widths.clone());
        let seq = sequential::apply_and_concat_one(
            widths.len(),
            &ctx,
            |i, w: &Vec<usize>, _| block(i, rows, w[i], seed),
            &mut NoProgress,
        ).unwrap();
        let fast = compiled::apply_and_concat_one(widths.len(), &widths, |i, w| {
            block(i, rows, w[i], seed)
        }).unwrap();

        prop_assert_eq!(seq, fast);
    }

    /// Any completion order yields the sequential result
    #[test]
    fn distributed_is_order_independent(
        (rows, widths, seed) in batch_strategy(),
        order in Just((0..12usize).collect::<Vec<_>>()).prop_shuffle(),
    ) {
        let ctx = Context::new(widths.clone());
        let apply = |i: usize, w: &Vec<usize>, _: &Kwargs| block(i, rows, w[i], seed);
        let n = widths.len();
        let seq = sequential::apply_and_concat_one(n, &ctx, apply, &mut NoProgress).unwrap();
        let dist = distributed::apply_and_concat_one(&Shuffled(order), n, &ctx, apply).unwrap();

        prop_assert_eq!(seq, dist);
    }

    /// Each multi-output position is stacked independently
    #[test]
    fn multi_positions_are_independent((rows, widths, seed) in batch_strategy()) {
        let ctx = Context::new(widths.clone());
        let multi = sequential::apply_and_concat_multiple(
            widths.len(),
            &ctx,
            |i, w: &Vec<usize>, _| (block(i, rows, w[i], seed), vec![i as f64]),
            &mut NoProgress,
        ).unwrap();
        let single = sequential::apply_and_concat_one(
            widths.len(),
            &ctx,
            |i, w: &Vec<usize>, _| block(i, rows, w[i], seed),
            &mut NoProgress,
        ).unwrap();

        prop_assert_eq!(multi.len(), 2);
        prop_assert_eq!(&multi[0], &single);
        prop_assert_eq!(multi[1].shape(), (1, widths.len()));
    }

    // ========================================================================
    // FAILURE INVARIANTS
    // ========================================================================

    /// A row mismatch anywhere after iteration 0 fails the compiled path
    #[test]
    fn compiled_row_mismatch_reports_iteration(
        (rows, widths, seed) in batch_strategy(),
        bad in 1usize..12,
    ) {
        prop_assume!(bad < widths.len());
        let result = compiled::apply_and_concat_one(widths.len(), &widths, |i, w| {
            let r = if i == bad { rows + 1 } else { rows };
            block(i, r, w[i], seed)
        });

        match result {
            Err(ConcatError::ShapeMismatch { iteration, .. }) => prop_assert_eq!(iteration, bad),
            other => prop_assert!(false, "expected shape mismatch, got {:?}", other),
        }
    }

    // ========================================================================
    // COMBINE INVARIANTS
    // ========================================================================

    /// combine_multiple equals an explicit left fold
    #[test]
    fn combine_multiple_matches_left_fold(values in prop::collection::vec(-100i64..100, 1..20)) {
        let f = |a: &i64, b: &i64| 3 * a - b;
        let ctx = Context::new(());
        let folded =
            combine::combine_multiple(&values, &ctx, |a, b, _: &(), _: &Kwargs| f(a, b)).unwrap();
        let expected = values[1..].iter().fold(values[0], |acc, v| f(&acc, v));

        prop_assert_eq!(folded, expected);
    }

    /// combine_and_concat column i is combine(obj, others[i])
    #[test]
    fn combine_and_concat_column_per_candidate(
        obj in prop::collection::vec(-1e3f64..1e3, 1..10),
        others in prop::collection::vec(-1e3f64..1e3, 1..10),
    ) {
        let out: Buffer = combine::combine_and_concat(
            &obj[..],
            &others,
            &Context::new(()),
            |o: &[f64], t: &f64, _: &(), _: &Kwargs| o.iter().map(|v| v - t).collect::<Vec<_>>(),
        ).unwrap();

        prop_assert_eq!(out.shape(), (obj.len(), others.len()));
        for (j, t) in others.iter().enumerate() {
            let expected: Vec<f64> = obj.iter().map(|v| v - t).collect();
            prop_assert_eq!(out.column_f64(j), Some(expected));
        }
    }
}
