//! # nanosweep
//!
//! An apply-and-concatenate engine for brute-force parameter sweeps.
//!
//! A sweep runs one unit of work per parameter combination, indexed
//! `0..n`, and stacks the per-iteration numeric results side by side into
//! one wide buffer so the combinations can be compared column by column.
//!
//! ## Features
//!
//! - **Three arities**: discard (side effects only), single (one buffer per
//!   iteration) and multi (a tuple of buffers per iteration, stacked per position)
//! - **Three backends** behind one contract: [`sequential`], [`compiled`]
//!   (preallocated, homogeneous outputs, positional arguments only) and
//!   [`distributed`] (task runtime, results reordered by index)
//! - **Deterministic order**: column blocks always follow ascending iteration
//!   index, whatever the backend
//! - **Combine adapters**: map a pivot against candidates, or left-fold a list
//!
//! ## Quick Start
//!
//! ```
//! use nanosweep::{Context, NoProgress, sequential};
//!
//! let close = vec![10.0, 11.0, 12.0, 13.0];
//! let windows = [1_usize, 2];
//!
//! // One column per window: a trailing mean, NaN during the lookback.
//! let out = sequential::apply_and_concat_one(
//!     windows.len(),
//!     &Context::new(close),
//!     |i, close: &Vec<f64>, _| {
//!         let w = windows[i];
//!         (0..close.len())
//!             .map(|t| {
//!                 if t + 1 < w {
//!                     f64::NAN
//!                 } else {
//!                     close[t + 1 - w..=t].iter().sum::<f64>() / w as f64
//!                 }
//!             })
//!             .collect::<Vec<_>>()
//!     },
//!     &mut NoProgress,
//! )
//! .unwrap();
//!
//! assert_eq!(out.shape(), (4, 2));
//! assert_eq!(out.column_f64(1).unwrap()[3], 12.5);
//! ```
//!
//! ## Backends
//!
//! | Backend | Arguments | Outputs | Ordering |
//! |---------|-----------|---------|----------|
//! | **Sequential** | positional + keyed | any shape, dtypes promoted | in order |
//! | **Compiled** | positional only | fixed rows and dtype per position | in order |
//! | **Distributed** | positional + keyed | any shape, dtypes promoted | reordered by index |
//!
//! [`apply_concat`] selects the backend at call time:
//!
//! ```
//! use nanosweep::{
//!     Arity, Backend, Context, InlineRuntime, IterationOutput, NoProgress, apply_concat,
//! };
//!
//! let ctx = Context::new(());
//! let apply = |i: usize, _: &(), _: &nanosweep::Kwargs| {
//!     IterationOutput::many((vec![i as f64], vec![2.0 * i as f64]))
//! };
//!
//! let runtime = InlineRuntime;
//! for backend in [Backend::Sequential, Backend::Compiled, Backend::Distributed(&runtime)] {
//!     let out = apply_concat(3, Arity::Multi, backend, &ctx, apply, &mut NoProgress)
//!         .unwrap()
//!         .into_many()
//!         .unwrap();
//!     assert_eq!(out.len(), 2);
//!     assert_eq!(out[1].column_f64(2), Some(vec![4.0]));
//! }
//! ```

pub mod buffer;
pub mod combine;
pub mod compiled;
pub mod concat;
pub mod distributed;
mod engine;
mod error;
mod params;
mod progress;
pub mod sequential;

pub use ndarray;

// Re-export public API
pub use buffer::{Buffer, DType, Element, IntoBuffers};
pub use concat::{Arity, IterationOutput, Stacked, stack_multiple, stack_one};
pub use distributed::{InlineRuntime, Task, TaskError, TaskOutcome, TaskRuntime};
#[cfg(feature = "parallel")]
pub use distributed::ThreadPoolRuntime;
pub use engine::{Backend, BackendKind, apply_concat};
pub use error::{ConcatError, Result};
pub use params::{Context, Kwargs, Param};
pub use progress::{FnProgress, LogProgress, NoProgress, Progress, ProgressError};
