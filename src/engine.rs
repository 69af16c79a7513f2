//! Backend selection and the single `apply_concat` entry point.

use std::fmt;
use std::str::FromStr;

use crate::compiled;
use crate::concat::{Arity, IterationOutput, Stacked};
use crate::distributed::{self, TaskRuntime};
use crate::error::{ConcatError, Result};
use crate::params::{Context, Kwargs};
use crate::progress::Progress;
use crate::sequential;

/// Execution strategy for a batch.
#[derive(Clone, Copy)]
pub enum Backend<'r> {
    /// In order, on the calling thread, any shape and dtype.
    Sequential,
    /// Preallocated fast path; no keyed arguments, homogeneous outputs.
    Compiled,
    /// Fanned out to a task runtime, reordered before stacking.
    Distributed(&'r dyn TaskRuntime),
}

impl Backend<'_> {
    pub fn kind(&self) -> BackendKind {
        match self {
            Backend::Sequential => BackendKind::Sequential,
            Backend::Compiled => BackendKind::Compiled,
            Backend::Distributed(_) => BackendKind::Distributed,
        }
    }
}

impl fmt::Debug for Backend<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Backend::{:?}", self.kind())
    }
}

/// Backend name without the runtime handle, for configuration files.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum BackendKind {
    #[default]
    Sequential,
    Compiled,
    Distributed,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendKind::Sequential => write!(f, "sequential"),
            BackendKind::Compiled => write!(f, "compiled"),
            BackendKind::Distributed => write!(f, "distributed"),
        }
    }
}

impl FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sequential" | "seq" => Ok(BackendKind::Sequential),
            "compiled" | "nb" => Ok(BackendKind::Compiled),
            "distributed" | "dist" => Ok(BackendKind::Distributed),
            other => Err(format!("unknown backend '{other}'")),
        }
    }
}

/// Apply `apply` to every index in `0..n` and concatenate per `arity`.
///
/// Column blocks of the result follow ascending iteration order on every
/// backend. [`Backend::Compiled`] refuses a context with keyed arguments
/// before running any iteration.
///
/// # Example
///
/// ```
/// use nanosweep::{Arity, Backend, Context, IterationOutput, NoProgress, apply_concat};
///
/// let ctx = Context::new(vec![1.0, 2.0]);
/// let out = apply_concat(
///     3,
///     Arity::Single,
///     Backend::Compiled,
///     &ctx,
///     |i, base, _| {
///         let column: Vec<f64> = base.iter().map(|b| b * i as f64).collect();
///         IterationOutput::One(column.into())
///     },
///     &mut NoProgress,
/// )
/// .unwrap()
/// .into_one()
/// .unwrap();
/// assert_eq!(out.shape(), (2, 3));
/// ```
pub fn apply_concat<A, F>(
    n: usize,
    arity: Arity,
    backend: Backend<'_>,
    ctx: &Context<A>,
    apply: F,
    progress: &mut dyn Progress,
) -> Result<Stacked>
where
    A: Sync,
    F: Fn(usize, &A, &Kwargs) -> IterationOutput + Sync,
{
    match backend {
        Backend::Sequential => sequential::run(n, arity, ctx, apply, progress),
        Backend::Compiled => {
            if !ctx.kwargs.is_empty() {
                return Err(ConcatError::Capability(format!(
                    "compiled backend takes positional arguments only, got keyed arguments {:?}",
                    ctx.kwargs.names()
                )));
            }
            let no_kwargs = Kwargs::new();
            compiled::run(n, arity, &ctx.args, |i, args| apply(i, args, &no_kwargs), progress)
        }
        Backend::Distributed(runtime) => distributed::run(runtime, n, arity, ctx, apply, progress),
    }
}
