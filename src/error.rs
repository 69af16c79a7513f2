//! Error types for the apply-and-concatenate engine.

use crate::buffer::DType;

/// Errors returned by every executor and combine adapter.
///
/// All of them are fatal for the batch: no executor returns partial output.
#[derive(Debug, thiserror::Error)]
pub enum ConcatError {
    /// Stacking needs at least one iteration to derive shape, dtype and arity from.
    #[error("cannot stack zero iterations")]
    EmptyBatch,

    /// An iteration returned an output of the wrong arity.
    #[error("arity mismatch at iteration {iteration}: expected {expected}, found {found}")]
    ArityMismatch {
        iteration: usize,
        expected: String,
        found: String,
    },

    /// Row count (or, on the compiled path, dtype) drifted for one output position.
    #[error(
        "shape mismatch at iteration {iteration}, output {position}: expected {expected} rows, found {found}"
    )]
    ShapeMismatch {
        position: usize,
        iteration: usize,
        expected: usize,
        found: usize,
    },

    #[error(
        "dtype mismatch at iteration {iteration}, output {position}: expected {expected}, found {found}"
    )]
    DTypeMismatch {
        position: usize,
        iteration: usize,
        expected: DType,
        found: DType,
    },

    /// The selected backend cannot honour the request (e.g. keyed arguments on the compiled path).
    #[error("capability error: {0}")]
    Capability(String),

    /// A task failed (or went missing) inside the distributed runtime.
    #[error("remote failure at iteration {index}: {message}")]
    Remote { index: usize, message: String },

    /// The progress observer aborted the batch.
    #[error("progress observer failed after iteration {index}: {source}")]
    Progress {
        index: usize,
        source: crate::progress::ProgressError,
    },

    #[error("buffer layout error: {0}")]
    Layout(#[from] ndarray::ShapeError),

    #[error("task runtime error: {0}")]
    Runtime(String),

    #[error("missing keyed argument: {0}")]
    MissingParam(String),

    #[error("keyed argument {name} is not {expected}")]
    ParamType { name: String, expected: &'static str },
}

pub type Result<T> = std::result::Result<T, ConcatError>;
