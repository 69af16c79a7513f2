//! Concatenation policies: discard, single-stack and multi-stack.
//!
//! Policies are pure aggregations over per-iteration outputs already in
//! ascending iteration order. The sequential and distributed executors feed
//! them through [`Accumulator`]; the compiled executor writes into
//! preallocated storage instead but produces the same result.

use std::fmt;

use crate::buffer::{Buffer, IntoBuffers, stack_position};
use crate::error::{ConcatError, Result};

/// Shape of the per-iteration output contract.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Arity {
    /// Run for side effects only.
    Discard,
    /// One buffer per iteration.
    Single,
    /// A fixed-size tuple of buffers per iteration.
    Multi,
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arity::Discard => write!(f, "no output"),
            Arity::Single => write!(f, "one buffer"),
            Arity::Multi => write!(f, "a tuple of buffers"),
        }
    }
}

/// What one iteration produced.
#[derive(Clone, Debug, PartialEq)]
pub enum IterationOutput {
    Nothing,
    One(Buffer),
    Many(Vec<Buffer>),
}

impl IterationOutput {
    pub fn arity(&self) -> Arity {
        match self {
            IterationOutput::Nothing => Arity::Discard,
            IterationOutput::One(_) => Arity::Single,
            IterationOutput::Many(_) => Arity::Multi,
        }
    }

    /// Wrap any tuple-like output as [`IterationOutput::Many`].
    pub fn many(outputs: impl IntoBuffers) -> Self {
        IterationOutput::Many(outputs.into_buffers())
    }

    fn describe(&self) -> String {
        match self {
            IterationOutput::Many(v) => format!("a tuple of {} buffers", v.len()),
            other => other.arity().to_string(),
        }
    }
}

impl From<()> for IterationOutput {
    fn from(_: ()) -> Self {
        IterationOutput::Nothing
    }
}

impl From<Buffer> for IterationOutput {
    fn from(buffer: Buffer) -> Self {
        IterationOutput::One(buffer)
    }
}

impl From<Vec<Buffer>> for IterationOutput {
    fn from(buffers: Vec<Buffer>) -> Self {
        IterationOutput::Many(buffers)
    }
}

/// What a whole batch produced.
#[derive(Clone, Debug, PartialEq)]
pub enum Stacked {
    Nothing,
    One(Buffer),
    Many(Vec<Buffer>),
}

impl Stacked {
    pub fn is_nothing(&self) -> bool {
        matches!(self, Stacked::Nothing)
    }

    pub fn into_one(self) -> Option<Buffer> {
        match self {
            Stacked::One(b) => Some(b),
            _ => None,
        }
    }

    pub fn into_many(self) -> Option<Vec<Buffer>> {
        match self {
            Stacked::Many(v) => Some(v),
            _ => None,
        }
    }

    /// Output buffers in position order (empty for [`Stacked::Nothing`]).
    pub fn into_buffers(self) -> Vec<Buffer> {
        match self {
            Stacked::Nothing => Vec::new(),
            Stacked::One(b) => vec![b],
            Stacked::Many(v) => v,
        }
    }
}

/// Single-stack policy: concatenate `outputs` along the column axis.
pub fn stack_one(outputs: &[Buffer]) -> Result<Buffer> {
    stack_position(outputs, 0)
}

/// Multi-stack policy: for each tuple position, concatenate across iterations.
///
/// Every iteration must yield the same number of buffers as iteration 0.
pub fn stack_multiple(outputs: Vec<Vec<Buffer>>) -> Result<Vec<Buffer>> {
    let arity = outputs.first().ok_or(ConcatError::EmptyBatch)?.len();
    let n = outputs.len();

    let mut positions: Vec<Vec<Buffer>> = (0..arity).map(|_| Vec::with_capacity(n)).collect();
    for (iteration, output) in outputs.into_iter().enumerate() {
        if output.len() != arity {
            return Err(tuple_len_mismatch(iteration, arity, output.len()));
        }
        for (slot, buffer) in positions.iter_mut().zip(output) {
            slot.push(buffer);
        }
    }

    positions
        .iter()
        .enumerate()
        .map(|(position, parts)| stack_position(parts, position))
        .collect()
}

pub(crate) fn tuple_len_mismatch(iteration: usize, expected: usize, found: usize) -> ConcatError {
    ConcatError::ArityMismatch {
        iteration,
        expected: format!("a tuple of {expected} buffers"),
        found: format!("a tuple of {found} buffers"),
    }
}

/// Collects outputs in iteration order and applies the policy for `arity`.
#[derive(Debug)]
pub(crate) enum Accumulator {
    Discard,
    Single(Vec<Buffer>),
    Multi {
        arity: Option<usize>,
        outputs: Vec<Vec<Buffer>>,
    },
}

impl Accumulator {
    pub(crate) fn new(arity: Arity, n: usize) -> Self {
        match arity {
            Arity::Discard => Accumulator::Discard,
            Arity::Single => Accumulator::Single(Vec::with_capacity(n)),
            Arity::Multi => Accumulator::Multi {
                arity: None,
                outputs: Vec::with_capacity(n),
            },
        }
    }

    fn expected(&self) -> Arity {
        match self {
            Accumulator::Discard => Arity::Discard,
            Accumulator::Single(_) => Arity::Single,
            Accumulator::Multi { .. } => Arity::Multi,
        }
    }

    /// Feed the output of `iteration`. Tuple-length drift fails immediately.
    pub(crate) fn push(&mut self, iteration: usize, output: IterationOutput) -> Result<()> {
        match (self, output) {
            // Side effects only; whatever the iteration returned is dropped.
            (Accumulator::Discard, _) => Ok(()),
            (Accumulator::Single(outputs), IterationOutput::One(buffer)) => {
                outputs.push(buffer);
                Ok(())
            }
            (Accumulator::Multi { arity, outputs }, IterationOutput::Many(buffers)) => {
                let expected = *arity.get_or_insert(buffers.len());
                if buffers.len() != expected {
                    return Err(tuple_len_mismatch(iteration, expected, buffers.len()));
                }
                outputs.push(buffers);
                Ok(())
            }
            (acc, output) => Err(ConcatError::ArityMismatch {
                iteration,
                expected: acc.expected().to_string(),
                found: output.describe(),
            }),
        }
    }

    pub(crate) fn finish(self) -> Result<Stacked> {
        match self {
            Accumulator::Discard => Ok(Stacked::Nothing),
            Accumulator::Single(outputs) => stack_one(&outputs).map(Stacked::One),
            Accumulator::Multi { outputs, .. } => stack_multiple(outputs).map(Stacked::Many),
        }
    }
}
