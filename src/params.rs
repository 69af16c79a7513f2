//! Shared context handed to every iteration: positional and keyed arguments.

use rustc_hash::FxHashMap;

use crate::error::{ConcatError, Result};

/// A keyed argument value.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(untagged))]
pub enum Param {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Floats(Vec<f64>),
}

impl From<bool> for Param {
    fn from(v: bool) -> Self {
        Param::Bool(v)
    }
}

impl From<i64> for Param {
    fn from(v: i64) -> Self {
        Param::Int(v)
    }
}

impl From<i32> for Param {
    fn from(v: i32) -> Self {
        Param::Int(i64::from(v))
    }
}

/// Saturates at `i64::MAX`.
impl From<usize> for Param {
    fn from(v: usize) -> Self {
        Param::Int(i64::try_from(v).unwrap_or(i64::MAX))
    }
}

impl From<f64> for Param {
    fn from(v: f64) -> Self {
        Param::Float(v)
    }
}

impl From<&str> for Param {
    fn from(v: &str) -> Self {
        Param::Text(v.to_string())
    }
}

impl From<String> for Param {
    fn from(v: String) -> Self {
        Param::Text(v)
    }
}

impl From<Vec<f64>> for Param {
    fn from(v: Vec<f64>) -> Self {
        Param::Floats(v)
    }
}

/// Keyed extra arguments.
///
/// ```
/// use nanosweep::Kwargs;
///
/// let kwargs = Kwargs::new().with("window", 14_usize).with("num_std", 2.0);
/// assert_eq!(kwargs.get_usize("window").unwrap(), 14);
/// assert_eq!(kwargs.get_f64("num_std").unwrap(), 2.0);
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Kwargs {
    values: FxHashMap<String, Param>,
}

impl Kwargs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Param>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Param>) -> Option<Param> {
        self.values.insert(name.into(), value.into())
    }

    pub fn get(&self, name: &str) -> Option<&Param> {
        self.values.get(name)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Argument names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.values.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    fn require(&self, name: &str) -> Result<&Param> {
        self.get(name)
            .ok_or_else(|| ConcatError::MissingParam(name.to_string()))
    }

    fn type_error(name: &str, expected: &'static str) -> ConcatError {
        ConcatError::ParamType {
            name: name.to_string(),
            expected,
        }
    }

    /// Floats, with integers widened.
    pub fn get_f64(&self, name: &str) -> Result<f64> {
        match self.require(name)? {
            Param::Float(v) => Ok(*v),
            Param::Int(v) => Ok(*v as f64),
            _ => Err(Self::type_error(name, "a number")),
        }
    }

    pub fn get_i64(&self, name: &str) -> Result<i64> {
        match self.require(name)? {
            Param::Int(v) => Ok(*v),
            _ => Err(Self::type_error(name, "an integer")),
        }
    }

    pub fn get_usize(&self, name: &str) -> Result<usize> {
        match self.require(name)? {
            Param::Int(v) if *v >= 0 => Ok(*v as usize),
            _ => Err(Self::type_error(name, "a non-negative integer")),
        }
    }

    pub fn get_bool(&self, name: &str) -> Result<bool> {
        match self.require(name)? {
            Param::Bool(v) => Ok(*v),
            _ => Err(Self::type_error(name, "a boolean")),
        }
    }

    pub fn get_str(&self, name: &str) -> Result<&str> {
        match self.require(name)? {
            Param::Text(v) => Ok(v),
            _ => Err(Self::type_error(name, "a string")),
        }
    }

    pub fn get_floats(&self, name: &str) -> Result<&[f64]> {
        match self.require(name)? {
            Param::Floats(v) => Ok(v),
            _ => Err(Self::type_error(name, "a list of floats")),
        }
    }
}

impl<K: Into<String>, V: Into<Param>> FromIterator<(K, V)> for Kwargs {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut kwargs = Kwargs::new();
        for (k, v) in iter {
            kwargs.insert(k, v);
        }
        kwargs
    }
}

/// Positional (`args`) and keyed (`kwargs`) arguments shared by all iterations.
///
/// The engine only ever borrows the context; it is never mutated.
#[derive(Clone, Debug, Default)]
pub struct Context<A> {
    pub args: A,
    pub kwargs: Kwargs,
}

impl<A> Context<A> {
    /// Positional arguments only.
    pub fn new(args: A) -> Self {
        Self {
            args,
            kwargs: Kwargs::new(),
        }
    }

    pub fn with_kwargs(args: A, kwargs: Kwargs) -> Self {
        Self { args, kwargs }
    }
}
