//! Dtype-tagged 2-D numeric buffers and column stacking.
//!
//! Every per-iteration result enters the engine as a [`Buffer`]. Rank-1
//! inputs (`Vec<T>`, `&[T]`, `Array1<T>`) are normalized into single-column
//! buffers by the `From` conversions, so the stacking code only ever sees
//! rank-2 data.
//!
//! # Dtype promotion
//!
//! The flexible stacking path promotes mixed dtypes the same way NumPy's
//! `column_stack` does for the types supported here: `bool < i64 < f64`.
//! The preallocated path in [`crate::compiled`] never promotes.

use std::borrow::Cow;
use std::fmt;

use ndarray::{Array1, Array2, ArrayView2, Axis, s};

use crate::error::{ConcatError, Result};

/// Element type of a [`Buffer`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum DType {
    Bool,
    I64,
    F64,
}

impl DType {
    /// Smallest dtype both `self` and `other` widen to.
    #[inline]
    pub fn promote(self, other: DType) -> DType {
        self.max(other)
    }

    pub fn name(self) -> &'static str {
        match self {
            DType::Bool => "bool",
            DType::I64 => "i64",
            DType::F64 => "f64",
        }
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A scalar type that can live inside a [`Buffer`].
pub trait Element: Copy + Default + PartialEq + fmt::Debug + Send + Sync + 'static {
    const DTYPE: DType;

    /// Tag a typed array as a buffer.
    fn wrap(array: Array2<Self>) -> Buffer;

    /// Borrow the typed array if the buffer holds exactly this dtype.
    fn view(buffer: &Buffer) -> Option<ArrayView2<'_, Self>>;

    /// The buffer's data as `Self`, widening when needed. `None` if that would narrow.
    fn widen(buffer: &Buffer) -> Option<Cow<'_, Array2<Self>>>;
}

impl Element for bool {
    const DTYPE: DType = DType::Bool;

    fn wrap(array: Array2<Self>) -> Buffer {
        Buffer::Bool(array)
    }

    fn view(buffer: &Buffer) -> Option<ArrayView2<'_, Self>> {
        match buffer {
            Buffer::Bool(a) => Some(a.view()),
            _ => None,
        }
    }

    fn widen(buffer: &Buffer) -> Option<Cow<'_, Array2<Self>>> {
        match buffer {
            Buffer::Bool(a) => Some(Cow::Borrowed(a)),
            _ => None,
        }
    }
}

impl Element for i64 {
    const DTYPE: DType = DType::I64;

    fn wrap(array: Array2<Self>) -> Buffer {
        Buffer::I64(array)
    }

    fn view(buffer: &Buffer) -> Option<ArrayView2<'_, Self>> {
        match buffer {
            Buffer::I64(a) => Some(a.view()),
            _ => None,
        }
    }

    fn widen(buffer: &Buffer) -> Option<Cow<'_, Array2<Self>>> {
        match buffer {
            Buffer::Bool(a) => Some(Cow::Owned(a.mapv(i64::from))),
            Buffer::I64(a) => Some(Cow::Borrowed(a)),
            Buffer::F64(_) => None,
        }
    }
}

impl Element for f64 {
    const DTYPE: DType = DType::F64;

    fn wrap(array: Array2<Self>) -> Buffer {
        Buffer::F64(array)
    }

    fn view(buffer: &Buffer) -> Option<ArrayView2<'_, Self>> {
        match buffer {
            Buffer::F64(a) => Some(a.view()),
            _ => None,
        }
    }

    fn widen(buffer: &Buffer) -> Option<Cow<'_, Array2<Self>>> {
        match buffer {
            Buffer::Bool(a) => Some(Cow::Owned(a.mapv(|v| f64::from(u8::from(v))))),
            Buffer::I64(a) => Some(Cow::Owned(a.mapv(|v| v as f64))),
            Buffer::F64(a) => Some(Cow::Borrowed(a)),
        }
    }
}

/// A rank-2 numeric buffer tagged with its dtype.
#[derive(Clone, Debug, PartialEq)]
pub enum Buffer {
    Bool(Array2<bool>),
    I64(Array2<i64>),
    F64(Array2<f64>),
}

impl Buffer {
    /// A `rows x cols` buffer filled with the dtype's zero value.
    pub fn zeros(dtype: DType, rows: usize, cols: usize) -> Self {
        match dtype {
            DType::Bool => Buffer::Bool(Array2::default((rows, cols))),
            DType::I64 => Buffer::I64(Array2::zeros((rows, cols))),
            DType::F64 => Buffer::F64(Array2::zeros((rows, cols))),
        }
    }

    #[inline]
    pub fn dtype(&self) -> DType {
        match self {
            Buffer::Bool(_) => DType::Bool,
            Buffer::I64(_) => DType::I64,
            Buffer::F64(_) => DType::F64,
        }
    }

    /// `(rows, cols)`.
    #[inline]
    pub fn shape(&self) -> (usize, usize) {
        match self {
            Buffer::Bool(a) => a.dim(),
            Buffer::I64(a) => a.dim(),
            Buffer::F64(a) => a.dim(),
        }
    }

    #[inline]
    pub fn rows(&self) -> usize {
        self.shape().0
    }

    #[inline]
    pub fn cols(&self) -> usize {
        self.shape().1
    }

    /// Typed view, `None` unless the buffer holds exactly `T`.
    pub fn view<T: Element>(&self) -> Option<ArrayView2<'_, T>> {
        T::view(self)
    }

    pub fn as_f64(&self) -> Option<ArrayView2<'_, f64>> {
        self.view()
    }

    pub fn as_i64(&self) -> Option<ArrayView2<'_, i64>> {
        self.view()
    }

    pub fn as_bool(&self) -> Option<ArrayView2<'_, bool>> {
        self.view()
    }

    /// Convert to `dtype`. Only widening casts succeed.
    pub fn cast(&self, dtype: DType) -> Option<Buffer> {
        match dtype {
            DType::Bool => bool::widen(self).map(|a| Buffer::Bool(a.into_owned())),
            DType::I64 => i64::widen(self).map(|a| Buffer::I64(a.into_owned())),
            DType::F64 => f64::widen(self).map(|a| Buffer::F64(a.into_owned())),
        }
    }

    /// Consume the buffer as `f64` values (always a widening cast).
    pub fn into_f64(self) -> Array2<f64> {
        match self {
            Buffer::F64(a) => a,
            Buffer::I64(a) => a.mapv(|v| v as f64),
            Buffer::Bool(a) => a.mapv(|v| f64::from(u8::from(v))),
        }
    }

    /// Column `j` as `f64` values, or `None` if out of range.
    pub fn column_f64(&self, j: usize) -> Option<Vec<f64>> {
        if j >= self.cols() {
            return None;
        }
        let column = f64::widen(self)?;
        Some(column.column(j).to_vec())
    }

    /// Stack `parts` left to right along the column axis.
    ///
    /// Row counts must agree; dtypes are promoted.
    pub fn hstack(parts: &[Buffer]) -> Result<Buffer> {
        stack_position(parts, 0)
    }
}

/// Column-stack the buffers of one output position, in the order given.
pub(crate) fn stack_position(parts: &[Buffer], position: usize) -> Result<Buffer> {
    let first = parts.first().ok_or(ConcatError::EmptyBatch)?;
    let rows = first.rows();
    let mut dtype = first.dtype();
    let mut total_cols = 0;

    for (iteration, part) in parts.iter().enumerate() {
        if part.rows() != rows {
            return Err(ConcatError::ShapeMismatch {
                position,
                iteration,
                expected: rows,
                found: part.rows(),
            });
        }
        dtype = dtype.promote(part.dtype());
        total_cols += part.cols();
    }

    match dtype {
        DType::Bool => stack_typed::<bool>(parts, position, rows, total_cols),
        DType::I64 => stack_typed::<i64>(parts, position, rows, total_cols),
        DType::F64 => stack_typed::<f64>(parts, position, rows, total_cols),
    }
}

fn stack_typed<T: Element>(
    parts: &[Buffer],
    position: usize,
    rows: usize,
    total_cols: usize,
) -> Result<Buffer> {
    let mut out = Array2::<T>::default((rows, total_cols));
    let mut offset = 0;
    for (iteration, part) in parts.iter().enumerate() {
        let data = T::widen(part).ok_or(ConcatError::DTypeMismatch {
            position,
            iteration,
            expected: T::DTYPE,
            found: part.dtype(),
        })?;
        let cols = data.ncols();
        out.slice_mut(s![.., offset..offset + cols]).assign(&*data);
        offset += cols;
    }
    Ok(T::wrap(out))
}

impl<T: Element> From<Array2<T>> for Buffer {
    fn from(array: Array2<T>) -> Self {
        T::wrap(array)
    }
}

impl<T: Element> From<Array1<T>> for Buffer {
    fn from(array: Array1<T>) -> Self {
        T::wrap(array.insert_axis(Axis(1)))
    }
}

impl<T: Element> From<Vec<T>> for Buffer {
    fn from(values: Vec<T>) -> Self {
        Array1::from(values).into()
    }
}

impl<T: Element> From<&[T]> for Buffer {
    fn from(values: &[T]) -> Self {
        Array1::from(values.to_vec()).into()
    }
}

/// Conversion of one iteration's tuple of outputs into a list of buffers.
///
/// Implemented for `Vec<B>`, fixed-size arrays and tuples up to four
/// elements, where every element converts into a [`Buffer`].
pub trait IntoBuffers {
    fn into_buffers(self) -> Vec<Buffer>;
}

impl<B: Into<Buffer>> IntoBuffers for Vec<B> {
    fn into_buffers(self) -> Vec<Buffer> {
        self.into_iter().map(Into::into).collect()
    }
}

impl<B: Into<Buffer>, const N: usize> IntoBuffers for [B; N] {
    fn into_buffers(self) -> Vec<Buffer> {
        self.into_iter().map(Into::into).collect()
    }
}

macro_rules! impl_into_buffers_tuple {
    ($($name:ident),+) => {
        impl<$($name: Into<Buffer>),+> IntoBuffers for ($($name,)+) {
            #[allow(non_snake_case)]
            fn into_buffers(self) -> Vec<Buffer> {
                let ($($name,)+) = self;
                vec![$($name.into()),+]
            }
        }
    };
}

impl_into_buffers_tuple!(A);
impl_into_buffers_tuple!(A, B);
impl_into_buffers_tuple!(A, B, C);
impl_into_buffers_tuple!(A, B, C, D);
