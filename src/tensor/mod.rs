//! Shape-tagged numeric buffers exchanged with the inference backend.
//!
//! A [`Tensor`] pairs a row-major shape with a type-erased flat buffer. The
//! buffer is a closed variant over the five element kinds the backend
//! understands, so binding inputs and reading outputs never needs runtime
//! type probing. [`TypedTensor`] narrows any tensor to one numeric kind.

pub mod convert;
mod error;
pub mod matrix;

pub use convert::Number;
pub use error::TensorError;
pub use matrix::Matrix;

use std::fmt;

/// Element kinds a tensor buffer can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    Float32,
    Int32,
    Int64,
    Uint8,
    Int8,
}

impl DataType {
    /// Every supported kind, in declaration order.
    pub const ALL: [DataType; 5] = [
        DataType::Float32,
        DataType::Int32,
        DataType::Int64,
        DataType::Uint8,
        DataType::Int8,
    ];

    /// Width of one element in bytes.
    pub fn size_in_bytes(&self) -> usize {
        match self {
            Self::Float32 | Self::Int32 => 4,
            Self::Int64 => 8,
            Self::Uint8 | Self::Int8 => 1,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Float32 => "float32",
            Self::Int32 => "int32",
            Self::Int64 => "int64",
            Self::Uint8 => "uint8",
            Self::Int8 => "int8",
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Type-erased flat buffer in row-major order.
#[derive(Debug, Clone, PartialEq)]
pub enum TensorData {
    Float32(Vec<f32>),
    Int32(Vec<i32>),
    Int64(Vec<i64>),
    Uint8(Vec<u8>),
    Int8(Vec<i8>),
}

impl TensorData {
    /// Zero-filled buffer of `len` elements of kind `dtype`.
    pub fn zeros(dtype: DataType, len: usize) -> Self {
        match dtype {
            DataType::Float32 => Self::Float32(vec![0.0; len]),
            DataType::Int32 => Self::Int32(vec![0; len]),
            DataType::Int64 => Self::Int64(vec![0; len]),
            DataType::Uint8 => Self::Uint8(vec![0; len]),
            DataType::Int8 => Self::Int8(vec![0; len]),
        }
    }

    pub fn data_type(&self) -> DataType {
        match self {
            Self::Float32(_) => DataType::Float32,
            Self::Int32(_) => DataType::Int32,
            Self::Int64(_) => DataType::Int64,
            Self::Uint8(_) => DataType::Uint8,
            Self::Int8(_) => DataType::Int8,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Float32(v) => v.len(),
            Self::Int32(v) => v.len(),
            Self::Int64(v) => v.len(),
            Self::Uint8(v) => v.len(),
            Self::Int8(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Borrow the buffer as `E` if it holds that kind.
    pub fn as_slice<E: Element>(&self) -> Option<&[E]> {
        E::slice_of(self)
    }

    /// Mutably borrow the buffer as `E` if it holds that kind.
    pub fn as_mut_slice<E: Element>(&mut self) -> Option<&mut [E]> {
        E::slice_of_mut(self)
    }

    /// Convert every element to `E` (best effort, see [`convert`]).
    pub fn to_vec<E: Number>(&self) -> Vec<E> {
        match self {
            Self::Float32(v) => v.iter().map(|&x| E::from_f32(x)).collect(),
            Self::Int32(v) => v.iter().map(|&x| E::from_i32(x)).collect(),
            Self::Int64(v) => v.iter().map(|&x| E::from_i64(x)).collect(),
            Self::Uint8(v) => v.iter().map(|&x| E::from_u8(x)).collect(),
            Self::Int8(v) => v.iter().map(|&x| E::from_i8(x)).collect(),
        }
    }
}

/// A [`Number`] that can be stored directly in a [`TensorData`].
pub trait Element: Number {
    const DATA_TYPE: DataType;

    fn into_data(v: Vec<Self>) -> TensorData;
    fn slice_of(data: &TensorData) -> Option<&[Self]>;
    fn slice_of_mut(data: &mut TensorData) -> Option<&mut [Self]>;
}

macro_rules! impl_element {
    ($t:ty, $variant:ident) => {
        impl Element for $t {
            const DATA_TYPE: DataType = DataType::$variant;

            fn into_data(v: Vec<Self>) -> TensorData {
                TensorData::$variant(v)
            }

            fn slice_of(data: &TensorData) -> Option<&[Self]> {
                match data {
                    TensorData::$variant(v) => Some(v.as_slice()),
                    _ => None,
                }
            }

            fn slice_of_mut(data: &mut TensorData) -> Option<&mut [Self]> {
                match data {
                    TensorData::$variant(v) => Some(v.as_mut_slice()),
                    _ => None,
                }
            }
        }
    };
}

impl_element!(f32, Float32);
impl_element!(i32, Int32);
impl_element!(i64, Int64);
impl_element!(u8, Uint8);
impl_element!(i8, Int8);

/// Product of the dimension sizes; 1 for an empty (scalar) shape.
///
/// Wraps on overflow in release builds. Use [`checked_num_elements`] for
/// shapes that come from outside the crate.
pub fn num_elements(shape: &[usize]) -> usize {
    shape.iter().product()
}

/// Like [`num_elements`], but `None` when the product overflows `usize`.
///
/// A zero extent anywhere gives `Some(0)` regardless of the other dimensions.
pub fn checked_num_elements(shape: &[usize]) -> Option<usize> {
    if shape.contains(&0) {
        return Some(0);
    }
    shape.iter().try_fold(1usize, |acc, &d| acc.checked_mul(d))
}

fn check_len(shape: Vec<usize>, actual: usize) -> Result<Vec<usize>, TensorError> {
    match checked_num_elements(&shape) {
        Some(expected) if expected == actual => Ok(shape),
        expected => Err(TensorError::LengthMismatch {
            shape,
            expected: expected.unwrap_or(usize::MAX),
            actual,
        }),
    }
}

fn check_extent(depth: usize, expected: usize, actual: usize) -> Result<(), TensorError> {
    if expected != actual {
        return Err(TensorError::Ragged {
            depth,
            expected,
            actual,
        });
    }
    Ok(())
}

/// Shape plus type-erased buffer. `data.len() == num_elements(shape)` always holds.
#[derive(Debug, Clone, PartialEq)]
pub struct Tensor {
    shape: Vec<usize>,
    data: TensorData,
}

impl Tensor {
    /// Build a tensor, rejecting a buffer whose length disagrees with `shape`.
    pub fn new(shape: Vec<usize>, data: TensorData) -> Result<Self, TensorError> {
        let shape = check_len(shape, data.len())?;
        Ok(Self { shape, data })
    }

    /// Rank-0 tensor holding one value.
    pub fn scalar<E: Element>(value: E) -> Self {
        Self {
            shape: Vec::new(),
            data: E::into_data(vec![value]),
        }
    }

    pub fn from_1d<E: Element>(slice: &[E]) -> Self {
        Self {
            shape: vec![slice.len()],
            data: E::into_data(slice.to_vec()),
        }
    }

    /// Flatten `[batch][data]`. Every row must match the first row's length.
    pub fn from_2d<E: Element>(slice: &[Vec<E>]) -> Result<Self, TensorError> {
        let d1 = slice.first().map_or(0, Vec::len);

        let mut flat = Vec::with_capacity(slice.len() * d1);
        for row in slice {
            check_extent(1, d1, row.len())?;
            flat.extend_from_slice(row);
        }

        Ok(Self {
            shape: vec![slice.len(), d1],
            data: E::into_data(flat),
        })
    }

    pub fn from_3d<E: Element>(slice: &[Vec<Vec<E>>]) -> Result<Self, TensorError> {
        let first = slice.first();
        let d1 = first.map_or(0, Vec::len);
        let d2 = first.and_then(|b| b.first()).map_or(0, Vec::len);

        let mut flat = Vec::with_capacity(slice.len() * d1 * d2);
        for batch in slice {
            check_extent(1, d1, batch.len())?;
            for row in batch {
                check_extent(2, d2, row.len())?;
                flat.extend_from_slice(row);
            }
        }

        Ok(Self {
            shape: vec![slice.len(), d1, d2],
            data: E::into_data(flat),
        })
    }

    pub fn from_4d<E: Element>(slice: &[Vec<Vec<Vec<E>>>]) -> Result<Self, TensorError> {
        let first = slice.first();
        let d1 = first.map_or(0, Vec::len);
        let second = first.and_then(|b| b.first());
        let d2 = second.map_or(0, Vec::len);
        let d3 = second.and_then(|c| c.first()).map_or(0, Vec::len);

        let mut flat = Vec::with_capacity(slice.len() * d1 * d2 * d3);
        for batch in slice {
            check_extent(1, d1, batch.len())?;
            for channel in batch {
                check_extent(2, d2, channel.len())?;
                for row in channel {
                    check_extent(3, d3, row.len())?;
                    flat.extend_from_slice(row);
                }
            }
        }

        Ok(Self {
            shape: vec![slice.len(), d1, d2, d3],
            data: E::into_data(flat),
        })
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn data(&self) -> &TensorData {
        &self.data
    }

    pub fn data_type(&self) -> DataType {
        self.data.data_type()
    }

    pub fn rank(&self) -> usize {
        self.shape.len()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn into_parts(self) -> (Vec<usize>, TensorData) {
        (self.shape, self.data)
    }

    /// Narrow to one numeric kind, converting element by element.
    pub fn to_typed<E: Number>(&self) -> TypedTensor<E> {
        TypedTensor {
            shape: self.shape.clone(),
            data: self.data.to_vec(),
        }
    }
}

/// A tensor narrowed to a single numeric kind `E`.
#[derive(Debug, Clone, PartialEq)]
pub struct TypedTensor<E: Number> {
    shape: Vec<usize>,
    data: Vec<E>,
}

impl<E: Number> TypedTensor<E> {
    pub fn new(shape: Vec<usize>, data: Vec<E>) -> Result<Self, TensorError> {
        let shape = check_len(shape, data.len())?;
        Ok(Self { shape, data })
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn data(&self) -> &[E] {
        &self.data
    }

    pub fn into_parts(self) -> (Vec<usize>, Vec<E>) {
        (self.shape, self.data)
    }
}

impl<E: Element> TypedTensor<E> {
    /// Re-erase into a [`Tensor`] without copying.
    pub fn into_tensor(self) -> Tensor {
        Tensor {
            shape: self.shape,
            data: E::into_data(self.data),
        }
    }
}

impl<E: Number> From<&Tensor> for TypedTensor<E> {
    fn from(t: &Tensor) -> Self {
        t.to_typed()
    }
}
