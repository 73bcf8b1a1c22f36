//! N-dimensional numeric arrays.

use crate::io::PathAdapter;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

/// Element type of an array. Multi-byte types are little-endian.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DType {
    /// Boolean stored as one byte.
    Bool,
    /// Unsigned 8-bit integer.
    U8,
    /// Signed 8-bit integer.
    I8,
    /// Unsigned 16-bit integer.
    U16,
    /// Signed 16-bit integer.
    I16,
    /// Unsigned 32-bit integer.
    U32,
    /// Signed 32-bit integer.
    I32,
    /// Unsigned 64-bit integer.
    U64,
    /// Signed 64-bit integer.
    I64,
    /// 32-bit float.
    F32,
    /// 64-bit float.
    F64,
}

impl DType {
    /// Size of one element in bytes.
    #[must_use]
    pub const fn item_size(self) -> usize {
        match self {
            Self::Bool | Self::U8 | Self::I8 => 1,
            Self::U16 | Self::I16 => 2,
            Self::U32 | Self::I32 | Self::F32 => 4,
            Self::U64 | Self::I64 | Self::F64 => 8,
        }
    }

    /// NumPy type descriptor, e.g. `"<f8"`.
    #[must_use]
    pub const fn descr(self) -> &'static str {
        match self {
            Self::Bool => "|b1",
            Self::U8 => "|u1",
            Self::I8 => "|i1",
            Self::U16 => "<u2",
            Self::I16 => "<i2",
            Self::U32 => "<u4",
            Self::I32 => "<i4",
            Self::U64 => "<u8",
            Self::I64 => "<i8",
            Self::F32 => "<f4",
            Self::F64 => "<f8",
        }
    }

    /// Parses a NumPy type descriptor.
    ///
    /// Single-byte types accept any byte-order mark; wider types must be
    /// little-endian.
    #[must_use]
    pub fn from_descr(descr: &str) -> Option<Self> {
        let (order, code) = descr.split_at_checked(1)?;
        let dtype = match code {
            "b1" => Self::Bool,
            "u1" => Self::U8,
            "i1" => Self::I8,
            "u2" => Self::U16,
            "i2" => Self::I16,
            "u4" => Self::U32,
            "i4" => Self::I32,
            "u8" => Self::U64,
            "i8" => Self::I64,
            "f4" => Self::F32,
            "f8" => Self::F64,
            _ => return None,
        };
        match order {
            "<" => Some(dtype),
            "|" | "=" | ">" if dtype.item_size() == 1 => Some(dtype),
            _ => None,
        }
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.descr())
    }
}

/// A Rust scalar that maps onto a [`DType`].
pub trait Element: Copy {
    /// The matching element type.
    const DTYPE: DType;

    /// Appends the little-endian encoding of `self`.
    fn extend_le(self, out: &mut Vec<u8>);

    /// Decodes one element from exactly `DTYPE.item_size()` bytes.
    fn from_le(bytes: &[u8]) -> Option<Self>;
}

macro_rules! numeric_element {
    ($($ty:ty => $dtype:ident),* $(,)?) => {
        $(
            impl Element for $ty {
                const DTYPE: DType = DType::$dtype;

                fn extend_le(self, out: &mut Vec<u8>) {
                    out.extend_from_slice(&self.to_le_bytes());
                }

                fn from_le(bytes: &[u8]) -> Option<Self> {
                    bytes.try_into().ok().map(<$ty>::from_le_bytes)
                }
            }
        )*
    };
}

numeric_element!(
    u8 => U8, i8 => I8, u16 => U16, i16 => I16, u32 => U32, i32 => I32,
    u64 => U64, i64 => I64, f32 => F32, f64 => F64,
);

impl Element for bool {
    const DTYPE: DType = DType::Bool;

    fn extend_le(self, out: &mut Vec<u8>) {
        out.push(u8::from(self));
    }

    fn from_le(bytes: &[u8]) -> Option<Self> {
        match bytes {
            [byte] => Some(*byte != 0),
            _ => None,
        }
    }
}

/// Number of elements a shape holds, or `None` on overflow.
#[must_use]
pub fn element_count(shape: &[usize]) -> Option<usize> {
    shape.iter().try_fold(1usize, |acc, &dim| acc.checked_mul(dim))
}

fn payload_len(dtype: DType, shape: &[usize]) -> Result<usize> {
    element_count(shape)
        .and_then(|count| count.checked_mul(dtype.item_size()))
        .ok_or_else(|| Error::InvalidInput(format!("array shape {shape:?} is too large")))
}

/// An in-memory n-dimensional array.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NdArray {
    dtype: DType,
    shape: Vec<usize>,
    fortran_order: bool,
    #[serde(with = "super::bytes")]
    data: Vec<u8>,
}

impl NdArray {
    /// Creates a C-ordered array from raw little-endian bytes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if `data` does not hold exactly the
    /// number of bytes the shape and dtype call for.
    pub fn new(dtype: DType, shape: Vec<usize>, data: Vec<u8>) -> Result<Self> {
        let expected = payload_len(dtype, &shape)?;
        if data.len() != expected {
            return Err(Error::InvalidInput(format!(
                "array of {dtype} {shape:?} needs {expected} bytes, got {}",
                data.len()
            )));
        }
        Ok(Self {
            dtype,
            shape,
            fortran_order: false,
            data,
        })
    }

    /// Creates a C-ordered array from typed elements.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if the element count does not match
    /// the shape.
    pub fn from_elements<T: Element>(shape: &[usize], elements: &[T]) -> Result<Self> {
        let mut data = Vec::with_capacity(elements.len() * T::DTYPE.item_size());
        for element in elements {
            element.extend_le(&mut data);
        }
        Self::new(T::DTYPE, shape.to_vec(), data)
    }

    /// Marks the payload as column-major.
    #[must_use]
    pub const fn with_fortran_order(mut self, fortran_order: bool) -> Self {
        self.fortran_order = fortran_order;
        self
    }

    /// Element type.
    #[must_use]
    pub const fn dtype(&self) -> DType {
        self.dtype
    }

    /// Dimensions.
    #[must_use]
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Whether the payload is column-major.
    #[must_use]
    pub const fn fortran_order(&self) -> bool {
        self.fortran_order
    }

    /// Raw little-endian payload.
    #[must_use]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Number of elements.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len() / self.dtype.item_size()
    }

    /// Returns `true` if the array has no elements.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Decodes the payload in storage order, or `None` if `T` does not
    /// match the dtype.
    #[must_use]
    pub fn to_vec<T: Element>(&self) -> Option<Vec<T>> {
        if T::DTYPE != self.dtype {
            return None;
        }
        self.data
            .chunks_exact(self.dtype.item_size())
            .map(T::from_le)
            .collect()
    }
}

/// An array whose payload stays on disk until [`LazyArray::load`].
///
/// Holds no open handle; each load reopens the file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LazyArray {
    path: PathBuf,
    dtype: DType,
    shape: Vec<usize>,
    fortran_order: bool,
    offset: u64,
}

impl LazyArray {
    /// Describes an array stored in `path` starting at byte `offset`.
    #[must_use]
    pub fn new(
        path: impl Into<PathBuf>,
        dtype: DType,
        shape: Vec<usize>,
        fortran_order: bool,
        offset: u64,
    ) -> Self {
        Self {
            path: path.into(),
            dtype,
            shape,
            fortran_order,
            offset,
        }
    }

    /// Backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Element type.
    #[must_use]
    pub const fn dtype(&self) -> DType {
        self.dtype
    }

    /// Dimensions.
    #[must_use]
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Byte offset of the payload within the file.
    #[must_use]
    pub const fn offset(&self) -> u64 {
        self.offset
    }

    /// Reads the payload.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the file has gone, or [`Error::Io`] if
    /// it is shorter than the declared payload.
    pub fn load(&self) -> Result<NdArray> {
        let len = payload_len(self.dtype, &self.shape)?;
        let mut file = PathAdapter::open(&self.path)?;
        file.seek(SeekFrom::Start(self.offset))
            .map_err(|e| Error::io("seek to array payload", e))?;
        let mut data = vec![0u8; len];
        file.read_exact(&mut data)
            .map_err(|e| Error::io(format!("read array payload from {}", self.path.display()), e))?;
        Ok(NdArray::new(self.dtype, self.shape.clone(), data)?.with_fortran_order(self.fortran_order))
    }
}
