//! File resources: binary arrays and PNG images

use crate::error::{ClientError, Result};
use crate::types::ArrayDtype;
use bytes::Bytes;
use ndarray::{ArrayD, IxDyn};
use num_traits::ToPrimitive;
use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};

/// Content type used for array uploads
pub const ARRAY_CONTENT_TYPE: &str = "application/octet-stream";

/// Content type used for image and thumbnail uploads
pub const IMAGE_CONTENT_TYPE: &str = "image/png";

/// PNG file signature
pub const PNG_SIGNATURE: &[u8; 8] = b"\x89PNG\r\n\x1a\n";

/// Typed contents of an array, stored flat in C order
#[derive(Debug, Clone, PartialEq)]
pub enum ArrayData {
    Int8(Vec<i8>),
    Uint8(Vec<u8>),
    Int16(Vec<i16>),
    Uint16(Vec<u16>),
    Int32(Vec<i32>),
    Uint32(Vec<u32>),
    Float32(Vec<f32>),
    Float64(Vec<f64>),
}

macro_rules! for_each_variant {
    ($data:expr, $values:ident => $body:expr) => {
        match $data {
            ArrayData::Int8($values) => $body,
            ArrayData::Uint8($values) => $body,
            ArrayData::Int16($values) => $body,
            ArrayData::Uint16($values) => $body,
            ArrayData::Int32($values) => $body,
            ArrayData::Uint32($values) => $body,
            ArrayData::Float32($values) => $body,
            ArrayData::Float64($values) => $body,
        }
    };
}

macro_rules! decode_le {
    ($bytes:expr, $ty:ty) => {
        $bytes
            .chunks_exact(std::mem::size_of::<$ty>())
            .map(|chunk| {
                let mut raw = [0u8; std::mem::size_of::<$ty>()];
                raw.copy_from_slice(chunk);
                <$ty>::from_le_bytes(raw)
            })
            .collect()
    };
}

impl ArrayData {
    /// Decode little-endian bytes as the given dtype
    pub fn from_le_bytes(dtype: ArrayDtype, bytes: &[u8]) -> Result<Self> {
        if bytes.len() % dtype.size_in_bytes() != 0 {
            return Err(ClientError::Validation(format!(
                "{} bytes is not a whole number of {} values",
                bytes.len(),
                dtype
            )));
        }
        Ok(match dtype {
            ArrayDtype::Int8Array => ArrayData::Int8(decode_le!(bytes, i8)),
            ArrayDtype::Uint8Array => ArrayData::Uint8(bytes.to_vec()),
            ArrayDtype::Int16Array => ArrayData::Int16(decode_le!(bytes, i16)),
            ArrayDtype::Uint16Array => ArrayData::Uint16(decode_le!(bytes, u16)),
            ArrayDtype::Int32Array => ArrayData::Int32(decode_le!(bytes, i32)),
            ArrayDtype::Uint32Array => ArrayData::Uint32(decode_le!(bytes, u32)),
            ArrayDtype::Float32Array => ArrayData::Float32(decode_le!(bytes, f32)),
            ArrayDtype::Float64Array => ArrayData::Float64(decode_le!(bytes, f64)),
        })
    }

    /// Encode as little-endian bytes
    pub fn to_le_bytes(&self) -> Vec<u8> {
        for_each_variant!(self, values => values.iter().flat_map(|v| v.to_le_bytes()).collect())
    }

    pub fn dtype(&self) -> ArrayDtype {
        match self {
            ArrayData::Int8(_) => ArrayDtype::Int8Array,
            ArrayData::Uint8(_) => ArrayDtype::Uint8Array,
            ArrayData::Int16(_) => ArrayDtype::Int16Array,
            ArrayData::Uint16(_) => ArrayDtype::Uint16Array,
            ArrayData::Int32(_) => ArrayDtype::Int32Array,
            ArrayData::Uint32(_) => ArrayDtype::Uint32Array,
            ArrayData::Float32(_) => ArrayDtype::Float32Array,
            ArrayData::Float64(_) => ArrayDtype::Float64Array,
        }
    }

    /// Number of values
    pub fn len(&self) -> usize {
        for_each_variant!(self, values => values.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Size of the encoded array in bytes
    pub fn nbytes(&self) -> usize {
        self.len() * self.dtype().size_in_bytes()
    }

    /// All values widened to f64
    pub fn to_f64_vec(&self) -> Vec<f64> {
        for_each_variant!(self, values => values
            .iter()
            .map(|v| v.to_f64().unwrap_or(f64::NAN))
            .collect())
    }

    /// All values converted to i64; fails on non-integral floats
    pub fn to_i64_vec(&self) -> Result<Vec<i64>> {
        for_each_variant!(self, values => values
            .iter()
            .map(|v| {
                let as_float = v.to_f64().unwrap_or(f64::NAN);
                if as_float.fract() != 0.0 || !as_float.is_finite() {
                    return Err(ClientError::Validation(format!(
                        "Value {} is not an integer",
                        as_float
                    )));
                }
                Ok(as_float as i64)
            })
            .collect())
    }

    /// Minimum and maximum, ignoring NaN; `None` when no finite values exist
    pub fn nan_min_max(&self) -> Option<(f64, f64)> {
        self.to_f64_vec()
            .into_iter()
            .filter(|v| !v.is_nan())
            .fold(None, |acc, v| match acc {
                None => Some((v, v)),
                Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
            })
    }

    /// View the values as an n-dimensional f64 array with the given shape
    pub fn to_ndarray(&self, shape: &[usize]) -> Result<ArrayD<f64>> {
        ArrayD::from_shape_vec(IxDyn(shape), self.to_f64_vec())
            .map_err(|e| ClientError::Validation(format!("Array shape mismatch: {}", e)))
    }
}

/// Binary array resource
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Array {
    /// Array dimensions, e.g. `[n, 3]` for vertices
    pub shape: Vec<usize>,
    pub dtype: ArrayDtype,
    /// Binary contents; absent on JSON-only downloads
    #[serde(skip)]
    pub array: Option<ArrayData>,
}

impl Array {
    /// Create an array from typed values and a shape
    pub fn new(array: ArrayData, shape: Vec<usize>) -> Self {
        Self {
            shape,
            dtype: array.dtype(),
            array: Some(array),
        }
    }

    /// One-dimensional float array
    pub fn from_f64(values: Vec<f64>) -> Self {
        let len = values.len();
        Self::new(ArrayData::Float64(values), vec![len])
    }

    /// Float array of 3-vectors, shape `[n, 3]`
    pub fn from_vectors(vectors: &[[f64; 3]]) -> Self {
        let flat = vectors.iter().flat_map(|v| v.iter().copied()).collect();
        Self::new(ArrayData::Float64(flat), vec![vectors.len(), 3])
    }

    /// Integer index array with rows of width `N`, shape `[n, N]`
    pub fn from_indices<const N: usize>(rows: &[[u32; N]]) -> Self {
        let flat = rows.iter().flat_map(|r| r.iter().copied()).collect();
        Self::new(ArrayData::Uint32(flat), vec![rows.len(), N])
    }

    /// Length in bytes of the binary payload
    pub fn content_length(&self) -> usize {
        let count: usize = self.shape.iter().product();
        count * self.dtype.size_in_bytes()
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(array) = &self.array {
            if array.dtype() != self.dtype {
                return Err(ClientError::Validation(format!(
                    "Array dtype {} does not match data {}",
                    self.dtype,
                    array.dtype()
                )));
            }
            let expected: usize = self.shape.iter().product();
            if array.len() != expected {
                return Err(ClientError::Validation(format!(
                    "Array shape {:?} needs {} values, found {}",
                    self.shape,
                    expected,
                    array.len()
                )));
            }
        }
        Ok(())
    }

    /// Require a 2D shape with the given row width
    pub fn validate_rows(&self, width: usize, what: &str) -> Result<()> {
        if self.shape.len() != 2 || self.shape[1] != width {
            return Err(ClientError::Validation(format!(
                "{} must have shape [n, {}], found {:?}",
                what, width, self.shape
            )));
        }
        Ok(())
    }
}

impl Serialize for Array {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("Array", 4)?;
        state.serialize_field("shape", &self.shape)?;
        state.serialize_field("dtype", &self.dtype)?;
        state.serialize_field("content_type", ARRAY_CONTENT_TYPE)?;
        state.serialize_field("content_length", &self.content_length())?;
        state.end()
    }
}

/// PNG image resource
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct Image {
    #[serde(skip)]
    pub data: Option<Bytes>,
}

impl Image {
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self {
            data: Some(data.into()),
        }
    }

    pub fn content_length(&self) -> usize {
        self.data.as_ref().map(|d| d.len()).unwrap_or(0)
    }

    pub fn validate(&self) -> Result<()> {
        match &self.data {
            Some(data) if !data.starts_with(PNG_SIGNATURE) => Err(ClientError::Validation(
                "Image data must be PNG".to_string(),
            )),
            _ => Ok(()),
        }
    }
}

impl Serialize for Image {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("Image", 2)?;
        state.serialize_field("content_type", IMAGE_CONTENT_TYPE)?;
        state.serialize_field("content_length", &self.content_length())?;
        state.end()
    }
}
