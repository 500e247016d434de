//! Tensor values held by variables.
//!
//! The engine is agnostic to numeric kernels, so a [`Tensor`] exposes its
//! elements as `f64` regardless of the declared [`DataType`]. The declared
//! type matters at the serialization boundary: [`Tensor::to_flat`] narrows
//! every element to the declared type and [`Tensor::from_flat`] widens it
//! back.
//!
//! `Int64` tensors also hold their exact values, since `f64` cannot
//! represent every integer above 2^53. Anything that moves a tensor as a
//! whole (`dup`, `assign`, serialization) carries them along. Writes through
//! [`Tensor::data_mut`], [`Tensor::map`] or [`Tensor::zip_with`] compute in
//! `f64` and drop them.

use crate::error::{GraphError, Result};
use tensorgraph_wire::{ByteOrder, DataType, FlatArray};

/// Dense n-dimensional array.
#[derive(Debug, Clone)]
pub struct Tensor {
    shape: Vec<usize>,
    dtype: DataType,
    data: Vec<f64>,
    integers: Option<Vec<i64>>,
}

impl PartialEq for Tensor {
    fn eq(&self, other: &Self) -> bool {
        if self.shape != other.shape || self.dtype != other.dtype {
            return false;
        }
        match (&self.integers, &other.integers) {
            (Some(a), Some(b)) => a == b,
            _ => self.data == other.data,
        }
    }
}

impl Tensor {
    /// Create a tensor, checking that `data` fills `shape` exactly.
    pub fn new(shape: Vec<usize>, data: Vec<f64>) -> Result<Self> {
        let length: usize = shape.iter().product();
        if length != data.len() {
            return Err(GraphError::bad_length(format!(
                "shape {:?} holds {} elements, got {}",
                shape,
                length,
                data.len()
            )));
        }
        Ok(Self {
            shape,
            dtype: DataType::Float,
            data,
            integers: None,
        })
    }

    /// `Int64` tensor holding `values` exactly.
    pub fn from_i64(shape: Vec<usize>, values: Vec<i64>) -> Result<Self> {
        let data = values.iter().map(|v| *v as f64).collect();
        let mut tensor = Self::new(shape, data)?;
        tensor.dtype = DataType::Int64;
        tensor.integers = Some(values);
        Ok(tensor)
    }

    /// Rank-0 tensor holding one value
    pub fn scalar(value: f64) -> Self {
        Self {
            shape: Vec::new(),
            dtype: DataType::Float,
            data: vec![value],
            integers: None,
        }
    }

    /// Rank-1 tensor over `data`
    pub fn vector(data: Vec<f64>) -> Self {
        Self {
            shape: vec![data.len()],
            dtype: DataType::Float,
            data,
            integers: None,
        }
    }

    pub fn zeros(shape: Vec<usize>) -> Self {
        let length = shape.iter().product();
        Self {
            shape,
            dtype: DataType::Float,
            data: vec![0.0; length],
            integers: None,
        }
    }

    pub fn with_dtype(mut self, dtype: DataType) -> Self {
        if dtype != DataType::Int64 {
            self.integers = None;
        }
        self.dtype = dtype;
        self
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn dtype(&self) -> DataType {
        self.dtype
    }

    pub fn data(&self) -> &[f64] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [f64] {
        self.integers = None;
        &mut self.data
    }

    /// Exact elements of an `Int64` tensor, when they are still known.
    pub fn integers(&self) -> Option<&[i64]> {
        self.integers.as_deref()
    }

    pub fn rank(&self) -> usize {
        self.shape.len()
    }

    pub fn length(&self) -> usize {
        self.data.len()
    }

    pub fn is_scalar(&self) -> bool {
        self.data.len() == 1
    }

    /// Size of the serialized payload in bytes
    pub fn size_in_bytes(&self) -> usize {
        self.data.len() * self.dtype.size_of()
    }

    /// First element, the conventional truth value of a predicate tensor.
    pub fn scalar_value(&self) -> Option<f64> {
        self.data.first().copied()
    }

    pub fn sum(&self) -> f64 {
        self.data.iter().sum()
    }

    pub fn mean(&self) -> f64 {
        if self.data.is_empty() {
            0.0
        } else {
            self.sum() / self.data.len() as f64
        }
    }

    /// Deep copy
    pub fn dup(&self) -> Self {
        self.clone()
    }

    /// Overwrite the elements of `self` with those of `other`, keeping the
    /// existing allocation. Lengths must agree.
    pub fn assign(&mut self, other: &Tensor) -> Result<()> {
        if self.data.len() != other.data.len() {
            return Err(GraphError::bad_length(format!(
                "cannot assign {} elements into a tensor of {}",
                other.data.len(),
                self.data.len()
            )));
        }
        self.data.copy_from_slice(&other.data);
        self.shape.clone_from(&other.shape);
        self.dtype = other.dtype;
        self.integers.clone_from(&other.integers);
        Ok(())
    }

    /// Element-wise map into a new tensor of the same shape
    pub fn map(&self, f: impl Fn(f64) -> f64) -> Self {
        Self {
            shape: self.shape.clone(),
            dtype: self.dtype,
            data: self.data.iter().map(|v| f(*v)).collect(),
            integers: None,
        }
    }

    /// Element-wise combination of two tensors of equal shape. A scalar on
    /// either side is broadcast.
    pub fn zip_with(&self, other: &Tensor, f: impl Fn(f64, f64) -> f64) -> Result<Self> {
        if self.shape == other.shape {
            let data = self
                .data
                .iter()
                .zip(other.data.iter())
                .map(|(a, b)| f(*a, *b))
                .collect();
            return Ok(Self {
                shape: self.shape.clone(),
                dtype: self.dtype,
                data,
                integers: None,
            });
        }
        if other.is_scalar() {
            let b = other.data[0];
            return Ok(self.map(|a| f(a, b)));
        }
        if self.is_scalar() {
            let a = self.data[0];
            return Ok(other.map(|b| f(a, b)));
        }
        Err(GraphError::bad_dimensions(format!(
            "shapes {:?} and {:?} are not compatible",
            self.shape, other.shape
        )))
    }

    /// Decode a serialized array, honouring its byte order.
    pub fn from_flat(array: &FlatArray) -> Result<Self> {
        array.validate()?;
        let shape: Vec<usize> = array.shape.iter().map(|d| *d as usize).collect();
        let width = array.dtype.size_of();
        let big = array.byte_order == ByteOrder::Be;

        if array.dtype == DataType::Int64 {
            let values = array
                .buffer
                .chunks_exact(width)
                .map(|chunk| read_i64(chunk, big))
                .collect();
            return Self::from_i64(shape, values);
        }

        let data = array
            .buffer
            .chunks_exact(width)
            .map(|chunk| decode_element(chunk, array.dtype, big))
            .collect();

        Ok(Self {
            shape,
            dtype: array.dtype,
            data,
            integers: None,
        })
    }

    /// Encode into a serialized array in the given byte order.
    pub fn to_flat(&self, byte_order: ByteOrder) -> FlatArray {
        let big = byte_order == ByteOrder::Be;
        let mut buffer = Vec::with_capacity(self.size_in_bytes());
        match self.integers.as_deref().filter(|_| self.dtype == DataType::Int64) {
            Some(values) => {
                for value in values {
                    if big {
                        buffer.extend_from_slice(&value.to_be_bytes());
                    } else {
                        buffer.extend_from_slice(&value.to_le_bytes());
                    }
                }
            }
            None => {
                for value in &self.data {
                    encode_element(*value, self.dtype, big, &mut buffer);
                }
            }
        }
        FlatArray::new(
            self.shape.iter().map(|d| *d as i64).collect(),
            buffer,
            self.dtype,
            byte_order,
        )
    }
}

macro_rules! read_as {
    ($ty:ty, $chunk:expr, $big:expr) => {{
        let mut bytes = [0u8; std::mem::size_of::<$ty>()];
        bytes.copy_from_slice($chunk);
        if $big {
            <$ty>::from_be_bytes(bytes) as f64
        } else {
            <$ty>::from_le_bytes(bytes) as f64
        }
    }};
}

fn read_i64(chunk: &[u8], big: bool) -> i64 {
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(chunk);
    if big {
        i64::from_be_bytes(bytes)
    } else {
        i64::from_le_bytes(bytes)
    }
}

fn decode_element(chunk: &[u8], dtype: DataType, big: bool) -> f64 {
    match dtype {
        DataType::Bool => {
            if chunk[0] != 0 {
                1.0
            } else {
                0.0
            }
        }
        DataType::Uint8 => chunk[0] as f64,
        DataType::Int8 => chunk[0] as i8 as f64,
        DataType::Int16 => read_as!(i16, chunk, big),
        DataType::Int32 => read_as!(i32, chunk, big),
        DataType::Int64 => read_as!(i64, chunk, big),
        DataType::Float => read_as!(f32, chunk, big),
        DataType::Double => read_as!(f64, chunk, big),
    }
}

fn encode_element(value: f64, dtype: DataType, big: bool, out: &mut Vec<u8>) {
    macro_rules! write_as {
        ($v:expr) => {{
            let v = $v;
            if big {
                out.extend_from_slice(&v.to_be_bytes());
            } else {
                out.extend_from_slice(&v.to_le_bytes());
            }
        }};
    }
    match dtype {
        DataType::Bool => out.push(u8::from(value != 0.0)),
        DataType::Uint8 => out.push(value as u8),
        DataType::Int8 => out.push(value as i8 as u8),
        DataType::Int16 => write_as!(value as i16),
        DataType::Int32 => write_as!(value as i32),
        DataType::Int64 => write_as!(value as i64),
        DataType::Float => write_as!(value as f32),
        DataType::Double => write_as!(value),
    }
}

/// Ordered list of tensors, produced by operations with list outputs.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TensorList {
    tensors: Vec<Tensor>,
}

impl TensorList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, tensor: Tensor) {
        self.tensors.push(tensor);
    }

    pub fn get(&self, index: usize) -> Option<&Tensor> {
        self.tensors.get(index)
    }

    pub fn len(&self) -> usize {
        self.tensors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tensors.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Tensor> {
        self.tensors.iter()
    }

    /// Stack equally shaped members along a new leading axis.
    pub fn stack(&self) -> Result<Tensor> {
        let Some(first) = self.tensors.first() else {
            return Ok(Tensor::zeros(vec![0]));
        };
        let mut data = Vec::with_capacity(first.length() * self.tensors.len());
        for tensor in &self.tensors {
            if tensor.shape() != first.shape() {
                return Err(GraphError::bad_dimensions(format!(
                    "cannot stack {:?} with {:?}",
                    tensor.shape(),
                    first.shape()
                )));
            }
            data.extend_from_slice(tensor.data());
        }
        let mut shape = vec![self.tensors.len()];
        shape.extend_from_slice(first.shape());
        Ok(Tensor::new(shape, data)?.with_dtype(first.dtype()))
    }
}

impl From<Vec<Tensor>> for TensorList {
    fn from(tensors: Vec<Tensor>) -> Self {
        Self { tensors }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_checks_length() {
        assert!(Tensor::new(vec![2, 2], vec![1.0, 2.0, 3.0, 4.0]).is_ok());
        assert!(matches!(
            Tensor::new(vec![2, 2], vec![1.0]),
            Err(GraphError::BadLength(_))
        ));
    }

    #[test]
    fn test_reductions() {
        let t = Tensor::vector(vec![1.0, 2.0, 3.0, 6.0]);
        assert_eq!(t.sum(), 12.0);
        assert_eq!(t.mean(), 3.0);
        assert_eq!(t.scalar_value(), Some(1.0));
        assert_eq!(Tensor::scalar(4.0).rank(), 0);
    }

    #[test]
    fn test_assign_keeps_length() {
        let mut target = Tensor::vector(vec![0.0, 0.0]);
        target.assign(&Tensor::vector(vec![5.0, 6.0])).unwrap();
        assert_eq!(target.data(), &[5.0, 6.0]);
        assert!(target.assign(&Tensor::scalar(1.0)).is_err());
    }

    #[test]
    fn test_zip_with_broadcasts_scalars() {
        let a = Tensor::vector(vec![1.0, 2.0]);
        let sum = a.zip_with(&Tensor::scalar(10.0), |x, y| x + y).unwrap();
        assert_eq!(sum.data(), &[11.0, 12.0]);

        let b = Tensor::vector(vec![1.0, 2.0, 3.0]);
        assert!(matches!(
            a.zip_with(&b, |x, y| x + y),
            Err(GraphError::BadDimensions(_))
        ));
    }

    #[test]
    fn test_flat_encoding_respects_byte_order() {
        let t = Tensor::new(vec![2], vec![1.0, -2.0])
            .unwrap()
            .with_dtype(DataType::Int32);

        let le = t.to_flat(ByteOrder::Le);
        assert_eq!(&le.buffer[..4], &1i32.to_le_bytes());
        let be = t.to_flat(ByteOrder::Be);
        assert_eq!(&be.buffer[4..], &(-2i32).to_be_bytes());

        assert_eq!(Tensor::from_flat(&le).unwrap(), t);
        assert_eq!(Tensor::from_flat(&be).unwrap(), t);
    }

    #[test]
    fn test_flat_float_payload() {
        let t = Tensor::new(vec![1, 3], vec![0.5, 1.5, -4.25]).unwrap();
        let flat = t.to_flat(ByteOrder::native());
        assert_eq!(flat.shape, vec![1, 3]);
        assert_eq!(flat.buffer.len(), 12);
        assert_eq!(flat.dtype, DataType::Float);
        assert_eq!(Tensor::from_flat(&flat).unwrap(), t);
    }

    #[test]
    fn test_from_flat_rejects_short_buffer() {
        let flat = FlatArray::new(vec![3], vec![0u8; 5], DataType::Float, ByteOrder::Le);
        assert!(matches!(Tensor::from_flat(&flat), Err(GraphError::Wire(_))));
    }

    #[test]
    fn test_int64_keeps_exact_values() {
        let big = (1i64 << 53) + 1;
        let t = Tensor::from_i64(vec![3], vec![big, -big, i64::MAX]).unwrap();
        assert_eq!(t.data()[0], (1u64 << 53) as f64);

        for order in [ByteOrder::Le, ByteOrder::Be] {
            let flat = t.to_flat(order);
            assert_eq!(flat.buffer.len(), 24);
            let back = Tensor::from_flat(&flat).unwrap();
            assert_eq!(back.integers(), Some(&[big, -big, i64::MAX][..]));
            assert_eq!(back.to_flat(order), flat);
        }

        let mut copy = Tensor::zeros(vec![3]).with_dtype(DataType::Int64);
        copy.assign(&t).unwrap();
        assert_eq!(copy.integers(), t.integers());
    }

    #[test]
    fn test_int64_writes_fall_back_to_float_view() {
        let mut t = Tensor::from_i64(vec![2], vec![1, 2]).unwrap();
        assert!(t.map(|v| v * 2.0).integers().is_none());

        t.data_mut()[0] = 7.0;
        assert!(t.integers().is_none());
        assert_eq!(&t.to_flat(ByteOrder::Le).buffer[..8], &7i64.to_le_bytes());
    }

    #[test]
    fn test_stack_list() {
        let list = TensorList::from(vec![Tensor::vector(vec![1.0, 2.0]), Tensor::vector(vec![3.0, 4.0])]);
        let stacked = list.stack().unwrap();
        assert_eq!(stacked.shape(), &[2, 2]);
        assert_eq!(stacked.data(), &[1.0, 2.0, 3.0, 4.0]);
    }
}
