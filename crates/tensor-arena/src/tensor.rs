// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Core tensor type.

use crate::pool::PoolInner;
use crate::{Scalar, Shape, TensorError};
use std::sync::Arc;

/// An owned, n-dimensional tensor stored in contiguous memory.
///
/// `Tensor` is the primary data carrier for the kernel crates. It owns its
/// flat buffer in row-major (C) order — the last axis is contiguous — and
/// holds a handle back to the [`TensorPool`](crate::TensorPool) that
/// allocated it, so the pool's live-byte accounting is released exactly once
/// when the tensor is dropped.
///
/// Tensors are exclusively owned and deliberately not `Clone`; a kernel that
/// needs a copy allocates one through the pool.
pub struct Tensor<T: Scalar> {
    shape: Shape,
    data: Vec<T>,
    pool: Arc<PoolInner>,
}

impl<T: Scalar> Tensor<T> {
    /// Wraps a pre-validated buffer (called internally by the pool).
    pub(crate) fn from_raw(data: Vec<T>, shape: Shape, pool: Arc<PoolInner>) -> Self {
        debug_assert_eq!(data.len(), shape.num_elements());
        Self { shape, data, pool }
    }

    /// Returns the tensor's shape.
    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    /// Returns the number of dimensions.
    pub fn rank(&self) -> usize {
        self.shape.rank()
    }

    /// Returns the total number of elements.
    pub fn num_elements(&self) -> usize {
        self.data.len()
    }

    /// Returns the memory footprint of this tensor in bytes.
    pub fn size_bytes(&self) -> usize {
        self.data.len() * std::mem::size_of::<T>()
    }

    /// Returns the flat row-major buffer.
    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    /// Returns the flat row-major buffer mutably.
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.data
    }

    /// Reads the element at a multi-dimensional index.
    ///
    /// # Errors
    /// Returns [`TensorError::OutOfBounds`] if the index rank does not match
    /// the tensor rank or any coordinate is outside its dimension.
    ///
    /// # Examples
    /// ```
    /// use tensor_arena::TensorPool;
    /// let pool = TensorPool::unbounded();
    /// let t = pool.from_slice(vec![2, 2], &[1i32, 2, 3, 4]).unwrap();
    /// assert_eq!(t.get(&[1, 0]).unwrap(), 3);
    /// assert!(t.get(&[2, 0]).is_err());
    /// ```
    pub fn get(&self, index: &[usize]) -> Result<T, TensorError> {
        let offset = self.flat_offset(index)?;
        Ok(self.data[offset])
    }

    /// Writes the element at a multi-dimensional index.
    ///
    /// Same error contract as [`get`](Tensor::get).
    pub fn set(&mut self, index: &[usize], value: T) -> Result<(), TensorError> {
        let offset = self.flat_offset(index)?;
        self.data[offset] = value;
        Ok(())
    }

    /// Fills the tensor with a constant value.
    pub fn fill(&mut self, value: T) {
        self.data.iter_mut().for_each(|x| *x = value);
    }

    /// Maps a multi-dimensional index to a flat buffer offset.
    fn flat_offset(&self, index: &[usize]) -> Result<usize, TensorError> {
        let dims = self.shape.dims();
        if index.len() != dims.len() {
            return Err(TensorError::OutOfBounds {
                index: index.to_vec(),
                shape: self.shape.clone(),
            });
        }
        let mut offset = 0;
        for (&coord, &dim) in index.iter().zip(dims.iter()) {
            if coord >= dim {
                return Err(TensorError::OutOfBounds {
                    index: index.to_vec(),
                    shape: self.shape.clone(),
                });
            }
            offset = offset * dim + coord;
        }
        Ok(offset)
    }
}

impl<T: Scalar> Drop for Tensor<T> {
    fn drop(&mut self) {
        self.pool.release(self.size_bytes());
    }
}

impl<T: Scalar> std::fmt::Debug for Tensor<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tensor")
            .field("shape", &self.shape)
            .field("elem", &T::NAME)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TensorPool;

    #[test]
    fn test_zeros() {
        let pool = TensorPool::unbounded();
        let t = pool.zeros::<f32>(vec![2, 3]).unwrap();
        assert_eq!(t.shape(), &Shape::matrix(2, 3));
        assert_eq!(t.num_elements(), 6);
        assert_eq!(t.size_bytes(), 24);
        assert!(t.as_slice().iter().all(|&x| x == 0.0));
    }

    #[test]
    fn test_get_set() {
        let pool = TensorPool::unbounded();
        let mut t = pool.zeros::<i32>(vec![2, 3]).unwrap();

        t.set(&[0, 2], 7).unwrap();
        t.set(&[1, 0], -3).unwrap();

        assert_eq!(t.get(&[0, 2]).unwrap(), 7);
        assert_eq!(t.get(&[1, 0]).unwrap(), -3);
        // Row-major: [1, 0] sits at flat offset 3.
        assert_eq!(t.as_slice(), &[0, 0, 7, -3, 0, 0]);
    }

    #[test]
    fn test_out_of_bounds() {
        let pool = TensorPool::unbounded();
        let mut t = pool.zeros::<f32>(vec![2, 3]).unwrap();

        assert!(matches!(
            t.get(&[2, 0]),
            Err(TensorError::OutOfBounds { .. })
        ));
        // Wrong rank is also out of bounds.
        assert!(t.get(&[1]).is_err());
        assert!(t.set(&[0, 3], 1.0).is_err());
    }

    #[test]
    fn test_rank4_indexing() {
        let pool = TensorPool::unbounded();
        let data: Vec<f32> = (0..24).map(|v| v as f32).collect();
        let t = pool.from_vec(vec![2, 3, 2, 2], data).unwrap();

        // offset = ((b*3 + c)*2 + h)*2 + w
        assert_eq!(t.get(&[1, 2, 1, 1]).unwrap(), 23.0);
        assert_eq!(t.get(&[0, 1, 0, 1]).unwrap(), 5.0);
    }

    #[test]
    fn test_fill() {
        let pool = TensorPool::unbounded();
        let mut t = pool.zeros::<f64>(vec![5]).unwrap();
        t.fill(2.5);
        assert!(t.as_slice().iter().all(|&x| x == 2.5));
    }

    #[test]
    fn test_mut_slice() {
        let pool = TensorPool::unbounded();
        let mut t = pool.zeros::<f32>(vec![3]).unwrap();
        t.as_mut_slice()[1] = 9.0;
        assert_eq!(t.as_slice(), &[0.0, 9.0, 0.0]);
    }

    #[test]
    fn test_debug_format() {
        let pool = TensorPool::unbounded();
        let t = pool.zeros::<f32>(vec![2, 2]).unwrap();
        let s = format!("{t:?}");
        assert!(s.contains("f32"));
        assert!(s.contains("[2, 2]"));
    }
}
