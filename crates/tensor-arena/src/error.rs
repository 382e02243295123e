// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for tensor construction and element access.

use crate::Shape;

/// Errors that can occur when constructing or indexing a tensor.
#[derive(Debug, thiserror::Error)]
pub enum TensorError {
    /// The provided buffer length does not match the element count implied
    /// by the shape.
    #[error("buffer size mismatch: shape {shape} implies {expected} elements, got {actual}")]
    BufferSizeMismatch {
        shape: Shape,
        expected: usize,
        actual: usize,
    },

    /// A multi-dimensional index has the wrong rank or a coordinate outside
    /// its dimension.
    #[error("index {index:?} out of bounds for shape {shape}")]
    OutOfBounds { index: Vec<usize>, shape: Shape },

    /// Tensors require rank ≥ 1 and every dimension > 0.
    #[error("invalid tensor shape {shape}: rank must be ≥ 1 and all dimensions > 0")]
    EmptyShape { shape: Shape },

    /// The pool could not satisfy the allocation backing this tensor.
    #[error(transparent)]
    Memory(#[from] MemoryError),
}

/// Errors from the pool allocator. Kept distinct from [`TensorError`] so
/// callers can tell "your shapes are wrong" apart from "the arena is full".
#[derive(Debug, thiserror::Error)]
pub enum MemoryError {
    /// The requested allocation would exceed the pool's budget.
    #[error("out of memory: requested {requested_bytes} bytes, but only {available_bytes} available (budget: {budget_bytes})")]
    OutOfMemory {
        requested_bytes: usize,
        available_bytes: usize,
        budget_bytes: usize,
    },

    /// Attempted to allocate a tensor with no elements.
    #[error("cannot allocate zero-sized tensor")]
    ZeroSizedTensor,
}
