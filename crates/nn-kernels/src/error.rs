// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for the kernel operations.

use tensor_arena::{MemoryError, Shape};

/// Errors that can occur during kernel execution.
///
/// Every kernel validates its shape/stride/type preconditions in a fixed
/// order before allocating anything; the first violated condition is
/// returned immediately. Allocator failures travel in their own variant so
/// callers can distinguish "your shapes are wrong" from "the pool is full".
#[derive(Debug, thiserror::Error)]
pub enum KernelError {
    /// Two tensors have incompatible shapes for the requested operation.
    #[error("incompatible shapes for {op}: {lhs} vs {rhs}")]
    ShapeMismatch {
        op: &'static str,
        lhs: Shape,
        rhs: Shape,
    },

    /// The requested output element type is too narrow to hold the
    /// contraction sum without risking silent overflow.
    #[error("output type too narrow for {op}: {input_bits}-bit input with {output_bits}-bit accumulator")]
    NarrowOutputType {
        op: &'static str,
        input_bits: u32,
        output_bits: u32,
    },

    /// The stride argument does not have exactly two components.
    #[error("stride must have exactly 2 components, got {actual}")]
    WrongStride { actual: usize },

    /// A stride component is zero.
    #[error("stride components must be greater than zero")]
    ZeroStride,

    /// A rank-fixed operation received a tensor of the wrong rank.
    #[error("{op} requires rank-{expected_rank} input, got rank {actual_rank}")]
    InvalidDimensions {
        op: &'static str,
        expected_rank: usize,
        actual_rank: usize,
    },

    /// The pool could not satisfy an allocation.
    #[error(transparent)]
    Memory(#[from] MemoryError),
}
