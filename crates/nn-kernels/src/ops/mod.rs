// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Tensor kernel operations.
//!
//! Every operation takes the [`TensorPool`](tensor_arena::TensorPool)
//! explicitly, validates its preconditions in a fixed order before touching
//! the pool, and returns freshly allocated results whose ownership passes
//! to the caller. Single-threaded, synchronous, run-to-completion.

mod activation_op;
mod conv_op;
mod dot_op;
mod im2col_op;

pub use activation_op::Activation;
pub use conv_op::{backward_biases, backward_inputs, backward_weights, convolve};
pub use dot_op::batched_dot;
pub use im2col_op::{col2im, im2col};

use crate::KernelError;

/// Validates a stride argument: exactly two components, both positive.
///
/// Returns `(stride_row, stride_col)`.
pub(crate) fn validate_stride(stride: &[usize]) -> Result<(usize, usize), KernelError> {
    if stride.len() != 2 {
        return Err(KernelError::WrongStride {
            actual: stride.len(),
        });
    }
    if stride[0] == 0 || stride[1] == 0 {
        return Err(KernelError::ZeroStride);
    }
    Ok((stride[0], stride[1]))
}
