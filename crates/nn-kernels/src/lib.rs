// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # nn-kernels
//!
//! The numeric kernel core of a lightweight inference engine for embedded
//! and edge targets: generalized batched matrix multiplication, im2col
//! convolution with full gradient passes, and an activation family, all
//! over flat row-major [`tensor_arena::Tensor`] buffers.
//!
//! This crate provides:
//! - [`batched_dot`] — matmul over the trailing two axes of arbitrary-rank
//!   tensors, with explicit accumulator-width validation.
//! - [`convolve`] plus [`backward_biases`], [`backward_weights`], and
//!   [`backward_inputs`] — valid convolution reduced to matrix multiply via
//!   [`im2col`] / [`col2im`].
//! - [`Activation`] — ReLU, LeakyReLU, Sigmoid, and Softmax forward and
//!   derivative transforms.
//!
//! # Design Goals
//! - Every kernel takes an explicit [`tensor_arena::TensorPool`]; there is
//!   no hidden allocator.
//! - Preconditions validated in a fixed order before any allocation;
//!   failing calls leave the pool's live-byte count untouched.
//! - Single-threaded and synchronous: cost is proportional to tensor
//!   volume, failures are plain `Result` values.

mod error;
mod ops;

pub use error::KernelError;
pub use ops::{
    backward_biases, backward_inputs, backward_weights, batched_dot, col2im, convolve, im2col,
    Activation,
};
