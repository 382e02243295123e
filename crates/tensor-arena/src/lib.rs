// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # tensor-arena
//!
//! Pool-allocated generic tensors for edge inference kernels.
//!
//! This crate provides:
//! - [`Tensor`] — an n-dimensional tensor generic over its element type,
//!   stored flat in row-major order.
//! - [`Shape`] — ordered dimension descriptors with stride arithmetic.
//! - [`Scalar`] — the element trait, carrying an explicit bit width for
//!   accumulator-width checks.
//! - [`TensorPool`] — the allocator handle threaded through every kernel
//!   call, with budget enforcement and live-byte accounting.
//!
//! # Design Goals
//! - Exclusive ownership: a tensor is released exactly once, on drop, and
//!   the pool observes it — which is what the kernel crates' leak-checked
//!   tests rely on.
//! - No hidden globals: allocation always goes through an explicit
//!   [`TensorPool`] handle.
//! - Clean error types via `thiserror`, with allocator failures kept in a
//!   category of their own.

mod budget;
mod error;
mod pool;
mod scalar;
mod shape;
mod stats;
mod tensor;

pub use budget::MemoryBudget;
pub use error::{MemoryError, TensorError};
pub use pool::TensorPool;
pub use scalar::Scalar;
pub use shape::Shape;
pub use stats::AllocationStats;
pub use tensor::Tensor;
