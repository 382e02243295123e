// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Budget-enforced tensor allocator.
//!
//! The [`TensorPool`] is the allocator handle threaded explicitly through
//! every kernel call — there is no hidden process-wide allocator. It:
//!
//! 1. Enforces a hard memory ceiling — allocations that would exceed the
//!    budget return `Err(OutOfMemory)`.
//! 2. Tracks live bytes so tests can assert that failing kernel calls
//!    leave nothing allocated behind.
//! 3. Accumulates [`AllocationStats`] for profiling.
//!
//! # Ownership Model
//!
//! ```text
//! TensorPool::zeros(shape)
//!       │
//!       ▼
//!   Tensor<T>  ◄─── owns Vec<T>, holds Arc<PoolInner>
//!       │
//!       │  drop()
//!       ▼
//!   PoolInner::release()  ──► live-bytes counter decremented
//! ```
//!
//! Every tensor holds an `Arc` back to its pool's inner state; dropping the
//! tensor releases its accounting exactly once. The borrow checker rules out
//! double release and use-after-release at compile time.

use crate::{AllocationStats, MemoryBudget, MemoryError, Scalar, Shape, Tensor, TensorError};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Internal pool state, shared between the pool and its tensors via `Arc`.
pub struct PoolInner {
    /// The memory budget ceiling.
    budget: MemoryBudget,
    /// Currently live bytes (allocated, not yet dropped).
    live_bytes: AtomicUsize,
    /// Statistics (behind a Mutex since updates are infrequent).
    stats: Mutex<AllocationStats>,
}

impl PoolInner {
    /// Called by `Tensor::drop` to return accounting to the pool.
    pub(crate) fn release(&self, size_bytes: usize) {
        self.live_bytes.fetch_sub(size_bytes, Ordering::Release);
        if let Ok(mut stats) = self.stats.lock() {
            stats.record_release();
        }
    }
}

/// The allocator handle for tensor buffers.
///
/// Cloning a `TensorPool` is cheap and yields a handle to the same
/// underlying accounting state.
///
/// # Example
/// ```
/// use tensor_arena::{MemoryBudget, TensorPool};
///
/// let pool = TensorPool::new(MemoryBudget::from_mb(64));
/// let t = pool.zeros::<f32>(vec![2, 3]).unwrap();
/// assert_eq!(pool.live_bytes(), 24); // 6 × 4 bytes
///
/// drop(t);
/// assert_eq!(pool.live_bytes(), 0);
/// ```
#[derive(Clone)]
pub struct TensorPool {
    inner: Arc<PoolInner>,
}

impl TensorPool {
    /// Creates a new pool with the given budget.
    pub fn new(budget: MemoryBudget) -> Self {
        Self {
            inner: Arc::new(PoolInner {
                budget,
                live_bytes: AtomicUsize::new(0),
                stats: Mutex::new(AllocationStats::default()),
            }),
        }
    }

    /// Creates a pool with no budget ceiling.
    pub fn unbounded() -> Self {
        Self::new(MemoryBudget::unlimited())
    }

    /// Allocates a zero-initialized tensor with the given shape.
    ///
    /// Returns `Err(OutOfMemory)` if the allocation would exceed the budget
    /// and `Err(ZeroSizedTensor)` for rank-0 shapes or shapes with a zero
    /// dimension.
    pub fn zeros<T: Scalar>(&self, shape: impl Into<Shape>) -> Result<Tensor<T>, MemoryError> {
        let shape = shape.into();
        if shape.rank() == 0 || shape.has_zero_dim() {
            return Err(MemoryError::ZeroSizedTensor);
        }
        let n = shape.num_elements();
        self.reserve(n * std::mem::size_of::<T>())?;
        Ok(Tensor::from_raw(vec![T::zero(); n], shape, Arc::clone(&self.inner)))
    }

    /// Builds a tensor from a flat row-major vector of values.
    ///
    /// The vector length must equal `shape.num_elements()`.
    pub fn from_vec<T: Scalar>(
        &self,
        shape: impl Into<Shape>,
        values: Vec<T>,
    ) -> Result<Tensor<T>, TensorError> {
        let shape = shape.into();
        if shape.rank() == 0 || shape.has_zero_dim() {
            return Err(TensorError::EmptyShape { shape });
        }
        let expected = shape.num_elements();
        if values.len() != expected {
            return Err(TensorError::BufferSizeMismatch {
                shape,
                expected,
                actual: values.len(),
            });
        }
        self.reserve(expected * std::mem::size_of::<T>())?;
        Ok(Tensor::from_raw(values, shape, Arc::clone(&self.inner)))
    }

    /// Builds a tensor by copying a flat row-major slice.
    ///
    /// # Examples
    /// ```
    /// use tensor_arena::TensorPool;
    ///
    /// let pool = TensorPool::unbounded();
    /// // [[1, 2, 3], [4, 5, 6]]
    /// let t = pool.from_slice(vec![2, 3], &[1.0f32, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap();
    /// assert_eq!(t.get(&[1, 2]).unwrap(), 6.0);
    /// ```
    pub fn from_slice<T: Scalar>(
        &self,
        shape: impl Into<Shape>,
        values: &[T],
    ) -> Result<Tensor<T>, TensorError> {
        self.from_vec(shape, values.to_vec())
    }

    /// Checks the budget and claims `size_bytes` of accounting.
    fn reserve(&self, size_bytes: usize) -> Result<(), MemoryError> {
        let current = self.inner.live_bytes.load(Ordering::Acquire);
        let budget = self.inner.budget.as_bytes();

        if current.saturating_add(size_bytes) > budget {
            if let Ok(mut stats) = self.inner.stats.lock() {
                stats.record_oom();
            }
            return Err(MemoryError::OutOfMemory {
                requested_bytes: size_bytes,
                available_bytes: budget.saturating_sub(current),
                budget_bytes: budget,
            });
        }

        self.inner.live_bytes.fetch_add(size_bytes, Ordering::Release);

        if let Ok(mut stats) = self.inner.stats.lock() {
            stats.record_allocation(size_bytes);
            let new_total = self.inner.live_bytes.load(Ordering::Acquire);
            stats.update_peak(new_total);
        }
        Ok(())
    }

    /// Returns the number of bytes currently live (allocated, not dropped).
    pub fn live_bytes(&self) -> usize {
        self.inner.live_bytes.load(Ordering::Acquire)
    }

    /// Returns the number of bytes remaining before hitting the budget.
    pub fn available_bytes(&self) -> usize {
        self.inner
            .budget
            .as_bytes()
            .saturating_sub(self.live_bytes())
    }

    /// Returns the memory budget.
    pub fn budget(&self) -> MemoryBudget {
        self.inner.budget
    }

    /// Returns a snapshot of allocation statistics.
    pub fn stats(&self) -> AllocationStats {
        self.inner
            .stats
            .lock()
            .map(|s| s.clone())
            .unwrap_or_default()
    }
}

impl std::fmt::Debug for TensorPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TensorPool")
            .field("budget", &self.inner.budget)
            .field("live_bytes", &self.live_bytes())
            .finish()
    }
}
