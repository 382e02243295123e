// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Generalized batched matrix multiplication.

use crate::KernelError;
use num_traits::AsPrimitive;
use std::any::TypeId;
use tensor_arena::{Scalar, Tensor, TensorPool};

/// Multiplies two tensors over their trailing two axes: `lhs` is
/// `[..., M, K]`, `rhs` is `[..., K, N]`, and the result is `[..., M, N]`.
///
/// Leading (batch) axes must be pairwise equal — there is no broadcasting.
/// The accumulation runs in the output element type `O`, which may be wider
/// than the input type `I` (e.g. `i8` inputs accumulated into `i32`). The
/// width of `O` is validated up front; see the error contract below.
///
/// # Errors
/// In order, before any allocation:
/// 1. [`KernelError::ShapeMismatch`] if the operand ranks differ;
/// 2. [`KernelError::ShapeMismatch`] if the contraction dimensions disagree
///    (`lhs.dims[last] != rhs.dims[last-1]`) or a batch axis differs;
/// 3. [`KernelError::NarrowOutputType`] if `O` is a different type from `I`
///    and too narrow to hold the contraction sum: a ≤ 16-bit output must be
///    wider than twice the input width, a wider output merely wider than
///    the input.
///
/// # Examples
/// ```
/// use nn_kernels::batched_dot;
/// use tensor_arena::TensorPool;
///
/// let pool = TensorPool::unbounded();
/// let a = pool.from_slice(vec![2, 3], &[1.0f32, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap();
/// let b = pool.from_slice(vec![3, 2], &[7.0f32, 8.0, 9.0, 10.0, 11.0, 12.0]).unwrap();
/// let c: tensor_arena::Tensor<f32> = batched_dot(&pool, &a, &b).unwrap();
/// assert_eq!(c.as_slice(), &[58.0, 64.0, 139.0, 154.0]);
/// ```
pub fn batched_dot<I, O>(
    pool: &TensorPool,
    lhs: &Tensor<I>,
    rhs: &Tensor<I>,
) -> Result<Tensor<O>, KernelError>
where
    I: Scalar + AsPrimitive<O>,
    O: Scalar,
{
    let lshape = lhs.shape();
    let rshape = rhs.shape();

    if lshape.rank() != rshape.rank() {
        return Err(KernelError::ShapeMismatch {
            op: "batched_dot",
            lhs: lshape.clone(),
            rhs: rshape.clone(),
        });
    }
    if !lshape.is_matmul_compatible(rshape) || lshape.batch_dims() != rshape.batch_dims() {
        return Err(KernelError::ShapeMismatch {
            op: "batched_dot",
            lhs: lshape.clone(),
            rhs: rshape.clone(),
        });
    }
    check_output_width::<I, O>("batched_dot")?;

    let ldims = lshape.dims();
    let rdims = rshape.dims();
    let rank = ldims.len();
    let m = ldims[rank - 2];
    let k = ldims[rank - 1];
    let n = rdims[rank - 1];
    let batch_count: usize = lshape.batch_dims().iter().product();

    let mut out_dims = lshape.batch_dims().to_vec();
    out_dims.push(m);
    out_dims.push(n);
    let mut out = pool.zeros::<O>(out_dims)?;

    let a = lhs.as_slice();
    let b = rhs.as_slice();
    let c = out.as_mut_slice();

    // One flat loop over every output cell instead of the nested
    // batch × row × col walk; (batch, row, col) fall out of div/mod
    // against the output strides, and the contraction reads straight
    // through both operands.
    let total = batch_count * m * n;
    for idx in 0..total {
        let col = idx % n;
        let row = (idx / n) % m;
        let batch = idx / (m * n);

        let a_base = batch * m * k + row * k;
        let b_base = batch * k * n;

        let mut acc = O::zero();
        for p in 0..k {
            acc += a[a_base + p].as_() * b[b_base + p * n + col].as_();
        }
        c[idx] = acc;
    }

    Ok(out)
}

/// Rejects accumulator types too narrow for the contraction sum.
///
/// Skipped entirely when input and output are the same type. Otherwise a
/// ≤ 16-bit output must exceed twice the input width (a 16-bit accumulator
/// overflows after a handful of 8-bit products); anything wider need only
/// exceed the input width.
fn check_output_width<I: Scalar, O: Scalar>(op: &'static str) -> Result<(), KernelError> {
    if TypeId::of::<I>() == TypeId::of::<O>() {
        return Ok(());
    }
    let wide_enough = if O::BITS <= 16 {
        O::BITS > 2 * I::BITS
    } else {
        O::BITS > I::BITS
    };
    if !wide_enough {
        return Err(KernelError::NarrowOutputType {
            op,
            input_bits: I::BITS,
            output_bits: O::BITS,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tensor_arena::Shape;

    #[test]
    fn test_dot_2x3_times_3x2() {
        // A = [[1, 2, 3], [4, 5, 6]]
        // B = [[7, 8], [9, 10], [11, 12]]
        // C = [[58, 64], [139, 154]]
        let pool = TensorPool::unbounded();
        let a = pool
            .from_slice(vec![2, 3], &[1.0f32, 2.0, 3.0, 4.0, 5.0, 6.0])
            .unwrap();
        let b = pool
            .from_slice(vec![3, 2], &[7.0f32, 8.0, 9.0, 10.0, 11.0, 12.0])
            .unwrap();

        let c: Tensor<f32> = batched_dot(&pool, &a, &b).unwrap();

        assert_eq!(c.shape(), &Shape::matrix(2, 2));
        assert_eq!(c.as_slice(), &[58.0, 64.0, 139.0, 154.0]);
    }

    #[test]
    fn test_dot_identity() {
        let pool = TensorPool::unbounded();
        let a = pool
            .from_slice(vec![2, 2], &[1.0f32, 2.0, 3.0, 4.0])
            .unwrap();
        let eye = pool
            .from_slice(vec![2, 2], &[1.0f32, 0.0, 0.0, 1.0])
            .unwrap();

        let c: Tensor<f32> = batched_dot(&pool, &a, &eye).unwrap();
        assert_eq!(c.as_slice(), &[1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_dot_batched_matches_per_batch() {
        let pool = TensorPool::unbounded();

        // Two stacked 2×2 matrices on each side.
        let a_flat = [1.0f32, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0];
        let b_flat = [1.0f32, 0.0, 0.0, 1.0, 2.0, 0.0, 0.0, 2.0];
        let a = pool.from_slice(vec![2, 2, 2], &a_flat).unwrap();
        let b = pool.from_slice(vec![2, 2, 2], &b_flat).unwrap();

        let c: Tensor<f32> = batched_dot(&pool, &a, &b).unwrap();
        assert_eq!(c.shape().dims(), &[2, 2, 2]);

        // Batch 0: A0 · I = A0. Batch 1: A1 · 2I = 2·A1.
        assert_eq!(&c.as_slice()[..4], &[1.0, 2.0, 3.0, 4.0]);
        assert_eq!(&c.as_slice()[4..], &[10.0, 12.0, 14.0, 16.0]);

        // Same result when each batch is multiplied independently.
        let a0 = pool.from_slice(vec![2, 2], &a_flat[..4]).unwrap();
        let b0 = pool.from_slice(vec![2, 2], &b_flat[..4]).unwrap();
        let c0: Tensor<f32> = batched_dot(&pool, &a0, &b0).unwrap();
        assert_eq!(c0.as_slice(), &c.as_slice()[..4]);
    }

    #[test]
    fn test_dot_i8_widened_to_i32() {
        let pool = TensorPool::unbounded();
        let a = pool.from_slice(vec![1, 3], &[100i8, 100, 100]).unwrap();
        let b = pool.from_slice(vec![3, 1], &[100i8, 100, 100]).unwrap();

        // 3 × 100·100 = 30000 overflows i8 but fits i32.
        let c: Tensor<i32> = batched_dot(&pool, &a, &b).unwrap();
        assert_eq!(c.as_slice(), &[30000]);
    }

    #[test]
    fn test_dot_narrow_output_rejected() {
        let pool = TensorPool::unbounded();
        let a = pool.from_slice(vec![2, 2], &[1i32, 2, 3, 4]).unwrap();
        let b = pool.from_slice(vec![2, 2], &[1i32, 2, 3, 4]).unwrap();

        // 32-bit input into a 16-bit accumulator.
        let result: Result<Tensor<i16>, _> = batched_dot(&pool, &a, &b);
        assert!(matches!(
            result,
            Err(KernelError::NarrowOutputType {
                input_bits: 32,
                output_bits: 16,
                ..
            })
        ));
    }

    #[test]
    fn test_dot_i8_to_i16_rejected() {
        // A 16-bit accumulator must exceed TWICE the input width; i16 does
        // not qualify for i8 inputs.
        let pool = TensorPool::unbounded();
        let a = pool.from_slice(vec![1, 2], &[1i8, 2]).unwrap();
        let b = pool.from_slice(vec![2, 1], &[3i8, 4]).unwrap();

        let result: Result<Tensor<i16>, _> = batched_dot(&pool, &a, &b);
        assert!(matches!(result, Err(KernelError::NarrowOutputType { .. })));
    }

    #[test]
    fn test_dot_same_type_skips_width_check() {
        // i32 → i32 is allowed even though it fails the "strictly wider" rule.
        let pool = TensorPool::unbounded();
        let a = pool.from_slice(vec![1, 2], &[2i32, 3]).unwrap();
        let b = pool.from_slice(vec![2, 1], &[4i32, 5]).unwrap();

        let c: Tensor<i32> = batched_dot(&pool, &a, &b).unwrap();
        assert_eq!(c.as_slice(), &[23]);
    }

    #[test]
    fn test_dot_rank_mismatch() {
        let pool = TensorPool::unbounded();
        let a = pool.zeros::<f32>(vec![2, 2, 2]).unwrap();
        let b = pool.zeros::<f32>(vec![2, 2]).unwrap();

        let before = pool.live_bytes();
        let result: Result<Tensor<f32>, _> = batched_dot(&pool, &a, &b);
        assert!(matches!(result, Err(KernelError::ShapeMismatch { .. })));
        assert_eq!(pool.live_bytes(), before);
    }

    #[test]
    fn test_dot_contraction_mismatch() {
        let pool = TensorPool::unbounded();
        let a = pool.zeros::<f32>(vec![2, 3]).unwrap();
        let b = pool.zeros::<f32>(vec![4, 2]).unwrap(); // 4 != 3

        let before = pool.live_bytes();
        let result: Result<Tensor<f32>, _> = batched_dot(&pool, &a, &b);
        assert!(matches!(result, Err(KernelError::ShapeMismatch { .. })));
        assert_eq!(pool.live_bytes(), before);
    }

    #[test]
    fn test_dot_batch_dim_mismatch() {
        // Equal-rank operands with unequal leading axes: no broadcasting.
        let pool = TensorPool::unbounded();
        let a = pool.zeros::<f32>(vec![2, 2, 2]).unwrap();
        let b = pool.zeros::<f32>(vec![3, 2, 2]).unwrap();

        let result: Result<Tensor<f32>, _> = batched_dot(&pool, &a, &b);
        assert!(matches!(result, Err(KernelError::ShapeMismatch { .. })));
    }

    #[test]
    fn test_narrow_output_allocates_nothing() {
        let pool = TensorPool::unbounded();
        let a = pool.from_slice(vec![1, 1], &[1i32]).unwrap();
        let b = pool.from_slice(vec![1, 1], &[1i32]).unwrap();

        let before = pool.stats().total_allocations;
        let _: Result<Tensor<i16>, _> = batched_dot(&pool, &a, &b);
        assert_eq!(pool.stats().total_allocations, before);
    }
}
