// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Elementwise activation kernels: ReLU, LeakyReLU, Sigmoid, Softmax.
//!
//! Each variant has a forward transform and a gradient-combining backward
//! transform. The cached tensor the backward pass expects differs by
//! variant: ReLU and LeakyReLU want the PRE-activation input, Sigmoid and
//! Softmax want the forward OUTPUT. Mixing these up produces silently wrong
//! gradients, so the contract is spelled out on [`Activation::backward`].

use crate::KernelError;
use num_traits::Float;
use tensor_arena::{Scalar, Tensor, TensorPool};

/// An activation function, parametrized by element type.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Activation<F> {
    /// `x ↦ max(x, 0)`.
    Relu,
    /// `x ↦ x` for positive `x`, else `α·x`.
    LeakyRelu { alpha: F },
    /// `x ↦ 1 / (1 + e^-x)`.
    Sigmoid,
    /// `y_i = e^{x_i} / Σ_j e^{x_j}` per group along the trailing axis.
    ///
    /// Deliberately uses the raw formulation without max-subtraction
    /// stabilization, matching the reference numerics. Inputs much above
    /// ~88 (f32) overflow the exponential.
    Softmax,
}

impl<F: Scalar + Float> Activation<F> {
    /// Applies the activation in place.
    ///
    /// Mutates the referenced buffer; ownership is unchanged. Softmax
    /// normalizes each group of `shape[last]` consecutive elements, i.e.
    /// every row of the flattened leading dimensions.
    pub fn forward(&self, tensor: &mut Tensor<F>) {
        match *self {
            Activation::Relu => {
                for x in tensor.as_mut_slice() {
                    if *x < F::zero() {
                        *x = F::zero();
                    }
                }
            }
            Activation::LeakyRelu { alpha } => {
                for x in tensor.as_mut_slice() {
                    if *x < F::zero() {
                        *x = alpha * *x;
                    }
                }
            }
            Activation::Sigmoid => {
                for x in tensor.as_mut_slice() {
                    *x = F::one() / (F::one() + (-*x).exp());
                }
            }
            Activation::Softmax => {
                let last_dim = tensor.shape().dims()[tensor.rank() - 1];
                let data = tensor.as_mut_slice();
                for row in data.chunks_mut(last_dim) {
                    let mut sum = F::zero();
                    for x in row.iter_mut() {
                        *x = x.exp();
                        sum = sum + *x;
                    }
                    for x in row.iter_mut() {
                        *x = *x / sum;
                    }
                }
            }
        }
    }

    /// The non-mutating variant of [`forward`](Activation::forward):
    /// allocates a copy from the pool and activates that.
    pub fn forward_copied(
        &self,
        pool: &TensorPool,
        input: &Tensor<F>,
    ) -> Result<Tensor<F>, KernelError> {
        let mut out = pool.zeros::<F>(input.shape().clone())?;
        out.as_mut_slice().copy_from_slice(input.as_slice());
        self.forward(&mut out);
        Ok(out)
    }

    /// Combines an upstream gradient with this activation's derivative,
    /// overwriting `grad` in place. No allocation.
    ///
    /// The `cached` tensor is:
    /// - ReLU / LeakyReLU: the PRE-activation input;
    /// - Sigmoid / Softmax: the forward OUTPUT.
    ///
    /// Softmax applies the full per-row Jacobian
    /// `Σ_j grad_j · y_i · (δ_ij − y_j)`, not an elementwise scale.
    ///
    /// # Errors
    /// [`KernelError::ShapeMismatch`] if `grad` and `cached` shapes differ.
    pub fn backward(&self, grad: &mut Tensor<F>, cached: &Tensor<F>) -> Result<(), KernelError> {
        if grad.shape() != cached.shape() {
            return Err(KernelError::ShapeMismatch {
                op: "activation backward",
                lhs: grad.shape().clone(),
                rhs: cached.shape().clone(),
            });
        }

        match *self {
            Activation::Relu => {
                for (g, &x) in grad.as_mut_slice().iter_mut().zip(cached.as_slice()) {
                    if x <= F::zero() {
                        *g = F::zero();
                    }
                }
            }
            Activation::LeakyRelu { alpha } => {
                for (g, &x) in grad.as_mut_slice().iter_mut().zip(cached.as_slice()) {
                    if x <= F::zero() {
                        *g = alpha * *g;
                    }
                }
            }
            Activation::Sigmoid => {
                for (g, &y) in grad.as_mut_slice().iter_mut().zip(cached.as_slice()) {
                    *g = *g * y * (F::one() - y);
                }
            }
            Activation::Softmax => {
                let last_dim = cached.shape().dims()[cached.rank() - 1];
                let g = grad.as_mut_slice();
                let y = cached.as_slice();
                for (g_row, y_row) in g.chunks_mut(last_dim).zip(y.chunks(last_dim)) {
                    // Σ_j grad_j·y_i·(δ_ij − y_j) = y_i·(grad_i − Σ_j grad_j·y_j)
                    let mut dot = F::zero();
                    for (&gj, &yj) in g_row.iter().zip(y_row.iter()) {
                        dot = dot + gj * yj;
                    }
                    for (gi, &yi) in g_row.iter_mut().zip(y_row.iter()) {
                        *gi = yi * (*gi - dot);
                    }
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: &[f32], b: &[f32], tol: f32) -> bool {
        a.len() == b.len() && a.iter().zip(b).all(|(x, y)| (x - y).abs() < tol)
    }

    #[test]
    fn test_relu_forward() {
        let pool = TensorPool::unbounded();
        let mut t = pool
            .from_slice(vec![4], &[1.0f32, -2.0, -4.0, 5.0])
            .unwrap();

        Activation::Relu.forward(&mut t);
        assert_eq!(t.as_slice(), &[1.0, 0.0, 0.0, 5.0]);
    }

    #[test]
    fn test_relu_backward_masks_by_input() {
        // The mask comes from the PRE-activation input, not the output.
        let pool = TensorPool::unbounded();
        let input = pool
            .from_slice(vec![4], &[1.0f32, -2.0, -4.0, 5.0])
            .unwrap();
        let mut grad = pool
            .from_slice(vec![4], &[10.0f32, -20.0, -40.0, -50.0])
            .unwrap();

        Activation::Relu.backward(&mut grad, &input).unwrap();
        assert_eq!(grad.as_slice(), &[10.0, 0.0, 0.0, -50.0]);
    }

    #[test]
    fn test_leaky_relu() {
        let pool = TensorPool::unbounded();
        let act = Activation::LeakyRelu { alpha: 0.1f32 };

        let mut t = pool.from_slice(vec![3], &[2.0f32, -1.0, -10.0]).unwrap();
        act.forward(&mut t);
        assert!(approx_eq(t.as_slice(), &[2.0, -0.1, -1.0], 1e-6));

        let input = pool.from_slice(vec![3], &[2.0f32, -1.0, -10.0]).unwrap();
        let mut grad = pool.from_slice(vec![3], &[6.0f32, 6.0, 6.0]).unwrap();
        act.backward(&mut grad, &input).unwrap();
        assert!(approx_eq(grad.as_slice(), &[6.0, 0.6, 0.6], 1e-6));
    }

    #[test]
    fn test_sigmoid_forward() {
        let pool = TensorPool::unbounded();
        let mut t = pool.from_slice(vec![3], &[0.0f32, 2.0, -2.0]).unwrap();

        Activation::Sigmoid.forward(&mut t);
        assert!(approx_eq(t.as_slice(), &[0.5, 0.880797, 0.119203], 1e-6));
    }

    #[test]
    fn test_sigmoid_backward_uses_output() {
        // grad *= y·(1−y) where y is the forward OUTPUT.
        let pool = TensorPool::unbounded();
        let y = pool.from_slice(vec![2], &[0.5f32, 0.880797]).unwrap();
        let mut grad = pool.from_slice(vec![2], &[1.0f32, 1.0]).unwrap();

        Activation::Sigmoid.backward(&mut grad, &y).unwrap();
        assert!(approx_eq(grad.as_slice(), &[0.25, 0.104994], 1e-5));
    }

    #[test]
    fn test_softmax_rows_sum_to_one() {
        let pool = TensorPool::unbounded();
        let mut t = pool
            .from_slice(vec![2, 3], &[1.0f32, 2.0, 3.0, -1.0, 0.0, 1.0])
            .unwrap();

        Activation::Softmax.forward(&mut t);

        for row in t.as_slice().chunks(3) {
            let sum: f32 = row.iter().sum();
            assert!((sum - 1.0).abs() < 1e-6);
        }
        // Larger input → larger probability.
        assert!(t.as_slice()[0] < t.as_slice()[1]);
        assert!(t.as_slice()[1] < t.as_slice()[2]);
    }

    #[test]
    fn test_softmax_zero_row_is_uniform() {
        let pool = TensorPool::unbounded();
        let mut t = pool.zeros::<f32>(vec![1, 4]).unwrap();

        Activation::Softmax.forward(&mut t);
        assert!(approx_eq(t.as_slice(), &[0.25; 4], 1e-6));
    }

    #[test]
    fn test_softmax_backward_full_jacobian() {
        // y = softmax([0, 0]) = [0.5, 0.5]; J = [[0.25, -0.25], [-0.25, 0.25]].
        // J · [1, 0]ᵀ = [0.25, -0.25] — an elementwise scale would give
        // [0.25, 0] instead.
        let pool = TensorPool::unbounded();
        let y = pool.from_slice(vec![1, 2], &[0.5f32, 0.5]).unwrap();
        let mut grad = pool.from_slice(vec![1, 2], &[1.0f32, 0.0]).unwrap();

        Activation::Softmax.backward(&mut grad, &y).unwrap();
        assert!(approx_eq(grad.as_slice(), &[0.25, -0.25], 1e-6));
    }

    #[test]
    fn test_softmax_backward_rows_independent() {
        let pool = TensorPool::unbounded();
        let y = pool
            .from_slice(vec![2, 2], &[0.5f32, 0.5, 0.9, 0.1])
            .unwrap();
        let mut grad = pool
            .from_slice(vec![2, 2], &[1.0f32, 0.0, 0.0, 1.0])
            .unwrap();

        Activation::Softmax.backward(&mut grad, &y).unwrap();

        // Row 0 as above; row 1: dot = 0.1, grads y·(g − dot).
        assert!(approx_eq(&grad.as_slice()[..2], &[0.25, -0.25], 1e-6));
        assert!(approx_eq(&grad.as_slice()[2..], &[-0.09, 0.09], 1e-6));
    }

    #[test]
    fn test_forward_copied_leaves_input_untouched() {
        let pool = TensorPool::unbounded();
        let input = pool.from_slice(vec![2], &[-1.0f32, 3.0]).unwrap();

        let out = Activation::Relu.forward_copied(&pool, &input).unwrap();

        assert_eq!(input.as_slice(), &[-1.0, 3.0]);
        assert_eq!(out.as_slice(), &[0.0, 3.0]);
    }

    #[test]
    fn test_backward_shape_mismatch() {
        let pool = TensorPool::unbounded();
        let cached = pool.zeros::<f32>(vec![3]).unwrap();
        let mut grad = pool.zeros::<f32>(vec![4]).unwrap();

        let before = pool.live_bytes();
        let result = Activation::Relu.backward(&mut grad, &cached);
        assert!(matches!(result, Err(KernelError::ShapeMismatch { .. })));
        assert_eq!(pool.live_bytes(), before);
    }
}
