// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Valid (unpadded) convolution: forward pass and the three gradient passes.
//!
//! The forward pass reduces convolution to one matrix multiply via
//! [`im2col`]: unroll the input windows, reshape the kernel to a
//! `[channels·kh·kw, filters]` matrix, multiply, then scatter the product
//! into `[batch, filters, out_h, out_w]` with the bias folded in. The
//! backward passes retrace that data movement exactly — the weight gradient
//! re-gathers the same column matrix, and the input gradient pushes the
//! column-space gradient back through [`col2im`]'s accumulating scatter.

use super::im2col_op::{col2im, conv_output_hw, im2col};
use super::validate_stride;
use crate::{batched_dot, KernelError};
use num_traits::{AsPrimitive, Float};
use tensor_arena::{Scalar, Shape, Tensor, TensorPool};

/// Convolves a `[batch, channels, h, w]` input with a
/// `[filters, channels, kh, kw]` kernel and a `[filters]` bias.
///
/// Valid convolution only: no padding, output extent
/// `(h - kh) / stride_h + 1` by the analogous width, floor division.
/// Returns a freshly allocated `[batch, filters, out_h, out_w]` tensor
/// owned by the caller; every intermediate is released before return.
///
/// # Errors
/// In order, before any allocation: kernel rank exceeding input rank,
/// non-rank-4 operands, channel-count mismatch, kernel height then width
/// exceeding the input, bias length differing from the filter count
/// (all [`KernelError::ShapeMismatch`] / [`KernelError::InvalidDimensions`]),
/// then [`KernelError::WrongStride`] / [`KernelError::ZeroStride`].
pub fn convolve<F>(
    pool: &TensorPool,
    input: &Tensor<F>,
    kernel: &Tensor<F>,
    bias: &Tensor<F>,
    stride: &[usize],
) -> Result<Tensor<F>, KernelError>
where
    F: Scalar + Float + AsPrimitive<F>,
{
    if kernel.rank() > input.rank() {
        return Err(KernelError::ShapeMismatch {
            op: "convolve",
            lhs: input.shape().clone(),
            rhs: kernel.shape().clone(),
        });
    }
    check_rank4("convolve", input.shape())?;
    check_rank4("convolve", kernel.shape())?;

    let idims = input.shape().dims();
    let kdims = kernel.shape().dims();
    let (batch, channels, in_h, in_w) = (idims[0], idims[1], idims[2], idims[3]);
    let (filters, kh, kw) = (kdims[0], kdims[2], kdims[3]);

    if kdims[1] != channels {
        return Err(KernelError::ShapeMismatch {
            op: "convolve (channels)",
            lhs: input.shape().clone(),
            rhs: kernel.shape().clone(),
        });
    }
    if kh > in_h {
        return Err(KernelError::ShapeMismatch {
            op: "convolve (kernel height)",
            lhs: input.shape().clone(),
            rhs: kernel.shape().clone(),
        });
    }
    if kw > in_w {
        return Err(KernelError::ShapeMismatch {
            op: "convolve (kernel width)",
            lhs: input.shape().clone(),
            rhs: kernel.shape().clone(),
        });
    }
    if bias.rank() != 1 || bias.num_elements() != filters {
        return Err(KernelError::ShapeMismatch {
            op: "convolve (bias)",
            lhs: bias.shape().clone(),
            rhs: Shape::vector(filters),
        });
    }
    let (sh, sw) = validate_stride(stride)?;

    let (out_h, out_w) = conv_output_hw(in_h, in_w, kh, kw, sh, sw);
    tracing::debug!(
        input = %input.shape(),
        kernel = %kernel.shape(),
        out_h,
        out_w,
        "convolve forward"
    );

    // (a) Unroll windows: [batch·out_h·out_w, channels·kh·kw].
    let columns = im2col(pool, input, (kh, kw), stride)?;

    // (b) Kernel as a [channels·kh·kw, filters] matrix. The flat kernel is
    // filter-major, so this is a genuine transpose, not a reshape.
    let patch = channels * kh * kw;
    let mut kmat = pool.zeros::<F>(vec![patch, filters])?;
    {
        let src = kernel.as_slice();
        let dst = kmat.as_mut_slice();
        for f in 0..filters {
            for p in 0..patch {
                dst[p * filters + f] = src[f * patch + p];
            }
        }
    }

    // (c) One multiply: [batch·out_h·out_w, filters].
    let product: Tensor<F> = batched_dot(pool, &columns, &kmat)?;
    drop(columns);
    drop(kmat);

    // (d) Scatter into [batch, filters, out_h, out_w], folding in the bias.
    let mut output = pool.zeros::<F>(vec![batch, filters, out_h, out_w])?;
    {
        let src = product.as_slice();
        let b_slice = bias.as_slice();
        let dst = output.as_mut_slice();
        let spatial = out_h * out_w;
        for b in 0..batch {
            for s in 0..spatial {
                let row = b * spatial + s;
                for f in 0..filters {
                    dst[(b * filters + f) * spatial + s] = src[row * filters + f] + b_slice[f];
                }
            }
        }
    }

    Ok(output)
}

/// Gradient of the loss with respect to the bias vector.
///
/// Sums the upstream gradient `[batch, filters, out_h, out_w]` over batch
/// and both spatial axes, yielding `[filters]`.
pub fn backward_biases<F>(pool: &TensorPool, dvalues: &Tensor<F>) -> Result<Tensor<F>, KernelError>
where
    F: Scalar + Float,
{
    check_rank4("backward_biases", dvalues.shape())?;
    let dims = dvalues.shape().dims();
    let (batch, filters, spatial) = (dims[0], dims[1], dims[2] * dims[3]);

    let mut grad = pool.zeros::<F>(vec![filters])?;
    let src = dvalues.as_slice();
    let dst = grad.as_mut_slice();

    for b in 0..batch {
        for f in 0..filters {
            let base = (b * filters + f) * spatial;
            for s in 0..spatial {
                dst[f] += src[base + s];
            }
        }
    }
    Ok(grad)
}

/// Gradient of the loss with respect to the kernel weights, averaged over
/// the batch.
///
/// Recomputes the forward column matrix from `input`, remaps `dvalues` to
/// `[filters, batch·out_h·out_w]`, multiplies, divides by the batch size,
/// and reshapes to `kernel_shape`.
pub fn backward_weights<F>(
    pool: &TensorPool,
    input: &Tensor<F>,
    dvalues: &Tensor<F>,
    kernel_shape: impl Into<Shape>,
    stride: &[usize],
) -> Result<Tensor<F>, KernelError>
where
    F: Scalar + Float + AsPrimitive<F>,
{
    let kernel_shape = kernel_shape.into();
    check_rank4("backward_weights", input.shape())?;
    check_rank4("backward_weights", dvalues.shape())?;
    check_rank4("backward_weights", &kernel_shape)?;
    let (sh, sw) = validate_stride(stride)?;

    let idims = input.shape().dims();
    let kdims = kernel_shape.dims();
    let (batch, channels, in_h, in_w) = (idims[0], idims[1], idims[2], idims[3]);
    let (filters, kh, kw) = (kdims[0], kdims[2], kdims[3]);

    if kdims[1] != channels {
        return Err(KernelError::ShapeMismatch {
            op: "backward_weights (channels)",
            lhs: input.shape().clone(),
            rhs: kernel_shape,
        });
    }
    if kh > in_h {
        return Err(KernelError::ShapeMismatch {
            op: "backward_weights (kernel height)",
            lhs: input.shape().clone(),
            rhs: kernel_shape,
        });
    }
    if kw > in_w {
        return Err(KernelError::ShapeMismatch {
            op: "backward_weights (kernel width)",
            lhs: input.shape().clone(),
            rhs: kernel_shape,
        });
    }

    let (out_h, out_w) = conv_output_hw(in_h, in_w, kh, kw, sh, sw);
    let expected = Shape::new(vec![batch, filters, out_h, out_w]);
    if dvalues.shape() != &expected {
        return Err(KernelError::ShapeMismatch {
            op: "backward_weights (dvalues)",
            lhs: dvalues.shape().clone(),
            rhs: expected,
        });
    }
    tracing::debug!(input = %input.shape(), kernel = %kernel_shape, "convolve backward: weights");

    let columns = im2col(pool, input, (kh, kw), stride)?;

    // dvalues [b, f, oh, ow] → [filters, batch·out_h·out_w]: explicit
    // batch/spatial remap, filter-major rows.
    let spatial = out_h * out_w;
    let total = batch * spatial;
    let mut dmat = pool.zeros::<F>(vec![filters, total])?;
    {
        let src = dvalues.as_slice();
        let dst = dmat.as_mut_slice();
        for b in 0..batch {
            for f in 0..filters {
                let base = (b * filters + f) * spatial;
                for s in 0..spatial {
                    dst[f * total + b * spatial + s] = src[base + s];
                }
            }
        }
    }

    // [filters, batch·oh·ow] × [batch·oh·ow, channels·kh·kw].
    let product: Tensor<F> = batched_dot(pool, &dmat, &columns)?;
    drop(columns);
    drop(dmat);

    // Mean over the batch, laid back out in the kernel's shape. The
    // divisor is built by repeated addition so the conversion cannot fail.
    let mut batch_f = F::zero();
    for _ in 0..batch {
        batch_f += F::one();
    }
    let inv_batch = F::one() / batch_f;
    let mut dw = pool.zeros::<F>(kernel_shape)?;
    for (d, &s) in dw.as_mut_slice().iter_mut().zip(product.as_slice()) {
        *d = s * inv_batch;
    }
    Ok(dw)
}

/// Gradient of the loss with respect to the convolution input.
///
/// Maps `dvalues` into column space (`[batch·out_h·out_w, filters]` times
/// the kernel flattened to `[filters, channels·kh·kw]`), then scatter-adds
/// the column gradient back onto `input_shape` via [`col2im`]. Overlapping
/// receptive fields accumulate, as gradient semantics require.
pub fn backward_inputs<F>(
    pool: &TensorPool,
    dvalues: &Tensor<F>,
    kernel: &Tensor<F>,
    input_shape: impl Into<Shape>,
    stride: &[usize],
) -> Result<Tensor<F>, KernelError>
where
    F: Scalar + Float + AsPrimitive<F>,
{
    let input_shape = input_shape.into();
    check_rank4("backward_inputs", dvalues.shape())?;
    check_rank4("backward_inputs", kernel.shape())?;
    check_rank4("backward_inputs", &input_shape)?;
    let (sh, sw) = validate_stride(stride)?;

    let idims = input_shape.dims();
    let kdims = kernel.shape().dims();
    let (batch, channels, in_h, in_w) = (idims[0], idims[1], idims[2], idims[3]);
    let (filters, kh, kw) = (kdims[0], kdims[2], kdims[3]);

    if kdims[1] != channels {
        return Err(KernelError::ShapeMismatch {
            op: "backward_inputs (channels)",
            lhs: input_shape,
            rhs: kernel.shape().clone(),
        });
    }
    if kh > in_h {
        return Err(KernelError::ShapeMismatch {
            op: "backward_inputs (kernel height)",
            lhs: input_shape,
            rhs: kernel.shape().clone(),
        });
    }
    if kw > in_w {
        return Err(KernelError::ShapeMismatch {
            op: "backward_inputs (kernel width)",
            lhs: input_shape,
            rhs: kernel.shape().clone(),
        });
    }

    let (out_h, out_w) = conv_output_hw(in_h, in_w, kh, kw, sh, sw);
    let expected = Shape::new(vec![batch, filters, out_h, out_w]);
    if dvalues.shape() != &expected {
        return Err(KernelError::ShapeMismatch {
            op: "backward_inputs (dvalues)",
            lhs: dvalues.shape().clone(),
            rhs: expected,
        });
    }
    tracing::debug!(dvalues = %dvalues.shape(), kernel = %kernel.shape(), "convolve backward: inputs");

    // dvalues [b, f, oh, ow] → [batch·out_h·out_w, filters].
    let spatial = out_h * out_w;
    let mut dmat = pool.zeros::<F>(vec![batch * spatial, filters])?;
    {
        let src = dvalues.as_slice();
        let dst = dmat.as_mut_slice();
        for b in 0..batch {
            for f in 0..filters {
                let base = (b * filters + f) * spatial;
                for s in 0..spatial {
                    dst[(b * spatial + s) * filters + f] = src[base + s];
                }
            }
        }
    }

    // The flat kernel buffer is already filter-major, so the
    // [filters, channels·kh·kw] matrix is a straight copy.
    let patch = channels * kh * kw;
    let mut kmat = pool.zeros::<F>(vec![filters, patch])?;
    kmat.as_mut_slice().copy_from_slice(kernel.as_slice());

    let product: Tensor<F> = batched_dot(pool, &dmat, &kmat)?;
    drop(dmat);
    drop(kmat);

    col2im(pool, &product, input_shape, (kh, kw), stride)
}

/// Shared rank-4 precondition.
fn check_rank4(op: &'static str, shape: &Shape) -> Result<(), KernelError> {
    if shape.rank() != 4 {
        return Err(KernelError::InvalidDimensions {
            op,
            expected_rank: 4,
            actual_rank: shape.rank(),
        });
    }
    Ok(())
}
