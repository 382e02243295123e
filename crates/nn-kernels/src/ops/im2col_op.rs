// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! im2col / col2im transforms.
//!
//! `im2col` unrolls the sliding convolution windows of a rank-4 input into
//! the rows of a flat matrix, so a valid convolution reduces to one matrix
//! multiply. `col2im` is the adjoint scatter: it walks the same enumeration
//! order but accumulates into a zeroed tensor, which is what makes the
//! input-gradient pass correct when receptive fields overlap.

use super::validate_stride;
use crate::KernelError;
use tensor_arena::{Scalar, Shape, Tensor, TensorPool};

/// Computes the output spatial extent of a valid (unpadded) convolution.
///
/// Floor division: trailing rows/columns that do not fit a full window are
/// dropped.
pub(crate) fn conv_output_hw(
    in_h: usize,
    in_w: usize,
    kh: usize,
    kw: usize,
    sh: usize,
    sw: usize,
) -> (usize, usize) {
    ((in_h - kh) / sh + 1, (in_w - kw) / sw + 1)
}

/// Unrolls sliding windows of a `[batch, channels, height, width]` tensor
/// into a `[batch·out_h·out_w, channels·kh·kw]` matrix.
///
/// Row order is batch → out_h → out_w; column order is channel → kh → kw.
/// This is a pure gather — every matrix cell copies exactly one input cell.
///
/// # Errors
/// - [`KernelError::InvalidDimensions`] if the input is not rank 4;
/// - [`KernelError::WrongStride`] / [`KernelError::ZeroStride`] for a bad
///   stride argument;
/// - [`KernelError::ShapeMismatch`] if the window exceeds the input extent.
pub fn im2col<T: Scalar>(
    pool: &TensorPool,
    input: &Tensor<T>,
    kernel_hw: (usize, usize),
    stride: &[usize],
) -> Result<Tensor<T>, KernelError> {
    if input.rank() != 4 {
        return Err(KernelError::InvalidDimensions {
            op: "im2col",
            expected_rank: 4,
            actual_rank: input.rank(),
        });
    }
    let (sh, sw) = validate_stride(stride)?;

    let dims = input.shape().dims();
    let (batch, channels, in_h, in_w) = (dims[0], dims[1], dims[2], dims[3]);
    let (kh, kw) = kernel_hw;
    if kh > in_h || kw > in_w {
        return Err(KernelError::ShapeMismatch {
            op: "im2col",
            lhs: input.shape().clone(),
            rhs: Shape::matrix(kh, kw),
        });
    }

    let (out_h, out_w) = conv_output_hw(in_h, in_w, kh, kw, sh, sw);
    let cols = channels * kh * kw;
    let mut matrix = pool.zeros::<T>(vec![batch * out_h * out_w, cols])?;

    let src = input.as_slice();
    let dst = matrix.as_mut_slice();

    let mut row = 0;
    for b in 0..batch {
        for oh in 0..out_h {
            for ow in 0..out_w {
                let row_base = row * cols;
                let mut col = 0;
                for c in 0..channels {
                    let chan_base = (b * channels + c) * in_h * in_w;
                    for i in 0..kh {
                        let src_row = chan_base + (oh * sh + i) * in_w + ow * sw;
                        for j in 0..kw {
                            dst[row_base + col] = src[src_row + j];
                            col += 1;
                        }
                    }
                }
                row += 1;
            }
        }
    }

    Ok(matrix)
}

/// Scatters a column matrix back into a `[batch, channels, height, width]`
/// tensor, accumulating where windows overlap.
///
/// Uses the identical enumeration order as [`im2col`] but adds into a
/// zero-initialized output. With stride equal to the window size the
/// windows tile the input exactly and this inverts `im2col`; with smaller
/// strides the overlapped cells sum their contributions, which is the
/// required adjoint semantics for gradients.
pub fn col2im<T: Scalar>(
    pool: &TensorPool,
    matrix: &Tensor<T>,
    output_shape: impl Into<Shape>,
    kernel_hw: (usize, usize),
    stride: &[usize],
) -> Result<Tensor<T>, KernelError> {
    let output_shape = output_shape.into();
    if output_shape.rank() != 4 {
        return Err(KernelError::InvalidDimensions {
            op: "col2im",
            expected_rank: 4,
            actual_rank: output_shape.rank(),
        });
    }
    if matrix.rank() != 2 {
        return Err(KernelError::InvalidDimensions {
            op: "col2im",
            expected_rank: 2,
            actual_rank: matrix.rank(),
        });
    }
    let (sh, sw) = validate_stride(stride)?;

    let dims = output_shape.dims();
    let (batch, channels, in_h, in_w) = (dims[0], dims[1], dims[2], dims[3]);
    let (kh, kw) = kernel_hw;
    if kh > in_h || kw > in_w {
        return Err(KernelError::ShapeMismatch {
            op: "col2im",
            lhs: output_shape,
            rhs: Shape::matrix(kh, kw),
        });
    }

    let (out_h, out_w) = conv_output_hw(in_h, in_w, kh, kw, sh, sw);
    let cols = channels * kh * kw;
    let expected = Shape::matrix(batch * out_h * out_w, cols);
    if matrix.shape() != &expected {
        return Err(KernelError::ShapeMismatch {
            op: "col2im",
            lhs: matrix.shape().clone(),
            rhs: expected,
        });
    }

    let mut output = pool.zeros::<T>(output_shape)?;

    let src = matrix.as_slice();
    let dst = output.as_mut_slice();

    let mut row = 0;
    for b in 0..batch {
        for oh in 0..out_h {
            for ow in 0..out_w {
                let row_base = row * cols;
                let mut col = 0;
                for c in 0..channels {
                    let chan_base = (b * channels + c) * in_h * in_w;
                    for i in 0..kh {
                        let dst_row = chan_base + (oh * sh + i) * in_w + ow * sw;
                        for j in 0..kw {
                            dst[dst_row + j] += src[row_base + col];
                            col += 1;
                        }
                    }
                }
                row += 1;
            }
        }
    }

    Ok(output)
}
