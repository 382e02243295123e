// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Example: one convolution layer, forward and backward.
//!
//! Runs a valid convolution with a ReLU head, then computes all three
//! gradients, printing the pool accounting along the way.
//!
//! ```bash
//! cargo run -p nn-kernels --example conv_forward_backward
//! ```

use nn_kernels::{backward_biases, backward_inputs, backward_weights, convolve, Activation};
use tensor_arena::{MemoryBudget, TensorPool};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialise tracing.
    tracing_subscriber::fmt().with_env_filter("debug").init();

    let pool = TensorPool::new(MemoryBudget::from_mb(16));

    // 1 batch, 1 channel, 5×5 ramp input.
    let input_data: Vec<f32> = (0..25).map(|v| v as f32 / 25.0).collect();
    let input = pool.from_slice(vec![1, 1, 5, 5], &input_data)?;

    // Two 3×3 filters: a box blur and a horizontal edge detector.
    #[rustfmt::skip]
    let kernel = pool.from_slice(vec![2, 1, 3, 3], &[
        1.0 / 9.0, 1.0 / 9.0, 1.0 / 9.0,
        1.0 / 9.0, 1.0 / 9.0, 1.0 / 9.0,
        1.0 / 9.0, 1.0 / 9.0, 1.0 / 9.0,

        -1.0, -1.0, -1.0,
         0.0,  0.0,  0.0,
         1.0,  1.0,  1.0,
    ])?;
    let bias = pool.from_slice(vec![2], &[0.0f32, 0.05])?;

    // Forward pass.
    let mut out = convolve(&pool, &input, &kernel, &bias, &[1, 1])?;
    println!("conv output {:?}", out.shape().dims());
    Activation::Relu.forward(&mut out);

    // Backward pass with a unit upstream gradient.
    let dvalues = pool.from_vec(vec![1, 2, 3, 3], vec![1.0f32; 18])?;
    let db = backward_biases(&pool, &dvalues)?;
    let dw = backward_weights(&pool, &input, &dvalues, vec![2, 1, 3, 3], &[1, 1])?;
    let dx = backward_inputs(&pool, &dvalues, &kernel, vec![1, 1, 5, 5], &[1, 1])?;

    println!("bias gradient:   {:?}", db.as_slice());
    println!("weight gradient: {:?} elements", dw.num_elements());
    println!("input gradient:  {:?} elements", dx.num_elements());
    println!("{}", pool.stats().summary());

    Ok(())
}
