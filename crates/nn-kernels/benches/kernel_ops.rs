// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Benchmarks for the kernel operations.

use criterion::{criterion_group, criterion_main, BatchSize, Criterion};
use nn_kernels::{batched_dot, convolve, Activation};
use tensor_arena::{Tensor, TensorPool};

fn bench_batched_dot(c: &mut Criterion) {
    let pool = TensorPool::unbounded();
    let a = pool
        .from_vec(vec![8, 64, 64], vec![0.5f32; 8 * 64 * 64])
        .unwrap();
    let b = pool
        .from_vec(vec![8, 64, 64], vec![0.25f32; 8 * 64 * 64])
        .unwrap();

    c.bench_function("batched_dot 8x64x64", |bench| {
        bench.iter(|| {
            let out: Tensor<f32> = batched_dot(&pool, &a, &b).unwrap();
            out
        })
    });
}

fn bench_convolve(c: &mut Criterion) {
    let pool = TensorPool::unbounded();
    let input = pool
        .from_vec(vec![1, 3, 32, 32], vec![0.1f32; 3 * 32 * 32])
        .unwrap();
    let kernel = pool
        .from_vec(vec![8, 3, 3, 3], vec![0.02f32; 8 * 3 * 3 * 3])
        .unwrap();
    let bias = pool.from_vec(vec![8], vec![0.0f32; 8]).unwrap();

    c.bench_function("convolve 3x32x32 -> 8 filters", |bench| {
        bench.iter(|| convolve(&pool, &input, &kernel, &bias, &[1, 1]).unwrap())
    });
}

fn bench_softmax(c: &mut Criterion) {
    let pool = TensorPool::unbounded();
    let logits: Vec<f32> = (0..64 * 256).map(|v| ((v % 17) as f32) * 0.1).collect();

    c.bench_function("softmax 64x256", |bench| {
        bench.iter_batched(
            || pool.from_slice(vec![64, 256], &logits).unwrap(),
            |mut t| {
                Activation::Softmax.forward(&mut t);
                t
            },
            BatchSize::SmallInput,
        )
    });
}

criterion_group!(benches, bench_batched_dot, bench_convolve, bench_softmax);
criterion_main!(benches);
