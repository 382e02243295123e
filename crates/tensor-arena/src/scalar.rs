// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Numeric element types a tensor can hold.
//!
//! Kernels are generic over [`Scalar`] rather than dispatching on a runtime
//! dtype tag. The trait carries an explicit bit width so accumulator-width
//! checks can be performed per call instead of leaning on language-level
//! type introspection.

use num_traits::{One, Zero};
use std::fmt::Debug;
use std::ops::{AddAssign, Mul};

/// A numeric tensor element.
///
/// Implemented for `i8`, `i16`, `i32`, `i64`, `f32`, and `f64`. The
/// associated [`BITS`](Scalar::BITS) constant is what the dot-product
/// kernel consults when deciding whether a requested output type is wide
/// enough to hold the contraction sum without silent overflow.
pub trait Scalar:
    Copy
    + PartialOrd
    + Debug
    + Zero
    + One
    + AddAssign
    + Mul<Output = Self>
    + Send
    + Sync
    + 'static
{
    /// Width of the element in bits.
    const BITS: u32;

    /// Human-readable label, e.g. `"f32"`.
    const NAME: &'static str;
}

macro_rules! impl_scalar {
    ($($ty:ty => $name:literal),* $(,)?) => {
        $(
            impl Scalar for $ty {
                const BITS: u32 = (std::mem::size_of::<$ty>() * 8) as u32;
                const NAME: &'static str = $name;
            }
        )*
    };
}

impl_scalar! {
    i8  => "i8",
    i16 => "i16",
    i32 => "i32",
    i64 => "i64",
    f32 => "f32",
    f64 => "f64",
}
