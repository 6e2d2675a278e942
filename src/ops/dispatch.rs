//! Operation Dispatch Layer
//!
//! This module selects the correct backend at runtime for each operation,
//! based on the global [`Backend`].
//!
//! # Design Highlights
//! - **Checked once**: shapes are resolved into a [`ConvGeometry`] before any kernel runs
//! - **Minimal overhead**: a single `match` on the backend per call
//! - **Pinned backward**: a backward closure runs on the backend its forward pass used
//!
//! # Example
//! ```rust
//! use dilation_primer::ops::{dispatch, ConvParams};
//! use dilation_primer::tensors::{Tensor, WithGrad};
//!
//! let x = WithGrad::new(Tensor::new(vec![1, 1, 3, 3], vec![1.0f32; 9]));
//! let w = WithGrad::new(Tensor::new(vec![1, 1, 2, 2], vec![1.0f32; 4]));
//! let (out, back) = dispatch::conv2d(&x, &w, None, ConvParams::default()).unwrap();
//! assert_eq!(out.shape, vec![1, 1, 2, 2]);
//! let grads = back(&Tensor::new(vec![1, 1, 2, 2], vec![1.0; 4]));
//! assert_eq!(grads.weight.data, vec![4.0; 4]);
//! ```

use super::cpu::{self, ConvGrads};
use super::{ConvGeometry, ConvParams};
use crate::backend::{get_backend, Backend};
use crate::error::Result;
use crate::tensors::{Ten32, Tensor, WithGrad};

/// Gradients of a `conv2d` call as tensors.
#[derive(Debug, Clone, PartialEq)]
pub struct Conv2dGrads {
    /// `dL/d(input)`
    pub input: Ten32,
    /// `dL/d(weight)`
    pub weight: Ten32,
    /// `dL/d(bias)`, `None` if the call had no bias
    pub bias: Option<Ten32>,
}

/// Backward closure returned by [`conv2d`].
pub type Conv2dBackward = dyn Fn(&Ten32) -> Conv2dGrads + Send + Sync;

fn forward_kernel(backend: Backend) -> fn(&ConvGeometry, &[f32], &[f32], Option<&[f32]>) -> Vec<f32> {
    match backend {
        Backend::Cpu => cpu::conv2d_forward,
        Backend::Reference => cpu::conv2d_forward_reference,
    }
}

fn backward_kernel(backend: Backend) -> fn(&ConvGeometry, &[f32], &[f32], &[f32], bool) -> ConvGrads {
    match backend {
        Backend::Cpu => cpu::conv2d_backward,
        Backend::Reference => cpu::conv2d_backward_reference,
    }
}

fn run_forward(
    backend: Backend,
    input: &Ten32,
    weight: &Ten32,
    bias: Option<&Ten32>,
    params: ConvParams,
) -> Result<(ConvGeometry, Ten32)> {
    let geo = ConvGeometry::resolve(&input.shape, &weight.shape, bias.map(|b| b.shape()), params)?;
    tracing::debug!(?backend, input = ?input.shape, weight = ?weight.shape, ?params, "conv2d forward");

    let data = forward_kernel(backend)(&geo, &input.data, &weight.data, bias.map(|b| b.data.as_slice()));
    Ok((geo, Tensor::new(geo.output_shape(), data)))
}

/// Dispatches a forward-only 2D convolution.
///
/// # Returns
/// - Output tensor `(N, OC, OH, OW)`
///
/// # Errors
/// Any shape error from [`ConvGeometry::resolve`].
pub fn conv2d_forward(input: &Ten32, weight: &Ten32, bias: Option<&Ten32>, params: ConvParams) -> Result<Ten32> {
    run_forward(get_backend(), input, weight, bias, params).map(|(_, out)| out)
}

/// Dispatches a differentiable 2D convolution.
///
/// # Returns
/// - `Tensor`: Output tensor `(N, OC, OH, OW)`
/// - `Fn`: Closure mapping `dL/d(out)` to [`Conv2dGrads`]
///
/// The closure owns copies of the input and weight, so it outlives the borrows
/// passed in here.
///
/// # Errors
/// Any shape error from [`ConvGeometry::resolve`].
///
/// # Panics
/// The backward closure panics if `dL/d(out)` does not have the output's shape.
pub fn conv2d(
    input: &WithGrad<Ten32>,
    weight: &WithGrad<Ten32>,
    bias: Option<&WithGrad<Ten32>>,
    params: ConvParams,
) -> Result<(Ten32, Box<Conv2dBackward>)> {
    let backend = get_backend();
    let (geo, out) = run_forward(backend, &input.value, &weight.value, bias.map(|b| &b.value), params)?;

    let x = input.value.clone();
    let w = weight.value.clone();
    let with_bias = bias.is_some();

    let back: Box<Conv2dBackward> = Box::new(move |grad_out: &Ten32| {
        assert_eq!(grad_out.shape, geo.output_shape(), "conv2d gradient shape mismatch");
        tracing::debug!(?backend, "conv2d backward");
        let grads = backward_kernel(backend)(&geo, &x.data, &w.data, &grad_out.data, with_bias);
        Conv2dGrads {
            input: Tensor::new(x.shape.clone(), grads.input),
            weight: Tensor::new(w.shape.clone(), grads.weight),
            bias: grads.bias.map(|b| Tensor::new(vec![geo.out_channels], b)),
        }
    });

    Ok((out, back))
}
