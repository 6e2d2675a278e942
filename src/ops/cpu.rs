//! Parallel CPU backend tensor operations
//!
//! # CPU Backend
//!
//! Kernels for 2D convolution, forward and backward. These are the default
//! when calling `ops::dispatch::conv2d`.
//!
//! ## Features
//!
//! - Parallel execution using [`rayon`](https://docs.rs/rayon), one task per
//!   output plane (forward), input plane or filter (backward)
//! - A sequential `*_reference` twin of every kernel, written as the plain
//!   textbook loop nest
//!
//! ## Layout
//!
//! All buffers are flat row-major:
//! - input `(N, C, H, W)`
//! - weight `(OC, C, KH, KW)`
//! - output `(N, OC, OH, OW)`
//!
//! Zero padding is implicit: taps that land outside the input are skipped.
//!
//! ## Panics
//!
//! Kernels assume the [`ConvGeometry`] was produced by
//! [`ConvGeometry::resolve`] for exactly these buffers. Passing anything else
//! panics on a slice index.

use rayon::prelude::*;

use super::ConvGeometry;

/// Gradients produced by a convolution backward pass.
#[derive(Debug, Clone, PartialEq)]
pub struct ConvGrads {
    /// `dL/d(input)`, shaped like the input.
    pub input: Vec<f32>,
    /// `dL/d(weight)`, shaped like the weight.
    pub weight: Vec<f32>,
    /// `dL/d(bias)`, present only when the forward pass had a bias.
    pub bias: Option<Vec<f32>>,
}

/// Maps an output coordinate and kernel tap to an input coordinate.
///
/// `None` means the tap falls into the zero padding.
#[inline]
fn tap(out: usize, k: usize, stride: usize, dilation: usize, pad: usize, len: usize) -> Option<usize> {
    (out * stride + k * dilation).checked_sub(pad).filter(|&i| i < len)
}

/// Accumulates one `(batch, out_channel)` output plane into `dst`.
fn forward_plane(geo: &ConvGeometry, input: &[f32], weight: &[f32], b: usize, o: usize, dst: &mut [f32]) {
    let (sh, sw) = geo.params.stride;
    let (ph, pw) = geo.params.padding;
    let (dh, dw) = geo.params.dilation;
    let in_plane = geo.in_h * geo.in_w;
    let k_plane = geo.kernel_h * geo.kernel_w;

    for c in 0..geo.in_channels {
        let x = &input[(b * geo.in_channels + c) * in_plane..][..in_plane];
        let k = &weight[(o * geo.in_channels + c) * k_plane..][..k_plane];

        for ky in 0..geo.kernel_h {
            for kx in 0..geo.kernel_w {
                let kv = k[ky * geo.kernel_w + kx];
                for oy in 0..geo.out_h {
                    let Some(iy) = tap(oy, ky, sh, dh, ph, geo.in_h) else {
                        continue;
                    };
                    let row = &x[iy * geo.in_w..][..geo.in_w];
                    let out_row = &mut dst[oy * geo.out_w..][..geo.out_w];
                    for (ox, acc) in out_row.iter_mut().enumerate() {
                        if let Some(ix) = tap(ox, kx, sw, dw, pw, geo.in_w) {
                            *acc += kv * row[ix];
                        }
                    }
                }
            }
        }
    }
}

/// Computes a 2D convolution, parallel over output planes.
///
/// # Returns
/// - Flat output of shape `geo.output_shape()`
///
/// # Example
/// ```rust
/// use dilation_primer::ops::{ConvGeometry, ConvParams, cpu};
///
/// let geo = ConvGeometry::resolve(&[1, 1, 3, 3], &[1, 1, 2, 2], None, ConvParams::default()).unwrap();
/// let input: Vec<f32> = (0..9).map(|v| v as f32).collect();
/// let out = cpu::conv2d_forward(&geo, &input, &[1.0; 4], None);
/// assert_eq!(out, vec![8.0, 12.0, 20.0, 24.0]);
/// ```
pub fn conv2d_forward(geo: &ConvGeometry, input: &[f32], weight: &[f32], bias: Option<&[f32]>) -> Vec<f32> {
    let plane = geo.out_h * geo.out_w;
    let mut out = vec![0.0f32; geo.batch * geo.out_channels * plane];
    if plane == 0 {
        return out;
    }

    out.par_chunks_mut(plane).enumerate().for_each(|(p, dst)| {
        let (b, o) = (p / geo.out_channels, p % geo.out_channels);
        forward_plane(geo, input, weight, b, o, dst);
        if let Some(bias) = bias {
            for v in dst.iter_mut() {
                *v += bias[o];
            }
        }
    });

    out
}

/// Sequential reference for [`conv2d_forward`].
///
/// Accumulates in the same `(c, ky, kx)` order, so results are bit-identical.
pub fn conv2d_forward_reference(
    geo: &ConvGeometry,
    input: &[f32],
    weight: &[f32],
    bias: Option<&[f32]>,
) -> Vec<f32> {
    let (sh, sw) = geo.params.stride;
    let (ph, pw) = geo.params.padding;
    let (dh, dw) = geo.params.dilation;
    let mut out = Vec::with_capacity(geo.batch * geo.out_channels * geo.out_h * geo.out_w);

    for b in 0..geo.batch {
        for o in 0..geo.out_channels {
            for oy in 0..geo.out_h {
                for ox in 0..geo.out_w {
                    let mut acc = 0.0f32;
                    for c in 0..geo.in_channels {
                        for ky in 0..geo.kernel_h {
                            for kx in 0..geo.kernel_w {
                                let (Some(iy), Some(ix)) = (
                                    tap(oy, ky, sh, dh, ph, geo.in_h),
                                    tap(ox, kx, sw, dw, pw, geo.in_w),
                                ) else {
                                    continue;
                                };
                                let xi = ((b * geo.in_channels + c) * geo.in_h + iy) * geo.in_w + ix;
                                let wi = ((o * geo.in_channels + c) * geo.kernel_h + ky) * geo.kernel_w + kx;
                                acc += weight[wi] * input[xi];
                            }
                        }
                    }
                    if let Some(bias) = bias {
                        acc += bias[o];
                    }
                    out.push(acc);
                }
            }
        }
    }

    out
}

/// Backward pass of [`conv2d_forward`].
///
/// # Returns
/// - Gradients for input, weight and (if `with_bias`) bias
///
/// # Optimizations
/// - Input gradient: parallel over `(batch, in_channel)` planes
/// - Weight gradient: parallel over filters
/// - Bias gradient: parallel over output channels
pub fn conv2d_backward(
    geo: &ConvGeometry,
    input: &[f32],
    weight: &[f32],
    grad_out: &[f32],
    with_bias: bool,
) -> ConvGrads {
    let (sh, sw) = geo.params.stride;
    let (ph, pw) = geo.params.padding;
    let (dh, dw) = geo.params.dilation;
    let in_plane = geo.in_h * geo.in_w;
    let out_plane = geo.out_h * geo.out_w;
    let k_plane = geo.kernel_h * geo.kernel_w;
    let filter = geo.in_channels * k_plane;

    let go_plane = |b: usize, o: usize| &grad_out[(b * geo.out_channels + o) * out_plane..][..out_plane];

    let mut grad_input = vec![0.0f32; geo.batch * geo.in_channels * in_plane];
    if in_plane > 0 {
        grad_input.par_chunks_mut(in_plane).enumerate().for_each(|(p, gi)| {
            let (b, c) = (p / geo.in_channels, p % geo.in_channels);
            for o in 0..geo.out_channels {
                let go = go_plane(b, o);
                let k = &weight[(o * geo.in_channels + c) * k_plane..][..k_plane];
                for ky in 0..geo.kernel_h {
                    for kx in 0..geo.kernel_w {
                        let kv = k[ky * geo.kernel_w + kx];
                        for oy in 0..geo.out_h {
                            let Some(iy) = tap(oy, ky, sh, dh, ph, geo.in_h) else {
                                continue;
                            };
                            for ox in 0..geo.out_w {
                                if let Some(ix) = tap(ox, kx, sw, dw, pw, geo.in_w) {
                                    gi[iy * geo.in_w + ix] += go[oy * geo.out_w + ox] * kv;
                                }
                            }
                        }
                    }
                }
            }
        });
    }

    let mut grad_weight = vec![0.0f32; geo.out_channels * filter];
    if filter > 0 {
        grad_weight.par_chunks_mut(filter).enumerate().for_each(|(o, gw)| {
            for b in 0..geo.batch {
                let go = go_plane(b, o);
                for c in 0..geo.in_channels {
                    let x = &input[(b * geo.in_channels + c) * in_plane..][..in_plane];
                    for ky in 0..geo.kernel_h {
                        for kx in 0..geo.kernel_w {
                            let mut acc = 0.0f32;
                            for oy in 0..geo.out_h {
                                let Some(iy) = tap(oy, ky, sh, dh, ph, geo.in_h) else {
                                    continue;
                                };
                                for ox in 0..geo.out_w {
                                    if let Some(ix) = tap(ox, kx, sw, dw, pw, geo.in_w) {
                                        acc += go[oy * geo.out_w + ox] * x[iy * geo.in_w + ix];
                                    }
                                }
                            }
                            gw[(c * geo.kernel_h + ky) * geo.kernel_w + kx] += acc;
                        }
                    }
                }
            }
        });
    }

    let grad_bias = with_bias.then(|| {
        (0..geo.out_channels)
            .into_par_iter()
            .map(|o| (0..geo.batch).map(|b| go_plane(b, o).iter().sum::<f32>()).sum::<f32>())
            .collect::<Vec<f32>>()
    });

    ConvGrads {
        input: grad_input,
        weight: grad_weight,
        bias: grad_bias,
    }
}

/// Sequential reference for [`conv2d_backward`]: one scatter loop over every
/// `(output element, tap)` pair.
pub fn conv2d_backward_reference(
    geo: &ConvGeometry,
    input: &[f32],
    weight: &[f32],
    grad_out: &[f32],
    with_bias: bool,
) -> ConvGrads {
    let (sh, sw) = geo.params.stride;
    let (ph, pw) = geo.params.padding;
    let (dh, dw) = geo.params.dilation;

    let mut grad_input = vec![0.0f32; input.len()];
    let mut grad_weight = vec![0.0f32; weight.len()];
    let mut grad_bias = vec![0.0f32; geo.out_channels];

    for b in 0..geo.batch {
        for o in 0..geo.out_channels {
            for oy in 0..geo.out_h {
                for ox in 0..geo.out_w {
                    let go = grad_out[((b * geo.out_channels + o) * geo.out_h + oy) * geo.out_w + ox];
                    grad_bias[o] += go;
                    for c in 0..geo.in_channels {
                        for ky in 0..geo.kernel_h {
                            for kx in 0..geo.kernel_w {
                                let (Some(iy), Some(ix)) = (
                                    tap(oy, ky, sh, dh, ph, geo.in_h),
                                    tap(ox, kx, sw, dw, pw, geo.in_w),
                                ) else {
                                    continue;
                                };
                                let xi = ((b * geo.in_channels + c) * geo.in_h + iy) * geo.in_w + ix;
                                let wi = ((o * geo.in_channels + c) * geo.kernel_h + ky) * geo.kernel_w + kx;
                                grad_input[xi] += go * weight[wi];
                                grad_weight[wi] += go * input[xi];
                            }
                        }
                    }
                }
            }
        }
    }

    ConvGrads {
        input: grad_input,
        weight: grad_weight,
        bias: with_bias.then_some(grad_bias),
    }
}
