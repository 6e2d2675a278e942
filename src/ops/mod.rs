//! # Operation Dispatch Layer
//!
//! Tensor operations and the backends that run them.
//!
//! ## Submodules
//!
//! - [`cpu`] — Rayon-parallel kernels plus a sequential reference path
//! - [`dispatch`] — Runtime backend switching and unified operation interfaces
//!
//! ## Backend Selection
//!
//! Callers go through [`dispatch`]; the active [`Backend`](crate::backend::Backend)
//! decides which kernel runs. Shape checks happen here, once, in a
//! backend-agnostic place, so kernels can index without bounds worries.
//!
//! ## Notes
//!
//! - Operations that take `WithGrad` inputs return both forward values and
//!   backward closures
//! - Every backend must agree with `Reference` up to float summation order

pub mod cpu;
pub mod dispatch;

use briny::prelude::ValidationError;

use crate::error::{Error, Result};

/// Spatial hyper-parameters of a 2D convolution, each as `(height, width)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConvParams {
    /// Step between successive window placements.
    pub stride: (usize, usize),
    /// Implicit zeros added on each side of the input.
    pub padding: (usize, usize),
    /// Spacing between sampled positions inside one window.
    pub dilation: (usize, usize),
}

impl Default for ConvParams {
    fn default() -> Self {
        Self {
            stride: (1, 1),
            padding: (0, 0),
            dilation: (1, 1),
        }
    }
}

/// Output length of a convolution along one axis.
///
/// `floor((input + 2·padding − dilation·(kernel − 1) − 1) / stride) + 1`
///
/// Returns `None` if the dilated kernel does not fit in the padded input, if
/// `kernel`, `stride` or `dilation` is zero, or if the extents overflow `usize`.
///
/// ```rust
/// use dilation_primer::ops::conv_output_size;
/// assert_eq!(conv_output_size(5, 3, 1, 0, 1), Some(3));
/// assert_eq!(conv_output_size(5, 3, 1, 0, 2), Some(1));
/// assert_eq!(conv_output_size(5, 3, 1, 0, 3), None);
/// assert_eq!(conv_output_size(5, 3, 1, usize::MAX, 1), None);
/// ```
pub fn conv_output_size(
    input: usize,
    kernel: usize,
    stride: usize,
    padding: usize,
    dilation: usize,
) -> Option<usize> {
    if kernel == 0 || stride == 0 || dilation == 0 {
        return None;
    }
    let extent = dilated_extent(kernel, dilation)?;
    let padded = padded_len(input, padding)?;
    let span = padded.checked_sub(extent)?;
    Some(span / stride + 1)
}

/// `dilation·(kernel − 1) + 1`, the input span one window covers.
fn dilated_extent(kernel: usize, dilation: usize) -> Option<usize> {
    dilation.checked_mul(kernel.checked_sub(1)?)?.checked_add(1)
}

/// `input + 2·padding`
fn padded_len(input: usize, padding: usize) -> Option<usize> {
    padding.checked_mul(2)?.checked_add(input)
}

/// Fully resolved sizes of one `conv2d` call.
///
/// Built by [`ConvGeometry::resolve`], which is the only place shapes are
/// checked; kernels trust it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConvGeometry {
    pub batch: usize,
    pub in_channels: usize,
    pub in_h: usize,
    pub in_w: usize,
    pub out_channels: usize,
    pub kernel_h: usize,
    pub kernel_w: usize,
    pub out_h: usize,
    pub out_w: usize,
    pub params: ConvParams,
}

impl ConvGeometry {
    /// Checks `input (N, C, H, W)`, `weight (OC, C, KH, KW)` and optional
    /// `bias (OC)` against each other and computes the output size.
    ///
    /// # Errors
    /// - [`Error::Rank`] if input or weight is not 4-d
    /// - [`Error::ChannelMismatch`] if `C` differs between input and weight
    /// - [`Error::ParameterShape`] if the bias is not `(OC)`
    /// - [`Error::KernelTooLarge`] if the dilated kernel overruns the padded input;
    ///   extents past `usize::MAX` are reported saturated
    /// - [`Error::InvalidConfig`] if a stride or dilation is zero
    pub fn resolve(
        input: &[usize],
        weight: &[usize],
        bias: Option<&[usize]>,
        params: ConvParams,
    ) -> Result<Self> {
        let &[batch, in_channels, in_h, in_w] = input else {
            return Err(Error::Rank {
                op: "conv2d",
                expected: "4",
                actual: input.to_vec(),
            });
        };
        let &[out_channels, kernel_in, kernel_h, kernel_w] = weight else {
            return Err(Error::Rank {
                op: "conv2d weight",
                expected: "4",
                actual: weight.to_vec(),
            });
        };
        if kernel_in != in_channels {
            return Err(Error::ChannelMismatch {
                expected: kernel_in,
                actual: in_channels,
            });
        }
        if let Some(bias) = bias {
            if bias != [out_channels] {
                return Err(Error::ParameterShape {
                    name: "bias",
                    expected: vec![out_channels],
                    actual: bias.to_vec(),
                });
            }
        }
        let (sh, sw) = params.stride;
        let (dh, dw) = params.dilation;
        if sh == 0 || sw == 0 || dh == 0 || dw == 0 || kernel_h == 0 || kernel_w == 0 {
            return Err(Error::InvalidConfig(ValidationError));
        }

        let axis = |name: &'static str, len: usize, k: usize, s: usize, p: usize, d: usize| {
            conv_output_size(len, k, s, p, d).ok_or_else(|| Error::KernelTooLarge {
                axis: name,
                extent: dilated_extent(k, d).unwrap_or(usize::MAX),
                input: padded_len(len, p).unwrap_or(usize::MAX),
            })
        };
        let out_h = axis("height", in_h, kernel_h, sh, params.padding.0, dh)?;
        let out_w = axis("width", in_w, kernel_w, sw, params.padding.1, dw)?;

        Ok(Self {
            batch,
            in_channels,
            in_h,
            in_w,
            out_channels,
            kernel_h,
            kernel_w,
            out_h,
            out_w,
            params,
        })
    }

    /// `[N, OC, OH, OW]`
    pub fn output_shape(&self) -> [usize; 4] {
        [self.batch, self.out_channels, self.out_h, self.out_w]
    }

    /// Number of multiply-adds feeding one output element.
    pub fn fan_in(&self) -> usize {
        self.in_channels * self.kernel_h * self.kernel_w
    }
}
