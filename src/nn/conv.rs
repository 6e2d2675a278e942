use briny::prelude::*;

use crate::error::{Error, Result};
use crate::ops::dispatch::{self, Conv2dBackward, Conv2dGrads};
use crate::ops::{ConvGeometry, ConvParams};
use crate::rng::Generator;
use crate::tensors::{Ten32, WithGrad};

/// Hyper-parameters of a [`Conv2d`] layer.
///
/// Pairs are `(height, width)`. The builder methods set both axes at once;
/// assign the fields directly for asymmetric values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Conv2dConfig {
    pub in_channels: usize,
    pub out_channels: usize,
    pub kernel_size: (usize, usize),
    pub stride: (usize, usize),
    pub padding: (usize, usize),
    pub dilation: (usize, usize),
    /// Whether the layer learns an additive per-channel bias.
    pub bias: bool,
}

impl Conv2dConfig {
    /// A square `kernel`×`kernel` convolution with stride 1, no padding,
    /// dilation 1 and a bias.
    pub const fn new(in_channels: usize, out_channels: usize, kernel: usize) -> Self {
        Self {
            in_channels,
            out_channels,
            kernel_size: (kernel, kernel),
            stride: (1, 1),
            padding: (0, 0),
            dilation: (1, 1),
            bias: true,
        }
    }

    #[must_use]
    pub const fn stride(mut self, stride: usize) -> Self {
        self.stride = (stride, stride);
        self
    }

    #[must_use]
    pub const fn padding(mut self, padding: usize) -> Self {
        self.padding = (padding, padding);
        self
    }

    #[must_use]
    pub const fn dilation(mut self, dilation: usize) -> Self {
        self.dilation = (dilation, dilation);
        self
    }

    #[must_use]
    pub const fn bias(mut self, bias: bool) -> Self {
        self.bias = bias;
        self
    }

    /// The spatial part of the configuration, as the ops layer wants it.
    pub const fn params(&self) -> ConvParams {
        ConvParams {
            stride: self.stride,
            padding: self.padding,
            dilation: self.dilation,
        }
    }

    /// `(OC, IC, KH, KW)`
    pub fn weight_shape(&self) -> Vec<usize> {
        vec![
            self.out_channels,
            self.in_channels,
            self.kernel_size.0,
            self.kernel_size.1,
        ]
    }

    /// Inputs feeding each output element.
    pub const fn fan_in(&self) -> usize {
        self.in_channels * self.kernel_size.0 * self.kernel_size.1
    }
}

impl Validate for Conv2dConfig {
    fn validate(&self) -> core::result::Result<(), ValidationError> {
        let counts = [self.in_channels, self.out_channels];
        let pairs = [self.kernel_size, self.stride, self.dilation];
        if counts.contains(&0) || pairs.iter().any(|&(h, w)| h == 0 || w == 0) {
            return Err(ValidationError);
        }
        Ok(())
    }
}

/// A 2D convolution layer with learned kernel and optional bias.
///
/// Accepts unbatched `(C, H, W)` or batched `(N, C, H, W)` input and returns
/// the matching rank.
///
/// # Example
/// ```rust
/// use dilation_primer::nn::{Conv2d, Conv2dConfig};
/// use dilation_primer::rng::Generator;
///
/// let mut rng = Generator::manual_seed(42);
/// let x = rng.randint(0, 5, [2, 5, 5]).unwrap();
/// let conv = Conv2d::new(Conv2dConfig::new(2, 1, 3).dilation(2), &mut rng).unwrap();
/// assert_eq!(conv.forward(&x).unwrap().shape, vec![1, 1, 1]);
/// ```
#[derive(Debug, Clone)]
pub struct Conv2d {
    config: Conv2dConfig,
    weight: WithGrad<Ten32>,
    bias: Option<WithGrad<Ten32>>,
}

impl Conv2d {
    /// Builds a layer with randomly initialized parameters.
    ///
    /// Weight, then bias, are drawn from `U(-1/sqrt(fan_in), 1/sqrt(fan_in))`.
    ///
    /// # Errors
    /// [`Error::InvalidConfig`] if any count, kernel size, stride or dilation is zero.
    pub fn new(config: Conv2dConfig, rng: &mut Generator) -> Result<Self> {
        let config = TrustedData::new(config)?.into_inner();

        #[allow(clippy::cast_precision_loss)]
        let bound = 1.0 / (config.fan_in() as f32).sqrt();
        let weight = rng.uniform(-bound, bound, config.weight_shape())?;
        let bias = if config.bias {
            Some(rng.uniform(-bound, bound, [config.out_channels])?)
        } else {
            None
        };

        tracing::debug!(?config, bound, "initialized Conv2d");
        Ok(Self {
            config,
            weight: WithGrad::new(weight),
            bias: bias.map(WithGrad::new),
        })
    }

    /// Builds a layer from explicit parameters.
    ///
    /// # Errors
    /// - [`Error::InvalidConfig`] if the configuration is invalid
    /// - [`Error::ParameterShape`] if `weight` is not `(OC, IC, KH, KW)`, or
    ///   `bias` is not `(OC)` / does not match `config.bias`
    pub fn from_parts(config: Conv2dConfig, weight: Ten32, bias: Option<Ten32>) -> Result<Self> {
        let config = TrustedData::new(config)?.into_inner();

        let expected = config.weight_shape();
        if weight.shape != expected {
            return Err(Error::ParameterShape {
                name: "weight",
                expected,
                actual: weight.shape,
            });
        }
        let bias_shape = config.bias.then(|| vec![config.out_channels]);
        let actual_bias = bias.as_ref().map(|b| b.shape.clone());
        if bias_shape != actual_bias {
            return Err(Error::ParameterShape {
                name: "bias",
                expected: bias_shape.unwrap_or_default(),
                actual: actual_bias.unwrap_or_default(),
            });
        }

        Ok(Self {
            config,
            weight: WithGrad::new(weight),
            bias: bias.map(WithGrad::new),
        })
    }

    pub const fn config(&self) -> &Conv2dConfig {
        &self.config
    }

    /// The kernel, `(OC, IC, KH, KW)`, with its accumulated gradient.
    pub const fn weight(&self) -> &WithGrad<Ten32> {
        &self.weight
    }

    /// The bias, `(OC)`, with its accumulated gradient.
    pub const fn bias(&self) -> Option<&WithGrad<Ten32>> {
        self.bias.as_ref()
    }

    /// Shape that [`Conv2d::forward`] would return for `input_shape`.
    ///
    /// # Errors
    /// Same as [`Conv2d::forward`].
    pub fn output_shape(&self, input_shape: &[usize]) -> Result<Vec<usize>> {
        let (batched, unbatch) = batched_shape(input_shape)?;
        let bias_shape = self.bias.as_ref().map(|b| b.value.shape());
        let geo = ConvGeometry::resolve(&batched, &self.weight.value.shape, bias_shape, self.config.params())?;
        let out = geo.output_shape();
        Ok(if unbatch { out[1..].to_vec() } else { out.to_vec() })
    }

    /// Applies the convolution.
    ///
    /// # Errors
    /// - [`Error::Rank`] if `input` is neither 3-d nor 4-d
    /// - [`Error::ChannelMismatch`] if the channel axis is not `in_channels`
    /// - [`Error::KernelTooLarge`] if the dilated kernel overruns the padded input
    pub fn forward(&self, input: &Ten32) -> Result<Ten32> {
        let (batched, unbatch) = batched_shape(&input.shape)?;
        let input = Ten32::new(batched, input.data.clone());
        let out = dispatch::conv2d_forward(
            &input,
            &self.weight.value,
            self.bias.as_ref().map(|b| &b.value),
            self.config.params(),
        )?;
        if unbatch { drop_batch(out) } else { Ok(out) }
    }

    /// Applies the convolution and returns a closure for its gradients.
    ///
    /// The gradients the closure yields have the input's rank; feed them to
    /// [`Conv2d::accumulate`] to collect the parameter gradients.
    ///
    /// # Errors
    /// Same as [`Conv2d::forward`].
    pub fn forward_with_grad(&self, input: &WithGrad<Ten32>) -> Result<(Ten32, Box<Conv2dBackward>)> {
        let (batched, unbatch) = batched_shape(&input.value.shape)?;
        let input = WithGrad::new(Ten32::new(batched, input.value.data.clone()));
        let (out, back) = dispatch::conv2d(
            &input,
            &self.weight,
            self.bias.as_ref(),
            self.config.params(),
        )?;
        if !unbatch {
            return Ok((out, back));
        }

        let in_shape = input.value.shape[1..].to_vec();
        let unbatched_back: Box<Conv2dBackward> = Box::new(move |grad_out: &Ten32| {
            let mut shape = vec![1];
            shape.extend_from_slice(&grad_out.shape);
            let grad_out = Ten32::new(shape, grad_out.data.clone());
            let mut grads = back(&grad_out);
            grads.input = Ten32::new(in_shape.clone(), grads.input.data);
            grads
        });
        Ok((drop_batch(out)?, unbatched_back))
    }

    /// Adds parameter gradients from a backward pass into the layer.
    ///
    /// # Panics
    /// Panics if the gradients do not come from this layer's shapes.
    pub fn accumulate(&mut self, grads: &Conv2dGrads) {
        self.weight.accumulate(&grads.weight);
        if let (Some(bias), Some(grad)) = (self.bias.as_mut(), grads.bias.as_ref()) {
            bias.accumulate(grad);
        }
    }

    /// Resets the parameter gradients to zero.
    pub fn zero_grad(&mut self) {
        self.weight.zero_grad();
        if let Some(bias) = self.bias.as_mut() {
            bias.zero_grad();
        }
    }
}

/// Returns the 4-d shape for `shape` and whether a batch axis was added.
fn batched_shape(shape: &[usize]) -> Result<(Vec<usize>, bool)> {
    match shape.len() {
        3 => {
            let mut batched = Vec::with_capacity(4);
            batched.push(1);
            batched.extend_from_slice(shape);
            Ok((batched, true))
        }
        4 => Ok((shape.to_vec(), false)),
        _ => Err(Error::Rank {
            op: "Conv2d",
            expected: "3 or 4",
            actual: shape.to_vec(),
        }),
    }
}

fn drop_batch(out: Ten32) -> Result<Ten32> {
    let shape = out.shape[1..].to_vec();
    out.reshape(shape)
}
