//! The dilation walkthrough as a reusable, testable run.
//!
//! One seeded [`Generator`] draws an integer-valued input, then builds each
//! convolution in turn. The convolutions differ only in dilation (and output
//! channel count), so their output sizes show how spacing the kernel taps
//! shrinks the result:
//!
//! ```text
//! out = floor((in + 2·pad − dilation·(kernel − 1) − 1) / stride) + 1
//! 5×5, kernel 3, dilation 1  →  3×3
//! 5×5, kernel 3, dilation 2  →  1×1
//! ```

use crate::error::Result;
use crate::nn::{Conv2d, Conv2dConfig};
use crate::rng::Generator;
use crate::tensors::Ten32;

/// One convolution to apply to the demo input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DilationStep {
    pub out_channels: usize,
    pub dilation: usize,
}

/// Parameters of the walkthrough. `Default` reproduces the classic setup:
/// seed 42, a `(2, 5, 5)` input of integers in `[0, 5)`, and 3×3 kernels
/// with dilation 1 (two output channels) and 2 (one output channel).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DilationDemo {
    pub seed: u64,
    pub channels: usize,
    pub size: usize,
    pub low: i64,
    pub high: i64,
    pub kernel_size: usize,
    pub stride: usize,
    pub steps: Vec<DilationStep>,
}

impl Default for DilationDemo {
    fn default() -> Self {
        Self {
            seed: 42,
            channels: 2,
            size: 5,
            low: 0,
            high: 5,
            kernel_size: 3,
            stride: 1,
            steps: vec![
                DilationStep {
                    out_channels: 2,
                    dilation: 1,
                },
                DilationStep {
                    out_channels: 1,
                    dilation: 2,
                },
            ],
        }
    }
}

/// Result of one [`DilationStep`].
#[derive(Debug, Clone, PartialEq)]
pub struct DilationRun {
    pub step: DilationStep,
    pub output: Ten32,
}

/// Everything [`DilationDemo::run`] produced.
#[derive(Debug, Clone, PartialEq)]
pub struct DilationReport {
    pub input: Ten32,
    pub runs: Vec<DilationRun>,
}

impl DilationDemo {
    /// Configuration of the convolution for `step`.
    pub const fn conv_config(&self, step: DilationStep) -> Conv2dConfig {
        Conv2dConfig::new(self.channels, step.out_channels, self.kernel_size)
            .stride(self.stride)
            .dilation(step.dilation)
    }

    /// Seeds a generator, draws the input, then builds and applies each step's
    /// convolution in order.
    ///
    /// # Errors
    /// An invalid range, configuration or a kernel that does not fit the input.
    pub fn run(&self) -> Result<DilationReport> {
        let mut rng = Generator::manual_seed(self.seed);
        let input = rng.randint(self.low, self.high, [self.channels, self.size, self.size])?;
        tracing::info!(seed = self.seed, shape = ?input.shape, "drew demo input");

        let runs = self
            .steps
            .iter()
            .map(|&step| {
                let conv = Conv2d::new(self.conv_config(step), &mut rng)?;
                let output = conv.forward(&input)?;
                tracing::info!(dilation = step.dilation, shape = ?output.shape, "applied convolution");
                Ok(DilationRun { step, output })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(DilationReport { input, runs })
    }
}
