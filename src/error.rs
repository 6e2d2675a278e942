//! Error types shared by the tensor, generator and convolution layers.

use briny::prelude::ValidationError;
use thiserror::Error;

/// Everything that can go wrong in this crate.
///
/// Shape problems are caught before any arithmetic runs, so an `Err` never
/// leaves a half-written output behind.
#[derive(Debug, Error)]
pub enum Error {
    /// The element count does not match the product of the shape.
    #[error("shape {shape:?} is incompatible with {len} data elements")]
    ShapeData { shape: Vec<usize>, len: usize },

    /// An operation received a tensor of the wrong rank.
    #[error("{op} expects a {expected}-d input, got shape {actual:?}")]
    Rank {
        op: &'static str,
        expected: &'static str,
        actual: Vec<usize>,
    },

    /// Input channels do not match the kernel's input channels.
    #[error("expected {expected} input channels, got {actual}")]
    ChannelMismatch { expected: usize, actual: usize },

    /// An explicitly supplied parameter has the wrong shape.
    #[error("parameter `{name}` should have shape {expected:?}, got {actual:?}")]
    ParameterShape {
        name: &'static str,
        expected: Vec<usize>,
        actual: Vec<usize>,
    },

    /// The dilated kernel does not fit inside the padded input.
    #[error("dilated kernel extent {extent} exceeds padded input size {input} on the {axis} axis")]
    KernelTooLarge {
        axis: &'static str,
        extent: usize,
        input: usize,
    },

    /// A sampling range that is empty (`low >= high`) or not finite.
    #[error("cannot sample from [{low}, {high}): the range is empty or not finite")]
    EmptyRange { low: f64, high: f64 },

    /// A layer configuration failed validation.
    #[error("invalid layer configuration")]
    InvalidConfig(#[from] ValidationError),
}

/// Crate-wide result alias.
pub type Result<T> = core::result::Result<T, Error>;
