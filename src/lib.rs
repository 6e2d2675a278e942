//! dilation_primer: two small lessons, written as a library.
//!
//! # Lessons
//!
//! - **Ancestor delegation** ([`hierarchy`]): a three-level chain where the
//!   derived-most level explicitly picks which ancestor's `area` to run.
//! - **Dilated convolution** ([`demo`]): the same input pushed through two
//!   2D convolutions that differ only in the spacing between kernel taps.
//!
//! The convolution lesson sits on a minimal tensor engine:
//!
//! - [`tensors`] — Row-major tensors, gradient wrappers and the `tensor!` macro.
//! - [`rng`] — A seedable generator for reproducible inputs and weights.
//! - [`ops`] — Shape-checked `conv2d` with stride, padding and dilation, plus
//!   its backward pass.
//! - [`backend`] — Runtime choice between the parallel and reference kernels.
//! - [`nn`] — The `Conv2d` layer owning its kernel and bias.
//! - [`error`] — The crate's error type.
//!
//! # Example
//!
//! ```rust
//! use dilation_primer::demo::DilationDemo;
//!
//! let report = DilationDemo::default().run().unwrap();
//! assert_eq!(report.input.shape, vec![2, 5, 5]);
//! assert_eq!(report.runs[0].output.shape, vec![2, 3, 3]);
//! assert_eq!(report.runs[1].output.shape, vec![1, 1, 1]);
//! ```

pub mod backend;
pub mod demo;
pub mod error;
pub mod hierarchy;
pub mod nn;
pub mod ops;
pub mod rng;
pub mod tensors;

pub use error::{Error, Result};
