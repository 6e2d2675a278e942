//! Layers that own their parameters.
//!
//! Ops in [`crate::ops`] are stateless functions over tensors. A layer here
//! bundles a validated configuration with the `WithGrad` tensors it learns, and
//! decides how those tensors are initialized.

mod conv;

pub use self::conv::{Conv2d, Conv2dConfig};
