//! Core tensor data structures.
//!
//! # Core Tensor Utilities
//!
//! A tensor here is a shape plus a flat, row-major buffer. That is all the
//! convolution kernels need: they compute flat offsets themselves.
//!
//! It supports:
//! - Construction of N-dimensional tensors, checked (`try_new`) or asserting (`new`)
//! - Zero/constant fill and shape-preserving reshape
//! - `WithGrad<T>` wrappers pairing a value with its gradient
//! - The `tensor!` macro for nested literals
//! - A nested-bracket `Display` for printing
//!
//! ## Limitations
//! - Row-major only
//! - No broadcasting, slicing, or views
//!
//! ## Example
//!
//! ```rust
//! use dilation_primer::tensors::Tensor;
//! let t = Tensor::new(vec![2, 3], vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
//! assert_eq!(t.shape, vec![2, 3]);
//! assert_eq!(t.numel(), 6);
//! ```

use core::fmt;

use crate::error::{Error, Result};

/// Represents an N-dimensional tensor with a shape and flat row-major data.
///
/// - All elements must be the same type (`T`).
/// - `shape` defines the structure, e.g., `[2, 5, 5]` for two 5×5 planes.
/// - `data` holds the flattened content in row-major order.
#[derive(Debug, Clone, PartialEq)]
pub struct Tensor<T> {
    pub shape: Vec<usize>,
    pub data: Vec<T>,
}

/// The element type the convolution layer works in.
pub type Ten32 = Tensor<f32>;

impl<T> Tensor<T> {
    /// Creates a new tensor with the given shape and flat data.
    ///
    /// # Panics
    /// Panics if the number of elements in `data` does not match the shape product.
    /// Use [`Tensor::try_new`] for a checked constructor.
    pub fn new(shape: impl Into<Vec<usize>>, data: Vec<T>) -> Self {
        let shape = shape.into();
        assert_eq!(
            shape.iter().product::<usize>(),
            data.len(),
            "shape {:?} is incompatible with {} data elements",
            shape,
            data.len()
        );
        Self { shape, data }
    }

    /// Creates a new tensor, reporting a shape/data mismatch instead of panicking.
    ///
    /// # Errors
    /// Returns [`Error::ShapeData`] if `data.len()` is not the shape product.
    pub fn try_new(shape: impl Into<Vec<usize>>, data: Vec<T>) -> Result<Self> {
        let shape = shape.into();
        if shape.iter().product::<usize>() != data.len() {
            return Err(Error::ShapeData {
                len: data.len(),
                shape,
            });
        }
        Ok(Self { shape, data })
    }

    /// The dimensions of the tensor.
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Number of dimensions.
    pub fn ndim(&self) -> usize {
        self.shape.len()
    }

    /// Number of elements.
    pub fn numel(&self) -> usize {
        self.data.len()
    }

    /// Reinterprets the buffer under a new shape with the same element count.
    ///
    /// # Errors
    /// Returns [`Error::ShapeData`] if the element counts differ.
    pub fn reshape(self, shape: impl Into<Vec<usize>>) -> Result<Self> {
        Self::try_new(shape, self.data)
    }
}

impl<T: Clone> Tensor<T> {
    /// A tensor of `shape` with every element set to `value`.
    pub fn full(shape: impl Into<Vec<usize>>, value: T) -> Self {
        let shape = shape.into();
        let len: usize = shape.iter().product();
        Self {
            data: vec![value; len],
            shape,
        }
    }
}

impl<T: Clone + Default> Tensor<T> {
    /// A tensor of `shape` filled with `T::default()` (zero for floats).
    pub fn zeros(shape: impl Into<Vec<usize>>) -> Self {
        Self::full(shape, T::default())
    }

    /// Zeros with the same shape as `self`.
    pub fn zeros_like(&self) -> Self {
        Self::zeros(self.shape.clone())
    }
}

impl fmt::Display for Tensor<f32> {
    /// Prints as `tensor([[...], [...]])`, four decimals per element.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn write_level(
            f: &mut fmt::Formatter<'_>,
            shape: &[usize],
            data: &[f32],
            depth: usize,
        ) -> fmt::Result {
            let Some((&len, rest)) = shape.split_first() else {
                return write!(f, "{:.4}", data[0]);
            };
            let stride: usize = rest.iter().product();
            f.write_str("[")?;
            for i in 0..len {
                if i > 0 {
                    if rest.is_empty() {
                        f.write_str(", ")?;
                    } else {
                        // blank lines between planes, like a nested array printout
                        f.write_str(",")?;
                        for _ in 0..rest.len() {
                            f.write_str("\n")?;
                        }
                        write!(f, "{:indent$}", "", indent = 8 + depth)?;
                    }
                }
                write_level(f, rest, &data[i * stride..(i + 1) * stride], depth + 1)?;
            }
            f.write_str("]")
        }

        f.write_str("tensor(")?;
        if self.data.is_empty() && !self.shape.is_empty() {
            f.write_str("[]")?;
        } else {
            write_level(f, &self.shape, &self.data, 0)?;
        }
        f.write_str(")")
    }
}

/// A container for tracking gradients of values (used in autograd).
///
/// Typically used as `WithGrad<Tensor<f32>>`.
#[derive(Debug, Clone)]
pub struct WithGrad<T> {
    pub value: T,
    pub grad: T,
}

impl<T: Clone + Default> WithGrad<Tensor<T>> {
    /// Wraps a tensor with a zeroed gradient of the same shape.
    pub fn new(value: Tensor<T>) -> Self {
        let grad = value.zeros_like();
        Self { value, grad }
    }

    /// Resets the gradient to zero.
    pub fn zero_grad(&mut self) {
        self.grad = self.value.zeros_like();
    }
}

impl WithGrad<Ten32> {
    /// Adds `delta` into the stored gradient element-wise.
    ///
    /// # Panics
    /// Panics if shapes do not match.
    pub fn accumulate(&mut self, delta: &Ten32) {
        assert_eq!(self.grad.shape, delta.shape, "gradient shape mismatch");
        for (g, d) in self.grad.data.iter_mut().zip(&delta.data) {
            *g += *d;
        }
    }
}

/// Defines a tensor from nested literal arrays.
///
/// Supports arbitrary dimensionality as long as sublists are uniform in shape.
///
/// # Example
/// ```
/// use dilation_primer::tensor;
/// let t = tensor!([[1.0, 2.0], [3.0, 4.0]]);
/// assert_eq!(t.shape, vec![2, 2]);
/// ```
#[macro_export]
macro_rules! tensor {
    ($lit:literal) => {
        $crate::tensors::Tensor::new(Vec::<usize>::new(), vec![$lit])
    };

    ([ $( $inner:tt ),+ $(,)? ]) => {{
        let children = vec![ $( $crate::tensor!($inner) ),+ ];
        let first_shape = &children[0].shape;
        assert!(children.iter().all(|c| c.shape == *first_shape),
            "ragged tensor literal (rows have mismatched shapes)");
        let mut shape = vec![children.len()];
        shape.extend_from_slice(first_shape);
        let mut data = Vec::with_capacity(children.len() * children[0].data.len());
        for c in children { data.extend(c.data); }
        $crate::tensors::Tensor::new(shape, data)
    }};
}
