//! Seedable random tensor generation.
//!
//! A [`Generator`] is the single source of randomness for a run: the demo
//! seeds one, draws its input from it, and hands the same generator to each
//! [`Conv2d`](crate::nn::Conv2d) it builds. Reusing one seed therefore
//! reproduces the whole run.
//!
//! ```rust
//! use dilation_primer::rng::Generator;
//!
//! let mut a = Generator::manual_seed(42);
//! let mut b = Generator::manual_seed(42);
//! let x = a.randint(0, 5, [2, 5, 5]).unwrap();
//! let y = b.randint(0, 5, [2, 5, 5]).unwrap();
//! assert_eq!(x, y);
//! ```

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::{Error, Result};
use crate::tensors::Ten32;

/// A seeded pseudo-random generator producing `f32` tensors.
#[derive(Debug, Clone)]
pub struct Generator {
    rng: StdRng,
    seed: u64,
}

impl Generator {
    /// Creates a generator whose whole output sequence is fixed by `seed`.
    pub fn manual_seed(seed: u64) -> Self {
        tracing::debug!(seed, "seeding generator");
        Self {
            rng: StdRng::seed_from_u64(seed),
            seed,
        }
    }

    /// The seed this generator was created with.
    pub fn initial_seed(&self) -> u64 {
        self.seed
    }

    /// Samples integers uniformly from `[low, high)` and stores them as `f32`.
    ///
    /// # Errors
    /// Returns [`Error::EmptyRange`] if `low >= high`.
    pub fn randint(&mut self, low: i64, high: i64, shape: impl Into<Vec<usize>>) -> Result<Ten32> {
        if low >= high {
            return Err(Error::EmptyRange {
                low: low as f64,
                high: high as f64,
            });
        }
        let shape = shape.into();
        let len: usize = shape.iter().product();
        let data = (0..len)
            .map(|_| self.rng.random_range(low..high) as f32)
            .collect();
        Ok(Ten32::new(shape, data))
    }

    /// Samples floats uniformly from `[low, high)`.
    ///
    /// # Errors
    /// Returns [`Error::EmptyRange`] if `low >= high`, or the range is not finite.
    pub fn uniform(&mut self, low: f32, high: f32, shape: impl Into<Vec<usize>>) -> Result<Ten32> {
        if !(low < high && (high - low).is_finite()) {
            return Err(Error::EmptyRange {
                low: f64::from(low),
                high: f64::from(high),
            });
        }
        let shape = shape.into();
        let len: usize = shape.iter().product();
        let data = (0..len).map(|_| self.rng.random_range(low..high)).collect();
        Ok(Ten32::new(shape, data))
    }
}
