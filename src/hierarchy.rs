//! Ancestor-selected method calls through explicit composition.
//!
//! Three levels form a single-parent chain: [`Rectangle`] → [`Square`] →
//! [`Cube`]. Each level embeds its parent by value instead of inheriting from
//! it, so "call the version of `area` defined two levels up" becomes a named
//! path through the embedded fields:
//!
//! | call                              | resolves to                          |
//! |-----------------------------------|--------------------------------------|
//! | `cube.area()`                     | `Square::area` (no override of its own) |
//! | `cube.surface_area_from_square()` | `Square::area` → `Rectangle::area`   |
//! | `cube.surface_area_from_rect()`   | `Rectangle::area`, skipping `Square` |
//!
//! Levels that override `area` print a label line before computing, so the
//! console shows which implementations ran. The `*_to` variants write those
//! lines to any [`Write`] sink instead of stdout.
//!
//! ```rust
//! use dilation_primer::hierarchy::{Area, Cube, Rectangle};
//!
//! let cube = Cube::new(5u32);
//! assert_eq!(cube.surface_area_from_rect(), Rectangle::new(5, 5).area());
//! assert_eq!(cube.surface_area_from_square(), 25);
//! ```

use core::ops::Mul;
use std::io::{self, Write};

/// A level of the chain that can compute an area.
pub trait Area {
    /// Numeric result of [`Area::area`].
    type Output;

    /// Line printed before this level's own computation, if it overrides `area`.
    const LABEL: Option<&'static str>;

    /// Computes the area, writing [`Area::LABEL`] (and those of the levels it
    /// delegates to) to `out` first.
    fn area_to(&self, out: &mut dyn Write) -> Self::Output;

    /// [`Area::area_to`] on stdout.
    fn area(&self) -> Self::Output {
        self.area_to(&mut io::stdout().lock())
    }
}

/// Writes `label` as one line. A failed write is logged, not propagated.
fn announce(label: Option<&'static str>, out: &mut dyn Write) {
    if let Some(label) = label {
        tracing::trace!(label, "area");
        if let Err(err) = writeln!(out, "{label}") {
            tracing::warn!(%err, label, "could not print area label");
        }
    }
}

/// The root of the chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rectangle<T> {
    pub height: T,
    pub width: T,
}

impl<T> Rectangle<T> {
    pub const fn new(height: T, width: T) -> Self {
        Self { height, width }
    }
}

impl<T: Copy + Mul<Output = T>> Area for Rectangle<T> {
    type Output = T;
    const LABEL: Option<&'static str> = Some("Calculate from Rectangle!");

    fn area_to(&self, out: &mut dyn Write) -> T {
        announce(Self::LABEL, out);
        self.height * self.width
    }
}

/// A rectangle whose height and width are both `side`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Square<T> {
    rectangle: Rectangle<T>,
}

impl<T: Copy> Square<T> {
    /// Builds the parent level as `Rectangle::new(side, side)`.
    pub const fn new(side: T) -> Self {
        Self {
            rectangle: Rectangle::new(side, side),
        }
    }

    pub const fn side(&self) -> T {
        self.rectangle.height
    }
}

impl<T> Square<T> {
    /// The embedded parent level.
    pub const fn as_rectangle(&self) -> &Rectangle<T> {
        &self.rectangle
    }
}

impl<T: Copy + Mul<Output = T>> Area for Square<T> {
    type Output = T;
    const LABEL: Option<&'static str> = Some("Calculate from Square!");

    /// Overrides `Rectangle::area` and delegates to it.
    fn area_to(&self, out: &mut dyn Write) -> T {
        announce(Self::LABEL, out);
        self.rectangle.area_to(out)
    }
}

/// The derived-most level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cube<T> {
    square: Square<T>,
}

impl<T: Copy> Cube<T> {
    /// Builds the parent level as `Square::new(side)`.
    pub const fn new(side: T) -> Self {
        Self {
            square: Square::new(side),
        }
    }

    pub const fn side(&self) -> T {
        self.square.side()
    }
}

impl<T> Cube<T> {
    /// The immediate parent level.
    pub const fn as_square(&self) -> &Square<T> {
        &self.square
    }

    /// The grandparent level.
    pub const fn as_rectangle(&self) -> &Rectangle<T> {
        self.square.as_rectangle()
    }
}

impl<T: Copy + Mul<Output = T>> Cube<T> {
    /// Runs `Rectangle::area`, bypassing `Square`'s override.
    pub fn surface_area_from_rect(&self) -> T {
        self.surface_area_from_rect_to(&mut io::stdout().lock())
    }

    /// Runs `Square::area`, which in turn runs `Rectangle::area`.
    pub fn surface_area_from_square(&self) -> T {
        self.surface_area_from_square_to(&mut io::stdout().lock())
    }

    /// [`Cube::surface_area_from_rect`], with labels written to `out`.
    pub fn surface_area_from_rect_to(&self, out: &mut dyn Write) -> T {
        self.as_rectangle().area_to(out)
    }

    /// [`Cube::surface_area_from_square`], with labels written to `out`.
    pub fn surface_area_from_square_to(&self, out: &mut dyn Write) -> T {
        self.as_square().area_to(out)
    }
}

impl<T: Copy + Mul<Output = T>> Area for Cube<T> {
    type Output = T;
    const LABEL: Option<&'static str> = None;

    /// Not overridden: resolves to the immediate parent's `area`.
    fn area_to(&self, out: &mut dyn Write) -> T {
        announce(Self::LABEL, out);
        self.square.area_to(out)
    }
}
