use std::ops::{Add, AddAssign, Sub};

pub use kurbo::{Affine, Point, Rect};

use crate::foundation::error::{StrataError, StrataResult};

/// 2D point/size value used for node positions, sizes and logical coordinates.
///
/// Plain value semantics; [`Vector::plus`] is the one in-place operation and backs node movement.
#[derive(Clone, Copy, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Vector {
    /// Horizontal component.
    #[serde(default)]
    pub x: f64,
    /// Vertical component.
    #[serde(default)]
    pub y: f64,
}

impl Vector {
    /// Create a vector from its components.
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Translate in place by `other`'s components.
    pub fn plus(&mut self, other: Vector) -> &mut Self {
        self.x += other.x;
        self.y += other.y;
        self
    }

    /// Interpret as a point in surface space.
    pub fn to_point(self) -> Point {
        Point::new(self.x, self.y)
    }
}

impl Add for Vector {
    type Output = Vector;

    fn add(self, rhs: Vector) -> Vector {
        Vector::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl AddAssign for Vector {
    fn add_assign(&mut self, rhs: Vector) {
        self.plus(rhs);
    }
}

impl Sub for Vector {
    type Output = Vector;

    fn sub(self, rhs: Vector) -> Vector {
        Vector::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl From<Point> for Vector {
    fn from(p: Point) -> Self {
        Self::new(p.x, p.y)
    }
}

impl From<Vector> for Point {
    fn from(v: Vector) -> Self {
        v.to_point()
    }
}

impl From<kurbo::Vec2> for Vector {
    fn from(v: kurbo::Vec2) -> Self {
        Self::new(v.x, v.y)
    }
}

/// Surface dimensions in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Canvas {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Canvas {
    /// Create a validated canvas with both dimensions non-zero.
    pub fn new(width: u32, height: u32) -> StrataResult<Self> {
        if width == 0 || height == 0 {
            return Err(StrataError::validation(format!(
                "canvas must be non-empty, got {width}x{height}"
            )));
        }
        Ok(Self { width, height })
    }

    /// Whole-surface rectangle anchored at the origin.
    pub fn bounds(self) -> Rect {
        Rect::new(0.0, 0.0, f64::from(self.width), f64::from(self.height))
    }

    /// Number of bytes of a tightly packed RGBA8 buffer of this size.
    pub fn rgba8_len(self) -> usize {
        (self.width as usize)
            .saturating_mul(self.height as usize)
            .saturating_mul(4)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
