use serde::{Deserialize, Serialize};
use std::ops::{Add, AddAssign, Div, Mul, Neg, Sub};

/// Squared length below which a vector is treated as having no direction.
pub const DEGENERATE_LENGTH_SQ: f32 = 1e-12;

/// A 2D vector in grid space (one unit == one field cell).
#[derive(Debug, Copy, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };
    pub const X: Vec2 = Vec2 { x: 1.0, y: 0.0 };

    #[inline(always)]
    pub const fn new(x: f32, y: f32) -> Self {
        Vec2 { x, y }
    }

    #[inline(always)]
    pub fn length_squared(self) -> f32 {
        self.x * self.x + self.y * self.y
    }

    #[inline(always)]
    pub fn length(self) -> f32 {
        self.length_squared().sqrt()
    }

    /// Returns the unit vector, or `None` when the length is too small to carry a direction.
    #[inline(always)]
    pub fn try_normalize(self) -> Option<Vec2> {
        let len_sq = self.length_squared();
        if len_sq > DEGENERATE_LENGTH_SQ && len_sq.is_finite() {
            Some(self * (1.0 / len_sq.sqrt()))
        } else {
            None
        }
    }

    /// Normalizes the vector, falling back to `fallback` for near-zero input.
    #[inline(always)]
    pub fn normalize_or(self, fallback: Vec2) -> Vec2 {
        self.try_normalize().unwrap_or(fallback)
    }

    /// Rotates counter-clockwise by `angle_rad`.
    #[inline(always)]
    pub fn rotate(self, angle_rad: f32) -> Vec2 {
        let (sin, cos) = angle_rad.sin_cos();
        Vec2::new(self.x * cos - self.y * sin, self.x * sin + self.y * cos)
    }

    #[inline(always)]
    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl Add for Vec2 {
    type Output = Self;
    fn add(self, other: Self) -> Self {
        Self { x: self.x + other.x, y: self.y + other.y }
    }
}

impl AddAssign for Vec2 {
    fn add_assign(&mut self, other: Self) {
        self.x += other.x;
        self.y += other.y;
    }
}

impl Sub for Vec2 {
    type Output = Self;
    fn sub(self, other: Self) -> Self {
        Self { x: self.x - other.x, y: self.y - other.y }
    }
}

impl Neg for Vec2 {
    type Output = Self;
    fn neg(self) -> Self {
        Self { x: -self.x, y: -self.y }
    }
}

impl Mul<f32> for Vec2 {
    type Output = Self;
    fn mul(self, scalar: f32) -> Self {
        Self { x: self.x * scalar, y: self.y * scalar }
    }
}

impl Div<f32> for Vec2 {
    type Output = Self;
    fn div(self, scalar: f32) -> Self {
        // Callers guard the divisor (mass is validated positive).
        Self { x: self.x / scalar, y: self.y / scalar }
    }
}

/// Converts an angle (in radians) to a unit vector.
#[inline(always)]
pub fn angle_to_vec(angle_rad: f32) -> Vec2 {
    Vec2::new(angle_rad.cos(), angle_rad.sin())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rotate_quarter_turn() {
        let v = Vec2::X.rotate(std::f32::consts::FRAC_PI_2);
        assert!(v.x.abs() < 1e-6);
        assert!((v.y - 1.0).abs() < 1e-6);
    }

    #[test]
    fn degenerate_vectors_do_not_normalize() {
        assert_eq!(Vec2::ZERO.try_normalize(), None);
        assert_eq!(Vec2::new(1e-8, 0.0).try_normalize(), None);
        assert_eq!(Vec2::new(f32::NAN, 1.0).try_normalize(), None);
        let fallback = Vec2::new(0.0, -1.0);
        assert_eq!(Vec2::ZERO.normalize_or(fallback), fallback);
    }

    #[test]
    fn angle_maps_to_unit_vector() {
        let v = angle_to_vec(std::f32::consts::PI);
        assert!((v.x + 1.0).abs() < 1e-6);
        assert!(v.y.abs() < 1e-6);
    }
}
