//! Fixed-point math utilities for deterministic simulation.
//!
//! All battle simulation uses fixed-point arithmetic so that a given army
//! layout resolves identically on every machine. Floating-point values are
//! only accepted at the crate boundary (authoring data, rendering output).

use fixed::types::I32F32;
use serde::{Deserialize, Serialize};

/// Fixed-point number type for all simulation math.
///
/// Uses 32 bits for integer part and 32 bits for fractional part.
/// Range: approximately -2,147,483,648 to 2,147,483,647
/// Precision: approximately 0.00000000023
pub type Fixed = I32F32;

/// Slack applied to range comparisons so a unit clamped exactly onto its
/// attack range still counts as in range after square-root rounding.
pub const RANGE_TOLERANCE: Fixed = Fixed::from_bits(1 << 16);

/// Remaining cooldown at or below this counts as elapsed. Absorbs the
/// truncation of `1 / tick_rate` accumulated over a cooldown.
pub const COOLDOWN_TOLERANCE: Fixed = Fixed::from_bits(1 << 16);

/// Fixed-point 2D vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Vec2Fixed {
    /// X coordinate.
    #[serde(with = "fixed_serde")]
    pub x: Fixed,
    /// Y coordinate.
    #[serde(with = "fixed_serde")]
    pub y: Fixed,
}

/// Serde support for fixed-point numbers.
///
/// Serializes fixed-point numbers as their raw bit representation (i64)
/// to preserve exact precision across serialization boundaries.
pub mod fixed_serde {
    use super::Fixed;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Serialize a fixed-point number as its raw bit representation.
    pub fn serialize<S>(value: &Fixed, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        value.to_bits().serialize(serializer)
    }

    /// Deserialize a fixed-point number from its raw bit representation.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Fixed, D::Error>
    where
        D: Deserializer<'de>,
    {
        let bits = i64::deserialize(deserializer)?;
        Ok(Fixed::from_bits(bits))
    }
}

impl Vec2Fixed {
    /// Create a new fixed-point vector.
    #[must_use]
    pub const fn new(x: Fixed, y: Fixed) -> Self {
        Self { x, y }
    }

    /// Zero vector.
    pub const ZERO: Self = Self {
        x: Fixed::ZERO,
        y: Fixed::ZERO,
    };

    /// Build a vector from authoring-time floats, saturating at the
    /// fixed-point range. NaN maps to zero.
    #[must_use]
    pub fn from_f64(x: f64, y: f64) -> Self {
        Self::new(saturating_from_f64(x), saturating_from_f64(y))
    }

    /// Build a vector from floats, or `None` if either is NaN or out of range.
    #[must_use]
    pub fn checked_from_f64(x: f64, y: f64) -> Option<Self> {
        Some(Self::new(checked_from_f64(x)?, checked_from_f64(y)?))
    }

    /// Convert to floats for rendering or JSON output.
    #[must_use]
    pub fn to_f64(self) -> (f64, f64) {
        (self.x.to_num(), self.y.to_num())
    }

    /// Calculate squared distance (avoids sqrt for comparisons).
    #[must_use]
    pub fn distance_squared(self, other: Self) -> Fixed {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx * dx + dy * dy
    }

    /// Euclidean distance to another point.
    #[must_use]
    pub fn distance(self, other: Self) -> Fixed {
        fixed_sqrt(self.distance_squared(other))
    }

    /// Length of the vector.
    #[must_use]
    pub fn length(self) -> Fixed {
        fixed_sqrt(self.dot(self))
    }

    /// Dot product of two vectors.
    #[must_use]
    pub fn dot(self, other: Self) -> Fixed {
        self.x * other.x + self.y * other.y
    }

    /// Multiply both components by a scalar.
    #[must_use]
    pub fn scale(self, factor: Fixed) -> Self {
        Self::new(self.x * factor, self.y * factor)
    }

    /// Normalize vector using fixed-point math.
    ///
    /// Returns the zero vector for zero-length input.
    #[must_use]
    pub fn normalize(self) -> Self {
        let len = self.length();
        if len == Fixed::ZERO {
            return Self::ZERO;
        }

        Self::new(self.x / len, self.y / len)
    }

    /// Step from `self` toward `target` by at most `max_step`.
    ///
    /// Never overshoots: if the target is closer than `max_step` the
    /// result is exactly `target`.
    #[must_use]
    pub fn move_toward(self, target: Self, max_step: Fixed) -> Self {
        let offset = target - self;
        let dist = offset.length();
        if dist <= max_step || dist == Fixed::ZERO {
            return target;
        }
        self + offset.normalize().scale(max_step)
    }
}

/// Convert an authoring-time float, or `None` if it is NaN or out of range.
#[must_use]
pub fn checked_from_f64(value: f64) -> Option<Fixed> {
    Fixed::checked_from_num(value)
}

fn saturating_from_f64(value: f64) -> Fixed {
    if value.is_nan() {
        Fixed::ZERO
    } else {
        Fixed::saturating_from_num(value)
    }
}

/// Closest approach of a point to the segment `start..end`.
///
/// Returns `(t, distance²)` where `t` in `[0, 1]` is the position along the
/// segment of the closest point.
#[must_use]
pub fn segment_closest_approach(start: Vec2Fixed, end: Vec2Fixed, point: Vec2Fixed) -> (Fixed, Fixed) {
    let seg = end - start;
    let len_sq = seg.dot(seg);
    if len_sq == Fixed::ZERO {
        return (Fixed::ZERO, start.distance_squared(point));
    }

    let t = ((point - start).dot(seg) / len_sq).clamp(Fixed::ZERO, Fixed::ONE);
    let closest = start + seg.scale(t);
    (t, closest.distance_squared(point))
}

/// Computes the square root of a fixed-point number.
///
/// Binary search over the raw bit representation, so the result is the
/// exact floor of the true root at full I32F32 precision on every platform.
#[must_use]
pub fn fixed_sqrt(value: Fixed) -> Fixed {
    if value <= Fixed::ZERO {
        return Fixed::ZERO;
    }

    // sqrt(v) in I32F32 bits is sqrt(bits << 32).
    let target = (value.to_bits() as u128) << 32;
    let mut low: u128 = 0;
    let mut high: u128 = 1 << 48;

    while low < high {
        let mid = (low + high + 1) / 2;
        if mid * mid <= target {
            low = mid;
        } else {
            high = mid - 1;
        }
    }

    Fixed::from_bits(low as i64)
}

impl std::ops::Add for Vec2Fixed {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self {
            x: self.x + rhs.x,
            y: self.y + rhs.y,
        }
    }
}

impl std::ops::Sub for Vec2Fixed {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self {
            x: self.x - rhs.x,
            y: self.y - rhs.y,
        }
    }
}
