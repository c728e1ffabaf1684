//! Compile-time unit safety for power-tree quantities.
//!
//! Prevents mixing incompatible units like volts and amperes in the input
//! model. Cross-unit relationships (`V × A = W`, `I²R`) are spelled out as
//! explicit operations instead of raw `f64` arithmetic.
//!
//! # Usage
//!
//! ```
//! use pdn_core::units::{Amperes, Milliohms, Volts, Watts};
//!
//! let p: Watts = Volts(5.0) * Amperes(2.0);
//! assert_eq!(p.value(), 10.0);
//!
//! // I²R loss of 2 A through 50 mΩ
//! let loss = Amperes(2.0).resistive_loss(Milliohms(50.0));
//! assert!((loss.value() - 0.2).abs() < 1e-12);
//!
//! // This would NOT compile - different units
//! // let wrong = Volts(5.0) + Amperes(1.0);
//! ```

use serde::{Deserialize, Serialize};
use std::ops::{Add, Div, Mul, Neg, Sub};

/// Macro to implement common arithmetic operations for unit types
macro_rules! impl_unit_ops {
    ($type:ty, $unit_name:literal) => {
        impl Add for $type {
            type Output = Self;
            fn add(self, rhs: Self) -> Self::Output {
                Self(self.0 + rhs.0)
            }
        }

        impl Sub for $type {
            type Output = Self;
            fn sub(self, rhs: Self) -> Self::Output {
                Self(self.0 - rhs.0)
            }
        }

        impl Neg for $type {
            type Output = Self;
            fn neg(self) -> Self::Output {
                Self(-self.0)
            }
        }

        impl Mul<f64> for $type {
            type Output = Self;
            fn mul(self, rhs: f64) -> Self::Output {
                Self(self.0 * rhs)
            }
        }

        impl Mul<$type> for f64 {
            type Output = $type;
            fn mul(self, rhs: $type) -> Self::Output {
                <$type>::new(self * rhs.0)
            }
        }

        impl Div<f64> for $type {
            type Output = Self;
            fn div(self, rhs: f64) -> Self::Output {
                Self(self.0 / rhs)
            }
        }

        impl Div<$type> for $type {
            type Output = f64;
            fn div(self, rhs: $type) -> Self::Output {
                self.0 / rhs.0
            }
        }

        impl std::fmt::Display for $type {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{:.4} {}", self.0, $unit_name)
            }
        }

        impl $type {
            /// Create a new value
            #[inline]
            pub const fn new(value: f64) -> Self {
                Self(value)
            }

            /// Get the raw numeric value
            #[inline]
            pub const fn value(self) -> f64 {
                self.0
            }

            /// Absolute value
            #[inline]
            pub fn abs(self) -> Self {
                Self(self.0.abs())
            }

            /// Check if value is finite
            #[inline]
            pub fn is_finite(self) -> bool {
                self.0.is_finite()
            }

            /// Maximum of two values
            #[inline]
            pub fn max(self, other: Self) -> Self {
                Self(self.0.max(other.0))
            }

            /// Zero of this unit
            pub const ZERO: Self = Self(0.0);
        }

        impl std::iter::Sum for $type {
            fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
                Self(iter.map(|x| x.0).sum())
            }
        }

        impl<'a> std::iter::Sum<&'a $type> for $type {
            fn sum<I: Iterator<Item = &'a Self>>(iter: I) -> Self {
                Self(iter.map(|x| x.0).sum())
            }
        }
    };
}

// =============================================================================
// Electrical Units
// =============================================================================

/// DC voltage in volts (V)
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[repr(transparent)]
pub struct Volts(pub f64);

impl_unit_ops!(Volts, "V");

/// DC current in amperes (A)
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[repr(transparent)]
pub struct Amperes(pub f64);

impl_unit_ops!(Amperes, "A");

/// Power in watts (W)
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[repr(transparent)]
pub struct Watts(pub f64);

impl_unit_ops!(Watts, "W");

/// Interconnect resistance in milliohms (mΩ)
///
/// Board traces, cables and bus bars are specified in milliohms by the
/// editor; the I²R helper converts to ohms internally.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[repr(transparent)]
pub struct Milliohms(pub f64);

impl_unit_ops!(Milliohms, "mΩ");

impl Mul<Amperes> for Volts {
    type Output = Watts;
    fn mul(self, rhs: Amperes) -> Watts {
        Watts(self.0 * rhs.0)
    }
}

impl Watts {
    /// Current drawn at the given voltage: I = P / V.
    ///
    /// Returns `None` when the voltage is not strictly positive.
    #[inline]
    pub fn current_at(self, v: Volts) -> Option<Amperes> {
        if v.0 > 0.0 {
            Some(Amperes(self.0 / v.0))
        } else {
            None
        }
    }

    /// Express in the given display unit
    #[inline]
    pub fn in_unit(self, unit: PowerUnit) -> f64 {
        self.0 / unit.scale()
    }
}

impl Amperes {
    /// Resistive dissipation I²R through the given resistance
    #[inline]
    pub fn resistive_loss(self, r: Milliohms) -> Watts {
        Watts(self.0 * self.0 * r.to_ohms())
    }

    /// Express in the given display unit
    #[inline]
    pub fn in_unit(self, unit: CurrentUnit) -> f64 {
        self.0 / unit.scale()
    }
}

impl Milliohms {
    /// Convert to ohms
    #[inline]
    pub fn to_ohms(self) -> f64 {
        self.0 / 1000.0
    }
}

// =============================================================================
// Display Units
// =============================================================================

/// Power unit preferred by report consumers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PowerUnit {
    #[serde(rename = "mW")]
    Milliwatt,
    #[default]
    #[serde(rename = "W")]
    Watt,
    #[serde(rename = "kW")]
    Kilowatt,
}

impl PowerUnit {
    /// Watts per display unit
    pub fn scale(self) -> f64 {
        match self {
            PowerUnit::Milliwatt => 1e-3,
            PowerUnit::Watt => 1.0,
            PowerUnit::Kilowatt => 1e3,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            PowerUnit::Milliwatt => "mW",
            PowerUnit::Watt => "W",
            PowerUnit::Kilowatt => "kW",
        }
    }
}

/// Current unit preferred by report consumers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CurrentUnit {
    #[serde(rename = "mA")]
    Milliampere,
    #[default]
    #[serde(rename = "A")]
    Ampere,
}

impl CurrentUnit {
    /// Amperes per display unit
    pub fn scale(self) -> f64 {
        match self {
            CurrentUnit::Milliampere => 1e-3,
            CurrentUnit::Ampere => 1.0,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            CurrentUnit::Milliampere => "mA",
            CurrentUnit::Ampere => "A",
        }
    }
}

/// Display preferences carried by a project
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayUnits {
    pub power: PowerUnit,
    pub current: CurrentUnit,
}

// =============================================================================
// Tests
// =============================================================================
