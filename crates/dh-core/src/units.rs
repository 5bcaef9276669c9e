//! Compile-time unit safety for the physical quantities flowing through the
//! CHA/DHA/economics pipeline.
//!
//! Newtype wrappers around `f64` so that, for example, a pressure drop in
//! bar can't silently be added to a velocity in m/s. All wrappers are
//! `#[repr(transparent)]`.

use serde::{Deserialize, Serialize};
use std::ops::{Add, Div, Mul, Sub};

macro_rules! unit {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize, Default)]
        #[repr(transparent)]
        pub struct $name(pub f64);

        impl $name {
            #[inline]
            pub fn value(&self) -> f64 {
                self.0
            }
        }

        impl Add for $name {
            type Output = Self;
            fn add(self, rhs: Self) -> Self {
                Self(self.0 + rhs.0)
            }
        }

        impl Sub for $name {
            type Output = Self;
            fn sub(self, rhs: Self) -> Self {
                Self(self.0 - rhs.0)
            }
        }

        impl Mul<f64> for $name {
            type Output = Self;
            fn mul(self, rhs: f64) -> Self {
                Self(self.0 * rhs)
            }
        }

        impl Div<f64> for $name {
            type Output = Self;
            fn div(self, rhs: f64) -> Self {
                Self(self.0 / rhs)
            }
        }
    };
}

unit!(Meters);
unit!(Kilometers);
unit!(MetersPerSecond);
unit!(Bar);
unit!(BarPer100m);
unit!(Celsius);
unit!(Kilowatts);
unit!(Megawatts);
unit!(Megavars);
unit!(Kilovolts);
unit!(PerUnit);
unit!(EurPerMwh);
unit!(TonnesPerYear);
unit!(Millimeters);

impl Kilometers {
    pub fn to_meters(self) -> Meters {
        Meters(self.0 * 1000.0)
    }
}

impl Meters {
    pub fn to_km(self) -> Kilometers {
        Kilometers(self.0 / 1000.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arithmetic_preserves_unit() {
        let a = Bar(0.1);
        let b = Bar(0.05);
        assert!((a + b).value() - 0.15 < 1e-12);
    }

    #[test]
    fn km_to_m_roundtrip() {
        let km = Kilometers(1.5);
        assert_eq!(km.to_meters().to_km().value(), 1.5);
    }
}
