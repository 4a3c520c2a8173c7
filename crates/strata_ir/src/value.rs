//! Constant values produced by expression folding.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A fully evaluated constant.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// A signed integer.
    Int(i64),
    /// A boolean.
    Bool(bool),
}

impl Value {
    /// Returns the integer payload, if any.
    pub fn as_int(self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(v),
            Value::Bool(_) => None,
        }
    }

    /// Returns the boolean payload, if any.
    pub fn as_bool(self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(b),
            Value::Int(_) => None,
        }
    }

    /// Numeric view used for range checks: booleans count as 0/1.
    pub fn to_i128(self) -> i128 {
        match self {
            Value::Int(v) => i128::from(v),
            Value::Bool(b) => i128::from(b),
        }
    }

    /// Returns `true` if the value fits an unsigned field of `width` bits.
    pub fn fits_unsigned(self, width: i64) -> bool {
        let v = self.to_i128();
        if v < 0 {
            return false;
        }
        width >= 127 || (width >= 0 && v < (1i128 << width))
    }

    /// Returns `true` if the value fits a two's complement field of `width` bits.
    pub fn fits_signed(self, width: i64) -> bool {
        if width <= 0 {
            return self.to_i128() == 0;
        }
        if width >= 127 {
            return true;
        }
        let half = 1i128 << (width - 1);
        let v = self.to_i128();
        -half <= v && v < half
    }

    /// Returns `true` for the zero value of either kind.
    pub fn is_zero(self) -> bool {
        matches!(self, Value::Int(0) | Value::Bool(false))
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(v) => write!(f, "{v}"),
            Value::Bool(b) => write!(f, "{b}"),
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(i64::from(v))
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsigned_ranges() {
        assert!(Value::Int(0).fits_unsigned(1));
        assert!(Value::Int(4095).fits_unsigned(12));
        assert!(!Value::Int(4096).fits_unsigned(12));
        assert!(!Value::Int(-1).fits_unsigned(12));
        assert!(Value::Int(i64::MAX).fits_unsigned(64));
        assert!(Value::Bool(true).fits_unsigned(1));
        assert!(!Value::Int(1).fits_unsigned(0));
    }

    #[test]
    fn signed_ranges() {
        assert!(Value::Int(-256).fits_signed(9));
        assert!(Value::Int(255).fits_signed(9));
        assert!(!Value::Int(256).fits_signed(9));
        assert!(!Value::Int(-257).fits_signed(9));
    }

    #[test]
    fn payload_views() {
        assert_eq!(Value::Int(3).as_int(), Some(3));
        assert_eq!(Value::Int(3).as_bool(), None);
        assert_eq!(Value::Bool(false).as_bool(), Some(false));
        assert_eq!(Value::Bool(true).to_i128(), 1);
    }

    #[test]
    fn serde_untagged() {
        assert_eq!(serde_json::to_string(&Value::Int(4)).unwrap(), "4");
        assert_eq!(serde_json::to_string(&Value::Bool(true)).unwrap(), "true");
        let back: Value = serde_json::from_str("12").unwrap();
        assert_eq!(back, Value::Int(12));
    }
}
