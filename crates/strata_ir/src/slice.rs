//! Bit ranges of vector ports and signals.

use crate::error::IrError;
use std::fmt;
use std::str::FromStr;

/// Inclusive bit range `[hi:lo]`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct Slice {
    hi: u32,
    lo: u32,
}

impl Slice {
    /// The range `[hi:lo]`; `hi` must not be below `lo`.
    pub fn new(hi: u32, lo: u32) -> Result<Self, IrError> {
        if hi < lo {
            return Err(IrError::InvalidReference {
                text: format!("[{hi}:{lo}]"),
                reason: "upper bound is below lower bound".to_string(),
            });
        }
        Ok(Self { hi, lo })
    }

    /// The single bit `[index]`.
    pub fn bit(index: u32) -> Self {
        Self {
            hi: index,
            lo: index,
        }
    }

    /// Upper bound.
    pub fn hi(self) -> u32 {
        self.hi
    }

    /// Lower bound.
    pub fn lo(self) -> u32 {
        self.lo
    }

    /// Number of bits.
    pub fn width(self) -> u32 {
        self.hi - self.lo + 1
    }

    /// Returns `true` if both ranges share a bit.
    pub fn overlaps(self, other: Slice) -> bool {
        self.lo <= other.hi && other.lo <= self.hi
    }

    /// Returns `true` if the range lies inside a vector of `width` bits.
    pub fn fits(self, width: i64) -> bool {
        i64::from(self.hi) < width
    }

    /// Splits a trailing `[hi:lo]` or `[index]` off `text`.
    pub fn split_suffix(text: &str) -> Result<(&str, Option<Slice>), IrError> {
        let Some(body) = text.strip_suffix(']') else {
            return Ok((text, None));
        };
        let (base, range) = body.rsplit_once('[').ok_or_else(|| IrError::InvalidReference {
            text: text.to_string(),
            reason: "unbalanced brackets".to_string(),
        })?;
        Ok((base.trim_end(), Some(range.parse()?)))
    }
}

impl FromStr for Slice {
    type Err = IrError;

    /// Parses the bracket contents `hi:lo` or `index`.
    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let bound = |part: &str| {
            part.trim().parse::<u32>().map_err(|_| IrError::InvalidReference {
                text: format!("[{text}]"),
                reason: "slice bounds must be non-negative integers".to_string(),
            })
        };
        match text.split_once(':') {
            Some((hi, lo)) => Slice::new(bound(hi)?, bound(lo)?),
            None => Ok(Slice::bit(bound(text)?)),
        }
    }
}

impl fmt::Display for Slice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.hi == self.lo {
            write!(f, "[{}]", self.hi)
        } else {
            write!(f, "[{}:{}]", self.hi, self.lo)
        }
    }
}
