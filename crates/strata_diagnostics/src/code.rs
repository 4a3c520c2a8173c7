//! Stable diagnostic codes.
//!
//! The hundreds digit names the pipeline stage: `2xx` for elaboration and
//! `3xx` for file lists. The letter is the severity, so `E213` is an
//! elaboration error and `W200` an elaboration warning.

use crate::severity::Severity;
use serde::{Serialize, Serializer};
use std::fmt;

/// Pipeline stage a code belongs to.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Area {
    /// Binding, instantiation and connection checks.
    Elaboration,
    /// File-list rules, placeholders and templates.
    FileList,
}

/// A severity letter and a three-digit number, e.g. `E205`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct DiagnosticCode {
    /// Severity every diagnostic with this code has.
    pub severity: Severity,
    /// Number, unique per severity.
    pub number: u16,
}

impl DiagnosticCode {
    /// Error code `E<number>`.
    pub const fn error(number: u16) -> Self {
        Self {
            severity: Severity::Error,
            number,
        }
    }

    /// Warning code `W<number>`.
    pub const fn warning(number: u16) -> Self {
        Self {
            severity: Severity::Warning,
            number,
        }
    }

    /// Stage the code belongs to, if its number is in a known range.
    pub fn area(self) -> Option<Area> {
        match self.number / 100 {
            2 => Some(Area::Elaboration),
            3 => Some(Area::FileList),
            _ => None,
        }
    }
}

impl fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{:03}", self.severity.prefix(), self.number)
    }
}

impl Serialize for DiagnosticCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn letter_follows_severity() {
        assert_eq!(DiagnosticCode::error(213).to_string(), "E213");
        assert_eq!(DiagnosticCode::warning(200).to_string(), "W200");
        assert_ne!(DiagnosticCode::error(200), DiagnosticCode::warning(200));
    }

    #[test]
    fn area_from_number() {
        assert_eq!(DiagnosticCode::error(207).area(), Some(Area::Elaboration));
        assert_eq!(DiagnosticCode::warning(200).area(), Some(Area::Elaboration));
        assert_eq!(DiagnosticCode::error(301).area(), Some(Area::FileList));
        assert_eq!(DiagnosticCode::error(7).area(), None);
    }

    #[test]
    fn serializes_as_text() {
        let json = serde_json::to_string(&DiagnosticCode::error(302)).unwrap();
        assert_eq!(json, "\"E302\"");
    }
}
