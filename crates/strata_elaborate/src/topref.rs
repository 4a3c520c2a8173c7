//! Top-level elaboration requests: `[tb_lib.tb#]lib.top[-sub]`.

use std::fmt;
use std::str::FromStr;

use strata_ir::{IrError, ModRef};

/// What to elaborate: a top module, optionally narrowed to one of its
/// sub-modules and optionally wrapped in a testbench.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TopModRef {
    /// The top module.
    pub top: ModRef,
    /// Glob selecting a unique sub-module below `top`.
    pub sub: Option<String>,
    /// Testbench instantiating the selected module.
    pub tb: Option<ModRef>,
}

impl TopModRef {
    /// A plain top module reference.
    pub fn new(top: ModRef) -> Self {
        Self {
            top,
            sub: None,
            tb: None,
        }
    }
}

impl FromStr for TopModRef {
    type Err = IrError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let (tb, rest) = match text.split_once('#') {
            Some((tb, rest)) => (Some(tb.parse::<ModRef>()?), rest),
            None => (None, text),
        };
        let (top, sub) = match rest.split_once('-') {
            Some((top, sub)) => {
                if sub.is_empty() {
                    return Err(IrError::InvalidReference {
                        text: text.to_string(),
                        reason: "empty sub-module after '-'".to_string(),
                    });
                }
                (top, Some(sub.to_string()))
            }
            None => (rest, None),
        };
        Ok(TopModRef {
            top: top.parse()?,
            sub,
            tb,
        })
    }
}

impl fmt::Display for TopModRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(tb) = &self.tb {
            write!(f, "{tb}#")?;
        }
        write!(f, "{}", self.top)?;
        if let Some(sub) = &self.sub {
            write!(f, "-{sub}")?;
        }
        Ok(())
    }
}
