//! Active-path tracking for cycle detection.

use strata_ir::ModRef;

use crate::errors::ElabErrorKind;

/// Declarations on the path from the top instance to the current one.
///
/// Each instance receives its own context, so sibling subtrees can be
/// elaborated independently.
#[derive(Clone, Debug, Default)]
pub struct ElabContext {
    ancestors: Vec<ModRef>,
}

impl ElabContext {
    /// Context of a top instance.
    pub fn new() -> Self {
        Self::default()
    }

    /// Context for an instance of `modref` below the current path.
    ///
    /// Fails with `CyclicHierarchy` if `modref` is already on the path.
    pub fn enter(&self, modref: ModRef) -> Result<ElabContext, ElabErrorKind> {
        let mut ancestors = self.ancestors.clone();
        ancestors.push(modref);
        if self.ancestors.contains(&modref) {
            return Err(ElabErrorKind::CyclicHierarchy { chain: ancestors });
        }
        Ok(ElabContext { ancestors })
    }

    /// Number of declarations on the path.
    pub fn depth(&self) -> usize {
        self.ancestors.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reentry_is_a_cycle() {
        let a = ModRef::new("lib", "a");
        let b = ModRef::new("lib", "b");
        let ctx = ElabContext::new().enter(a).unwrap().enter(b).unwrap();
        assert_eq!(ctx.depth(), 2);
        assert_eq!(
            ctx.enter(a).unwrap_err(),
            ElabErrorKind::CyclicHierarchy {
                chain: vec![a, b, a]
            }
        );
    }

    #[test]
    fn siblings_may_repeat() {
        let top = ElabContext::new().enter(ModRef::new("lib", "top")).unwrap();
        let leaf = ModRef::new("lib", "leaf");
        assert!(top.enter(leaf).is_ok());
        assert!(top.enter(leaf).is_ok());
    }
}
