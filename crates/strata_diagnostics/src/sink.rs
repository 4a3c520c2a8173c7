//! Thread-safe diagnostic accumulator with per-instance tallies.

use crate::diagnostic::Diagnostic;
use crate::severity::Severity;
use indexmap::IndexMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use strata_ir::HierPath;

/// Error and warning counts of one instance.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Tally {
    /// Error diagnostics.
    pub errors: usize,
    /// Warning diagnostics.
    pub warnings: usize,
}

/// Collects diagnostics from any number of threads.
///
/// Parallel elaboration emits from rayon workers, so emission only needs a
/// shared reference. The error count is kept outside the lock.
#[derive(Default)]
pub struct DiagnosticSink {
    diagnostics: Mutex<Vec<Diagnostic>>,
    error_count: AtomicUsize,
}

impl DiagnosticSink {
    /// Creates an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `diag`.
    pub fn emit(&self, diag: Diagnostic) {
        if diag.severity() == Severity::Error {
            self.error_count.fetch_add(1, Ordering::Relaxed);
        }
        self.lock().push(diag);
    }

    /// Records every diagnostic of `diags`.
    pub fn extend(&self, diags: impl IntoIterator<Item = Diagnostic>) {
        diags.into_iter().for_each(|diag| self.emit(diag));
    }

    /// Returns `true` if an error was emitted.
    pub fn has_errors(&self) -> bool {
        self.error_count() > 0
    }

    /// Number of errors emitted so far.
    pub fn error_count(&self) -> usize {
        self.error_count.load(Ordering::Relaxed)
    }

    /// Snapshot in emission order.
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.lock().clone()
    }

    /// Diagnostics at `path` or anywhere below it.
    pub fn within(&self, path: &HierPath) -> Vec<Diagnostic> {
        self.lock()
            .iter()
            .filter(|d| d.path.as_ref().is_some_and(|p| p.starts_with(path)))
            .cloned()
            .collect()
    }

    /// Tally per instance, in order of each instance's first diagnostic.
    ///
    /// Unlocated diagnostics are counted under the empty path.
    pub fn by_instance(&self) -> IndexMap<HierPath, Tally> {
        let mut tallies: IndexMap<HierPath, Tally> = IndexMap::new();
        for diag in self.lock().iter() {
            let tally = tallies.entry(diag.path.clone().unwrap_or_default()).or_default();
            match diag.severity() {
                Severity::Error => tally.errors += 1,
                Severity::Warning => tally.warnings += 1,
            }
        }
        tallies
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Diagnostic>> {
        self.diagnostics.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::code::DiagnosticCode;

    fn core() -> HierPath {
        HierPath::root("uart").child("u_core")
    }

    fn multiple_driver(path: &HierPath) -> Diagnostic {
        Diagnostic::new(DiagnosticCode::error(213), "'data_s' has multiple drivers").at(path)
    }

    fn undriven(path: &HierPath) -> Diagnostic {
        Diagnostic::new(DiagnosticCode::warning(200), "input 'u_rx/en_i' is not driven").at(path)
    }

    #[test]
    fn warnings_do_not_count_as_errors() {
        let sink = DiagnosticSink::new();
        sink.emit(undriven(&core()));
        assert!(!sink.has_errors());
        sink.emit(multiple_driver(&core()));
        assert_eq!(sink.error_count(), 1);
        assert_eq!(sink.diagnostics().len(), 2);
    }

    #[test]
    fn tallies_per_instance() {
        let sink = DiagnosticSink::new();
        let top = HierPath::root("uart");
        sink.emit(undriven(&core()));
        sink.emit(Diagnostic::new(DiagnosticCode::error(202), "duplicate module 'uart_lib.uart'"));
        sink.emit(multiple_driver(&core()));
        sink.emit(multiple_driver(&top));
        let tallies = sink.by_instance();
        let paths: Vec<String> = tallies.keys().map(ToString::to_string).collect();
        assert_eq!(paths, vec!["uart/u_core", "", "uart"]);
        assert_eq!(tallies[&core()], Tally { errors: 1, warnings: 1 });
        assert_eq!(tallies[&HierPath::default()].errors, 1);
    }

    #[test]
    fn subtree_selection() {
        let sink = DiagnosticSink::new();
        let top = HierPath::root("uart");
        sink.extend([multiple_driver(&top), undriven(&core()), multiple_driver(&HierPath::root("tb"))]);
        assert_eq!(sink.within(&top).len(), 2);
        assert_eq!(sink.within(&core()).len(), 1);
        assert!(sink.within(&HierPath::root("spi")).is_empty());
    }

    #[test]
    fn concurrent_emission() {
        use std::sync::Arc;
        use std::thread;

        let sink = Arc::new(DiagnosticSink::new());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let sink = Arc::clone(&sink);
                thread::spawn(move || {
                    let path = HierPath::root("uart").child(format!("u_{i}").as_str());
                    for _ in 0..50 {
                        sink.emit(multiple_driver(&path));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(sink.error_count(), 400);
        assert_eq!(sink.by_instance().len(), 8);
    }
}
