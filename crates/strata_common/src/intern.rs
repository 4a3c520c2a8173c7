//! Process-wide identity cache for immutable value objects.
//!
//! A value is interned once per distinct structure: constructing an equal
//! value again returns the handle of the first one, so two [`Interned`]
//! handles compare equal exactly when they point at the same allocation.
//! Entries are leaked and never evicted; the cache is bounded by the size of
//! the design being described.

use serde::{Serialize, Serializer};
use std::collections::HashSet;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::Deref;
use std::sync::{Mutex, OnceLock, PoisonError};

/// Storage for one interned value kind.
///
/// The check for an existing entry and the insertion of a new one happen
/// under a single lock, so concurrent construction of equal values from
/// several threads still yields one shared object.
pub struct InternPool<T: 'static> {
    set: OnceLock<Mutex<HashSet<&'static T>>>,
}

impl<T: Eq + Hash + 'static> InternPool<T> {
    /// Creates an empty pool. Usable in `static` items.
    pub const fn new() -> Self {
        Self {
            set: OnceLock::new(),
        }
    }

    fn entries(&self) -> &Mutex<HashSet<&'static T>> {
        self.set.get_or_init(|| Mutex::new(HashSet::new()))
    }

    /// Returns the canonical handle for `value`, storing it if unseen.
    pub fn intern(&self, value: T) -> Interned<T> {
        // A poisoned lock only means another thread panicked mid-insert; the
        // set itself holds fully constructed entries.
        let mut set = self.entries().lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(existing) = set.get(&value) {
            return Interned(existing);
        }
        let leaked: &'static T = Box::leak(Box::new(value));
        set.insert(leaked);
        Interned(leaked)
    }

    /// Number of distinct values stored so far.
    pub fn len(&self) -> usize {
        self.entries()
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Returns `true` if nothing has been interned yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T: Eq + Hash + 'static> Default for InternPool<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// A value kind with a dedicated process-wide [`InternPool`].
///
/// Implementors declare a `static` pool and return it from [`Intern::pool`].
pub trait Intern: Eq + Hash + Sized + Send + Sync + 'static {
    /// The pool holding every interned value of this kind.
    fn pool() -> &'static InternPool<Self>;

    /// Interns `self` in its kind's pool.
    fn intern(self) -> Interned<Self> {
        Self::pool().intern(self)
    }
}

/// Shared handle to an interned value.
///
/// Equality and hashing use the address of the canonical allocation, which
/// is equivalent to structural equality because every value passes through
/// its pool. Only shared access is exposed.
pub struct Interned<T: 'static>(&'static T);

impl<T: 'static> Interned<T> {
    /// Returns the `'static` reference to the interned value.
    pub fn get(self) -> &'static T {
        self.0
    }

    /// Returns `true` if both handles refer to the same canonical object.
    pub fn ptr_eq(a: Self, b: Self) -> bool {
        std::ptr::eq(a.0, b.0)
    }
}

impl<T: 'static> Clone for Interned<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T: 'static> Copy for Interned<T> {}

impl<T: 'static> PartialEq for Interned<T> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.0, other.0)
    }
}

impl<T: 'static> Eq for Interned<T> {}

impl<T: 'static> Hash for Interned<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::ptr::hash(self.0, state);
    }
}

impl<T: 'static> Deref for Interned<T> {
    type Target = T;

    fn deref(&self) -> &T {
        self.0
    }
}

impl<T: fmt::Debug + 'static> fmt::Debug for Interned<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl<T: Serialize + 'static> Serialize for Interned<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.0.serialize(serializer)
    }
}
