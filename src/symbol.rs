use std::sync::atomic::{AtomicU64, Ordering::Relaxed};
use std::sync::Arc;

use hashbrown::HashSet;

/// Process-wide interner for variable labels. Two labels that compare
/// equal as strings always intern to the same `Arc<str>` pointer, so
/// `Symbol` equality can be a pointer/tag comparison instead of a string
/// comparison.
#[derive(Default)]
pub struct Interner {
    labels: HashSet<Arc<str>>,
}

impl Interner {
    pub fn new() -> Self {
        Interner { labels: HashSet::new() }
    }

    /// `intern(label) → interned-label`. Idempotent and order-independent:
    /// interning the same string twice (from this or any other call)
    /// returns the same `Arc<str>` pointer.
    pub fn intern(&mut self, label: &str) -> Arc<str> {
        if let Some(existing) = self.labels.get(label) {
            return existing.clone();
        }
        let arc: Arc<str> = Arc::from(label);
        self.labels.insert(arc.clone());
        arc
    }
}

/// Strictly-increasing process-wide counter backing `fresh()`. Must never
/// be reset while any co-existing expression might carry a tag it
/// produced.
static FRESH_COUNTER: AtomicU64 = AtomicU64::new(0);

/// A symbol: an interned label paired with a tag. Tag 0 denotes a
/// source-level name; nonzero tags denote a fresh α-renamed copy minted
/// by `fresh`.
#[derive(Clone, Eq)]
pub struct Symbol {
    pub label: Arc<str>,
    pub tag: u64,
}

impl Symbol {
    pub fn source(label: Arc<str>) -> Self {
        Symbol { label, tag: 0 }
    }

    /// `fresh(symbol) → symbol`: a new symbol with the same label but a
    /// tag equal to `++global_counter`. Monotonic; never collides with
    /// any symbol whose tag is less than or equal to the counter's
    /// current value.
    pub fn fresh(&self) -> Self {
        let tag = FRESH_COUNTER.fetch_add(1, Relaxed) + 1;
        Symbol { label: self.label.clone(), tag }
    }

    pub fn is_fresh(&self) -> bool {
        self.tag != 0
    }
}

impl PartialEq for Symbol {
    fn eq(&self, other: &Symbol) -> bool {
        self.tag == other.tag && Arc::ptr_eq(&self.label, &other.label)
    }
}

impl std::hash::Hash for Symbol {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        // Hash the label's contents (not its address) so two `Interner`s
        // given the same source text still hash `Symbol`s consistently;
        // equality still uses pointer identity for the fast path.
        self.label.as_ref().hash(state);
        self.tag.hash(state);
    }
}

impl std::fmt::Debug for Symbol {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        if self.tag == 0 {
            write!(f, "{}", self.label)
        } else {
            write!(f, "{}:{}", self.label, self.tag)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intern_is_idempotent() {
        let mut interner = Interner::new();
        let a = interner.intern("foo");
        let b = interner.intern("foo");
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn fresh_is_monotonic_and_distinct() {
        let mut interner = Interner::new();
        let x = Symbol::source(interner.intern("x"));
        let f1 = x.fresh();
        let f2 = x.fresh();
        assert_ne!(f1.tag, f2.tag);
        assert!(f1.tag > 0 && f2.tag > 0);
        assert_ne!(f1, f2);
        assert_ne!(f1, x);
    }

    #[test]
    fn eq_requires_same_label_and_tag() {
        let mut interner = Interner::new();
        let x1 = Symbol::source(interner.intern("x"));
        let x2 = Symbol::source(interner.intern("x"));
        assert_eq!(x1, x2);
        let y = Symbol::source(interner.intern("y"));
        assert_ne!(x1, y);
    }
}
