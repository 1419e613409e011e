use indexmap::IndexMap;

use crate::expr::{Arena, ExprIdx, ExprKind::*};

const RED_ZONE: usize = 32 * 1024;
const STACK_SIZE: usize = 1024 * 1024;

/// Node count of the subtree rooted at `root`. Expressions in this
/// engine are never shared between distinct roots — `subst`
/// always allocates fresh `App`/`Fun` nodes on its way back up — so a
/// plain recursive count is exact, not an over-count from aliasing.
pub fn mass(arena: &Arena, root: ExprIdx) -> usize {
    stacker::maybe_grow(RED_ZONE, STACK_SIZE, || match arena.get(root) {
        Var(_) | Magic(_) => 1,
        Fun { body, .. } => 1 + mass(arena, *body),
        App { lhs, rhs } => 1 + mass(arena, *lhs) + mass(arena, *rhs),
    })
}

/// Deterministic structural hash: `fxhash::hash64` over a discriminant
/// tag plus child digests. `Var` equality is by label text only — the
/// fresh-rename tag is deliberately excluded, so a binder and every
/// α-renamed copy `subst` produces of it land in the same species,
/// while two bindings with genuinely different source names do not.
pub fn structural_hash(arena: &Arena, root: ExprIdx) -> u64 {
    stacker::maybe_grow(RED_ZONE, STACK_SIZE, || match arena.get(root) {
        Var(sym) => fxhash::hash64(&(1u8, sym.label.as_ref())),
        Magic(label) => fxhash::hash64(&(2u8, label.as_ref())),
        Fun { param, body } => {
            let h_body = structural_hash(arena, *body);
            fxhash::hash64(&(3u8, param.label.as_ref(), h_body))
        }
        App { lhs, rhs } => {
            let h_lhs = structural_hash(arena, *lhs);
            let h_rhs = structural_hash(arena, *rhs);
            fxhash::hash64(&(4u8, h_lhs, h_rhs))
        }
    })
}

/// Running population histogram keyed by structural-hash "species".
/// Insertion order is preserved so a snapshot taken at one tick and
/// printed is stable run-to-run for the same input stream.
#[derive(Default)]
pub struct SpeciesHistogram {
    counts: IndexMap<u64, usize>,
}

impl SpeciesHistogram {
    pub fn new() -> Self {
        SpeciesHistogram { counts: IndexMap::new() }
    }

    pub fn clear(&mut self) {
        self.counts.clear();
    }

    /// Folds one population member into the histogram.
    pub fn observe(&mut self, arena: &Arena, idx: ExprIdx) {
        self.observe_hash(structural_hash(arena, idx));
    }

    /// Folds in a population member whose structural hash is already
    /// known (e.g. a grid cell's cached hash), skipping the recompute.
    pub fn observe_hash(&mut self, hash: u64) {
        *self.counts.entry(hash).or_insert(0) += 1;
    }

    pub fn species_count(&self) -> usize {
        self.counts.len()
    }

    pub fn total(&self) -> usize {
        self.counts.values().sum()
    }

    /// `(hash, count)` pairs in first-observed order — an ordered,
    /// run-length-encoded view of the population.
    pub fn entries(&self) -> impl Iterator<Item = (u64, usize)> + '_ {
        self.counts.iter().map(|(&h, &c)| (h, c))
    }

    /// Shannon entropy, −Σ pᵢ·ln pᵢ, over the observed species frequencies.
    /// Zero for an empty or single-species population.
    pub fn entropy(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            return 0.0;
        }
        let total = total as f64;
        -self
            .counts
            .values()
            .map(|&count| {
                let p = count as f64 / total;
                p * p.ln()
            })
            .sum::<f64>()
    }
}
