use std::sync::atomic::{AtomicBool, Ordering::Relaxed};
use std::sync::Arc;

use indexmap::IndexMap;
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::expr::{Arena, ExprIdx};
use crate::gc::{self, CollectStats};
use crate::symbol::{Interner, Symbol};

/// Tunable knobs for a simulation run.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub pool_size: usize,
    pub iterations: usize,
    pub gas_depth: usize,
    pub grid_depth: usize,
    pub steps: usize,
    pub max_mass: usize,
    pub width: usize,
    pub height: usize,
    pub density_pct: u8,
    pub max_age: u32,
    pub cosmic_ray_rate: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            pool_size: 100,
            iterations: 10_000,
            gas_depth: 3,
            grid_depth: 5,
            steps: 100,
            max_mass: 3_000,
            width: 20,
            height: 20,
            density_pct: 30,
            max_age: 75,
            cosmic_ray_rate: 5.0,
        }
    }
}

/// Outcome of one reactor tick (a gas iteration or a grid step) with
/// respect to the cooperative cancellation flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepResult {
    Continued,
    Cancelled,
}

/// The single explicit "everything lives here" value: arena, interner,
/// bindings table, PRNG, and cancellation flag travel together as one
/// argument rather than ambient statics, since a process may run more
/// than one independent simulation, e.g. under test.
pub struct Engine {
    pub arena: Arena,
    pub interner: Interner,
    /// Source-level name → expression root. Re-binding an existing name
    /// overwrites its body; there is no shadowing.
    pub bindings: IndexMap<Symbol, ExprIdx>,
    pub rng: StdRng,
    pub cancel: AtomicBool,
}

impl Engine {
    pub fn new(seed: u64) -> Self {
        Engine {
            arena: Arena::new(),
            interner: Interner::new(),
            bindings: IndexMap::new(),
            rng: StdRng::seed_from_u64(seed),
            cancel: AtomicBool::new(false),
        }
    }

    pub fn intern(&mut self, label: &str) -> Arc<str> {
        self.interner.intern(label)
    }

    pub fn bind(&mut self, name: Symbol, body: ExprIdx) {
        self.bindings.insert(name, body);
    }

    pub fn lookup(&self, name: &Symbol) -> Option<ExprIdx> {
        self.bindings.get(name).copied()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.load(Relaxed)
    }

    pub fn request_cancel(&self) {
        self.cancel.store(true, Relaxed);
    }

    /// Runs a full mark-and-sweep collection using every binding body
    /// plus whatever extra roots the caller supplies — pool entries,
    /// occupied grid cells, the expression currently being reduced.
    pub fn collect(&mut self, extra_roots: impl IntoIterator<Item = ExprIdx>) -> CollectStats {
        let roots: Vec<ExprIdx> = self.bindings.values().copied().chain(extra_roots).collect();
        gc::collect(&mut self.arena, roots)
    }

    pub fn should_compact(&self) -> bool {
        gc::should_compact(&self.arena)
    }

    /// Compacts the arena and rewrites every binding in place so every
    /// binding's pretty-print is unchanged across the compaction. The
    /// caller is responsible for remapping any other externally-held
    /// indices (pool/grid) with the returned table, via
    /// [`gc::remap_index`].
    #[must_use]
    pub fn compact(&mut self) -> Vec<Option<ExprIdx>> {
        let remap = gc::compact(&mut self.arena);
        for v in self.bindings.values_mut() {
            *v = gc::remap_index(&remap, *v);
        }
        remap
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pretty;

    #[test]
    fn rebinding_overwrites_without_shadowing() {
        let mut engine = Engine::new(0);
        let name = Symbol::source(engine.intern("id"));
        let a_sym = Symbol::source(engine.interner.intern("a"));
        let a = engine.arena.mk_var(a_sym);
        let b_sym = Symbol::source(engine.interner.intern("b"));
        let b = engine.arena.mk_var(b_sym);
        engine.bind(name.clone(), a);
        engine.bind(name.clone(), b);
        assert_eq!(engine.bindings.len(), 1);
        assert_eq!(engine.lookup(&name), Some(b));
    }

    #[test]
    fn compaction_preserves_binding_pretty_prints() {
        let mut engine = Engine::new(0);
        let x = Symbol::source(engine.intern("x"));
        let var_x = engine.arena.mk_var(x.clone());
        let kept_body = engine.arena.mk_fun(x, var_x);
        let id_name = Symbol::source(engine.interner.intern("id"));
        engine.bind(id_name, kept_body);
        let before = pretty::print(&engine.arena, kept_body);
        for i in 0..10 {
            let dead_sym = Symbol::source(engine.interner.intern(&format!("dead{}", i)));
            engine.arena.mk_var(dead_sym);
        }
        engine.collect(std::iter::empty());
        assert!(engine.should_compact());
        engine.compact();
        let after_idx = *engine.bindings.values().next().unwrap();
        assert_eq!(pretty::print(&engine.arena, after_idx), before);
        assert_eq!(engine.arena.len(), engine.arena.live_count());
    }
}
