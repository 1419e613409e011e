use indexmap::IndexMap;
use rand::Rng;

use crate::engine::{Engine, StepResult};
use crate::expr::ExprIdx;
use crate::generator;
use crate::pretty;
use crate::reduce::{self, Outcome};

/// Tunable knobs for a gas-reactor run.
#[derive(Debug, Clone)]
pub struct GasConfig {
    pub depth: usize,
    pub step_limit: usize,
    pub mass_limit: usize,
    /// Invoke GC every this many iterations.
    pub gc_every: usize,
    /// Snapshot population statistics every this many iterations.
    pub stats_every: usize,
}

impl Default for GasConfig {
    fn default() -> Self {
        GasConfig { depth: 3, step_limit: 100, mass_limit: 3_000, gc_every: 50, stats_every: 1_000 }
    }
}

/// One row of the gas time-series CSV:
/// `step,unique_count,entropy,top_freq`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GasRow {
    pub step: usize,
    pub unique_count: usize,
    pub entropy: f64,
    pub top_freq: usize,
}

/// A well-mixed pool of `N` expression indices.
pub struct GasReactor {
    pub pool: Vec<ExprIdx>,
    pub config: GasConfig,
    pub iteration: usize,
    pub converged: usize,
    pub rows: Vec<GasRow>,
}

impl GasReactor {
    pub fn new(config: GasConfig) -> Self {
        GasReactor { pool: Vec::new(), config, iteration: 0, converged: 0, rows: Vec::new() }
    }

    /// Fills the pool with `n` freshly generated closed combinators.
    pub fn seed(&mut self, engine: &mut Engine, n: usize) {
        self.pool.clear();
        self.pool.reserve(n);
        for _ in 0..n {
            let atom = generator::generate_closed(&mut engine.arena, &mut engine.interner, &mut engine.rng, self.config.depth);
            self.pool.push(atom);
        }
    }

    /// Species identity for gas statistics is the pretty-printed string
    /// *including* α-tags, unlike `analyser`'s tag-blind structural hash
    /// used for grid export — the two reactors define "species"
    /// differently and both definitions are taken literally.
    fn snapshot(&self, engine: &Engine) -> GasRow {
        let mut counts: IndexMap<String, usize> = IndexMap::new();
        for &idx in &self.pool {
            let key = pretty::print(&engine.arena, idx);
            *counts.entry(key).or_insert(0) += 1;
        }
        let total = self.pool.len() as f64;
        let entropy = if total == 0.0 {
            0.0
        } else {
            -counts.values().map(|&c| { let p = c as f64 / total; p * p.ln() }).sum::<f64>()
        };
        let top_freq = counts.values().copied().max().unwrap_or(0);
        GasRow { step: self.iteration, unique_count: counts.len(), entropy, top_freq }
    }

    /// Runs one iteration: draw a colliding pair, reduce their
    /// application, and dispose of the outcome, then the periodic
    /// GC/stats bookkeeping.
    pub fn step(&mut self, engine: &mut Engine) -> StepResult {
        let n = self.pool.len();
        assert!(n > 0, "gas pool must be seeded before stepping");
        let i = engine.rng.gen_range(0..n);
        let j = engine.rng.gen_range(0..n);
        let app = engine.arena.mk_app(self.pool[i], self.pool[j]);
        let (outcome, _err) =
            reduce::eval_bounded(&mut engine.arena, app, self.config.step_limit, self.config.mass_limit, Some(&engine.cancel));
        match outcome {
            Outcome::Cancelled => return StepResult::Cancelled,
            Outcome::Done(x) => {
                let k = engine.rng.gen_range(0..n);
                self.pool[k] = x;
                self.converged += 1;
            }
            Outcome::Limit => {
                self.pool[i] =
                    generator::generate_closed(&mut engine.arena, &mut engine.interner, &mut engine.rng, self.config.depth);
            }
            Outcome::Error => {
                self.pool[i] =
                    generator::generate_closed(&mut engine.arena, &mut engine.interner, &mut engine.rng, self.config.depth);
                self.pool[j] =
                    generator::generate_closed(&mut engine.arena, &mut engine.interner, &mut engine.rng, self.config.depth);
            }
        }
        self.iteration += 1;
        if self.iteration % self.config.gc_every == 0 {
            engine.collect(self.pool.iter().copied());
        }
        if self.iteration % self.config.stats_every == 0 {
            let row = self.snapshot(engine);
            self.rows.push(row);
        }
        StepResult::Continued
    }

    /// Runs up to `iterations` steps, stopping early on cancellation.
    pub fn run(&mut self, engine: &mut Engine, iterations: usize) {
        for _ in 0..iterations {
            if self.step(engine) == StepResult::Cancelled {
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Engine;
    use crate::symbol::Symbol;

    fn identical_pool(engine: &mut Engine, n: usize) -> GasReactor {
        let x = Symbol::source(engine.intern("x"));
        let var_x = engine.arena.mk_var(x.clone());
        let id = engine.arena.mk_fun(x, var_x);
        let mut reactor = GasReactor::new(GasConfig::default());
        reactor.pool = vec![id; n];
        reactor
    }

    #[test]
    fn identical_identity_pool_stays_uniform_and_converged() {
        let mut engine = Engine::new(0);
        let mut reactor = identical_pool(&mut engine, 100);
        reactor.run(&mut engine, 2_000);
        assert_eq!(reactor.pool.len(), 100);
        assert_eq!(reactor.converged, 2_000);
        let row = reactor.snapshot(&engine);
        assert_eq!(row.unique_count, 1);
    }

    #[test]
    fn seeding_fills_pool_with_closed_combinators() {
        let mut engine = Engine::new(1);
        let mut reactor = GasReactor::new(GasConfig::default());
        reactor.seed(&mut engine, 20);
        assert_eq!(reactor.pool.len(), 20);
    }

    #[test]
    fn unknown_magic_error_replaces_both_slots() {
        let mut engine = Engine::new(2);
        let mut reactor = GasReactor::new(GasConfig::default());
        let bogus =
            crate::parser::parse_expr_str(&mut engine.arena, &mut engine.interner, "#bogus x", "test").unwrap();
        let before_pool_len = 2;
        reactor.pool = vec![bogus, bogus];
        reactor.step(&mut engine);
        assert_eq!(reactor.pool.len(), before_pool_len);
        // The App(#bogus x, #bogus x) immediately errors on both slots;
        // both must have been replaced with freshly generated seeds, so
        // neither slot is the original bogus expression anymore.
        assert_ne!(reactor.pool[0], bogus);
        assert_ne!(reactor.pool[1], bogus);
    }
}
