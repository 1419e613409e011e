use rand::seq::SliceRandom;
use rand::Rng;

use crate::analyser::{self, SpeciesHistogram};
use crate::engine::{Engine, StepResult};
use crate::expr::ExprIdx;
use crate::gc;
use crate::generator;
use crate::reduce::{self, Outcome};

/// Depth used for cosmic-ray spawns, fixed independent of the seeding
/// depth `D`.
const COSMIC_SPAWN_DEPTH: usize = 3;

/// One cell of the toroidal grid. `occupant: Option<ExprIdx>` implements
/// the `(atom, occupied)` pair as a single Rust option rather than two
/// fields carrying redundant information; the cache fields are `None`
/// exactly when `cache_valid` would be false.
#[derive(Clone, Debug, Default)]
pub struct Cell {
    pub occupant: Option<ExprIdx>,
    pub age: u32,
    pub generation: u32,
    cached_hash: Option<u64>,
    cached_mass: Option<usize>,
}

/// Tunable knobs for a grid-reactor run.
#[derive(Debug, Clone)]
pub struct GridConfig {
    pub width: usize,
    pub height: usize,
    /// Seeding depth `D` (default 5 for the grid).
    pub depth: usize,
    pub step_limit: usize,
    pub mass_limit: usize,
    pub max_age: u32,
    /// Spawns per 100,000 empty-cell-steps.
    pub cosmic_ray_rate: f64,
    /// Invoke GC every this many steps.
    pub gc_every: usize,
    /// Consider compaction every this many steps.
    pub compact_every: usize,
    /// Compaction is only considered once the arena holds more slots
    /// than this.
    pub compact_threshold: usize,
}

impl Default for GridConfig {
    fn default() -> Self {
        GridConfig {
            width: 20,
            height: 20,
            depth: 5,
            step_limit: 100,
            mass_limit: 3_000,
            max_age: 75,
            cosmic_ray_rate: 5.0,
            gc_every: 10,
            compact_every: 100,
            compact_threshold: 10_000,
        }
    }
}

/// A toroidal W×H lattice with aging, movement, catalysis, and cosmic-ray
/// spontaneous generation.
pub struct Grid {
    pub width: usize,
    pub height: usize,
    pub cells: Vec<Cell>,
    pub config: GridConfig,
    pub steps: usize,
    pub reactions_success: usize,
    pub reactions_diverged: usize,
    pub movements: usize,
    pub deaths_age: usize,
    pub cosmic_spawns: usize,
}

impl Grid {
    pub fn new(config: GridConfig) -> Self {
        let n = config.width * config.height;
        Grid {
            width: config.width,
            height: config.height,
            cells: vec![Cell::default(); n],
            config,
            steps: 0,
            reactions_success: 0,
            reactions_diverged: 0,
            movements: 0,
            deaths_age: 0,
            cosmic_spawns: 0,
        }
    }

    fn to_xy(&self, idx: usize) -> (usize, usize) {
        (idx % self.width, idx / self.width)
    }

    fn of_xy(&self, x: usize, y: usize) -> usize {
        y * self.width + x
    }

    /// Toroidal cardinal neighbour: coordinates wrap around both edges.
    /// `dir` is one of 0=east, 1=west, 2=south, 3=north.
    fn neighbor(&self, idx: usize, dir: u8) -> usize {
        let (x, y) = self.to_xy(idx);
        let (nx, ny) = match dir {
            0 => ((x + 1) % self.width, y),
            1 => ((x + self.width - 1) % self.width, y),
            2 => (x, (y + 1) % self.height),
            _ => (x, (y + self.height - 1) % self.height),
        };
        self.of_xy(nx, ny)
    }

    pub fn population(&self) -> usize {
        self.cells.iter().filter(|c| c.occupant.is_some()).count()
    }

    /// Places the requested population at random empty cells, each
    /// holding a freshly generated closed combinator of depth `D`.
    pub fn seed(&mut self, engine: &mut Engine, density_pct: u8) {
        let n = self.cells.len();
        let target = n * density_pct as usize / 100;
        let mut order: Vec<usize> = (0..n).collect();
        order.shuffle(&mut engine.rng);
        for &i in order.iter().take(target) {
            let atom =
                generator::generate_closed(&mut engine.arena, &mut engine.interner, &mut engine.rng, self.config.depth);
            self.cells[i] = Cell { occupant: Some(atom), age: 0, generation: 0, cached_hash: None, cached_mass: None };
        }
    }

    fn cached_hash(&mut self, engine: &Engine, idx: usize) -> u64 {
        if let Some(h) = self.cells[idx].cached_hash {
            return h;
        }
        let atom = self.cells[idx].occupant.expect("cached_hash called on an empty cell");
        let h = analyser::structural_hash(&engine.arena, atom);
        self.cells[idx].cached_hash = Some(h);
        h
    }

    #[allow(dead_code)]
    fn cached_mass(&mut self, engine: &Engine, idx: usize) -> usize {
        if let Some(m) = self.cells[idx].cached_mass {
            return m;
        }
        let atom = self.cells[idx].occupant.expect("cached_mass called on an empty cell");
        let m = analyser::mass(&engine.arena, atom);
        self.cells[idx].cached_mass = Some(m);
        m
    }

    /// Species histogram over currently-occupied cells, using each cell's
    /// cache so a repeated call between mutations is free.
    pub fn species_histogram(&mut self, engine: &Engine) -> SpeciesHistogram {
        let mut hist = SpeciesHistogram::new();
        for i in 0..self.cells.len() {
            if self.cells[i].occupant.is_some() {
                let h = self.cached_hash(engine, i);
                hist.observe_hash(h);
            }
        }
        hist
    }

    /// Advances the grid by one step: a Fisher–Yates-shuffled
    /// asynchronous pass over every cell doing aging, cosmic-ray
    /// spawning, and movement/catalysis, followed by the periodic
    /// GC/compaction bookkeeping.
    pub fn step(&mut self, engine: &mut Engine) -> StepResult {
        let n = self.cells.len();
        let mut order: Vec<usize> = (0..n).collect();
        order.shuffle(&mut engine.rng);

        for idx in order {
            if engine.is_cancelled() {
                return StepResult::Cancelled;
            }

            if self.cells[idx].occupant.is_some() {
                self.cells[idx].age += 1;
                if self.cells[idx].age > self.config.max_age {
                    self.cells[idx] = Cell::default();
                    self.deaths_age += 1;
                    continue;
                }
                // Survived aging: fall through to movement/interaction.
            } else {
                let p = self.config.cosmic_ray_rate / 100_000.0;
                if engine.rng.gen::<f64>() < p {
                    let atom = generator::generate_closed(
                        &mut engine.arena,
                        &mut engine.interner,
                        &mut engine.rng,
                        COSMIC_SPAWN_DEPTH,
                    );
                    self.cells[idx] =
                        Cell { occupant: Some(atom), age: 0, generation: 0, cached_hash: None, cached_mass: None };
                    self.cosmic_spawns += 1;
                }
                continue;
            }

            let dir = engine.rng.gen_range(0..4u8);
            let t = self.neighbor(idx, dir);
            if self.cells[t].occupant.is_none() {
                self.cells[t] = self.cells[idx].clone();
                self.cells[idx] = Cell::default();
                self.movements += 1;
                continue;
            }

            let a = self.cells[idx].occupant.expect("checked occupied above");
            let b = self.cells[t].occupant.expect("checked occupied above");
            let app = engine.arena.mk_app(a, b);
            let (outcome, _err) = reduce::eval_bounded(
                &mut engine.arena,
                app,
                self.config.step_limit,
                self.config.mass_limit,
                Some(&engine.cancel),
            );
            match outcome {
                Outcome::Cancelled => return StepResult::Cancelled,
                Outcome::Done(c) => {
                    self.cells[idx].age = 0;
                    let next_gen = self.cells[t].generation + 1;
                    self.cells[t] =
                        Cell { occupant: Some(c), age: 0, generation: next_gen, cached_hash: None, cached_mass: None };
                    self.reactions_success += 1;
                }
                Outcome::Limit | Outcome::Error => {
                    self.cells[t] = Cell::default();
                    self.reactions_diverged += 1;
                }
            }
        }

        self.steps += 1;
        if self.steps % self.config.gc_every == 0 {
            let roots: Vec<ExprIdx> = self.cells.iter().filter_map(|c| c.occupant).collect();
            engine.collect(roots);
        }
        if self.steps % self.config.compact_every == 0 && engine.arena.len() > self.config.compact_threshold {
            let remap = engine.compact();
            for cell in self.cells.iter_mut() {
                if let Some(a) = cell.occupant {
                    cell.occupant = Some(gc::remap_index(&remap, a));
                }
                cell.cached_hash = None;
                cell.cached_mass = None;
            }
        }
        StepResult::Continued
    }

    /// Runs up to `steps` grid steps, stopping early on cancellation.
    pub fn run(&mut self, engine: &mut Engine, steps: usize) {
        for _ in 0..steps {
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

    fn fill_identical(engine: &mut Engine, grid: &mut Grid) {
        let x = Symbol::source(engine.intern("x"));
        let var_x = engine.arena.mk_var(x.clone());
        let id = engine.arena.mk_fun(x, var_x);
        for cell in grid.cells.iter_mut() {
            *cell = Cell { occupant: Some(id), age: 0, generation: 0, cached_hash: None, cached_mass: None };
        }
    }

    #[test]
    fn full_grid_of_identities_dies_of_age_with_no_reactions() {
        let mut engine = Engine::new(5);
        let config = GridConfig { width: 10, height: 10, max_age: 10, cosmic_ray_rate: 0.0, ..GridConfig::default() };
        let mut grid = Grid::new(config);
        fill_identical(&mut engine, &mut grid);
        for _ in 0..11 {
            grid.step(&mut engine);
        }
        assert_eq!(grid.population(), 0);
        assert_eq!(grid.deaths_age, 100);
        assert_eq!(grid.reactions_success, 0);
    }

    #[test]
    fn empty_grid_with_cosmic_rays_spawns_within_expected_band() {
        let mut engine = Engine::new(9);
        // Expected spawns/step = 1 over 400 cells => rate = 100_000/400.
        let config = GridConfig { width: 20, height: 20, cosmic_ray_rate: 250.0, ..GridConfig::default() };
        let mut grid = Grid::new(config);
        grid.run(&mut engine, 1_000);
        assert!(grid.cosmic_spawns >= 800 && grid.cosmic_spawns <= 1_200, "got {}", grid.cosmic_spawns);
    }

    #[test]
    fn seed_respects_requested_density() {
        let mut engine = Engine::new(3);
        let config = GridConfig { width: 10, height: 10, ..GridConfig::default() };
        let mut grid = Grid::new(config);
        grid.seed(&mut engine, 50);
        assert_eq!(grid.population(), 50);
    }

    #[test]
    fn movement_vacates_source_cell() {
        let mut engine = Engine::new(11);
        let config = GridConfig { width: 4, height: 1, cosmic_ray_rate: 0.0, ..GridConfig::default() };
        let mut grid = Grid::new(config);
        let x = Symbol::source(engine.intern("x"));
        let var_x = engine.arena.mk_var(x.clone());
        let id = engine.arena.mk_fun(x, var_x);
        grid.cells[0] = Cell { occupant: Some(id), age: 0, generation: 0, cached_hash: None, cached_mass: None };
        grid.step(&mut engine);
        assert_eq!(grid.population(), 1, "the lone occupant moves but never disappears");
    }
}
