use std::fs::{read_to_string, write};
use std::path::PathBuf;

use structopt::StructOpt;

use crate::engine::{Engine, EngineConfig};
use crate::gas::{GasConfig, GasReactor};
use crate::grid::{Grid, GridConfig};
use crate::persistence;

/// Batch, non-interactive CLI: a `structopt`-derived option struct and
/// direct `println!` status lines, no REPL.
#[derive(StructOpt, Debug)]
#[structopt(raw(setting = "structopt::clap::AppSettings::ColoredHelp"))]
#[structopt(name = "lamb", about = "prebiotic lambda-calculus chemistry simulator", version = "0.1.0")]
pub struct Opt {
    #[structopt(short = "d", long = "debug")]
    pub debug: bool,

    /// Which reactor to run: "gas" (well-mixed pool) or "grid" (toroidal
    /// lattice).
    #[structopt(short = "m", long = "mode", default_value = "gas")]
    pub mode: String,

    /// PRNG seed; two runs with the same seed and configuration produce
    /// identical trajectories.
    #[structopt(long = "seed", default_value = "0")]
    pub seed: u64,

    #[structopt(long = "pool-size", default_value = "100")]
    pub pool_size: usize,

    #[structopt(long = "iterations", default_value = "10000")]
    pub iterations: usize,

    /// Max generator depth; falls back to the mode's default (3 for gas,
    /// 5 for grid) when left at 0.
    #[structopt(long = "depth", default_value = "0")]
    pub depth: usize,

    #[structopt(long = "steps", default_value = "100")]
    pub steps: usize,

    #[structopt(long = "max-mass", default_value = "3000")]
    pub max_mass: usize,

    #[structopt(long = "width", default_value = "20")]
    pub width: usize,

    #[structopt(long = "height", default_value = "20")]
    pub height: usize,

    #[structopt(long = "density", default_value = "30")]
    pub density_pct: u8,

    #[structopt(long = "max-age", default_value = "75")]
    pub max_age: u32,

    #[structopt(long = "cosmic-rate", default_value = "5.0")]
    pub cosmic_ray_rate: f64,

    /// Optional bindings file loaded into the engine before the reactor
    /// runs.
    #[structopt(long = "bindings", parse(from_os_str))]
    pub bindings: Option<PathBuf>,

    /// Where to write the CSV time-series log, if anywhere.
    #[structopt(long = "csv-out", parse(from_os_str))]
    pub csv_out: Option<PathBuf>,
}

impl Opt {
    pub fn engine_config(&self) -> EngineConfig {
        let mut config = EngineConfig {
            pool_size: self.pool_size,
            iterations: self.iterations,
            steps: self.steps,
            max_mass: self.max_mass,
            width: self.width,
            height: self.height,
            density_pct: self.density_pct,
            max_age: self.max_age,
            cosmic_ray_rate: self.cosmic_ray_rate,
            ..EngineConfig::default()
        };
        if self.depth > 0 {
            config.gas_depth = self.depth;
            config.grid_depth = self.depth;
        }
        config
    }
}

fn try_read_cwd(path: &PathBuf) -> std::io::Result<String> {
    match std::env::current_dir() {
        Err(_) => read_to_string(path),
        Ok(mut cwd) => {
            cwd.push(path);
            read_to_string(cwd).or_else(|_| read_to_string(path))
        }
    }
}

/// Loads `--bindings` (if given) into the engine's binding table.
/// Re-binding an existing name overwrites its body.
fn load_bindings_option(engine: &mut Engine, opt: &Opt) {
    let Some(path) = &opt.bindings else { return };
    match try_read_cwd(path) {
        Err(e) => eprintln!("ERROR: could not read {}: {}", path.display(), e),
        Ok(src) => {
            let file = path.to_string_lossy().into_owned();
            match crate::parser::parse_bindings(&mut engine.arena, &mut engine.interner, &src, &file) {
                Err(e) => eprintln!("ERROR: {}", e),
                Ok(bindings) => {
                    for (name, body) in bindings {
                        engine.bind(name, body);
                    }
                }
            }
        }
    }
}

/// Runs the gas reactor for `opt.iterations` iterations and prints a
/// summary line, writing the CSV time series to `--csv-out` if given.
pub fn run_gas(opt: &Opt) {
    let mut engine = Engine::new(opt.seed);
    load_bindings_option(&mut engine, opt);
    let config = opt.engine_config();
    let gas_config =
        GasConfig { depth: config.gas_depth, step_limit: config.steps, mass_limit: config.max_mass, ..GasConfig::default() };
    let mut reactor = GasReactor::new(gas_config);
    reactor.seed(&mut engine, config.pool_size);
    reactor.run(&mut engine, config.iterations);

    println!(
        "gas: {} iterations, {} converged, pool size {}",
        reactor.iteration,
        reactor.converged,
        reactor.pool.len()
    );

    if let Some(path) = &opt.csv_out {
        let mut csv = persistence::gas_csv_header().to_string();
        for row in &reactor.rows {
            csv.push_str(&persistence::gas_csv_row(row));
        }
        if let Err(e) = write(path, csv) {
            eprintln!("ERROR: could not write {}: {}", path.display(), e);
        }
    }
}

/// Runs the grid reactor for `opt.iterations` steps and prints a summary
/// line, writing the CSV time series to `--csv-out` if given.
pub fn run_grid(opt: &Opt) {
    let mut engine = Engine::new(opt.seed);
    load_bindings_option(&mut engine, opt);
    let config = opt.engine_config();
    let grid_config = GridConfig {
        width: config.width,
        height: config.height,
        depth: config.grid_depth,
        step_limit: config.steps,
        mass_limit: config.max_mass,
        max_age: config.max_age,
        cosmic_ray_rate: config.cosmic_ray_rate,
        ..GridConfig::default()
    };
    let mut grid = Grid::new(grid_config);
    grid.seed(&mut engine, config.density_pct);

    let mut csv = persistence::grid_csv_header().to_string();
    for _ in 0..config.iterations {
        if grid.step(&mut engine) == crate::engine::StepResult::Cancelled {
            break;
        }
        if opt.csv_out.is_some() {
            let species = grid.species_histogram(&engine).species_count();
            let row = persistence::GridRow {
                step: grid.steps,
                population: grid.population(),
                unique_species: species,
                reactions_success: grid.reactions_success,
                reactions_diverged: grid.reactions_diverged,
                movements: grid.movements,
                deaths_age: grid.deaths_age,
                cosmic_spawns: grid.cosmic_spawns,
            };
            csv.push_str(&persistence::grid_csv_row(&row));
        }
    }

    println!(
        "grid: {} steps, population {}, reactions {}/{} (ok/diverged), {} deaths, {} cosmic spawns",
        grid.steps,
        grid.population(),
        grid.reactions_success,
        grid.reactions_diverged,
        grid.deaths_age,
        grid.cosmic_spawns
    );

    if let Some(path) = &opt.csv_out {
        if let Err(e) = write(path, csv) {
            eprintln!("ERROR: could not write {}: {}", path.display(), e);
        }
    }
}
