#![forbid(unsafe_code)]

use structopt::StructOpt;

use crate::cli::Opt;

pub mod analyser;
pub mod cli;
pub mod engine;
pub mod errors;
pub mod expr;
pub mod gas;
pub mod gc;
pub mod generator;
pub mod grid;
pub mod parser;
pub mod persistence;
pub mod pretty;
pub mod reduce;
pub mod subst;
pub mod symbol;

#[cfg(feature = "mimalloc")]
#[global_allocator]
static GLOBAL: mimallocator::Mimalloc = mimallocator::Mimalloc;

fn main() {
    let opt = Opt::from_args();

    if opt.debug {
        println!("CLI returned these arguments: {:#?}", opt);
    }

    match opt.mode.as_str() {
        "gas" => cli::run_gas(&opt),
        "grid" => cli::run_grid(&opt),
        other => eprintln!("ERROR: unknown mode '{}' (expected 'gas' or 'grid')", other),
    }
}
