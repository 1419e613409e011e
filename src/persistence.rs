use std::fmt::Write as _;

use serde::Serialize;

use crate::engine::Engine;
use crate::errors::{LambErr, LambResult};
use crate::expr::ExprIdx;
use crate::gas::GasRow;
use crate::parser;
use crate::pretty;

/// Renders a well-mixed pool as a `LAMB_SOUP_V1` snapshot. Metadata
/// comments are informational only — reloading a soup file goes
/// through the ordinary bindings parser, which ignores `//` comments.
pub fn write_gas_soup(engine: &Engine, pool: &[ExprIdx], step: usize) -> String {
    let mut out = String::new();
    writeln!(out, "// LAMB_SOUP_V1").unwrap();
    writeln!(out, "// step={}", step).unwrap();
    writeln!(out, "// count={}", pool.len()).unwrap();
    for (i, &idx) in pool.iter().enumerate() {
        writeln!(out, "soup_{} = {} ;", i, pretty::print(&engine.arena, idx)).unwrap();
    }
    out
}

/// Renders a grid snapshot as a `LAMB_GRID_SOUP_V1` file. Empty cells
/// are simply absent — `soup_<i>` indices are the occupied
/// cells' positions, so round-tripping through `load_soup` alone cannot
/// recover cell geometry; callers that need the full grid back reseed an
/// empty grid of the recorded width/height and re-place these atoms.
pub fn write_grid_soup(engine: &Engine, cells: &[(usize, ExprIdx)], width: usize, height: usize, step: usize) -> String {
    let mut out = String::new();
    writeln!(out, "// LAMB_GRID_SOUP_V1").unwrap();
    writeln!(out, "// step={}", step).unwrap();
    writeln!(out, "// width={} height={}", width, height).unwrap();
    for (pos, idx) in cells {
        writeln!(out, "soup_{} = {} ;", pos, pretty::print(&engine.arena, *idx)).unwrap();
    }
    out
}

/// Loads a soup file through the standard bindings parser — metadata
/// comments starting with `//` are skipped by the lexer the same way
/// they are in an ordinary bindings file.
pub fn load_soup(engine: &mut Engine, src: &str, file: &str) -> LambResult<Vec<ExprIdx>> {
    let bindings = parser::parse_bindings(&mut engine.arena, &mut engine.interner, src, file)?;
    Ok(bindings.into_iter().map(|(_, body)| body).collect())
}

/// Appends one gas time-series row in the `step,unique_count,entropy,top_freq`
/// layout.
pub fn gas_csv_row(row: &GasRow) -> String {
    format!("{},{},{},{}\n", row.step, row.unique_count, row.entropy, row.top_freq)
}

pub fn gas_csv_header() -> &'static str {
    "step,unique_count,entropy,top_freq\n"
}

/// One row of the grid time-series CSV:
/// `step,population,unique_species,reactions_success,reactions_diverged,movements,deaths_age,cosmic_spawns`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GridRow {
    pub step: usize,
    pub population: usize,
    pub unique_species: usize,
    pub reactions_success: usize,
    pub reactions_diverged: usize,
    pub movements: usize,
    pub deaths_age: usize,
    pub cosmic_spawns: usize,
}

pub fn grid_csv_header() -> &'static str {
    "step,population,unique_species,reactions_success,reactions_diverged,movements,deaths_age,cosmic_spawns\n"
}

pub fn grid_csv_row(row: &GridRow) -> String {
    format!(
        "{},{},{},{},{},{},{},{}\n",
        row.step,
        row.population,
        row.unique_species,
        row.reactions_success,
        row.reactions_diverged,
        row.movements,
        row.deaths_age,
        row.cosmic_spawns
    )
}

/// Reaction-network JSON export. `result` is the matching species id
/// when `A B` reaches a normal form inside bounds whose hash matches an
/// already-known species, `-1` otherwise.
#[derive(Debug, Clone, Serialize)]
pub struct NetworkNode {
    pub id: u64,
    pub label: String,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct NetworkLink {
    pub source: u64,
    pub target: u64,
    pub result: i64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct NetworkExport {
    pub nodes: Vec<NetworkNode>,
    pub links: Vec<NetworkLink>,
}

pub fn network_to_json(export: &NetworkExport) -> LambResult<String> {
    serde_json::to_string_pretty(export).map_err(|e| LambErr::Io(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Engine;
    use crate::symbol::Symbol;

    #[test]
    fn gas_soup_round_trips_through_the_bindings_parser() {
        let mut engine = Engine::new(0);
        let x = Symbol::source(engine.intern("x"));
        let var_x = engine.arena.mk_var(x.clone());
        let id = engine.arena.mk_fun(x, var_x);
        let text = write_gas_soup(&engine, &[id, id], 42);
        assert!(text.contains("// step=42"));
        assert!(text.contains("// count=2"));
        let loaded = load_soup(&mut engine, &text, "soup.lamb").unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(pretty::print(&engine.arena, loaded[0]), pretty::print(&engine.arena, id));
    }

    #[test]
    fn gas_csv_row_matches_declared_column_order() {
        let row = GasRow { step: 10, unique_count: 3, entropy: 1.5, top_freq: 7 };
        assert_eq!(gas_csv_row(&row), "10,3,1.5,7\n");
    }

    #[test]
    fn grid_csv_row_matches_declared_column_order() {
        let row = GridRow {
            step: 1,
            population: 50,
            unique_species: 4,
            reactions_success: 10,
            reactions_diverged: 2,
            movements: 30,
            deaths_age: 1,
            cosmic_spawns: 0,
        };
        assert_eq!(grid_csv_row(&row), "1,50,4,10,2,30,1,0\n");
    }

    #[test]
    fn network_export_serializes_with_negative_one_sentinel() {
        let export = NetworkExport {
            nodes: vec![NetworkNode { id: 0, label: "x".into(), count: 1 }],
            links: vec![NetworkLink { source: 0, target: 0, result: -1 }],
        };
        let json = network_to_json(&export).unwrap();
        assert!(json.contains("\"result\": -1"));
    }
}
