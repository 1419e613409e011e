use rand::Rng;

use crate::expr::{Arena, ExprIdx, ExprKind::*};
use crate::symbol::{Interner, Symbol};

/// Number of retries the seeding helpers spend trying to avoid handing
/// back the pure identity function as a trivial seed.
pub const IDENTITY_RETRIES: usize = 8;

/// Builds the one-node-deep identity function used both as the
/// max-depth/empty-env fallback and as the thing retries try to avoid.
fn identity_fun(arena: &mut Arena, interner: &mut Interner) -> ExprIdx {
    let sym = Symbol::source(interner.intern("v0"));
    let body = arena.mk_var(sym.clone());
    arena.mk_fun(sym, body)
}

/// True iff `idx` is exactly `\v.v` for some single parameter `v` — the
/// trivial "pure identity" seed worth retrying away from.
fn is_pure_identity(arena: &Arena, idx: ExprIdx) -> bool {
    match arena.get(idx) {
        Fun { param, body } => matches!(arena.get(*body), Var(v) if v == param),
        _ => false,
    }
}

/// Samples one closed expression of maximum depth `max_depth` in
/// environment `env` of currently-bound parameter names. `env` is
/// threaded in and out so the caller sees the final binder set
/// only as a byproduct of recursion — each `Abs` branch pushes its fresh
/// name before recursing and pops it back off on the way out, so the
/// environment a sibling call sees is exactly the chain of binders
/// enclosing it, never a cousin's.
pub fn generate(
    arena: &mut Arena,
    interner: &mut Interner,
    rng: &mut impl Rng,
    depth: usize,
    max_depth: usize,
    env: &mut Vec<Symbol>,
) -> ExprIdx {
    if depth == max_depth {
        return match pick(rng, env) {
            Some(v) => arena.mk_var(v),
            None => identity_fun(arena, interner),
        };
    }
    if env.is_empty() {
        return abstraction(arena, interner, rng, depth, max_depth, env);
    }
    let r = rng.gen_range(0..100);
    if depth < max_depth / 3 {
        // Force-growth phase: 60% App, 40% Abs. These are explicit
        // threshold comparisons, not derived from a normalized
        // probability table — don't try to "fix" them to sum neatly.
        if r < 60 {
            application(arena, interner, rng, depth, max_depth, env)
        } else {
            abstraction(arena, interner, rng, depth, max_depth, env)
        }
    } else if r < 50 {
        application(arena, interner, rng, depth, max_depth, env)
    } else if r < 80 {
        abstraction(arena, interner, rng, depth, max_depth, env)
    } else {
        let v = pick(rng, env).expect("env checked nonempty above");
        arena.mk_var(v)
    }
}

fn pick(rng: &mut impl Rng, env: &[Symbol]) -> Option<Symbol> {
    if env.is_empty() {
        None
    } else {
        Some(env[rng.gen_range(0..env.len())].clone())
    }
}

fn application(
    arena: &mut Arena,
    interner: &mut Interner,
    rng: &mut impl Rng,
    depth: usize,
    max_depth: usize,
    env: &mut Vec<Symbol>,
) -> ExprIdx {
    let lhs = generate(arena, interner, rng, depth + 1, max_depth, env);
    let rhs = generate(arena, interner, rng, depth + 1, max_depth, env);
    arena.mk_app(lhs, rhs)
}

fn abstraction(
    arena: &mut Arena,
    interner: &mut Interner,
    rng: &mut impl Rng,
    depth: usize,
    max_depth: usize,
    env: &mut Vec<Symbol>,
) -> ExprIdx {
    let name = format!("v{}", env.len());
    let sym = Symbol::source(interner.intern(&name));
    env.push(sym.clone());
    let body = generate(arena, interner, rng, depth + 1, max_depth, env);
    env.pop();
    arena.mk_fun(sym, body)
}

/// Samples a closed combinator of maximum depth `max_depth`, retrying up
/// to `IDENTITY_RETRIES` times if the result is the pure identity
/// function. Returns the last attempt if every retry still lands on the
/// identity.
pub fn generate_closed(
    arena: &mut Arena,
    interner: &mut Interner,
    rng: &mut impl Rng,
    max_depth: usize,
) -> ExprIdx {
    let mut last = None;
    for _ in 0..=IDENTITY_RETRIES {
        let mut env = Vec::new();
        let e = generate(arena, interner, rng, 0, max_depth, &mut env);
        if !is_pure_identity(arena, e) {
            return e;
        }
        last = Some(e);
    }
    last.expect("loop runs at least once")
}
