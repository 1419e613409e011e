use crate::expr::{Arena, ExprIdx, ExprKind::*};
use crate::symbol::Symbol;

const RED_ZONE: usize = 32 * 1024;
const STACK_SIZE: usize = 1024 * 1024;

/// `free_in(v, e)`: true iff `v` appears as a `Var` outside the scope of
/// any `Fun` whose parameter equals `v`. `Magic` nodes contain no free
/// variables.
pub fn free_in(arena: &Arena, v: &Symbol, e: ExprIdx) -> bool {
    stacker::maybe_grow(RED_ZONE, STACK_SIZE, || match arena.get(e) {
        Var(sym) => sym == v,
        Magic(_) => false,
        Fun { param, body } => {
            if param == v {
                false
            } else {
                free_in(arena, v, *body)
            }
        }
        App { lhs, rhs } => free_in(arena, v, *lhs) || free_in(arena, v, *rhs),
    })
}

/// Capture-avoiding substitution: `subst(param, body, arg)` replaces
/// free occurrences of `param` in `body` with `arg`, α-renaming on
/// demand whenever `arg` would otherwise capture a binder.
pub fn subst(arena: &mut Arena, param: &Symbol, body: ExprIdx, arg: ExprIdx) -> ExprIdx {
    stacker::maybe_grow(RED_ZONE, STACK_SIZE, || match arena.get(body).clone() {
        Magic(_) => body,
        Var(sym) => {
            if &sym == param {
                arg
            } else {
                body
            }
        }
        Fun { param: p, body: b } => {
            if &p == param {
                // The parameter shadows `param`; nothing under this
                // binder can reference the outer `param`.
                body
            } else if !free_in(arena, &p, arg) {
                let new_b = subst(arena, param, b, arg);
                arena.mk_fun(p, new_b)
            } else {
                // `p` is free in `arg`: α-rename `p` to a fresh symbol
                // first, then substitute, so `arg`'s occurrences of `p`
                // can't be captured by this binder.
                let fresh_p = p.fresh();
                let fresh_var = arena.mk_var(fresh_p.clone());
                let renamed_b = subst(arena, &p, b, fresh_var);
                let new_b = subst(arena, param, renamed_b, arg);
                arena.mk_fun(fresh_p, new_b)
            }
        }
        App { lhs, rhs } => {
            let new_lhs = subst(arena, param, lhs, arg);
            let new_rhs = subst(arena, param, rhs, arg);
            arena.mk_app(new_lhs, new_rhs)
        }
    })
}
