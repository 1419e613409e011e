use crate::expr::{Arena, ExprIdx, ExprKind::*};
use crate::symbol::Symbol;

/// Where in the surrounding expression a subterm is being printed.
/// Controls parenthesization: a `Fun` needs parens whenever it isn't
/// already the whole expression; an `App` needs parens only when it
/// sits in argument position of another `App`.
#[derive(Clone, Copy, PartialEq, Eq)]
enum Ctx {
    Top,
    AppLhs,
    AppRhs,
}

fn fmt_symbol(sym: &Symbol, tagged: bool) -> String {
    if tagged && sym.is_fresh() {
        format!("{}:{}", sym.label, sym.tag)
    } else {
        sym.label.to_string()
    }
}

fn print_rec(arena: &Arena, idx: ExprIdx, tagged: bool, ctx: Ctx) -> String {
    match arena.get(idx) {
        Var(sym) => fmt_symbol(sym, tagged),
        Magic(label) => format!("#{}", label),
        Fun { .. } => {
            // Curried lambdas are printed with a single backslash and one
            // dot per parameter, e.g. `\f.x.f (f x)`.
            let mut params = Vec::new();
            let mut cur = idx;
            while let Fun { param, body } = arena.get(cur) {
                params.push(fmt_symbol(param, tagged));
                cur = *body;
            }
            let body = print_rec(arena, cur, tagged, Ctx::Top);
            let inner = format!("\\{}.{}", params.join("."), body);
            if ctx == Ctx::Top {
                inner
            } else {
                format!("({})", inner)
            }
        }
        App { lhs, rhs } => {
            let lhs_str = print_rec(arena, *lhs, tagged, Ctx::AppLhs);
            let rhs_str = print_rec(arena, *rhs, tagged, Ctx::AppRhs);
            let inner = format!("{} {}", lhs_str, rhs_str);
            if ctx == Ctx::AppRhs {
                format!("({})", inner)
            } else {
                inner
            }
        }
    }
}

/// Prints `idx`, showing fresh-rename tags (`x:3`) so α-renamed binders
/// stay distinguishable from source-level ones.
pub fn print(arena: &Arena, idx: ExprIdx) -> String {
    print_rec(arena, idx, true, Ctx::Top)
}

/// Prints `idx` the way a user who never typed a fresh-tagged name would
/// expect to read it back: fresh tags are suppressed. Distinct fresh
/// copies of the same source label become indistinguishable in this
/// mode — that's the intended, lossy, human-facing rendering.
pub fn print_no_tags(arena: &Arena, idx: ExprIdx) -> String {
    print_rec(arena, idx, false, Ctx::Top)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbol::Interner;

    #[test]
    fn var_prints_bare_label() {
        let mut arena = Arena::new();
        let mut interner = Interner::new();
        let x = Symbol::source(interner.intern("x"));
        let v = arena.mk_var(x);
        assert_eq!(print(&arena, v), "x");
    }

    #[test]
    fn magic_prints_with_hash_prefix() {
        let mut arena = Arena::new();
        let m = arena.mk_magic("void".into());
        assert_eq!(print(&arena, m), "#void");
    }

    #[test]
    fn curried_lambda_collapses_dots() {
        let mut arena = Arena::new();
        let mut interner = Interner::new();
        let f = Symbol::source(interner.intern("f"));
        let x = Symbol::source(interner.intern("x"));
        let body = arena.mk_var(x.clone());
        let inner = arena.mk_fun(x, body);
        let outer = arena.mk_fun(f, inner);
        assert_eq!(print(&arena, outer), r"\f.x.x");
    }

    #[test]
    fn fun_as_app_argument_is_parenthesized() {
        let mut arena = Arena::new();
        let mut interner = Interner::new();
        let x = Symbol::source(interner.intern("x"));
        let y = Symbol::source(interner.intern("y"));
        let id = arena.mk_fun(x.clone(), arena.mk_var(x));
        let yv = arena.mk_var(y.clone());
        let app = arena.mk_app(yv, id);
        assert_eq!(print(&arena, app), r"y (\x.x)");
    }

    #[test]
    fn nested_app_in_argument_position_is_parenthesized() {
        let mut arena = Arena::new();
        let mut interner = Interner::new();
        let a = Symbol::source(interner.intern("a"));
        let b = Symbol::source(interner.intern("b"));
        let c = Symbol::source(interner.intern("c"));
        let av = arena.mk_var(a);
        let bv = arena.mk_var(b);
        let cv = arena.mk_var(c);
        let bc = arena.mk_app(bv, cv);
        let abc = arena.mk_app(av, bc);
        assert_eq!(print(&arena, abc), "a (b c)");
    }

    #[test]
    fn no_tags_mode_hides_fresh_suffix() {
        let mut arena = Arena::new();
        let mut interner = Interner::new();
        let x = Symbol::source(interner.intern("x"));
        let fresh = x.fresh();
        let v = arena.mk_var(fresh);
        assert_eq!(print_no_tags(&arena, v), "x");
    }
}
