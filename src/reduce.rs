use std::sync::atomic::{AtomicBool, Ordering::Relaxed};

use crate::analyser::mass;
use crate::errors::{LambErr, LambResult};
use crate::expr::{Arena, ExprIdx, ExprKind::*};
use crate::pretty;
use crate::subst::subst;

const RED_ZONE: usize = 32 * 1024;
const STACK_SIZE: usize = 1024 * 1024;

/// Single-step normal-order, outermost-first reducer. Reduction under
/// binders happens before trying to reduce an `App` whose head already
/// reduces — the `Fun` arm always recurses into its body first — which
/// is what gives fully-reduced normal forms inside lambdas, needed for
/// structural hashing later.
///
/// Returns the possibly-new index and whether it differs from the input
/// (`changed` is true exactly when the returned index is not `e`).
pub fn eval1(arena: &mut Arena, e: ExprIdx) -> LambResult<(ExprIdx, bool)> {
    stacker::maybe_grow(RED_ZONE, STACK_SIZE, || match arena.get(e).clone() {
        Var(_) => Ok((e, false)),
        Magic(_) => Ok((e, false)),
        Fun { param, body } => {
            let (new_body, changed) = eval1(arena, body)?;
            if changed {
                Ok((arena.mk_fun(param, new_body), true))
            } else {
                Ok((e, false))
            }
        }
        App { lhs, rhs } => match arena.get(lhs).clone() {
            Fun { param, body } => Ok((subst(arena, &param, body, rhs), true)),
            Magic(label) => dispatch_magic(arena, &label, lhs, rhs),
            _ => {
                let (new_lhs, changed) = eval1(arena, lhs)?;
                if changed {
                    return Ok((arena.mk_app(new_lhs, rhs), true));
                }
                let (new_rhs, changed) = eval1(arena, rhs)?;
                if changed {
                    Ok((arena.mk_app(lhs, new_rhs), true))
                } else {
                    Ok((e, false))
                }
            }
        },
    })
}

/// Magic-operator dispatch. `magic_idx` is the `Magic` node itself (the
/// App's head); `rhs` is its argument.
fn dispatch_magic(arena: &mut Arena, label: &str, magic_idx: ExprIdx, rhs: ExprIdx) -> LambResult<(ExprIdx, bool)> {
    match label {
        "trace" => {
            let (new_rhs, changed) = eval1(arena, rhs)?;
            if changed {
                Ok((arena.mk_app(magic_idx, new_rhs), true))
            } else {
                println!("TRACE: {}", pretty::print(arena, rhs));
                Ok((rhs, true))
            }
        }
        "void" => {
            let (new_rhs, changed) = eval1(arena, rhs)?;
            if changed {
                Ok((arena.mk_app(magic_idx, new_rhs), true))
            } else {
                Ok((magic_idx, true))
            }
        }
        other => Err(LambErr::UnknownMagic(other.to_string())),
    }
}

/// Outcome of a bounded reduction run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Done(ExprIdx),
    Limit,
    Error,
    Cancelled,
}

/// Bounded driver: iterates `eval1` up to `step_limit` times, bailing
/// out early if the mass ceiling is exceeded, `eval1` fails, or the
/// cancellation flag (if any) is observed set.
pub fn eval_bounded(
    arena: &mut Arena,
    start: ExprIdx,
    step_limit: usize,
    mass_limit: usize,
    cancel: Option<&AtomicBool>,
) -> (Outcome, Option<LambErr>) {
    let mut curr = start;
    for _ in 0..step_limit {
        if cancel.map_or(false, |c| c.load(Relaxed)) {
            return (Outcome::Cancelled, None);
        }
        if mass(arena, curr) > mass_limit {
            return (Outcome::Limit, None);
        }
        match eval1(arena, curr) {
            Err(e) => return (Outcome::Error, Some(e)),
            Ok((next, changed)) => {
                if !changed {
                    return (Outcome::Done(curr), None);
                }
                curr = next;
            }
        }
    }
    (Outcome::Limit, None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_expr_str;
    use crate::symbol::Interner;

    fn run(src: &str) -> String {
        let mut arena = Arena::new();
        let mut interner = Interner::new();
        let e = parse_expr_str(&mut arena, &mut interner, src, "test").unwrap();
        let (outcome, err) = eval_bounded(&mut arena, e, 10_000, 100_000, None);
        assert!(err.is_none(), "{:?}", err);
        match outcome {
            Outcome::Done(n) => pretty::print(&arena, n),
            owise => panic!("expected Done, got {:?}", owise),
        }
    }

    #[test]
    fn identity_application() {
        assert_eq!(run(r"(\x.x) y"), "y");
    }

    #[test]
    fn boolean_true_selector() {
        assert_eq!(run(r"(\x.\y.x) a b"), "a");
    }

    #[test]
    fn boolean_false_selector() {
        assert_eq!(run(r"(\x.\y.y) a b"), "b");
    }

    #[test]
    fn alpha_renaming_on_capture() {
        assert_eq!(run(r"(\x.\y.x) y"), r"\y:1.y");
    }

    #[test]
    fn s_combinator_style_reduction() {
        assert_eq!(run(r"(\x.\y.\z.x z (y z)) a b c"), "a c (b c)");
    }

    #[test]
    fn void_discards_normal_form() {
        assert_eq!(run(r"#void (\x.x)"), "#void");
    }

    #[test]
    fn trace_passes_through_normal_form() {
        assert_eq!(run(r"#trace (\z.z)"), r"\z.z");
    }

    #[test]
    fn church_successor_of_one() {
        assert_eq!(
            run(r"(\n.\f.\x.f (n f x)) (\f.\x.f x)"),
            r"\f.x.f (f x)"
        );
    }

    #[test]
    fn unknown_magic_is_an_error() {
        let mut arena = Arena::new();
        let mut interner = Interner::new();
        let e = parse_expr_str(&mut arena, &mut interner, "#bogus x", "test").unwrap();
        let (outcome, err) = eval_bounded(&mut arena, e, 100, 1_000, None);
        assert_eq!(outcome, Outcome::Error);
        assert!(matches!(err, Some(LambErr::UnknownMagic(ref l)) if l == "bogus"));
    }

    #[test]
    fn mass_ceiling_yields_limit() {
        // (\x. x x) (\x. x x) diverges; it should hit the mass ceiling
        // long before any step ceiling would matter.
        let mut arena = Arena::new();
        let mut interner = Interner::new();
        let e = parse_expr_str(&mut arena, &mut interner, r"(\x.x x) (\x.x x)", "test").unwrap();
        let (outcome, err) = eval_bounded(&mut arena, e, 1_000_000, 64, None);
        assert_eq!(outcome, Outcome::Limit);
        assert!(err.is_none());
    }
}
