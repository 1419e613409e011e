use std::fmt::Debug;

/// Errors the core can produce. Nothing in here should ever be reached
/// by `panic!`; adversarial or malformed input is always routed through
/// one of these variants instead.

pub type LambResult<T> = Result<T, LambErr>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LambErr {
    /// Lexer/parser failure, with `file:row:col` and the token kind that
    /// was encountered where something else was expected.
    Parse { file: String, row: usize, col: usize, msg: String },
    /// The reducer hit an `App` whose head is `Magic(label)` for a label
    /// that isn't in the dispatch table.
    UnknownMagic(String),
    /// `eval_bounded` ran out of its step or mass budget without reaching
    /// a normal form.
    BudgetExhausted,
    /// The cooperative cancellation flag was observed set at a poll point.
    Cancelled,
    /// An index into the arena did not refer to a live slot. This should
    /// only ever be reachable via a bug in GC root enumeration, but it is
    /// still routed through `Result` rather than `panic!`.
    DeadSlot(usize),
    /// I/O failure while reading a bindings or soup file.
    Io(String),
}

impl std::fmt::Display for LambErr {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            LambErr::Parse { file, row, col, msg } => {
                write!(f, "{}:{}:{}: {}", file, row, col, msg)
            }
            LambErr::UnknownMagic(label) => write!(f, "ERROR: unknown magic #{}", label),
            LambErr::BudgetExhausted => write!(f, "ERROR: step or mass budget exhausted"),
            LambErr::Cancelled => write!(f, "ERROR: operation cancelled"),
            LambErr::DeadSlot(idx) => write!(f, "ERROR: index {} does not refer to a live slot", idx),
            LambErr::Io(msg) => write!(f, "ERROR: {}", msg),
        }
    }
}

impl std::error::Error for LambErr {}

#[allow(dead_code)]
pub fn unreachable_kind<T: Debug>(loc: &'static str, got: &T) -> ! {
    eprintln!("{}: unreachable expression kind: {:?}", loc, got);
    std::process::exit(-1);
}
