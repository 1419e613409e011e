use crate::errors::{LambErr, LambResult};
use crate::expr::{Arena, ExprIdx};
use crate::symbol::{Interner, Symbol};

/// Lexical tokens. `//` runs to end-of-line as a comment and produces
/// no token.
#[derive(Debug, Clone, PartialEq)]
enum Tok {
    LParen,
    RParen,
    Backslash,
    Dot,
    Colon,
    Semi,
    Eq,
    Name(String),
    Magic(String),
    End,
}

fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn is_name_start(c: char) -> bool {
    is_name_char(c)
}

fn parse_err(file: &str, row: usize, col: usize, msg: impl Into<String>) -> LambErr {
    LambErr::Parse { file: file.to_string(), row, col, msg: msg.into() }
}

/// Scans `src` into a flat token stream, one entry per token plus a
/// trailing `End`, each carrying the 1-based row/col it started at.
fn lex(src: &str, file: &str) -> LambResult<Vec<(Tok, usize, usize)>> {
    let chars: Vec<char> = src.chars().collect();
    let mut toks = Vec::new();
    let mut i = 0;
    let mut row = 1;
    let mut col = 1;

    while i < chars.len() {
        let c = chars[i];
        let (start_row, start_col) = (row, col);
        match c {
            ' ' | '\t' | '\r' => {
                i += 1;
                col += 1;
            }
            '\n' => {
                i += 1;
                row += 1;
                col = 1;
            }
            '/' if chars.get(i + 1) == Some(&'/') => {
                while i < chars.len() && chars[i] != '\n' {
                    i += 1;
                    col += 1;
                }
            }
            '(' => {
                toks.push((Tok::LParen, start_row, start_col));
                i += 1;
                col += 1;
            }
            ')' => {
                toks.push((Tok::RParen, start_row, start_col));
                i += 1;
                col += 1;
            }
            '\\' => {
                toks.push((Tok::Backslash, start_row, start_col));
                i += 1;
                col += 1;
            }
            '.' => {
                toks.push((Tok::Dot, start_row, start_col));
                i += 1;
                col += 1;
            }
            ':' => {
                toks.push((Tok::Colon, start_row, start_col));
                i += 1;
                col += 1;
            }
            ';' => {
                toks.push((Tok::Semi, start_row, start_col));
                i += 1;
                col += 1;
            }
            '=' => {
                toks.push((Tok::Eq, start_row, start_col));
                i += 1;
                col += 1;
            }
            '#' => {
                i += 1;
                col += 1;
                let start = i;
                while i < chars.len() && is_name_char(chars[i]) {
                    i += 1;
                    col += 1;
                }
                if i == start {
                    return Err(parse_err(file, start_row, start_col, "expected a name after '#'"));
                }
                let name: String = chars[start..i].iter().collect();
                toks.push((Tok::Magic(name), start_row, start_col));
            }
            c if is_name_start(c) => {
                let start = i;
                while i < chars.len() && is_name_char(chars[i]) {
                    i += 1;
                    col += 1;
                }
                let name: String = chars[start..i].iter().collect();
                toks.push((Tok::Name(name), start_row, start_col));
            }
            other => {
                return Err(parse_err(file, start_row, start_col, format!("unexpected character '{}'", other)));
            }
        }
    }
    toks.push((Tok::End, row, col));
    Ok(toks)
}

struct Parser<'a> {
    toks: Vec<(Tok, usize, usize)>,
    pos: usize,
    file: String,
    arena: &'a mut Arena,
    interner: &'a mut Interner,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> &(Tok, usize, usize) {
        &self.toks[self.pos]
    }

    fn bump(&mut self) -> Tok {
        let tok = self.toks[self.pos].0.clone();
        if self.pos + 1 < self.toks.len() {
            self.pos += 1;
        }
        tok
    }

    fn err(&self, msg: impl Into<String>) -> LambErr {
        let (_, row, col) = *self.peek();
        parse_err(&self.file, row, col, msg)
    }

    fn expect(&mut self, want: &Tok, what: &str) -> LambResult<()> {
        if &self.peek().0 == want {
            self.bump();
            Ok(())
        } else {
            Err(self.err(format!("expected {}", what)))
        }
    }

    fn expect_name(&mut self) -> LambResult<String> {
        match self.peek().0.clone() {
            Tok::Name(n) => {
                self.bump();
                Ok(n)
            }
            _ => Err(self.err("expected a name")),
        }
    }

    fn at_atom_start(&self) -> bool {
        matches!(self.peek().0, Tok::LParen | Tok::Backslash | Tok::Name(_) | Tok::Magic(_))
    }

    /// `app := atom+`, left-associative.
    fn parse_app(&mut self) -> LambResult<ExprIdx> {
        let mut e = self.parse_atom()?;
        while self.at_atom_start() {
            let rhs = self.parse_atom()?;
            e = self.arena.mk_app(e, rhs);
        }
        Ok(e)
    }

    fn parse_atom(&mut self) -> LambResult<ExprIdx> {
        match self.peek().0.clone() {
            Tok::Name(n) => {
                self.bump();
                let sym = Symbol::source(self.interner.intern(&n));
                Ok(self.arena.mk_var(sym))
            }
            Tok::Magic(n) => {
                self.bump();
                let label = self.interner.intern(&n);
                Ok(self.arena.mk_magic(label))
            }
            Tok::LParen => {
                self.bump();
                let e = self.parse_app()?;
                self.expect(&Tok::RParen, "')'")?;
                Ok(e)
            }
            Tok::Backslash => self.parse_fun(),
            _ => Err(self.err("expected an expression")),
        }
    }

    /// `\ NAME ('.' NAME)* '.' expr`: one backslash governs a whole chain
    /// of curried parameters, desugared here into nested `Fun` nodes,
    /// innermost last.
    fn parse_fun(&mut self) -> LambResult<ExprIdx> {
        self.expect(&Tok::Backslash, "'\\'")?;
        let mut params = vec![self.expect_name()?];
        self.expect(&Tok::Dot, "'.'")?;
        loop {
            let more = matches!(
                (&self.peek().0, self.toks.get(self.pos + 1).map(|t| &t.0)),
                (Tok::Name(_), Some(Tok::Dot))
            );
            if !more {
                break;
            }
            params.push(self.expect_name()?);
            self.expect(&Tok::Dot, "'.'")?;
        }
        let body = self.parse_app()?;
        let mut result = body;
        for p in params.into_iter().rev() {
            let sym = Symbol::source(self.interner.intern(&p));
            result = self.arena.mk_fun(sym, result);
        }
        Ok(result)
    }
}

/// Parses a single expression from `src`, requiring the whole input to
/// be consumed.
pub fn parse_expr_str(arena: &mut Arena, interner: &mut Interner, src: &str, file: &str) -> LambResult<ExprIdx> {
    let toks = lex(src, file)?;
    let mut p = Parser { toks, pos: 0, file: file.to_string(), arena, interner };
    let e = p.parse_app()?;
    p.expect(&Tok::End, "end of input")?;
    Ok(e)
}

/// Parses a bindings file: `file := (NAME '=' expr ';')*`.
/// Bindings are returned in source order; later entries may reference
/// earlier ones once the caller installs each into the engine's binding
/// table before parsing the next.
pub fn parse_bindings(arena: &mut Arena, interner: &mut Interner, src: &str, file: &str) -> LambResult<Vec<(Symbol, ExprIdx)>> {
    let toks = lex(src, file)?;
    let mut p = Parser { toks, pos: 0, file: file.to_string(), arena, interner };
    let mut out = Vec::new();
    while p.peek().0 != Tok::End {
        let name = p.expect_name()?;
        p.expect(&Tok::Eq, "'='")?;
        let body = p.parse_app()?;
        p.expect(&Tok::Semi, "';'")?;
        let sym = Symbol::source(p.interner.intern(&name));
        out.push((sym, body));
    }
    Ok(out)
}
