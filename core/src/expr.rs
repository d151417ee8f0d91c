//! Capture-expression language for function templates.
//!
//! A tiny, side-effect free expression language evaluated against the
//! groups of a pattern match. Values are `i64` integers or strings.
//!
//! ```text
//! expr    := term (('+' | '-') term)*
//! term    := unary (('*' | '/' | '%') unary)*
//! unary   := '-' unary | primary
//! primary := INT | STRING | 'm' '[' expr ']' | IDENT '(' args ')' | '(' expr ')'
//! ```
//!
//! Built-ins: `int`, `str`, `len`, `upper`, `lower`, `repeat(s, n[, sep])`
//! and `matrix(rows, cols, diag, off)`.
//!
//! Nesting, expression length and the size of every built string are
//! capped; exceeding a cap is an error, never a crash.

use std::fmt;

use thiserror::Error;

/// Upper bound on `matrix` rows and columns.
pub const MAX_MATRIX_DIM: i64 = 64;
/// Upper bound on `repeat` counts.
pub const MAX_REPEAT: i64 = 1000;
/// Upper bound on the byte length of any string an expression builds.
pub const MAX_OUTPUT_LEN: usize = 64 * 1024;
/// Deepest nesting of parentheses, calls and unary minus.
pub const MAX_DEPTH: usize = 64;
/// Longest expression, in tokens.
pub const MAX_TOKENS: usize = 2048;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExprError {
    #[error("syntax error at {pos}: {message}")]
    Syntax { pos: usize, message: String },
    #[error("unknown function `{0}`")]
    UnknownFunction(String),
    #[error("`{name}` expects {expected} arguments, got {found}")]
    Arity {
        name: String,
        expected: &'static str,
        found: usize,
    },
    #[error("`{op}` needs an integer, got {found:?}")]
    NotAnInteger { op: &'static str, found: String },
    #[error("cannot convert {0:?} to an integer")]
    InvalidInt(String),
    #[error("division by zero")]
    DivisionByZero,
    #[error("integer overflow")]
    Overflow,
    #[error("{what} size {value} is outside 0..={limit}")]
    TooLarge {
        what: &'static str,
        value: i64,
        limit: i64,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Int(i64),
    Str(String),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(n) => write!(f, "{n}"),
            Value::Str(s) => f.write_str(s),
        }
    }
}

impl Value {
    fn as_int(&self, op: &'static str) -> Result<i64, ExprError> {
        match self {
            Value::Int(n) => Ok(*n),
            Value::Str(s) => Err(ExprError::NotAnInteger {
                op,
                found: s.clone(),
            }),
        }
    }

    fn into_string(self) -> String {
        match self {
            Value::Int(n) => n.to_string(),
            Value::Str(s) => s,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Expr {
    Int(i64),
    Str(String),
    Capture(Box<Expr>),
    Neg(Box<Expr>),
    Binary(BinOp, Box<Expr>, Box<Expr>),
    Call(String, Vec<Expr>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Int(i64),
    Str(String),
    Ident(String),
    Punct(char),
}

fn syntax(pos: usize, message: impl Into<String>) -> ExprError {
    ExprError::Syntax {
        pos,
        message: message.into(),
    }
}

fn tokenize(source: &str) -> Result<Vec<(usize, Token)>, ExprError> {
    let mut tokens = Vec::new();
    let mut chars = source.char_indices().peekable();
    while let Some(&(pos, ch)) = chars.peek() {
        if ch.is_whitespace() {
            chars.next();
        } else if ch.is_ascii_digit() {
            let mut digits = String::new();
            while let Some(&(_, d)) = chars.peek() {
                if !d.is_ascii_digit() {
                    break;
                }
                digits.push(d);
                chars.next();
            }
            let n = digits
                .parse::<i64>()
                .map_err(|_| syntax(pos, "integer literal too large"))?;
            tokens.push((pos, Token::Int(n)));
        } else if ch.is_ascii_alphabetic() || ch == '_' {
            let mut ident = String::new();
            while let Some(&(_, c)) = chars.peek() {
                if !(c.is_ascii_alphanumeric() || c == '_') {
                    break;
                }
                ident.push(c);
                chars.next();
            }
            tokens.push((pos, Token::Ident(ident)));
        } else if ch == '"' {
            chars.next();
            let mut s = String::new();
            let mut closed = false;
            while let Some((_, c)) = chars.next() {
                match c {
                    '"' => {
                        closed = true;
                        break;
                    }
                    '\\' => match chars.next() {
                        Some((_, 'n')) => s.push('\n'),
                        Some((_, 't')) => s.push('\t'),
                        Some((_, '"')) => s.push('"'),
                        Some((_, '\\')) => s.push('\\'),
                        // unknown escapes stay verbatim so `"\frac"` still works
                        Some((_, other)) => {
                            s.push('\\');
                            s.push(other);
                        }
                        None => break,
                    },
                    c => s.push(c),
                }
            }
            if !closed {
                return Err(syntax(pos, "unterminated string literal"));
            }
            tokens.push((pos, Token::Str(s)));
        } else if "+-*/%()[],".contains(ch) {
            tokens.push((pos, Token::Punct(ch)));
            chars.next();
        } else {
            return Err(syntax(pos, format!("unexpected character {ch:?}")));
        }
        if tokens.len() > MAX_TOKENS {
            return Err(syntax(pos, "expression too long"));
        }
    }
    Ok(tokens)
}

struct Parser {
    tokens: Vec<(usize, Token)>,
    pos: usize,
    end: usize,
    depth: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|(_, t)| t)
    }

    fn offset(&self) -> usize {
        self.tokens.get(self.pos).map(|(p, _)| *p).unwrap_or(self.end)
    }

    fn eat(&mut self, punct: char) -> bool {
        if self.peek() == Some(&Token::Punct(punct)) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, punct: char) -> Result<(), ExprError> {
        if self.eat(punct) {
            Ok(())
        } else {
            Err(syntax(self.offset(), format!("expected '{punct}'")))
        }
    }

    fn expr(&mut self) -> Result<Expr, ExprError> {
        let mut lhs = self.term()?;
        loop {
            let op = if self.eat('+') {
                BinOp::Add
            } else if self.eat('-') {
                BinOp::Sub
            } else {
                return Ok(lhs);
            };
            let rhs = self.term()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
    }

    fn term(&mut self) -> Result<Expr, ExprError> {
        let mut lhs = self.unary()?;
        loop {
            let op = if self.eat('*') {
                BinOp::Mul
            } else if self.eat('/') {
                BinOp::Div
            } else if self.eat('%') {
                BinOp::Rem
            } else {
                return Ok(lhs);
            };
            let rhs = self.unary()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
    }

    // every nested construct passes through here, so this bounds recursion
    fn unary(&mut self) -> Result<Expr, ExprError> {
        if self.depth >= MAX_DEPTH {
            return Err(syntax(self.offset(), "expression nested too deeply"));
        }
        self.depth += 1;
        let result = if self.eat('-') {
            self.unary().map(|inner| Expr::Neg(Box::new(inner)))
        } else {
            self.primary()
        };
        self.depth -= 1;
        result
    }

    fn primary(&mut self) -> Result<Expr, ExprError> {
        let at = self.offset();
        let Some((_, token)) = self.tokens.get(self.pos).cloned() else {
            return Err(syntax(at, "unexpected end of expression"));
        };
        self.pos += 1;
        match token {
            Token::Int(n) => Ok(Expr::Int(n)),
            Token::Str(s) => Ok(Expr::Str(s)),
            Token::Punct('(') => {
                let inner = self.expr()?;
                self.expect(')')?;
                Ok(inner)
            }
            Token::Ident(name) if name == "m" && self.peek() == Some(&Token::Punct('[')) => {
                self.pos += 1;
                let index = self.expr()?;
                self.expect(']')?;
                Ok(Expr::Capture(Box::new(index)))
            }
            Token::Ident(name) => {
                self.expect('(')?;
                let mut args = Vec::new();
                if !self.eat(')') {
                    loop {
                        args.push(self.expr()?);
                        if self.eat(')') {
                            break;
                        }
                        self.expect(',')?;
                    }
                }
                check_call(&name, args.len())?;
                Ok(Expr::Call(name, args))
            }
            Token::Punct(c) => Err(syntax(at, format!("unexpected '{c}'"))),
        }
    }
}

fn check_call(name: &str, found: usize) -> Result<(), ExprError> {
    let (ok, expected) = match name {
        "int" | "str" | "len" | "upper" | "lower" => (found == 1, "1"),
        "repeat" => ((2..=3).contains(&found), "2 or 3"),
        "matrix" => (found == 4, "4"),
        _ => return Err(ExprError::UnknownFunction(name.to_string())),
    };
    if ok {
        Ok(())
    } else {
        Err(ExprError::Arity {
            name: name.to_string(),
            expected,
            found,
        })
    }
}

fn check_len(len: usize) -> Result<usize, ExprError> {
    if len <= MAX_OUTPUT_LEN {
        Ok(len)
    } else {
        Err(ExprError::TooLarge {
            what: "output",
            value: i64::try_from(len).unwrap_or(i64::MAX),
            limit: MAX_OUTPUT_LEN as i64,
        })
    }
}

fn concat(lhs: Value, rhs: Value) -> Result<Value, ExprError> {
    let (lhs, rhs) = (lhs.into_string(), rhs.into_string());
    check_len(lhs.len().saturating_add(rhs.len()))?;
    Ok(Value::Str(lhs + &rhs))
}

fn integers(op: &'static str, lhs: &Value, rhs: &Value) -> Result<(i64, i64), ExprError> {
    Ok((lhs.as_int(op)?, rhs.as_int(op)?))
}

fn binary(op: BinOp, lhs: Value, rhs: Value) -> Result<Value, ExprError> {
    let result = match op {
        BinOp::Add => match (lhs, rhs) {
            (Value::Int(a), Value::Int(b)) => a.checked_add(b),
            (lhs, rhs) => return concat(lhs, rhs),
        },
        BinOp::Sub => {
            let (a, b) = integers("-", &lhs, &rhs)?;
            a.checked_sub(b)
        }
        BinOp::Mul => {
            let (a, b) = integers("*", &lhs, &rhs)?;
            a.checked_mul(b)
        }
        BinOp::Div => {
            let (a, b) = integers("/", &lhs, &rhs)?;
            if b == 0 {
                return Err(ExprError::DivisionByZero);
            }
            a.checked_div(b)
        }
        BinOp::Rem => {
            let (a, b) = integers("%", &lhs, &rhs)?;
            if b == 0 {
                return Err(ExprError::DivisionByZero);
            }
            a.checked_rem(b)
        }
    };
    result.map(Value::Int).ok_or(ExprError::Overflow)
}

fn bounded(what: &'static str, value: i64, limit: i64) -> Result<usize, ExprError> {
    if (0..=limit).contains(&value) {
        Ok(value as usize)
    } else {
        Err(ExprError::TooLarge { what, value, limit })
    }
}

fn call(name: &str, mut args: Vec<Value>) -> Result<Value, ExprError> {
    match name {
        "int" => match args.remove(0) {
            Value::Int(n) => Ok(Value::Int(n)),
            Value::Str(s) => s
                .trim()
                .parse::<i64>()
                .map(Value::Int)
                .map_err(|_| ExprError::InvalidInt(s)),
        },
        "str" => Ok(Value::Str(args.remove(0).into_string())),
        "len" => Ok(Value::Int(args.remove(0).into_string().chars().count() as i64)),
        "upper" => Ok(Value::Str(args.remove(0).into_string().to_uppercase())),
        "lower" => Ok(Value::Str(args.remove(0).into_string().to_lowercase())),
        "repeat" => {
            let sep = if args.len() == 3 {
                args.remove(2).into_string()
            } else {
                String::new()
            };
            let count = bounded("repeat", args[1].as_int("repeat")?, MAX_REPEAT)?;
            let unit = args.remove(0).into_string();
            check_len(
                unit.len()
                    .saturating_mul(count)
                    .saturating_add(sep.len().saturating_mul(count.saturating_sub(1))),
            )?;
            Ok(Value::Str(vec![unit; count].join(&sep)))
        }
        "matrix" => {
            let rows = bounded("matrix", args[0].as_int("matrix")?, MAX_MATRIX_DIM)?;
            let cols = bounded("matrix", args[1].as_int("matrix")?, MAX_MATRIX_DIM)?;
            let diag = args[2].to_string();
            let off = args[3].to_string();
            let cell = diag.len().max(off.len()) + " & ".len();
            let row = cell.saturating_mul(cols) + " \\\\\n".len();
            check_len(row.saturating_mul(rows))?;
            let body = (0..rows)
                .map(|r| {
                    (0..cols)
                        .map(|c| if r == c { diag.as_str() } else { off.as_str() })
                        .collect::<Vec<_>>()
                        .join(" & ")
                })
                .collect::<Vec<_>>()
                .join(" \\\\\n");
            Ok(Value::Str(body))
        }
        other => Err(ExprError::UnknownFunction(other.to_string())),
    }
}

fn eval(expr: &Expr, captures: &[String]) -> Result<Value, ExprError> {
    match expr {
        Expr::Int(n) => Ok(Value::Int(*n)),
        Expr::Str(s) => Ok(Value::Str(s.clone())),
        Expr::Capture(index) => {
            let index = eval(index, captures)?.as_int("m[]")?;
            let group = usize::try_from(index)
                .ok()
                .and_then(|i| captures.get(i))
                .cloned()
                .unwrap_or_default();
            Ok(Value::Str(group))
        }
        Expr::Neg(inner) => eval(inner, captures)?
            .as_int("-")?
            .checked_neg()
            .map(Value::Int)
            .ok_or(ExprError::Overflow),
        Expr::Binary(op, lhs, rhs) => binary(*op, eval(lhs, captures)?, eval(rhs, captures)?),
        Expr::Call(name, args) => {
            let values = args
                .iter()
                .map(|a| eval(a, captures))
                .collect::<Result<Vec<_>, _>>()?;
            call(name, values)
        }
    }
}

/// A parsed function template. Equality compares the source text.
#[derive(Debug, Clone)]
pub struct CaptureFn {
    source: String,
    expr: Expr,
}

impl PartialEq for CaptureFn {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

impl CaptureFn {
    /// Parse `source` into an evaluable expression.
    pub fn parse(source: &str) -> Result<Self, ExprError> {
        let tokens = tokenize(source)?;
        let mut parser = Parser {
            tokens,
            pos: 0,
            end: source.len(),
            depth: 0,
        };
        let expr = parser.expr()?;
        if parser.pos != parser.tokens.len() {
            return Err(syntax(parser.offset(), "trailing input"));
        }
        Ok(Self {
            source: source.to_string(),
            expr,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Evaluate against `captures` (index 0 is the whole match).
    pub fn eval(&self, captures: &[String]) -> Result<String, ExprError> {
        eval(&self.expr, captures).map(Value::into_string)
    }
}
