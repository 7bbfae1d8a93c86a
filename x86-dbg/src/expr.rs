//! Tokenizer and recursive-descent evaluator for watchpoint expressions.
//!
//! Mirrors NEMU's `expr.c`: a flat token list, a unary-context retagging
//! pass that turns `*`/`-` into dereference/negation, and the "find main
//! operator" precedence-climbing method (scan right-to-left at paren depth
//! zero, take the rightmost operator of minimum precedence, with unary
//! operators winning ties so they bind right-associatively).

use thiserror::Error;
use x86_core::{EmuError, MemoryRead, RegisterRead};

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum ExprError {
    #[error("unexpected character {0:?} in expression")]
    Lex(char),
    #[error("empty sub-expression")]
    EmptyRange,
    #[error("unbound register name {0:?}")]
    UnboundRegister(String),
    #[error("no well-defined main operator")]
    NoMainOperator,
    #[error("division by zero")]
    DivideByZero,
    #[error("memory read failed: {0}")]
    Memory(#[from] EmuError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Num,
    Reg,
    Plus,
    Minus,
    Star,
    Slash,
    EqEq,
    NotEq,
    AndAnd,
    LParen,
    RParen,
    Deref,
    Negate,
}

#[derive(Debug, Clone)]
struct Token {
    kind: Kind,
    text: String,
}

/// Precedence level, low to high; 0 means "not an operator". Matches
/// `get_operator_priority` in the source exactly.
fn priority(kind: Kind) -> u8 {
    match kind {
        Kind::AndAnd => 1,
        Kind::EqEq | Kind::NotEq => 2,
        Kind::Plus | Kind::Minus => 3,
        Kind::Star | Kind::Slash => 4,
        Kind::Deref | Kind::Negate => 5,
        _ => 0,
    }
}

fn tokenize(expr: &str) -> Result<Vec<Token>, ExprError> {
    let chars: Vec<char> = expr.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if c.is_whitespace() {
            i += 1;
            continue;
        }
        if c == '0' && i + 1 < chars.len() && (chars[i + 1] == 'x' || chars[i + 1] == 'X') {
            let start = i;
            i += 2;
            while i < chars.len() && chars[i].is_ascii_hexdigit() {
                i += 1;
            }
            tokens.push(Token {
                kind: Kind::Num,
                text: chars[start..i].iter().collect(),
            });
            continue;
        }
        if c.is_ascii_digit() {
            let start = i;
            while i < chars.len() && chars[i].is_ascii_digit() {
                i += 1;
            }
            tokens.push(Token {
                kind: Kind::Num,
                text: chars[start..i].iter().collect(),
            });
            continue;
        }
        if c == '$' {
            let start = i;
            i += 1;
            while i < chars.len() && chars[i].is_ascii_alphabetic() {
                i += 1;
            }
            tokens.push(Token {
                kind: Kind::Reg,
                text: chars[start + 1..i].iter().collect(),
            });
            continue;
        }
        if c == '=' && chars.get(i + 1) == Some(&'=') {
            tokens.push(Token { kind: Kind::EqEq, text: String::new() });
            i += 2;
            continue;
        }
        if c == '!' && chars.get(i + 1) == Some(&'=') {
            tokens.push(Token { kind: Kind::NotEq, text: String::new() });
            i += 2;
            continue;
        }
        if c == '&' && chars.get(i + 1) == Some(&'&') {
            tokens.push(Token { kind: Kind::AndAnd, text: String::new() });
            i += 2;
            continue;
        }
        let kind = match c {
            '+' => Kind::Plus,
            '-' => Kind::Minus,
            '*' => Kind::Star,
            '/' => Kind::Slash,
            '(' => Kind::LParen,
            ')' => Kind::RParen,
            other => return Err(ExprError::Lex(other)),
        };
        tokens.push(Token { kind, text: String::new() });
        i += 1;
    }
    Ok(tokens)
}

/// Retags `*`/`-` as unary (dereference/negate) when in prefix position:
/// the start of the expression, right after `(`, or right after another
/// operator.
fn retag_unary(tokens: &mut [Token]) {
    for i in 0..tokens.len() {
        if !matches!(tokens[i].kind, Kind::Star | Kind::Minus) {
            continue;
        }
        let is_prefix = i == 0
            || tokens[i - 1].kind == Kind::LParen
            || priority(tokens[i - 1].kind) > 0;
        if is_prefix {
            tokens[i].kind = if tokens[i].kind == Kind::Star {
                Kind::Deref
            } else {
                Kind::Negate
            };
        }
    }
}

fn check_parentheses(tokens: &[Token], p: usize, q: usize) -> bool {
    if tokens[p].kind != Kind::LParen || tokens[q].kind != Kind::RParen {
        return false;
    }
    let mut balance = 0i32;
    for j in p..=q {
        match tokens[j].kind {
            Kind::LParen => balance += 1,
            Kind::RParen => balance -= 1,
            _ => {}
        }
        if (balance == 0 && j < q) || balance < 0 {
            return false;
        }
    }
    balance == 0
}

fn find_main_operator(tokens: &[Token], p: usize, q: usize) -> Option<usize> {
    let mut balance = 0i32;
    let mut op = None;
    let mut min_priority = u8::MAX;
    for i in (p..=q).rev() {
        match tokens[i].kind {
            Kind::RParen => balance -= 1,
            Kind::LParen => balance += 1,
            _ => {}
        }
        if balance != 0 {
            continue;
        }
        let pr = priority(tokens[i].kind);
        if pr == 0 {
            continue;
        }
        if pr < min_priority {
            min_priority = pr;
            op = Some(i);
        } else if pr == min_priority && matches!(tokens[i].kind, Kind::Deref | Kind::Negate) {
            op = Some(i);
        }
    }
    op
}

fn parse_num(text: &str) -> Result<u32, ExprError> {
    if let Some(hex) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Ok(u32::from_str_radix(hex, 16).unwrap_or(0))
    } else {
        Ok(text.parse::<u32>().unwrap_or(0))
    }
}

fn eval_range(
    tokens: &[Token],
    p: usize,
    q: usize,
    regs: &impl RegisterRead,
    mem: &mut impl MemoryRead,
) -> Result<u32, ExprError> {
    if p > q {
        return Err(ExprError::EmptyRange);
    }
    if p == q {
        return match tokens[p].kind {
            Kind::Num => parse_num(&tokens[p].text),
            Kind::Reg => regs
                .read_reg_named(&tokens[p].text)
                .ok_or_else(|| ExprError::UnboundRegister(tokens[p].text.clone())),
            _ => Err(ExprError::NoMainOperator),
        };
    }

    if check_parentheses(tokens, p, q) {
        return eval_range(tokens, p + 1, q - 1, regs, mem);
    }

    let op = find_main_operator(tokens, p, q).ok_or(ExprError::NoMainOperator)?;

    if matches!(tokens[op].kind, Kind::Deref | Kind::Negate) {
        let val = eval_range(tokens, op + 1, q, regs, mem)?;
        return Ok(match tokens[op].kind {
            Kind::Negate => 0u32.wrapping_sub(val),
            Kind::Deref => mem.read_mem(val, 4)?,
            _ => unreachable!(),
        });
    }

    let lhs = eval_range(tokens, p, op - 1, regs, mem)?;
    let rhs = eval_range(tokens, op + 1, q, regs, mem)?;
    match tokens[op].kind {
        Kind::Plus => Ok(lhs.wrapping_add(rhs)),
        Kind::Minus => Ok(lhs.wrapping_sub(rhs)),
        Kind::Star => Ok(lhs.wrapping_mul(rhs)),
        Kind::Slash => {
            if rhs == 0 {
                Err(ExprError::DivideByZero)
            } else {
                Ok(lhs / rhs)
            }
        }
        Kind::EqEq => Ok(u32::from(lhs == rhs)),
        Kind::NotEq => Ok(u32::from(lhs != rhs)),
        Kind::AndAnd => Ok(u32::from(lhs != 0 && rhs != 0)),
        _ => Err(ExprError::NoMainOperator),
    }
}

/// Tokenizes and evaluates `expr`, re-reading registers through `regs` and
/// memory through `mem` (so a watchpoint re-evaluates live state on every
/// scan rather than a cached snapshot).
pub fn evaluate(
    expr: &str,
    regs: &impl RegisterRead,
    mem: &mut impl MemoryRead,
) -> Result<u32, ExprError> {
    let mut tokens = tokenize(expr)?;
    if tokens.is_empty() {
        return Err(ExprError::EmptyRange);
    }
    retag_unary(&mut tokens);
    let last = tokens.len() - 1;
    eval_range(&tokens, 0, last, regs, mem)
}
