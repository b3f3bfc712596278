//! Custom force-field formulas
//!
//! Each field carries two scalar expressions, one per acceleration
//! component, entered as plain text like `-y / (x*x + y*y + 1)` or
//! `sin(t) * g`. Expressions are compiled once into a small AST and
//! evaluated per body per tick against the variables `x`, `y`, `t` and the
//! physical constants `g`, `c`, `ke`, `km`, `pi`, `e`.
//!
//! A formula that fails to compile keeps its source and the error message
//! and evaluates to zero, so a typo in one field never stalls the
//! simulation.

use std::fmt;

use crate::simulation::states::NVec2;

/// Compile failure with the byte offset it was detected at.
#[derive(Debug, Clone, PartialEq)]
pub struct FormulaError {
    pub pos: usize,
    pub message: String,
}

impl fmt::Display for FormulaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "at offset {}: {}", self.pos, self.message)
    }
}

impl std::error::Error for FormulaError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Var {
    X,
    Y,
    T,
    G,
    C,
    Ke,
    Km,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Pow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Func {
    Sin,
    Cos,
    Tan,
    Asin,
    Acos,
    Atan,
    Atan2,
    Sqrt,
    Abs,
    Exp,
    Ln,
    Log10,
    Pow,
    Min,
    Max,
    Floor,
    Ceil,
    Signum,
}

impl Func {
    fn from_name(name: &str) -> Option<Func> {
        Some(match name {
            "sin" => Func::Sin,
            "cos" => Func::Cos,
            "tan" => Func::Tan,
            "asin" => Func::Asin,
            "acos" => Func::Acos,
            "atan" => Func::Atan,
            "atan2" => Func::Atan2,
            "sqrt" => Func::Sqrt,
            "abs" => Func::Abs,
            "exp" => Func::Exp,
            "ln" => Func::Ln,
            "log10" => Func::Log10,
            "pow" => Func::Pow,
            "min" => Func::Min,
            "max" => Func::Max,
            "floor" => Func::Floor,
            "ceil" => Func::Ceil,
            "signum" => Func::Signum,
            _ => return None,
        })
    }

    fn arity(self) -> usize {
        match self {
            Func::Atan2 | Func::Pow | Func::Min | Func::Max => 2,
            _ => 1,
        }
    }
}

/// Compiled expression tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Num(f64),
    Var(Var),
    Neg(Box<Expr>),
    Bin(BinOp, Box<Expr>, Box<Expr>),
    Call(Func, Vec<Expr>),
}

/// Variable bindings for one evaluation.
#[derive(Debug, Clone, Copy)]
pub struct Env {
    pub x: f64,
    pub y: f64,
    pub t: f64,
    pub g: f64,
    pub c: f64,
    pub ke: f64,
    pub km: f64,
}

impl Expr {
    pub fn eval(&self, env: &Env) -> f64 {
        match self {
            Expr::Num(v) => *v,
            Expr::Var(var) => match var {
                Var::X => env.x,
                Var::Y => env.y,
                Var::T => env.t,
                Var::G => env.g,
                Var::C => env.c,
                Var::Ke => env.ke,
                Var::Km => env.km,
            },
            Expr::Neg(inner) => -inner.eval(env),
            Expr::Bin(op, lhs, rhs) => {
                let a = lhs.eval(env);
                let b = rhs.eval(env);
                match op {
                    BinOp::Add => a + b,
                    BinOp::Sub => a - b,
                    BinOp::Mul => a * b,
                    BinOp::Div => a / b,
                    BinOp::Rem => a % b,
                    BinOp::Pow => a.powf(b),
                }
            }
            Expr::Call(func, args) => {
                let a = args[0].eval(env);
                match func {
                    Func::Sin => a.sin(),
                    Func::Cos => a.cos(),
                    Func::Tan => a.tan(),
                    Func::Asin => a.asin(),
                    Func::Acos => a.acos(),
                    Func::Atan => a.atan(),
                    Func::Atan2 => a.atan2(args[1].eval(env)),
                    Func::Sqrt => a.sqrt(),
                    Func::Abs => a.abs(),
                    Func::Exp => a.exp(),
                    Func::Ln => a.ln(),
                    Func::Log10 => a.log10(),
                    Func::Pow => a.powf(args[1].eval(env)),
                    Func::Min => a.min(args[1].eval(env)),
                    Func::Max => a.max(args[1].eval(env)),
                    Func::Floor => a.floor(),
                    Func::Ceil => a.ceil(),
                    Func::Signum => a.signum(),
                }
            }
        }
    }
}

// tokenizer ================================================================

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Num(f64),
    Ident(String),
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Caret,
    LParen,
    RParen,
    Comma,
}

fn tokenize(src: &str) -> Result<Vec<(usize, Token)>, FormulaError> {
    let bytes = src.as_bytes();
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        let start = i;
        let b = bytes[i];
        match b {
            b' ' | b'\t' | b'\n' | b'\r' => {
                i += 1;
            }
            b'+' => {
                tokens.push((start, Token::Plus));
                i += 1;
            }
            b'-' => {
                tokens.push((start, Token::Minus));
                i += 1;
            }
            b'*' => {
                tokens.push((start, Token::Star));
                i += 1;
            }
            b'/' => {
                tokens.push((start, Token::Slash));
                i += 1;
            }
            b'%' => {
                tokens.push((start, Token::Percent));
                i += 1;
            }
            b'^' => {
                tokens.push((start, Token::Caret));
                i += 1;
            }
            b'(' => {
                tokens.push((start, Token::LParen));
                i += 1;
            }
            b')' => {
                tokens.push((start, Token::RParen));
                i += 1;
            }
            b',' => {
                tokens.push((start, Token::Comma));
                i += 1;
            }
            b'0'..=b'9' | b'.' => {
                while i < bytes.len() && (bytes[i].is_ascii_digit() || bytes[i] == b'.') {
                    i += 1;
                }
                // optional exponent part
                if i < bytes.len() && (bytes[i] == b'e' || bytes[i] == b'E') {
                    let mut j = i + 1;
                    if j < bytes.len() && (bytes[j] == b'+' || bytes[j] == b'-') {
                        j += 1;
                    }
                    if j < bytes.len() && bytes[j].is_ascii_digit() {
                        i = j;
                        while i < bytes.len() && bytes[i].is_ascii_digit() {
                            i += 1;
                        }
                    }
                }
                let text = &src[start..i];
                let value = text.parse::<f64>().map_err(|_| FormulaError {
                    pos: start,
                    message: format!("bad number `{text}`"),
                })?;
                tokens.push((start, Token::Num(value)));
            }
            b'a'..=b'z' | b'A'..=b'Z' | b'_' => {
                while i < bytes.len()
                    && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'_')
                {
                    i += 1;
                }
                tokens.push((start, Token::Ident(src[start..i].to_ascii_lowercase())));
            }
            _ => {
                return Err(FormulaError {
                    pos: start,
                    message: format!("unexpected character `{}`", &src[start..start + 1]),
                })
            }
        }
    }
    Ok(tokens)
}

// parser ===================================================================

struct Parser<'a> {
    tokens: &'a [(usize, Token)],
    src_len: usize,
    at: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.at).map(|(_, t)| t)
    }

    fn pos(&self) -> usize {
        self.tokens
            .get(self.at)
            .map(|(p, _)| *p)
            .unwrap_or(self.src_len)
    }

    fn bump(&mut self) -> Option<Token> {
        let t = self.tokens.get(self.at).map(|(_, t)| t.clone());
        if t.is_some() {
            self.at += 1;
        }
        t
    }

    fn expect(&mut self, want: Token, what: &str) -> Result<(), FormulaError> {
        if self.peek() == Some(&want) {
            self.at += 1;
            Ok(())
        } else {
            Err(FormulaError {
                pos: self.pos(),
                message: format!("expected {what}"),
            })
        }
    }

    fn parse_expr(&mut self) -> Result<Expr, FormulaError> {
        let mut lhs = self.parse_term()?;
        while let Some(op) = match self.peek() {
            Some(Token::Plus) => Some(BinOp::Add),
            Some(Token::Minus) => Some(BinOp::Sub),
            _ => None,
        } {
            self.at += 1;
            let rhs = self.parse_term()?;
            lhs = Expr::Bin(op, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_term(&mut self) -> Result<Expr, FormulaError> {
        let mut lhs = self.parse_unary()?;
        while let Some(op) = match self.peek() {
            Some(Token::Star) => Some(BinOp::Mul),
            Some(Token::Slash) => Some(BinOp::Div),
            Some(Token::Percent) => Some(BinOp::Rem),
            _ => None,
        } {
            self.at += 1;
            let rhs = self.parse_unary()?;
            lhs = Expr::Bin(op, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_unary(&mut self) -> Result<Expr, FormulaError> {
        if self.peek() == Some(&Token::Minus) {
            self.at += 1;
            return Ok(Expr::Neg(Box::new(self.parse_unary()?)));
        }
        self.parse_power()
    }

    fn parse_power(&mut self) -> Result<Expr, FormulaError> {
        let base = self.parse_atom()?;
        if self.peek() == Some(&Token::Caret) {
            self.at += 1;
            // right associative, and the exponent may be signed
            let exp = self.parse_unary()?;
            return Ok(Expr::Bin(BinOp::Pow, Box::new(base), Box::new(exp)));
        }
        Ok(base)
    }

    fn parse_atom(&mut self) -> Result<Expr, FormulaError> {
        let pos = self.pos();
        match self.bump() {
            Some(Token::Num(v)) => Ok(Expr::Num(v)),
            Some(Token::LParen) => {
                let inner = self.parse_expr()?;
                self.expect(Token::RParen, "`)`")?;
                Ok(inner)
            }
            Some(Token::Ident(name)) => {
                if self.peek() == Some(&Token::LParen) {
                    let func = Func::from_name(&name).ok_or_else(|| FormulaError {
                        pos,
                        message: format!("unknown function `{name}`"),
                    })?;
                    self.at += 1;
                    let mut args = vec![self.parse_expr()?];
                    while self.peek() == Some(&Token::Comma) {
                        self.at += 1;
                        args.push(self.parse_expr()?);
                    }
                    self.expect(Token::RParen, "`)`")?;
                    if args.len() != func.arity() {
                        return Err(FormulaError {
                            pos,
                            message: format!(
                                "`{name}` takes {} argument(s), got {}",
                                func.arity(),
                                args.len()
                            ),
                        });
                    }
                    return Ok(Expr::Call(func, args));
                }
                match name.as_str() {
                    "x" => Ok(Expr::Var(Var::X)),
                    "y" => Ok(Expr::Var(Var::Y)),
                    "t" => Ok(Expr::Var(Var::T)),
                    "g" => Ok(Expr::Var(Var::G)),
                    "c" => Ok(Expr::Var(Var::C)),
                    "ke" => Ok(Expr::Var(Var::Ke)),
                    "km" => Ok(Expr::Var(Var::Km)),
                    "pi" => Ok(Expr::Num(std::f64::consts::PI)),
                    "e" => Ok(Expr::Num(std::f64::consts::E)),
                    _ => Err(FormulaError {
                        pos,
                        message: format!("unknown variable `{name}`"),
                    }),
                }
            }
            Some(_) => Err(FormulaError {
                pos,
                message: "expected a value".into(),
            }),
            None => Err(FormulaError {
                pos,
                message: "unexpected end of formula".into(),
            }),
        }
    }
}

/// Compile a formula source string into an expression tree.
pub fn compile(src: &str) -> Result<Expr, FormulaError> {
    let tokens = tokenize(src)?;
    let mut parser = Parser {
        tokens: &tokens,
        src_len: src.len(),
        at: 0,
    };
    let expr = parser.parse_expr()?;
    if parser.at != tokens.len() {
        return Err(FormulaError {
            pos: parser.pos(),
            message: "trailing input after expression".into(),
        });
    }
    Ok(expr)
}

/// A user-defined global force field, one expression per component.
#[derive(Debug, Clone)]
pub struct FieldFormula {
    pub id: u32,
    pub enabled: bool,
    pub src_x: String,
    pub src_y: String,
    pub expr_x: Option<Expr>,
    pub expr_y: Option<Expr>,
    pub error: Option<String>, // first compile error, kept for display
}

impl FieldFormula {
    pub fn new(id: u32, src_x: &str, src_y: &str) -> Self {
        let mut error = None;
        let mut keep = |res: Result<Expr, FormulaError>| match res {
            Ok(expr) => Some(expr),
            Err(e) => {
                if error.is_none() {
                    error = Some(e.to_string());
                }
                None
            }
        };
        let expr_x = keep(compile(src_x));
        let expr_y = keep(compile(src_y));
        Self {
            id,
            enabled: true,
            src_x: src_x.to_string(),
            src_y: src_y.to_string(),
            expr_x,
            expr_y,
            error,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.error.is_none()
    }

    /// Acceleration at one point. Broken or non-finite components fall back
    /// to zero rather than poisoning the integrator.
    pub fn eval_at(&self, env: &Env) -> NVec2 {
        let finite = |v: f64| if v.is_finite() { v } else { 0.0 };
        let ax = self.expr_x.as_ref().map(|e| finite(e.eval(env))).unwrap_or(0.0);
        let ay = self.expr_y.as_ref().map(|e| finite(e.eval(env))).unwrap_or(0.0);
        NVec2::new(ax, ay)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env() -> Env {
        Env {
            x: 2.0,
            y: -3.0,
            t: 0.5,
            g: 0.5,
            c: 1000.0,
            ke: 8000.0,
            km: 100.0,
        }
    }

    fn eval(src: &str) -> f64 {
        compile(src).unwrap().eval(&env())
    }

    #[test]
    fn precedence_and_grouping() {
        assert_eq!(eval("2 + 3 * 4"), 14.0);
        assert_eq!(eval("(2 + 3) * 4"), 20.0);
        assert_eq!(eval("10 % 4"), 2.0);
    }

    #[test]
    fn power_is_right_associative() {
        assert_eq!(eval("2 ^ 3 ^ 2"), 512.0);
        assert_eq!(eval("-2 ^ 2"), -4.0); // unary minus binds looser
        assert_eq!(eval("2 ^ -1"), 0.5);
    }

    #[test]
    fn variables_and_constants_resolve() {
        assert_eq!(eval("x * y"), -6.0);
        assert_eq!(eval("ke / km"), 80.0);
        assert!((eval("pi") - std::f64::consts::PI).abs() < 1e-15);
    }

    #[test]
    fn functions_evaluate() {
        assert!((eval("sin(0)")).abs() < 1e-15);
        assert_eq!(eval("max(x, y)"), 2.0);
        assert_eq!(eval("atan2(0, 1)"), 0.0);
        assert_eq!(eval("abs(y)"), 3.0);
    }

    #[test]
    fn scientific_notation_numbers() {
        assert_eq!(eval("1.5e3"), 1500.0);
        assert_eq!(eval("2e-2"), 0.02);
    }

    #[test]
    fn errors_carry_positions() {
        let err = compile("1 + $").unwrap_err();
        assert_eq!(err.pos, 4);

        let err = compile("sin(1, 2)").unwrap_err();
        assert!(err.message.contains("argument"));

        let err = compile("foo + 1").unwrap_err();
        assert!(err.message.contains("unknown variable"));

        assert!(compile("(1 + 2").is_err());
        assert!(compile("1 2").is_err());
    }

    #[test]
    fn broken_field_evaluates_to_zero() {
        let field = FieldFormula::new(1, "x +", "y");
        assert!(!field.is_valid());
        let a = field.eval_at(&env());
        assert_eq!(a.x, 0.0);
        assert_eq!(a.y, -3.0);
    }

    #[test]
    fn division_by_zero_is_damped_at_the_field_level() {
        let field = FieldFormula::new(2, "1 / (x - 2)", "0");
        assert!(field.is_valid());
        let a = field.eval_at(&env());
        assert_eq!(a.x, 0.0); // 1/0 folds to zero instead of infinity
    }
}
