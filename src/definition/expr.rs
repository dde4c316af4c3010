//! Arithmetic over named parameters.
//!
//! Expressions are held as a tree. The text form (`(speed*2)`, `abs(roll)`,
//! `e1.length`, `45°`) is only used when reading and writing definitions.

use crate::error::{FsResult, ScoreError};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
}

impl BinOp {
    fn symbol(&self) -> char {
        match self {
            BinOp::Add => '+',
            BinOp::Sub => '-',
            BinOp::Mul => '*',
            BinOp::Div => '/',
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnaryFunc {
    Abs,
    Sign,
    Neg,
}

/// Supplies values for the names an expression refers to.
pub trait Scope {
    fn parameter(&self, name: &str) -> FsResult<f64>;

    fn element(&self, element: &str, parameter: &str) -> FsResult<f64> {
        Err(ScoreError::Expression(format!(
            "{}.{} cannot be resolved here",
            element, parameter
        )))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Expr {
    Literal(f64),
    Parameter(String),
    Element { element: String, parameter: String },
    Binary {
        op: BinOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Unary { func: UnaryFunc, arg: Box<Expr> },
}

impl Expr {
    pub fn lit(v: f64) -> Expr {
        Expr::Literal(v)
    }

    pub fn parm(name: &str) -> Expr {
        Expr::Parameter(name.to_string())
    }

    pub fn binary(op: BinOp, lhs: Expr, rhs: Expr) -> Expr {
        Expr::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    pub fn unary(func: UnaryFunc, arg: Expr) -> Expr {
        Expr::Unary {
            func,
            arg: Box::new(arg),
        }
    }

    pub fn abs(self) -> Expr {
        Expr::unary(UnaryFunc::Abs, self)
    }

    pub fn eval(&self, scope: &dyn Scope) -> FsResult<f64> {
        match self {
            Expr::Literal(v) => Ok(*v),
            Expr::Parameter(name) => scope.parameter(name),
            Expr::Element { element, parameter } => scope.element(element, parameter),
            Expr::Binary { op, lhs, rhs } => {
                let a = lhs.eval(scope)?;
                let b = rhs.eval(scope)?;
                match op {
                    BinOp::Add => Ok(a + b),
                    BinOp::Sub => Ok(a - b),
                    BinOp::Mul => Ok(a * b),
                    BinOp::Div => {
                        if b.abs() < 1e-12 {
                            Err(ScoreError::Expression(format!("division by zero in {}", self)))
                        } else {
                            Ok(a / b)
                        }
                    }
                }
            }
            Expr::Unary { func, arg } => {
                let v = arg.eval(scope)?;
                Ok(match func {
                    UnaryFunc::Abs => v.abs(),
                    UnaryFunc::Sign => crate::util::sign(v),
                    UnaryFunc::Neg => -v,
                })
            }
        }
    }

    /// The parameter this expression collects into, when it is a bare
    /// reference possibly wrapped in sign-dropping functions.
    pub fn collectable_parameter(&self) -> Option<&str> {
        match self {
            Expr::Parameter(name) => Some(name),
            Expr::Unary {
                func: UnaryFunc::Abs | UnaryFunc::Neg,
                arg,
            } => arg.collectable_parameter(),
            _ => None,
        }
    }

    /// Every parameter name referenced anywhere in the tree.
    pub fn parameters(&self) -> Vec<String> {
        match self {
            Expr::Literal(_) | Expr::Element { .. } => vec![],
            Expr::Parameter(name) => vec![name.clone()],
            Expr::Binary { lhs, rhs, .. } => {
                let mut out = lhs.parameters();
                out.extend(rhs.parameters());
                out
            }
            Expr::Unary { arg, .. } => arg.parameters(),
        }
    }

    pub fn parse(text: &str) -> FsResult<Expr> {
        let mut p = Parser {
            chars: text.chars().filter(|c| !c.is_whitespace()).collect(),
            pos: 0,
        };
        let e = p.expr()?;
        if p.pos != p.chars.len() {
            return Err(ScoreError::Expression(format!(
                "unexpected '{}' at {} in {}",
                p.chars[p.pos], p.pos, text
            )));
        }
        Ok(e)
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Literal(v) => write!(f, "{}", v),
            Expr::Parameter(name) => write!(f, "{}", name),
            Expr::Element { element, parameter } => write!(f, "{}.{}", element, parameter),
            Expr::Binary { op, lhs, rhs } => write!(f, "({}{}{})", lhs, op.symbol(), rhs),
            Expr::Unary { func, arg } => match func {
                UnaryFunc::Abs => write!(f, "abs({})", arg),
                UnaryFunc::Sign => write!(f, "sign({})", arg),
                UnaryFunc::Neg => write!(f, "(-{})", arg),
            },
        }
    }
}

impl From<Expr> for String {
    fn from(e: Expr) -> String {
        e.to_string()
    }
}

impl TryFrom<String> for Expr {
    type Error = ScoreError;

    fn try_from(s: String) -> FsResult<Expr> {
        Expr::parse(&s)
    }
}

impl From<f64> for Expr {
    fn from(v: f64) -> Expr {
        Expr::Literal(v)
    }
}

impl From<&str> for Expr {
    fn from(name: &str) -> Expr {
        Expr::parm(name)
    }
}

impl std::ops::Mul for Expr {
    type Output = Expr;
    fn mul(self, rhs: Expr) -> Expr {
        Expr::binary(BinOp::Mul, self, rhs)
    }
}

impl std::ops::Div for Expr {
    type Output = Expr;
    fn div(self, rhs: Expr) -> Expr {
        Expr::binary(BinOp::Div, self, rhs)
    }
}

impl std::ops::Add for Expr {
    type Output = Expr;
    fn add(self, rhs: Expr) -> Expr {
        Expr::binary(BinOp::Add, self, rhs)
    }
}

impl std::ops::Sub for Expr {
    type Output = Expr;
    fn sub(self, rhs: Expr) -> Expr {
        Expr::binary(BinOp::Sub, self, rhs)
    }
}

impl std::ops::Neg for Expr {
    type Output = Expr;
    fn neg(self) -> Expr {
        Expr::unary(UnaryFunc::Neg, self)
    }
}

// expr   := term (('+'|'-') term)*
// term   := factor (('*'|'/') factor)*
// factor := '-' factor | '(' expr ')' | func '(' expr ')' | number | name
struct Parser {
    chars: Vec<char>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn err(&self, what: &str) -> ScoreError {
        let text: String = self.chars.iter().collect();
        ScoreError::Expression(format!("{} at {} in {}", what, self.pos, text))
    }

    fn expect(&mut self, c: char) -> FsResult<()> {
        if self.peek() == Some(c) {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.err(&format!("expected '{}'", c)))
        }
    }

    fn expr(&mut self) -> FsResult<Expr> {
        let mut lhs = self.term()?;
        while let Some(c) = self.peek() {
            let op = match c {
                '+' => BinOp::Add,
                '-' => BinOp::Sub,
                _ => break,
            };
            self.pos += 1;
            lhs = Expr::binary(op, lhs, self.term()?);
        }
        Ok(lhs)
    }

    fn term(&mut self) -> FsResult<Expr> {
        let mut lhs = self.factor()?;
        while let Some(c) = self.peek() {
            let op = match c {
                '*' => BinOp::Mul,
                '/' => BinOp::Div,
                _ => break,
            };
            self.pos += 1;
            lhs = Expr::binary(op, lhs, self.factor()?);
        }
        Ok(lhs)
    }

    fn factor(&mut self) -> FsResult<Expr> {
        match self.peek() {
            Some('-') => {
                self.pos += 1;
                Ok(match self.factor()? {
                    Expr::Literal(v) => Expr::Literal(-v),
                    other => -other,
                })
            }
            Some('(') => {
                self.pos += 1;
                let e = self.expr()?;
                self.expect(')')?;
                Ok(e)
            }
            Some(c) if c.is_ascii_digit() || c == '.' => self.number(),
            Some(c) if c.is_alphabetic() || c == '_' => self.name(),
            Some(c) => Err(self.err(&format!("unexpected '{}'", c))),
            None => Err(self.err("unexpected end")),
        }
    }

    fn number(&mut self) -> FsResult<Expr> {
        let start = self.pos;
        while let Some(c) = self.peek() {
            let exponent_sign = (c == '-' || c == '+')
                && self.pos > start
                && matches!(self.chars[self.pos - 1], 'e' | 'E');
            if c.is_ascii_digit() || c == '.' || c == 'e' || c == 'E' || exponent_sign {
                self.pos += 1;
            } else {
                break;
            }
        }
        let text: String = self.chars[start..self.pos].iter().collect();
        let v: f64 = text
            .parse()
            .map_err(|_| self.err(&format!("bad number {}", text)))?;
        if self.peek() == Some('°') {
            self.pos += 1;
            return Ok(Expr::Literal(v.to_radians()));
        }
        Ok(Expr::Literal(v))
    }

    fn name(&mut self) -> FsResult<Expr> {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c.is_alphanumeric() || c == '_' || c == '.' {
                self.pos += 1;
            } else {
                break;
            }
        }
        let text: String = self.chars[start..self.pos].iter().collect();
        if self.peek() == Some('(') {
            let func = match text.as_str() {
                "abs" => UnaryFunc::Abs,
                "sign" => UnaryFunc::Sign,
                "neg" => UnaryFunc::Neg,
                other => return Err(self.err(&format!("unknown function {}", other))),
            };
            self.pos += 1;
            let arg = self.expr()?;
            self.expect(')')?;
            return Ok(Expr::unary(func, arg));
        }
        Ok(match text.split_once('.') {
            Some((element, parameter)) if !element.is_empty() && !parameter.is_empty() => {
                Expr::Element {
                    element: element.to_string(),
                    parameter: parameter.to_string(),
                }
            }
            _ => Expr::Parameter(text),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct Vals(HashMap<&'static str, f64>);

    impl Scope for Vals {
        fn parameter(&self, name: &str) -> FsResult<f64> {
            self.0
                .get(name)
                .copied()
                .ok_or_else(|| ScoreError::Expression(format!("unknown {}", name)))
        }
    }

    fn vals() -> Vals {
        Vals([("a", 2.0), ("b", 3.0), ("speed", 30.0)].into_iter().collect())
    }

    #[test]
    fn precedence() {
        let e = Expr::parse("a+b*2").unwrap();
        assert_eq!(e.eval(&vals()).unwrap(), 8.0);
        let e = Expr::parse("(a+b)*2").unwrap();
        assert_eq!(e.eval(&vals()).unwrap(), 10.0);
    }

    #[test]
    fn functions_and_degrees() {
        assert_eq!(Expr::parse("abs(-a)").unwrap().eval(&vals()).unwrap(), 2.0);
        let e = Expr::parse("90°").unwrap();
        assert!((e.eval(&vals()).unwrap() - std::f64::consts::FRAC_PI_2).abs() < 1e-12);
        assert_eq!(Expr::parse("-1.5e2").unwrap(), Expr::Literal(-150.0));
    }

    #[test]
    fn text_round_trip() {
        for text in ["(a+(b*2))", "abs(speed)", "(-a)", "e1.roll", "((a/b)-1)"] {
            let e = Expr::parse(text).unwrap();
            assert_eq!(e.to_string(), text);
            assert_eq!(Expr::parse(&e.to_string()).unwrap(), e);
        }
    }

    #[test]
    fn errors_are_reported() {
        assert!(Expr::parse("a+").is_err());
        assert!(Expr::parse("foo(a)").is_err());
        assert!(Expr::parse("unknown").unwrap().eval(&vals()).is_err());
        assert!(Expr::parse("a/(b-3)").unwrap().eval(&vals()).is_err());
    }

    #[test]
    fn collectable() {
        assert_eq!(Expr::parse("abs(roll)").unwrap().collectable_parameter(), Some("roll"));
        assert_eq!(Expr::parse("roll*2").unwrap().collectable_parameter(), None);
    }
}
