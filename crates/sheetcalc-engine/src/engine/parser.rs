//! Recursive descent parser producing the formula AST.
//!
//! Grammar (after reference expansion):
//!
//! ```text
//! expression     --> comparison
//! comparison     --> additive ( ("=" | "<>" | "!=" | "<" | ">" | "<=" | ">=") additive )?
//! additive       --> multiplicative ( ("+" | "-") multiplicative )*
//! multiplicative --> unary ( ("*" | "/") unary )*
//! unary          --> ("-" | "+") unary | primary
//! primary        --> NUMBER | STRING | BOOLEAN | ERROR | RANGE
//!                  | IDENT "(" arguments? ")" | "(" expression ")"
//! arguments      --> expression ("," expression)*
//! ```
//!
//! Function calls are resolved against the builtin table while parsing, so
//! an unknown name fails with `#NAME?` and a wrong argument count with
//! `#VALUE!` before anything is evaluated.

use std::fmt;

use super::error::FormulaError;
use super::lexer::{Lexer, Token};
use crate::builtins::{Builtin, lookup_builtin};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Plus,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl BinaryOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Eq => "=",
            BinaryOp::Ne => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
        }
    }
}

/// A parsed function call with its builtin already resolved.
#[derive(Clone, Debug)]
pub struct Call {
    pub builtin: &'static Builtin,
    pub args: Vec<Expr>,
}

#[derive(Clone, Debug)]
pub enum Expr {
    Number(f64),
    Text(String),
    Bool(bool),
    Error(FormulaError),
    Range(String),
    Group(Box<Expr>),
    Unary {
        op: UnaryOp,
        expr: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Call(Call),
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Number(n) => write!(f, "{}", super::format::format_number(*n)),
            Expr::Text(s) => f.write_str(&super::format::quote_text(s)),
            Expr::Bool(b) => f.write_str(if *b { "TRUE" } else { "FALSE" }),
            Expr::Error(e) => f.write_str(e.tag()),
            Expr::Range(r) => f.write_str(r),
            Expr::Group(inner) => write!(f, "({})", inner),
            Expr::Unary { op, expr } => match op {
                UnaryOp::Neg => write!(f, "-{}", expr),
                UnaryOp::Plus => write!(f, "+{}", expr),
            },
            Expr::Binary { op, lhs, rhs } => write!(f, "{}{}{}", lhs, op.symbol(), rhs),
            Expr::Call(call) => {
                write!(f, "{}(", call.builtin.name)?;
                for (i, arg) in call.args.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{}", arg)?;
                }
                f.write_str(")")
            }
        }
    }
}

/// Tokenize and parse an expression.
pub fn parse_expression(src: &str) -> Result<Expr, FormulaError> {
    let tokens = Lexer::new(src).tokenize()?;
    Parser::new(tokens).parse()
}

pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Parser { tokens, pos: 0 }
    }

    /// Parse the full token stream; trailing tokens are an error.
    pub fn parse(&mut self) -> Result<Expr, FormulaError> {
        if self.tokens.is_empty() {
            return Err(FormulaError::Generic);
        }
        let expr = self.expression()?;
        if self.pos != self.tokens.len() {
            return Err(FormulaError::Generic);
        }
        Ok(expr)
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn expect(&mut self, expected: &Token) -> Result<(), FormulaError> {
        if self.peek() == Some(expected) {
            self.pos += 1;
            Ok(())
        } else {
            Err(FormulaError::Generic)
        }
    }

    fn expression(&mut self) -> Result<Expr, FormulaError> {
        self.comparison()
    }

    fn comparison(&mut self) -> Result<Expr, FormulaError> {
        let lhs = self.additive()?;
        let op = match self.peek() {
            Some(Token::Eq) => BinaryOp::Eq,
            Some(Token::Ne) => BinaryOp::Ne,
            Some(Token::Lt) => BinaryOp::Lt,
            Some(Token::Le) => BinaryOp::Le,
            Some(Token::Gt) => BinaryOp::Gt,
            Some(Token::Ge) => BinaryOp::Ge,
            _ => return Ok(lhs),
        };
        self.pos += 1;
        let rhs = self.additive()?;
        Ok(Expr::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        })
    }

    fn additive(&mut self) -> Result<Expr, FormulaError> {
        let mut lhs = self.multiplicative()?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => BinaryOp::Add,
                Some(Token::Minus) => BinaryOp::Sub,
                _ => return Ok(lhs),
            };
            self.pos += 1;
            let rhs = self.multiplicative()?;
            lhs = Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
    }

    fn multiplicative(&mut self) -> Result<Expr, FormulaError> {
        let mut lhs = self.unary()?;
        loop {
            let op = match self.peek() {
                Some(Token::Star) => BinaryOp::Mul,
                Some(Token::Slash) => BinaryOp::Div,
                _ => return Ok(lhs),
            };
            self.pos += 1;
            let rhs = self.unary()?;
            lhs = Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
    }

    fn unary(&mut self) -> Result<Expr, FormulaError> {
        let op = match self.peek() {
            Some(Token::Minus) => UnaryOp::Neg,
            Some(Token::Plus) => UnaryOp::Plus,
            _ => return self.primary(),
        };
        self.pos += 1;
        Ok(Expr::Unary {
            op,
            expr: Box::new(self.unary()?),
        })
    }

    fn primary(&mut self) -> Result<Expr, FormulaError> {
        match self.advance() {
            Some(Token::Number(n)) => Ok(Expr::Number(n)),
            Some(Token::Text(s)) => Ok(Expr::Text(s)),
            Some(Token::Bool(b)) => Ok(Expr::Bool(b)),
            Some(Token::Error(e)) => Ok(Expr::Error(e)),
            Some(Token::Range(r)) => Ok(Expr::Range(r)),
            Some(Token::LParen) => {
                let inner = self.expression()?;
                self.expect(&Token::RParen)?;
                Ok(Expr::Group(Box::new(inner)))
            }
            // A bare name that is not a call (e.g. `Z` in `Z-1`) is malformed.
            Some(Token::Ident(name)) if self.peek() == Some(&Token::LParen) => self.call(&name),
            _ => Err(FormulaError::Generic),
        }
    }

    fn call(&mut self, name: &str) -> Result<Expr, FormulaError> {
        let builtin = lookup_builtin(name).ok_or(FormulaError::Name)?;
        self.expect(&Token::LParen)?;

        let mut args = Vec::new();
        if self.peek() == Some(&Token::RParen) {
            self.pos += 1;
        } else {
            loop {
                args.push(self.expression()?);
                match self.advance() {
                    Some(Token::Comma) => continue,
                    Some(Token::RParen) => break,
                    _ => return Err(FormulaError::Generic),
                }
            }
        }

        if !builtin.accepts(args.len()) {
            return Err(FormulaError::Value);
        }
        Ok(Expr::Call(Call { builtin, args }))
    }
}
