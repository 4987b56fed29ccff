//! Arithmetic calculator tool.
//!
//! Expressions are tokenized and parsed by a small recursive-descent parser
//! into an [`Expr`] tree, then evaluated over `f64`. The only names that
//! resolve are the constants `pi`/`e` and the functions in [`Function`]; there
//! is no other way for an expression to reach anything outside this module.
//!
//! Grammar (lowest to highest precedence):
//!
//! ```text
//! expr    := term (('+' | '-') term)*
//! term    := unary (('*' | '/' | '//' | '%') unary)*
//! unary   := ('+' | '-') unary | power
//! power   := primary ('**' unary)?
//! primary := NUMBER | NAME | NAME '(' args? ')' | '(' expr ')'
//! ```
//!
//! Input is capped at [`MAX_TOKENS`] tokens and [`MAX_DEPTH`] levels of
//! nesting, which keeps both parsing and evaluation off the end of the stack.

use std::iter::Peekable;
use std::str::Chars;

use async_trait::async_trait;

use crate::tools::tool::{Tool, ToolError, require_str};

/// Upper bound on parenthesis, call, unary-sign and `**` nesting.
const MAX_DEPTH: usize = 100;

/// Upper bound on tokens; also bounds the height of the expression tree.
const MAX_TOKENS: usize = 1000;

/// Why an expression could not be evaluated.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EvalError {
    #[error("empty expression")]
    Empty,

    #[error("invalid syntax: unexpected character '{0}'")]
    UnexpectedChar(char),

    #[error("invalid syntax: unexpected {0}")]
    UnexpectedToken(String),

    #[error("invalid syntax: unexpected end of expression")]
    UnexpectedEnd,

    #[error("invalid number literal '{0}'")]
    InvalidNumber(String),

    #[error("name '{0}' is not defined")]
    UnknownSymbol(String),

    #[error("'{0}' is not callable")]
    NotCallable(String),

    #[error("function '{0}' must be called with arguments")]
    BareFunction(String),

    #[error("{name}() takes {expected} ({given} given)")]
    Arity {
        name: &'static str,
        expected: &'static str,
        given: usize,
    },

    #[error("division by zero")]
    DivisionByZero,

    #[error("math domain error")]
    Domain,

    #[error("math range error")]
    Range,

    #[error("expression too deeply nested")]
    TooDeep,

    #[error("expression too long")]
    TooLong,
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Name(String),
    Plus,
    Minus,
    Star,
    DoubleStar,
    Slash,
    DoubleSlash,
    Percent,
    LParen,
    RParen,
    Comma,
}

impl Token {
    fn describe(&self) -> String {
        match self {
            Token::Number(n) => format!("number {}", n),
            Token::Name(n) => format!("name '{}'", n),
            Token::Plus => "'+'".into(),
            Token::Minus => "'-'".into(),
            Token::Star => "'*'".into(),
            Token::DoubleStar => "'**'".into(),
            Token::Slash => "'/'".into(),
            Token::DoubleSlash => "'//'".into(),
            Token::Percent => "'%'".into(),
            Token::LParen => "'('".into(),
            Token::RParen => "')'".into(),
            Token::Comma => "','".into(),
        }
    }
}

fn tokenize(input: &str) -> Result<Vec<Token>, EvalError> {
    let mut tokens = Vec::new();
    let mut chars = input.chars().peekable();

    while let Some(&c) = chars.peek() {
        match c {
            c if c.is_whitespace() => {
                chars.next();
            }
            '0'..='9' | '.' => tokens.push(Token::Number(lex_number(&mut chars)?)),
            c if c.is_ascii_alphabetic() || c == '_' => {
                let mut name = String::new();
                while let Some(&c) = chars.peek() {
                    if c.is_ascii_alphanumeric() || c == '_' {
                        name.push(c);
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push(Token::Name(name));
            }
            '+' => {
                chars.next();
                tokens.push(Token::Plus);
            }
            '-' => {
                chars.next();
                tokens.push(Token::Minus);
            }
            '*' => {
                chars.next();
                if chars.next_if_eq(&'*').is_some() {
                    tokens.push(Token::DoubleStar);
                } else {
                    tokens.push(Token::Star);
                }
            }
            '/' => {
                chars.next();
                if chars.next_if_eq(&'/').is_some() {
                    tokens.push(Token::DoubleSlash);
                } else {
                    tokens.push(Token::Slash);
                }
            }
            '%' => {
                chars.next();
                tokens.push(Token::Percent);
            }
            '(' => {
                chars.next();
                tokens.push(Token::LParen);
            }
            ')' => {
                chars.next();
                tokens.push(Token::RParen);
            }
            ',' => {
                chars.next();
                tokens.push(Token::Comma);
            }
            other => return Err(EvalError::UnexpectedChar(other)),
        }
    }

    Ok(tokens)
}

fn lex_number(chars: &mut Peekable<Chars<'_>>) -> Result<f64, EvalError> {
    let mut literal = String::new();
    while let Some(c) = chars.next_if(|c| c.is_ascii_digit() || *c == '.') {
        literal.push(c);
    }
    // Exponent part: only consumed when followed by digits, so `2e` stays an error.
    if let Some(&e) = chars.peek() {
        if e == 'e' || e == 'E' {
            let mut lookahead = chars.clone();
            lookahead.next();
            let mut exponent = String::from(e);
            if let Some(sign) = lookahead.next_if(|c| *c == '+' || *c == '-') {
                exponent.push(sign);
            }
            if lookahead.peek().is_some_and(|c| c.is_ascii_digit()) {
                while let Some(d) = lookahead.next_if(|c| c.is_ascii_digit()) {
                    exponent.push(d);
                }
                literal.push_str(&exponent);
                *chars = lookahead;
            }
        }
    }

    if literal == "." || literal.matches('.').count() > 1 {
        return Err(EvalError::InvalidNumber(literal));
    }
    literal
        .parse::<f64>()
        .map_err(|_| EvalError::InvalidNumber(literal))
}

/// Functions callable from an expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Function {
    Abs,
    Round,
    Min,
    Max,
    Sum,
    Pow,
    Sqrt,
    Sin,
    Cos,
    Tan,
    Log,
    Log10,
    Exp,
    Floor,
    Ceil,
}

impl Function {
    fn lookup(name: &str) -> Option<Self> {
        Some(match name {
            "abs" => Function::Abs,
            "round" => Function::Round,
            "min" => Function::Min,
            "max" => Function::Max,
            "sum" => Function::Sum,
            "pow" => Function::Pow,
            "sqrt" => Function::Sqrt,
            "sin" => Function::Sin,
            "cos" => Function::Cos,
            "tan" => Function::Tan,
            "log" => Function::Log,
            "log10" => Function::Log10,
            "exp" => Function::Exp,
            "floor" => Function::Floor,
            "ceil" => Function::Ceil,
            _ => return None,
        })
    }

    fn name(self) -> &'static str {
        match self {
            Function::Abs => "abs",
            Function::Round => "round",
            Function::Min => "min",
            Function::Max => "max",
            Function::Sum => "sum",
            Function::Pow => "pow",
            Function::Sqrt => "sqrt",
            Function::Sin => "sin",
            Function::Cos => "cos",
            Function::Tan => "tan",
            Function::Log => "log",
            Function::Log10 => "log10",
            Function::Exp => "exp",
            Function::Floor => "floor",
            Function::Ceil => "ceil",
        }
    }

    fn check_arity(self, given: usize) -> Result<(), EvalError> {
        let (ok, expected) = match self {
            Function::Round | Function::Log => ((1..=2).contains(&given), "1 or 2 arguments"),
            Function::Min | Function::Max => (given >= 1, "at least 1 argument"),
            Function::Sum => (true, "any number of arguments"),
            Function::Pow => (given == 2, "exactly 2 arguments"),
            _ => (given == 1, "exactly 1 argument"),
        };
        if ok {
            Ok(())
        } else {
            Err(EvalError::Arity {
                name: self.name(),
                expected,
                given,
            })
        }
    }

    fn apply(self, args: &[f64]) -> Result<f64, EvalError> {
        let x = args.first().copied().unwrap_or_default();
        let value = match self {
            Function::Abs => x.abs(),
            Function::Round => match args.get(1) {
                None => x.round_ties_even(),
                Some(digits) => {
                    let scale = 10f64.powi(digits.trunc() as i32);
                    let scaled = x * scale;
                    if !scale.is_finite() || !scaled.is_finite() {
                        // More digits than f64 carries: nothing to round.
                        x
                    } else if scale == 0.0 {
                        0.0 * x.signum()
                    } else {
                        scaled.round_ties_even() / scale
                    }
                }
            },
            Function::Min => args.iter().copied().fold(f64::INFINITY, f64::min),
            Function::Max => args.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            Function::Sum => args.iter().sum(),
            Function::Pow => power(x, args[1])?,
            Function::Sqrt => {
                if x < 0.0 {
                    return Err(EvalError::Domain);
                }
                x.sqrt()
            }
            Function::Sin => x.sin(),
            Function::Cos => x.cos(),
            Function::Tan => x.tan(),
            Function::Log => {
                if x <= 0.0 {
                    return Err(EvalError::Domain);
                }
                match args.get(1) {
                    None => x.ln(),
                    Some(&base) => {
                        if base <= 0.0 {
                            return Err(EvalError::Domain);
                        }
                        let denominator = base.ln();
                        if denominator == 0.0 {
                            return Err(EvalError::DivisionByZero);
                        }
                        x.ln() / denominator
                    }
                }
            }
            Function::Log10 => {
                if x <= 0.0 {
                    return Err(EvalError::Domain);
                }
                x.log10()
            }
            Function::Exp => x.exp(),
            Function::Floor => x.floor(),
            Function::Ceil => x.ceil(),
        };
        finite(value)
    }
}

fn finite(value: f64) -> Result<f64, EvalError> {
    if value.is_nan() {
        Err(EvalError::Domain)
    } else if value.is_infinite() {
        Err(EvalError::Range)
    } else {
        Ok(value)
    }
}

fn power(base: f64, exponent: f64) -> Result<f64, EvalError> {
    if base == 0.0 && exponent < 0.0 {
        return Err(EvalError::DivisionByZero);
    }
    // A negative base with a fractional exponent would be complex.
    if base < 0.0 && exponent.fract() != 0.0 {
        return Err(EvalError::Domain);
    }
    finite(base.powf(exponent))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    FloorDiv,
    Mod,
    Pow,
}

#[derive(Debug, Clone, PartialEq)]
enum Expr {
    Number(f64),
    Neg(Box<Expr>),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
    Call(Function, Vec<Expr>),
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl Parser {
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

    fn expect(&mut self, expected: Token) -> Result<(), EvalError> {
        match self.advance() {
            Some(t) if t == expected => Ok(()),
            Some(t) => Err(EvalError::UnexpectedToken(t.describe())),
            None => Err(EvalError::UnexpectedEnd),
        }
    }

    /// Run `parse` one nesting level deeper.
    fn nested<T>(
        &mut self,
        parse: impl FnOnce(&mut Self) -> Result<T, EvalError>,
    ) -> Result<T, EvalError> {
        if self.depth >= MAX_DEPTH {
            return Err(EvalError::TooDeep);
        }
        self.depth += 1;
        let result = parse(self);
        self.depth -= 1;
        result
    }

    fn parse_expr(&mut self) -> Result<Expr, EvalError> {
        let mut left = self.parse_term()?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => BinaryOp::Add,
                Some(Token::Minus) => BinaryOp::Sub,
                _ => return Ok(left),
            };
            self.advance();
            let right = self.parse_term()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
    }

    fn parse_term(&mut self) -> Result<Expr, EvalError> {
        let mut left = self.parse_unary()?;
        loop {
            let op = match self.peek() {
                Some(Token::Star) => BinaryOp::Mul,
                Some(Token::Slash) => BinaryOp::Div,
                Some(Token::DoubleSlash) => BinaryOp::FloorDiv,
                Some(Token::Percent) => BinaryOp::Mod,
                _ => return Ok(left),
            };
            self.advance();
            let right = self.parse_unary()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
    }

    fn parse_unary(&mut self) -> Result<Expr, EvalError> {
        match self.peek() {
            Some(Token::Minus) => {
                self.advance();
                Ok(Expr::Neg(Box::new(self.nested(Self::parse_unary)?)))
            }
            Some(Token::Plus) => {
                self.advance();
                self.nested(Self::parse_unary)
            }
            _ => self.parse_power(),
        }
    }

    fn parse_power(&mut self) -> Result<Expr, EvalError> {
        let base = self.parse_primary()?;
        if self.peek() == Some(&Token::DoubleStar) {
            self.advance();
            let exponent = self.nested(Self::parse_unary)?;
            return Ok(Expr::Binary(
                BinaryOp::Pow,
                Box::new(base),
                Box::new(exponent),
            ));
        }
        Ok(base)
    }

    fn parse_primary(&mut self) -> Result<Expr, EvalError> {
        match self.advance() {
            Some(Token::Number(n)) => Ok(Expr::Number(n)),
            Some(Token::LParen) => {
                let inner = self.nested(Self::parse_expr)?;
                self.expect(Token::RParen)?;
                Ok(inner)
            }
            Some(Token::Name(name)) => self.parse_name(name),
            Some(t) => Err(EvalError::UnexpectedToken(t.describe())),
            None => Err(EvalError::UnexpectedEnd),
        }
    }

    fn parse_name(&mut self, name: String) -> Result<Expr, EvalError> {
        let is_call = self.peek() == Some(&Token::LParen);
        let constant = match name.as_str() {
            "pi" => Some(std::f64::consts::PI),
            "e" => Some(std::f64::consts::E),
            _ => None,
        };

        if let Some(value) = constant {
            if is_call {
                return Err(EvalError::NotCallable(name));
            }
            return Ok(Expr::Number(value));
        }

        let function = Function::lookup(&name).ok_or(EvalError::UnknownSymbol(name.clone()))?;
        if !is_call {
            return Err(EvalError::BareFunction(name));
        }
        self.advance();

        let mut args = Vec::new();
        if self.peek() == Some(&Token::RParen) {
            self.advance();
        } else {
            loop {
                args.push(self.nested(Self::parse_expr)?);
                match self.advance() {
                    Some(Token::Comma) => continue,
                    Some(Token::RParen) => break,
                    Some(t) => return Err(EvalError::UnexpectedToken(t.describe())),
                    None => return Err(EvalError::UnexpectedEnd),
                }
            }
        }

        function.check_arity(args.len())?;
        Ok(Expr::Call(function, args))
    }
}

fn parse(input: &str) -> Result<Expr, EvalError> {
    let tokens = tokenize(input)?;
    if tokens.is_empty() {
        return Err(EvalError::Empty);
    }
    if tokens.len() > MAX_TOKENS {
        return Err(EvalError::TooLong);
    }
    let mut parser = Parser {
        tokens,
        pos: 0,
        depth: 0,
    };
    let expr = parser.parse_expr()?;
    if let Some(extra) = parser.peek() {
        return Err(EvalError::UnexpectedToken(extra.describe()));
    }
    Ok(expr)
}

fn eval(expr: &Expr) -> Result<f64, EvalError> {
    match expr {
        Expr::Number(n) => Ok(*n),
        Expr::Neg(inner) => Ok(-eval(inner)?),
        Expr::Binary(op, left, right) => {
            let a = eval(left)?;
            let b = eval(right)?;
            match op {
                BinaryOp::Add => finite(a + b),
                BinaryOp::Sub => finite(a - b),
                BinaryOp::Mul => finite(a * b),
                BinaryOp::Div => {
                    if b == 0.0 {
                        return Err(EvalError::DivisionByZero);
                    }
                    finite(a / b)
                }
                BinaryOp::FloorDiv => {
                    if b == 0.0 {
                        return Err(EvalError::DivisionByZero);
                    }
                    finite((a / b).floor())
                }
                BinaryOp::Mod => {
                    if b == 0.0 {
                        return Err(EvalError::DivisionByZero);
                    }
                    // Result takes the sign of the divisor.
                    finite(a - b * (a / b).floor())
                }
                BinaryOp::Pow => power(a, b),
            }
        }
        Expr::Call(function, args) => {
            let values = args.iter().map(eval).collect::<Result<Vec<_>, _>>()?;
            function.apply(&values)
        }
    }
}

/// Parse and evaluate an arithmetic expression.
pub fn evaluate(input: &str) -> Result<f64, EvalError> {
    eval(&parse(input)?)
}

/// Render a result the way a person would write it: integral values without
/// a trailing `.0`.
pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e16 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

/// Tool wrapper around [`evaluate`].
pub struct CalculatorTool;

#[async_trait]
impl Tool for CalculatorTool {
    fn name(&self) -> &str {
        "calculator"
    }

    fn description(&self) -> &str {
        "Evaluates a mathematical expression and returns the result. Supports + - * / // % **, \
         parentheses, pi, e and the functions abs, round, min, max, sum, pow, sqrt, sin, cos, \
         tan, log, log10, exp, floor, ceil."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "expression": {
                    "type": "string",
                    "description": "A mathematical expression to evaluate (e.g., \"2 + 2\", \"sqrt(16)\")"
                }
            },
            "required": ["expression"]
        })
    }

    async fn execute(&self, params: serde_json::Value) -> Result<String, ToolError> {
        let expression = require_str(&params, "expression")?;
        let value = evaluate(expression).map_err(|e| ToolError::Evaluation(e.to_string()))?;
        Ok(format!("Result: {}", format_number(value)))
    }
}
