//! Recursive descent parser and type checker for filter expressions

use super::lexer::{SpannedToken, Token, tokenize};
use chrono::{DateTime, FixedOffset};
use regex::Regex;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ParseError {
    #[error("unexpected character at position {0}")]
    InvalidCharacter(usize),

    #[error("unexpected token at position {position}: expected {expected}, found {found}")]
    UnexpectedToken {
        position: usize,
        expected: String,
        found: String,
    },

    #[error("unexpected end of expression, expected {0}")]
    UnexpectedEof(String),

    #[error("unknown variable '{0}'")]
    UnknownVariable(String),

    #[error("type mismatch: {0}")]
    TypeMismatch(String),

    #[error("invalid regex {pattern:?}: {message}")]
    InvalidRegex { pattern: String, message: String },

    #[error("invalid timestamp {0:?}, expected RFC 3339")]
    InvalidTimestamp(String),
}

pub type ParseResult<T> = Result<T, ParseError>;

/// Variables an expression can reference
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Var {
    Req,
    Method,
    Uri,
    Status,
    Time,
    Uid,
    SetNewUid,
}

impl Var {
    fn lookup(name: &str) -> Option<Self> {
        match name {
            "req" => Some(Var::Req),
            "method" => Some(Var::Method),
            "uri" => Some(Var::Uri),
            "status" => Some(Var::Status),
            "time" => Some(Var::Time),
            "uid" => Some(Var::Uid),
            "set_new_uid" => Some(Var::SetNewUid),
            _ => None,
        }
    }

    fn ty(self) -> Type {
        match self {
            Var::Req | Var::Method | Var::Uri | Var::Uid => Type::Str,
            Var::Status => Type::Int,
            Var::Time => Type::Time,
            Var::SetNewUid => Type::Bool,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Type {
    Str,
    Int,
    Bool,
    Time,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Str(String),
    Int(i64),
    Bool(bool),
    Time(DateTime<FixedOffset>),
}

impl Literal {
    fn ty(&self) -> Type {
        match self {
            Literal::Str(_) => Type::Str,
            Literal::Int(_) => Type::Int,
            Literal::Bool(_) => Type::Bool,
            Literal::Time(_) => Type::Time,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    NotEq,
    Lt,
    Le,
    Gt,
    Ge,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrOp {
    Contains,
    StartsWith,
    EndsWith,
}

#[derive(Debug, Clone)]
pub enum Expr {
    Literal(Literal),
    Var(Var),
    Not(Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Compare {
        op: CmpOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Str {
        op: StrOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Matches {
        left: Box<Expr>,
        regex: Regex,
    },
    In {
        left: Box<Expr>,
        list: Vec<Literal>,
    },
}

/// Parse and type-check an expression; the result is always boolean
pub fn parse(source: &str) -> ParseResult<Expr> {
    let tokens = tokenize(source).map_err(ParseError::InvalidCharacter)?;
    let mut parser = Parser { tokens, pos: 0 };

    let mut expr = parser.parse_or_expr()?;
    if let Some(extra) = parser.peek() {
        return Err(ParseError::UnexpectedToken {
            position: extra.span.start,
            expected: "end of expression".to_string(),
            found: extra.token.to_string(),
        });
    }

    match check(&mut expr)? {
        Type::Bool => Ok(expr),
        other => Err(ParseError::TypeMismatch(format!(
            "expression must be boolean, found {:?}",
            other
        ))),
    }
}

struct Parser {
    tokens: Vec<SpannedToken>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&SpannedToken> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<SpannedToken> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn match_token(&mut self, token: &Token) -> bool {
        if self.peek().is_some_and(|t| &t.token == token) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, token: &Token, expected: &str) -> ParseResult<()> {
        match self.advance() {
            Some(t) if &t.token == token => Ok(()),
            Some(t) => Err(ParseError::UnexpectedToken {
                position: t.span.start,
                expected: expected.to_string(),
                found: t.token.to_string(),
            }),
            None => Err(ParseError::UnexpectedEof(expected.to_string())),
        }
    }

    fn parse_or_expr(&mut self) -> ParseResult<Expr> {
        let mut left = self.parse_and_expr()?;
        while self.match_token(&Token::Or) {
            let right = self.parse_and_expr()?;
            left = Expr::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_and_expr(&mut self) -> ParseResult<Expr> {
        let mut left = self.parse_not_expr()?;
        while self.match_token(&Token::And) {
            let right = self.parse_not_expr()?;
            left = Expr::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_not_expr(&mut self) -> ParseResult<Expr> {
        if self.match_token(&Token::Not) {
            let expr = self.parse_not_expr()?;
            return Ok(Expr::Not(Box::new(expr)));
        }
        self.parse_comparison_expr()
    }

    fn parse_comparison_expr(&mut self) -> ParseResult<Expr> {
        let left = self.parse_primary_expr()?;

        let Some(next) = self.peek().map(|t| t.token.clone()) else {
            return Ok(left);
        };

        let cmp = match next {
            Token::EqEq => Some(CmpOp::Eq),
            Token::NotEq => Some(CmpOp::NotEq),
            Token::Lt => Some(CmpOp::Lt),
            Token::Le => Some(CmpOp::Le),
            Token::Gt => Some(CmpOp::Gt),
            Token::Ge => Some(CmpOp::Ge),
            _ => None,
        };
        if let Some(op) = cmp {
            self.pos += 1;
            let right = self.parse_primary_expr()?;
            return Ok(Expr::Compare {
                op,
                left: Box::new(left),
                right: Box::new(right),
            });
        }

        let str_op = match next {
            Token::Contains => Some(StrOp::Contains),
            Token::StartsWith => Some(StrOp::StartsWith),
            Token::EndsWith => Some(StrOp::EndsWith),
            _ => None,
        };
        if let Some(op) = str_op {
            self.pos += 1;
            let right = self.parse_primary_expr()?;
            return Ok(Expr::Str {
                op,
                left: Box::new(left),
                right: Box::new(right),
            });
        }

        match next {
            Token::Matches => {
                self.pos += 1;
                let regex = self.parse_regex()?;
                Ok(Expr::Matches {
                    left: Box::new(left),
                    regex,
                })
            }
            Token::In => {
                self.pos += 1;
                let list = self.parse_list()?;
                Ok(Expr::In {
                    left: Box::new(left),
                    list,
                })
            }
            _ => Ok(left),
        }
    }

    fn parse_regex(&mut self) -> ParseResult<Regex> {
        match self.advance() {
            Some(SpannedToken {
                token: Token::String(pattern),
                ..
            }) => Regex::new(&pattern).map_err(|e| ParseError::InvalidRegex {
                message: e.to_string(),
                pattern,
            }),
            Some(t) => Err(ParseError::UnexpectedToken {
                position: t.span.start,
                expected: "regex string".to_string(),
                found: t.token.to_string(),
            }),
            None => Err(ParseError::UnexpectedEof("regex string".to_string())),
        }
    }

    fn parse_list(&mut self) -> ParseResult<Vec<Literal>> {
        self.expect(&Token::LBracket, "'['")?;
        let mut items = Vec::new();

        if self.match_token(&Token::RBracket) {
            return Ok(items);
        }

        loop {
            match self.parse_primary_expr()? {
                Expr::Literal(literal) => items.push(literal),
                _ => {
                    return Err(ParseError::TypeMismatch(
                        "list items must be literals".to_string(),
                    ));
                }
            }
            if self.match_token(&Token::Comma) {
                continue;
            }
            self.expect(&Token::RBracket, "',' or ']'")?;
            return Ok(items);
        }
    }

    fn parse_primary_expr(&mut self) -> ParseResult<Expr> {
        let Some(token) = self.advance() else {
            return Err(ParseError::UnexpectedEof("expression".to_string()));
        };

        match token.token {
            Token::Integer(n) => Ok(Expr::Literal(Literal::Int(n))),
            Token::String(s) => Ok(Expr::Literal(Literal::Str(s))),
            Token::True => Ok(Expr::Literal(Literal::Bool(true))),
            Token::False => Ok(Expr::Literal(Literal::Bool(false))),
            Token::Ident(name) => Var::lookup(&name)
                .map(Expr::Var)
                .ok_or(ParseError::UnknownVariable(name)),
            Token::LParen => {
                let expr = self.parse_or_expr()?;
                self.expect(&Token::RParen, "')'")?;
                Ok(expr)
            }
            other => Err(ParseError::UnexpectedToken {
                position: token.span.start,
                expected: "expression".to_string(),
                found: other.to_string(),
            }),
        }
    }
}

/// Infer the type of `expr`, rewriting string literals compared against
/// `time` into timestamps
fn check(expr: &mut Expr) -> ParseResult<Type> {
    match expr {
        Expr::Literal(literal) => Ok(literal.ty()),
        Expr::Var(var) => Ok(var.ty()),
        Expr::Not(inner) => {
            expect_type(check(inner)?, Type::Bool, "operand of '!'")?;
            Ok(Type::Bool)
        }
        Expr::And(left, right) | Expr::Or(left, right) => {
            expect_type(check(left)?, Type::Bool, "operand of logical operator")?;
            expect_type(check(right)?, Type::Bool, "operand of logical operator")?;
            Ok(Type::Bool)
        }
        Expr::Compare { op, left, right } => {
            coerce_time(left, right)?;
            coerce_time(right, left)?;
            let lt = check(left)?;
            let rt = check(right)?;
            if lt != rt {
                return Err(ParseError::TypeMismatch(format!(
                    "cannot compare {:?} with {:?}",
                    lt, rt
                )));
            }
            if lt == Type::Bool && !matches!(op, CmpOp::Eq | CmpOp::NotEq) {
                return Err(ParseError::TypeMismatch(
                    "booleans only support == and !=".to_string(),
                ));
            }
            Ok(Type::Bool)
        }
        Expr::Str { left, right, .. } => {
            expect_type(check(left)?, Type::Str, "left operand of string operator")?;
            expect_type(check(right)?, Type::Str, "right operand of string operator")?;
            Ok(Type::Bool)
        }
        Expr::Matches { left, .. } => {
            expect_type(check(left)?, Type::Str, "left operand of 'matches'")?;
            Ok(Type::Bool)
        }
        Expr::In { left, list } => {
            let lt = check(left)?;
            for item in list.iter_mut() {
                if lt == Type::Time
                    && let Literal::Str(raw) = item
                {
                    let ts = parse_timestamp(raw)?;
                    *item = Literal::Time(ts);
                }
                expect_type(item.ty(), lt, "list item")?;
            }
            Ok(Type::Bool)
        }
    }
}

fn coerce_time(target: &mut Expr, other: &Expr) -> ParseResult<()> {
    if matches!(other, Expr::Var(Var::Time))
        && let Expr::Literal(Literal::Str(raw)) = target
    {
        let ts = parse_timestamp(raw)?;
        *target = Expr::Literal(Literal::Time(ts));
    }
    Ok(())
}

fn parse_timestamp(raw: &str) -> ParseResult<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc3339(raw).map_err(|_| ParseError::InvalidTimestamp(raw.to_string()))
}

fn expect_type(found: Type, expected: Type, what: &str) -> ParseResult<()> {
    if found == expected {
        Ok(())
    } else {
        Err(ParseError::TypeMismatch(format!(
            "{} must be {:?}, found {:?}",
            what, expected, found
        )))
    }
}
