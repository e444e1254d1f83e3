//! Boolean filter expressions over log entries
//!
//! Expressions reference the variables `req`, `method`, `uri`, `status`,
//! `time`, `uid` and `set_new_uid`:
//!
//! ```text
//! status >= 400 && method in ['GET', 'HEAD']
//! uri matches '^/api/' and not set_new_uid
//! time >= '2026-10-10T12:00:00+09:00'
//! ```
//!
//! Expressions are type-checked when compiled, so evaluation never fails.

mod lexer;
mod parser;

use crate::log::LogEntry;
use chrono::{DateTime, FixedOffset};
use parser::{CmpOp, Expr, Literal, StrOp, Var};
use std::cmp::Ordering;

pub use parser::ParseError;

impl From<ParseError> for crate::Error {
    fn from(err: ParseError) -> Self {
        crate::Error::Config(format!("Invalid filter expression: {}", err))
    }
}

/// A compiled filter expression
#[derive(Debug, Clone)]
pub struct Filter {
    source: String,
    expr: Option<Expr>,
}

impl Filter {
    /// Compile an expression; an empty expression accepts every entry
    pub fn compile(source: &str) -> crate::Result<Self> {
        let trimmed = source.trim();
        let expr = if trimmed.is_empty() {
            None
        } else {
            Some(parser::parse(trimmed)?)
        };

        tracing::debug!("Compiled filter expression: {:?}", trimmed);

        Ok(Self {
            source: trimmed.to_string(),
            expr,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Check if an entry passes the filter
    pub fn matches(&self, entry: &LogEntry) -> bool {
        match &self.expr {
            None => true,
            Some(expr) => matches!(eval(expr, entry), Value::Bool(true)),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Value<'a> {
    Str(&'a str),
    Int(i64),
    Bool(bool),
    Time(DateTime<FixedOffset>),
}

impl<'a> From<&'a Literal> for Value<'a> {
    fn from(literal: &'a Literal) -> Self {
        match literal {
            Literal::Str(s) => Value::Str(s),
            Literal::Int(n) => Value::Int(*n),
            Literal::Bool(b) => Value::Bool(*b),
            Literal::Time(t) => Value::Time(*t),
        }
    }
}

fn variable(var: Var, entry: &LogEntry) -> Value<'_> {
    match var {
        Var::Req => Value::Str(&entry.req),
        Var::Method => Value::Str(&entry.method),
        Var::Uri => Value::Str(&entry.uri),
        Var::Status => Value::Int(entry.status),
        Var::Time => Value::Time(entry.time),
        Var::Uid => Value::Str(&entry.uid),
        Var::SetNewUid => Value::Bool(entry.set_new_uid),
    }
}

fn truthy(value: Value<'_>) -> bool {
    matches!(value, Value::Bool(true))
}

fn eval<'a>(expr: &'a Expr, entry: &'a LogEntry) -> Value<'a> {
    match expr {
        Expr::Literal(literal) => literal.into(),
        Expr::Var(var) => variable(*var, entry),
        Expr::Not(inner) => Value::Bool(!truthy(eval(inner, entry))),
        Expr::And(left, right) => {
            Value::Bool(truthy(eval(left, entry)) && truthy(eval(right, entry)))
        }
        Expr::Or(left, right) => {
            Value::Bool(truthy(eval(left, entry)) || truthy(eval(right, entry)))
        }
        Expr::Compare { op, left, right } => {
            Value::Bool(compare(*op, eval(left, entry), eval(right, entry)))
        }
        Expr::Str { op, left, right } => {
            let result = match (eval(left, entry), eval(right, entry)) {
                (Value::Str(haystack), Value::Str(needle)) => match op {
                    StrOp::Contains => haystack.contains(needle),
                    StrOp::StartsWith => haystack.starts_with(needle),
                    StrOp::EndsWith => haystack.ends_with(needle),
                },
                _ => false,
            };
            Value::Bool(result)
        }
        Expr::Matches { left, regex } => match eval(left, entry) {
            Value::Str(s) => Value::Bool(regex.is_match(s)),
            _ => Value::Bool(false),
        },
        Expr::In { left, list } => {
            let value = eval(left, entry);
            Value::Bool(
                list.iter()
                    .any(|item| compare(CmpOp::Eq, value, item.into())),
            )
        }
    }
}

fn compare(op: CmpOp, left: Value<'_>, right: Value<'_>) -> bool {
    let ordering: Ordering = match (left, right) {
        (Value::Str(a), Value::Str(b)) => a.cmp(b),
        (Value::Int(a), Value::Int(b)) => a.cmp(&b),
        (Value::Bool(a), Value::Bool(b)) => a.cmp(&b),
        (Value::Time(a), Value::Time(b)) => a.cmp(&b),
        _ => return false,
    };

    match op {
        CmpOp::Eq => ordering.is_eq(),
        CmpOp::NotEq => ordering.is_ne(),
        CmpOp::Lt => ordering.is_lt(),
        CmpOp::Le => ordering.is_le(),
        CmpOp::Gt => ordering.is_gt(),
        CmpOp::Ge => ordering.is_ge(),
    }
}
