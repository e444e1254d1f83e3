//! Lexer for filter expressions using Logos

use logos::Logos;
use std::fmt;
use std::ops::Range;

#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\r\n\f]+")]
pub enum Token {
    #[token("&&")]
    #[token("and")]
    And,
    #[token("||")]
    #[token("or")]
    Or,
    #[token("!")]
    #[token("not")]
    Not,

    #[token("==")]
    EqEq,
    #[token("!=")]
    NotEq,
    #[token("<")]
    Lt,
    #[token("<=")]
    Le,
    #[token(">")]
    Gt,
    #[token(">=")]
    Ge,

    #[token("matches")]
    Matches,
    #[token("contains")]
    Contains,
    #[token("startsWith")]
    StartsWith,
    #[token("endsWith")]
    EndsWith,
    #[token("in")]
    In,

    #[token("true")]
    True,
    #[token("false")]
    False,

    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token(",")]
    Comma,

    #[regex(r"-?[0-9]+", |lex| lex.slice().parse::<i64>().ok())]
    Integer(i64),

    #[regex(r#""([^"\\]|\\.)*""#, |lex| unquote(lex.slice()))]
    #[regex(r#"'([^'\\]|\\.)*'"#, |lex| unquote(lex.slice()))]
    String(String),

    #[regex(r"[a-zA-Z_][a-zA-Z0-9_]*", |lex| lex.slice().to_string())]
    Ident(String),
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::And => write!(f, "&&"),
            Token::Or => write!(f, "||"),
            Token::Not => write!(f, "!"),
            Token::EqEq => write!(f, "=="),
            Token::NotEq => write!(f, "!="),
            Token::Lt => write!(f, "<"),
            Token::Le => write!(f, "<="),
            Token::Gt => write!(f, ">"),
            Token::Ge => write!(f, ">="),
            Token::Matches => write!(f, "matches"),
            Token::Contains => write!(f, "contains"),
            Token::StartsWith => write!(f, "startsWith"),
            Token::EndsWith => write!(f, "endsWith"),
            Token::In => write!(f, "in"),
            Token::True => write!(f, "true"),
            Token::False => write!(f, "false"),
            Token::LParen => write!(f, "("),
            Token::RParen => write!(f, ")"),
            Token::LBracket => write!(f, "["),
            Token::RBracket => write!(f, "]"),
            Token::Comma => write!(f, ","),
            Token::Integer(n) => write!(f, "{}", n),
            Token::String(s) => write!(f, "{:?}", s),
            Token::Ident(s) => write!(f, "{}", s),
        }
    }
}

/// Token with its byte range in the source
#[derive(Debug, Clone, PartialEq)]
pub struct SpannedToken {
    pub token: Token,
    pub span: Range<usize>,
}

/// Tokenize a whole expression, failing at the first unrecognized character
pub fn tokenize(source: &str) -> Result<Vec<SpannedToken>, usize> {
    let mut lexer = Token::lexer(source);
    let mut tokens = Vec::new();

    while let Some(token) = lexer.next() {
        match token {
            Ok(token) => tokens.push(SpannedToken {
                token,
                span: lexer.span(),
            }),
            Err(()) => return Err(lexer.span().start),
        }
    }

    Ok(tokens)
}

/// Strip the surrounding quotes and resolve simple escapes.
/// Unknown escapes keep their backslash so regex classes like `\d` survive.
fn unquote(raw: &str) -> String {
    let inner = &raw[1..raw.len() - 1];
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();

    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('\\') => out.push('\\'),
            Some('"') => out.push('"'),
            Some('\'') => out.push('\''),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(source: &str) -> Vec<Token> {
        tokenize(source)
            .unwrap()
            .into_iter()
            .map(|t| t.token)
            .collect()
    }

    #[test]
    fn test_keywords_and_symbols() {
        assert_eq!(
            tokens("status >= 400 and not (uid == '')"),
            vec![
                Token::Ident("status".to_string()),
                Token::Ge,
                Token::Integer(400),
                Token::And,
                Token::Not,
                Token::LParen,
                Token::Ident("uid".to_string()),
                Token::EqEq,
                Token::String(String::new()),
                Token::RParen,
            ]
        );
        assert_eq!(tokens("a || b"), tokens("a or b"));
    }

    #[test]
    fn test_identifier_prefixed_by_keyword() {
        assert_eq!(tokens("order"), vec![Token::Ident("order".to_string())]);
        assert_eq!(tokens("index"), vec![Token::Ident("index".to_string())]);
    }

    #[test]
    fn test_string_escapes() {
        assert_eq!(
            tokens(r#""^/api/\d+\"x\"""#),
            vec![Token::String(r#"^/api/\d+"x""#.to_string())]
        );
    }

    #[test]
    fn test_unknown_character() {
        assert_eq!(tokenize("status # 1"), Err(7));
    }
}
