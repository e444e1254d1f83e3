use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Failed to read log stream: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Bad line syntax at line {line}: {reason}")]
    BadLineSyntax { line: usize, reason: String },

    #[error("Failed to parse field '{field}' at line {line}: {value:?}")]
    FieldParse {
        line: usize,
        field: &'static str,
        value: String,
    },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

impl Error {
    /// True for errors tied to a single input line; the stream stays usable after them.
    pub fn is_line_error(&self) -> bool {
        matches!(
            self,
            Error::BadLineSyntax { .. } | Error::FieldParse { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
