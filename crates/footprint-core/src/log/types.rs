use chrono::{DateTime, FixedOffset};
use regex::Regex;

/// A single parsed request line
#[derive(Debug, Clone)]
pub struct LogEntry {
    /// 1-based line number in the source stream
    pub line: usize,
    /// Raw request line, `METHOD URI[?QUERY] PROTO`
    pub req: String,
    pub method: String,
    /// Path after matching-group substitution
    pub uri: String,
    /// Path as it appeared in the request, query stripped
    pub path: String,
    /// Raw query string without the leading `?`
    pub query: Option<String>,
    pub proto: String,
    pub status: i64,
    /// User identifier, empty when absent
    pub uid: String,
    /// True when this entry assigned a new uid (`uidset` present)
    pub set_new_uid: bool,
    pub time: DateTime<FixedOffset>,
    /// True when the raw path matched an ignore pattern
    pub is_ignored: bool,
    /// The matching group that normalized this entry, if any
    pub matched_group: Option<Regex>,
}

impl LogEntry {
    /// Endpoint key, `"METHOD URI"`
    pub fn key(&self) -> String {
        format!("{} {}", self.method, self.uri)
    }
}

/// One item pulled from a [`LogReader`](super::LogReader)
#[derive(Debug, Clone)]
pub enum Record {
    Entry(Box<LogEntry>),
    /// The line parsed but the filter expression rejected it
    Filtered { line: usize },
}
