use super::types::{LogEntry, Record};
use crate::filter::Filter;
use crate::{Error, Result};
use chrono::format::{Fixed, Item, StrftimeItems};
use chrono::{DateTime, FixedOffset, NaiveDateTime};
use regex::Regex;
use std::io::BufRead;

/// Default timestamp layout, e.g. `10/Oct/2026:13:55:36 +0900`
pub const DEFAULT_TIME_FORMAT: &str = "%d/%b/%Y:%H:%M:%S %z";

/// Options controlling how log lines are normalized and filtered
#[derive(Debug, Clone)]
pub struct ReaderOptions {
    /// Ordered regexes; the first one matching a path replaces it
    pub matching_groups: Vec<String>,
    /// Regexes flagging entries as ignored
    pub ignore_patterns: Vec<String>,
    /// chrono strftime layout of the `time` label
    pub time_format: String,
    /// Boolean filter expression; `None` or empty accepts everything
    pub filter: Option<String>,
}

impl Default for ReaderOptions {
    fn default() -> Self {
        Self {
            matching_groups: Vec::new(),
            ignore_patterns: Vec::new(),
            time_format: DEFAULT_TIME_FORMAT.to_string(),
            filter: None,
        }
    }
}

impl ReaderOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_matching_groups(mut self, groups: Vec<String>) -> Self {
        self.matching_groups = groups;
        self
    }

    pub fn with_ignore_patterns(mut self, patterns: Vec<String>) -> Self {
        self.ignore_patterns = patterns;
        self
    }

    pub fn with_time_format(mut self, format: impl Into<String>) -> Self {
        self.time_format = format.into();
        self
    }

    pub fn with_filter(mut self, expr: impl Into<String>) -> Self {
        self.filter = Some(expr.into());
        self
    }
}

/// Compiled timestamp layout
#[derive(Debug, Clone)]
struct TimeFormat {
    layout: String,
    has_zone: bool,
}

impl TimeFormat {
    fn compile(layout: &str) -> Result<Self> {
        if layout.is_empty() {
            return Err(Error::Config("Time format must not be empty".to_string()));
        }

        let mut has_zone = false;
        for item in StrftimeItems::new(layout) {
            match item {
                Item::Error => {
                    return Err(Error::Config(format!("Invalid time format '{}'", layout)));
                }
                Item::Fixed(
                    Fixed::TimezoneOffset
                    | Fixed::TimezoneOffsetColon
                    | Fixed::TimezoneOffsetDoubleColon
                    | Fixed::TimezoneOffsetTripleColon
                    | Fixed::TimezoneOffsetColonZ
                    | Fixed::TimezoneOffsetZ
                    | Fixed::RFC2822
                    | Fixed::RFC3339,
                ) => has_zone = true,
                _ => {}
            }
        }

        Ok(Self {
            layout: layout.to_string(),
            has_zone,
        })
    }

    fn parse(&self, value: &str) -> Option<DateTime<FixedOffset>> {
        // Apache's %t wraps the timestamp in brackets
        let value = value
            .strip_prefix('[')
            .and_then(|v| v.strip_suffix(']'))
            .unwrap_or(value);

        if self.has_zone {
            DateTime::parse_from_str(value, &self.layout).ok()
        } else {
            NaiveDateTime::parse_from_str(value, &self.layout)
                .ok()
                .map(|naive| naive.and_utc().fixed_offset())
        }
    }
}

/// Labels recognized on a single line
#[derive(Debug, Default)]
struct Fields<'a> {
    req: Option<&'a str>,
    status: Option<&'a str>,
    time: Option<&'a str>,
    uidset: Option<&'a str>,
    uidgot: Option<&'a str>,
}

impl<'a> Fields<'a> {
    fn parse(line: usize, text: &'a str) -> Result<Self> {
        let mut fields = Fields::default();

        for token in text.split('\t') {
            if token.is_empty() {
                continue;
            }
            let (label, value) = token.split_once(':').ok_or_else(|| Error::BadLineSyntax {
                line,
                reason: format!("expected label:value, found {:?}", token),
            })?;

            match label {
                "req" => fields.req = Some(value),
                "status" => fields.status = Some(value),
                "time" => fields.time = Some(value),
                "uidset" => fields.uidset = Some(value),
                "uidgot" => fields.uidgot = Some(value),
                _ => {}
            }
        }

        Ok(fields)
    }
}

fn required<'a>(line: usize, label: &str, value: Option<&'a str>) -> Result<&'a str> {
    value.ok_or_else(|| Error::BadLineSyntax {
        line,
        reason: format!("missing required label '{}'", label),
    })
}

/// Extract the uid from a `uid=VALUE`, `VALUE` or `-` shaped label value
fn extract_uid(value: &str) -> &str {
    let uid = value.split_once('=').map_or(value, |(_, v)| v);
    if uid == "-" { "" } else { uid }
}

/// Split `METHOD URI PROTO` into its parts
fn split_request(line: usize, req: &str) -> Result<(&str, &str, &str)> {
    let mut parts = req.splitn(3, ' ');
    let method = parts.next().filter(|m| !m.is_empty());
    let target = parts.next().filter(|t| !t.is_empty());

    match (method, target) {
        (Some(method), Some(target)) => Ok((method, target, parts.next().unwrap_or(""))),
        _ => Err(Error::BadLineSyntax {
            line,
            reason: format!("malformed req {:?}", req),
        }),
    }
}

/// Line-oriented reader over label-delimited access logs
///
/// Each pull reads one line and yields either a normalized [`LogEntry`], a
/// [`Record::Filtered`] marker, or the error for that line. Errors tied to a
/// single line leave the reader positioned at the next line.
pub struct LogReader<R> {
    source: R,
    buf: Vec<u8>,
    line: usize,
    done: bool,
    groups: Vec<Regex>,
    ignores: Vec<Regex>,
    time_format: TimeFormat,
    filter: Option<Filter>,
}

impl<R: BufRead> LogReader<R> {
    /// Wrap a byte stream, compiling every pattern in `options` up front
    pub fn new(source: R, options: &ReaderOptions) -> Result<Self> {
        let groups = compile_all(&options.matching_groups, "matching group")?;
        let ignores = compile_all(&options.ignore_patterns, "ignore pattern")?;
        let time_format = TimeFormat::compile(&options.time_format)?;
        let filter = match options.filter.as_deref().map(str::trim) {
            Some(expr) if !expr.is_empty() => Some(Filter::compile(expr)?),
            _ => None,
        };

        tracing::debug!(
            "Log reader ready: {} matching groups, {} ignore patterns, filter: {}",
            groups.len(),
            ignores.len(),
            filter.is_some()
        );

        Ok(Self {
            source,
            buf: Vec::new(),
            line: 0,
            done: false,
            groups,
            ignores,
            time_format,
            filter,
        })
    }

    /// Number of lines consumed so far, blank ones included
    pub fn lines_read(&self) -> usize {
        self.line
    }

    /// Adapt into a stream of entries, dropping filtered records
    pub fn entries(self) -> Entries<R> {
        Entries { reader: self }
    }

    fn parse_line(&self, line: usize, text: &str) -> Result<Record> {
        let fields = Fields::parse(line, text)?;

        let req = required(line, "req", fields.req)?;
        let status_raw = required(line, "status", fields.status)?;
        let time_raw = required(line, "time", fields.time)?;

        let (method, target, proto) = split_request(line, req)?;

        let status = status_raw
            .trim()
            .parse::<i64>()
            .map_err(|_| Error::FieldParse {
                line,
                field: "status",
                value: status_raw.to_string(),
            })?;

        let time = self
            .time_format
            .parse(time_raw)
            .ok_or_else(|| Error::FieldParse {
                line,
                field: "time",
                value: time_raw.to_string(),
            })?;

        let (path, query) = match target.split_once('?') {
            Some((path, query)) => (path, Some(query.to_string())),
            None => (target, None),
        };

        let new_uid = fields.uidset.map(extract_uid).unwrap_or("");
        let set_new_uid = !new_uid.is_empty();
        let uid = if set_new_uid {
            new_uid
        } else {
            fields.uidgot.map(extract_uid).unwrap_or("")
        };

        let matched_group = self.groups.iter().find(|re| re.is_match(path)).cloned();
        let uri = matched_group
            .as_ref()
            .map_or_else(|| path.to_string(), |re| re.as_str().to_string());
        let is_ignored = self.ignores.iter().any(|re| re.is_match(path));

        let entry = LogEntry {
            line,
            req: req.to_string(),
            method: method.to_string(),
            uri,
            path: path.to_string(),
            query,
            proto: proto.to_string(),
            status,
            uid: uid.to_string(),
            set_new_uid,
            time,
            is_ignored,
            matched_group,
        };

        if let Some(filter) = &self.filter
            && !filter.matches(&entry)
        {
            return Ok(Record::Filtered { line });
        }

        Ok(Record::Entry(Box::new(entry)))
    }
}

impl<R: BufRead> Iterator for LogReader<R> {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.done {
                return None;
            }

            self.buf.clear();
            match self.source.read_until(b'\n', &mut self.buf) {
                Ok(0) => {
                    self.done = true;
                    return None;
                }
                Ok(_) => {}
                Err(e) => {
                    self.done = true;
                    return Some(Err(e.into()));
                }
            }
            self.line += 1;

            let text = String::from_utf8_lossy(&self.buf);
            let text = text.trim_end_matches(['\n', '\r']);
            if text.trim().is_empty() {
                continue;
            }

            return Some(self.parse_line(self.line, text));
        }
    }
}

/// Entry stream that skips [`Record::Filtered`] markers
pub struct Entries<R> {
    reader: LogReader<R>,
}

impl<R: BufRead> Iterator for Entries<R> {
    type Item = Result<LogEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.reader.next()? {
                Ok(Record::Entry(entry)) => return Some(Ok(*entry)),
                Ok(Record::Filtered { .. }) => continue,
                Err(e) => return Some(Err(e)),
            }
        }
    }
}

fn compile_all(patterns: &[String], what: &str) -> Result<Vec<Regex>> {
    patterns
        .iter()
        .map(|pattern| {
            Regex::new(pattern)
                .map_err(|e| Error::Config(format!("Invalid {} '{}': {}", what, pattern, e)))
        })
        .collect()
}
