mod param;
mod scenario;
mod transition;
mod trend;

pub use param::{
    ColumnSummary, KEY_COMBO_COLUMN, ParamProfile, ParamProfiler, ParamStat, PathParam,
    QueryStats, VALUE_COMBO_COLUMN,
};
pub use scenario::{Scenario, ScenarioProfile, ScenarioProfiler};
pub use transition::{SESSION_EDGE, Transition, TransitionProfiler};
pub use trend::{Trend, TrendProfiler, TrendRow};

use crate::Result;
use crate::log::{LogEntry, LogReader, Record};
use chrono::{DateTime, FixedOffset};
use serde::Serialize;
use std::io::BufRead;

/// Shared shape of the four profilers: drain a reader, emit a result
pub trait Profiler {
    type Output;

    fn profile<R: BufRead>(&self, reader: LogReader<R>) -> Result<Self::Output>;
}

/// What a profiler does with a line that fails to parse
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ErrorPolicy {
    /// Stop at the first bad line
    #[default]
    Abort,
    /// Log the bad line and keep reading
    Skip,
}

/// Counters gathered while draining a reader
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReadStats {
    pub entries: usize,
    pub filtered: usize,
    pub skipped: usize,
}

/// Pull every record from `reader`, handing entries to `visit`
pub(crate) fn drain<R: BufRead>(
    reader: LogReader<R>,
    policy: ErrorPolicy,
    mut visit: impl FnMut(LogEntry),
) -> Result<ReadStats> {
    let mut stats = ReadStats::default();

    for record in reader {
        match record {
            Ok(Record::Entry(entry)) => {
                stats.entries += 1;
                visit(*entry);
            }
            Ok(Record::Filtered { .. }) => stats.filtered += 1,
            Err(e) if policy == ErrorPolicy::Skip && e.is_line_error() => {
                tracing::warn!("Skipping line: {}", e);
                stats.skipped += 1;
            }
            Err(e) => return Err(e),
        }
    }

    tracing::debug!(
        "Read {} entries ({} filtered, {} skipped)",
        stats.entries,
        stats.filtered,
        stats.skipped
    );

    Ok(stats)
}

/// Time base of a log: the first entry's timestamp and the latest one seen
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct Clock {
    first: Option<DateTime<FixedOffset>>,
    last: Option<DateTime<FixedOffset>>,
}

impl Clock {
    /// Record `time` and return its offset in seconds from the first entry.
    /// Entries older than the first one clamp to 0.
    pub(crate) fn observe(&mut self, time: DateTime<FixedOffset>) -> i64 {
        let first = *self.first.get_or_insert(time);
        if self.last.is_none_or(|last| time > last) {
            self.last = Some(time);
        }
        (time - first).num_seconds().max(0)
    }

    pub(crate) fn first(&self) -> Option<DateTime<FixedOffset>> {
        self.first
    }

    /// Seconds between the first entry and the latest one
    pub(crate) fn span_secs(&self) -> i64 {
        match (self.first, self.last) {
            (Some(first), Some(last)) => (last - first).num_seconds().max(0),
            _ => 0,
        }
    }
}
