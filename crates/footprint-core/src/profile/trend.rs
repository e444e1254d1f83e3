use super::{Clock, ErrorPolicy, Profiler, ReadStats, drain};
use crate::log::LogReader;
use crate::sort::{Direction, SortSpec, Sortable};
use crate::{Error, Result};
use chrono::{DateTime, FixedOffset};
use serde::Serialize;
use std::collections::HashMap;
use std::io::BufRead;

/// Per-endpoint request counts in fixed-width time buckets
#[derive(Debug, Clone, Serialize)]
pub struct Trend {
    /// Bucket width in seconds
    pub interval: i64,
    /// Number of buckets; every row's `counts` has this length
    pub step: usize,
    /// Timestamp of bucket 0
    pub start: Option<DateTime<FixedOffset>>,
    pub rows: Vec<TrendRow>,
    pub stats: ReadStats,
}

#[derive(Debug, Clone, Serialize)]
pub struct TrendRow {
    pub key: String,
    pub method: String,
    pub uri: String,
    pub sum: usize,
    pub counts: Vec<usize>,
}

impl Trend {
    /// Endpoint keys in sorted order
    pub fn keys(&self) -> Vec<&str> {
        self.rows.iter().map(|r| r.key.as_str()).collect()
    }

    pub fn counts(&self, key: &str) -> Option<&[usize]> {
        self.rows
            .iter()
            .find(|r| r.key == key)
            .map(|r| r.counts.as_slice())
    }
}

pub struct TrendProfiler {
    interval: i64,
    sort: Vec<SortSpec>,
    policy: ErrorPolicy,
}

impl TrendProfiler {
    pub fn new(interval: i64) -> Result<Self> {
        if interval <= 0 {
            return Err(Error::InvalidArgument(format!(
                "Interval must be positive, got {}",
                interval
            )));
        }

        Ok(Self {
            interval,
            sort: default_sort(),
            policy: ErrorPolicy::default(),
        })
    }

    /// Replace the sort order; an empty list keeps `sum:desc`
    pub fn with_sort(mut self, sort: Vec<SortSpec>) -> Self {
        self.sort = if sort.is_empty() { default_sort() } else { sort };
        self
    }

    pub fn with_error_policy(mut self, policy: ErrorPolicy) -> Self {
        self.policy = policy;
        self
    }

    fn sortable(&self) -> Sortable<TrendRow> {
        Sortable::new()
            .register("method", |a: &TrendRow, b: &TrendRow| a.method.cmp(&b.method))
            .register("uri", |a: &TrendRow, b: &TrendRow| a.uri.cmp(&b.uri))
            .register("sum", |a: &TrendRow, b: &TrendRow| a.sum.cmp(&b.sum))
            .register("count0", |a: &TrendRow, b: &TrendRow| {
                bucket(a, 0).cmp(&bucket(b, 0))
            })
            .register("count1", |a: &TrendRow, b: &TrendRow| {
                bucket(a, 1).cmp(&bucket(b, 1))
            })
            .register("countN", |a: &TrendRow, b: &TrendRow| {
                a.counts.last().cmp(&b.counts.last())
            })
            .with_order(self.sort.clone())
    }
}

fn default_sort() -> Vec<SortSpec> {
    vec![SortSpec::new("sum", Direction::Desc)]
}

fn bucket(row: &TrendRow, index: usize) -> usize {
    row.counts.get(index).copied().unwrap_or(0)
}

impl Profiler for TrendProfiler {
    type Output = Trend;

    fn profile<R: BufRead>(&self, reader: LogReader<R>) -> Result<Self::Output> {
        tracing::debug!("Profiling trend with {}s buckets", self.interval);

        let mut clock = Clock::default();
        let mut rows: Vec<TrendRow> = Vec::new();
        let mut index: HashMap<String, usize> = HashMap::new();

        let stats = drain(reader, self.policy, |entry| {
            let offset = clock.observe(entry.time);
            if entry.is_ignored {
                return;
            }

            let key = entry.key();
            let row = match index.get(&key) {
                Some(&i) => &mut rows[i],
                None => {
                    index.insert(key.clone(), rows.len());
                    rows.push(TrendRow {
                        key,
                        method: entry.method,
                        uri: entry.uri,
                        sum: 0,
                        counts: Vec::new(),
                    });
                    let last = rows.len() - 1;
                    &mut rows[last]
                }
            };

            let t = (offset / self.interval) as usize;
            if row.counts.len() <= t {
                row.counts.resize(t + 1, 0);
            }
            row.counts[t] += 1;
            row.sum += 1;
        })?;

        let step = match clock.first() {
            Some(_) => {
                let span = clock.span_secs();
                let buckets = span / self.interval + i64::from(span % self.interval != 0);
                buckets as usize + 1
            }
            None => 0,
        };
        for row in &mut rows {
            row.counts.resize(step, 0);
        }

        self.sortable().sort(&mut rows);

        tracing::info!(
            "Trend complete: {} endpoints over {} buckets",
            rows.len(),
            step
        );

        Ok(Trend {
            interval: self.interval,
            step,
            start: clock.first(),
            rows,
            stats,
        })
    }
}
