use super::{ErrorPolicy, Profiler, ReadStats, drain};
use crate::Result;
use crate::log::LogReader;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::io::BufRead;

/// The session boundary; `"" -> key` opens a session, `key -> ""` closes one
pub const SESSION_EDGE: &str = "";

/// Endpoint-to-endpoint frequencies over per-uid sessions
#[derive(Debug, Clone, Default, Serialize)]
pub struct Transition {
    /// `matrix[prev][next]` is the number of times `next` followed `prev`
    pub matrix: BTreeMap<String, BTreeMap<String, usize>>,
    /// Every endpoint seen, plus the session boundary
    pub endpoints: BTreeSet<String>,
    /// Requests per endpoint, with or without a uid
    pub totals: BTreeMap<String, usize>,
    pub sessions: usize,
    pub stats: ReadStats,
}

impl Transition {
    pub fn count(&self, prev: &str, next: &str) -> usize {
        self.matrix
            .get(prev)
            .and_then(|row| row.get(next))
            .copied()
            .unwrap_or(0)
    }

    /// Edges leaving `prev`
    pub fn outgoing(&self, prev: &str) -> usize {
        self.matrix
            .get(prev)
            .map(|row| row.values().sum())
            .unwrap_or(0)
    }

    /// Edges arriving at `next`
    pub fn incoming(&self, next: &str) -> usize {
        self.matrix
            .values()
            .filter_map(|row| row.get(next))
            .sum()
    }

    fn record(&mut self, prev: &str, next: &str) {
        *self
            .matrix
            .entry(prev.to_string())
            .or_default()
            .entry(next.to_string())
            .or_insert(0) += 1;
    }
}

#[derive(Debug, Default)]
pub struct TransitionProfiler {
    policy: ErrorPolicy,
}

impl TransitionProfiler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_error_policy(mut self, policy: ErrorPolicy) -> Self {
        self.policy = policy;
        self
    }
}

impl Profiler for TransitionProfiler {
    type Output = Transition;

    fn profile<R: BufRead>(&self, reader: LogReader<R>) -> Result<Self::Output> {
        tracing::debug!("Profiling transitions");

        let mut result = Transition::default();
        let mut last_visit: HashMap<String, String> = HashMap::new();

        let stats = drain(reader, self.policy, |entry| {
            if entry.is_ignored {
                return;
            }

            let key = entry.key();
            *result.totals.entry(key.clone()).or_insert(0) += 1;

            if entry.uid.is_empty() {
                return;
            }

            let prev = last_visit
                .insert(entry.uid, key.clone())
                .unwrap_or_else(|| SESSION_EDGE.to_string());
            result.record(&prev, &key);
        })?;
        result.stats = stats;

        for last in last_visit.values() {
            result.record(last, SESSION_EDGE);
        }
        result.sessions = last_visit.len();

        result.endpoints = result.totals.keys().cloned().collect();
        result.endpoints.insert(SESSION_EDGE.to_string());

        tracing::info!(
            "Transition complete: {} endpoints, {} sessions",
            result.totals.len(),
            result.sessions
        );

        Ok(result)
    }
}
