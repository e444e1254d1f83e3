use super::{Clock, ErrorPolicy, Profiler, ReadStats, drain};
use crate::Result;
use crate::log::LogReader;
use crate::pattern::{PatternNode, merge};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::io::BufRead;
use std::slice;

/// A compressed traversal shared by one or more sessions
#[derive(Debug, Clone, Serialize)]
pub struct Scenario {
    /// Canonical rendering of `pattern`
    pub hash: String,
    /// Sessions that follow this scenario
    pub count: usize,
    /// Earliest session start, seconds from the first log entry
    pub first_req: i64,
    /// Latest session end, seconds from the first log entry
    pub last_req: i64,
    #[serde(skip)]
    pub pattern: PatternNode,
}

impl Scenario {
    fn absorb(&mut self, other: &Scenario) {
        self.count += other.count;
        self.first_req = self.first_req.min(other.first_req);
        self.last_req = self.last_req.max(other.last_req);
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.hash)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ScenarioProfile {
    pub scenarios: Vec<Scenario>,
    pub sessions: usize,
    pub stats: ReadStats,
}

#[derive(Debug, Default)]
pub struct ScenarioProfiler {
    policy: ErrorPolicy,
}

impl ScenarioProfiler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_error_policy(mut self, policy: ErrorPolicy) -> Self {
        self.policy = policy;
        self
    }
}

struct Session {
    pattern: PatternNode,
    first_req: i64,
    last_req: i64,
}

impl Profiler for ScenarioProfiler {
    type Output = ScenarioProfile;

    fn profile<R: BufRead>(&self, reader: LogReader<R>) -> Result<Self::Output> {
        tracing::debug!("Profiling scenarios");

        let mut clock = Clock::default();
        let mut sessions: HashMap<String, Session> = HashMap::new();

        let stats = drain(reader, self.policy, |entry| {
            let offset = clock.observe(entry.time);
            if entry.is_ignored || entry.uid.is_empty() {
                return;
            }

            let session = sessions.entry(entry.uid.clone()).or_insert_with(|| Session {
                pattern: PatternNode::new_root(),
                first_req: offset,
                last_req: offset,
            });
            session.pattern.append(&entry.key());
            session.last_req = offset;
        })?;

        let session_count = sessions.len();
        let scenarios = summarize(sessions.into_values());

        tracing::info!(
            "Scenario complete: {} sessions, {} scenarios",
            session_count,
            scenarios.len()
        );

        Ok(ScenarioProfile {
            scenarios,
            sessions: session_count,
            stats,
        })
    }
}

/// Coalesce sessions by canonical string, fold mergeable patterns together,
/// then order by start time, popularity and canonical string.
fn summarize(sessions: impl Iterator<Item = Session>) -> Vec<Scenario> {
    let mut by_hash: BTreeMap<String, Scenario> = BTreeMap::new();
    for session in sessions {
        let scenario = Scenario {
            hash: session.pattern.to_string(),
            count: 1,
            first_req: session.first_req,
            last_req: session.last_req,
            pattern: session.pattern,
        };
        match by_hash.get_mut(&scenario.hash) {
            Some(existing) => existing.absorb(&scenario),
            None => {
                by_hash.insert(scenario.hash.clone(), scenario);
            }
        }
    }

    let mut accepted: Vec<Scenario> = Vec::with_capacity(by_hash.len());
    for scenario in by_hash.into_values().rev() {
        let target = accepted.iter_mut().find_map(|t| {
            merge(
                slice::from_ref(&scenario.pattern),
                slice::from_ref(&t.pattern),
            )
            .map(|merged| (t, merged))
        });

        match target {
            Some((t, merged)) => {
                tracing::debug!("Merged '{}' into '{}'", scenario.hash, t.hash);
                t.absorb(&scenario);
                t.hash = merged.to_string();
                t.pattern = merged;
            }
            None => accepted.push(scenario),
        }
    }

    accepted.sort_by(|a, b| {
        a.first_req
            .cmp(&b.first_req)
            .then_with(|| b.count.cmp(&a.count))
            .then_with(|| b.hash.cmp(&a.hash))
    });
    accepted
}
