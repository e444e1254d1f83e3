use super::{ErrorPolicy, Profiler, ReadStats, drain};
use crate::Result;
use crate::log::{LogEntry, LogReader};
use crate::sort::{Direction, SortSpec, Sortable};
use crate::stats::{SortHint, gini};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::io::BufRead;

/// Column name used for the query key-combination summary
pub const KEY_COMBO_COLUMN: &str = "[keys]";
/// Column name used for the query value-combination summary
pub const VALUE_COMBO_COLUMN: &str = "[values]";

#[derive(Debug, Clone, Serialize)]
pub struct ParamProfile {
    pub params: Vec<ParamStat>,
    pub stats: ReadStats,
}

impl ParamProfile {
    pub fn get(&self, key: &str) -> Option<&ParamStat> {
        self.params.iter().find(|p| p.key == key)
    }
}

/// Parameter usage of a single endpoint
#[derive(Debug, Clone, Serialize)]
pub struct ParamStat {
    pub key: String,
    pub method: String,
    pub uri: String,
    pub count: usize,
    /// One entry per capture group of the endpoint's matching group
    pub path_params: Vec<PathParam>,
    pub query: QueryStats,
}

/// Histogram of one path capture position
#[derive(Debug, Clone, Default, Serialize)]
pub struct PathParam {
    pub name: Option<String>,
    pub values: BTreeMap<String, usize>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct QueryStats {
    /// Requests carrying each key
    pub key_hist: BTreeMap<String, usize>,
    /// Requests carrying each `key=value` pair
    pub value_hist: BTreeMap<String, BTreeMap<String, usize>>,
    /// Sorted keys joined by `&`; requests without a query count under `""`
    pub key_combo_hist: BTreeMap<String, usize>,
    /// Sorted `key=value` pairs joined by `&`
    pub value_combo_hist: BTreeMap<String, usize>,
}

/// Derived statistics of one parameter column
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnSummary {
    pub name: String,
    /// Requests where the column carried a value
    pub observed: usize,
    /// `observed / count`
    pub rate: f64,
    /// Distinct values
    pub cardinality: usize,
    /// Gini coefficient of the per-value request counts
    pub gini: f64,
}

impl ColumnSummary {
    fn new(
        name: impl Into<String>,
        observed: usize,
        total: usize,
        hist: &BTreeMap<String, usize>,
    ) -> Self {
        let counts: Vec<usize> = hist.values().copied().collect();
        let rate = if total == 0 {
            0.0
        } else {
            observed as f64 / total as f64
        };

        Self {
            name: name.into(),
            observed,
            rate,
            cardinality: counts.len(),
            gini: gini(&counts, SortHint::Unsorted),
        }
    }
}

impl ParamStat {
    fn new(entry: &LogEntry) -> Self {
        let path_params = entry
            .matched_group
            .as_ref()
            .map(|group| {
                group
                    .capture_names()
                    .skip(1)
                    .map(|name| PathParam {
                        name: name.map(str::to_string),
                        values: BTreeMap::new(),
                    })
                    .collect()
            })
            .unwrap_or_default();

        Self {
            key: entry.key(),
            method: entry.method.clone(),
            uri: entry.uri.clone(),
            count: 0,
            path_params,
            query: QueryStats::default(),
        }
    }

    fn observe(&mut self, entry: &LogEntry) {
        self.count += 1;

        if let Some(group) = &entry.matched_group
            && let Some(caps) = group.captures(&entry.path)
        {
            for (param, capture) in self.path_params.iter_mut().zip(caps.iter().skip(1)) {
                if let Some(m) = capture {
                    *param.values.entry(m.as_str().to_string()).or_insert(0) += 1;
                }
            }
        }

        self.query.observe(entry.query.as_deref().unwrap_or(""));
    }

    /// One summary per path capture position; unnamed captures are `$1`, `$2`, ...
    pub fn path_summaries(&self) -> Vec<ColumnSummary> {
        self.path_params
            .iter()
            .enumerate()
            .map(|(i, param)| {
                let name = param.name.clone().unwrap_or_else(|| format!("${}", i + 1));
                let observed = param.values.values().sum();
                ColumnSummary::new(name, observed, self.count, &param.values)
            })
            .collect()
    }

    /// One summary per query key, in key order
    pub fn query_summaries(&self) -> Vec<ColumnSummary> {
        self.query
            .key_hist
            .iter()
            .map(|(key, &observed)| {
                let values = self.query.value_hist.get(key).cloned().unwrap_or_default();
                ColumnSummary::new(key.clone(), observed, self.count, &values)
            })
            .collect()
    }

    /// Distribution of key combinations; `observed` counts requests with a query
    pub fn key_combo_summary(&self) -> ColumnSummary {
        ColumnSummary::new(
            KEY_COMBO_COLUMN,
            self.with_query(),
            self.count,
            &self.query.key_combo_hist,
        )
    }

    pub fn value_combo_summary(&self) -> ColumnSummary {
        ColumnSummary::new(
            VALUE_COMBO_COLUMN,
            self.with_query(),
            self.count,
            &self.query.value_combo_hist,
        )
    }

    /// Path columns, then query keys, then the two combination columns.
    /// The combination columns are omitted for endpoints never queried.
    pub fn summaries(&self) -> Vec<ColumnSummary> {
        let mut out = self.path_summaries();
        out.extend(self.query_summaries());
        if self.with_query() > 0 {
            out.push(self.key_combo_summary());
            out.push(self.value_combo_summary());
        }
        out
    }

    fn with_query(&self) -> usize {
        let without = self.query.value_combo_hist.get("").copied().unwrap_or(0);
        self.count - without
    }
}

impl QueryStats {
    fn observe(&mut self, query: &str) {
        let mut pairs: Vec<(&str, &str)> = query
            .split('&')
            .filter(|pair| !pair.is_empty())
            .map(|pair| pair.split_once('=').unwrap_or((pair, "")))
            .collect();
        pairs.sort_by(|a, b| a.0.cmp(b.0));

        let mut seen_keys: Vec<&str> = Vec::with_capacity(pairs.len());
        let mut seen_pairs: Vec<(&str, &str)> = Vec::with_capacity(pairs.len());
        for &(key, value) in &pairs {
            if !seen_keys.contains(&key) {
                seen_keys.push(key);
                *self.key_hist.entry(key.to_string()).or_insert(0) += 1;
            }
            if seen_pairs.contains(&(key, value)) {
                continue;
            }
            seen_pairs.push((key, value));
            *self
                .value_hist
                .entry(key.to_string())
                .or_default()
                .entry(value.to_string())
                .or_insert(0) += 1;
        }

        let keys = pairs.iter().map(|(k, _)| *k).collect::<Vec<_>>().join("&");
        let values = pairs
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join("&");

        *self.key_combo_hist.entry(keys).or_insert(0) += 1;
        *self.value_combo_hist.entry(values).or_insert(0) += 1;
    }
}

pub struct ParamProfiler {
    sort: Vec<SortSpec>,
    policy: ErrorPolicy,
}

impl Default for ParamProfiler {
    fn default() -> Self {
        Self::new()
    }
}

impl ParamProfiler {
    pub fn new() -> Self {
        Self {
            sort: default_sort(),
            policy: ErrorPolicy::default(),
        }
    }

    /// Replace the sort order; an empty list keeps `count:desc`
    pub fn with_sort(mut self, sort: Vec<SortSpec>) -> Self {
        self.sort = if sort.is_empty() { default_sort() } else { sort };
        self
    }

    pub fn with_error_policy(mut self, policy: ErrorPolicy) -> Self {
        self.policy = policy;
        self
    }

    fn sortable(&self) -> Sortable<ParamStat> {
        Sortable::new()
            .register("method", |a: &ParamStat, b: &ParamStat| a.method.cmp(&b.method))
            .register("uri", |a: &ParamStat, b: &ParamStat| a.uri.cmp(&b.uri))
            .register("count", |a: &ParamStat, b: &ParamStat| a.count.cmp(&b.count))
            .with_order(self.sort.clone())
    }
}

fn default_sort() -> Vec<SortSpec> {
    vec![SortSpec::new("count", Direction::Desc)]
}

impl Profiler for ParamProfiler {
    type Output = ParamProfile;

    fn profile<R: BufRead>(&self, reader: LogReader<R>) -> Result<Self::Output> {
        tracing::debug!("Profiling parameters");

        let mut params: Vec<ParamStat> = Vec::new();
        let mut index: HashMap<String, usize> = HashMap::new();

        let stats = drain(reader, self.policy, |entry| {
            if entry.is_ignored {
                return;
            }

            let i = *index.entry(entry.key()).or_insert_with(|| {
                params.push(ParamStat::new(&entry));
                params.len() - 1
            });
            params[i].observe(&entry);
        })?;

        self.sortable().sort(&mut params);

        tracing::info!("Param complete: {} endpoints", params.len());

        Ok(ParamProfile { params, stats })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::log::ReaderOptions;
    use crate::profile::testing::{line, reader};

    fn profile(input: &str, groups: &[&str]) -> ParamProfile {
        let options = ReaderOptions::new()
            .with_matching_groups(groups.iter().map(|g| g.to_string()).collect());
        ParamProfiler::new()
            .profile(reader(input, &options))
            .unwrap()
    }

    #[test]
    fn test_condition_level_distribution() {
        const GROUP: &str = "^/api/condition/(?P<id>[0-9]+)$";
        let levels = [("a", 3), ("b", 5), ("c", 10), ("d", 31), ("e", 4392)];

        let mut input = String::new();
        let mut id = 0;
        for (level, n) in levels {
            for _ in 0..n {
                id += 1;
                let req = format!("GET /api/condition/{}?condition_level={}", id % 97, level);
                input.push_str(&line(0, &req, ""));
            }
        }
        for _ in 0..48 {
            input.push_str(&line(1, "GET /api/condition/1", ""));
        }

        let result = profile(&input, &[GROUP]);
        let stat = result.get(&format!("GET {}", GROUP)).unwrap();

        assert_eq!(stat.count, 4489);
        assert_eq!(stat.query.key_hist["condition_level"], 4441);

        let column = &stat.query_summaries()[0];
        assert_eq!(column.name, "condition_level");
        assert_eq!(column.cardinality, 5);
        assert!((column.rate - 0.9893).abs() < 0.0001);
        assert!((column.gini - 0.793).abs() < 0.001);

        assert_eq!(stat.path_params.len(), 1);
        assert_eq!(stat.path_params[0].name.as_deref(), Some("id"));
        assert_eq!(stat.path_summaries()[0].observed, 4489);
    }

    #[test]
    fn test_query_combinations_are_order_independent() {
        let input = [
            line(0, "GET /search?q=rust&page=2", ""),
            line(1, "GET /search?page=2&q=rust", ""),
            line(2, "GET /search?q=go", ""),
            line(3, "GET /search", ""),
        ]
        .concat();
        let result = profile(&input, &[]);
        let stat = result.get("GET /search").unwrap();

        assert_eq!(stat.query.key_combo_hist["page&q"], 2);
        assert_eq!(stat.query.key_combo_hist["q"], 1);
        assert_eq!(stat.query.key_combo_hist[""], 1);
        assert_eq!(stat.query.value_combo_hist["page=2&q=rust"], 2);
        assert_eq!(stat.query.value_hist["q"]["rust"], 2);

        let combos = stat.key_combo_summary();
        assert_eq!(combos.observed, 3);
        assert_eq!(combos.cardinality, 3);
    }

    #[test]
    fn test_count_bounds_histograms() {
        let input = [
            line(0, "GET /list?tag=a&tag=b", ""),
            line(1, "GET /list?tag=a", ""),
            line(2, "GET /list?sort", ""),
            line(3, "GET /list?", ""),
        ]
        .concat();
        let result = profile(&input, &[]);
        let stat = result.get("GET /list").unwrap();

        assert_eq!(stat.count, stat.query.value_combo_hist.values().sum::<usize>());
        assert!(stat.query.key_hist.values().all(|&n| n <= stat.count));
        assert_eq!(stat.query.key_hist["tag"], 2);
        assert_eq!(stat.query.value_hist["tag"]["a"], 2);
        assert_eq!(stat.query.value_hist["sort"][""], 1);
        assert_eq!(stat.query.value_combo_hist["tag=a&tag=b"], 1);
    }

    #[test]
    fn test_repeated_pair_counts_once_per_request() {
        let input = [
            line(0, "GET /list?tag=a&tag=a&tag=b", ""),
            line(1, "GET /list?tag=a", ""),
        ]
        .concat();
        let result = profile(&input, &[]);
        let stat = result.get("GET /list").unwrap();

        assert_eq!(stat.query.key_hist["tag"], 2);
        assert_eq!(stat.query.value_hist["tag"]["a"], 2);
        assert_eq!(stat.query.value_hist["tag"]["b"], 1);
        assert!(
            stat.query.value_hist["tag"]
                .values()
                .all(|&n| n <= stat.query.key_hist["tag"])
        );
        assert_eq!(stat.query.value_combo_hist["tag=a&tag=a&tag=b"], 1);
    }

    #[test]
    fn test_value_with_equals_sign_splits_once() {
        let input = line(0, "GET /go?next=/a?b=c", "");
        let result = profile(&input, &[]);
        let stat = result.get("GET /go").unwrap();
        assert_eq!(stat.query.value_hist["next"]["/a?b=c"], 1);
    }

    #[test]
    fn test_unnamed_captures_and_sorting() {
        let input = [
            line(0, "GET /users/1/posts/9", ""),
            line(1, "GET /users/2/posts/9", ""),
            line(2, "GET /about", ""),
            line(3, "GET /users/1/posts/4", ""),
        ]
        .concat();
        let result = profile(&input, &["^/users/([0-9]+)/posts/([0-9]+)$"]);

        let keys: Vec<&str> = result.params.iter().map(|p| p.key.as_str()).collect();
        assert_eq!(keys, vec!["GET ^/users/([0-9]+)/posts/([0-9]+)$", "GET /about"]);

        let columns = result.params[0].path_summaries();
        assert_eq!(columns[0].name, "$1");
        assert_eq!(columns[0].cardinality, 2);
        assert_eq!(columns[1].name, "$2");
        assert_eq!(result.params[0].path_params[1].values["9"], 2);

        let summaries = result.params[1].summaries();
        assert!(summaries.is_empty());
    }

    #[test]
    fn test_sort_by_uri() {
        let input = [
            line(0, "GET /b", ""),
            line(1, "GET /a", ""),
            line(2, "GET /b", ""),
        ]
        .concat();
        let result = ParamProfiler::new()
            .with_sort(SortSpec::parse_list(&["uri"]).unwrap())
            .profile(reader(&input, &ReaderOptions::default()))
            .unwrap();

        let uris: Vec<&str> = result.params.iter().map(|p| p.uri.as_str()).collect();
        assert_eq!(uris, vec!["/a", "/b"]);
    }
}
