//! Multi-key ordering for profile rows
//!
//! A [`Sortable`] holds named comparators and an ordered list of
//! [`SortSpec`]s parsed from strings such as `sum:desc` or `uri`. Rows are
//! compared key by key until one differs; keys with no registered
//! comparator are skipped.

use crate::{Error, Result};
use serde::Serialize;
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Asc,
    Desc,
}

impl Direction {
    fn apply(self, ordering: Ordering) -> Ordering {
        match self {
            Direction::Asc => ordering,
            Direction::Desc => ordering.reverse(),
        }
    }
}

/// One `key[:asc|:desc]` sort specifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortSpec {
    pub key: String,
    pub direction: Direction,
}

impl SortSpec {
    pub fn new(key: impl Into<String>, direction: Direction) -> Self {
        Self {
            key: key.into(),
            direction,
        }
    }

    /// Parse a list of specifiers, splitting comma-separated entries
    pub fn parse_list<S: AsRef<str>>(specs: &[S]) -> Result<Vec<Self>> {
        specs
            .iter()
            .flat_map(|s| s.as_ref().split(','))
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::parse)
            .collect()
    }
}

impl FromStr for SortSpec {
    type Err = Error;

    fn from_str(spec: &str) -> Result<Self> {
        let (key, direction) = match spec.split_once(':') {
            Some((key, dir)) => {
                let direction = match dir.trim().to_lowercase().as_str() {
                    "asc" => Direction::Asc,
                    "desc" => Direction::Desc,
                    other => {
                        return Err(Error::InvalidArgument(format!(
                            "Invalid sort direction '{}' in '{}'",
                            other, spec
                        )));
                    }
                };
                (key, direction)
            }
            None => (spec, Direction::Asc),
        };

        let key = key.trim();
        if key.is_empty() {
            return Err(Error::InvalidArgument(format!(
                "Missing sort key in '{}'",
                spec
            )));
        }

        Ok(SortSpec::new(key, direction))
    }
}

impl fmt::Display for SortSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let dir = match self.direction {
            Direction::Asc => "asc",
            Direction::Desc => "desc",
        };
        write!(f, "{}:{}", self.key, dir)
    }
}

type Comparator<T> = Box<dyn Fn(&T, &T) -> Ordering>;

/// Named comparators composed by an ordered list of sort keys
pub struct Sortable<T> {
    comparators: Vec<(&'static str, Comparator<T>)>,
    order: Vec<SortSpec>,
}

impl<T> Default for Sortable<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Sortable<T> {
    pub fn new() -> Self {
        Self {
            comparators: Vec::new(),
            order: Vec::new(),
        }
    }

    /// Register the ascending comparator for `key`
    pub fn register(mut self, key: &'static str, cmp: impl Fn(&T, &T) -> Ordering + 'static) -> Self {
        self.comparators.push((key, Box::new(cmp)));
        self
    }

    pub fn with_order(mut self, order: Vec<SortSpec>) -> Self {
        self.set_order(order);
        self
    }

    pub fn set_order(&mut self, order: Vec<SortSpec>) {
        for spec in &order {
            if !self.is_registered(&spec.key) {
                tracing::debug!("Ignoring unknown sort key '{}'", spec.key);
            }
        }
        self.order = order;
    }

    pub fn order(&self) -> &[SortSpec] {
        &self.order
    }

    pub fn is_registered(&self, key: &str) -> bool {
        self.comparators.iter().any(|(name, _)| *name == key)
    }

    fn comparator(&self, key: &str) -> Option<&Comparator<T>> {
        self.comparators
            .iter()
            .find(|(name, _)| *name == key)
            .map(|(_, cmp)| cmp)
    }

    /// Compare two rows; the first key that is not a tie decides
    pub fn compare(&self, a: &T, b: &T) -> Ordering {
        for spec in &self.order {
            let Some(cmp) = self.comparator(&spec.key) else {
                continue;
            };
            let ordering = spec.direction.apply(cmp(a, b));
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    }

    /// Stable sort: rows tied on every key keep their current order
    pub fn sort(&self, rows: &mut [T]) {
        rows.sort_by(|a, b| self.compare(a, b));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Row {
        name: &'static str,
        hits: u32,
    }

    fn sortable(specs: &[&str]) -> Sortable<Row> {
        Sortable::new()
            .register("name", |a: &Row, b: &Row| a.name.cmp(b.name))
            .register("hits", |a: &Row, b: &Row| a.hits.cmp(&b.hits))
            .with_order(SortSpec::parse_list(specs).unwrap())
    }

    fn rows() -> Vec<Row> {
        vec![
            Row { name: "b", hits: 1 },
            Row { name: "a", hits: 3 },
            Row { name: "c", hits: 1 },
            Row { name: "a", hits: 1 },
        ]
    }

    fn names(rows: &[Row]) -> Vec<(&'static str, u32)> {
        rows.iter().map(|r| (r.name, r.hits)).collect()
    }

    #[test]
    fn test_parse_spec() {
        assert_eq!(
            "sum:desc".parse::<SortSpec>().unwrap(),
            SortSpec::new("sum", Direction::Desc)
        );
        assert_eq!(
            "uri".parse::<SortSpec>().unwrap(),
            SortSpec::new("uri", Direction::Asc)
        );
        assert_eq!(
            " count0 : ASC ".parse::<SortSpec>().unwrap(),
            SortSpec::new("count0", Direction::Asc)
        );
        assert!("sum:sideways".parse::<SortSpec>().is_err());
        assert!(":desc".parse::<SortSpec>().is_err());
    }

    #[test]
    fn test_parse_list_splits_commas() {
        let specs = SortSpec::parse_list(&["sum:desc,uri", "method:asc"]).unwrap();
        let rendered: Vec<String> = specs.iter().map(ToString::to_string).collect();
        assert_eq!(rendered, vec!["sum:desc", "uri:asc", "method:asc"]);
    }

    #[test]
    fn test_ties_fall_through_to_next_key() {
        let mut rows = rows();
        sortable(&["hits:desc", "name:asc"]).sort(&mut rows);
        assert_eq!(names(&rows), vec![("a", 3), ("a", 1), ("b", 1), ("c", 1)]);
    }

    #[test]
    fn test_full_ties_keep_insertion_order() {
        let mut rows = rows();
        sortable(&["hits:asc"]).sort(&mut rows);
        assert_eq!(names(&rows), vec![("b", 1), ("c", 1), ("a", 1), ("a", 3)]);
    }

    #[test]
    fn test_unknown_keys_are_skipped() {
        let mut rows = rows();
        sortable(&["bogus:desc", "name:desc"]).sort(&mut rows);
        assert_eq!(names(&rows), vec![("c", 1), ("b", 1), ("a", 3), ("a", 1)]);
    }

    #[test]
    fn test_empty_order_is_identity() {
        let mut rows = rows();
        sortable(&[]).sort(&mut rows);
        assert_eq!(names(&rows), names(&self::rows()));
    }
}
