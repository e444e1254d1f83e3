use super::merge::merge;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Kind {
    Leaf(String),
    Group(Vec<PatternNode>),
}

/// A leaf token or an ordered group of child nodes
///
/// Every node caches the number of leaves below it so suffix lookups during
/// [`append`](PatternNode::append) never walk the whole tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternNode {
    kind: Kind,
    leaves: usize,
}

impl PatternNode {
    /// Empty root, ready for [`append`](Self::append)
    pub fn new_root() -> Self {
        Self {
            kind: Kind::Group(Vec::new()),
            leaves: 0,
        }
    }

    pub(crate) fn leaf(value: &str) -> Self {
        debug_assert!(!value.is_empty(), "leaf values must not be empty");
        Self {
            kind: Kind::Leaf(value.to_string()),
            leaves: 1,
        }
    }

    pub(crate) fn group(children: Vec<PatternNode>) -> Self {
        debug_assert!(!children.is_empty(), "groups must not be empty");
        let leaves = children.iter().map(|c| c.leaves).sum();
        Self {
            kind: Kind::Group(children),
            leaves,
        }
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self.kind, Kind::Leaf(_))
    }

    /// Leaf value, `None` for groups
    pub fn value(&self) -> Option<&str> {
        match &self.kind {
            Kind::Leaf(value) => Some(value),
            Kind::Group(_) => None,
        }
    }

    /// Child nodes; empty for leaves
    pub fn children(&self) -> &[PatternNode] {
        match &self.kind {
            Kind::Leaf(_) => &[],
            Kind::Group(children) => children,
        }
    }

    pub fn leaves(&self) -> usize {
        self.leaves
    }

    pub fn first_leaf(&self) -> Option<&str> {
        match &self.kind {
            Kind::Leaf(value) => Some(value),
            Kind::Group(children) => children.first().and_then(PatternNode::first_leaf),
        }
    }

    pub fn last_leaf(&self) -> Option<&str> {
        match &self.kind {
            Kind::Leaf(value) => Some(value),
            Kind::Group(children) => children.last().and_then(PatternNode::last_leaf),
        }
    }

    /// Flattened left-to-right leaf values
    pub fn signature(&self) -> Vec<&str> {
        let mut out = Vec::with_capacity(self.leaves);
        self.collect_leaves(&mut out);
        out
    }

    pub(crate) fn collect_leaves<'a>(&'a self, out: &mut Vec<&'a str>) {
        match &self.kind {
            Kind::Leaf(value) => out.push(value),
            Kind::Group(children) => {
                for child in children {
                    child.collect_leaves(out);
                }
            }
        }
    }

    /// Extend the sequence by one token, folding any repetition this reveals
    /// at the tail.
    ///
    /// Candidate tails are tried from the shortest upwards and the search
    /// stops once a tail would outweigh everything before it, so the earliest
    /// (shortest) repetition wins over re-wrapping older structure.
    pub fn append(&mut self, value: &str) {
        let Kind::Group(children) = &mut self.kind else {
            debug_assert!(false, "append called on a leaf");
            return;
        };

        children.push(PatternNode::leaf(value));
        let total = self.leaves + 1;
        let mut tail_leaves = 1;

        for i in (0..children.len() - 1).rev() {
            let head_leaves = total - tail_leaves;
            if head_leaves < tail_leaves {
                break;
            }

            if children[i].last_leaf() == Some(value)
                && let Some(start) = suffix_start(children, i, tail_leaves)
                && let Some(merged) = merge(&children[start..=i], &children[i + 1..])
            {
                children.truncate(start);
                children.push(merged);
                self.leaves = children.iter().map(|c| c.leaves).sum();
                debug_assert!(self.is_consistent());
                return;
            }

            tail_leaves += children[i].leaves;
        }

        self.leaves = total;
    }

    /// Render the tree; non-root groups are wrapped as `( ... )*`
    pub fn render(&self, is_root: bool) -> String {
        match &self.kind {
            Kind::Leaf(value) => value.clone(),
            Kind::Group(children) => {
                let inner = children
                    .iter()
                    .map(|c| c.render(false))
                    .collect::<Vec<_>>()
                    .join(" -> ");
                if is_root {
                    inner
                } else {
                    format!("({})*", inner)
                }
            }
        }
    }

    /// Cached leaf counts agree with the tree and no group is empty
    pub(crate) fn is_consistent(&self) -> bool {
        match &self.kind {
            Kind::Leaf(value) => self.leaves == 1 && !value.is_empty(),
            Kind::Group(children) => {
                !children.is_empty()
                    && self.leaves == children.iter().map(|c| c.leaves).sum::<usize>()
                    && children.iter().all(PatternNode::is_consistent)
            }
        }
    }
}

impl fmt::Display for PatternNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render(true))
    }
}

/// Index `j <= end` such that `children[j..=end]` holds exactly `want` leaves
fn suffix_start(children: &[PatternNode], end: usize, want: usize) -> Option<usize> {
    let mut acc = 0;
    for j in (0..=end).rev() {
        acc += children[j].leaves;
        if acc == want {
            return Some(j);
        }
        if acc > want {
            return None;
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build(values: &str) -> PatternNode {
        let mut root = PatternNode::new_root();
        for value in values.split(',').map(str::trim) {
            root.append(value);
            assert!(root.is_consistent());
        }
        root
    }

    fn rendered(values: &str) -> String {
        build(values).to_string()
    }

    #[test]
    fn test_plain_sequence() {
        assert_eq!(rendered("A, B, C"), "A -> B -> C");
    }

    #[test]
    fn test_single_repetition() {
        assert_eq!(rendered("A, B, B, B"), "A -> (B)*");
    }

    #[test]
    fn test_several_runs() {
        assert_eq!(
            rendered("A, A, A, B, B, C, A, A"),
            "(A)* -> (B)* -> C -> (A)*"
        );
    }

    #[test]
    fn test_repeated_block() {
        assert_eq!(rendered("A, B, C, A, B, C, D"), "(A -> B -> C)* -> D");
    }

    #[test]
    fn test_nested_repetition() {
        assert_eq!(
            rendered("A, B, C, B, C, D, B, C, D, E"),
            "A -> ((B -> C)* -> D)* -> E"
        );
    }

    #[test]
    fn test_shortest_match() {
        let out = rendered("A, B, C, A, A, B, C, A");
        assert_eq!(out, "((A)* -> B -> C)* -> A");
        assert_ne!(out, "(A -> B -> C -> A)*");
    }

    #[test]
    fn test_unmergeable_structure() {
        assert_eq!(
            rendered("A, B, C, B, C, A, B, A, B, C, D"),
            "A -> (B -> C)* -> (A -> B)* -> C -> D"
        );
    }

    #[test]
    fn test_count_merge() {
        assert_eq!(rendered("A, B, A, B, C, A, B, C"), "((A -> B)* -> C)*");
    }

    #[test]
    fn test_empty_root_renders_empty() {
        let root = PatternNode::new_root();
        assert_eq!(root.to_string(), "");
        assert_eq!(root.leaves(), 0);
        assert_eq!(root.first_leaf(), None);
    }

    #[test]
    fn test_leaf_counts_and_signature() {
        let root = build("A, B, C, B, C, D, B, C, D, E");
        // A, ((B, C), D), E
        assert_eq!(root.leaves(), 5);
        assert_eq!(root.signature(), vec!["A", "B", "C", "D", "E"]);
        assert_eq!(root.first_leaf(), Some("A"));
        assert_eq!(root.last_leaf(), Some("E"));

        let nested = &root.children()[1];
        assert!(!nested.is_leaf());
        assert_eq!(nested.leaves(), 3);
        assert_eq!(nested.render(false), "((B -> C)* -> D)*");
        assert_eq!(nested.children()[1].value(), Some("D"));
    }

    #[test]
    fn test_append_without_merge_adds_one_leaf() {
        let mut root = build("A, B");
        let before = root.leaves();
        root.append("C");
        assert_eq!(root.leaves(), before + 1);
        assert_eq!(root.children().len(), 3);
    }

    #[test]
    fn test_append_is_not_idempotent() {
        let once = build("A, B");
        let twice = build("A, B, B");
        assert_ne!(once, twice);
        assert_eq!(twice.to_string(), "A -> (B)*");
    }

    #[test]
    fn test_long_run_stays_compact() {
        let mut root = PatternNode::new_root();
        for _ in 0..1000 {
            root.append("GET /");
            root.append("GET /items");
        }
        assert_eq!(root.to_string(), "(GET / -> GET /items)*");
        assert_eq!(root.leaves(), 2);
        assert!(root.is_consistent());
    }
}
