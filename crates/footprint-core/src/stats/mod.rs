mod gini;

pub use gini::{SortHint, gini};
