//! Scenario compression engine
//!
//! A [`PatternNode`] tree describes a sequence of endpoint tokens as a
//! restricted regular expression with two operators: concatenation and
//! one-or-more repetition. The root's children read as a sequence; every
//! other internal node is a repeated concatenation of its children.
//!
//! ```text
//! A, B, C, B, C, D, B, C, D, E   =>   A -> ((B -> C)* -> D)* -> E
//! ```
//!
//! Tokens are appended one at a time and repetitions are folded in as soon
//! as they appear at the tail of the sequence.

mod merge;
mod node;

pub use merge::merge;
pub use node::PatternNode;
