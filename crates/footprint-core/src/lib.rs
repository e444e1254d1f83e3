pub mod error;
pub mod filter;
pub mod log;
pub mod pattern;
pub mod profile;
pub mod sort;
pub mod stats;

pub use error::{Error, Result};
