mod reader;
mod types;

pub use reader::{DEFAULT_TIME_FORMAT, Entries, LogReader, ReaderOptions};
pub use types::{LogEntry, Record};
