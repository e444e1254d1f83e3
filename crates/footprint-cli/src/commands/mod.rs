//! Subcommand implementations
//!
//! Each profile command exposes a `run_*` function returning the core result
//! (used by the integration tests), `format_*` helpers rendering it, and an
//! `execute` entry point called from `main`.

pub mod completion;
pub mod param;
pub mod scenario;
pub mod transition;
pub mod trend;

use crate::config::Config;
use anyhow::{Context, Result};
use footprint_core::log::{LogReader, ReaderOptions};
use footprint_core::profile::ErrorPolicy;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};

/// Input and reader flags shared by every profile command
#[derive(Debug, Clone, Default, clap::Args)]
pub struct InputArgs {
    /// Access log to read, or `-` for stdin
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Matching-group regex; a matching path is reported as the pattern itself (repeatable)
    #[arg(short = 'g', long = "group", value_name = "REGEX")]
    pub groups: Vec<String>,

    /// Flag paths matching this regex as ignored (repeatable)
    #[arg(short = 'i', long = "ignore", value_name = "REGEX")]
    pub ignores: Vec<String>,

    /// strftime format of the `time` label
    #[arg(long, value_name = "FORMAT")]
    pub time_format: Option<String>,

    /// Only profile entries matching this expression, e.g. "status >= 400"
    #[arg(long, value_name = "EXPR")]
    pub filter: Option<String>,

    /// JSON config file with reader and sort settings
    #[arg(short, long, env = "FOOTPRINT_CONFIG", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Log and skip malformed lines instead of aborting
    #[arg(long)]
    pub skip_errors: bool,
}

impl InputArgs {
    pub fn new(file: impl Into<PathBuf>) -> Self {
        Self {
            file: file.into(),
            ..Self::default()
        }
    }

    pub fn with_groups(mut self, groups: &[&str]) -> Self {
        self.groups = groups.iter().map(|g| g.to_string()).collect();
        self
    }

    pub fn with_config(mut self, path: impl Into<PathBuf>) -> Self {
        self.config = Some(path.into());
        self
    }

    /// The `--config` file, or an empty config when none was given
    pub fn load_config(&self) -> Result<Config> {
        match &self.config {
            Some(path) => Config::from_file(path),
            None => Ok(Config::default()),
        }
    }

    /// Merge `config` with the flags: flag lists append, flag scalars win
    pub fn reader_options(&self, config: &Config) -> ReaderOptions {
        let groups = config.matching_groups.iter().chain(&self.groups).cloned();
        let ignores = config.ignore_patterns.iter().chain(&self.ignores).cloned();

        let mut options = ReaderOptions::new()
            .with_matching_groups(groups.collect())
            .with_ignore_patterns(ignores.collect());

        if let Some(format) = self.time_format.as_ref().or(config.time_format.as_ref()) {
            options = options.with_time_format(format.clone());
        }
        if let Some(filter) = self.filter.as_ref().or(config.filter.as_ref()) {
            options = options.with_filter(filter.clone());
        }
        options
    }

    pub fn error_policy(&self) -> ErrorPolicy {
        if self.skip_errors {
            ErrorPolicy::Skip
        } else {
            ErrorPolicy::Abort
        }
    }

    /// Open the input with options merged from `config`
    pub fn open(&self, config: &Config) -> Result<LogReader<Box<dyn BufRead>>> {
        let source = open_source(&self.file)?;
        let reader = LogReader::new(source, &self.reader_options(config))?;
        Ok(reader)
    }
}

fn open_source(path: &Path) -> Result<Box<dyn BufRead>> {
    if path.as_os_str() == "-" {
        tracing::debug!("Reading access log from stdin");
        return Ok(Box::new(BufReader::new(io::stdin())));
    }

    tracing::debug!("Reading access log: {}", path.display());
    let file =
        File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    Ok(Box::new(BufReader::new(file)))
}

/// Sort flags override the config file's list when any are given
pub(crate) fn sort_flags<'a>(flags: &'a [String], config: &'a Config) -> &'a [String] {
    if flags.is_empty() { &config.sort } else { flags }
}

/// Quote a comma-separated field when it needs it
pub(crate) fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_extend_config_lists() {
        let config = Config {
            matching_groups: vec!["^/a/[0-9]+$".to_string()],
            time_format: Some("%Y-%m-%dT%H:%M:%S%z".to_string()),
            filter: Some("status == 200".to_string()),
            ..Config::default()
        };
        let mut args = InputArgs::new("access.log").with_groups(&["^/b/[0-9]+$"]);
        args.filter = Some("status >= 400".to_string());

        let options = args.reader_options(&config);
        assert_eq!(options.matching_groups, vec!["^/a/[0-9]+$", "^/b/[0-9]+$"]);
        assert_eq!(options.time_format, "%Y-%m-%dT%H:%M:%S%z");
        assert_eq!(options.filter.as_deref(), Some("status >= 400"));
    }

    #[test]
    fn test_error_policy_flag() {
        let mut args = InputArgs::new("-");
        assert_eq!(args.error_policy(), ErrorPolicy::Abort);
        args.skip_errors = true;
        assert_eq!(args.error_policy(), ErrorPolicy::Skip);
    }

    #[test]
    fn test_sort_flags_replace_config() {
        let config = Config {
            sort: vec!["uri".to_string()],
            ..Config::default()
        };
        assert_eq!(sort_flags(&[], &config), ["uri"]);
        let flags = vec!["sum:asc".to_string()];
        assert_eq!(sort_flags(&flags, &config), ["sum:asc"]);
    }

    #[test]
    fn test_csv_field_quoting() {
        assert_eq!(csv_field("/plain"), "/plain");
        assert_eq!(csv_field("^/a/[0-9]{1,3}$"), "\"^/a/[0-9]{1,3}$\"");
        assert_eq!(csv_field("say \"hi\","), "\"say \"\"hi\"\",\"");
    }
}
