use super::{InputArgs, csv_field, sort_flags};
use crate::OutputFormat;
use anyhow::Result;
use footprint_core::profile::{Profiler, Trend, TrendProfiler};
use footprint_core::sort::SortSpec;
use std::fmt::Write;

/// Bucket width used when neither the flag nor the config sets one
pub const DEFAULT_INTERVAL: i64 = 60;

#[derive(Debug, Clone, Default, clap::Args)]
pub struct TrendArgs {
    #[command(flatten)]
    pub input: InputArgs,

    /// Bucket width in seconds [default: 60]
    #[arg(short = 'n', long, value_name = "SECS")]
    pub interval: Option<i64>,

    /// Sort key: method, uri, sum, count0, count1 or countN, with an optional :asc/:desc
    #[arg(short, long, value_name = "KEY[:asc|desc]")]
    pub sort: Vec<String>,
}

/// Profile the input and return per-endpoint bucket counts
pub fn run_trend(args: &TrendArgs) -> Result<Trend> {
    let config = args.input.load_config()?;
    let interval = args.interval.or(config.interval).unwrap_or(DEFAULT_INTERVAL);
    let sort = SortSpec::parse_list(sort_flags(&args.sort, &config))?;

    let profiler = TrendProfiler::new(interval)?
        .with_sort(sort)
        .with_error_policy(args.input.error_policy());

    Ok(profiler.profile(args.input.open(&config)?)?)
}

pub fn execute(args: &TrendArgs, format: OutputFormat) -> Result<()> {
    tracing::info!("Profiling trend: {}", args.input.file.display());

    let trend = run_trend(args)?;

    let output = match format {
        OutputFormat::Json => format_json(&trend)?,
        OutputFormat::Table => format_table(&trend)?,
        OutputFormat::Pretty => format_pretty(&trend)?,
    };
    print!("{}", output);

    Ok(())
}

pub fn format_json(trend: &Trend) -> Result<String> {
    Ok(format!("{}\n", serde_json::to_string_pretty(trend)?))
}

/// Header `method,uri,sum` followed by each bucket's start offset in seconds
pub fn format_table(trend: &Trend) -> Result<String> {
    let mut out = String::from("method,uri,sum");
    for i in 0..trend.step {
        write!(out, ",{}", (i as i64).saturating_mul(trend.interval))?;
    }
    out.push('\n');

    for row in &trend.rows {
        write!(out, "{},{},{}", row.method, csv_field(&row.uri), row.sum)?;
        for count in &row.counts {
            write!(out, ",{}", count)?;
        }
        out.push('\n');
    }

    Ok(out)
}

pub fn format_pretty(trend: &Trend) -> Result<String> {
    use console::style;

    let mut out = String::new();
    writeln!(out, "\n{}", style("Access Trend").bold().cyan())?;
    writeln!(out, "{}", style("============").cyan())?;

    if let Some(start) = trend.start {
        writeln!(out, "  Start:     {}", start.to_rfc3339())?;
    }
    writeln!(out, "  Interval:  {}s", trend.interval)?;
    writeln!(out, "  Buckets:   {}", trend.step)?;
    writeln!(out, "  Endpoints: {}", trend.rows.len())?;

    if trend.rows.is_empty() {
        writeln!(out, "\n  No requests found.")?;
        return Ok(out);
    }

    let width = trend.rows.iter().map(|r| r.key.len()).max().unwrap_or(0);
    writeln!(out)?;
    for row in &trend.rows {
        let counts = row
            .counts
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(" ");
        writeln!(
            out,
            "  {:<width$}  {:>6}  {}",
            style(&row.key).bold(),
            row.sum,
            style(counts).dim(),
            width = width
        )?;
    }

    if trend.stats.skipped > 0 {
        writeln!(
            out,
            "\n  {} {} malformed lines skipped",
            style("!").yellow(),
            trend.stats.skipped
        )?;
    }

    writeln!(out)?;
    Ok(out)
}
