use super::{InputArgs, csv_field, sort_flags};
use crate::OutputFormat;
use anyhow::Result;
use footprint_core::profile::{ParamProfile, ParamProfiler, Profiler};
use footprint_core::sort::SortSpec;
use std::fmt::Write;

#[derive(Debug, Clone, Default, clap::Args)]
pub struct ParamArgs {
    #[command(flatten)]
    pub input: InputArgs,

    /// Sort key: method, uri or count, with an optional :asc/:desc
    #[arg(short, long, value_name = "KEY[:asc|desc]")]
    pub sort: Vec<String>,
}

/// Profile the input and return per-endpoint parameter statistics
pub fn run_param(args: &ParamArgs) -> Result<ParamProfile> {
    let config = args.input.load_config()?;
    let sort = SortSpec::parse_list(sort_flags(&args.sort, &config))?;

    let profiler = ParamProfiler::new()
        .with_sort(sort)
        .with_error_policy(args.input.error_policy());

    Ok(profiler.profile(args.input.open(&config)?)?)
}

pub fn execute(args: &ParamArgs, format: OutputFormat) -> Result<()> {
    tracing::info!("Profiling parameters: {}", args.input.file.display());

    let profile = run_param(args)?;

    let output = match format {
        OutputFormat::Json => format_json(&profile)?,
        OutputFormat::Table => format_table(&profile)?,
        OutputFormat::Pretty => format_pretty(&profile)?,
    };
    print!("{}", output);

    Ok(())
}

pub fn format_json(profile: &ParamProfile) -> Result<String> {
    Ok(format!("{}\n", serde_json::to_string_pretty(profile)?))
}

/// One row per endpoint column; endpoints without columns get a single row
/// with the column fields left empty.
pub fn format_table(profile: &ParamProfile) -> Result<String> {
    let mut out = String::from("method,uri,count,column,observed,rate,cardinality,gini\n");
    for stat in &profile.params {
        let prefix = format!("{},{},{}", stat.method, csv_field(&stat.uri), stat.count);
        let columns = stat.summaries();
        if columns.is_empty() {
            writeln!(out, "{},,,,,", prefix)?;
        }
        for c in columns {
            writeln!(
                out,
                "{},{},{},{:.4},{},{:.4}",
                prefix,
                csv_field(&c.name),
                c.observed,
                c.rate,
                c.cardinality,
                c.gini
            )?;
        }
    }
    Ok(out)
}

pub fn format_pretty(profile: &ParamProfile) -> Result<String> {
    use console::style;

    let mut out = String::new();
    writeln!(out, "\n{}", style("Parameters").bold().cyan())?;
    writeln!(out, "{}", style("==========").cyan())?;
    writeln!(out, "  Endpoints: {}", profile.params.len())?;

    for stat in &profile.params {
        writeln!(
            out,
            "\n{} {}",
            style(&stat.key).bold(),
            style(format!("({} requests)", stat.count)).dim()
        )?;

        let columns = stat.summaries();
        if columns.is_empty() {
            writeln!(out, "  no parameters")?;
            continue;
        }

        writeln!(
            out,
            "  {:<24} {:>8} {:>8} {:>12} {:>6}",
            "column", "observed", "rate", "cardinality", "gini"
        )?;
        for c in columns {
            writeln!(
                out,
                "  {:<24} {:>8} {:>7.2}% {:>12} {:>6.3}",
                c.name,
                c.observed,
                c.rate * 100.0,
                c.cardinality,
                c.gini
            )?;
        }
    }

    writeln!(out)?;
    Ok(out)
}
