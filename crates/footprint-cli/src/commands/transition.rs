use super::{InputArgs, csv_field};
use crate::OutputFormat;
use anyhow::Result;
use footprint_core::profile::{Profiler, SESSION_EDGE, Transition, TransitionProfiler};
use std::fmt::Write;

/// Profile the input and return the session transition matrix
pub fn run_transition(args: &InputArgs) -> Result<Transition> {
    let config = args.load_config()?;
    let profiler = TransitionProfiler::new().with_error_policy(args.error_policy());
    Ok(profiler.profile(args.open(&config)?)?)
}

pub fn execute(args: &InputArgs, format: OutputFormat) -> Result<()> {
    tracing::info!("Profiling transitions: {}", args.file.display());

    let transition = run_transition(args)?;

    let output = match format {
        OutputFormat::Json => format_json(&transition)?,
        OutputFormat::Table => format_table(&transition)?,
        OutputFormat::Pretty => format_pretty(&transition)?,
    };
    print!("{}", output);

    Ok(())
}

pub fn format_json(transition: &Transition) -> Result<String> {
    Ok(format!("{}\n", serde_json::to_string_pretty(transition)?))
}

/// One `from,to,count` row per edge; the session boundary is an empty field
pub fn format_table(transition: &Transition) -> Result<String> {
    let mut out = String::from("from,to,count\n");
    for (prev, row) in &transition.matrix {
        for (next, count) in row {
            writeln!(out, "{},{},{}", csv_field(prev), csv_field(next), count)?;
        }
    }
    Ok(out)
}

fn label(endpoint: &str) -> &str {
    if endpoint == SESSION_EDGE {
        "(session)"
    } else {
        endpoint
    }
}

pub fn format_pretty(transition: &Transition) -> Result<String> {
    use console::style;

    let mut out = String::new();
    writeln!(out, "\n{}", style("Transitions").bold().cyan())?;
    writeln!(out, "{}", style("===========").cyan())?;
    writeln!(out, "  Sessions:  {}", transition.sessions)?;
    writeln!(out, "  Endpoints: {}", transition.totals.len())?;

    if !transition.totals.is_empty() {
        writeln!(out, "\n{}", style("Requests:").bold())?;
        for (endpoint, total) in &transition.totals {
            writeln!(out, "  {:>6}  {}", total, endpoint)?;
        }
    }

    if !transition.matrix.is_empty() {
        writeln!(out, "\n{}", style("Edges:").bold())?;
        for (prev, row) in &transition.matrix {
            writeln!(out, "  {}", style(label(prev)).bold())?;
            for (next, count) in row {
                writeln!(out, "    -> {:<40} {:>6}", label(next), count)?;
            }
        }
    }

    writeln!(out)?;
    Ok(out)
}
