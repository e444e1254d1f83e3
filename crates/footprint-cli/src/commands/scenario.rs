use super::{InputArgs, csv_field};
use crate::OutputFormat;
use anyhow::Result;
use footprint_core::profile::{Profiler, ScenarioProfile, ScenarioProfiler};
use std::fmt::Write;

/// Profile the input and return the merged scenarios
pub fn run_scenario(args: &InputArgs) -> Result<ScenarioProfile> {
    let config = args.load_config()?;
    let profiler = ScenarioProfiler::new().with_error_policy(args.error_policy());
    Ok(profiler.profile(args.open(&config)?)?)
}

pub fn execute(args: &InputArgs, format: OutputFormat) -> Result<()> {
    tracing::info!("Profiling scenarios: {}", args.file.display());

    let profile = run_scenario(args)?;

    let output = match format {
        OutputFormat::Json => format_json(&profile)?,
        OutputFormat::Table => format_table(&profile)?,
        OutputFormat::Pretty => format_pretty(&profile)?,
    };
    print!("{}", output);

    Ok(())
}

pub fn format_json(profile: &ScenarioProfile) -> Result<String> {
    Ok(format!("{}\n", serde_json::to_string_pretty(profile)?))
}

pub fn format_table(profile: &ScenarioProfile) -> Result<String> {
    let mut out = String::from("count,first_req,last_req,scenario\n");
    for s in &profile.scenarios {
        writeln!(
            out,
            "{},{},{},{}",
            s.count,
            s.first_req,
            s.last_req,
            csv_field(&s.hash)
        )?;
    }
    Ok(out)
}

pub fn format_pretty(profile: &ScenarioProfile) -> Result<String> {
    use console::style;

    let mut out = String::new();
    writeln!(out, "\n{}", style("Scenarios").bold().cyan())?;
    writeln!(out, "{}", style("=========").cyan())?;
    writeln!(out, "  Sessions:  {}", profile.sessions)?;
    writeln!(out, "  Scenarios: {}", profile.scenarios.len())?;

    for (i, s) in profile.scenarios.iter().enumerate() {
        writeln!(
            out,
            "\n  {}. {} sessions, {}s - {}s",
            i + 1,
            style(s.count).bold(),
            s.first_req,
            s.last_req
        )?;
        writeln!(out, "     {}", s)?;
    }

    writeln!(out)?;
    Ok(out)
}
