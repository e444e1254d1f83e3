use anyhow::Result;
use clap::Command;
use clap_complete::{Shell, generate};
use std::io::{self, Write};

/// Render the completion script for `shell` into `out`
pub fn write_script<W: Write>(shell: Shell, cmd: &mut Command, out: &mut W) -> Result<()> {
    let bin_name = cmd.get_name().to_string();
    tracing::debug!("Generating {} completions for {}", shell, bin_name);
    generate(shell, cmd, bin_name, out);
    out.flush()?;
    Ok(())
}

pub fn execute(shell: Shell, cmd: &mut Command) -> Result<()> {
    write_script(shell, cmd, &mut io::stdout().lock())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Arg;

    fn sample() -> Command {
        Command::new("footprint")
            .subcommand(Command::new("trend").arg(Arg::new("interval").long("interval")))
            .subcommand(Command::new("scenario"))
    }

    #[test]
    fn test_script_names_subcommands() {
        let mut buf = Vec::new();
        write_script(Shell::Fish, &mut sample(), &mut buf).unwrap();
        let script = String::from_utf8(buf).unwrap();

        assert!(script.contains("complete -c footprint"));
        assert!(script.contains("trend"));
        assert!(script.contains("interval"));
    }

    #[test]
    fn test_script_uses_command_name() {
        let mut buf = Vec::new();
        write_script(Shell::Bash, &mut sample(), &mut buf).unwrap();
        let script = String::from_utf8(buf).unwrap();

        assert!(script.contains("_footprint()"));
    }
}
