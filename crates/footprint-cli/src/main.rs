use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use footprint_cli::OutputFormat;
use footprint_cli::commands::{self, InputArgs, param::ParamArgs, trend::TrendArgs};

#[derive(Parser)]
#[command(name = "footprint")]
#[command(author, version)]
#[command(
    about = "Profile HTTP access logs: trends, transitions, scenarios and parameters",
    long_about = "Footprint reads label-delimited access logs, groups request paths into \
                  endpoints with regex matching groups, and reports how each endpoint is \
                  used over time, how users move between endpoints, which traversals are \
                  typical, and how request parameters are distributed."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output format
    #[arg(short, long, global = true, value_enum, default_value_t = OutputFormat::Pretty)]
    format: OutputFormat,
}

#[derive(Subcommand)]
enum Commands {
    /// Count requests per endpoint in fixed-width time buckets
    Trend(TrendArgs),

    /// Build the endpoint-to-endpoint transition matrix of user sessions
    Transition(InputArgs),

    /// Compress user sessions into repeated traversal patterns
    Scenario(InputArgs),

    /// Summarize path captures and query parameters per endpoint
    Param(ParamArgs),

    /// Generate shell completion scripts
    #[command(long_about = "Generate shell completion scripts for footprint.

SUPPORTED SHELLS:
    bash, zsh, fish, powershell, elvish

INSTALLATION:
    bash:  footprint completion --shell bash >> ~/.bashrc
    zsh:   footprint completion --shell zsh > ~/.zfunc/_footprint
           (with `fpath+=~/.zfunc` in ~/.zshrc)
    fish:  footprint completion --shell fish > ~/.config/fish/completions/footprint.fish")]
    Completion {
        /// Shell to generate completions for
        #[arg(short, long, value_enum)]
        shell: Shell,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);
    tracing::debug!("Output format: {}", cli.format.as_str());

    match cli.command {
        Commands::Trend(args) => commands::trend::execute(&args, cli.format),
        Commands::Transition(args) => commands::transition::execute(&args, cli.format),
        Commands::Scenario(args) => commands::scenario::execute(&args, cli.format),
        Commands::Param(args) => commands::param::execute(&args, cli.format),
        Commands::Completion { shell } => {
            commands::completion::execute(shell, &mut Cli::command())
        }
    }
}

fn init_logging(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = if verbose {
        EnvFilter::new("footprint=debug,footprint_cli=debug,footprint_core=debug")
    } else {
        EnvFilter::new("footprint=info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();
}
