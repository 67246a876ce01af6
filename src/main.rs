//! sm CLI entry point.

use clap::Parser;
use sm::cli::commands::{self, Context};
use sm::cli::{Cli, Commands};
use sm::error::Error;
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = Cli::parse();

    if cli.no_color {
        colored::control::set_override(false);
    }

    // Set up tracing based on verbosity
    init_tracing(cli.verbose, cli.quiet);

    // Resolve effective JSON mode: --json OR non-TTY stdout
    let json = cli.json || !std::io::IsTerminal::is_terminal(&std::io::stdout());

    match run(&cli, json) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if json {
                eprintln!("{}", e.to_structured_json());
            } else if !cli.quiet {
                if let Some(hint) = e.hint() {
                    eprintln!("Error: {e}\n  Hint: {hint}");
                } else {
                    eprintln!("Error: {e}");
                }
            }
            ExitCode::from(e.exit_code())
        }
    }
}

fn init_tracing(verbose: u8, quiet: bool) {
    use tracing_subscriber::EnvFilter;

    if quiet {
        return;
    }

    // Honor RUST_LOG if set, otherwise use verbosity flag
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        match verbose {
            0 => EnvFilter::new("warn"),
            1 => EnvFilter::new("info"),
            2 => EnvFilter::new("debug,rusqlite=info"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .init();
}

fn run(cli: &Cli, json: bool) -> Result<(), Error> {
    // Resolved lazily so version and completions work without a data root
    let ctx = || Context::resolve(cli.data_dir.as_deref(), cli.db.as_deref(), cli.actor.as_deref());

    match &cli.command {
        Commands::Version => commands::version::execute(json),
        Commands::Completions { shell } => commands::completions::execute(shell),
        Commands::Init { force } => commands::init::execute(&ctx()?, *force, json),
        Commands::Project { command } => commands::project::execute(command, &ctx()?, json),
        Commands::Issue { command } => commands::issue::execute(command, &ctx()?, json),
        Commands::Board { command } => commands::board::execute(command, &ctx()?, json),
        Commands::User { command } => commands::user::execute(command, &ctx()?, json),
        Commands::Repair => commands::repair::execute(&ctx()?, json),
        Commands::Check { fix } => commands::check::execute(&ctx()?, *fix, json),
        Commands::Watch { rebuild } => commands::watch::execute(&ctx()?, *rebuild, json),
    }
}
