//! Sonda CLI: run resilient browser scenarios
//!
//! ## Usage
//!
//! ```bash
//! sonda run scenarios/ --base-url https://example.com   # Run everything
//! sonda run --tag smoke --fail-fast                     # Smoke tests only
//! sonda list scenarios/                                 # Show scenarios
//! sonda validate scenarios/contact.yaml                 # Check files
//! ```

use clap::Parser;
use sonda_cli::{logging, runner, Cli, CliConfig, CliError, CliResult, Commands, ProgressReporter, Verbosity};
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = Cli::parse();
    let config = build_config(&cli);
    logging::init(config.verbosity, cli.log_format);

    match run(&config, cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::from(e.exit_code())
        }
    }
}

fn build_config(cli: &Cli) -> CliConfig {
    let verbosity = if cli.quiet {
        Verbosity::Quiet
    } else {
        match cli.verbose {
            0 => Verbosity::Normal,
            1 => Verbosity::Verbose,
            _ => Verbosity::Debug,
        }
    };

    CliConfig::new()
        .with_verbosity(verbosity)
        .with_color(cli.color.into())
}

fn run(config: &CliConfig, command: Commands) -> CliResult<()> {
    match command {
        Commands::Run(args) => {
            let rt = tokio::runtime::Runtime::new()
                .map_err(|e| CliError::config(format!("Failed to create runtime: {e}")))?;
            rt.block_on(runner::run(config, &args)).map(|_| ())
        }
        Commands::List(args) => {
            for line in runner::list(&args)? {
                println!("{line}");
            }
            Ok(())
        }
        Commands::Validate(args) => {
            let progress =
                ProgressReporter::new(config.color.should_color(), config.verbosity.is_quiet());
            let count = runner::validate(&args, &progress)?;
            println!("{count} scenario(s) valid");
            Ok(())
        }
    }
}
