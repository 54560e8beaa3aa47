//! ptool CLI entry point

use clap::Parser;
use ptool_cli::config::CliOverrides;
use ptool_cli::output::OutputFormatter;
use ptool_cli::{Cli, Config, ExitCode};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn main() -> std::process::ExitCode {
    let cli = Cli::parse();

    let config = match Config::load_from(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Warning: Config error: {e}");
            eprintln!("Using default configuration.");
            Config::default()
        }
    };

    let overrides = CliOverrides {
        output_format: cli.output.map(|f| f.to_string()),
        log_level: if cli.debug {
            Some("debug".to_string())
        } else if cli.verbose {
            Some("info".to_string())
        } else {
            None
        },
    };
    let config = config.with_overrides(&overrides);

    let filter =
        EnvFilter::try_new(&config.logging.level).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let formatter = OutputFormatter::new(config.output_format());
    let command = cli.command.name();
    match cli.execute(&config) {
        Ok(code) => code.to_exit_code(),
        Err(e) => {
            let code = ExitCode::from_error(&e);
            tracing::debug!(error = ?e, exit_code = code.name(), "command failed");
            formatter.print_error(&format!("{e:#}"), command);
            code.to_exit_code()
        }
    }
}
