mod cli;
mod commands;
mod config;
mod error;
mod output;

use std::path::Path;

use clap::Parser;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::cli::{Cli, Command, GlobalOpts, LogFormat};
use crate::error::CliError;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Held until exit so buffered file logs are flushed
    let _guard = init_tracing(&cli.global);

    if let Err(err) = run(cli).await {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}

fn init_tracing(global: &GlobalOpts) -> Option<WorkerGuard> {
    let level = match global.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let json = global.log_format == LogFormat::Json;

    match global.log_file {
        Some(ref path) => {
            let dir = path.parent().unwrap_or_else(|| Path::new("."));
            let file_name = path
                .file_name()
                .unwrap_or_else(|| std::ffi::OsStr::new("matebridge.log"));
            let appender = tracing_appender::rolling::never(dir, file_name);
            let (writer, guard) = tracing_appender::non_blocking(appender);

            let layer = fmt::layer().with_writer(writer).with_ansi(false);
            if json {
                tracing_subscriber::registry()
                    .with(filter)
                    .with(layer.json())
                    .init();
            } else {
                tracing_subscriber::registry().with(filter).with(layer).init();
            }
            Some(guard)
        }
        None => {
            let layer = fmt::layer().with_writer(std::io::stderr).with_target(false);
            if json {
                tracing_subscriber::registry()
                    .with(filter)
                    .with(layer.json())
                    .init();
            } else {
                tracing_subscriber::registry().with(filter).with(layer).init();
            }
            None
        }
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        // Config and catalog commands don't need the API
        Command::Config(args) => commands::config_cmd::handle(args, &cli.global),
        Command::Catalog(args) => {
            commands::catalog::handle(&args, &cli.global);
            Ok(())
        }

        // Shell completions generation
        Command::Completions(args) => {
            use clap::CommandFactory;
            use clap_complete::generate;

            let mut cmd = Cli::command();
            generate(args.shell, &mut cmd, "matebridge", &mut std::io::stdout());
            Ok(())
        }

        // Everything else talks to TeslaMate
        cmd => {
            let bridge_config = config::build_bridge_config(&cli.global)?;
            tracing::debug!(command = ?cmd, url = %bridge_config.url, "dispatching command");
            commands::dispatch(cmd, bridge_config, &cli.global).await
        }
    }
}
