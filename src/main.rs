use clap::Parser;
use tracing_subscriber::EnvFilter;

use farmacohub::cli::{Cli, Commands};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .try_init();
}

fn report(err: &anyhow::Error) {
    if let Some(farmaco_err) = err.downcast_ref::<farmacohub::error::FarmacoError>() {
        eprintln!("Error: {farmaco_err}");
    } else {
        eprintln!("Error: {err}");
    }
}

#[tokio::main]
async fn main() -> std::process::ExitCode {
    init_tracing();

    let cli = Cli::parse();
    match cli.command {
        Some(Commands::Session) => match farmacohub::cli::session::run(cli).await {
            Ok(()) => std::process::ExitCode::SUCCESS,
            Err(err) => {
                report(&err);
                std::process::ExitCode::from(1)
            }
        },
        _ => match farmacohub::cli::run(cli).await {
            Ok(output) => {
                println!("{output}");
                std::process::ExitCode::SUCCESS
            }
            Err(err) => {
                report(&err);
                std::process::ExitCode::from(1)
            }
        },
    }
}
