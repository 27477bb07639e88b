use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use pserver::{AppConfig, ServerError};

#[derive(Parser, Debug)]
#[command(name = "promptshell-server", version, about = "Serve prompts, tools, and environment values over HTTP")]
struct Args {
    /// Path to a TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Listen address, overriding the config file
    #[arg(long)]
    listen: Option<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    match run(Args::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("promptshell-server: {err}");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<(), ServerError> {
    let mut config = AppConfig::load(args.config.as_deref())?;
    if let Some(listen) = args.listen {
        config.server.listen_addr = listen;
    }

    pserver::telemetry::init_tracing(&config.logging)?;
    tracing::debug!(?config.store.kind, listen = %config.server.listen_addr, "configuration loaded");

    pserver::serve(config).await
}
