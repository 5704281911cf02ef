mod cli;
mod commands;
mod output;

use anyhow::Result;
use clap::Parser;
use jhe_client::{ClientConfig, ConfigOverrides, JupyterHealthClient};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

use cli::{Cli, Commands};
use output::print_error;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    if let Err(e) = run(&cli).await {
        print_error(&format!("{e:#}"));
        std::process::exit(1);
    }
}

/// Log to stderr so stdout stays clean for records.
fn init_tracing(level: &str) {
    // Prefer RUST_LOG from env, otherwise use provided level string.
    let filter = std::env::var("RUST_LOG")
        .ok()
        .and_then(|_| EnvFilter::try_from_default_env().ok())
        .unwrap_or_else(|| EnvFilter::new(level));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .try_init();
}

async fn run(cli: &Cli) -> Result<()> {
    let format = cli.format.unwrap_or_default();

    match &cli.command {
        Commands::Tidy(args) => {
            commands::tidy::tidy(args, format)?;
        }
        Commands::User => {
            let client = make_client(cli)?;
            commands::resources::user(&client, format).await?;
        }
        Commands::Organizations(args) => {
            let client = make_client(cli)?;
            commands::resources::organizations(&client, args, format).await?;
        }
        Commands::Studies(args) => {
            let client = make_client(cli)?;
            commands::resources::studies(&client, args, format).await?;
        }
        Commands::Patients(args) => {
            let client = make_client(cli)?;
            commands::resources::patients(&client, args, format).await?;
        }
        Commands::DataSources => {
            let client = make_client(cli)?;
            commands::resources::data_sources(&client, format).await?;
        }
        Commands::Observations(args) => {
            let client = make_client(cli)?;
            commands::observations::observations(&client, args, format).await?;
        }
    }

    Ok(())
}

fn make_client(cli: &Cli) -> Result<JupyterHealthClient> {
    let config = ClientConfig::load(ConfigOverrides {
        url: cli.url.clone(),
        token: cli.token.clone(),
        page_size: cli.page_size,
    })?;
    tracing::debug!(url = %config.url, page_size = config.page_size, "connecting");
    Ok(JupyterHealthClient::new(config)?)
}
