//! CLI entry point.

use std::time::Duration;

use clap::{CommandFactory, Parser};
use prdkit_core::{GenerationOptions, PrdForm};
use prdkit_proxy::ServerConfig;
use tracing_subscriber::EnvFilter;

use prdkit_cli::{Cli, Commands, handlers};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables before clap reads them
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cli.default_log_filter()));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let Some(command) = cli.command else {
        Cli::command().print_help()?;
        return Ok(());
    };

    match command {
        Commands::Serve {
            port,
            host,
            ollama_url,
            model,
            fallback_model,
            temperature,
            timeout_secs,
            static_dir,
        } => {
            let mut config = ServerConfig::default()
                .with_generate_url(ollama_url)
                .with_preferred_model(model);
            config.port = port;
            config.host = host;
            config.models.fallback = fallback_model;
            config.options = GenerationOptions { temperature };
            config.backend_timeout = Duration::from_secs(timeout_secs);
            if let Some(dir) = static_dir {
                config = config.with_static_dir(dir);
            }
            handlers::serve::execute(config).await?;
        }
        Commands::Diagnose {
            port,
            ollama_url,
            model,
        } => {
            handlers::diagnose::execute(port, &ollama_url, &model).await?;
        }
        Commands::Prompt(args) => {
            handlers::prompt::execute(&PrdForm::from(args))?;
        }
    }

    Ok(())
}
