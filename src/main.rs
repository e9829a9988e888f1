use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use tributary::app::AppContext;
use tributary::auth::Credentials;
use tributary::cli::{commands, Cli, Commands, LoginArgs};
use tributary::config::Config;

fn credentials(login: LoginArgs) -> Credentials {
    Credentials {
        username: login.username,
        password: login.password,
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => Config::from_path(path)?,
        None => Config::load()?,
    };
    let ctx = AppContext::new(config)?;

    match cli.command {
        Commands::Watch { login } => {
            commands::watch(&ctx, credentials(login)).await?;
        }
        Commands::Share { url, login } => {
            commands::share(&ctx, credentials(login), &url).await?;
        }
        Commands::Pull { login } => {
            commands::pull(&ctx, credentials(login)).await?;
        }
    }

    Ok(())
}
