pub mod commands;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "tributary")]
#[command(about = "A shared-video feed client", long_about = None)]
pub struct Cli {
    /// Path to an alternate config file
    #[arg(short, long, global = true)]
    pub config: Option<std::path::PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Args)]
pub struct LoginArgs {
    /// Account username
    #[arg(short, long)]
    pub username: String,

    /// Account password
    #[arg(short, long)]
    pub password: String,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Sign in and follow the shared feed until Ctrl-C
    Watch {
        #[command(flatten)]
        login: LoginArgs,
    },
    /// Share a video URL with the group
    Share {
        /// Video URL (or bare content id)
        url: String,

        #[command(flatten)]
        login: LoginArgs,
    },
    /// Sign in, fetch the feed once, and print it
    Pull {
        #[command(flatten)]
        login: LoginArgs,
    },
}
