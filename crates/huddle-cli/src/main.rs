//! Huddle CLI - feed, chat and notifications from the terminal
//!
//! Every command runs against the backend project of the selected profile;
//! `chat watch` and `badges --watch` stay connected over realtime.

mod auth;
mod cli;
mod commands;
mod config_profiles;
mod error;

#[cfg(test)]
mod tests;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Commands};
use crate::commands::auth_cmd::run_auth;
use crate::commands::badges::run_badges;
use crate::commands::chat::run_chat;
use crate::commands::completions::run_completions;
use crate::commands::config::run_config;
use crate::commands::feed::{run_feed, run_post};
use crate::commands::friends::run_friends;
use crate::commands::notifications::run_notifications;
use crate::commands::posts::{run_comment, run_comments, run_like};
use crate::commands::users::run_users;
use crate::error::CliError;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), CliError> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("huddle=info,huddle_core=warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let profile = cli.profile.as_deref();
    let as_json = cli.json;

    match cli.command {
        Commands::Config { command } => run_config(command, profile, as_json).await?,
        Commands::Auth { command } => run_auth(command, profile).await?,
        Commands::Feed { pages, limit, user } => {
            run_feed(pages, limit, user.as_deref(), profile, as_json).await?;
        }
        Commands::Post { body } => run_post(&body, profile).await?,
        Commands::Like { post_id } => run_like(&post_id, true, profile).await?,
        Commands::Unlike { post_id } => run_like(&post_id, false, profile).await?,
        Commands::Comments { post_id, sort } => {
            run_comments(&post_id, sort, profile, as_json).await?;
        }
        Commands::Comment { post_id, text } => run_comment(&post_id, &text, profile).await?,
        Commands::Chat { command } => run_chat(command, profile, as_json).await?,
        Commands::Notifications { command, unread } => {
            run_notifications(command, unread, profile, as_json).await?;
        }
        Commands::Friends { command } => run_friends(command, profile, as_json).await?,
        Commands::Users { command } => run_users(command, profile, as_json).await?,
        Commands::Badges { watch } => run_badges(watch, profile, as_json).await?,
        Commands::Completions { shell, output } => {
            run_completions(shell, output.as_deref())?;
        }
    }

    Ok(())
}
