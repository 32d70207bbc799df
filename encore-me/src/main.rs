//! encore-me - Show the logged-in user's profile

use std::io;

use anyhow::{Context, Result};
use clap::Parser;
use libencore::cli::{self, OutputFormat, StartOptions};
use libencore::error::{ApiError, EncoreError};
use libencore::UserProfile;

#[derive(Parser, Debug)]
#[command(name = "encore-me")]
#[command(version, about = "Show your Encore profile")]
#[command(long_about = r#"Show the profile of the logged-in user.

EXAMPLES:
    encore-me
    encore-me --format json | jq -r .userName

OUTPUT FORMATS:
    text  - User name, role and member-since date (default)
    json  - JSON object
    jsonl - JSON object on one line

EXIT CODES:
    0 - Success
    1 - Network, configuration or storage error
    2 - Not logged in, or the session was rejected
"#)]
struct Cli {
    /// Output format
    #[arg(short, long, default_value = "text", value_name = "FORMAT")]
    #[arg(value_parser = ["text", "json", "jsonl"])]
    format: String,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Keep the session in memory only
    #[arg(long)]
    ephemeral: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {:#}", e);
        std::process::exit(cli::exit_code(&e));
    }
}

async fn run(cli: Cli) -> Result<()> {
    let format: OutputFormat = cli.format.parse()?;
    let service = cli::start(StartOptions {
        verbose: cli.verbose,
        ephemeral: cli.ephemeral,
    })
    .await?;
    cli::require_login(&service)?;

    let profile = service
        .profile()
        .load()
        .await
        .map_err(EncoreError::from)
        .context("Failed to load profile")?
        .ok_or_else(|| EncoreError::from(ApiError::Decode("empty profile response".to_string())))?;

    cli::write_item(&mut io::stdout().lock(), &profile, format, render)?;
    Ok(())
}

fn render(profile: &UserProfile) -> String {
    let role = if profile.role.is_empty() {
        "user"
    } else {
        profile.role.as_str()
    };
    format!(
        "{} ({})\nMember since {}",
        profile.user_name,
        role,
        profile.member_since()
    )
}
