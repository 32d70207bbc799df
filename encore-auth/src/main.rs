//! encore-auth - Log in, register and log out of the Encore ticket service
//!
//! The token lands in the configured storage backend and every other
//! `encore-*` tool picks it up from there.

use std::io::{self, Read};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use libencore::cli::{self, OutputFormat, StartOptions};
use libencore::error::ApiError;
use libencore::EncoreService;
use serde_json::json;

#[derive(Parser, Debug)]
#[command(name = "encore-auth")]
#[command(version, about = "Log in to the Encore ticket service")]
#[command(long_about = r#"Manage the Encore session token.

EXAMPLES:
    # Log in interactively (prompts for the password)
    encore-auth login alice

    # Log in from a script
    printf '%s' "$PASSWORD" | encore-auth login alice --password-stdin

    # Create an account; a successful registration logs you in
    encore-auth register bob

    # Check whether a token is stored
    encore-auth status
    encore-auth status --format json | jq .authenticated

    # Forget the token
    encore-auth logout

OUTPUT FORMATS:
    text  - Human-readable status line (default)
    json  - JSON object
    jsonl - JSON object on one line

EXIT CODES:
    0 - Success
    1 - Network, configuration or storage error
    2 - Not logged in, or the server rejected the credentials
    3 - Invalid input (empty user name or password)
"#)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(short, long, global = true, default_value = "text", value_name = "FORMAT")]
    #[arg(value_parser = ["text", "json", "jsonl"])]
    format: String,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Keep the session in memory only (nothing is persisted)
    #[arg(long, global = true)]
    ephemeral: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Log in with an existing account
    Login(Credentials),

    /// Create an account and log in
    Register(Credentials),

    /// Delete the stored token
    Logout,

    /// Show whether a token is stored
    Status,
}

#[derive(clap::Args, Debug)]
struct Credentials {
    /// Account user name
    user_name: String,

    /// Read the password from stdin (for automation/agents)
    #[arg(long)]
    password_stdin: bool,
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

    match cli.command {
        Commands::Login(credentials) => {
            let password = read_password(&credentials)?;
            service
                .auth()
                .log_in(&credentials.user_name, &password)
                .await
                .context("Login failed")?;
            println!("Logged in as {}", credentials.user_name);
        }
        Commands::Register(credentials) => {
            let password = read_password(&credentials)?;
            service
                .auth()
                .register(&credentials.user_name, &password)
                .await
                .context("Registration failed")?;
            println!("Registered and logged in as {}", credentials.user_name);
        }
        Commands::Logout => {
            service.auth().log_out().await.context("Logout failed")?;
            println!("Logged out");
        }
        Commands::Status => status(&service, format)?,
    }

    Ok(())
}

fn status(service: &EncoreService, format: OutputFormat) -> Result<()> {
    let authenticated = service.session().current().is_authenticated();
    let report = json!({
        "authenticated": authenticated,
        "api": service.config().api.base_url,
        "route": service.route().path(),
    });

    cli::write_item(&mut io::stdout().lock(), &report, format, |_| {
        if authenticated {
            format!("Logged in ({})", service.config().api.base_url)
        } else {
            "Not logged in".to_string()
        }
    })?;

    if !authenticated {
        return Err(ApiError::Unauthorized("not logged in".to_string()).into());
    }
    Ok(())
}

fn read_password(credentials: &Credentials) -> Result<String> {
    if credentials.password_stdin {
        let mut buffer = String::new();
        io::stdin()
            .read_to_string(&mut buffer)
            .context("Failed to read password from stdin")?;
        return Ok(buffer.trim_end_matches(['\r', '\n']).to_string());
    }

    if !atty::is(atty::Stream::Stdin) {
        anyhow::bail!("Not a TTY. Use --password-stdin to pass the password on stdin.");
    }

    let password = rpassword::prompt_password(format!("Password for {}: ", credentials.user_name))
        .context("Failed to read password")?;
    tracing::debug!("Password read from terminal");
    Ok(password)
}
