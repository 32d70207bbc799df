//! encore-favorites - List and remove favorite concerts

use std::io;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use libencore::cli::{self, OutputFormat, StartOptions};
use libencore::error::EncoreError;
use libencore::Favorite;

#[derive(Parser, Debug)]
#[command(name = "encore-favorites")]
#[command(version, about = "List and remove favorite concerts")]
#[command(long_about = r#"List and remove favorite concerts.

EXAMPLES:
    # List favorites
    encore-favorites

    # Remove a favorite by its own id (the first column of the listing)
    encore-favorites remove 7c1d0e52-0000-4000-8000-000000000002

    # Favorite concert ids
    encore-favorites --format jsonl | jq -r .concert.id

OUTPUT FORMATS:
    text  - One line per favorite (default)
    json  - JSON array
    jsonl - JSON lines, one favorite per line

EXIT CODES:
    0 - Success (including no favorites)
    1 - Network, configuration or storage error
    2 - Not logged in, or the session was rejected
"#)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Output format
    #[arg(short, long, default_value = "text", value_name = "FORMAT")]
    #[arg(value_parser = ["text", "json", "jsonl"])]
    format: String,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Keep the session in memory only
    #[arg(long, global = true)]
    ephemeral: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Remove a favorite
    Remove {
        /// Favorite id (not the concert id)
        id: String,
    },
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

    let screen = service.favorites();
    match cli.command {
        None => {
            screen
                .load()
                .await
                .map_err(EncoreError::from)
                .context("Failed to load favorites")?;
            cli::write_list(
                &mut io::stdout().lock(),
                &screen.state(),
                format,
                "No favorites yet",
                render,
            )?;
        }
        Some(Commands::Remove { id }) => {
            screen
                .remove(&id)
                .await
                .context("Failed to remove favorite")?;
            println!("Removed favorite {}", id);
        }
    }

    Ok(())
}

fn render(favorite: &Favorite) -> String {
    format!(
        "{} | {} | {} | {}",
        favorite.id,
        favorite.concert.started_at.format("%Y-%m-%d %H:%M"),
        favorite.concert_id(),
        favorite.concert.name
    )
}
