//! encore-shows - Browse concerts, buy tickets and manage favorites

use std::io;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use libencore::cli::{self, OutputFormat, StartOptions};
use libencore::error::EncoreError;
use libencore::Concert;

#[derive(Parser, Debug)]
#[command(name = "encore-shows")]
#[command(version, about = "Browse concerts and buy tickets")]
#[command(long_about = r#"Browse the concert catalogue, buy tickets and manage favorites.

EXAMPLES:
    # First page of concerts, favorites marked with *
    encore-shows

    # Other pages
    encore-shows --page 2 --take 10

    # Search by name (replaces the listing)
    encore-shows --search "jazz"

    # Buy a ticket for a listed concert
    encore-shows buy 3f2a9c1b-0000-4000-8000-000000000001

    # Add or remove a favorite
    encore-shows favorite 3f2a9c1b-0000-4000-8000-000000000001

    # JSON output for scripting
    encore-shows --format json | jq -r '.[] | select(.availableTicketAmount > 0) | .id'
    encore-shows --format jsonl

OUTPUT FORMATS:
    text  - One line per concert (default)
    json  - JSON array
    jsonl - JSON lines, one concert per line

EXIT CODES:
    0 - Success (an empty listing prints "No concerts found")
    1 - Network, configuration or storage error
    2 - Not logged in, or the session was rejected
    3 - Invalid input (sold out, unknown concert, bad page)
"#)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Search concerts by name
    #[arg(short, long, value_name = "TERM")]
    search: Option<String>,

    /// Page of the listing (1-based)
    #[arg(long, default_value = "1", value_name = "N")]
    page: u32,

    /// Concerts per page (default: api.page_size)
    #[arg(long, value_name = "N")]
    take: Option<u32>,

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
    /// Buy one ticket for a concert on the current page
    Buy {
        /// Concert id
        id: String,
    },

    /// Toggle a concert on the current page in or out of favorites
    Favorite {
        /// Concert id
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

    let screen = service.concerts();
    screen.set_page(cli::page(&service, cli.page, cli.take)?);

    match cli.command {
        None => {
            match cli.search.as_deref() {
                Some(term) => screen.search(term).await,
                None => screen.load().await,
            }
            .map_err(EncoreError::from)
            .context("Failed to load concerts")?;

            let empty = match cli.search {
                Some(_) => "No concerts match the search",
                None => "No concerts found",
            };
            cli::write_list(&mut io::stdout().lock(), &screen.state(), format, empty, render)?;
        }
        Some(Commands::Buy { id }) => {
            screen
                .load()
                .await
                .map_err(EncoreError::from)
                .context("Failed to load concerts")?;
            screen.buy_ticket(&id).await.context("Failed to buy ticket")?;
            println!("Ticket purchased for {}", id);
        }
        Some(Commands::Favorite { id }) => {
            screen
                .load()
                .await
                .map_err(EncoreError::from)
                .context("Failed to load concerts")?;
            let is_favorite = screen
                .toggle_favorite(&id)
                .await
                .context("Failed to update favorites")?;
            if is_favorite {
                println!("Added {} to favorites", id);
            } else {
                println!("Removed {} from favorites", id);
            }
        }
    }

    Ok(())
}

fn render(concert: &Concert) -> String {
    let star = if concert.is_favorite { " *" } else { "" };
    let availability = if concert.is_sold_out() {
        concert.buy_label().to_string()
    } else {
        format!("{} left", concert.available_ticket_amount)
    };
    format!(
        "{} | {} | {}{} | {:.2} | {}",
        concert.started_at.format("%Y-%m-%d %H:%M"),
        concert.id,
        concert.name,
        star,
        concert.ticket_price,
        availability
    )
}
