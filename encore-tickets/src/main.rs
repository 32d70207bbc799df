//! encore-tickets - List purchased tickets

use std::io;

use anyhow::{Context, Result};
use clap::Parser;
use libencore::cli::{self, OutputFormat, StartOptions};
use libencore::error::EncoreError;
use libencore::Ticket;

#[derive(Parser, Debug)]
#[command(name = "encore-tickets")]
#[command(version, about = "List purchased tickets")]
#[command(long_about = r#"List the tickets bought with the current account.

EXAMPLES:
    # First page of tickets
    encore-tickets

    # Next page, 10 per page
    encore-tickets --page 2 --take 10

    # Concert names only
    encore-tickets --format json | jq -r '.[].concert.name'

OUTPUT FORMATS:
    text  - One line per ticket with its short code (default)
    json  - JSON array
    jsonl - JSON lines, one ticket per line

EXIT CODES:
    0 - Success (including no tickets)
    1 - Network, configuration or storage error
    2 - Not logged in, or the session was rejected
    3 - Invalid input (bad page)
"#)]
struct Cli {
    /// Page of the listing (1-based)
    #[arg(long, default_value = "1", value_name = "N")]
    page: u32,

    /// Tickets per page (default: api.page_size)
    #[arg(long, value_name = "N")]
    take: Option<u32>,

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

    let screen = service.tickets();
    screen.set_page(cli::page(&service, cli.page, cli.take)?);

    let tickets = screen
        .load()
        .await
        .map_err(EncoreError::from)
        .context("Failed to load tickets")?;
    tracing::debug!(count = tickets.len(), "Tickets loaded");

    cli::write_list(&mut io::stdout().lock(), &screen.state(), format, "No tickets yet", render)?;
    Ok(())
}

fn render(ticket: &Ticket) -> String {
    format!(
        "#{} | {} | {} | {:.2}",
        ticket.short_code(),
        ticket.concert.started_at.format("%Y-%m-%d %H:%M"),
        ticket.concert.name,
        ticket.concert.ticket_price
    )
}
