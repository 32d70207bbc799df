//! encore-feed - Latest posts

use std::io;

use anyhow::{Context, Result};
use clap::Parser;
use libencore::cli::{self, OutputFormat, StartOptions};
use libencore::error::EncoreError;
use libencore::Post;

#[derive(Parser, Debug)]
#[command(name = "encore-feed")]
#[command(version, about = "Show the latest posts")]
#[command(long_about = r#"Show the latest posts from the Encore home feed.

EXAMPLES:
    # Latest posts
    encore-feed

    # Older posts
    encore-feed --page 2

    # Post texts only
    encore-feed --format jsonl | jq -r '.text // .title'

OUTPUT FORMATS:
    text  - Timestamp and text, one post per line (default)
    json  - JSON array
    jsonl - JSON lines, one post per line

EXIT CODES:
    0 - Success (an empty feed prints "No posts found")
    1 - Network, configuration or storage error
    2 - Not logged in, or the session was rejected
    3 - Invalid input (bad page)
"#)]
struct Cli {
    /// Page of the feed (1-based)
    #[arg(long, default_value = "1", value_name = "N")]
    page: u32,

    /// Posts per page (default: api.page_size)
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

    let screen = service.posts();
    screen.set_page(cli::page(&service, cli.page, cli.take)?);

    screen
        .load()
        .await
        .map_err(EncoreError::from)
        .context("Failed to load posts")?;

    cli::write_list(&mut io::stdout().lock(), &screen.state(), format, "No posts found", render)?;
    Ok(())
}

fn render(post: &Post) -> String {
    // Single line per post
    let text = post.body().replace('\n', " ");
    let preview = if text.chars().count() > 80 {
        format!("{}...", text.chars().take(80).collect::<String>())
    } else {
        text
    };
    format!("{} | {}", post.created_at.format("%Y-%m-%d %H:%M"), preview)
}
