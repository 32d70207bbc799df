//! Shared plumbing for the `encore-*` command-line tools
//!
//! Every tool starts the same way: logging, configuration, service, session
//! restore. Output goes to stdout in one of three formats; diagnostics go to
//! stderr through `tracing`.

use std::io::Write;
use std::str::FromStr;

use serde::Serialize;

use crate::config::Config;
use crate::error::{ApiError, EncoreError, Result};
use crate::loader::{ListState, View};
use crate::logging::LoggingConfig;
use crate::service::{EncoreService, Page};
use crate::session::BearerToken;
use crate::storage::StorageBackend;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// One human-readable block per item
    #[default]
    Text,
    /// A single JSON array
    Json,
    /// One JSON object per line
    Jsonl,
}

impl FromStr for OutputFormat {
    type Err = EncoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            "jsonl" => Ok(OutputFormat::Jsonl),
            _ => Err(EncoreError::InvalidInput(format!(
                "Invalid format '{}'. Valid formats: text, json, jsonl",
                s
            ))),
        }
    }
}

/// Options every tool accepts
#[derive(Debug, Clone, Default)]
pub struct StartOptions {
    pub verbose: bool,
    /// Keep the session in memory only
    pub ephemeral: bool,
}

/// Initialize logging, load configuration, build the service and restore
/// the persisted session
pub async fn start(options: StartOptions) -> Result<EncoreService> {
    LoggingConfig::from_env(options.verbose).init();

    let mut config = Config::load()?;
    if options.ephemeral {
        config.storage.backend = StorageBackend::Memory;
    }

    let service = EncoreService::from_config(config)?;
    let state = service.restore().await;
    tracing::debug!(authenticated = state.is_authenticated(), route = %service.route(), "Session ready");
    Ok(service)
}

/// The session token, or the "not logged in" error protected tools exit with
pub fn require_login(service: &EncoreService) -> Result<BearerToken> {
    service
        .session()
        .token()
        .ok_or_else(|| ApiError::Unauthorized("not logged in".to_string()).into())
}

/// Page to request from `--page` / `--take`; `take` defaults to `api.page_size`
pub fn page(service: &EncoreService, page: u32, take: Option<u32>) -> Result<Page> {
    let take = take.unwrap_or(service.config().api.page_size);
    if page == 0 || take == 0 {
        return Err(EncoreError::InvalidInput(
            "--page and --take must be at least 1".to_string(),
        ));
    }
    Ok(Page { page, take })
}

/// Exit status for an error bubbling out of a tool
pub fn exit_code(error: &anyhow::Error) -> i32 {
    error
        .chain()
        .find_map(|cause| {
            if let Some(e) = cause.downcast_ref::<EncoreError>() {
                return Some(e.exit_code());
            }
            cause
                .downcast_ref::<ApiError>()
                .map(|e| EncoreError::from(e.clone()).exit_code())
        })
        .unwrap_or(1)
}

/// Print `items` in `format`; `text` renders one item for text output
///
/// Text output of an empty list prints nothing.
pub fn write_items<T, W, F>(out: &mut W, items: &[T], format: OutputFormat, text: F) -> std::io::Result<()>
where
    T: Serialize,
    W: Write,
    F: Fn(&T) -> String,
{
    match format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(items)?;
            writeln!(out, "{}", json)?;
        }
        OutputFormat::Jsonl => {
            for item in items {
                let json = serde_json::to_string(item)?;
                writeln!(out, "{}", json)?;
            }
        }
        OutputFormat::Text => {
            for item in items {
                writeln!(out, "{}", text(item))?;
            }
        }
    }
    Ok(())
}

/// Print a list screen as it stands
///
/// A loaded but empty list prints `empty` in text format; json and jsonl
/// print an empty array and nothing respectively. A failed list is an
/// error, and a list still loading prints nothing.
pub fn write_list<T, W, F>(
    out: &mut W,
    state: &ListState<T>,
    format: OutputFormat,
    empty: &str,
    text: F,
) -> std::io::Result<()>
where
    T: Serialize,
    W: Write,
    F: Fn(&T) -> String,
{
    match state.view() {
        View::Items(items) => write_items(out, items, format, text),
        View::Empty if format == OutputFormat::Text => writeln!(out, "{}", empty),
        View::Empty => write_items::<T, _, _>(out, &[], format, text),
        View::Error(message) => Err(std::io::Error::new(
            std::io::ErrorKind::Other,
            format!("Couldn't load: {}", message),
        )),
        View::Spinner => Ok(()),
    }
}

/// Print one item; json and jsonl are the same for a single object
pub fn write_item<T, W, F>(out: &mut W, item: &T, format: OutputFormat, text: F) -> std::io::Result<()>
where
    T: Serialize,
    W: Write,
    F: Fn(&T) -> String,
{
    match format {
        OutputFormat::Json => writeln!(out, "{}", serde_json::to_string_pretty(item)?),
        OutputFormat::Jsonl => writeln!(out, "{}", serde_json::to_string(item)?),
        OutputFormat::Text => writeln!(out, "{}", text(item)),
    }
}
