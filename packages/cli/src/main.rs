//! `rdata`: riverdata command-line client.
//!
//! Provides two subcommands:
//!
//! - **`list`**: fetch a listing from a riverdata server, optionally
//!   following `next-page` cursors until the last page.
//! - **`cursor`**: decode or build page cursor tokens for debugging.

use std::process;

use clap::{Parser, Subcommand};
use reqwest::blocking::Client;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use riverdata::Cursor;
use riverdata_api::headers;
use serde_json::Value;

/// rdata: riverdata CLI
///
/// Page through listings and inspect cursor tokens.
#[derive(Parser)]
#[command(name = "rdata", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Fetch a listing and print each page body.
    ///
    /// Examples:
    ///   rdata list http://localhost:7000 /locations --query office=SWT --all
    ///   rdata list http://localhost:7000 /offices --accept text/csv
    List {
        /// Server base URL.
        #[arg(env = "RIVERDATA_URL")]
        base_url: String,

        /// Endpoint path, e.g. `/locations`.
        path: String,

        /// Accept header sent with every request.
        #[arg(long, default_value = "application/json;version=2")]
        accept: String,

        /// Requested page size.
        #[arg(long, value_name = "N")]
        page_size: Option<u32>,

        /// Keep following `next-page` until the server reports the last page.
        #[arg(long)]
        all: bool,

        /// Extra query parameter. Repeat for several: --query office=SWT --query names=K*
        #[arg(long = "query", value_name = "KEY=VALUE")]
        queries: Vec<String>,
    },

    /// Decode or build cursor tokens.
    Cursor {
        #[command(subcommand)]
        action: CursorAction,
    },
}

#[derive(Subcommand)]
enum CursorAction {
    /// Decode a token the way the server does, printing the fields as JSON.
    Decode {
        token: String,

        /// Page size the server would fall back to.
        #[arg(long, default_value_t = 500)]
        default_page_size: u32,
    },

    /// Build a token from its fields.
    Encode {
        #[arg(long)]
        offset: u64,

        #[arg(long)]
        page_size: u32,

        /// Known total; omitted means unknown (`null`).
        #[arg(long)]
        total: Option<u64>,
    },
}

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Command::List {
            base_url,
            path,
            accept,
            page_size,
            all,
            queries,
        } => {
            let mut params: Vec<(String, String)> = queries
                .iter()
                .map(|raw| parse_query(raw).unwrap_or_else(|e| fatal(&e)))
                .collect();
            if let Some(size) = page_size {
                params.push(("page-size".into(), size.to_string()));
            }
            list(&endpoint(&base_url, &path), &accept, params, all);
        }

        Command::Cursor { action } => match action {
            CursorAction::Decode {
                token,
                default_page_size,
            } => {
                let cursor = Cursor::decode(Some(&token), default_page_size);
                let fields = serde_json::json!({
                    "offset": cursor.offset,
                    "total": cursor.total,
                    "page-size": cursor.page_size,
                    "normalized": cursor.encode(),
                });
                println!(
                    "{}",
                    serde_json::to_string_pretty(&fields).unwrap_or_else(|e| fatal(&e.to_string()))
                );
            }
            CursorAction::Encode {
                offset,
                page_size,
                total,
            } => {
                if page_size == 0 {
                    fatal("--page-size must be positive");
                }
                let cursor = Cursor {
                    offset,
                    total,
                    page_size,
                };
                println!("{}", cursor.encode());
            }
        },
    }
}

/// Fetch `url`, printing each page; with `all`, follow `next-page`.
fn list(url: &str, accept: &str, params: Vec<(String, String)>, all: bool) {
    let client = Client::new();
    let mut token: Option<String> = None;

    loop {
        let mut query = params.clone();
        if let Some(token) = &token {
            query.push(("page".into(), token.clone()));
        }

        let resp = client
            .get(url)
            .header(ACCEPT, accept)
            .query(&query)
            .send()
            .unwrap_or_else(|e| fatal(&format!("request to {url} failed: {e}")));

        let status = resp.status();
        let content_type = header_text(&resp, CONTENT_TYPE.as_str());
        let next_header = header_text(&resp, headers::NEXT_PAGE);
        let body = resp
            .text()
            .unwrap_or_else(|e| fatal(&format!("failed to read response body: {e}")));

        if !status.is_success() {
            fatal(&format!("server returned {status}: {body}"));
        }
        println!("{body}");

        if !all {
            return;
        }
        match following(&next_header, &content_type, &body, token.as_deref()) {
            Some(next) => token = Some(next),
            None => return,
        }
    }
}

/// The next token to request: the `next-page` header when present, else the
/// JSON envelope's `next-page`. A repeated token ends the walk.
fn following(next_header: &str, content_type: &str, body: &str, current: Option<&str>) -> Option<String> {
    if next_header.is_empty() {
        return if is_json(content_type) {
            next_page(body, current)
        } else {
            None
        };
    }
    (Some(next_header) != current).then(|| next_header.to_string())
}

fn header_text(resp: &reqwest::blocking::Response, name: &str) -> String {
    resp.headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

fn endpoint(base_url: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// Split a `KEY=VALUE` argument.
fn parse_query(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("invalid --query {raw:?}: expected KEY=VALUE")),
    }
}

fn is_json(content_type: &str) -> bool {
    let base = content_type.split(';').next().unwrap_or_default().trim();
    base.eq_ignore_ascii_case("application/json") || base.eq_ignore_ascii_case("application/geo+json")
}

/// The token of the following page from a JSON page envelope, or `None`
/// once the listing is done.
///
/// The server omits `next-page` on the last page and echoes the request
/// token when a page comes back empty; both end the walk. Responses normally
/// carry the same token in the `next-page` header, which takes precedence.
fn next_page(body: &str, current: Option<&str>) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    let next = value.get("next-page")?.as_str()?;
    if Some(next) == current {
        return None;
    }
    Some(next.to_string())
}

/// Print an error message to stderr and exit with code 2.
fn fatal(msg: &str) -> ! {
    eprintln!("rdata: {}", msg);
    process::exit(2);
}
