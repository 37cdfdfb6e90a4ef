use std::fs;
use std::io::{self, Read};
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use futures_util::{SinkExt, StreamExt};
use protocol::{ClientMessage, ServerMessage, encode_client};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

mod agent;

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("invalid base URL: {0}")]
    InvalidBaseUrl(String),
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("websocket connect failed: {0}")]
    WsConnect(Box<tokio_tungstenite::tungstenite::Error>),
    #[error("websocket transport failed: {0}")]
    Ws(Box<tokio_tungstenite::tungstenite::Error>),
    #[error("websocket closed")]
    WsClosed,
    #[error("message decode failed: {0}")]
    Decode(#[from] protocol::CodecError),
    #[error("timed out waiting for websocket message")]
    Timeout,
    #[error("server rejected request [{code}]: {message}")]
    Rejected { code: String, message: String },
    #[error("failed to read input: {0}")]
    Io(#[from] io::Error),
}

#[derive(Parser, Debug)]
#[command(name = "syncpad-cli", about = "Syncpad document sync CLI")]
struct Cli {
    /// Server base URL.
    #[arg(long, env = "SYNCPAD_BASE_URL", default_value = "http://127.0.0.1:8000")]
    base_url: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Check server health.
    Ping,
    /// Join the document and mirror every snapshot to stdout. Reconnects
    /// forever on transport drops.
    Watch(WatchArgs),
    /// Join, apply one content change, and wait for the echoed snapshot.
    Edit(EditArgs),
}

#[derive(Args, Debug)]
struct WatchArgs {
    /// Name to join as.
    #[arg(long)]
    username: String,

    /// Reconnect backoff ceiling in milliseconds.
    #[arg(long, default_value_t = agent::DEFAULT_MAX_BACKOFF_MS)]
    max_backoff_ms: u64,
}

#[derive(Args, Debug)]
struct EditArgs {
    /// Name to join as.
    #[arg(long)]
    username: String,

    /// Input file path, or - for stdin.
    #[arg(long, default_value = "-")]
    input: String,
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    let cli = Cli::parse();
    match cli.command {
        Command::Ping => run_ping(&cli.base_url).await,
        Command::Watch(args) => run_watch(&cli.base_url, args).await,
        Command::Edit(args) => run_edit(&cli.base_url, args).await,
    }
}

async fn run_ping(base_url: &str) -> Result<(), CliError> {
    let client = reqwest::Client::new();
    let url = format!("{}/healthz", base_url.trim_end_matches('/'));
    let response = client.get(url).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(CliError::Rejected {
            code: format!("HTTP {}", status.as_u16()),
            message: "health check failed".to_owned(),
        });
    }
    println!("ok");
    Ok(())
}

async fn run_watch(base_url: &str, args: WatchArgs) -> Result<(), CliError> {
    let url = ws_url(base_url)?;
    let options = agent::AgentOptions {
        username: args.username,
        max_backoff_ms: args.max_backoff_ms,
    };
    agent::run(&url, &options, |mirror| {
        println!(
            "{}",
            serde_json::to_string_pretty(&mirror.snapshot()).unwrap_or_default()
        );
    })
    .await
}

async fn run_edit(base_url: &str, args: EditArgs) -> Result<(), CliError> {
    let content = read_input(&args.input)?;
    let url = ws_url(base_url)?;

    let (mut ws, _) = connect_async(&url)
        .await
        .map_err(|e| CliError::WsConnect(Box::new(e)))?;

    let join = ClientMessage::UserEvent { username: args.username.clone() };
    ws.send(Message::Text(encode_client(&join).into()))
        .await
        .map_err(|e| CliError::Ws(Box::new(e)))?;

    // Wait for our presence to land before editing.
    loop {
        match next_server_message(&mut ws).await? {
            ServerMessage::Snapshot { data } if data.users.contains_key(&args.username) => break,
            ServerMessage::Snapshot { .. } => {}
            ServerMessage::Error { data } => {
                return Err(CliError::Rejected { code: data.code, message: data.message });
            }
        }
    }

    let edit = ClientMessage::ContentChange { content: content.clone() };
    ws.send(Message::Text(encode_client(&edit).into()))
        .await
        .map_err(|e| CliError::Ws(Box::new(e)))?;

    // Converged once the broadcast echoes our payload back.
    loop {
        match next_server_message(&mut ws).await? {
            ServerMessage::Snapshot { data } if data.editor_content == content => break,
            ServerMessage::Snapshot { .. } => {}
            ServerMessage::Error { data } => {
                return Err(CliError::Rejected { code: data.code, message: data.message });
            }
        }
    }

    ws.close(None).await.map_err(|e| CliError::Ws(Box::new(e)))?;
    println!("ok");
    Ok(())
}

async fn next_server_message(ws: &mut agent::WsStream) -> Result<ServerMessage, CliError> {
    loop {
        let msg = tokio::time::timeout(Duration::from_secs(5), ws.next())
            .await
            .map_err(|_| CliError::Timeout)?
            .ok_or(CliError::WsClosed)?
            .map_err(|e| CliError::Ws(Box::new(e)))?;
        match msg {
            Message::Text(text) => return Ok(protocol::decode_server(text.as_str())?),
            Message::Close(_) => return Err(CliError::WsClosed),
            _ => {}
        }
    }
}

fn ws_url(base_url: &str) -> Result<String, CliError> {
    let trimmed = base_url.trim_end_matches('/');
    if let Some(rest) = trimmed.strip_prefix("https://") {
        Ok(format!("wss://{rest}/ws"))
    } else if let Some(rest) = trimmed.strip_prefix("http://") {
        Ok(format!("ws://{rest}/ws"))
    } else {
        Err(CliError::InvalidBaseUrl(base_url.to_owned()))
    }
}

fn read_input(path: &str) -> Result<String, CliError> {
    if path == "-" {
        let mut buf = String::new();
        io::stdin().read_to_string(&mut buf)?;
        Ok(buf)
    } else {
        Ok(fs::read_to_string(path)?)
    }
}
