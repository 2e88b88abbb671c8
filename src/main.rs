use anyhow::{bail, Context, Result};
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::signal;

use lobby_session::config::Settings;
use lobby_session::telemetry::init_tracing;
use lobby_session::{Message, MessageType, SessionHandle, SessionRuntime};

const USAGE: &str = "commands: view <path> | join <session> <lobby> | leave <session> <lobby> | \
start <session> <lobby> [json] | notify <session> <lobby> <json> | send <json message> | \
disconnect | state | stats | quit";

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let settings = Settings::new()?;

    init_tracing(&settings.logging)?;
    tracing::info!(
        ws_url = %settings.session.ws_url,
        transport = ?settings.session.transport,
        retry_policy = %settings.session.retry_policy,
        "Configuration loaded"
    );

    let (runtime, handle, _wire) = SessionRuntime::from_config(&settings.session);
    let runtime_handle = tokio::spawn(runtime.run());

    handle.on_message(|message: Message| {
        tracing::info!(
            message_type = %message.kind,
            session_id = %message.session_id,
            lobby_id = %message.lobby_id,
            data = %message.data,
            "Message received"
        );
    })?;

    println!("{}", USAGE);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                if line == "quit" || line == "exit" {
                    break;
                }
                if let Err(e) = run_command(&handle, line).await {
                    eprintln!("error: {:#}", e);
                }
            }
            _ = signal::ctrl_c() => {
                tracing::info!("Received Ctrl+C, shutting down");
                break;
            }
        }
    }

    if let Err(e) = handle.shutdown() {
        tracing::warn!(error = %e, "Session runtime already stopped");
    }
    if let Err(e) = runtime_handle.await {
        tracing::error!(error = %e, "Session runtime task failed");
    }

    tracing::info!("Session closed");
    Ok(())
}

async fn run_command(handle: &SessionHandle, line: &str) -> Result<()> {
    let (command, rest) = line.split_once(' ').unwrap_or((line, ""));
    let rest = rest.trim();

    match command {
        "view" => handle.navigate(rest)?,
        "join" => {
            let (session_id, lobby_id) = identities(rest)?;
            handle.connect(session_id, lobby_id)?;
        }
        "leave" => {
            let (session_id, lobby_id) = identities(rest)?;
            handle.send_message(Message::leave(session_id, lobby_id))?;
        }
        "start" => {
            let (session_id, lobby_id, data) = identities_with_data(rest)?;
            handle.send_message(Message::start_game(session_id, lobby_id, data))?;
        }
        "notify" => {
            let (session_id, lobby_id, data) = identities_with_data(rest)?;
            handle.send_message(Message::new(
                MessageType::Notification,
                session_id,
                lobby_id,
                data,
            ))?;
        }
        "send" => {
            let message: Message =
                serde_json::from_str(rest).context("message must match the wire schema")?;
            handle.send_message(message)?;
        }
        "disconnect" => handle.disconnect()?,
        "state" => println!("{}", handle.state().await?),
        "stats" => println!("{}", serde_json::to_string_pretty(&handle.stats().await?)?),
        "help" => println!("{}", USAGE),
        other => bail!("unknown command '{}'; {}", other, USAGE),
    }

    Ok(())
}

fn identities(args: &str) -> Result<(String, String)> {
    let mut parts = args.split_whitespace();
    match (parts.next(), parts.next()) {
        (Some(session_id), Some(lobby_id)) => Ok((session_id.to_string(), lobby_id.to_string())),
        _ => bail!("expected <session> <lobby>"),
    }
}

fn identities_with_data(args: &str) -> Result<(String, String, Value)> {
    let mut parts = args.splitn(3, char::is_whitespace);
    let session_id = parts.next().filter(|s| !s.is_empty());
    let lobby_id = parts.next().filter(|s| !s.is_empty());
    let (Some(session_id), Some(lobby_id)) = (session_id, lobby_id) else {
        bail!("expected <session> <lobby> [json]");
    };

    let data = match parts.next().map(str::trim).filter(|s| !s.is_empty()) {
        Some(json) => serde_json::from_str(json).context("payload must be JSON")?,
        None => Value::Null,
    };

    Ok((session_id.to_string(), lobby_id.to_string(), data))
}
