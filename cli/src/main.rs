use std::io::{self, BufRead, Write};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use clap::{Args, Parser, Subcommand};
use futures_util::{SinkExt, StreamExt};
use rand::seq::IndexedRandom;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use uuid::Uuid;

type WsStream = tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

const WELCOME_MESSAGES: [&str; 4] = [
    "AI Social Media Manager at your service!",
    "Ready to boost your social media presence!",
    "Your AI-powered social media assistant is here!",
    "Let's create some amazing content together!",
];

const EXAMPLES: [&str; 4] = [
    "Create a post about our new product launch",
    "Show me analytics for last month",
    "Help me respond to this customer complaint",
    "Plan a content strategy for Instagram",
];

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("invalid base URL: {0}")]
    InvalidBaseUrl(String),
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("websocket connect failed: {0}")]
    WsConnect(Box<tokio_tungstenite::tungstenite::Error>),
    #[error("websocket closed")]
    WsClosed,
    #[error("timed out waiting for websocket frame")]
    Timeout,
    #[error("server returned error for {syscall}: {message}")]
    ServerError { syscall: String, message: String },
    #[error("invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("terminal i/o failed: {0}")]
    Io(#[from] io::Error),
}

#[derive(Parser, Debug)]
#[command(name = "social-cli", about = "AI social media manager API and websocket CLI")]
struct Cli {
    #[arg(long, env = "SOCIAL_BASE_URL", default_value = "http://127.0.0.1:8000")]
    base_url: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    Ping,
    /// Send one chat message and print the reply.
    Chat(ChatArgs),
    /// Interactive chat session.
    Repl {
        #[arg(long)]
        session_id: Option<String>,
    },
    /// Answer a run waiting for human review.
    Review {
        session_id: String,
        #[arg(value_parser = ["approve", "revise", "reject"])]
        action: String,
        #[arg(long)]
        notes: Option<String>,
    },
    Posts(PostsCommand),
    Dashboard,
    /// Send a chat message over the websocket and print progress events.
    Stream(ChatArgs),
}

#[derive(Args, Debug)]
struct ChatArgs {
    message: String,
    #[arg(long)]
    session_id: Option<String>,
}

#[derive(Args, Debug)]
struct PostsCommand {
    #[command(subcommand)]
    command: PostsSubcommand,
}

#[derive(Subcommand, Debug)]
enum PostsSubcommand {
    List {
        #[arg(long)]
        status: Option<String>,
    },
    Create {
        #[arg(long)]
        content: String,
        #[arg(long, default_value = "instagram")]
        platform: String,
        /// RFC 3339 timestamp.
        #[arg(long)]
        at: String,
        #[arg(long)]
        image_url: Option<String>,
    },
    Delete {
        post_id: Uuid,
    },
}

/// Wire frame, mirrored from the server's JSON websocket protocol.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct Frame {
    id: Uuid,
    #[serde(default)]
    parent_id: Option<Uuid>,
    #[serde(default)]
    ts: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    session_id: Option<String>,
    syscall: String,
    status: Status,
    #[serde(default)]
    data: Map<String, Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
enum Status {
    Request,
    Item,
    Done,
    Error,
    Cancel,
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    let cli = Cli::parse();
    let base = cli.base_url.trim_end_matches('/').to_owned();

    match cli.command {
        Command::Ping => run_ping(&base).await,
        Command::Chat(args) => {
            let reply = send_chat(&base, &args.message, args.session_id.as_deref()).await?;
            print_reply(&reply);
            Ok(())
        }
        Command::Repl { session_id } => run_repl(&base, session_id).await,
        Command::Review { session_id, action, notes } => {
            let reply = send_review(&base, &session_id, &action, notes.as_deref()).await?;
            print_reply(&reply);
            Ok(())
        }
        Command::Posts(posts) => run_posts(&base, posts).await,
        Command::Dashboard => {
            let json = api_request(&base, reqwest::Method::GET, "/dashboard/data", None).await?;
            print_json(&json)
        }
        Command::Stream(args) => run_stream(&base, &args.message, args.session_id.as_deref()).await,
    }
}

async fn run_ping(base: &str) -> Result<(), CliError> {
    let json = api_request(base, reqwest::Method::GET, "/health", None).await?;
    println!("{}", json.get("status").and_then(Value::as_str).unwrap_or("ok"));
    Ok(())
}

// =============================================================================
// CHAT
// =============================================================================

async fn send_chat(base: &str, message: &str, session_id: Option<&str>) -> Result<Value, CliError> {
    let mut body = serde_json::json!({ "message": message });
    if let Some(session_id) = session_id {
        body["session_id"] = Value::String(session_id.to_owned());
    }
    api_request(base, reqwest::Method::POST, "/chat", Some(body)).await
}

async fn send_review(base: &str, session_id: &str, action: &str, notes: Option<&str>) -> Result<Value, CliError> {
    let body = serde_json::json!({ "session_id": session_id, "action": action, "notes": notes });
    api_request(base, reqwest::Method::POST, "/chat/review", Some(body)).await
}

fn print_reply(reply: &Value) {
    let text = reply
        .get("final_response")
        .and_then(Value::as_str)
        .unwrap_or("(no response)");
    println!("{text}");
    if let Some(reason) = reply.get("review_reason").and_then(Value::as_str) {
        println!("\n[awaiting review] {reason}");
    }
}

fn prompt(label: &str) -> Result<Option<String>, CliError> {
    print!("{label}");
    io::stdout().flush()?;
    let mut line = String::new();
    if io::stdin().lock().read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim().to_owned()))
}

async fn run_repl(base: &str, session_id: Option<String>) -> Result<(), CliError> {
    let welcome = WELCOME_MESSAGES.choose(&mut rand::rng()).copied().unwrap_or(WELCOME_MESSAGES[0]);
    println!("{}\n  {welcome}\n{}", "=".repeat(60), "=".repeat(60));
    println!("\nTry for example:");
    for example in EXAMPLES {
        println!("  - {example}");
    }
    println!("\nType 'exit' or 'quit' to end the session.\n");

    let mut session_id = session_id;
    loop {
        let Some(input) = prompt("you> ")? else { break };
        if input.is_empty() {
            continue;
        }
        if matches!(input.to_lowercase().as_str(), "exit" | "quit") {
            println!("Thanks for using AI Social Media Manager!");
            break;
        }

        let mut reply = match send_chat(base, &input, session_id.as_deref()).await {
            Ok(reply) => reply,
            Err(e) => {
                eprintln!("error: {e}");
                continue;
            }
        };
        if session_id.is_none() {
            session_id = reply.get("session_id").and_then(Value::as_str).map(ToOwned::to_owned);
        }
        print_reply(&reply);

        while reply.get("status").and_then(Value::as_str) == Some("awaiting_review") {
            let Some(answer) = prompt("review (a)pprove / (r)evise / (x) reject> ")? else { return Ok(()) };
            let action = match answer.as_str() {
                "a" | "approve" | "y" => "approve",
                "r" | "revise" => "revise",
                "x" | "reject" | "n" => "reject",
                _ => continue,
            };
            let notes = if action == "approve" { None } else { prompt("notes> ")? };
            let Some(sid) = session_id.as_deref() else { break };
            reply = send_review(base, sid, action, notes.as_deref().filter(|n| !n.is_empty())).await?;
            print_reply(&reply);
        }
    }
    Ok(())
}

// =============================================================================
// POSTS
// =============================================================================

async fn run_posts(base: &str, posts: PostsCommand) -> Result<(), CliError> {
    let json = match posts.command {
        PostsSubcommand::List { status } => {
            let path = match status {
                Some(status) => format!("/api/scheduled-posts?status={status}"),
                None => "/api/scheduled-posts".to_owned(),
            };
            api_request(base, reqwest::Method::GET, &path, None).await?
        }
        PostsSubcommand::Create { content, platform, at, image_url } => {
            let body = serde_json::json!({
                "content": content,
                "platform": platform,
                "scheduled_time": at,
                "image_url": image_url,
            });
            api_request(base, reqwest::Method::POST, "/api/scheduled-posts", Some(body)).await?
        }
        PostsSubcommand::Delete { post_id } => {
            let path = format!("/api/scheduled-posts/{post_id}");
            api_request(base, reqwest::Method::DELETE, &path, None).await?
        }
    };
    print_json(&json)
}

// =============================================================================
// STREAM
// =============================================================================

async fn run_stream(base: &str, message: &str, session_id: Option<&str>) -> Result<(), CliError> {
    let (mut stream, _) = connect_async(ws_url(base)?)
        .await
        .map_err(|error| CliError::WsConnect(Box::new(error)))?;

    wait_for_session_connected(&mut stream).await?;

    let mut data = Map::new();
    data.insert("message".to_owned(), Value::String(message.to_owned()));
    if let Some(session_id) = session_id {
        data.insert("session_id".to_owned(), Value::String(session_id.to_owned()));
    }
    let req = request_frame("chat:send", data);
    let text = serde_json::to_string(&req)?;
    stream
        .send(Message::Text(text.into()))
        .await
        .map_err(|error| CliError::WsConnect(Box::new(error)))?;

    loop {
        let frame = recv_next(&mut stream, Duration::from_secs(120)).await?;
        if frame.parent_id != Some(req.id) {
            continue;
        }
        match frame.status {
            Status::Item => println!("{}", describe_event(&frame.data)),
            Status::Done => {
                print_reply(&Value::Object(frame.data));
                return Ok(());
            }
            Status::Error | Status::Cancel => {
                return Err(CliError::ServerError {
                    syscall: frame.syscall,
                    message: frame
                        .data
                        .get("message")
                        .and_then(Value::as_str)
                        .unwrap_or("unknown websocket error")
                        .to_owned(),
                });
            }
            Status::Request => {}
        }
    }
}

/// One line per workflow event.
fn describe_event(data: &Map<String, Value>) -> String {
    let field = |key: &str| data.get(key).and_then(Value::as_str).unwrap_or("-");
    match field("event") {
        "node_entered" => format!("  > {}", field("node")),
        "agent_started" => format!("  * {} working", field("agent")),
        "agent_completed" => format!("  + {} {}", field("agent"), field("action")),
        "agent_failed" => format!("  ! {} failed: {} ({})", field("agent"), field("message"), field("code")),
        "interrupted" => format!("  ? review needed: {}", field("reason")),
        "completed" => format!("  = {}", field("status")),
        other => format!("  {other}"),
    }
}

fn ws_url(base_url: &str) -> Result<String, CliError> {
    if let Some(rest) = base_url.strip_prefix("http://") {
        return Ok(format!("ws://{rest}/ws"));
    }
    if let Some(rest) = base_url.strip_prefix("https://") {
        return Ok(format!("wss://{rest}/ws"));
    }

    Err(CliError::InvalidBaseUrl(base_url.to_owned()))
}

async fn wait_for_session_connected(stream: &mut WsStream) -> Result<(), CliError> {
    loop {
        let frame = recv_next(stream, Duration::from_secs(5)).await?;
        if frame.syscall == "session:connected" {
            return Ok(());
        }
    }
}

async fn recv_next(stream: &mut WsStream, timeout: Duration) -> Result<Frame, CliError> {
    let fut = async {
        loop {
            let Some(message) = stream.next().await else {
                return Err(CliError::WsClosed);
            };
            match message.map_err(|error| CliError::WsConnect(Box::new(error)))? {
                Message::Text(text) => return serde_json::from_str(text.as_str()).map_err(CliError::from),
                Message::Close(_) => return Err(CliError::WsClosed),
                _ => {}
            }
        }
    };

    tokio::time::timeout(timeout, fut)
        .await
        .map_err(|_| CliError::Timeout)?
}

fn request_frame(syscall: &str, data: Map<String, Value>) -> Frame {
    Frame {
        id: Uuid::new_v4(),
        parent_id: None,
        ts: now_ms(),
        session_id: None,
        syscall: syscall.to_owned(),
        status: Status::Request,
        data,
    }
}

fn now_ms() -> i64 {
    let Ok(duration) = SystemTime::now().duration_since(UNIX_EPOCH) else {
        return 0;
    };
    i64::try_from(duration.as_millis()).unwrap_or(0)
}

// =============================================================================
// HTTP
// =============================================================================

async fn api_request(base: &str, method: reqwest::Method, path: &str, body: Option<Value>) -> Result<Value, CliError> {
    let client = reqwest::Client::new();
    let url = format!("{base}{path}");

    let request = client.request(method, &url);
    let request = if let Some(json) = body { request.json(&json) } else { request };

    let response = request.send().await?;
    let status = response.status();
    let value = response.json::<Value>().await.unwrap_or(Value::Null);

    if !status.is_success() {
        let message = value
            .get("detail")
            .and_then(Value::as_str)
            .map_or_else(|| value.to_string(), ToOwned::to_owned);
        return Err(CliError::ServerError { syscall: format!("HTTP {}", status.as_u16()), message });
    }

    Ok(value)
}

fn print_json(value: &Value) -> Result<(), CliError> {
    let rendered = serde_json::to_string_pretty(value)?;
    println!("{rendered}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ws_url_follows_scheme() {
        assert_eq!(ws_url("http://localhost:8000").unwrap(), "ws://localhost:8000/ws");
        assert_eq!(ws_url("https://social.example").unwrap(), "wss://social.example/ws");
        assert!(matches!(ws_url("localhost:8000"), Err(CliError::InvalidBaseUrl(_))));
    }

    #[test]
    fn request_frames_serialize_for_the_server() {
        let frame = request_frame("chat:send", Map::new());
        let value = serde_json::to_value(&frame).unwrap();
        assert_eq!(value["status"], "request");
        assert_eq!(value["syscall"], "chat:send");
        assert!(value.get("session_id").is_none());
    }

    #[test]
    fn events_render_one_line() {
        let data: Map<String, Value> =
            serde_json::from_value(serde_json::json!({"event": "agent_completed", "agent": "content", "action": "content_created"}))
                .unwrap();
        assert_eq!(describe_event(&data), "  + content content_created");
        let data: Map<String, Value> = serde_json::from_value(serde_json::json!({"event": "interrupted", "reason": "crisis"})).unwrap();
        assert_eq!(describe_event(&data), "  ? review needed: crisis");
    }
}
