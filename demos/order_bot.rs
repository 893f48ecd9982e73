//! Order-taking tool harness for tool-dispatch.
//!
//! Reads tool calls as JSON, one per line, from stdin and dispatches them to
//! the built-in tools. Each line is either a single tool call
//! (`{"id": ..., "function": {"name": ..., "arguments": "..."}}`) or a whole
//! OpenAI assistant message carrying `tool_calls`. Tool replies are printed
//! to stdout as OpenAI `tool` messages.
//!
//! Usage:
//!   cargo run --example order_bot -- --list-tools
//!   TWILIO_WHATSAPP_NUMBER=+14155238886 RECIPIENT_NUMBER=+16507303690 cargo run --example order_bot
//!   RUST_LOG=info cargo run --example order_bot -- --tools-file tools.json
//!   cargo run --example order_bot -- --calendar-file events.json --inbox-file inbox.json
//!
//! Messages are logged, not delivered. Calendar and inbox tools are only
//! registered when a fixture file is given.

use std::io::{self, BufRead};
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use clap::Parser;
use serde_json::Value;
use tool_dispatch::tools::builtin::{
    calendar_descriptor, gmail_descriptor, order_confirmation_descriptor, reminder_descriptor,
    CalendarEvent, MailMessage,
};
use tool_dispatch::{
    load_descriptors, CalendarSource, CalendarTool, DispatchEvent, DispatcherConfig, FetchError,
    GmailTool, LogSender, MailSource, NoCallback, OrderConfirmationTool, ReminderTool,
    ResultCallback, ToolCallRequest, ToolDispatcher, ToolRegistry,
};

#[derive(Parser)]
#[command(name = "order_bot", about = "Dispatch LLM tool calls to the order bot's tools")]
struct Cli {
    /// WhatsApp sender number
    #[arg(long, env = "TWILIO_WHATSAPP_NUMBER", default_value = "+14155238886")]
    from_number: String,

    /// Fixed recipient for reminders
    #[arg(long, env = "RECIPIENT_NUMBER", default_value = "+16507303690")]
    recipient: String,

    /// Abort a handler after this many milliseconds
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Skip type and enum checks on arguments
    #[arg(long)]
    no_type_check: bool,

    /// Replace built-in tool descriptions with those from a JSON file
    #[arg(long)]
    tools_file: Option<PathBuf>,

    /// Serve get_calendar_events from a JSON array of Calendar API events
    #[arg(long)]
    calendar_file: Option<PathBuf>,

    /// Serve get_gmail_emails from a JSON array of Gmail API messages
    #[arg(long)]
    inbox_file: Option<PathBuf>,

    /// Print the advertised tools in OpenAI shape and exit
    #[arg(long)]
    list_tools: bool,
}

/// Calendar and inbox contents read from a JSON file on every call.
struct JsonFixture(PathBuf);

impl JsonFixture {
    async fn read<T: serde::de::DeserializeOwned>(&self) -> Result<T, FetchError> {
        let text = tokio::fs::read_to_string(&self.0)
            .await
            .map_err(|e| FetchError::Request(format!("{}: {e}", self.0.display())))?;
        serde_json::from_str(&text).map_err(|e| FetchError::Request(e.to_string()))
    }
}

#[async_trait]
impl CalendarSource for JsonFixture {
    async fn events_between(
        &self,
        _start: DateTime<Utc>,
        _end: DateTime<Utc>,
    ) -> Result<Vec<CalendarEvent>, FetchError> {
        self.read().await
    }
}

#[async_trait]
impl MailSource for JsonFixture {
    async fn recent(&self, limit: usize) -> Result<Vec<MailMessage>, FetchError> {
        let mut messages: Vec<MailMessage> = self.read().await?;
        messages.truncate(limit);
        Ok(messages)
    }
}

async fn build_dispatcher(cli: &Cli) -> Result<ToolDispatcher, Box<dyn std::error::Error>> {
    let mut order = order_confirmation_descriptor();
    let mut reminder = reminder_descriptor();
    if let Some(ref path) = cli.tools_file {
        for descriptor in load_descriptors(path).await? {
            if descriptor.name == order.name {
                order = descriptor;
            } else if descriptor.name == reminder.name {
                reminder = descriptor;
            } else {
                eprintln!("warning: no handler for '{}', ignoring", descriptor.name);
            }
        }
    }

    let sender = Arc::new(LogSender::new());
    let mut registry = ToolRegistry::new()
        .with_tool(order, OrderConfirmationTool::new(sender.clone(), &cli.from_number))?
        .with_tool(
            reminder,
            ReminderTool::new(sender, &cli.from_number, &cli.recipient),
        )?;
    if let Some(ref path) = cli.calendar_file {
        let source = JsonFixture(path.clone());
        registry.register_tool(calendar_descriptor(), CalendarTool::new(source))?;
    }
    if let Some(ref path) = cli.inbox_file {
        let source = JsonFixture(path.clone());
        registry.register_tool(gmail_descriptor(), GmailTool::new(source))?;
    }

    let config = DispatcherConfig {
        check_types: !cli.no_type_check,
        handler_timeout_ms: cli.timeout_ms,
    };
    Ok(ToolDispatcher::new(registry).with_config(config))
}

fn parse_line(line: &str) -> Result<Vec<ToolCallRequest>, String> {
    let value: Value = serde_json::from_str(line).map_err(|e| e.to_string())?;
    if value.get("tool_calls").is_some() {
        return ToolCallRequest::from_assistant_message(&value).map_err(|e| e.to_string());
    }
    serde_json::from_value(value)
        .map(|request| vec![request])
        .map_err(|e| e.to_string())
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with_target(false)
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let dispatcher = match build_dispatcher(&cli).await {
        Ok(d) => d,
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(1);
        }
    };

    if cli.list_tools {
        let tools = Value::Array(dispatcher.schemas_openai());
        println!("{}", serde_json::to_string_pretty(&tools).unwrap_or_default());
        return;
    }

    let (etx, mut erx) = tokio::sync::mpsc::channel::<DispatchEvent>(64);
    let dispatcher = Arc::new(dispatcher.with_events(etx));

    // Print announcements and progress as they arrive
    let printer = tokio::spawn(async move {
        while let Some(event) = erx.recv().await {
            match event {
                DispatchEvent::Announce { text, .. } => {
                    eprintln!("\x1b[1;32mbot>\x1b[0m {text}");
                }
                DispatchEvent::CallStarted { name, .. } => {
                    eprintln!("\x1b[33m  [tool: {name}]\x1b[0m");
                }
                DispatchEvent::NotRegistered { name, .. } => {
                    eprintln!("\x1b[1;31m  [not registered: {name}]\x1b[0m");
                }
                DispatchEvent::InvalidArguments { name, reason, .. } => {
                    eprintln!("\x1b[1;31m  [invalid arguments: {name}]\x1b[0m {reason}");
                }
                _ => {}
            }
        }
    });

    // Replies are printed from the batch's in-order return value.
    let callback: Arc<dyn ResultCallback> = Arc::new(NoCallback);

    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        let Ok(line) = line else { break };
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let requests = match parse_line(trimmed) {
            Ok(requests) => requests,
            Err(e) => {
                eprintln!("\x1b[1;31merror:\x1b[0m {e}");
                continue;
            }
        };

        for outcome in dispatcher.dispatch_all(requests, callback.clone()).await {
            // Rejected calls get a reply too.
            let reply = match outcome {
                Ok(result) => Some(result),
                Err(e) => e.to_tool_result(),
            };
            if let Some(result) = reply {
                println!("{}", result.to_openai_message());
            }
        }
    }

    drop(dispatcher);
    printer.await.ok();
}
