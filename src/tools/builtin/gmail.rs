use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::descriptor::ToolDescriptor;
use crate::error::FetchError;
use crate::tools::handler::ToolHandler;
use crate::types::ToolInvocation;

pub const GMAIL: &str = "get_gmail_emails";

/// How many of the most recent messages the tool reports.
pub const RECENT_EMAILS: usize = 3;

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MailHeader {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct MailPayload {
    #[serde(default)]
    pub headers: Vec<MailHeader>,
}

/// One message in the Gmail API `format=metadata` shape.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct MailMessage {
    #[serde(default)]
    pub snippet: String,
    #[serde(default)]
    pub payload: MailPayload,
}

impl MailMessage {
    /// First header named exactly `name`.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.payload
            .headers
            .iter()
            .find(|h| h.name == name)
            .map(|h| h.value.as_str())
    }
}

/// Reads the user's inbox.
#[async_trait]
pub trait MailSource: Send + Sync {
    /// Up to `limit` messages, newest first.
    async fn recent(&self, limit: usize) -> Result<Vec<MailMessage>, FetchError>;
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmailSummary {
    pub snippet: String,
    pub subject: String,
    pub from: String,
}

impl From<&MailMessage> for EmailSummary {
    fn from(message: &MailMessage) -> Self {
        Self {
            snippet: message.snippet.clone(),
            subject: message.header("Subject").unwrap_or("No subject").to_string(),
            from: message.header("From").unwrap_or("Unknown sender").to_string(),
        }
    }
}

/// Descriptor for [`GmailTool`]. Takes no arguments.
pub fn gmail_descriptor() -> ToolDescriptor {
    ToolDescriptor::new(GMAIL, "Get the 3 most recent emails from the user's Gmail inbox.")
        .announce("Let me check your inbox")
}

/// Lists the most recent emails as `[{snippet, subject, from}]`.
pub struct GmailTool<S> {
    source: S,
}

impl<S: MailSource> GmailTool<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }

    async fn recent(&self) -> Result<String, String> {
        info!(limit = RECENT_EMAILS, "fetching recent emails");
        let messages = self
            .source
            .recent(RECENT_EMAILS)
            .await
            .map_err(|e| e.to_string())?;
        let emails: Vec<EmailSummary> = messages
            .iter()
            .take(RECENT_EMAILS)
            .map(EmailSummary::from)
            .collect();
        info!(count = emails.len(), "emails retrieved");
        serde_json::to_string_pretty(&emails).map_err(|e| e.to_string())
    }
}

#[async_trait]
impl<S: MailSource> ToolHandler for GmailTool<S> {
    async fn call(&self, _invocation: &ToolInvocation) -> Result<String, String> {
        self.recent().await.map_err(|e| {
            error!(error = %e, "failed to get emails");
            format!("Error retrieving Gmail emails: {e}")
        })
    }
}
