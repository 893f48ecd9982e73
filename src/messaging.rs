use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use crate::error::SendError;

const WHATSAPP_PREFIX: &str = "whatsapp:";

/// A message ready to hand to a delivery service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    pub from: String,
    pub to: String,
    pub body: String,
}

impl OutboundMessage {
    /// Message between two WhatsApp numbers; both addresses get the
    /// `whatsapp:` scheme.
    pub fn whatsapp(from: &str, to: &str, body: impl Into<String>) -> Self {
        Self {
            from: whatsapp_address(from),
            to: whatsapp_address(to),
            body: body.into(),
        }
    }
}

/// Delivers outbound messages. Returns the provider's message id.
#[async_trait]
pub trait MessageSender: Send + Sync {
    async fn send(&self, message: OutboundMessage) -> Result<String, SendError>;
}

/// Lets several tools share one sender.
#[async_trait]
impl<S: MessageSender + ?Sized> MessageSender for Arc<S> {
    async fn send(&self, message: OutboundMessage) -> Result<String, SendError> {
        (**self).send(message).await
    }
}

/// Logs messages instead of delivering them.
#[derive(Default)]
pub struct LogSender {
    sent: AtomicU64,
}

impl LogSender {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MessageSender for LogSender {
    async fn send(&self, message: OutboundMessage) -> Result<String, SendError> {
        let n = self.sent.fetch_add(1, Ordering::SeqCst) + 1;
        let id = format!("log-{n}");
        info!(
            id = %id,
            from = %message.from,
            to = %message.to,
            body = %message.body,
            "outbound message"
        );
        Ok(id)
    }
}

/// Prefix a number with `whatsapp:` unless it already has it.
pub fn whatsapp_address(number: &str) -> String {
    let number = number.trim();
    if number.starts_with(WHATSAPP_PREFIX) {
        number.to_string()
    } else {
        format!("{WHATSAPP_PREFIX}{number}")
    }
}

/// Check a phone number is `+` followed by 8 to 15 digits.
pub fn validate_phone_number(number: &str) -> Result<(), SendError> {
    let digits = number
        .strip_prefix('+')
        .ok_or_else(|| SendError::InvalidRecipient(format!("{number} must start with '+'")))?;
    if !(8..=15).contains(&digits.len()) || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(SendError::InvalidRecipient(format!(
            "{number} must be a country code and number with digits only"
        )));
    }
    Ok(())
}
