use async_trait::async_trait;
use serde::Deserialize;
use tracing::info;

use crate::descriptor::{ParameterSpec, ToolDescriptor};
use crate::messaging::{validate_phone_number, MessageSender, OutboundMessage};
use crate::tools::handler::ToolHandler;
use crate::types::ToolInvocation;

/// Sends an order confirmation to the number the customer gave.
///
/// Registered as [`ORDER_CONFIRMATION`]. The model is expected to call it
/// once both the order and the phone number have been confirmed.
pub struct OrderConfirmationTool<S> {
    sender: S,
    from_number: String,
}

#[derive(Deserialize)]
struct OrderArgs {
    order_summary: String,
    phone_number: String,
}

pub const ORDER_CONFIRMATION: &str = "send_whatsapp_message";
pub const REMINDER: &str = "send_whatsapp_reminder";

/// Descriptor for [`OrderConfirmationTool`].
pub fn order_confirmation_descriptor() -> ToolDescriptor {
    ToolDescriptor::new(
        ORDER_CONFIRMATION,
        "Send an order confirmation message to the customer via WhatsApp. Call this function when the user confirms their order and is ready to proceed.",
    )
    .required_param(
        "order_summary",
        ParameterSpec::string("A detailed summary of the customer's complete order including all items, quantities, and any special instructions."),
    )
    .required_param(
        "phone_number",
        ParameterSpec::string("The customer's phone number, including the country code, formatted with only digits and a plus sign (e.g., +16507303690). No spaces, parentheses, or dashes."),
    )
}

/// Descriptor for [`ReminderTool`].
pub fn reminder_descriptor() -> ToolDescriptor {
    ToolDescriptor::new(REMINDER, "Send a reminder message to the user's WhatsApp.")
        .required_param("reminder_text", ParameterSpec::string("The reminder text to send."))
        .announce("Sending that to your WhatsApp")
}

impl<S: MessageSender> OrderConfirmationTool<S> {
    pub fn new(sender: S, from_number: impl Into<String>) -> Self {
        Self {
            sender,
            from_number: from_number.into(),
        }
    }

    fn body(order_summary: &str) -> String {
        format!(
            "📦 Order Confirmed!\n\nYour order:\n{order_summary}\n\nThank you for your order! We'll send you updates shortly."
        )
    }

    async fn send(&self, args: &OrderArgs) -> Result<String, String> {
        validate_phone_number(&args.phone_number).map_err(|e| e.to_string())?;
        let message = OutboundMessage::whatsapp(
            &self.from_number,
            &args.phone_number,
            Self::body(&args.order_summary),
        );
        let id = self.sender.send(message).await.map_err(|e| e.to_string())?;
        info!(id = %id, to = %args.phone_number, "order confirmation sent");
        Ok(format!(
            "Order confirmation sent to WhatsApp number {} successfully! Order: {}",
            args.phone_number, args.order_summary
        ))
    }
}

#[async_trait]
impl<S: MessageSender> ToolHandler for OrderConfirmationTool<S> {
    async fn call(&self, invocation: &ToolInvocation) -> Result<String, String> {
        let sent = match invocation.parse::<OrderArgs>() {
            Ok(args) => self.send(&args).await,
            Err(e) => Err(e),
        };
        sent.map_err(|e| format!("Error sending WhatsApp message: {e}"))
    }
}

/// Sends a reminder to a fixed recipient. Registered as [`REMINDER`].
pub struct ReminderTool<S> {
    sender: S,
    from_number: String,
    recipient: String,
}

#[derive(Deserialize)]
struct ReminderArgs {
    reminder_text: String,
}

impl<S: MessageSender> ReminderTool<S> {
    pub fn new(sender: S, from_number: impl Into<String>, recipient: impl Into<String>) -> Self {
        Self {
            sender,
            from_number: from_number.into(),
            recipient: recipient.into(),
        }
    }
}

#[async_trait]
impl<S: MessageSender> ToolHandler for ReminderTool<S> {
    async fn call(&self, invocation: &ToolInvocation) -> Result<String, String> {
        let args: ReminderArgs = invocation
            .parse()
            .map_err(|e| format!("Error sending WhatsApp reminder: {e}"))?;
        let message = OutboundMessage::whatsapp(&self.from_number, &self.recipient, args.reminder_text);
        match self.sender.send(message).await {
            Ok(id) => {
                info!(id = %id, "reminder sent");
                Ok("Reminder sent to WhatsApp successfully!".into())
            }
            Err(e) => Err(format!("Error sending WhatsApp reminder: {e}")),
        }
    }
}
