use crate::types::ToolResult;

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("tool already registered: {0}")]
    Duplicate(String),
    #[error("invalid tool descriptor '{name}': {reason}")]
    InvalidDescriptor { name: String, reason: String },
    #[error("failed to load tool descriptors: {0}")]
    Load(String),
}

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("handler not registered: {name}")]
    NotRegistered { call_id: String, name: String },
    #[error("invalid arguments for {tool}: {reason}")]
    InvalidArguments {
        call_id: String,
        tool: String,
        reason: String,
    },
    #[error("malformed tool call: {0}")]
    MalformedRequest(String),
    #[error("tool call cancelled: {call_id}")]
    Cancelled { call_id: String, name: String },
}

impl DispatchError {
    /// Render the failure as an error result so the model can see what went wrong.
    /// `MalformedRequest` carries no call id and yields `None`.
    pub fn to_tool_result(&self) -> Option<ToolResult> {
        match self {
            DispatchError::NotRegistered { call_id, name } => Some(ToolResult::error(
                call_id,
                name,
                format!("unknown tool: {name}"),
            )),
            DispatchError::InvalidArguments {
                call_id,
                tool,
                reason,
            } => Some(ToolResult::error(
                call_id,
                tool,
                format!("invalid arguments: {reason}"),
            )),
            DispatchError::Cancelled { call_id, name } => {
                Some(ToolResult::error(call_id, name, "tool call cancelled"))
            }
            DispatchError::MalformedRequest(_) => None,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SendError {
    #[error("invalid recipient: {0}")]
    InvalidRecipient(String),
    #[error("delivery failed: {0}")]
    Delivery(String),
}

/// Failure reading from a calendar or mail account.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("authentication failed: {0}")]
    Auth(String),
    #[error("request failed: {0}")]
    Request(String),
}
