pub mod config;
pub mod descriptor;
pub mod error;
pub mod events;
pub mod messaging;
pub mod tools;
pub mod types;

pub use config::{DispatcherConfig, DuplicatePolicy};
pub use descriptor::{load_descriptors, ParamType, ParameterSpec, ToolDescriptor};
pub use error::{DispatchError, FetchError, RegistryError, SendError};
pub use events::DispatchEvent;
pub use messaging::{LogSender, MessageSender, OutboundMessage};
pub use tools::builtin::{
    CalendarSource, CalendarTool, GmailTool, MailSource, OrderConfirmationTool, ReminderTool,
};
pub use tools::{
    callback_fn, handler_fn, NoCallback, ResultCallback, ToolDispatcher, ToolHandler,
    ToolRegistry,
};
pub use types::{FunctionCall, ToolCallRequest, ToolInvocation, ToolResult};

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};
    use tokio::sync::mpsc;

    // --- Recording Tool ---

    /// Records every invocation it receives, keyed by tool name.
    #[derive(Clone, Default)]
    struct Recorder {
        calls: Arc<Mutex<HashMap<String, Vec<ToolInvocation>>>>,
    }

    impl Recorder {
        fn count(&self, name: &str) -> usize {
            self.calls
                .lock()
                .unwrap()
                .get(name)
                .map_or(0, Vec::len)
        }
    }

    #[async_trait]
    impl ToolHandler for Recorder {
        async fn call(&self, invocation: &ToolInvocation) -> Result<String, String> {
            self.calls
                .lock()
                .unwrap()
                .entry(invocation.name.clone())
                .or_default()
                .push(invocation.clone());
            Ok(format!("{} ok", invocation.name))
        }
    }

    // --- Helpers ---

    const NAMES: [&str; 4] = [
        "send_whatsapp_message",
        "get_calendar_events",
        "get_gmail_emails",
        "send_whatsapp_reminder",
    ];

    fn recording_dispatcher(recorder: &Recorder) -> ToolDispatcher {
        let mut registry = ToolRegistry::new();
        for name in NAMES {
            registry
                .register_tool(ToolDescriptor::new(name, format!("{name} tool")), recorder.clone())
                .unwrap();
        }
        ToolDispatcher::new(registry)
    }

    // --- Tests ---

    #[tokio::test]
    async fn each_registered_tool_invoked_exactly_once() {
        let recorder = Recorder::default();
        let dispatcher = recording_dispatcher(&recorder);
        let (tx, mut rx) = mpsc::channel::<ToolResult>(8);

        for (i, name) in NAMES.iter().enumerate() {
            let request = ToolCallRequest::new(format!("call_{i}"), *name, "{}");
            dispatcher.dispatch(&request, &tx).await.unwrap();
        }

        for name in NAMES {
            assert_eq!(recorder.count(name), 1, "{name}");
        }
        for (i, name) in NAMES.iter().enumerate() {
            let result = rx.recv().await.unwrap();
            assert_eq!(result.call_id, format!("call_{i}"));
            assert_eq!(result.content, format!("{name} ok"));
        }
    }

    #[tokio::test]
    async fn unregistered_names_invoke_nothing() {
        let recorder = Recorder::default();
        let dispatcher = recording_dispatcher(&recorder);

        for name in ["unknown_tool", "send_whatsapp", "SEND_WHATSAPP_MESSAGE", ""] {
            let err = dispatcher
                .dispatch(&ToolCallRequest::new("c", name, "{}"), &NoCallback)
                .await
                .unwrap_err();
            assert!(matches!(err, DispatchError::NotRegistered { .. }));
        }
        for name in NAMES {
            assert_eq!(recorder.count(name), 0);
        }
    }

    #[tokio::test]
    async fn order_confirmation_round_trip_through_openai_message() {
        let registry = ToolRegistry::new()
            .with_tool(
                tools::builtin::order_confirmation_descriptor(),
                OrderConfirmationTool::new(LogSender::new(), "+14155238886"),
            )
            .unwrap();
        let dispatcher = Arc::new(ToolDispatcher::new(registry));

        let advertised = dispatcher.schemas_openai();
        assert_eq!(advertised[0]["function"]["name"], "send_whatsapp_message");

        let assistant = json!({
            "role": "assistant",
            "content": null,
            "tool_calls": [{
                "id": "call_order",
                "type": "function",
                "function": {
                    "name": "send_whatsapp_message",
                    "arguments": "{\"order_summary\":\"1 pizza\",\"phone_number\":\"+15551234567\"}"
                }
            }]
        });
        let requests = ToolCallRequest::from_assistant_message(&assistant).unwrap();

        let (tx, mut rx) = mpsc::unbounded_channel::<ToolResult>();
        let results = dispatcher.dispatch_all(requests, Arc::new(tx)).await;
        assert_eq!(results.len(), 1);

        let delivered = rx.recv().await.unwrap();
        let reply: Value = delivered.to_openai_message();
        assert_eq!(reply["role"], "tool");
        assert_eq!(reply["tool_call_id"], "call_order");
        assert_eq!(
            reply["content"],
            "Order confirmation sent to WhatsApp number +15551234567 successfully! Order: 1 pizza"
        );
    }

    #[tokio::test]
    async fn rejected_call_can_still_answer_the_model() {
        let recorder = Recorder::default();
        let registry = ToolRegistry::new()
            .with_tool(
                ToolDescriptor::new("send_whatsapp_reminder", "Send a reminder")
                    .required_param("reminder_text", ParameterSpec::string("text")),
                recorder.clone(),
            )
            .unwrap();
        let dispatcher = ToolDispatcher::new(registry);

        let err = dispatcher
            .execute(&ToolCallRequest::new("c7", "send_whatsapp_reminder", "{}"))
            .await
            .unwrap_err();
        let reply = err.to_tool_result().unwrap().to_anthropic_block();
        assert_eq!(reply["tool_use_id"], "c7");
        assert_eq!(reply["is_error"], true);
        assert_eq!(
            reply["content"],
            "invalid arguments: missing required parameters: reminder_text"
        );
        assert_eq!(recorder.count("send_whatsapp_reminder"), 0);
    }

    #[tokio::test]
    async fn events_stream_to_observer() {
        let recorder = Recorder::default();
        let (etx, mut erx) = mpsc::channel(16);
        let dispatcher = recording_dispatcher(&recorder).with_events(etx);

        dispatcher
            .dispatch(&ToolCallRequest::new("a", "get_gmail_emails", ""), &NoCallback)
            .await
            .unwrap();
        let _ = dispatcher
            .dispatch(&ToolCallRequest::new("b", "nope", ""), &NoCallback)
            .await;
        drop(dispatcher);

        let mut events = Vec::new();
        while let Some(event) = erx.recv().await {
            events.push(event);
        }
        assert_eq!(events.len(), 3);
        assert!(matches!(events[0], DispatchEvent::CallStarted { .. }));
        assert!(matches!(events[1], DispatchEvent::CallFinished { .. }));
        assert!(matches!(events[2], DispatchEvent::NotRegistered { .. }));
    }
}
