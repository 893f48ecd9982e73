/// Events emitted while dispatching, for UIs and input-muting.
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchEvent {
    /// The tool's announcement line, sent before the handler starts.
    Announce { call_id: String, name: String, text: String },
    CallStarted { call_id: String, name: String, in_flight: usize },
    CallFinished {
        call_id: String,
        name: String,
        is_error: bool,
        elapsed_ms: u64,
        in_flight: usize,
    },
    NotRegistered { call_id: String, name: String },
    InvalidArguments { call_id: String, name: String, reason: String },
    Cancelled { call_id: String, name: String },
}
