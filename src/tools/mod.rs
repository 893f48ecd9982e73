pub mod builtin;
pub mod callback;
pub mod dispatcher;
pub mod handler;
pub mod registry;
pub mod validate;

pub use callback::{callback_fn, FnCallback, NoCallback, ResultCallback};
pub use dispatcher::ToolDispatcher;
pub use handler::{handler_fn, FnHandler, ToolHandler};
pub use registry::{ToolDef, ToolRegistry};
