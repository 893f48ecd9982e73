use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use serde_json::Value;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::callback::ResultCallback;
use super::registry::{ToolDef, ToolRegistry};
use super::validate::{parse_arguments, validate_arguments};
use crate::config::DispatcherConfig;
use crate::error::DispatchError;
use crate::events::DispatchEvent;
use crate::types::{ToolCallRequest, ToolInvocation, ToolResult};

/// Routes tool calls from the model to their registered handlers.
///
/// 1. **Lookup** by tool name. Unknown names are reported, never executed.
/// 2. **Validation** of the arguments payload against the tool's descriptor.
/// 3. **Invocation** of the handler, bounded by the configured timeout.
/// 4. **Delivery** of the result through a [`ResultCallback`].
///
/// The registry is owned and read-only, so one dispatcher can serve any
/// number of concurrent calls behind an `Arc`.
pub struct ToolDispatcher {
    registry: ToolRegistry,
    config: DispatcherConfig,
    in_flight: AtomicUsize,
    events: Option<mpsc::Sender<DispatchEvent>>,
}

impl ToolDispatcher {
    pub fn new(registry: ToolRegistry) -> Self {
        Self {
            registry,
            config: DispatcherConfig::default(),
            in_flight: AtomicUsize::new(0),
            events: None,
        }
    }

    pub fn with_config(mut self, config: DispatcherConfig) -> Self {
        self.config = config;
        self
    }

    /// Stream dispatch events (announcements, start/finish, rejections).
    pub fn with_events(mut self, tx: mpsc::Sender<DispatchEvent>) -> Self {
        self.events = Some(tx);
        self
    }

    /// Execute a tool call and deliver its result to `callback`.
    ///
    /// Handler failures are delivered as error results and return `Ok`.
    /// An unknown tool or bad arguments return `Err` and deliver nothing.
    pub async fn dispatch(
        &self,
        request: &ToolCallRequest,
        callback: &dyn ResultCallback,
    ) -> Result<(), DispatchError> {
        let result = self.execute(request).await?;
        callback.deliver(result).await;
        Ok(())
    }

    /// Like [`dispatch`](Self::dispatch), but abandons the handler when
    /// `cancel` fires. A cancelled call delivers nothing.
    pub async fn dispatch_with_cancel(
        &self,
        request: &ToolCallRequest,
        callback: &dyn ResultCallback,
        cancel: CancellationToken,
    ) -> Result<(), DispatchError> {
        if cancel.is_cancelled() {
            return Err(self.cancelled(request).await);
        }
        tokio::select! {
            result = self.execute(request) => {
                callback.deliver(result?).await;
                Ok(())
            }
            _ = cancel.cancelled() => Err(self.cancelled(request).await),
        }
    }

    /// Dispatch a batch concurrently. Each result is delivered as soon as
    /// its handler finishes; the returned list follows request order.
    pub async fn dispatch_all(
        self: &Arc<Self>,
        requests: Vec<ToolCallRequest>,
        callback: Arc<dyn ResultCallback>,
    ) -> Vec<Result<ToolResult, DispatchError>> {
        let handles: Vec<_> = requests
            .into_iter()
            .map(|request| {
                let dispatcher = Arc::clone(self);
                let callback = Arc::clone(&callback);
                let (call_id, name) = (request.id.clone(), request.function.name.clone());
                let handle = tokio::spawn(async move {
                    let result = dispatcher.execute(&request).await?;
                    callback.deliver(result.clone()).await;
                    Ok::<_, DispatchError>(result)
                });
                (call_id, name, handle)
            })
            .collect();

        let mut results = Vec::with_capacity(handles.len());
        for (call_id, name, handle) in handles {
            let result = match handle.await {
                Ok(result) => result,
                Err(e) => {
                    error!(tool = %name, call_id = %call_id, error = %e, "tool task failed");
                    let content = format!("tool {name} failed: {e}");
                    let result = ToolResult::error(call_id, name, content);
                    callback.deliver(result.clone()).await;
                    Ok(result)
                }
            };
            results.push(result);
        }
        results
    }

    /// Execute a tool call and return its result without delivering it.
    pub async fn execute(&self, request: &ToolCallRequest) -> Result<ToolResult, DispatchError> {
        let name = request.tool_name();
        let Some(tool) = self.registry.get(name) else {
            warn!(tool = name, call_id = %request.id, "handler not registered, skipping tool call");
            self.emit(DispatchEvent::NotRegistered {
                call_id: request.id.clone(),
                name: name.to_string(),
            })
            .await;
            return Err(DispatchError::NotRegistered {
                call_id: request.id.clone(),
                name: name.to_string(),
            });
        };

        let invocation = self.prepare(tool, request).await?;
        Ok(self.run(tool, invocation).await)
    }

    async fn prepare(
        &self,
        tool: &ToolDef,
        request: &ToolCallRequest,
    ) -> Result<ToolInvocation, DispatchError> {
        let checked = parse_arguments(request.arguments()).and_then(|args| {
            if let Some(descriptor) = &tool.descriptor {
                validate_arguments(descriptor, &args, self.config.check_types)?;
            }
            Ok(args)
        });

        match checked {
            Ok(arguments) => Ok(ToolInvocation {
                call_id: request.id.clone(),
                name: tool.name.clone(),
                arguments,
            }),
            Err(reason) => {
                warn!(tool = %tool.name, call_id = %request.id, %reason, "rejected tool arguments");
                self.emit(DispatchEvent::InvalidArguments {
                    call_id: request.id.clone(),
                    name: tool.name.clone(),
                    reason: reason.clone(),
                })
                .await;
                Err(DispatchError::InvalidArguments {
                    call_id: request.id.clone(),
                    tool: tool.name.clone(),
                    reason,
                })
            }
        }
    }

    async fn run(&self, tool: &ToolDef, invocation: ToolInvocation) -> ToolResult {
        if let Some(text) = tool.descriptor.as_ref().and_then(|d| d.announcement.clone()) {
            self.emit(DispatchEvent::Announce {
                call_id: invocation.call_id.clone(),
                name: tool.name.clone(),
                text,
            })
            .await;
        }

        let guard = InFlight::enter(&self.in_flight);
        info!(tool = %tool.name, call_id = %invocation.call_id, "dispatching tool call");
        self.emit(DispatchEvent::CallStarted {
            call_id: invocation.call_id.clone(),
            name: tool.name.clone(),
            in_flight: guard.count,
        })
        .await;

        let started = Instant::now();
        let outcome = match self.config.handler_timeout() {
            Some(limit) => match tokio::time::timeout(limit, tool.handler.call(&invocation)).await {
                Ok(outcome) => outcome,
                Err(_) => Err(format!(
                    "tool {} timed out after {}ms",
                    tool.name,
                    limit.as_millis()
                )),
            },
            None => tool.handler.call(&invocation).await,
        };
        let elapsed_ms = started.elapsed().as_millis() as u64;
        drop(guard);

        let result = match outcome {
            Ok(content) => ToolResult::success(&invocation.call_id, &tool.name, content),
            Err(e) => {
                warn!(tool = %tool.name, call_id = %invocation.call_id, error = %e, "tool handler failed");
                ToolResult::error(&invocation.call_id, &tool.name, e)
            }
        };

        debug!(tool = %tool.name, elapsed_ms, is_error = result.is_error, "tool call finished");
        self.emit(DispatchEvent::CallFinished {
            call_id: invocation.call_id,
            name: tool.name.clone(),
            is_error: result.is_error,
            elapsed_ms,
            in_flight: self.in_flight(),
        })
        .await;

        result
    }

    async fn cancelled(&self, request: &ToolCallRequest) -> DispatchError {
        info!(tool = request.tool_name(), call_id = %request.id, "tool call cancelled");
        self.emit(DispatchEvent::Cancelled {
            call_id: request.id.clone(),
            name: request.tool_name().to_string(),
        })
        .await;
        DispatchError::Cancelled {
            call_id: request.id.clone(),
            name: request.tool_name().to_string(),
        }
    }

    async fn emit(&self, event: DispatchEvent) {
        if let Some(ref tx) = self.events {
            let _ = tx.send(event).await;
        }
    }

    /// Number of handlers currently running.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// True while any handler runs. Callers use this to hold back user input
    /// during function calls.
    pub fn is_busy(&self) -> bool {
        self.in_flight() > 0
    }

    /// Advertised tools in OpenAI shape.
    pub fn schemas_openai(&self) -> Vec<Value> {
        self.registry.schemas_openai()
    }

    /// Advertised tools in Anthropic shape.
    pub fn schemas_anthropic(&self) -> Vec<Value> {
        self.registry.schemas_anthropic()
    }

    /// All tool names in the registry.
    pub fn tool_names(&self) -> Vec<&str> {
        self.registry.tool_names()
    }

    pub fn is_empty(&self) -> bool {
        self.registry.is_empty()
    }

    pub fn len(&self) -> usize {
        self.registry.len()
    }

    pub fn config(&self) -> &DispatcherConfig {
        &self.config
    }

    /// Access the underlying registry.
    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }
}

/// Counts a running handler; the count drops again even if the call is abandoned.
struct InFlight<'a> {
    counter: &'a AtomicUsize,
    count: usize,
}

impl<'a> InFlight<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        let count = counter.fetch_add(1, Ordering::SeqCst) + 1;
        Self { counter, count }
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.counter.fetch_sub(1, Ordering::SeqCst);
    }
}
