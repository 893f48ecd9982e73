use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use super::handler::ToolHandler;
use crate::config::DuplicatePolicy;
use crate::descriptor::{is_valid_tool_name, ToolDescriptor};
use crate::error::RegistryError;

/// A registered tool: optional descriptor for the model + handler for execution.
pub struct ToolDef {
    pub name: String,
    pub descriptor: Option<ToolDescriptor>,
    pub(crate) handler: Arc<dyn ToolHandler>,
}

/// Catalog of available tools. Built during setup, then handed to a
/// `ToolDispatcher`, which only ever reads it.
pub struct ToolRegistry {
    tools: Vec<ToolDef>,
    index: HashMap<String, usize>,
    policy: DuplicatePolicy,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::with_policy(DuplicatePolicy::default())
    }

    pub fn with_policy(policy: DuplicatePolicy) -> Self {
        Self {
            tools: Vec::new(),
            index: HashMap::new(),
            policy,
        }
    }

    /// Register a handler under a bare name. The tool has no declared
    /// schema: any argument object is accepted and it is not advertised.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        handler: impl ToolHandler + 'static,
    ) -> Result<(), RegistryError> {
        let name = name.into();
        if !is_valid_tool_name(&name) {
            return Err(RegistryError::InvalidDescriptor {
                name,
                reason: "name must be 1-64 characters of [A-Za-z0-9_-]".into(),
            });
        }
        self.insert(ToolDef {
            name,
            descriptor: None,
            handler: Arc::new(handler),
        })
    }

    /// Register a descriptor together with its handler.
    pub fn register_tool(
        &mut self,
        descriptor: ToolDescriptor,
        handler: impl ToolHandler + 'static,
    ) -> Result<(), RegistryError> {
        descriptor.validate()?;
        self.insert(ToolDef {
            name: descriptor.name.clone(),
            descriptor: Some(descriptor),
            handler: Arc::new(handler),
        })
    }

    /// Builder form of [`register_tool`](Self::register_tool).
    pub fn with_tool(
        mut self,
        descriptor: ToolDescriptor,
        handler: impl ToolHandler + 'static,
    ) -> Result<Self, RegistryError> {
        self.register_tool(descriptor, handler)?;
        Ok(self)
    }

    fn insert(&mut self, def: ToolDef) -> Result<(), RegistryError> {
        match self.index.get(&def.name) {
            Some(&slot) => match self.policy {
                DuplicatePolicy::Reject => Err(RegistryError::Duplicate(def.name)),
                DuplicatePolicy::Replace => {
                    debug!(tool = %def.name, "replacing registered tool");
                    self.tools[slot] = def;
                    Ok(())
                }
            },
            None => {
                debug!(tool = %def.name, "registered tool");
                self.index.insert(def.name.clone(), self.tools.len());
                self.tools.push(def);
                Ok(())
            }
        }
    }

    /// Look up a tool by name.
    pub fn get(&self, name: &str) -> Option<&ToolDef> {
        self.index.get(name).map(|&i| &self.tools[i])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Descriptor for a specific tool by name.
    pub fn descriptor(&self, name: &str) -> Option<&ToolDescriptor> {
        self.get(name).and_then(|t| t.descriptor.as_ref())
    }

    /// Descriptors of advertised tools, in registration order.
    pub fn descriptors(&self) -> impl Iterator<Item = &ToolDescriptor> {
        self.tools.iter().filter_map(|t| t.descriptor.as_ref())
    }

    /// Tool list for an OpenAI chat completions request.
    pub fn schemas_openai(&self) -> Vec<Value> {
        self.descriptors().map(ToolDescriptor::to_openai).collect()
    }

    /// Tool list for an Anthropic messages request.
    pub fn schemas_anthropic(&self) -> Vec<Value> {
        self.descriptors().map(ToolDescriptor::to_anthropic).collect()
    }

    pub fn tool_names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name.as_str()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}
