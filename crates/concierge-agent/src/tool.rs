//! Callable tools and the per-agent tool registry.
//!
//! Tools are registered with an agent at construction and never change for
//! the lifetime of a job. The registry routes invocations by name; a name
//! the model invents yields [`AgentError::UnknownTool`], which the session
//! feeds back to the model as the tool result.

use crate::error::AgentError;
use async_trait::async_trait;
use concierge_types::ToolDefinition;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Execution context supplied to tool handlers by the runtime.
#[derive(Debug, Clone)]
pub struct RunContext {
    /// Room the invoking conversation belongs to.
    pub room_name: String,
}

impl RunContext {
    pub fn new(room_name: impl Into<String>) -> Self {
        Self {
            room_name: room_name.into(),
        }
    }
}

/// Async handler backing one tool.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    async fn call(&self, ctx: &RunContext, args: Value) -> Result<Value, AgentError>;
}

/// A named capability exposed to the language model.
#[derive(Clone)]
pub struct Tool {
    definition: ToolDefinition,
    handler: Arc<dyn ToolHandler>,
}

impl Tool {
    pub fn new(definition: ToolDefinition, handler: Arc<dyn ToolHandler>) -> Self {
        Self {
            definition,
            handler,
        }
    }

    pub fn name(&self) -> &str {
        &self.definition.name
    }

    pub fn definition(&self) -> &ToolDefinition {
        &self.definition
    }
}

impl fmt::Debug for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tool")
            .field("name", &self.definition.name)
            .field("description", &self.definition.description)
            .finish()
    }
}

/// The set of tools available to one agent.
///
/// Cloning produces an independent registry: registrations on the clone do
/// not affect the original, so concurrent jobs never share mutable state.
#[derive(Clone, Default)]
pub struct ToolSet {
    tools: HashMap<String, Tool>,
}

impl ToolSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a tool, replacing any existing tool with the same name.
    pub fn register(&mut self, tool: Tool) {
        debug!(tool_name = %tool.name(), "registered tool");
        self.tools.insert(tool.name().to_string(), tool);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Definitions of every registered tool, for the model's `tools` array.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.values().map(|t| t.definition().clone()).collect()
    }

    /// Invokes a tool by name.
    pub async fn invoke(
        &self,
        name: &str,
        ctx: &RunContext,
        args: Value,
    ) -> Result<Value, AgentError> {
        let tool = self
            .tools
            .get(name)
            .ok_or_else(|| AgentError::UnknownTool(name.to_string()))?;
        debug!(tool_name = %name, room = %ctx.room_name, "invoking tool");
        tool.handler.call(ctx, args).await
    }
}

impl fmt::Debug for ToolSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolSet")
            .field("tools", &self.tools.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct EchoHandler;

    #[async_trait]
    impl ToolHandler for EchoHandler {
        async fn call(&self, ctx: &RunContext, args: Value) -> Result<Value, AgentError> {
            Ok(json!({ "room": ctx.room_name, "echo": args }))
        }
    }

    fn echo_tool(name: &str) -> Tool {
        Tool::new(
            ToolDefinition::new(name, format!("echoes arguments: {name}"), json!({"type": "object"})),
            Arc::new(EchoHandler),
        )
    }

    #[tokio::test]
    async fn invoke_routes_to_handler() {
        let mut tools = ToolSet::new();
        tools.register(echo_tool("echo"));

        let ctx = RunContext::new("lobby");
        let result = tools
            .invoke("echo", &ctx, json!({"key": "value"}))
            .await
            .unwrap();
        assert_eq!(result["room"], "lobby");
        assert_eq!(result["echo"]["key"], "value");
    }

    #[tokio::test]
    async fn unknown_tool_is_an_error() {
        let tools = ToolSet::new();
        let ctx = RunContext::new("lobby");
        let err = tools.invoke("missing", &ctx, json!({})).await.unwrap_err();
        assert!(matches!(err, AgentError::UnknownTool(name) if name == "missing"));
    }

    #[tokio::test]
    async fn register_replaces_same_name() {
        let mut tools = ToolSet::new();
        tools.register(echo_tool("echo"));
        tools.register(Tool::new(
            ToolDefinition::new("echo", "replacement", json!({"type": "object"})),
            Arc::new(EchoHandler),
        ));

        assert_eq!(tools.len(), 1);
        let defs = tools.definitions();
        assert_eq!(defs[0].description, "replacement");
    }

    #[test]
    fn clones_are_independent() {
        let mut original = ToolSet::new();
        original.register(echo_tool("echo"));

        let mut cloned = original.clone();
        cloned.register(echo_tool("extra"));

        assert_eq!(original.len(), 1);
        assert_eq!(cloned.len(), 2);
        assert!(!original.contains("extra"));
    }
}
