//! Agent definition: behavioral instructions plus the available tools.

use crate::tool::{Tool, ToolSet};

/// Static configuration for one conversational agent.
///
/// Built once per job and immutable afterwards; two jobs never share an
/// `Agent` or its tool set.
#[derive(Debug, Clone)]
pub struct Agent {
    instructions: String,
    tools: ToolSet,
}

impl Agent {
    pub fn builder() -> AgentBuilder {
        AgentBuilder::default()
    }

    /// The behavioral prompt handed to the language model as its system
    /// message.
    pub fn instructions(&self) -> &str {
        &self.instructions
    }

    pub fn tools(&self) -> &ToolSet {
        &self.tools
    }
}

/// Builder for [`Agent`].
#[derive(Debug, Default)]
pub struct AgentBuilder {
    instructions: String,
    tools: ToolSet,
}

impl AgentBuilder {
    pub fn instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = instructions.into();
        self
    }

    pub fn tool(mut self, tool: Tool) -> Self {
        self.tools.register(tool);
        self
    }

    pub fn build(self) -> Agent {
        Agent {
            instructions: self.instructions,
            tools: self.tools,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AgentError;
    use crate::tool::{RunContext, ToolHandler};
    use async_trait::async_trait;
    use concierge_types::ToolDefinition;
    use serde_json::{json, Value};
    use std::sync::Arc;

    struct NoopHandler;

    #[async_trait]
    impl ToolHandler for NoopHandler {
        async fn call(&self, _ctx: &RunContext, _args: Value) -> Result<Value, AgentError> {
            Ok(json!({}))
        }
    }

    fn noop_tool(name: &str) -> Tool {
        Tool::new(
            ToolDefinition::new(name, "noop", json!({"type": "object"})),
            Arc::new(NoopHandler),
        )
    }

    #[test]
    fn builder_collects_instructions_and_tools() {
        let agent = Agent::builder()
            .instructions("You are a friendly voice assistant.")
            .tool(noop_tool("lookup_weather"))
            .build();

        assert_eq!(agent.instructions(), "You are a friendly voice assistant.");
        assert_eq!(agent.tools().len(), 1);
        assert!(agent.tools().contains("lookup_weather"));
    }

    #[test]
    fn agents_built_separately_are_independent() {
        let first = Agent::builder().tool(noop_tool("lookup_weather")).build();
        let second = Agent::builder()
            .tool(noop_tool("lookup_weather"))
            .tool(noop_tool("extra"))
            .build();

        assert_eq!(first.tools().len(), 1);
        assert_eq!(second.tools().len(), 2);
        assert!(!first.tools().contains("extra"));
    }
}
