//! Tool definitions exposed to the language model.
//!
//! A tool is a named capability the model may invoke during a conversation.
//! The definition carries the name, a human-readable description, and a JSON
//! schema for the arguments; the async handler lives alongside the agent
//! runtime in `concierge-agent`.

use serde::{Deserialize, Serialize};

/// Declarative description of one callable tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Unique tool name, as the model will reference it.
    pub name: String,
    /// What the tool does, phrased for the model.
    pub description: String,
    /// JSON schema describing the tool arguments.
    pub parameters: serde_json::Value,
}

impl ToolDefinition {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: serde_json::Value,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
        }
    }

    /// Renders the definition in the `function` shape chat-completion APIs
    /// expect in their `tools` array.
    pub fn function_spec(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "function",
            "function": {
                "name": self.name,
                "description": self.description,
                "parameters": self.parameters,
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn function_spec_wraps_definition() {
        let def = ToolDefinition::new(
            "lookup_weather",
            "Look up weather information.",
            json!({
                "type": "object",
                "properties": { "location": { "type": "string" } },
                "required": ["location"],
            }),
        );

        let spec = def.function_spec();
        assert_eq!(spec["type"], "function");
        assert_eq!(spec["function"]["name"], "lookup_weather");
        assert_eq!(
            spec["function"]["parameters"]["properties"]["location"]["type"],
            "string"
        );
    }

    #[test]
    fn definition_round_trips_through_serde() {
        let def = ToolDefinition::new("t", "d", json!({"type": "object"}));
        let encoded = serde_json::to_string(&def).unwrap();
        let decoded: ToolDefinition = serde_json::from_str(&encoded).unwrap();
        assert_eq!(def, decoded);
    }
}
