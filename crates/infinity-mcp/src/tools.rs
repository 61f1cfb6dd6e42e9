//! Tool registry for MCP tools.
//!
//! Keeps tool definitions in registration order so `tools/list` output is
//! stable. The definitions themselves live in the `catalog` module.

use crate::protocol::ToolDefinition;
use std::collections::HashMap;

/// Registry of available MCP tools.
#[derive(Debug, Clone, Default)]
pub struct ToolRegistry {
    tools: Vec<ToolDefinition>,
    index: HashMap<String, usize>,
}

impl ToolRegistry {
    /// Create a new empty tool registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool, replacing any existing tool with the same name in place.
    pub fn register(&mut self, tool: ToolDefinition) {
        match self.index.get(&tool.name) {
            Some(&position) => self.tools[position] = tool,
            None => {
                self.index.insert(tool.name.clone(), self.tools.len());
                self.tools.push(tool);
            }
        }
    }

    /// Get a tool by name.
    pub fn get(&self, name: &str) -> Option<&ToolDefinition> {
        self.index.get(name).map(|&i| &self.tools[i])
    }

    /// Check if a tool exists.
    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// All tools, in registration order.
    pub fn list(&self) -> &[ToolDefinition] {
        &self.tools
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Tool names, in registration order.
    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name.as_str()).collect()
    }
}

impl FromIterator<ToolDefinition> for ToolRegistry {
    fn from_iter<I: IntoIterator<Item = ToolDefinition>>(iter: I) -> Self {
        let mut registry = ToolRegistry::new();
        for tool in iter {
            registry.register(tool);
        }
        registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn create_test_tool(name: &str) -> ToolDefinition {
        ToolDefinition {
            name: name.to_string(),
            description: Some(format!("Test tool: {}", name)),
            input_schema: json!({"type": "object"}),
            annotations: None,
        }
    }

    #[test]
    fn test_register_and_get() {
        let mut registry = ToolRegistry::new();
        registry.register(create_test_tool("test"));

        assert!(registry.get("test").is_some());
        assert!(registry.get("nonexistent").is_none());
        assert!(registry.contains("test"));
    }

    #[test]
    fn test_list_keeps_registration_order() {
        let registry: ToolRegistry = ["zeta", "alpha", "mid"]
            .into_iter()
            .map(create_test_tool)
            .collect();

        assert_eq!(registry.len(), 3);
        assert_eq!(registry.names(), vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn test_reregister_replaces_in_place() {
        let mut registry = ToolRegistry::new();
        registry.register(create_test_tool("one"));
        registry.register(create_test_tool("two"));

        let mut replacement = create_test_tool("one");
        replacement.description = Some("replaced".into());
        registry.register(replacement);

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.names(), vec!["one", "two"]);
        assert_eq!(
            registry.get("one").unwrap().description.as_deref(),
            Some("replaced")
        );
    }
}
