//! `infinity tools` - print the tool catalog.

use anyhow::Result;
use infinity_mcp::{ToolDefinition, catalog};

/// Print every tool, optionally with its input schema.
pub fn list(verbose: bool) -> Result<()> {
    let registry = catalog::registry();

    println!("\nAvailable Tools ({}):", registry.len());
    for tool in registry.list() {
        println!("   • {} ({})", tool.name, badge(tool));

        if let Some(desc) = &tool.description {
            println!("     {desc}");
        }
        if verbose {
            println!(
                "     Schema: {}",
                serde_json::to_string_pretty(&tool.input_schema)?
            );
        }
    }
    println!();

    Ok(())
}

fn badge(tool: &ToolDefinition) -> &'static str {
    let annotations = tool.annotations.as_ref();
    if annotations.is_some_and(|a| a.read_only_hint == Some(true)) {
        "read"
    } else if annotations.is_some_and(|a| a.destructive_hint == Some(true)) {
        "write"
    } else {
        "local"
    }
}
