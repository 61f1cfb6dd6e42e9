//! Static tool catalog.
//!
//! One definition per [`Operation`]. Input schemas describe the arguments for
//! clients; the router does not enforce them.

use serde_json::{Value, json};

use crate::handlers::Operation;
use crate::protocol::{ToolAnnotations, ToolDefinition};
use crate::tools::ToolRegistry;

const EXPAND_FLAGS: [&str; 4] = ["values", "values.attribute", "folder", "created_by"];

/// Registry holding every tool the router recognises, in catalog order.
pub fn registry() -> ToolRegistry {
    Operation::ALL.into_iter().map(definition).collect()
}

/// Tool definition for one operation.
pub fn definition(op: Operation) -> ToolDefinition {
    let (description, title, access) = describe(op);
    ToolDefinition {
        name: op.name().to_string(),
        description: Some(description.to_string()),
        input_schema: input_schema(op),
        annotations: Some(annotations(title, access)),
    }
}

#[derive(Clone, Copy)]
enum Access {
    Read,
    Write,
    Local,
}

fn annotations(title: &str, access: Access) -> ToolAnnotations {
    ToolAnnotations {
        title: Some(format!("Infinity: {title}")),
        read_only_hint: Some(matches!(access, Access::Read)),
        destructive_hint: Some(matches!(access, Access::Write)),
        open_world_hint: Some(false),
    }
}

fn describe(op: Operation) -> (&'static str, &'static str, Access) {
    match op {
        Operation::SetApiKey => (
            "Set/override the Infinity API key for this process",
            "Set API Key",
            Access::Local,
        ),
        Operation::Ping => (
            "Ping the Infinity API to verify connectivity/authentication",
            "Ping",
            Access::Read,
        ),
        Operation::ListWorkspaces => (
            "List workspaces accessible to the authenticated user",
            "List Workspaces",
            Access::Read,
        ),
        Operation::ListBoards => ("List boards for a workspace", "List Boards", Access::Read),
        Operation::ListItems => (
            "List items on a board, optional folder scoping",
            "List Items",
            Access::Read,
        ),
        Operation::GetItem => ("Get a single item by ID", "Get Item", Access::Read),
        Operation::CreateItem => ("Create an item on a board", "Create Item", Access::Write),
        Operation::UpdateItem => ("Update an item by ID", "Update Item", Access::Write),
        Operation::DeleteItem => ("Delete an item by ID", "Delete Item", Access::Write),
        Operation::GetItemsBulk => (
            "Get multiple items by IDs concurrently; returns details and errors.",
            "Get Items (Bulk)",
            Access::Read,
        ),
        Operation::ListAttributes => (
            "List attributes for a board",
            "List Attributes",
            Access::Read,
        ),
        Operation::GetAttribute => (
            "Get a single attribute by ID",
            "Get Attribute",
            Access::Read,
        ),
        Operation::ListViews => ("List views for a board", "List Views", Access::Read),
        Operation::GetView => ("Get a single view by ID", "Get View", Access::Read),
        Operation::CreateView => ("Create a view on a board", "Create View", Access::Write),
        Operation::UpdateView => ("Update a view by ID", "Update View", Access::Write),
        Operation::DeleteView => ("Delete a view by ID", "Delete View", Access::Write),
    }
}

fn string_prop(description: &str) -> Value {
    json!({ "type": "string", "description": description })
}

fn expand_prop() -> Value {
    json!({
        "type": "array",
        "description": "Expand response with sub-models",
        "items": { "type": "string", "enum": EXPAND_FLAGS }
    })
}

fn input_schema(op: Operation) -> Value {
    let mut props: Vec<(&'static str, Value)> = Vec::new();
    let mut required: Vec<&'static str> = Vec::new();

    match op {
        Operation::SetApiKey => {
            props.push(("apiKey", string_prop("Infinity API key (will not be logged)")));
            return schema(props, vec!["apiKey"]);
        }
        Operation::Ping | Operation::ListWorkspaces => {}
        Operation::ListBoards => scope(
            &mut props,
            &mut required,
            &[("workspace", "Workspace ID (e.g., 669)")],
        ),
        Operation::ListItems => {
            scope(&mut props, &mut required, &[WORKSPACE, BOARD]);
            props.push(("folder", string_prop("Optional folder ID to scope items")));
            props.push((
                "query",
                json!({ "type": "object", "description": "Optional query params (pagination, search)" }),
            ));
            props.push(("expand", expand_prop()));
        }
        Operation::GetItem => {
            scope(&mut props, &mut required, &[WORKSPACE, BOARD, ("item", "Item ID")]);
            props.push(("expand", expand_prop()));
        }
        Operation::CreateItem => {
            scope(&mut props, &mut required, &[WORKSPACE, BOARD]);
            props.push(body_prop("Item payload (e.g., folder, name, values, etc.)"));
            required.push("body");
        }
        Operation::UpdateItem => {
            scope(&mut props, &mut required, &[WORKSPACE, BOARD, ("item", "Item ID")]);
            props.push(body_prop("Update payload (e.g., name, values)"));
            required.push("body");
        }
        Operation::DeleteItem => {
            scope(&mut props, &mut required, &[WORKSPACE, BOARD, ("item", "Item ID")])
        }
        Operation::GetItemsBulk => {
            scope(&mut props, &mut required, &[WORKSPACE, BOARD]);
            props.push((
                "items",
                json!({
                    "type": "array",
                    "description": "Array of item IDs",
                    "items": { "type": "string" }
                }),
            ));
            required.push("items");
            props.push((
                "concurrency",
                json!({ "type": "number", "description": "Max concurrent requests (default 8)" }),
            ));
            props.push(("expand", expand_prop()));
        }
        Operation::ListAttributes => scope(&mut props, &mut required, &[WORKSPACE, BOARD]),
        Operation::GetAttribute => {
            scope(&mut props, &mut required, &[WORKSPACE, BOARD, ("attribute", "Attribute ID")])
        }
        Operation::ListViews => {
            scope(&mut props, &mut required, &[WORKSPACE, BOARD]);
            props.push((
                "query",
                json!({ "type": "object", "description": "Optional query params (pagination, expand)" }),
            ));
        }
        Operation::GetView | Operation::DeleteView => {
            scope(&mut props, &mut required, &[WORKSPACE, BOARD, ("view", "View ID")])
        }
        Operation::CreateView => {
            scope(&mut props, &mut required, &[WORKSPACE, BOARD]);
            props.push(body_prop("View payload (e.g., name, type, config)"));
            required.push("body");
        }
        Operation::UpdateView => {
            scope(&mut props, &mut required, &[WORKSPACE, BOARD, ("view", "View ID")]);
            props.push(body_prop("Update payload (e.g., name, config)"));
            required.push("body");
        }
    }

    props.push(("apiKey", string_prop("Optional API key override for this call")));
    schema(props, required)
}

type Arg = (&'static str, &'static str);

const WORKSPACE: Arg = ("workspace", "Workspace ID");
const BOARD: Arg = ("board", "Board ID");

/// Required string identifiers.
fn scope(props: &mut Vec<(&'static str, Value)>, required: &mut Vec<&'static str>, keys: &[Arg]) {
    for &(key, description) in keys {
        props.push((key, string_prop(description)));
        required.push(key);
    }
}

fn body_prop(description: &str) -> (&'static str, Value) {
    ("body", json!({ "type": "object", "description": description }))
}

fn schema(props: Vec<(&'static str, Value)>, required: Vec<&'static str>) -> Value {
    let properties: serde_json::Map<String, Value> = props
        .into_iter()
        .map(|(key, value)| (key.to_string(), value))
        .collect();

    let mut schema = json!({ "type": "object", "properties": properties });
    if !required.is_empty() {
        schema["required"] = json!(required);
    }
    schema
}
