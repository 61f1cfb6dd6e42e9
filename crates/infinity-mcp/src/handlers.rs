//! Operation handlers.
//!
//! One handler per remote-facing operation. Each maps structured tool
//! arguments to a single call on a [`RemoteApi`] handle and returns the raw
//! payload. Handlers hold no state and never validate arguments: a missing
//! identifier becomes an empty path segment and the remote service reports
//! the problem.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::batch::{BatchExecutor, BatchOutcome, resolve_concurrency};
use crate::client::RemoteApi;
use crate::error::ApiError;
use crate::query::{self, QueryParams};

/// Every operation the router recognises.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    SetApiKey,
    Ping,
    ListWorkspaces,
    ListBoards,
    ListItems,
    GetItem,
    CreateItem,
    UpdateItem,
    DeleteItem,
    GetItemsBulk,
    ListAttributes,
    GetAttribute,
    ListViews,
    GetView,
    CreateView,
    UpdateView,
    DeleteView,
}

impl Operation {
    /// All operations, in catalog order.
    pub const ALL: [Operation; 17] = [
        Operation::SetApiKey,
        Operation::Ping,
        Operation::ListWorkspaces,
        Operation::ListBoards,
        Operation::ListItems,
        Operation::GetItem,
        Operation::CreateItem,
        Operation::UpdateItem,
        Operation::DeleteItem,
        Operation::GetItemsBulk,
        Operation::ListAttributes,
        Operation::GetAttribute,
        Operation::ListViews,
        Operation::GetView,
        Operation::CreateView,
        Operation::UpdateView,
        Operation::DeleteView,
    ];

    /// Tool name exposed over MCP.
    pub fn name(self) -> &'static str {
        match self {
            Operation::SetApiKey => "infinity_set_api_key",
            Operation::Ping => "infinity_ping",
            Operation::ListWorkspaces => "infinity_list_workspaces",
            Operation::ListBoards => "infinity_list_boards",
            Operation::ListItems => "infinity_list_items",
            Operation::GetItem => "infinity_get_item",
            Operation::CreateItem => "infinity_create_item",
            Operation::UpdateItem => "infinity_update_item",
            Operation::DeleteItem => "infinity_delete_item",
            Operation::GetItemsBulk => "infinity_get_items_bulk",
            Operation::ListAttributes => "infinity_list_attributes",
            Operation::GetAttribute => "infinity_get_attribute",
            Operation::ListViews => "infinity_list_views",
            Operation::GetView => "infinity_get_view",
            Operation::CreateView => "infinity_create_view",
            Operation::UpdateView => "infinity_update_view",
            Operation::DeleteView => "infinity_delete_view",
        }
    }

    /// Run a single-call operation.
    ///
    /// `SetApiKey` and `GetItemsBulk` are not single calls; the router handles
    /// them itself and they fail here with [`ApiError::NotRemote`] without
    /// touching the remote.
    pub async fn call(self, api: &dyn RemoteApi, args: &ToolArgs<'_>) -> Result<Value, ApiError> {
        match self {
            Operation::Ping | Operation::ListWorkspaces => list_workspaces(api).await,
            Operation::ListBoards => list_boards(api, args).await,
            Operation::ListItems => list_items(api, args).await,
            Operation::GetItem => get_item(api, args).await,
            Operation::CreateItem => create_item(api, args).await,
            Operation::UpdateItem => update_item(api, args).await,
            Operation::DeleteItem => delete_item(api, args).await,
            Operation::ListAttributes => list_attributes(api, args).await,
            Operation::GetAttribute => get_attribute(api, args).await,
            Operation::ListViews => list_views(api, args).await,
            Operation::GetView => get_view(api, args).await,
            Operation::CreateView => create_view(api, args).await,
            Operation::UpdateView => update_view(api, args).await,
            Operation::DeleteView => delete_view(api, args).await,
            Operation::SetApiKey | Operation::GetItemsBulk => {
                Err(ApiError::NotRemote(self.name()))
            }
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Returned when a tool name matches no operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownOperation(pub String);

impl fmt::Display for UnknownOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Unknown tool: {}", self.0)
    }
}

impl std::error::Error for UnknownOperation {}

impl FromStr for Operation {
    type Err = UnknownOperation;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        Operation::ALL
            .into_iter()
            .find(|op| op.name() == name)
            .ok_or_else(|| UnknownOperation(name.to_string()))
    }
}

/// Read-only view over a tool's argument bag with permissive coercion.
#[derive(Debug, Clone, Copy)]
pub struct ToolArgs<'a> {
    raw: &'a Value,
}

impl<'a> ToolArgs<'a> {
    pub fn new(raw: &'a Value) -> Self {
        Self { raw }
    }

    pub fn get(&self, key: &str) -> Option<&'a Value> {
        self.raw.get(key)
    }

    /// String argument. Strings pass through, non-zero numbers and `true` are
    /// stringified, anything else is empty.
    pub fn string(&self, key: &str) -> String {
        self.get(key).map(coerce_string).unwrap_or_default()
    }

    /// Like [`ToolArgs::string`], but `None` when empty.
    pub fn non_empty(&self, key: &str) -> Option<String> {
        Some(self.string(key)).filter(|s| !s.is_empty())
    }

    /// Array argument coerced element-wise; non-arrays yield an empty list.
    pub fn strings(&self, key: &str) -> Vec<String> {
        match self.get(key) {
            Some(Value::Array(items)) => items.iter().map(coerce_string).collect(),
            _ => Vec::new(),
        }
    }

    /// Identifier list. Unlike [`ToolArgs::strings`], every element keeps a
    /// distinct rendering: `0` is `"0"`, `false` is `"false"` and `null` is
    /// `"null"`.
    pub fn identifiers(&self, key: &str) -> Vec<String> {
        match self.get(key) {
            Some(Value::Array(items)) => items.iter().map(render_identifier).collect(),
            _ => Vec::new(),
        }
    }

    /// Request body; absent or falsy values become `{}`.
    pub fn body(&self) -> Value {
        match self.get("body") {
            Some(value) if is_truthy(value) => value.clone(),
            _ => Value::Object(Map::new()),
        }
    }

    /// Free-form `query` object; anything else is treated as empty.
    pub fn query(&self) -> Map<String, Value> {
        match self.get("query") {
            Some(Value::Object(map)) => map.clone(),
            _ => Map::new(),
        }
    }

    /// Per-call credential override.
    pub fn api_key(&self) -> Option<&'a str> {
        self.get("apiKey")
            .and_then(Value::as_str)
            .filter(|key| !key.is_empty())
    }

    /// Encoded `expand` flags.
    pub fn expand(&self) -> QueryParams {
        query::expand_params(&self.strings("expand"))
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn coerce_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) if is_truthy(value) => n.to_string(),
        Value::Bool(true) => "true".to_string(),
        _ => String::new(),
    }
}

fn render_identifier(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => match n.as_f64() {
            Some(f) if n.is_f64() && f.fract() == 0.0 && f.abs() < 1e15 => {
                (f as i64).to_string()
            }
            _ => n.to_string(),
        },
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::Null => String::new(),
                other => render_identifier(other),
            })
            .collect::<Vec<_>>()
            .join(","),
        Value::Object(_) => "[object Object]".to_string(),
    }
}

fn board_path(args: &ToolArgs<'_>) -> String {
    format!(
        "/workspaces/{}/boards/{}",
        args.string("workspace"),
        args.string("board")
    )
}

fn item_path(args: &ToolArgs<'_>, item: &str) -> String {
    format!("{}/items/{item}", board_path(args))
}

fn view_path(args: &ToolArgs<'_>) -> String {
    format!("{}/views/{}", board_path(args), args.string("view"))
}

pub async fn list_workspaces(api: &dyn RemoteApi) -> Result<Value, ApiError> {
    api.get("/workspaces", QueryParams::new()).await
}

pub async fn list_boards(api: &dyn RemoteApi, args: &ToolArgs<'_>) -> Result<Value, ApiError> {
    let path = format!("/workspaces/{}/boards", args.string("workspace"));
    api.get(&path, QueryParams::new()).await
}

/// Items on a board, or inside one folder when `folder` is given.
pub async fn list_items(api: &dyn RemoteApi, args: &ToolArgs<'_>) -> Result<Value, ApiError> {
    let path = match args.non_empty("folder") {
        Some(folder) => format!("{}/folders/{folder}/items", board_path(args)),
        None => format!("{}/items", board_path(args)),
    };
    let params = query::merge(query::encode_query_object(&args.query()), args.expand());
    api.get(&path, params).await
}

pub async fn get_item(api: &dyn RemoteApi, args: &ToolArgs<'_>) -> Result<Value, ApiError> {
    let path = item_path(args, &args.string("item"));
    api.get(&path, args.expand()).await
}

pub async fn create_item(api: &dyn RemoteApi, args: &ToolArgs<'_>) -> Result<Value, ApiError> {
    let path = format!("{}/items", board_path(args));
    api.post(&path, args.body()).await
}

pub async fn update_item(api: &dyn RemoteApi, args: &ToolArgs<'_>) -> Result<Value, ApiError> {
    let path = item_path(args, &args.string("item"));
    api.put(&path, args.body()).await
}

pub async fn delete_item(api: &dyn RemoteApi, args: &ToolArgs<'_>) -> Result<Value, ApiError> {
    let path = item_path(args, &args.string("item"));
    api.delete(&path).await
}

/// Fetch many items by id through the batch executor.
///
/// `workspace`, `board` and `expand` are shared by every item. One handle is
/// used for the whole batch.
pub async fn get_items_bulk(
    api: Arc<dyn RemoteApi>,
    args: &ToolArgs<'_>,
    default_concurrency: usize,
) -> BatchOutcome {
    let ids = args.identifiers("items");
    let concurrency = resolve_concurrency(args.get("concurrency"), default_concurrency);
    let items_path = format!("{}/items", board_path(args));
    let expand = args.expand();

    BatchExecutor::new(concurrency)
        .run(ids, |id| {
            let api = Arc::clone(&api);
            let path = format!("{items_path}/{id}");
            let params = expand.clone();
            async move { api.get(&path, params).await }
        })
        .await
        .into_outcome()
}

pub async fn list_attributes(api: &dyn RemoteApi, args: &ToolArgs<'_>) -> Result<Value, ApiError> {
    let path = format!("{}/attributes", board_path(args));
    api.get(&path, QueryParams::new()).await
}

pub async fn get_attribute(api: &dyn RemoteApi, args: &ToolArgs<'_>) -> Result<Value, ApiError> {
    let path = format!("{}/attributes/{}", board_path(args), args.string("attribute"));
    api.get(&path, QueryParams::new()).await
}

pub async fn list_views(api: &dyn RemoteApi, args: &ToolArgs<'_>) -> Result<Value, ApiError> {
    let path = format!("{}/views", board_path(args));
    api.get(&path, query::encode_query_object(&args.query())).await
}

pub async fn get_view(api: &dyn RemoteApi, args: &ToolArgs<'_>) -> Result<Value, ApiError> {
    api.get(&view_path(args), QueryParams::new()).await
}

pub async fn create_view(api: &dyn RemoteApi, args: &ToolArgs<'_>) -> Result<Value, ApiError> {
    let path = format!("{}/views", board_path(args));
    api.post(&path, args.body()).await
}

pub async fn update_view(api: &dyn RemoteApi, args: &ToolArgs<'_>) -> Result<Value, ApiError> {
    api.put(&view_path(args), args.body()).await
}

pub async fn delete_view(api: &dyn RemoteApi, args: &ToolArgs<'_>) -> Result<Value, ApiError> {
    api.delete(&view_path(args)).await
}
