//! `infinity call` - dispatch a single tool call and print its envelope.

use anyhow::{Context, Result, bail};
use serde_json::Value;

use super::{build_executor, load_config};
use crate::GlobalArgs;

/// Returns whether the envelope reported success.
pub async fn execute(global: &GlobalArgs, tool: &str, raw_args: &str) -> Result<bool> {
    let arguments = parse_arguments(raw_args)?;
    let config = load_config(global)?;
    let executor = build_executor(&config.api, global)?;

    let envelope = executor.dispatch(tool, &arguments).await;
    println!("{}", envelope.to_text());

    Ok(envelope.is_success())
}

fn parse_arguments(raw: &str) -> Result<Value> {
    let value: Value = serde_json::from_str(raw).context("--args must be valid JSON")?;
    if !value.is_object() {
        bail!("--args must be a JSON object");
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_arguments_object() {
        let value = parse_arguments(r#"{"workspace": "669"}"#).unwrap();
        assert_eq!(value, json!({"workspace": "669"}));
    }

    #[test]
    fn test_parse_arguments_rejects_non_objects() {
        assert!(parse_arguments("[1, 2]").is_err());
        assert!(parse_arguments("{oops").is_err());
    }

    #[tokio::test]
    async fn test_unknown_tool_reports_failure() {
        let dir = tempfile::tempdir().unwrap();
        let global = GlobalArgs {
            config: dir.path().join("infinity.yaml"),
            log_level: "info".to_string(),
            ..Default::default()
        };

        let ok = execute(&global, "infinity_teleport", "{}").await.unwrap();
        assert!(!ok);
    }
}
