//! `tools` subcommand: enumerate the tools a target MCP server exposes.

use anyhow::{Context, Result};
use clap::Args;
use std::time::Instant;

use crate::cmd::format::{Role, StyleOptions, box_header, color, emoji, table};
use crate::mcp::{self, McpSession, TargetSpec};

#[derive(Args, Debug)]
pub struct ToolsArgs {
    /// Output JSON instead of human-readable text
    #[arg(long)]
    pub json: bool,

    /// Target MCP server (local command). Defaults to spawning `showbook serve`.
    #[arg(short = 't', long)]
    pub target: Option<String>,
}

pub fn execute_tools(args: ToolsArgs) -> Result<()> {
    let spec = match &args.target {
        Some(t) => mcp::parse_target(t)
            .with_context(|| format!("Failed to parse target: '{t}'"))?,
        None => TargetSpec::self_serve(None)?,
    };

    let rt = tokio::runtime::Runtime::new().context("Failed to create Tokio runtime")?;
    let started = Instant::now();
    let tools = rt.block_on(async {
        let session = McpSession::connect(&spec).await?;
        let tools = session.list_tools().await?;
        session.shutdown().await;
        Ok::<_, anyhow::Error>(tools)
    })?;
    let elapsed_ms = started.elapsed().as_millis();

    let target_display = spec.original().to_string();
    if args.json {
        let items: Vec<serde_json::Value> = tools
            .iter()
            .map(|t| {
                serde_json::json!({
                    "name": t.get("name").and_then(|v| v.as_str()).unwrap_or("<unnamed>"),
                    "description": t.get("description").and_then(|v| v.as_str()).unwrap_or(""),
                })
            })
            .collect();
        println!(
            "{}",
            serde_json::json!({
                "status": "ok",
                "target": target_display,
                "elapsed_ms": elapsed_ms,
                "count": tools.len(),
                "tools": items,
            })
        );
        return Ok(());
    }

    let style = StyleOptions::detect();
    println!(
        "{}",
        box_header(
            format!("{} Tools ({})", emoji("tool", &style), tools.len()),
            Some(format!("target={target_display} • {elapsed_ms} ms")),
            &style,
        )
    );

    if tools.is_empty() {
        println!(
            "{}",
            color(Role::Dim, format!("{} (none)", emoji("info", &style)), &style)
        );
        return Ok(());
    }

    let rows: Vec<Vec<String>> = tools
        .iter()
        .enumerate()
        .map(|(idx, t)| {
            let name = t
                .get("name")
                .and_then(|v| v.as_str())
                .unwrap_or("<unnamed>")
                .to_string();
            let desc = t
                .get("description")
                .and_then(|v| v.as_str())
                .unwrap_or("")
                .replace('\n', " ");
            vec![(idx + 1).to_string(), name, param_summary(t), desc]
        })
        .collect();

    println!(
        "{}",
        table(&["#", "NAME", "PARAMS", "DESCRIPTION"], &rows, &style)
    );
    Ok(())
}

/// Summarize a tool's declared parameters as "name:type, ...".
fn param_summary(tool: &serde_json::Value) -> String {
    let props = tool
        .get("input_schema")
        .or_else(|| tool.get("inputSchema"))
        .and_then(|s| s.get("properties"))
        .and_then(|v| v.as_object());
    let Some(props) = props else {
        return "-".to_string();
    };
    let mut pairs: Vec<String> = props
        .iter()
        .take(8)
        .map(|(pname, pobj)| {
            let ptype = pobj
                .as_object()
                .and_then(|m| m.get("type"))
                .and_then(|v| v.as_str())
                .unwrap_or("any");
            format!("{pname}:{ptype}")
        })
        .collect();
    if props.len() > 8 {
        pairs.push("…".into());
    }
    if pairs.is_empty() {
        "-".to_string()
    } else {
        pairs.join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn param_summary_reads_schema() {
        let tool = json!({
            "name": "book_ticket",
            "input_schema": {
                "properties": {
                    "show_id": { "type": "string" },
                    "seats": { "type": "integer" }
                }
            }
        });
        let summary = param_summary(&tool);
        assert!(summary.contains("show_id:string"));
        assert!(summary.contains("seats:integer"));
    }

    #[test]
    fn param_summary_handles_missing_schema() {
        assert_eq!(param_summary(&json!({"name": "ping"})), "-");
    }
}
