//! `call` subcommand: one-shot invocation of a single tool on the target
//! server, with schema-driven argument coercion.
//!
//! Parameters come from `--param KEY=VALUE` (repeatable), `--param-file`
//! (JSON or YAML; CLI flags win on conflict), and `--interactive` prompting
//! for missing required values.

use anyhow::{Context, Result};
use clap::Args;
use std::collections::HashMap;
use std::time::Instant;

use crate::cmd::format::{Role, StyleOptions, box_header, color, emoji, table};
use crate::cmd::shared::{
    build_arguments_from_schema, call_result_json, find_tool_case_insensitive, prompt_line,
};
use crate::mcp::{self, McpSession, TargetSpec};

#[derive(Args, Debug)]
pub struct CallArgs {
    /// Tool name to invoke
    #[arg(value_name = "TOOL")]
    pub tool: String,

    /// Provide parameter (KEY=VALUE), repeatable
    #[arg(long = "param", value_name = "KEY=VALUE")]
    pub params: Vec<String>,

    /// Load parameters from file (JSON or YAML). CLI --param overrides file entries
    #[arg(long = "param-file", value_name = "PATH")]
    pub param_file: Option<String>,

    /// Prompt interactively for missing required parameters
    #[arg(long)]
    pub interactive: bool,

    /// Target MCP server (local command). Defaults to spawning `showbook serve`.
    #[arg(short = 't', long)]
    pub target: Option<String>,

    /// Output JSON
    #[arg(long)]
    pub json: bool,

    /// Include the raw MCP call result instead of just its payload
    #[arg(long)]
    pub raw: bool,
}

pub fn execute_call(args: CallArgs) -> Result<()> {
    let tool_name = args.tool.trim().to_string();
    if tool_name.is_empty() {
        return output_error(args.json, "tool name cannot be empty");
    }

    let mut provided: HashMap<String, String> = HashMap::new();
    for kv in &args.params {
        let Some((k, v)) = kv.split_once('=') else {
            return output_error(args.json, &format!("invalid --param (expected KEY=VALUE): {kv}"));
        };
        let key = k.trim();
        if key.is_empty() {
            return output_error(args.json, &format!("invalid --param (empty key): {kv}"));
        }
        provided.insert(key.to_string(), v.trim().to_string());
    }

    if let Some(ref pf) = args.param_file
        && let Err(e) = load_param_file_into_map(pf, &mut provided)
    {
        return output_error(args.json, &e.to_string());
    }

    let spec = match &args.target {
        Some(t) => mcp::parse_target(t)
            .with_context(|| format!("Failed to parse target: '{t}'"))?,
        None => TargetSpec::self_serve(None)?,
    };
    let target_display = spec.original().to_string();

    let started = Instant::now();
    let invoked = invoke_tool(&spec, &tool_name, provided, args.interactive);
    let elapsed_ms = started.elapsed().as_millis();

    let (arguments, result) = match invoked {
        Ok(pair) => pair,
        Err(e) => return output_error(args.json, &e.to_string()),
    };
    let result_json = call_result_json(&result);

    if args.json {
        let mut base = serde_json::json!({
            "status": "ok",
            "tool": tool_name,
            "target": target_display,
            "elapsed_ms": elapsed_ms,
            "arguments": arguments,
        });
        if let serde_json::Value::Object(ref mut map) = base {
            if args.raw {
                map.insert("result".to_string(), result_json);
            } else {
                map.insert(
                    "result_summary".to_string(),
                    crate::cmd::shared::result_payload(&result_json)
                        .unwrap_or(serde_json::Value::Null),
                );
            }
        }
        println!(
            "{}",
            serde_json::to_string_pretty(&base).unwrap_or_else(|_| base.to_string())
        );
        return Ok(());
    }

    let style = StyleOptions::detect();
    println!(
        "{}",
        box_header(
            format!("{} Call Success ({tool_name})", emoji("success", &style)),
            Some(format!("target={target_display} • {elapsed_ms} ms")),
            &style,
        )
    );

    if arguments.is_empty() {
        println!(
            "{}",
            color(
                Role::Dim,
                format!("{} No arguments supplied", emoji("info", &style)),
                &style
            )
        );
    } else {
        let mut rows: Vec<Vec<String>> = arguments
            .iter()
            .map(|(k, v)| {
                let v_str = match v {
                    serde_json::Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                vec![k.clone(), v_str]
            })
            .collect();
        rows.sort_by(|a, b| a[0].cmp(&b[0]));
        println!("{}", color(Role::Accent, "Arguments:", &style));
        println!("{}", table(&["NAME", "VALUE"], &rows, &style));
    }

    println!();
    let shown = if args.raw {
        result_json
    } else {
        crate::cmd::shared::result_payload(&result_json).unwrap_or(serde_json::Value::Null)
    };
    println!(
        "{} {}",
        emoji("info", &style),
        color(Role::Accent, "Result:", &style)
    );
    println!(
        "{}",
        serde_json::to_string_pretty(&shown).unwrap_or_else(|_| shown.to_string())
    );
    Ok(())
}

fn invoke_tool(
    spec: &TargetSpec,
    tool_name: &str,
    mut provided: HashMap<String, String>,
    interactive: bool,
) -> Result<(
    serde_json::Map<String, serde_json::Value>,
    rmcp::model::CallToolResult,
)> {
    let rt = tokio::runtime::Runtime::new().context("Failed to create Tokio runtime")?;
    rt.block_on(async {
        let session = McpSession::connect(spec).await?;
        let tools = session.list_tools().await?;

        let tool_obj_val = find_tool_case_insensitive(&tools, tool_name)
            .ok_or_else(|| anyhow::anyhow!("tool '{tool_name}' not found"))?;
        let tool_obj = tool_obj_val
            .as_object()
            .ok_or_else(|| anyhow::anyhow!("tool JSON is not an object"))?;

        if interactive {
            prompt_for_missing_required(tool_obj, &mut provided)?;
        }

        let arg_obj = build_arguments_from_schema(tool_obj, &provided)
            .context("Failed to build arguments")?;

        let call_result = session
            .call_tool(
                tool_name,
                if arg_obj.is_empty() {
                    None
                } else {
                    Some(arg_obj.clone())
                },
            )
            .await?;

        session.shutdown().await;
        Ok((arg_obj, call_result))
    })
}

/// Ask for each required schema parameter that has no value yet.
fn prompt_for_missing_required(
    tool_obj: &serde_json::Map<String, serde_json::Value>,
    provided: &mut HashMap<String, String>,
) -> Result<()> {
    let schema = tool_obj
        .get("input_schema")
        .or_else(|| tool_obj.get("inputSchema"))
        .and_then(|v| v.as_object());
    let Some(schema_obj) = schema else {
        return Ok(());
    };

    let required: std::collections::HashSet<&str> = schema_obj
        .get("required")
        .and_then(|v| v.as_array())
        .map(|arr| arr.iter().filter_map(|x| x.as_str()).collect())
        .unwrap_or_default();

    let props = schema_obj
        .get("properties")
        .and_then(|v| v.as_object())
        .cloned()
        .unwrap_or_default();

    for (pname, pobj) in props {
        if !required.contains(pname.as_str()) || provided.contains_key(&pname) {
            continue;
        }
        let ptype = pobj
            .as_object()
            .and_then(|m| m.get("type"))
            .and_then(|v| v.as_str())
            .unwrap_or("string");
        loop {
            let val = prompt_line(&format!(
                "Enter value for required param '{pname}' (type: {ptype}): "
            ))?;
            if val.is_empty() {
                println!("  (value required)");
                continue;
            }
            provided.insert(pname.clone(), val);
            break;
        }
    }
    Ok(())
}

/// Merge a JSON or YAML parameter file; existing (CLI) keys win.
fn load_param_file_into_map(path: &str, provided: &mut HashMap<String, String>) -> Result<()> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read param file: {path}"))?;
    let lower = path.to_ascii_lowercase();

    let value: serde_json::Value = if lower.ends_with(".yaml") || lower.ends_with(".yml") {
        let yaml_v: serde_yaml::Value =
            serde_yaml::from_str(&raw).context("failed to parse YAML param file")?;
        serde_json::to_value(yaml_v).context("failed to convert YAML to JSON")?
    } else {
        serde_json::from_str(&raw).context("failed to parse JSON param file")?
    };

    let obj = value
        .as_object()
        .ok_or_else(|| anyhow::anyhow!("param file root must be an object"))?;

    for (k, v) in obj {
        if provided.contains_key(k) {
            continue;
        }
        let s = match v {
            serde_json::Value::String(sv) => sv.clone(),
            _ => v.to_string(),
        };
        provided.insert(k.clone(), s);
    }
    Ok(())
}

fn output_error(json: bool, msg: &str) -> Result<()> {
    if json {
        let err = serde_json::json!({ "status": "error", "error": msg });
        println!(
            "{}",
            serde_json::to_string_pretty(&err).unwrap_or_else(|_| err.to_string())
        );
    } else {
        let style = StyleOptions::detect();
        println!(
            "{}",
            box_header(
                format!("{} Call Error", emoji("error", &style)),
                Some(color(Role::Error, msg, &style)),
                &style,
            )
        );
    }
    anyhow::bail!(msg.to_string())
}
