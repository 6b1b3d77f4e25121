//! Shared helpers for the subcommands: stdin prompting, schema-driven
//! argument building with primitive coercion, and call-result unwrapping.

use anyhow::Result;
use rmcp::model::CallToolResult;
use serde_json::Value;
use std::collections::HashMap;
use std::io::{self, Write};

/// Print a prompt, flush, and read one trimmed line from stdin.
pub fn prompt_line(label: &str) -> io::Result<String> {
    print!("{label}");
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().read_line(&mut line)?;
    Ok(line.trim().to_string())
}

/// Find a tool by case-insensitive name in a list of raw tool objects.
pub fn find_tool_case_insensitive(tools: &[Value], name: &str) -> Option<Value> {
    tools.iter().find_map(|t| {
        t.get("name")
            .and_then(|v| v.as_str())
            .filter(|n| n.eq_ignore_ascii_case(name))
            .map(|_| t.clone())
    })
}

/// Build a JSON argument object from a tool's input schema.
///
/// - `provided` holds raw string values (CLI flags, files, interactive input).
/// - Each declared property is coerced per its `"type"`:
///   integer | number | boolean | array | (default string).
/// - Extra keys not in the schema pass through as strings.
/// - Errors when a required parameter is missing.
pub fn build_arguments_from_schema(
    tool_obj: &serde_json::Map<String, Value>,
    provided: &HashMap<String, String>,
) -> Result<serde_json::Map<String, Value>> {
    let schema = tool_obj
        .get("input_schema")
        .or_else(|| tool_obj.get("inputSchema"))
        .and_then(|v| v.as_object());
    let mut result = serde_json::Map::new();

    let required: std::collections::HashSet<&str> = schema
        .and_then(|s| s.get("required"))
        .and_then(|v| v.as_array())
        .map(|arr| arr.iter().filter_map(|x| x.as_str()).collect())
        .unwrap_or_default();

    let mut remaining = provided.clone();

    if let Some(props) = schema
        .and_then(|s| s.get("properties"))
        .and_then(|v| v.as_object())
    {
        for (pname, pobj) in props {
            let ptype = pobj
                .as_object()
                .and_then(|m| m.get("type"))
                .and_then(|v| v.as_str())
                .unwrap_or("string");
            if let Some(raw_v) = remaining.remove(pname) {
                result.insert(pname.clone(), coerce_value(&raw_v, ptype));
            } else if required.contains(pname.as_str()) {
                anyhow::bail!("missing required parameter: {}", pname);
            }
        }
    }

    for (k, v) in remaining {
        result.insert(k, Value::String(v));
    }

    Ok(result)
}

/// Coerce a raw string into a JSON value using a primitive type hint.
pub fn coerce_value(raw: &str, type_hint: &str) -> Value {
    match type_hint {
        "integer" => raw
            .parse::<i64>()
            .map(|n| Value::Number(n.into()))
            .unwrap_or_else(|_| Value::String(raw.to_string())),
        "number" => raw
            .parse::<f64>()
            .ok()
            .and_then(serde_json::Number::from_f64)
            .map(Value::Number)
            .unwrap_or_else(|| Value::String(raw.to_string())),
        "boolean" => match raw.to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" | "y" => Value::Bool(true),
            "false" | "0" | "no" | "n" => Value::Bool(false),
            _ => Value::String(raw.to_string()),
        },
        "array" => Value::Array(
            raw.split(',')
                .map(|s| Value::String(s.trim().to_string()))
                .collect(),
        ),
        _ => Value::String(raw.to_string()),
    }
}

/// Serialize a call result to JSON (small stub when serialization fails).
pub fn call_result_json(result: &CallToolResult) -> Value {
    serde_json::to_value(result)
        .unwrap_or_else(|_| serde_json::json!({ "note": "unable to serialize result" }))
}

/// Whether a serialized call result is flagged as a tool error.
pub fn result_is_error(result_json: &Value) -> bool {
    result_json
        .get("isError")
        .and_then(|v| v.as_bool())
        .unwrap_or(false)
}

/// Extract the first text content block from a serialized call result and
/// parse it as JSON. Falls back to a plain string value for non-JSON text.
pub fn result_payload(result_json: &Value) -> Option<Value> {
    let text = result_json
        .get("content")?
        .as_array()?
        .iter()
        .find_map(|c| c.get("text").and_then(|t| t.as_str()))?;
    Some(serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn coerce_integer() {
        assert_eq!(coerce_value("42", "integer"), json!(42));
        assert_eq!(
            coerce_value("x42", "integer"),
            json!("x42"),
            "invalid integer remains string"
        );
    }

    #[test]
    fn coerce_boolean() {
        assert_eq!(coerce_value("true", "boolean"), json!(true));
        assert_eq!(coerce_value("No", "boolean"), json!(false));
        assert_eq!(coerce_value("maybe", "boolean"), json!("maybe"));
    }

    #[test]
    fn coerce_array() {
        assert_eq!(coerce_value("a,b, c", "array"), json!(["a", "b", "c"]));
    }

    #[test]
    fn build_arguments_basic() {
        let tool_obj = json!({
            "name": "book_ticket",
            "input_schema": {
                "type": "object",
                "required": ["show_id", "seats"],
                "properties": {
                    "show_id": { "type": "string" },
                    "seats": { "type": "integer" },
                    "user_id": { "type": "string" }
                }
            }
        })
        .as_object()
        .cloned()
        .unwrap();

        let mut provided = HashMap::new();
        provided.insert("show_id".into(), "show001".into());
        provided.insert("seats".into(), "2".into());

        let args = build_arguments_from_schema(&tool_obj, &provided).unwrap();
        assert_eq!(args.get("show_id"), Some(&json!("show001")));
        assert_eq!(args.get("seats"), Some(&json!(2)));
        assert!(!args.contains_key("user_id"));
    }

    #[test]
    fn build_arguments_missing_required() {
        let tool_obj = json!({
            "name": "book_ticket",
            "input_schema": {
                "type": "object",
                "required": ["show_id"],
                "properties": { "show_id": { "type": "string" } }
            }
        })
        .as_object()
        .cloned()
        .unwrap();

        let err = build_arguments_from_schema(&tool_obj, &HashMap::new()).unwrap_err();
        assert!(err.to_string().contains("missing required parameter"));
    }

    #[test]
    fn build_arguments_passthrough_extra_keys() {
        let tool_obj = json!({ "name": "ping" }).as_object().cloned().unwrap();
        let mut provided = HashMap::new();
        provided.insert("note".into(), "hello".into());
        let args = build_arguments_from_schema(&tool_obj, &provided).unwrap();
        assert_eq!(args.get("note"), Some(&json!("hello")));
    }

    #[test]
    fn find_tool_ignores_case() {
        let tools = vec![json!({"name": "List_Movies"}), json!({"name": "ping"})];
        let t = find_tool_case_insensitive(&tools, "list_movies").unwrap();
        assert_eq!(t["name"], "List_Movies");
        assert!(find_tool_case_insensitive(&tools, "nope").is_none());
    }

    #[test]
    fn result_payload_parses_embedded_json() {
        let result_json = json!({
            "content": [ { "type": "text", "text": "{\"remaining\":40}" } ],
            "isError": false
        });
        assert!(!result_is_error(&result_json));
        let payload = result_payload(&result_json).unwrap();
        assert_eq!(payload["remaining"], 40);
    }

    #[test]
    fn result_payload_falls_back_to_string() {
        let result_json = json!({ "content": [ { "type": "text", "text": "pong" } ] });
        assert_eq!(result_payload(&result_json).unwrap(), json!("pong"));
    }
}
