//! `chat` subcommand: the interactive booking assistant.
//!
//! Loop: read a line, send it through the LLM intent extractor, slot-fill
//! missing parameters from stdin, dispatch the matching tool over one MCP
//! session, and render the result. After a successful get_showtimes the
//! assistant offers to book one of the listed shows. Transient LLM and MCP
//! failures are retried a bounded number of times; a failed turn never ends
//! the loop, only `exit` / `quit` does.

use anyhow::{Context, Result};
use clap::Args;
use serde_json::{Map, Value};
use std::time::Duration;

use crate::cmd::format::{Role, StyleOptions, box_header, color, emoji, table};
use crate::cmd::shared::{call_result_json, prompt_line, result_is_error, result_payload};
use crate::intent::{self, Intent};
use crate::llm::{IntentExtractor, LlmConfig};
use crate::log_debug;
use crate::mcp::{self, McpSession, TargetSpec};

const MAX_ATTEMPTS: u32 = 3;
const RETRY_DELAY: Duration = Duration::from_secs(2);

#[derive(Args, Debug)]
pub struct ChatArgs {
    /// Target MCP server (local command). Defaults to spawning `showbook serve`.
    #[arg(short = 't', long)]
    pub target: Option<String>,

    /// Dataset path handed to the self-spawned server (default target only)
    #[arg(long, value_name = "PATH")]
    pub data: Option<String>,
}

pub fn execute_chat(args: ChatArgs) -> Result<()> {
    let extractor = IntentExtractor::new(LlmConfig::from_env()?)?;

    let spec = match &args.target {
        Some(t) => mcp::parse_target(t)
            .with_context(|| format!("Failed to parse target: '{t}'"))?,
        None => TargetSpec::self_serve(args.data.as_deref())?,
    };

    let rt = tokio::runtime::Runtime::new().context("Failed to create Tokio runtime")?;
    rt.block_on(run_loop(extractor, spec))
}

async fn run_loop(extractor: IntentExtractor, spec: TargetSpec) -> Result<()> {
    let style = StyleOptions::detect();
    let session = McpSession::connect(&spec).await?;

    println!(
        "{}",
        box_header(
            format!("{} Movie Booking Assistant", emoji("movie", &style)),
            Some("type 'exit' to quit"),
            &style,
        )
    );

    loop {
        let user = match prompt_line("You: ") {
            Ok(line) => line,
            Err(_) => break, // stdin closed
        };
        if user.is_empty() {
            continue;
        }
        if user.eq_ignore_ascii_case("exit") || user.eq_ignore_ascii_case("quit") {
            break;
        }

        run_turn(&extractor, &session, &style, &user).await;
    }

    session.shutdown().await;
    Ok(())
}

/// One conversational turn. Failures are printed, never propagated; the
/// caller keeps looping.
async fn run_turn(
    extractor: &IntentExtractor,
    session: &McpSession,
    style: &StyleOptions,
    user: &str,
) {
    let raw = match extract_with_retries(extractor, user).await {
        Ok(raw) => raw,
        Err(e) => {
            print_error(style, &format!("intent extraction failed: {e}"));
            return;
        }
    };

    let envelope = match intent::parse_envelope(&raw) {
        Ok(env) => env,
        Err(_) => {
            print_error(style, "the model did not return valid JSON; please rephrase");
            log_debug!("non-JSON completion: {raw}");
            return;
        }
    };

    let Some(name) = envelope.intent.as_deref().filter(|s| !s.trim().is_empty()) else {
        print_warn(style, "no intent recognized");
        return;
    };
    let Some(intent) = Intent::from_str_ci(name) else {
        print_warn(style, &format!("intent not recognized: {name}"));
        return;
    };

    println!(
        "{} detected intent: {}",
        emoji("success", style),
        color(Role::Accent, intent.tool_name(), style)
    );

    let mut params = envelope.parameters;
    normalize_seats(&mut params);
    if fill_missing_params(intent, &mut params).is_err() {
        return; // stdin closed mid-prompt
    }

    let Some(payload) = dispatch(session, style, intent, params).await else {
        return;
    };

    if intent == Intent::GetShowtimes {
        offer_booking(session, style, &payload).await;
    }
}

/// Call the LLM, retrying transient failures.
async fn extract_with_retries(extractor: &IntentExtractor, user: &str) -> Result<String> {
    let mut last_err = None;
    for attempt in 1..=MAX_ATTEMPTS {
        match extractor.extract(user).await {
            Ok(raw) => return Ok(raw),
            Err(e) => {
                eprintln!("attempt {attempt}/{MAX_ATTEMPTS} failed: {e}");
                last_err = Some(e);
                if attempt < MAX_ATTEMPTS {
                    tokio::time::sleep(RETRY_DELAY).await;
                }
            }
        }
    }
    Err(last_err.expect("at least one attempt ran").into())
}

/// Invoke the tool with retries and render the result. Returns the parsed
/// success payload, or None when the call failed or errored.
async fn dispatch(
    session: &McpSession,
    style: &StyleOptions,
    intent: Intent,
    params: Map<String, Value>,
) -> Option<Value> {
    println!(
        "{} calling {} with {}",
        emoji("tool", style),
        intent.tool_name(),
        color(Role::Dim, Value::Object(params.clone()).to_string(), style)
    );

    let mut last_err = None;
    for attempt in 1..=MAX_ATTEMPTS {
        match session.call_tool(intent.tool_name(), Some(params.clone())).await {
            Ok(result) => {
                let result_json = call_result_json(&result);
                let payload = result_payload(&result_json).unwrap_or(Value::Null);
                if result_is_error(&result_json) {
                    print_error(style, &describe_tool_error(&payload));
                    return None;
                }
                render_payload(style, intent, &payload);
                return Some(payload);
            }
            Err(e) => {
                eprintln!("attempt {attempt}/{MAX_ATTEMPTS} failed: {e}");
                last_err = Some(e);
                if attempt < MAX_ATTEMPTS {
                    tokio::time::sleep(RETRY_DELAY).await;
                }
            }
        }
    }
    if let Some(e) = last_err {
        print_error(style, &format!("tool call failed after retries: {e}"));
    }
    None
}

/// Prompt for every missing mandatory parameter, merging answers in place.
/// Errors only when stdin is gone.
fn fill_missing_params(intent: Intent, params: &mut Map<String, Value>) -> Result<()> {
    loop {
        let missing = intent::missing_params(intent, params);
        let Some(need) = missing.first() else {
            return Ok(());
        };
        let label = match *need {
            "location" => "City (e.g. Delhi/Mumbai/Bengaluru): ",
            "movie_name" => "Which movie?: ",
            "show_id" => "Enter show_id to book: ",
            "seats" => "How many seats?: ",
            other => {
                // No custom wording for exotic parameters.
                println!("Provide {other}:");
                ""
            }
        };
        let val = prompt_line(label)?;
        if val.is_empty() {
            println!("  (value required)");
            continue;
        }
        if *need == "seats" {
            match val.parse::<i64>() {
                Ok(n) if n > 0 => {
                    params.insert("seats".into(), Value::Number(n.into()));
                }
                _ => println!("Please enter a valid number of seats."),
            }
            continue;
        }
        params.insert((*need).to_string(), Value::String(val));
    }
}

/// The LLM sometimes emits seats as a string; the tool schema wants a number.
fn normalize_seats(params: &mut Map<String, Value>) {
    let parsed = match params.get("seats") {
        Some(Value::String(s)) => s.trim().parse::<i64>().ok(),
        _ => None,
    };
    if let Some(n) = parsed {
        params.insert("seats".into(), Value::Number(n.into()));
    }
}

/// After showtimes were listed, offer the fixed booking follow-up.
async fn offer_booking(session: &McpSession, style: &StyleOptions, payload: &Value) {
    let has_shows = payload
        .get("showtimes")
        .and_then(|v| v.as_array())
        .is_some_and(|a| !a.is_empty());
    if !has_shows {
        return;
    }

    let answer = match prompt_line(&format!(
        "{} Would you like to book tickets for one of these shows? (yes/no): ",
        emoji("ticket", style)
    )) {
        Ok(a) => a,
        Err(_) => return,
    };
    if !answer.eq_ignore_ascii_case("yes") {
        return;
    }

    let mut params = Map::new();
    if fill_missing_params(Intent::BookTicket, &mut params).is_err() {
        return;
    }
    let _ = dispatch(session, style, Intent::BookTicket, params).await;
}

fn describe_tool_error(payload: &Value) -> String {
    payload
        .get("error")
        .and_then(|e| e.get("message"))
        .and_then(|m| m.as_str())
        .map(str::to_string)
        .unwrap_or_else(|| format!("tool reported an error: {payload}"))
}

/// Render a success payload per intent (movies table, showtimes table, or
/// booking confirmation).
fn render_payload(style: &StyleOptions, intent: Intent, payload: &Value) {
    match intent {
        Intent::ListMovies => {
            let movies = payload
                .get("movies")
                .and_then(|v| v.as_array())
                .cloned()
                .unwrap_or_default();
            if movies.is_empty() {
                println!("{} No movies found.", emoji("movie", style));
                return;
            }
            println!("{} Movies:", emoji("movie", style));
            let rows: Vec<Vec<String>> = movies
                .iter()
                .map(|m| {
                    vec![
                        str_field(m, "movie_id"),
                        str_field(m, "name"),
                        str_field(m, "genre"),
                        str_field(m, "location"),
                    ]
                })
                .collect();
            println!("{}", table(&["ID", "NAME", "GENRE", "LOCATION"], &rows, style));
        }
        Intent::GetShowtimes => {
            let shows = payload
                .get("showtimes")
                .and_then(|v| v.as_array())
                .cloned()
                .unwrap_or_default();
            if shows.is_empty() {
                println!("{} No showtimes found.", emoji("masks", style));
                return;
            }
            println!("{} Showtimes:", emoji("masks", style));
            let rows: Vec<Vec<String>> = shows
                .iter()
                .map(|s| {
                    let avail = s.pointer("/seats/available").and_then(|v| v.as_u64());
                    let total = s.pointer("/seats/total").and_then(|v| v.as_u64());
                    let seats = match (avail, total) {
                        (Some(a), Some(t)) => format!("{a}/{t}"),
                        _ => "?".to_string(),
                    };
                    vec![
                        str_field(s, "show_id"),
                        str_field(s, "time"),
                        str_field(s, "theatre_name"),
                        str_field(s, "location"),
                        seats,
                    ]
                })
                .collect();
            println!(
                "{}",
                table(&["SHOW", "TIME", "THEATRE", "LOCATION", "SEATS"], &rows, style)
            );
        }
        Intent::BookTicket => {
            let message = payload
                .get("message")
                .and_then(|v| v.as_str())
                .unwrap_or("booking confirmed");
            let remaining = payload.get("remaining").and_then(|v| v.as_u64());
            let line = match remaining {
                Some(r) => format!("{message} ({r} seats remaining)"),
                None => message.to_string(),
            };
            println!(
                "{} {}",
                emoji("ticket", style),
                color(Role::Success, line, style)
            );
        }
    }
}

fn str_field(obj: &Value, key: &str) -> String {
    obj.get(key)
        .and_then(|v| v.as_str())
        .unwrap_or("?")
        .to_string()
}

fn print_error(style: &StyleOptions, msg: &str) {
    println!("{} {}", emoji("error", style), color(Role::Error, msg, style));
}

fn print_warn(style: &StyleOptions, msg: &str) {
    println!("{} {}", emoji("warn", style), color(Role::Warning, msg, style));
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn normalize_seats_parses_numeric_strings() {
        let mut params = json!({"show_id": "show001", "seats": "2"})
            .as_object()
            .cloned()
            .unwrap();
        normalize_seats(&mut params);
        assert_eq!(params["seats"], json!(2));
    }

    #[test]
    fn normalize_seats_leaves_garbage_alone() {
        let mut params = json!({"seats": "two"}).as_object().cloned().unwrap();
        normalize_seats(&mut params);
        assert_eq!(params["seats"], json!("two"));
    }

    #[test]
    fn tool_error_message_extraction() {
        let payload = json!({"error": {"kind": "capacity_exceeded", "message": "only 3 seats available"}});
        assert_eq!(describe_tool_error(&payload), "only 3 seats available");
        let odd = json!({"weird": true});
        assert!(describe_tool_error(&odd).contains("tool reported an error"));
    }
}
