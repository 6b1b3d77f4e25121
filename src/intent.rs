//! Intent envelope handling for the assistant loop.
//!
//! The LLM is asked for strict JSON `{"intent": ..., "parameters": {...}}`
//! but its output is untrusted: fences are stripped, the intent name is
//! matched case-insensitively against the known set, and missing mandatory
//! parameters are detected so the caller can slot-fill them interactively.

use std::fmt;

use serde::Deserialize;
use serde_json::{Map, Value};

/// The three operations the assistant can dispatch.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum Intent {
    ListMovies,
    GetShowtimes,
    BookTicket,
}

impl Intent {
    /// Case-insensitive parser; returns None for anything outside the set.
    pub fn from_str_ci(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "list_movies" => Some(Intent::ListMovies),
            "get_showtimes" => Some(Intent::GetShowtimes),
            "book_ticket" => Some(Intent::BookTicket),
            _ => None,
        }
    }

    /// Tool name on the wire (matches the server's tool registry).
    pub fn tool_name(&self) -> &'static str {
        match self {
            Intent::ListMovies => "list_movies",
            Intent::GetShowtimes => "get_showtimes",
            Intent::BookTicket => "book_ticket",
        }
    }

    /// Parameters the chat flow insists on before dispatch. The server treats
    /// `location` as optional, but the assistant always asks for a city.
    pub fn required_params(&self) -> &'static [&'static str] {
        match self {
            Intent::ListMovies => &["location"],
            Intent::GetShowtimes => &["movie_name", "location"],
            Intent::BookTicket => &["show_id", "seats"],
        }
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tool_name())
    }
}

/// Raw `{intent, parameters}` object as produced by the LLM.
#[derive(Debug, Deserialize)]
pub struct IntentEnvelope {
    pub intent: Option<String>,
    #[serde(default, alias = "params")]
    pub parameters: Map<String, Value>,
}

/// Remove a Markdown code fence (```json ... ```) wrapping, if present.
pub fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    if !trimmed.starts_with("```") {
        return trimmed;
    }
    // Drop the opening fence line (``` or ```json), then a trailing ```.
    let rest = match trimmed.find('\n') {
        Some(idx) => &trimmed[idx + 1..],
        None => return trimmed,
    };
    rest.trim().strip_suffix("```").unwrap_or(rest).trim()
}

/// Parse the LLM output into an envelope. Fences are stripped first; any
/// JSON error is surfaced to the caller (who reports and re-prompts).
pub fn parse_envelope(raw: &str) -> Result<IntentEnvelope, serde_json::Error> {
    serde_json::from_str(strip_code_fences(raw))
}

/// Mandatory parameters still missing from `params`. Null, empty string and
/// empty array all count as missing.
pub fn missing_params(intent: Intent, params: &Map<String, Value>) -> Vec<&'static str> {
    intent
        .required_params()
        .iter()
        .copied()
        .filter(|name| match params.get(*name) {
            None | Some(Value::Null) => true,
            Some(Value::String(s)) => s.trim().is_empty(),
            Some(Value::Array(a)) => a.is_empty(),
            Some(_) => false,
        })
        .collect()
}
