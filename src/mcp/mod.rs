//! MCP target parsing and client session plumbing.
//!
//! A target is either a local command line (spawned as a child process and
//! spoken to over stdio) or a remote URL. Only local targets are supported;
//! URLs parse cleanly so the error the user sees names the real problem.

use anyhow::{Context, Result, bail};
use rmcp::{
    ServiceExt,
    model::{CallToolRequestParam, CallToolResult},
    service::{RoleClient, RunningService},
    transport::{ConfigureCommandExt, TokioChildProcess},
};
use shell_words::split as shell_split;
use std::fmt;
use tokio::process::Command;
use url::Url;

use crate::log_debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetKind {
    LocalProcess,
    RemoteHttp,
    RemoteWs,
    Unknown,
}

/// A parsed representation of a user-supplied target string. Keeps the
/// original input for diagnostics.
#[derive(Debug, Clone)]
pub enum TargetSpec {
    /// A local server process to be spawned: command plus arguments.
    LocalCommand {
        original: String,
        program: String,
        args: Vec<String>,
    },
    /// Remote endpoint given as an http(s)/ws(s) URL.
    RemoteUrl { original: String, url: Url },
}

impl TargetSpec {
    pub fn original(&self) -> &str {
        match self {
            TargetSpec::LocalCommand { original, .. } => original,
            TargetSpec::RemoteUrl { original, .. } => original,
        }
    }

    pub fn kind(&self) -> TargetKind {
        match self {
            TargetSpec::LocalCommand { .. } => TargetKind::LocalProcess,
            TargetSpec::RemoteUrl { url, .. } => match url.scheme() {
                "http" | "https" => TargetKind::RemoteHttp,
                "ws" | "wss" => TargetKind::RemoteWs,
                _ => TargetKind::Unknown,
            },
        }
    }

    pub fn is_local(&self) -> bool {
        matches!(self.kind(), TargetKind::LocalProcess)
    }

    /// Target that spawns this same binary's `serve` subcommand, optionally
    /// pointing it at a specific dataset file.
    pub fn self_serve(data: Option<&str>) -> Result<Self> {
        let exe = std::env::current_exe().context("failed to resolve current executable")?;
        let program = exe.to_string_lossy().into_owned();
        let mut args = vec!["serve".to_string()];
        if let Some(path) = data {
            args.push("--data".to_string());
            args.push(path.to_string());
        }
        let original = format!("{program} {}", args.join(" "));
        Ok(TargetSpec::LocalCommand {
            original,
            program,
            args,
        })
    }
}

impl fmt::Display for TargetSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetSpec::LocalCommand { program, args, .. } => {
                if args.is_empty() {
                    write!(f, "local: {}", program)
                } else {
                    write!(f, "local: {} {}", program, args.join(" "))
                }
            }
            TargetSpec::RemoteUrl { url, .. } => write!(f, "remote: {}", url),
        }
    }
}

/// Parse a `--target` value into a structured `TargetSpec`.
///
/// Strategy:
/// 1. Try URL parsing; scheme in {http, https, ws, wss} means remote.
/// 2. Otherwise split as a local command line with shell-style rules.
/// 3. Reject empty input.
pub fn parse_target(raw: &str) -> Result<TargetSpec> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        bail!("Target string is empty");
    }

    if let Ok(url) = Url::parse(trimmed) {
        match url.scheme() {
            "http" | "https" | "ws" | "wss" => {
                return Ok(TargetSpec::RemoteUrl {
                    original: raw.to_string(),
                    url,
                });
            }
            _ => {
                // Non-MCP scheme; fall through to command parsing.
            }
        }
    }

    let parts =
        shell_split(trimmed).context("Failed to parse local command line (shell splitting)")?;
    if parts.is_empty() {
        bail!("No tokens produced when parsing local command target");
    }
    let program = parts[0].clone();
    if program.is_empty() {
        bail!("Empty program name in local command target");
    }
    Ok(TargetSpec::LocalCommand {
        original: raw.to_string(),
        program,
        args: parts[1..].to_vec(),
    })
}

/// An initialized MCP client session against a spawned local server.
pub struct McpSession {
    service: RunningService<RoleClient, ()>,
}

impl McpSession {
    /// Spawn the target process and complete the MCP handshake. Remote
    /// targets are rejected here rather than at parse time.
    pub async fn connect(spec: &TargetSpec) -> Result<Self> {
        let (program, args) = match spec {
            TargetSpec::LocalCommand { program, args, .. } => (program.clone(), args.clone()),
            TargetSpec::RemoteUrl { .. } => {
                bail!("remote targets are not supported; give a local server command")
            }
        };

        let service = ()
            .serve(TokioChildProcess::new(Command::new(&program).configure(
                |c| {
                    for a in &args {
                        c.arg(a);
                    }
                    // Child stderr stays silent; stdout carries the protocol.
                    c.stderr(std::process::Stdio::null());
                },
            ))?)
            .await
            .with_context(|| format!("Failed to spawn & initialize MCP service: '{spec}'"))?;

        log_debug!("connected: {}", spec);
        Ok(Self { service })
    }

    /// Enumerate the server's tools as raw JSON objects.
    pub async fn list_tools(&self) -> Result<Vec<serde_json::Value>> {
        let resp = self
            .service
            .list_tools(Default::default())
            .await
            .context("Failed to list tools from MCP service")?;
        let val = serde_json::to_value(&resp).unwrap_or(serde_json::Value::Null);
        Ok(val
            .get("tools")
            .and_then(|v| v.as_array())
            .map(|arr| arr.to_vec())
            .unwrap_or_default())
    }

    pub async fn call_tool(
        &self,
        name: &str,
        arguments: Option<serde_json::Map<String, serde_json::Value>>,
    ) -> Result<CallToolResult> {
        self.service
            .call_tool(CallToolRequestParam {
                name: name.to_string().into(),
                arguments,
            })
            .await
            .with_context(|| format!("tool invocation failed: {name}"))
    }

    /// Graceful shutdown attempt; failures are ignored.
    pub async fn shutdown(self) {
        let _ = self.service.cancel().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_remote_http() {
        let spec = parse_target("https://example.com/mcp").unwrap();
        assert!(!spec.is_local());
        assert!(matches!(spec.kind(), TargetKind::RemoteHttp));
    }

    #[test]
    fn parse_remote_ws() {
        let spec = parse_target("wss://mcp.example/ws").unwrap();
        assert!(matches!(spec.kind(), TargetKind::RemoteWs));
    }

    #[test]
    fn parse_local_simple() {
        let spec = parse_target("showbook serve").unwrap();
        assert!(spec.is_local());
        if let TargetSpec::LocalCommand { program, args, .. } = spec {
            assert_eq!(program, "showbook");
            assert_eq!(args, vec!["serve"]);
        } else {
            panic!("Expected LocalCommand variant");
        }
    }

    #[test]
    fn parse_local_quoted() {
        let spec = parse_target(r#"showbook serve --data "/tmp/my data.json""#).unwrap();
        if let TargetSpec::LocalCommand { args, .. } = spec {
            assert_eq!(args, vec!["serve", "--data", "/tmp/my data.json"]);
        } else {
            panic!("Expected LocalCommand variant");
        }
    }

    #[test]
    fn url_with_unknown_scheme_falls_back_to_command() {
        let spec = parse_target("ftp://example.com/resource").unwrap();
        assert!(spec.is_local(), "Unknown scheme should fall back to local");
    }

    #[test]
    fn empty_target_rejected() {
        let err = parse_target("   ").unwrap_err();
        assert!(err.to_string().contains("empty"));
    }

    #[test]
    fn self_serve_includes_data_flag() {
        let spec = TargetSpec::self_serve(Some("/tmp/data.json")).unwrap();
        if let TargetSpec::LocalCommand { args, .. } = spec {
            assert_eq!(args, vec!["serve", "--data", "/tmp/data.json"]);
        } else {
            panic!("Expected LocalCommand variant");
        }
    }
}
