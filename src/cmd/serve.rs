//! `serve` subcommand: run the booking tool service over MCP stdio.

use anyhow::{Context, Result};
use clap::Args;
use rmcp::ServiceExt;

use crate::server::{BookingService, store::MovieStore};
use crate::{log_debug, log_info};

pub const DEFAULT_DATA_PATH: &str = "movies_data/data.json";

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Dataset JSON path (falls back to SHOWBOOK_DATA, then movies_data/data.json)
    #[arg(long, value_name = "PATH")]
    pub data: Option<String>,
}

/// Resolve the dataset path: flag > SHOWBOOK_DATA env > default.
pub fn resolve_data_path(flag: Option<String>) -> String {
    flag.or_else(|| {
        std::env::var("SHOWBOOK_DATA")
            .ok()
            .filter(|s| !s.trim().is_empty())
    })
    .unwrap_or_else(|| DEFAULT_DATA_PATH.to_string())
}

pub fn execute_serve(args: ServeArgs) -> Result<()> {
    let path = resolve_data_path(args.data);
    // Load failure is fatal: a tool server without its dataset is useless.
    let store = MovieStore::load(&path)?;
    log_info!("serving booking tools over stdio, dataset: {path}");

    let rt = tokio::runtime::Runtime::new().context("Failed to create Tokio runtime")?;
    rt.block_on(async {
        let service = BookingService::new(store)
            .serve(rmcp::transport::io::stdio())
            .await
            .context("Failed to start MCP stdio service")?;
        service.waiting().await.context("MCP service terminated")?;
        log_debug!("stdio service closed");
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_path_prefers_flag() {
        assert_eq!(
            resolve_data_path(Some("/tmp/x.json".into())),
            "/tmp/x.json"
        );
    }

    #[test]
    fn data_path_defaults() {
        // SHOWBOOK_DATA is unlikely to be set in the test environment; the
        // flag-less fallthrough lands on the default path either way when
        // it's absent.
        if std::env::var("SHOWBOOK_DATA").is_err() {
            assert_eq!(resolve_data_path(None), DEFAULT_DATA_PATH);
        }
    }
}
