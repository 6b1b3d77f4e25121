//! Command dispatcher: one module per subcommand, each exposing a single
//! `execute_*` function returning `anyhow::Result<()>`, plus shared helpers
//! and human-output formatting.

pub mod call;
pub mod chat;
pub mod format;
pub mod serve;
pub mod shared;
pub mod tools;

pub use call::{CallArgs, execute_call};
pub use chat::{ChatArgs, execute_chat};
pub use serve::{ServeArgs, execute_serve};
pub use tools::{ToolsArgs, execute_tools};
