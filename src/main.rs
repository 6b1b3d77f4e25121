use anyhow::Result;
use clap::{Parser, Subcommand};

mod cmd;
mod intent;
mod llm;
mod mcp;
mod server;
mod utils;

use cmd::{CallArgs, ChatArgs, ServeArgs, ToolsArgs};

/// showbook - movie booking MCP demo
///
/// Commands:
///   showbook serve                 Run the booking tool server over MCP stdio
///   showbook chat                  Interactive LLM-driven booking assistant
///   showbook tools [--json]       List the tools a target server exposes
///   showbook call <tool> [...]     Invoke a single tool directly
///
/// Global flags / env:
///   -v / -vv        Increase verbosity
///   -q / --quiet    Errors only
///   MCP_TARGET      Default target command for chat/tools/call
///                   (overridden by their -t/--target flag)
///
/// LLM configuration (chat): DEEPSEEK_API_KEY, DEEPSEEK_MODEL,
/// DEEPSEEK_API_BASE; a .env file in the working directory is honored.
/// Dataset: --data flag on `serve`/`chat`, or SHOWBOOK_DATA.
///
/// Examples:
///   showbook chat
///   showbook tools --json
///   showbook call book_ticket --param show_id=show001 --param seats=2
///   showbook chat -t "python3 mcp_server.py"
#[derive(Parser, Debug)]
#[command(
    name = "showbook",
    version,
    author,
    about = "Movie booking demo: MCP tool server + LLM booking assistant",
    propagate_version = true,
    disable_help_subcommand = true
)]
pub struct Cli {
    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Silence all non-error output
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the booking tool server over MCP stdio
    Serve(ServeArgs),

    /// Interactive booking assistant (LLM intent extraction + tool calls)
    Chat(ChatArgs),

    /// List the tools a target MCP server exposes
    Tools(ToolsArgs),

    /// Invoke a single tool on the target server
    Call(CallArgs),
}

fn main() -> Result<()> {
    // Pick up DEEPSEEK_* and friends from a .env file if present.
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let level = utils::derive_level(cli.verbose, cli.quiet);
    utils::init_logging(level);

    // Env-level default target for the client subcommands
    let global_target = std::env::var("MCP_TARGET")
        .ok()
        .filter(|s| !s.trim().is_empty());

    // Validate if present
    if let Some(t) = &global_target
        && let Err(e) = mcp::parse_target(t)
    {
        eprintln!("Invalid target '{}': {e}", t);
        std::process::exit(2);
    }

    match cli.command {
        Commands::Serve(args) => cmd::execute_serve(args),
        Commands::Chat(mut args) => {
            if args.target.is_none() {
                args.target = global_target.clone();
            }
            cmd::execute_chat(args)
        }
        Commands::Tools(mut args) => {
            if args.target.is_none() {
                args.target = global_target.clone();
            }
            cmd::execute_tools(args)
        }
        Commands::Call(mut args) => {
            if args.target.is_none() {
                args.target = global_target.clone();
            }
            cmd::execute_call(args)
        }
    }
}
