//! Command-line interface.

mod repl;

pub use repl::{ReplCommand, run_repl};

use clap::{Args, Parser, Subcommand};

use crate::agent::GroundingAgent;
use crate::config::HttpConfig;

/// Two-stage Gemini agent with tools and web-search grounding.
#[derive(Parser, Debug)]
#[command(name = "grounding-agent", version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Interactive chat (the default)
    Chat {
        /// Start with Google Search grounding disabled
        #[arg(long)]
        no_search: bool,
    },

    /// Answer a single query and exit
    Ask(AskArgs),

    /// Local web server: `/`, `/health` and `/api/agent`
    Serve(ServeArgs),

    /// Serverless-style function handler: `/api/agent` only
    Function(ServeArgs),

    /// Tool-call adapter over HTTP: `/`, `/health`, `/tools` and `POST /mcp`
    McpHttp(ServeArgs),

    /// Tool-call adapter as an MCP server on stdin/stdout
    Mcp,
}

#[derive(Args, Debug, Clone)]
pub struct AskArgs {
    /// The question to answer
    #[arg(required = true, num_args = 1..)]
    pub query: Vec<String>,

    /// Disable Google Search grounding
    #[arg(long)]
    pub no_search: bool,

    /// Return the grounded answer without the refinement pass
    #[arg(long)]
    pub skip_refinement: bool,

    /// Print the full result as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug, Clone)]
pub struct ServeArgs {
    /// Address to bind
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port to listen on
    #[arg(long, short, env = "PORT", default_value_t = 8080)]
    pub port: u16,
}

impl From<ServeArgs> for HttpConfig {
    fn from(args: ServeArgs) -> Self {
        HttpConfig {
            host: args.host,
            port: args.port,
        }
    }
}

/// Run a one-shot query and print the answer.
pub async fn run_ask(agent: &GroundingAgent, args: AskArgs) -> anyhow::Result<()> {
    let query = args.query.join(" ");
    let result = agent
        .process_query(&query, !args.no_search, args.skip_refinement)
        .await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!("{}", result.render_summary());
    }

    if let Some(error) = result.error {
        anyhow::bail!("grounding stage failed: {}", error);
    }
    Ok(())
}
