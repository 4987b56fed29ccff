use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use grounding_agent::agent::{AgentHandle, GroundingAgent};
use grounding_agent::channels::{AppState, HttpServer, HttpServerConfig, local, mcp, serverless};
use grounding_agent::cli::{Cli, Command, run_ask, run_repl};
use grounding_agent::config::{AgentConfig, GoogleConfig, HttpConfig};
use grounding_agent::tools::ToolRegistry;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env file is fine; the environment may already be set.
    let _ = dotenvy::dotenv();
    init_logging();

    let cli = Cli::parse();
    let google = GoogleConfig::from_env();
    let agent_config = AgentConfig::from_env()?;
    let tools = Arc::new(ToolRegistry::builtin());

    match cli.command.unwrap_or(Command::Chat { no_search: false }) {
        Command::Chat { no_search } => {
            let agent = build_agent(&google, agent_config, tools)?;
            run_repl(&agent, !no_search).await
        }
        Command::Ask(args) => {
            let agent = build_agent(&google, agent_config, tools)?;
            run_ask(&agent, args).await
        }
        Command::Serve(args) => {
            let state = app_state(&google, agent_config, tools);
            serve("local", args.into(), local::routes(state)).await
        }
        Command::Function(args) => {
            let state = app_state(&google, agent_config, tools);
            serve("function", args.into(), serverless::routes(state)).await
        }
        Command::McpHttp(args) => {
            let state = app_state(&google, agent_config, tools);
            serve("mcp-http", args.into(), mcp::http::routes(state)).await
        }
        Command::Mcp => {
            let state = app_state(&google, agent_config, tools);
            mcp::stdio::run(state).await?;
            Ok(())
        }
    }
}

/// Logs go to stderr so stdout stays clean for chat output and stdio MCP.
fn init_logging() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("grounding_agent=info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .init();
}

/// Interactive commands cannot run without credentials.
fn build_agent(
    google: &GoogleConfig,
    config: AgentConfig,
    tools: Arc<ToolRegistry>,
) -> anyhow::Result<GroundingAgent> {
    GroundingAgent::from_config(google, config, tools).map_err(|e| {
        anyhow::anyhow!("{}\nPlease create a .env file with GEMINI_API_KEY=your_key_here", e)
    })
}

/// Servers start without credentials; only agent-backed requests fail.
fn app_state(google: &GoogleConfig, config: AgentConfig, tools: Arc<ToolRegistry>) -> AppState {
    let agent = AgentHandle::from_config(google, config, tools.clone());
    AppState::new(agent, tools)
}

async fn serve(name: &'static str, http: HttpConfig, router: axum::Router) -> anyhow::Result<()> {
    let mut server = HttpServer::new(HttpServerConfig {
        name,
        addr: http.socket_addr().await?,
    });
    server.add_routes(router);
    server.run_until_ctrl_c().await?;
    Ok(())
}
