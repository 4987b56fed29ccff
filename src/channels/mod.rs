//! Front ends that expose the grounding agent.
//!
//! Every front end shares one [`AppState`]: the agent handle and the tool
//! registry, both built once at startup. HTTP front ends only define routes;
//! [`HttpServer`] binds and runs them.

pub mod api;
pub mod local;
pub mod mcp;
mod server;
pub mod serverless;

pub use server::{HttpServer, HttpServerConfig};

use std::sync::Arc;

use crate::agent::AgentHandle;
use crate::tools::ToolRegistry;

/// State shared by all handlers.
#[derive(Clone)]
pub struct AppState {
    pub agent: AgentHandle,
    pub tools: Arc<ToolRegistry>,
}

impl AppState {
    pub fn new(agent: AgentHandle, tools: Arc<ToolRegistry>) -> Self {
        Self { agent, tools }
    }
}
