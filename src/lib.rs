//! Two-stage Gemini orchestration with tools and web-search grounding.
//!
//! A query first goes to the model with a fixed set of tools declared (and,
//! optionally, Google Search); the model may call tools before answering.
//! The answer then goes through a second, tool-free refinement pass. The
//! same pipeline is exposed through a chat CLI, HTTP servers and an MCP
//! tool adapter.

pub mod agent;
pub mod channels;
pub mod cli;
pub mod config;
pub mod error;
pub mod llm;
pub mod tools;
