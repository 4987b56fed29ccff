//! Tool system.
//!
//! Tools are small, self-contained utilities the model can call during the
//! grounding stage: a calculator, a clock, mock weather, file access, a page
//! fetcher and a text analyzer. Every tool reports failure as a descriptive
//! string rather than an error, so a bad call never aborts a request.

pub mod builtin;

mod registry;
mod tool;

pub use registry::{ToolId, ToolRegistry};
pub use tool::{Tool, ToolError, ToolSchema};
