//! Built-in tools that come with the agent.

mod calculator;
mod file;
mod http;
mod text;
mod time;
mod weather;

pub use calculator::{CalculatorTool, EvalError, evaluate, format_number};
pub use file::FileTool;
pub use http::WebScraperTool;
pub use text::TextAnalyzerTool;
pub use time::TimeTool;
pub use weather::WeatherTool;
