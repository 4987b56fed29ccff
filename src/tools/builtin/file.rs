//! File operation tool for reading, writing and listing paths.
//!
//! There is no sandboxing here: paths are used as given, relative to the
//! process working directory. Hosts that expose this tool to untrusted
//! prompts must restrict the filesystem themselves.

use std::path::Path;

use async_trait::async_trait;
use tokio::fs;

use crate::tools::tool::{Tool, ToolError, optional_str, require_str};

/// Read a UTF-8 file.
async fn read(path: &str) -> Result<String, ToolError> {
    if !fs::try_exists(path).await.unwrap_or(false) {
        return Err(ToolError::FileNotFound(path.to_string()));
    }
    let content = fs::read_to_string(path).await?;
    Ok(format!("File content:\n{}", content))
}

/// Truncate and overwrite `path` with `content`.
async fn write(path: &str, content: &str) -> Result<String, ToolError> {
    fs::write(path, content).await?;
    Ok(format!("Successfully wrote to '{}'", path))
}

/// List directory entries, sorted by name.
async fn list(path: &str) -> Result<String, ToolError> {
    if !fs::metadata(path).await.map(|m| m.is_dir()).unwrap_or(false) {
        return Err(ToolError::NotADirectory(path.to_string()));
    }

    let mut entries = fs::read_dir(path).await?;
    let mut names = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        names.push(entry.file_name().to_string_lossy().into_owned());
    }
    names.sort();

    let mut out = format!("Files in '{}':", path);
    for name in names {
        out.push_str("\n  - ");
        out.push_str(&name);
    }
    Ok(out)
}

fn exists(path: &str) -> String {
    let verb = if Path::new(path).exists() {
        "exists"
    } else {
        "does not exist"
    };
    format!("Path '{}' {}", path, verb)
}

/// Dispatch one file operation.
pub async fn file_operation(
    operation: &str,
    path: &str,
    content: &str,
) -> Result<String, ToolError> {
    match operation {
        "read" => read(path).await,
        "write" => write(path, content).await,
        "list" => list(path).await,
        "exists" => Ok(exists(path)),
        other => Err(ToolError::UnknownOperation(other.to_string())),
    }
}

/// Read, write, list or probe paths on the local filesystem.
#[derive(Debug, Default)]
pub struct FileTool;

#[async_trait]
impl Tool for FileTool {
    fn name(&self) -> &str {
        "file_operations"
    }

    fn description(&self) -> &str {
        "Performs file operations like read, write, or list files."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "operation": {
                    "type": "string",
                    "enum": ["read", "write", "list", "exists"],
                    "description": "The file operation to perform"
                },
                "filepath": {
                    "type": "string",
                    "description": "Path to the file or directory"
                },
                "content": {
                    "type": "string",
                    "description": "Content to write (for write operation)"
                }
            },
            "required": ["operation", "filepath"]
        })
    }

    async fn execute(&self, params: serde_json::Value) -> Result<String, ToolError> {
        let operation = require_str(&params, "operation")?;
        let path = require_str(&params, "filepath")?;
        let content = optional_str(&params, "content", "");

        tracing::debug!(operation, path, "file operation");
        file_operation(operation, path, content).await
    }
}
