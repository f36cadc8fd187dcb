//! File tool: read, write, append and find/replace edit on absolute paths.

use serde::Deserialize;
use serde_json::{Value, json};
use std::path::Path;
use stepwise_core::error::ToolError;
use stepwise_core::tool::{FieldSchema, ToolKind, ToolSchema};
use stepwise_security::PathPolicy;
use tokio::io::AsyncWriteExt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
enum FileAction {
    Read,
    Write,
    Append,
    Edit,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Edit {
    pub find: String,
    #[serde(default)]
    pub replace: String,
}

#[derive(Debug, Deserialize)]
struct FileInput {
    action: FileAction,
    path: String,
    text: Option<String>,
    #[serde(default)]
    edits: Vec<Edit>,
}

pub fn schema() -> ToolSchema {
    ToolSchema::new(
        ToolKind::File,
        "Read, write, append to, or edit a file. Edits are find/replace pairs applied in order; \
         each replaces every occurrence.",
        vec![
            FieldSchema::string("action", "What to do with the file")
                .one_of(&["read", "write", "append", "edit"])
                .required(),
            FieldSchema::string("path", "Absolute path of the file").required(),
            FieldSchema::string("text", "Content to write or append"),
            FieldSchema::array(
                "edits",
                "Ordered find/replace pairs (edit only)",
                json!({
                    "type": "object",
                    "properties": {
                        "find": {"type": "string"},
                        "replace": {"type": "string"}
                    },
                    "required": ["find", "replace"]
                }),
            ),
        ],
    )
}

/// Apply `edits` to `content` in order.
///
/// Every occurrence of each `find` is replaced; a `find` that does not
/// occur leaves the content as it is.
pub fn apply_edits(content: &str, edits: &[Edit]) -> String {
    edits
        .iter()
        .fold(content.to_string(), |acc, edit| acc.replace(&edit.find, &edit.replace))
}

fn io_error(path: &Path, source: std::io::Error) -> ToolError {
    ToolError::Io {
        path: path.display().to_string(),
        source,
    }
}

pub struct FileTool {
    policy: PathPolicy,
}

impl FileTool {
    pub fn new(policy: PathPolicy) -> Self {
        Self { policy }
    }

    pub async fn handle(&self, input: Value) -> Result<Value, ToolError> {
        let input: FileInput = serde_json::from_value(input)
            .map_err(|e| ToolError::InvalidArguments(format!("file: {e}")))?;

        let path = self
            .policy
            .check(&input.path)
            .map_err(|e| ToolError::PermissionDenied {
                tool_name: ToolKind::File.name().into(),
                reason: e.to_string(),
            })?;
        let shown = path.display().to_string();

        match input.action {
            FileAction::Read => {
                let content = tokio::fs::read_to_string(&path)
                    .await
                    .map_err(|e| io_error(&path, e))?;
                Ok(json!({ "content": content, "path": shown }))
            }
            FileAction::Write => {
                let text = require_text(input.text, "write")?;
                if let Some(parent) = path.parent() {
                    tokio::fs::create_dir_all(parent)
                        .await
                        .map_err(|e| io_error(parent, e))?;
                }
                tokio::fs::write(&path, &text)
                    .await
                    .map_err(|e| io_error(&path, e))?;
                Ok(json!({
                    "message": format!("Wrote {} bytes to {shown}", text.len()),
                    "path": shown,
                }))
            }
            FileAction::Append => {
                let text = require_text(input.text, "append")?;
                let mut file = tokio::fs::OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(&path)
                    .await
                    .map_err(|e| io_error(&path, e))?;
                file.write_all(text.as_bytes())
                    .await
                    .map_err(|e| io_error(&path, e))?;
                file.flush().await.map_err(|e| io_error(&path, e))?;
                Ok(json!({
                    "message": format!("Appended {} bytes to {shown}", text.len()),
                    "path": shown,
                }))
            }
            FileAction::Edit => {
                if input.edits.iter().any(|e| e.find.is_empty()) {
                    return Err(ToolError::InvalidArguments(
                        "file: edit 'find' must not be empty".into(),
                    ));
                }
                let original = tokio::fs::read_to_string(&path)
                    .await
                    .map_err(|e| io_error(&path, e))?;
                let edited = apply_edits(&original, &input.edits);
                let changed = edited != original;
                if changed {
                    tokio::fs::write(&path, &edited)
                        .await
                        .map_err(|e| io_error(&path, e))?;
                }
                Ok(json!({
                    "message": format!("Applied {} edits to {shown}", input.edits.len()),
                    "path": shown,
                    "changed": changed,
                }))
            }
        }
    }
}

fn require_text(text: Option<String>, action: &str) -> Result<String, ToolError> {
    text.ok_or_else(|| ToolError::InvalidArguments(format!("file: '{action}' requires text")))
}
