//! Tool handlers for Stepwise.
//!
//! The model can call exactly four tools:
//! `plan` (goal/phase tracking), `message` (talk to the user),
//! `shell` (run commands in a sandbox) and `file` (read/write/edit files).
//! [`ToolDispatcher`] routes a call to its handler with a total match over
//! [`ToolKind`](stepwise_core::tool::ToolKind).

pub mod dispatcher;
pub mod file;
pub mod message;
pub mod plan;
pub mod sandbox;
pub mod shell;

pub use dispatcher::ToolDispatcher;
pub use file::FileTool;
pub use message::MessageTool;
pub use sandbox::{DockerSandbox, DockerSettings, LocalSandbox};
pub use shell::ShellTool;

use stepwise_core::tool::ToolRegistry;

/// The registry of all four tool schemas, in the order the model sees them.
pub fn standard_registry() -> ToolRegistry {
    ToolRegistry::new([plan::schema(), message::schema(), shell::schema(), file::schema()])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_exposes_four_tools() {
        let registry = standard_registry();
        assert_eq!(registry.names(), vec!["plan", "message", "shell", "file"]);

        let defs = registry.definitions();
        let shell = defs.iter().find(|d| d.name == "shell").unwrap();
        assert_eq!(shell.parameters["required"], serde_json::json!(["action", "session"]));
        assert_eq!(shell.parameters["properties"]["timeout"]["default"], 30);

        let file = defs.iter().find(|d| d.name == "file").unwrap();
        assert_eq!(file.parameters["required"], serde_json::json!(["action", "path"]));
    }
}
