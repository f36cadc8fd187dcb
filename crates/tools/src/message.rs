//! Message tool: talk to the user through a [`UserChannel`].

use serde::Deserialize;
use serde_json::{Value, json};
use std::sync::Arc;
use stepwise_core::channel::{MessageKind, UserChannel, UserMessage};
use stepwise_core::error::ToolError;
use stepwise_core::tool::{FieldSchema, ToolCall, ToolKind, ToolSchema};
use tracing::debug;

#[derive(Debug, Deserialize)]
struct MessageInput {
    #[serde(rename = "type")]
    kind: MessageKind,
    text: String,
    #[serde(default)]
    attachments: Vec<String>,
}

pub fn schema() -> ToolSchema {
    ToolSchema::new(
        ToolKind::Message,
        "Communicate with the user. 'info' reports progress, 'ask' waits for an answer, \
         and 'result' delivers the final outcome and ends the task.",
        vec![
            FieldSchema::string("type", "Kind of message")
                .one_of(&["info", "ask", "result"])
                .required(),
            FieldSchema::string("text", "Message text shown to the user").required(),
            FieldSchema::array(
                "attachments",
                "Absolute paths of files to show alongside the message",
                json!({"type": "string"}),
            ),
        ],
    )
}

/// The final answer carried by a `message` call of type `result`, if any.
pub fn result_text(call: &ToolCall) -> Option<&str> {
    if call.name != ToolKind::Message.name() || call.input.get("type")?.as_str()? != "result" {
        return None;
    }
    call.input.get("text")?.as_str()
}

pub struct MessageTool {
    channel: Arc<dyn UserChannel>,
}

impl MessageTool {
    pub fn new(channel: Arc<dyn UserChannel>) -> Self {
        Self { channel }
    }

    pub async fn handle(&self, input: Value) -> Result<Value, ToolError> {
        let input: MessageInput = serde_json::from_value(input)
            .map_err(|e| ToolError::InvalidArguments(format!("message: {e}")))?;

        let message = UserMessage {
            kind: input.kind,
            text: input.text,
            attachments: input.attachments,
        };
        debug!(channel = self.channel.name(), kind = message.kind.as_str(), "Relaying message");

        match message.kind {
            MessageKind::Ask => {
                let reply = self.channel.ask(&message).await?;
                Ok(json!({ "user_response": reply }))
            }
            MessageKind::Info | MessageKind::Result => {
                self.channel.notify(&message).await?;
                Ok(json!({ "message": format!("{} message delivered", message.kind.as_str()) }))
            }
        }
    }
}
