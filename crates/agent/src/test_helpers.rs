//! Shared test helpers for loop tests.

use serde_json::Value;
use std::sync::Mutex;
use stepwise_core::error::ProviderError;
use stepwise_core::message::ContentBlock;
use stepwise_core::provider::{Provider, ProviderRequest, ProviderResponse, StopReason, Usage};

/// A mock provider that returns a sequence of scripted responses.
///
/// Each call to `complete` returns the next response in the queue and
/// records the request it was given.
/// Panics if more calls are made than responses provided.
pub struct SequentialMockProvider {
    responses: Vec<ProviderResponse>,
    requests: Mutex<Vec<ProviderRequest>>,
}

impl SequentialMockProvider {
    pub fn new(responses: Vec<ProviderResponse>) -> Self {
        Self {
            responses,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn request(&self, index: usize) -> ProviderRequest {
        self.requests.lock().unwrap()[index].clone()
    }
}

#[async_trait::async_trait]
impl Provider for SequentialMockProvider {
    fn name(&self) -> &str {
        "sequential_mock"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let mut requests = self.requests.lock().unwrap();
        let index = requests.len();
        let Some(response) = self.responses.get(index) else {
            panic!(
                "SequentialMockProvider: no more responses (call #{index}, have {})",
                self.responses.len()
            );
        };
        requests.push(request);
        Ok(response.clone())
    }
}

fn response(content: Vec<ContentBlock>, stop_reason: StopReason) -> ProviderResponse {
    ProviderResponse {
        id: "msg_mock".into(),
        content,
        stop_reason,
        usage: Some(Usage {
            prompt_tokens: 10,
            completion_tokens: 5,
            total_tokens: 15,
        }),
        model: "mock-model".into(),
    }
}

/// A plain text response that ends the turn.
pub fn make_text_response(text: &str) -> ProviderResponse {
    response(vec![ContentBlock::text(text)], StopReason::EndTurn)
}

/// A tool-use response carrying the given calls, preceded by a thought.
pub fn make_tool_call_response(calls: Vec<ContentBlock>, thought: &str) -> ProviderResponse {
    let mut content = vec![ContentBlock::text(thought)];
    content.extend(calls);
    response(content, StopReason::ToolUse)
}

/// A response with an arbitrary stop reason.
pub fn make_stop_response(text: &str, stop_reason: StopReason) -> ProviderResponse {
    response(vec![ContentBlock::text(text)], stop_reason)
}

/// Helper to create a tool invocation block.
pub fn make_tool_call(id: &str, name: &str, input: Value) -> ContentBlock {
    ContentBlock::ToolUse {
        id: id.to_string(),
        name: name.to_string(),
        input,
    }
}
