//! Shared test helpers: a scripted provider that records its requests.

use std::sync::Mutex;

use mailpilot_core::error::ProviderError;
use mailpilot_core::message::MessageToolCall;
use mailpilot_core::provider::{Provider, ProviderRequest, ProviderResponse, Usage};

enum Script {
    Queue(Vec<ProviderResponse>),
    Repeat(ProviderResponse),
    Fail(ProviderError),
}

/// Returns scripted responses in order and keeps every request it saw.
///
/// Panics if called more times than it has responses.
pub struct RecordingProvider {
    script: Mutex<Script>,
    requests: Mutex<Vec<ProviderRequest>>,
}

impl RecordingProvider {
    pub fn new(responses: Vec<ProviderResponse>) -> Self {
        Self::with_script(Script::Queue(responses))
    }

    pub fn repeating(response: ProviderResponse) -> Self {
        Self::with_script(Script::Repeat(response))
    }

    pub fn failing(error: ProviderError) -> Self {
        Self::with_script(Script::Fail(error))
    }

    fn with_script(script: Script) -> Self {
        Self {
            script: Mutex::new(script),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<ProviderRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Provider for RecordingProvider {
    fn name(&self) -> &str {
        "recording_mock"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        self.requests.lock().unwrap().push(request);
        let mut script = self.script.lock().unwrap();
        match &mut *script {
            Script::Queue(queue) => {
                assert!(!queue.is_empty(), "RecordingProvider: no more responses");
                Ok(queue.remove(0))
            }
            Script::Repeat(response) => Ok(response.clone()),
            Script::Fail(error) => Err(error.clone()),
        }
    }
}

fn usage() -> Option<Usage> {
    Some(Usage {
        prompt_tokens: 10,
        completion_tokens: 5,
        total_tokens: 15,
    })
}

/// A plain text reply.
pub fn text_response(text: &str) -> ProviderResponse {
    ProviderResponse {
        content: Some(text.to_string()),
        tool_calls: Vec::new(),
        usage: usage(),
        model: "mock-model".into(),
    }
}

/// Tool calls with accompanying text.
pub fn tool_response(tool_calls: Vec<MessageToolCall>, thought: &str) -> ProviderResponse {
    ProviderResponse {
        content: Some(thought.to_string()),
        ..tool_response_without_content(tool_calls)
    }
}

/// Tool calls and a null content field, as most endpoints send them.
pub fn tool_response_without_content(tool_calls: Vec<MessageToolCall>) -> ProviderResponse {
    ProviderResponse {
        content: None,
        tool_calls,
        usage: usage(),
        model: "mock-model".into(),
    }
}

pub fn tool_call(name: &str, arguments: &str) -> MessageToolCall {
    MessageToolCall {
        id: format!("call_{name}"),
        name: name.to_string(),
        arguments: arguments.to_string(),
    }
}
