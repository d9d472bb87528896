//! The conversation orchestrator.
//!
//! One call to [`ConversationOrchestrator::chat`] is one turn:
//!
//! ```text
//! Start -> Budgeted -> AwaitingModel -+-> (no tool) ------------------------------> Done
//!                                     +-> ToolRequested -> Executing -> AwaitingFinalModel -> Done
//! ```
//!
//! The orchestrator owns no conversation state. History comes in with the
//! call and a new, re-bounded history goes out with the [`TurnOutcome`]; a
//! failed turn returns an error and nothing else, so the caller's history
//! stays the source of truth for a retry.

use std::sync::Arc;

use mailpilot_config::AppConfig;
use mailpilot_core::error::{Error, Result};
use mailpilot_core::message::{ChatMessage, HistoryEntry, MessageToolCall, sanitize_history};
use mailpilot_core::provider::{Provider, ProviderRequest};
use mailpilot_core::tool::{ExecutedTool, ToolInvocationRequest};
use mailpilot_tools::ToolExecutor;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::context::ContextBudgeter;

pub const DEFAULT_SYSTEM_PROMPT: &str = "You are an AI email management assistant. You help users manage their inbox by:
- Analyzing and summarizing their real inbox
- Detecting urgent emails and pending replies
- Generating smart replies
- Drafting emails on request
- Answering questions about their inbox

Keep responses concise and actionable. Use tools whenever you need to access real email data.";

/// Caller history entries carried into the returned history.
pub const DEFAULT_HISTORY_WINDOW: usize = 18;

/// Budgeted history entries repeated in the post-tool prompt.
pub const DEFAULT_TOOL_HISTORY_TAIL: usize = 5;

/// What a turn hands back to the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnOutcome {
    pub reply: String,

    /// Present only when a declared tool actually ran this turn
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_executed: Option<ExecutedTool>,

    /// The caller's next history: recent prior entries plus this exchange
    pub history: Vec<ChatMessage>,
}

pub struct ConversationOrchestrator {
    provider: Arc<dyn Provider>,
    executor: Arc<ToolExecutor>,
    model: String,
    temperature: f32,
    max_tokens: Option<u32>,
    system_prompt: String,
    budgeter: ContextBudgeter,
    history_window: usize,
    tool_history_tail: usize,
}

impl ConversationOrchestrator {
    pub fn new(
        provider: Arc<dyn Provider>,
        executor: Arc<ToolExecutor>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            provider,
            executor,
            model: model.into(),
            temperature: 0.7,
            max_tokens: None,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            budgeter: ContextBudgeter::default(),
            history_window: DEFAULT_HISTORY_WINDOW,
            tool_history_tail: DEFAULT_TOOL_HISTORY_TAIL,
        }
    }

    /// Build from loaded configuration.
    ///
    /// A per-provider `default_model` wins over the global one.
    pub fn from_config(
        config: &AppConfig,
        provider: Arc<dyn Provider>,
        executor: Arc<ToolExecutor>,
    ) -> Self {
        let model = config
            .providers
            .get(&config.default_provider)
            .and_then(|p| p.default_model.clone())
            .unwrap_or_else(|| config.default_model.clone());

        let mut orchestrator = Self::new(provider, executor, model)
            .with_temperature(config.default_temperature)
            .with_budgeter(ContextBudgeter::new(config.agent.history_budget_tokens))
            .with_history_window(config.agent.history_window)
            .with_tool_history_tail(config.agent.tool_history_tail);
        if let Some(max) = config.default_max_tokens {
            orchestrator = orchestrator.with_max_tokens(max);
        }
        if let Some(prompt) = &config.agent.system_prompt {
            orchestrator = orchestrator.with_system_prompt(prompt.clone());
        }
        orchestrator
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max: u32) -> Self {
        self.max_tokens = Some(max);
        self
    }

    pub fn with_budgeter(mut self, budgeter: ContextBudgeter) -> Self {
        self.budgeter = budgeter;
        self
    }

    pub fn with_history_window(mut self, window: usize) -> Self {
        self.history_window = window;
        self
    }

    pub fn with_tool_history_tail(mut self, tail: usize) -> Self {
        self.tool_history_tail = tail;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Run one turn.
    ///
    /// `history` is tolerated as given: malformed entries are dropped, never
    /// rejected. An empty or blank `message` fails before any model call.
    pub async fn chat(&self, message: &str, history: &[HistoryEntry]) -> Result<TurnOutcome> {
        if message.trim().is_empty() {
            return Err(Error::Input("Message is required".into()));
        }

        let clean = sanitize_history(history);
        let budgeted = self.budgeter.fit(&clean);
        info!(
            history_in = history.len(),
            history_valid = clean.len(),
            history_kept = budgeted.len(),
            estimated_tokens = self.budgeter.cost(&budgeted),
            "Starting turn"
        );

        let mut messages = Vec::with_capacity(budgeted.len() + 2);
        messages.push(ChatMessage::system(&self.system_prompt));
        messages.extend(budgeted.iter().cloned());
        messages.push(ChatMessage::user(message));

        let first = self
            .provider
            .complete(self.request(messages).with_tools(self.executor.definitions()))
            .await?;

        let (reply, tool_executed) = match select_tool_call(&first.tool_calls) {
            None => (first.content.unwrap_or_default(), None),
            Some(call) => {
                let announcement = first.content.clone().unwrap_or_default();
                self.run_tool_round(message, &budgeted, call, announcement)
                    .await?
            }
        };

        // The window counts caller entries, malformed ones included.
        let window_start = history.len().saturating_sub(self.history_window);
        let mut next_history = sanitize_history(&history[window_start..]);
        next_history.push(ChatMessage::user(message));
        next_history.push(ChatMessage::assistant(&reply));

        info!(
            tool = tool_executed.as_ref().map(|t| t.name.as_str()).unwrap_or("none"),
            history_out = next_history.len(),
            "Turn complete"
        );

        Ok(TurnOutcome {
            reply,
            tool_executed,
            history: next_history,
        })
    }

    /// Execute the selected call and ask the model, without tools, to
    /// answer from its result.
    async fn run_tool_round(
        &self,
        message: &str,
        budgeted: &[ChatMessage],
        call: &MessageToolCall,
        announcement: String,
    ) -> Result<(String, Option<ExecutedTool>)> {
        let request = ToolInvocationRequest::from(call);
        let result = self.executor.execute(&request).await?;
        debug!(
            tool = %result.tool_name,
            success = result.success,
            result_chars = result.output.len(),
            "Tool finished"
        );

        let tail_start = budgeted.len().saturating_sub(self.tool_history_tail);
        let mut messages = Vec::with_capacity(self.tool_history_tail + 4);
        messages.push(ChatMessage::system(&self.system_prompt));
        messages.extend(budgeted[tail_start..].iter().cloned());
        messages.push(ChatMessage::user(message));
        messages.push(ChatMessage::assistant(announcement));
        messages.push(ChatMessage::user(format!(
            "Tool {} executed. Result: {}",
            result.tool_name, result.output
        )));

        let follow_up = self.provider.complete(self.request(messages)).await?;

        let executed = result.success.then(|| ExecutedTool {
            name: result.tool_name,
            result: result.data,
        });
        Ok((follow_up.content.unwrap_or_default(), executed))
    }

    fn request(&self, messages: Vec<ChatMessage>) -> ProviderRequest {
        let mut request = ProviderRequest::new(&self.model, messages);
        request.temperature = self.temperature;
        request.max_tokens = self.max_tokens;
        request
    }
}

/// One tool per turn: the first call the model listed is honored and the
/// rest are ignored. Multi-tool turns would need a loop with a shared
/// result budget, not just a wider slice here.
fn select_tool_call(calls: &[MessageToolCall]) -> Option<&MessageToolCall> {
    if calls.len() > 1 {
        warn!(
            requested = calls.len(),
            ignored = ?calls[1..].iter().map(|c| c.name.as_str()).collect::<Vec<_>>(),
            "Model requested several tools, honoring only the first"
        );
    }
    calls.first()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::*;
    use mailpilot_core::error::{MailError, ProviderError, ToolError};
    use mailpilot_core::mail::RawMail;
    use mailpilot_core::message::Role;
    use mailpilot_core::provider::ToolChoice;
    use mailpilot_mail::InMemoryMailbox;
    use mailpilot_tools::{TRUNCATION_MARKER, default_registry};

    fn orchestrator(
        provider: Arc<RecordingProvider>,
        mailbox: Arc<InMemoryMailbox>,
    ) -> ConversationOrchestrator {
        let executor = ToolExecutor::new(default_registry(mailbox.clone(), mailbox));
        ConversationOrchestrator::new(provider, Arc::new(executor), "test-model")
    }

    fn entries(messages: &[ChatMessage]) -> Vec<HistoryEntry> {
        messages.iter().cloned().map(HistoryEntry::from).collect()
    }

    #[tokio::test]
    async fn plain_reply_without_tools() {
        let provider = Arc::new(RecordingProvider::new(vec![text_response("Hello!")]));
        let orch = orchestrator(provider.clone(), Arc::new(InMemoryMailbox::new()));

        let outcome = orch.chat("hi", &[]).await.unwrap();
        assert_eq!(outcome.reply, "Hello!");
        assert!(outcome.tool_executed.is_none());
        assert_eq!(
            outcome.history,
            vec![ChatMessage::user("hi"), ChatMessage::assistant("Hello!")]
        );

        let requests = provider.requests();
        assert_eq!(requests.len(), 1);
        let req = &requests[0];
        assert_eq!(req.model, "test-model");
        assert_eq!(req.messages[0], ChatMessage::system(DEFAULT_SYSTEM_PROMPT));
        assert_eq!(req.messages.last().unwrap(), &ChatMessage::user("hi"));
        assert_eq!(req.tools.len(), 3);
        assert_eq!(req.tool_choice, Some(ToolChoice::Auto));
    }

    #[tokio::test]
    async fn empty_message_rejected_before_model_call() {
        let provider = Arc::new(RecordingProvider::new(vec![]));
        let orch = orchestrator(provider.clone(), Arc::new(InMemoryMailbox::new()));
        for message in ["", "   \n"] {
            let err = orch.chat(message, &[]).await.unwrap_err();
            assert!(err.is_input());
        }
        assert!(provider.requests().is_empty());
    }

    #[tokio::test]
    async fn tool_round_builds_follow_up_prompt() {
        let provider = Arc::new(RecordingProvider::new(vec![
            tool_response(vec![tool_call("list-contacts", "{}")], "Let me check."),
            text_response("You have mail from Alice."),
        ]));
        let mailbox = Arc::new(InMemoryMailbox::with_mails(vec![RawMail::new(
            "1",
            "Alice <alice@x.com>",
            "hi",
        )]));
        let orch = orchestrator(provider.clone(), mailbox);

        let prior: Vec<ChatMessage> = (0..8)
            .map(|i| ChatMessage::new(if i % 2 == 0 { Role::User } else { Role::Assistant }, format!("turn {i}")))
            .collect();
        let outcome = orch.chat("who wrote to me?", &entries(&prior)).await.unwrap();

        assert_eq!(outcome.reply, "You have mail from Alice.");
        let executed = outcome.tool_executed.unwrap();
        assert_eq!(executed.name, "list-contacts");
        assert_eq!(executed.result["contacts"][0], "Alice <alice@x.com>");

        let requests = provider.requests();
        assert_eq!(requests.len(), 2);
        let follow_up = &requests[1];
        assert!(follow_up.tools.is_empty());
        assert!(follow_up.tool_choice.is_none());

        let msgs = &follow_up.messages;
        assert_eq!(msgs.len(), 1 + 5 + 3);
        assert_eq!(msgs[0].role, Role::System);
        assert_eq!(&msgs[1..6], &prior[3..]);
        assert_eq!(msgs[6], ChatMessage::user("who wrote to me?"));
        assert_eq!(msgs[7], ChatMessage::assistant("Let me check."));
        assert_eq!(msgs[8].role, Role::User);
        assert!(msgs[8].content.starts_with("Tool list-contacts executed. Result: {"));
    }

    #[tokio::test]
    async fn only_first_tool_call_executed() {
        let provider = Arc::new(RecordingProvider::new(vec![
            tool_response(
                vec![
                    tool_call("send-email", r#"{"to":"bob@x.com","subject":"a","body":"b"}"#),
                    tool_call("send-email", r#"{"to":"eve@x.com","subject":"a","body":"b"}"#),
                ],
                "",
            ),
            text_response("Sent."),
        ]));
        let mailbox = Arc::new(InMemoryMailbox::new());
        let orch = orchestrator(provider, mailbox.clone());

        orch.chat("send it", &[]).await.unwrap();
        let sent = mailbox.sent().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, "bob@x.com");
    }

    #[tokio::test]
    async fn missing_tool_content_becomes_empty_announcement() {
        let provider = Arc::new(RecordingProvider::new(vec![
            tool_response_without_content(vec![tool_call("list-contacts", "{}")]),
            text_response("No contacts yet."),
        ]));
        let orch = orchestrator(provider.clone(), Arc::new(InMemoryMailbox::new()));
        orch.chat("contacts?", &[]).await.unwrap();
        let follow_up = &provider.requests()[1];
        assert_eq!(follow_up.messages[2], ChatMessage::assistant(""));
    }

    #[tokio::test]
    async fn malformed_arguments_abort_turn() {
        let provider = Arc::new(RecordingProvider::new(vec![tool_response(
            vec![tool_call("retrieve-inbox", "{\"limit\": ")],
            "",
        )]));
        let mailbox = Arc::new(InMemoryMailbox::new());
        let orch = orchestrator(provider.clone(), mailbox.clone());

        let err = orch.chat("inbox", &[]).await.unwrap_err();
        assert!(matches!(err, Error::Tool(ToolError::InvalidArguments { .. })));
        assert_eq!(provider.requests().len(), 1);
        assert_eq!(mailbox.fetch_calls(), 0);
    }

    #[tokio::test]
    async fn unknown_tool_still_completes_turn() {
        let provider = Arc::new(RecordingProvider::new(vec![
            tool_response(vec![tool_call("archive-all", "{}")], ""),
            text_response("I can't do that."),
        ]));
        let orch = orchestrator(provider.clone(), Arc::new(InMemoryMailbox::new()));

        let outcome = orch.chat("archive everything", &[]).await.unwrap();
        assert_eq!(outcome.reply, "I can't do that.");
        assert!(outcome.tool_executed.is_none());
        let last = provider.requests()[1].messages.last().cloned().unwrap();
        assert_eq!(
            last.content,
            r#"Tool archive-all executed. Result: {"error":"Unknown tool"}"#
        );
    }

    #[tokio::test]
    async fn tool_failure_aborts_turn() {
        let provider = Arc::new(RecordingProvider::new(vec![tool_response(
            vec![tool_call("send-email", r#"{"to":"bob@x.com","subject":"a","body":"b"}"#)],
            "",
        )]));
        let mailbox = Arc::new(InMemoryMailbox::new());
        mailbox
            .set_failure(Some(MailError::SendFailed("relay denied".into())))
            .await;
        let orch = orchestrator(provider.clone(), mailbox);

        let err = orch.chat("send", &[]).await.unwrap_err();
        assert!(matches!(err, Error::Tool(ToolError::ExecutionFailed { .. })));
        assert_eq!(provider.requests().len(), 1);
    }

    #[tokio::test]
    async fn provider_failure_aborts_turn() {
        let provider = Arc::new(RecordingProvider::failing(ProviderError::RateLimited {
            retry_after_secs: 5,
        }));
        let orch = orchestrator(provider, Arc::new(InMemoryMailbox::new()));
        let err = orch.chat("hi", &[]).await.unwrap_err();
        assert!(matches!(err, Error::Provider(ProviderError::RateLimited { .. })));
    }

    #[tokio::test]
    async fn oversized_tool_result_truncated_in_prompt() {
        let mails: Vec<RawMail> = (0..20)
            .map(|i| RawMail::new(i.to_string(), "a@x.com", "s").with_text("z".repeat(500)))
            .collect();
        let provider = Arc::new(RecordingProvider::new(vec![
            tool_response(vec![tool_call("retrieve-inbox", "{}")], ""),
            text_response("done"),
        ]));
        let mailbox = Arc::new(InMemoryMailbox::with_mails(mails));
        let executor = ToolExecutor::new(default_registry(mailbox.clone(), mailbox))
            .with_result_limit(2_000);
        let orch = ConversationOrchestrator::new(provider.clone(), Arc::new(executor), "m");

        let outcome = orch.chat("inbox", &[]).await.unwrap();
        let injected = provider.requests()[1].messages.last().cloned().unwrap();
        assert!(injected.content.ends_with(TRUNCATION_MARKER));
        // The caller still gets the full structured result.
        let emails = outcome.tool_executed.unwrap().result["emails"].as_array().unwrap().len();
        assert_eq!(emails, 20);
    }

    #[tokio::test]
    async fn malformed_history_entries_never_reach_model() {
        let history: Vec<HistoryEntry> = serde_json::from_value(serde_json::json!([
            {"role": "user", "content": "first"},
            {"role": "user"},
            {"content": "no role"},
            null,
            {"role": "robot", "content": "??"},
            {"role": "assistant", "content": null},
            {"role": "assistant", "content": 42},
            "just a string"
        ]))
        .unwrap();
        let provider = Arc::new(RecordingProvider::new(vec![text_response("ok")]));
        let orch = orchestrator(provider.clone(), Arc::new(InMemoryMailbox::new()));

        let outcome = orch.chat("next", &history).await.unwrap();
        let sent = &provider.requests()[0].messages;
        assert_eq!(
            sent[1..],
            [
                ChatMessage::user("first"),
                ChatMessage::assistant("42"),
                ChatMessage::user("next"),
            ]
        );
        assert_eq!(outcome.history.len(), 4);
    }

    #[tokio::test]
    async fn returned_history_window_counts_malformed_entries() {
        let mut history: Vec<HistoryEntry> = (0..18)
            .map(|i| HistoryEntry::from(ChatMessage::user(format!("m{i}"))))
            .collect();
        history.push(HistoryEntry::from(serde_json::json!({"role": "user"})));
        history.push(HistoryEntry::from(serde_json::Value::Null));

        let provider = Arc::new(RecordingProvider::new(vec![text_response("ok")]));
        let orch = orchestrator(provider, Arc::new(InMemoryMailbox::new()));

        let outcome = orch.chat("next", &history).await.unwrap();
        assert_eq!(outcome.history.len(), 18);
        assert_eq!(outcome.history[0], ChatMessage::user("m2"));
        assert_eq!(outcome.history[16], ChatMessage::user("next"));
        assert_eq!(outcome.history[17], ChatMessage::assistant("ok"));
    }

    #[tokio::test]
    async fn history_stays_bounded_over_many_turns() {
        let orch_provider = Arc::new(RecordingProvider::repeating(text_response("noted")));
        let orch = orchestrator(orch_provider, Arc::new(InMemoryMailbox::new()));

        let mut history: Vec<HistoryEntry> = Vec::new();
        for turn in 0..30 {
            let outcome = orch.chat(&format!("message {turn}"), &history).await.unwrap();
            assert!(outcome.history.len() <= DEFAULT_HISTORY_WINDOW + 2);
            history = entries(&outcome.history);
        }
        assert_eq!(history.len(), 20);
    }

    #[tokio::test]
    async fn returned_history_ignores_budget() {
        let prior: Vec<ChatMessage> = (0..10)
            .map(|i| ChatMessage::user(format!("{i}{}", "q".repeat(399))))
            .collect();
        let provider = Arc::new(RecordingProvider::new(vec![text_response("ok")]));
        let orch = orchestrator(provider.clone(), Arc::new(InMemoryMailbox::new()))
            .with_budgeter(ContextBudgeter::new(250));

        let outcome = orch.chat("hi", &entries(&prior)).await.unwrap();
        // 100 tokens each: only two fit in the prompt
        assert_eq!(provider.requests()[0].messages.len(), 1 + 2 + 1);
        // but the caller's history is kept in full
        assert_eq!(outcome.history.len(), 12);
    }

    #[test]
    fn outcome_serializes_camel_case() {
        let outcome = TurnOutcome {
            reply: "done".into(),
            tool_executed: Some(ExecutedTool {
                name: "send-email".into(),
                result: serde_json::json!({"success": true}),
            }),
            history: vec![ChatMessage::user("x")],
        };
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["toolExecuted"]["name"], "send-email");
        assert_eq!(json["history"][0]["role"], "user");

        let bare = TurnOutcome {
            tool_executed: None,
            ..outcome
        };
        assert!(serde_json::to_value(&bare).unwrap().get("toolExecuted").is_none());
    }

    #[test]
    fn from_config_applies_agent_settings() {
        let mut config = AppConfig::default();
        config.default_model = "gpt-4o-mini".into();
        config.agent.system_prompt = Some("Be brief.".into());
        config.agent.history_budget_tokens = 1234;
        let mailbox = Arc::new(InMemoryMailbox::new());
        let executor = Arc::new(ToolExecutor::new(default_registry(mailbox.clone(), mailbox)));
        let provider = Arc::new(RecordingProvider::new(vec![]));

        let orch = ConversationOrchestrator::from_config(&config, provider, executor);
        assert_eq!(orch.model(), "gpt-4o-mini");
        assert_eq!(orch.system_prompt, "Be brief.");
        assert_eq!(orch.budgeter.budget(), 1234);
    }
}
