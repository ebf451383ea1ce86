//! Conversation sessions over saved plans
//!
//! A [`Session`] binds one saved plan to an in-memory mirror of its
//! conversation history and drives calls to the remote assistant. The
//! remote collaborator is stateless, so the plan JSON and SQL query are
//! re-sent on every turn; later turns add a condensed transcript window
//! instead of growing the prompt without bound.
//!
//! Persistence ordering is the one hard rule here: a user turn is written
//! to the store *before* the remote call goes out, so a crash mid-call
//! never loses the question. Failed calls are recorded as assistant turns
//! too; the user sees them again on reload.

pub mod client;

pub use client::{create_assistant_client, AssistantClient, HttpAssistantClient};

use crate::error::{Error, Result};
use crate::store::{KvStore, PlanStore};
use crate::types::{Turn, TurnRole};
use serde_json::Value;

/// Number of prior turns included in a follow-up prompt (3 exchanges).
const TRANSCRIPT_WINDOW: usize = 6;
/// Per-turn character cap inside the condensed transcript.
const MAX_TURN_CHARS: usize = 1500;

const ANALYSIS_INSTRUCTIONS: &str = "Please provide:
1. A brief summary of what this query does
2. Performance bottlenecks or concerns
3. Suggestions for optimization
4. Key metrics to watch

Format your response in a clear, readable way with sections.";

/// Where a session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No plan bound
    Empty,
    /// Plan bound, history loaded, ready for a question
    Initialized,
    /// A user turn was sent and the remote call is in flight
    AwaitingResponse,
}

/// One active plan conversation.
///
/// An explicit value owned by the caller; switching plans via
/// [`Session::initialize`] discards the in-memory state but never touches
/// the previous record's persisted history.
#[derive(Debug)]
pub struct Session {
    state: SessionState,
    active_record_id: Option<String>,
    active_payload: Option<Value>,
    active_query: String,
    history: Vec<Turn>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Self {
            state: SessionState::Empty,
            active_record_id: None,
            active_payload: None,
            active_query: String::new(),
            history: vec![],
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn active_record_id(&self) -> Option<&str> {
        self.active_record_id.as_deref()
    }

    /// In-memory conversation, oldest first. Mirrors the active record's
    /// persisted history.
    pub fn history(&self) -> &[Turn] {
        &self.history
    }

    /// Text of the most recent assistant turn, if any.
    pub fn last_assistant_text(&self) -> Option<&str> {
        self.history
            .iter()
            .rev()
            .find(|t| t.role == TurnRole::Assistant)
            .map(|t| t.text.as_str())
    }

    /// Bind a plan and its restored history, replacing any previous binding.
    pub fn initialize(
        &mut self,
        record_id: impl Into<String>,
        payload: Value,
        query: impl Into<String>,
        restored_history: Vec<Turn>,
    ) {
        self.active_record_id = Some(record_id.into());
        self.active_payload = Some(payload);
        self.active_query = query.into();
        self.history = restored_history;
        self.state = SessionState::Initialized;
    }

    /// Send a user question about the active plan.
    ///
    /// The user turn is appended and persisted before the remote call is
    /// issued. The returned string is the assistant turn's text - either
    /// the real response or a formatted error message; both are persisted,
    /// and neither path crashes the session. Submitting while a call is in
    /// flight is rejected.
    pub fn submit_user_turn<S: KvStore>(
        &mut self,
        text: &str,
        store: &mut PlanStore<S>,
        client: &dyn AssistantClient,
    ) -> Result<String> {
        match self.state {
            SessionState::Empty => {
                return Err(Error::Llm("no active plan to analyze".to_string()));
            }
            SessionState::AwaitingResponse => {
                return Err(Error::Llm(
                    "a request is already in flight for this plan".to_string(),
                ));
            }
            SessionState::Initialized => {}
        }

        let record_id = self
            .active_record_id
            .clone()
            .ok_or_else(|| Error::Llm("no active plan to analyze".to_string()))?;

        let user_turn = Turn::user(text);
        self.history.push(user_turn.clone());
        // Persist before the remote call; a crash mid-call must not lose
        // the question.
        store.append_turn(&record_id, user_turn)?;

        let prompt = self.build_prompt(text)?;
        self.state = SessionState::AwaitingResponse;
        tracing::debug!(record_id = %record_id, turns = self.history.len(), "sending analysis request");

        let response_text = match client.generate(&prompt) {
            Ok(response) => response,
            Err(e) => {
                let message = match e {
                    Error::Llm(msg) => msg,
                    other => other.to_string(),
                };
                tracing::warn!(record_id = %record_id, error = %message, "analysis request failed");
                format!(
                    "Error: {}\n\nMake sure your API key is valid and you have access to the Gemini API.",
                    message
                )
            }
        };

        let assistant_turn = Turn::assistant(response_text.clone());
        self.history.push(assistant_turn.clone());
        store.append_turn(&record_id, assistant_turn)?;
        self.state = SessionState::Initialized;

        Ok(response_text)
    }

    /// Build the outgoing prompt for the latest user message.
    ///
    /// The plan JSON and SQL query are embedded every turn (the remote
    /// collaborator keeps no state between calls). The first turn adds the
    /// full analysis instructions; later turns add a condensed transcript
    /// of the last [`TRANSCRIPT_WINDOW`] prior turns instead.
    fn build_prompt(&self, latest_message: &str) -> Result<String> {
        let payload = self
            .active_payload
            .as_ref()
            .ok_or_else(|| Error::Llm("no active plan to analyze".to_string()))?;
        let plan_json = serde_json::to_string_pretty(payload)?;

        let mut prompt =
            String::from("Analyze this PostgreSQL query execution plan and provide insights:\n\n");

        if !self.active_query.trim().is_empty() {
            prompt.push_str(&format!("SQL Query:\n```sql\n{}\n```\n\n", self.active_query));
        }

        prompt.push_str(&format!(
            "Query Execution Plan (JSON):\n```json\n{}\n```\n\n",
            plan_json
        ));

        // history already contains the just-appended user turn
        if self.history.len() <= 1 {
            prompt.push_str(ANALYSIS_INSTRUCTIONS);
            prompt.push_str("\n\n");
        } else {
            let transcript = condense_transcript(&self.history[..self.history.len() - 1]);
            if !transcript.is_empty() {
                prompt.push_str("Recent conversation:\n");
                prompt.push_str(&transcript);
                prompt.push('\n');
            }
        }

        prompt.push_str(&format!("Question:\n{}", latest_message));
        Ok(prompt)
    }
}

/// Condensed transcript of the most recent prior turns, oldest first.
fn condense_transcript(prior: &[Turn]) -> String {
    let start = prior.len().saturating_sub(TRANSCRIPT_WINDOW);
    let mut out = String::new();
    for turn in &prior[start..] {
        let mut text: String = turn.text.chars().take(MAX_TURN_CHARS).collect();
        if text.len() < turn.text.len() {
            text.push_str("...[truncated]");
        }
        out.push_str(&format!("{}: {}\n", turn.role.as_str(), text));
    }
    out
}
