//! Core domain types for pgviz
//!
//! These types model the persisted record shape used by existing
//! deployments, so every serde name matches the legacy JavaScript keys
//! (`data`, `geminiResponse`, `conversationHistory`, `parts`).
//!
//! ## Terminology
//!
//! | Term | Definition |
//! |------|------------|
//! | **PlanRecord** | One saved EXPLAIN payload plus its query text and conversation |
//! | **Turn** | One message in a plan's user/assistant conversation |
//! | **GeminiModel** | Which of the two supported Gemini variants to call |

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================
// Conversation turns
// ============================================

/// Speaker role for a conversation turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnRole {
    /// The human asking about a plan
    User,
    /// The remote Gemini assistant (persisted as "model", the Gemini wire name)
    Assistant,
}

impl TurnRole {
    /// Wire name used in persisted history and Gemini requests
    pub fn as_str(&self) -> &'static str {
        match self {
            TurnRole::User => "user",
            TurnRole::Assistant => "model",
        }
    }
}

impl std::str::FromStr for TurnRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(TurnRole::User),
            "model" | "assistant" => Ok(TurnRole::Assistant),
            _ => Err(format!("unknown turn role: {}", s)),
        }
    }
}

/// One message in a plan conversation.
///
/// Persists as the Gemini content shape `{role, parts: [{text}]}` for
/// compatibility with histories written by the original web client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "TurnWire", from = "TurnWire")]
pub struct Turn {
    /// Who spoke
    pub role: TurnRole,
    /// Message text
    pub text: String,
}

impl Turn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: TurnRole::User,
            text: text.into(),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: TurnRole::Assistant,
            text: text.into(),
        }
    }
}

/// Persisted/wire form of a [`Turn`]
#[derive(Serialize, Deserialize)]
struct TurnWire {
    role: String,
    #[serde(default)]
    parts: Vec<TurnPart>,
}

#[derive(Serialize, Deserialize)]
struct TurnPart {
    #[serde(default)]
    text: String,
}

impl From<Turn> for TurnWire {
    fn from(turn: Turn) -> Self {
        TurnWire {
            role: turn.role.as_str().to_string(),
            parts: vec![TurnPart { text: turn.text }],
        }
    }
}

impl From<TurnWire> for Turn {
    fn from(wire: TurnWire) -> Self {
        // Tolerant read: unknown roles collapse to Assistant, multi-part
        // content is joined. Histories in the wild only ever have one part.
        let role = match wire.role.as_str() {
            "user" => TurnRole::User,
            _ => TurnRole::Assistant,
        };
        let text = wire
            .parts
            .into_iter()
            .map(|p| p.text)
            .collect::<Vec<_>>()
            .join("\n");
        Turn { role, text }
    }
}

// ============================================
// Saved plan records
// ============================================

/// A saved execution plan with its query text and conversation history.
///
/// `raw_data` holds the originally-pasted payload verbatim (array or object
/// form), not the extracted `Plan` subtree; structural equality of this
/// field is the dedup key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanRecord {
    /// Unique, monotonically creation-ordered identifier (millisecond string)
    pub id: String,
    /// Human label, typically "Plan {creation time}"
    pub name: String,
    /// The pasted EXPLAIN payload, stored verbatim
    #[serde(rename = "data")]
    pub raw_data: serde_json::Value,
    /// Optional SQL text the plan came from
    #[serde(default)]
    pub query: String,
    /// Legacy single-response mirror of the last assistant turn.
    ///
    /// Written for consumers that have not migrated to `conversation_history`;
    /// read only by the one-time migration in the store. Use
    /// [`PlanRecord::last_assistant_text`] instead of this field.
    #[serde(rename = "geminiResponse", default)]
    pub legacy_last_response: String,
    /// Full conversation, oldest first
    #[serde(rename = "conversationHistory", default)]
    pub conversation_history: Vec<Turn>,
    /// Creation or last-update time
    pub timestamp: DateTime<Utc>,
}

impl PlanRecord {
    /// Text of the most recent assistant turn, if any.
    ///
    /// This is the computed accessor that supersedes `legacy_last_response`.
    pub fn last_assistant_text(&self) -> Option<&str> {
        self.conversation_history
            .iter()
            .rev()
            .find(|t| t.role == TurnRole::Assistant)
            .map(|t| t.text.as_str())
    }
}

// ============================================
// Gemini model selection
// ============================================

/// The two supported Gemini variants.
///
/// Flash is the default; Pro trades latency for deeper analysis.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GeminiModel {
    #[default]
    Flash,
    Pro,
}

impl GeminiModel {
    /// Full model identifier used in API paths and persisted selection
    pub fn as_str(&self) -> &'static str {
        match self {
            GeminiModel::Flash => "gemini-3-flash-preview",
            GeminiModel::Pro => "gemini-3-pro-preview",
        }
    }
}

impl std::fmt::Display for GeminiModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for GeminiModel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "gemini-3-flash-preview" | "flash" => Ok(GeminiModel::Flash),
            "gemini-3-pro-preview" | "pro" => Ok(GeminiModel::Pro),
            _ => Err(format!("unknown gemini model: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn turn_serializes_as_gemini_content() {
        let turn = Turn::assistant("looks like a seq scan");
        let value = serde_json::to_value(&turn).unwrap();
        assert_eq!(
            value,
            json!({"role": "model", "parts": [{"text": "looks like a seq scan"}]})
        );
    }

    #[test]
    fn turn_deserializes_legacy_shapes() {
        let turn: Turn =
            serde_json::from_value(json!({"role": "user", "parts": [{"text": "why slow?"}]}))
                .unwrap();
        assert_eq!(turn, Turn::user("why slow?"));

        // Missing parts should not fail the whole history
        let turn: Turn = serde_json::from_value(json!({"role": "model"})).unwrap();
        assert_eq!(turn.role, TurnRole::Assistant);
        assert_eq!(turn.text, "");
    }

    #[test]
    fn plan_record_uses_legacy_field_names() {
        let record = PlanRecord {
            id: "1700000000000".to_string(),
            name: "Plan test".to_string(),
            raw_data: json!({"Plan": {"Node Type": "Seq Scan"}}),
            query: "SELECT 1".to_string(),
            legacy_last_response: "old answer".to_string(),
            conversation_history: vec![Turn::user("hi"), Turn::assistant("hello")],
            timestamp: Utc::now(),
        };
        let value = serde_json::to_value(&record).unwrap();
        assert!(value.get("data").is_some());
        assert!(value.get("geminiResponse").is_some());
        assert!(value.get("conversationHistory").is_some());
        assert_eq!(record.last_assistant_text(), Some("hello"));
    }

    #[test]
    fn gemini_model_defaults_to_flash() {
        assert_eq!(GeminiModel::default(), GeminiModel::Flash);
        assert_eq!(
            "gemini-3-pro-preview".parse::<GeminiModel>().unwrap(),
            GeminiModel::Pro
        );
    }
}
