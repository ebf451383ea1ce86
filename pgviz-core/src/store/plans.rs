//! Saved-plan repository over the key-value collaborator
//!
//! All plan records live in one JSON array under a single key, newest
//! first, exactly the layout the original web client wrote. Every
//! operation is a read-modify-write of the whole array; there are no
//! partial updates at the storage layer.

use super::KvStore;
use crate::error::Result;
use crate::types::{GeminiModel, PlanRecord, Turn, TurnRole};
use chrono::{Local, Utc};
use serde_json::Value;
use sha2::{Digest, Sha256};

/// Maximum number of saved plans kept; the oldest beyond this are evicted.
pub const PLAN_CAPACITY: usize = 50;

/// Storage key for the plan collection
const PLANS_KEY: &str = "pgviz_saved_plans";
/// Storage key for the saved Gemini API key
const API_KEY_KEY: &str = "pgviz_gemini_api_key";
/// Storage key for the saved model selection
const MODEL_KEY: &str = "pgviz_gemini_model";

/// Canonical fingerprint of a plan payload.
///
/// `serde_json` objects keep their keys sorted, so serializing the payload
/// directly yields a stable canonical form; the hash of that string is the
/// structural-equality key used for dedup. Semantically-equal plans that
/// differ in more than key order still compare as different (known
/// limitation, matches the source behavior).
pub fn fingerprint(payload: &Value) -> String {
    let mut hasher = Sha256::new();
    hasher.update(payload.to_string().as_bytes());
    hex::encode(hasher.finalize())
}

/// Bounded, ordered repository of saved plans and assistant settings.
pub struct PlanStore<S: KvStore> {
    kv: S,
    capacity: usize,
}

impl<S: KvStore> PlanStore<S> {
    /// Wrap a key-value store with the default capacity.
    pub fn new(kv: S) -> Self {
        Self::with_capacity(kv, PLAN_CAPACITY)
    }

    /// Wrap a key-value store with an explicit capacity (config override).
    pub fn with_capacity(kv: S, capacity: usize) -> Self {
        Self { kv, capacity }
    }

    // ============================================
    // Plan records
    // ============================================

    /// All saved plans, newest first. A missing key is an empty store.
    pub fn list(&self) -> Result<Vec<PlanRecord>> {
        match self.kv.get(PLANS_KEY)? {
            Some(blob) => Ok(serde_json::from_str(&blob)?),
            None => Ok(vec![]),
        }
    }

    fn persist(&mut self, plans: &[PlanRecord]) -> Result<()> {
        let blob = serde_json::to_string(plans)?;
        self.kv.set(PLANS_KEY, &blob)
    }

    /// First saved record structurally equal to `payload`, if any.
    pub fn find_match(&self, payload: &Value) -> Result<Option<PlanRecord>> {
        let needle = fingerprint(payload);
        Ok(self
            .list()?
            .into_iter()
            .find(|record| fingerprint(&record.raw_data) == needle))
    }

    /// Save a new plan record, evicting the oldest beyond capacity.
    pub fn create(&mut self, payload: Value, query: &str) -> Result<PlanRecord> {
        let mut plans = self.list()?;
        let now = Utc::now();

        // Millisecond ids collide under rapid creation; bump past the
        // newest existing id so ids stay unique and monotonic.
        let mut id = now.timestamp_millis();
        if let Some(prev) = plans.first().and_then(|p| p.id.parse::<i64>().ok()) {
            id = id.max(prev + 1);
        }

        let record = PlanRecord {
            id: id.to_string(),
            name: format!("Plan {}", Local::now().format("%Y-%m-%d %H:%M:%S")),
            raw_data: payload,
            query: query.to_string(),
            legacy_last_response: String::new(),
            conversation_history: vec![],
            timestamp: now,
        };

        plans.insert(0, record.clone());
        if plans.len() > self.capacity {
            tracing::debug!(
                evicted = plans.len() - self.capacity,
                "saved-plan capacity reached, dropping oldest"
            );
            plans.truncate(self.capacity);
        }
        self.persist(&plans)?;

        tracing::info!(id = %record.id, "saved new plan");
        Ok(record)
    }

    /// Replace the payload, query and timestamp of an existing record.
    ///
    /// Conversation fields are untouched. An unknown id is a silent no-op:
    /// the record may have been deleted by another window.
    pub fn update(&mut self, id: &str, payload: Value, query: &str) -> Result<()> {
        let mut plans = self.list()?;
        let Some(record) = plans.iter_mut().find(|p| p.id == id) else {
            tracing::debug!(id, "update skipped, record not found");
            return Ok(());
        };
        record.raw_data = payload;
        record.query = query.to_string();
        record.timestamp = Utc::now();
        self.persist(&plans)
    }

    /// Save a rendered plan: update the structurally-matching record if one
    /// exists, otherwise create a new one.
    pub fn save(&mut self, payload: Value, query: &str) -> Result<PlanRecord> {
        if let Some(existing) = self.find_match(&payload)? {
            self.update(&existing.id, payload, query)?;
            // Re-read so the caller sees the refreshed timestamp
            let refreshed = self
                .list()?
                .into_iter()
                .find(|p| p.id == existing.id)
                .unwrap_or(existing);
            return Ok(refreshed);
        }
        self.create(payload, query)
    }

    /// Delete a record; absent ids are a no-op.
    pub fn remove(&mut self, id: &str) -> Result<()> {
        let mut plans = self.list()?;
        let before = plans.len();
        plans.retain(|p| p.id != id);
        if plans.len() != before {
            self.persist(&plans)?;
        }
        Ok(())
    }

    /// Append a conversation turn to a record.
    ///
    /// Assistant turns also refresh the legacy `geminiResponse` mirror for
    /// consumers that have not migrated to full histories. An unknown id is
    /// a silent no-op.
    pub fn append_turn(&mut self, id: &str, turn: Turn) -> Result<()> {
        let mut plans = self.list()?;
        let Some(record) = plans.iter_mut().find(|p| p.id == id) else {
            tracing::debug!(id, "append_turn skipped, record not found");
            return Ok(());
        };
        if turn.role == TurnRole::Assistant {
            record.legacy_last_response = turn.text.clone();
        }
        record.conversation_history.push(turn);
        self.persist(&plans)
    }

    /// Conversation history for a record, migrating legacy records on read.
    ///
    /// Records written before multi-turn conversations carry only a
    /// `geminiResponse`; those are rewritten once as a single assistant
    /// turn so later loads see a normal history. Unknown ids yield an
    /// empty history.
    pub fn load_history(&mut self, id: &str) -> Result<Vec<Turn>> {
        let mut plans = self.list()?;
        let Some(record) = plans.iter_mut().find(|p| p.id == id) else {
            return Ok(vec![]);
        };

        if record.conversation_history.is_empty() && !record.legacy_last_response.is_empty() {
            tracing::info!(id, "migrating legacy single-response record");
            record
                .conversation_history
                .push(Turn::assistant(record.legacy_last_response.clone()));
            let history = record.conversation_history.clone();
            self.persist(&plans)?;
            return Ok(history);
        }

        Ok(record.conversation_history.clone())
    }

    // ============================================
    // Assistant settings
    // ============================================

    /// Saved Gemini API key, if any.
    pub fn api_key(&self) -> Result<Option<String>> {
        self.kv.get(API_KEY_KEY)
    }

    /// Persist the Gemini API key (raw string).
    pub fn save_api_key(&mut self, key: &str) -> Result<()> {
        self.kv.set(API_KEY_KEY, key)
    }

    /// Saved model selection; unknown or missing values fall back to the
    /// default flash-class model.
    pub fn model(&self) -> Result<GeminiModel> {
        Ok(self
            .kv
            .get(MODEL_KEY)?
            .and_then(|s| s.parse().ok())
            .unwrap_or_default())
    }

    /// Persist the model selection.
    pub fn save_model(&mut self, model: GeminiModel) -> Result<()> {
        self.kv.set(MODEL_KEY, model.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryKvStore;
    use serde_json::json;

    fn store() -> PlanStore<MemoryKvStore> {
        PlanStore::new(MemoryKvStore::new())
    }

    fn payload(marker: u64) -> Value {
        json!([{"Plan": {"Node Type": "Seq Scan", "Total Cost": marker}}])
    }

    #[test]
    fn list_is_empty_before_first_save() {
        assert!(store().list().unwrap().is_empty());
    }

    #[test]
    fn create_prepends_newest_first() {
        let mut store = store();
        let a = store.create(payload(1), "").unwrap();
        let b = store.create(payload(2), "").unwrap();

        let plans = store.list().unwrap();
        assert_eq!(plans.len(), 2);
        assert_eq!(plans[0].id, b.id);
        assert_eq!(plans[1].id, a.id);
        // Ids are unique and monotonic even within one millisecond
        assert!(b.id.parse::<i64>().unwrap() > a.id.parse::<i64>().unwrap());
    }

    #[test]
    fn save_deduplicates_structurally_equal_payloads() {
        let mut store = store();
        let first = store.save(payload(7), "SELECT 1").unwrap();
        let second = store.save(payload(7), "SELECT 1 -- again").unwrap();

        assert_eq!(first.id, second.id);
        assert!(second.timestamp >= first.timestamp);
        let plans = store.list().unwrap();
        assert_eq!(plans.len(), 1);
        assert_eq!(plans[0].query, "SELECT 1 -- again");

        // A structurally different payload gets its own record
        let third = store.save(payload(8), "").unwrap();
        assert_ne!(third.id, first.id);
        assert_eq!(store.list().unwrap().len(), 2);
    }

    #[test]
    fn key_order_does_not_break_dedup() {
        // serde_json sorts object keys, so these fingerprints agree
        let a: Value = serde_json::from_str(r#"{"Plan": {"Node Type": "X", "Total Cost": 1}}"#)
            .unwrap();
        let b: Value = serde_json::from_str(r#"{"Plan": {"Total Cost": 1, "Node Type": "X"}}"#)
            .unwrap();
        assert_eq!(fingerprint(&a), fingerprint(&b));
    }

    #[test]
    fn eviction_keeps_the_newest_fifty() {
        let mut store = store();
        let mut ids = vec![];
        for i in 0..51 {
            ids.push(store.create(payload(i), "").unwrap().id);
        }

        let plans = store.list().unwrap();
        assert_eq!(plans.len(), PLAN_CAPACITY);
        // Newest first, oldest evicted
        assert_eq!(plans[0].id, ids[50]);
        assert_eq!(plans.last().unwrap().id, ids[1]);
        assert!(!plans.iter().any(|p| p.id == ids[0]));
    }

    #[test]
    fn update_refreshes_data_but_not_conversation() {
        let mut store = store();
        let record = store.create(payload(1), "SELECT 1").unwrap();
        store
            .append_turn(&record.id, Turn::user("why slow?"))
            .unwrap();

        store.update(&record.id, payload(2), "SELECT 2").unwrap();
        let plans = store.list().unwrap();
        assert_eq!(plans[0].query, "SELECT 2");
        assert_eq!(plans[0].conversation_history.len(), 1);

        // Unknown id is a silent no-op
        store.update("missing", payload(3), "").unwrap();
        assert_eq!(store.list().unwrap().len(), 1);
    }

    #[test]
    fn remove_is_noop_for_absent_ids() {
        let mut store = store();
        let record = store.create(payload(1), "").unwrap();
        store.remove("missing").unwrap();
        assert_eq!(store.list().unwrap().len(), 1);
        store.remove(&record.id).unwrap();
        assert!(store.list().unwrap().is_empty());
    }

    #[test]
    fn assistant_turns_mirror_into_legacy_field() {
        let mut store = store();
        let record = store.create(payload(1), "").unwrap();

        store
            .append_turn(&record.id, Turn::user("what is a seq scan?"))
            .unwrap();
        store
            .append_turn(&record.id, Turn::assistant("a full table read"))
            .unwrap();

        let plans = store.list().unwrap();
        assert_eq!(plans[0].conversation_history.len(), 2);
        assert_eq!(plans[0].legacy_last_response, "a full table read");
        assert_eq!(plans[0].last_assistant_text(), Some("a full table read"));
    }

    #[test]
    fn legacy_records_migrate_once_on_read() {
        let mut store = store();
        let record = store.create(payload(1), "").unwrap();

        // Simulate a record written by the pre-conversation client
        let mut plans = store.list().unwrap();
        plans[0].legacy_last_response = "old analysis".to_string();
        let blob = serde_json::to_string(&plans).unwrap();
        store.kv.set(PLANS_KEY, &blob).unwrap();

        let history = store.load_history(&record.id).unwrap();
        assert_eq!(history, vec![Turn::assistant("old analysis")]);

        // Idempotent: a second load does not duplicate the turn
        let history = store.load_history(&record.id).unwrap();
        assert_eq!(history.len(), 1);

        // And the migration was persisted
        let plans = store.list().unwrap();
        assert_eq!(plans[0].conversation_history.len(), 1);
    }

    #[test]
    fn settings_round_trip() {
        let mut store = store();
        assert_eq!(store.api_key().unwrap(), None);
        store.save_api_key("AIzaTest").unwrap();
        assert_eq!(store.api_key().unwrap().as_deref(), Some("AIzaTest"));

        assert_eq!(store.model().unwrap(), GeminiModel::Flash);
        store.save_model(GeminiModel::Pro).unwrap();
        assert_eq!(store.model().unwrap(), GeminiModel::Pro);
    }
}
