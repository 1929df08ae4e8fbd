//! Chat Store
//!
//! Per-user context lists, recent questions, interaction history, and patient
//! records.
//! Every list is bounded; writers re-apply the caps on each update.

pub mod bounded;
pub mod persistence;

pub use bounded::BoundedList;
pub use persistence::SledChatStore;

use crate::error::StorageError;
use crate::patient::PatientRecord;
use crate::provider::ProviderKind;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A user's bounded list of remembered strings (contexts or recent questions)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextRecord {
    pub user_id: String,
    pub data: BoundedList,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ContextRecord {
    pub fn new(user_id: &str, capacity: usize, now: DateTime<Utc>) -> Self {
        Self {
            user_id: user_id.to_string(),
            data: BoundedList::new(capacity),
            created_at: now,
            updated_at: now,
        }
    }
}

/// One answered question
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InteractionTurn {
    pub session_id: String,
    pub provider: ProviderKind,
    pub question: String,
    pub answer: String,
    pub response_time_ms: u64,
    pub timestamp: DateTime<Utc>,
}

/// A user's interaction history, oldest turn first
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryRecord {
    pub user_id: String,
    pub turns: Vec<InteractionTurn>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl HistoryRecord {
    pub fn new(user_id: &str, now: DateTime<Utc>) -> Self {
        Self {
            user_id: user_id.to_string(),
            turns: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Append a turn, dropping the oldest turns beyond `capacity`.
    pub fn push(&mut self, turn: InteractionTurn, capacity: usize) {
        self.updated_at = turn.timestamp;
        self.turns.push(turn);
        if self.turns.len() > capacity {
            let excess = self.turns.len() - capacity;
            self.turns.drain(..excess);
        }
    }

    /// The newest `n` turns, oldest first.
    pub fn recent(&self, n: usize) -> &[InteractionTurn] {
        let start = self.turns.len().saturating_sub(n);
        &self.turns[start..]
    }
}

/// Context list storage
pub trait ContextStore: Send + Sync {
    fn get_contexts(&self, user_id: &str) -> Result<Option<ContextRecord>, StorageError>;

    /// Merge `items` into the user's list (front, request order kept) under `capacity`.
    fn merge_contexts(
        &self,
        user_id: &str,
        items: &[String],
        capacity: usize,
    ) -> Result<ContextRecord, StorageError>;

    /// Returns whether a record existed.
    fn clear_contexts(&self, user_id: &str) -> Result<bool, StorageError>;
}

/// Recent distinct questions, newest first
pub trait QuestionStore: Send + Sync {
    fn get_questions(&self, user_id: &str) -> Result<Option<ContextRecord>, StorageError>;

    /// Put `question` at the front of the user's list under `capacity`.
    fn record_question(
        &self,
        user_id: &str,
        question: &str,
        capacity: usize,
    ) -> Result<ContextRecord, StorageError>;
}

/// Interaction history storage
pub trait HistoryStore: Send + Sync {
    fn get_history(&self, user_id: &str) -> Result<Option<HistoryRecord>, StorageError>;

    fn append_turn(
        &self,
        user_id: &str,
        turn: InteractionTurn,
        capacity: usize,
    ) -> Result<HistoryRecord, StorageError>;
}

/// Patient record storage
pub trait PatientStore: Send + Sync {
    fn get_patient(&self, patient_id: &str) -> Result<Option<PatientRecord>, StorageError>;
    fn put_patient(&self, record: &PatientRecord) -> Result<(), StorageError>;
    fn list_patient_ids(&self) -> Result<Vec<String>, StorageError>;
}
