//! Persistence layer for the chat store

use crate::error::StorageError;
use crate::patient::PatientRecord;
use crate::store::{
    ContextRecord, ContextStore, HistoryRecord, HistoryStore, InteractionTurn, PatientStore,
    QuestionStore,
};
use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;
use tracing::debug;

const CONTEXTS_TREE: &str = "contexts";
const QUESTIONS_TREE: &str = "questions";
const HISTORY_TREE: &str = "history";
const PATIENTS_TREE: &str = "patients";

/// Sled-backed implementation of the context, question, history, and patient stores
pub struct SledChatStore {
    db: sled::Db,
    contexts: sled::Tree,
    questions: sled::Tree,
    history: sled::Tree,
    patients: sled::Tree,
}

impl SledChatStore {
    /// Open (or create) the store at `path`.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        let db = sled::open(path.as_ref()).map_err(|e| {
            StorageError::Database(format!(
                "Failed to open sled database at {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;
        Self::from_db(db)
    }

    /// In-memory store removed on drop.
    pub fn temporary() -> Result<Self, StorageError> {
        let db = sled::Config::new().temporary(true).open()?;
        Self::from_db(db)
    }

    pub fn from_db(db: sled::Db) -> Result<Self, StorageError> {
        let contexts = db.open_tree(CONTEXTS_TREE)?;
        let questions = db.open_tree(QUESTIONS_TREE)?;
        let history = db.open_tree(HISTORY_TREE)?;
        let patients = db.open_tree(PATIENTS_TREE)?;
        Ok(Self {
            db,
            contexts,
            questions,
            history,
            patients,
        })
    }

    /// Flush all pending writes to disk
    pub fn flush(&self) -> Result<(), StorageError> {
        self.db.flush()?;
        Ok(())
    }
}

fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, StorageError> {
    bincode::serialize(value).map_err(|e| StorageError::Encode(e.to_string()))
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, StorageError> {
    bincode::deserialize(bytes).map_err(|e| StorageError::Decode(e.to_string()))
}

fn read<T: DeserializeOwned>(tree: &sled::Tree, key: &str) -> Result<Option<T>, StorageError> {
    tree.get(key.as_bytes())?
        .map(|bytes| decode(&bytes))
        .transpose()
}

/// Read-modify-write one key, retrying until no concurrent writer got in between.
fn update<T, F>(tree: &sled::Tree, key: &str, mut apply: F) -> Result<T, StorageError>
where
    T: Serialize + DeserializeOwned,
    F: FnMut(Option<T>) -> T,
{
    loop {
        let current = tree.get(key.as_bytes())?;
        let previous = current.as_deref().map(decode::<T>).transpose()?;
        let next = apply(previous);
        let bytes = encode(&next)?;
        match tree.compare_and_swap(key.as_bytes(), current, Some(bytes))? {
            Ok(()) => return Ok(next),
            Err(_) => debug!(key, "concurrent update, retrying"),
        }
    }
}

/// Push `items` onto a user's bounded list, newest first, under `capacity`.
fn merge_list(
    tree: &sled::Tree,
    user_id: &str,
    items: &[&str],
    capacity: usize,
) -> Result<ContextRecord, StorageError> {
    update(tree, user_id, |previous: Option<ContextRecord>| {
        let now = Utc::now();
        let mut record = previous.unwrap_or_else(|| ContextRecord::new(user_id, capacity, now));
        record.data.set_capacity(capacity);
        record.data.extend_front(items);
        record.updated_at = now;
        record
    })
}

impl ContextStore for SledChatStore {
    fn get_contexts(&self, user_id: &str) -> Result<Option<ContextRecord>, StorageError> {
        read(&self.contexts, user_id)
    }

    fn merge_contexts(
        &self,
        user_id: &str,
        items: &[String],
        capacity: usize,
    ) -> Result<ContextRecord, StorageError> {
        let items: Vec<&str> = items.iter().map(String::as_str).collect();
        merge_list(&self.contexts, user_id, &items, capacity)
    }

    fn clear_contexts(&self, user_id: &str) -> Result<bool, StorageError> {
        Ok(self.contexts.remove(user_id.as_bytes())?.is_some())
    }
}

impl QuestionStore for SledChatStore {
    fn get_questions(&self, user_id: &str) -> Result<Option<ContextRecord>, StorageError> {
        read(&self.questions, user_id)
    }

    fn record_question(
        &self,
        user_id: &str,
        question: &str,
        capacity: usize,
    ) -> Result<ContextRecord, StorageError> {
        merge_list(&self.questions, user_id, &[question], capacity)
    }
}

impl HistoryStore for SledChatStore {
    fn get_history(&self, user_id: &str) -> Result<Option<HistoryRecord>, StorageError> {
        read(&self.history, user_id)
    }

    fn append_turn(
        &self,
        user_id: &str,
        turn: InteractionTurn,
        capacity: usize,
    ) -> Result<HistoryRecord, StorageError> {
        update(&self.history, user_id, |previous: Option<HistoryRecord>| {
            let mut record =
                previous.unwrap_or_else(|| HistoryRecord::new(user_id, turn.timestamp));
            record.push(turn.clone(), capacity);
            record
        })
    }
}

// Patient records carry free-form JSON (test results), which bincode cannot
// decode, so they are stored as JSON bytes.
impl PatientStore for SledChatStore {
    fn get_patient(&self, patient_id: &str) -> Result<Option<PatientRecord>, StorageError> {
        self.patients
            .get(patient_id.as_bytes())?
            .map(|bytes| {
                serde_json::from_slice(&bytes).map_err(|e| StorageError::Decode(e.to_string()))
            })
            .transpose()
    }

    fn put_patient(&self, record: &PatientRecord) -> Result<(), StorageError> {
        let bytes = serde_json::to_vec(record).map_err(|e| StorageError::Encode(e.to_string()))?;
        self.patients.insert(record.patient_id.as_bytes(), bytes)?;
        Ok(())
    }

    fn list_patient_ids(&self) -> Result<Vec<String>, StorageError> {
        self.patients
            .iter()
            .keys()
            .map(|key| -> Result<String, StorageError> {
                let key = key?;
                Ok(String::from_utf8_lossy(&key).into_owned())
            })
            .collect()
    }
}
