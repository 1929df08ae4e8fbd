//! Store behavior under reopen and concurrent writers

use carechat::provider::ProviderKind;
use carechat::store::{ContextStore, HistoryStore, InteractionTurn, SledChatStore};
use chrono::Utc;
use std::collections::HashSet;
use std::sync::Arc;
use std::thread;
use tempfile::TempDir;

#[test]
fn concurrent_merges_keep_cap_and_uniqueness() {
    let store = Arc::new(SledChatStore::temporary().unwrap());
    let handles: Vec<_> = (0..8)
        .map(|t| {
            let store = store.clone();
            thread::spawn(move || {
                for i in 0..25 {
                    let items = vec![format!("ctx-{}", (t * 7 + i) % 12), "shared".to_string()];
                    store.merge_contexts("u1", &items, 3).unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let record = store.get_contexts("u1").unwrap().unwrap();
    let items = record.data.items();
    assert!(items.len() <= 3);
    let unique: HashSet<&String> = items.iter().collect();
    assert_eq!(unique.len(), items.len());
}

#[test]
fn concurrent_appends_are_not_lost_below_cap() {
    let store = Arc::new(SledChatStore::temporary().unwrap());
    let handles: Vec<_> = (0..4)
        .map(|t| {
            let store = store.clone();
            thread::spawn(move || {
                for i in 0..5 {
                    let turn = InteractionTurn {
                        session_id: format!("s{}", t),
                        provider: ProviderKind::OpenAI,
                        question: format!("q{}-{}", t, i),
                        answer: "a".to_string(),
                        response_time_ms: 1,
                        timestamp: Utc::now(),
                    };
                    store.append_turn("u1", turn, 100).unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }
    let history = store.get_history("u1").unwrap().unwrap();
    assert_eq!(history.turns.len(), 20);
}

#[test]
fn users_are_isolated_and_persist() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("store");
    {
        let store = SledChatStore::new(&path).unwrap();
        store
            .merge_contexts("alice", &["pregnant".to_string()], 3)
            .unwrap();
        store
            .merge_contexts("bob", &["age 80".to_string()], 3)
            .unwrap();
        store.flush().unwrap();
    }
    let store = SledChatStore::new(&path).unwrap();
    assert_eq!(
        store.get_contexts("alice").unwrap().unwrap().data.items(),
        ["pregnant"]
    );
    assert_eq!(
        store.get_contexts("bob").unwrap().unwrap().data.items(),
        ["age 80"]
    );
    assert!(store.get_contexts("carol").unwrap().is_none());
}

#[test]
fn lowering_the_cap_trims_on_next_write() {
    let store = SledChatStore::temporary().unwrap();
    let items: Vec<String> = ["a", "b", "c", "d", "e"].iter().map(|s| s.to_string()).collect();
    store.merge_contexts("u1", &items, 5).unwrap();
    let record = store.merge_contexts("u1", &["f".to_string()], 3).unwrap();
    assert_eq!(record.data.items(), ["f", "a", "b"]);
}
