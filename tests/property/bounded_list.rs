//! Invariants of the context list and history caps under arbitrary input

use carechat::provider::ProviderKind;
use carechat::store::{BoundedList, HistoryRecord, InteractionTurn};
use chrono::Utc;
use proptest::prelude::*;
use std::collections::HashSet;

fn item() -> impl Strategy<Value = String> {
    // Small alphabet so duplicates and blanks actually occur
    prop_oneof![
        3 => "[a-e]{1,2}",
        1 => Just(String::new()),
        1 => Just("  ".to_string()),
        1 => " [a-c] ",
    ]
}

proptest! {
    #[test]
    fn push_keeps_cap_and_distinct(cap in 0usize..6, items in prop::collection::vec(item(), 0..40)) {
        let mut list = BoundedList::new(cap);
        for item in &items {
            list.push(item);
            prop_assert!(list.len() <= cap);
            let unique: HashSet<&String> = list.items().iter().collect();
            prop_assert_eq!(unique.len(), list.len());
            prop_assert!(list.items().iter().all(|i| !i.trim().is_empty() && i.trim() == i));
        }
    }

    #[test]
    fn last_non_blank_push_is_at_front(cap in 1usize..6, items in prop::collection::vec(item(), 1..40)) {
        let mut list = BoundedList::new(cap);
        for item in &items {
            list.push(item);
        }
        if let Some(last) = items.iter().rev().find(|i| !i.trim().is_empty()) {
            prop_assert_eq!(list.items().first().map(String::as_str), Some(last.trim()));
        } else {
            prop_assert!(list.is_empty());
        }
    }

    #[test]
    fn extend_front_matches_reverse_pushes(cap in 1usize..6, batch in prop::collection::vec(item(), 0..10)) {
        let mut extended = BoundedList::new(cap);
        extended.extend_front(&batch);
        let mut pushed = BoundedList::new(cap);
        for item in batch.iter().rev() {
            pushed.push(item);
        }
        prop_assert_eq!(extended, pushed);
    }

    #[test]
    fn history_keeps_newest_turns(cap in 1usize..8, count in 0usize..30) {
        let mut record = HistoryRecord::new("u", Utc::now());
        for i in 0..count {
            record.push(
                InteractionTurn {
                    session_id: "s".to_string(),
                    provider: ProviderKind::Gemini,
                    question: i.to_string(),
                    answer: String::new(),
                    response_time_ms: 0,
                    timestamp: Utc::now(),
                },
                cap,
            );
        }
        prop_assert_eq!(record.turns.len(), count.min(cap));
        let expected: Vec<String> = (count.saturating_sub(cap)..count).map(|i| i.to_string()).collect();
        let actual: Vec<String> = record.turns.iter().map(|t| t.question.clone()).collect();
        prop_assert_eq!(actual, expected);
    }
}
