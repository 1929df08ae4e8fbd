//! Most-recent-first list with a capacity and no duplicates.

use serde::{Deserialize, Serialize};

/// Ordered list of distinct strings, newest at index 0.
///
/// Invariants: `len() <= capacity()` and no two items are equal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundedList {
    capacity: usize,
    items: Vec<String>,
}

impl BoundedList {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            items: Vec::new(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn items(&self) -> &[String] {
        &self.items
    }

    pub fn into_items(self) -> Vec<String> {
        self.items
    }

    /// Change the capacity, dropping the oldest items if the list shrinks.
    pub fn set_capacity(&mut self, capacity: usize) {
        self.capacity = capacity;
        self.items.truncate(capacity);
    }

    /// Put `item` at the front.
    ///
    /// Blank items are ignored; an existing equal item is moved rather than
    /// duplicated. Returns whether the list changed.
    pub fn push(&mut self, item: &str) -> bool {
        let item = item.trim();
        if item.is_empty() || self.capacity == 0 {
            return false;
        }
        if self.items.first().map(String::as_str) == Some(item) {
            return false;
        }
        if let Some(pos) = self.items.iter().position(|existing| existing == item) {
            let existing = self.items.remove(pos);
            self.items.insert(0, existing);
        } else {
            self.items.insert(0, item.to_string());
            self.items.truncate(self.capacity);
        }
        true
    }

    /// Push a batch so that it ends up at the front in the order given.
    pub fn extend_front<I, S>(&mut self, items: I) -> bool
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let batch: Vec<S> = items.into_iter().collect();
        let mut changed = false;
        for item in batch.iter().rev() {
            changed |= self.push(item.as_ref());
        }
        changed
    }
}
