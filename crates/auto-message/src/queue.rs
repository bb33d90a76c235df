use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashSet};

use chrono::{DateTime, Utc};

/// Min-heap of appointment ids by due instant. An id is queued at most once.
#[derive(Debug, Default)]
pub struct DueQueue {
    heap: BinaryHeap<Reverse<(DateTime<Utc>, String)>>,
    queued: HashSet<String>,
}

impl DueQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false when `id` is already queued.
    pub fn push(&mut self, due: DateTime<Utc>, id: impl Into<String>) -> bool {
        let id = id.into();
        if !self.queued.insert(id.clone()) {
            return false;
        }
        self.heap.push(Reverse((due, id)));
        true
    }

    pub fn next_due(&self) -> Option<DateTime<Utc>> {
        self.heap.peek().map(|Reverse((due, _))| *due)
    }

    /// Removes and returns every id due at or before `now`, earliest first.
    pub fn pop_due(&mut self, now: DateTime<Utc>) -> Vec<String> {
        let mut due = Vec::new();
        while let Some(Reverse((at, _))) = self.heap.peek() {
            if *at > now {
                break;
            }
            if let Some(Reverse((_, id))) = self.heap.pop() {
                self.queued.remove(&id);
                due.push(id);
            }
        }
        due
    }

    pub fn contains(&self, id: &str) -> bool {
        self.queued.contains(id)
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_pop_due_in_order() {
        let now = Utc::now();
        let mut queue = DueQueue::new();
        queue.push(now + Duration::minutes(10), "later");
        queue.push(now - Duration::minutes(5), "earliest");
        queue.push(now, "now");

        assert_eq!(queue.next_due(), Some(now - Duration::minutes(5)));
        assert_eq!(queue.pop_due(now), vec!["earliest", "now"]);
        assert_eq!(queue.len(), 1);
        assert!(queue.contains("later"));
    }

    #[test]
    fn test_push_dedups() {
        let now = Utc::now();
        let mut queue = DueQueue::new();
        assert!(queue.push(now, "a"));
        assert!(!queue.push(now + Duration::minutes(1), "a"));
        assert_eq!(queue.len(), 1);
        queue.pop_due(now);
        assert!(queue.is_empty());
        assert!(queue.push(now, "a"));
    }
}
