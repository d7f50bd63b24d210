//! Shared, ordered log of collaborator calls.

use std::sync::Arc;

use parking_lot::Mutex;

/// Append-only call log shared by every scripted collaborator.
#[derive(Debug, Clone, Default)]
pub struct CallJournal {
    entries: Arc<Mutex<Vec<String>>>,
}

impl CallJournal {
    /// Empty journal.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one call.
    pub fn record(&self, call: impl Into<String>) {
        let call = call.into();
        tracing::trace!(call = %call, "collaborator call");
        self.entries.lock().push(call);
    }

    /// Every call in order.
    pub fn entries(&self) -> Vec<String> {
        self.entries.lock().clone()
    }

    /// How often `call` was recorded.
    pub fn count(&self, call: &str) -> usize {
        self.entries.lock().iter().filter(|e| *e == call).count()
    }

    /// Whether `call` was recorded at all.
    pub fn contains(&self, call: &str) -> bool {
        self.count(call) > 0
    }

    /// Index of the first occurrence of `call`.
    pub fn position(&self, call: &str) -> Option<usize> {
        self.entries.lock().iter().position(|e| e == call)
    }

    /// Entries that start with `prefix`, in order.
    pub fn with_prefix(&self, prefix: &str) -> Vec<String> {
        self.entries
            .lock()
            .iter()
            .filter(|e| e.starts_with(prefix))
            .cloned()
            .collect()
    }

    /// Forget everything recorded so far.
    pub fn clear(&self) {
        self.entries.lock().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positions_follow_record_order() {
        let journal = CallJournal::new();
        journal.record("a.one");
        journal.record("b.two");
        journal.record("a.one");

        assert_eq!(journal.count("a.one"), 2);
        assert_eq!(journal.position("b.two"), Some(1));
        assert_eq!(journal.with_prefix("a."), vec!["a.one", "a.one"]);
        assert!(!journal.contains("c"));
    }
}
