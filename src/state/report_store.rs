use std::sync::{Arc, RwLock};

use crate::types::Snapshot;

/// Latest rendered document and last known-good data, shared by the pipeline,
/// the HTTP server and the chat bot.
#[derive(Default)]
pub struct ReportStore {
    document: RwLock<Option<Arc<str>>>,
    snapshot: RwLock<Option<Arc<Snapshot>>>,
}

impl ReportStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Replace the served document.
    pub fn set_document(&self, html: String) {
        if let Ok(mut doc) = self.document.write() {
            *doc = Some(Arc::from(html));
        }
    }

    pub fn document(&self) -> Option<Arc<str>> {
        self.document.read().ok().and_then(|d| d.clone())
    }

    /// Replace the last known-good snapshot.
    pub fn set_snapshot(&self, snapshot: Arc<Snapshot>) {
        if let Ok(mut snap) = self.snapshot.write() {
            *snap = Some(snapshot);
        }
    }

    pub fn snapshot(&self) -> Option<Arc<Snapshot>> {
        self.snapshot.read().ok().and_then(|s| s.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn starts_empty() {
        let store = ReportStore::new();
        assert!(store.document().is_none());
        assert!(store.snapshot().is_none());
    }

    #[test]
    fn latest_document_wins() {
        let store = ReportStore::new();
        store.set_document("<html>1</html>".to_string());
        store.set_document("<html>2</html>".to_string());
        assert_eq!(store.document().as_deref(), Some("<html>2</html>"));
    }

    #[test]
    fn snapshot_is_shared_not_copied() {
        let store = ReportStore::new();
        store.set_snapshot(Arc::new(Snapshot {
            records: Vec::new(),
            summary: Vec::new(),
            taken_at: Utc::now(),
        }));
        let a = store.snapshot().unwrap();
        let b = store.snapshot().unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }
}
