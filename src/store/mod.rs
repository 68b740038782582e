use std::collections::BTreeMap;
use std::sync::Mutex;

use chrono::Utc;

pub mod models;

pub use models::{NewReceipt, Receipt};

/// In-memory receipt record store. Process-lifetime only; everything is
/// discarded on restart. Built once at startup and shared by handle so
/// tests can run against an isolated instance.
#[derive(Debug, Default)]
pub struct ReceiptStore {
    inner: Mutex<Inner>,
}

#[derive(Debug)]
struct Inner {
    receipts: BTreeMap<i64, Receipt>,
    next_id: i64,
}

impl Default for Inner {
    fn default() -> Self {
        Inner {
            receipts: BTreeMap::new(),
            next_id: 1,
        }
    }
}

impl ReceiptStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Assigns the next id and the creation timestamp. Id assignment and
    /// insertion happen under one lock, so ids are unique and strictly
    /// increasing even across concurrent creates.
    pub fn create(&self, new: NewReceipt) -> anyhow::Result<Receipt> {
        let mut inner = self
            .inner
            .lock()
            .map_err(|_| anyhow::anyhow!("receipt store lock poisoned"))?;
        let id = inner.next_id;
        inner.next_id += 1;
        let receipt = Receipt {
            id,
            image_url: new.image_url,
            ocr_text: new.ocr_text,
            language: new.language,
            analysis_result: new.analysis_result,
            processed_at: Utc::now(),
        };
        inner.receipts.insert(id, receipt.clone());
        Ok(receipt)
    }

    pub fn get(&self, id: i64) -> Option<Receipt> {
        self.inner.lock().ok()?.receipts.get(&id).cloned()
    }

    /// All records in id order.
    pub fn list(&self) -> Vec<Receipt> {
        match self.inner.lock() {
            Ok(inner) => inner.receipts.values().cloned().collect(),
            Err(_) => Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.inner.lock().map(|i| i.receipts.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn sample(text: &str) -> NewReceipt {
        NewReceipt {
            image_url: None,
            ocr_text: Some(text.to_string()),
            language: "bg".to_string(),
            analysis_result: Some("Общо; ; 4.88".to_string()),
        }
    }

    #[test]
    fn create_assigns_increasing_ids_and_timestamps() {
        let store = ReceiptStore::new();
        let a = store.create(sample("first")).expect("create");
        let b = store.create(sample("second")).expect("create");
        assert_eq!(a.id, 1);
        assert_eq!(b.id, 2);
        assert!(b.processed_at >= a.processed_at);
    }

    #[test]
    fn get_and_list_return_what_was_created() {
        let store = ReceiptStore::new();
        let created = store.create(sample("text")).expect("create");
        let fetched = store.get(created.id).expect("receipt present");
        assert_eq!(fetched.ocr_text.as_deref(), Some("text"));
        assert!(store.get(999).is_none());
        assert_eq!(store.list().len(), 1);
    }

    #[tokio::test]
    async fn concurrent_creates_never_reuse_an_id() {
        let store = Arc::new(ReceiptStore::new());
        let mut handles = Vec::new();
        for _ in 0..8 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                let mut ids = Vec::new();
                for _ in 0..25 {
                    ids.push(store.create(sample("x")).expect("create").id);
                }
                ids
            }));
        }
        let mut all = Vec::new();
        for h in handles {
            all.extend(h.await.expect("join"));
        }
        all.sort_unstable();
        let before = all.len();
        all.dedup();
        assert_eq!(before, all.len(), "duplicate id handed out");
        assert_eq!(all.len(), 200);
    }
}
