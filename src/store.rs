//! The article store and the aggregator that fills it.
//!
//! [`ArticleStore`] holds one [`ArticleRecord`] per descriptor, created empty
//! at load time and never removed. Bodies are written only by [`aggregate`],
//! which drains the fetch pipeline's channel; the store has no public write
//! path. The viewer reads snapshots and watches [`ArticleStore::revision`] to
//! know when to lay out the selected article again.

use crate::models::{ArticleDescriptor, ArticleRecord, FetchResult, FetchStatus};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use tokio::sync::mpsc;
use tracing::{debug, info, instrument, warn};

/// Fixed-size indexed buffer of articles shared by the aggregator and the viewer.
#[derive(Debug)]
pub struct ArticleStore {
    records: Vec<RwLock<ArticleRecord>>,
    revision: AtomicU64,
}

/// Per-status counts, for the footer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreCounts {
    pub pending: usize,
    pub loaded: usize,
    pub failed: usize,
}

impl ArticleStore {
    pub fn new(descriptors: Vec<ArticleDescriptor>) -> Self {
        let records = descriptors
            .into_iter()
            .map(|d| RwLock::new(ArticleRecord::new(d)))
            .collect();
        Self {
            records,
            revision: AtomicU64::new(0),
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Bumped on every body write.
    pub fn revision(&self) -> u64 {
        self.revision.load(Ordering::Acquire)
    }

    /// Snapshot of the record at `index`.
    pub fn record(&self, index: usize) -> Option<ArticleRecord> {
        self.records
            .get(index)
            .map(|slot| slot.read().unwrap_or_else(PoisonError::into_inner).clone())
    }

    /// Selection list labels, in index order.
    pub fn labels(&self) -> Vec<String> {
        self.records
            .iter()
            .map(|slot| slot.read().unwrap_or_else(PoisonError::into_inner).list_label())
            .collect()
    }

    pub fn counts(&self) -> StoreCounts {
        let mut counts = StoreCounts::default();
        for slot in &self.records {
            match slot.read().unwrap_or_else(PoisonError::into_inner).status {
                FetchStatus::Pending => counts.pending += 1,
                FetchStatus::Loaded => counts.loaded += 1,
                FetchStatus::NoMatches | FetchStatus::Unavailable => counts.failed += 1,
            }
        }
        counts
    }

    /// Overwrite the body at `result.index`. Last write wins.
    ///
    /// Returns `false` when the index is outside the store.
    fn write_body(&self, result: FetchResult) -> bool {
        let Some(slot) = self.records.get(result.index) else {
            return false;
        };
        {
            let mut record = slot.write().unwrap_or_else(PoisonError::into_inner);
            record.body = result.text;
            record.status = result.status;
        }
        self.revision.fetch_add(1, Ordering::Release);
        true
    }
}

/// What the aggregator saw before its channel closed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AggregateSummary {
    pub received: usize,
    pub loaded: usize,
    pub no_matches: usize,
    pub unavailable: usize,
    pub out_of_range: usize,
}

/// Write every received result into `store` until the channel closes.
///
/// This is the only writer of article bodies. Results arrive in completion
/// order, not index order.
#[instrument(level = "info", skip_all)]
pub async fn aggregate(mut rx: mpsc::Receiver<FetchResult>, store: Arc<ArticleStore>) -> AggregateSummary {
    let mut summary = AggregateSummary::default();

    while let Some(result) = rx.recv().await {
        summary.received += 1;
        let index = result.index;
        let status = result.status;

        if !store.write_body(result) {
            summary.out_of_range += 1;
            warn!(index, capacity = store.len(), "Dropping result for index outside the store");
            continue;
        }

        match status {
            FetchStatus::Loaded => summary.loaded += 1,
            FetchStatus::NoMatches => summary.no_matches += 1,
            FetchStatus::Unavailable => summary.unavailable += 1,
            FetchStatus::Pending => {}
        }
        debug!(index, ?status, "Stored article body");
    }

    info!(
        received = summary.received,
        loaded = summary.loaded,
        no_matches = summary.no_matches,
        unavailable = summary.unavailable,
        "Result channel closed; aggregation finished"
    );
    summary
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::models::ArticleMetadata;

    pub(crate) fn descriptors(count: usize) -> Vec<ArticleDescriptor> {
        (0..count)
            .map(|i| ArticleDescriptor {
                index: i,
                title: format!("Story {i}"),
                locator: format!("https://example.com/{i}"),
                metadata: ArticleMetadata::default(),
            })
            .collect()
    }

    #[test]
    fn test_store_starts_pending() {
        let store = ArticleStore::new(descriptors(3));
        assert_eq!(store.len(), 3);
        assert_eq!(store.revision(), 0);
        assert_eq!(
            store.counts(),
            StoreCounts {
                pending: 3,
                loaded: 0,
                failed: 0
            }
        );
        let record = store.record(1).unwrap();
        assert_eq!(record.body, "");
        assert_eq!(record.status, FetchStatus::Pending);
        assert!(store.record(3).is_none());
    }

    #[test]
    fn test_labels_follow_index_order() {
        let store = ArticleStore::new(descriptors(2));
        assert_eq!(store.labels(), vec!["000  Story 0", "001  Story 1"]);
    }

    #[tokio::test]
    async fn test_aggregate_writes_out_of_order_results() {
        let store = Arc::new(ArticleStore::new(descriptors(3)));
        let (tx, rx) = mpsc::channel(4);
        let handle = tokio::spawn(aggregate(rx, Arc::clone(&store)));

        tx.send(FetchResult::loaded(2, "third".into())).await.unwrap();
        tx.send(FetchResult::unavailable(0, "timeout")).await.unwrap();
        drop(tx);

        let summary = handle.await.unwrap();
        assert_eq!(summary.received, 2);
        assert_eq!(summary.loaded, 1);
        assert_eq!(summary.unavailable, 1);

        assert_eq!(store.record(2).unwrap().body, "third");
        assert_eq!(store.record(0).unwrap().body, "unavailable: timeout");
        assert_eq!(store.record(1).unwrap().status, FetchStatus::Pending);
        assert_eq!(store.revision(), 2);
    }

    #[tokio::test]
    async fn test_aggregate_last_write_wins_and_ignores_out_of_range() {
        let store = Arc::new(ArticleStore::new(descriptors(1)));
        let (tx, rx) = mpsc::channel(4);

        tx.send(FetchResult::loaded(0, "first".into())).await.unwrap();
        tx.send(FetchResult::loaded(0, "second".into())).await.unwrap();
        tx.send(FetchResult::loaded(9, "nowhere".into())).await.unwrap();
        drop(tx);

        let summary = aggregate(rx, Arc::clone(&store)).await;
        assert_eq!(summary.out_of_range, 1);
        assert_eq!(store.record(0).unwrap().body, "second");
        assert_eq!(store.revision(), 2);
    }
}
