//! Paced, bounded-concurrency fetching of article bodies.
//!
//! [`FetchPipeline::run`] walks the descriptors in index order and spawns one
//! fetch task per non-blank locator. Dispatch is paced by [`PacingPolicy`]:
//! after the descriptor at every `batch_size`-th position (0, 16, 32, ...)
//! the dispatcher waits `interval` before going on. Tasks already spawned
//! keep running during the pause.
//!
//! Each task waits for a permit from the in-flight semaphore before touching
//! the network, then sends exactly one [`FetchResult`] through the bounded
//! channel, blocking while it is full. Fetch failures become readable bodies;
//! nothing a single article does can stop the run.
//!
//! Cancelling the token stops dispatch and abandons in-flight fetches. `run`
//! returns once every task has retired, dropping the last sender so the
//! aggregator sees the channel close.

use crate::fetch::FetchDocument;
use crate::models::{ArticleDescriptor, FetchResult};
use crate::scrapers::article::{BodySelector, extract_body};
use crate::utils::truncate_for_log;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Semaphore, mpsc};
use tokio::task::JoinSet;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

/// Dispatch-side throttle toward the upstream site.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacingPolicy {
    /// Pause after every position that is a multiple of this. Zero disables pacing.
    pub batch_size: usize,
    /// Length of each pause.
    pub interval: Duration,
}

impl PacingPolicy {
    pub const fn new(batch_size: usize, interval: Duration) -> Self {
        Self { batch_size, interval }
    }

    /// Whether the dispatcher pauses after handling `position`.
    pub fn pauses_after(&self, position: usize) -> bool {
        self.batch_size > 0 && !self.interval.is_zero() && position % self.batch_size == 0
    }
}

impl Default for PacingPolicy {
    fn default() -> Self {
        Self::new(16, Duration::from_secs(2))
    }
}

/// What the dispatcher did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
    /// Fetch tasks spawned.
    pub dispatched: usize,
    /// Descriptors skipped for having a blank locator.
    pub skipped: usize,
    /// Pacing pauses taken.
    pub pauses: usize,
    /// Whether the run was cut short by cancellation.
    pub cancelled: bool,
}

/// Fetches article bodies and sends them, one result per dispatched task.
pub struct FetchPipeline<F> {
    fetcher: Arc<F>,
    selector: Arc<BodySelector>,
    pacing: PacingPolicy,
    in_flight: Arc<Semaphore>,
    cancel: CancellationToken,
}

impl<F> FetchPipeline<F>
where
    F: FetchDocument + Send + Sync + 'static,
{
    /// `max_in_flight` bounds concurrent network fetches, not spawned tasks.
    pub fn new(
        fetcher: Arc<F>,
        selector: BodySelector,
        pacing: PacingPolicy,
        max_in_flight: usize,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            fetcher,
            selector: Arc::new(selector),
            pacing,
            in_flight: Arc::new(Semaphore::new(max_in_flight.max(1))),
            cancel,
        }
    }

    /// Dispatch every descriptor and wait for all fetch tasks to retire.
    ///
    /// Descriptors are dispatched in order, one spawned task each, with a
    /// pacing pause after each position the [`PacingPolicy`] selects. Blank
    /// locators are skipped. Each task sends exactly one [`FetchResult`] and
    /// waits while the channel is full, so no result is dropped. `tx` is
    /// dropped once every task has retired, which ends the receiver's loop.
    ///
    /// # Arguments
    ///
    /// * `descriptors` - Articles to fetch, in dispatch order
    /// * `tx` - Sending half of the result channel read by the aggregator
    ///
    /// # Returns
    ///
    /// A [`DispatchReport`] with dispatch, skip and pause counts, and whether
    /// the run was cancelled.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let (tx, rx) = mpsc::channel(16);
    /// let aggregator = tokio::spawn(aggregate(rx, Arc::clone(&store)));
    /// let report = pipeline.run(descriptors, tx).await;
    /// let summary = aggregator.await?;
    /// ```
    #[instrument(level = "info", skip_all, fields(articles = descriptors.len()))]
    pub async fn run(self, descriptors: Vec<ArticleDescriptor>, tx: mpsc::Sender<FetchResult>) -> DispatchReport {
        let mut tasks = JoinSet::new();
        let mut report = DispatchReport::default();

        for (position, descriptor) in descriptors.into_iter().enumerate() {
            if self.cancel.is_cancelled() {
                report.cancelled = true;
                break;
            }

            if descriptor.locator.is_empty() {
                debug!(index = descriptor.index, "Blank locator; not fetching");
                report.skipped += 1;
            } else {
                tasks.spawn(fetch_one(
                    Arc::clone(&self.fetcher),
                    Arc::clone(&self.selector),
                    Arc::clone(&self.in_flight),
                    self.cancel.clone(),
                    descriptor,
                    tx.clone(),
                ));
                report.dispatched += 1;
            }

            if self.pacing.pauses_after(position) {
                report.pauses += 1;
                debug!(position, interval = ?self.pacing.interval, "Pacing dispatch");
                tokio::select! {
                    _ = self.cancel.cancelled() => {
                        report.cancelled = true;
                        break;
                    }
                    _ = sleep(self.pacing.interval) => {}
                }
            }
        }
        drop(tx);

        info!(
            dispatched = report.dispatched,
            skipped = report.skipped,
            pauses = report.pauses,
            "Dispatch finished; waiting for fetch tasks"
        );

        let mut aborted = false;
        loop {
            tokio::select! {
                _ = self.cancel.cancelled(), if !aborted => {
                    aborted = true;
                    report.cancelled = true;
                    tasks.abort_all();
                }
                joined = tasks.join_next() => match joined {
                    None => break,
                    Some(Err(e)) if e.is_panic() => error!(error = %e, "Fetch task panicked"),
                    Some(_) => {}
                }
            }
        }

        info!(cancelled = report.cancelled, "All fetch tasks retired");
        report
    }
}

async fn fetch_one<F>(
    fetcher: Arc<F>,
    selector: Arc<BodySelector>,
    in_flight: Arc<Semaphore>,
    cancel: CancellationToken,
    descriptor: ArticleDescriptor,
    tx: mpsc::Sender<FetchResult>,
) where
    F: FetchDocument + Send + Sync,
{
    let index = descriptor.index;
    let result = tokio::select! {
        _ = cancel.cancelled() => return,
        result = fetch_body(fetcher.as_ref(), &selector, &in_flight, &descriptor) => result,
    };

    tokio::select! {
        _ = cancel.cancelled() => {}
        sent = tx.send(result) => {
            if sent.is_err() {
                debug!(index, "Result channel closed; dropping body");
            }
        }
    }
}

async fn fetch_body<F>(
    fetcher: &F,
    selector: &BodySelector,
    in_flight: &Semaphore,
    descriptor: &ArticleDescriptor,
) -> FetchResult
where
    F: FetchDocument,
{
    let index = descriptor.index;
    let Ok(_permit) = in_flight.acquire().await else {
        return FetchResult::unavailable(index, crate::error::FetchError::Cancelled);
    };

    match fetcher.fetch(&descriptor.locator).await {
        Ok(html) => extract_body(index, &descriptor.locator, &html, selector),
        Err(e) => {
            warn!(
                index,
                locator = %truncate_for_log(&descriptor.locator, 120),
                error = %e,
                "Article fetch failed"
            );
            FetchResult::unavailable(index, e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FetchError;
    use crate::fetch::tests::StaticFetcher;
    use crate::models::FetchStatus;
    use crate::store::tests::descriptors;
    use crate::store::{ArticleStore, aggregate};
    use std::sync::atomic::Ordering;
    use tokio::time::Instant;

    const PAGE: &str = r#"<div class="storyDetail"><p>A</p><p></p><p>B</p></div>"#;

    fn fetcher_for(descriptors: &[ArticleDescriptor]) -> StaticFetcher {
        descriptors
            .iter()
            .filter(|d| !d.locator.is_empty())
            .fold(StaticFetcher::default(), |f, d| f.with_page(&d.locator, PAGE))
    }

    fn pipeline<F>(fetcher: Arc<F>, pacing: PacingPolicy, cancel: CancellationToken) -> FetchPipeline<F>
    where
        F: FetchDocument + Send + Sync + 'static,
    {
        let selector = BodySelector::parse(".storyDetail > p").unwrap();
        FetchPipeline::new(fetcher, selector, pacing, 8, cancel)
    }

    #[test]
    fn test_pacing_positions() {
        let pacing = PacingPolicy::default();
        let paused: Vec<usize> = (0..40).filter(|&i| pacing.pauses_after(i)).collect();
        assert_eq!(paused, vec![0, 16, 32]);

        assert!(!PacingPolicy::new(0, Duration::from_secs(2)).pauses_after(0));
        assert!(!PacingPolicy::new(16, Duration::ZERO).pauses_after(0));
    }

    #[tokio::test(start_paused = true)]
    async fn test_thirty_three_dispatches_pause_three_times() {
        let descriptors = descriptors(33);
        let fetcher = Arc::new(fetcher_for(&descriptors));
        let store = Arc::new(ArticleStore::new(descriptors.clone()));
        let (tx, rx) = mpsc::channel(16);

        let aggregator = tokio::spawn(aggregate(rx, Arc::clone(&store)));
        let report = pipeline(Arc::clone(&fetcher), PacingPolicy::default(), CancellationToken::new())
            .run(descriptors, tx)
            .await;
        let summary = aggregator.await.unwrap();

        assert_eq!(report.dispatched, 33);
        assert_eq!(report.pauses, 3);
        assert!(!report.cancelled);
        assert_eq!(summary.loaded, 33);
        assert_eq!(store.record(32).unwrap().body, "A\n\nB");
    }

    #[tokio::test(start_paused = true)]
    async fn test_blank_locator_is_never_fetched() {
        let mut descriptors = descriptors(3);
        descriptors[1].locator.clear();
        let fetcher = Arc::new(fetcher_for(&descriptors));
        let store = Arc::new(ArticleStore::new(descriptors.clone()));
        let (tx, rx) = mpsc::channel(16);

        let aggregator = tokio::spawn(aggregate(rx, Arc::clone(&store)));
        let report = pipeline(Arc::clone(&fetcher), PacingPolicy::default(), CancellationToken::new())
            .run(descriptors, tx)
            .await;
        let summary = aggregator.await.unwrap();

        assert_eq!(report.dispatched, 2);
        assert_eq!(report.skipped, 1);
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 2);
        assert_eq!(summary.received, 2);

        let counts = store.counts();
        assert_eq!(counts.pending, 1);
        assert_eq!(counts.loaded, 2);
        assert_eq!(store.record(1).unwrap().body, "");
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_fetch_becomes_placeholder_body() {
        let descriptors = descriptors(3);
        let fetcher = Arc::new(fetcher_for(&descriptors).with_error(
            &descriptors[0].locator,
            FetchError::Http {
                url: descriptors[0].locator.clone(),
                status: 503,
            },
        ));
        let store = Arc::new(ArticleStore::new(descriptors.clone()));
        let (tx, rx) = mpsc::channel(16);

        let aggregator = tokio::spawn(aggregate(rx, Arc::clone(&store)));
        pipeline(fetcher, PacingPolicy::default(), CancellationToken::new())
            .run(descriptors, tx)
            .await;
        let summary = aggregator.await.unwrap();

        assert_eq!(summary.unavailable, 1);
        assert_eq!(summary.loaded, 2);
        let failed = store.record(0).unwrap();
        assert_eq!(failed.status, FetchStatus::Unavailable);
        assert!(failed.body.starts_with("unavailable: "));
        assert!(failed.body.contains("503"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_selector_without_matches_reports_diagnostic() {
        let descriptors = descriptors(1);
        let fetcher = Arc::new(StaticFetcher::default().with_page(&descriptors[0].locator, "<p>nothing</p>"));
        let (tx, mut rx) = mpsc::channel(16);

        pipeline(fetcher, PacingPolicy::default(), CancellationToken::new())
            .run(descriptors, tx)
            .await;

        let result = rx.recv().await.unwrap();
        assert_eq!(result.status, FetchStatus::NoMatches);
        assert!(result.text.contains(".storyDetail > p"));
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_pause_does_not_hold_back_dispatched_tasks() {
        let descriptors = descriptors(2);
        let fetcher = Arc::new(fetcher_for(&descriptors));
        let (tx, mut rx) = mpsc::channel(16);
        let start = Instant::now();

        let run = tokio::spawn(
            pipeline(fetcher, PacingPolicy::default(), CancellationToken::new()).run(descriptors, tx),
        );

        let first = rx.recv().await.unwrap();
        assert_eq!(first.index, 0);
        assert!(start.elapsed() < Duration::from_secs(2));

        let second = rx.recv().await.unwrap();
        assert_eq!(second.index, 1);
        assert!(start.elapsed() >= Duration::from_secs(2));

        assert_eq!(run.await.unwrap().pauses, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_full_channel_blocks_senders_without_losing_results() {
        let descriptors = descriptors(5);
        let fetcher = Arc::new(fetcher_for(&descriptors));
        let (tx, mut rx) = mpsc::channel(1);

        let run = tokio::spawn(
            pipeline(fetcher, PacingPolicy::new(0, Duration::ZERO), CancellationToken::new())
                .run(descriptors, tx),
        );

        // nothing reads yet: one result is buffered, the other senders wait
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert!(!run.is_finished());

        let mut indices = Vec::new();
        while let Some(result) = rx.recv().await {
            assert_eq!(result.status, FetchStatus::Loaded);
            indices.push(result.index);
        }
        indices.sort_unstable();
        assert_eq!(indices, vec![0, 1, 2, 3, 4]);

        let report = run.await.unwrap();
        assert_eq!(report.dispatched, 5);
        assert!(!report.cancelled);
    }

    /// Never answers.
    struct HangingFetcher;

    impl FetchDocument for HangingFetcher {
        async fn fetch(&self, _url: &str) -> Result<String, FetchError> {
            std::future::pending().await
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_retires_tasks_and_closes_channel() {
        let cancel = CancellationToken::new();
        let store = Arc::new(ArticleStore::new(descriptors(40)));
        let (tx, rx) = mpsc::channel(16);

        let aggregator = tokio::spawn(aggregate(rx, Arc::clone(&store)));
        let run = tokio::spawn(pipeline(Arc::new(HangingFetcher), PacingPolicy::default(), cancel.clone()).run(descriptors(40), tx));

        tokio::time::sleep(Duration::from_secs(3)).await;
        cancel.cancel();

        let report = run.await.unwrap();
        assert!(report.cancelled);
        assert!(report.dispatched < 40);

        let summary = aggregator.await.unwrap();
        assert_eq!(summary.received, 0);
        assert_eq!(store.counts().pending, 40);
    }
}
