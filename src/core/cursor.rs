//! Streaming join cursor
//!
//! Pages through the primary form joined to its cases with keyset pagination
//! on the case id, so memory stays bounded by one batch regardless of the
//! result size. Each fetch may be bounded by a timeout.

use crate::adapters::store::CaseSource;
use crate::core::category::InclusionPredicate;
use crate::core::links::{LinkJoin, LinkSelection};
use crate::domain::{CatexError, FormName, Result, RowGroup, StoreError};
use futures::stream::{self, BoxStream, StreamExt};
use std::sync::Arc;
use std::time::Duration;

/// Default number of row-groups per fetch
pub const DEFAULT_BATCH_SIZE: usize = 200;

/// What the cursor asks the store for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinQuery {
    pub form: FormName,
    pub joins: Vec<LinkJoin>,
    pub inclusion: InclusionPredicate,
    pub link_selection: LinkSelection,
}

/// Counters kept while streaming
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CursorStats {
    pub batches: usize,
    pub rows_fetched: usize,
    pub rows_included: usize,
}

/// Keyset cursor over a [`CaseSource`]
pub struct JoinCursor {
    source: Arc<dyn CaseSource>,
    query: JoinQuery,
    batch_size: usize,
    fetch_timeout: Option<Duration>,
    after: Option<i64>,
    exhausted: bool,
    stats: CursorStats,
}

impl JoinCursor {
    pub fn new(source: Arc<dyn CaseSource>, query: JoinQuery, batch_size: usize) -> Self {
        Self {
            source,
            query,
            batch_size: batch_size.max(1),
            fetch_timeout: None,
            after: None,
            exhausted: false,
            stats: CursorStats::default(),
        }
    }

    pub fn with_fetch_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    pub fn stats(&self) -> CursorStats {
        self.stats
    }

    /// Fetches the next batch of included row-groups
    ///
    /// Returns `Ok(None)` once the source is exhausted. A returned batch may be
    /// empty when none of its rows pass the inclusion predicate.
    pub async fn next_batch(&mut self) -> Result<Option<Vec<RowGroup>>> {
        if self.exhausted {
            return Ok(None);
        }

        let fetch = self
            .source
            .fetch_batch(&self.query, self.after, self.batch_size);
        let batch = match self.fetch_timeout {
            Some(limit) => tokio::time::timeout(limit, fetch)
                .await
                .map_err(|_| CatexError::Timeout(limit.as_secs()))??,
            None => fetch.await?,
        };

        if batch.len() < self.batch_size {
            self.exhausted = true;
        }
        if batch.is_empty() {
            return Ok(None);
        }

        for group in &batch {
            if self.after.is_some_and(|after| group.case.id <= after) {
                return Err(StoreError::MalformedRow(format!(
                    "case id {} returned out of order after {:?}",
                    group.case.id, self.after
                ))
                .into());
            }
            self.after = Some(group.case.id);
        }

        self.stats.batches += 1;
        self.stats.rows_fetched += batch.len();

        let mut included = Vec::with_capacity(batch.len());
        for group in batch {
            if !self.query.inclusion.matches(&group.case) {
                continue;
            }
            if self.query.link_selection == LinkSelection::Strict {
                for join in &self.query.joins {
                    LinkSelection::Strict.select(&group.case, &join.link)?;
                }
            }
            included.push(group);
        }
        self.stats.rows_included += included.len();

        crate::log_batch_fetched!(
            self.stats.batches,
            self.stats.rows_fetched,
            included.len(),
            self.after
        );

        Ok(Some(included))
    }

    /// Turns the cursor into a stream of batches, each with the counters so far
    pub fn into_batches(self) -> BoxStream<'static, Result<(Vec<RowGroup>, CursorStats)>> {
        stream::try_unfold(self, |mut cursor| async move {
            let batch = cursor.next_batch().await?;
            Ok::<_, CatexError>(batch.map(|batch| {
                let stats = cursor.stats();
                ((batch, stats), cursor)
            }))
        })
        .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::MemoryStore;
    use crate::domain::{CaseRecord, FormSubmission};
    use futures::TryStreamExt;
    use serde_json::json;

    fn store_with_cases(n: i64) -> Arc<MemoryStore> {
        let store = MemoryStore::new();
        for id in 1..=n {
            let code = if id % 2 == 0 { "mlp_1" } else { "tot_1" };
            store.add_case(
                CaseRecord::new(id, format!("u{id}")).with_variable(code, 1),
                "demo_case",
                FormSubmission::new(format!("u{id}"), json!({"age": id})),
            );
        }
        Arc::new(store)
    }

    fn query(codes: &[&str]) -> JoinQuery {
        JoinQuery {
            form: FormName::new("demo_case").unwrap(),
            joins: Vec::new(),
            inclusion: InclusionPredicate::new(codes.iter().copied()),
            link_selection: LinkSelection::Last,
        }
    }

    async fn collect_ids(cursor: JoinCursor) -> Vec<i64> {
        let batches: Vec<(Vec<RowGroup>, CursorStats)> =
            cursor.into_batches().try_collect().await.unwrap();
        batches
            .into_iter()
            .flat_map(|(batch, _)| batch)
            .map(|group| group.case.id)
            .collect()
    }

    #[tokio::test]
    async fn test_same_rows_for_any_batch_size() {
        let store = store_with_cases(11);
        let mut previous = None;
        for batch_size in [1, 3, 5, 11, 200] {
            let cursor = JoinCursor::new(store.clone(), query(&["mlp_1"]), batch_size);
            let ids = collect_ids(cursor).await;
            assert_eq!(ids, vec![2, 4, 6, 8, 10]);
            if let Some(prev) = previous.replace(ids.clone()) {
                assert_eq!(prev, ids);
            }
        }
    }

    #[tokio::test]
    async fn test_stats_and_exhaustion() {
        let store = store_with_cases(5);
        let mut cursor = JoinCursor::new(store, query(&["mlp_1", "tot_1"]), 2);
        let mut total = 0;
        while let Some(batch) = cursor.next_batch().await.unwrap() {
            total += batch.len();
        }
        assert_eq!(total, 5);
        assert_eq!(cursor.stats().rows_fetched, 5);
        assert_eq!(cursor.stats().batches, 3);
        assert!(cursor.next_batch().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_stream_carries_running_stats() {
        let store = store_with_cases(5);
        let cursor = JoinCursor::new(store, query(&["mlp_1", "tot_1"]), 2);
        let stats: Vec<CursorStats> = cursor
            .into_batches()
            .map_ok(|(_, stats)| stats)
            .try_collect()
            .await
            .unwrap();

        assert_eq!(stats.len(), 3);
        assert_eq!(stats[0].batches, 1);
        assert_eq!(stats[0].rows_fetched, 2);
        assert_eq!(stats[2].rows_fetched, 5);
        assert_eq!(stats[2].rows_included, 5);
    }

    #[tokio::test]
    async fn test_empty_source() {
        let store = Arc::new(MemoryStore::new());
        let cursor = JoinCursor::new(store, query(&["mlp_1"]), 10);
        assert!(collect_ids(cursor).await.is_empty());
    }

    #[tokio::test]
    async fn test_strict_links_fail_mid_stream() {
        let store = MemoryStore::new();
        store.add_form_submission("demo_alert", FormSubmission::new("a1", json!({})));
        store.add_form_submission("demo_alert", FormSubmission::new("a2", json!({})));
        store.add_case(
            CaseRecord::new(1, "u1")
                .with_variable("mlp_1", 1)
                .with_link("alert", "a1")
                .with_link("alert", "a2"),
            "demo_case",
            FormSubmission::new("u1", json!({})),
        );

        let mut q = query(&["mlp_1"]);
        q.link_selection = LinkSelection::Strict;
        q.joins.push(LinkJoin {
            link: "alert".to_string(),
            target_form: FormName::new("demo_alert").unwrap(),
            slot: 0,
        });

        let mut cursor = JoinCursor::new(Arc::new(store), q, 10);
        assert!(matches!(
            cursor.next_batch().await,
            Err(CatexError::AmbiguousLink { case_id: 1, .. })
        ));
    }

    #[tokio::test]
    async fn test_fetch_failure_propagates() {
        let store = store_with_cases(4);
        store.fail_after_batches(1);
        let mut cursor = JoinCursor::new(store, query(&["mlp_1", "tot_1"]), 2);
        assert!(cursor.next_batch().await.unwrap().is_some());
        assert!(matches!(
            cursor.next_batch().await,
            Err(CatexError::Store(StoreError::QueryFailed(_)))
        ));
    }
}
