//! In-process read model using Moka.
//!
//! Snapshots and timelines live in two caches with their own time-to-live.
//! A timeline holds ordered slots referencing snapshots by id, so a status
//! change only has to replace the snapshot.

use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use moka::ops::compute::Op;
use moka::sync::Cache;
use paystore_shared::config::CacheConfig;
use paystore_shared::types::CursorPage;
use uuid::Uuid;

use super::{CacheError, Cacheable, ReadModel, SnapshotCache, Timelined};
use crate::ledger::store::HistoryScope;

#[derive(Debug, Clone)]
struct Slot {
    position: (DateTime<Utc>, Uuid),
    cursor: String,
    id: String,
}

impl Slot {
    fn of<T: Timelined>(item: &T) -> Self {
        Self {
            position: item.position(),
            cursor: item.cursor().to_string(),
            id: item.cache_id(),
        }
    }
}

/// Newest-first slots plus whether the oldest item has been reached.
#[derive(Debug, Clone, Default)]
struct Timeline {
    slots: Vec<Slot>,
    exhausted: bool,
}

impl Timeline {
    /// Inserts a slot at its ordered position, replacing any slot with the same id.
    ///
    /// Items older than the cached tail of an unexhausted timeline are skipped;
    /// seeding picks them up.
    fn insert(&mut self, slot: Slot) {
        self.slots.retain(|s| s.id != slot.id);
        let index = self
            .slots
            .iter()
            .position(|s| s.position < slot.position)
            .unwrap_or(self.slots.len());
        if index == self.slots.len() && !self.exhausted {
            return;
        }
        self.slots.insert(index, slot);
    }

    fn extend_after(&self, cursor_index: usize, slots: Vec<Slot>, exhausted: bool) -> Self {
        let mut merged: Vec<Slot> = self.slots[..=cursor_index].to_vec();
        for slot in slots {
            if !merged.iter().any(|s| s.id == slot.id) {
                merged.push(slot);
            }
        }
        Self {
            slots: merged,
            exhausted,
        }
    }
}

/// Moka-backed [`ReadModel`].
pub struct MokaReadModel<T> {
    items: Cache<String, T>,
    timelines: Cache<String, Arc<Timeline>>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Cacheable> MokaReadModel<T> {
    /// Creates a read model from the cache settings.
    #[must_use]
    pub fn new(config: &CacheConfig) -> Self {
        Self::with_config(
            config.max_capacity,
            config.record_ttl_secs,
            config.pagination_ttl_secs,
        )
    }

    /// Creates a read model with custom configuration.
    ///
    /// # Arguments
    ///
    /// * `max_capacity` - Maximum number of entries per cache
    /// * `record_ttl_secs` - Time-to-live of snapshots
    /// * `pagination_ttl_secs` - Time-to-live of timelines
    #[must_use]
    pub fn with_config(max_capacity: u64, record_ttl_secs: u64, pagination_ttl_secs: u64) -> Self {
        let items = Cache::builder()
            .max_capacity(max_capacity)
            .time_to_live(Duration::from_secs(record_ttl_secs))
            .build();
        let timelines = Cache::builder()
            .max_capacity(max_capacity)
            .time_to_live(Duration::from_secs(pagination_ttl_secs))
            .build();

        Self {
            items,
            timelines,
            _marker: PhantomData,
        }
    }

    fn item_key(id: &str) -> String {
        format!("{}:{id}", T::NAMESPACE)
    }

    /// Inserts `item` unless the cached snapshot is newer.
    fn put_snapshot(&self, item: &T) {
        self.items
            .entry(Self::item_key(&item.cache_id()))
            .and_compute_with(|entry| match entry {
                Some(entry) if entry.value().version() > item.version() => Op::Nop,
                _ => Op::Put(item.clone()),
            });
    }

    /// Drops every snapshot and timeline.
    pub fn invalidate_all(&self) {
        self.items.invalidate_all();
        self.timelines.invalidate_all();
    }

    /// Drops the timeline of a scope.
    pub fn invalidate_timeline(&self, scope: &HistoryScope) {
        self.timelines.invalidate(&scope.timeline_key(T::NAMESPACE));
    }

    /// Runs cache maintenance tasks.
    pub fn run_pending_tasks(&self) {
        self.items.run_pending_tasks();
        self.timelines.run_pending_tasks();
    }
}

#[async_trait]
impl<T: Cacheable> SnapshotCache<T> for MokaReadModel<T> {
    async fn set(&self, item: &T) -> Result<(), CacheError> {
        self.put_snapshot(item);
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<T>, CacheError> {
        Ok(self.items.get(&Self::item_key(id)))
    }
}

#[async_trait]
impl<T: Timelined> ReadModel<T> for MokaReadModel<T> {
    async fn append_to_timeline(&self, item: &T, scopes: &[HistoryScope]) -> Result<(), CacheError> {
        self.put_snapshot(item);

        for scope in scopes {
            let slot = Slot::of(item);
            self.timelines
                .entry(scope.timeline_key(T::NAMESPACE))
                .and_compute_with(|entry| match entry {
                    Some(entry) => {
                        let mut timeline = Timeline::clone(&entry.into_value());
                        timeline.insert(slot);
                        Op::Put(Arc::new(timeline))
                    }
                    None => Op::Nop,
                });
        }
        Ok(())
    }

    async fn fetch_page(
        &self,
        scope: &HistoryScope,
        cursor: Option<&str>,
        limit: u64,
    ) -> Result<Option<CursorPage<T>>, CacheError> {
        let Some(timeline) = self.timelines.get(&scope.timeline_key(T::NAMESPACE)) else {
            return Ok(None);
        };

        let start = match cursor {
            None => 0,
            Some(cursor) => match timeline.slots.iter().position(|s| s.cursor == cursor) {
                Some(index) => index + 1,
                None => return Ok(None),
            },
        };
        let limit = usize::try_from(limit).unwrap_or(usize::MAX);
        let end = start.saturating_add(limit).min(timeline.slots.len());
        if end - start < limit && !timeline.exhausted {
            return Ok(None);
        }

        let mut data = Vec::with_capacity(end - start);
        for slot in &timeline.slots[start..end] {
            match self.items.get(&Self::item_key(&slot.id)) {
                Some(item) => data.push(item),
                None => return Ok(None),
            }
        }

        let is_last_page = timeline.exhausted && end == timeline.slots.len();
        Ok(Some(CursorPage::new(data, is_last_page, |item| {
            item.cursor().to_string()
        })))
    }

    async fn seed(
        &self,
        scope: &HistoryScope,
        cursor: Option<&str>,
        items: &[T],
        exhausted: bool,
    ) -> Result<(), CacheError> {
        for item in items {
            self.put_snapshot(item);
        }
        let slots: Vec<Slot> = items.iter().map(Slot::of).collect();
        let key = scope.timeline_key(T::NAMESPACE);

        match cursor {
            None => {
                self.timelines
                    .insert(key, Arc::new(Timeline { slots, exhausted }));
            }
            Some(cursor) => {
                self.timelines.entry(key).and_compute_with(|entry| {
                    let Some(entry) = entry else {
                        return Op::Nop;
                    };
                    let timeline = entry.into_value();
                    match timeline.slots.iter().position(|s| s.cursor == cursor) {
                        Some(index) => Op::Put(Arc::new(timeline.extend_after(index, slots, exhausted))),
                        None => Op::Nop,
                    }
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::account::LedgerAccount;
    use crate::ledger::fee::FeePolicy;
    use crate::ledger::record::{Payment, PaymentStatus, timestamp};
    use chrono::Duration as ChronoDuration;
    use paystore_shared::types::OrganizationId;

    fn model() -> MokaReadModel<Payment> {
        MokaReadModel::with_config(1_000, 60, 60)
    }

    /// Payments created one second apart, returned oldest first.
    fn payments(account: &LedgerAccount, n: usize) -> Vec<Payment> {
        let start = timestamp();
        (0..n)
            .map(|i| {
                let at = start + ChronoDuration::seconds(i64::try_from(i).unwrap());
                Payment::draft(account, &FeePolicy::Fixed(0), 100, "v", "", at).unwrap()
            })
            .collect()
    }

    fn account() -> LedgerAccount {
        LedgerAccount::open(OrganizationId::new(), "owner", "IDR", timestamp()).unwrap()
    }

    fn newest_first(items: &[Payment]) -> Vec<Payment> {
        items.iter().rev().cloned().collect()
    }

    #[tokio::test]
    async fn test_cold_timeline_is_a_miss() {
        let acc = account();
        let cache = model();
        let scope = HistoryScope::account(&acc);
        assert!(cache.fetch_page(&scope, None, 10).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_append_skips_cold_timeline() {
        let acc = account();
        let cache = model();
        let scope = HistoryScope::account(&acc);
        let p = &payments(&acc, 1)[0];

        cache.append_to_timeline(p, &[scope]).await.unwrap();

        assert!(cache.fetch_page(&scope, None, 10).await.unwrap().is_none());
        assert_eq!(cache.get(&p.id.to_string()).await.unwrap().as_ref(), Some(p));
    }

    #[tokio::test]
    async fn test_seed_then_paginate() {
        let acc = account();
        let cache = model();
        let scope = HistoryScope::account(&acc);
        let all = newest_first(&payments(&acc, 5));

        cache.seed(&scope, None, &all, true).await.unwrap();

        let first = cache.fetch_page(&scope, None, 2).await.unwrap().unwrap();
        assert_eq!(first.data, all[..2]);
        assert_eq!(first.next_cursor.as_deref(), Some(all[1].rand_id.as_str()));

        let second = cache
            .fetch_page(&scope, first.next_cursor.as_deref(), 2)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(second.data, all[2..4]);

        let last = cache
            .fetch_page(&scope, second.next_cursor.as_deref(), 2)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(last.data, all[4..]);
        assert!(last.is_last_page);
        assert!(last.next_cursor.is_none());
    }

    #[tokio::test]
    async fn test_partial_seed_misses_past_loaded_range() {
        let acc = account();
        let cache = model();
        let scope = HistoryScope::account(&acc);
        let all = newest_first(&payments(&acc, 4));

        cache.seed(&scope, None, &all[..2], false).await.unwrap();
        let first = cache.fetch_page(&scope, None, 2).await.unwrap().unwrap();
        assert!(!first.is_last_page);

        let cursor = first.next_cursor.unwrap();
        assert!(cache.fetch_page(&scope, Some(&cursor), 2).await.unwrap().is_none());

        cache.seed(&scope, Some(&cursor), &all[2..], true).await.unwrap();
        let second = cache.fetch_page(&scope, Some(&cursor), 2).await.unwrap().unwrap();
        assert_eq!(second.data, all[2..]);
        assert!(second.is_last_page);
    }

    #[tokio::test]
    async fn test_organic_appends_match_reseed() {
        let acc = account();
        let scope = HistoryScope::account(&acc);
        let created = payments(&acc, 3);

        // organic: seed empty, then append each new record
        let organic = model();
        organic.seed(&scope, None, &[], true).await.unwrap();
        for p in &created {
            organic.append_to_timeline(p, &[scope]).await.unwrap();
        }

        // reseeded from the store's newest-first order
        let reseeded = model();
        reseeded.seed(&scope, None, &newest_first(&created), true).await.unwrap();

        let a = organic.fetch_page(&scope, None, 10).await.unwrap().unwrap();
        let b = reseeded.fetch_page(&scope, None, 10).await.unwrap().unwrap();
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn test_out_of_order_append_keeps_creation_order() {
        let acc = account();
        let scope = HistoryScope::account(&acc);
        let created = payments(&acc, 3);
        let cache = model();
        cache.seed(&scope, None, &[], true).await.unwrap();

        cache.append_to_timeline(&created[2], &[scope]).await.unwrap();
        cache.append_to_timeline(&created[0], &[scope]).await.unwrap();
        cache.append_to_timeline(&created[1], &[scope]).await.unwrap();

        let page = cache.fetch_page(&scope, None, 10).await.unwrap().unwrap();
        assert_eq!(page.data, newest_first(&created));
    }

    #[tokio::test]
    async fn test_status_change_visible_through_timeline() {
        let acc = account();
        let scope = HistoryScope::account(&acc);
        let mut p = payments(&acc, 1).remove(0);
        let cache = model();
        cache.seed(&scope, None, std::slice::from_ref(&p), true).await.unwrap();

        p.transition(PaymentStatus::Paid, timestamp()).unwrap();
        cache.set(&p).await.unwrap();

        let page = cache.fetch_page(&scope, None, 10).await.unwrap().unwrap();
        assert_eq!(page.data[0].status, PaymentStatus::Paid);
    }

    #[tokio::test]
    async fn test_older_snapshot_never_replaces_newer() {
        let acc = account();
        let scope = HistoryScope::account(&acc);
        let pending = payments(&acc, 1).remove(0);
        let mut paid = pending.clone();
        paid.transition(PaymentStatus::Paid, pending.updated_at + ChronoDuration::microseconds(1))
            .unwrap();
        let cache = model();

        cache.set(&paid).await.unwrap();
        cache.set(&pending).await.unwrap();
        assert_eq!(cache.get(&paid.id.to_string()).await.unwrap(), Some(paid.clone()));

        // a page read before the commit keeps its slot but not its snapshot
        cache.seed(&scope, None, std::slice::from_ref(&pending), true).await.unwrap();
        let page = cache.fetch_page(&scope, None, 10).await.unwrap().unwrap();
        assert_eq!(page.data, vec![paid]);
    }

    #[tokio::test]
    async fn test_out_of_order_account_projections_keep_latest() {
        let cache = MokaReadModel::<LedgerAccount>::with_config(100, 60, 60);
        let mut acc = account();
        let opened = acc.updated_at;
        acc.credit(900, opened + ChronoDuration::microseconds(1)).unwrap();
        let first = acc.clone();
        acc.credit(100, opened + ChronoDuration::microseconds(2)).unwrap();
        let second = acc.clone();

        cache.set(&second).await.unwrap();
        cache.set(&first).await.unwrap();

        let served = cache.get(&acc.id.to_string()).await.unwrap().unwrap();
        assert_eq!(served.balance, 1000);
        assert_eq!(served.income_accumulation, 1000);
    }

    #[tokio::test]
    async fn test_evicted_snapshot_is_a_miss() {
        let acc = account();
        let scope = HistoryScope::account(&acc);
        let created = payments(&acc, 2);
        let cache = model();
        cache.seed(&scope, None, &newest_first(&created), true).await.unwrap();

        cache.items.invalidate(&MokaReadModel::<Payment>::item_key(&created[0].id.to_string()));

        assert!(cache.fetch_page(&scope, None, 10).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_invalidate_timeline() {
        let acc = account();
        let scope = HistoryScope::account(&acc);
        let cache = model();
        cache.seed(&scope, None, &[], true).await.unwrap();
        assert!(cache.fetch_page(&scope, None, 10).await.unwrap().is_some());

        cache.invalidate_timeline(&scope);
        assert!(cache.fetch_page(&scope, None, 10).await.unwrap().is_none());
    }
}
