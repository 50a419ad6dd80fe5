//! Read-model cache.
//!
//! The store of record is the only source of truth. The read model holds
//! snapshots of accounts and records plus newest-first history timelines, is
//! written only after a commit, and can be rebuilt from the store at any time.
//!
//! Snapshot writes are monotonic: a snapshot never replaces one with a newer
//! [`Cacheable::version`]. A reader that loaded a row before a concurrent
//! commit cannot put the older state back, and neither can projections that
//! land out of commit order.
//!
//! Timeline rules:
//! - [`ReadModel::append_to_timeline`] only touches timelines that already
//!   exist; a cold timeline is left for seeding.
//! - [`ReadModel::seed`] loads a page read from the store. Seeding and organic
//!   appends both order by creation time, so a reseeded timeline serves the
//!   same pages as one built by appends.
//! - [`ReadModel::fetch_page`] returns `None` whenever it cannot answer
//!   completely; the caller then reads the store and seeds.

mod cache;

pub use cache::MokaReadModel;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use paystore_shared::types::CursorPage;
use thiserror::Error;
use uuid::Uuid;

use crate::ledger::account::LedgerAccount;
use crate::ledger::record::{LedgerRecord, RecordStatus};
use crate::ledger::store::HistoryScope;

/// Errors reported by cache implementations. Never surfaced to callers of
/// ledger commands.
#[derive(Debug, Error)]
pub enum CacheError {
    /// Cache backend unreachable or failed.
    #[error("cache unavailable: {0}")]
    Unavailable(String),
}

/// A value that can be cached by id.
pub trait Cacheable: Clone + Send + Sync + 'static {
    /// Key namespace, e.g. `payment`.
    const NAMESPACE: &'static str;

    /// Id of the value within its namespace.
    fn cache_id(&self) -> String;

    /// Ordering key across committed versions of the same value; larger is newer.
    fn version(&self) -> DateTime<Utc>;
}

/// A value that appears in history timelines.
pub trait Timelined: Cacheable {
    /// Opaque cursor identifying the value in a page.
    fn cursor(&self) -> &str;

    /// Ordering key; larger is newer.
    fn position(&self) -> (DateTime<Utc>, Uuid);
}

impl Cacheable for LedgerAccount {
    const NAMESPACE: &'static str = "balance";

    fn cache_id(&self) -> String {
        self.id.to_string()
    }

    fn version(&self) -> DateTime<Utc> {
        self.updated_at
    }
}

impl<S: RecordStatus> Cacheable for LedgerRecord<S> {
    const NAMESPACE: &'static str = S::KIND.as_str();

    fn cache_id(&self) -> String {
        self.id.to_string()
    }

    fn version(&self) -> DateTime<Utc> {
        self.updated_at
    }
}

impl<S: RecordStatus> Timelined for LedgerRecord<S> {
    fn cursor(&self) -> &str {
        &self.rand_id
    }

    fn position(&self) -> (DateTime<Utc>, Uuid) {
        (self.created_at, self.id.into_inner())
    }
}

/// Keyed snapshot cache.
#[async_trait]
pub trait SnapshotCache<T: Cacheable>: Send + Sync {
    /// Stores a snapshot unless a newer version is already cached.
    async fn set(&self, item: &T) -> Result<(), CacheError>;

    /// Reads a snapshot.
    async fn get(&self, id: &str) -> Result<Option<T>, CacheError>;
}

/// Snapshot cache with paginated, newest-first timelines.
#[async_trait]
pub trait ReadModel<T: Timelined>: SnapshotCache<T> {
    /// Stores `item` and inserts it into every already-cached timeline of `scopes`.
    async fn append_to_timeline(&self, item: &T, scopes: &[HistoryScope]) -> Result<(), CacheError>;

    /// Serves up to `limit` items after `cursor`, or `None` on a miss.
    async fn fetch_page(
        &self,
        scope: &HistoryScope,
        cursor: Option<&str>,
        limit: u64,
    ) -> Result<Option<CursorPage<T>>, CacheError>;

    /// Loads a page read from the store. `exhausted` marks that no older items exist.
    async fn seed(
        &self,
        scope: &HistoryScope,
        cursor: Option<&str>,
        items: &[T],
        exhausted: bool,
    ) -> Result<(), CacheError>;
}
