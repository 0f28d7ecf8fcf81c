//! Account records and the store that owns them.
//!
//! The image core never owns accounts: it reads the quota and the list of
//! image records, and asks the store to append or remove records. The
//! [`AccountStore`] trait is that boundary. [`MemoryAccountStore`] is the
//! bundled implementation, a lock-guarded map optionally backed by a JSON
//! snapshot file that is rewritten atomically after every mutation.
//!
//! ## Snapshot format
//!
//! ```json
//! {
//!   "version": 1,
//!   "accounts": [
//!     { "user_id": "u1", "image_quota": 100, "images": [ ... ] }
//!   ]
//! }
//! ```

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::sync::RwLock;

/// Version of the snapshot format.
const SNAPSHOT_VERSION: u32 = 1;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unknown account: {0}")]
    UnknownAccount(String),
}

/// Metadata of one stored image. Width and height are the canonical
/// artifact's dimensions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRecord {
    pub id: String,
    pub name: String,
    pub width: u32,
    pub height: u32,
    pub uploaded_at: DateTime<Utc>,
}

/// A user's quota and the ordered list of images they own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub user_id: String,
    pub image_quota: usize,
    #[serde(default)]
    pub images: Vec<ImageRecord>,
}

impl Account {
    pub fn new(user_id: impl Into<String>, image_quota: usize) -> Self {
        Self {
            user_id: user_id.into(),
            image_quota,
            images: Vec::new(),
        }
    }

    pub fn image_count(&self) -> usize {
        self.images.len()
    }

    pub fn is_at_quota(&self) -> bool {
        self.image_count() >= self.image_quota
    }

    pub fn find_image(&self, image_id: &str) -> Option<&ImageRecord> {
        self.images.iter().find(|r| r.id == image_id)
    }
}

/// Result of a quota-conditional append.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppendOutcome {
    Appended,
    QuotaExceeded,
}

/// Persistence boundary for accounts and their image records.
#[async_trait]
pub trait AccountStore: Send + Sync {
    async fn account(&self, user_id: &str) -> Result<Option<Account>, StoreError>;

    /// All accounts, ordered by user id.
    async fn accounts(&self) -> Result<Vec<Account>, StoreError>;

    /// Append `record` only if the account is below its quota. The check and
    /// the append happen as one step.
    async fn append_image(
        &self,
        user_id: &str,
        record: ImageRecord,
    ) -> Result<AppendOutcome, StoreError>;

    /// Remove every record whose id is in `ids` in a single update and
    /// return the removed records. Unknown ids are ignored.
    async fn remove_images(
        &self,
        user_id: &str,
        ids: &HashSet<String>,
    ) -> Result<Vec<ImageRecord>, StoreError>;

    /// Create or replace an account.
    async fn upsert_account(&self, account: Account) -> Result<(), StoreError>;
}

#[derive(Serialize, Deserialize)]
struct Snapshot {
    version: u32,
    accounts: Vec<Account>,
}

/// In-process account store with an optional JSON snapshot.
#[derive(Debug, Default)]
pub struct MemoryAccountStore {
    accounts: RwLock<HashMap<String, Account>>,
    snapshot: Option<PathBuf>,
}

impl MemoryAccountStore {
    /// Volatile store; nothing survives the process.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store backed by `path`. A missing file starts an empty store; an
    /// unreadable or mismatched one is an error rather than silent data loss.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let accounts = match std::fs::read_to_string(path) {
            Ok(content) => {
                let snapshot: Snapshot = serde_json::from_str(&content)?;
                if snapshot.version != SNAPSHOT_VERSION {
                    return Err(StoreError::Io(io::Error::new(
                        io::ErrorKind::InvalidData,
                        format!(
                            "snapshot {} has version {}, expected {SNAPSHOT_VERSION}",
                            path.display(),
                            snapshot.version
                        ),
                    )));
                }
                snapshot
                    .accounts
                    .into_iter()
                    .map(|a| (a.user_id.clone(), a))
                    .collect()
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => return Err(e.into()),
        };
        tracing::info!(path = %path.display(), accounts = accounts.len(), "loaded account snapshot");
        Ok(Self {
            accounts: RwLock::new(accounts),
            snapshot: Some(path.to_path_buf()),
        })
    }

    /// Rewrite the snapshot as if `updated` were already committed. Called
    /// with the write lock held so snapshots land in mutation order; the
    /// caller commits `updated` to the map only once this succeeds.
    async fn persist(
        &self,
        accounts: &HashMap<String, Account>,
        updated: &Account,
    ) -> Result<(), StoreError> {
        let Some(path) = self.snapshot.clone() else {
            return Ok(());
        };
        let mut list: Vec<Account> = accounts
            .values()
            .filter(|a| a.user_id != updated.user_id)
            .cloned()
            .chain(std::iter::once(updated.clone()))
            .collect();
        list.sort_by(|a, b| a.user_id.cmp(&b.user_id));
        let json = serde_json::to_vec_pretty(&Snapshot {
            version: SNAPSHOT_VERSION,
            accounts: list,
        })?;
        tokio::task::spawn_blocking(move || crate::storage::write_atomic(&path, &json))
            .await
            .map_err(io::Error::other)??;
        Ok(())
    }
}

#[async_trait]
impl AccountStore for MemoryAccountStore {
    async fn account(&self, user_id: &str) -> Result<Option<Account>, StoreError> {
        Ok(self.accounts.read().await.get(user_id).cloned())
    }

    async fn accounts(&self) -> Result<Vec<Account>, StoreError> {
        let mut list: Vec<Account> = self.accounts.read().await.values().cloned().collect();
        list.sort_by(|a, b| a.user_id.cmp(&b.user_id));
        Ok(list)
    }

    async fn append_image(
        &self,
        user_id: &str,
        record: ImageRecord,
    ) -> Result<AppendOutcome, StoreError> {
        let mut accounts = self.accounts.write().await;
        let mut updated = accounts
            .get(user_id)
            .cloned()
            .ok_or_else(|| StoreError::UnknownAccount(user_id.to_string()))?;
        if updated.is_at_quota() {
            return Ok(AppendOutcome::QuotaExceeded);
        }
        updated.images.push(record);
        self.persist(&accounts, &updated).await?;
        accounts.insert(updated.user_id.clone(), updated);
        Ok(AppendOutcome::Appended)
    }

    async fn remove_images(
        &self,
        user_id: &str,
        ids: &HashSet<String>,
    ) -> Result<Vec<ImageRecord>, StoreError> {
        let mut accounts = self.accounts.write().await;
        let mut updated = accounts
            .get(user_id)
            .cloned()
            .ok_or_else(|| StoreError::UnknownAccount(user_id.to_string()))?;

        let (removed, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut updated.images)
            .into_iter()
            .partition(|r| ids.contains(&r.id));
        if removed.is_empty() {
            return Ok(removed);
        }
        updated.images = kept;

        self.persist(&accounts, &updated).await?;
        accounts.insert(updated.user_id.clone(), updated);
        Ok(removed)
    }

    async fn upsert_account(&self, account: Account) -> Result<(), StoreError> {
        let mut accounts = self.accounts.write().await;
        self.persist(&accounts, &account).await?;
        accounts.insert(account.user_id.clone(), account);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn record(id: &str) -> ImageRecord {
        ImageRecord {
            id: id.to_string(),
            name: format!("{id}.jpg"),
            width: 800,
            height: 600,
            uploaded_at: Utc::now(),
        }
    }

    fn ids(list: &[&str]) -> HashSet<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    // =========================================================================
    // Account
    // =========================================================================

    #[test]
    fn account_quota_checks() {
        let mut account = Account::new("u1", 1);
        assert!(!account.is_at_quota());
        account.images.push(record("a"));
        assert!(account.is_at_quota());
        assert_eq!(account.find_image("a").map(|r| r.width), Some(800));
        assert!(account.find_image("b").is_none());
    }

    #[test]
    fn account_deserializes_without_images() {
        let account: Account =
            serde_json::from_str(r#"{"user_id":"u1","image_quota":5}"#).unwrap();
        assert!(account.images.is_empty());
    }

    // =========================================================================
    // append_image
    // =========================================================================

    #[tokio::test]
    async fn append_respects_quota() {
        let store = MemoryAccountStore::new();
        store.upsert_account(Account::new("u1", 1)).await.unwrap();

        assert_eq!(
            store.append_image("u1", record("a")).await.unwrap(),
            AppendOutcome::Appended
        );
        assert_eq!(
            store.append_image("u1", record("b")).await.unwrap(),
            AppendOutcome::QuotaExceeded
        );

        let account = store.account("u1").await.unwrap().unwrap();
        assert_eq!(account.image_count(), 1);
    }

    #[tokio::test]
    async fn append_unknown_account_errors() {
        let store = MemoryAccountStore::new();
        assert!(matches!(
            store.append_image("ghost", record("a")).await,
            Err(StoreError::UnknownAccount(_))
        ));
    }

    #[tokio::test]
    async fn concurrent_appends_never_exceed_quota() {
        let store = std::sync::Arc::new(MemoryAccountStore::new());
        store.upsert_account(Account::new("u1", 3)).await.unwrap();

        let handles: Vec<_> = (0..10)
            .map(|i| {
                let store = store.clone();
                tokio::spawn(async move { store.append_image("u1", record(&i.to_string())).await })
            })
            .collect();
        let mut appended = 0;
        for handle in handles {
            if handle.await.unwrap().unwrap() == AppendOutcome::Appended {
                appended += 1;
            }
        }

        assert_eq!(appended, 3);
        assert_eq!(store.account("u1").await.unwrap().unwrap().image_count(), 3);
    }

    // =========================================================================
    // remove_images
    // =========================================================================

    #[tokio::test]
    async fn remove_returns_only_matched_records() {
        let store = MemoryAccountStore::new();
        store.upsert_account(Account::new("u1", 10)).await.unwrap();
        for id in ["a", "b", "c"] {
            store.append_image("u1", record(id)).await.unwrap();
        }

        let removed = store
            .remove_images("u1", &ids(&["a", "c", "missing"]))
            .await
            .unwrap();

        let removed_ids: Vec<&str> = removed.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(removed_ids, vec!["a", "c"]);
        let account = store.account("u1").await.unwrap().unwrap();
        let kept: Vec<&str> = account.images.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(kept, vec!["b"]);
    }

    #[tokio::test]
    async fn remove_does_not_touch_other_accounts() {
        let store = MemoryAccountStore::new();
        store.upsert_account(Account::new("u1", 10)).await.unwrap();
        store.upsert_account(Account::new("u2", 10)).await.unwrap();
        store.append_image("u2", record("a")).await.unwrap();

        let removed = store.remove_images("u1", &ids(&["a"])).await.unwrap();

        assert!(removed.is_empty());
        assert_eq!(store.account("u2").await.unwrap().unwrap().image_count(), 1);
    }

    // =========================================================================
    // Snapshot persistence
    // =========================================================================

    #[tokio::test]
    async fn snapshot_survives_reopen() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("accounts.json");

        let store = MemoryAccountStore::open(&path).unwrap();
        store.upsert_account(Account::new("u1", 5)).await.unwrap();
        store.append_image("u1", record("a")).await.unwrap();
        drop(store);

        let reopened = MemoryAccountStore::open(&path).unwrap();
        let account = reopened.account("u1").await.unwrap().unwrap();
        assert_eq!(account.image_quota, 5);
        assert_eq!(account.images[0].id, "a");
    }

    #[tokio::test]
    async fn failed_snapshot_write_leaves_memory_unchanged() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("state");
        std::fs::create_dir(&dir).unwrap();
        let store = MemoryAccountStore::open(&dir.join("accounts.json")).unwrap();
        store.upsert_account(Account::new("u1", 5)).await.unwrap();
        store.append_image("u1", record("a")).await.unwrap();

        std::fs::remove_dir_all(&dir).unwrap();

        assert!(store.append_image("u1", record("b")).await.is_err());
        assert!(store.remove_images("u1", &ids(&["a"])).await.is_err());
        assert!(store.upsert_account(Account::new("u2", 5)).await.is_err());

        let account = store.account("u1").await.unwrap().unwrap();
        let held: Vec<_> = account.images.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(held, vec!["a"]);
        assert!(store.account("u2").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn open_missing_snapshot_starts_empty() {
        let tmp = TempDir::new().unwrap();
        let store = MemoryAccountStore::open(&tmp.path().join("none.json")).unwrap();
        assert!(store.accounts().await.unwrap().is_empty());
    }

    #[test]
    fn open_corrupt_snapshot_errors() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("accounts.json");
        std::fs::write(&path, "not json").unwrap();
        assert!(matches!(
            MemoryAccountStore::open(&path),
            Err(StoreError::Json(_))
        ));
    }

    #[test]
    fn open_wrong_version_errors() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("accounts.json");
        std::fs::write(&path, r#"{"version":99,"accounts":[]}"#).unwrap();
        assert!(matches!(
            MemoryAccountStore::open(&path),
            Err(StoreError::Io(_))
        ));
    }
}
