//! Expiring document store.
//!
//! Payloads live under `<uploads_dir>/<category>/<stored_name>`; metadata is a
//! single JSON array that is read in full and rewritten in full on every
//! mutation. One mutex per store serializes all operations, so a sweep never
//! sees a half-created record.

use crate::clock::Clock;
use crate::error::{StoreError, StoreResult};
use crate::models::{stored_name_for, Category, DocumentRecord};
use std::collections::HashSet;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

pub struct DocumentStore {
    uploads_dir: PathBuf,
    metadata_path: PathBuf,
    clock: Arc<dyn Clock>,
    lock: Mutex<()>,
}

impl DocumentStore {
    /// Prepares the directory layout and an empty metadata file if none exists.
    /// Existing metadata is not parsed here; a corrupt file only fails the
    /// operations that need it.
    pub async fn open(
        uploads_dir: impl Into<PathBuf>,
        metadata_path: impl Into<PathBuf>,
        clock: Arc<dyn Clock>,
    ) -> StoreResult<Self> {
        let uploads_dir = uploads_dir.into();
        let metadata_path = metadata_path.into();

        for category in Category::ALL {
            let dir = uploads_dir.join(category.dir_name());
            fs::create_dir_all(&dir)
                .await
                .map_err(|e| StoreError::write(&dir, e))?;
        }

        if let Some(parent) = metadata_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| StoreError::write(parent, e))?;
        }

        let exists = fs::try_exists(&metadata_path)
            .await
            .map_err(|e| StoreError::read(&metadata_path, e))?;
        if !exists {
            write_metadata(&metadata_path, &[]).await?;
            info!(path = %metadata_path.display(), "initialized empty metadata file");
        }

        Ok(Self {
            uploads_dir,
            metadata_path,
            clock,
            lock: Mutex::new(()),
        })
    }

    pub fn uploads_dir(&self) -> &Path {
        &self.uploads_dir
    }

    pub fn metadata_path(&self) -> &Path {
        &self.metadata_path
    }

    /// Where the payload of `record` is kept on disk.
    pub fn file_path(&self, record: &DocumentRecord) -> PathBuf {
        self.uploads_dir
            .join(record.category.dir_name())
            .join(&record.stored_name)
    }

    pub async fn create(
        &self,
        original_name: &str,
        bytes: &[u8],
        category: Category,
    ) -> StoreResult<DocumentRecord> {
        let _guard = self.lock.lock().await;
        let mut records = self.load().await?;

        let mut record = DocumentRecord::new(original_name.to_string(), category, self.clock.now());
        while records.iter().any(|r| r.id == record.id) {
            record.id = Uuid::new_v4().to_string();
        }
        while records
            .iter()
            .any(|r| r.category == category && r.stored_name == record.stored_name)
        {
            record.stored_name = stored_name_for(original_name);
        }

        let path = self.file_path(&record);
        if let Err(e) = fs::write(&path, bytes).await {
            discard_file(&path).await;
            return Err(StoreError::write(&path, e));
        }

        records.push(record.clone());
        if let Err(err) = self.save(&records).await {
            discard_file(&path).await;
            return Err(err);
        }

        info!(
            id = %record.id,
            category = %record.category,
            stored_name = %record.stored_name,
            size_bytes = bytes.len(),
            "document stored"
        );
        Ok(record)
    }

    /// Live records in insertion order. Expired records are swept first.
    pub async fn list(&self, category: Option<Category>) -> StoreResult<Vec<DocumentRecord>> {
        let _guard = self.lock.lock().await;
        let now = self.clock.now();
        let (records, _) = self.sweep_locked().await?;

        Ok(records
            .into_iter()
            .filter(|r| !r.is_expired(now))
            .filter(|r| category.map_or(true, |c| r.category == c))
            .collect())
    }

    pub async fn get(&self, id: &str) -> StoreResult<DocumentRecord> {
        let _guard = self.lock.lock().await;
        self.find_live(id).await
    }

    /// Record plus payload bytes, for downloads.
    pub async fn read(&self, id: &str) -> StoreResult<(DocumentRecord, Vec<u8>)> {
        let _guard = self.lock.lock().await;
        let record = self.find_live(id).await?;
        let path = self.file_path(&record);

        match fs::read(&path).await {
            Ok(bytes) => Ok((record, bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                warn!(id = %record.id, path = %path.display(), "payload missing for live record");
                Err(StoreError::NotFound(id.to_string()))
            }
            Err(e) => Err(StoreError::read(&path, e)),
        }
    }

    /// Removes the record, then its payload. A payload that is already gone is
    /// not an error; one that cannot be removed is left for `sweep_orphans`.
    pub async fn delete(&self, id: &str) -> StoreResult<DocumentRecord> {
        let _guard = self.lock.lock().await;
        let mut records = self.load().await?;

        let index = records
            .iter()
            .position(|r| r.id == id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;

        let record = records.remove(index);
        self.save(&records).await?;

        let path = self.file_path(&record);
        if let Err(e) = remove_if_exists(&path).await {
            warn!(
                id = %record.id,
                path = %path.display(),
                error = %e,
                "failed to remove payload of deleted document; left for orphan sweep"
            );
        }

        info!(id = %record.id, category = %record.category, "document deleted");
        Ok(record)
    }

    /// Removes every expired time-limited record and its payload. Returns how
    /// many records were dropped.
    pub async fn sweep_expired(&self) -> StoreResult<usize> {
        let _guard = self.lock.lock().await;
        let (_, removed) = self.sweep_locked().await?;
        Ok(removed)
    }

    /// Deletes payload files no record points at, plus a leftover temporary
    /// metadata file. These are what a failed `create` or a crash between the
    /// payload write and the metadata write leave behind.
    pub async fn sweep_orphans(&self) -> StoreResult<usize> {
        let _guard = self.lock.lock().await;
        let records = self.load().await?;
        let referenced: HashSet<PathBuf> = records.iter().map(|r| self.file_path(r)).collect();
        let mut removed = 0;

        for category in Category::ALL {
            let dir = self.uploads_dir.join(category.dir_name());
            let mut entries = fs::read_dir(&dir)
                .await
                .map_err(|e| StoreError::read(&dir, e))?;

            while let Some(entry) = entries
                .next_entry()
                .await
                .map_err(|e| StoreError::read(&dir, e))?
            {
                let path = entry.path();
                let is_file = entry.file_type().await.map(|t| t.is_file()).unwrap_or(false);
                if !is_file || referenced.contains(&path) {
                    continue;
                }

                match fs::remove_file(&path).await {
                    Ok(()) => {
                        removed += 1;
                        info!(path = %path.display(), "orphaned payload removed");
                    }
                    Err(e) => warn!(path = %path.display(), error = %e, "failed to remove orphaned payload"),
                }
            }
        }

        let temp = temp_path(&self.metadata_path);
        match fs::remove_file(&temp).await {
            Ok(()) => {
                removed += 1;
                info!(path = %temp.display(), "stale temporary metadata removed");
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => warn!(path = %temp.display(), error = %e, "failed to remove temporary metadata"),
        }

        Ok(removed)
    }

    async fn find_live(&self, id: &str) -> StoreResult<DocumentRecord> {
        let now = self.clock.now();
        let (records, _) = self.sweep_locked().await?;

        records
            .into_iter()
            .find(|r| r.id == id && !r.is_expired(now))
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    /// Caller must hold `self.lock`. A record whose payload cannot be removed
    /// stays in metadata so the next sweep retries it.
    async fn sweep_locked(&self) -> StoreResult<(Vec<DocumentRecord>, usize)> {
        let now = self.clock.now();
        let records = self.load().await?;
        let before = records.len();
        let mut retained = Vec::with_capacity(before);

        for record in records {
            if !record.is_expired(now) {
                retained.push(record);
                continue;
            }

            let path = self.file_path(&record);
            match remove_if_exists(&path).await {
                Ok(()) => debug!(id = %record.id, "expired document removed"),
                Err(e) => {
                    warn!(
                        id = %record.id,
                        path = %path.display(),
                        error = %e,
                        "failed to remove expired payload; keeping record for next sweep"
                    );
                    retained.push(record);
                }
            }
        }

        let removed = before - retained.len();
        if removed > 0 {
            self.save(&retained).await?;
            info!(removed, "expired documents swept");
        }

        Ok((retained, removed))
    }

    async fn load(&self) -> StoreResult<Vec<DocumentRecord>> {
        let data = match fs::read(&self.metadata_path).await {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StoreError::read(&self.metadata_path, e)),
        };

        if data.iter().all(u8::is_ascii_whitespace) {
            return Ok(Vec::new());
        }

        serde_json::from_slice(&data).map_err(|source| {
            error!(
                path = %self.metadata_path.display(),
                error = %source,
                "metadata file failed to parse; leaving it untouched"
            );
            StoreError::MetadataCorrupt {
                path: self.metadata_path.clone(),
                source,
            }
        })
    }

    async fn save(&self, records: &[DocumentRecord]) -> StoreResult<()> {
        write_metadata(&self.metadata_path, records).await
    }
}

/// Writes to a sibling temp file and renames it over the target, so a crash
/// mid-write never truncates the last good collection.
async fn write_metadata(path: &Path, records: &[DocumentRecord]) -> StoreResult<()> {
    let json = serde_json::to_vec_pretty(records)
        .map_err(|e| StoreError::write(path, std::io::Error::new(ErrorKind::InvalidData, e)))?;
    let temp = temp_path(path);

    let mut file = fs::File::create(&temp)
        .await
        .map_err(|e| StoreError::write(&temp, e))?;
    file.write_all(&json)
        .await
        .map_err(|e| StoreError::write(&temp, e))?;
    file.sync_all()
        .await
        .map_err(|e| StoreError::write(&temp, e))?;
    drop(file);

    fs::rename(&temp, path)
        .await
        .map_err(|e| StoreError::write(path, e))
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

async fn remove_if_exists(path: &Path) -> std::io::Result<()> {
    match fs::remove_file(path).await {
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        other => other,
    }
}

async fn discard_file(path: &Path) {
    if let Err(e) = remove_if_exists(path).await {
        warn!(path = %path.display(), error = %e, "failed to discard payload after aborted create");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use chrono::{Duration, TimeZone, Utc};
    use tempfile::{tempdir, TempDir};

    async fn open_store(dir: &TempDir) -> (Arc<DocumentStore>, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2025, 6, 1, 9, 0, 0).unwrap(),
        ));
        let store = DocumentStore::open(
            dir.path().join("uploads"),
            dir.path().join("data").join("uploads.json"),
            clock.clone(),
        )
        .await
        .unwrap();
        (Arc::new(store), clock)
    }

    #[tokio::test]
    async fn open_initializes_layout() {
        let dir = tempdir().unwrap();
        let (store, _) = open_store(&dir).await;

        assert!(dir.path().join("uploads/public").is_dir());
        assert!(dir.path().join("uploads/eulogy").is_dir());
        let raw = std::fs::read_to_string(store.metadata_path()).unwrap();
        assert_eq!(raw.trim(), "[]");
    }

    #[tokio::test]
    async fn create_then_list_round_trips() {
        let dir = tempdir().unwrap();
        let (store, clock) = open_store(&dir).await;

        let created = store
            .create("price-list.pdf", b"%PDF-1.4", Category::Public)
            .await
            .unwrap();

        assert_eq!(created.original_name, "price-list.pdf");
        assert_eq!(created.uploaded_at, clock.now());
        assert!(created.stored_name.ends_with(".pdf"));
        assert_eq!(std::fs::read(store.file_path(&created)).unwrap(), b"%PDF-1.4");

        let listed = store.list(None).await.unwrap();
        assert_eq!(listed, vec![created]);
    }

    #[tokio::test]
    async fn time_limited_gets_seven_day_expiry() {
        let dir = tempdir().unwrap();
        let (store, clock) = open_store(&dir).await;

        let record = store
            .create("order-of-service.docx", b"doc", Category::TimeLimited)
            .await
            .unwrap();

        assert_eq!(record.expires_at, Some(record.uploaded_at + Duration::days(7)));
        assert!(store.file_path(&record).starts_with(dir.path().join("uploads/eulogy")));

        let expires_at = record.expires_at.unwrap();
        clock.set(expires_at - Duration::seconds(1));
        assert_eq!(store.sweep_expired().await.unwrap(), 0);
        assert_eq!(store.list(None).await.unwrap(), vec![record.clone()]);

        clock.set(expires_at);
        assert_eq!(store.sweep_expired().await.unwrap(), 1);
        assert!(!store.file_path(&record).exists());
    }

    #[tokio::test]
    async fn expired_document_is_swept_with_its_file() {
        let dir = tempdir().unwrap();
        let (store, clock) = open_store(&dir).await;

        let record = store
            .create("tribute.pdf", b"tribute", Category::TimeLimited)
            .await
            .unwrap();
        let path = store.file_path(&record);

        clock.advance(Duration::days(8));
        assert_eq!(store.sweep_expired().await.unwrap(), 1);

        assert!(store.list(None).await.unwrap().is_empty());
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn list_sweeps_lazily() {
        let dir = tempdir().unwrap();
        let (store, clock) = open_store(&dir).await;

        let record = store
            .create("tribute.pdf", b"tribute", Category::TimeLimited)
            .await
            .unwrap();

        clock.advance(Duration::days(7));
        assert!(store.list(None).await.unwrap().is_empty());
        assert!(!store.file_path(&record).exists());
        assert_eq!(store.sweep_expired().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn public_documents_survive_sweeps() {
        let dir = tempdir().unwrap();
        let (store, clock) = open_store(&dir).await;

        let record = store.create("menu.pdf", b"menu", Category::Public).await.unwrap();
        assert_eq!(record.expires_at, None);

        clock.advance(Duration::days(365));
        assert_eq!(store.sweep_expired().await.unwrap(), 0);
        assert_eq!(store.list(None).await.unwrap(), vec![record.clone()]);
        assert!(store.file_path(&record).exists());
    }

    #[tokio::test]
    async fn sweep_is_idempotent() {
        let dir = tempdir().unwrap();
        let (store, clock) = open_store(&dir).await;

        store.create("a.pdf", b"a", Category::TimeLimited).await.unwrap();
        store.create("b.pdf", b"b", Category::TimeLimited).await.unwrap();
        store.create("c.pdf", b"c", Category::Public).await.unwrap();

        clock.advance(Duration::days(10));
        assert_eq!(store.sweep_expired().await.unwrap(), 2);
        assert_eq!(store.sweep_expired().await.unwrap(), 0);
        assert_eq!(store.list(None).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn list_filters_by_category() {
        let dir = tempdir().unwrap();
        let (store, _) = open_store(&dir).await;

        let public = store.create("menu.pdf", b"menu", Category::Public).await.unwrap();
        let limited = store
            .create("tribute.pdf", b"tribute", Category::TimeLimited)
            .await
            .unwrap();

        assert_eq!(store.list(Some(Category::Public)).await.unwrap(), vec![public.clone()]);
        assert_eq!(store.list(Some(Category::TimeLimited)).await.unwrap(), vec![limited.clone()]);
        assert_eq!(store.list(None).await.unwrap(), vec![public, limited]);
    }

    #[tokio::test]
    async fn delete_removes_record_and_file() {
        let dir = tempdir().unwrap();
        let (store, _) = open_store(&dir).await;

        let record = store.create("menu.pdf", b"menu", Category::Public).await.unwrap();
        let path = store.file_path(&record);

        let deleted = store.delete(&record.id).await.unwrap();
        assert_eq!(deleted, record);
        assert!(!path.exists());
        assert!(store.list(None).await.unwrap().is_empty());

        let again = store.delete(&record.id).await;
        assert!(matches!(again, Err(StoreError::NotFound(id)) if id == record.id));
    }

    #[tokio::test]
    async fn delete_tolerates_missing_file() {
        let dir = tempdir().unwrap();
        let (store, _) = open_store(&dir).await;

        let record = store.create("menu.pdf", b"menu", Category::Public).await.unwrap();
        std::fs::remove_file(store.file_path(&record)).unwrap();

        store.delete(&record.id).await.unwrap();
        assert!(store.list(None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn delete_unknown_id_leaves_collection_alone() {
        let dir = tempdir().unwrap();
        let (store, _) = open_store(&dir).await;

        store.create("menu.pdf", b"menu", Category::Public).await.unwrap();
        let before = std::fs::read(store.metadata_path()).unwrap();

        let unknown = Uuid::new_v4().to_string();
        assert!(matches!(
            store.delete(&unknown).await,
            Err(StoreError::NotFound(_))
        ));
        assert_eq!(std::fs::read(store.metadata_path()).unwrap(), before);
    }

    #[tokio::test]
    async fn read_returns_payload_until_expiry() {
        let dir = tempdir().unwrap();
        let (store, clock) = open_store(&dir).await;

        let record = store
            .create("tribute.pdf", b"tribute", Category::TimeLimited)
            .await
            .unwrap();

        let (found, bytes) = store.read(&record.id).await.unwrap();
        assert_eq!(found, record);
        assert_eq!(bytes, b"tribute");

        clock.advance(Duration::days(7) + Duration::seconds(1));
        assert!(matches!(store.read(&record.id).await, Err(StoreError::NotFound(_))));
        assert!(matches!(store.get(&record.id).await, Err(StoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn corrupt_metadata_fails_without_touching_the_file() {
        let dir = tempdir().unwrap();
        let (store, _) = open_store(&dir).await;

        std::fs::write(store.metadata_path(), b"[{\"id\": ").unwrap();

        let result = store.create("menu.pdf", b"menu", Category::Public).await;
        assert!(matches!(result, Err(StoreError::MetadataCorrupt { .. })));
        assert!(matches!(store.list(None).await, Err(StoreError::MetadataCorrupt { .. })));
        assert!(matches!(store.sweep_expired().await, Err(StoreError::MetadataCorrupt { .. })));

        assert_eq!(std::fs::read(store.metadata_path()).unwrap(), b"[{\"id\": ");
        let payloads = std::fs::read_dir(dir.path().join("uploads/public")).unwrap().count();
        assert_eq!(payloads, 0);
    }

    #[tokio::test]
    async fn failed_payload_write_creates_no_record() {
        let dir = tempdir().unwrap();
        let (store, _) = open_store(&dir).await;

        let eulogy_dir = dir.path().join("uploads/eulogy");
        std::fs::remove_dir(&eulogy_dir).unwrap();
        std::fs::write(&eulogy_dir, b"not a directory").unwrap();

        let result = store.create("tribute.pdf", b"tribute", Category::TimeLimited).await;
        assert!(matches!(result, Err(StoreError::StorageWrite { .. })));
        assert!(store.list(None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn failed_metadata_write_discards_the_payload() {
        let dir = tempdir().unwrap();
        let (store, _) = open_store(&dir).await;

        let before = std::fs::read(store.metadata_path()).unwrap();
        std::fs::create_dir(dir.path().join("data/uploads.json.tmp")).unwrap();

        let result = store.create("menu.pdf", b"menu", Category::Public).await;
        assert!(matches!(result, Err(StoreError::StorageWrite { .. })));

        let payloads = std::fs::read_dir(dir.path().join("uploads/public")).unwrap().count();
        assert_eq!(payloads, 0);
        assert_eq!(std::fs::read(store.metadata_path()).unwrap(), before);
    }

    #[tokio::test]
    async fn failed_metadata_write_keeps_deleted_document_readable() {
        let dir = tempdir().unwrap();
        let (store, _) = open_store(&dir).await;

        let record = store.create("menu.pdf", b"menu", Category::Public).await.unwrap();
        std::fs::create_dir(dir.path().join("data/uploads.json.tmp")).unwrap();

        let result = store.delete(&record.id).await;
        assert!(matches!(result, Err(StoreError::StorageWrite { .. })));

        let (found, bytes) = store.read(&record.id).await.unwrap();
        assert_eq!(found, record);
        assert_eq!(bytes, b"menu");
    }

    #[tokio::test]
    async fn one_stuck_payload_does_not_stop_the_sweep() {
        let dir = tempdir().unwrap();
        let (store, clock) = open_store(&dir).await;

        let stuck = store.create("stuck.pdf", b"stuck", Category::TimeLimited).await.unwrap();
        let other = store.create("other.pdf", b"other", Category::TimeLimited).await.unwrap();

        let stuck_path = store.file_path(&stuck);
        std::fs::remove_file(&stuck_path).unwrap();
        std::fs::create_dir(&stuck_path).unwrap();
        std::fs::write(stuck_path.join("inner"), b"x").unwrap();

        clock.advance(Duration::days(8));
        assert_eq!(store.sweep_expired().await.unwrap(), 1);
        assert!(!store.file_path(&other).exists());

        let raw = std::fs::read(store.metadata_path()).unwrap();
        let remaining: Vec<DocumentRecord> = serde_json::from_slice(&raw).unwrap();
        assert_eq!(remaining, vec![stuck.clone()]);

        assert!(store.list(None).await.unwrap().is_empty());
        assert!(matches!(store.get(&stuck.id).await, Err(StoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn stored_names_outside_the_category_dir_are_refused() {
        let dir = tempdir().unwrap();
        let (store, _) = open_store(&dir).await;

        let victim = dir.path().join("victim.txt");
        std::fs::write(&victim, b"keep me").unwrap();
        let tampered = r#"[{"id":"x","originalName":"victim.txt","storedName":"../../victim.txt",
            "category":"Public","uploadedAt":"2025-01-10T08:00:00Z","expiresAt":null}]"#;
        std::fs::write(store.metadata_path(), tampered).unwrap();

        assert!(matches!(store.read("x").await, Err(StoreError::MetadataCorrupt { .. })));
        assert!(matches!(store.delete("x").await, Err(StoreError::MetadataCorrupt { .. })));
        assert!(matches!(store.sweep_expired().await, Err(StoreError::MetadataCorrupt { .. })));

        assert_eq!(std::fs::read(&victim).unwrap(), b"keep me");
        assert_eq!(std::fs::read_to_string(store.metadata_path()).unwrap(), tampered);
    }

    #[tokio::test]
    async fn sweep_orphans_removes_unreferenced_payloads() {
        let dir = tempdir().unwrap();
        let (store, _) = open_store(&dir).await;

        let kept = store.create("menu.pdf", b"menu", Category::Public).await.unwrap();
        let orphan = dir.path().join("uploads/eulogy/stray.pdf");
        std::fs::write(&orphan, b"stray").unwrap();
        std::fs::write(dir.path().join("data/uploads.json.tmp"), b"[").unwrap();

        assert_eq!(store.sweep_orphans().await.unwrap(), 2);
        assert!(!orphan.exists());
        assert!(store.file_path(&kept).exists());
        assert_eq!(store.sweep_orphans().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn reads_metadata_left_by_previous_backend() {
        let dir = tempdir().unwrap();
        let (store, _) = open_store(&dir).await;

        std::fs::write(dir.path().join("uploads/public/legacy.pdf"), b"old").unwrap();
        std::fs::write(
            store.metadata_path(),
            r#"[{"id":"legacy-1","originalName":"Price List.pdf","storedName":"legacy.pdf",
                "category":"Public","uploadDate":"2024-02-01T10:00:00.000Z","expiryDate":null}]"#,
        )
        .unwrap();

        let (record, bytes) = store.read("legacy-1").await.unwrap();
        assert_eq!(record.original_name, "Price List.pdf");
        assert_eq!(bytes, b"old");
    }

    #[tokio::test]
    async fn concurrent_creates_and_sweeps_keep_every_record() {
        let dir = tempdir().unwrap();
        let (store, _) = open_store(&dir).await;

        let mut handles = Vec::new();
        for i in 0..16 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                let category = if i % 2 == 0 { Category::Public } else { Category::TimeLimited };
                store
                    .create(&format!("doc-{}.txt", i), b"x", category)
                    .await
                    .unwrap();
                store.sweep_expired().await.unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let records = store.list(None).await.unwrap();
        assert_eq!(records.len(), 16);
        let ids: HashSet<_> = records.iter().map(|r| r.id.clone()).collect();
        assert_eq!(ids.len(), 16);
    }
}
