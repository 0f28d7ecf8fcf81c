//! Image lifecycle: upload, list, fetch and delete.
//!
//! [`ImageService`] is built once at startup and shared by every request.
//! It owns no mutable state of its own; accounts live behind the
//! [`AccountStore`] and artifacts on disk. CPU-bound decoding and encoding
//! and all blocking file I/O run on tokio's blocking pool.
//!
//! ## Upload order
//!
//! ```text
//! quota pre-check → name → image field → decode + validate (memory only)
//!   → provision dirs → encode canonical + thumbnail → atomic writes
//!   → conditional append to the account store
//! ```
//!
//! Nothing is written before validation passes, and the record is appended
//! last, so a record never points at missing files. If the conditional
//! append loses a quota race the fresh artifacts are removed again.

use crate::accounts::{Account, AccountStore, AppendOutcome, ImageRecord};
use crate::cache::{self, CachedVariant};
use crate::config::ImagesConfig;
use crate::error::ImageError;
use crate::imaging::{
    Dimensions, ImageBackend, Quality, VariantLimits, encode_upload, validate_upload,
};
use crate::paths::{StorageLayout, VariantKind};
use crate::storage::{self, ensure_user_directories, write_atomic};
use chrono::Utc;
use serde::Serialize;
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use uuid::Uuid;

/// Client-facing view of an [`ImageRecord`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageSummary {
    pub id: String,
    pub name: String,
    pub width: u32,
    pub height: u32,
}

impl From<&ImageRecord> for ImageSummary {
    fn from(record: &ImageRecord) -> Self {
        Self {
            id: record.id.clone(),
            name: record.name.clone(),
            width: record.width,
            height: record.height,
        }
    }
}

pub struct ImageService {
    backend: Arc<dyn ImageBackend>,
    store: Arc<dyn AccountStore>,
    layout: StorageLayout,
    limits: VariantLimits,
    quality: Quality,
    dir_mode: u32,
}

impl ImageService {
    pub fn new(
        backend: Arc<dyn ImageBackend>,
        store: Arc<dyn AccountStore>,
        layout: StorageLayout,
        images: &ImagesConfig,
        dir_mode: u32,
    ) -> Self {
        Self {
            backend,
            store,
            layout,
            limits: images.limits(),
            quality: images.quality(),
            dir_mode,
        }
    }

    pub fn store(&self) -> &Arc<dyn AccountStore> {
        &self.store
    }

    pub fn layout(&self) -> &StorageLayout {
        &self.layout
    }

    /// Validate, store and register a new image for `account`.
    pub async fn upload<B>(
        &self,
        account: &Account,
        name: Option<String>,
        image: Option<B>,
    ) -> Result<ImageRecord, ImageError>
    where
        B: AsRef<[u8]> + Send + 'static,
    {
        if account.is_at_quota() {
            return Err(ImageError::QuotaExceeded);
        }
        let name = name
            .filter(|n| !n.is_empty())
            .ok_or(ImageError::MissingField("name"))?;
        let bytes = image.ok_or(ImageError::MissingField("image"))?;

        let user_id = account.user_id.clone();
        let image_id = Uuid::new_v4().to_string();
        let backend = self.backend.clone();
        let layout = self.layout.clone();
        let (limits, quality, dir_mode) = (self.limits, self.quality, self.dir_mode);

        let stored = {
            let (user_id, image_id) = (user_id.clone(), image_id.clone());
            tokio::task::spawn_blocking(move || -> Result<Dimensions, ImageError> {
                let upload = validate_upload(backend.as_ref(), bytes.as_ref(), &limits)?;
                ensure_user_directories(&layout, &user_id, dir_mode)?;
                let encoded = encode_upload(backend.as_ref(), &upload, &limits, quality)?;
                write_atomic(
                    &layout.resolve(&user_id, &image_id, VariantKind::Canonical)?,
                    &encoded.canonical,
                )?;
                write_atomic(
                    &layout.resolve(&user_id, &image_id, VariantKind::Thumbnail)?,
                    &encoded.thumbnail,
                )?;
                Ok(encoded.canonical_dimensions)
            })
            .await?
        };
        let dims = match stored {
            Ok(dims) => dims,
            Err(e) => {
                if !matches!(e, ImageError::Validation(_)) {
                    self.discard_artifacts(&user_id, vec![image_id]).await;
                }
                return Err(e);
            }
        };

        let record = ImageRecord {
            id: image_id.clone(),
            name,
            width: dims.width,
            height: dims.height,
            uploaded_at: Utc::now(),
        };
        let outcome = self.store.append_image(&user_id, record.clone()).await;
        match outcome {
            Ok(AppendOutcome::Appended) => {
                tracing::info!(
                    user = %user_id,
                    image = %image_id,
                    width = dims.width,
                    height = dims.height,
                    "stored upload"
                );
                Ok(record)
            }
            Ok(AppendOutcome::QuotaExceeded) => {
                self.discard_artifacts(&user_id, vec![image_id]).await;
                Err(ImageError::QuotaExceeded)
            }
            Err(e) => {
                self.discard_artifacts(&user_id, vec![image_id]).await;
                Err(e.into())
            }
        }
    }

    /// Every image the account owns, in upload order. Metadata only.
    pub fn list(&self, account: &Account) -> Vec<ImageSummary> {
        account.images.iter().map(ImageSummary::from).collect()
    }

    /// Resolve the file to stream for one image.
    ///
    /// `thumbnail` wins over `width`. Without either, the canonical artifact
    /// is served; with a width, the variant cache decides.
    pub async fn fetch(
        &self,
        account: &Account,
        image_id: &str,
        width: Option<u32>,
        thumbnail: bool,
    ) -> Result<PathBuf, ImageError> {
        let record = account.find_image(image_id).ok_or(ImageError::NotFound)?;
        let user_id = account.user_id.clone();

        let path = if thumbnail {
            self.layout
                .resolve(&user_id, &record.id, VariantKind::Thumbnail)?
        } else {
            let backend = self.backend.clone();
            let layout = self.layout.clone();
            let image_id = record.id.clone();
            let original = Dimensions {
                width: record.width,
                height: record.height,
            };
            let quality = self.quality;
            let CachedVariant { path, outcome } = tokio::task::spawn_blocking(move || {
                cache::get_or_create_bucketed_variant(
                    backend.as_ref(),
                    &layout,
                    &user_id,
                    &image_id,
                    original,
                    width,
                    quality,
                )
            })
            .await??;
            tracing::debug!(image = %record.id, ?width, %outcome, "resolved variant");
            path
        };

        // A record without its artifact is an inconsistency, not a 404.
        tokio::fs::metadata(&path).await?;
        Ok(path)
    }

    /// Delete the listed images the account owns. Returns how many records
    /// were removed; unknown and foreign ids are ignored.
    ///
    /// Bucketed variants are left for the sweep.
    pub async fn delete(&self, account: &Account, ids: Vec<String>) -> Result<usize, ImageError> {
        let ids: HashSet<String> = ids.into_iter().collect();
        if ids.is_empty() {
            return Ok(0);
        }
        let removed = self.store.remove_images(&account.user_id, &ids).await?;
        let count = removed.len();
        if count > 0 {
            self.discard_artifacts(
                &account.user_id,
                removed.into_iter().map(|r| r.id).collect(),
            )
            .await;
            tracing::info!(user = %account.user_id, deleted = count, "deleted images");
        }
        Ok(count)
    }

    /// Best-effort removal of canonical and thumbnail artifacts.
    async fn discard_artifacts(&self, user_id: &str, image_ids: Vec<String>) {
        let layout = self.layout.clone();
        let user_id = user_id.to_string();
        let result = tokio::task::spawn_blocking(move || {
            for image_id in &image_ids {
                for kind in [VariantKind::Canonical, VariantKind::Thumbnail] {
                    match layout.resolve(&user_id, image_id, kind) {
                        Ok(path) => {
                            storage::remove_best_effort(&path);
                        }
                        Err(e) => tracing::warn!(error = %e, "skipping artifact removal"),
                    }
                }
            }
        })
        .await;
        if let Err(e) = result {
            tracing::warn!(error = %e, "artifact removal task failed");
        }
    }
}
