//! Shared test utilities for the slyde test suite.
//!
//! Provides synthetic image encoders and a throwaway storage environment
//! wired to an in-memory account store.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let env = TestEnv::new();
//! let account = env.add_account("u1", 10).await;
//! let service = env.service(Arc::new(RustBackend::new()));
//!
//! let record = service
//!     .upload(&account, Some("a.jpg".into()), Some(jpeg_bytes(2000, 1000)))
//!     .await
//!     .unwrap();
//! ```

use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use std::io::Cursor;
use std::sync::Arc;
use tempfile::TempDir;

use crate::accounts::{Account, AccountStore, MemoryAccountStore};
use crate::config::ImagesConfig;
use crate::imaging::ImageBackend;
use crate::paths::StorageLayout;
use crate::service::ImageService;
use crate::storage;

// =========================================================================
// Synthetic images
// =========================================================================

/// A gradient so resampling has real content to work on.
fn gradient(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        Rgb([
            (x * 255 / width.max(1)) as u8,
            (y * 255 / height.max(1)) as u8,
            ((x + y) % 256) as u8,
        ])
    })
}

/// Baseline JPEG of the given size, no EXIF.
pub fn jpeg_bytes(width: u32, height: u32) -> Vec<u8> {
    let mut bytes = Vec::new();
    JpegEncoder::new_with_quality(&mut bytes, 90)
        .encode_image(&gradient(width, height))
        .unwrap();
    bytes
}

/// PNG of the given size.
pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let mut cursor = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(gradient(width, height))
        .write_to(&mut cursor, ImageFormat::Png)
        .unwrap();
    cursor.into_inner()
}

/// JPEG carrying an EXIF orientation tag (1-8).
///
/// Splices a minimal big-endian APP1 segment with a single-entry IFD0
/// right after the SOI marker.
pub fn jpeg_bytes_with_orientation(width: u32, height: u32, orientation: u16) -> Vec<u8> {
    let plain = jpeg_bytes(width, height);
    assert_eq!(&plain[..2], &[0xFF, 0xD8], "encoder must start with SOI");

    let mut tiff = Vec::new();
    tiff.extend_from_slice(b"MM\x00\x2A");
    tiff.extend_from_slice(&8u32.to_be_bytes()); // IFD0 offset
    tiff.extend_from_slice(&1u16.to_be_bytes()); // entry count
    tiff.extend_from_slice(&0x0112u16.to_be_bytes()); // Orientation
    tiff.extend_from_slice(&3u16.to_be_bytes()); // SHORT
    tiff.extend_from_slice(&1u32.to_be_bytes()); // count
    tiff.extend_from_slice(&orientation.to_be_bytes());
    tiff.extend_from_slice(&[0, 0]); // value padding
    tiff.extend_from_slice(&0u32.to_be_bytes()); // no next IFD

    let mut payload = b"Exif\x00\x00".to_vec();
    payload.extend_from_slice(&tiff);
    let segment_len = (payload.len() + 2) as u16;

    let mut out = Vec::with_capacity(plain.len() + payload.len() + 4);
    out.extend_from_slice(&plain[..2]);
    out.extend_from_slice(&[0xFF, 0xE1]);
    out.extend_from_slice(&segment_len.to_be_bytes());
    out.extend_from_slice(&payload);
    out.extend_from_slice(&plain[2..]);
    out
}

/// Decode stored bytes and return `(width, height)`.
pub fn decoded_size(bytes: &[u8]) -> (u32, u32) {
    let img = image::load_from_memory(bytes).unwrap();
    (img.width(), img.height())
}

// =========================================================================
// Storage environment
// =========================================================================

/// Temp files root with a prepared `users/` tree and an in-memory store.
pub struct TestEnv {
    pub tmp: TempDir,
    pub layout: StorageLayout,
    pub store: Arc<MemoryAccountStore>,
}

impl TestEnv {
    pub fn new() -> Self {
        let tmp = TempDir::new().unwrap();
        let layout = storage::prepare_files_root(tmp.path()).unwrap();
        Self {
            tmp,
            layout,
            store: Arc::new(MemoryAccountStore::new()),
        }
    }

    pub async fn add_account(&self, user_id: &str, quota: usize) -> Account {
        let account = Account::new(user_id, quota);
        self.store.upsert_account(account.clone()).await.unwrap();
        account
    }

    /// Re-read an account so callers see records appended since.
    pub async fn reload(&self, user_id: &str) -> Account {
        self.store.account(user_id).await.unwrap().unwrap()
    }

    pub fn service(&self, backend: Arc<dyn ImageBackend>) -> ImageService {
        ImageService::new(
            backend,
            self.store.clone(),
            self.layout.clone(),
            &ImagesConfig::default(),
            0o755,
        )
    }

    /// Every regular file under the users root, relative to it, sorted.
    pub fn stored_files(&self) -> Vec<String> {
        let mut files: Vec<String> = walkdir::WalkDir::new(self.layout.users_root())
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .map(|e| {
                e.path()
                    .strip_prefix(self.layout.users_root())
                    .unwrap()
                    .to_string_lossy()
                    .replace('\\', "/")
            })
            .collect();
        files.sort();
        files
    }
}
