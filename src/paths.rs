//! Canonical on-disk layout for user artifacts.
//!
//! Every artifact path is derived from `(user id, image id, variant)`; no
//! path is ever stored. The layout under the files root is:
//!
//! ```text
//! <files_root>/users/
//! └── <user_id>/
//!     ├── images/
//!     │   ├── <image_id>.jpg        # canonical
//!     │   ├── <image_id>-3.jpg      # bucketed variant at 30%
//!     │   └── <image_id>-7.jpg      # bucketed variant at 70%
//!     └── thumbnails/
//!         └── <image_id>.jpg        # thumbnail
//! ```
//!
//! [`parse_artifact_name`] is the inverse of the resolver for file names and
//! is used by the sweep to map files back to image ids.

use crate::imaging::{MAX_RATIO_TENTHS, MIN_RATIO_TENTHS};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Directory under the files root that holds all per-user roots.
pub const USERS_DIR: &str = "users";
/// Per-user directory for canonical and bucketed artifacts.
pub const IMAGES_DIR: &str = "images";
/// Per-user directory for thumbnails.
pub const THUMBNAILS_DIR: &str = "thumbnails";
/// Extension of every stored artifact.
pub const ARTIFACT_EXTENSION: &str = "jpg";

#[derive(Error, Debug, PartialEq, Eq)]
pub enum PathError {
    #[error("invalid {kind} identifier: {value:?}")]
    InvalidIdentifier { kind: &'static str, value: String },
}

/// Which artifact of an image to address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VariantKind {
    Canonical,
    Thumbnail,
    /// Resized variant at `ratio_tenths / 10` of the canonical size.
    Bucketed(u32),
}

/// Resolves artifact locations under a fixed users root.
#[derive(Debug, Clone)]
pub struct StorageLayout {
    users_root: PathBuf,
}

impl StorageLayout {
    /// Layout rooted at `<files_root>/users`.
    pub fn new(files_root: &Path) -> Self {
        Self {
            users_root: files_root.join(USERS_DIR),
        }
    }

    pub fn users_root(&self) -> &Path {
        &self.users_root
    }

    /// `<users_root>/<user_id>`.
    pub fn user_root(&self, user_id: &str) -> Result<PathBuf, PathError> {
        validate_identifier("user", user_id)?;
        Ok(self.users_root.join(user_id))
    }

    pub fn images_dir(&self, user_id: &str) -> Result<PathBuf, PathError> {
        Ok(self.user_root(user_id)?.join(IMAGES_DIR))
    }

    pub fn thumbnails_dir(&self, user_id: &str) -> Result<PathBuf, PathError> {
        Ok(self.user_root(user_id)?.join(THUMBNAILS_DIR))
    }

    /// Resolve the path of one artifact. Pure: no filesystem access.
    pub fn resolve(
        &self,
        user_id: &str,
        image_id: &str,
        variant: VariantKind,
    ) -> Result<PathBuf, PathError> {
        validate_identifier("image", image_id)?;
        let path = match variant {
            VariantKind::Canonical => self
                .images_dir(user_id)?
                .join(format!("{image_id}.{ARTIFACT_EXTENSION}")),
            VariantKind::Thumbnail => self
                .thumbnails_dir(user_id)?
                .join(format!("{image_id}.{ARTIFACT_EXTENSION}")),
            VariantKind::Bucketed(ratio_tenths) => self
                .images_dir(user_id)?
                .join(format!("{image_id}-{ratio_tenths}.{ARTIFACT_EXTENSION}")),
        };
        Ok(path)
    }
}

/// Identifiers become path components, so they must stay a single component.
fn validate_identifier(kind: &'static str, value: &str) -> Result<(), PathError> {
    let bad = value.is_empty()
        || value == "."
        || value == ".."
        || value.contains(['/', '\\', '\0']);
    if bad {
        return Err(PathError::InvalidIdentifier {
            kind,
            value: value.to_string(),
        });
    }
    Ok(())
}

/// Image id and variant recovered from an artifact file name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedArtifact {
    pub image_id: String,
    pub variant: VariantKind,
}

/// Parse a file name found in a user's `images/` or `thumbnails/` directory.
///
/// Handles these patterns:
/// - `"<id>.jpg"` in `images/` → canonical
/// - `"<id>-7.jpg"` in `images/` → bucketed at 7 tenths
/// - `"<id>.jpg"` in `thumbnails/` → thumbnail
///
/// A `-N` suffix only counts as a bucket when `N` is a valid ratio written
/// with at most two digits; image ids are UUIDs whose last group is twelve
/// hex characters, so the two never collide. Returns `None` for anything
/// else (temp files, foreign files).
pub fn parse_artifact_name(file_name: &str, in_thumbnails: bool) -> Option<ParsedArtifact> {
    let stem = file_name.strip_suffix(&format!(".{ARTIFACT_EXTENSION}"))?;
    if validate_identifier("image", stem).is_err() {
        return None;
    }
    if in_thumbnails {
        return Some(ParsedArtifact {
            image_id: stem.to_string(),
            variant: VariantKind::Thumbnail,
        });
    }

    if let Some((id, suffix)) = stem.rsplit_once('-')
        && !id.is_empty()
        && (1..=2).contains(&suffix.len())
        && suffix.bytes().all(|b| b.is_ascii_digit())
        && let Ok(ratio) = suffix.parse::<u32>()
        && (MIN_RATIO_TENTHS..=MAX_RATIO_TENTHS).contains(&ratio)
    {
        return Some(ParsedArtifact {
            image_id: id.to_string(),
            variant: VariantKind::Bucketed(ratio),
        });
    }

    Some(ParsedArtifact {
        image_id: stem.to_string(),
        variant: VariantKind::Canonical,
    })
}
