//! Out-of-band garbage collection of unreferenced artifacts.
//!
//! Bucketed variants are never deleted with their image, failed uploads can
//! leave artifacts behind, and interrupted atomic writes leave temp files.
//! The sweep walks `<files_root>/users/*/{images,thumbnails}/`, maps each
//! file back to an image id with
//! [`parse_artifact_name`](crate::paths::parse_artifact_name), and removes
//! files older than a cutoff whose id has no record for that user.
//!
//! Files that belong to a live record are never touched, whatever their
//! age. Files whose names the resolver could not have produced are left
//! alone too.

use crate::accounts::Account;
use crate::paths::{IMAGES_DIR, StorageLayout, THUMBNAILS_DIR, parse_artifact_name};
use crate::storage::TEMP_PREFIX;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use walkdir::WalkDir;

const SECS_PER_DAY: u64 = 24 * 60 * 60;

/// Age cutoff for `days` days. Saturates instead of overflowing.
pub fn max_age_from_days(days: u64) -> Duration {
    Duration::from_secs(days.saturating_mul(SECS_PER_DAY))
}

/// Image ids with a live record, per user id.
pub type LiveImages = HashMap<String, HashSet<String>>;

/// Collect live image ids from the account store's view.
pub fn live_images(accounts: &[Account]) -> LiveImages {
    accounts
        .iter()
        .map(|a| {
            (
                a.user_id.clone(),
                a.images.iter().map(|r| r.id.clone()).collect(),
            )
        })
        .collect()
}

/// Summary of one sweep run.
#[derive(Debug, Default)]
pub struct SweepReport {
    /// Artifact and temp files examined.
    pub scanned: usize,
    /// Files removed (or that would be, on a dry run).
    pub removed: Vec<PathBuf>,
    /// Unreferenced files spared because they are younger than the cutoff.
    pub too_young: usize,
    /// Removals that failed.
    pub failed: usize,
}

impl fmt::Display for SweepReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} scanned, {} removed, {} too young",
            self.scanned,
            self.removed.len(),
            self.too_young
        )?;
        if self.failed > 0 {
            write!(f, ", {} failed", self.failed)?;
        }
        Ok(())
    }
}

/// Remove unreferenced artifacts older than `max_age` as of `now`.
pub fn sweep(
    layout: &StorageLayout,
    live: &LiveImages,
    max_age: Duration,
    now: SystemTime,
    dry_run: bool,
) -> SweepReport {
    let mut report = SweepReport::default();
    let root = layout.users_root();
    if !root.is_dir() {
        return report;
    }

    let entries = WalkDir::new(root)
        .min_depth(3)
        .max_depth(3)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                tracing::warn!(error = %e, "skipping unreadable entry");
                None
            }
        })
        .filter(|entry| entry.file_type().is_file());

    for entry in entries {
        let path = entry.path();
        let Some((user_id, dir)) = owner_and_dir(path) else {
            continue;
        };
        if dir != IMAGES_DIR && dir != THUMBNAILS_DIR {
            continue;
        }
        let file_name = entry.file_name().to_string_lossy();

        if !file_name.starts_with(TEMP_PREFIX) {
            let Some(artifact) = parse_artifact_name(&file_name, dir == THUMBNAILS_DIR) else {
                continue;
            };
            let is_live = live
                .get(user_id)
                .is_some_and(|ids| ids.contains(&artifact.image_id));
            if is_live {
                report.scanned += 1;
                continue;
            }
        }
        report.scanned += 1;

        let modified = entry
            .metadata()
            .ok()
            .and_then(|m| m.modified().ok())
            .unwrap_or(now);
        let age = now.duration_since(modified).unwrap_or(Duration::ZERO);
        if age < max_age {
            report.too_young += 1;
            continue;
        }

        if dry_run {
            report.removed.push(path.to_path_buf());
            continue;
        }
        match std::fs::remove_file(path) {
            Ok(()) => {
                tracing::info!(user = user_id, path = %path.display(), "swept artifact");
                report.removed.push(path.to_path_buf());
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "failed to sweep artifact");
                report.failed += 1;
            }
        }
    }

    report
}

/// `<users_root>/<user>/<dir>/<file>` → `(user, dir)`.
fn owner_and_dir(path: &Path) -> Option<(&str, &str)> {
    let dir = path.parent()?;
    let user = dir.parent()?;
    Some((user.file_name()?.to_str()?, dir.file_name()?.to_str()?))
}
