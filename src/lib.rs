//! # Slyde
//!
//! Image ingestion and on-demand resize server. Users upload images; each
//! upload is validated, normalized to an upright orientation and stored as
//! a canonical JPEG plus a fixed-size thumbnail. Later requests can ask for
//! any width, and the server lazily generates and caches a resized variant
//! the first time a given width bucket is requested.
//!
//! # Architecture: Three Operations Over One Layout
//!
//! ```text
//! upload   bytes       →  validate → canonical + thumbnail → account record
//! fetch    id [+width] →  record → variant cache → file stream
//! delete   ids         →  account records → canonical + thumbnail removal
//! ```
//!
//! Every artifact path is derived from `(user id, image id, variant)`, so
//! nothing on disk needs to be tracked: the account store holds metadata,
//! the filesystem holds bytes, and the path resolver connects the two.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`imaging`] | Pure-Rust image operations: probe, orientation-aware decode, sizing math, resize + JPEG encode |
//! | [`paths`] | Path resolver: `(user, image, variant)` → on-disk location, and its inverse |
//! | [`storage`] | Directory provisioning, atomic writes, best-effort removal |
//! | [`cache`] | Width-bucketed variant cache over the canonical artifact |
//! | [`accounts`] | Account records, the `AccountStore` boundary, and the bundled JSON-backed store |
//! | [`service`] | Image lifecycle: upload, list, fetch, delete |
//! | [`error`] | Core error taxonomy and its client-facing descriptions |
//! | [`api`] | axum router, identity extractor, handlers |
//! | [`config`] | `slyde.toml` loading and validation |
//! | [`telemetry`] | tracing subscriber setup |
//! | [`sweep`] | Out-of-band removal of unreferenced artifacts |
//!
//! # Design Decisions
//!
//! ## Buckets, Not Exact Widths
//!
//! A requested width is reduced to a ratio of the canonical longer side,
//! rounded half-up to the nearest tenth in integer arithmetic. At most nine
//! variants can exist per image, many client widths share one cache entry,
//! and a request at 90% or more of the full size is answered with the
//! canonical file itself.
//!
//! ## Write-Then-Rename
//!
//! Concurrent requests for a cold bucket may both generate it. Encoding is
//! deterministic and every artifact lands via temp file + rename, so the
//! race costs CPU, never correctness, and no reader sees a partial file.
//!
//! ## Metadata Is the Source of Truth
//!
//! Uploads append the account record only after both artifacts are on disk;
//! deletes remove the record first and the files best-effort afterwards.
//! A record therefore never points at files that were never written, and
//! leftovers on disk are garbage for [`sweep`] rather than state.
//!
//! ## No Globals
//!
//! The backend, account store and layout are bundled into one
//! [`service::ImageService`] built at startup and handed to every handler
//! through axum state.

pub mod accounts;
pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod imaging;
pub mod paths;
pub mod service;
pub mod storage;
pub mod sweep;
pub mod telemetry;

#[cfg(test)]
pub(crate) mod test_helpers;
