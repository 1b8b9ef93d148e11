//! Report downloads.
//!
//! DESIGN
//! ======
//! A server-hosted report is fetched and written under its own file name.
//! An inline base64 PDF is decoded into a blob registered in [`BlobStore`]
//! under a `blob:<uuid>` handle, written as
//! `medical_report_<name>_<YYYY-MM-DD>.pdf`, and the handle is revoked after
//! [`BLOB_REVOKE_GRACE`] so repeated reports do not accumulate memory.

#[cfg(test)]
#[path = "download_test.rs"]
mod download_test;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use base64::{Engine as _, engine::general_purpose::STANDARD};
use time::Date;
use time::macros::format_description;
use tokio::task::JoinHandle;
use tracing::{debug, info};
use uuid::Uuid;

pub const BLOB_REVOKE_GRACE: Duration = Duration::from_millis(100);
pub const PDF_MIME: &str = "application/pdf";
const FALLBACK_REPORT_FILE: &str = "medical_report.pdf";

#[derive(Debug, thiserror::Error)]
pub enum DownloadError {
    #[error("invalid PDF payload: {0}")]
    Decode(#[from] base64::DecodeError),

    #[error("could not write {path}: {source}")]
    Write { path: PathBuf, source: std::io::Error },
}

// =============================================================================
// BLOB STORE
// =============================================================================

#[derive(Debug, Clone)]
pub struct Blob {
    pub mime: &'static str,
    pub bytes: Arc<[u8]>,
}

/// Short-lived in-memory artifacts addressed by `blob:<uuid>` handles.
#[derive(Debug, Clone, Default)]
pub struct BlobStore {
    blobs: Arc<Mutex<HashMap<String, Blob>>>,
}

impl BlobStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register bytes and return their handle.
    pub fn create(&self, bytes: impl Into<Arc<[u8]>>, mime: &'static str) -> String {
        let url = format!("blob:{}", Uuid::new_v4());
        self.lock().insert(url.clone(), Blob { mime, bytes: bytes.into() });
        url
    }

    #[must_use]
    pub fn get(&self, url: &str) -> Option<Blob> {
        self.lock().get(url).cloned()
    }

    /// Release a handle. Returns `false` if it was already gone.
    pub fn revoke(&self, url: &str) -> bool {
        self.lock().remove(url).is_some()
    }

    #[must_use]
    pub fn live_count(&self) -> usize {
        self.lock().len()
    }

    /// Revoke `url` once `delay` has passed.
    pub fn revoke_after(&self, url: String, delay: Duration) -> JoinHandle<()> {
        let store = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if store.revoke(&url) {
                debug!(%url, "blob revoked");
            }
        })
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Blob>> {
        self.blobs.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

// =============================================================================
// FILE NAMES
// =============================================================================

/// `medical_report_<name>_<YYYY-MM-DD>.pdf`. Path separators and control
/// characters in the name become `_`.
#[must_use]
pub fn report_file_name(patient_name: &str, date: Date) -> String {
    let name: String = patient_name
        .chars()
        .map(|c| if matches!(c, '/' | '\\') || c.is_control() { '_' } else { c })
        .collect();
    let date = date
        .format(format_description!("[year]-[month]-[day]"))
        .unwrap_or_default();
    format!("medical_report_{name}_{date}.pdf")
}

/// Last path segment of a report URL, without query or fragment.
#[must_use]
pub fn file_name_from_url(url: &str) -> String {
    let path = url.split(['?', '#']).next().unwrap_or_default();
    path.rsplit('/')
        .find(|segment| !segment.is_empty())
        .filter(|segment| !segment.contains(':') && !matches!(*segment, "." | ".."))
        .unwrap_or(FALLBACK_REPORT_FILE)
        .to_owned()
}

// =============================================================================
// DOWNLOAD MANAGER
// =============================================================================

/// A report written to disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedReport {
    pub path: PathBuf,
    /// The blob handle used for an inline payload. Already scheduled for revocation.
    pub blob_url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct DownloadManager {
    dir: PathBuf,
    blobs: BlobStore,
}

impl DownloadManager {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into(), blobs: BlobStore::new() }
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    #[must_use]
    pub fn blobs(&self) -> &BlobStore {
        &self.blobs
    }

    /// Write fetched report bytes under `file_name`.
    ///
    /// # Errors
    ///
    /// Returns [`DownloadError::Write`] if the file cannot be written.
    pub async fn save_bytes(&self, file_name: &str, bytes: &[u8]) -> Result<SavedReport, DownloadError> {
        let path = self.write(file_name, bytes).await?;
        Ok(SavedReport { path, blob_url: None })
    }

    /// Decode an inline base64 PDF and write it as the patient's dated report.
    ///
    /// # Errors
    ///
    /// Returns [`DownloadError::Decode`] for invalid base64 and
    /// [`DownloadError::Write`] if the file cannot be written.
    pub async fn save_pdf_base64(&self, patient_name: &str, encoded: &str, date: Date) -> Result<SavedReport, DownloadError> {
        let compact: String = encoded.chars().filter(|c| !c.is_ascii_whitespace()).collect();
        let bytes: Arc<[u8]> = STANDARD.decode(compact.as_bytes())?.into();

        let blob_url = self.blobs.create(Arc::clone(&bytes), PDF_MIME);
        let file_name = report_file_name(patient_name, date);
        let written = self.write(&file_name, &bytes).await;
        // Revoked whether or not the write succeeded.
        self.blobs.revoke_after(blob_url.clone(), BLOB_REVOKE_GRACE);

        let path = written?;
        Ok(SavedReport { path, blob_url: Some(blob_url) })
    }

    async fn write(&self, file_name: &str, bytes: &[u8]) -> Result<PathBuf, DownloadError> {
        let path = self.dir.join(file_name);
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|source| DownloadError::Write { path: self.dir.clone(), source })?;
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|source| DownloadError::Write { path: path.clone(), source })?;
        info!(path = %path.display(), bytes = bytes.len(), "report saved");
        Ok(path)
    }
}
