//! # Export
//!
//! Produces downloadable artifacts from a composition:
//!
//! - [`raster`]: the frozen render tree as a JPEG or PNG image
//! - [`sheet`]: tabular records as an XLSX workbook
//!
//! Both exporters hand back an [`Artifact`]. Delivery (HTTP download, file
//! on disk) is up to the caller.

pub mod raster;
pub mod sheet;

use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tokio::sync::Notify;

use crate::store::StoreError;

/// Errors that abort an export. Per-row image failures in spreadsheets are
/// not errors; those cells are left empty.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Failed to encode image: {cause}")]
    Encode { cause: String },

    #[error("An export for {0} is already running")]
    InFlight(String),

    #[error("Spreadsheet error: {0}")]
    Sheet(#[from] rust_xlsxwriter::XlsxError),

    #[error("Invalid layout: {0}")]
    Layout(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Export task failed: {0}")]
    Task(String),
}

/// A finished export, ready to be delivered as a download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub filename: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Result of an export that may be cancelled.
#[derive(Debug)]
pub enum ExportOutcome {
    Completed(Artifact),
    /// The caller went away. Nothing is delivered and nothing is reported.
    Cancelled,
}

impl ExportOutcome {
    pub fn artifact(self) -> Option<Artifact> {
        match self {
            ExportOutcome::Completed(artifact) => Some(artifact),
            ExportOutcome::Cancelled => None,
        }
    }
}

/// `<subject>_<timestamp>.<ext>`, with the subject reduced to characters
/// that are safe in a file name.
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use vitrine::export::artifact_filename;
///
/// let at = Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 5).unwrap();
/// assert_eq!(
///     artifact_filename("Spring sale!", at, "jpg"),
///     "Spring_sale__20240301T123005000Z.jpg"
/// );
/// ```
pub fn artifact_filename(subject: &str, at: DateTime<Utc>, extension: &str) -> String {
    let subject: String = subject
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    let subject = if subject.is_empty() {
        "export".to_string()
    } else {
        subject
    };
    format!("{}_{}.{}", subject, at.format("%Y%m%dT%H%M%S%3fZ"), extension)
}

/// Cooperative cancellation shared between a caller and its export.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    inner: Arc<CancelInner>,
}

#[derive(Debug, Default)]
struct CancelInner {
    cancelled: AtomicBool,
    notify: Notify,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::SeqCst);
        self.inner.notify.notify_waiters();
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    /// Resolves once [`cancel`](Self::cancel) has been called.
    pub async fn cancelled(&self) {
        loop {
            let notified = self.inner.notify.notified();
            if self.is_cancelled() {
                return;
            }
            notified.await;
        }
    }

    /// Run `fut` unless cancelled first. `None` means cancelled.
    pub async fn run<F: Future>(&self, fut: F) -> Option<F::Output> {
        if self.is_cancelled() {
            return None;
        }
        tokio::select! {
            out = fut => Some(out),
            _ = self.cancelled() => None,
        }
    }
}

/// Rejects a second export of the same artifact while one is running.
#[derive(Debug, Clone, Default)]
pub struct ExportGate {
    running: Arc<Mutex<HashSet<String>>>,
}

impl ExportGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `key`. The claim lasts until the returned ticket is dropped.
    pub fn try_acquire(&self, key: &str) -> Result<ExportTicket, ExportError> {
        let mut running = self.running.lock().unwrap_or_else(|e| e.into_inner());
        if !running.insert(key.to_string()) {
            return Err(ExportError::InFlight(key.to_string()));
        }
        Ok(ExportTicket {
            gate: self.clone(),
            key: key.to_string(),
        })
    }

    pub fn is_running(&self, key: &str) -> bool {
        self.running
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains(key)
    }
}

/// Proof of a claimed export slot.
#[derive(Debug)]
pub struct ExportTicket {
    gate: ExportGate,
    key: String,
}

impl Drop for ExportTicket {
    fn drop(&mut self) {
        self.gate
            .running
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&self.key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::time::Duration;

    #[test]
    fn test_artifact_filename() {
        let at = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        assert_eq!(artifact_filename("promo", at, "png"), "promo_20240102T030405000Z.png");
        assert_eq!(artifact_filename("  ", at, "xlsx"), "export_20240102T030405000Z.xlsx");
        assert_eq!(artifact_filename("a/b", at, "jpg"), "a_b_20240102T030405000Z.jpg");
    }

    #[test]
    fn test_gate_rejects_overlap_and_releases_on_drop() {
        let gate = ExportGate::new();
        let ticket = gate.try_acquire("doc-1").unwrap();
        assert!(matches!(gate.try_acquire("doc-1"), Err(ExportError::InFlight(k)) if k == "doc-1"));
        // Other keys are independent
        let _other = gate.try_acquire("doc-2").unwrap();
        drop(ticket);
        assert!(!gate.is_running("doc-1"));
        assert!(gate.try_acquire("doc-1").is_ok());
    }

    #[tokio::test]
    async fn test_cancel_token_abandons_future() {
        let token = CancelToken::new();
        let waiter = token.clone();
        let handle = tokio::spawn(async move {
            waiter
                .run(tokio::time::sleep(Duration::from_secs(60)))
                .await
        });
        tokio::task::yield_now().await;
        token.cancel();
        assert_eq!(handle.await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_cancel_token_passes_through_result() {
        let token = CancelToken::new();
        assert_eq!(token.run(async { 7 }).await, Some(7));
        token.cancel();
        assert_eq!(token.run(async { 7 }).await, None);
    }
}
