//! Backup engine
//!
//! Round-trips the entire local dataset as a portable JSON document with a
//! SHA-256 content checksum for caller-side integrity verification.
//! Import is a pure upsert: it never deletes anything not present in the
//! document, and re-importing the same export is idempotent.

use serde_json::json;
use sha2::{Digest, Sha256};

use crate::error::Result;
use crate::store::{ExportDocument, ImportSummary, Store};

/// A serialized export with its integrity metadata.
#[derive(Debug, Clone)]
pub struct ExportBundle {
    /// Pretty-printed export document.
    pub json: String,
    /// SHA-256 hex digest of `json`.
    pub checksum: String,
    pub bytes: u64,
}

/// Serializes the store's contents (minus secrets) and re-applies them.
#[derive(Clone)]
pub struct BackupEngine {
    store: Store,
}

impl BackupEngine {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    /// Export everything except secrets as a portable document.
    pub async fn export_all(&self) -> Result<ExportBundle> {
        let document = self.store.export_all_data().await?;
        let json = serde_json::to_string_pretty(&document)?;
        let checksum = calculate_checksum(json.as_bytes());
        let bytes = json.len() as u64;

        tracing::info!(
            "Exported {} templates, {} responses ({} bytes)",
            document.templates.len(),
            document.responses.len(),
            bytes
        );

        self.store
            .log_event(
                "data_exported",
                json!({
                    "templates": document.templates.len(),
                    "responses": document.responses.len(),
                    "bytes": bytes,
                }),
            )
            .await;

        Ok(ExportBundle {
            json,
            checksum,
            bytes,
        })
    }

    /// Parse an export document and upsert its contents.
    ///
    /// Not atomic: a failure partway leaves earlier records committed.
    /// Because every write is an upsert-by-id, re-running the import is
    /// safe.
    pub async fn import_all(&self, document: &str) -> Result<ImportSummary> {
        let parsed: ExportDocument = serde_json::from_str(document)?;
        let summary = self.store.import_data(&parsed).await?;

        self.store
            .log_event(
                "data_imported",
                json!({
                    "templates": summary.templates,
                    "responses": summary.responses,
                    "brandingApplied": summary.branding_applied,
                }),
            )
            .await;

        Ok(summary)
    }
}

fn calculate_checksum(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    format!("{:x}", hasher.finalize())
}
