//! Store layer: generic document CRUD plus typed collection helpers
//!
//! Each primitive is one SQLite statement (or one transaction), atomic on
//! its own. Multi-step logical operations (read branding, mutate, write
//! back) are deliberately not wrapped in a transaction: the store has a
//! single active writer in practice, and the last write wins. Multi-tab
//! style concurrent writers are a documented race, not a supported mode.

use chrono::Utc;
use serde_json::Value;
use sha2::{Digest, Sha256};
use sqlx::SqlitePool;
use std::path::Path;

use super::models::*;
use super::{create_memory_pool, create_pool, initialize_schema};
use crate::config::{BRANDING_KEY, MAX_PASSCODE_DIGITS, MIN_PASSCODE_DIGITS};
use crate::error::{AppError, Result};

/// The five independent collections.
///
/// Branding holds a single record under a fixed string key and is reached
/// through the dedicated branding API; the other four use auto-assigned
/// integer surrogate keys and the generic document layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collection {
    Branding,
    Templates,
    Responses,
    Analytics,
    BackupQueue,
}

impl Collection {
    pub fn table(&self) -> &'static str {
        match self {
            Collection::Branding => "branding",
            Collection::Templates => "templates",
            Collection::Responses => "responses",
            Collection::Analytics => "analytics",
            Collection::BackupQueue => "backup_queue",
        }
    }

    /// Declared secondary indexes, named by the JSON field they cover.
    pub fn indexes(&self) -> &'static [&'static str] {
        match self {
            Collection::Templates => &["createdAt"],
            Collection::Responses => &["templateId"],
            Collection::Analytics => &["eventType"],
            _ => &[],
        }
    }

    fn require_integer_keys(&self) -> Result<()> {
        if *self == Collection::Branding {
            return Err(AppError::ConstraintViolation(
                "branding uses a fixed string key; use the branding API".to_string(),
            ));
        }
        Ok(())
    }
}

/// Durable CRUD over the five collections.
#[derive(Clone)]
pub struct Store {
    pool: SqlitePool,
}

impl Store {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Open (or create) the store at the given path and initialize its
    /// schema. Idempotent across repeated calls in the same session.
    pub async fn open(db_path: &Path) -> Result<Self> {
        let pool = create_pool(db_path).await?;
        initialize_schema(&pool).await?;
        Ok(Self::new(pool))
    }

    /// Open a throwaway in-memory store, mainly for tests.
    pub async fn open_in_memory() -> Result<Self> {
        let pool = create_memory_pool().await?;
        initialize_schema(&pool).await?;
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    // ===== Generic document layer =====

    /// Insert a new document, auto-assigning its key when the document
    /// carries no `id`. An explicit key that collides with an existing
    /// record fails with `ConstraintViolation`.
    pub async fn add(&self, collection: Collection, document: Value) -> Result<i64> {
        collection.require_integer_keys()?;
        let table = collection.table();

        if let Some(id) = document.get("id").and_then(Value::as_i64) {
            let json = serde_json::to_string(&document)?;
            sqlx::query(&format!("INSERT INTO {table} (id, document) VALUES (?, ?)"))
                .bind(id)
                .bind(&json)
                .execute(&self.pool)
                .await
                .map_err(AppError::from_write)?;

            tracing::debug!("Added document to {} with explicit id {}", table, id);
            return Ok(id);
        }

        // Auto-assign, then write the key back into the document in the
        // same transaction so reads always see the `id` field.
        let json = serde_json::to_string(&document)?;
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(&format!("INSERT INTO {table} (document) VALUES (?)"))
            .bind(&json)
            .execute(&mut *tx)
            .await
            .map_err(AppError::from_write)?;
        let id = result.last_insert_rowid();

        sqlx::query(&format!(
            "UPDATE {table} SET document = json_set(document, '$.id', id) WHERE id = ?"
        ))
        .bind(id)
        .execute(&mut *tx)
        .await
        .map_err(AppError::from_write)?;

        tx.commit().await?;

        tracing::debug!("Added document to {} with id {}", table, id);
        Ok(id)
    }

    /// Upsert by primary key: insert when absent, full replace when
    /// present. A document without an `id` falls back to `add`.
    pub async fn put(&self, collection: Collection, document: Value) -> Result<i64> {
        collection.require_integer_keys()?;

        let Some(id) = document.get("id").and_then(Value::as_i64) else {
            return self.add(collection, document).await;
        };

        let table = collection.table();
        let json = serde_json::to_string(&document)?;

        sqlx::query(&format!(
            "INSERT INTO {table} (id, document) VALUES (?, ?) \
             ON CONFLICT(id) DO UPDATE SET document = excluded.document"
        ))
        .bind(id)
        .bind(&json)
        .execute(&self.pool)
        .await
        .map_err(AppError::from_write)?;

        tracing::debug!("Put document into {} with id {}", table, id);
        Ok(id)
    }

    /// Fetch one document by key. A miss is `Ok(None)`, never an error.
    pub async fn get(&self, collection: Collection, id: i64) -> Result<Option<Value>> {
        collection.require_integer_keys()?;

        let json: Option<String> = sqlx::query_scalar(&format!(
            "SELECT document FROM {} WHERE id = ?",
            collection.table()
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        match json {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    /// Fetch every document in a collection, in key order.
    pub async fn get_all(&self, collection: Collection) -> Result<Vec<Value>> {
        collection.require_integer_keys()?;

        let rows: Vec<String> = sqlx::query_scalar(&format!(
            "SELECT document FROM {} ORDER BY id",
            collection.table()
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|json| serde_json::from_str(json).map_err(AppError::from))
            .collect()
    }

    /// Fetch every document whose indexed field equals `value`.
    ///
    /// Only the indexes declared on the collection are queryable; asking
    /// for anything else is a programmer error.
    pub async fn get_by_index(
        &self,
        collection: Collection,
        index: &str,
        value: &Value,
    ) -> Result<Vec<Value>> {
        collection.require_integer_keys()?;

        if !collection.indexes().contains(&index) {
            return Err(AppError::ConstraintViolation(format!(
                "no index named '{}' on collection '{}'",
                index,
                collection.table()
            )));
        }

        let sql = format!(
            "SELECT document FROM {} WHERE json_extract(document, '$.{}') = ? ORDER BY id",
            collection.table(),
            index
        );

        let query = sqlx::query_scalar::<_, String>(&sql);
        let rows: Vec<String> = match value {
            Value::Number(n) if n.is_i64() => {
                query.bind(n.as_i64()).fetch_all(&self.pool).await?
            }
            Value::Number(n) => query.bind(n.as_f64()).fetch_all(&self.pool).await?,
            Value::String(s) => query.bind(s.as_str()).fetch_all(&self.pool).await?,
            Value::Bool(b) => query.bind(*b).fetch_all(&self.pool).await?,
            other => {
                return Err(AppError::Generic(format!(
                    "unsupported index lookup value: {other}"
                )))
            }
        };

        rows.iter()
            .map(|json| serde_json::from_str(json).map_err(AppError::from))
            .collect()
    }

    /// Remove by key. No error when the key is absent.
    pub async fn delete(&self, collection: Collection, id: i64) -> Result<()> {
        collection.require_integer_keys()?;

        sqlx::query(&format!("DELETE FROM {} WHERE id = ?", collection.table()))
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(AppError::from_write)?;

        tracing::debug!("Deleted id {} from {}", id, collection.table());
        Ok(())
    }

    /// Record count of a collection.
    pub async fn count(&self, collection: Collection) -> Result<i64> {
        let count: i64 =
            sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", collection.table()))
                .fetch_one(&self.pool)
                .await?;
        Ok(count)
    }

    // ===== Branding =====

    /// Get the singleton branding record.
    pub async fn get_branding(&self) -> Result<Option<Branding>> {
        let json: Option<String> =
            sqlx::query_scalar("SELECT document FROM branding WHERE key = ?")
                .bind(BRANDING_KEY)
                .fetch_optional(&self.pool)
                .await?;

        match json {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    /// Full upsert of the branding record, stamping `updatedAt`.
    ///
    /// This replaces the whole record; callers changing a single field
    /// should prefer `patch_branding` to avoid clobbering concurrent
    /// edits to unrelated fields.
    pub async fn save_branding(&self, branding: Branding) -> Result<Branding> {
        let mut branding = branding;
        branding.id = BRANDING_KEY.to_string();
        branding.updated_at = Some(Utc::now());

        let json = serde_json::to_string(&branding)?;
        sqlx::query(
            "INSERT INTO branding (key, document) VALUES (?, ?) \
             ON CONFLICT(key) DO UPDATE SET document = excluded.document",
        )
        .bind(BRANDING_KEY)
        .bind(&json)
        .execute(&self.pool)
        .await
        .map_err(AppError::from_write)?;

        tracing::debug!("Branding saved");
        Ok(branding)
    }

    /// Merge-patch the branding record as one get+merge+put unit.
    ///
    /// Shallow merge: each key in `patch` replaces the stored field, and
    /// an explicit null clears it. The passcode fields are not patchable;
    /// they change only through the passcode API.
    pub async fn patch_branding(&self, patch: Value) -> Result<Branding> {
        let Value::Object(patch) = patch else {
            return Err(AppError::Generic(
                "branding patch must be a JSON object".to_string(),
            ));
        };

        let current = self.get_branding().await?.unwrap_or_default();
        let mut doc = match serde_json::to_value(&current)? {
            Value::Object(map) => map,
            _ => serde_json::Map::new(),
        };

        for (key, value) in patch {
            if key == "passcodeHash" || key == "passcodeSetAt" || key == "id" {
                continue;
            }
            if value.is_null() {
                doc.remove(&key);
            } else {
                doc.insert(key, value);
            }
        }

        let merged: Branding = serde_json::from_value(Value::Object(doc))?;
        self.save_branding(merged).await
    }

    // ===== Templates =====

    /// Insert-or-update a template: `put` when it already has an id, `add`
    /// otherwise. Stamps `createdAt` on first save and `updatedAt` on
    /// every save. Performs no validation — that is the builder's job.
    pub async fn save_template(&self, template: Template) -> Result<i64> {
        let mut template = template;
        let now = Utc::now();
        template.created_at = template.created_at.or(Some(now));
        template.updated_at = Some(now);

        let document = serde_json::to_value(&template)?;
        let id = if template.id.is_some() {
            self.put(Collection::Templates, document).await?
        } else {
            self.add(Collection::Templates, document).await?
        };

        tracing::debug!("Saved template {} ({})", id, template.name);
        Ok(id)
    }

    pub async fn get_template(&self, id: i64) -> Result<Option<Template>> {
        match self.get(Collection::Templates, id).await? {
            Some(doc) => Ok(Some(serde_json::from_value(doc)?)),
            None => Ok(None),
        }
    }

    pub async fn get_all_templates(&self) -> Result<Vec<Template>> {
        self.get_all(Collection::Templates)
            .await?
            .into_iter()
            .map(|doc| serde_json::from_value(doc).map_err(AppError::from))
            .collect()
    }

    /// Delete a template. Its responses are left in place; they are
    /// historical records with their own lifecycle.
    pub async fn delete_template(&self, id: i64) -> Result<()> {
        self.delete(Collection::Templates, id).await
    }

    // ===== Responses =====

    /// Insert-or-update a response, stamping `submittedAt` when absent.
    pub async fn save_response(&self, response: Response) -> Result<i64> {
        let mut response = response;
        response.submitted_at = response.submitted_at.or(Some(Utc::now()));

        let document = serde_json::to_value(&response)?;
        let id = if response.id.is_some() {
            self.put(Collection::Responses, document).await?
        } else {
            self.add(Collection::Responses, document).await?
        };

        tracing::debug!("Saved response {} for template {}", id, response.template_id);
        Ok(id)
    }

    pub async fn get_response(&self, id: i64) -> Result<Option<Response>> {
        match self.get(Collection::Responses, id).await? {
            Some(doc) => Ok(Some(serde_json::from_value(doc)?)),
            None => Ok(None),
        }
    }

    pub async fn get_all_responses(&self) -> Result<Vec<Response>> {
        self.get_all(Collection::Responses)
            .await?
            .into_iter()
            .map(|doc| serde_json::from_value(doc).map_err(AppError::from))
            .collect()
    }

    pub async fn get_responses_by_template(&self, template_id: i64) -> Result<Vec<Response>> {
        self.get_by_index(
            Collection::Responses,
            "templateId",
            &Value::from(template_id),
        )
        .await?
        .into_iter()
        .map(|doc| serde_json::from_value(doc).map_err(AppError::from))
        .collect()
    }

    pub async fn delete_response(&self, id: i64) -> Result<()> {
        self.delete(Collection::Responses, id).await
    }

    // ===== Analytics =====

    /// Best-effort append to the analytics log.
    ///
    /// Never fails the caller: a write failure is logged and swallowed so
    /// the operation it annotates cannot be aborted by telemetry.
    pub async fn log_event(&self, event_type: &str, data: Value) {
        let event = AnalyticsEvent {
            id: None,
            event_type: event_type.to_string(),
            data,
            timestamp: Utc::now(),
        };

        let result = match serde_json::to_value(&event) {
            Ok(doc) => self.add(Collection::Analytics, doc).await,
            Err(e) => Err(AppError::from(e)),
        };

        if let Err(e) = result {
            tracing::warn!("Failed to log '{}' event: {}", event_type, e);
        }
    }

    pub async fn get_all_analytics(&self) -> Result<Vec<AnalyticsEvent>> {
        self.get_all(Collection::Analytics)
            .await?
            .into_iter()
            .map(|doc| serde_json::from_value(doc).map_err(AppError::from))
            .collect()
    }

    pub async fn get_analytics_by_type(&self, event_type: &str) -> Result<Vec<AnalyticsEvent>> {
        self.get_by_index(Collection::Analytics, "eventType", &Value::from(event_type))
            .await?
            .into_iter()
            .map(|doc| serde_json::from_value(doc).map_err(AppError::from))
            .collect()
    }

    // ===== Backup queue =====

    /// Stage an opaque payload for a future sync, stamping `timestamp`.
    pub async fn queue_for_backup(&self, payload: Value) -> Result<i64> {
        let Value::Object(payload) = payload else {
            return Err(AppError::Generic(
                "backup queue payload must be a JSON object".to_string(),
            ));
        };

        let item = BackupQueueItem {
            id: None,
            timestamp: Utc::now(),
            payload,
        };
        self.add(Collection::BackupQueue, serde_json::to_value(&item)?)
            .await
    }

    pub async fn get_backup_queue(&self) -> Result<Vec<BackupQueueItem>> {
        self.get_all(Collection::BackupQueue)
            .await?
            .into_iter()
            .map(|doc| serde_json::from_value(doc).map_err(AppError::from))
            .collect()
    }

    pub async fn clear_backup_queue(&self) -> Result<()> {
        sqlx::query("DELETE FROM backup_queue")
            .execute(&self.pool)
            .await
            .map_err(AppError::from_write)?;

        tracing::debug!("Backup queue cleared");
        Ok(())
    }

    // ===== Export / import =====

    /// Snapshot of everything except secrets. The branding copy has
    /// `passcodeHash` and `passcodeSetAt` stripped unconditionally.
    pub async fn export_all_data(&self) -> Result<ExportDocument> {
        let branding = self.get_branding().await?.map(|b| b.redacted());

        Ok(ExportDocument {
            branding,
            templates: self.get_all_templates().await?,
            responses: self.get_all_responses().await?,
            analytics: self.get_all_analytics().await?,
            exported_at: Utc::now(),
        })
    }

    /// Apply an export document: merge branding over the stored record,
    /// upsert templates and responses; analytics are never imported.
    ///
    /// Branding goes through `patch_branding`, so the stored passcode
    /// fields survive the import untouched even though the export is
    /// redacted.
    ///
    /// Not atomic. A mid-sequence failure leaves earlier upserts
    /// committed, and because every write is an upsert-by-id, re-running
    /// the same import is safe and idempotent.
    pub async fn import_data(&self, data: &ExportDocument) -> Result<ImportSummary> {
        let mut summary = ImportSummary::default();

        if let Some(branding) = &data.branding {
            self.patch_branding(serde_json::to_value(branding)?).await?;
            summary.branding_applied = true;
        }

        for template in &data.templates {
            self.save_template(template.clone()).await?;
            summary.templates += 1;
        }

        for response in &data.responses {
            self.save_response(response.clone()).await?;
            summary.responses += 1;
        }

        tracing::info!(
            "Imported {} templates, {} responses",
            summary.templates,
            summary.responses
        );
        Ok(summary)
    }

    // ===== Passcode =====

    /// One-way digest of a passcode: SHA-256 over UTF-8 bytes, hex.
    pub fn hash_passcode(plaintext: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(plaintext.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    /// Set or replace the passcode. Only the hash and a timestamp are
    /// stored, never the plaintext.
    pub async fn set_passcode(&self, plaintext: &str) -> Result<()> {
        let digits_only = plaintext.chars().all(|c| c.is_ascii_digit());
        if !digits_only
            || plaintext.len() < MIN_PASSCODE_DIGITS
            || plaintext.len() > MAX_PASSCODE_DIGITS
        {
            return Err(AppError::Validation(vec![format!(
                "Passcode must be {MIN_PASSCODE_DIGITS}-{MAX_PASSCODE_DIGITS} digits"
            )]));
        }

        let mut branding = self.get_branding().await?.unwrap_or_default();
        branding.passcode_hash = Some(Self::hash_passcode(plaintext));
        branding.passcode_set_at = Some(Utc::now());
        self.save_branding(branding).await?;

        tracing::info!("Passcode set");
        Ok(())
    }

    /// Recompute-and-compare. `false` when no passcode is set.
    pub async fn verify_passcode(&self, candidate: &str) -> Result<bool> {
        let Some(branding) = self.get_branding().await? else {
            return Ok(false);
        };
        let Some(stored) = branding.passcode_hash else {
            return Ok(false);
        };

        Ok(Self::hash_passcode(candidate) == stored)
    }

    pub async fn has_passcode(&self) -> Result<bool> {
        Ok(self
            .get_branding()
            .await?
            .map(|b| b.passcode_hash.is_some())
            .unwrap_or(false))
    }

    /// Remove the passcode. The current passcode must verify first.
    pub async fn remove_passcode(&self, current: &str) -> Result<()> {
        if !self.verify_passcode(current).await? {
            return Err(AppError::InvalidCredential);
        }

        if let Some(mut branding) = self.get_branding().await? {
            branding.passcode_hash = None;
            branding.passcode_set_at = None;
            self.save_branding(branding).await?;
        }

        tracing::info!("Passcode removed");
        Ok(())
    }
}
