//! # Audit Repository
//!
//! Append-only audit trail with a lifecycle independent of the entities
//! it describes.
//!
//! ## Best-Effort Side Channel
//! The checkout path records its audit entry *after* commit, from a
//! spawned task, via [`AuditRepository::record_best_effort`]: a failed
//! audit write is logged and swallowed, never propagated, and can never
//! roll back or block the order it describes.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::DbResult;
use till_core::AuditEntry;

/// Repository for audit log operations.
#[derive(Debug, Clone)]
pub struct AuditRepository {
    pool: SqlitePool,
}

impl AuditRepository {
    /// Creates a new AuditRepository.
    pub fn new(pool: SqlitePool) -> Self {
        AuditRepository { pool }
    }

    /// Appends an audit entry.
    pub async fn record(&self, entry: &AuditEntry) -> DbResult<()> {
        debug!(action = %entry.action, entity = %entry.entity, "Recording audit entry");

        sqlx::query(
            "INSERT INTO audit_logs (
                id, user_id, action, entity, entity_id,
                old_values, new_values, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        )
        .bind(&entry.id)
        .bind(&entry.user_id)
        .bind(&entry.action)
        .bind(&entry.entity)
        .bind(&entry.entity_id)
        .bind(&entry.old_values)
        .bind(&entry.new_values)
        .bind(entry.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Appends an audit entry, swallowing any failure after a warning.
    pub async fn record_best_effort(&self, entry: AuditEntry) {
        if let Err(err) = self.record(&entry).await {
            warn!(
                action = %entry.action,
                entity = %entry.entity,
                error = %err,
                "Audit write failed; continuing"
            );
        }
    }

    /// Reads the trail for one entity, newest first.
    pub async fn for_entity(&self, entity: &str, entity_id: &str) -> DbResult<Vec<AuditEntry>> {
        let entries = sqlx::query_as::<_, AuditEntry>(
            "SELECT id, user_id, action, entity, entity_id,
                    old_values, new_values, created_at
             FROM audit_logs
             WHERE entity = ?1 AND entity_id = ?2
             ORDER BY created_at DESC, id DESC",
        )
        .bind(entity)
        .bind(entity_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }
}

/// Builds an audit entry for a state change.
///
/// `old_values` / `new_values` are stored as opaque JSON text.
pub fn audit_entry(
    user_id: Option<&str>,
    action: &str,
    entity: &str,
    entity_id: Option<&str>,
    old_values: Option<serde_json::Value>,
    new_values: Option<serde_json::Value>,
) -> AuditEntry {
    AuditEntry {
        id: Uuid::new_v4().to_string(),
        user_id: user_id.map(str::to_string),
        action: action.to_string(),
        entity: entity.to_string(),
        entity_id: entity_id.map(str::to_string),
        old_values: old_values.map(|v| v.to_string()),
        new_values: new_values.map(|v| v.to_string()),
        created_at: Utc::now(),
    }
}
