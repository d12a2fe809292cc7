use log::trace;
use sqlx::{types::Json, SqliteConnection};

use crate::db_types::{AuditEntry, NewAuditEntry};

pub async fn insert_audit_entry(entry: NewAuditEntry, conn: &mut SqliteConnection) -> Result<AuditEntry, sqlx::Error> {
    trace!("🗃️ Audit: {} of {} in chama {:?}", entry.action, entry.amount, entry.chama_id);
    sqlx::query_as(
        r#"
        INSERT INTO audit_log (chama_id, actor_member_id, action, amount, target_member_id, details)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING *"#,
    )
    .bind(entry.chama_id)
    .bind(entry.actor_member_id)
    .bind(entry.action)
    .bind(entry.amount)
    .bind(entry.target_member_id)
    .bind(Json(entry.details))
    .fetch_one(conn)
    .await
}

/// Most recent entries first.
pub async fn fetch_audit_log(
    chama_id: i64,
    limit: i64,
    conn: &mut SqliteConnection,
) -> Result<Vec<AuditEntry>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM audit_log WHERE chama_id = $1 ORDER BY id DESC LIMIT $2")
        .bind(chama_id)
        .bind(limit)
        .fetch_all(conn)
        .await
}
