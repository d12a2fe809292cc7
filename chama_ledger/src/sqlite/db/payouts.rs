use chama_common::Cents;
use sqlx::{types::Json, SqliteConnection};

use crate::db_types::{Member, Payout, PayoutDetails, PayoutMethod, PayoutStatus};

pub async fn insert_payout(
    reference: &str,
    member: &Member,
    amount: Cents,
    method: PayoutMethod,
    details: &PayoutDetails,
    status: PayoutStatus,
    conn: &mut SqliteConnection,
) -> Result<Payout, sqlx::Error> {
    sqlx::query_as(
        r#"
        INSERT INTO payouts (reference, member_id, chama_id, user_id, amount, method, details, status)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING *"#,
    )
    .bind(reference)
    .bind(member.id)
    .bind(member.chama_id)
    .bind(&member.user_id)
    .bind(amount)
    .bind(method)
    .bind(Json(details))
    .bind(status)
    .fetch_one(conn)
    .await
}

pub async fn fetch_payout_by_reference(
    reference: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Payout>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM payouts WHERE reference = $1").bind(reference).fetch_optional(conn).await
}

/// Pending payouts that still have to be sent through the gateway, oldest first.
pub async fn fetch_pending_external_payouts(
    limit: i64,
    conn: &mut SqliteConnection,
) -> Result<Vec<Payout>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM payouts WHERE status = 'pending' AND method <> 'internal' ORDER BY id LIMIT $1")
        .bind(limit)
        .fetch_all(conn)
        .await
}

pub async fn fetch_payouts_for_member(member_id: i64, conn: &mut SqliteConnection) -> Result<Vec<Payout>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM payouts WHERE member_id = $1 ORDER BY id DESC").bind(member_id).fetch_all(conn).await
}

pub async fn complete_payout(
    payout_id: i64,
    transfer_code: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Payout>, sqlx::Error> {
    sqlx::query_as(
        r#"
        UPDATE payouts SET status = 'completed', transfer_code = $1, updated_at = CURRENT_TIMESTAMP
        WHERE id = $2 AND status = 'pending'
        RETURNING *"#,
    )
    .bind(transfer_code)
    .bind(payout_id)
    .fetch_optional(conn)
    .await
}

pub async fn fail_payout(
    payout_id: i64,
    reason: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Payout>, sqlx::Error> {
    sqlx::query_as(
        r#"
        UPDATE payouts SET status = 'failed', failure_reason = $1, updated_at = CURRENT_TIMESTAMP
        WHERE id = $2 AND status = 'pending'
        RETURNING *"#,
    )
    .bind(reason)
    .bind(payout_id)
    .fetch_optional(conn)
    .await
}

pub async fn fetch_payout(payout_id: i64, conn: &mut SqliteConnection) -> Result<Option<Payout>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM payouts WHERE id = $1").bind(payout_id).fetch_optional(conn).await
}
