use chama_common::Cents;
use log::trace;
use sqlx::{types::Json, SqliteConnection};

use crate::db_types::{NewPaymentTransaction, PaymentStatus, PaymentTransaction, PlatformFee};

pub async fn insert_payment(
    payment: NewPaymentTransaction,
    conn: &mut SqliteConnection,
) -> Result<PaymentTransaction, sqlx::Error> {
    trace!("🗃️ Inserting pending payment {}", payment.reference);
    sqlx::query_as(
        r#"
        INSERT INTO payment_transactions
            (reference, user_id, email, chama_id, member_id, loan_id, amount, purpose, status, metadata)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, 'pending', $9)
        RETURNING *"#,
    )
    .bind(payment.reference)
    .bind(payment.user_id)
    .bind(payment.email)
    .bind(payment.chama_id)
    .bind(payment.member_id)
    .bind(payment.loan_id)
    .bind(payment.amount)
    .bind(payment.purpose)
    .bind(Json(payment.metadata))
    .fetch_one(conn)
    .await
}

pub async fn fetch_payment_by_reference(
    reference: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<PaymentTransaction>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM payment_transactions WHERE reference = $1").bind(reference).fetch_optional(conn).await
}

pub async fn fetch_payments_for_user(
    user_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Vec<PaymentTransaction>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM payment_transactions WHERE user_id = $1 ORDER BY id DESC")
        .bind(user_id)
        .fetch_all(conn)
        .await
}

/// Stores the checkout session details the gateway issued for a still-pending payment.
pub async fn attach_session(
    reference: &str,
    access_code: &str,
    authorization_url: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<PaymentTransaction>, sqlx::Error> {
    sqlx::query_as(
        r#"
        UPDATE payment_transactions SET access_code = $1, authorization_url = $2, updated_at = CURRENT_TIMESTAMP
        WHERE reference = $3 AND status = 'pending'
        RETURNING *"#,
    )
    .bind(access_code)
    .bind(authorization_url)
    .bind(reference)
    .fetch_optional(conn)
    .await
}

/// Takes the write lock on a pending payment. Returns `None` if the reference is unknown or the payment is already
/// final, in which case nothing was written.
pub async fn claim_pending_payment(
    reference: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<PaymentTransaction>, sqlx::Error> {
    sqlx::query_as(
        r#"
        UPDATE payment_transactions SET updated_at = CURRENT_TIMESTAMP
        WHERE reference = $1 AND status = 'pending'
        RETURNING *"#,
    )
    .bind(reference)
    .fetch_optional(conn)
    .await
}

pub async fn mark_payment_successful(
    payment_id: i64,
    fee: Cents,
    net_amount: Cents,
    gateway_response: Option<&str>,
    paid_at: Option<&str>,
    payload: &str,
    conn: &mut SqliteConnection,
) -> Result<PaymentTransaction, sqlx::Error> {
    sqlx::query_as(
        r#"
        UPDATE payment_transactions SET
            status = $1,
            fee = $2,
            net_amount = $3,
            gateway_response = $4,
            paid_at = COALESCE($5, CURRENT_TIMESTAMP),
            callback_payload = $6,
            updated_at = CURRENT_TIMESTAMP
        WHERE id = $7 AND status = 'pending'
        RETURNING *"#,
    )
    .bind(PaymentStatus::Success)
    .bind(fee)
    .bind(net_amount)
    .bind(gateway_response)
    .bind(paid_at)
    .bind(payload)
    .bind(payment_id)
    .fetch_one(conn)
    .await
}

/// Fails a pending payment. Returns `None` if the reference is unknown or the payment is already final.
pub async fn mark_payment_failed(
    reference: &str,
    gateway_response: &str,
    payload: Option<&str>,
    conn: &mut SqliteConnection,
) -> Result<Option<PaymentTransaction>, sqlx::Error> {
    sqlx::query_as(
        r#"
        UPDATE payment_transactions SET
            status = $1,
            gateway_response = $2,
            callback_payload = COALESCE($3, callback_payload),
            updated_at = CURRENT_TIMESTAMP
        WHERE reference = $4 AND status = 'pending'
        RETURNING *"#,
    )
    .bind(PaymentStatus::Failed)
    .bind(gateway_response)
    .bind(payload)
    .bind(reference)
    .fetch_optional(conn)
    .await
}

pub async fn insert_platform_fee(
    payment: &PaymentTransaction,
    fee: Cents,
    fee_bps: u32,
    conn: &mut SqliteConnection,
) -> Result<PlatformFee, sqlx::Error> {
    sqlx::query_as(
        r#"
        INSERT INTO platform_fees (payment_id, chama_id, gross_amount, fee_amount, fee_bps)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING *"#,
    )
    .bind(payment.id)
    .bind(payment.chama_id)
    .bind(payment.amount)
    .bind(fee)
    .bind(i64::from(fee_bps))
    .fetch_one(conn)
    .await
}

pub async fn total_platform_fees(conn: &mut SqliteConnection) -> Result<Cents, sqlx::Error> {
    let total: i64 =
        sqlx::query_scalar("SELECT COALESCE(SUM(fee_amount), 0) FROM platform_fees").fetch_one(conn).await?;
    Ok(Cents::from(total))
}
