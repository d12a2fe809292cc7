use chama_common::Cents;
use sqlx::SqliteConnection;

use crate::db_types::{Loan, LoanDisbursement, NewLoan};

pub async fn insert_loan(loan: NewLoan, conn: &mut SqliteConnection) -> Result<Loan, sqlx::Error> {
    sqlx::query_as("INSERT INTO loans (chama_id, borrower_member_id, amount) VALUES ($1, $2, $3) RETURNING *")
        .bind(loan.chama_id)
        .bind(loan.borrower_member_id)
        .bind(loan.amount)
        .fetch_one(conn)
        .await
}

pub async fn fetch_loan(loan_id: i64, conn: &mut SqliteConnection) -> Result<Option<Loan>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM loans WHERE id = $1").bind(loan_id).fetch_optional(conn).await
}

/// pending → approved
pub async fn approve_loan(
    loan_id: i64,
    chama_id: i64,
    approved_by: i64,
    conn: &mut SqliteConnection,
) -> Result<Option<Loan>, sqlx::Error> {
    sqlx::query_as(
        r#"
        UPDATE loans SET
            status = 'approved',
            disbursement_status = 1,
            approved_by = $1,
            approved_at = CURRENT_TIMESTAMP,
            updated_at = CURRENT_TIMESTAMP
        WHERE id = $2 AND chama_id = $3 AND status = 'pending'
        RETURNING *"#,
    )
    .bind(approved_by)
    .bind(loan_id)
    .bind(chama_id)
    .fetch_optional(conn)
    .await
}

/// approved → active, stamping the time the funds went out.
pub async fn activate_loan(
    loan_id: i64,
    chama_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Option<Loan>, sqlx::Error> {
    sqlx::query_as(
        r#"
        UPDATE loans SET status = 'active', funds_sent_at = CURRENT_TIMESTAMP, updated_at = CURRENT_TIMESTAMP
        WHERE id = $1 AND chama_id = $2 AND status = 'approved'
        RETURNING *"#,
    )
    .bind(loan_id)
    .bind(chama_id)
    .fetch_optional(conn)
    .await
}

/// Adds a repayment to an active loan and completes the loan once the full amount has been repaid.
pub async fn apply_repayment(
    loan_id: i64,
    chama_id: i64,
    amount: Cents,
    conn: &mut SqliteConnection,
) -> Result<Option<Loan>, sqlx::Error> {
    sqlx::query_as(
        r#"
        UPDATE loans SET
            amount_repaid = amount_repaid + $1,
            status = CASE WHEN amount_repaid + $1 >= amount THEN 'completed' ELSE status END,
            updated_at = CURRENT_TIMESTAMP
        WHERE id = $2 AND chama_id = $3 AND status = 'active'
        RETURNING *"#,
    )
    .bind(amount)
    .bind(loan_id)
    .bind(chama_id)
    .fetch_optional(conn)
    .await
}

pub async fn insert_disbursement(
    loan: &Loan,
    amount: Cents,
    destination: &str,
    disbursed_by: i64,
    conn: &mut SqliteConnection,
) -> Result<LoanDisbursement, sqlx::Error> {
    sqlx::query_as(
        r#"
        INSERT INTO loan_disbursements (loan_id, chama_id, amount, destination, disbursed_by, status)
        VALUES ($1, $2, $3, $4, $5, 'sent')
        RETURNING *"#,
    )
    .bind(loan.id)
    .bind(loan.chama_id)
    .bind(amount)
    .bind(destination)
    .bind(disbursed_by)
    .fetch_one(conn)
    .await
}
