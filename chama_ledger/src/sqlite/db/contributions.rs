use chama_common::Cents;
use sqlx::SqliteConnection;

use crate::db_types::Contribution;

pub async fn insert_contribution(
    member_id: i64,
    chama_id: i64,
    amount: Cents,
    payment_method: &str,
    reference: Option<&str>,
    notes: Option<&str>,
    conn: &mut SqliteConnection,
) -> Result<Contribution, sqlx::Error> {
    sqlx::query_as(
        r#"
        INSERT INTO contributions (chama_id, member_id, amount, payment_method, reference, notes)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING *"#,
    )
    .bind(chama_id)
    .bind(member_id)
    .bind(amount)
    .bind(payment_method)
    .bind(reference)
    .bind(notes)
    .fetch_one(conn)
    .await
}

pub async fn fetch_contributions_for_member(
    member_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Vec<Contribution>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM contributions WHERE member_id = $1 ORDER BY id DESC")
        .bind(member_id)
        .fetch_all(conn)
        .await
}
