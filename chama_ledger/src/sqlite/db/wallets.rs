use chama_common::Cents;
use log::trace;
use sqlx::SqliteConnection;

use crate::db_types::{CentralWallet, UserWallet};

pub async fn insert_central_wallet(chama_id: i64, conn: &mut SqliteConnection) -> Result<CentralWallet, sqlx::Error> {
    sqlx::query_as("INSERT INTO central_wallets (chama_id) VALUES ($1) RETURNING *")
        .bind(chama_id)
        .fetch_one(conn)
        .await
}

pub async fn fetch_central_wallet(
    chama_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Option<CentralWallet>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM central_wallets WHERE chama_id = $1").bind(chama_id).fetch_optional(conn).await
}

/// Guarded debit of the chama's central wallet.
pub async fn debit_central_wallet(
    chama_id: i64,
    amount: Cents,
    conn: &mut SqliteConnection,
) -> Result<Option<CentralWallet>, sqlx::Error> {
    trace!("🗃️ Debiting {amount} from central wallet of chama #{chama_id}");
    sqlx::query_as(
        r#"
        UPDATE central_wallets SET balance = balance - $1, updated_at = CURRENT_TIMESTAMP
        WHERE chama_id = $2 AND balance >= $1
        RETURNING *"#,
    )
    .bind(amount)
    .bind(chama_id)
    .fetch_optional(conn)
    .await
}

pub async fn credit_central_wallet(
    chama_id: i64,
    amount: Cents,
    conn: &mut SqliteConnection,
) -> Result<Option<CentralWallet>, sqlx::Error> {
    trace!("🗃️ Crediting {amount} to central wallet of chama #{chama_id}");
    sqlx::query_as(
        r#"
        UPDATE central_wallets SET balance = balance + $1, updated_at = CURRENT_TIMESTAMP
        WHERE chama_id = $2
        RETURNING *"#,
    )
    .bind(amount)
    .bind(chama_id)
    .fetch_optional(conn)
    .await
}

pub async fn fetch_user_wallet(user_id: &str, conn: &mut SqliteConnection) -> Result<Option<UserWallet>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM user_wallets WHERE user_id = $1").bind(user_id).fetch_optional(conn).await
}

/// Credits the user's personal wallet, creating it on first use.
pub async fn credit_user_wallet(
    user_id: &str,
    amount: Cents,
    conn: &mut SqliteConnection,
) -> Result<UserWallet, sqlx::Error> {
    trace!("🗃️ Crediting {amount} to the personal wallet of user {user_id}");
    sqlx::query_as(
        r#"
        INSERT INTO user_wallets (user_id, balance) VALUES ($1, $2)
        ON CONFLICT (user_id) DO UPDATE SET
            balance = balance + excluded.balance,
            updated_at = CURRENT_TIMESTAMP
        RETURNING *"#,
    )
    .bind(user_id)
    .bind(amount)
    .fetch_one(conn)
    .await
}
