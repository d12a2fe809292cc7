use chama_common::Cents;
use log::trace;
use sqlx::SqliteConnection;

use crate::db_types::{Member, NewMember};

pub async fn insert_member(member: NewMember, conn: &mut SqliteConnection) -> Result<Member, sqlx::Error> {
    sqlx::query_as(
        "INSERT INTO chama_members (chama_id, user_id, display_name, role) VALUES ($1, $2, $3, $4) RETURNING *",
    )
    .bind(member.chama_id)
    .bind(member.user_id)
    .bind(member.display_name)
    .bind(member.role)
    .fetch_one(conn)
    .await
}

pub async fn fetch_member(member_id: i64, conn: &mut SqliteConnection) -> Result<Option<Member>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM chama_members WHERE id = $1").bind(member_id).fetch_optional(conn).await
}

pub async fn fetch_active_member_for_user(
    user_id: &str,
    chama_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Option<Member>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM chama_members WHERE user_id = $1 AND chama_id = $2 AND is_active = 1")
        .bind(user_id)
        .bind(chama_id)
        .fetch_optional(conn)
        .await
}

pub async fn fetch_members_for_chama(chama_id: i64, conn: &mut SqliteConnection) -> Result<Vec<Member>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM chama_members WHERE chama_id = $1 ORDER BY id").bind(chama_id).fetch_all(conn).await
}

/// Moves `amount` from savings to the MGR wallet, provided the member is active and has enough savings.
pub async fn move_savings_to_mgr(
    member_id: i64,
    chama_id: i64,
    amount: Cents,
    conn: &mut SqliteConnection,
) -> Result<Option<Member>, sqlx::Error> {
    trace!("🗃️ Moving {amount} from savings to MGR wallet for member #{member_id}");
    sqlx::query_as(
        r#"
        UPDATE chama_members SET
            savings_balance = savings_balance - $1,
            mgr_balance = mgr_balance + $1,
            updated_at = CURRENT_TIMESTAMP
        WHERE id = $2 AND chama_id = $3 AND is_active = 1 AND savings_balance >= $1
        RETURNING *"#,
    )
    .bind(amount)
    .bind(member_id)
    .bind(chama_id)
    .fetch_optional(conn)
    .await
}

/// Debits the MGR wallet of an active member. When `respect_lock` is set, members with locked withdrawals are not
/// debited either.
pub async fn debit_mgr(
    member_id: i64,
    chama_id: i64,
    amount: Cents,
    respect_lock: bool,
    conn: &mut SqliteConnection,
) -> Result<Option<Member>, sqlx::Error> {
    trace!("🗃️ Debiting {amount} from MGR wallet of member #{member_id}");
    sqlx::query_as(
        r#"
        UPDATE chama_members SET
            mgr_balance = mgr_balance - $1,
            updated_at = CURRENT_TIMESTAMP
        WHERE id = $2 AND chama_id = $3 AND is_active = 1 AND mgr_balance >= $1
          AND (withdrawal_locked = 0 OR $4 = 0)
        RETURNING *"#,
    )
    .bind(amount)
    .bind(member_id)
    .bind(chama_id)
    .bind(respect_lock)
    .fetch_optional(conn)
    .await
}

/// Credits the MGR wallet. Inactive members are only credited when `only_active` is false, e.g. for refunds.
pub async fn credit_mgr(
    member_id: i64,
    chama_id: i64,
    amount: Cents,
    only_active: bool,
    conn: &mut SqliteConnection,
) -> Result<Option<Member>, sqlx::Error> {
    trace!("🗃️ Crediting {amount} to MGR wallet of member #{member_id}");
    sqlx::query_as(
        r#"
        UPDATE chama_members SET
            mgr_balance = mgr_balance + $1,
            updated_at = CURRENT_TIMESTAMP
        WHERE id = $2 AND chama_id = $3 AND (is_active = 1 OR $4 = 0)
        RETURNING *"#,
    )
    .bind(amount)
    .bind(member_id)
    .bind(chama_id)
    .bind(only_active)
    .fetch_optional(conn)
    .await
}

/// Credits savings and the running contribution total of an active member.
pub async fn credit_savings(
    member_id: i64,
    chama_id: i64,
    amount: Cents,
    conn: &mut SqliteConnection,
) -> Result<Option<Member>, sqlx::Error> {
    trace!("🗃️ Crediting {amount} to savings of member #{member_id}");
    sqlx::query_as(
        r#"
        UPDATE chama_members SET
            savings_balance = savings_balance + $1,
            total_contributed = total_contributed + $1,
            updated_at = CURRENT_TIMESTAMP
        WHERE id = $2 AND chama_id = $3 AND is_active = 1
        RETURNING *"#,
    )
    .bind(amount)
    .bind(member_id)
    .bind(chama_id)
    .fetch_optional(conn)
    .await
}

/// Flips the withdrawal lock. Returns `None` if the member does not exist in the chama or the lock already has the
/// requested state.
pub async fn set_withdrawal_lock(
    member_id: i64,
    chama_id: i64,
    locked: bool,
    conn: &mut SqliteConnection,
) -> Result<Option<Member>, sqlx::Error> {
    sqlx::query_as(
        r#"
        UPDATE chama_members SET
            withdrawal_locked = $1,
            updated_at = CURRENT_TIMESTAMP
        WHERE id = $2 AND chama_id = $3 AND withdrawal_locked <> $1
        RETURNING *"#,
    )
    .bind(locked)
    .bind(member_id)
    .bind(chama_id)
    .fetch_optional(conn)
    .await
}

pub async fn deactivate_member(
    member_id: i64,
    chama_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Option<Member>, sqlx::Error> {
    sqlx::query_as(
        r#"
        UPDATE chama_members SET is_active = 0, updated_at = CURRENT_TIMESTAMP
        WHERE id = $1 AND chama_id = $2 AND is_active = 1
        RETURNING *"#,
    )
    .bind(member_id)
    .bind(chama_id)
    .fetch_optional(conn)
    .await
}
