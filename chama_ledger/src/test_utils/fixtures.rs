use chama_common::Cents;

use crate::{
    db_types::{Chama, Member, NewMember, Role},
    ledger_api::RequestContext,
    traits::{ChamaManagement, LedgerDatabase, LedgerQueries, NewContribution},
    SqliteDatabase,
};

/// A chama with one admin, one treasurer and two ordinary members, all with empty balances.
pub struct TestChama {
    pub chama: Chama,
    pub admin: Member,
    pub treasurer: Member,
    pub alice: Member,
    pub bob: Member,
}

pub async fn seed_chama(db: &SqliteDatabase) -> TestChama {
    let chama = db.create_chama("Umoja Savings Group").await.expect("Error creating chama");
    let admin = add_member(db, chama.id, "user-admin", "Wanjiku", Role::Admin).await;
    let treasurer = add_member(db, chama.id, "user-treasurer", "Otieno", Role::Treasurer).await;
    let alice = add_member(db, chama.id, "user-alice", "Alice", Role::Member).await;
    let bob = add_member(db, chama.id, "user-bob", "Bob", Role::Member).await;
    TestChama { chama, admin, treasurer, alice, bob }
}

pub async fn add_member(db: &SqliteDatabase, chama_id: i64, user_id: &str, name: &str, role: Role) -> Member {
    let member = NewMember::new(chama_id, user_id, role).with_display_name(name);
    db.add_member(member).await.expect("Error adding member")
}

/// Credits `amount` to the member's savings as a cash contribution.
pub async fn fund_savings(db: &SqliteDatabase, member: &Member, amount: Cents) -> Member {
    let ctx = RequestContext::for_member(member);
    let contribution =
        NewContribution { amount, payment_method: "cash".into(), reference: None, notes: Some("test funds".into()) };
    db.record_contribution(&ctx, contribution).await.expect("Error funding savings").member
}

/// Credits `amount` to the member's savings and tops it up into their MGR wallet.
pub async fn fund_mgr(db: &SqliteDatabase, member: &Member, amount: Cents) -> Member {
    let member = fund_savings(db, member, amount).await;
    let ctx = RequestContext::for_member(&member);
    db.top_up(&ctx, amount).await.expect("Error funding MGR wallet").member
}

pub async fn fund_central_wallet(db: &SqliteDatabase, chama_id: i64, amount: Cents) -> Cents {
    sqlx::query("UPDATE central_wallets SET balance = balance + $1 WHERE chama_id = $2")
        .bind(amount)
        .bind(chama_id)
        .execute(db.pool())
        .await
        .expect("Error funding central wallet");
    db.fetch_central_wallet(chama_id).await.expect("Error fetching central wallet").expect("No central wallet").balance
}
