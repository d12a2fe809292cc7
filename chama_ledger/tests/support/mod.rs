#![allow(dead_code)]

use chama_common::Cents;
use chama_ledger::{
    db_types::{Member, NewPaymentTransaction, PaymentPurpose, PaymentTransaction},
    helpers::new_payment_reference,
    traits::{GatewayEvent, GatewayEventKind, PaymentDatabase},
    SqliteDatabase,
};
use serde_json::json;

pub const FEE_BPS: u32 = 250;

/// Stores a pending payment by `member` for the given purpose, as the payment session API would.
pub async fn pending_payment(
    db: &SqliteDatabase,
    member: &Member,
    purpose: PaymentPurpose,
    amount: Cents,
    loan_id: Option<i64>,
) -> PaymentTransaction {
    let payment = NewPaymentTransaction {
        reference: new_payment_reference(),
        user_id: member.user_id.clone(),
        email: format!("{}@example.com", member.user_id),
        chama_id: Some(member.chama_id),
        member_id: Some(member.id),
        loan_id,
        amount,
        purpose,
        metadata: json!({ "source": "test" }),
    };
    db.insert_pending_payment(payment).await.expect("Error inserting payment")
}

pub fn charge_success(reference: &str, amount: Cents) -> GatewayEvent {
    let payload = json!({
        "event": "charge.success",
        "data": { "reference": reference, "amount": amount.value(), "gateway_response": "Approved" }
    });
    GatewayEvent {
        kind: GatewayEventKind::ChargeSuccess,
        reference: reference.to_string(),
        amount,
        gateway_response: Some("Approved".into()),
        paid_at: Some("2024-10-15T09:30:00.000Z".into()),
        payload: payload.to_string(),
    }
}

pub fn charge_failed(reference: &str, amount: Cents, reason: &str) -> GatewayEvent {
    GatewayEvent {
        kind: GatewayEventKind::ChargeFailed,
        reference: reference.to_string(),
        amount,
        gateway_response: Some(reason.to_string()),
        paid_at: None,
        payload: json!({ "event": "charge.failed", "data": { "reference": reference } }).to_string(),
    }
}

pub async fn count_audit_entries(db: &SqliteDatabase, action: &str) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM audit_log WHERE action = $1")
        .bind(action)
        .fetch_one(db.pool())
        .await
        .expect("Error counting audit entries")
}

pub async fn member(db: &SqliteDatabase, member_id: i64) -> Member {
    use chama_ledger::traits::LedgerQueries;
    db.fetch_member(member_id).await.expect("Error fetching member").expect("Member not found")
}
