use std::{
    future::Future,
    pin::Pin,
    sync::{
        atomic::{AtomicI32, Ordering},
        Arc,
        Mutex,
    },
    time::Duration,
};

use chama_common::Cents;
use chama_ledger::{
    db_types::{PaymentPurpose, PayoutDetails},
    events::{EventHandlers, EventHooks},
    test_utils::{fund_mgr, new_test_database, seed_chama},
    CallbackApi,
    LockApi,
    RequestContext,
    TransferApi,
};
use log::*;

mod support;
use support::{charge_success, pending_payment, FEE_BPS};

#[derive(Default, Clone)]
struct HookCalled {
    called: Arc<AtomicI32>,
    seen: Arc<Mutex<Vec<String>>>,
}

impl HookCalled {
    pub fn called(&self, what: String) {
        let _ = self.called.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().unwrap().push(what);
    }

    pub fn count(&self) -> i32 {
        self.called.load(Ordering::SeqCst)
    }

    pub fn seen(&self) -> Vec<String> {
        self.seen.lock().unwrap().clone()
    }
}

async fn wait_for(hook: &HookCalled, count: i32) {
    for _ in 0..50 {
        if hook.count() >= count {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}

#[tokio::test]
async fn on_notification() {
    let db = new_test_database().await;
    let chama = seed_chama(&db).await;
    let alice = fund_mgr(&db, &chama.alice, Cents::from_shillings(100)).await;

    let hook = HookCalled::default();
    let hook_copy = hook.clone();
    let mut hooks = EventHooks::default();
    hooks.on_notification(move |ev| {
        info!("🪝️ {ev:?}");
        let hook = hook_copy.clone();
        Box::pin(async move {
            hook.called(ev.notification.notification_type);
        }) as Pin<Box<dyn Future<Output = ()> + Send>>
    });
    let handlers = EventHandlers::new(16, hooks);
    let producers = handlers.producers();
    handlers.start_handlers().await;

    let transfers = TransferApi::new(db.clone(), producers.clone());
    let locks = LockApi::new(db.clone(), producers);
    let ctx = RequestContext::for_member(&alice);
    transfers.send(&ctx, chama.bob.id, Cents::from_shillings(10), None, &PayoutDetails::default()).await.unwrap();
    // Top-ups and locks notify nobody
    transfers.top_up(&ctx, Cents::ZERO).await.unwrap_err();
    let admin = RequestContext::for_member(&chama.admin);
    locks.lock(&admin, alice.id).await.unwrap();
    locks.unlock(&admin, alice.id).await.unwrap();

    wait_for(&hook, 2).await;
    assert_eq!(hook.count(), 2);
    let mut seen = hook.seen();
    seen.sort();
    assert_eq!(seen, vec!["funds_received".to_string(), "withdrawal_unlocked".to_string()]);
}

#[tokio::test]
async fn on_payment_settled() {
    let db = new_test_database().await;
    let chama = seed_chama(&db).await;
    let payment = pending_payment(&db, &chama.alice, PaymentPurpose::Contribution, Cents::from(10_000), None).await;

    let hook = HookCalled::default();
    let hook_copy = hook.clone();
    let mut hooks = EventHooks::default();
    hooks.on_payment_settled(move |ev| {
        let hook = hook_copy.clone();
        Box::pin(async move {
            assert_eq!(ev.fee + ev.net, ev.payment.amount);
            hook.called(ev.payment.reference);
        }) as Pin<Box<dyn Future<Output = ()> + Send>>
    });
    let handlers = EventHandlers::new(16, hooks);
    let api = CallbackApi::new(db.clone(), handlers.producers(), FEE_BPS);
    handlers.start_handlers().await;

    api.process_event(charge_success(&payment.reference, payment.amount)).await;
    api.process_event(charge_success(&payment.reference, payment.amount)).await;

    wait_for(&hook, 1).await;
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(hook.count(), 1);
    assert_eq!(hook.seen(), vec![payment.reference]);
}
