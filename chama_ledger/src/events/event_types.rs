use chama_common::Cents;
use serde::{Deserialize, Serialize};

use crate::db_types::{Notification, PaymentTransaction};

/// A notification row was written for a user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationEvent {
    pub notification: Notification,
}

impl NotificationEvent {
    pub fn new(notification: Notification) -> Self {
        Self { notification }
    }
}

/// A gateway charge settled and its net amount was credited to the ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentSettledEvent {
    pub payment: PaymentTransaction,
    pub fee: Cents,
    pub net: Cents,
}

impl PaymentSettledEvent {
    pub fn new(payment: PaymentTransaction, fee: Cents, net: Cents) -> Self {
        Self { payment, fee, net }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum EventType {
    Notification(NotificationEvent),
    PaymentSettled(PaymentSettledEvent),
}
