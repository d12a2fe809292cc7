use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use crate::traits::{
    GatewayCharge,
    GatewayError,
    GatewaySession,
    PaymentGateway,
    PayoutRequest,
    SessionRequest,
    TransferConfirmation,
};

#[derive(Default)]
struct MockState {
    initialize_error: Option<GatewayError>,
    session_reference: Option<String>,
    transfer_error: Option<GatewayError>,
    charges: HashMap<String, GatewayCharge>,
    sessions: Vec<SessionRequest>,
    transfers: Vec<PayoutRequest>,
}

/// An in-memory payment gateway. Sessions and transfers succeed unless told otherwise, and verification answers
/// with whatever charge was registered for the reference.
#[derive(Clone, Default)]
pub struct MockGateway {
    state: Arc<Mutex<MockState>>,
}

impl MockGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every subsequent `initialize` call fails with `err`, or succeeds again if `None`.
    pub fn fail_initialize_with(&self, err: Option<GatewayError>) {
        self.state.lock().unwrap().initialize_error = err;
    }

    /// Every subsequent session is opened under `reference` instead of the one asked for, or under the requested
    /// one again if `None`.
    pub fn answer_with_reference(&self, reference: Option<String>) {
        self.state.lock().unwrap().session_reference = reference;
    }

    /// Every subsequent `transfer` call fails with `err`, or succeeds again if `None`.
    pub fn fail_transfers_with(&self, err: Option<GatewayError>) {
        self.state.lock().unwrap().transfer_error = err;
    }

    pub fn set_charge(&self, charge: GatewayCharge) {
        self.state.lock().unwrap().charges.insert(charge.reference.clone(), charge);
    }

    pub fn sessions(&self) -> Vec<SessionRequest> {
        self.state.lock().unwrap().sessions.clone()
    }

    pub fn transfers(&self) -> Vec<PayoutRequest> {
        self.state.lock().unwrap().transfers.clone()
    }
}

impl PaymentGateway for MockGateway {
    async fn initialize(&self, request: SessionRequest) -> Result<GatewaySession, GatewayError> {
        let mut state = self.state.lock().unwrap();
        state.sessions.push(request.clone());
        if let Some(e) = &state.initialize_error {
            return Err(e.clone());
        }
        Ok(GatewaySession {
            authorization_url: format!("https://checkout.example.com/{}", request.reference),
            access_code: format!("ac_{}", request.reference),
            reference: state.session_reference.clone().unwrap_or(request.reference),
        })
    }

    async fn verify(&self, reference: &str) -> Result<GatewayCharge, GatewayError> {
        let state = self.state.lock().unwrap();
        state.charges.get(reference).cloned().ok_or_else(|| GatewayError::Rejected("Transaction not found".into()))
    }

    async fn transfer(&self, request: PayoutRequest) -> Result<TransferConfirmation, GatewayError> {
        let mut state = self.state.lock().unwrap();
        state.transfers.push(request.clone());
        if let Some(e) = &state.transfer_error {
            return Err(e.clone());
        }
        Ok(TransferConfirmation { transfer_code: format!("TRF_{}", request.reference), status: "success".into() })
    }
}
