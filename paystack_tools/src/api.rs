use std::sync::Arc;

use log::*;
use reqwest::{
    header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE},
    Client,
    Method,
};
use serde::{de::DeserializeOwned, Serialize};

use crate::{
    config::PaystackConfig,
    data_objects::{
        InitializeTransaction,
        InitializedTransaction,
        NewTransfer,
        NewTransferRecipient,
        PaystackResponse,
        Transfer,
        TransferRecipient,
        VerifiedTransaction,
    },
    PaystackApiError,
};

#[derive(Clone)]
pub struct PaystackApi {
    config: PaystackConfig,
    client: Arc<Client>,
}

impl PaystackApi {
    pub fn new(config: PaystackConfig) -> Result<Self, PaystackApiError> {
        let mut headers = HeaderMap::with_capacity(2);
        let bearer = format!("Bearer {}", config.secret_key.reveal());
        let mut val =
            HeaderValue::from_str(bearer.as_str()).map_err(|e| PaystackApiError::Initialization(e.to_string()))?;
        val.set_sensitive(true);
        headers.insert(AUTHORIZATION, val);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let client = Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .build()
            .map_err(|e| PaystackApiError::Initialization(e.to_string()))?;
        Ok(Self { config, client: Arc::new(client) })
    }

    pub fn config(&self) -> &PaystackConfig {
        &self.config
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.config.base_url.trim_end_matches('/'))
    }

    /// Sends a request and unwraps Paystack's `{status, message, data}` envelope.
    ///
    /// Non-2xx responses and envelopes with `status: false` are both reported as [`PaystackApiError::Rejected`].
    pub async fn rest_query<T: DeserializeOwned, B: Serialize>(
        &self,
        method: Method,
        path: &str,
        body: Option<B>,
    ) -> Result<T, PaystackApiError> {
        let url = self.url(path);
        trace!("💳️ Sending Paystack request: {method} {url}");
        let mut req = self.client.request(method, url);
        if let Some(body) = body {
            req = req.json(&body);
        }
        let response = req.send().await?;
        let status = response.status();
        let text = response.text().await?;
        let envelope = serde_json::from_str::<PaystackResponse<T>>(&text);
        match (status.is_success(), envelope) {
            (true, Ok(PaystackResponse { status: true, data: Some(data), .. })) => {
                trace!("💳️ Paystack request successful. {status}");
                Ok(data)
            },
            (true, Ok(PaystackResponse { status: true, data: None, .. })) => Err(PaystackApiError::EmptyResponse),
            (_, Ok(PaystackResponse { message, .. })) => {
                Err(PaystackApiError::Rejected { status: status.as_u16(), message })
            },
            (true, Err(e)) => Err(PaystackApiError::JsonError(e.to_string())),
            (false, Err(_)) => Err(PaystackApiError::Rejected { status: status.as_u16(), message: text }),
        }
    }

    pub async fn initialize_transaction(
        &self,
        request: InitializeTransaction,
    ) -> Result<InitializedTransaction, PaystackApiError> {
        let mut request = request;
        if request.callback_url.is_none() {
            request.callback_url = self.config.callback_url.clone();
        }
        debug!("💳️ Initializing Paystack transaction {} for {} cents", request.reference, request.amount);
        let result = self
            .rest_query::<InitializedTransaction, _>(Method::POST, "/transaction/initialize", Some(request))
            .await?;
        info!("💳️ Paystack transaction {} initialized", result.reference);
        Ok(result)
    }

    pub async fn verify_transaction(&self, reference: &str) -> Result<VerifiedTransaction, PaystackApiError> {
        let path = format!("/transaction/verify/{reference}");
        debug!("💳️ Verifying Paystack transaction {reference}");
        let result = self.rest_query::<VerifiedTransaction, ()>(Method::GET, &path, None).await?;
        info!("💳️ Paystack transaction {reference} has status '{}'", result.status);
        Ok(result)
    }

    pub async fn create_transfer_recipient(
        &self,
        recipient: NewTransferRecipient,
    ) -> Result<TransferRecipient, PaystackApiError> {
        debug!("💳️ Creating {} transfer recipient for {}", recipient.recipient_type, recipient.name);
        let result =
            self.rest_query::<TransferRecipient, _>(Method::POST, "/transferrecipient", Some(recipient)).await?;
        debug!("💳️ Transfer recipient {} created", result.recipient_code);
        Ok(result)
    }

    pub async fn initiate_transfer(&self, transfer: NewTransfer) -> Result<Transfer, PaystackApiError> {
        debug!("💳️ Initiating transfer {} of {} cents to {}", transfer.reference, transfer.amount, transfer.recipient);
        let result = self.rest_query::<Transfer, _>(Method::POST, "/transfer", Some(transfer)).await?;
        info!("💳️ Transfer {} has status '{}'", result.transfer_code, result.status);
        Ok(result)
    }
}
