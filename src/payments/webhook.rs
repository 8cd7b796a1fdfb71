use std::sync::Arc;

use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use spdlog::{error, info, warn};
use thiserror::Error;

use crate::payments::{PaymentsError, PaymentsGateway};
use crate::repository::{NewCustomer, NewOrder, NewOrderItem, OrderStore, RepositoryError};

type HmacSha256 = Hmac<Sha256>;

pub const SIGNATURE_HEADER: &str = "stripe-signature";
pub const DEFAULT_TOLERANCE_SECS: i64 = 300;
const CHECKOUT_COMPLETED: &str = "checkout.session.completed";

#[derive(Debug, Error)]
pub enum WebhookError {
    #[error("missing signature header")]
    MissingSignature,
    #[error("unable to read signature header")]
    MalformedHeader,
    #[error("no signature matches the payload")]
    SignatureMismatch,
    #[error("timestamp outside the tolerance zone")]
    Expired,
    #[error("invalid event payload: {0}")]
    Payload(#[from] serde_json::Error),
    #[error("webhook secret is not configured")]
    NoSecret,
}

/// Errors while writing a completed checkout into the order tables.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("session {0} has neither customer nor email")]
    NoCustomer(String),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Payments(#[from] PaymentsError),
}

struct SignatureHeader {
    timestamp: i64,
    signatures: Vec<Vec<u8>>,
}

fn parse_header(header: &str) -> Result<SignatureHeader, WebhookError> {
    let mut timestamp = None;
    let mut signatures = vec![];
    for part in header.split(',') {
        let Some((key, value)) = part.trim().split_once('=') else {
            continue;
        };
        match key {
            "t" => timestamp = value.parse::<i64>().ok(),
            "v1" => {
                if let Ok(sig) = hex::decode(value) {
                    signatures.push(sig);
                }
            }
            _ => {}
        }
    }
    match timestamp {
        Some(timestamp) => Ok(SignatureHeader { timestamp, signatures }),
        None => Err(WebhookError::MalformedHeader),
    }
}

/// Checks a `t=...,v1=...` signature: HMAC-SHA256 of `"{t}.{payload}"`
/// keyed by the endpoint secret, signed no more than `tolerance` seconds
/// before `now`.
pub fn verify_signature(payload: &[u8], header: &str, secret: &str, tolerance: i64, now: i64) -> Result<(), WebhookError> {
    if secret.is_empty() {
        return Err(WebhookError::NoSecret);
    }
    let header = parse_header(header)?;
    if header.signatures.is_empty() {
        return Err(WebhookError::SignatureMismatch);
    }

    let matched = header.signatures.iter().any(|sig| {
        let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
            return false;
        };
        mac.update(header.timestamp.to_string().as_bytes());
        mac.update(b".");
        mac.update(payload);
        mac.verify_slice(sig).is_ok()
    });
    if !matched {
        return Err(WebhookError::SignatureMismatch);
    }
    if header.timestamp < now - tolerance {
        return Err(WebhookError::Expired);
    }
    Ok(())
}

#[derive(Debug, Deserialize)]
pub struct Event {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: EventData,
}

#[derive(Debug, Deserialize)]
pub struct EventData {
    pub object: serde_json::Value,
}

#[derive(Debug, Default, Deserialize)]
pub struct CustomerDetails {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CompletedSession {
    pub id: String,
    /// Customer id, or the expanded customer object.
    #[serde(default)]
    pub customer: Option<serde_json::Value>,
    #[serde(default)]
    pub customer_details: Option<CustomerDetails>,
    #[serde(default)]
    pub amount_total: Option<i64>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub payment_status: Option<String>,
    #[serde(default)]
    pub payment_intent: Option<serde_json::Value>,
}

impl CompletedSession {
    fn email(&self) -> Option<&str> {
        self.customer_details.as_ref().and_then(|d| d.email.as_deref())
    }

    /// Guests have no customer object, their email stands in.
    pub fn customer_key(&self) -> Option<String> {
        match &self.customer {
            Some(serde_json::Value::String(id)) => Some(id.clone()),
            _ => self.email().map(|e| e.to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WebhookOutcome {
    Ingested,
    /// Verified, but ingestion failed and was logged.
    Failed,
    Ignored,
}

pub struct WebhookHandler {
    pub gateway: Arc<dyn PaymentsGateway>,
    pub orders: Arc<dyn OrderStore>,
    pub secret: String,
    pub tolerance: i64,
}

impl WebhookHandler {
    /// Anything past signature verification is acknowledged; ingestion
    /// failures are only logged.
    pub async fn handle(&self, payload: &[u8], signature: Option<&str>, now: i64) -> Result<WebhookOutcome, WebhookError> {
        let signature = signature.ok_or(WebhookError::MissingSignature)?;
        verify_signature(payload, signature, &self.secret, self.tolerance, now)?;
        let event: Event = serde_json::from_slice(payload)?;

        if event.event_type != CHECKOUT_COMPLETED {
            info!("Unhandled event type {} ({})", event.event_type, event.id);
            return Ok(WebhookOutcome::Ignored);
        }

        let session: CompletedSession = serde_json::from_value(event.data.object)?;
        match ingest_checkout_session(self.gateway.as_ref(), self.orders.as_ref(), &session).await {
            Ok(items) => {
                info!("Recorded order for session {} with {} items", session.id, items);
                Ok(WebhookOutcome::Ingested)
            }
            Err(e) => {
                error!("Recording order for session {}: {}", session.id, e);
                Ok(WebhookOutcome::Failed)
            }
        }
    }
}

/// Writes customer, order and order items for a completed session.
/// Returns the number of items written.
pub async fn ingest_checkout_session(
    gateway: &dyn PaymentsGateway,
    orders: &dyn OrderStore,
    session: &CompletedSession,
) -> Result<usize, IngestError> {
    let stripe_customer_id = session.customer_key()
        .ok_or_else(|| IngestError::NoCustomer(session.id.clone()))?;

    let details = session.customer_details.as_ref();
    let customer_id = orders.upsert_customer(&NewCustomer {
        stripe_customer_id,
        email: details.and_then(|d| d.email.clone()),
        name: details.and_then(|d| d.name.clone()),
    }).await?;

    let payment_intent_id = match &session.payment_intent {
        Some(serde_json::Value::String(id)) => Some(id.clone()),
        _ => None,
    };
    let order_id = orders.insert_order(&NewOrder {
        stripe_checkout_session_id: session.id.clone(),
        customer_id,
        amount_total: session.amount_total,
        currency: session.currency.clone(),
        status: session.payment_status.clone(),
        payment_intent_id,
    }).await?;

    let line_items = gateway.list_line_items(&session.id).await?;
    if line_items.is_empty() {
        warn!("Session {} has no line items", session.id);
    }
    let items: Vec<NewOrderItem> = line_items.into_iter()
        .map(|li| NewOrderItem {
            order_id: order_id.clone(),
            stripe_product_id: li.price.as_ref().and_then(|p| p.product_id()),
            stripe_price_id: li.price.as_ref().map(|p| p.id.clone()),
            quantity: li.quantity,
            amount_total: li.amount_total,
        })
        .collect();
    orders.insert_order_items(&items).await?;
    Ok(items.len())
}
