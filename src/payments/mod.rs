use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

use crate::payments::checkout::SessionParams;

pub mod checkout;
pub mod stripe;
pub mod webhook;

#[derive(Debug, Error)]
pub enum PaymentsError {
    #[error("{0}")]
    BadRequest(String),
    #[error("payments provider answered {status}: {message}")]
    Provider { status: u16, message: String },
    #[error("request to payments provider failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("invalid provider response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("invalid provider address: {0}")]
    Url(#[from] url::ParseError),
    #[error("payments are not configured: {0}")]
    Config(String),
}

impl PaymentsError {
    /// Status for the JSON error answer.
    pub fn status_code(&self) -> u16 {
        match self {
            PaymentsError::BadRequest(_) => 400,
            _ => 500,
        }
    }
}

/// A hosted checkout session the shopper is sent to.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CheckoutSession {
    pub id: String,
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LineItemPrice {
    pub id: String,
    /// Product id, or the whole product when expanded.
    #[serde(default)]
    pub product: Option<serde_json::Value>,
}

impl LineItemPrice {
    pub fn product_id(&self) -> Option<String> {
        match self.product.as_ref()? {
            serde_json::Value::String(id) => Some(id.clone()),
            serde_json::Value::Object(obj) => obj.get("id").and_then(|v| v.as_str()).map(|s| s.to_string()),
            _ => None,
        }
    }
}

/// A purchased line of a completed session.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SessionLineItem {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub quantity: Option<i64>,
    #[serde(default)]
    pub amount_total: Option<i64>,
    #[serde(default)]
    pub price: Option<LineItemPrice>,
}

#[async_trait]
pub trait PaymentsGateway: Send + Sync {
    async fn create_checkout_session(&self, params: &SessionParams) -> Result<CheckoutSession, PaymentsError>;

    async fn list_line_items(&self, session_id: &str) -> Result<Vec<SessionLineItem>, PaymentsError>;
}
