use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, Response, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use spdlog::{debug, warn};

use crate::payments::checkout::SessionParams;
use crate::payments::{CheckoutSession, PaymentsError, PaymentsGateway, SessionLineItem};

pub const DEFAULT_API_BASE: &str = "https://api.stripe.com/v1/";
const API_VERSION: &str = "2023-10-16";
const LINE_ITEM_PAGE: u32 = 100;

#[derive(Deserialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    #[serde(default)]
    message: Option<String>,
}

#[derive(Deserialize)]
struct List<T> {
    data: Vec<T>,
    #[serde(default)]
    has_more: bool,
}

impl List<SessionLineItem> {
    /// Id to continue after, while the provider reports more pages.
    fn next_cursor(&self) -> Option<String> {
        if !self.has_more {
            return None;
        }
        let cursor = self.data.last().and_then(|item| item.id.clone());
        if cursor.is_none() {
            warn!("Line item page has more results but no item id to continue from");
        }
        cursor
    }
}

/// Checkout sessions through the Stripe REST API.
pub struct StripeGateway {
    client: Client,
    base: Url,
    secret_key: String,
}

impl StripeGateway {
    pub fn new(api_base: &str, secret_key: String, timeout: Duration) -> Result<Self, PaymentsError> {
        if secret_key.is_empty() {
            return Err(PaymentsError::Config("missing secret key".to_string()));
        }
        let mut base = Url::parse(api_base)?;
        if !base.path().ends_with('/') {
            base.set_path(&format!("{}/", base.path()));
        }
        let client = Client::builder()
            .user_agent(concat!("wecut/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()?;
        Ok(StripeGateway { client, base, secret_key })
    }

    fn bearer(&self) -> Result<HeaderValue, PaymentsError> {
        HeaderValue::from_str(&format!("Bearer {}", self.secret_key))
            .map_err(|e| PaymentsError::Config(format!("secret key: {}", e)))
    }

    fn session_url(&self, session_id: &str, starting_after: Option<&str>) -> Result<Url, PaymentsError> {
        if session_id.is_empty() || !session_id.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(PaymentsError::BadRequest(format!("Invalid session id {}", session_id)));
        }
        let mut url = self.base.join(&format!("checkout/sessions/{}/line_items", session_id))?;
        url.query_pairs_mut().append_pair("limit", &LINE_ITEM_PAGE.to_string());
        if let Some(after) = starting_after {
            url.query_pairs_mut().append_pair("starting_after", after);
        }
        Ok(url)
    }

    async fn handle<T: DeserializeOwned>(resp: Response) -> Result<T, PaymentsError> {
        let status = resp.status();
        let bytes = resp.bytes().await?;
        if !status.is_success() {
            let message = serde_json::from_slice::<ErrorBody>(&bytes)
                .ok()
                .and_then(|b| b.error.message)
                .unwrap_or_else(|| String::from_utf8_lossy(&bytes).to_string());
            return Err(PaymentsError::Provider { status: status.as_u16(), message });
        }
        Ok(serde_json::from_slice(&bytes)?)
    }
}

#[async_trait]
impl PaymentsGateway for StripeGateway {
    async fn create_checkout_session(&self, params: &SessionParams) -> Result<CheckoutSession, PaymentsError> {
        let url = self.base.join("checkout/sessions")?;
        let body = serde_urlencoded::to_string(params.to_form())
            .map_err(|e| PaymentsError::BadRequest(e.to_string()))?;
        debug!("POST {}", url);
        let resp = self.client.post(url)
            .header(AUTHORIZATION, self.bearer()?)
            .header("Stripe-Version", API_VERSION)
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(body)
            .send()
            .await?;
        Self::handle(resp).await
    }

    /// Every line of the session, following the list cursor page by page.
    async fn list_line_items(&self, session_id: &str) -> Result<Vec<SessionLineItem>, PaymentsError> {
        let mut items = Vec::new();
        let mut starting_after: Option<String> = None;
        loop {
            let url = self.session_url(session_id, starting_after.as_deref())?;
            debug!("GET {}", url);
            let resp = self.client.get(url)
                .header(AUTHORIZATION, self.bearer()?)
                .header("Stripe-Version", API_VERSION)
                .send()
                .await?;
            let page: List<SessionLineItem> = Self::handle(resp).await?;
            starting_after = page.next_cursor();
            items.extend(page.data);
            if starting_after.is_none() {
                return Ok(items);
            }
        }
    }
}
