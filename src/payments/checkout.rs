use serde::{Deserialize, Serialize};
use spdlog::info;

use crate::journal::locale::{Locale, DEFAULT_LOCALE};
use crate::payments::{PaymentsError, PaymentsGateway};

fn one() -> u32 {
    1
}

fn default_locale() -> String {
    DEFAULT_LOCALE.code().to_string()
}

/// Body of `POST /api/checkout_sessions`. Either a cart's `items` or a
/// single `priceId`.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Vec<CheckoutItem>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_id: Option<String>,
    #[serde(default = "one")]
    pub quantity: u32,
    #[serde(default = "default_locale")]
    pub locale: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct CheckoutItem {
    #[serde(rename = "price", default)]
    pub price_id: Option<String>,
    #[serde(default = "one")]
    pub quantity: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Unit price in major currency units.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutResponse {
    pub session_id: String,
    pub url: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LineItem {
    /// A price already registered with the provider.
    Price { price: String, quantity: u32 },
    /// Priced from the cart itself.
    Inline {
        currency: String,
        name: String,
        images: Vec<String>,
        /// Minor units.
        unit_amount: i64,
        quantity: u32,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct SessionParams {
    pub line_items: Vec<LineItem>,
    pub success_url: String,
    pub cancel_url: String,
}

impl SessionParams {
    pub fn new(line_items: Vec<LineItem>, origin: &str, locale: Locale) -> Self {
        let origin = origin.trim_end_matches('/');
        SessionParams {
            line_items,
            success_url: format!("{}/{}/shop?success=true&session_id={{CHECKOUT_SESSION_ID}}", origin, locale),
            cancel_url: format!("{}/{}/shop?canceled=true", origin, locale),
        }
    }

    /// Form fields in the provider's bracketed key style.
    pub fn to_form(&self) -> Vec<(String, String)> {
        let mut form = vec![
            ("mode".to_string(), "payment".to_string()),
            ("ui_mode".to_string(), "hosted".to_string()),
            ("payment_method_types[0]".to_string(), "card".to_string()),
            ("success_url".to_string(), self.success_url.clone()),
            ("cancel_url".to_string(), self.cancel_url.clone()),
        ];
        for (i, item) in self.line_items.iter().enumerate() {
            let key = |k: &str| format!("line_items[{}]{}", i, k);
            match item {
                LineItem::Price { price, quantity } => {
                    form.push((key("[price]"), price.clone()));
                    form.push((key("[quantity]"), quantity.to_string()));
                }
                LineItem::Inline { currency, name, images, unit_amount, quantity } => {
                    form.push((key("[price_data][currency]"), currency.clone()));
                    form.push((key("[price_data][product_data][name]"), name.clone()));
                    for (j, image) in images.iter().enumerate() {
                        form.push((key(&format!("[price_data][product_data][images][{}]", j)), image.clone()));
                    }
                    form.push((key("[price_data][unit_amount]"), unit_amount.to_string()));
                    form.push((key("[quantity]"), quantity.to_string()));
                }
            }
        }
        form
    }
}

/// Cart lines become provider line items. A line with a name and amount is
/// priced inline, otherwise its price id is used.
pub fn build_line_items(request: &CheckoutRequest, default_currency: &str, origin: &str) -> Result<Vec<LineItem>, PaymentsError> {
    match (&request.items, &request.price_id) {
        (Some(items), _) if !items.is_empty() => items.iter().map(|item| to_line_item(item, default_currency, origin)).collect(),
        (_, Some(price)) if !price.is_empty() => Ok(vec![LineItem::Price {
            price: price.clone(),
            quantity: request.quantity.max(1),
        }]),
        _ => Err(PaymentsError::BadRequest("Missing items or priceId".to_string())),
    }
}

fn to_line_item(item: &CheckoutItem, default_currency: &str, origin: &str) -> Result<LineItem, PaymentsError> {
    let quantity = item.quantity.max(1);
    if let (Some(name), Some(amount)) = (&item.name, item.amount) {
        if !amount.is_finite() || amount < 0.0 {
            return Err(PaymentsError::BadRequest(format!("Invalid amount for {}", name)));
        }
        return Ok(LineItem::Inline {
            currency: item.currency.clone().unwrap_or_else(|| default_currency.to_string()),
            name: name.clone(),
            images: item.image.iter().map(|img| absolute_image(img, origin)).collect(),
            unit_amount: (amount * 100.0).round() as i64,
            quantity,
        });
    }
    match &item.price_id {
        Some(price) if !price.is_empty() => Ok(LineItem::Price { price: price.clone(), quantity }),
        _ => Err(PaymentsError::BadRequest("Missing price for item".to_string())),
    }
}

fn absolute_image(image: &str, origin: &str) -> String {
    if image.starts_with("http://") || image.starts_with("https://") {
        image.to_string()
    } else {
        format!("{}/{}", origin.trim_end_matches('/'), image.trim_start_matches('/'))
    }
}

/// Opens a hosted checkout session for the request.
pub async fn create_checkout(
    gateway: &dyn PaymentsGateway,
    request: &CheckoutRequest,
    origin: &str,
    default_currency: &str,
) -> Result<CheckoutResponse, PaymentsError> {
    let line_items = build_line_items(request, default_currency, origin)?;
    let locale = Locale::from_code(&request.locale).unwrap_or(DEFAULT_LOCALE);
    let params = SessionParams::new(line_items, origin, locale);

    let session = gateway.create_checkout_session(&params).await?;
    info!("Created checkout session {} with {} line items", session.id, params.line_items.len());
    Ok(CheckoutResponse {
        session_id: session.id,
        url: session.url,
    })
}

#[cfg(test)]
pub mod test_gateway {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use crate::payments::{CheckoutSession, PaymentsError, PaymentsGateway, SessionLineItem};

    use super::SessionParams;

    /// Records sessions and serves canned line items.
    #[derive(Default)]
    pub struct FakeGateway {
        pub sessions: Mutex<Vec<SessionParams>>,
        pub line_items: Vec<SessionLineItem>,
        pub fail: bool,
    }

    #[async_trait]
    impl PaymentsGateway for FakeGateway {
        async fn create_checkout_session(&self, params: &SessionParams) -> Result<CheckoutSession, PaymentsError> {
            if self.fail {
                return Err(PaymentsError::Provider { status: 402, message: "No such price".to_string() });
            }
            self.sessions.lock().unwrap().push(params.clone());
            Ok(CheckoutSession {
                id: "cs_test_1".to_string(),
                url: Some("https://checkout.stripe.com/c/pay/cs_test_1".to_string()),
            })
        }

        async fn list_line_items(&self, _session_id: &str) -> Result<Vec<SessionLineItem>, PaymentsError> {
            if self.fail {
                return Err(PaymentsError::Provider { status: 404, message: "No such session".to_string() });
            }
            Ok(self.line_items.clone())
        }
    }
}
