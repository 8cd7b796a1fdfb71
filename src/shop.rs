use serde::{Deserialize, Serialize};

use crate::cart::CartProduct;
use crate::journal::locale::{localized, Locale, LocalePolicy};

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Product {
    pub id: String,
    pub slug: String,
    pub name_en: String,
    #[serde(default)]
    pub name_zh: Option<String>,
    #[serde(default)]
    pub description_en: Option<String>,
    #[serde(default)]
    pub description_zh: Option<String>,
    #[serde(default)]
    pub stripe_price_id: Option<String>,
    /// Display price in major currency units.
    #[serde(default)]
    pub price: f64,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default)]
    pub inventory_count: Option<i64>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub volume: Option<String>,
    #[serde(default)]
    pub formula_id: Option<String>,
}

fn default_currency() -> String {
    "aud".to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Availability {
    Available,
    SoldOut,
    /// No price in the payments provider, cannot be bought.
    Unavailable,
}

impl Product {
    pub fn name(&self, locale: Locale) -> &str {
        localized(locale, LocalePolicy::Fallback, Some(self.name_en.as_str()), self.name_zh.as_deref())
            .unwrap_or(self.name_en.as_str())
    }

    pub fn description(&self, locale: Locale) -> Option<&str> {
        localized(locale, LocalePolicy::Fallback, self.description_en.as_deref(), self.description_zh.as_deref())
    }

    pub fn availability(&self) -> Availability {
        match (&self.stripe_price_id, self.inventory_count) {
            (None, _) => Availability::Unavailable,
            (Some(id), _) if id.is_empty() => Availability::Unavailable,
            (Some(_), Some(0)) => Availability::SoldOut,
            _ => Availability::Available,
        }
    }

    /// What goes into the cart when a shopper adds this product. The name
    /// is stored already localized.
    pub fn to_cart_product(&self, locale: Locale) -> Option<CartProduct> {
        if self.availability() != Availability::Available {
            return None;
        }
        Some(CartProduct {
            id: self.id.clone(),
            name: self.name(locale).to_string(),
            price_id: self.stripe_price_id.clone().unwrap_or_default(),
            price: self.price,
            volume: self.volume.clone(),
            formula_id: self.formula_id.clone(),
            image_url: self.image_url.clone(),
        })
    }
}

#[cfg(test)]
pub mod test_products {
    use super::*;

    pub fn product(id: &str, price_id: Option<&str>, price: f64) -> Product {
        Product {
            id: id.to_string(),
            slug: format!("product-{}", id),
            name_en: format!("SHAMPOO {}", id),
            name_zh: Some(format!("洗髮精 {}", id)),
            description_en: None,
            description_zh: None,
            stripe_price_id: price_id.map(|s| s.to_string()),
            price,
            currency: "aud".to_string(),
            inventory_count: None,
            image_url: None,
            volume: Some("250ml".to_string()),
            formula_id: Some(format!("SH-{}", id)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_products::product;
    use super::*;

    #[test]
    fn test_availability() {
        assert_eq!(product("01", None, 10.0).availability(), Availability::Unavailable);
        assert_eq!(product("01", Some(""), 10.0).availability(), Availability::Unavailable);
        assert_eq!(product("01", Some("price_1"), 10.0).availability(), Availability::Available);

        let mut sold_out = product("01", Some("price_1"), 10.0);
        sold_out.inventory_count = Some(0);
        assert_eq!(sold_out.availability(), Availability::SoldOut);
        assert!(sold_out.to_cart_product(Locale::En).is_none());
    }

    #[test]
    fn test_cart_product_is_localized() {
        let p = product("01", Some("price_1"), 32.5);
        let item = p.to_cart_product(Locale::Zh).unwrap();
        assert_eq!(item.name, "洗髮精 01");
        assert_eq!(item.price_id, "price_1");
        assert_eq!(item.price, 32.5);
    }
}
