use serde::{Deserialize, Serialize};
use spdlog::{debug, warn};
use tokio::sync::watch;

use crate::journal::locale::Locale;
use crate::payments::checkout::{CheckoutItem, CheckoutRequest};

pub mod session;
pub mod storage;

pub use storage::{CartStorage, FileCartStorage, MemoryCartStorage};

/// Storage key the cart snapshot lives under.
pub const CART_KEY: &str = "wecut_cart.json";

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct CartProduct {
    pub id: String,
    pub name: String,
    pub price_id: String,
    pub price: f64,
    #[serde(default)]
    pub volume: Option<String>,
    #[serde(default)]
    pub formula_id: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct CartItem {
    #[serde(flatten)]
    pub product: CartProduct,
    pub quantity: u32,
}

/// What subscribers see after every mutation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CartSnapshot {
    pub items: Vec<CartItem>,
    pub is_open: bool,
}

impl CartSnapshot {
    pub fn item_count(&self) -> u32 {
        self.items.iter().map(|i| i.quantity).sum()
    }

    pub fn subtotal(&self) -> f64 {
        self.items.iter().map(|i| i.product.price * i.quantity as f64).sum()
    }
}

/// Shopping cart owned by one session. Each mutation overwrites the stored
/// item list and notifies subscribers.
pub struct CartStore<S: CartStorage> {
    storage: S,
    state: watch::Sender<CartSnapshot>,
}

impl<S: CartStorage> CartStore<S> {
    /// Restores the saved items. Unreadable data starts an empty cart.
    pub fn open(storage: S) -> Self {
        let items = match storage.load(CART_KEY) {
            Ok(Some(raw)) => match serde_json::from_str::<Vec<CartItem>>(&raw) {
                Ok(items) => items,
                Err(e) => {
                    warn!("Discarding unreadable cart: {}", e);
                    vec![]
                }
            },
            Ok(None) => vec![],
            Err(e) => {
                warn!("Could not load cart: {}", e);
                vec![]
            }
        };
        let (state, _) = watch::channel(CartSnapshot { items, is_open: false });
        CartStore { storage, state }
    }

    pub fn subscribe(&self) -> watch::Receiver<CartSnapshot> {
        self.state.subscribe()
    }

    pub fn snapshot(&self) -> CartSnapshot {
        self.state.borrow().clone()
    }

    pub fn items(&self) -> Vec<CartItem> {
        self.state.borrow().items.clone()
    }

    pub fn item_count(&self) -> u32 {
        self.state.borrow().item_count()
    }

    pub fn subtotal(&self) -> f64 {
        self.state.borrow().subtotal()
    }

    pub fn is_open(&self) -> bool {
        self.state.borrow().is_open
    }

    pub fn set_open(&mut self, open: bool) {
        self.state.send_modify(|s| s.is_open = open);
    }

    /// Adds one unit and opens the cart drawer.
    pub fn add(&mut self, product: CartProduct) {
        self.mutate(|s| {
            match s.items.iter_mut().find(|i| i.product.id == product.id) {
                Some(item) => item.quantity += 1,
                None => s.items.push(CartItem { product, quantity: 1 }),
            }
            s.is_open = true;
        });
    }

    pub fn remove(&mut self, product_id: &str) {
        self.mutate(|s| s.items.retain(|i| i.product.id != product_id));
    }

    /// A quantity below one removes the item.
    pub fn update_quantity(&mut self, product_id: &str, quantity: u32) {
        if quantity < 1 {
            self.remove(product_id);
            return;
        }
        self.mutate(|s| {
            if let Some(item) = s.items.iter_mut().find(|i| i.product.id == product_id) {
                item.quantity = quantity;
            }
        });
    }

    pub fn clear(&mut self) {
        self.state.send_modify(|s| s.items.clear());
        if let Err(e) = self.storage.remove(CART_KEY) {
            warn!("Could not clear saved cart: {}", e);
        }
    }

    /// Body for `POST /api/checkout_sessions`.
    pub fn to_checkout_request(&self, locale: Locale) -> CheckoutRequest {
        let items = self.state.borrow().items.iter()
            .map(|i| CheckoutItem {
                price_id: Some(i.product.price_id.clone()),
                quantity: i.quantity,
                name: Some(i.product.name.clone()),
                amount: Some(i.product.price),
                currency: None,
                image: i.product.image_url.clone(),
            })
            .collect();
        CheckoutRequest {
            items: Some(items),
            price_id: None,
            quantity: 1,
            locale: locale.code().to_string(),
        }
    }

    fn mutate<F: FnOnce(&mut CartSnapshot)>(&mut self, change: F) {
        self.state.send_modify(change);
        self.persist();
    }

    fn persist(&self) {
        let snapshot = self.state.borrow();
        let items = &snapshot.items;
        match serde_json::to_string(items) {
            Ok(raw) => {
                if let Err(e) = self.storage.save(CART_KEY, &raw) {
                    warn!("Could not save cart: {}", e);
                } else {
                    debug!("Saved cart with {} items", items.len());
                }
            }
            Err(e) => warn!("Could not serialize cart: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(id: &str, price: f64) -> CartProduct {
        CartProduct {
            id: id.to_string(),
            name: format!("Shampoo {}", id),
            price_id: format!("price_{}", id),
            price,
            volume: Some("250ml".to_string()),
            formula_id: None,
            image_url: None,
        }
    }

    #[test]
    fn test_add_increments_and_opens() {
        let mut cart = CartStore::open(MemoryCartStorage::default());
        assert!(!cart.is_open());

        cart.add(product("a", 10.0));
        cart.add(product("a", 10.0));
        cart.add(product("b", 2.5));

        assert!(cart.is_open());
        assert_eq!(cart.items().len(), 2);
        assert_eq!(cart.item_count(), 3);
        assert_eq!(cart.subtotal(), 22.5);
    }

    #[test]
    fn test_update_quantity_below_one_removes() {
        let mut cart = CartStore::open(MemoryCartStorage::default());
        cart.add(product("a", 10.0));
        cart.update_quantity("a", 4);
        assert_eq!(cart.item_count(), 4);

        cart.update_quantity("a", 0);
        assert!(cart.items().is_empty());

        cart.update_quantity("missing", 3);
        assert!(cart.items().is_empty());
    }

    #[test]
    fn test_every_mutation_is_persisted() {
        let storage = MemoryCartStorage::default();
        let mut cart = CartStore::open(storage.clone());
        cart.add(product("a", 10.0));
        cart.update_quantity("a", 2);

        let reopened = CartStore::open(storage.clone());
        assert_eq!(reopened.item_count(), 2);
        assert!(!reopened.is_open());

        cart.remove("a");
        assert_eq!(storage.load(CART_KEY).unwrap(), Some("[]".to_string()));

        cart.add(product("b", 1.0));
        cart.clear();
        assert_eq!(storage.load(CART_KEY).unwrap(), None);
    }

    #[test]
    fn test_corrupt_storage_starts_empty() {
        let storage = MemoryCartStorage::default();
        storage.save(CART_KEY, "{not json").unwrap();
        let cart = CartStore::open(storage);
        assert!(cart.items().is_empty());
    }

    #[test]
    fn test_subscribers_see_changes() {
        let mut cart = CartStore::open(MemoryCartStorage::default());
        let mut rx = cart.subscribe();
        assert!(!rx.has_changed().unwrap());

        cart.add(product("a", 10.0));
        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().item_count(), 1);

        cart.set_open(false);
        assert!(rx.has_changed().unwrap());
        assert!(!rx.borrow_and_update().is_open);
    }

    #[test]
    fn test_checkout_request() {
        let mut cart = CartStore::open(MemoryCartStorage::default());
        cart.add(product("a", 10.0));
        cart.add(product("a", 10.0));

        let request = cart.to_checkout_request(Locale::Zh);
        assert_eq!(request.locale, "zh");
        let items = request.items.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].price_id.as_deref(), Some("price_a"));
        assert_eq!(items[0].quantity, 2);
    }
}
