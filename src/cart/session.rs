use std::fs;
use std::io;
use std::path::PathBuf;

use spdlog::debug;
use uuid::Uuid;

use crate::cart::{CartSnapshot, CartStore, FileCartStorage};

/// Cookie naming the shopper's cart.
pub const CART_COOKIE: &str = "wecut_cart";

/// Carts kept on disk, one directory per cart id.
pub struct CartSessions {
    root: PathBuf,
}

/// A cart opened for one request.
pub struct CartSession {
    pub id: String,
    /// The id was minted for this request and still has to reach the client.
    pub is_new: bool,
    pub store: CartStore<FileCartStorage>,
}

/// Only ids we minted are accepted, so a cookie never names a path.
fn canonical_id(cart_id: &str) -> Option<String> {
    Uuid::parse_str(cart_id).ok().map(|id| id.hyphenated().to_string())
}

impl CartSessions {
    pub fn new(root: PathBuf) -> io::Result<Self> {
        fs::create_dir_all(&root)?;
        Ok(CartSessions { root })
    }

    /// Opens the cart behind `cart_id`, starting a fresh one when the id is
    /// missing or malformed.
    pub fn open(&self, cart_id: Option<&str>) -> io::Result<CartSession> {
        let (id, is_new) = match cart_id.and_then(canonical_id) {
            Some(id) => (id, false),
            None => (Uuid::new_v4().hyphenated().to_string(), true),
        };
        if is_new {
            debug!("Starting cart {}", id);
        }
        let storage = FileCartStorage::new(self.root.join(&id))?;
        Ok(CartSession {
            id,
            is_new,
            store: CartStore::open(storage),
        })
    }

    /// Current state of an existing cart, without creating one.
    pub fn peek(&self, cart_id: Option<&str>) -> CartSnapshot {
        let Some(id) = cart_id.and_then(canonical_id) else {
            return CartSnapshot::default();
        };
        let dir = self.root.join(id);
        if !dir.is_dir() {
            return CartSnapshot::default();
        }
        match FileCartStorage::new(dir) {
            Ok(storage) => CartStore::open(storage).snapshot(),
            Err(_) => CartSnapshot::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::cart::CartProduct;

    use super::*;

    fn product(id: &str) -> CartProduct {
        CartProduct {
            id: id.to_string(),
            name: format!("Shampoo {}", id),
            price_id: format!("price_{}", id),
            price: 10.0,
            volume: None,
            formula_id: None,
            image_url: None,
        }
    }

    #[test]
    fn test_cart_survives_between_requests() -> io::Result<()> {
        let dir = tempfile::tempdir()?;
        let sessions = CartSessions::new(dir.path().join("carts"))?;

        let mut first = sessions.open(None)?;
        assert!(first.is_new);
        first.store.add(product("a"));
        first.store.add(product("a"));

        let second = sessions.open(Some(first.id.as_str()))?;
        assert!(!second.is_new);
        assert_eq!(second.id, first.id);
        assert_eq!(second.store.item_count(), 2);

        let snapshot = sessions.peek(Some(first.id.as_str()));
        assert_eq!(snapshot.item_count(), 2);
        assert!(!snapshot.is_open);
        Ok(())
    }

    #[test]
    fn test_foreign_ids_start_a_new_cart() -> io::Result<()> {
        let dir = tempfile::tempdir()?;
        let sessions = CartSessions::new(dir.path().to_path_buf())?;

        let session = sessions.open(Some("../../etc"))?;
        assert!(session.is_new);
        assert_ne!(session.id, "../../etc");
        assert!(dir.path().join(&session.id).is_dir());

        assert_eq!(sessions.peek(Some("../../etc")), CartSnapshot::default());
        assert_eq!(sessions.peek(Some(Uuid::new_v4().to_string().as_str())), CartSnapshot::default());
        Ok(())
    }
}
