use std::sync::Mutex;

use async_trait::async_trait;
use uuid::Uuid;

use crate::journal::post::{Post, PostId};
use crate::repository::{ContentRepository, NewCustomer, NewOrder, NewOrderItem, OrderStore, PostLink, RepoResult, RepositoryError};
use crate::shop::Product;

#[derive(Debug, Clone, PartialEq)]
pub struct StoredCustomer {
    pub id: String,
    pub customer: NewCustomer,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StoredOrder {
    pub id: String,
    pub order: NewOrder,
}

#[derive(Default)]
struct Orders {
    customers: Vec<StoredCustomer>,
    orders: Vec<StoredOrder>,
    items: Vec<NewOrderItem>,
}

/// Everything held in memory. Used for file-backed content and in tests.
pub struct MemoryRepository {
    /// Published only, newest first.
    posts: Vec<Post>,
    products: Vec<Product>,
    orders: Mutex<Orders>,
}

impl MemoryRepository {
    pub fn new(posts: Vec<Post>, products: Vec<Product>) -> Self {
        let mut posts: Vec<Post> = posts.into_iter().filter(|p| p.published).collect();
        posts.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));

        let mut products = products;
        products.sort_by(|a, b| a.name_en.cmp(&b.name_en));

        MemoryRepository {
            posts,
            products,
            orders: Mutex::new(Orders::default()),
        }
    }

    pub fn customers(&self) -> Vec<StoredCustomer> {
        self.lock().map(|o| o.customers.clone()).unwrap_or_default()
    }

    pub fn orders(&self) -> Vec<StoredOrder> {
        self.lock().map(|o| o.orders.clone()).unwrap_or_default()
    }

    pub fn order_items(&self) -> Vec<NewOrderItem> {
        self.lock().map(|o| o.items.clone()).unwrap_or_default()
    }

    fn lock(&self) -> RepoResult<std::sync::MutexGuard<'_, Orders>> {
        self.orders.lock().map_err(|_| RepositoryError::Invalid("order store lock poisoned".to_string()))
    }
}

#[async_trait]
impl ContentRepository for MemoryRepository {
    async fn published_posts(&self) -> RepoResult<Vec<Post>> {
        Ok(self.posts.clone())
    }

    async fn post_by_slug(&self, slug: &str) -> RepoResult<Option<Post>> {
        Ok(self.posts.iter().find(|p| p.slug == slug).cloned())
    }

    async fn previous_post(&self, post: &Post) -> RepoResult<Option<PostLink>> {
        Ok(self.posts.iter()
            .find(|p| p.created_at < post.created_at)
            .map(PostLink::from))
    }

    async fn next_post(&self, post: &Post) -> RepoResult<Option<PostLink>> {
        Ok(self.posts.iter()
            .rev()
            .find(|p| p.created_at > post.created_at)
            .map(PostLink::from))
    }

    async fn posts_with_tag(&self, tag: &str) -> RepoResult<Vec<Post>> {
        Ok(self.posts.iter()
            .filter(|p| p.tags.iter().any(|t| t == tag))
            .cloned()
            .collect())
    }

    async fn posts_sharing_tags(&self, tags: &[String], exclude: &PostId, limit: usize) -> RepoResult<Vec<Post>> {
        Ok(self.posts.iter()
            .filter(|p| &p.id != exclude && p.shares_tag_with(tags))
            .take(limit)
            .cloned()
            .collect())
    }

    async fn latest_posts(&self, exclude: &PostId, limit: usize) -> RepoResult<Vec<Post>> {
        Ok(self.posts.iter()
            .filter(|p| &p.id != exclude)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn serial_number(&self, post: &Post) -> RepoResult<u32> {
        let older = self.posts.iter().filter(|p| p.created_at < post.created_at).count();
        Ok(older as u32 + 1)
    }

    async fn products(&self) -> RepoResult<Vec<Product>> {
        Ok(self.products.clone())
    }
}

#[async_trait]
impl OrderStore for MemoryRepository {
    async fn upsert_customer(&self, customer: &NewCustomer) -> RepoResult<String> {
        let mut orders = self.lock()?;
        if let Some(existing) = orders.customers.iter_mut()
            .find(|c| c.customer.stripe_customer_id == customer.stripe_customer_id) {
            existing.customer = customer.clone();
            return Ok(existing.id.clone());
        }
        let id = Uuid::new_v4().to_string();
        orders.customers.push(StoredCustomer { id: id.clone(), customer: customer.clone() });
        Ok(id)
    }

    async fn insert_order(&self, order: &NewOrder) -> RepoResult<String> {
        let id = Uuid::new_v4().to_string();
        self.lock()?.orders.push(StoredOrder { id: id.clone(), order: order.clone() });
        Ok(id)
    }

    async fn insert_order_items(&self, items: &[NewOrderItem]) -> RepoResult<()> {
        self.lock()?.items.extend_from_slice(items);
        Ok(())
    }
}
