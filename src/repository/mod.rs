use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::journal::locale::{localized, Locale, LocalePolicy};
use crate::journal::post::{Post, PostId};
use crate::shop::Product;

pub mod memory;
pub mod post_files;
pub mod rest;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("request to content store failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("content store answered {status}: {body}")]
    Status { status: u16, body: String },
    #[error("invalid content store address: {0}")]
    Url(#[from] url::ParseError),
    #[error("invalid record: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("reading content files: {0}")]
    Io(#[from] std::io::Error),
    #[error("{0}")]
    Invalid(String),
}

pub type RepoResult<T> = Result<T, RepositoryError>;

/// Title and slug of a neighbouring post, for previous/next links.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PostLink {
    pub slug: String,
    #[serde(default)]
    pub title_en: Option<String>,
    #[serde(default)]
    pub title_zh: Option<String>,
}

impl PostLink {
    pub fn title(&self, locale: Locale, policy: LocalePolicy) -> Option<&str> {
        localized(locale, policy, self.title_en.as_deref(), self.title_zh.as_deref())
    }
}

impl From<&Post> for PostLink {
    fn from(post: &Post) -> Self {
        PostLink {
            slug: post.slug.clone(),
            title_en: post.title_en.clone(),
            title_zh: post.title_zh.clone(),
        }
    }
}

/// Read side of the hosted store. Every query only ever sees published
/// posts.
#[async_trait]
pub trait ContentRepository: Send + Sync {
    /// Newest first.
    async fn published_posts(&self) -> RepoResult<Vec<Post>>;

    async fn post_by_slug(&self, slug: &str) -> RepoResult<Option<Post>>;

    /// Newest post created before `post`.
    async fn previous_post(&self, post: &Post) -> RepoResult<Option<PostLink>>;

    /// Oldest post created after `post`.
    async fn next_post(&self, post: &Post) -> RepoResult<Option<PostLink>>;

    /// Newest first.
    async fn posts_with_tag(&self, tag: &str) -> RepoResult<Vec<Post>>;

    /// Posts sharing at least one tag, newest first, `exclude` left out.
    async fn posts_sharing_tags(&self, tags: &[String], exclude: &PostId, limit: usize) -> RepoResult<Vec<Post>>;

    /// Newest posts, `exclude` left out.
    async fn latest_posts(&self, exclude: &PostId, limit: usize) -> RepoResult<Vec<Post>>;

    /// 1-based position of `post` in publication order.
    async fn serial_number(&self, post: &Post) -> RepoResult<u32>;

    async fn products(&self) -> RepoResult<Vec<Product>>;
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewCustomer {
    pub stripe_customer_id: String,
    pub email: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewOrder {
    pub stripe_checkout_session_id: String,
    pub customer_id: String,
    pub amount_total: Option<i64>,
    pub currency: Option<String>,
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_intent_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewOrderItem {
    pub order_id: String,
    pub stripe_product_id: Option<String>,
    pub stripe_price_id: Option<String>,
    pub quantity: Option<i64>,
    pub amount_total: Option<i64>,
}

/// Write side used by the payment webhook.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Returns the customer's id; an existing Stripe customer id is updated.
    async fn upsert_customer(&self, customer: &NewCustomer) -> RepoResult<String>;

    async fn insert_order(&self, order: &NewOrder) -> RepoResult<String>;

    async fn insert_order_items(&self, items: &[NewOrderItem]) -> RepoResult<()>;
}
