use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::{Client, Response, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use spdlog::debug;

use crate::journal::post::{Post, PostId};
use crate::repository::{ContentRepository, NewCustomer, NewOrder, NewOrderItem, OrderStore, PostLink, RepoResult, RepositoryError};
use crate::shop::Product;

const POSTS: &str = "posts";
const PRODUCTS: &str = "products";
const CUSTOMERS: &str = "customers";
const ORDERS: &str = "orders";
const ORDER_ITEMS: &str = "order_items";

const LINK_COLUMNS: &str = "slug,title_en,title_zh";

#[derive(Deserialize)]
struct IdRow {
    id: serde_json::Value,
}

impl IdRow {
    fn into_string(self) -> String {
        match self.id {
            serde_json::Value::String(s) => s,
            other => other.to_string(),
        }
    }
}

/// Hosted relational store reached through its PostgREST interface.
pub struct RestRepository {
    client: Client,
    base: Url,
    api_key: String,
}

type Query = Vec<(&'static str, String)>;

impl RestRepository {
    pub fn new(url: &str, api_key: String, timeout: Duration) -> RepoResult<Self> {
        let base = Url::parse(url)?.join("/rest/v1/")?;
        let client = Client::builder()
            .user_agent(concat!("wecut/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()?;
        Ok(RestRepository { client, base, api_key })
    }

    fn table_url(&self, table: &str, query: &[(&'static str, String)]) -> RepoResult<Url> {
        let mut url = self.base.join(table)?;
        if !query.is_empty() {
            let mut qp = url.query_pairs_mut();
            for (k, v) in query {
                qp.append_pair(k, v);
            }
        }
        Ok(url)
    }

    fn auth_headers(&self) -> RepoResult<HeaderMap> {
        let mut headers = HeaderMap::new();
        let key = HeaderValue::from_str(&self.api_key)
            .map_err(|e| RepositoryError::Invalid(format!("api key: {}", e)))?;
        let bearer = HeaderValue::from_str(&format!("Bearer {}", self.api_key))
            .map_err(|e| RepositoryError::Invalid(format!("api key: {}", e)))?;
        headers.insert("apikey", key);
        headers.insert(AUTHORIZATION, bearer);
        Ok(headers)
    }

    async fn select<T: DeserializeOwned>(&self, table: &str, query: Query) -> RepoResult<Vec<T>> {
        let url = self.table_url(table, &query)?;
        debug!("GET {}", url);
        let resp = self.client.get(url).headers(self.auth_headers()?).send().await?;
        Self::handle(resp).await
    }

    async fn insert<B: Serialize + ?Sized>(&self, table: &str, query: Query, body: &B, prefer: &'static str) -> RepoResult<Response> {
        let url = self.table_url(table, &query)?;
        debug!("POST {}", url);
        let resp = self.client.post(url)
            .headers(self.auth_headers()?)
            .header("Prefer", prefer)
            .json(body)
            .send()
            .await?;
        Self::check(resp).await
    }

    async fn first_id(resp: Response) -> RepoResult<String> {
        let rows: Vec<IdRow> = Self::handle(resp).await?;
        rows.into_iter()
            .next()
            .map(IdRow::into_string)
            .ok_or_else(|| RepositoryError::Invalid("insert returned no rows".to_string()))
    }

    async fn check(resp: Response) -> RepoResult<Response> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let body = resp.text().await.unwrap_or_default();
        Err(RepositoryError::Status { status: status.as_u16(), body })
    }

    async fn handle<T: DeserializeOwned>(resp: Response) -> RepoResult<Vec<T>> {
        let bytes = Self::check(resp).await?.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

fn published() -> Query {
    vec![("select", "*".to_string()), ("published", "eq.true".to_string())]
}

/// PostgREST array literal, `{"a","b"}`.
fn array_literal(values: &[String]) -> String {
    let quoted: Vec<String> = values.iter()
        .map(|v| format!("\"{}\"", v.replace('\\', "\\\\").replace('"', "\\\"")))
        .collect();
    format!("{{{}}}", quoted.join(","))
}

fn newest_first() -> (&'static str, String) {
    ("order", "created_at.desc".to_string())
}

#[async_trait]
impl ContentRepository for RestRepository {
    async fn published_posts(&self) -> RepoResult<Vec<Post>> {
        let mut query = published();
        query.push(newest_first());
        self.select(POSTS, query).await
    }

    async fn post_by_slug(&self, slug: &str) -> RepoResult<Option<Post>> {
        let mut query = published();
        query.push(("slug", format!("eq.{}", slug)));
        query.push(("limit", "1".to_string()));
        Ok(self.select(POSTS, query).await?.into_iter().next())
    }

    async fn previous_post(&self, post: &Post) -> RepoResult<Option<PostLink>> {
        let query = vec![
            ("select", LINK_COLUMNS.to_string()),
            ("published", "eq.true".to_string()),
            ("created_at", format!("lt.{}", post.created_at.to_rfc3339())),
            newest_first(),
            ("limit", "1".to_string()),
        ];
        Ok(self.select(POSTS, query).await?.into_iter().next())
    }

    async fn next_post(&self, post: &Post) -> RepoResult<Option<PostLink>> {
        let query = vec![
            ("select", LINK_COLUMNS.to_string()),
            ("published", "eq.true".to_string()),
            ("created_at", format!("gt.{}", post.created_at.to_rfc3339())),
            ("order", "created_at.asc".to_string()),
            ("limit", "1".to_string()),
        ];
        Ok(self.select(POSTS, query).await?.into_iter().next())
    }

    async fn posts_with_tag(&self, tag: &str) -> RepoResult<Vec<Post>> {
        let mut query = published();
        query.push(("tags", format!("cs.{}", array_literal(&[tag.to_string()]))));
        query.push(newest_first());
        self.select(POSTS, query).await
    }

    async fn posts_sharing_tags(&self, tags: &[String], exclude: &PostId, limit: usize) -> RepoResult<Vec<Post>> {
        if tags.is_empty() {
            return Ok(vec![]);
        }
        let mut query = published();
        query.push(("tags", format!("ov.{}", array_literal(tags))));
        query.push(("id", format!("neq.{}", exclude.0)));
        query.push(newest_first());
        query.push(("limit", limit.to_string()));
        self.select(POSTS, query).await
    }

    async fn latest_posts(&self, exclude: &PostId, limit: usize) -> RepoResult<Vec<Post>> {
        let mut query = published();
        query.push(("id", format!("neq.{}", exclude.0)));
        query.push(newest_first());
        query.push(("limit", limit.to_string()));
        self.select(POSTS, query).await
    }

    async fn serial_number(&self, post: &Post) -> RepoResult<u32> {
        let query = vec![
            ("select", "id".to_string()),
            ("published", "eq.true".to_string()),
            ("created_at", format!("lt.{}", post.created_at.to_rfc3339())),
        ];
        let older: Vec<IdRow> = self.select(POSTS, query).await?;
        Ok(older.len() as u32 + 1)
    }

    async fn products(&self) -> RepoResult<Vec<Product>> {
        let query = vec![("select", "*".to_string()), ("order", "name_en.asc".to_string())];
        self.select(PRODUCTS, query).await
    }
}

#[async_trait]
impl OrderStore for RestRepository {
    async fn upsert_customer(&self, customer: &NewCustomer) -> RepoResult<String> {
        let query = vec![("on_conflict", "stripe_customer_id".to_string())];
        let resp = self.insert(CUSTOMERS, query, customer, "resolution=merge-duplicates,return=representation").await?;
        Self::first_id(resp).await
    }

    async fn insert_order(&self, order: &NewOrder) -> RepoResult<String> {
        let resp = self.insert(ORDERS, vec![], order, "return=representation").await?;
        Self::first_id(resp).await
    }

    async fn insert_order_items(&self, items: &[NewOrderItem]) -> RepoResult<()> {
        if items.is_empty() {
            return Ok(());
        }
        self.insert(ORDER_ITEMS, vec![], items, "return=minimal").await?;
        Ok(())
    }
}
