use std::io;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use cookie::time::Duration;
use cookie::{Cookie, SameSite};
use ntex::http::{HttpMessage, StatusCode};
use ntex::util::Bytes;
use ntex::web;
use ntex::web::types::{Path, State};
use ntex::web::{HttpRequest, HttpResponse};
use ntex_files::NamedFile;
use serde::{Deserialize, Serialize};
use serde_json::json;
use spdlog::{error, info, warn};

use crate::cart::session::{CartSession, CartSessions, CART_COOKIE};
use crate::cart::{CartSnapshot, CartStore, FileCartStorage};
use crate::config::{Config, Repository};
use crate::content::block_renderer::{BlockLabels, BlockRenderer};
use crate::i18n::Dictionaries;
use crate::journal::article::load_article;
use crate::journal::listing::{listed_posts, paginate, tagged_posts};
use crate::journal::locale::{locale_redirect, Locale, LocalePolicy};
use crate::payments::checkout::{create_checkout, CheckoutRequest};
use crate::payments::stripe::StripeGateway;
use crate::payments::webhook::{WebhookHandler, SIGNATURE_HEADER};
use crate::payments::PaymentsGateway;
use crate::query_string::QueryString;
use crate::repository::post_files::open_file_repository;
use crate::repository::rest::RestRepository;
use crate::repository::{ContentRepository, OrderStore};
use crate::view::page_renderer::{CheckoutReturn, JournalSection, LegalPage};
use crate::view::{PageContext, Templates};

const HOME_LATEST: usize = 3;
const CART_COOKIE_DAYS: i64 = 30;

/// Site wide values the handlers need.
pub struct SiteSettings {
    pub brand: String,
    pub page_size: u32,
    pub policy: LocalePolicy,
    pub currency: String,
    pub site_url: String,
    pub public_dir: PathBuf,
}

pub struct AppState {
    pub content: Arc<dyn ContentRepository>,
    pub gateway: Option<Arc<dyn PaymentsGateway>>,
    pub webhook: Option<WebhookHandler>,
    pub templates: Templates,
    pub dictionaries: Dictionaries,
    pub carts: CartSessions,
    pub settings: SiteSettings,
}

impl AppState {
    fn page<'a>(&'a self, req: &'a HttpRequest, locale: Locale) -> PageContext<'a> {
        let path = match Locale::from_path(req.path()) {
            Some(prefix) if prefix == locale => unlocalized_path(req.path(), locale),
            _ => req.path(),
        };
        PageContext {
            locale,
            policy: self.settings.policy,
            dict: self.dictionaries.get(locale),
            brand: &self.settings.brand,
            path,
            cart_count: self.carts.peek(cart_id(req).as_deref()).item_count(),
        }
    }

    fn block_renderer(&self, locale: Locale) -> BlockRenderer {
        let text = &self.dictionaries.get(locale).journal;
        BlockRenderer::new(BlockLabels {
            abstract_label: text.abstract_label.clone(),
            note_label: text.note_label.clone(),
        })
    }
}

fn html(status: StatusCode, body: String) -> HttpResponse {
    HttpResponse::build(status)
        .content_type("text/html; charset=utf-8")
        .body(body)
}

fn json_response<T: Serialize>(status: StatusCode, value: &T) -> HttpResponse {
    match serde_json::to_string(value) {
        Ok(body) => HttpResponse::build(status)
            .content_type("application/json")
            .body(body),
        Err(e) => HttpResponse::InternalServerError()
            .body(format!("Error encoding response: {}", e)),
    }
}

fn redirect(location: String) -> HttpResponse {
    HttpResponse::TemporaryRedirect()
        .header("Location", location)
        .content_type("text/html; charset=utf-8")
        .finish()
}

fn header<'a>(req: &'a HttpRequest, name: &str) -> Option<&'a str> {
    req.headers().get(name).and_then(|v| v.to_str().ok())
}

fn query(req: &HttpRequest) -> QueryString {
    QueryString::from(req.uri().query().unwrap_or(""))
}

/// Request path with the locale prefix removed, `/` at least.
fn unlocalized_path(path: &str, locale: Locale) -> &str {
    let rest = path.get(1 + locale.code().len()..).unwrap_or("");
    if rest.is_empty() { "/" } else { rest }
}

fn not_found(state: &AppState, req: &HttpRequest, locale: Locale) -> HttpResponse {
    let ctx = state.page(req, locale);
    html(StatusCode::NOT_FOUND, state.templates.render_not_found(&ctx))
}

fn cart_id(req: &HttpRequest) -> Option<String> {
    req.cookie(CART_COOKIE).map(|c| c.value().to_string())
}

fn cart_cookie(id: &str) -> Cookie<'static> {
    Cookie::build((CART_COOKIE, id.to_string()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .max_age(Duration::days(CART_COOKIE_DAYS))
        .build()
}

/// Anything no route claimed: bare locale roots get their slash, unprefixed
/// pages are sent to the negotiated locale, the rest is a 404.
fn unrouted(req: &HttpRequest, state: &AppState) -> HttpResponse {
    let path = req.path();
    let accept_language = header(req, "accept-language");

    if let Some(locale) = Locale::from_path(path) {
        if path.len() == 1 + locale.code().len() {
            return redirect(format!("{}/", path));
        }
        return not_found(state, req, locale);
    }

    match locale_redirect(path, accept_language) {
        Some(target) => match req.uri().query() {
            Some(q) if !q.is_empty() => redirect(format!("{}?{}", target, q)),
            _ => redirect(target),
        },
        None => not_found(state, req, Locale::negotiate(accept_language)),
    }
}

async fn fallback(req: HttpRequest, state: State<Arc<AppState>>) -> HttpResponse {
    unrouted(&req, &state)
}

#[web::get("/{lang}/")]
async fn home(lang: Path<String>, req: HttpRequest, state: State<Arc<AppState>>) -> HttpResponse {
    let Some(locale) = Locale::from_code(&lang) else {
        return unrouted(&req, &state);
    };
    let mut latest = listed_posts(state.content.as_ref(), locale, state.settings.policy).await;
    latest.truncate(HOME_LATEST);

    let ctx = state.page(&req, locale);
    html(StatusCode::OK, state.templates.render_home(&ctx, &latest))
}

#[web::get("/{lang}/about")]
async fn about(lang: Path<String>, req: HttpRequest, state: State<Arc<AppState>>) -> HttpResponse {
    let Some(locale) = Locale::from_code(&lang) else {
        return unrouted(&req, &state);
    };
    let ctx = state.page(&req, locale);
    html(StatusCode::OK, state.templates.render_about(&ctx))
}

#[web::get("/{lang}/locations")]
async fn locations(lang: Path<String>, req: HttpRequest, state: State<Arc<AppState>>) -> HttpResponse {
    let Some(locale) = Locale::from_code(&lang) else {
        return unrouted(&req, &state);
    };
    let ctx = state.page(&req, locale);
    html(StatusCode::OK, state.templates.render_locations(&ctx))
}

#[web::get("/{lang}/shop")]
async fn shop(lang: Path<String>, req: HttpRequest, state: State<Arc<AppState>>) -> HttpResponse {
    let Some(locale) = Locale::from_code(&lang) else {
        return unrouted(&req, &state);
    };
    let products = match state.content.products().await {
        Ok(products) => products,
        Err(e) => {
            error!("Loading products: {}", e);
            vec![]
        }
    };
    let qs = query(&req);
    let checkout = CheckoutReturn {
        success: qs.is_set("success"),
        canceled: qs.is_set("canceled"),
    };
    // Paid for, so the cart has done its job.
    if checkout.success {
        if let Some(id) = cart_id(&req) {
            match state.carts.open(Some(id.as_str())) {
                Ok(mut session) if !session.is_new => session.store.clear(),
                Ok(_) => {}
                Err(e) => warn!("Could not clear cart {}: {}", id, e),
            }
        }
    }

    let ctx = state.page(&req, locale);
    html(StatusCode::OK, state.templates.render_shop(&ctx, &products, checkout))
}

#[web::get("/{lang}/journal")]
async fn journal(lang: Path<String>, req: HttpRequest, state: State<Arc<AppState>>) -> HttpResponse {
    let Some(locale) = Locale::from_code(&lang) else {
        return unrouted(&req, &state);
    };
    let posts = listed_posts(state.content.as_ref(), locale, state.settings.policy).await;
    let page = paginate(&posts, query(&req).get_page(), state.settings.page_size);

    let ctx = state.page(&req, locale);
    html(StatusCode::OK, state.templates.render_journal(&ctx, &page))
}

#[web::get("/{lang}/journal/tag/{tag}")]
async fn journal_tag(path: Path<(String, String)>, req: HttpRequest, state: State<Arc<AppState>>) -> HttpResponse {
    let (lang, tag) = path.into_inner();
    let Some(locale) = Locale::from_code(&lang) else {
        return unrouted(&req, &state);
    };
    let posts = tagged_posts(state.content.as_ref(), &tag, locale, state.settings.policy).await;

    let ctx = state.page(&req, locale);
    html(StatusCode::OK, state.templates.render_tag(&ctx, &tag, &posts))
}

#[web::get("/{lang}/journal/{slug}")]
async fn journal_article(path: Path<(String, String)>, req: HttpRequest, state: State<Arc<AppState>>) -> HttpResponse {
    let (lang, slug) = path.into_inner();
    let Some(locale) = Locale::from_code(&lang) else {
        return unrouted(&req, &state);
    };
    if let Some(section) = JournalSection::from_slug(&slug) {
        let ctx = state.page(&req, locale);
        return html(StatusCode::OK, state.templates.render_journal_section(&ctx, section));
    }
    let qs = query(&req);
    let renderer = state.block_renderer(locale);
    let article = load_article(
        state.content.as_ref(),
        &renderer,
        &slug,
        locale,
        state.settings.policy,
        qs.get_variant(),
    ).await;

    match article {
        Some(article) => {
            let ctx = state.page(&req, locale);
            html(StatusCode::OK, state.templates.render_article(&ctx, &article))
        }
        None => not_found(&state, &req, locale),
    }
}

#[web::get("/{lang}/legal/{page}")]
async fn legal(path: Path<(String, String)>, req: HttpRequest, state: State<Arc<AppState>>) -> HttpResponse {
    let (lang, page) = path.into_inner();
    let Some(locale) = Locale::from_code(&lang) else {
        return unrouted(&req, &state);
    };
    match LegalPage::from_slug(&page) {
        Some(page) => {
            let ctx = state.page(&req, locale);
            html(StatusCode::OK, state.templates.render_legal(&ctx, page))
        }
        None => not_found(&state, &req, locale),
    }
}

/// Body of the cart endpoints. Fields an action does not use may be left out.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CartChange {
    #[serde(default)]
    product_id: String,
    #[serde(default)]
    quantity: u32,
    #[serde(default)]
    locale: Option<String>,
}

impl CartChange {
    fn locale(&self) -> Locale {
        self.locale.as_deref().and_then(Locale::from_code).unwrap_or(Locale::En)
    }
}

fn error_json(status: StatusCode, message: &str) -> HttpResponse {
    json_response(status, &json!({ "error": message }))
}

fn cart_change(body: &Bytes) -> Result<CartChange, HttpResponse> {
    if body.is_empty() {
        return Ok(CartChange::default());
    }
    serde_json::from_slice(body).map_err(|e| {
        warn!("Rejected cart change: {}", e);
        error_json(StatusCode::BAD_REQUEST, &format!("Invalid request: {}", e))
    })
}

fn cart_json(snapshot: &CartSnapshot) -> serde_json::Value {
    json!({
        "items": snapshot.items,
        "itemCount": snapshot.item_count(),
        "subtotal": snapshot.subtotal(),
        "isOpen": snapshot.is_open,
    })
}

/// The cart after a change. A cart started by this request gets its cookie.
fn cart_contents(session: &CartSession) -> HttpResponse {
    let mut response = HttpResponse::build(StatusCode::OK);
    if session.is_new {
        response.cookie(cart_cookie(&session.id));
    }
    response
        .content_type("application/json")
        .body(cart_json(&session.store.snapshot()).to_string())
}

fn change_cart<F>(req: &HttpRequest, state: &AppState, change: F) -> HttpResponse
where
    F: FnOnce(&mut CartStore<FileCartStorage>),
{
    match state.carts.open(cart_id(req).as_deref()) {
        Ok(mut session) => {
            change(&mut session.store);
            cart_contents(&session)
        }
        Err(e) => {
            error!("Opening cart: {}", e);
            error_json(StatusCode::INTERNAL_SERVER_ERROR, "Cart unavailable")
        }
    }
}

#[web::get("/api/cart")]
async fn cart_view(req: HttpRequest, state: State<Arc<AppState>>) -> HttpResponse {
    json_response(StatusCode::OK, &cart_json(&state.carts.peek(cart_id(&req).as_deref())))
}

#[web::post("/api/cart/add")]
async fn cart_add(req: HttpRequest, body: Bytes, state: State<Arc<AppState>>) -> HttpResponse {
    let change = match cart_change(&body) {
        Ok(change) => change,
        Err(response) => return response,
    };
    let products = match state.content.products().await {
        Ok(products) => products,
        Err(e) => {
            error!("Loading products: {}", e);
            return error_json(StatusCode::INTERNAL_SERVER_ERROR, "Products unavailable");
        }
    };
    let Some(product) = products.iter().find(|p| p.id == change.product_id) else {
        return error_json(StatusCode::NOT_FOUND, "Unknown product");
    };
    let Some(item) = product.to_cart_product(change.locale()) else {
        return error_json(StatusCode::CONFLICT, "Product is not available");
    };
    change_cart(&req, &state, |store| store.add(item))
}

#[web::post("/api/cart/update")]
async fn cart_update(req: HttpRequest, body: Bytes, state: State<Arc<AppState>>) -> HttpResponse {
    match cart_change(&body) {
        Ok(change) => change_cart(&req, &state, |store| store.update_quantity(&change.product_id, change.quantity)),
        Err(response) => response,
    }
}

#[web::post("/api/cart/remove")]
async fn cart_remove(req: HttpRequest, body: Bytes, state: State<Arc<AppState>>) -> HttpResponse {
    match cart_change(&body) {
        Ok(change) => change_cart(&req, &state, |store| store.remove(&change.product_id)),
        Err(response) => response,
    }
}

#[web::post("/api/cart/clear")]
async fn cart_clear(req: HttpRequest, state: State<Arc<AppState>>) -> HttpResponse {
    change_cart(&req, &state, |store| store.clear())
}

/// Starts a hosted checkout for everything in the shopper's cart.
#[web::post("/api/cart/checkout")]
async fn cart_checkout(req: HttpRequest, body: Bytes, state: State<Arc<AppState>>) -> HttpResponse {
    let change = match cart_change(&body) {
        Ok(change) => change,
        Err(response) => return response,
    };
    let id = cart_id(&req);
    if state.carts.peek(id.as_deref()).items.is_empty() {
        return error_json(StatusCode::BAD_REQUEST, "Cart is empty");
    }
    let request = match state.carts.open(id.as_deref()) {
        Ok(session) => session.store.to_checkout_request(change.locale()),
        Err(e) => {
            error!("Opening cart: {}", e);
            return error_json(StatusCode::INTERNAL_SERVER_ERROR, "Cart unavailable");
        }
    };
    start_checkout(&req, &state, &request).await
}

#[web::post("/api/checkout_sessions")]
async fn checkout_sessions(req: HttpRequest, body: Bytes, state: State<Arc<AppState>>) -> HttpResponse {
    let request: CheckoutRequest = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(e) => {
            warn!("Rejected checkout request: {}", e);
            return error_json(StatusCode::BAD_REQUEST, &format!("Invalid request: {}", e));
        }
    };
    start_checkout(&req, &state, &request).await
}

async fn start_checkout(req: &HttpRequest, state: &AppState, request: &CheckoutRequest) -> HttpResponse {
    let Some(gateway) = state.gateway.as_ref() else {
        error!("Checkout requested but no payments secret key is configured");
        return error_json(StatusCode::INTERNAL_SERVER_ERROR, "Payments are not configured");
    };

    let origin = header(req, "origin")
        .map(|o| o.trim_end_matches('/').to_string())
        .unwrap_or_else(|| state.settings.site_url.clone());

    match create_checkout(gateway.as_ref(), request, &origin, &state.settings.currency).await {
        Ok(response) => json_response(StatusCode::OK, &response),
        Err(e) => {
            error!("Checkout failed: {}", e);
            let status = StatusCode::from_u16(e.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            error_json(status, &e.to_string())
        }
    }
}

#[web::post("/api/webhooks/stripe")]
async fn stripe_webhook(req: HttpRequest, body: Bytes, state: State<Arc<AppState>>) -> HttpResponse {
    let Some(handler) = state.webhook.as_ref() else {
        error!("Webhook received but no webhook secret is configured");
        return json_response(StatusCode::INTERNAL_SERVER_ERROR, &json!({ "error": "Webhook secret not configured" }));
    };

    match handler.handle(&body, header(&req, SIGNATURE_HEADER), Utc::now().timestamp()).await {
        Ok(_) => json_response(StatusCode::OK, &json!({ "received": true })),
        Err(e) => {
            warn!("Rejected webhook: {}", e);
            json_response(StatusCode::BAD_REQUEST, &json!({ "error": format!("Webhook Error: {}", e) }))
        }
    }
}

#[web::get("/public/{file_name}")]
async fn public_files(path: Path<String>, state: State<Arc<AppState>>) -> Result<NamedFile, web::Error> {
    if path.contains("..") || path.contains('/') || path.contains('\\') {
        return Err(web::error::ErrorUnauthorized("Access forbidden").into());
    }

    let file_path = state.settings.public_dir.join(path.into_inner());
    Ok(NamedFile::open(file_path)?)
}

fn routes(cfg: &mut web::ServiceConfig) {
    cfg.service(public_files)
        .service(checkout_sessions)
        .service(stripe_webhook)
        .service(cart_view)
        .service(cart_add)
        .service(cart_update)
        .service(cart_remove)
        .service(cart_clear)
        .service(cart_checkout)
        .service(home)
        .service(about)
        .service(locations)
        .service(shop)
        .service(journal)
        .service(journal_tag)
        .service(journal_article)
        .service(legal);
}

type Stores = (Arc<dyn ContentRepository>, Arc<dyn OrderStore>);

fn open_stores(repository: &Repository) -> io::Result<Stores> {
    match repository {
        Repository::Files { posts_dir, products_file } => {
            let repo = Arc::new(open_file_repository(posts_dir, products_file.as_deref())?);
            Ok((repo.clone(), repo))
        }
        Repository::Rest { url, api_key, .. } => {
            let api_key = api_key.clone().ok_or_else(|| {
                io::Error::new(ErrorKind::InvalidInput, "The rest repository needs an api_key or SUPABASE_SERVICE_ROLE_KEY")
            })?;
            let repo = RestRepository::new(url, api_key, repository.timeout())
                .map_err(|e| io::Error::new(ErrorKind::InvalidInput, e.to_string()))?;
            info!("Using rest repository at {}", url);
            let repo = Arc::new(repo);
            Ok((repo.clone(), repo))
        }
    }
}

/// Opens the stores and the payments client described by `config`.
pub fn build_state(config: &Config) -> io::Result<AppState> {
    let (content, orders) = open_stores(&config.repository)?;
    let payments = &config.payments;

    let gateway: Option<Arc<dyn PaymentsGateway>> = match &payments.secret_key {
        Some(key) => {
            let gateway = StripeGateway::new(payments.api_base(), key.clone(), payments.timeout())
                .map_err(|e| io::Error::new(ErrorKind::InvalidInput, e.to_string()))?;
            Some(Arc::new(gateway))
        }
        None => {
            warn!("No payments secret key configured. Checkout is disabled");
            None
        }
    };

    let webhook = match (&gateway, &payments.webhook_secret) {
        (Some(gateway), Some(secret)) => Some(WebhookHandler {
            gateway: gateway.clone(),
            orders,
            secret: secret.clone(),
            tolerance: payments.tolerance_secs(),
        }),
        _ => {
            warn!("No webhook secret configured. Orders will not be recorded");
            None
        }
    };

    let templates = Templates::load(&config.paths.template_dir)?;
    let dictionaries = Dictionaries::load()
        .map_err(|e| io::Error::new(ErrorKind::InvalidData, format!("Error parsing dictionaries: {}", e)))?;
    let cart_dir = config.paths.cart_dir();
    let carts = CartSessions::new(cart_dir.clone())
        .map_err(|e| io::Error::new(e.kind(), format!("Error creating cart dir {}: {}", cart_dir.display(), e)))?;
    info!("Keeping carts in {}", cart_dir.display());

    Ok(AppState {
        content,
        gateway,
        webhook,
        templates,
        dictionaries,
        carts,
        settings: SiteSettings {
            brand: config.journal.brand.clone(),
            page_size: config.journal.page_size,
            policy: config.journal.locale_policy,
            currency: payments.currency().to_string(),
            site_url: config.server.site_url(),
            public_dir: config.paths.public_dir.clone(),
        },
    })
}

pub async fn server_run(state: AppState, address: &str, port: u16) -> io::Result<()> {
    let app_state = Arc::new(state);

    web::HttpServer::new(move || {
        web::App::new()
            .state(app_state.clone())
            .configure(routes)
            .default_service(web::route().to(fallback))
    })
        .bind((address, port))?
        .run()
        .await
}
