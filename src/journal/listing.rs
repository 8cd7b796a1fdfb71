use spdlog::error;

use crate::journal::locale::{Locale, LocalePolicy};
use crate::journal::post::Post;
use crate::paginator::Paginator;
use crate::repository::ContentRepository;

/// One page of the journal index. The newest post is featured on the
/// first page only.
#[derive(Debug, Clone, Default)]
pub struct JournalPage {
    pub featured: Option<Post>,
    pub recent: Vec<Post>,
    pub page: u32,
    pub page_count: u32,
}

impl JournalPage {
    pub fn is_empty(&self) -> bool {
        self.featured.is_none() && self.recent.is_empty()
    }
}

pub fn paginate(posts: &[Post], page: u32, page_size: u32) -> JournalPage {
    let paginator = Paginator::from(posts, page_size);
    let page = paginator.clamp(page);
    let mut items = paginator.get_page(page).unwrap_or(&[]).to_vec();

    let featured = if page == 1 && !items.is_empty() {
        Some(items.remove(0))
    } else {
        None
    };
    JournalPage {
        featured,
        recent: items,
        page,
        page_count: paginator.page_count(),
    }
}

/// Published posts visible in `locale`, newest first. A failed lookup
/// reads as an empty journal.
pub async fn listed_posts(repo: &dyn ContentRepository, locale: Locale, policy: LocalePolicy) -> Vec<Post> {
    match repo.published_posts().await {
        Ok(posts) => posts.into_iter().filter(|p| p.is_listed_in(locale, policy)).collect(),
        Err(e) => {
            error!("Loading journal posts: {}", e);
            vec![]
        }
    }
}

pub async fn tagged_posts(repo: &dyn ContentRepository, tag: &str, locale: Locale, policy: LocalePolicy) -> Vec<Post> {
    match repo.posts_with_tag(tag).await {
        Ok(posts) => posts.into_iter().filter(|p| p.is_listed_in(locale, policy)).collect(),
        Err(e) => {
            error!("Loading posts tagged {}: {}", tag, e);
            vec![]
        }
    }
}
