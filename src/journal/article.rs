use spdlog::{error, warn};

use crate::content::block_renderer::{ArticleBody, BlockRenderer};
use crate::journal::locale::{Locale, LocalePolicy};
use crate::journal::post::Post;
use crate::journal::related::find_related;
use crate::repository::{ContentRepository, PostLink};

/// Everything the article page shows for one post.
#[derive(Debug, Clone)]
pub struct Article {
    pub post: Post,
    pub title: String,
    pub body: ArticleBody,
    pub reading_minutes: u32,
    pub serial: u32,
    pub previous: Option<PostLink>,
    pub next: Option<PostLink>,
    pub related: Vec<Post>,
}

/// `None` means the page is a 404: unknown slug, lookup failure, or under
/// strict locale policy a post with nothing in `locale`.
pub async fn load_article(
    repo: &dyn ContentRepository,
    renderer: &BlockRenderer,
    slug: &str,
    locale: Locale,
    policy: LocalePolicy,
    variant_override: Option<&str>,
) -> Option<Article> {
    let post = match repo.post_by_slug(slug).await {
        Ok(Some(post)) => post,
        Ok(None) => return None,
        Err(e) => {
            error!("Loading journal post {}: {}", slug, e);
            return None;
        }
    };

    if !post.is_listed_in(locale, policy) {
        return None;
    }
    let content = post.content(locale, policy);
    if policy == LocalePolicy::Strict && content.is_none() {
        return None;
    }

    let body = renderer.render_article_body(content, Some(post.slug.as_str()), variant_override);
    let title = post.title(locale, policy).unwrap_or("").to_string();
    let reading_minutes = post.reading_minutes(locale, policy);

    let (previous, next) = neighbours(repo, &post, locale, policy).await;

    let serial = repo.serial_number(&post).await.unwrap_or_else(|e| {
        warn!("Serial number for {}: {}", slug, e);
        1
    });

    let related = find_related(repo, &post, locale, policy).await;

    Some(Article {
        post,
        title,
        body,
        reading_minutes,
        serial,
        previous,
        next,
        related,
    })
}

fn link_or_log<E: std::fmt::Display>(found: Result<Option<PostLink>, E>, slug: &str) -> Option<PostLink> {
    found.unwrap_or_else(|e| {
        warn!("Neighbour of {}: {}", slug, e);
        None
    })
}

/// Older and newer posts around `post`. Under strict policy the links skip
/// over posts with no title in `locale` to the nearest readable one.
async fn neighbours(repo: &dyn ContentRepository, post: &Post, locale: Locale, policy: LocalePolicy) -> (Option<PostLink>, Option<PostLink>) {
    if policy == LocalePolicy::Fallback {
        let previous = link_or_log(repo.previous_post(post).await, &post.slug);
        let next = link_or_log(repo.next_post(post).await, &post.slug);
        return (previous, next);
    }

    let posts = match repo.published_posts().await {
        Ok(posts) => posts,
        Err(e) => {
            warn!("Neighbours of {}: {}", post.slug, e);
            return (None, None);
        }
    };
    let readable = |p: &&Post| p.title(locale, policy).is_some();
    let previous = posts.iter()
        .filter(|p| p.created_at < post.created_at)
        .filter(readable)
        .max_by_key(|p| p.created_at)
        .map(PostLink::from);
    let next = posts.iter()
        .filter(|p| p.created_at > post.created_at)
        .filter(readable)
        .min_by_key(|p| p.created_at)
        .map(PostLink::from);
    (previous, next)
}

#[cfg(test)]
mod tests {
    use crate::content::variant::Variant;
    use crate::journal::post::test_posts::post;
    use crate::repository::memory::MemoryRepository;

    use super::*;

    fn repository() -> MemoryRepository {
        let mut bilingual = post("2", 1, &["cuts"]);
        bilingual.slug = "hello".to_string();
        bilingual.title_zh = Some("你好".to_string());
        bilingual.content_en = Some("TL;DR: Short.\n\nProse.".to_string());
        bilingual.content_zh = Some("TL;DR: 簡短。".to_string());
        MemoryRepository::new(vec![post("1", 0, &["cuts"]), bilingual, post("3", 2, &[])], vec![])
    }

    #[tokio::test]
    async fn test_load_article() {
        let repo = repository();
        let renderer = BlockRenderer::default();
        let article = load_article(&repo, &renderer, "hello", Locale::Zh, LocalePolicy::Fallback, None).await.unwrap();

        assert_eq!(article.title, "你好");
        assert_eq!(article.body.variant, Variant::Cards);
        assert_eq!(article.body.blocks.len(), 1);
        assert!(article.body.to_html().contains("簡短。"));
        assert_eq!(article.serial, 2);
        assert_eq!(article.previous.unwrap().slug, "post-1");
        assert_eq!(article.next.unwrap().slug, "post-3");
        assert_eq!(article.related.len(), 2);
    }

    #[tokio::test]
    async fn test_variant_override() {
        let repo = repository();
        let renderer = BlockRenderer::default();
        let article = load_article(&repo, &renderer, "hello", Locale::En, LocalePolicy::Fallback, Some("sidebar")).await.unwrap();
        assert_eq!(article.body.variant, Variant::Sidebar);
    }

    #[tokio::test]
    async fn test_missing_and_strict() {
        let repo = repository();
        let renderer = BlockRenderer::default();
        assert!(load_article(&repo, &renderer, "nope", Locale::En, LocalePolicy::Fallback, None).await.is_none());

        // English only post: shown with fallback, hidden under strict.
        assert!(load_article(&repo, &renderer, "post-1", Locale::Zh, LocalePolicy::Fallback, None).await.is_some());
        assert!(load_article(&repo, &renderer, "post-1", Locale::Zh, LocalePolicy::Strict, None).await.is_none());

        let article = load_article(&repo, &renderer, "hello", Locale::Zh, LocalePolicy::Strict, None).await.unwrap();
        assert!(article.previous.is_none());
        assert!(article.next.is_none());
        assert!(article.related.is_empty());
    }

    #[tokio::test]
    async fn test_strict_skips_to_readable_neighbours() {
        let zh = |id: &str, day: i64, tags: &[&str]| {
            let mut p = post(id, day, tags);
            p.title_zh = Some(format!("標題 {}", id));
            p.content_zh = Some(format!("內文 {}", id));
            p
        };
        let mut current = zh("cur", 2, &["cuts"]);
        current.slug = "current".to_string();
        let repo = MemoryRepository::new(vec![
            zh("zh-old", 0, &[]),
            post("en-old", 1, &["cuts"]),
            current,
            post("en-new", 3, &["cuts"]),
            zh("zh-new", 4, &[]),
        ], vec![]);
        let renderer = BlockRenderer::default();

        let article = load_article(&repo, &renderer, "current", Locale::Zh, LocalePolicy::Strict, None).await.unwrap();
        assert_eq!(article.previous.unwrap().slug, "post-zh-old");
        assert_eq!(article.next.unwrap().slug, "post-zh-new");
        let related: Vec<&str> = article.related.iter().map(|p| p.id.0.as_str()).collect();
        assert_eq!(related, vec!["zh-new", "zh-old"]);

        let article = load_article(&repo, &renderer, "current", Locale::Zh, LocalePolicy::Fallback, None).await.unwrap();
        assert_eq!(article.previous.unwrap().slug, "post-en-old");
        assert_eq!(article.next.unwrap().slug, "post-en-new");
    }
}
