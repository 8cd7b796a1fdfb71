use spdlog::warn;

use crate::journal::locale::{Locale, LocalePolicy};
use crate::journal::post::Post;
use crate::repository::ContentRepository;

pub const RELATED_LIMIT: usize = 4;
/// Below this many tag matches the list is topped up with the latest posts.
pub const MIN_TAG_MATCHES: usize = 2;
/// Fetched per lookup, so that locale filtering still leaves enough.
const CANDIDATE_LIMIT: usize = 24;

/// Tag matches first, then the latest posts when there are too few of them.
/// Duplicates are dropped by id and the list is capped.
pub fn merge_related(tag_matches: Vec<Post>, latest: Vec<Post>) -> Vec<Post> {
    let mut related: Vec<Post> = Vec::with_capacity(RELATED_LIMIT);
    for post in tag_matches {
        if !related.iter().any(|p| p.id == post.id) {
            related.push(post);
        }
    }
    if related.len() < MIN_TAG_MATCHES {
        for post in latest {
            if !related.iter().any(|p| p.id == post.id) {
                related.push(post);
            }
        }
    }
    related.truncate(RELATED_LIMIT);
    related
}

/// Posts to suggest under `post`, restricted to those readable in
/// `locale`. Candidates are filtered before the backfill threshold is
/// checked. Lookup failures shrink the list rather than fail the page.
pub async fn find_related(repo: &dyn ContentRepository, post: &Post, locale: Locale, policy: LocalePolicy) -> Vec<Post> {
    let visible = |posts: Vec<Post>| -> Vec<Post> {
        posts.into_iter()
            .filter(|p| p.id != post.id && p.is_listed_in(locale, policy))
            .collect()
    };

    let tag_matches = if post.tags.is_empty() {
        vec![]
    } else {
        repo.posts_sharing_tags(&post.tags, &post.id, CANDIDATE_LIMIT).await
            .map(visible)
            .unwrap_or_else(|e| {
                warn!("Related posts by tag for {} failed: {}", post.slug, e);
                vec![]
            })
    };

    let latest = if tag_matches.len() < MIN_TAG_MATCHES {
        repo.latest_posts(&post.id, CANDIDATE_LIMIT).await
            .map(visible)
            .unwrap_or_else(|e| {
                warn!("Latest posts for {} failed: {}", post.slug, e);
                vec![]
            })
    } else {
        vec![]
    };

    merge_related(tag_matches, latest)
}
