use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::journal::locale::{localized, Locale, LocalePolicy};
use crate::text_utils::reading_minutes;

#[derive(Debug, Clone, Eq, Hash, PartialEq, PartialOrd, Ord, Deserialize, Serialize)]
#[serde(transparent)]
pub struct PostId(pub String);

/// A journal post as stored in the content repository.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Post {
    pub id: PostId,
    pub slug: String,
    #[serde(default)]
    pub title_en: Option<String>,
    #[serde(default)]
    pub title_zh: Option<String>,
    #[serde(default)]
    pub content_en: Option<String>,
    #[serde(default)]
    pub content_zh: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub tags: Vec<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub published: bool,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub reading_time: Option<u32>,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}

impl Post {
    pub fn title(&self, locale: Locale, policy: LocalePolicy) -> Option<&str> {
        localized(locale, policy, self.title_en.as_deref(), self.title_zh.as_deref())
    }

    pub fn content(&self, locale: Locale, policy: LocalePolicy) -> Option<&str> {
        localized(locale, policy, self.content_en.as_deref(), self.content_zh.as_deref())
    }

    /// Whether the post shows up in listings for `locale`.
    pub fn is_listed_in(&self, locale: Locale, policy: LocalePolicy) -> bool {
        match policy {
            LocalePolicy::Fallback => true,
            LocalePolicy::Strict => self.title(locale, policy).is_some(),
        }
    }

    pub fn shares_tag_with(&self, tags: &[String]) -> bool {
        self.tags.iter().any(|t| tags.contains(t))
    }

    pub fn reading_minutes(&self, locale: Locale, policy: LocalePolicy) -> u32 {
        match self.reading_time {
            Some(minutes) if minutes > 0 => minutes,
            _ => reading_minutes(self.content(locale, policy).unwrap_or("")),
        }
    }
}

#[cfg(test)]
pub mod test_posts {
    use chrono::{Duration, TimeZone, Utc};

    use super::*;

    /// Published post created `day` days after 2024-01-01.
    pub fn post(id: &str, day: i64, tags: &[&str]) -> Post {
        let base = Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap();
        Post {
            id: PostId(id.to_string()),
            slug: format!("post-{}", id),
            title_en: Some(format!("Title {}", id)),
            title_zh: None,
            content_en: Some(format!("Body of {}", id)),
            content_zh: None,
            tags: tags.iter().map(|t| t.to_string()).collect(),
            category: None,
            published: true,
            created_at: base + Duration::days(day),
            image_url: None,
            reading_time: None,
        }
    }
}
