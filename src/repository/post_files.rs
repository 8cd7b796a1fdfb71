use std::{fs, io};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Deserialize;
use spdlog::{info, warn};

use crate::content::parsing_utils::{collect_body, parse_post_header};
use crate::journal::post::{Post, PostId};
use crate::repository::memory::MemoryRepository;
use crate::shop::Product;
use crate::text_utils::parse_date_time;

/// Line that starts the Chinese body of a journal file.
const ZH_MARKER: &str = "<!-- zh -->";
const DIR_POST_FILE: &str = "index.md";

/// Journal files under a directory: `<slug>.md` or `<slug>/index.md`.
pub struct PostList {
    pub root_dir: PathBuf,
}

impl PostList {
    /// Paths paired with the slug implied by their name.
    pub fn retrieve(&self) -> io::Result<Vec<(PathBuf, String)>> {
        let mut posts = vec![];
        for entry in fs::read_dir(self.root_dir.as_path())? {
            let entry = entry?;
            let file_type = entry.file_type()?;
            let path = entry.path();
            let Some(name) = path.file_name().and_then(|n| n.to_str()).map(|n| n.to_string()) else {
                continue;
            };

            if file_type.is_file() {
                if let Some(stem) = name.strip_suffix(".md") {
                    posts.push((path.clone(), stem.to_string()));
                }
            } else if file_type.is_dir() {
                let index = path.join(DIR_POST_FILE);
                if index.is_file() {
                    posts.push((index, name));
                }
            }
        }
        posts.sort();
        Ok(posts)
    }
}

pub fn read_post(file_name: &Path, default_slug: &str) -> io::Result<Post> {
    let raw = fs::read_to_string(file_name)?;
    parse_post(file_name, &raw, default_slug)
}

pub fn parse_post(file_name: &Path, raw: &str, default_slug: &str) -> io::Result<Post> {
    let (header, lines, first_line) = parse_post_header(file_name, raw.lines())?;
    let body = collect_body(lines, first_line);

    let (content_en, content_zh) = match body.split_once(&format!("\n{}\n", ZH_MARKER)) {
        Some((en, zh)) => (en.to_string(), zh.to_string()),
        None if body.starts_with(ZH_MARKER) => (String::new(), body[ZH_MARKER.len()..].to_string()),
        None => (body, String::new()),
    };

    let created_at = parse_date_time(&header.date)
        .map_err(|e| io::Error::new(ErrorKind::InvalidData, format!("{} - file={}", e, file_name.display())))?;
    let created_at = DateTime::<Utc>::from_naive_utc_and_offset(created_at, Utc);

    let slug = if header.slug.is_empty() { default_slug.to_string() } else { header.slug };
    let id = if header.id.is_empty() { slug.clone() } else { header.id };

    Ok(Post {
        id: PostId(id),
        slug,
        title_en: header.title_en,
        title_zh: header.title_zh,
        content_en: non_blank(content_en),
        content_zh: non_blank(content_zh),
        tags: header.tags,
        category: header.category,
        published: header.published,
        created_at,
        image_url: header.image,
        reading_time: header.reading_time,
    })
}

fn non_blank(text: String) -> Option<String> {
    if text.trim().is_empty() {
        None
    } else {
        Some(text.trim_matches('\n').to_string())
    }
}

/// Reads every journal file in `posts_dir`. Files that cannot be parsed
/// are skipped and logged.
pub fn load_posts(posts_dir: &Path) -> io::Result<Vec<Post>> {
    let post_list = PostList { root_dir: posts_dir.to_path_buf() };
    let mut posts = vec![];
    for (path, slug) in post_list.retrieve()? {
        match read_post(&path, &slug) {
            Ok(post) => posts.push(post),
            Err(e) => warn!("Skipping journal file {}: {}", path.display(), e),
        }
    }
    Ok(posts)
}

#[derive(Deserialize)]
struct ProductFile {
    #[serde(default)]
    product: Vec<Product>,
}

pub fn load_products(products_file: &Path) -> io::Result<Vec<Product>> {
    let raw = fs::read_to_string(products_file)?;
    let parsed: ProductFile = toml::from_str(&raw)
        .map_err(|e| io::Error::new(ErrorKind::InvalidData, format!("{} - file={}", e, products_file.display())))?;
    Ok(parsed.product)
}

/// Posts from `posts_dir` and products from `products_file`, when present.
pub fn open_file_repository(posts_dir: &Path, products_file: Option<&Path>) -> io::Result<MemoryRepository> {
    let posts = load_posts(posts_dir)?;
    let products = match products_file {
        Some(path) if path.exists() => load_products(path)?,
        Some(path) => {
            warn!("Products file {} not found, shop is empty", path.display());
            vec![]
        }
        None => vec![],
    };
    info!("Loaded {} journal files and {} products", posts.len(), products.len());
    Ok(MemoryRepository::new(posts, products))
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use crate::repository::ContentRepository;

    use super::*;

    const BOB: &str = r##"<!--
[ID]: # (21c1e9ad-4ebb-4168-a543-fbf77cc35a85)
[DATE]: # (2024-02-12 22:54:00.000)
[TAGS]: # (cuts bob)
[PUBLISHED]: # (true)
[TITLE_EN]: # (The art of the bob)
[TITLE_ZH]: # (鮑伯頭的藝術)
-->
TL;DR: Short and sharp.

A bob is geometry.
<!-- zh -->
TL;DR: 俐落。
"##;

    #[test]
    fn test_parse_post() {
        let post = parse_post(Path::new("posts/the-art-of-the-bob.md"), BOB, "the-art-of-the-bob").unwrap();
        assert_eq!(post.id, PostId("21c1e9ad-4ebb-4168-a543-fbf77cc35a85".to_string()));
        assert_eq!(post.slug, "the-art-of-the-bob");
        assert_eq!(post.tags, vec!["cuts", "bob"]);
        assert!(post.published);
        assert_eq!(post.created_at, Utc.with_ymd_and_hms(2024, 2, 12, 22, 54, 0).unwrap());
        assert_eq!(post.content_en.as_deref(), Some("TL;DR: Short and sharp.\n\nA bob is geometry."));
        assert_eq!(post.content_zh.as_deref(), Some("TL;DR: 俐落。"));
        assert_eq!(post.title_zh.as_deref(), Some("鮑伯頭的藝術"));
    }

    #[test]
    fn test_parse_post_english_only() {
        let raw = "[DATE]: # (2024-03-01)\n[SLUG]: # (custom)\n\nJust prose.\n";
        let post = parse_post(Path::new("x.md"), raw, "x").unwrap();
        assert_eq!(post.slug, "custom");
        assert_eq!(post.id, PostId("custom".to_string()));
        assert!(!post.published);
        assert_eq!(post.content_zh, None);
    }

    #[test]
    fn test_bad_date_is_an_error() {
        let raw = "[DATE]: # (someday)\n\nBody";
        assert!(parse_post(Path::new("x.md"), raw, "x").is_err());
    }

    #[tokio::test]
    async fn test_open_file_repository() -> io::Result<()> {
        let dir = tempfile::tempdir()?;
        fs::write(dir.path().join("the-art-of-the-bob.md"), BOB)?;
        fs::create_dir(dir.path().join("summer-colour-guide"))?;
        fs::write(
            dir.path().join("summer-colour-guide").join("index.md"),
            "[DATE]: # (2024-06-01 10:00:00)\n[PUBLISHED]: # (true)\n[TITLE_EN]: # (Summer colour)\n\nWarm tones.\n",
        )?;
        fs::write(dir.path().join("broken.md"), "no header here")?;
        fs::write(dir.path().join("notes.txt"), "ignored")?;

        let products = dir.path().join("products.toml");
        fs::write(&products, r#"
[[product]]
id = "p2"
slug = "conditioner"
name_en = "Conditioner"
stripe_price_id = "price_2"
price = 30.0

[[product]]
id = "p1"
slug = "shampoo"
name_en = "Balancing Shampoo"
name_zh = "平衡洗髮精"
stripe_price_id = "price_1"
price = 28.0
inventory_count = 0
"#)?;

        let repo = open_file_repository(dir.path(), Some(&products))?;
        let posts = repo.published_posts().await.unwrap();
        let slugs: Vec<&str> = posts.iter().map(|p| p.slug.as_str()).collect();
        assert_eq!(slugs, vec!["summer-colour-guide", "the-art-of-the-bob"]);

        let names: Vec<String> = repo.products().await.unwrap().into_iter().map(|p| p.name_en).collect();
        assert_eq!(names, vec!["Balancing Shampoo", "Conditioner"]);
        Ok(())
    }
}
