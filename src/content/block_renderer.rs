use markdown::Options;
use serde::Serialize;
use spdlog::warn;
use thiserror::Error;
use url::Url;

use crate::content::editorial_parser::parse_editorial;
use crate::content::parsing_utils::remove_comments;
use crate::content::variant::Variant;
use crate::content::{BlockKind, ContentBlock};

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("markdown: {0}")]
    Markdown(String),
    #[error("comment: {0}")]
    Comment(#[from] std::io::Error),
    #[error("unusable image reference `{0}`")]
    ImageUrl(String),
}

/// Headings shown on the boxed blocks. Localized by the caller.
#[derive(Debug, Clone)]
pub struct BlockLabels {
    pub abstract_label: String,
    pub note_label: String,
}

impl Default for BlockLabels {
    fn default() -> Self {
        BlockLabels {
            abstract_label: "Abstract / TL;DR".to_string(),
            note_label: "Editor's Note".to_string(),
        }
    }
}

/// One presentation unit: a block and the HTML fragment it turned into.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderedBlock {
    pub kind: BlockKind,
    pub html: String,
    /// Set when the block could not be rendered and was shown as plain text.
    pub degraded: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ArticleBody {
    pub variant: Variant,
    pub blocks: Vec<RenderedBlock>,
}

impl ArticleBody {
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn to_html(&self) -> String {
        if self.blocks.is_empty() {
            return String::new();
        }
        let mut html = format!("<div class=\"journal-prose journal-variant-{}\">\n", self.variant);
        for block in &self.blocks {
            html.push_str(&block.html);
            html.push('\n');
        }
        html.push_str("</div>\n");
        html
    }
}

#[derive(Default)]
pub struct BlockRenderer {
    labels: BlockLabels,
}

/// Parses and renders an article body with the default labels.
pub fn render_article_body(content: Option<&str>, slug: Option<&str>, variant_override: Option<&str>) -> ArticleBody {
    BlockRenderer::default().render_article_body(content, slug, variant_override)
}

impl BlockRenderer {
    pub fn new(labels: BlockLabels) -> Self {
        BlockRenderer { labels }
    }

    pub fn render_article_body(&self, content: Option<&str>, slug: Option<&str>, variant_override: Option<&str>) -> ArticleBody {
        let variant = Variant::select(slug, variant_override);
        let blocks = parse_editorial(content);
        ArticleBody {
            variant,
            blocks: self.render_blocks(&blocks),
        }
    }

    pub fn render_blocks(&self, blocks: &[ContentBlock]) -> Vec<RenderedBlock> {
        blocks.iter().map(|block| self.render_isolated(block)).collect()
    }

    /// A block that fails to render never takes the page down with it.
    fn render_isolated(&self, block: &ContentBlock) -> RenderedBlock {
        match self.render_block(block) {
            Ok(html) => RenderedBlock { kind: block.kind(), html, degraded: false },
            Err(e) => {
                warn!("Rendering {} block as plain text: {}", block.kind().as_str(), e);
                RenderedBlock {
                    kind: block.kind(),
                    html: format!("<p class=\"editorial-fallback\">{}</p>", escape(&block.text())),
                    degraded: true,
                }
            }
        }
    }

    pub fn render_block(&self, block: &ContentBlock) -> Result<String, RenderError> {
        match block {
            ContentBlock::Tldr { content } => Ok(format!(
                "<section class=\"editorial-tldr\">\n<h3>{}</h3>\n<div class=\"editorial-tldr-body\">{}</div>\n</section>",
                escape(&self.labels.abstract_label),
                escape_multiline(content),
            )),
            ContentBlock::Note { content } => Ok(format!(
                "<aside class=\"editorial-note\" role=\"note\">\n<span class=\"editorial-note-label\">{}</span>\n<div class=\"editorial-note-body\">{}</div>\n</aside>",
                escape(&self.labels.note_label),
                escape_multiline(content),
            )),
            ContentBlock::Quote { content } => Ok(format!(
                "<figure class=\"editorial-pullquote\">\n<blockquote><p>\u{201C}{}\u{201D}</p></blockquote>\n</figure>",
                escape_multiline(content),
            )),
            ContentBlock::Map { url, caption } => render_map(url, caption.as_deref()),
            ContentBlock::Markdown { content } => render_markdown(content),
        }
    }
}

fn render_map(url: &str, caption: Option<&str>) -> Result<String, RenderError> {
    check_image_url(url)?;
    let alt = caption.unwrap_or("");
    let mut html = format!(
        "<figure class=\"editorial-map\">\n<img src=\"{}\" alt=\"{}\" loading=\"lazy\">",
        html_escape::encode_double_quoted_attribute(url),
        html_escape::encode_double_quoted_attribute(alt),
    );
    if let Some(caption) = caption {
        html.push_str(&format!("\n<figcaption>\u{1F4CD} {}</figcaption>", escape(caption)));
    }
    html.push_str("\n</figure>");
    Ok(html)
}

/// Absolute http(s) URLs and site-relative paths are accepted.
fn check_image_url(url: &str) -> Result<(), RenderError> {
    if url.is_empty() || url.chars().any(char::is_whitespace) {
        return Err(RenderError::ImageUrl(url.to_string()));
    }
    if url.starts_with('/') && !url.starts_with("//") {
        return Ok(());
    }
    match Url::parse(url) {
        Ok(parsed) if parsed.scheme() == "http" || parsed.scheme() == "https" => Ok(()),
        _ => Err(RenderError::ImageUrl(url.to_string())),
    }
}

fn render_markdown(md_text: &str) -> Result<String, RenderError> {
    let buf = remove_comments(md_text)?;
    let html = markdown::to_html_with_options(buf.as_str(), &Options::gfm())
        .map_err(|e| RenderError::Markdown(e.reason.to_string()))?;
    Ok(format!("<div class=\"editorial-prose\">\n{}\n</div>", html.trim_end()))
}

fn escape(text: &str) -> String {
    html_escape::encode_text(text).to_string()
}

fn escape_multiline(text: &str) -> String {
    escape(text).replace('\n', "<br>\n")
}
