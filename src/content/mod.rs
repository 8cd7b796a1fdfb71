use serde::Serialize;

pub mod editorial_parser;
pub mod block_renderer;
pub mod parsing_utils;
pub mod variant;

/// One typed chunk of an article body.
///
/// Blocks carry no position: the order of the vector they live in is the
/// reading order of the source text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ContentBlock {
    Tldr { content: String },
    Note { content: String },
    Quote { content: String },
    Map { url: String, caption: Option<String> },
    Markdown { content: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockKind {
    Tldr,
    Note,
    Quote,
    Map,
    Markdown,
}

impl ContentBlock {
    pub fn kind(&self) -> BlockKind {
        match self {
            ContentBlock::Tldr { .. } => BlockKind::Tldr,
            ContentBlock::Note { .. } => BlockKind::Note,
            ContentBlock::Quote { .. } => BlockKind::Quote,
            ContentBlock::Map { .. } => BlockKind::Map,
            ContentBlock::Markdown { .. } => BlockKind::Markdown,
        }
    }

    /// Plain text carried by the block, without any editorial prefix.
    pub fn text(&self) -> String {
        match self {
            ContentBlock::Tldr { content }
            | ContentBlock::Note { content }
            | ContentBlock::Quote { content }
            | ContentBlock::Markdown { content } => content.clone(),
            ContentBlock::Map { url, caption } => match caption {
                Some(caption) => format!("{} {}", url, caption),
                None => url.clone(),
            },
        }
    }
}

impl BlockKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BlockKind::Tldr => "tldr",
            BlockKind::Note => "note",
            BlockKind::Quote => "quote",
            BlockKind::Map => "map",
            BlockKind::Markdown => "markdown",
        }
    }
}
