use lazy_static::lazy_static;
use regex::Regex;

use crate::content::ContentBlock;

const TLDR_TOKEN: &str = "TL;DR:";
const NOTE_TOKEN: &str = "NOTE:";
const QUOTE_TOKEN: &str = "QUOTE:";
const MAP_TOKEN: &str = "MAP:";

/// Splits an article body into editorial blocks.
///
/// Chunks are separated by blank lines. A chunk starting with one of the
/// editorial tokens becomes a block of that type, anything else is markdown.
/// Consecutive markdown chunks are joined back together so lists and tables
/// written with loose spacing survive.
pub fn parse_editorial(content: Option<&str>) -> Vec<ContentBlock> {
    lazy_static! {
        static ref CHUNK_SEPARATOR: Regex = Regex::new(r"\n\s*\n+").unwrap();
    }

    let content = match content {
        Some(c) if !c.is_empty() => c,
        _ => return vec![],
    };

    let normalized = normalize_newlines(content);
    let mut blocks: Vec<ContentBlock> = vec![];

    for chunk in CHUNK_SEPARATOR.split(&normalized) {
        let trimmed = chunk.trim();
        if trimmed.is_empty() {
            continue;
        }

        if let Some(block) = classify_token(trimmed) {
            blocks.push(block);
            continue;
        }

        match blocks.last_mut() {
            Some(ContentBlock::Markdown { content }) => {
                content.push_str("\n\n");
                content.push_str(chunk);
            }
            _ => blocks.push(ContentBlock::Markdown { content: chunk.to_string() }),
        }
    }

    blocks
}

fn normalize_newlines(content: &str) -> String {
    // Bodies pasted through the admin editor sometimes carry escaped newlines
    content.replace("\\n", "\n").replace("\r\n", "\n")
}

fn classify_token(chunk: &str) -> Option<ContentBlock> {
    if let Some(rest) = chunk.strip_prefix(TLDR_TOKEN) {
        return Some(ContentBlock::Tldr { content: token_payload(rest) });
    }
    if let Some(rest) = chunk.strip_prefix(NOTE_TOKEN) {
        return Some(ContentBlock::Note { content: token_payload(rest) });
    }
    if let Some(rest) = chunk.strip_prefix(QUOTE_TOKEN) {
        return Some(ContentBlock::Quote { content: token_payload(rest) });
    }
    if let Some(rest) = chunk.strip_prefix(MAP_TOKEN) {
        let raw = token_payload(rest);
        let (url, caption) = match raw.split_once('|') {
            Some((url, caption)) => (url.trim(), Some(caption.trim())),
            None => (raw.trim(), None),
        };
        let caption = caption.filter(|c| !c.is_empty()).map(|c| c.to_string());
        return Some(ContentBlock::Map { url: url.to_string(), caption });
    }
    None
}

fn token_payload(rest: &str) -> String {
    rest.strip_prefix(' ').unwrap_or(rest).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn markdown(s: &str) -> ContentBlock {
        ContentBlock::Markdown { content: s.to_string() }
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(parse_editorial(None), vec![]);
        assert_eq!(parse_editorial(Some("")), vec![]);
        assert_eq!(parse_editorial(Some("  \n\n \n")), vec![]);
    }

    #[test]
    fn test_paragraphs_merge() {
        let blocks = parse_editorial(Some("para1\n\npara2"));
        assert_eq!(blocks, vec![markdown("para1\n\npara2")]);
    }

    #[test]
    fn test_note_then_prose() {
        let blocks = parse_editorial(Some("NOTE: hello\n\nSome prose."));
        assert_eq!(blocks, vec![
            ContentBlock::Note { content: "hello".to_string() },
            markdown("Some prose."),
        ]);
    }

    #[test]
    fn test_map_split() {
        let blocks = parse_editorial(Some("MAP: https://example.com/img.png | City Center"));
        assert_eq!(blocks, vec![ContentBlock::Map {
            url: "https://example.com/img.png".to_string(),
            caption: Some("City Center".to_string()),
        }]);
    }

    #[test]
    fn test_map_without_caption() {
        let blocks = parse_editorial(Some("MAP: /public/salon.png"));
        assert_eq!(blocks, vec![ContentBlock::Map { url: "/public/salon.png".to_string(), caption: None }]);

        let blocks = parse_editorial(Some("MAP: /public/salon.png |  "));
        assert_eq!(blocks, vec![ContentBlock::Map { url: "/public/salon.png".to_string(), caption: None }]);
    }

    #[test]
    fn test_map_caption_keeps_later_pipes() {
        let blocks = parse_editorial(Some("MAP: /a.png | Taipei | Da'an"));
        assert_eq!(blocks, vec![ContentBlock::Map {
            url: "/a.png".to_string(),
            caption: Some("Taipei | Da'an".to_string()),
        }]);
    }

    #[test]
    fn test_single_token_document() {
        let blocks = parse_editorial(Some("TL;DR: Short version."));
        assert_eq!(blocks, vec![ContentBlock::Tldr { content: "Short version.".to_string() }]);
    }

    #[test]
    fn test_tokens_never_merge() {
        let blocks = parse_editorial(Some("QUOTE: one\n\nQUOTE: two\n\nNOTE: three"));
        assert_eq!(blocks, vec![
            ContentBlock::Quote { content: "one".to_string() },
            ContentBlock::Quote { content: "two".to_string() },
            ContentBlock::Note { content: "three".to_string() },
        ]);
    }

    #[test]
    fn test_token_splits_markdown_runs() {
        let text = "Intro\n\n- a\n- b\n\nQUOTE: Hair is architecture.\n\nOutro one\n\n\n\nOutro two";
        let blocks = parse_editorial(Some(text));
        assert_eq!(blocks, vec![
            markdown("Intro\n\n- a\n- b"),
            ContentBlock::Quote { content: "Hair is architecture.".to_string() },
            markdown("Outro one\n\nOutro two"),
        ]);
    }

    #[test]
    fn test_tokens_are_case_sensitive() {
        let blocks = parse_editorial(Some("note: lower case\n\nTl;dr: nope"));
        assert_eq!(blocks, vec![markdown("note: lower case\n\nTl;dr: nope")]);
    }

    #[test]
    fn test_token_payload_only_drops_one_space() {
        let blocks = parse_editorial(Some("NOTE:  two spaces"));
        assert_eq!(blocks, vec![ContentBlock::Note { content: " two spaces".to_string() }]);

        let blocks = parse_editorial(Some("NOTE:tight"));
        assert_eq!(blocks, vec![ContentBlock::Note { content: "tight".to_string() }]);
    }

    #[test]
    fn test_token_after_leading_whitespace() {
        let blocks = parse_editorial(Some("   NOTE: indented"));
        assert_eq!(blocks, vec![ContentBlock::Note { content: "indented".to_string() }]);
    }

    #[test]
    fn test_normalizes_line_endings() {
        let blocks = parse_editorial(Some("NOTE: crlf\r\n\r\nbody"));
        assert_eq!(blocks, vec![ContentBlock::Note { content: "crlf".to_string() }, markdown("body")]);

        let blocks = parse_editorial(Some(r"TL;DR: escaped\n\nbody"));
        assert_eq!(blocks, vec![ContentBlock::Tldr { content: "escaped".to_string() }, markdown("body")]);
    }

    #[test]
    fn test_blank_line_with_spaces_separates() {
        let blocks = parse_editorial(Some("NOTE: a\n   \t\nb"));
        assert_eq!(blocks, vec![ContentBlock::Note { content: "a".to_string() }, markdown("b")]);
    }

    #[test]
    fn test_markdown_chunk_is_not_trimmed() {
        let blocks = parse_editorial(Some("    let x = 1;\n\nNOTE: code above"));
        assert_eq!(blocks[0], markdown("    let x = 1;"));
    }

    #[test]
    fn test_chinese_passes_through() {
        let text = "TL;DR: 剪髮是一種建築。\n\n我們在台北的第一間沙龍。\n\nNOTE: 預約請提前一週。";
        let blocks = parse_editorial(Some(text));
        assert_eq!(blocks, vec![
            ContentBlock::Tldr { content: "剪髮是一種建築。".to_string() },
            markdown("我們在台北的第一間沙龍。"),
            ContentBlock::Note { content: "預約請提前一週。".to_string() },
        ]);
    }

    #[test]
    fn test_parse_is_idempotent() {
        let text = "TL;DR: x\n\n# Title\n\nbody\n\nMAP: /m.png | here\n\nNOTE: y\n\n| a | b |\n|---|---|\n\n| 1 | 2 |";
        assert_eq!(parse_editorial(Some(text)), parse_editorial(Some(text)));
    }

    #[test]
    fn test_no_text_is_dropped() {
        let text = "TL;DR: alpha\n\nbeta gamma\n\nQUOTE: delta\n\nMAP: /e.png | epsilon\n\nzeta\n\nNOTE: eta";
        let blocks = parse_editorial(Some(text));
        let joined: Vec<String> = blocks.iter().map(|b| b.text()).collect();
        let joined = joined.join(" ");
        for word in ["alpha", "beta", "gamma", "delta", "/e.png", "epsilon", "zeta", "eta"] {
            assert!(joined.contains(word), "missing {}", word);
        }
    }
}
