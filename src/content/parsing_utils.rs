use std::io;
use std::io::ErrorKind;
use std::path::Path;
use std::str::Lines;

use lazy_static::lazy_static;
use regex::Regex;

/// Metadata block at the top of a journal file.
///
/// ```text
/// <!--
/// [ID]: # (a63bd715-a3fe-4788-b0e1-2a3153778544)
/// [SLUG]: # (the-art-of-the-bob)
/// [DATE]: # (2024-04-02 12:05:00.000)
/// [TAGS]: # (cuts bob)
/// [PUBLISHED]: # (true)
/// [TITLE_EN]: # (The art of the bob)
/// [TITLE_ZH]: # (鮑伯頭的藝術)
/// -->
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HeaderFields {
    pub id: String,
    pub slug: String,
    pub date: String,
    pub tags: Vec<String>,
    pub category: Option<String>,
    pub published: bool,
    pub image: Option<String>,
    pub reading_time: Option<u32>,
    pub title_en: Option<String>,
    pub title_zh: Option<String>,
}

pub fn parse_post_header<'a>(file_name: &Path, lines: Lines<'a>) -> io::Result<(HeaderFields, Lines<'a>, Option<&'a str>)> {
    let mut header = HeaderFields::default();
    let mut seen_any = false;

    let mut lines = lines.clone();
    let mut maybe_line = lines.next();

    // Skip optional HTML comment in the beginning
    let mut start_with_comment = false;

    while let Some(line) = maybe_line {
        let line = line.trim();

        // Empty lines are ok
        if line.is_empty() {
            maybe_line = lines.next();
            continue;
        }

        if line == "<!--" {
            maybe_line = lines.next();
            start_with_comment = true;
        }
        break;
    }

    while let Some(line) = maybe_line {
        if line.trim().is_empty() {
            maybe_line = lines.next();
            continue;
        }

        let (key, val) = match extract_header_field(line) {
            None => break,
            Some((k, v)) => (k, v),
        };
        seen_any = true;

        match key {
            "ID" => header.id = val.to_string(),
            "SLUG" => header.slug = val.to_string(),
            "DATE" => header.date = val.to_string(),
            "TAGS" => header.tags = extract_tags(val),
            "CATEGORY" => header.category = Some(val.to_string()),
            "PUBLISHED" => header.published = val.eq_ignore_ascii_case("true"),
            "IMAGE" => header.image = Some(val.to_string()),
            "READING_TIME" => header.reading_time = val.parse().ok(),
            "TITLE_EN" => header.title_en = Some(val.to_string()),
            "TITLE_ZH" => header.title_zh = Some(val.to_string()),
            _ => {}
        }
        maybe_line = lines.next();
    }

    if start_with_comment {
        // Let's find the end of the comment
        loop {
            if let Some(line) = maybe_line {
                let line = line.trim();

                if line == "-->" {
                    maybe_line = lines.next();
                    break;
                }
            } else {
                return Err(io::Error::new(
                    ErrorKind::InvalidData,
                    format!("End of comment in the header is missing - file={}", file_name.display()))
                );
            }

            maybe_line = lines.next();
        }
    }

    if !seen_any {
        return Err(io::Error::new(ErrorKind::InvalidData, format!("Invalid journal header - file={}", file_name.display())));
    }

    Ok((header, lines, maybe_line))
}

/// Collects the remaining lines, starting with the one already pulled off.
pub fn collect_body(mut lines: Lines, first_line: Option<&str>) -> String {
    let mut content = String::new();
    let mut maybe_line = first_line;
    while let Some(line) = maybe_line {
        content.push_str(line);
        content.push('\n');
        maybe_line = lines.next();
    }
    content
}

fn extract_tags(tags_str: &str) -> Vec<String> {
    tags_str.split(' ')
        .filter(|x| !x.is_empty())
        .map(|s| s.to_string())
        .collect()
}

fn extract_header_field(line: &str) -> Option<(&str, &str)> {
    lazy_static! {
        static ref HEADER_REGEX: Regex = Regex::new(r"\[(?P<key>\w+)\]: # \((?P<value>.+)\)").unwrap();
    }

    HEADER_REGEX.captures(line).and_then(|cap| {
        let key = cap.name("key").map(|key| key.as_str());
        let val = cap.name("value").map(|key| key.as_str());
        match (key, val) {
            (Some(key), Some(val)) => Some((key, val)),
            _ => None
        }
    })
}

pub fn remove_comments(md_post: &str) -> io::Result<String> {
    let mut res: String = String::new();
    let mut slice = Some(md_post);

    let start_comment = "<!--";
    let end_comment = "-->";

    while let Some(block) = slice {
        let md_buf: &str = match block.find(start_comment) {
            Some(start) => {
                let to_render: &str = &block[0..start];

                let next: &str = &block[(start + start_comment.len())..];
                match next.find(end_comment) {
                    Some(end) => {
                        slice = Some(&next[(end + end_comment.len())..]);
                    }
                    None => {
                        return Err(io::Error::new(
                            ErrorKind::InvalidData,
                            "Error finding end of comment",
                        ));
                    }
                };

                to_render
            }
            None => {
                slice = None;
                block
            }
        };
        res.push_str(md_buf);
    }

    Ok(res)
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    #[test]
    fn test_extract_header_field() {
        let res = extract_header_field("[ID]: # (a63bd715-a3fe-4788-b0e1-2a3153778544)");
        assert_eq!(res, Some(("ID", "a63bd715-a3fe-4788-b0e1-2a3153778544")));
        let res = extract_header_field("[DATE]: # (2022-04-02 12:05:00.000)");
        assert_eq!(res, Some(("DATE", "2022-04-02 12:05:00.000")));
        let res = extract_header_field("[TITLE_ZH]: # (鮑伯頭的藝術)");
        assert_eq!(res, Some(("TITLE_ZH", "鮑伯頭的藝術")));
        let res = extract_header_field("[TAGS]: # (cuts something-else)");
        assert_eq!(res, Some(("TAGS", "cuts something-else")));

        let res = extract_header_field("[SLUG]: (bob)");
        assert!(res.is_none());
    }

    #[test]
    fn test_extract_tags() {
        let tags = extract_tags("one two three   four");
        assert_eq!(tags, ["one", "two", "three", "four"]);
    }

    #[test]
    fn test_header_in_comment() {
        let file_name = PathBuf::from("posts/the-art-of-the-bob/index.md");
        let content = r##"

<!--

[ID]: # (21c1e9ad-4ebb-4168-a543-fbf77cc35a85)

[DATE]: # (2024-02-12 22:54:00.000)

[PUBLISHED]: # (true)
[TAGS]: # (cuts bob)
[TITLE_EN]: # (The art of the bob)

-->
First line of the body.
"##;

        let (header, lines, next_line) = parse_post_header(&file_name, content.lines()).unwrap();
        let expected = HeaderFields {
            id: "21c1e9ad-4ebb-4168-a543-fbf77cc35a85".to_string(),
            date: "2024-02-12 22:54:00.000".to_string(),
            published: true,
            tags: vec!["cuts".to_string(), "bob".to_string()],
            title_en: Some("The art of the bob".to_string()),
            ..Default::default()
        };
        assert_eq!(header, expected);
        assert_eq!(collect_body(lines, next_line), "First line of the body.\n");
    }

    #[test]
    fn test_unterminated_header_comment() {
        let file_name = PathBuf::from("broken.md");
        let content = "<!--\n[ID]: # (x)\nno end";
        assert!(parse_post_header(&file_name, content.lines()).is_err());
    }

    #[test]
    fn test_missing_header() {
        let file_name = PathBuf::from("plain.md");
        assert!(parse_post_header(&file_name, "# Just markdown".lines()).is_err());
    }

    #[test]
    fn test_remove_comments() {
        let res = remove_comments("Some text.<!-- more -->Wo<!-- xyz -->rd").unwrap();
        assert_eq!(res, "Some text.Word");

        assert_eq!(remove_comments("Some text.Word").unwrap(), "Some text.Word");
        assert_eq!(remove_comments("").unwrap(), "");
        assert_eq!(remove_comments("<!-- more --><!-- xyz -->").unwrap(), "");
        assert!(remove_comments("open <!-- never closed").is_err());
    }
}
