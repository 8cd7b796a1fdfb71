use ramhorns::Content;

use crate::journal::article::Article;
use crate::repository::PostLink;
use crate::text_utils::format_month_year;
use crate::view::{Cover, PageContext, PostCard, Section, TagLink, Templates};

#[derive(Content)]
struct NeighbourView {
    href: String,
    title: String,
    label: String,
}

#[derive(Content)]
struct ArticleView<'a> {
    back_href: String,
    back_label: &'a str,
    serial: String,
    date: String,
    category: &'a str,
    reading: String,
    title: &'a str,
    cover: Option<Cover>,
    variant: &'static str,
    body: String,
    tags: Vec<TagLink>,
    previous: Option<NeighbourView>,
    next: Option<NeighbourView>,
    related_label: &'a str,
    related: Vec<PostCard>,
    has_related: bool,
}

impl Templates {
    pub fn render_article(&self, ctx: &PageContext, article: &Article) -> String {
        let text = &ctx.dict.journal;
        let post = &article.post;
        let neighbour = |link: &PostLink, label: &str| NeighbourView {
            href: ctx.post_href(&link.slug),
            title: link.title(ctx.locale, ctx.policy).unwrap_or(&link.slug).to_string(),
            label: label.to_string(),
        };

        let body = self.article.render(&ArticleView {
            back_href: ctx.href("/journal"),
            back_label: &text.back,
            serial: format!("No. {:03}", article.serial),
            date: format_month_year(&post.created_at, ctx.locale),
            category: post.category.as_deref().unwrap_or(&text.stories),
            reading: ctx.reading_label(article.reading_minutes),
            title: &article.title,
            cover: post.image_url.as_ref().map(|url| Cover { url: url.clone() }),
            variant: article.body.variant.name(),
            body: article.body.to_html(),
            tags: ctx.tag_links(&post.tags),
            previous: article.previous.as_ref().map(|l| neighbour(l, &text.previous)),
            next: article.next.as_ref().map(|l| neighbour(l, &text.next)),
            related_label: &text.related,
            related: article.related.iter().map(|p| ctx.card(p)).collect(),
            has_related: !article.related.is_empty(),
        });
        self.wrap(ctx, &article.title, Section::Journal, body)
    }
}

#[cfg(test)]
mod tests {
    use crate::content::block_renderer::BlockRenderer;
    use crate::i18n::Dictionaries;
    use crate::journal::locale::{Locale, LocalePolicy};
    use crate::journal::post::test_posts::post;
    use crate::view::test_templates::templates;

    use super::*;

    #[test]
    fn test_render_article() {
        let dicts = Dictionaries::load().unwrap();
        let ctx = PageContext {
            locale: Locale::En,
            policy: LocalePolicy::Fallback,
            dict: dicts.get(Locale::En),
            brand: "WECUT",
            path: "/journal/hello",
            cart_count: 0,
        };
        let mut p = post("7", 45, &["cuts"]);
        p.slug = "hello".to_string();
        p.content_en = Some("QUOTE: Less, but better.".to_string());
        let article = Article {
            body: BlockRenderer::default().render_article_body(p.content_en.as_deref(), Some("hello"), None),
            title: "Title 7".to_string(),
            reading_minutes: 1,
            serial: 7,
            previous: Some(PostLink { slug: "older".to_string(), title_en: Some("Older".to_string()), title_zh: None }),
            next: None,
            related: vec![post("8", 1, &["cuts"])],
            post: p,
        };

        let html = templates().render_article(&ctx, &article);
        let (head, body) = html.split_once('\n').unwrap();
        assert!(head.contains("<title>Title 7 | WECUT</title>"));
        let (meta, prose) = body.split_once('\n').unwrap();
        assert_eq!(meta, "No. 007|FEB 2024|Stories|1 MIN READ|Title 7|<cuts:/en/journal/tag/cuts>|P(Older)|(Title 8)");
        assert!(prose.starts_with("<div class=\"journal-prose journal-variant-cards\">"));
        assert!(prose.contains("<figure class=\"editorial-pullquote\">"));
    }
}
