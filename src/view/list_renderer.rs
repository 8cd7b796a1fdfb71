use ramhorns::Content;

use crate::journal::listing::JournalPage;
use crate::journal::post::Post;
use crate::view::{PageContext, PostCard, Section, Templates};

#[derive(Content)]
struct JournalView<'a> {
    title: &'a str,
    subtitle: &'a str,
    latest_label: &'a str,
    featured: Option<PostCard>,
    recent: Vec<PostCard>,
    empty: bool,
    no_stories: &'a str,
    pages: Vec<ViewPagination>,
    show_pagination: bool,
}

#[derive(Content)]
struct ViewPagination {
    href: String,
    current: bool,
    number: u32,
}

#[derive(Content)]
struct TagView<'a> {
    tag: &'a str,
    count_label: String,
    posts: Vec<PostCard>,
    empty: bool,
    no_stories: &'a str,
    back_href: String,
    back_label: &'a str,
}

impl Templates {
    pub fn render_journal(&self, ctx: &PageContext, page: &JournalPage) -> String {
        let text = &ctx.dict.journal;
        let pages = (1..=page.page_count)
            .map(|number| ViewPagination {
                href: format!("{}?page={}", ctx.href("/journal"), number),
                current: number == page.page,
                number,
            })
            .collect();

        let body = self.journal.render(&JournalView {
            title: &text.title,
            subtitle: &text.subtitle,
            latest_label: &text.latest,
            featured: page.featured.as_ref().map(|p| ctx.card(p)),
            recent: page.recent.iter().map(|p| ctx.card(p)).collect(),
            empty: page.is_empty(),
            no_stories: &text.no_stories,
            pages,
            show_pagination: page.page_count > 1,
        });
        self.wrap(ctx, &text.title, Section::Journal, body)
    }

    pub fn render_tag(&self, ctx: &PageContext, tag: &str, posts: &[Post]) -> String {
        let text = &ctx.dict.journal;
        let body = self.tag.render(&TagView {
            tag,
            count_label: format!("{} {}", posts.len(), text.stories_found),
            posts: posts.iter().map(|p| ctx.card(p)).collect(),
            empty: posts.is_empty(),
            no_stories: &text.no_stories,
            back_href: ctx.href("/journal"),
            back_label: &text.back,
        });
        self.wrap(ctx, &format!("#{}", tag), Section::Journal, body)
    }
}

#[cfg(test)]
mod tests {
    use crate::i18n::Dictionaries;
    use crate::journal::listing::paginate;
    use crate::journal::locale::{Locale, LocalePolicy};
    use crate::journal::post::test_posts::post;
    use crate::view::test_templates::templates;

    use super::*;

    fn body(html: &str) -> &str {
        html.split_once('\n').map(|(_, b)| b.trim_end_matches("</html>")).unwrap_or("")
    }

    #[test]
    fn test_render_journal() {
        let dicts = Dictionaries::load().unwrap();
        let ctx = PageContext {
            locale: Locale::En,
            policy: LocalePolicy::Fallback,
            dict: dicts.get(Locale::En),
            brand: "WECUT",
            path: "/journal",
            cart_count: 0,
        };
        let mut first = post("1", 31, &[]);
        first.content_en = Some("TL;DR: <b>Bold</b> claim.".to_string());
        let posts = vec![first, post("2", 0, &[])];

        let html = templates().render_journal(&ctx, &paginate(&posts, 1, 1));
        assert_eq!(body(&html), "F(Title 1)[*1][2]");

        let html = templates().render_journal(&ctx, &paginate(&posts, 2, 1));
        assert_eq!(body(&html), "R(Title 2;JAN 2024;Body of 2)[1][*2]");

        let html = templates().render_journal(&ctx, &paginate(&[], 1, 9));
        assert_eq!(body(&html), "NO STORIES PUBLISHED YET");
    }

    #[test]
    fn test_render_tag() {
        let dicts = Dictionaries::load().unwrap();
        let ctx = PageContext {
            locale: Locale::En,
            policy: LocalePolicy::Fallback,
            dict: dicts.get(Locale::En),
            brand: "WECUT",
            path: "/journal/tag/cuts",
            cart_count: 0,
        };
        let posts = vec![post("1", 1, &["cuts"]), post("2", 0, &["cuts"])];
        let html = templates().render_tag(&ctx, "cuts", &posts);
        assert!(html.contains("<title>#cuts | WECUT</title>"));
        assert_eq!(body(&html), "#cuts 2 Stories Found|(Title 1)(Title 2)");
    }
}
