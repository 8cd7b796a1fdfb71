use std::io;
use std::io::ErrorKind;
use std::path::Path;

use chrono::{Datelike, Utc};
use ramhorns::{Content, Template};

use crate::i18n::{CartText, Dictionary};
use crate::journal::locale::{Locale, LocalePolicy};
use crate::journal::post::Post;
use crate::text_utils::{excerpt, format_month_year};

pub mod list_renderer;
pub mod page_renderer;
pub mod post_renderer;

/// Site section, for highlighting the navigation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    Home,
    About,
    Locations,
    Shop,
    Journal,
    Other,
}

pub struct Templates {
    layout: Template<'static>,
    pub(crate) index: Template<'static>,
    pub(crate) about: Template<'static>,
    pub(crate) locations: Template<'static>,
    pub(crate) shop: Template<'static>,
    pub(crate) journal: Template<'static>,
    pub(crate) tag: Template<'static>,
    pub(crate) article: Template<'static>,
    pub(crate) not_found: Template<'static>,
    pub(crate) document: Template<'static>,
}

fn parse(name: &str, src: String) -> io::Result<Template<'static>> {
    Template::new(src).map_err(|e| io::Error::new(ErrorKind::InvalidInput, format!("Error parsing template {}: {}", name, e)))
}

impl Templates {
    pub fn load(template_dir: &Path) -> io::Result<Self> {
        Self::from_sources(|name| {
            std::fs::read_to_string(template_dir.join(name))
                .map_err(|e| io::Error::new(e.kind(), format!("Error reading template {}: {}", name, e)))
        })
    }

    pub fn from_sources<F: Fn(&str) -> io::Result<String>>(source: F) -> io::Result<Self> {
        let tpl = |name: &str| parse(name, source(name)?);
        Ok(Templates {
            layout: tpl("layout.tpl")?,
            index: tpl("index.tpl")?,
            about: tpl("about.tpl")?,
            locations: tpl("locations.tpl")?,
            shop: tpl("shop.tpl")?,
            journal: tpl("journal.tpl")?,
            tag: tpl("tag.tpl")?,
            article: tpl("article.tpl")?,
            not_found: tpl("not_found.tpl")?,
            document: tpl("document.tpl")?,
        })
    }

    /// Renders `body` inside the shared page layout.
    pub(crate) fn wrap(&self, ctx: &PageContext, title: &str, section: Section, body: String) -> String {
        let nav = ctx.dict.nav.clone();
        let link = |path: &str, label: String, this: Section| NavLink {
            href: ctx.href(path),
            label,
            active: this == section,
        };
        let footer = &ctx.dict.footer;
        self.layout.render(&LayoutView {
            lang: ctx.locale.html_lang(),
            locale: ctx.locale.code(),
            title,
            brand: ctx.brand,
            nav: vec![
                link("/", nav.home, Section::Home),
                link("/about", nav.about, Section::About),
                link("/locations", nav.locations, Section::Locations),
                link("/shop", nav.shop, Section::Shop),
                link("/journal", nav.journal, Section::Journal),
            ],
            cart_label: nav.cart.as_str(),
            cart_count: ctx.cart_count,
            cart: &ctx.dict.cart,
            switch_href: format!("/{}{}", ctx.locale.other(), ctx.path),
            switch_label: match ctx.locale.other() {
                Locale::En => "EN",
                Locale::Zh => "中文",
            },
            body,
            year: Utc::now().year(),
            rights: footer.rights.as_str(),
            terms: footer.terms.as_str(),
            privacy: footer.privacy.as_str(),
        })
    }
}

/// Per request rendering context.
pub struct PageContext<'a> {
    pub locale: Locale,
    pub policy: LocalePolicy,
    pub dict: &'a Dictionary,
    pub brand: &'a str,
    /// Request path without the locale prefix, for the language switch.
    pub path: &'a str,
    /// Units in the shopper's cart, shown on the cart button.
    pub cart_count: u32,
}

impl PageContext<'_> {
    pub fn href(&self, path: &str) -> String {
        format!("/{}{}", self.locale, path)
    }

    pub fn post_href(&self, slug: &str) -> String {
        self.href(&format!("/journal/{}", slug))
    }

    pub fn tag_href(&self, tag: &str) -> String {
        let encoded: String = url::form_urlencoded::byte_serialize(tag.as_bytes()).collect();
        self.href(&format!("/journal/tag/{}", encoded.replace('+', "%20")))
    }

    pub(crate) fn tag_links(&self, tags: &[String]) -> Vec<TagLink> {
        tags.iter().map(|t| TagLink { href: self.tag_href(t), tag: t.clone() }).collect()
    }

    pub(crate) fn reading_label(&self, minutes: u32) -> String {
        format!("{} {}", minutes, self.dict.journal.min_read)
    }

    pub(crate) fn card(&self, post: &Post) -> PostCard {
        let content = post.content(self.locale, self.policy).unwrap_or("");
        PostCard {
            href: self.post_href(&post.slug),
            title: post.title(self.locale, self.policy).unwrap_or("").to_string(),
            excerpt: excerpt(content),
            date: format_month_year(&post.created_at, self.locale),
            category: post.category.clone().unwrap_or_else(|| self.dict.journal.stories.clone()),
            reading: self.reading_label(post.reading_minutes(self.locale, self.policy)),
            cover: post.image_url.as_ref().map(|url| Cover { url: url.clone() }),
            tags: self.tag_links(&post.tags),
            read_more: self.dict.journal.read_more.clone(),
        }
    }
}

#[derive(Content)]
struct LayoutView<'a> {
    lang: &'a str,
    locale: &'a str,
    title: &'a str,
    brand: &'a str,
    nav: Vec<NavLink>,
    cart_label: &'a str,
    cart_count: u32,
    cart: &'a CartText,
    switch_href: String,
    switch_label: &'a str,
    body: String,
    year: i32,
    rights: &'a str,
    terms: &'a str,
    privacy: &'a str,
}

#[derive(Content)]
pub(crate) struct NavLink {
    href: String,
    label: String,
    active: bool,
}

#[derive(Content, Debug, Clone)]
pub(crate) struct TagLink {
    pub href: String,
    pub tag: String,
}

#[derive(Content, Debug, Clone)]
pub(crate) struct Cover {
    pub url: String,
}

/// A post as shown in lists.
#[derive(Content, Debug, Clone)]
pub(crate) struct PostCard {
    pub href: String,
    pub title: String,
    pub excerpt: String,
    pub date: String,
    pub category: String,
    pub reading: String,
    pub cover: Option<Cover>,
    pub tags: Vec<TagLink>,
    pub read_more: String,
}
