use ramhorns::Content;

use crate::i18n::{DocumentText, ParagraphText};
use crate::journal::post::Post;
use crate::shop::{Availability, Product};
use crate::view::{NavLink, PageContext, PostCard, Section, Templates};

#[derive(Content)]
struct HomeView<'a> {
    title: &'a str,
    subtitle: &'a str,
    cta: &'a str,
    cta_href: String,
    journal_href: String,
    journal_label: &'a str,
    latest: Vec<PostCard>,
}

#[derive(Content)]
struct ProductCard {
    id: String,
    name: String,
    description: String,
    price: String,
    volume: String,
    formula_id: String,
    image_url: String,
    price_id: String,
    buyable: bool,
    status: String,
    add_label: String,
}

#[derive(Content)]
struct ShopView<'a> {
    title: &'a str,
    subtitle: &'a str,
    locale: &'a str,
    products: Vec<ProductCard>,
    empty: bool,
    empty_label: &'a str,
    success: bool,
    canceled: bool,
}

#[derive(Content)]
struct DocumentView<'a> {
    eyebrow: String,
    title: &'a str,
    updated: &'a str,
    intro: &'a str,
    sections: &'a [ParagraphText],
    has_links: bool,
    links: Vec<NavLink>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LegalPage {
    Terms,
    Privacy,
}

impl LegalPage {
    pub fn from_slug(slug: &str) -> Option<Self> {
        match slug {
            "terms" => Some(LegalPage::Terms),
            "privacy" => Some(LegalPage::Privacy),
            _ => None,
        }
    }
}

/// Journal pages served under `/journal/` next to the stories.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JournalSection {
    Team,
    Careers,
    Guides,
}

impl JournalSection {
    const ALL: [JournalSection; 3] = [JournalSection::Team, JournalSection::Careers, JournalSection::Guides];

    pub fn from_slug(slug: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.slug() == slug)
    }

    pub fn slug(&self) -> &'static str {
        match self {
            JournalSection::Team => "team",
            JournalSection::Careers => "careers",
            JournalSection::Guides => "guides",
        }
    }
}

/// Outcome of a checkout, as reported back on the shop page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CheckoutReturn {
    pub success: bool,
    pub canceled: bool,
}

pub fn format_price(price: f64, currency: &str) -> String {
    format!("{} {:.2}", currency.to_uppercase(), price)
}

impl Templates {
    pub fn render_home(&self, ctx: &PageContext, latest: &[Post]) -> String {
        let text = &ctx.dict.home;
        let body = self.index.render(&HomeView {
            title: &text.title,
            subtitle: &text.subtitle,
            cta: &text.cta,
            cta_href: ctx.href("/locations"),
            journal_href: ctx.href("/journal"),
            journal_label: &ctx.dict.nav.journal,
            latest: latest.iter().map(|p| ctx.card(p)).collect(),
        });
        self.wrap(ctx, ctx.brand, Section::Home, body)
    }

    pub fn render_about(&self, ctx: &PageContext) -> String {
        let text = &ctx.dict.about;
        let body = self.about.render(text);
        self.wrap(ctx, &text.title, Section::About, body)
    }

    pub fn render_locations(&self, ctx: &PageContext) -> String {
        let text = &ctx.dict.locations;
        let body = self.locations.render(text);
        self.wrap(ctx, &text.title, Section::Locations, body)
    }

    pub fn render_shop(&self, ctx: &PageContext, products: &[Product], checkout: CheckoutReturn) -> String {
        let text = &ctx.dict.shop;
        let cards = products.iter()
            .map(|p| {
                let availability = p.availability();
                ProductCard {
                    id: p.id.clone(),
                    name: p.name(ctx.locale).to_string(),
                    description: p.description(ctx.locale).unwrap_or("").to_string(),
                    price: format_price(p.price, &p.currency),
                    volume: p.volume.clone().unwrap_or_default(),
                    formula_id: p.formula_id.clone().unwrap_or_default(),
                    image_url: p.image_url.clone().unwrap_or_default(),
                    price_id: p.stripe_price_id.clone().unwrap_or_default(),
                    buyable: availability == Availability::Available,
                    status: match availability {
                        Availability::Available => String::new(),
                        Availability::SoldOut => text.sold_out.clone(),
                        Availability::Unavailable => text.unavailable.clone(),
                    },
                    add_label: text.add_to_cart.clone(),
                }
            })
            .collect();

        let body = self.shop.render(&ShopView {
            title: &text.title,
            subtitle: &text.subtitle,
            locale: ctx.locale.code(),
            products: cards,
            empty: products.is_empty(),
            empty_label: &text.empty,
            success: checkout.success,
            canceled: checkout.canceled,
        });
        self.wrap(ctx, &text.title, Section::Shop, body)
    }

    pub fn render_legal(&self, ctx: &PageContext, page: LegalPage) -> String {
        let legal = &ctx.dict.legal;
        let text = match page {
            LegalPage::Terms => &legal.terms,
            LegalPage::Privacy => &legal.privacy,
        };
        self.render_document(ctx, legal.eyebrow.clone(), text, vec![], Section::Other)
    }

    /// Team, careers and guides pages, linked to each other and back to the
    /// story listing.
    pub fn render_journal_section(&self, ctx: &PageContext, section: JournalSection) -> String {
        let pages = &ctx.dict.sections;
        let text_of = |s: JournalSection| match s {
            JournalSection::Team => &pages.team,
            JournalSection::Careers => &pages.careers,
            JournalSection::Guides => &pages.guides,
        };
        let text = text_of(section);

        let mut links = vec![NavLink {
            href: ctx.href("/journal"),
            label: ctx.dict.journal.title.clone(),
            active: false,
        }];
        links.extend(JournalSection::ALL.into_iter().map(|s| NavLink {
            href: ctx.href(&format!("/journal/{}", s.slug())),
            label: text_of(s).title.clone(),
            active: s == section,
        }));

        let eyebrow = format!("{} / {}", ctx.dict.journal.subtitle, text.title);
        self.render_document(ctx, eyebrow, text, links, Section::Journal)
    }

    fn render_document(&self, ctx: &PageContext, eyebrow: String, text: &DocumentText, links: Vec<NavLink>, section: Section) -> String {
        let body = self.document.render(&DocumentView {
            eyebrow,
            title: &text.title,
            updated: &text.updated,
            intro: &text.intro,
            sections: &text.sections,
            has_links: !links.is_empty(),
            links,
        });
        self.wrap(ctx, &text.title, section, body)
    }

    pub fn render_not_found(&self, ctx: &PageContext) -> String {
        let text = &ctx.dict.not_found;
        let body = self.not_found.render(text);
        self.wrap(ctx, &text.title, Section::Other, body)
    }
}

#[cfg(test)]
mod tests {
    use crate::i18n::Dictionaries;
    use crate::journal::locale::{Locale, LocalePolicy};
    use crate::journal::post::test_posts::post;
    use crate::shop::test_products::product;
    use crate::view::test_templates::templates;

    use super::*;

    fn body(html: &str) -> &str {
        html.split_once('\n').map(|(_, b)| b.trim_end_matches("</html>")).unwrap_or("")
    }

    fn with_ctx<F: FnOnce(&PageContext) -> String>(locale: Locale, f: F) -> String {
        let dicts = Dictionaries::load().unwrap();
        let ctx = PageContext {
            locale,
            policy: LocalePolicy::Fallback,
            dict: dicts.get(locale),
            brand: "WECUT",
            path: "/",
            cart_count: 0,
        };
        f(&ctx)
    }

    #[test]
    fn test_format_price() {
        assert_eq!(format_price(28.0, "aud"), "AUD 28.00");
        assert_eq!(format_price(32.999, "twd"), "TWD 33.00");
    }

    #[test]
    fn test_render_shop() {
        let mut sold_out = product("02", Some("price_2"), 30.0);
        sold_out.inventory_count = Some(0);
        let products = vec![product("01", Some("price_1"), 28.0), sold_out, product("03", None, 12.5)];

        let html = with_ctx(Locale::Zh, |ctx| templates().render_shop(ctx, &products, CheckoutReturn { success: true, canceled: false }));
        assert_eq!(body(&html), "OK|(洗髮精 01;AUD 28.00;price_1)(洗髮精 02;AUD 30.00;已售完)(洗髮精 03;AUD 12.50;缺貨中)");

        let html = with_ctx(Locale::En, |ctx| templates().render_shop(ctx, &[], CheckoutReturn::default()));
        assert_eq!(body(&html), "No formulations available yet.");
    }

    #[test]
    fn test_static_pages() {
        let html = with_ctx(Locale::En, |ctx| templates().render_about(ctx));
        assert!(body(&html).starts_with("About|WECUT began"));

        let html = with_ctx(Locale::Zh, |ctx| templates().render_locations(ctx));
        assert_eq!(body(&html), "據點|起源");

        let html = with_ctx(Locale::Zh, |ctx| templates().render_not_found(ctx));
        assert_eq!(body(&html), "找不到頁面");
    }

    #[test]
    fn test_legal_pages() {
        let html = with_ctx(Locale::En, |ctx| templates().render_legal(ctx, LegalPage::Privacy));
        assert!(html.contains("<title>Privacy Policy | WECUT</title>"));
        assert_eq!(body(&html), "LEGAL|Privacy Policy|||(1. Data Collection)(2. Use of Information)(3. Cookies)(4. Contact Us)");

        let html = with_ctx(Locale::Zh, |ctx| templates().render_legal(ctx, LegalPage::Terms));
        assert!(body(&html).starts_with("法律聲明|服務條款|||(1. 簡介)"));

        assert_eq!(LegalPage::from_slug("cookies"), None);
    }

    #[test]
    fn test_journal_sections() {
        let html = with_ctx(Locale::En, |ctx| templates().render_journal_section(ctx, JournalSection::Careers));
        let text = body(&html);
        assert!(text.starts_with("Notes from the studio / Careers|Careers|[Journal][Team][*Careers][Guides]|WECUT is"));
        assert!(text.ends_with("|(Hair Stylist)(Assistant)"));

        let html = with_ctx(Locale::Zh, |ctx| templates().render_journal_section(ctx, JournalSection::Guides));
        assert_eq!(body(&html), "來自工作室的筆記 / 指南|指南|[誌][團隊][招募][*指南]|內容即將推出|");

        assert_eq!(JournalSection::from_slug("team"), Some(JournalSection::Team));
        assert_eq!(JournalSection::from_slug("hello"), None);
    }

    #[test]
    fn test_render_home() {
        let posts = vec![post("1", 2, &[]), post("2", 1, &[])];
        let html = with_ctx(Locale::En, |ctx| templates().render_home(ctx, &posts));
        assert!(html.contains("<title>WECUT | WECUT</title>"));
        assert_eq!(body(&html), "WECUT|(Title 1)(Title 2)");
    }
}
