use serde::Deserialize;

use crate::journal::locale::Locale;

const EN_BUNDLE: &str = include_str!("../res/i18n/en.json");
const ZH_BUNDLE: &str = include_str!("../res/i18n/zh.json");

#[derive(Deserialize, ramhorns::Content, Debug, Clone)]
pub struct NavText {
    pub home: String,
    pub about: String,
    pub locations: String,
    pub shop: String,
    pub journal: String,
    pub cart: String,
}

#[derive(Deserialize, ramhorns::Content, Debug, Clone)]
pub struct HomeText {
    pub title: String,
    pub subtitle: String,
    pub cta: String,
}

#[derive(Deserialize, ramhorns::Content, Debug, Clone)]
pub struct AboutText {
    pub title: String,
    pub subtitle: String,
    pub body: String,
}

#[derive(Deserialize, ramhorns::Content, Debug, Clone)]
pub struct LocationsText {
    pub title: String,
    pub subtitle: String,
    pub origin: String,
    pub expansion: String,
    pub book: String,
}

#[derive(Deserialize, ramhorns::Content, Debug, Clone)]
pub struct ShopText {
    pub title: String,
    pub subtitle: String,
    pub add_to_cart: String,
    pub sold_out: String,
    pub unavailable: String,
    pub empty: String,
}

#[derive(Deserialize, ramhorns::Content, Debug, Clone)]
pub struct JournalText {
    pub title: String,
    pub subtitle: String,
    pub read_more: String,
    pub back: String,
    pub latest: String,
    pub stories: String,
    pub min_read: String,
    pub previous: String,
    pub next: String,
    pub related: String,
    pub stories_found: String,
    pub no_stories: String,
    pub abstract_label: String,
    pub note_label: String,
}

#[derive(Deserialize, ramhorns::Content, Debug, Clone)]
pub struct CartText {
    pub title: String,
    pub empty: String,
    pub subtotal: String,
    pub checkout: String,
    pub remove: String,
    pub close: String,
    pub failed: String,
}

#[derive(Deserialize, ramhorns::Content, Debug, Clone)]
pub struct ParagraphText {
    pub heading: String,
    pub body: String,
}

/// A static page made of an intro and headed paragraphs.
#[derive(Deserialize, ramhorns::Content, Debug, Clone)]
pub struct DocumentText {
    pub title: String,
    /// Small print under the title.
    #[serde(default)]
    pub updated: String,
    #[serde(default)]
    pub intro: String,
    #[serde(default)]
    pub sections: Vec<ParagraphText>,
}

#[derive(Deserialize, ramhorns::Content, Debug, Clone)]
pub struct LegalText {
    pub eyebrow: String,
    pub terms: DocumentText,
    pub privacy: DocumentText,
}

/// Journal pages that are not stories.
#[derive(Deserialize, ramhorns::Content, Debug, Clone)]
pub struct JournalSectionsText {
    pub team: DocumentText,
    pub careers: DocumentText,
    pub guides: DocumentText,
}

#[derive(Deserialize, ramhorns::Content, Debug, Clone)]
pub struct FooterText {
    pub rights: String,
    pub terms: String,
    pub privacy: String,
}

#[derive(Deserialize, ramhorns::Content, Debug, Clone)]
pub struct NotFoundText {
    pub title: String,
    pub body: String,
}

/// Every user-facing string of the site for one locale.
#[derive(Deserialize, ramhorns::Content, Debug, Clone)]
pub struct Dictionary {
    pub nav: NavText,
    pub home: HomeText,
    pub about: AboutText,
    pub locations: LocationsText,
    pub shop: ShopText,
    pub journal: JournalText,
    pub footer: FooterText,
    pub not_found: NotFoundText,
    pub cart: CartText,
    pub legal: LegalText,
    pub sections: JournalSectionsText,
}

/// Both dictionaries, parsed once at startup.
pub struct Dictionaries {
    en: Dictionary,
    zh: Dictionary,
}

impl Dictionaries {
    pub fn load() -> serde_json::Result<Self> {
        Ok(Dictionaries {
            en: serde_json::from_str(EN_BUNDLE)?,
            zh: serde_json::from_str(ZH_BUNDLE)?,
        })
    }

    pub fn get(&self, locale: Locale) -> &Dictionary {
        match locale {
            Locale::En => &self.en,
            Locale::Zh => &self.zh,
        }
    }
}
