use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    En,
    Zh,
}

pub const DEFAULT_LOCALE: Locale = Locale::En;

impl Locale {
    pub const ALL: [Locale; 2] = [Locale::En, Locale::Zh];

    pub fn code(&self) -> &'static str {
        match self {
            Locale::En => "en",
            Locale::Zh => "zh",
        }
    }

    /// Value for the `lang` attribute of the page.
    pub fn html_lang(&self) -> &'static str {
        match self {
            Locale::En => "en",
            Locale::Zh => "zh-Hant-TW",
        }
    }

    pub fn other(&self) -> Locale {
        match self {
            Locale::En => Locale::Zh,
            Locale::Zh => Locale::En,
        }
    }

    pub fn from_code(code: &str) -> Option<Locale> {
        Self::ALL.into_iter().find(|l| l.code() == code)
    }

    /// Locale prefix of a request path: `/zh/journal` and `/zh` both give `zh`.
    pub fn from_path(path: &str) -> Option<Locale> {
        let first = path.trim_start_matches('/').split('/').next()?;
        Self::from_code(first)
    }

    /// Anything mentioning `zh` in `Accept-Language` gets Chinese.
    pub fn negotiate(accept_language: Option<&str>) -> Locale {
        match accept_language {
            Some(header) if header.contains("zh") => Locale::Zh,
            _ => DEFAULT_LOCALE,
        }
    }
}

impl Display for Locale {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// What to do when a record has no field for the active locale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LocalePolicy {
    /// Use the other locale's field.
    #[default]
    Fallback,
    /// Hide the record from that locale.
    Strict,
}

/// Picks the field for `locale` out of an `_en`/`_zh` pair. Empty strings
/// count as missing.
pub fn localized<'a>(locale: Locale, policy: LocalePolicy, en: Option<&'a str>, zh: Option<&'a str>) -> Option<&'a str> {
    let en = en.filter(|s| !s.is_empty());
    let zh = zh.filter(|s| !s.is_empty());
    let (active, other) = match locale {
        Locale::En => (en, zh),
        Locale::Zh => (zh, en),
    };
    match policy {
        LocalePolicy::Fallback => active.or(other),
        LocalePolicy::Strict => active,
    }
}

/// Where to send a request whose path carries no locale prefix.
///
/// Returns `None` for paths that are served as they are: API, admin and auth
/// routes, static files and anything already localized.
pub fn locale_redirect(path: &str, accept_language: Option<&str>) -> Option<String> {
    const PASSTHROUGH: [&str; 5] = ["/api", "/admin", "/auth", "/public", "/_next"];

    if PASSTHROUGH.iter().any(|p| path.starts_with(p)) || path.contains('.') {
        return None;
    }
    if Locale::from_path(path).is_some() {
        return None;
    }

    let locale = Locale::negotiate(accept_language);
    if path == "/" || path.is_empty() {
        Some(format!("/{}/", locale))
    } else {
        Some(format!("/{}{}", locale, path))
    }
}
