use std::fmt::{Display, Formatter};

/// Alternative layouts for the same article. Which one an article gets
/// depends only on its slug, so a post keeps its look between visits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Variant {
    Standard,
    QuoteHeavy,
    Cards,
    Sidebar,
}

impl Variant {
    pub const ALL: [Variant; 4] = [Variant::Standard, Variant::QuoteHeavy, Variant::Cards, Variant::Sidebar];

    pub fn name(&self) -> &'static str {
        match self {
            Variant::Standard => "standard",
            Variant::QuoteHeavy => "quote-heavy",
            Variant::Cards => "cards",
            Variant::Sidebar => "sidebar",
        }
    }

    pub fn from_name(name: &str) -> Option<Variant> {
        Self::ALL.into_iter().find(|v| v.name() == name)
    }

    pub fn from_slug(slug: Option<&str>) -> Variant {
        match slug {
            None | Some("") => Variant::Standard,
            Some(slug) => {
                let idx = (slug_hash(slug).unsigned_abs() % Self::ALL.len() as u64) as usize;
                Self::ALL[idx]
            }
        }
    }

    /// A known override name wins over the slug hash; unknown names are ignored.
    pub fn select(slug: Option<&str>, forced: Option<&str>) -> Variant {
        forced
            .and_then(Self::from_name)
            .unwrap_or_else(|| Self::from_slug(slug))
    }
}

impl Display for Variant {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// `h = c + (h << 5) - h` over UTF-16 code units, evaluated the way browser
/// scripts do: the shift works on the low 32 bits, the rest does not wrap.
fn slug_hash(slug: &str) -> i64 {
    slug.encode_utf16().fold(0i64, |hash, unit| {
        let shifted = (hash as i32).wrapping_shl(5) as i64;
        unit as i64 + (shifted - hash)
    })
}
