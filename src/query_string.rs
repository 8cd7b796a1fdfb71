use std::collections::HashMap;

#[derive(PartialEq, Debug)]
pub struct QueryString {
    items: HashMap<String, String>,
}

impl QueryString {
    pub fn from(buf: &str) -> Self {
        let vs: Vec<(String, String)> = serde_urlencoded::from_str(buf).unwrap_or_else(|_| vec![]);
        let items: HashMap<String, String> = vs.into_iter().collect();

        QueryString {
            items,
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.items.get(key).map(|v| v.as_str())
    }

    pub fn get_page(&self) -> u32 {
        match self.get("page").and_then(|v| v.parse::<u32>().ok()) {
            Some(page) if page > 0 => page,
            _ => 1,
        }
    }

    /// Presentation variant forced from the address bar, if any.
    pub fn get_variant(&self) -> Option<&str> {
        self.get("variant").filter(|v| !v.is_empty())
    }

    pub fn is_set(&self, key: &str) -> bool {
        self.get(key) == Some("true")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_page() {
        assert_eq!(QueryString::from("page=3").get_page(), 3);
        assert_eq!(QueryString::from("page=0").get_page(), 1);
        assert_eq!(QueryString::from("page=-2").get_page(), 1);
        assert_eq!(QueryString::from("page=abc").get_page(), 1);
        assert_eq!(QueryString::from("").get_page(), 1);
    }

    #[test]
    fn test_get_variant() {
        assert_eq!(QueryString::from("variant=quote-heavy").get_variant(), Some("quote-heavy"));
        assert_eq!(QueryString::from("variant=").get_variant(), None);
        assert_eq!(QueryString::from("page=2").get_variant(), None);
    }

    #[test]
    fn test_parse_query_str() {
        let buf = "success=true&session_id=cs_test_a1&tag=%E6%9F%93%E9%AB%AE";
        let qs = QueryString::from(buf);
        assert!(qs.is_set("success"));
        assert!(!qs.is_set("canceled"));
        assert_eq!(qs.get("session_id"), Some("cs_test_a1"));
        assert_eq!(qs.get("tag"), Some("染髮"));
    }

    #[test]
    fn test_parse_key_only_query_str() {
        let buf = "key-only";
        let expected: HashMap<String, String> = vec![("key-only", "")].iter().map(|(x, y)| (x.to_string(), y.to_string())).collect::<HashMap<_, _>>();
        assert_eq!(QueryString::from(buf), QueryString { items: expected });
    }
}
