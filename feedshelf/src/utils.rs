/// URL helpers shared by feed and link submission
pub mod url {
    use crate::types::{AggregatorError, Result};
    use url::Url;

    /// Parses a caller-supplied URL, accepting only http and https.
    pub fn validate(raw: &str) -> Result<Url> {
        let parsed = Url::parse(raw.trim())?;
        match parsed.scheme() {
            "http" | "https" if parsed.host().is_some() => Ok(parsed),
            scheme => Err(AggregatorError::UnsupportedScheme(scheme.to_string())),
        }
    }

    pub fn hostname(url: &Url) -> Option<String> {
        url.host_str().map(|h| h.to_string())
    }
}

/// Text helpers for extracted article bodies
pub mod text {
    use once_cell::sync::Lazy;
    use regex::Regex;

    /// Reading speed used for the read-time estimate.
    pub const WORDS_PER_MINUTE: f64 = 285.0;

    static RE_WS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

    /// Collapses whitespace runs of already-decoded text.
    pub fn collapse_whitespace(text: &str) -> String {
        RE_WS.replace_all(text, " ").trim().to_string()
    }

    pub fn read_time_seconds(text: &str) -> i32 {
        let words = text.split_whitespace().count() as f64;
        (words / WORDS_PER_MINUTE * 60.0).round() as i32
    }

    /// First `max_chars` characters, cut back to a word boundary.
    pub fn excerpt(text: &str, max_chars: usize) -> String {
        if text.chars().count() <= max_chars {
            return text.to_string();
        }
        let cut: String = text.chars().take(max_chars).collect();
        match cut.rfind(' ') {
            Some(idx) if idx > 0 => format!("{}…", &cut[..idx]),
            _ => format!("{}…", cut),
        }
    }
}
