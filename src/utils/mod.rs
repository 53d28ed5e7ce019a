pub mod ip;

pub use ip::{ip_in_cidr, ip_in_whitelist};

/// Generate a random keyword over the given charset.
pub fn random_keyword(length: usize, charset: &str) -> String {
    use std::iter;

    let chars = charset.as_bytes();
    iter::repeat_with(|| chars[rand::random_range(0..chars.len())] as char)
        .take(length)
        .collect()
}

/// Percent-encode the characters a URL must not carry raw, leaving the URL
/// structure (scheme, slashes, query separators) intact.
pub fn encode_uri(url: &str) -> String {
    const KEEP: &[char] = &[
        ';', ',', '/', '?', ':', '@', '&', '=', '+', '$', '-', '_', '.', '!', '~', '*', '\'', '(',
        ')', '#', '%', '[', ']',
    ];

    let mut out = String::with_capacity(url.len());
    for c in url.chars() {
        if c.is_ascii_alphanumeric() || KEEP.contains(&c) {
            out.push(c);
        } else {
            out.push_str(&urlencoding::encode(&c.to_string()));
        }
    }
    out
}

/// Shorten a long string for display in messages.
pub fn trim_long_string(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// The part of `url` below the installation's base URL, if it is below it.
///
/// Scheme differences between `http` and `https` are ignored, like the rest
/// of the engine does when deciding whether a URL points back at itself.
pub fn relative_to_base(base_url: &str, url: &str) -> Option<String> {
    fn strip_scheme(s: &str) -> &str {
        s.strip_prefix("https://")
            .or_else(|| s.strip_prefix("http://"))
            .unwrap_or(s)
    }

    let base = strip_scheme(base_url.trim_end_matches('/'));
    let url = strip_scheme(url);

    let rest = url.strip_prefix(base)?;
    let rest = rest.strip_prefix('/')?;
    if rest.is_empty() {
        None
    } else {
        Some(rest.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::CHARSET_36;

    #[test]
    fn random_keywords_use_the_charset() {
        let keyword = random_keyword(12, CHARSET_36);
        assert_eq!(keyword.len(), 12);
        assert!(keyword.chars().all(|c| CHARSET_36.contains(c)));
    }

    #[test]
    fn encode_uri_leaves_structure_alone() {
        assert_eq!(
            encode_uri("http://example.com/a?b=c&d=e"),
            "http://example.com/a?b=c&d=e"
        );
        assert_eq!(
            encode_uri("http://example.com/a b"),
            "http://example.com/a%20b"
        );
    }

    #[test]
    fn long_strings_are_trimmed_for_display() {
        assert_eq!(trim_long_string("short", 60), "short");
        let long = "x".repeat(80);
        let trimmed = trim_long_string(&long, 10);
        assert_eq!(trimmed, format!("{}...", "x".repeat(7)));
    }

    #[test]
    fn relative_to_base_strips_the_site_root() {
        assert_eq!(
            relative_to_base("http://sho.rt", "http://sho.rt/abc"),
            Some("abc".to_string())
        );
        assert_eq!(
            relative_to_base("http://sho.rt", "https://sho.rt/abc"),
            Some("abc".to_string())
        );
        assert_eq!(relative_to_base("http://sho.rt", "http://sho.rt/"), None);
        assert_eq!(relative_to_base("http://sho.rt", "http://sho.rt"), None);
        assert_eq!(
            relative_to_base("http://sho.rt", "http://example.com/abc"),
            None
        );
    }
}
