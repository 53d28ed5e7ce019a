//! Sanitization boundary.
//!
//! The engine never validates or escapes strings itself; it calls the
//! sanitizer it was constructed with and trusts the output completely. The
//! real sanitization rules live outside this crate. [`BasicSanitizer`] is
//! the embedding default: enough for tests and well-behaved callers, not a
//! security layer.

use crate::codec::charset_for;

pub trait Sanitizer: Send + Sync {
    fn sanitize_url(&self, raw: &str) -> String;
    fn sanitize_keyword(&self, raw: &str) -> String;
    fn sanitize_title(&self, raw: &str) -> String;
    fn sanitize_ip(&self, raw: &str) -> String;
}

/// Minimal default: trims whitespace, strips control characters, and
/// restricts keywords to the configured alphabet.
pub struct BasicSanitizer {
    charset: &'static str,
}

impl BasicSanitizer {
    pub fn new(alphabet: u32) -> Self {
        Self {
            charset: charset_for(alphabet),
        }
    }
}

impl Default for BasicSanitizer {
    fn default() -> Self {
        Self::new(36)
    }
}

impl Sanitizer for BasicSanitizer {
    fn sanitize_url(&self, raw: &str) -> String {
        let cleaned: String = raw.trim().chars().filter(|c| !c.is_control()).collect();
        // Normalize scheme and host casing where the URL parses at all;
        // anything unparseable is passed through for the resolver to refuse
        match url::Url::parse(&cleaned) {
            Ok(parsed) => parsed.to_string(),
            Err(_) => cleaned,
        }
    }

    fn sanitize_keyword(&self, raw: &str) -> String {
        raw.trim()
            .chars()
            .filter(|c| self.charset.contains(*c))
            .collect()
    }

    fn sanitize_title(&self, raw: &str) -> String {
        raw.trim().chars().filter(|c| !c.is_control()).collect()
    }

    fn sanitize_ip(&self, raw: &str) -> String {
        raw.trim()
            .chars()
            .filter(|c| c.is_ascii_hexdigit() || matches!(c, '.' | ':'))
            .collect()
    }
}
