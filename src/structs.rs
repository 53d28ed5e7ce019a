//! Shared request/response types for the resolution engine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::storage::LinkRecord;

/// Identity of the requester, as established by the (out of scope) HTTP
/// boundary. Sanitized before it reaches the engine.
#[derive(Debug, Clone, Default)]
pub struct Caller {
    pub ip: String,
    pub user: Option<String>,
    /// Authenticated privileged user, relevant under private mode.
    pub privileged: bool,
}

impl Caller {
    pub fn anonymous<T: Into<String>>(ip: T) -> Self {
        Self {
            ip: ip.into(),
            user: None,
            privileged: false,
        }
    }
}

/// Input to [`LinkResolver::get_or_create_link`](crate::services::LinkResolver::get_or_create_link).
#[derive(Debug, Clone, Default)]
pub struct ResolveRequest {
    pub url: String,
    pub keyword: Option<String>,
    pub title: Option<String>,
    /// The call must create a new record; never reuse an existing one.
    pub strict_create: bool,
    /// The supplied keyword is mandatory; an empty one is an error and a
    /// taken one that does not match is a conflict.
    pub strict_keyword: bool,
    /// An empty title is acceptable and must not be fetched remotely; a
    /// reused record must match the supplied title.
    pub strict_title: bool,
    pub caller: Caller,
}

impl ResolveRequest {
    pub fn new<T: Into<String>>(url: T, caller: Caller) -> Self {
        Self {
            url: url.into(),
            caller,
            ..Self::default()
        }
    }

    pub fn with_keyword<T: Into<String>>(mut self, keyword: T) -> Self {
        self.keyword = Some(keyword.into());
        self
    }

    pub fn with_title<T: Into<String>>(mut self, title: T) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn strict_create(mut self) -> Self {
        self.strict_create = true;
        self
    }

    pub fn strict_keyword(mut self) -> Self {
        self.strict_keyword = true;
        self
    }

    pub fn strict_title(mut self) -> Self {
        self.strict_title = true;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Success,
    Fail,
}

/// Recoverable failure taxonomy. Every variant is a result value handed back
/// to the caller, never an exception.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
pub enum ErrorCode {
    #[serde(rename = "error:url")]
    #[strum(serialize = "error:url")]
    Url,
    #[serde(rename = "error:keyword")]
    #[strum(serialize = "error:keyword")]
    Keyword,
    #[serde(rename = "error:keyword_reserved")]
    #[strum(serialize = "error:keyword_reserved")]
    KeywordReserved,
    #[serde(rename = "error:keyword_taken")]
    #[strum(serialize = "error:keyword_taken")]
    KeywordTaken,
    #[serde(rename = "error:noloop")]
    #[strum(serialize = "error:noloop")]
    NoLoop,
    #[serde(rename = "error:url_illegalduplicate")]
    #[strum(serialize = "error:url_illegalduplicate")]
    UrlIllegalDuplicate,
    #[serde(rename = "error:db")]
    #[strum(serialize = "error:db")]
    Db,
    #[serde(rename = "error:keyword_space_exhausted")]
    #[strum(serialize = "error:keyword_space_exhausted")]
    KeywordSpaceExhausted,
    #[serde(rename = "error:unknown")]
    #[strum(serialize = "error:unknown")]
    Unknown,
}

/// Normalized view of a link record as it appears in result objects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkSummary {
    pub keyword: String,
    pub url: String,
    pub title: String,
    pub date: DateTime<Utc>,
    pub ip: String,
    pub clicks: u64,
}

impl From<LinkRecord> for LinkSummary {
    fn from(record: LinkRecord) -> Self {
        Self {
            keyword: record.keyword,
            url: record.url,
            title: record.title,
            date: record.created_at,
            ip: record.ip,
            clicks: record.clicks,
        }
    }
}

/// Terminal outcome of a resolution or edit operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Resolution {
    #[serde(rename = "statusCode")]
    pub status_code: u16,
    pub status: Status,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<ErrorCode>,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(rename = "url", skip_serializing_if = "Option::is_none")]
    pub link: Option<LinkSummary>,
    #[serde(rename = "shorturl", skip_serializing_if = "Option::is_none")]
    pub short_url: Option<String>,
}

impl Resolution {
    pub fn fail<T: Into<String>>(code: ErrorCode, status_code: u16, message: T) -> Self {
        Self {
            status_code,
            status: Status::Fail,
            code: Some(code),
            message: message.into(),
            title: None,
            link: None,
            short_url: None,
        }
    }

    /// Failure without a taxonomy code, used by edit refusals.
    pub fn fail_plain<T: Into<String>>(status_code: u16, message: T) -> Self {
        Self {
            status_code,
            status: Status::Fail,
            code: None,
            message: message.into(),
            title: None,
            link: None,
            short_url: None,
        }
    }

    pub fn success<T: Into<String>>(record: LinkRecord, base_url: &str, message: T) -> Self {
        let short_url = format!("{}/{}", base_url, record.keyword);
        let summary = LinkSummary::from(record);
        Self {
            status_code: 200,
            status: Status::Success,
            code: None,
            message: message.into(),
            title: Some(summary.title.clone()),
            link: Some(summary),
            short_url: Some(short_url),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == Status::Success
    }
}

/// A fatal outcome aborts the in-flight request with a fixed status and
/// message, bypassing the [`Resolution`] path entirely. Flood rejection and
/// nonce verification failure are the only producers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fatal {
    pub status_code: u16,
    pub message: String,
}

impl Fatal {
    pub fn forbidden<T: Into<String>>(message: T) -> Self {
        Self {
            status_code: 403,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for Fatal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.status_code, self.message)
    }
}

impl std::error::Error for Fatal {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_codes_render_in_wire_form() {
        assert_eq!(ErrorCode::Url.to_string(), "error:url");
        assert_eq!(ErrorCode::KeywordTaken.to_string(), "error:keyword_taken");
        assert_eq!(
            ErrorCode::UrlIllegalDuplicate.to_string(),
            "error:url_illegalduplicate"
        );
    }

    #[test]
    fn resolution_serializes_like_the_api_payload() {
        let r = Resolution::fail(ErrorCode::NoLoop, 403, "URL is a short URL");
        let json = serde_json::to_value(&r).unwrap();
        assert_eq!(json["status"], "fail");
        assert_eq!(json["code"], "error:noloop");
        assert_eq!(json["statusCode"], 403);
    }
}
