//! Classic event codec
//!
//! Converts between the canonical nested analytics schema and the flat
//! legacy ("classic") schema still expected by older storage destinations.
//!
//! # Field mapping
//!
//! | Classic | Canonical |
//! |---------|-----------|
//! | `anon_ip` | `context.ip` with the last octet zeroed (encode only) |
//! | `source_ip` | `context.ip` |
//! | `api_key` | `writeKey` |
//! | `doc_host` / `doc_path` / `doc_search` | `context.page.host` / `path` / `search` |
//! | `doc_encoding` | `context.page.encoding` |
//! | `eventn_ctx_event_id` | `messageId` |
//! | `event_type` | `event` or `type` |
//! | `local_tz_offset` | `context.page.timezoneOffset` |
//! | `page_title` / `referer` / `url` | `context.page.title` / `referrer` / `url` |
//! | `screen_resolution` / `vp_size` | `context.screen` as `"<w>x<h>"` |
//! | `user` | `userId`, `anonymousId`, traits |
//! | `location` | `context.geo` |
//! | `ids` / `click_id` | `context.clientIds` |
//! | `parsed_ua` | host-supplied parsed user agent (encode only) |
//! | `user_agent` / `user_language` | `context.userAgent` / `context.locale` |
//! | `utc_time` / `_timestamp` | `timestamp` / `receivedAt` |
//! | `utm` | `context.campaign` |
//!
//! Every other classic field is a property.
//!
//! Encoding then decoding is lossy only for `anon_ip` (and `parsed_ua`,
//! which comes from the invocation rather than the event).

mod decode;
mod encode;

pub use decode::from_classic;
pub use encode::to_classic;

use crate::objects::KeyCase;
use crate::user_agent::UserAgent;

/// Destination types that store files rather than warehouse tables
pub const FILE_STORAGE_DESTINATIONS: &[&str] = &["s3", "gcs"];

/// Value of `src` when the event does not carry one
pub const DEFAULT_SRC: &str = "jitsu";

/// Top-level classic fields with a fixed meaning; never treated as properties
const FIXED_FIELDS: &[&str] = &[
    crate::TABLE_NAME_PARAMETER,
    "anon_ip",
    "api_key",
    "click_id",
    "doc_encoding",
    "doc_host",
    "doc_path",
    "doc_search",
    "eventn_ctx_event_id",
    "event_type",
    "ids",
    "local_tz_offset",
    "page_title",
    "referer",
    "screen_resolution",
    "source_ip",
    "url",
    "user",
    "location",
    "parsed_ua",
    "user_agent",
    "user_language",
    "utc_time",
    "_timestamp",
    "utm",
    "vp_size",
];

/// Page properties already represented by fixed fields on non-track events
const PAGE_PROPERTIES: &[&str] = &[
    "url", "title", "referrer", "search", "host", "path", "width", "height",
];

/// Options for [`to_classic`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClassicOptions {
    /// Naming applied to traits and properties
    pub naming: KeyCase,
    /// Parsed user agent of the request that produced the event
    pub user_agent: Option<UserAgent>,
}

impl ClassicOptions {
    pub fn new(naming: KeyCase) -> Self {
        Self {
            naming,
            user_agent: None,
        }
    }

    /// Pick the naming for a destination.
    ///
    /// File storage keeps original names when asked to; warehouses need valid
    /// column identifiers, so "original" there means the classic form.
    /// Without `keep_original_names` everything is snake_cased.
    pub fn for_destination(destination_type: Option<&str>, keep_original_names: bool) -> Self {
        let file_storage =
            destination_type.is_some_and(|t| FILE_STORAGE_DESTINATIONS.contains(&t));
        let naming = match (keep_original_names, file_storage) {
            (false, _) => KeyCase::SnakeCase,
            (true, true) => KeyCase::Original,
            (true, false) => KeyCase::Classic,
        };
        Self::new(naming)
    }

    pub fn with_user_agent(mut self, user_agent: Option<UserAgent>) -> Self {
        self.user_agent = user_agent;
        self
    }
}
