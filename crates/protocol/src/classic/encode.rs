//! Canonical → classic

use serde_json::{Map, Value};
use url::Url;

use super::{ClassicOptions, DEFAULT_SRC, PAGE_PROPERTIES};
use crate::event::{AnalyticsEvent, EventType, TABLE_NAME_PARAMETER};
use crate::objects::{
    coalesce, first_truthy, get_path, is_non_empty_object, non_empty, put, transfer, truthy,
    KeyCase,
};
use crate::user_agent::UserAgent;

/// Project a canonical event onto the flat classic schema.
///
/// Absent source fields are left out of the result entirely; explicit
/// `null`s are carried over.
pub fn to_classic(event: &AnalyticsEvent, options: &ClassicOptions) -> Map<String, Value> {
    let context = event.context();
    let ctx = |path: &[&str]| context.and_then(|c| get_path(c, path));
    let page = |key: &str| ctx(&["page", key]);
    let prop = |key: &str| event.get_path(&["properties", key]);

    let url_value = first_truthy([page("url"), prop("url")]);
    let url = url_value
        .and_then(Value::as_str)
        .and_then(|s| Url::parse(s).ok());

    let client_ids = ctx(&["clientIds"]);
    let mut click_id = Map::new();
    transfer(&mut click_id, client_ids, &["ga4", "fbp", "fbc"], KeyCase::Original);

    let mut ids = Map::new();
    if is_non_empty_object(client_ids) {
        put(&mut ids, "ga", ctx(&["clientIds", "ga4", "clientId"]).cloned());
        put(&mut ids, "fbp", ctx(&["clientIds", "fbp"]).cloned());
        put(&mut ids, "fbc", ctx(&["clientIds", "fbc"]).cloned());
    }

    let ip = ctx(&["ip"]);
    let screen = ctx(&["screen"]);
    let has_screen = is_non_empty_object(screen);

    let mut classic = Map::new();
    put(&mut classic, TABLE_NAME_PARAMETER, event.get(TABLE_NAME_PARAMETER).cloned());
    put(
        &mut classic,
        "anon_ip",
        ip.filter(|v| truthy(v))
            .and_then(Value::as_str)
            .and_then(anonymize_ip)
            .map(Value::String),
    );
    classic.insert(
        "api_key".into(),
        first_truthy([event.get("writeKey")])
            .cloned()
            .unwrap_or_else(|| Value::String(String::new())),
    );
    put(&mut classic, "click_id", non_empty(click_id));
    put(&mut classic, "doc_encoding", coalesce([page("encoding"), prop("encoding")]).cloned());
    put(
        &mut classic,
        "doc_host",
        or_from_url(coalesce([page("host"), prop("host")]), url.as_ref().map(url_host)),
    );
    put(
        &mut classic,
        "doc_path",
        or_from_url(coalesce([page("path"), prop("path")]), url.as_ref().map(|u| u.path().to_string())),
    );
    put(
        &mut classic,
        "doc_search",
        or_from_url(coalesce([page("search"), prop("search")]), url.as_ref().map(url_search)),
    );
    put(&mut classic, "eventn_ctx_event_id", event.get("messageId").cloned());
    put(
        &mut classic,
        "event_type",
        first_truthy([event.get("event")]).or(event.get("type")).cloned(),
    );
    put(
        &mut classic,
        "local_tz_offset",
        coalesce([page("timezoneOffset"), prop("timezoneOffset")]).cloned(),
    );
    put(&mut classic, "page_title", page("title").cloned());
    put(&mut classic, "referer", page("referrer").cloned());
    if has_screen {
        classic.insert(
            "screen_resolution".into(),
            Value::String(dimensions(ctx(&["screen", "width"]), ctx(&["screen", "height"]))),
        );
    }
    put(&mut classic, "source_ip", ip.cloned());
    classic.insert(
        "src".into(),
        first_truthy([prop("src")])
            .cloned()
            .unwrap_or_else(|| Value::String(DEFAULT_SRC.to_string())),
    );
    put(&mut classic, "url", url_value.cloned());
    put(&mut classic, "user", non_empty(user(event, options.naming)));
    if is_non_empty_object(ctx(&["geo"])) {
        classic.insert("location".into(), location(|path| ctx(&[&["geo"][..], path].concat())));
    }
    put(&mut classic, "ids", non_empty(ids));
    if let Some(ua) = options.user_agent.as_ref().filter(|ua| !ua.is_empty()) {
        classic.insert("parsed_ua".into(), parsed_ua(ua));
    }
    put(&mut classic, "user_agent", ctx(&["userAgent"]).cloned());
    put(&mut classic, "user_language", ctx(&["locale"]).cloned());
    put(&mut classic, "utc_time", event.get("timestamp").cloned());
    put(&mut classic, "_timestamp", event.get("receivedAt").cloned());
    put(&mut classic, "utm", ctx(&["campaign"]).cloned());
    if has_screen {
        classic.insert(
            "vp_size".into(),
            Value::String(dimensions(
                ctx(&["screen", "innerWidth"]),
                ctx(&["screen", "innerHeight"]),
            )),
        );
    }

    let omit: &[&str] = if event.event_type() == Some(EventType::Track) {
        &[]
    } else {
        PAGE_PROPERTIES
    };
    transfer(&mut classic, event.properties(), omit, options.naming);

    classic
}

/// Zero the last octet of a dotted-quad address
pub(crate) fn anonymize_ip(ip: &str) -> Option<String> {
    let parts: Vec<&str> = ip.split('.').collect();
    if parts.len() == 4 {
        Some(format!("{}.{}.{}.0", parts[0], parts[1], parts[2]))
    } else {
        None
    }
}

fn user(event: &AnalyticsEvent, naming: KeyCase) -> Map<String, Value> {
    let context_traits = event.context_field("traits");
    let traits = event.traits();
    let trait_field = |key: &str| {
        first_truthy([
            context_traits.and_then(|t| t.get(key)),
            traits.and_then(|t| t.get(key)),
        ])
        .cloned()
    };

    let mut user = Map::new();
    put(&mut user, "id", event.get("userId").cloned());
    put(&mut user, "anonymous_id", event.get("anonymousId").cloned());
    put(&mut user, "email", trait_field("email"));
    put(&mut user, "name", trait_field("name"));
    transfer(&mut user, context_traits, &["email", "name"], naming);
    transfer(&mut user, traits, &["email", "name"], naming);
    user
}

fn location<'a>(geo: impl Fn(&[&str]) -> Option<&'a Value>) -> Value {
    let mut location = Map::new();
    let fields: [(&str, &[&str]); 13] = [
        ("city", &["city", "name"]),
        ("continent", &["continent", "code"]),
        ("country", &["country", "code"]),
        ("country_name", &["country", "name"]),
        ("latitude", &["location", "latitude"]),
        ("longitude", &["location", "longitude"]),
        ("region", &["region", "code"]),
        ("zip", &["postalCode", "code"]),
        ("timezone", &["location", "timezone"]),
        ("autonomous_system_number", &["provider", "as", "num"]),
        ("autonomous_system_organization", &["provider", "as", "name"]),
        ("isp", &["provider", "isp"]),
        ("domain", &["provider", "domain"]),
    ];
    for (key, path) in fields {
        put(&mut location, key, geo(path).cloned());
    }
    Value::Object(location)
}

fn parsed_ua(ua: &UserAgent) -> Value {
    let text = |s: Option<&String>| s.map(|s| Value::String(s.clone()));
    let os = ua.os.as_ref();
    let browser = ua.browser.as_ref();
    let device = ua.device.as_ref();

    let mut parsed = Map::new();
    put(&mut parsed, "os_family", text(os.and_then(|o| o.name.as_ref())));
    put(&mut parsed, "os_version", text(os.and_then(|o| o.version.as_ref())));
    put(&mut parsed, "ua_family", text(browser.and_then(|b| b.name.as_ref())));
    put(&mut parsed, "ua_version", text(browser.and_then(|b| b.version.as_ref())));
    put(&mut parsed, "device_brand", text(device.and_then(|d| d.vendor.as_ref())));
    put(&mut parsed, "device_type", text(device.and_then(|d| d.device_type.as_ref())));
    put(&mut parsed, "device_model", text(device.and_then(|d| d.model.as_ref())));
    put(&mut parsed, "bot", ua.bot.map(Value::Bool));
    Value::Object(parsed)
}

/// Explicit value when truthy, otherwise the part derived from the page URL
fn or_from_url(explicit: Option<&Value>, derived: Option<String>) -> Option<Value> {
    match explicit {
        Some(v) if truthy(v) => Some(v.clone()),
        _ => derived.map(Value::String),
    }
}

/// Host with a non-default port, as browsers report `location.host`
fn url_host(url: &Url) -> String {
    let host = url.host_str().unwrap_or_default();
    match url.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    }
}

fn url_search(url: &Url) -> String {
    match url.query() {
        Some(q) if !q.is_empty() => format!("?{q}"),
        _ => String::new(),
    }
}

/// `"<w>x<h>"` in whole pixels, with missing or negative sides reported as 0
fn dimensions(width: Option<&Value>, height: Option<&Value>) -> String {
    format!("{}x{}", dimension(width), dimension(height))
}

fn dimension(value: Option<&Value>) -> i64 {
    let n = match value {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => s.trim().parse::<f64>().unwrap_or(0.0),
        _ => 0.0,
    };
    // NaN casts to 0, out of range saturates
    (n.trunc() as i64).max(0)
}
