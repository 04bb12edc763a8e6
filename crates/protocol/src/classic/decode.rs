//! Classic → canonical

use serde_json::{Map, Value};

use super::{DEFAULT_SRC, FIXED_FIELDS};
use crate::event::{AnalyticsEvent, TABLE_NAME_PARAMETER};
use crate::objects::{get_path, is_non_empty_object, non_empty, put, transfer, truthy, KeyCase};

/// Rebuild a canonical event from a classic one.
///
/// `event_type` decides the canonical `type`: page views, identify, screen,
/// group and alias calls map to their own types, anything else becomes a
/// `track` named after the original `event_type`.
pub fn from_classic(classic: &Map<String, Value>) -> AnalyticsEvent {
    let field = |key: &str| classic.get(key).cloned();
    let event_type = classic.get("event_type").and_then(Value::as_str);
    let (kind, name) = event_kind(event_type);

    let mut traits = Map::new();
    transfer(&mut traits, classic.get("user"), &["id", "anonymous_id"], KeyCase::Original);
    let traits = non_empty(traits);

    let mut properties = Map::new();
    for (k, v) in classic {
        if FIXED_FIELDS.contains(&k.as_str()) {
            continue;
        }
        if k == "src" && v.as_str() == Some(DEFAULT_SRC) {
            continue;
        }
        properties.insert(k.clone(), v.clone());
    }
    if kind == "page" {
        put(&mut properties, "url", field("url"));
        put(&mut properties, "title", field("page_title"));
        put(&mut properties, "referrer", field("referer"));
        put(&mut properties, "search", field("doc_search"));
        put(&mut properties, "host", field("doc_host"));
        put(&mut properties, "path", field("doc_path"));
        if let Some((w, h)) = classic.get("vp_size").and_then(split_dimensions) {
            properties.insert("width".into(), w.into());
            properties.insert("height".into(), h.into());
        }
    }

    let mut page = Map::new();
    put(&mut page, "url", field("url"));
    put(&mut page, "title", field("page_title"));
    put(&mut page, "referrer", field("referer"));
    put(&mut page, "search", field("doc_search"));
    put(&mut page, "host", field("doc_host"));
    put(&mut page, "path", field("doc_path"));
    put(&mut page, "encoding", field("doc_encoding"));
    put(&mut page, "timezoneOffset", field("local_tz_offset"));

    let mut screen = Map::new();
    if let Some((w, h)) = classic.get("screen_resolution").and_then(split_dimensions) {
        screen.insert("width".into(), w.into());
        screen.insert("height".into(), h.into());
    }
    if let Some((w, h)) = classic.get("vp_size").and_then(split_dimensions) {
        screen.insert("innerWidth".into(), w.into());
        screen.insert("innerHeight".into(), h.into());
    }

    let mut context = Map::new();
    put(&mut context, "ip", field("source_ip"));
    put(&mut context, "locale", field("user_language"));
    put(&mut context, "userAgent", field("user_agent"));
    put(&mut context, "page", non_empty(page));
    put(&mut context, "screen", non_empty(screen));
    put(&mut context, "clientIds", client_ids(classic));
    put(&mut context, "campaign", field("utm"));
    put(&mut context, "traits", traits.clone());
    put(&mut context, "geo", geo(classic.get("location")));

    let user = classic.get("user");
    let mut event = Map::new();
    put(&mut event, TABLE_NAME_PARAMETER, field(TABLE_NAME_PARAMETER));
    put(&mut event, "messageId", field("eventn_ctx_event_id"));
    put(&mut event, "userId", user.and_then(|u| get_path(u, &["id"])).cloned());
    put(
        &mut event,
        "anonymousId",
        user.and_then(|u| get_path(u, &["anonymous_id"])).cloned(),
    );
    put(&mut event, "timestamp", field("utc_time"));
    put(&mut event, "receivedAt", field("_timestamp"));
    put(&mut event, "writeKey", field("api_key"));
    event.insert("type".into(), Value::String(kind.to_string()));
    put(&mut event, "event", name.map(|n| Value::String(n.to_string())));
    put(&mut event, "context", non_empty(context));
    put(&mut event, "properties", non_empty(properties));
    if kind == "identify" || kind == "group" {
        put(&mut event, "traits", traits);
    }

    AnalyticsEvent::from(event)
}

/// Canonical type and, for page views and tracks, the event name
fn event_kind(event_type: Option<&str>) -> (&'static str, Option<&str>) {
    let lower = event_type.unwrap_or_default().to_ascii_lowercase();
    match lower.as_str() {
        "pageview" | "page_view" | "page" => ("page", event_type),
        "identify" => ("identify", None),
        "screen" => ("screen", None),
        "group" => ("group", None),
        "alias" => ("alias", None),
        _ => ("track", event_type),
    }
}

fn client_ids(classic: &Map<String, Value>) -> Option<Value> {
    let ids = classic.get("ids");
    let click_id = classic.get("click_id");
    if !is_non_empty_object(ids) && !is_non_empty_object(click_id) {
        return None;
    }
    let id = |key: &str| ids.and_then(|i| get_path(i, &[key])).cloned();

    let mut client_ids = Map::new();
    if let Some(ga) = id("ga").filter(truthy) {
        let mut ga4 = Map::new();
        ga4.insert("clientId".into(), ga);
        client_ids.insert("ga4".into(), Value::Object(ga4));
    }
    put(&mut client_ids, "fbp", id("fbp"));
    put(&mut client_ids, "fbc", id("fbc"));
    transfer(&mut client_ids, click_id, &[], KeyCase::Original);
    Some(Value::Object(client_ids))
}

fn geo(location: Option<&Value>) -> Option<Value> {
    if !is_non_empty_object(location) {
        return None;
    }
    let loc = |key: &str| location.and_then(|l| get_path(l, &[key])).cloned();
    let object = |fields: &[(&str, Option<Value>)]| {
        let mut map = Map::new();
        for (k, v) in fields {
            put(&mut map, k, v.clone());
        }
        Value::Object(map)
    };

    let mut geo = Map::new();
    geo.insert("city".into(), object(&[("name", loc("city"))]));
    geo.insert("continent".into(), object(&[("code", loc("continent"))]));
    geo.insert(
        "country".into(),
        object(&[("code", loc("country")), ("name", loc("country_name"))]),
    );
    geo.insert(
        "location".into(),
        object(&[
            ("latitude", loc("latitude")),
            ("longitude", loc("longitude")),
            ("timezone", loc("timezone")),
        ]),
    );
    geo.insert("region".into(), object(&[("code", loc("region"))]));
    geo.insert("postalCode".into(), object(&[("code", loc("zip"))]));
    geo.insert(
        "provider".into(),
        object(&[
            (
                "as",
                Some(object(&[
                    ("num", loc("autonomous_system_number")),
                    ("name", loc("autonomous_system_organization")),
                ])),
            ),
            ("isp", loc("isp")),
            ("domain", loc("domain")),
        ]),
    );
    Some(Value::Object(geo))
}

/// Parse `"<w>x<h>"` into two integers
fn split_dimensions(value: &Value) -> Option<(i64, i64)> {
    let mut parts = value.as_str()?.split('x');
    let w = parts.next()?.trim().parse().ok()?;
    let h = parts.next()?.trim().parse().ok()?;
    match parts.next() {
        None => Some((w, h)),
        Some(_) => None,
    }
}
