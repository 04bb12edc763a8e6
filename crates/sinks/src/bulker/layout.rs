//! Data layouts
//!
//! A layout turns one canonical event into the rows Bulker stores, each
//! tagged with its table.
//!
//! | Layout | Rows | Table |
//! |--------|------|-------|
//! | `segment` | one per event, two for a named track | plural of the type (`identifies`, `pages`, ...), `tracks` + event name |
//! | `segment-single-table` | one | `events` |
//! | `jitsu-legacy` | one classic row | `events` |
//! | `passthrough` | the event as is | `events` |
//!
//! A `JITSU_TABLE_NAME` field on the event overrides the table in every
//! layout and is never stored in the row itself.

use ferry_config::DataLayout;
use ferry_protocol::objects::{KeyCase, first_truthy, transfer, transfer_map, transfer_value};
use ferry_protocol::{
    AnalyticsEvent, ClassicOptions, DEFAULT_TABLE, Map, MappedEvent, TABLE_NAME_PARAMETER,
    UserAgent, Value, to_classic,
};

#[cfg(test)]
#[path = "layout_test.rs"]
mod tests;

/// Options shared by all layouts
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LayoutOptions {
    /// Copy keys verbatim instead of converting them to snake_case
    pub keep_original_names: bool,
    /// Options for the `jitsu-legacy` layout
    pub classic: ClassicOptions,
}

impl LayoutOptions {
    pub fn new(keep_original_names: bool) -> Self {
        Self::for_destination(None, keep_original_names)
    }

    /// Options for a destination type; decides classic key naming
    pub fn for_destination(destination_type: Option<&str>, keep_original_names: bool) -> Self {
        Self {
            keep_original_names,
            classic: ClassicOptions::for_destination(destination_type, keep_original_names),
        }
    }

    pub fn with_user_agent(mut self, user_agent: Option<UserAgent>) -> Self {
        self.classic = self.classic.with_user_agent(user_agent);
        self
    }

    fn case(&self) -> KeyCase {
        KeyCase::from_keep_original(self.keep_original_names)
    }
}

/// Table name for multi-table layouts
pub fn plural(event_type: &str) -> &str {
    match event_type {
        "identify" => "identifies",
        "page" => "pages",
        "track" => "tracks",
        "group" => "groups",
        other => other,
    }
}

/// Map an event to table rows
pub fn map_event(layout: DataLayout, event: &AnalyticsEvent, options: &LayoutOptions) -> Vec<MappedEvent> {
    match layout {
        DataLayout::Passthrough => vec![MappedEvent::new(
            event.without_table_name(),
            event.table_name().unwrap_or(DEFAULT_TABLE),
        )],
        DataLayout::JitsuLegacy => {
            let mut row = to_classic(event, &options.classic);
            row.shift_remove(TABLE_NAME_PARAMETER);
            vec![MappedEvent::new(row, event.table_name().unwrap_or(DEFAULT_TABLE))]
        }
        DataLayout::Segment => segment(event, false, options),
        DataLayout::SegmentSingleTable => segment(event, true, options),
    }
}

fn segment(event: &AnalyticsEvent, single_table: bool, options: &LayoutOptions) -> Vec<MappedEvent> {
    let case = options.case();
    let fields = event.as_map();
    let context = event.context();
    let context_traits = event.get_path(&["context", "traits"]);
    let properties = event.properties();

    let mut row = Map::new();
    // top-level fields of a named track, stored in `tracks` next to the full row
    let mut base_track = None;

    match event.type_str() {
        Some("identify") if single_table => {
            let mut traits = Map::new();
            transfer(&mut traits, context_traits, &["groupId"], case);
            transfer(&mut traits, event.traits(), &["groupId"], case);

            let mut ctx = Map::new();
            ctx.insert("traits".into(), Value::Object(traits));
            transfer(&mut ctx, context, &["groupId", "traits"], case);
            let group_id = first_truthy([
                event.context_field("groupId"),
                event.get_path(&["traits", "groupId"]),
                event.get_path(&["context", "traits", "groupId"]),
            ]);
            transfer_value(&mut ctx, "group_id", group_id, case);

            row.insert("context".into(), Value::Object(ctx));
            transfer(&mut row, properties, &[], case);
            transfer_map(
                &mut row,
                fields,
                &["context", "properties", "traits", "type", TABLE_NAME_PARAMETER],
                case,
            );
        }
        Some("identify") => {
            let mut ctx = Map::new();
            transfer(&mut ctx, context, &["traits"], case);

            row.insert("context".into(), Value::Object(ctx));
            transfer(&mut row, properties, &[], case);
            transfer(&mut row, context_traits, &[], case);
            transfer(&mut row, event.traits(), &[], case);
            transfer_map(
                &mut row,
                fields,
                &["context", "properties", "traits", "type", TABLE_NAME_PARAMETER],
                case,
            );
        }
        Some("group") if single_table => {
            let mut ctx = Map::new();
            ctx.insert("group".into(), Value::Object(Map::new()));
            transfer(&mut ctx, context, &[], case);

            // context.group from the event, if any, is extended with the group traits
            if !matches!(ctx.get("group"), Some(Value::Object(_))) {
                ctx.insert("group".into(), Value::Object(Map::new()));
            }
            if let Some(Value::Object(group)) = ctx.get_mut("group") {
                transfer(group, event.traits(), &[], case);
            }
            transfer_value(&mut ctx, "group_id", event.get("groupId"), case);

            row.insert("context".into(), Value::Object(ctx));
            transfer(&mut row, properties, &[], case);
            transfer_map(
                &mut row,
                fields,
                &[
                    "context",
                    "properties",
                    "traits",
                    "type",
                    "groupId",
                    TABLE_NAME_PARAMETER,
                ],
                case,
            );
        }
        Some("group") => {
            let mut ctx = Map::new();
            transfer(&mut ctx, context, &["traits"], case);

            row.insert("context".into(), Value::Object(ctx));
            transfer(&mut row, properties, &[], case);
            transfer(&mut row, event.traits(), &[], case);
            transfer_map(
                &mut row,
                fields,
                &["context", "properties", "traits", "type", TABLE_NAME_PARAMETER],
                case,
            );
        }
        Some("track") if single_table => {
            let mut traits = Map::new();
            transfer(&mut traits, context_traits, &["groupId"], case);
            transfer(
                &mut traits,
                event.get_path(&["properties", "traits"]),
                &["groupId"],
                case,
            );

            let mut ctx = Map::new();
            ctx.insert("traits".into(), Value::Object(traits));
            transfer(&mut ctx, context, &["groupId", "traits"], case);
            let group_id = first_truthy([
                event.context_field("groupId"),
                event.get_path(&["context", "traits", "groupId"]),
            ]);
            transfer_value(&mut ctx, "group_id", group_id, case);

            row.insert("context".into(), Value::Object(ctx));
            transfer(&mut row, properties, &["traits"], case);
            transfer_map(
                &mut row,
                fields,
                &["context", "properties", "type", TABLE_NAME_PARAMETER],
                case,
            );
        }
        Some("track") => {
            let mut base = Map::new();
            transfer_map(
                &mut base,
                fields,
                &["properties", "type", TABLE_NAME_PARAMETER],
                case,
            );
            base_track = Some(base);

            transfer(&mut row, properties, &[], case);
            transfer_map(
                &mut row,
                fields,
                &["properties", "type", TABLE_NAME_PARAMETER],
                case,
            );
        }
        _ if single_table => {
            let mut traits = Map::new();
            transfer(&mut traits, context_traits, &["groupId"], case);

            let mut ctx = Map::new();
            ctx.insert("traits".into(), Value::Object(traits));
            transfer(&mut ctx, context, &["groupId", "traits"], case);
            let group_id = first_truthy([
                event.context_field("groupId"),
                event.get_path(&["context", "traits", "groupId"]),
            ]);
            transfer_value(&mut ctx, "group_id", group_id, case);

            row.insert("context".into(), Value::Object(ctx));
            transfer(&mut row, properties, &[], case);
            transfer_map(
                &mut row,
                fields,
                &["context", "properties", TABLE_NAME_PARAMETER],
                case,
            );
        }
        _ => {
            transfer(&mut row, properties, &[], case);
            transfer_map(&mut row, fields, &["properties", TABLE_NAME_PARAMETER], case);
        }
    }

    if let Some(table) = event.table_name() {
        stamp_type(&mut row, event);
        return vec![MappedEvent::new(row, table)];
    }

    if single_table {
        stamp_type(&mut row, event);
        return vec![MappedEvent::new(row, DEFAULT_TABLE)];
    }

    let event_type = event.type_str().unwrap_or_default();
    match (event_type, event.event_name().filter(|name| !name.is_empty()), base_track) {
        ("track", Some(name), Some(base)) => vec![
            MappedEvent::new(base, plural("track")),
            MappedEvent::new(row, name),
        ],
        _ => vec![MappedEvent::new(row, plural(event_type))],
    }
}

fn stamp_type(row: &mut Map<String, Value>, event: &AnalyticsEvent) {
    if let Some(event_type) = event.get("type") {
        row.insert("type".into(), event_type.clone());
    }
}
