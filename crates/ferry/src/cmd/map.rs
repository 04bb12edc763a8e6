//! Map command - Show the warehouse rows for events
//!
//! Prints one `{"event": .., "table": ..}` line per row. Settings not given
//! on the command line come from the `[destination]` section of the config,
//! when there is one.
//!
//! # Usage
//!
//! ```bash
//! ferry map --layout segment --event event.json
//! ferry map --config ferry.toml < events.ndjson
//! ```

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use ferry_config::{Config, DataLayout};
use ferry_protocol::AnalyticsEvent;
use ferry_sinks::bulker::{LayoutOptions, map_event, normalize_ga4};

use super::{print_lines, read_objects};

/// Map command arguments
#[derive(Args, Debug)]
pub struct MapArgs {
    /// Event JSON file (object, array or JSON lines); reads stdin when omitted
    #[arg(short, long)]
    event: Option<PathBuf>,

    /// segment, segment-single-table, jitsu-legacy or passthrough
    #[arg(long)]
    layout: Option<DataLayout>,

    /// Keep property names as sent
    #[arg(long)]
    keep_original_names: bool,

    /// Destination kind, e.g. "postgres"; affects jitsu-legacy key naming
    #[arg(long)]
    destination_type: Option<String>,
}

/// Run the map command
pub fn run(config: Option<&Config>, args: MapArgs) -> Result<()> {
    let destination = config.and_then(|c| c.destination.as_ref());
    let layout = args
        .layout
        .or(destination.map(|d| d.data_layout))
        .unwrap_or_default();
    let keep_original_names =
        args.keep_original_names || destination.is_some_and(|d| d.keep_original_names);
    let destination_type = args
        .destination_type
        .or_else(|| config.and_then(|c| c.connection.destination_type.clone()));

    let options = LayoutOptions::for_destination(destination_type.as_deref(), keep_original_names);
    let rows = read_objects(args.event.as_deref())?
        .into_iter()
        .flat_map(|map| map_one(layout, AnalyticsEvent::from(map), &options));
    print_lines(rows)
}

fn map_one(
    layout: DataLayout,
    mut event: AnalyticsEvent,
    options: &LayoutOptions,
) -> Vec<ferry_protocol::MappedEvent> {
    normalize_ga4(&mut event);
    map_event(layout, &event, options)
}
