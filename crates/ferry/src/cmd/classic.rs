//! Classic command - Convert between canonical and classic events
//!
//! # Usage
//!
//! ```bash
//! ferry classic encode --event event.json --destination-type s3
//! ferry classic decode < classic.ndjson
//! ```

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Subcommand};
use ferry_protocol::{AnalyticsEvent, ClassicOptions, from_classic, to_classic};

use super::{print_lines, read_objects};

/// Classic command arguments
#[derive(Args, Debug)]
pub struct ClassicArgs {
    #[command(subcommand)]
    direction: Direction,
}

#[derive(Subcommand, Debug)]
enum Direction {
    /// Canonical event to classic flat schema
    Encode(EncodeArgs),

    /// Classic flat schema to canonical event
    Decode {
        /// Classic JSON file; reads stdin when omitted
        #[arg(short, long)]
        event: Option<PathBuf>,
    },
}

#[derive(Args, Debug)]
struct EncodeArgs {
    /// Event JSON file; reads stdin when omitted
    #[arg(short, long)]
    event: Option<PathBuf>,

    /// Destination kind; file storage destinations keep camelCase keys
    #[arg(long)]
    destination_type: Option<String>,

    /// Keep property names as sent
    #[arg(long)]
    keep_original_names: bool,
}

/// Run the classic command
pub fn run(args: ClassicArgs) -> Result<()> {
    match args.direction {
        Direction::Encode(args) => {
            let options =
                ClassicOptions::for_destination(args.destination_type.as_deref(), args.keep_original_names);
            let events = read_objects(args.event.as_deref())?;
            print_lines(
                events
                    .into_iter()
                    .map(|map| to_classic(&AnalyticsEvent::from(map), &options)),
            )
        }
        Direction::Decode { event } => {
            let classic = read_objects(event.as_deref())?;
            print_lines(classic.iter().map(from_classic))
        }
    }
}
