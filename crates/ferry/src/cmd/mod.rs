//! Command implementations for the Ferry CLI

pub mod classic;
pub mod map;
pub mod run;

use std::fs;
use std::io::{self, BufWriter, Read, Write};
use std::path::Path;

use anyhow::{Context, Result, bail};
use ferry_protocol::{Map, Value};
use serde::Serialize;

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;

/// Read JSON objects from a file, or stdin when no path is given
///
/// Accepts a single object, an array of objects, or one object per line.
pub fn read_objects(path: Option<&Path>) -> Result<Vec<Map<String, Value>>> {
    let input = match path {
        Some(path) => fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?,
        None => {
            let mut input = String::new();
            io::stdin()
                .read_to_string(&mut input)
                .context("failed to read stdin")?;
            input
        }
    };
    parse_objects(&input)
}

fn parse_objects(input: &str) -> Result<Vec<Map<String, Value>>> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        bail!("no input events");
    }

    // whole document first, then one document per line
    let values = match serde_json::from_str::<Value>(trimmed) {
        Ok(Value::Array(values)) => values,
        Ok(value) => vec![value],
        Err(_) => trimmed
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(i, line)| {
                serde_json::from_str(line).with_context(|| format!("invalid JSON on line {}", i + 1))
            })
            .collect::<Result<_>>()?,
    };

    values
        .into_iter()
        .enumerate()
        .map(|(i, value)| match value {
            Value::Object(map) => Ok(map),
            other => bail!("input {} is not a JSON object: {}", i + 1, other),
        })
        .collect()
}

/// Write one JSON document per line to stdout
pub fn print_lines<T: Serialize>(items: impl IntoIterator<Item = T>) -> Result<()> {
    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    for item in items {
        serde_json::to_writer(&mut out, &item)?;
        writeln!(out)?;
    }
    out.flush()?;
    Ok(())
}
