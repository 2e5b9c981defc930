use anyhow::{anyhow, Context, Result};
use chrono::Duration;
use tracing::warn;

use crate::{
    tracker::InstanceRow,
    utils::time::{format_timestamp, parse_timestamp},
};

/// Column layout of the activities table. A running instance leaves
/// `stop_time` and `Duration` empty.
pub const TABLE_HEADER: &str = "Activity,start_time,stop_time,Duration";

/// Renders rows into the CSV activities table, header included. Durations
/// are stored as whole seconds.
pub fn render_table(rows: &[InstanceRow]) -> String {
    let mut out = String::from(TABLE_HEADER);
    out.push('\n');
    for row in rows {
        out.push_str(&escape_field(&row.activity));
        out.push(',');
        out.push_str(&format_timestamp(row.start));
        out.push(',');
        if let Some(stop) = row.stop {
            out.push_str(&format_timestamp(stop));
            out.push(',');
            out.push_str(&row.duration.num_seconds().to_string());
        } else {
            out.push(',');
        }
        out.push('\n');
    }
    out
}

/// Parses the activities table. Malformed rows are skipped with a warning
/// instead of failing the whole load. Might happen after a crash mid-write
/// or a bad remote copy.
pub fn parse_table(text: &str) -> Vec<InstanceRow> {
    let mut rows = Vec::new();
    for (index, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            // pandas-era files may end in blanks.
            continue;
        }
        if index == 0 {
            if line.trim() == TABLE_HEADER {
                continue;
            }
            // Hand-edited or remote files may lack the header; their first
            // line is data and must not be dropped.
            warn!("activities table is missing its header");
        }
        match parse_row(line) {
            Ok(row) => rows.push(row),
            Err(e) => warn!("skipping malformed row {}: {e:#}", index + 1),
        }
    }
    rows
}

fn parse_row(line: &str) -> Result<InstanceRow> {
    let fields = split_fields(line)?;
    let [activity, start, stop, duration] = fields.as_slice() else {
        return Err(anyhow!("expected 4 columns, found {}", fields.len()));
    };

    if activity.is_empty() {
        return Err(anyhow!("empty activity name"));
    }
    let start = parse_timestamp(start).context("bad start_time")?;

    if stop.trim().is_empty() {
        return Ok(InstanceRow {
            activity: activity.clone(),
            start,
            stop: None,
            duration: Duration::zero(),
        });
    }

    let stop = parse_timestamp(stop).context("bad stop_time")?;
    // Duration is derivable; an empty column falls back to stop - start.
    let duration = if duration.trim().is_empty() {
        stop - start
    } else {
        Duration::seconds(duration.trim().parse::<i64>().context("bad duration")?)
    };

    Ok(InstanceRow {
        activity: activity.clone(),
        start,
        stop: Some(stop),
        duration,
    })
}

fn escape_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// Splits one CSV line into fields, honoring double-quote escaping.
fn split_fields(line: &str) -> Result<Vec<String>> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut quoted = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if quoted => {
                if chars.peek() == Some(&'"') {
                    chars.next();
                    current.push('"');
                } else {
                    quoted = false;
                }
            }
            '"' if current.is_empty() => quoted = true,
            ',' if !quoted => {
                fields.push(std::mem::take(&mut current));
            }
            c => current.push(c),
        }
    }
    if quoted {
        return Err(anyhow!("unterminated quote"));
    }
    fields.push(current);
    Ok(fields)
}
