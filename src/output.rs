//! Output formatters for the one-shot `tail` command.
//!
//! Supports human-readable (with colors), JSON, and NDJSON formats. All three
//! print the same rows the dashboard list shows; human and JSON also carry the
//! banner alerts.

use std::io::{self, Write};

use serde::Serialize;

use crate::alerts::{AlertKind, DerivedAlerts};
use crate::list::format_magnitude;
use crate::models::{Feature, OutputEvent, format_local_time};

// ANSI color codes
const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";

const RED_BG: &str = "\x1b[41;97m";
const ORANGE_BG: &str = "\x1b[48;5;208;30m";
const GREEN: &str = "\x1b[92m";
const WHITE: &str = "\x1b[97m";

const ICON_ALERT: &str = "⚠";
const ICON_TSUNAMI: &str = "≈";

/// Output format selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Format {
    /// Human-readable terminal output (default)
    #[default]
    Human,
    /// One JSON document with alerts and rows
    Json,
    /// Newline-delimited JSON (one row per line, no alerts)
    Ndjson,
}

impl std::str::FromStr for Format {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "human" => Ok(Self::Human),
            "json" => Ok(Self::Json),
            "ndjson" => Ok(Self::Ndjson),
            _ => Err(format!("unknown format: {s} (expected: human, json, ndjson)")),
        }
    }
}

/// JSON document for `--format json`.
#[derive(Debug, Serialize)]
struct Report {
    major: Option<OutputEvent>,
    tsunami: Option<OutputEvent>,
    events: Vec<OutputEvent>,
}

/// Row colour by magnitude.
fn row_color(mag: f64) -> &'static str {
    if mag >= 3.0 { GREEN } else { WHITE }
}

/// Write alerts and rows in human-readable format.
///
/// # Errors
///
/// Returns an error if writing fails.
pub fn write_human<W: Write>(
    writer: &mut W,
    alerts: &DerivedAlerts<'_>,
    rows: &[&Feature],
) -> io::Result<()> {
    for (kind, bg, icon) in [
        (AlertKind::Major, RED_BG, ICON_ALERT),
        (AlertKind::Tsunami, ORANGE_BG, ICON_TSUNAMI),
    ] {
        if let Some(event) = alerts.get(kind) {
            writeln!(writer, "{bg}{BOLD} {icon} {} {RESET}", kind.banner_text(event))?;
        }
    }

    if rows.is_empty() {
        writeln!(writer, "{DIM}No minor earthquakes in this feed.{RESET}")?;
        return Ok(());
    }

    for event in rows {
        let mag = event.magnitude();
        let color = row_color(mag);
        writeln!(
            writer,
            "{color}{BOLD}M{}{RESET} │ {DIM}{:>5.0}km{RESET} │ {:<22} │ {}",
            format_magnitude(mag),
            event.depth_km(),
            format_local_time(event.properties.time),
            event.properties.place,
        )?;
    }
    Ok(())
}

/// Write alerts and rows as one JSON document.
///
/// # Errors
///
/// Returns an error if serialization or writing fails.
pub fn write_json<W: Write>(
    writer: &mut W,
    alerts: &DerivedAlerts<'_>,
    rows: &[&Feature],
) -> io::Result<()> {
    let report = Report {
        major: alerts.major.map(OutputEvent::from),
        tsunami: alerts.tsunami.map(OutputEvent::from),
        events: rows.iter().copied().map(OutputEvent::from).collect(),
    };
    let json = serde_json::to_string_pretty(&report)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    writeln!(writer, "{json}")
}

/// Write rows as newline-delimited JSON.
///
/// # Errors
///
/// Returns an error if serialization or writing fails.
pub fn write_ndjson<W: Write>(writer: &mut W, rows: &[&Feature]) -> io::Result<()> {
    for event in rows {
        let output = OutputEvent::from(*event);
        let json = serde_json::to_string(&output)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        writeln!(writer, "{json}")?;
    }
    Ok(())
}

/// Write a report in the specified format.
///
/// # Errors
///
/// Returns an error if writing fails.
pub fn write_report<W: Write>(
    writer: &mut W,
    alerts: &DerivedAlerts<'_>,
    rows: &[&Feature],
    format: Format,
) -> io::Result<()> {
    match format {
        Format::Human => write_human(writer, alerts, rows),
        Format::Json => write_json(writer, alerts, rows),
        Format::Ndjson => write_ndjson(writer, rows),
    }
}
