//! Export of buffered events as JSON or CSV text

use std::fmt;
use std::str::FromStr;

use serde_json::Value;

use crate::error::{Result, TrackerError};
use crate::event::InteractionEvent;

/// Export format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExportFormat {
    Json,
    Csv,
}

impl ExportFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Csv => "csv",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExportFormat {
    type Err = TrackerError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "csv" => Ok(Self::Csv),
            other => Err(TrackerError::UnsupportedFormat(other.to_string())),
        }
    }
}

/// Export events in the requested format.
pub fn export_events(events: &[InteractionEvent], format: ExportFormat) -> Result<String> {
    match format {
        ExportFormat::Json => to_json(events),
        ExportFormat::Csv => to_csv(events),
    }
}

/// Pretty-printed JSON array with 2-space indentation.
pub fn to_json(events: &[InteractionEvent]) -> Result<String> {
    Ok(serde_json::to_string_pretty(events)?)
}

/// CSV whose columns are the keys of the first event.
///
/// Every cell is the JSON encoding of the value, missing and null values
/// become `""`, and keys that only later events carry are dropped. Cells are
/// written verbatim (no CSV quoting) and there is no trailing newline. An
/// empty slice yields an empty string.
pub fn to_csv(events: &[InteractionEvent]) -> Result<String> {
    let Some(first) = events.first() else {
        return Ok(String::new());
    };

    let keys: Vec<String> = match serde_json::to_value(first)? {
        Value::Object(map) => map.keys().cloned().collect(),
        _ => Vec::new(),
    };

    let mut writer = csv::WriterBuilder::new()
        .quote_style(csv::QuoteStyle::Never)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    writer
        .write_record(&keys)
        .map_err(|e| TrackerError::Csv(e.to_string()))?;

    for event in events {
        let record = serde_json::to_value(event)?;
        let row = keys
            .iter()
            .map(|key| csv_cell(record.get(key)))
            .collect::<Result<Vec<_>>>()?;
        writer
            .write_record(&row)
            .map_err(|e| TrackerError::Csv(e.to_string()))?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| TrackerError::Csv(e.to_string()))?;
    let mut out = String::from_utf8(bytes).map_err(|e| TrackerError::Csv(e.to_string()))?;
    if out.ends_with('\n') {
        out.pop();
    }
    Ok(out)
}

fn csv_cell(value: Option<&Value>) -> Result<String> {
    match value {
        None | Some(Value::Null) => Ok("\"\"".to_string()),
        Some(value) => Ok(serde_json::to_string(value)?),
    }
}
