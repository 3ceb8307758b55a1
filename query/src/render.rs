use crate::{QueryOutcome, QueryResult};
use comfy_table::presets::ASCII_FULL;
use comfy_table::{ContentArrangement, Table};
use log::{error, warn};
use searchgate_core::{Error, Result};
use serde::Serialize;
use serde_json::Value;
use std::error::Error as _;
use std::fmt;

/// Output encoding of a rendered result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Format {
    #[default]
    Json,
    CompactJson,
    Csv,
    Table,
    Raw,
}

impl Format {
    /// Parse a format token, ignoring case. Unknown tokens fall back to `Json`.
    pub fn parse(token: &str) -> Self {
        match token.trim().to_ascii_lowercase().as_str() {
            "json" => Format::Json,
            "compact_json" => Format::CompactJson,
            "csv" => Format::Csv,
            "jdbc" | "table" => Format::Table,
            "raw" => Format::Raw,
            other => {
                warn!("unknown output format '{other}', using json");
                Format::Json
            }
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Format::Json => write!(f, "json"),
            Format::CompactJson => write!(f, "compact_json"),
            Format::Csv => write!(f, "csv"),
            Format::Table => write!(f, "table"),
            Format::Raw => write!(f, "raw"),
        }
    }
}

/// Render an outcome as text.
///
/// Failures render as their message followed by the chain of causes, and
/// explain plans always as pretty JSON. Never fails: formatting errors are
/// returned as text too.
pub fn render(outcome: &QueryOutcome, format: Format) -> String {
    let rendered = match outcome {
        QueryOutcome::Failure(err) => return failure_text(err),
        QueryOutcome::ExplainPlan(plan) => to_json(plan, true),
        QueryOutcome::Success(result) => render_result(result, format),
    };

    rendered.unwrap_or_else(|err| {
        error!("failed to render {format} result: {err:?}");
        format!("Error formatting results: {err}")
    })
}

/// `message: cause: cause ...`, skipping causes that repeat the text before them.
fn failure_text(err: &Error) -> String {
    let mut text = err.to_string();
    let mut last = text.clone();
    let mut source = err.source();
    while let Some(cause) = source {
        let cause_text = cause.to_string();
        if cause_text != last {
            text.push_str(": ");
            text.push_str(&cause_text);
            last = cause_text;
        }
        source = cause.source();
    }
    text
}

fn render_result(result: &QueryResult, format: Format) -> Result<String> {
    match format {
        Format::Json => to_json(result, true),
        Format::CompactJson => to_json(result, false),
        Format::Csv => Ok(delimited(result, ",", csv_cell)),
        Format::Raw => Ok(delimited(result, "|", |v| v.to_string())),
        Format::Table => Ok(table(result)),
    }
}

fn to_json<T: Serialize>(v: &T, pretty: bool) -> Result<String> {
    let rendered = if pretty {
        serde_json::to_string_pretty(v)
    } else {
        serde_json::to_string(v)
    };
    rendered.map_err(|e| Error::render_failed(e.to_string()).with_source(e))
}

/// Text of a cell, `None` for null.
fn cell_text(v: &Value) -> Option<String> {
    match v {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// Header line plus one line per row.
fn delimited(result: &QueryResult, sep: &str, escape: impl Fn(&str) -> String) -> String {
    let mut lines = Vec::with_capacity(result.datarows.len() + 1);
    lines.push(
        result
            .schema
            .iter()
            .map(|c| escape(c.label()))
            .collect::<Vec<_>>()
            .join(sep),
    );
    for row in &result.datarows {
        lines.push(
            row.iter()
                .map(|v| match (v, cell_text(v)) {
                    // Only strings can smuggle spreadsheet formulas.
                    (Value::String(_), Some(s)) => escape(&s),
                    (_, Some(s)) => s,
                    (_, None) => String::new(),
                })
                .collect::<Vec<_>>()
                .join(sep),
        );
    }
    lines.join("\n")
}

fn csv_cell(s: &str) -> String {
    let s = if s.starts_with(['=', '+', '-', '@']) {
        format!("'{s}")
    } else {
        s.to_string()
    };

    if s.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s
    }
}

fn table(result: &QueryResult) -> String {
    let mut table = Table::new();
    table
        .load_preset(ASCII_FULL)
        .set_content_arrangement(ContentArrangement::Disabled)
        .set_header(result.schema.iter().map(|c| c.label()));

    for row in &result.datarows {
        table.add_row(
            row.iter()
                .map(|v| cell_text(v).unwrap_or_else(|| "NULL".to_string())),
        );
    }

    let n = result.datarows.len();
    format!("{table}\n({n} {})", if n == 1 { "row" } else { "rows" })
}
