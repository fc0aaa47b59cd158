//! Plain-text rendering of results for the terminal.

use std::{fmt::Write as _, time::Duration};

use anyhow::{Context as _, Result};
use olap_core::Value;
use serde::Serialize;

/// Floats are shown with this many decimals.
const FLOAT_DECIMALS: usize = 2;

fn cell(value: &Value) -> String {
  match value {
    Value::Float(v) => format!("{v:.FLOAT_DECIMALS$}"),
    other => other.to_string(),
  }
}

fn is_numeric(value: &Value) -> bool {
  matches!(value, Value::Int(_) | Value::Float(_))
}

pub fn header(names: &[&str]) -> Vec<String> {
  names.iter().map(|s| (*s).to_owned()).collect()
}

/// Render `rows` under a header, columns padded to their widest cell.
/// Numbers are right-aligned, everything else left-aligned.
pub fn render_table(columns: &[String], rows: &[Vec<Value>]) -> String {
  let cells: Vec<Vec<String>> = rows
    .iter()
    .map(|row| row.iter().map(cell).collect())
    .collect();

  let mut widths: Vec<usize> = columns.iter().map(|c| c.chars().count()).collect();
  for row in &cells {
    for (width, text) in widths.iter_mut().zip(row) {
      *width = (*width).max(text.chars().count());
    }
  }

  let mut out = String::new();
  let header: Vec<String> = columns
    .iter()
    .zip(&widths)
    .map(|(c, &w)| format!("{c:<w$}"))
    .collect();
  let _ = writeln!(out, "{}", header.join(" | ").trim_end());
  let rule: Vec<String> = widths.iter().map(|&w| "-".repeat(w)).collect();
  let _ = writeln!(out, "{}", rule.join("-+-"));

  for (row, texts) in rows.iter().zip(&cells) {
    let padded: Vec<String> = row
      .iter()
      .zip(texts)
      .zip(&widths)
      .map(|((value, text), &w)| {
        if is_numeric(value) { format!("{text:>w$}") } else { format!("{text:<w$}") }
      })
      .collect();
    let _ = writeln!(out, "{}", padded.join(" | ").trim_end());
  }
  out
}

pub fn format_elapsed(elapsed: Duration) -> String {
  format!("{:.2} ms", elapsed.as_secs_f64() * 1000.0)
}

pub fn format_bytes(bytes: Option<u64>) -> String {
  const UNITS: [&str; 4] = ["B", "KiB", "MiB", "GiB"];
  let Some(bytes) = bytes else {
    return "-".to_owned();
  };
  let mut size = bytes as f64;
  let mut unit = 0;
  while size >= 1024.0 && unit < UNITS.len() - 1 {
    size /= 1024.0;
    unit += 1;
  }
  if unit == 0 { format!("{bytes} B") } else { format!("{size:.1} {}", UNITS[unit]) }
}

/// Pretty JSON for `--json` output.
pub fn to_json<T: Serialize>(value: &T) -> Result<String> {
  serde_json::to_string_pretty(value).context("serialising output")
}
