use std::collections::HashMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, anyhow, bail};
use serde_json::Value;
use tracing::debug;

use crate::codec::{ImportRecord, parse_timestamp};
use crate::model::{Priority, Status};

/// Extension gate plus full in-memory read. Anything that is not `.json` or
/// `.csv` (case-insensitive) is rejected before parsing.
#[tracing::instrument]
pub fn from_path(path: &Path) -> anyhow::Result<Vec<ImportRecord>> {
    let extension = path
        .extension()
        .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "json" => {
            let content = fs::read_to_string(path)
                .with_context(|| format!("failed reading {}", path.display()))?;
            from_json(&content)
        }
        "csv" => {
            let content = fs::read_to_string(path)
                .with_context(|| format!("failed reading {}", path.display()))?;
            from_csv(&content)
        }
        _ => Err(anyhow!(
            "unsupported file type: {} (expected a .json or .csv file)",
            path.display()
        )),
    }
}

/// Accepts a single object or an array of objects; every field is coerced
/// field-by-field with defaults, never passed through untyped.
#[tracing::instrument(skip(content))]
pub fn from_json(content: &str) -> anyhow::Result<Vec<ImportRecord>> {
    let parsed: Value = serde_json::from_str(content).context("invalid JSON file format")?;

    let items = match parsed {
        Value::Array(items) => items,
        other => vec![other],
    };

    debug!(count = items.len(), "parsed JSON import items");
    Ok(items.iter().map(record_from_value).collect())
}

fn record_from_value(item: &Value) -> ImportRecord {
    let title = item
        .get("title")
        .and_then(truthy_text)
        .unwrap_or_else(|| "Untitled".to_string());

    let description = item.get("description").and_then(truthy_text);

    let priority = item
        .get("priority")
        .and_then(Value::as_str)
        .and_then(Priority::parse)
        .unwrap_or(Priority::Medium);

    let status = item
        .get("status")
        .and_then(Value::as_str)
        .and_then(Status::parse)
        .unwrap_or(Status::Pending);

    let category_id = item.get("categoryId").and_then(truthy_text);

    let tags = match item.get("tags") {
        Some(Value::Array(values)) => values.iter().filter_map(value_to_text).collect(),
        _ => vec![],
    };

    let created_at = item
        .get("createdAt")
        .and_then(Value::as_str)
        .and_then(parse_timestamp);

    ImportRecord {
        title,
        description,
        completed: is_truthy(item.get("completed")),
        priority,
        status,
        category_id,
        tags,
        created_at,
    }
}

/// `value || fallback` coercion: false, zero and the empty string count as
/// absent, everything else stringifies.
fn truthy_text(value: &Value) -> Option<String> {
    match value {
        Value::Null | Value::Bool(false) => None,
        Value::Number(number) if number.as_f64() == Some(0.0) => None,
        Value::String(text) if text.is_empty() => None,
        Value::Bool(true) => Some("true".to_string()),
        Value::String(text) => Some(text.clone()),
        other => Some(other.to_string()),
    }
}

/// Plain stringification for list elements, where only null is absent.
fn value_to_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(text) => Some(text.clone()),
        other => Some(other.to_string()),
    }
}

fn is_truthy(value: Option<&Value>) -> bool {
    match value {
        Some(Value::Bool(flag)) => *flag,
        Some(Value::Number(number)) => number.as_f64().is_some_and(|n| n != 0.0),
        Some(Value::String(text)) => !text.is_empty(),
        Some(Value::Array(_)) | Some(Value::Object(_)) => true,
        Some(Value::Null) | None => false,
    }
}

/// Header row required (names lower-cased and trimmed); a missing `title`
/// column, zero data rows, or a structural parse error is a format error.
#[tracing::instrument(skip(content))]
pub fn from_csv(content: &str) -> anyhow::Result<Vec<ImportRecord>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(content.as_bytes());

    let columns: HashMap<String, usize> = reader
        .headers()
        .context("invalid CSV file format")?
        .iter()
        .enumerate()
        .map(|(index, name)| (name.trim().to_lowercase(), index))
        .collect();

    let mut rows = Vec::new();
    for row in reader.records() {
        rows.push(row.context("invalid CSV file format")?);
    }

    if rows.is_empty() {
        bail!("CSV file is empty or has no data rows");
    }
    let Some(&title_index) = columns.get("title") else {
        bail!("CSV must have a \"title\" column");
    };

    debug!(rows = rows.len(), columns = columns.len(), "parsed CSV import rows");

    let cell = |row: &csv::StringRecord, name: &str| -> Option<String> {
        columns
            .get(name)
            .and_then(|&index| row.get(index))
            .map(|raw| raw.trim().to_string())
    };

    let records = rows
        .iter()
        .map(|row| {
            let title = row
                .get(title_index)
                .map(str::trim)
                .filter(|text| !text.is_empty())
                .unwrap_or("Untitled")
                .to_string();

            let description = cell(row, "description").filter(|text| !text.is_empty());

            let completed = cell(row, "completed")
                .map(|raw| parse_flexible_bool(&raw))
                .unwrap_or(false);

            let priority = cell(row, "priority")
                .and_then(|raw| Priority::parse(&raw.to_lowercase()))
                .unwrap_or(Priority::Medium);

            let status = cell(row, "status")
                .and_then(|raw| Status::parse(&raw.to_lowercase()))
                .unwrap_or(Status::Pending);

            let category_id = cell(row, "categoryid").filter(|text| !text.is_empty());

            let tags = cell(row, "tags")
                .map(|raw| {
                    raw.split([';', ','])
                        .map(str::trim)
                        .filter(|part| !part.is_empty())
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default();

            let created_at = cell(row, "createdat").and_then(|raw| parse_timestamp(&raw));

            ImportRecord {
                title,
                description,
                completed,
                priority,
                status,
                category_id,
                tags,
                created_at,
            }
        })
        .collect();

    Ok(records)
}

/// Tolerant boolean vocabulary for CSV cells; anything else is false.
fn parse_flexible_bool(raw: &str) -> bool {
    matches!(
        raw.trim().to_lowercase().as_str(),
        "true" | "1" | "yes" | "y"
    )
}
