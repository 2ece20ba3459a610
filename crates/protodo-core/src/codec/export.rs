use anyhow::{Context, anyhow};
use chrono::NaiveDate;
use tracing::debug;

use crate::model::Task;

pub const CSV_HEADERS: [&str; 10] = [
    "id",
    "title",
    "description",
    "completed",
    "priority",
    "status",
    "categoryId",
    "tags",
    "createdAt",
    "updatedAt",
];

/// Pretty-printed JSON array of full task records, RFC 3339 dates included.
#[tracing::instrument(skip(tasks))]
pub fn to_json(tasks: &[Task]) -> anyhow::Result<String> {
    debug!(count = tasks.len(), "serializing tasks to JSON");
    serde_json::to_string_pretty(tasks).context("failed serializing tasks to JSON")
}

/// Ten-column CSV, RFC-4180 quoting via the csv writer, one row per task.
/// Tag ids are flattened with `;`.
#[tracing::instrument(skip(tasks))]
pub fn to_csv(tasks: &[Task]) -> anyhow::Result<String> {
    debug!(count = tasks.len(), "serializing tasks to CSV");

    let mut writer = csv::Writer::from_writer(Vec::new());
    writer
        .write_record(CSV_HEADERS)
        .context("failed writing CSV header")?;

    for task in tasks {
        writer
            .write_record([
                sanitize_cell(&task.id),
                sanitize_cell(&task.title),
                sanitize_cell(task.description.as_deref().unwrap_or_default()),
                task.completed.to_string(),
                task.priority.as_str().to_string(),
                task.status.as_str().to_string(),
                sanitize_cell(task.category_id.as_deref().unwrap_or_default()),
                sanitize_cell(&task.tags.join(";")),
                task.created_at.to_rfc3339(),
                task.updated_at.to_rfc3339(),
            ])
            .context("failed writing CSV row")?;
    }

    writer.flush().context("failed flushing CSV writer")?;
    let bytes = writer
        .into_inner()
        .map_err(|err| anyhow!("failed finishing CSV output: {err}"))?;
    String::from_utf8(bytes).context("CSV output was not valid UTF-8")
}

/// `protodo-export-YYYY-MM-DD.<ext>`, mirroring the JSON/CSV download names.
pub fn file_name(extension: &str, date: NaiveDate) -> String {
    format!("protodo-export-{}.{extension}", date.format("%Y-%m-%d"))
}

/// Formula-injection guard: a cell whose first non-whitespace character is
/// `=`, `+`, `-` or `@` gets the original (unstripped) value prefixed with a
/// literal single quote.
fn sanitize_cell(value: &str) -> String {
    let stripped = value.trim_start();
    if stripped.starts_with(['=', '+', '-', '@']) {
        format!("'{value}")
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, TimeZone, Utc};

    use super::{file_name, sanitize_cell, to_csv, to_json};
    use crate::model::{NewTask, Priority, Status, Task};

    fn sample_task() -> Task {
        let now = Utc
            .with_ymd_and_hms(2026, 8, 23, 9, 30, 0)
            .single()
            .expect("valid timestamp");
        let mut fields = NewTask::new("Write report");
        fields.description = Some("Quarterly \"numbers\", drafted".to_string());
        fields.priority = Priority::High;
        fields.status = Status::InProgress;
        fields.category_id = Some("cat-1".to_string());
        fields.tags = vec!["t-1".to_string(), "t-2".to_string()];
        Task::new(fields, 0, now)
    }

    #[test]
    fn json_export_carries_every_field() {
        let task = sample_task();
        let text = to_json(&[task.clone()]).expect("export to JSON");

        let value: serde_json::Value = serde_json::from_str(&text).expect("valid JSON");
        let row = &value[0];
        assert_eq!(row["title"], "Write report");
        assert_eq!(row["priority"], "high");
        assert_eq!(row["status"], "in_progress");
        assert_eq!(row["categoryId"], "cat-1");
        assert_eq!(row["tags"][1], "t-2");
        assert_eq!(row["position"], 0);
        assert_eq!(row["id"], serde_json::Value::String(task.id));
        assert!(
            row["createdAt"]
                .as_str()
                .expect("createdAt string")
                .starts_with("2026-08-23")
        );
    }

    #[test]
    fn csv_export_flattens_tags_and_quotes() {
        let text = to_csv(&[sample_task()]).expect("export to CSV");
        let mut lines = text.lines();
        assert_eq!(
            lines.next().expect("header line"),
            "id,title,description,completed,priority,status,categoryId,tags,createdAt,updatedAt"
        );
        let row = lines.next().expect("data row");
        assert!(row.contains("t-1;t-2"));
        // Internal quotes are doubled by the writer, not by hand.
        assert!(row.contains(r#""Quarterly ""numbers"", drafted""#));
    }

    #[test]
    fn formula_cells_are_quote_prefixed() {
        assert_eq!(sanitize_cell("=1+1"), "'=1+1");
        assert_eq!(sanitize_cell("  =1+1"), "'  =1+1");
        assert_eq!(sanitize_cell("@cmd"), "'@cmd");
        assert_eq!(sanitize_cell("+sum"), "'+sum");
        assert_eq!(sanitize_cell("-total"), "'-total");
        assert_eq!(sanitize_cell("plain"), "plain");
        assert_eq!(sanitize_cell("a=b"), "a=b");

        let mut task = sample_task();
        task.title = "=1+1".to_string();
        let text = to_csv(&[task]).expect("export to CSV");
        assert!(text.contains("'=1+1"));
    }

    #[test]
    fn export_file_names_embed_the_date() {
        let date = NaiveDate::from_ymd_opt(2026, 8, 23).expect("valid date");
        assert_eq!(file_name("json", date), "protodo-export-2026-08-23.json");
        assert_eq!(file_name("csv", date), "protodo-export-2026-08-23.csv");
    }
}
