use std::io::{self, IsTerminal, Write};

use anyhow::anyhow;
use chrono::Local;
use unicode_width::UnicodeWidthStr;

use crate::config::Config;
use crate::model::{Category, Priority, Stats, Tag, Task};

#[derive(Debug, Clone)]
pub struct Renderer {
    color: bool,
}

impl Renderer {
    pub fn new(cfg: &Config) -> anyhow::Result<Self> {
        let color_cfg = cfg.get("color").unwrap_or_else(|| "on".to_string());
        let color = match color_cfg.to_ascii_lowercase().as_str() {
            "on" | "yes" | "true" | "1" => true,
            "off" | "no" | "false" | "0" => false,
            other => return Err(anyhow!("invalid color setting: {other}")),
        };

        Ok(Self { color })
    }

    #[tracing::instrument(skip_all)]
    pub fn print_task_table(
        &mut self,
        tasks: &[Task],
        categories: &[Category],
        tags: &[Tag],
    ) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();

        let headers = vec![
            "ID".to_string(),
            "Done".to_string(),
            "Pri".to_string(),
            "Status".to_string(),
            "Title".to_string(),
            "Category".to_string(),
            "Tags".to_string(),
        ];

        let mut rows = Vec::with_capacity(tasks.len());

        for task in tasks {
            let id = self.paint(&short_id(&task.id), "33");
            let done = if task.completed { "[x]" } else { "[ ]" }.to_string();

            let priority = task.priority.as_str().to_string();
            let priority = if task.priority == Priority::High {
                self.paint(&priority, "31")
            } else {
                priority
            };

            // A deleted category leaves a dangling id; show "-" like an
            // unset one.
            let category = task
                .category_id
                .as_ref()
                .and_then(|id| categories.iter().find(|category| category.id == *id))
                .map(|category| category.name.clone())
                .unwrap_or_else(|| "-".to_string());

            // Stale tag ids are dropped from display only.
            let tag_names = task
                .tags
                .iter()
                .filter_map(|tag_id| tags.iter().find(|tag| tag.id == *tag_id))
                .map(|tag| format!("+{}", tag.name))
                .collect::<Vec<_>>()
                .join(" ");

            rows.push(vec![
                id,
                done,
                priority,
                task.status.as_str().to_string(),
                task.title.clone(),
                category,
                tag_names,
            ]);
        }

        write_table(&mut out, headers, rows)?;
        Ok(())
    }

    #[tracing::instrument(skip_all)]
    pub fn print_task_info(
        &mut self,
        task: &Task,
        categories: &[Category],
        tags: &[Tag],
    ) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();

        writeln!(out, "id          {}", task.id)?;
        writeln!(out, "title       {}", task.title)?;
        if let Some(description) = &task.description {
            writeln!(out, "description {description}")?;
        }
        writeln!(out, "completed   {}", task.completed)?;
        writeln!(out, "priority    {}", task.priority.as_str())?;
        writeln!(out, "status      {}", task.status.as_str())?;
        if let Some(category_id) = &task.category_id {
            let name = categories
                .iter()
                .find(|category| category.id == *category_id)
                .map(|category| category.name.as_str())
                .unwrap_or(category_id.as_str());
            writeln!(out, "category    {name}")?;
        }
        if !task.tags.is_empty() {
            let names: Vec<&str> = task
                .tags
                .iter()
                .map(|tag_id| {
                    tags.iter()
                        .find(|tag| tag.id == *tag_id)
                        .map(|tag| tag.name.as_str())
                        .unwrap_or(tag_id.as_str())
                })
                .collect();
            writeln!(out, "tags        {}", names.join(", "))?;
        }
        writeln!(out, "position    {}", task.position)?;
        writeln!(
            out,
            "created     {}",
            task.created_at.with_timezone(&Local).format("%Y-%m-%d %H:%M")
        )?;
        writeln!(
            out,
            "updated     {}",
            task.updated_at.with_timezone(&Local).format("%Y-%m-%d %H:%M")
        )?;

        Ok(())
    }

    #[tracing::instrument(skip_all)]
    pub fn print_categories(&mut self, categories: &[Category]) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();

        let headers = vec![
            "ID".to_string(),
            "Name".to_string(),
            "Color".to_string(),
            "Icon".to_string(),
        ];
        let rows = categories
            .iter()
            .map(|category| {
                vec![
                    self.paint(&short_id(&category.id), "33"),
                    category.name.clone(),
                    category.color.clone(),
                    category.icon.clone(),
                ]
            })
            .collect();

        write_table(&mut out, headers, rows)?;
        Ok(())
    }

    #[tracing::instrument(skip_all)]
    pub fn print_tags(&mut self, tags: &[Tag]) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();

        let headers = vec!["ID".to_string(), "Name".to_string(), "Color".to_string()];
        let rows = tags
            .iter()
            .map(|tag| {
                vec![
                    self.paint(&short_id(&tag.id), "33"),
                    tag.name.clone(),
                    tag.color.clone(),
                ]
            })
            .collect();

        write_table(&mut out, headers, rows)?;
        Ok(())
    }

    #[tracing::instrument(skip_all)]
    pub fn print_stats(&mut self, stats: &Stats) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();

        writeln!(out, "total        {}", stats.total)?;
        writeln!(out, "completed    {}", stats.completed)?;
        writeln!(out, "pending      {}", stats.pending)?;
        writeln!(out, "in progress  {}", stats.in_progress)?;
        writeln!(out, "done         {}%", stats.completion_rate)?;

        Ok(())
    }

    fn paint(&self, text: &str, code: &str) -> String {
        if !self.color || !io::stdout().is_terminal() {
            return text.to_string();
        }
        format!("\x1b[{code}m{text}\x1b[0m")
    }
}

/// Tables show the first eight characters of an id; commands accept any
/// unambiguous prefix back.
fn short_id(id: &str) -> String {
    id.chars().take(8).collect()
}

fn write_table<W: Write>(
    mut writer: W,
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
) -> anyhow::Result<()> {
    let column_count = headers.len();
    let mut widths = vec![0usize; column_count];

    for (idx, header) in headers.iter().enumerate() {
        widths[idx] = widths[idx].max(UnicodeWidthStr::width(header.as_str()));
    }

    for row in &rows {
        for (idx, cell) in row.iter().enumerate() {
            widths[idx] = widths[idx].max(UnicodeWidthStr::width(strip_ansi(cell).as_str()));
        }
    }

    for idx in 0..column_count {
        write!(writer, "{:width$} ", headers[idx], width = widths[idx])?;
    }
    writeln!(writer)?;

    for idx in 0..column_count {
        write!(writer, "{:-<width$} ", "", width = widths[idx])?;
    }
    writeln!(writer)?;

    for row in rows {
        for idx in 0..column_count {
            let cell = &row[idx];
            let visible_width = UnicodeWidthStr::width(strip_ansi(cell).as_str());
            let padding = widths[idx].saturating_sub(visible_width);
            write!(writer, "{}{} ", cell, " ".repeat(padding))?;
        }
        writeln!(writer)?;
    }

    Ok(())
}

fn strip_ansi(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut escaped = false;

    for ch in s.chars() {
        if escaped {
            if ch == 'm' {
                escaped = false;
            }
            continue;
        }

        if ch == '\x1b' {
            escaped = true;
            continue;
        }

        out.push(ch);
    }

    out
}
