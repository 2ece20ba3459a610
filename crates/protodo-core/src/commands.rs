use std::fs;
use std::path::PathBuf;

use anyhow::{Context, anyhow, bail};
use chrono::Local;
use tracing::{info, instrument};

use crate::cli::{CategoryAction, Command, ExportFormat, TagAction};
use crate::codec::{export, import};
use crate::filter::FilterPatch;
use crate::model::{
    COLOR_PALETTE, CategoryPatch, NewTask, Priority, Status, TagPatch, TaskPatch,
};
use crate::render::Renderer;
use crate::store::Store;

#[instrument(skip(store, renderer, command))]
pub fn dispatch(
    store: &mut Store,
    renderer: &mut Renderer,
    command: Command,
) -> anyhow::Result<()> {
    match command {
        Command::Add {
            title,
            description,
            priority,
            status,
            category,
            tags,
        } => cmd_add(store, title, description, priority, status, category, tags),
        Command::List {
            statuses,
            priorities,
            category,
            tag,
            search,
        } => cmd_list(store, renderer, statuses, priorities, category, tag, search),
        Command::Done { id } => cmd_done(store, &id),
        Command::Status { id, status } => cmd_status(store, &id, &status),
        Command::Edit {
            id,
            title,
            description,
            no_description,
            priority,
            status,
            category,
            no_category,
            tags,
        } => cmd_edit(
            store,
            &id,
            title,
            description,
            no_description,
            priority,
            status,
            category,
            no_category,
            tags,
        ),
        Command::Show { id } => cmd_show(store, renderer, &id),
        Command::Delete { id } => cmd_delete(store, &id),
        Command::Move { from, to } => cmd_move(store, from, to),
        Command::Category { action } => cmd_category(store, renderer, action),
        Command::Tag { action } => cmd_tag(store, renderer, action),
        Command::Palette => cmd_palette(),
        Command::Stats => cmd_stats(store, renderer),
        Command::Import { file } => cmd_import(store, &file),
        Command::Export { format, output } => cmd_export(store, format, output),
    }
}

#[instrument(skip_all)]
fn cmd_add(
    store: &mut Store,
    title: String,
    description: Option<String>,
    priority: Option<String>,
    status: Option<String>,
    category: Option<String>,
    tags: Vec<String>,
) -> anyhow::Result<()> {
    info!("command add");

    let mut fields = NewTask::new(title);
    fields.description = description;
    if let Some(raw) = priority {
        fields.priority = parse_priority(&raw)?;
    }
    if let Some(raw) = status {
        fields.status = parse_status(&raw)?;
        fields.completed = fields.status == Status::Completed;
    }
    if let Some(raw) = category {
        fields.category_id = Some(resolve_category_ref(store, &raw));
    }
    fields.tags = tags
        .iter()
        .map(|raw| resolve_tag_ref(store, raw))
        .collect();

    let task = store.add_todo(fields);
    println!("Created todo {}.", task.id);
    Ok(())
}

#[instrument(skip_all)]
fn cmd_list(
    store: &mut Store,
    renderer: &mut Renderer,
    statuses: Vec<String>,
    priorities: Vec<String>,
    category: Option<String>,
    tag: Option<String>,
    search: Option<String>,
) -> anyhow::Result<()> {
    info!("command list");

    let statuses = statuses
        .iter()
        .map(|raw| parse_status(raw))
        .collect::<anyhow::Result<Vec<Status>>>()?;
    let priorities = priorities
        .iter()
        .map(|raw| parse_priority(raw))
        .collect::<anyhow::Result<Vec<Priority>>>()?;

    let category_id = category.map(|raw| resolve_category_ref(store, &raw));
    let tag_id = tag.map(|raw| resolve_tag_ref(store, &raw));

    store.set_filter(FilterPatch {
        status: Some((!statuses.is_empty()).then_some(statuses)),
        priority: Some((!priorities.is_empty()).then_some(priorities)),
        category_id: Some(category_id),
        tag_id: Some(tag_id),
    });
    store.set_search_query(search.unwrap_or_default());

    let visible = store.get_filtered_todos();
    if visible.is_empty() {
        println!("No todos.");
        return Ok(());
    }

    renderer.print_task_table(&visible, store.categories(), store.tags())?;
    Ok(())
}

#[instrument(skip_all)]
fn cmd_done(store: &mut Store, raw_id: &str) -> anyhow::Result<()> {
    info!("command done");

    let id = resolve_task_id(store, raw_id)?;
    store.toggle_todo(&id);

    let completed = store
        .get_todos()
        .iter()
        .find(|task| task.id == id)
        .is_some_and(|task| task.completed);
    if completed {
        println!("Completed todo {id}.");
    } else {
        println!("Reopened todo {id}.");
    }
    Ok(())
}

#[instrument(skip_all)]
fn cmd_status(store: &mut Store, raw_id: &str, raw_status: &str) -> anyhow::Result<()> {
    info!("command status");

    let id = resolve_task_id(store, raw_id)?;
    let status = parse_status(raw_status)?;

    // Quick-status keeps the done flag paired with the status; a plain edit
    // does not.
    store.update_todo(
        &id,
        TaskPatch {
            status: Some(status),
            completed: Some(status == Status::Completed),
            ..TaskPatch::default()
        },
    );
    println!("Set status of {id} to {}.", status.as_str());
    Ok(())
}

#[allow(clippy::too_many_arguments)]
#[instrument(skip_all)]
fn cmd_edit(
    store: &mut Store,
    raw_id: &str,
    title: Option<String>,
    description: Option<String>,
    no_description: bool,
    priority: Option<String>,
    status: Option<String>,
    category: Option<String>,
    no_category: bool,
    tags: Vec<String>,
) -> anyhow::Result<()> {
    info!("command edit");

    let id = resolve_task_id(store, raw_id)?;

    let mut patch = TaskPatch {
        title,
        ..TaskPatch::default()
    };
    if no_description {
        patch.description = Some(None);
    } else if let Some(text) = description {
        patch.description = Some(Some(text));
    }
    if let Some(raw) = priority {
        patch.priority = Some(parse_priority(&raw)?);
    }
    if let Some(raw) = status {
        patch.status = Some(parse_status(&raw)?);
    }
    if no_category {
        patch.category_id = Some(None);
    } else if let Some(raw) = category {
        patch.category_id = Some(Some(resolve_category_ref(store, &raw)));
    }
    if !tags.is_empty() {
        patch.tags = Some(
            tags.iter()
                .map(|raw| resolve_tag_ref(store, raw))
                .collect(),
        );
    }

    store.update_todo(&id, patch);
    println!("Modified todo {id}.");
    Ok(())
}

#[instrument(skip_all)]
fn cmd_show(store: &Store, renderer: &mut Renderer, raw_id: &str) -> anyhow::Result<()> {
    info!("command show");

    let id = resolve_task_id(store, raw_id)?;
    let task = store
        .get_todos()
        .iter()
        .find(|task| task.id == id)
        .ok_or_else(|| anyhow!("no todo matches id: {raw_id}"))?
        .clone();

    renderer.print_task_info(&task, store.categories(), store.tags())?;
    Ok(())
}

#[instrument(skip_all)]
fn cmd_delete(store: &mut Store, raw_id: &str) -> anyhow::Result<()> {
    info!("command delete");

    let id = resolve_task_id(store, raw_id)?;
    store.delete_todo(&id);
    println!("Deleted todo {id}.");
    Ok(())
}

#[instrument(skip_all)]
fn cmd_move(store: &mut Store, from: usize, to: usize) -> anyhow::Result<()> {
    info!("command move");

    let visible = store.get_filtered_todos().len();
    if from >= visible || to >= visible {
        bail!("position out of range: the list has {visible} todo(s)");
    }

    store.reorder_todos(from, to);
    println!("Moved todo from position {from} to {to}.");
    Ok(())
}

#[instrument(skip_all)]
fn cmd_category(
    store: &mut Store,
    renderer: &mut Renderer,
    action: CategoryAction,
) -> anyhow::Result<()> {
    info!("command category");

    match action {
        CategoryAction::Add { name, color, icon } => {
            let category = store.add_category(name, color, icon);
            println!("Created category {} ({}).", category.name, category.id);
        }
        CategoryAction::List => {
            renderer.print_categories(store.categories())?;
        }
        CategoryAction::Edit {
            id,
            name,
            color,
            icon,
        } => {
            let id = resolve_category_id(store, &id)?;
            store.update_category(&id, CategoryPatch { name, color, icon });
            println!("Modified category {id}.");
        }
        CategoryAction::Delete { id } => {
            let id = resolve_category_id(store, &id)?;
            store.delete_category(&id);
            println!("Deleted category {id}. Todos keep their reference.");
        }
    }
    Ok(())
}

#[instrument(skip_all)]
fn cmd_tag(store: &mut Store, renderer: &mut Renderer, action: TagAction) -> anyhow::Result<()> {
    info!("command tag");

    match action {
        TagAction::Add { name, color } => {
            let tag = store.add_tag(name, color);
            println!("Created tag {} ({}).", tag.name, tag.id);
        }
        TagAction::List => {
            renderer.print_tags(store.tags())?;
        }
        TagAction::Edit { id, name, color } => {
            let id = resolve_tag_id(store, &id)?;
            store.update_tag(&id, TagPatch { name, color });
            println!("Modified tag {id}.");
        }
        TagAction::Delete { id } => {
            let id = resolve_tag_id(store, &id)?;
            store.delete_tag(&id);
            println!("Deleted tag {id} and removed it from all todos.");
        }
    }
    Ok(())
}

fn cmd_palette() -> anyhow::Result<()> {
    info!("command palette");
    for color in COLOR_PALETTE {
        println!("{color}");
    }
    Ok(())
}

#[instrument(skip_all)]
fn cmd_stats(store: &Store, renderer: &mut Renderer) -> anyhow::Result<()> {
    info!("command stats");
    renderer.print_stats(&store.get_stats())?;
    Ok(())
}

#[instrument(skip_all)]
fn cmd_import(store: &mut Store, file: &std::path::Path) -> anyhow::Result<()> {
    info!("command import");

    let records = import::from_path(file)
        .with_context(|| format!("failed to import {}", file.display()))?;
    let count = store.import_todos(records);
    println!("Imported {count} todo(s).");
    Ok(())
}

#[instrument(skip_all)]
fn cmd_export(
    store: &Store,
    format: ExportFormat,
    output: Option<PathBuf>,
) -> anyhow::Result<()> {
    info!("command export");

    let tasks = store.get_todos();
    if tasks.is_empty() {
        bail!("no todos to export");
    }

    let (content, extension) = match format {
        ExportFormat::Json => (export::to_json(tasks)?, "json"),
        ExportFormat::Csv => (export::to_csv(tasks)?, "csv"),
    };

    let path = output.unwrap_or_else(|| {
        PathBuf::from(export::file_name(extension, Local::now().date_naive()))
    });
    fs::write(&path, content)
        .with_context(|| format!("failed to write {}", path.display()))?;

    println!("Exported {} todo(s) to {}.", tasks.len(), path.display());
    Ok(())
}

/// Exact id, or any unambiguous prefix of one.
fn resolve_task_id(store: &Store, raw: &str) -> anyhow::Result<String> {
    if let Some(task) = store.get_todos().iter().find(|task| task.id == raw) {
        return Ok(task.id.clone());
    }

    let mut matches = store
        .get_todos()
        .iter()
        .filter(|task| task.id.starts_with(raw));
    let first = matches
        .next()
        .ok_or_else(|| anyhow!("no todo matches id: {raw}"))?;
    if matches.next().is_some() {
        bail!("ambiguous id prefix: {raw}");
    }
    Ok(first.id.clone())
}

/// Name, id or id prefix of an existing category; an unknown reference is
/// passed through as-is since the store tolerates dangling ids.
fn resolve_category_ref(store: &Store, raw: &str) -> String {
    store
        .categories()
        .iter()
        .find(|category| {
            category.id == raw
                || category.id.starts_with(raw)
                || category.name.eq_ignore_ascii_case(raw)
        })
        .map(|category| category.id.clone())
        .unwrap_or_else(|| raw.to_string())
}

fn resolve_tag_ref(store: &Store, raw: &str) -> String {
    store
        .tags()
        .iter()
        .find(|tag| tag.id == raw || tag.id.starts_with(raw) || tag.name.eq_ignore_ascii_case(raw))
        .map(|tag| tag.id.clone())
        .unwrap_or_else(|| raw.to_string())
}

/// Strict variant for category management: the reference must resolve.
fn resolve_category_id(store: &Store, raw: &str) -> anyhow::Result<String> {
    let mut matches = store.categories().iter().filter(|category| {
        category.id == raw
            || category.id.starts_with(raw)
            || category.name.eq_ignore_ascii_case(raw)
    });
    let first = matches
        .next()
        .ok_or_else(|| anyhow!("no category matches: {raw}"))?;
    if matches.next().is_some() {
        bail!("ambiguous category reference: {raw}");
    }
    Ok(first.id.clone())
}

fn resolve_tag_id(store: &Store, raw: &str) -> anyhow::Result<String> {
    let mut matches = store.tags().iter().filter(|tag| {
        tag.id == raw || tag.id.starts_with(raw) || tag.name.eq_ignore_ascii_case(raw)
    });
    let first = matches
        .next()
        .ok_or_else(|| anyhow!("no tag matches: {raw}"))?;
    if matches.next().is_some() {
        bail!("ambiguous tag reference: {raw}");
    }
    Ok(first.id.clone())
}

fn parse_priority(raw: &str) -> anyhow::Result<Priority> {
    Priority::parse(&raw.to_lowercase())
        .ok_or_else(|| anyhow!("invalid priority: {raw} (expected low, medium or high)"))
}

fn parse_status(raw: &str) -> anyhow::Result<Status> {
    Status::parse(&raw.to_lowercase())
        .ok_or_else(|| anyhow!("invalid status: {raw} (expected pending, in_progress or completed)"))
}

#[cfg(test)]
mod tests {
    use tempfile::{TempDir, tempdir};

    use super::{parse_priority, parse_status, resolve_category_ref, resolve_task_id};
    use crate::model::{NewTask, Priority, Status};
    use crate::storage::SlotStore;
    use crate::store::Store;

    fn open_store() -> (Store, TempDir) {
        let temp = tempdir().expect("tempdir");
        let slots = SlotStore::open(temp.path()).expect("open slots");
        let store = Store::open(slots).expect("open store");
        (store, temp)
    }

    #[test]
    fn task_ids_resolve_by_unique_prefix() {
        let (mut store, _temp) = open_store();
        let task = store.add_todo(NewTask::new("only"));

        let prefix = &task.id[..8];
        assert_eq!(resolve_task_id(&store, prefix).expect("resolve"), task.id);
        assert!(resolve_task_id(&store, "zzz").is_err());
    }

    #[test]
    fn category_refs_resolve_by_name_or_pass_through() {
        let (store, _temp) = open_store();
        let work = store
            .categories()
            .iter()
            .find(|category| category.name == "Work")
            .expect("seeded category")
            .clone();

        assert_eq!(resolve_category_ref(&store, "work"), work.id);
        assert_eq!(resolve_category_ref(&store, "no-such"), "no-such");
    }

    #[test]
    fn enum_arguments_parse_case_insensitively() {
        assert_eq!(parse_priority("HIGH").expect("priority"), Priority::High);
        assert_eq!(
            parse_status("In_Progress").expect("status"),
            Status::InProgress
        );
        assert!(parse_priority("urgent").is_err());
        assert!(parse_status("someday").is_err());
    }
}
