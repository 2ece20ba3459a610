use chrono::Utc;
use tracing::{debug, warn};

use crate::codec::ImportRecord;
use crate::filter::{Filter, FilterPatch, matches_search};
use crate::model::{
    Category, CategoryPatch, NewTask, Stats, Status, Tag, TagPatch, Task, TaskPatch,
    default_categories, default_tags, new_id,
};
use crate::storage::{PersistedState, SlotStore};

/// The single mutable home of all task state. Every mutation persists and
/// then notifies subscribers; mutators themselves never fail, a persistence
/// error is logged and the in-memory state stays authoritative.
pub struct Store {
    storage: SlotStore,
    todos: Vec<Task>,
    categories: Vec<Category>,
    tags: Vec<Tag>,
    filter: Filter,
    search_query: String,
    listeners: Vec<Box<dyn Fn()>>,
}

impl Store {
    /// Loads persisted state, or seeds the default categories and tags on a
    /// first run (and persists the seed straight away).
    pub fn open(storage: SlotStore) -> anyhow::Result<Self> {
        let state = storage.load_state()?;
        let seeded = state.is_none();

        let state = state.unwrap_or_else(|| PersistedState {
            todos: vec![],
            categories: default_categories(),
            tags: default_tags(),
        });

        let mut store = Self {
            storage,
            todos: state.todos,
            categories: state.categories,
            tags: state.tags,
            filter: Filter::default(),
            search_query: String::new(),
            listeners: vec![],
        };

        if seeded {
            debug!("seeding default categories and tags");
            store.persist();
        }
        Ok(store)
    }

    // Tasks.

    pub fn add_todo(&mut self, fields: NewTask) -> Task {
        let task = Task::new(fields, self.todos.len() as u64, Utc::now());
        debug!(id = %task.id, title = %task.title, "adding todo");
        self.todos.push(task.clone());
        self.commit();
        task
    }

    /// Applies the patch verbatim. `completed` and `status` are NOT kept in
    /// sync here; callers that want the pairing set both fields.
    pub fn update_todo(&mut self, id: &str, patch: TaskPatch) {
        let Some(task) = self.todos.iter_mut().find(|task| task.id == id) else {
            debug!(id, "update for unknown todo ignored");
            return;
        };

        if let Some(title) = patch.title {
            task.title = title;
        }
        if let Some(description) = patch.description {
            task.description = description;
        }
        if let Some(completed) = patch.completed {
            task.completed = completed;
        }
        if let Some(priority) = patch.priority {
            task.priority = priority;
        }
        if let Some(status) = patch.status {
            task.status = status;
        }
        if let Some(category_id) = patch.category_id {
            task.category_id = category_id;
        }
        if let Some(tags) = patch.tags {
            task.tags = tags;
        }
        task.updated_at = Utc::now();
        self.commit();
    }

    /// Remaining positions are left as they were; gaps are fine, order is
    /// what matters.
    pub fn delete_todo(&mut self, id: &str) {
        let before = self.todos.len();
        self.todos.retain(|task| task.id != id);
        if self.todos.len() == before {
            debug!(id, "delete for unknown todo ignored");
            return;
        }
        self.commit();
    }

    /// Flips `completed` and snaps `status` to match: completed or pending,
    /// an in-progress marker does not survive the round trip.
    pub fn toggle_todo(&mut self, id: &str) {
        let Some(task) = self.todos.iter_mut().find(|task| task.id == id) else {
            debug!(id, "toggle for unknown todo ignored");
            return;
        };

        task.completed = !task.completed;
        task.status = if task.completed {
            Status::Completed
        } else {
            Status::Pending
        };
        task.updated_at = Utc::now();
        self.commit();
    }

    pub fn get_todos(&self) -> &[Task] {
        &self.todos
    }

    /// Search first, then the structured filter, then a stable sort by
    /// position.
    pub fn get_filtered_todos(&self) -> Vec<Task> {
        let query = self.search_query.to_lowercase();
        let mut matched: Vec<Task> = self
            .todos
            .iter()
            .filter(|task| query.is_empty() || matches_search(task, &self.tags, &query))
            .filter(|task| self.filter.matches(task))
            .cloned()
            .collect();
        matched.sort_by_key(|task| task.position);
        matched
    }

    /// Moves the task shown at `old_index` of the CURRENT filtered view to
    /// where the task at `new_index` is shown, then renumbers every task's
    /// position densely. Out-of-range indices are a silent no-op.
    ///
    /// Both raw indices are looked up before the removal; with a narrowed
    /// view the landing slot therefore depends on the pre-removal layout.
    pub fn reorder_todos(&mut self, old_index: usize, new_index: usize) {
        let visible = self.get_filtered_todos();
        let (Some(source), Some(target)) = (visible.get(old_index), visible.get(new_index)) else {
            debug!(old_index, new_index, "reorder out of range, ignoring");
            return;
        };

        let Some(from) = self.todos.iter().position(|task| task.id == source.id) else {
            return;
        };
        let Some(to) = self.todos.iter().position(|task| task.id == target.id) else {
            return;
        };

        let moved = self.todos.remove(from);
        self.todos.insert(to.min(self.todos.len()), moved);

        for (index, task) in self.todos.iter_mut().enumerate() {
            task.position = index as u64;
        }
        self.commit();
    }

    /// Every record becomes a brand-new task: fresh id, position appended
    /// after the existing list, `created_at` kept only when the file had
    /// one. Returns how many tasks were added.
    pub fn import_todos(&mut self, records: Vec<ImportRecord>) -> usize {
        let now = Utc::now();
        let base = self.todos.len() as u64;
        let count = records.len();

        for (offset, record) in records.into_iter().enumerate() {
            self.todos.push(Task {
                id: new_id(),
                title: record.title,
                description: record.description,
                completed: record.completed,
                priority: record.priority,
                status: record.status,
                category_id: record.category_id,
                tags: record.tags,
                position: base + offset as u64,
                created_at: record.created_at.unwrap_or(now),
                updated_at: now,
            });
        }

        debug!(count, "imported todos");
        self.commit();
        count
    }

    // Categories.

    pub fn add_category(&mut self, name: String, color: String, icon: String) -> Category {
        let category = Category {
            id: new_id(),
            name,
            color,
            icon,
        };
        self.categories.push(category.clone());
        self.commit();
        category
    }

    pub fn update_category(&mut self, id: &str, patch: CategoryPatch) {
        let Some(category) = self.categories.iter_mut().find(|category| category.id == id)
        else {
            debug!(id, "update for unknown category ignored");
            return;
        };

        if let Some(name) = patch.name {
            category.name = name;
        }
        if let Some(color) = patch.color {
            category.color = color;
        }
        if let Some(icon) = patch.icon {
            category.icon = icon;
        }
        self.commit();
    }

    /// Does NOT clear the category from tasks; their reference dangles and
    /// is simply unresolvable from then on.
    pub fn delete_category(&mut self, id: &str) {
        let before = self.categories.len();
        self.categories.retain(|category| category.id != id);
        if self.categories.len() == before {
            debug!(id, "delete for unknown category ignored");
            return;
        }
        self.commit();
    }

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    // Tags.

    pub fn add_tag(&mut self, name: String, color: String) -> Tag {
        let tag = Tag {
            id: new_id(),
            name,
            color,
        };
        self.tags.push(tag.clone());
        self.commit();
        tag
    }

    pub fn update_tag(&mut self, id: &str, patch: TagPatch) {
        let Some(tag) = self.tags.iter_mut().find(|tag| tag.id == id) else {
            debug!(id, "update for unknown tag ignored");
            return;
        };

        if let Some(name) = patch.name {
            tag.name = name;
        }
        if let Some(color) = patch.color {
            tag.color = color;
        }
        self.commit();
    }

    /// Unlike categories, a tag delete cascades: the id is scrubbed from
    /// every task's tag list in the same commit.
    pub fn delete_tag(&mut self, id: &str) {
        let before = self.tags.len();
        self.tags.retain(|tag| tag.id != id);
        if self.tags.len() == before {
            debug!(id, "delete for unknown tag ignored");
            return;
        }

        for task in &mut self.todos {
            task.tags.retain(|tag_id| tag_id != id);
        }
        self.commit();
    }

    pub fn tags(&self) -> &[Tag] {
        &self.tags
    }

    // View state. Transient: notifies, never persists.

    pub fn set_filter(&mut self, patch: FilterPatch) {
        self.filter.apply(patch);
        self.notify();
    }

    pub fn set_search_query(&mut self, query: impl Into<String>) {
        self.search_query = query.into();
        self.notify();
    }

    pub fn clear_filters(&mut self) {
        self.filter = Filter::default();
        self.search_query.clear();
        self.notify();
    }

    pub fn filter(&self) -> &Filter {
        &self.filter
    }

    pub fn search_query(&self) -> &str {
        &self.search_query
    }

    // Derived.

    pub fn get_stats(&self) -> Stats {
        let total = self.todos.len();
        let completed = self.todos.iter().filter(|task| task.completed).count();
        let pending = self
            .todos
            .iter()
            .filter(|task| task.status == Status::Pending)
            .count();
        let in_progress = self
            .todos
            .iter()
            .filter(|task| task.status == Status::InProgress)
            .count();

        let completion_rate = if total == 0 {
            0
        } else {
            (completed as f64 / total as f64 * 100.0).round() as u32
        };

        Stats {
            total,
            completed,
            pending,
            in_progress,
            completion_rate,
        }
    }

    pub fn subscribe(&mut self, listener: impl Fn() + 'static) {
        self.listeners.push(Box::new(listener));
    }

    fn commit(&mut self) {
        self.persist();
        self.notify();
    }

    fn persist(&self) {
        let state = PersistedState {
            todos: self.todos.clone(),
            categories: self.categories.clone(),
            tags: self.tags.clone(),
        };
        if let Err(err) = self.storage.save_state(&state) {
            warn!(error = %err, "failed to persist state, keeping in-memory changes");
        }
    }

    fn notify(&self) {
        for listener in &self.listeners {
            listener();
        }
    }
}
