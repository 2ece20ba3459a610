use crate::model::{Priority, Status, Tag, Task};

/// Transient view criteria. Never persisted; held singly by the store.
/// Each set field is OR within itself and AND against the others.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    pub status: Option<Vec<Status>>,
    pub priority: Option<Vec<Priority>>,
    pub category_id: Option<String>,
    pub tag_id: Option<String>,
}

/// Shallow-merge input for [`Filter`]: outer `None` keeps the current value,
/// `Some(None)` clears the criterion.
#[derive(Debug, Clone, Default)]
pub struct FilterPatch {
    pub status: Option<Option<Vec<Status>>>,
    pub priority: Option<Option<Vec<Priority>>>,
    pub category_id: Option<Option<String>>,
    pub tag_id: Option<Option<String>>,
}

impl Filter {
    pub fn apply(&mut self, patch: FilterPatch) {
        if let Some(status) = patch.status {
            self.status = status;
        }
        if let Some(priority) = patch.priority {
            self.priority = priority;
        }
        if let Some(category_id) = patch.category_id {
            self.category_id = category_id;
        }
        if let Some(tag_id) = patch.tag_id {
            self.tag_id = tag_id;
        }
    }

    pub fn matches(&self, task: &Task) -> bool {
        if let Some(statuses) = &self.status
            && !statuses.is_empty()
            && !statuses.contains(&task.status)
        {
            return false;
        }

        if let Some(priorities) = &self.priority
            && !priorities.is_empty()
            && !priorities.contains(&task.priority)
        {
            return false;
        }

        if let Some(category_id) = &self.category_id
            && task.category_id.as_ref() != Some(category_id)
        {
            return false;
        }

        if let Some(tag_id) = &self.tag_id
            && !task.tags.contains(tag_id)
        {
            return false;
        }

        true
    }
}

/// Case-insensitive substring search over title, description, resolvable tag
/// names, and the raw tag ids. `query` must already be lower-cased.
pub fn matches_search(task: &Task, tags: &[Tag], query: &str) -> bool {
    if task.title.to_lowercase().contains(query) {
        return true;
    }

    if let Some(description) = &task.description
        && description.to_lowercase().contains(query)
    {
        return true;
    }

    task.tags.iter().any(|tag_id| {
        let named = tags
            .iter()
            .find(|tag| tag.id == *tag_id)
            .is_some_and(|tag| tag.name.to_lowercase().contains(query));
        named || tag_id.to_lowercase().contains(query)
    })
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::{Filter, FilterPatch, matches_search};
    use crate::model::{NewTask, Priority, Status, Tag, Task};

    fn task(title: &str) -> Task {
        Task::new(NewTask::new(title), 0, Utc::now())
    }

    #[test]
    fn empty_filter_matches_everything() {
        let filter = Filter::default();
        assert!(filter.matches(&task("anything")));
    }

    #[test]
    fn fields_combine_with_and() {
        let mut subject = task("report");
        subject.priority = Priority::High;
        subject.status = Status::InProgress;
        subject.category_id = Some("cat-1".to_string());

        let mut filter = Filter {
            status: Some(vec![Status::Pending, Status::InProgress]),
            priority: Some(vec![Priority::High]),
            category_id: Some("cat-1".to_string()),
            tag_id: None,
        };
        assert!(filter.matches(&subject));

        filter.category_id = Some("cat-2".to_string());
        assert!(!filter.matches(&subject));
    }

    #[test]
    fn tag_criterion_requires_membership() {
        let mut subject = task("tagged");
        subject.tags = vec!["t-1".to_string(), "t-2".to_string()];

        let filter = Filter {
            tag_id: Some("t-2".to_string()),
            ..Filter::default()
        };
        assert!(filter.matches(&subject));

        let filter = Filter {
            tag_id: Some("t-9".to_string()),
            ..Filter::default()
        };
        assert!(!filter.matches(&subject));
    }

    #[test]
    fn patch_merges_shallowly() {
        let mut filter = Filter {
            status: Some(vec![Status::Pending]),
            priority: Some(vec![Priority::Low]),
            ..Filter::default()
        };

        filter.apply(FilterPatch {
            priority: Some(None),
            category_id: Some(Some("cat-1".to_string())),
            ..FilterPatch::default()
        });

        assert_eq!(filter.status, Some(vec![Status::Pending]));
        assert_eq!(filter.priority, None);
        assert_eq!(filter.category_id, Some("cat-1".to_string()));
    }

    #[test]
    fn search_covers_title_description_and_tags() {
        let tags = vec![Tag {
            id: "t-1".to_string(),
            name: "Urgent".to_string(),
            color: "red".to_string(),
        }];

        let mut subject = task("Buy groceries");
        subject.description = Some("Milk and eggs".to_string());
        subject.tags = vec!["t-1".to_string(), "orphan-tag".to_string()];

        assert!(matches_search(&subject, &tags, "grocer"));
        assert!(matches_search(&subject, &tags, "eggs"));
        assert!(matches_search(&subject, &tags, "urgent"));
        assert!(matches_search(&subject, &tags, "orphan"));
        assert!(!matches_search(&subject, &tags, "nowhere"));
    }
}
