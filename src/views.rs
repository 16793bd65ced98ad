//! List-page derivations: status filter, free-text search, stable sort and
//! pagination. `ListQuery::apply` is a pure function of its inputs, so a view
//! recomputed after any input change can't carry over an earlier result.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::types::{Priority, Project, ProjectStatus, Task, TaskStatus};

/// What the list pages need to know about a row.
pub trait Listable: Clone {
    fn title(&self) -> &str;
    fn description(&self) -> Option<&str>;
    fn status_label(&self) -> &str;
    fn priority(&self) -> Option<Priority>;
    fn deadline(&self) -> Option<DateTime<Utc>>;
    fn created(&self) -> Option<DateTime<Utc>>;
    fn status_matches(&self, wanted: &str) -> bool;
}

impl Listable for Task {
    fn title(&self) -> &str {
        &self.title
    }

    fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    fn status_label(&self) -> &str {
        &self.status
    }

    fn priority(&self) -> Option<Priority> {
        Task::priority(self)
    }

    fn deadline(&self) -> Option<DateTime<Utc>> {
        self.due()
    }

    fn created(&self) -> Option<DateTime<Utc>> {
        self.created_at()
    }

    /// `done` matches `completed` tasks and so on; unknown filter values
    /// only match the identical raw status.
    fn status_matches(&self, wanted: &str) -> bool {
        match TaskStatus::parse(wanted) {
            Some(status) => self.status() == status,
            None => self.status.eq_ignore_ascii_case(wanted.trim()),
        }
    }
}

impl Listable for Project {
    fn title(&self) -> &str {
        &self.title
    }

    fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    fn status_label(&self) -> &str {
        &self.status
    }

    fn priority(&self) -> Option<Priority> {
        Project::priority(self)
    }

    fn deadline(&self) -> Option<DateTime<Utc>> {
        Project::deadline(self)
    }

    fn created(&self) -> Option<DateTime<Utc>> {
        self.created_at()
    }

    fn status_matches(&self, wanted: &str) -> bool {
        match ProjectStatus::normalize(wanted) {
            ProjectStatus::Other => self.status.eq_ignore_ascii_case(wanted.trim()),
            status => self.status() == status,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum SortKey {
    /// Keep server order.
    #[default]
    None,
    Priority,
    Deadline,
    Title,
    Created,
}

impl SortKey {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "none" | "default" => Some(SortKey::None),
            "priority" => Some(SortKey::Priority),
            "deadline" | "due" | "due_date" => Some(SortKey::Deadline),
            "title" | "name" => Some(SortKey::Title),
            "created" | "created_at" => Some(SortKey::Created),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

impl SortDirection {
    pub fn toggled(self) -> Self {
        match self {
            SortDirection::Ascending => SortDirection::Descending,
            SortDirection::Descending => SortDirection::Ascending,
        }
    }
}

/// One page of a filtered, sorted list.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// 1-based page number actually served (clamped).
    pub page: usize,
    pub page_count: usize,
    /// Rows matching the filter, across all pages.
    pub total: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListQuery {
    pub search: String,
    /// `None` shows every status.
    pub status: Option<String>,
    pub sort: SortKey,
    pub direction: SortDirection,
    /// 1-based.
    pub page: usize,
    /// 0 disables pagination.
    pub page_size: usize,
}

impl Default for ListQuery {
    fn default() -> Self {
        Self {
            search: String::new(),
            status: None,
            sort: SortKey::None,
            direction: SortDirection::Ascending,
            page: 1,
            page_size: 0,
        }
    }
}

/// Case-insensitive substring match on title, description and status.
pub fn matches_search<T: Listable>(item: &T, needle: &str) -> bool {
    let needle = needle.trim().to_lowercase();
    if needle.is_empty() {
        return true;
    }
    item.title().to_lowercase().contains(&needle)
        || item
            .description()
            .is_some_and(|d| d.to_lowercase().contains(&needle))
        || item.status_label().to_lowercase().contains(&needle)
}

/// Missing values sort after present ones regardless of direction.
fn compare_optional<V: Ord>(a: Option<V>, b: Option<V>, direction: SortDirection) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => match direction {
            SortDirection::Ascending => a.cmp(&b),
            SortDirection::Descending => b.cmp(&a),
        },
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

fn directed(ord: Ordering, direction: SortDirection) -> Ordering {
    match direction {
        SortDirection::Ascending => ord,
        SortDirection::Descending => ord.reverse(),
    }
}

/// Stable sort: equal keys keep their input order in either direction.
pub fn sort_items<T: Listable>(items: &mut [T], key: SortKey, direction: SortDirection) {
    match key {
        SortKey::None => {}
        SortKey::Priority => items.sort_by(|a, b| {
            directed(
                Priority::rank(a.priority()).cmp(&Priority::rank(b.priority())),
                direction,
            )
        }),
        SortKey::Deadline => {
            items.sort_by(|a, b| compare_optional(a.deadline(), b.deadline(), direction))
        }
        SortKey::Title => items.sort_by(|a, b| {
            directed(
                a.title().to_lowercase().cmp(&b.title().to_lowercase()),
                direction,
            )
        }),
        SortKey::Created => {
            items.sort_by(|a, b| compare_optional(a.created(), b.created(), direction))
        }
    }
}

impl ListQuery {
    pub fn searching(mut self, search: impl Into<String>) -> Self {
        self.search = search.into();
        self
    }

    pub fn with_status(mut self, status: Option<String>) -> Self {
        self.status = status.filter(|s| !s.trim().is_empty() && s.trim() != "all");
        self
    }

    pub fn sorted_by(mut self, sort: SortKey) -> Self {
        self.sort = sort;
        self
    }

    pub fn direction(mut self, direction: SortDirection) -> Self {
        self.direction = direction;
        self
    }

    pub fn paged(mut self, page: usize, page_size: usize) -> Self {
        self.page = page.max(1);
        self.page_size = page_size;
        self
    }

    pub fn matches<T: Listable>(&self, item: &T) -> bool {
        let status_ok = match &self.status {
            Some(wanted) => item.status_matches(wanted),
            None => true,
        };
        status_ok && matches_search(item, &self.search)
    }

    /// Filter, sort, then slice out the requested page.
    pub fn apply<T: Listable>(&self, items: &[T]) -> Page<T> {
        let mut rows: Vec<T> = items.iter().filter(|i| self.matches(*i)).cloned().collect();
        sort_items(&mut rows, self.sort, self.direction);

        let total = rows.len();
        if self.page_size == 0 {
            return Page {
                items: rows,
                page: 1,
                page_count: 1,
                total,
            };
        }

        let page_count = total.div_ceil(self.page_size).max(1);
        let page = self.page.clamp(1, page_count);
        let start = (page - 1) * self.page_size;
        let items = rows
            .into_iter()
            .skip(start)
            .take(self.page_size)
            .collect();
        Page {
            items,
            page,
            page_count,
            total,
        }
    }
}

/// Local UI state of one list page. Changing what is shown (filter, search,
/// sort) sends the user back to page one.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ListState {
    query: ListQuery,
}

impl ListState {
    pub fn new(page_size: usize) -> Self {
        Self {
            query: ListQuery::default().paged(1, page_size),
        }
    }

    pub fn query(&self) -> &ListQuery {
        &self.query
    }

    pub fn set_search(&mut self, search: &str) {
        if self.query.search != search {
            self.query.search = search.to_string();
            self.query.page = 1;
        }
    }

    pub fn set_status(&mut self, status: Option<&str>) {
        let next = status
            .map(str::to_string)
            .filter(|s| !s.trim().is_empty() && s.trim() != "all");
        if self.query.status != next {
            self.query.status = next;
            self.query.page = 1;
        }
    }

    pub fn set_sort(&mut self, sort: SortKey) {
        if self.query.sort != sort {
            self.query.sort = sort;
            self.query.page = 1;
        }
    }

    pub fn toggle_direction(&mut self) {
        self.query.direction = self.query.direction.toggled();
        self.query.page = 1;
    }

    pub fn set_page(&mut self, page: usize) {
        self.query.page = page.max(1);
    }

    pub fn next_page(&mut self) {
        self.query.page += 1;
    }

    pub fn prev_page(&mut self) {
        self.query.page = self.query.page.saturating_sub(1).max(1);
    }

    pub fn view<T: Listable>(&self, items: &[T]) -> Page<T> {
        self.query.apply(items)
    }
}
