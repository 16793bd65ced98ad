//! Pure derivations over the raw collections. Nothing here caches; the
//! store memoizes the results per collection version and token.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::types::{Project, StatusBucket, Task, TaskStatus};

/// Projects owned by or assigned to the token's user. Empty without a token.
pub fn current_projects_of(projects: &[Project], token: Option<u64>) -> Vec<Project> {
    match token {
        Some(user_id) => projects
            .iter()
            .filter(|p| p.belongs_to(user_id))
            .cloned()
            .collect(),
        None => Vec::new(),
    }
}

/// Tasks that belong to one of the given projects.
pub fn current_tasks_of(tasks: &[Task], current_projects: &[Project]) -> Vec<Task> {
    if current_projects.is_empty() {
        return Vec::new();
    }
    let ids: HashSet<u64> = current_projects.iter().map(|p| p.id).collect();
    tasks
        .iter()
        .filter(|t| t.project_id.is_some_and(|pid| ids.contains(&pid)))
        .cloned()
        .collect()
}

/// `floor(completed / total * 100)`, and exactly 0 for an empty project.
pub fn progress_percent(completed: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    let pct = completed.min(total) * 100 / total;
    pct as u8
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ProjectStats {
    pub total: usize,
    pub completed: usize,
    pub active: usize,
    pub blocked: usize,
    pub overdue: usize,
    pub progress: u8,
}

pub fn project_stats(tasks: &[Task], project_id: u64, now: DateTime<Utc>) -> ProjectStats {
    let mut stats = ProjectStats::default();
    for task in tasks.iter().filter(|t| t.project_id == Some(project_id)) {
        stats.total += 1;
        match task.status() {
            TaskStatus::Done => stats.completed += 1,
            TaskStatus::InProgress => stats.active += 1,
            TaskStatus::Blocked => stats.blocked += 1,
            TaskStatus::Todo | TaskStatus::Overdue => {}
        }
        if task.is_overdue(now) {
            stats.overdue += 1;
        }
    }
    stats.progress = progress_percent(stats.completed, stats.total);
    stats
}

/// Per-bucket counts for the three-column board.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BucketCounts {
    pub todo: usize,
    pub in_progress: usize,
    pub done: usize,
}

impl BucketCounts {
    pub fn of(tasks: &[Task]) -> Self {
        let mut counts = Self::default();
        for task in tasks {
            match task.status().bucket() {
                StatusBucket::Todo => counts.todo += 1,
                StatusBucket::InProgress => counts.in_progress += 1,
                StatusBucket::Done => counts.done += 1,
            }
        }
        counts
    }

    pub fn total(&self) -> usize {
        self.todo + self.in_progress + self.done
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DashboardSummary {
    pub users: usize,
    pub projects: usize,
    pub tasks: BucketCounts,
    pub blocked: usize,
    pub overdue: usize,
    pub completion: u8,
    pub my_projects: usize,
    pub my_tasks: BucketCounts,
}

pub fn dashboard_summary(
    users: usize,
    projects: &[Project],
    tasks: &[Task],
    my_projects: &[Project],
    my_tasks: &[Task],
    now: DateTime<Utc>,
) -> DashboardSummary {
    let counts = BucketCounts::of(tasks);
    DashboardSummary {
        users,
        projects: projects.len(),
        tasks: counts,
        blocked: tasks
            .iter()
            .filter(|t| t.status() == TaskStatus::Blocked)
            .count(),
        overdue: tasks.iter().filter(|t| t.is_overdue(now)).count(),
        completion: progress_percent(counts.done, counts.total()),
        my_projects: my_projects.len(),
        my_tasks: BucketCounts::of(my_tasks),
    }
}
