//! Optimistic mutations: patch locally, call the server, then reconcile with a
//! full refresh. A failed call always ends with local state matching the last
//! known server state.

use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use tracing::{info, warn};

use super::{AggregationStore, FetchOutcome, InFlight};
use crate::transport::DataError;
use crate::types::{NewTask, Project, ProjectPatch, Task, TaskPatch};

/// Terminal state of an optimistic mutation.
#[derive(Debug, Clone, PartialEq)]
pub enum MutationOutcome {
    /// The server accepted the change but the reconciling refresh failed, so
    /// the local patch is still standing in for server data.
    Applied,
    /// The server accepted the change and a refresh replaced the local patch.
    Confirmed,
    /// The server rejected the change (or was unreachable); local state was
    /// reset to server state.
    RolledBack(DataError),
}

impl MutationOutcome {
    pub fn is_confirmed(&self) -> bool {
        matches!(self, MutationOutcome::Confirmed)
    }

    pub fn error(&self) -> Option<&DataError> {
        match self {
            MutationOutcome::RolledBack(e) => Some(e),
            _ => None,
        }
    }
}

/// Mutable access to the collections an optimistic patch may touch.
struct Working<'a> {
    projects: &'a mut Vec<Project>,
    tasks: &'a mut Vec<Task>,
}

/// Pre-patch copies of every record the patch touched, so the patch can be
/// undone item by item even after other patches have landed on top of it.
struct Backup {
    projects: Vec<(usize, Project)>,
    touched_projects: HashSet<u64>,
    tasks: Vec<(usize, Task)>,
    touched_tasks: HashSet<u64>,
    /// Fetch commit the patch was applied on top of.
    committed_seq: u64,
    patched_version: u64,
}

/// Ids whose record was removed, added or changed between the two lists.
fn touched_ids<T: PartialEq>(before: &[T], after: &[T], id: fn(&T) -> u64) -> HashSet<u64> {
    let after_by_id: HashMap<u64, &T> = after.iter().map(|item| (id(item), item)).collect();
    let before_ids: HashSet<u64> = before.iter().map(id).collect();
    let mut touched: HashSet<u64> = before
        .iter()
        .filter(|item| after_by_id.get(&id(item)) != Some(item))
        .map(id)
        .collect();
    touched.extend(after_by_id.keys().filter(|k| !before_ids.contains(k)));
    touched
}

/// Original position and record of each touched id that existed before the
/// patch. Records the patch added have no entry.
fn saved_records<T: Clone>(before: &[T], touched: &HashSet<u64>, id: fn(&T) -> u64) -> Vec<(usize, T)> {
    before
        .iter()
        .enumerate()
        .filter(|(_, item)| touched.contains(&id(item)))
        .map(|(idx, item)| (idx, item.clone()))
        .collect()
}

/// Undo one patch on `current`: drop records it added, put back the saved
/// version of records it changed or removed. Untouched records keep their
/// current state and order.
fn revert<T: Clone>(
    current: &mut Vec<T>,
    saved: &[(usize, T)],
    touched: &HashSet<u64>,
    id: fn(&T) -> u64,
) {
    current.retain(|item| {
        !touched.contains(&id(item)) || saved.iter().any(|(_, o)| id(o) == id(item))
    });
    for (idx, original) in saved {
        match current.iter_mut().find(|item| id(item) == id(original)) {
            Some(slot) => *slot = original.clone(),
            None => {
                let at = (*idx).min(current.len());
                current.insert(at, original.clone());
            }
        }
    }
}

fn project_id(p: &Project) -> u64 {
    p.id
}

fn task_id(t: &Task) -> u64 {
    t.id
}

impl AggregationStore {
    fn apply_patch<F>(&self, patch: F) -> Backup
    where
        F: FnOnce(Working<'_>),
    {
        let mut state = self.lock_state();
        let mut projects = (*state.projects).clone();
        let mut tasks = (*state.tasks).clone();
        patch(Working {
            projects: &mut projects,
            tasks: &mut tasks,
        });

        let touched_projects = touched_ids(state.projects.as_slice(), &projects, project_id);
        let touched_tasks = touched_ids(state.tasks.as_slice(), &tasks, task_id);
        let backup_projects = saved_records(state.projects.as_slice(), &touched_projects, project_id);
        let backup_tasks = saved_records(state.tasks.as_slice(), &touched_tasks, task_id);

        state.projects = Arc::new(projects);
        state.tasks = Arc::new(tasks);
        state.version += 1;

        Backup {
            projects: backup_projects,
            touched_projects,
            tasks: backup_tasks,
            touched_tasks,
            committed_seq: state.committed_seq,
            patched_version: state.version,
        }
    }

    /// Undo the patch on whatever is installed now. Skipped when a fetch has
    /// committed since the patch, since that commit already replaced it.
    fn restore(&self, backup: Backup) -> bool {
        let mut state = self.lock_state();
        if state.committed_seq != backup.committed_seq {
            return false;
        }
        let mut projects = (*state.projects).clone();
        let mut tasks = (*state.tasks).clone();
        revert(&mut projects, &backup.projects, &backup.touched_projects, project_id);
        revert(&mut tasks, &backup.tasks, &backup.touched_tasks, task_id);
        state.projects = Arc::new(projects);
        state.tasks = Arc::new(tasks);
        state.version += 1;
        true
    }

    async fn run_optimistic<F, Fut, T>(&self, action: &str, patch: F, call: Fut) -> MutationOutcome
    where
        F: FnOnce(Working<'_>),
        Fut: Future<Output = Result<T, DataError>>,
    {
        let mutation_id = uuid::Uuid::new_v4();
        let _pending = InFlight::enter(&self.pending_mutations);
        let backup = self.apply_patch(patch);
        info!(%mutation_id, action, version = backup.patched_version, "Optimistic change applied");

        match call.await {
            Ok(_) => match self.fetch_all().await {
                Ok(FetchOutcome::Committed { .. }) | Ok(FetchOutcome::Stale) => {
                    info!(%mutation_id, action, "Change confirmed by server");
                    MutationOutcome::Confirmed
                }
                Err(e) => {
                    warn!(%mutation_id, action, error = %e, "Change accepted but refresh failed");
                    MutationOutcome::Applied
                }
            },
            Err(err) => {
                warn!(%mutation_id, action, error = %err, "Change rejected; rolling back");
                if let Err(reload_err) = self.fetch_all().await {
                    let restored = self.restore(backup);
                    warn!(
                        %mutation_id,
                        action,
                        restored,
                        error = %reload_err,
                        "Reload after rejected change failed; reverted the local change"
                    );
                }
                MutationOutcome::RolledBack(err)
            }
        }
    }

    pub async fn delete_task(&self, id: u64) -> MutationOutcome {
        let api = self.api.clone();
        self.run_optimistic(
            "delete_task",
            |w| w.tasks.retain(|t| t.id != id),
            async move { api.delete_task(id).await },
        )
        .await
    }

    /// Removes the project and, locally, every task that references it.
    pub async fn delete_project(&self, id: u64) -> MutationOutcome {
        let api = self.api.clone();
        self.run_optimistic(
            "delete_project",
            |w| {
                w.projects.retain(|p| p.id != id);
                w.tasks.retain(|t| t.project_id != Some(id));
            },
            async move { api.delete_project(id).await },
        )
        .await
    }

    pub async fn update_task(&self, id: u64, patch: TaskPatch) -> MutationOutcome {
        let api = self.api.clone();
        let local = patch.clone();
        self.run_optimistic(
            "update_task",
            move |w| {
                if let Some(task) = w.tasks.iter_mut().find(|t| t.id == id) {
                    local.apply(task);
                }
            },
            async move { api.update_task(id, &patch).await },
        )
        .await
    }

    pub async fn update_project(&self, id: u64, patch: ProjectPatch) -> MutationOutcome {
        let api = self.api.clone();
        let local = patch.clone();
        self.run_optimistic(
            "update_project",
            move |w| {
                if let Some(project) = w.projects.iter_mut().find(|p| p.id == id) {
                    local.apply(project);
                }
            },
            async move { api.update_project(id, &patch).await },
        )
        .await
    }

    /// Point a project at an external repository and have the server sync it.
    pub async fn sync_repository(&self, project_id: u64, repository_url: &str) -> MutationOutcome {
        let api = self.api.clone();
        let url = repository_url.trim().to_string();
        let local = url.clone();
        self.run_optimistic(
            "sync_repository",
            move |w| {
                if let Some(project) = w.projects.iter_mut().find(|p| p.id == project_id) {
                    project.repository_url = Some(local);
                }
            },
            async move { api.sync_repository(project_id, &url).await },
        )
        .await
    }

    /// Shows the task immediately under a provisional id (counting down from
    /// `u64::MAX`); the refresh replaces it with the server's record.
    pub async fn create_task(&self, task: NewTask) -> MutationOutcome {
        let api = self.api.clone();
        let provisional_id = self.provisional_ids.fetch_sub(1, Ordering::SeqCst);
        let provisional = task.provisional(provisional_id);
        self.run_optimistic(
            "create_task",
            move |w| w.tasks.push(provisional),
            async move { api.create_task(&task).await },
        )
        .await
    }
}
