//! Aggregation store: the raw `users`/`projects`/`tasks` collections plus the
//! session identity, and memoized views derived from them.
//!
//! Collections are only ever replaced wholesale (an `Arc<Vec<_>>` swap under
//! the state lock), so a reader always sees one consistent commit. Every
//! commit bumps `version`; derived views are cached per `(version, token)`.

pub mod derived;
mod mutation;

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::api::{CollectionQuery, TrackerApi};
use crate::transport::DataError;
use crate::types::{Project, Task, User};

pub use derived::{BucketCounts, DashboardSummary, ProjectStats};
pub use mutation::MutationOutcome;

/// Immutable view of the store at one point in time.
#[derive(Debug, Clone)]
pub struct StoreSnapshot {
    pub users: Arc<Vec<User>>,
    pub projects: Arc<Vec<Project>>,
    pub tasks: Arc<Vec<Task>>,
    pub token: Option<u64>,
    pub version: u64,
    pub is_loading: bool,
    pub last_error: Option<DataError>,
}

/// How a `fetch_all` call ended when it didn't fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    /// New collections were installed at this version.
    Committed { version: u64 },
    /// A later call already committed; this result was dropped.
    Stale,
}

struct StoreState {
    users: Arc<Vec<User>>,
    projects: Arc<Vec<Project>>,
    tasks: Arc<Vec<Task>>,
    token: Option<u64>,
    version: u64,
    is_loading: bool,
    last_error: Option<DataError>,
    /// Sequence number of the fetch whose data is installed.
    committed_seq: u64,
}

#[derive(Clone)]
struct DerivedViews {
    version: u64,
    token: Option<u64>,
    projects: Arc<Vec<Project>>,
    tasks: Arc<Vec<Task>>,
}

/// Decrements the in-flight counter even if the owning future is dropped.
struct InFlight<'a>(&'a AtomicUsize);

impl<'a> InFlight<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

pub struct AggregationStore {
    api: Arc<dyn TrackerApi>,
    state: Mutex<StoreState>,
    derived: Mutex<Option<DerivedViews>>,
    fetch_seq: AtomicU64,
    in_flight: AtomicUsize,
    pending_mutations: AtomicUsize,
    provisional_ids: AtomicU64,
}

impl AggregationStore {
    pub fn new(api: Arc<dyn TrackerApi>) -> Self {
        Self {
            api,
            state: Mutex::new(StoreState {
                users: Arc::new(Vec::new()),
                projects: Arc::new(Vec::new()),
                tasks: Arc::new(Vec::new()),
                token: None,
                version: 0,
                is_loading: true,
                last_error: None,
                committed_seq: 0,
            }),
            derived: Mutex::new(None),
            fetch_seq: AtomicU64::new(0),
            in_flight: AtomicUsize::new(0),
            pending_mutations: AtomicUsize::new(0),
            provisional_ids: AtomicU64::new(u64::MAX),
        }
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, StoreState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Replace the session identity. Does not refetch.
    pub fn set_token(&self, token: Option<u64>) {
        let mut state = self.lock_state();
        if state.token != token {
            debug!(?token, "Session identity changed");
            state.token = token;
        }
    }

    pub fn token(&self) -> Option<u64> {
        self.lock_state().token
    }

    pub fn version(&self) -> u64 {
        self.lock_state().version
    }

    pub fn is_loading(&self) -> bool {
        self.lock_state().is_loading
    }

    /// Number of `fetch_all` calls currently awaiting the server.
    pub fn fetches_in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    pub fn pending_mutations(&self) -> usize {
        self.pending_mutations.load(Ordering::SeqCst)
    }

    /// Error from the most recent failed refresh, cleared by the next commit.
    pub fn last_error(&self) -> Option<DataError> {
        self.lock_state().last_error.clone()
    }

    pub fn snapshot(&self) -> StoreSnapshot {
        let state = self.lock_state();
        StoreSnapshot {
            users: state.users.clone(),
            projects: state.projects.clone(),
            tasks: state.tasks.clone(),
            token: state.token,
            version: state.version,
            is_loading: state.is_loading,
            last_error: state.last_error.clone(),
        }
    }

    pub fn users(&self) -> Arc<Vec<User>> {
        self.lock_state().users.clone()
    }

    pub fn projects(&self) -> Arc<Vec<Project>> {
        self.lock_state().projects.clone()
    }

    pub fn tasks(&self) -> Arc<Vec<Task>> {
        self.lock_state().tasks.clone()
    }

    /// Fetch users, projects and tasks concurrently and install all three
    /// together. On failure nothing is installed and the error is kept in
    /// `last_error` as well as returned.
    pub async fn fetch_all(&self) -> Result<FetchOutcome, DataError> {
        let seq = self.fetch_seq.fetch_add(1, Ordering::SeqCst) + 1;
        let _guard = InFlight::enter(&self.in_flight);
        let started = Instant::now();
        let query = CollectionQuery::default();

        let result = tokio::try_join!(
            self.api.list_users(),
            self.api.list_projects(&query),
            self.api.list_tasks(&query),
        );

        let mut state = self.lock_state();
        if seq < state.committed_seq {
            debug!(seq, committed = state.committed_seq, "Discarding out-of-order refresh");
            return Ok(FetchOutcome::Stale);
        }

        match result {
            Ok((users, projects, tasks)) => {
                state.users = Arc::new(users);
                state.projects = Arc::new(projects);
                state.tasks = Arc::new(tasks);
                state.version += 1;
                state.committed_seq = seq;
                state.is_loading = false;
                state.last_error = None;
                info!(
                    version = state.version,
                    users = state.users.len(),
                    projects = state.projects.len(),
                    tasks = state.tasks.len(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Store refreshed"
                );
                Ok(FetchOutcome::Committed {
                    version: state.version,
                })
            }
            Err(e) => {
                warn!(seq, error = %e, "Store refresh failed; keeping previous collections");
                state.is_loading = false;
                state.last_error = Some(e.clone());
                Err(e)
            }
        }
    }

    fn derived_views(&self) -> DerivedViews {
        let (projects, tasks, token, version) = {
            let state = self.lock_state();
            (
                state.projects.clone(),
                state.tasks.clone(),
                state.token,
                state.version,
            )
        };

        let mut cache = self.derived.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(views) = cache.as_ref() {
            if views.version == version && views.token == token {
                return views.clone();
            }
        }

        let current_projects = derived::current_projects_of(&projects, token);
        let current_tasks = derived::current_tasks_of(&tasks, &current_projects);
        let views = DerivedViews {
            version,
            token,
            projects: Arc::new(current_projects),
            tasks: Arc::new(current_tasks),
        };
        *cache = Some(views.clone());
        views
    }

    /// Projects owned by or assigned to the current token.
    pub fn current_projects(&self) -> Arc<Vec<Project>> {
        self.derived_views().projects
    }

    /// Tasks under `current_projects`.
    pub fn current_tasks(&self) -> Arc<Vec<Task>> {
        self.derived_views().tasks
    }

    pub fn user(&self, id: u64) -> Option<User> {
        self.lock_state().users.iter().find(|u| u.id == id).cloned()
    }

    pub fn project(&self, id: u64) -> Option<Project> {
        self.lock_state()
            .projects
            .iter()
            .find(|p| p.id == id)
            .cloned()
    }

    pub fn task(&self, id: u64) -> Option<Task> {
        self.lock_state().tasks.iter().find(|t| t.id == id).cloned()
    }

    pub fn tasks_for_project(&self, project_id: u64) -> Vec<Task> {
        self.lock_state()
            .tasks
            .iter()
            .filter(|t| t.project_id == Some(project_id))
            .cloned()
            .collect()
    }

    pub fn project_stats(&self, project_id: u64) -> ProjectStats {
        self.project_stats_at(project_id, Utc::now())
    }

    pub fn project_stats_at(&self, project_id: u64, now: DateTime<Utc>) -> ProjectStats {
        let tasks = self.tasks();
        derived::project_stats(&tasks, project_id, now)
    }

    pub fn dashboard_summary(&self) -> DashboardSummary {
        let views = self.derived_views();
        let snap = self.snapshot();
        // Views may be one commit newer than the snapshot; recompute from the
        // snapshot in that case so all numbers describe the same commit.
        let (my_projects, my_tasks) = if views.version == snap.version && views.token == snap.token {
            (views.projects, views.tasks)
        } else {
            let p = derived::current_projects_of(&snap.projects, snap.token);
            let t = derived::current_tasks_of(&snap.tasks, &p);
            (Arc::new(p), Arc::new(t))
        };
        derived::dashboard_summary(
            snap.users.len(),
            &snap.projects,
            &snap.tasks,
            &my_projects,
            &my_tasks,
            Utc::now(),
        )
    }
}
