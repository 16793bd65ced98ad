//! Test infrastructure: MockBackend for the transport layer, MockApi for the
//! store, and record builders.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::Notify;

use crate::api::{CollectionQuery, TrackerApi};
use crate::transport::{DataError, HttpBackend, HttpRequest, HttpResponse};
use crate::types::{NewTask, Project, ProjectPatch, Task, TaskPatch, User};

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}

// ---------------------------------------------------------------------------
// MockBackend
// ---------------------------------------------------------------------------

/// HTTP backend that replays scripted responses in FIFO order and records
/// every request it was handed.
pub struct MockBackend {
    replies: Mutex<VecDeque<Result<HttpResponse, DataError>>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self {
            replies: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn push(&self, response: HttpResponse) {
        lock(&self.replies).push_back(Ok(response));
    }

    pub fn push_json(&self, status: u16, body: Value) {
        self.push(HttpResponse::json(status, &body));
    }

    pub fn push_error(&self, error: DataError) {
        lock(&self.replies).push_back(Err(error));
    }

    pub fn last_request(&self) -> Option<HttpRequest> {
        lock(&self.requests).last().cloned()
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        lock(&self.requests).clone()
    }
}

#[async_trait]
impl HttpBackend for MockBackend {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, DataError> {
        lock(&self.requests).push(request);
        lock(&self.replies)
            .pop_front()
            .unwrap_or_else(|| Err(DataError::network("no scripted response")))
    }
}

// ---------------------------------------------------------------------------
// MockApi
// ---------------------------------------------------------------------------

/// Handle for a call parked by `hold_next_*`.
pub struct Gate {
    notify: Arc<Notify>,
}

impl Gate {
    pub fn release(&self) {
        self.notify.notify_one();
    }
}

/// In-memory tracker server. Mutations change the served collections the
/// way the real API would, so a refresh after a mutation sees its effect.
pub struct MockApi {
    users: Mutex<Vec<User>>,
    projects: Mutex<Vec<Project>>,
    tasks: Mutex<Vec<Task>>,

    fail_users: Mutex<Option<DataError>>,
    fail_projects: Mutex<Option<DataError>>,
    fail_tasks: Mutex<Option<DataError>>,
    fail_mutations: Mutex<Option<DataError>>,

    hold_tasks: Mutex<Option<Arc<Notify>>>,
    hold_mutation: Mutex<Option<Arc<Notify>>>,
    held: Notify,

    title_rewrites: Mutex<HashMap<u64, String>>,
    mutation_log: Mutex<Vec<String>>,
    list_calls: AtomicUsize,
}

impl MockApi {
    pub fn new() -> Self {
        Self {
            users: Mutex::new(Vec::new()),
            projects: Mutex::new(Vec::new()),
            tasks: Mutex::new(Vec::new()),
            fail_users: Mutex::new(None),
            fail_projects: Mutex::new(None),
            fail_tasks: Mutex::new(None),
            fail_mutations: Mutex::new(None),
            hold_tasks: Mutex::new(None),
            hold_mutation: Mutex::new(None),
            held: Notify::new(),
            title_rewrites: Mutex::new(HashMap::new()),
            mutation_log: Mutex::new(Vec::new()),
            list_calls: AtomicUsize::new(0),
        }
    }

    pub fn set_users(&self, users: Vec<User>) {
        *lock(&self.users) = users;
    }

    pub fn set_projects(&self, projects: Vec<Project>) {
        *lock(&self.projects) = projects;
    }

    pub fn set_tasks(&self, tasks: Vec<Task>) {
        *lock(&self.tasks) = tasks;
    }

    pub fn fail_users(&self, error: Option<DataError>) {
        *lock(&self.fail_users) = error;
    }

    pub fn fail_projects(&self, error: Option<DataError>) {
        *lock(&self.fail_projects) = error;
    }

    pub fn fail_tasks(&self, error: Option<DataError>) {
        *lock(&self.fail_tasks) = error;
    }

    /// Every mutation fails with this error until cleared.
    pub fn fail_mutations(&self, error: Option<DataError>) {
        *lock(&self.fail_mutations) = error;
    }

    /// The server stores its own title whenever this task is updated.
    pub fn rewrite_task_title(&self, id: u64, title: &str) {
        lock(&self.title_rewrites).insert(id, title.to_string());
    }

    /// Park the next `list_tasks` call until the gate is released.
    pub fn hold_next_tasks(&self) -> Gate {
        let notify = Arc::new(Notify::new());
        *lock(&self.hold_tasks) = Some(notify.clone());
        Gate { notify }
    }

    /// Park the next mutation call until the gate is released.
    pub fn hold_next_mutation(&self) -> Gate {
        let notify = Arc::new(Notify::new());
        *lock(&self.hold_mutation) = Some(notify.clone());
        Gate { notify }
    }

    /// Resolves once a held call has started waiting on its gate.
    pub async fn wait_for_held(&self) {
        self.held.notified().await;
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn mutations(&self) -> Vec<String> {
        lock(&self.mutation_log).clone()
    }

    async fn park(&self, slot: &Mutex<Option<Arc<Notify>>>) {
        let gate = lock(slot).take();
        if let Some(gate) = gate {
            self.held.notify_one();
            gate.notified().await;
        }
    }

    /// Record, wait if held, then fail if configured to.
    async fn begin_mutation(&self, entry: String) -> Result<(), DataError> {
        lock(&self.mutation_log).push(entry);
        self.park(&self.hold_mutation).await;
        match lock(&self.fail_mutations).clone() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl TrackerApi for MockApi {
    async fn list_users(&self) -> Result<Vec<User>, DataError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = lock(&self.fail_users).clone() {
            return Err(err);
        }
        Ok(lock(&self.users).clone())
    }

    async fn list_projects(&self, _query: &CollectionQuery) -> Result<Vec<Project>, DataError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = lock(&self.fail_projects).clone() {
            return Err(err);
        }
        Ok(lock(&self.projects).clone())
    }

    async fn list_tasks(&self, _query: &CollectionQuery) -> Result<Vec<Task>, DataError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        self.park(&self.hold_tasks).await;
        if let Some(err) = lock(&self.fail_tasks).clone() {
            return Err(err);
        }
        Ok(lock(&self.tasks).clone())
    }

    async fn create_task(&self, task: &NewTask) -> Result<Option<Task>, DataError> {
        self.begin_mutation(format!("create_task:{}", task.title))
            .await?;
        let mut tasks = lock(&self.tasks);
        let id = tasks.iter().map(|t| t.id).max().unwrap_or(0) + 1;
        let created = task.provisional(id);
        tasks.push(created.clone());
        Ok(Some(created))
    }

    async fn update_task(&self, id: u64, patch: &TaskPatch) -> Result<Option<Task>, DataError> {
        self.begin_mutation(format!("update_task:{}", id)).await?;
        let rewrite = lock(&self.title_rewrites).get(&id).cloned();
        let mut tasks = lock(&self.tasks);
        let Some(task) = tasks.iter_mut().find(|t| t.id == id) else {
            return Err(DataError::from_status(404, br#"{"message":"Task not found"}"#));
        };
        patch.apply(task);
        if let Some(title) = rewrite {
            task.title = title;
        }
        Ok(Some(task.clone()))
    }

    async fn delete_task(&self, id: u64) -> Result<(), DataError> {
        self.begin_mutation(format!("delete_task:{}", id)).await?;
        lock(&self.tasks).retain(|t| t.id != id);
        Ok(())
    }

    async fn update_project(
        &self,
        id: u64,
        patch: &ProjectPatch,
    ) -> Result<Option<Project>, DataError> {
        self.begin_mutation(format!("update_project:{}", id)).await?;
        let mut projects = lock(&self.projects);
        let Some(project) = projects.iter_mut().find(|p| p.id == id) else {
            return Err(DataError::from_status(404, br#"{"message":"Project not found"}"#));
        };
        patch.apply(project);
        Ok(Some(project.clone()))
    }

    async fn delete_project(&self, id: u64) -> Result<(), DataError> {
        self.begin_mutation(format!("delete_project:{}", id)).await?;
        lock(&self.projects).retain(|p| p.id != id);
        lock(&self.tasks).retain(|t| t.project_id != Some(id));
        Ok(())
    }

    async fn sync_repository(
        &self,
        project_id: u64,
        repository_url: &str,
    ) -> Result<Option<Project>, DataError> {
        self.begin_mutation(format!("sync_repository:{}", project_id))
            .await?;
        let mut projects = lock(&self.projects);
        let Some(project) = projects.iter_mut().find(|p| p.id == project_id) else {
            return Err(DataError::from_status(404, br#"{"message":"Project not found"}"#));
        };
        project.repository_url = Some(repository_url.to_string());
        Ok(Some(project.clone()))
    }
}

// ---------------------------------------------------------------------------
// Record builders
// ---------------------------------------------------------------------------

pub fn user(id: u64) -> User {
    User {
        id,
        name: format!("user{}", id),
        email: Some(format!("user{}@example.com", id)),
        ..Default::default()
    }
}

pub fn project(id: u64, owner: Option<u64>) -> Project {
    Project {
        id,
        title: format!("P{}", id),
        owner_id: owner,
        status: "active".into(),
        ..Default::default()
    }
}

pub fn task(id: u64, project_id: u64, status: &str) -> Task {
    Task {
        id,
        title: format!("T{}", id),
        status: status.into(),
        project_id: Some(project_id),
        ..Default::default()
    }
}
