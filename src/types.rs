//! Domain records as served by the tracker API.
//!
//! Records keep the server's raw strings (status, priority, dates) and expose
//! typed accessors. Each record is read through a lenient wire struct that
//! takes either field spelling and treats null like a missing key, so one odd
//! record never fails a whole list fetch. Only a missing or malformed `id` is
//! rejected.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{de, Deserialize, Deserializer, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawUser")]
pub struct User {
    pub id: u64,
    pub name: String,
    pub email: Option<String>,
    pub is_online: bool,
    pub role: Option<String>,
}

#[derive(Deserialize)]
struct RawUser {
    #[serde(deserialize_with = "de_id")]
    id: u64,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    username: Option<String>,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    is_online: Option<bool>,
    #[serde(default)]
    online: Option<bool>,
    #[serde(default)]
    role: Option<String>,
}

impl From<RawUser> for User {
    fn from(raw: RawUser) -> Self {
        Self {
            id: raw.id,
            name: raw.name.or(raw.username).unwrap_or_default(),
            email: raw.email,
            is_online: raw.is_online.or(raw.online).unwrap_or(false),
            role: raw.role,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawProject")]
pub struct Project {
    pub id: u64,
    pub title: String,
    pub description: Option<String>,
    pub owner_id: Option<u64>,
    pub assigned_to: Option<u64>,
    pub status: String,
    pub priority: Option<String>,
    pub deadline: Option<String>,
    pub repository_url: Option<String>,
    pub progress: Option<f64>,
    pub members: Vec<Value>,
    pub tags: Vec<String>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

/// Wire shape of a project. Older endpoints use `name`, `end_date` and
/// `github_url`; some send both spellings, and any field may be null.
#[derive(Deserialize)]
struct RawProject {
    #[serde(deserialize_with = "de_id")]
    id: u64,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default, deserialize_with = "de_opt_id")]
    owner_id: Option<u64>,
    #[serde(default, deserialize_with = "de_opt_id")]
    assigned_to: Option<u64>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    priority: Option<String>,
    #[serde(default)]
    deadline: Option<String>,
    #[serde(default)]
    end_date: Option<String>,
    #[serde(default)]
    repository_url: Option<String>,
    #[serde(default)]
    github_url: Option<String>,
    #[serde(default)]
    progress: Option<f64>,
    #[serde(default)]
    members: Option<Vec<Value>>,
    #[serde(default)]
    tags: Option<Vec<String>>,
    #[serde(default)]
    created_at: Option<String>,
    #[serde(default)]
    updated_at: Option<String>,
}

impl From<RawProject> for Project {
    fn from(raw: RawProject) -> Self {
        Self {
            id: raw.id,
            title: raw.title.or(raw.name).unwrap_or_default(),
            description: raw.description,
            owner_id: raw.owner_id,
            assigned_to: raw.assigned_to,
            status: raw.status.unwrap_or_else(default_project_status),
            priority: raw.priority,
            deadline: raw.deadline.or(raw.end_date),
            repository_url: raw.repository_url.or(raw.github_url),
            progress: raw.progress,
            members: raw.members.unwrap_or_default(),
            tags: raw.tags.unwrap_or_default(),
            created_at: raw.created_at,
            updated_at: raw.updated_at,
        }
    }
}

fn default_project_status() -> String {
    "active".to_string()
}

impl Project {
    /// Owner or assignee matches the given user id.
    pub fn belongs_to(&self, user_id: u64) -> bool {
        self.owner_id == Some(user_id) || self.assigned_to == Some(user_id)
    }

    pub fn status(&self) -> ProjectStatus {
        ProjectStatus::normalize(&self.status)
    }

    pub fn priority(&self) -> Option<Priority> {
        self.priority.as_deref().and_then(Priority::from_str)
    }

    pub fn deadline(&self) -> Option<DateTime<Utc>> {
        self.deadline.as_deref().and_then(parse_timestamp)
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at.as_deref().and_then(parse_timestamp)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawTask")]
pub struct Task {
    pub id: u64,
    pub title: String,
    pub description: Option<String>,
    pub status: String,
    pub priority: Option<String>,
    pub project_id: Option<u64>,
    pub assignee_id: Option<u64>,
    pub due_date: Option<String>,
    pub tags: Vec<String>,
    pub created_at: Option<String>,
}

#[derive(Deserialize)]
struct RawTask {
    #[serde(deserialize_with = "de_id")]
    id: u64,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    priority: Option<String>,
    #[serde(default, deserialize_with = "de_opt_id")]
    project_id: Option<u64>,
    #[serde(default, deserialize_with = "de_opt_id")]
    assignee_id: Option<u64>,
    #[serde(default, deserialize_with = "de_opt_id")]
    assigned_to: Option<u64>,
    #[serde(default)]
    due_date: Option<String>,
    #[serde(default)]
    deadline: Option<String>,
    #[serde(default)]
    tags: Option<Vec<String>>,
    #[serde(default)]
    created_at: Option<String>,
}

impl From<RawTask> for Task {
    fn from(raw: RawTask) -> Self {
        Self {
            id: raw.id,
            title: raw.title.or(raw.name).unwrap_or_default(),
            description: raw.description,
            status: raw.status.unwrap_or_else(default_task_status),
            priority: raw.priority,
            project_id: raw.project_id,
            assignee_id: raw.assignee_id.or(raw.assigned_to),
            due_date: raw.due_date.or(raw.deadline),
            tags: raw.tags.unwrap_or_default(),
            created_at: raw.created_at,
        }
    }
}

fn default_task_status() -> String {
    "todo".to_string()
}

impl Task {
    pub fn status(&self) -> TaskStatus {
        TaskStatus::normalize(&self.status)
    }

    pub fn priority(&self) -> Option<Priority> {
        self.priority.as_deref().and_then(Priority::from_str)
    }

    pub fn due(&self) -> Option<DateTime<Utc>> {
        self.due_date.as_deref().and_then(parse_timestamp)
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at.as_deref().and_then(parse_timestamp)
    }

    pub fn is_done(&self) -> bool {
        self.status() == TaskStatus::Done
    }

    /// Flagged overdue by the server, or past its due date and not done.
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        match self.status() {
            TaskStatus::Overdue => true,
            TaskStatus::Done => false,
            _ => self.due().is_some_and(|due| due < now),
        }
    }
}

/// Canonical task status. Every raw server value maps to exactly one of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Todo,
    InProgress,
    Done,
    Blocked,
    Overdue,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Todo => "todo",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Done => "done",
            TaskStatus::Blocked => "blocked",
            TaskStatus::Overdue => "overdue",
        }
    }

    /// Recognized raw values only.
    pub fn parse(raw: &str) -> Option<Self> {
        let key = raw.trim().to_ascii_lowercase().replace(['-', ' '], "_");
        match key.as_str() {
            "todo" | "to_do" | "pending" | "open" | "new" | "backlog" => Some(TaskStatus::Todo),
            "in_progress" | "inprogress" | "active" | "doing" | "started" | "review"
            | "in_review" => Some(TaskStatus::InProgress),
            "done" | "completed" | "complete" | "closed" | "finished" | "resolved" => {
                Some(TaskStatus::Done)
            }
            "blocked" | "on_hold" => Some(TaskStatus::Blocked),
            "overdue" | "late" => Some(TaskStatus::Overdue),
            _ => None,
        }
    }

    /// Map any raw status string onto the canonical set. Unknown values are
    /// treated as not started.
    pub fn normalize(raw: &str) -> Self {
        Self::parse(raw).unwrap_or(TaskStatus::Todo)
    }

    pub fn bucket(&self) -> StatusBucket {
        match self {
            TaskStatus::Todo | TaskStatus::Overdue => StatusBucket::Todo,
            TaskStatus::InProgress | TaskStatus::Blocked => StatusBucket::InProgress,
            TaskStatus::Done => StatusBucket::Done,
        }
    }
}

/// Three-column display vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StatusBucket {
    #[serde(rename = "todo")]
    Todo,
    #[serde(rename = "in-progress")]
    InProgress,
    #[serde(rename = "done")]
    Done,
}

impl StatusBucket {
    pub fn as_str(&self) -> &'static str {
        match self {
            StatusBucket::Todo => "todo",
            StatusBucket::InProgress => "in-progress",
            StatusBucket::Done => "done",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectStatus {
    Active,
    Completed,
    Pending,
    Archived,
    Review,
    Other,
}

impl ProjectStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectStatus::Active => "active",
            ProjectStatus::Completed => "completed",
            ProjectStatus::Pending => "pending",
            ProjectStatus::Archived => "archived",
            ProjectStatus::Review => "review",
            ProjectStatus::Other => "other",
        }
    }

    pub fn normalize(raw: &str) -> Self {
        let key = raw.trim().to_ascii_lowercase().replace(['-', ' '], "_");
        match key.as_str() {
            "active" | "in_progress" | "open" => ProjectStatus::Active,
            "completed" | "done" | "closed" => ProjectStatus::Completed,
            "pending" | "todo" | "planned" => ProjectStatus::Pending,
            "archived" => ProjectStatus::Archived,
            "review" | "in_review" => ProjectStatus::Review,
            _ => ProjectStatus::Other,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    Medium,
    High,
    Critical,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
            Priority::Critical => "critical",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Some(Priority::Low),
            "medium" | "normal" => Some(Priority::Medium),
            "high" => Some(Priority::High),
            "critical" | "urgent" => Some(Priority::Critical),
            _ => None,
        }
    }

    /// Sort rank; a missing or unknown priority ranks below `Low`.
    pub fn rank(priority: Option<Priority>) -> u8 {
        match priority {
            None => 0,
            Some(Priority::Low) => 1,
            Some(Priority::Medium) => 2,
            Some(Priority::High) => 3,
            Some(Priority::Critical) => 4,
        }
    }
}

/// Fields accepted by `POST /tasks`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NewTask {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<String>,
    pub project_id: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignee_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

impl NewTask {
    /// Local placeholder shown until the server assigns the real record.
    pub fn provisional(&self, id: u64) -> Task {
        Task {
            id,
            title: self.title.clone(),
            description: self.description.clone(),
            status: self.status.clone(),
            priority: self.priority.clone(),
            project_id: Some(self.project_id),
            assignee_id: self.assignee_id,
            due_date: self.due_date.clone(),
            tags: self.tags.clone(),
            created_at: Some(Utc::now().to_rfc3339()),
        }
    }
}

/// Partial update for `PUT /tasks/:id`. Unset fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TaskPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignee_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
}

impl TaskPatch {
    pub fn apply(&self, task: &mut Task) {
        if let Some(v) = &self.title {
            task.title = v.clone();
        }
        if let Some(v) = &self.description {
            task.description = Some(v.clone());
        }
        if let Some(v) = &self.status {
            task.status = v.clone();
        }
        if let Some(v) = &self.priority {
            task.priority = Some(v.clone());
        }
        if let Some(v) = self.assignee_id {
            task.assignee_id = Some(v);
        }
        if let Some(v) = &self.due_date {
            task.due_date = Some(v.clone());
        }
    }
}

/// Partial update for `PUT /projects/:id`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProjectPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deadline: Option<String>,
}

impl ProjectPatch {
    pub fn apply(&self, project: &mut Project) {
        if let Some(v) = &self.title {
            project.title = v.clone();
        }
        if let Some(v) = &self.description {
            project.description = Some(v.clone());
        }
        if let Some(v) = &self.status {
            project.status = v.clone();
        }
        if let Some(v) = &self.priority {
            project.priority = Some(v.clone());
        }
        if let Some(v) = self.assigned_to {
            project.assigned_to = Some(v);
        }
        if let Some(v) = &self.deadline {
            project.deadline = Some(v.clone());
        }
    }
}

/// Parse the date formats the API is known to send: RFC 3339, SQL-style
/// `YYYY-MM-DD HH:MM:SS` (taken as UTC) and plain `YYYY-MM-DD` (midnight UTC).
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return Some(Utc.from_utc_datetime(&naive));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(Utc.from_utc_datetime(&naive));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive))
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Num(u64),
    Str(String),
}

/// Ids arrive as numbers from most endpoints and as numeric strings from a few.
fn de_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    match RawId::deserialize(deserializer)? {
        RawId::Num(n) => Ok(n),
        RawId::Str(s) => s
            .trim()
            .parse()
            .map_err(|_| de::Error::custom(format!("invalid id '{}'", s))),
    }
}

fn de_opt_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u64>, D::Error> {
    match Option::<RawId>::deserialize(deserializer)? {
        None => Ok(None),
        Some(RawId::Num(n)) => Ok(Some(n)),
        Some(RawId::Str(s)) if s.trim().is_empty() => Ok(None),
        Some(RawId::Str(s)) => s
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| de::Error::custom(format!("invalid id '{}'", s))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_task_status_normalization() {
        assert_eq!(TaskStatus::normalize("todo"), TaskStatus::Todo);
        assert_eq!(TaskStatus::normalize("in_progress"), TaskStatus::InProgress);
        assert_eq!(TaskStatus::normalize("In-Progress"), TaskStatus::InProgress);
        assert_eq!(TaskStatus::normalize("active"), TaskStatus::InProgress);
        assert_eq!(TaskStatus::normalize("done"), TaskStatus::Done);
        assert_eq!(TaskStatus::normalize("completed"), TaskStatus::Done);
        assert_eq!(TaskStatus::normalize("blocked"), TaskStatus::Blocked);
        assert_eq!(TaskStatus::normalize("overdue"), TaskStatus::Overdue);
        assert_eq!(TaskStatus::normalize("something-new"), TaskStatus::Todo);
    }

    #[test]
    fn test_status_buckets() {
        assert_eq!(TaskStatus::Blocked.bucket(), StatusBucket::InProgress);
        assert_eq!(TaskStatus::Overdue.bucket(), StatusBucket::Todo);
        assert_eq!(TaskStatus::Done.bucket().as_str(), "done");
    }

    #[test]
    fn test_priority_parse_and_rank() {
        assert_eq!(Priority::from_str("URGENT"), Some(Priority::Critical));
        assert_eq!(Priority::from_str("bogus"), None);
        assert!(Priority::rank(Some(Priority::Low)) < Priority::rank(Some(Priority::Medium)));
        assert!(Priority::rank(Some(Priority::High)) < Priority::rank(Some(Priority::Critical)));
        assert!(Priority::rank(None) < Priority::rank(Some(Priority::Low)));
    }

    #[test]
    fn test_task_accepts_alias_fields_and_string_ids() {
        let task: Task = serde_json::from_value(json!({
            "id": "12",
            "name": "Write docs",
            "status": "in_progress",
            "project_id": "3",
            "assigned_to": 9,
            "deadline": "2025-01-31"
        }))
        .unwrap();
        assert_eq!(task.id, 12);
        assert_eq!(task.title, "Write docs");
        assert_eq!(task.project_id, Some(3));
        assert_eq!(task.assignee_id, Some(9));
        assert_eq!(task.due().unwrap().to_rfc3339(), "2025-01-31T00:00:00+00:00");
    }

    #[test]
    fn test_both_spellings_prefer_canonical_name() {
        let task: Task = serde_json::from_value(json!({
            "id": 1,
            "title": "Canonical",
            "name": "Legacy",
            "assignee_id": 4,
            "assigned_to": 5,
            "due_date": "2025-02-01",
            "deadline": "2025-03-01"
        }))
        .unwrap();
        assert_eq!(task.title, "Canonical");
        assert_eq!(task.assignee_id, Some(4));
        assert_eq!(task.due_date.as_deref(), Some("2025-02-01"));

        let project: Project = serde_json::from_value(json!({
            "id": 2,
            "name": "Legacy",
            "title": "Canonical",
            "github_url": "https://git.example.com/old",
            "repository_url": "https://git.example.com/new",
            "end_date": "2025-04-01"
        }))
        .unwrap();
        assert_eq!(project.title, "Canonical");
        assert_eq!(project.repository_url.as_deref(), Some("https://git.example.com/new"));
        assert_eq!(project.deadline.as_deref(), Some("2025-04-01"));

        let user: User =
            serde_json::from_value(json!({"id": 3, "name": "Kim", "username": "kim", "online": true}))
                .unwrap();
        assert_eq!(user.name, "Kim");
        assert!(user.is_online);
    }

    #[test]
    fn test_null_fields_fall_back_to_defaults() {
        let task: Task = serde_json::from_value(json!({
            "id": 1,
            "title": null,
            "name": "Fallback",
            "status": null,
            "tags": null,
            "assignee_id": null
        }))
        .unwrap();
        assert_eq!(task.title, "Fallback");
        assert_eq!(task.status, "todo");
        assert!(task.tags.is_empty());
        assert_eq!(task.assignee_id, None);

        let project: Project = serde_json::from_value(json!({
            "id": 2, "title": null, "status": null, "members": null, "tags": null
        }))
        .unwrap();
        assert_eq!(project.title, "");
        assert_eq!(project.status, "active");
        assert!(project.members.is_empty());

        let user: User =
            serde_json::from_value(json!({"id": 3, "name": null, "is_online": null})).unwrap();
        assert_eq!(user.name, "");
        assert!(!user.is_online);
    }

    #[test]
    fn test_list_with_mixed_record_shapes_decodes() {
        use crate::transport::ListPayload;

        let payload: ListPayload<Task> = ListPayload::from_value(json!([
            {"id": 1, "title": "A", "name": "A"},
            {"id": 2, "title": null, "status": null},
            {"id": "3", "name": "C", "assigned_to": "4", "assignee_id": 4}
        ]))
        .unwrap();
        let ids: Vec<u64> = payload.items.iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert_eq!(payload.items[1].status(), TaskStatus::Todo);
        assert_eq!(payload.items[2].assignee_id, Some(4));
    }

    #[test]
    fn test_project_defaults_and_ownership() {
        let project: Project = serde_json::from_value(json!({
            "id": 4,
            "title": "Site",
            "owner_id": "",
            "assigned_to": "7"
        }))
        .unwrap();
        assert_eq!(project.status, "active");
        assert_eq!(project.owner_id, None);
        assert!(project.belongs_to(7));
        assert!(!project.belongs_to(8));
    }

    #[test]
    fn test_parse_timestamp_formats() {
        assert!(parse_timestamp("2025-03-01T10:00:00Z").is_some());
        assert!(parse_timestamp("2025-03-01T10:00:00.000000Z").is_some());
        assert!(parse_timestamp("2025-03-01 10:00:00").is_some());
        assert!(parse_timestamp("2025-03-01").is_some());
        assert!(parse_timestamp("yesterday").is_none());
        assert!(parse_timestamp("").is_none());
    }

    #[test]
    fn test_overdue_predicate() {
        let now = parse_timestamp("2025-06-01").unwrap();
        let mut task = Task {
            id: 1,
            status: "todo".into(),
            due_date: Some("2025-05-01".into()),
            ..Default::default()
        };
        assert!(task.is_overdue(now));
        task.status = "done".into();
        assert!(!task.is_overdue(now));
        task.status = "overdue".into();
        task.due_date = None;
        assert!(task.is_overdue(now));
    }

    #[test]
    fn test_task_patch_applies_only_set_fields() {
        let mut task = Task {
            id: 1,
            title: "Old".into(),
            status: "todo".into(),
            ..Default::default()
        };
        TaskPatch {
            status: Some("done".into()),
            ..Default::default()
        }
        .apply(&mut task);
        assert_eq!(task.title, "Old");
        assert_eq!(task.status, "done");
    }
}
