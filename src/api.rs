//! Typed endpoints of the tracker REST API.

use anyhow::Context;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::transport::{DataError, HttpClient, ListPayload, Method, RequestOptions};
use crate::types::{NewTask, Project, ProjectPatch, Task, TaskPatch, User};

/// Upper bound on follow-up page requests for one list call.
const MAX_EXTRA_PAGES: u64 = 200;

/// Filters understood by the list endpoints. Unset fields are not sent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CollectionQuery {
    pub user_id: Option<u64>,
    pub project_id: Option<u64>,
    pub status: Option<String>,
    pub assigned_to: Option<u64>,
    pub priority: Option<String>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
    pub per_page: Option<u32>,
}

impl CollectionQuery {
    pub fn to_params(&self) -> Vec<(String, Option<String>)> {
        vec![
            ("user_id".into(), self.user_id.map(|v| v.to_string())),
            ("project_id".into(), self.project_id.map(|v| v.to_string())),
            ("status".into(), self.status.clone()),
            ("assigned_to".into(), self.assigned_to.map(|v| v.to_string())),
            ("priority".into(), self.priority.clone()),
            ("sort_by".into(), self.sort_by.clone()),
            ("sort_order".into(), self.sort_order.clone()),
            ("per_page".into(), self.per_page.map(|v| v.to_string())),
        ]
    }
}

/// The calls the aggregation store depends on.
#[async_trait]
pub trait TrackerApi: Send + Sync {
    async fn list_users(&self) -> Result<Vec<User>, DataError>;
    async fn list_projects(&self, query: &CollectionQuery) -> Result<Vec<Project>, DataError>;
    async fn list_tasks(&self, query: &CollectionQuery) -> Result<Vec<Task>, DataError>;

    async fn create_task(&self, task: &NewTask) -> Result<Option<Task>, DataError>;
    async fn update_task(&self, id: u64, patch: &TaskPatch) -> Result<Option<Task>, DataError>;
    async fn delete_task(&self, id: u64) -> Result<(), DataError>;

    async fn update_project(
        &self,
        id: u64,
        patch: &ProjectPatch,
    ) -> Result<Option<Project>, DataError>;
    async fn delete_project(&self, id: u64) -> Result<(), DataError>;
    /// Link (or re-link) an external repository and trigger a server-side sync.
    async fn sync_repository(
        &self,
        project_id: u64,
        repository_url: &str,
    ) -> Result<Option<Project>, DataError>;
}

/// Result of `POST /login`.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    #[serde(alias = "access_token")]
    pub token: String,
    #[serde(default)]
    pub user: Option<User>,
}

pub struct ApiClient {
    http: HttpClient,
    default_per_page: Option<u32>,
}

impl ApiClient {
    pub fn new(http: HttpClient) -> Self {
        Self {
            http,
            default_per_page: None,
        }
    }

    /// Page size sent with list requests that don't set their own.
    pub fn with_default_per_page(mut self, per_page: Option<u32>) -> Self {
        self.default_per_page = per_page;
        self
    }

    pub fn http(&self) -> &HttpClient {
        &self.http
    }

    async fn list<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        query: &CollectionQuery,
    ) -> Result<Vec<T>, DataError> {
        let mut query = query.clone();
        if query.per_page.is_none() {
            query.per_page = self.default_per_page;
        }
        let params = query.to_params();
        let value: Value = self.http.get(endpoint, params.clone()).await?;
        let first = ListPayload::<T>::from_value(value)?;
        let mut items = first.items;

        // Paginated endpoints: walk the remaining pages so the store never
        // installs a truncated collection.
        if let Some(meta) = first.meta {
            let pages = meta.remaining_pages();
            if pages.clone().count() as u64 > MAX_EXTRA_PAGES {
                warn!(
                    endpoint,
                    last_page = ?meta.last_page,
                    "Paginated list is larger than the client will fetch"
                );
            }
            for page in pages.take(MAX_EXTRA_PAGES as usize) {
                let mut page_params = params.clone();
                page_params.push(("page".into(), Some(page.to_string())));
                let value: Value = self.http.get(endpoint, page_params).await?;
                items.extend(ListPayload::<T>::from_value(value)?.items);
            }
            debug!(endpoint, count = items.len(), total = ?meta.total, "Fetched paginated list");
        }
        Ok(items)
    }

    /// Decode a mutation result; `null` (or a bare acknowledgement) means the
    /// server didn't echo the record back.
    fn record<T: DeserializeOwned>(value: Value) -> Result<Option<T>, DataError> {
        match value {
            Value::Null => Ok(None),
            Value::Object(ref obj) if !obj.contains_key("id") => Ok(None),
            other => serde_json::from_value(other)
                .map(Some)
                .map_err(|e| DataError::parse(format!("Unexpected record shape: {}", e))),
        }
    }

    /// Authenticate and persist the bearer token and user for later requests.
    /// API failures come back as a `DataError` inside the `anyhow::Error`;
    /// a session that can't be stored is a local error.
    pub async fn login(&self, email: &str, password: &str) -> anyhow::Result<LoginResponse> {
        let resp: LoginResponse = self
            .http
            .post("/login", json!({"email": email, "password": password}))
            .await?;
        self.http
            .session()
            .sign_in(&resp.token, resp.user.as_ref())
            .context("Could not persist session")?;
        info!(user_id = ?resp.user.as_ref().map(|u| u.id), "Signed in");
        Ok(resp)
    }

    /// Best-effort server logout; local credentials are always cleared.
    pub async fn logout(&self) -> Result<(), DataError> {
        let remote = self
            .http
            .request::<Value>("/logout", RequestOptions::new(Method::Post))
            .await;
        if let Err(e) = self.http.session().sign_out() {
            tracing::warn!("Failed to clear stored session: {}", e);
        }
        remote.map(|_| ())
    }
}

#[async_trait]
impl TrackerApi for ApiClient {
    async fn list_users(&self) -> Result<Vec<User>, DataError> {
        self.list("/users", &CollectionQuery::default()).await
    }

    async fn list_projects(&self, query: &CollectionQuery) -> Result<Vec<Project>, DataError> {
        self.list("/projects", query).await
    }

    async fn list_tasks(&self, query: &CollectionQuery) -> Result<Vec<Task>, DataError> {
        self.list("/tasks", query).await
    }

    async fn create_task(&self, task: &NewTask) -> Result<Option<Task>, DataError> {
        let body = serde_json::to_value(task)
            .map_err(|e| DataError::parse(format!("Unserializable task: {}", e)))?;
        let value: Value = self.http.post("/tasks", body).await?;
        Self::record(value)
    }

    async fn update_task(&self, id: u64, patch: &TaskPatch) -> Result<Option<Task>, DataError> {
        let body = serde_json::to_value(patch)
            .map_err(|e| DataError::parse(format!("Unserializable patch: {}", e)))?;
        let value: Value = self.http.put(&format!("/tasks/{}", id), body).await?;
        Self::record(value)
    }

    async fn delete_task(&self, id: u64) -> Result<(), DataError> {
        let _: Value = self.http.delete(&format!("/tasks/{}", id)).await?;
        Ok(())
    }

    async fn update_project(
        &self,
        id: u64,
        patch: &ProjectPatch,
    ) -> Result<Option<Project>, DataError> {
        let body = serde_json::to_value(patch)
            .map_err(|e| DataError::parse(format!("Unserializable patch: {}", e)))?;
        let value: Value = self.http.put(&format!("/projects/{}", id), body).await?;
        Self::record(value)
    }

    async fn delete_project(&self, id: u64) -> Result<(), DataError> {
        let _: Value = self.http.delete(&format!("/projects/{}", id)).await?;
        Ok(())
    }

    async fn sync_repository(
        &self,
        project_id: u64,
        repository_url: &str,
    ) -> Result<Option<Project>, DataError> {
        let value: Value = self
            .http
            .post(
                &format!("/projects/{}/sync", project_id),
                json!({"repository_url": repository_url}),
            )
            .await?;
        Self::record(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Session;
    use crate::testing::MockBackend;
    use std::sync::Arc;

    fn api(backend: Arc<MockBackend>) -> ApiClient {
        let http = HttpClient::new("http://localhost:8000/api", backend, Session::in_memory()).unwrap();
        ApiClient::new(http)
    }

    #[test]
    fn test_query_params_only_defined_values_are_set() {
        let query = CollectionQuery {
            project_id: Some(4),
            status: Some("done".into()),
            ..Default::default()
        };
        let defined: Vec<_> = query
            .to_params()
            .into_iter()
            .filter(|(_, v)| v.is_some())
            .collect();
        assert_eq!(defined.len(), 2);
    }

    #[tokio::test]
    async fn test_list_tasks_accepts_paginated_envelope() {
        let backend = Arc::new(MockBackend::new());
        backend.push_json(
            200,
            json!({"success": true, "data": {"current_page": 1, "data": [{"id": 1, "title": "A"}]}}),
        );
        let api = api(backend.clone());
        let tasks = api
            .list_tasks(&CollectionQuery {
                project_id: Some(2),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(tasks.len(), 1);
        assert_eq!(
            backend.last_request().unwrap().url,
            "http://localhost:8000/api/tasks?project_id=2"
        );
    }

    #[tokio::test]
    async fn test_list_walks_remaining_pages() {
        let backend = Arc::new(MockBackend::new());
        backend.push_json(
            200,
            json!({"current_page": 1, "last_page": 2, "total": 2, "data": [{"id": 1, "title": "A"}]}),
        );
        backend.push_json(
            200,
            json!({"current_page": 2, "last_page": 2, "total": 2, "data": [{"id": 2, "title": "B"}]}),
        );
        let api = api(backend.clone());

        let tasks = api.list_tasks(&CollectionQuery::default()).await.unwrap();
        let ids: Vec<u64> = tasks.iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![1, 2]);

        let urls: Vec<String> = backend.requests().into_iter().map(|r| r.url).collect();
        assert_eq!(
            urls,
            vec![
                "http://localhost:8000/api/tasks".to_string(),
                "http://localhost:8000/api/tasks?page=2".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_failed_follow_up_page_fails_the_list() {
        let backend = Arc::new(MockBackend::new());
        backend.push_json(
            200,
            json!({"current_page": 1, "last_page": 3, "data": [{"id": 1, "title": "A"}]}),
        );
        backend.push_error(DataError::network("reset"));
        let api = api(backend.clone());

        let err = api.list_tasks(&CollectionQuery::default()).await.unwrap_err();
        assert!(matches!(err, DataError::Network { .. }));
        assert_eq!(backend.requests().len(), 2);
    }

    #[tokio::test]
    async fn test_default_per_page_applied() {
        let backend = Arc::new(MockBackend::new());
        backend.push_json(200, json!([]));
        let api = api(backend.clone()).with_default_per_page(Some(100));
        api.list_users().await.unwrap();
        assert_eq!(
            backend.last_request().unwrap().url,
            "http://localhost:8000/api/users?per_page=100"
        );
    }

    #[tokio::test]
    async fn test_login_persists_token_for_next_request() {
        let backend = Arc::new(MockBackend::new());
        backend.push_json(
            200,
            json!({"success": true, "data": {"token": "abc", "user": {"id": 7, "name": "Kim"}}}),
        );
        backend.push_json(200, json!([]));
        let api = api(backend.clone());

        let resp = api.login("kim@example.com", "pw").await.unwrap();
        assert_eq!(resp.user.unwrap().id, 7);
        assert_eq!(api.http().session().current_user().unwrap().name, "Kim");

        api.list_projects(&CollectionQuery::default()).await.unwrap();
        assert_eq!(
            backend.last_request().unwrap().headers.get("Authorization"),
            Some("Bearer abc")
        );
    }

    struct ReadOnlyStorage;

    impl crate::session::SessionStorage for ReadOnlyStorage {
        fn get(&self, _key: &str) -> Option<String> {
            None
        }
        fn set(&self, _key: &str, _value: &str) -> anyhow::Result<()> {
            anyhow::bail!("read-only file system")
        }
        fn remove(&self, _key: &str) -> anyhow::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_login_storage_failure_is_not_a_data_error() {
        let backend = Arc::new(MockBackend::new());
        backend.push_json(200, json!({"token": "abc", "user": {"id": 7, "name": "Kim"}}));
        let session = Session::new(Arc::new(ReadOnlyStorage));
        let api = ApiClient::new(
            HttpClient::new("http://localhost:8000/api", backend, session).unwrap(),
        );

        let err = api.login("kim@example.com", "pw").await.unwrap_err();
        assert!(err.downcast_ref::<DataError>().is_none());
        assert!(err.to_string().contains("Could not persist session"));
    }

    #[tokio::test]
    async fn test_login_rejection_keeps_data_error() {
        let backend = Arc::new(MockBackend::new());
        backend.push_json(
            422,
            json!({"message": "Invalid credentials", "errors": {"email": ["unknown"]}}),
        );
        let api = api(backend);

        let err = api.login("kim@example.com", "pw").await.unwrap_err();
        let data = err.downcast_ref::<DataError>().unwrap();
        assert_eq!(data.status(), Some(422));
    }

    #[tokio::test]
    async fn test_logout_clears_session_even_on_error() {
        let backend = Arc::new(MockBackend::new());
        backend.push_error(DataError::network("offline"));
        let api = api(backend);
        api.http().session().sign_in("abc", None).unwrap();

        assert!(api.logout().await.is_err());
        assert!(api.http().session().bearer_token().is_none());
    }

    #[tokio::test]
    async fn test_update_without_echo_is_none() {
        let backend = Arc::new(MockBackend::new());
        backend.push_json(200, json!({"success": true, "message": "Updated"}));
        let api = api(backend.clone());
        let out = api
            .update_task(
                5,
                &TaskPatch {
                    status: Some("done".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert!(out.is_none());

        let sent = backend.last_request().unwrap();
        assert_eq!(sent.method, Method::Put);
        assert_eq!(sent.body, Some(json!({"status": "done"})));
    }

    #[tokio::test]
    async fn test_sync_repository_posts_url() {
        let backend = Arc::new(MockBackend::new());
        backend.push_json(
            200,
            json!({"success": true, "data": {"id": 3, "title": "P", "repository_url": "https://git.example.com/p"}}),
        );
        let api = api(backend.clone());
        let project = api
            .sync_repository(3, "https://git.example.com/p")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(project.repository_url.as_deref(), Some("https://git.example.com/p"));
        assert!(backend.last_request().unwrap().url.ends_with("/projects/3/sync"));
    }
}
