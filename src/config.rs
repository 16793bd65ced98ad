use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Environment variable that overrides `[api] base_url`.
pub const API_URL_ENV: &str = "TASKDECK_API_URL";

#[derive(Debug, Deserialize, Clone, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub views: ViewsConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// `per_page` sent with list requests so one fetch returns everything.
    #[serde(default = "default_per_page")]
    pub per_page: Option<u32>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
            per_page: default_per_page(),
        }
    }
}

impl ApiConfig {
    /// Whole-request timeout; never shorter than one second.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }
}

fn default_base_url() -> String {
    "http://localhost:8000/api".to_string()
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_per_page() -> Option<u32> {
    Some(100)
}

#[derive(Debug, Deserialize, Clone)]
pub struct SessionConfig {
    /// JSON file holding `auth_token` and `current_user`.
    #[serde(default = "default_storage_path")]
    pub storage_path: String,
    /// Acts as the current user when no one is signed in.
    #[serde(default)]
    pub user_id: Option<u64>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            storage_path: default_storage_path(),
            user_id: None,
        }
    }
}

fn default_storage_path() -> String {
    "taskdeck-session.json".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct ViewsConfig {
    #[serde(default = "default_page_size")]
    pub page_size: usize,
}

impl Default for ViewsConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
        }
    }
}

fn default_page_size() -> usize {
    10
}

impl AppConfig {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let mut config: AppConfig = toml::from_str(&content)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Like `load`, but a missing file yields the defaults. A file that exists
    /// and fails to parse is still an error.
    pub fn load_or_default(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            return Self::load(path);
        }
        let mut config = AppConfig::default();
        config.apply_env_overrides();
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var(API_URL_ENV) {
            let url = url.trim();
            if !url.is_empty() {
                self.api.base_url = url.to_string();
            }
        }
    }
}
