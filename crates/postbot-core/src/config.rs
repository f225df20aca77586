use std::{env, fmt, path::Path};

use crate::{domain::ChatId, errors::Error, Result};

pub const DEFAULT_BASE_BRANCH: &str = "main";
pub const DEFAULT_GITHUB_API_URL: &str = "https://api.github.com";
pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:3000";
pub const DEFAULT_WEBHOOK_PATH: &str = "/api/telegram/webhook";
pub const DEFAULT_CONTENT_ROOT: &str = "content";
pub const DEFAULT_MAX_DOCUMENT_BYTES: u64 = 600_000;

/// `owner/name` pair identifying the content repository.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RepoId {
    pub owner: String,
    pub name: String,
}

impl RepoId {
    pub fn parse(raw: &str) -> Result<Self> {
        let raw = raw.trim().trim_end_matches(".git");
        let Some((owner, name)) = raw.split_once('/') else {
            return Err(Error::Config(format!(
                "GITHUB_REPO must look like owner/name, got {raw:?}"
            )));
        };
        let (owner, name) = (owner.trim(), name.trim());
        if owner.is_empty() || name.is_empty() || name.contains('/') {
            return Err(Error::Config(format!(
                "GITHUB_REPO must look like owner/name, got {raw:?}"
            )));
        }
        Ok(Self {
            owner: owner.to_string(),
            name: name.to_string(),
        })
    }
}

impl fmt::Display for RepoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// Typed configuration, built once at startup and shared by `Arc`.
#[derive(Clone)]
pub struct Config {
    // Telegram
    pub telegram_bot_token: String,
    pub telegram_allowed_chat_id: ChatId,
    pub telegram_webhook_secret: Option<String>,
    pub telegram_webhook_url: Option<String>,
    pub telegram_api_url: Option<String>,

    // GitHub
    pub github_token: String,
    pub github_repo: RepoId,
    pub github_base_branch: String,
    pub github_api_url: String,

    // HTTP server
    pub bind_address: String,
    pub webhook_path: String,

    // Content
    pub content_root: String,
    pub max_document_bytes: u64,
}

// Tokens stay out of logs.
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("telegram_allowed_chat_id", &self.telegram_allowed_chat_id)
            .field(
                "telegram_webhook_secret",
                &self.telegram_webhook_secret.as_ref().map(|_| "<set>"),
            )
            .field("telegram_webhook_url", &self.telegram_webhook_url)
            .field("telegram_api_url", &self.telegram_api_url)
            .field("github_repo", &self.github_repo)
            .field("github_base_branch", &self.github_base_branch)
            .field("github_api_url", &self.github_api_url)
            .field("bind_address", &self.bind_address)
            .field("webhook_path", &self.webhook_path)
            .field("content_root", &self.content_root)
            .field("max_document_bytes", &self.max_document_bytes)
            .finish_non_exhaustive()
    }
}

impl Config {
    /// Load from the process environment, reading `.env` first if present.
    pub fn load() -> Result<Self> {
        load_env_file(Path::new(".env"))?;
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary key lookup.
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let required = |key: &str| -> Result<String> {
            get(key)
                .and_then(non_empty)
                .ok_or_else(|| Error::Config(format!("{key} environment variable is required")))
        };
        let optional = |key: &str| get(key).and_then(non_empty);

        let telegram_bot_token = required("TELEGRAM_BOT_TOKEN")?;
        let raw_chat_id = required("TELEGRAM_ALLOWED_CHAT_ID")?;
        let telegram_allowed_chat_id = raw_chat_id
            .trim()
            .parse::<i64>()
            .map(ChatId)
            .map_err(|_| {
                Error::Config(format!(
                    "TELEGRAM_ALLOWED_CHAT_ID must be an integer, got {raw_chat_id:?}"
                ))
            })?;

        let github_token = required("GITHUB_TOKEN")?;
        let github_repo = RepoId::parse(&required("GITHUB_REPO")?)?;
        let github_base_branch =
            optional("GITHUB_BASE_BRANCH").unwrap_or_else(|| DEFAULT_BASE_BRANCH.to_string());
        let github_api_url = optional("GITHUB_API_URL")
            .unwrap_or_else(|| DEFAULT_GITHUB_API_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        let mut webhook_path =
            optional("WEBHOOK_PATH").unwrap_or_else(|| DEFAULT_WEBHOOK_PATH.to_string());
        if !webhook_path.starts_with('/') {
            webhook_path.insert(0, '/');
        }

        let max_document_bytes = match optional("MAX_DOCUMENT_BYTES") {
            Some(v) => v.trim().parse::<u64>().map_err(|_| {
                Error::Config(format!("MAX_DOCUMENT_BYTES must be an integer, got {v:?}"))
            })?,
            None => DEFAULT_MAX_DOCUMENT_BYTES,
        };

        Ok(Self {
            telegram_bot_token,
            telegram_allowed_chat_id,
            telegram_webhook_secret: optional("TELEGRAM_WEBHOOK_SECRET"),
            telegram_webhook_url: optional("TELEGRAM_WEBHOOK_URL"),
            telegram_api_url: optional("TELEGRAM_API_URL"),
            github_token,
            github_repo,
            github_base_branch,
            github_api_url,
            bind_address: optional("BIND_ADDRESS")
                .unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string()),
            webhook_path,
            content_root: optional("CONTENT_ROOT")
                .map(|s| s.trim_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_CONTENT_ROOT.to_string()),
            max_document_bytes,
        })
    }
}

/// Apply an env file without overriding variables that are already set.
/// A missing file is not an error.
fn load_env_file(path: &Path) -> Result<()> {
    match dotenvy::from_path(path) {
        Ok(()) => Ok(()),
        Err(e) if e.not_found() => Ok(()),
        Err(e) => Err(Error::Config(format!(
            "failed to read {}: {e}",
            path.display()
        ))),
    }
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}
