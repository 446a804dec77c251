//! Reading progress: a user's saved position within a grimoire.
//!
//! The reader keeps a transient in-memory copy; stores own the persisted
//! record. Persistence failures are never fatal to a reading session.

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::fs;

use crate::cli::ProgressShowArgs;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadingProgress {
    pub user_id: String,
    pub grimoire_id: String,
    /// 1-based page within the current chapter's page set.
    pub current_page: u32,
    /// Page count computed at save time.
    pub total_pages: u32,
    /// Accumulated reading time.
    pub reading_time_minutes: u32,
    pub completed: bool,
    pub last_read_at: DateTime<Utc>,
}

impl ReadingProgress {
    pub fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(self.total_pages >= 1, "total pages must be >= 1");
        anyhow::ensure!(
            self.current_page >= 1 && self.current_page <= self.total_pages,
            "current page {} out of range [1, {}]",
            self.current_page,
            self.total_pages
        );
        Ok(())
    }
}

/// Wire body of a progress update, as the backend API accepts it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressUpdate {
    pub grimoire_id: String,
    pub current_page: u32,
    pub total_pages: u32,
    pub reading_time_minutes: u32,
}

impl ProgressUpdate {
    pub fn to_progress(&self, user_id: &str) -> ReadingProgress {
        ReadingProgress {
            user_id: user_id.to_owned(),
            grimoire_id: self.grimoire_id.clone(),
            current_page: self.current_page,
            total_pages: self.total_pages,
            reading_time_minutes: self.reading_time_minutes,
            completed: self.total_pages > 0 && self.current_page >= self.total_pages,
            last_read_at: Utc::now(),
        }
    }
}

/// Ids are used as path components and URL segments.
pub fn validate_id(id: &str) -> anyhow::Result<()> {
    if id.trim().is_empty() {
        anyhow::bail!("id is empty");
    }
    if id.contains('/') || id.contains('\\') || id.contains("..") {
        anyhow::bail!("id contains path separators: {id:?}");
    }
    Ok(())
}

#[async_trait]
pub trait ProgressStore: Send + Sync {
    async fn load(
        &self,
        user_id: &str,
        grimoire_id: &str,
    ) -> anyhow::Result<Option<ReadingProgress>>;
    async fn save(&self, progress: &ReadingProgress) -> anyhow::Result<()>;
    async fn list(&self, user_id: &str) -> anyhow::Result<Vec<ReadingProgress>>;
}

/// JSON files under `{base}/progress/{user}/{grimoire}.json`, written
/// atomically via temp file + rename.
#[derive(Debug, Clone)]
pub struct LocalFsProgressStore {
    base_dir: PathBuf,
}

impl LocalFsProgressStore {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    fn user_dir(&self, user_id: &str) -> PathBuf {
        self.base_dir.join("progress").join(user_id)
    }

    fn record_path(&self, user_id: &str, grimoire_id: &str) -> PathBuf {
        self.user_dir(user_id).join(format!("{grimoire_id}.json"))
    }
}

#[async_trait]
impl ProgressStore for LocalFsProgressStore {
    async fn load(
        &self,
        user_id: &str,
        grimoire_id: &str,
    ) -> anyhow::Result<Option<ReadingProgress>> {
        validate_id(user_id).context("user id")?;
        validate_id(grimoire_id).context("grimoire id")?;
        let path = self.record_path(user_id, grimoire_id);
        read_json(&path)
            .await
            .with_context(|| format!("read: {}", path.display()))
    }

    async fn save(&self, progress: &ReadingProgress) -> anyhow::Result<()> {
        validate_id(&progress.user_id).context("user id")?;
        validate_id(&progress.grimoire_id).context("grimoire id")?;
        progress.validate().context("progress invariant")?;
        let path = self.record_path(&progress.user_id, &progress.grimoire_id);
        write_json_atomic(&path, progress)
            .await
            .with_context(|| format!("write: {}", path.display()))
    }

    async fn list(&self, user_id: &str) -> anyhow::Result<Vec<ReadingProgress>> {
        validate_id(user_id).context("user id")?;
        let dir_path = self.user_dir(user_id);
        let mut dir = match fs::read_dir(&dir_path).await {
            Ok(dir) => dir,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };

        let mut records = Vec::new();
        while let Some(entry) = dir.next_entry().await? {
            let path = entry.path();
            if path.extension().is_none_or(|ext| ext != "json") {
                continue;
            }
            if let Some(record) = read_json::<ReadingProgress>(&path)
                .await
                .with_context(|| format!("read: {}", path.display()))?
            {
                records.push(record);
            }
        }
        records.sort_by(|a, b| a.grimoire_id.cmp(&b.grimoire_id));
        Ok(records)
    }
}

async fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> anyhow::Result<Option<T>> {
    let bytes = match fs::read(path).await {
        Ok(bytes) => bytes,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(err.into()),
    };
    let value = serde_json::from_slice(&bytes).context("parse json")?;
    Ok(Some(value))
}

async fn write_json_atomic<T: serde::Serialize>(path: &Path, value: &T) -> anyhow::Result<()> {
    let parent = path
        .parent()
        .ok_or_else(|| anyhow::anyhow!("path has no parent: {}", path.display()))?;
    fs::create_dir_all(parent)
        .await
        .with_context(|| format!("create parent dir: {}", parent.display()))?;

    let tmp_path = path.with_extension(format!("tmp.{}", uuid::Uuid::new_v4().simple()));
    let data = serde_json::to_vec_pretty(value).context("serialize json")?;
    fs::write(&tmp_path, &data)
        .await
        .with_context(|| format!("write tmp: {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path)
        .await
        .with_context(|| format!("rename tmp to final: {}", path.display()))?;
    Ok(())
}

/// Client for the backend progress API:
/// `GET/POST {base}/users/{user}/progress`.
#[derive(Debug, Clone)]
pub struct HttpProgressStore {
    client: reqwest::Client,
    base_url: String,
    auth_token: Option<String>,
}

impl HttpProgressStore {
    pub fn new(base_url: &str, auth_token: Option<String>) -> anyhow::Result<Self> {
        let parsed = url::Url::parse(base_url).context("parse progress api base url")?;
        if parsed.scheme() != "http" && parsed.scheme() != "https" {
            anyhow::bail!("progress api base url must be http/https: {base_url}");
        }
        Ok(Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            auth_token: auth_token.filter(|t| !t.trim().is_empty()),
        })
    }

    fn request(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.auth_token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }
}

#[async_trait]
impl ProgressStore for HttpProgressStore {
    async fn load(
        &self,
        user_id: &str,
        grimoire_id: &str,
    ) -> anyhow::Result<Option<ReadingProgress>> {
        validate_id(user_id).context("user id")?;
        validate_id(grimoire_id).context("grimoire id")?;
        let url = format!("{}/users/{user_id}/progress/{grimoire_id}", self.base_url);
        let resp = self
            .request(self.client.get(&url))
            .send()
            .await
            .with_context(|| format!("get reading progress: {url}"))?;

        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("get reading progress failed ({status}): {body}");
        }
        let record = resp.json().await.context("parse reading progress")?;
        Ok(Some(record))
    }

    async fn save(&self, progress: &ReadingProgress) -> anyhow::Result<()> {
        validate_id(&progress.user_id).context("user id")?;
        validate_id(&progress.grimoire_id).context("grimoire id")?;
        progress.validate().context("progress invariant")?;

        let body = ProgressUpdate {
            grimoire_id: progress.grimoire_id.clone(),
            current_page: progress.current_page,
            total_pages: progress.total_pages,
            reading_time_minutes: progress.reading_time_minutes,
        };
        let url = format!("{}/users/{}/progress", self.base_url, progress.user_id);
        let resp = self
            .request(self.client.post(&url).json(&body))
            .send()
            .await
            .with_context(|| format!("post reading progress: {url}"))?;

        if resp.status().is_success() {
            return Ok(());
        }
        let status = resp.status();
        let text = resp.text().await.unwrap_or_default();
        anyhow::bail!("post reading progress failed ({status}): {text}");
    }

    async fn list(&self, user_id: &str) -> anyhow::Result<Vec<ReadingProgress>> {
        validate_id(user_id).context("user id")?;
        let url = format!("{}/users/{user_id}/progress", self.base_url);
        let resp = self
            .request(self.client.get(&url))
            .send()
            .await
            .with_context(|| format!("list reading progress: {url}"))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("list reading progress failed ({status}): {body}");
        }
        resp.json().await.context("parse reading progress list")
    }
}

pub async fn show(args: ProgressShowArgs) -> anyhow::Result<()> {
    let store = LocalFsProgressStore::new(&args.data_dir);
    match &args.grimoire {
        Some(grimoire_id) => {
            let Some(record) = store.load(&args.user, grimoire_id).await? else {
                anyhow::bail!(
                    "no progress for user {} in grimoire {}",
                    args.user,
                    grimoire_id
                );
            };
            println!("{}", serde_json::to_string_pretty(&record)?);
        }
        None => {
            let records = store.list(&args.user).await?;
            println!("{}", serde_json::to_string_pretty(&records)?);
        }
    }
    Ok(())
}
