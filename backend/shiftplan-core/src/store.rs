// src/store.rs
use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};
use url::Url;

use crate::schedule_config::ScheduleConfig;

// --- Schedule entries ---

/// Body of an "add schedule entry" request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewScheduleEntry {
    pub employee_id: String,
    pub date: NaiveDate,
    pub start_time: String,
    pub end_time: String,
}

/// A schedule entry as persisted by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleEntry {
    pub id: String,
    pub employee_id: String,
    pub date: NaiveDate,
    pub start_time: String,
    pub end_time: String,
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("HTTP request failed")]
    Request(#[from] reqwest::Error),

    #[error("JSON processing error")]
    Json(#[from] serde_json::Error),

    #[error("URL parsing error")]
    UrlParse(#[from] url::ParseError),

    #[error("Store rejected request: Status={status}, Message='{message}'")]
    Rejected { status: StatusCode, message: String },
}

impl StoreError {
    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::Rejected { status, .. } if *status == StatusCode::CONFLICT)
    }
}

/// The external work-schedule store.
#[async_trait]
pub trait ScheduleStore: Send + Sync {
    async fn add_entry(
        &self,
        schedule_id: &str,
        entry: &NewScheduleEntry,
    ) -> Result<ScheduleEntry, StoreError>;

    async fn list_entries(&self, schedule_id: &str) -> Result<Vec<ScheduleEntry>, StoreError>;
}

// Error body returned by the backend on non-success statuses.
#[derive(Debug, Deserialize)]
struct ErrorPayload {
    #[serde(alias = "error")]
    message: Option<String>,
}

/// REST client for the schedule backend. No retries: a failed call is reported as-is.
#[derive(Clone)]
pub struct HttpScheduleStore {
    base_url: Url,
    http_client: Client,
}

impl HttpScheduleStore {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, StoreError> {
        // `Url::join` drops the last path segment unless the base ends with a slash.
        let normalized = if base_url.ends_with('/') {
            base_url.to_string()
        } else {
            format!("{}/", base_url)
        };
        let base_url = Url::parse(&normalized)?;
        let http_client = Client::builder().timeout(timeout).build()?;
        info!("HTTP schedule store targeting {}", base_url);
        Ok(Self {
            base_url,
            http_client,
        })
    }

    fn entries_url(&self, schedule_id: &str) -> Result<Url, StoreError> {
        let mut endpoint = self.base_url.clone();
        endpoint
            .path_segments_mut()
            .map_err(|_| StoreError::UrlParse(url::ParseError::RelativeUrlWithCannotBeABaseBase))?
            .pop_if_empty()
            .push("schedules")
            .push(schedule_id)
            .push("entries");
        Ok(endpoint)
    }

    fn build_request(&self, method: Method, url: Url) -> RequestBuilder {
        self.http_client
            .request(method, url)
            .header(ACCEPT, "application/json")
            .header(CONTENT_TYPE, "application/json")
    }

    async fn send_and_deserialize<T: DeserializeOwned>(
        &self,
        request_builder: RequestBuilder,
        context_msg: &str,
    ) -> Result<T, StoreError> {
        let request = request_builder.build()?;
        let request_url = request.url().to_string();
        debug!("Sending request for '{}' to URL: {}", context_msg, request_url);

        let response = self.http_client.execute(request).await.map_err(|e| {
            error!(
                "HTTP execution failed for '{}' (URL: {}): {}",
                context_msg, request_url, e
            );
            StoreError::Request(e)
        })?;

        let status = response.status();
        debug!(
            "Received response for '{}' (URL: {}): Status={}",
            context_msg, request_url, status
        );

        if status.is_success() {
            let bytes = response.bytes().await?;
            return serde_json::from_slice::<T>(&bytes).map_err(|e| {
                error!(
                    "JSON deserialization failed for '{}' (URL: {}): {}",
                    context_msg, request_url, e
                );
                StoreError::Json(e)
            });
        }

        let error_body = response
            .text()
            .await
            .unwrap_or_else(|e| format!("Failed to read error body: {}", e));
        warn!(
            "Store error response: Status={}, Body='{}' for URL: {}",
            status, error_body, request_url
        );
        let message = match serde_json::from_str::<ErrorPayload>(&error_body) {
            Ok(ErrorPayload {
                message: Some(message),
            }) => message,
            _ => error_body,
        };
        Err(StoreError::Rejected { status, message })
    }
}

#[async_trait]
impl ScheduleStore for HttpScheduleStore {
    async fn add_entry(
        &self,
        schedule_id: &str,
        entry: &NewScheduleEntry,
    ) -> Result<ScheduleEntry, StoreError> {
        let url = self.entries_url(schedule_id)?;
        let request = self.build_request(Method::POST, url).json(entry);
        self.send_and_deserialize(request, &format!("add entry {} {}", entry.employee_id, entry.date))
            .await
    }

    async fn list_entries(&self, schedule_id: &str) -> Result<Vec<ScheduleEntry>, StoreError> {
        let url = self.entries_url(schedule_id)?;
        let request = self.build_request(Method::GET, url);
        self.send_and_deserialize(request, &format!("list entries of {}", schedule_id))
            .await
    }
}

/// In-process schedule store; blocked days emulate clashes with existing leave records.
#[derive(Default)]
pub struct InMemoryScheduleStore {
    entries: Mutex<HashMap<String, Vec<ScheduleEntry>>>,
    blocked: Mutex<HashMap<(String, NaiveDate), String>>,
    next_id: AtomicU64,
}

impl InMemoryScheduleStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn block_day(&self, employee_id: &str, date: NaiveDate, reason: &str) {
        self.blocked
            .lock()
            .await
            .insert((employee_id.to_string(), date), reason.to_string());
    }
}

#[async_trait]
impl ScheduleStore for InMemoryScheduleStore {
    async fn add_entry(
        &self,
        schedule_id: &str,
        entry: &NewScheduleEntry,
    ) -> Result<ScheduleEntry, StoreError> {
        if let Some(reason) = self
            .blocked
            .lock()
            .await
            .get(&(entry.employee_id.clone(), entry.date))
        {
            return Err(StoreError::Rejected {
                status: StatusCode::CONFLICT,
                message: reason.clone(),
            });
        }

        let mut entries = self.entries.lock().await;
        let schedule = entries.entry(schedule_id.to_string()).or_default();
        if schedule
            .iter()
            .any(|e| e.employee_id == entry.employee_id && e.date == entry.date)
        {
            return Err(StoreError::Rejected {
                status: StatusCode::CONFLICT,
                message: format!("{} already scheduled on {}", entry.employee_id, entry.date),
            });
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let stored = ScheduleEntry {
            id: id.to_string(),
            employee_id: entry.employee_id.clone(),
            date: entry.date,
            start_time: entry.start_time.clone(),
            end_time: entry.end_time.clone(),
        };
        schedule.push(stored.clone());
        Ok(stored)
    }

    async fn list_entries(&self, schedule_id: &str) -> Result<Vec<ScheduleEntry>, StoreError> {
        Ok(self
            .entries
            .lock()
            .await
            .get(schedule_id)
            .cloned()
            .unwrap_or_default())
    }
}

// --- Config key-value store ---

#[derive(Error, Debug)]
pub enum ConfigStoreError {
    #[error("File I/O error: {context}")]
    Io {
        #[source]
        source: std::io::Error,
        context: String,
    },

    #[error("JSON processing error")]
    Json(#[from] serde_json::Error),
}

fn io_context<S: Into<String>>(source: std::io::Error, context: S) -> ConfigStoreError {
    ConfigStoreError::Io {
        source,
        context: context.into(),
    }
}

/// Key-value storage of schedule configs, keyed by config id.
pub trait ConfigStore {
    fn get(&self, id: &str) -> Result<Option<ScheduleConfig>, ConfigStoreError>;
    fn put(&self, config: &ScheduleConfig) -> Result<(), ConfigStoreError>;
    fn remove(&self, id: &str) -> Result<bool, ConfigStoreError>;
    fn list(&self) -> Result<Vec<ScheduleConfig>, ConfigStoreError>;
}

/// Configs kept in a single pretty-printed JSON object on disk.
#[derive(Debug, Clone)]
pub struct JsonFileConfigStore {
    path: PathBuf,
}

impl JsonFileConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<BTreeMap<String, ScheduleConfig>, ConfigStoreError> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let json_string = fs::read_to_string(&self.path).map_err(|e| {
            io_context(e, format!("Failed to read config store: {:?}", self.path))
        })?;
        if json_string.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        Ok(serde_json::from_str(&json_string)?)
    }

    fn save(&self, configs: &BTreeMap<String, ScheduleConfig>) -> Result<(), ConfigStoreError> {
        let json_string = serde_json::to_string_pretty(configs)?;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| {
                io_context(e, format!("Failed to create directory for config store: {:?}", parent))
            })?;
        }
        let mut file = File::create(&self.path).map_err(|e| {
            io_context(e, format!("Failed to create config store: {:?}", self.path))
        })?;
        file.write_all(json_string.as_bytes()).map_err(|e| {
            io_context(e, format!("Failed to write config store: {:?}", self.path))
        })?;
        debug!("Saved {} configs to {}", configs.len(), self.path.display());
        Ok(())
    }
}

impl ConfigStore for JsonFileConfigStore {
    fn get(&self, id: &str) -> Result<Option<ScheduleConfig>, ConfigStoreError> {
        Ok(self.load()?.remove(id))
    }

    fn put(&self, config: &ScheduleConfig) -> Result<(), ConfigStoreError> {
        let mut configs = self.load()?;
        configs.insert(config.id.clone(), config.clone());
        self.save(&configs)
    }

    fn remove(&self, id: &str) -> Result<bool, ConfigStoreError> {
        let mut configs = self.load()?;
        let removed = configs.remove(id).is_some();
        if removed {
            self.save(&configs)?;
        }
        Ok(removed)
    }

    fn list(&self) -> Result<Vec<ScheduleConfig>, ConfigStoreError> {
        Ok(self.load()?.into_values().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule_config::{FixedHours, SchedulePattern};

    fn entry(employee_id: &str, date: &str) -> NewScheduleEntry {
        NewScheduleEntry {
            employee_id: employee_id.to_string(),
            date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            start_time: "08:00".into(),
            end_time: "16:00".into(),
        }
    }

    fn fixed(id: &str) -> ScheduleConfig {
        ScheduleConfig {
            id: id.to_string(),
            name: format!("Config {}", id),
            include_saturdays: false,
            include_sundays: false,
            include_holidays: false,
            pattern: SchedulePattern::FixedHours(FixedHours {
                start_time: "08:00".into(),
                end_time: "16:00".into(),
            }),
        }
    }

    #[tokio::test]
    async fn in_memory_store_rejects_blocked_and_duplicate_days() {
        let store = InMemoryScheduleStore::new();
        let blocked_date = NaiveDate::from_ymd_opt(2025, 3, 4).unwrap();
        store.block_day("E1", blocked_date, "Vacation").await;

        let first = store.add_entry("S1", &entry("E1", "2025-03-03")).await.unwrap();
        assert_eq!(first.id, "1");

        let err = store.add_entry("S1", &entry("E1", "2025-03-04")).await.unwrap_err();
        assert!(err.is_conflict());

        let dup = store.add_entry("S1", &entry("E1", "2025-03-03")).await.unwrap_err();
        assert!(dup.is_conflict());

        // Other employees and schedules are unaffected.
        store.add_entry("S1", &entry("E2", "2025-03-04")).await.unwrap();
        store.add_entry("S2", &entry("E1", "2025-03-03")).await.unwrap();

        assert_eq!(store.list_entries("S1").await.unwrap().len(), 2);
        assert!(store.list_entries("missing").await.unwrap().is_empty());
    }

    #[test]
    fn http_store_joins_entry_path_onto_base() {
        let store = HttpScheduleStore::new("http://localhost:8080/api", Duration::from_secs(5)).unwrap();
        assert_eq!(
            store.entries_url("42").unwrap().as_str(),
            "http://localhost:8080/api/schedules/42/entries"
        );
    }

    #[test]
    fn http_store_escapes_schedule_id_as_one_segment() {
        let store = HttpScheduleStore::new("http://localhost:8080/api/", Duration::from_secs(5)).unwrap();

        let traversal = store.entries_url("../x").unwrap();
        assert_eq!(traversal.path(), "/api/schedules/..%2Fx/entries");

        let with_query = store.entries_url("a?b").unwrap();
        assert_eq!(with_query.path(), "/api/schedules/a%3Fb/entries");
        assert_eq!(with_query.query(), None);
    }

    #[test]
    fn json_file_store_round_trips_configs() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileConfigStore::new(dir.path().join("nested").join("configs.json"));

        assert!(store.list().unwrap().is_empty());
        store.put(&fixed("a")).unwrap();
        store.put(&fixed("b")).unwrap();
        assert_eq!(store.get("a").unwrap(), Some(fixed("a")));
        assert_eq!(store.list().unwrap().len(), 2);

        assert!(store.remove("a").unwrap());
        assert!(!store.remove("a").unwrap());
        assert_eq!(store.get("a").unwrap(), None);
        assert_eq!(store.list().unwrap(), vec![fixed("b")]);
    }
}
