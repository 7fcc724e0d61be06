//! JSON file history store

use super::{newest_first, HistoryError, HistoryItem, HistoryRepository};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

const FILE_VERSION: u32 = 1;

/// On-disk layout
#[derive(Debug, Default, Serialize, Deserialize)]
struct HistoryFile {
    version: u32,
    items: Vec<HistoryItem>,
}

/// History stored in a single JSON document
///
/// File access runs on the blocking pool. Writes go to a sibling temporary
/// file that is renamed over the original, so a failed save leaves the
/// stored items untouched.
#[derive(Debug)]
pub struct JsonFileHistory {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonFileHistory {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Run `op` against the stored items on the blocking pool
    async fn with_items<T, F>(&self, op: F) -> Result<T, HistoryError>
    where
        T: Send + 'static,
        F: FnOnce(&Path) -> Result<T, HistoryError> + Send + 'static,
    {
        let _guard = self.lock.lock().await;
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || op(&path)).await?
    }
}

fn read_items(path: &Path) -> Result<Vec<HistoryItem>, HistoryError> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };
    if content.trim().is_empty() {
        return Ok(Vec::new());
    }

    let file: HistoryFile = serde_json::from_str(&content)?;
    if file.version != FILE_VERSION {
        tracing::warn!(
            path = %path.display(),
            version = file.version,
            "Unexpected history file version"
        );
    }
    Ok(file.items)
}

fn write_items(path: &Path, items: Vec<HistoryItem>) -> Result<(), HistoryError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let file = HistoryFile {
        version: FILE_VERSION,
        items,
    };
    let json = serde_json::to_vec_pretty(&file)?;

    let mut tmp_name = OsString::from(path.as_os_str());
    tmp_name.push(".tmp");
    let tmp_path = PathBuf::from(tmp_name);

    let result = (|| -> std::io::Result<()> {
        let mut tmp = fs::File::create(&tmp_path)?;
        tmp.write_all(&json)?;
        tmp.sync_all()?;
        fs::rename(&tmp_path, path)
    })();

    if let Err(e) = result {
        let _ = fs::remove_file(&tmp_path);
        return Err(e.into());
    }
    Ok(())
}

#[async_trait]
impl HistoryRepository for JsonFileHistory {
    async fn save(&self, item: HistoryItem) -> Result<String, HistoryError> {
        let id = self
            .with_items(move |path| {
                let mut items = read_items(path)?;
                if items.iter().any(|existing| existing.id == item.id) {
                    return Err(HistoryError::DuplicateId(item.id));
                }
                let id = item.id.clone();
                items.push(item);
                write_items(path, items)?;
                Ok(id)
            })
            .await?;

        tracing::debug!(id = %id, path = %self.path.display(), "Saved history item");
        Ok(id)
    }

    async fn list(&self) -> Result<Vec<HistoryItem>, HistoryError> {
        self.with_items(|path| read_items(path).map(newest_first))
            .await
    }

    async fn get(&self, id: &str) -> Result<Option<HistoryItem>, HistoryError> {
        let id = id.to_string();
        self.with_items(move |path| Ok(read_items(path)?.into_iter().find(|i| i.id == id)))
            .await
    }

    async fn delete(&self, id: &str) -> Result<bool, HistoryError> {
        let id = id.to_string();
        self.with_items(move |path| {
            let mut items = read_items(path)?;
            let before = items.len();
            items.retain(|i| i.id != id);
            if items.len() == before {
                return Ok(false);
            }
            write_items(path, items)?;
            Ok(true)
        })
        .await
    }
}
