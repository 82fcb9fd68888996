//! Optional persistence of the document tree as a JSON file.
//!
//! The tree is written to a sibling temp file and renamed into place, so a
//! crash mid-write leaves the previous snapshot intact.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use tracing::{debug, info, warn};

use w3_sync::MemoryDocumentStore;

/// Load the tree from `path`, or start empty when the file does not exist.
pub async fn load(path: &Path) -> anyhow::Result<MemoryDocumentStore> {
    match tokio::fs::read(path).await {
        Ok(bytes) => {
            let root: serde_json::Value = serde_json::from_slice(&bytes)
                .with_context(|| format!("corrupt snapshot {}", path.display()))?;
            info!(path = %path.display(), size = bytes.len(), "snapshot loaded");
            Ok(MemoryDocumentStore::from_value(root))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            info!(path = %path.display(), "no snapshot yet, starting empty");
            Ok(MemoryDocumentStore::new())
        }
        Err(e) => Err(e).with_context(|| format!("reading snapshot {}", path.display())),
    }
}

pub async fn save(docs: &MemoryDocumentStore, path: &Path) -> anyhow::Result<()> {
    let bytes = serde_json::to_vec(&docs.to_value())?;

    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(dir).await?;
    }
    let tmp = tmp_path(path);
    tokio::fs::write(&tmp, &bytes).await?;
    tokio::fs::rename(&tmp, path).await?;

    debug!(path = %path.display(), size = bytes.len(), "snapshot saved");
    Ok(())
}

/// Save the tree every `interval` until the task is aborted.
pub fn spawn_saver(
    docs: MemoryDocumentStore,
    path: PathBuf,
    interval: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            if let Err(e) = save(&docs, &path).await {
                warn!(error = %e, "periodic snapshot failed");
            }
        }
    })
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use w3_sync::{DocPath, DocumentStore};

    use super::*;

    #[tokio::test]
    async fn save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("tree.json");

        let docs = MemoryDocumentStore::new();
        docs.set(&DocPath::parse("shared_diaries/d1").unwrap(), json!({"creatorId": 1}))
            .await
            .unwrap();
        save(&docs, &path).await.unwrap();
        assert!(!tmp_path(&path).exists());

        let restored = load(&path).await.unwrap();
        assert_eq!(restored.to_value(), docs.to_value());
    }

    #[tokio::test]
    async fn missing_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let docs = load(&dir.path().join("absent.json")).await.unwrap();
        assert_eq!(docs.to_value(), serde_json::Value::Null);
    }

    #[tokio::test]
    async fn corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        tokio::fs::write(&path, b"{nope").await.unwrap();
        assert!(load(&path).await.is_err());
    }
}
