//! Durable per-provider classification documents
//!
//! One JSON document per provider:
//!
//! ```json
//! {"keys": {"<key>": "<tier or dead>"}, "capabilities": [..], "quota_exhausted": [..]}
//! ```
//!
//! Older deployments wrote the bare `keys` map with no wrapper; loading
//! accepts both. Loading never fails: a missing or unreadable document is an
//! empty state. Writes use temp-file + rename with 0600 permissions.

use std::collections::{BTreeMap, BTreeSet};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::state::ProviderState;

/// Boxed store future, dyn-compatible for `Arc<dyn LifecycleStore>`.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Load/save contract for one provider's durable state.
///
pub trait LifecycleStore: Send + Sync {
    fn load(&self) -> StoreFuture<'_, ProviderState>;

    /// Overwrite the whole document. Callers treat failures as non-fatal.
    fn save<'a>(&'a self, state: &'a ProviderState) -> StoreFuture<'a, Result<()>>;
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct Document {
    keys: BTreeMap<String, String>,
    #[serde(default)]
    capabilities: BTreeSet<String>,
    #[serde(default)]
    quota_exhausted: BTreeSet<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Stored {
    Current(Document),
    Legacy(BTreeMap<String, String>),
}

impl From<Stored> for ProviderState {
    fn from(stored: Stored) -> Self {
        match stored {
            Stored::Current(doc) => ProviderState {
                keys: doc.keys,
                capabilities: doc.capabilities,
                quota_exhausted: doc.quota_exhausted,
            },
            Stored::Legacy(keys) => ProviderState {
                keys,
                ..Default::default()
            },
        }
    }
}

/// `<dir>/<provider>.json`.
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(dir: &Path, provider: &str) -> Self {
        Self {
            path: dir.join(format!("{provider}.json")),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read(&self) -> ProviderState {
        let contents = match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no stored state, starting empty");
                return ProviderState::default();
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "unreadable store, starting empty");
                return ProviderState::default();
            }
        };
        match serde_json::from_str::<Stored>(&contents) {
            Ok(stored) => {
                let state = ProviderState::from(stored);
                info!(path = %self.path.display(), keys = state.keys.len(), "loaded stored state");
                state
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "malformed store, starting empty");
                ProviderState::default()
            }
        }
    }

    async fn write(&self, state: &ProviderState) -> Result<()> {
        let doc = Document {
            keys: state.keys.clone(),
            capabilities: state.capabilities.clone(),
            quota_exhausted: state.quota_exhausted.clone(),
        };
        let json = serde_json::to_string(&doc)
            .map_err(|e| Error::Store(format!("serializing state: {e}")))?;
        write_atomic(&self.path, json.as_bytes()).await
    }
}

impl LifecycleStore for JsonFileStore {
    fn load(&self) -> StoreFuture<'_, ProviderState> {
        Box::pin(self.read())
    }

    fn save<'a>(&'a self, state: &'a ProviderState) -> StoreFuture<'a, Result<()>> {
        Box::pin(self.write(state))
    }
}

/// Write to a temp file beside `path`, restrict it to the owner, then rename
/// over the target.
async fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    let dir = path
        .parent()
        .ok_or_else(|| Error::Store("store path has no parent directory".into()))?;
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| Error::Store(format!("creating store directory: {e}")))?;

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let tmp_path = dir.join(format!(".{file_name}.tmp.{}", std::process::id()));

    tokio::fs::write(&tmp_path, contents)
        .await
        .map_err(|e| Error::Store(format!("writing temp store file: {e}")))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o600);
        tokio::fs::set_permissions(&tmp_path, perms)
            .await
            .map_err(|e| Error::Store(format!("setting store file permissions: {e}")))?;
    }

    tokio::fs::rename(&tmp_path, path)
        .await
        .map_err(|e| Error::Store(format!("renaming temp store file: {e}")))?;

    debug!(path = %path.display(), "persisted state");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ProviderState {
        ProviderState {
            keys: [("k1", "Tier_1"), ("k2", "dead"), ("k3", "rate_limited")]
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            capabilities: ["k1".to_string()].into(),
            quota_exhausted: ["k3".to_string()].into(),
        }
    }

    #[tokio::test]
    async fn roundtrip_save_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path(), "openai");
        store.save(&sample()).await.unwrap();

        assert_eq!(store.load().await, sample());
    }

    #[tokio::test]
    async fn save_of_load_is_a_no_op() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path(), "openai");
        store.save(&sample()).await.unwrap();
        let first = tokio::fs::read(store.path()).await.unwrap();

        let loaded = store.load().await;
        store.save(&loaded).await.unwrap();
        let second = tokio::fs::read(store.path()).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn missing_file_is_empty_state() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(&dir.path().join("not-yet"), "google");
        assert_eq!(store.load().await, ProviderState::default());
    }

    #[tokio::test]
    async fn malformed_file_is_empty_state() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path(), "google");
        tokio::fs::write(store.path(), "{not json").await.unwrap();
        assert_eq!(store.load().await, ProviderState::default());
        tokio::fs::write(store.path(), "[1,2,3]").await.unwrap();
        assert_eq!(store.load().await, ProviderState::default());
    }

    #[tokio::test]
    async fn legacy_bare_map_is_accepted() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path(), "anthropic");
        tokio::fs::write(store.path(), r#"{"sk-a":"Tier_2","sk-b":"dead"}"#)
            .await
            .unwrap();
        let loaded = store.load().await;
        assert_eq!(loaded.keys.len(), 2);
        assert_eq!(loaded.keys["sk-a"], "Tier_2");
        assert!(loaded.capabilities.is_empty());
        assert!(loaded.quota_exhausted.is_empty());
    }

    #[tokio::test]
    async fn legacy_key_named_keys_is_not_mistaken_for_wrapper() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path(), "anthropic");
        tokio::fs::write(store.path(), r#"{"keys":"Tier_1"}"#).await.unwrap();
        assert_eq!(store.load().await.keys["keys"], "Tier_1");
    }

    #[tokio::test]
    async fn save_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("storage");
        let store = JsonFileStore::new(&nested, "aws");
        store.save(&sample()).await.unwrap();
        assert!(nested.join("aws.json").exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn saved_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path(), "openai");
        store.save(&sample()).await.unwrap();
        let mode = std::fs::metadata(store.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[tokio::test]
    async fn document_shape_is_wrapped() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path(), "openai");
        store.save(&sample()).await.unwrap();
        let raw: serde_json::Value =
            serde_json::from_str(&tokio::fs::read_to_string(store.path()).await.unwrap()).unwrap();
        assert_eq!(raw["keys"]["k1"], "Tier_1");
        assert_eq!(raw["capabilities"], serde_json::json!(["k1"]));
        assert_eq!(raw["quota_exhausted"], serde_json::json!(["k3"]));
        assert_eq!(raw.as_object().unwrap().len(), 3);
    }
}
