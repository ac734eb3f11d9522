//! Saving and restoring the caster's settings across runs.
//!
//! The snapshot lives under [`SESSION_KEY`] as
//! `{"settings":{..},"connectedHeadsets":[..],"timestamp":ms}`.

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::{ClientError, ClientResult};

pub const SESSION_KEY: &str = "vrSession";

/// Key/value storage for persisted state.
pub trait SessionStore: Send + Sync {
    fn get(&self, key: &str) -> ClientResult<Option<String>>;

    fn set(&self, key: &str, value: &str) -> ClientResult<()>;
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemoryStore {
    fn get(&self, key: &str) -> ClientResult<Option<String>> {
        let entries = self
            .entries
            .lock()
            .map_err(|_| ClientError::Storage("memory store poisoned".into()))?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> ClientResult<()> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| ClientError::Storage("memory store poisoned".into()))?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// One `<key>.json` file per key under a directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn path_for(&self, key: &str) -> ClientResult<PathBuf> {
        if key.is_empty() || key.contains(['/', '\\']) || key.starts_with('.') {
            return Err(ClientError::Storage(format!("invalid store key {key:?}")));
        }
        Ok(self.dir.join(format!("{key}.json")))
    }
}

impl SessionStore for FileStore {
    fn get(&self, key: &str) -> ClientResult<Option<String>> {
        match std::fs::read_to_string(self.path_for(key)?) {
            Ok(text) => Ok(Some(text)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> ClientResult<()> {
        let path = self.path_for(key)?;
        std::fs::create_dir_all(&self.dir)?;
        std::fs::write(&path, value)?;
        debug!("wrote {}", path.display());
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSettings {
    pub quality: String,
    pub resolution: String,
    pub auto_quality: bool,
    pub low_latency: bool,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            quality: "balanced".to_string(),
            resolution: "1920x1080".to_string(),
            auto_quality: true,
            low_latency: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedSession {
    #[serde(default)]
    pub settings: Option<SessionSettings>,
    #[serde(default)]
    pub connected_headsets: Vec<String>,
    /// Milliseconds since the Unix epoch.
    #[serde(default)]
    pub timestamp: i64,
}

impl PersistedSession {
    pub fn saved_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.timestamp)
    }
}

/// The settings controls the snapshot is taken from and restored into.
pub trait SettingsControls: Send + Sync {
    fn settings(&self) -> SessionSettings;

    fn apply(&self, settings: &SessionSettings);
}

/// Plain in-memory settings form.
#[derive(Debug, Default)]
pub struct SettingsForm {
    current: Mutex<SessionSettings>,
}

impl SettingsForm {
    pub fn new(settings: SessionSettings) -> Self {
        Self {
            current: Mutex::new(settings),
        }
    }
}

impl SettingsControls for SettingsForm {
    fn settings(&self) -> SessionSettings {
        match self.current.lock() {
            Ok(current) => current.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn apply(&self, settings: &SessionSettings) {
        let mut current = match self.current.lock() {
            Ok(current) => current,
            Err(poisoned) => poisoned.into_inner(),
        };
        *current = settings.clone();
    }
}

/// Snapshot the current settings and connected headsets.
///
/// Failures are logged; the returned value is what was (or would have been) written.
pub fn save(
    store: &dyn SessionStore,
    controls: &dyn SettingsControls,
    connected_headsets: Vec<String>,
) -> PersistedSession {
    let session = PersistedSession {
        settings: Some(controls.settings()),
        connected_headsets,
        timestamp: Utc::now().timestamp_millis(),
    };

    let written = serde_json::to_string(&session)
        .map_err(ClientError::from)
        .and_then(|text| store.set(SESSION_KEY, &text));
    match written {
        Ok(()) => info!(
            headsets = session.connected_headsets.len(),
            "VR session saved"
        ),
        Err(err) => warn!("failed to save VR session: {}", err),
    }
    session
}

/// Apply a previously saved snapshot to the settings controls.
///
/// Missing, unreadable or malformed snapshots leave the controls untouched.
pub fn restore(
    store: &dyn SessionStore,
    controls: &dyn SettingsControls,
) -> Option<PersistedSession> {
    let text = match store.get(SESSION_KEY) {
        Ok(Some(text)) => text,
        Ok(None) => return None,
        Err(err) => {
            warn!("failed to read saved VR session: {}", err);
            return None;
        }
    };

    let session: PersistedSession = match serde_json::from_str(&text) {
        Ok(session) => session,
        Err(err) => {
            warn!("ignoring malformed saved VR session: {}", err);
            return None;
        }
    };

    if let Some(settings) = &session.settings {
        controls.apply(settings);
    }
    info!(
        saved_at = ?session.saved_at(),
        headsets = ?session.connected_headsets,
        "VR session restored"
    );
    Some(session)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn custom_settings() -> SessionSettings {
        SessionSettings {
            quality: "ultra".into(),
            resolution: "3840x2160".into(),
            auto_quality: false,
            low_latency: true,
        }
    }

    #[test]
    fn test_saved_json_shape() {
        let store = MemoryStore::new();
        let form = SettingsForm::new(custom_settings());
        let saved = save(&store, &form, vec!["quest-a".into(), "quest-b".into()]);

        let text = store.get(SESSION_KEY).unwrap().unwrap();
        let value: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(
            value["settings"],
            json!({
                "quality": "ultra",
                "resolution": "3840x2160",
                "autoQuality": false,
                "lowLatency": true
            })
        );
        assert_eq!(value["connectedHeadsets"], json!(["quest-a", "quest-b"]));
        assert_eq!(value["timestamp"], json!(saved.timestamp));
        assert!(saved.saved_at().is_some());
    }

    #[test]
    fn test_restore_applies_settings() {
        let store = MemoryStore::new();
        save(&store, &SettingsForm::new(custom_settings()), Vec::new());

        let form = SettingsForm::default();
        let restored = restore(&store, &form).unwrap();
        assert_eq!(form.settings(), custom_settings());
        assert!(restored.connected_headsets.is_empty());
    }

    #[test]
    fn test_restore_missing_is_noop() {
        let form = SettingsForm::default();
        assert!(restore(&MemoryStore::new(), &form).is_none());
        assert_eq!(form.settings(), SessionSettings::default());
    }

    #[test]
    fn test_restore_malformed_leaves_controls() {
        let store = MemoryStore::new();
        store.set(SESSION_KEY, "{not json").unwrap();
        let form = SettingsForm::default();
        assert!(restore(&store, &form).is_none());
        assert_eq!(form.settings(), SessionSettings::default());

        store
            .set(SESSION_KEY, r#"{"settings":{"quality":"low"}}"#)
            .unwrap();
        assert!(restore(&store, &form).is_none());
        assert_eq!(form.settings(), SessionSettings::default());
    }

    #[test]
    fn test_restore_without_settings_keeps_controls() {
        let store = MemoryStore::new();
        store
            .set(SESSION_KEY, r#"{"connectedHeadsets":["quest-a"],"timestamp":5}"#)
            .unwrap();
        let form = SettingsForm::default();
        let restored = restore(&store, &form).unwrap();
        assert_eq!(restored.connected_headsets, vec!["quest-a"]);
        assert_eq!(form.settings(), SessionSettings::default());
    }

    #[test]
    fn test_file_store_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("nested"));
        assert_eq!(store.get(SESSION_KEY).unwrap(), None);

        save(&store, &SettingsForm::new(custom_settings()), vec!["quest-a".into()]);
        assert!(dir.path().join("nested").join("vrSession.json").exists());

        let form = SettingsForm::default();
        let restored = restore(&store, &form).unwrap();
        assert_eq!(restored.connected_headsets, vec!["quest-a"]);
        assert_eq!(form.settings(), custom_settings());
    }

    #[test]
    fn test_file_store_rejects_path_keys() {
        let store = FileStore::new("/tmp");
        assert!(store.path_for("../escape").is_err());
        assert!(store.path_for("").is_err());
        assert!(store.path_for(SESSION_KEY).is_ok());
    }
}
