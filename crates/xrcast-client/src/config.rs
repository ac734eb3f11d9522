use std::path::PathBuf;

use crate::persistence::FileStore;

pub const STORE_DIR_ENV: &str = "XRCAST_STORE_DIR";
pub const USER_AGENT_ENV: &str = "XRCAST_USER_AGENT";

const DEFAULT_USER_AGENT: &str = "xrcast";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CasterConfig {
    /// Directory holding persisted session files; in-memory storage when unset.
    pub store_dir: Option<PathBuf>,
    /// Used for device detection (passthrough availability).
    pub user_agent: String,
}

impl Default for CasterConfig {
    fn default() -> Self {
        Self {
            store_dir: None,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl CasterConfig {
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(dir) = non_empty_var(STORE_DIR_ENV) {
            config.store_dir = Some(PathBuf::from(dir));
        }
        if let Some(user_agent) = non_empty_var(USER_AGENT_ENV) {
            config.user_agent = user_agent;
        }
        config
    }

    pub fn file_store(&self) -> Option<FileStore> {
        self.store_dir.as_ref().map(FileStore::new)
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
