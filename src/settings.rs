use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf, sync::RwLock};

const DEFAULT_CACHE_TTL_SECS: i64 = 86_400;
const DEFAULT_LOOKBACK_DAYS: u32 = 30;

/// Externally managed keyword usage limits. These come from the plan the
/// site is on, not from the registry itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeywordQuota {
    pub taken: u32,
    pub available: u32,
}

impl Default for KeywordQuota {
    fn default() -> Self {
        Self {
            taken: 0,
            available: 0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct EngineSettings {
    keyword_quota: KeywordQuota,
    cache_ttl_secs: i64,
    lookback_days: u32,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            keyword_quota: KeywordQuota::default(),
            cache_ttl_secs: DEFAULT_CACHE_TTL_SECS,
            lookback_days: DEFAULT_LOOKBACK_DAYS,
        }
    }
}

pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<EngineSettings>,
}

impl SettingsStore {
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_default()
        } else {
            EngineSettings::default()
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn keyword_quota(&self) -> KeywordQuota {
        self.data.read().unwrap().keyword_quota.clone()
    }

    pub fn cache_ttl_secs(&self) -> i64 {
        self.data.read().unwrap().cache_ttl_secs
    }

    pub fn lookback_days(&self) -> u32 {
        self.data.read().unwrap().lookback_days
    }

    pub fn update_keyword_quota(&self, quota: KeywordQuota) -> Result<()> {
        let mut guard = self.data.write().unwrap();
        guard.keyword_quota = quota;
        self.persist(&guard)
    }

    fn persist(&self, data: &EngineSettings) -> Result<()> {
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let store = SettingsStore::new(dir.path().join("settings.json")).unwrap();
        assert_eq!(store.cache_ttl_secs(), DEFAULT_CACHE_TTL_SECS);
        assert_eq!(store.lookback_days(), DEFAULT_LOOKBACK_DAYS);
        assert_eq!(store.keyword_quota().taken, 0);
    }

    #[test]
    fn quota_update_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let store = SettingsStore::new(path.clone()).unwrap();
        store
            .update_keyword_quota(KeywordQuota {
                taken: 12,
                available: 100,
            })
            .unwrap();

        let reloaded = SettingsStore::new(path).unwrap();
        assert_eq!(reloaded.keyword_quota().taken, 12);
        assert_eq!(reloaded.keyword_quota().available, 100);
    }
}
