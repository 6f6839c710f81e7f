use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::PathBuf,
    sync::{RwLock, RwLockReadGuard, RwLockWriteGuard},
    time::Duration,
};

use crate::error::{MonitorError, MonitorResult};

pub const DEFAULT_INTERVAL_MS: u64 = 5_000;
pub const DEFAULT_ALERT_THRESHOLD: u8 = 70;
pub const DEFAULT_BANNER_DURATION_MS: u64 = 5_000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MonitorConfig {
    pub interval_ms: u64,
    /// Intensities strictly above this percentage count as stressed.
    pub alert_threshold: Option<u8>,
    /// Minimum gap between two dispatched alerts. `None` disables the cooldown.
    pub alert_cooldown_ms: Option<u64>,
    pub banner_duration_ms: u64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            interval_ms: DEFAULT_INTERVAL_MS,
            alert_threshold: None,
            alert_cooldown_ms: None,
            banner_duration_ms: DEFAULT_BANNER_DURATION_MS,
        }
    }
}

impl MonitorConfig {
    pub fn with_interval_ms(mut self, interval_ms: u64) -> Self {
        self.interval_ms = interval_ms;
        self
    }

    pub fn with_alert_cooldown_ms(mut self, cooldown_ms: u64) -> Self {
        self.alert_cooldown_ms = Some(cooldown_ms);
        self
    }

    pub fn validate(&self) -> MonitorResult<()> {
        if self.interval_ms == 0 {
            return Err(MonitorError::InvalidConfig(
                "intervalMs must be greater than zero".into(),
            ));
        }
        if let Some(threshold) = self.alert_threshold {
            if threshold > 100 {
                return Err(MonitorError::InvalidConfig(format!(
                    "alertThreshold {threshold} is above 100"
                )));
            }
        }
        if self.banner_duration_ms == 0 {
            return Err(MonitorError::InvalidConfig(
                "bannerDurationMs must be greater than zero".into(),
            ));
        }
        Ok(())
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn threshold(&self) -> u8 {
        self.alert_threshold.unwrap_or(DEFAULT_ALERT_THRESHOLD)
    }

    pub fn banner_duration(&self) -> Duration {
        Duration::from_millis(self.banner_duration_ms)
    }

    pub fn alert_cooldown(&self) -> Option<Duration> {
        self.alert_cooldown_ms
            .filter(|ms| *ms > 0)
            .map(Duration::from_millis)
    }
}

/// JSON-backed store for the monitor configuration.
pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<MonitorConfig>,
}

impl SettingsStore {
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            match serde_json::from_str::<MonitorConfig>(&contents) {
                Ok(config) if config.validate().is_ok() => config,
                Ok(_) | Err(_) => {
                    log::warn!(
                        "Ignoring invalid settings at {}; using defaults",
                        path.display()
                    );
                    MonitorConfig::default()
                }
            }
        } else {
            MonitorConfig::default()
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn config(&self) -> MonitorConfig {
        self.read().clone()
    }

    pub fn update(&self, config: MonitorConfig) -> MonitorResult<()> {
        config.validate()?;
        let mut guard = self.write();
        self.persist(&config)?;
        *guard = config;
        Ok(())
    }

    /// Re-reads the file after an outside edit. An invalid file is
    /// rejected and the current configuration kept.
    pub fn reload(&self) -> Result<()> {
        let contents = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read settings from {}", self.path.display()))?;
        let data: MonitorConfig = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse settings at {}", self.path.display()))?;
        data.validate()?;
        *self.write() = data;
        Ok(())
    }

    fn persist(&self, data: &MonitorConfig) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))
    }

    fn read(&self) -> RwLockReadGuard<'_, MonitorConfig> {
        self.data.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, MonitorConfig> {
        self.data.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn defaults_follow_dashboard_behaviour() {
        let config = MonitorConfig::default();
        assert_eq!(config.interval(), Duration::from_secs(5));
        assert_eq!(config.threshold(), 70);
        assert_eq!(config.banner_duration(), Duration::from_secs(5));
        assert_eq!(config.alert_cooldown(), None);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn parses_camel_case_with_optional_fields() {
        let config: MonitorConfig =
            serde_json::from_str(r#"{"intervalMs": 10000, "alertThreshold": 50}"#).unwrap();
        assert_eq!(config.interval_ms, 10_000);
        assert_eq!(config.threshold(), 50);
        assert_eq!(config.banner_duration_ms, DEFAULT_BANNER_DURATION_MS);
    }

    #[test]
    fn zero_interval_is_rejected() {
        let config = MonitorConfig::default().with_interval_ms(0);
        assert!(matches!(config.validate(), Err(MonitorError::InvalidConfig(_))));
    }

    #[test]
    fn store_round_trips_through_disk() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.json");

        let store = SettingsStore::new(path.clone()).unwrap();
        assert_eq!(store.config(), MonitorConfig::default());

        let updated = MonitorConfig::default()
            .with_interval_ms(10_000)
            .with_alert_cooldown_ms(30_000);
        store.update(updated.clone()).unwrap();

        let reopened = SettingsStore::new(path).unwrap();
        assert_eq!(reopened.config(), updated);
    }

    #[test]
    fn invalid_update_leaves_store_untouched() {
        let dir = tempdir().unwrap();
        let store = SettingsStore::new(dir.path().join("settings.json")).unwrap();
        assert!(store.update(MonitorConfig::default().with_interval_ms(0)).is_err());
        assert_eq!(store.config(), MonitorConfig::default());
        assert!(!dir.path().join("settings.json").exists());
    }

    #[test]
    fn reload_picks_up_outside_edits() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let store = SettingsStore::new(path.clone()).unwrap();
        store.update(MonitorConfig::default()).unwrap();

        fs::write(&path, r#"{"intervalMs": 2000, "alertThreshold": 60}"#).unwrap();
        store.reload().unwrap();
        assert_eq!(store.config().interval_ms, 2_000);
        assert_eq!(store.config().threshold(), 60);

        fs::write(&path, r#"{"intervalMs": 0}"#).unwrap();
        assert!(store.reload().is_err());
        assert_eq!(store.config().interval_ms, 2_000);
    }

    #[test]
    fn corrupt_file_falls_back_to_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "not json").unwrap();
        let store = SettingsStore::new(path).unwrap();
        assert_eq!(store.config(), MonitorConfig::default());
    }
}
