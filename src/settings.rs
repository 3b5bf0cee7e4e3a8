use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::PathBuf,
    sync::{RwLock, RwLockReadGuard, RwLockWriteGuard},
    time::Duration,
};

use crate::aggregator::StartRequest;
use crate::models::SensorKind;
use crate::pipeline::PipelineConfig;

pub const SETTINGS_PATH_ENV: &str = "WATCHSENSE_SETTINGS";
pub const DEFAULT_SETTINGS_FILE: &str = "watchsense.json";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct TrackingSettings {
    pub duration_secs: f64,
    pub sampling_interval_secs: f64,
    pub kind: SensorKind,
    pub pipeline: PipelineConfig,
}

impl Default for TrackingSettings {
    fn default() -> Self {
        Self {
            duration_secs: 60.0,
            sampling_interval_secs: 1.0 / 32.0,
            kind: SensorKind::DeviceMotion,
            pipeline: PipelineConfig::default(),
        }
    }
}

impl TrackingSettings {
    pub fn to_request(&self) -> Result<StartRequest> {
        let duration = Duration::try_from_secs_f64(self.duration_secs)
            .with_context(|| format!("invalid duration {}s", self.duration_secs))?;
        let interval = Duration::try_from_secs_f64(self.sampling_interval_secs)
            .with_context(|| format!("invalid sampling interval {}s", self.sampling_interval_secs))?;

        Ok(StartRequest::new(self.kind, duration, interval).with_pipeline(self.pipeline.clone()))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
struct UserSettings {
    tracking: TrackingSettings,
}

pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<UserSettings>,
}

impl SettingsStore {
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_else(|err| {
                log::warn!("ignoring malformed settings in {}: {err}", path.display());
                UserSettings::default()
            })
        } else {
            UserSettings::default()
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    /// Opens the file named by `WATCHSENSE_SETTINGS`, or `watchsense.json`
    /// in the working directory.
    pub fn from_env() -> Result<Self> {
        let path = std::env::var_os(SETTINGS_PATH_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_SETTINGS_FILE));
        Self::new(path)
    }

    pub fn tracking(&self) -> TrackingSettings {
        self.read().tracking.clone()
    }

    pub fn update_tracking(&self, settings: TrackingSettings) -> Result<()> {
        let mut guard = self.write();
        guard.tracking = settings;
        self.persist(&guard)
    }

    pub fn reload(&self) -> Result<()> {
        let contents = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read settings from {}", self.path.display()))?;
        let data: UserSettings = serde_json::from_str(&contents)
            .with_context(|| format!("Malformed settings in {}", self.path.display()))?;
        *self.write() = data;
        Ok(())
    }

    fn persist(&self, data: &UserSettings) -> Result<()> {
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))
    }

    fn read(&self) -> RwLockReadGuard<'_, UserSettings> {
        self.data.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, UserSettings> {
        self.data.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
