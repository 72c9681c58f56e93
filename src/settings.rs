use std::{
    fs,
    path::PathBuf,
    sync::{PoisonError, RwLock},
    time::Duration,
};

use anyhow::{Context, Result};
use log::warn;
use serde::{Deserialize, Serialize};

const BACKEND_URL_ENV: &str = "REGIONCAP_BACKEND_URL";
const CAPTURE_INTERVAL_ENV: &str = "REGIONCAP_CAPTURE_INTERVAL_MS";

const MIN_CAPTURE_INTERVAL_MS: u64 = 10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CaptureSettings {
    pub backend_url: String,
    /// Sampler period. 500ms gives 2 frames per second.
    pub capture_interval_ms: u64,
    pub jpeg_quality: u8,
    pub request_timeout_ms: u64,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            backend_url: "http://localhost:5000".into(),
            capture_interval_ms: 500,
            jpeg_quality: 92,
            request_timeout_ms: 10_000,
        }
    }
}

impl CaptureSettings {
    pub fn capture_interval(&self) -> Duration {
        Duration::from_millis(self.capture_interval_ms.max(MIN_CAPTURE_INTERVAL_MS))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn jpeg_quality(&self) -> u8 {
        self.jpeg_quality.clamp(1, 100)
    }

    /// Applies `REGIONCAP_BACKEND_URL` and `REGIONCAP_CAPTURE_INTERVAL_MS`.
    pub fn with_env_overrides(self) -> Self {
        self.overridden_by(|key| std::env::var(key).ok())
    }

    fn overridden_by(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(url) = lookup(BACKEND_URL_ENV).filter(|url| !url.trim().is_empty()) {
            self.backend_url = url.trim().trim_end_matches('/').to_string();
        }

        if let Some(raw) = lookup(CAPTURE_INTERVAL_ENV) {
            match raw.trim().parse::<u64>() {
                Ok(interval) => self.capture_interval_ms = interval,
                Err(err) => warn!("Ignoring {CAPTURE_INTERVAL_ENV}={raw:?}: {err}"),
            }
        }

        self
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct UserSettings {
    #[serde(default)]
    capture: CaptureSettings,
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
                warn!("Settings at {} are invalid ({err}); using defaults", path.display());
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

    /// Stored capture settings with environment overrides applied.
    pub fn capture(&self) -> CaptureSettings {
        self.data
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .capture
            .clone()
            .with_env_overrides()
    }

    pub fn update_capture(&self, settings: CaptureSettings) -> Result<()> {
        let mut guard = self.data.write().unwrap_or_else(PoisonError::into_inner);
        guard.capture = settings;
        self.persist(&guard)
    }

    pub fn reload(&self) -> Result<()> {
        let contents = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read settings from {}", self.path.display()))?;
        let data: UserSettings = serde_json::from_str(&contents)?;
        *self.data.write().unwrap_or_else(PoisonError::into_inner) = data;
        Ok(())
    }

    fn persist(&self, data: &UserSettings) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("failed to create settings directory {}", parent.display())
            })?;
        }
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))
    }
}
