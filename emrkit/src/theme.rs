// emrkit/src/theme.rs
//
// Application-level theme context: persisted preference + change notification

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::errors::EmrError;

pub const THEME_KEY: &str = "theme";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn toggled(self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }

    fn parse(value: &str) -> Option<Self> {
        match value {
            "light" => Some(Theme::Light),
            "dark" => Some(Theme::Dark),
            _ => None,
        }
    }
}

/// Flat string map persisted as JSON.
#[derive(Debug, Clone)]
pub struct PreferenceStore {
    path: PathBuf,
}

impl PreferenceStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<BTreeMap<String, String>, EmrError> {
        match fs::read_to_string(&self.path) {
            Ok(raw) => serde_json::from_str(&raw)
                .map_err(|e| EmrError::Preferences(format!("{}: {}", self.path.display(), e))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(EmrError::Preferences(format!("{}: {}", self.path.display(), e))),
        }
    }

    pub fn get(&self, key: &str) -> Result<Option<String>, EmrError> {
        Ok(self.read_all()?.remove(key))
    }

    pub fn set(&self, key: &str, value: &str) -> Result<(), EmrError> {
        let mut all = match self.read_all() {
            Ok(all) => all,
            Err(e) => {
                warn!("Overwriting unreadable preferences, other keys are lost: {}", e);
                BTreeMap::new()
            }
        };
        all.insert(key.to_string(), value.to_string());

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .map_err(|e| EmrError::Preferences(format!("{}: {}", parent.display(), e)))?;
            }
        }
        let raw = serde_json::to_string_pretty(&all)?;
        fs::write(&self.path, raw)
            .map_err(|e| EmrError::Preferences(format!("{}: {}", self.path.display(), e)))
    }
}

/// Owned by the application root and handed to whoever renders.
pub struct ThemeContext {
    store: PreferenceStore,
    sender: watch::Sender<Theme>,
}

impl ThemeContext {
    /// Read the persisted preference. A missing or unreadable file yields the default.
    pub fn init(store: PreferenceStore) -> Self {
        let theme = match store.get(THEME_KEY) {
            Ok(Some(value)) => Theme::parse(&value).unwrap_or_default(),
            Ok(None) => Theme::default(),
            Err(e) => {
                debug!("Ignoring unreadable preferences: {}", e);
                Theme::default()
            }
        };
        info!("Theme initialised: {}", theme.as_str());

        let (sender, _) = watch::channel(theme);
        Self { store, sender }
    }

    pub fn current(&self) -> Theme {
        *self.sender.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<Theme> {
        self.sender.subscribe()
    }

    /// Persist, then notify subscribers. Subscribers are notified even when
    /// persisting fails; the error is returned to the caller.
    pub fn set(&self, theme: Theme) -> Result<(), EmrError> {
        let persisted = self.store.set(THEME_KEY, theme.as_str());
        self.sender.send_replace(theme);
        persisted
    }

    pub fn toggle(&self) -> Result<Theme, EmrError> {
        let next = self.current().toggled();
        self.set(next)?;
        Ok(next)
    }
}
