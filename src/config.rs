//! Configuration management for parlance

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::conversation::DEFAULT_HISTORY_CAP;
use crate::{Error, Result};

/// Fixed persona/length instruction sent as the system turn
pub const SYSTEM_PROMPT: &str = "You are a helpful voice assistant. \
    Answer in two or three short sentences suitable for reading aloud. \
    Avoid lists, markdown, and code unless explicitly asked.";

/// Delay before restarting the recognizer after it ends on its own
pub const RESTART_DELAY: Duration = Duration::from_millis(250);

/// File name of the locally stored credential
const KEY_FILE: &str = "api_key";

/// Session configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Completion endpoint URL
    pub endpoint: String,

    /// Model identifier for chat completions
    pub model: String,

    /// Bearer credential passed through to the endpoint
    pub api_key: Option<String>,

    /// Quiet period before a final chunk commits
    pub silence_window: Duration,

    /// Ceiling on a stalled reply stream before the busy flag is cleared
    pub watchdog: Duration,

    /// Cap on retained conversation turns
    pub history_cap: usize,

    /// Answer automatically when a committed utterance is a question
    pub auto_answer: bool,

    /// Restart the recognizer whenever it ends on its own
    pub continuous: bool,
}

impl Config {
    /// Load configuration from the environment
    ///
    /// The credential falls back to the locally stored key when
    /// `PARLANCE_API_KEY` is unset.
    ///
    /// # Errors
    ///
    /// Returns error if the endpoint is missing
    pub fn load() -> Result<Self> {
        Self::load_with_overrides(None, None)
    }

    /// Load configuration with CLI overrides taking precedence
    ///
    /// # Errors
    ///
    /// Returns error if no endpoint is given by override or environment
    pub fn load_with_overrides(
        endpoint: Option<String>,
        model: Option<String>,
    ) -> Result<Self> {
        let endpoint = endpoint
            .or_else(|| std::env::var("PARLANCE_ENDPOINT").ok())
            .ok_or_else(|| Error::Config("PARLANCE_ENDPOINT required".to_string()))?;

        let model = model
            .or_else(|| std::env::var("PARLANCE_MODEL").ok())
            .unwrap_or_else(|| "gpt-4o-mini".to_string());

        let api_key = std::env::var("PARLANCE_API_KEY")
            .ok()
            .or_else(|| KeyStore::default_location().load());

        let silence_window = std::env::var("PARLANCE_SILENCE_MS")
            .ok()
            .and_then(|s| s.parse().ok())
            .map_or(crate::aggregator::DEFAULT_SILENCE_WINDOW, Duration::from_millis);

        let watchdog = std::env::var("PARLANCE_WATCHDOG_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .map_or(Duration::from_secs(30), Duration::from_secs);

        let history_cap = std::env::var("PARLANCE_HISTORY_CAP")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_HISTORY_CAP);

        let auto_answer = std::env::var("PARLANCE_AUTO_ANSWER")
            .map_or(true, |v| v == "1" || v.eq_ignore_ascii_case("true"));

        Ok(Self {
            endpoint,
            model,
            api_key,
            silence_window,
            watchdog,
            history_cap,
            auto_answer,
            continuous: true,
        })
    }
}

/// Locally stored credential, a plain string key in one file
pub struct KeyStore {
    path: PathBuf,
}

impl KeyStore {
    /// Key store at an explicit path
    #[must_use]
    pub const fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Key store under the XDG data directory
    #[must_use]
    pub fn default_location() -> Self {
        let dir = directories::ProjectDirs::from("dev", "parlance", "parlance")
            .map_or_else(|| PathBuf::from(".parlance"), |d| d.data_dir().to_path_buf());
        Self::new(dir.join(KEY_FILE))
    }

    /// Where the key lives on disk
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the stored key, if any
    #[must_use]
    pub fn load(&self) -> Option<String> {
        match std::fs::read_to_string(&self.path) {
            Ok(key) => {
                let key = key.trim().to_string();
                if key.is_empty() { None } else { Some(key) }
            }
            Err(_) => None,
        }
    }

    /// Persist the key, creating parent directories as needed
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be written
    pub fn save(&self, key: &str) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, key.trim())?;
        tracing::info!(path = %self.path.display(), "credential saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_store_roundtrip() {
        let dir = std::env::temp_dir().join(format!("parlance-test-{}", std::process::id()));
        let store = KeyStore::new(dir.join("api_key"));

        assert!(store.load().is_none());
        store.save("  sk-test-123  ").unwrap();
        assert_eq!(store.load().as_deref(), Some("sk-test-123"));

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_empty_key_treated_as_absent() {
        let dir = std::env::temp_dir().join(format!("parlance-empty-{}", std::process::id()));
        let store = KeyStore::new(dir.join("api_key"));
        store.save("").unwrap();
        assert!(store.load().is_none());
        std::fs::remove_dir_all(&dir).ok();
    }
}
