use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const APP_NAME: &str = "rcly-hooks";
const KEYCHAIN_SERVICE: &str = "rcly.hooks.credentials";

/// Keychain entry holding the provider API key.
pub const API_KEY_SECRET: &str = "api_key";
/// Environment variable that takes precedence over the keychain entry.
pub const API_KEY_ENV: &str = "RCLY_API_KEY";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub provider: ProviderConfig,
    #[serde(default)]
    pub retry: RetrySettings,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default = "default_provider_kind")]
    pub kind: String, // "mock" | "http"
    #[serde(default)]
    pub base_url: Option<String>,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            kind: default_provider_kind(),
            base_url: None,
        }
    }
}

fn default_provider_kind() -> String {
    "mock".to_string()
}

/// Outbound retry budget. Delays are in milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    pub max_attempts: u32,
    pub min_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            min_delay_ms: 100,
            max_delay_ms: 200,
        }
    }
}

impl AppConfig {
    pub fn validate(&self) -> Result<()> {
        match self.provider.kind.as_str() {
            "mock" => {}
            "http" => {
                let base_url = self.provider.base_url.as_deref().unwrap_or_default();
                if base_url.trim().is_empty() {
                    bail!("provider.base_url is required when provider.kind is \"http\"");
                }
            }
            other => bail!("unknown provider kind {other:?} (expected \"mock\" or \"http\")"),
        }
        if self.retry.max_attempts == 0 {
            bail!("retry.max_attempts must be at least 1");
        }
        if self.retry.min_delay_ms > self.retry.max_delay_ms {
            bail!(
                "retry.min_delay_ms ({}) exceeds retry.max_delay_ms ({})",
                self.retry.min_delay_ms,
                self.retry.max_delay_ms
            );
        }
        Ok(())
    }
}

/// Loads the config from its platform location, writing defaults on first use.
pub fn load() -> Result<AppConfig> {
    load_from(&config_path()?)
}

pub fn store(cfg: &AppConfig) -> Result<()> {
    store_to(&config_path()?, cfg)
}

pub fn config_path() -> Result<PathBuf> {
    confy::get_configuration_file_path(APP_NAME, None)
        .with_context(|| format!("Failed to resolve config path for {APP_NAME}"))
}

pub fn load_from(path: &Path) -> Result<AppConfig> {
    confy::load_path(path).with_context(|| format!("Failed to load rcly config from {}", path.display()))
}

pub fn store_to(path: &Path, cfg: &AppConfig) -> Result<()> {
    confy::store_path(path, cfg).with_context(|| format!("Failed to write rcly config to {}", path.display()))
}

fn secret_entry(key: &str) -> Result<keyring::Entry> {
    keyring::Entry::new(KEYCHAIN_SERVICE, key)
        .with_context(|| format!("Failed to open keychain entry {KEYCHAIN_SERVICE}/{key}"))
}

/// Maps the keychain's "no such entry" error to `None`.
fn absent_as_none<T>(result: keyring::Result<T>) -> keyring::Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(keyring::Error::NoEntry) => Ok(None),
        Err(e) => Err(e),
    }
}

pub fn store_secret(key: &str, value: &str) -> Result<()> {
    secret_entry(key)?
        .set_password(value)
        .with_context(|| format!("Failed to store {key} in the keychain"))
}

/// `Ok(None)` when the keychain has no entry for `key`.
pub fn get_secret(key: &str) -> Result<Option<String>> {
    absent_as_none(secret_entry(key)?.get_password())
        .with_context(|| format!("Failed to read {key} from the keychain"))
}

/// Removing a secret that is not stored is not an error.
pub fn delete_secret(key: &str) -> Result<()> {
    absent_as_none(secret_entry(key)?.delete_password())
        .map(drop)
        .with_context(|| format!("Failed to remove {key} from the keychain"))
}

/// API key from the environment, falling back to the keychain.
pub fn api_key() -> Option<String> {
    std::env::var(API_KEY_ENV)
        .ok()
        .filter(|key| !key.is_empty())
        .or_else(|| get_secret(API_KEY_SECRET).ok().flatten())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn defaults_use_the_mock_provider() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.provider.kind, "mock");
        assert_eq!(cfg.retry.max_attempts, 5);
        assert_eq!((cfg.retry.min_delay_ms, cfg.retry.max_delay_ms), (100, 200));
        cfg.validate().unwrap();
    }

    #[test]
    fn partial_documents_fill_in_defaults() {
        let cfg: AppConfig =
            serde_json::from_str(r#"{"provider":{"kind":"http","base_url":"https://api.example.com"},"retry":{"max_attempts":3}}"#)
                .unwrap();
        assert_eq!(cfg.provider.base_url.as_deref(), Some("https://api.example.com"));
        assert_eq!(cfg.retry.max_attempts, 3);
        assert_eq!(cfg.retry.min_delay_ms, 100);
        cfg.validate().unwrap();

        let empty: AppConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(empty, AppConfig::default());
    }

    #[test]
    fn http_provider_needs_a_base_url() {
        let mut cfg = AppConfig::default();
        cfg.provider.kind = "http".into();
        assert!(cfg.validate().is_err());
        cfg.provider.base_url = Some("https://api.example.com".into());
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn rejects_bad_retry_settings() {
        let mut cfg = AppConfig::default();
        cfg.retry.max_attempts = 0;
        assert!(cfg.validate().is_err());

        let mut cfg = AppConfig::default();
        cfg.retry.min_delay_ms = 500;
        let err = cfg.validate().unwrap_err().to_string();
        assert!(err.contains("min_delay_ms"), "{err}");
    }

    #[test]
    fn unknown_provider_kind() {
        let mut cfg = AppConfig::default();
        cfg.provider.kind = "carrier-pigeon".into();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn stored_config_loads_back() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("rcly.toml");
        let mut cfg = AppConfig::default();
        cfg.provider.kind = "http".into();
        cfg.provider.base_url = Some("https://api.example.com".into());
        cfg.retry.max_attempts = 3;

        store_to(&path, &cfg).unwrap();
        assert_eq!(load_from(&path).unwrap(), cfg);
    }

    #[test]
    fn missing_file_loads_defaults() {
        let dir = tempdir().unwrap();
        let cfg = load_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(cfg, AppConfig::default());
    }

    #[test]
    fn unreadable_config_names_its_path() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("rcly.toml");
        std::fs::write(&path, "retry = \"often\"").unwrap();
        let err = format!("{:#}", load_from(&path).unwrap_err());
        assert!(err.contains("rcly.toml"), "{err}");
    }

    #[test]
    fn absent_keychain_entry_is_none() {
        assert_eq!(absent_as_none::<String>(Err(keyring::Error::NoEntry)).unwrap(), None);
        assert_eq!(absent_as_none(Ok("k".to_string())).unwrap(), Some("k".to_string()));
        let denied = absent_as_none::<()>(Err(keyring::Error::NoStorageAccess("locked".into())));
        assert!(denied.is_err());
    }
}
