use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use diskspeed_auth::OAuthConfig;
use diskspeed_fetch::{ClientSettings, EngineOptions, ProviderConfig};
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};

const MIB: u64 = 1024 * 1024;

/// Everything the binary can be configured with.
///
/// Sources, lowest priority first: built-in defaults, the TOML file,
/// `DISKSPEED_*` environment variables (`__` separates nested keys).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Access token to use instead of the stored one.
    pub token: Option<String>,
    /// Where the signed-in token is kept.
    pub token_file: Option<PathBuf>,
    pub engine: EngineOptions,
    pub provider: ProviderConfig,
    pub oauth: OAuthConfig,
    pub client: ClientSettings,
    pub tests: TestPlan,
}

/// What `run` and the argument-less commands test against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TestPlan {
    pub ping_url: String,
    /// Sharing links one of which is picked at random for downloads.
    pub download_links: Vec<String>,
    /// Timeout of the reachability check on the picked link.
    pub availability_timeout_secs: u64,
    /// Size of the generated upload file.
    pub upload_size: u64,
    /// Size of the local file used when no link is reachable.
    pub local_sample_size: u64,
}

impl Default for TestPlan {
    fn default() -> Self {
        Self {
            ping_url: "https://yandex.ru".to_string(),
            download_links: vec![
                "https://disk.yandex.ru/d/vt-pDfQ1qOFpWQ".to_string(),
                "https://disk.yandex.ru/d/vAawlND_0pDyCg".to_string(),
            ],
            availability_timeout_secs: 10,
            upload_size: MIB,
            local_sample_size: 100 * MIB,
        }
    }
}

pub fn config_dir() -> Option<PathBuf> {
    home::home_dir().map(|h| h.join(".config").join("diskspeed"))
}

impl Settings {
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let mut figment = Figment::from(Serialized::defaults(Settings::default()));
        match explicit {
            Some(path) => {
                if !path.is_file() {
                    bail!("config file {} does not exist", path.display());
                }
                figment = figment.merge(Toml::file(path));
            }
            None => {
                if let Some(dir) = config_dir() {
                    figment = figment.merge(Toml::file(dir.join("config.toml")));
                }
            }
        }
        figment
            .merge(Env::prefixed("DISKSPEED_").split("__"))
            .extract()
            .context("Failed to read configuration")
    }

    pub fn token_path(&self) -> PathBuf {
        self.token_file
            .clone()
            .or_else(|| config_dir().map(|d| d.join("token.json")))
            .unwrap_or_else(|| std::env::temp_dir().join("diskspeed-token.json"))
    }
}
