use std::collections::HashMap;
use std::ops::Deref;
use std::path::PathBuf;
use std::sync::Mutex;
use std::{env, fs};

use anyhow::{Context, Result};
use config::{Config as HierarchicalConfig, Environment};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Name of tankobon managed directories (config, data)
const TANKOBON_DIR_NAME: &str = "tankobon";
const TANKOBON_CONFIG_DIR_VAR: &str = "TANKOBON_CONFIG_DIR";
pub const TANKOBON_CONFIG_FILE: &str = "tankobon.toml";

/// Catalog instance used when no `api_url` is configured.
const DEFAULT_API_URL: &str = "http://localhost:8000/api";
/// Cover image host used when no `cover_base_url` is configured.
const DEFAULT_COVER_BASE_URL: &str = "https://mangadex.org/covers";

#[derive(Clone, Debug, Deserialize, Default, Serialize)]
pub struct Config {
    /// tankobon configuration options
    #[serde(default, flatten)]
    pub tankobon: TankobonConfig,
}

/// Configuration read from the config file and `TANKOBON_*` environment
/// variables.
#[derive(Clone, Debug, Deserialize, Serialize, Default)]
pub struct TankobonConfig {
    /// Directory where tankobon stores persistent data, most notably the
    /// session file (default: `$XDG_DATA_HOME/tankobon`)
    pub data_dir: PathBuf,
    /// Directory where tankobon loads its configuration file (default:
    /// `$XDG_CONFIG_HOME/tankobon`)
    pub config_dir: PathBuf,

    /// Base URL of the catalog API
    pub api_url: String,
    /// Base URL of the cover image host
    pub cover_base_url: String,

    /// Default page size for `tankobon browse`; must be one of the
    /// allowed sizes or it is ignored
    pub items_per_page: Option<u32>,

    /// Bearer token override
    ///
    /// Normally the token lives in the session file written by
    /// `tankobon auth login`; setting `TANKOBON_TOKEN` overrides it for
    /// one-off use.
    pub token: Option<String>,
}

impl Config {
    /// Creates a raw [Config] object and caches it for the lifetime of
    /// the program
    fn raw_config(mut reload: bool) -> Result<HierarchicalConfig> {
        static INSTANCE: OnceCell<Mutex<HierarchicalConfig>> = OnceCell::new();

        debug!(
            initialized = INSTANCE.get().is_some(),
            reload, "reading raw config"
        );

        fn read_raw_config() -> Result<HierarchicalConfig> {
            let data_dir = dirs::data_dir()
                .context("Could not determine the data directory")?
                .join(TANKOBON_DIR_NAME);

            let config_dir = match env::var(TANKOBON_CONFIG_DIR_VAR) {
                Ok(dir) => {
                    debug!("`${TANKOBON_CONFIG_DIR_VAR}` set: {dir}");
                    PathBuf::from(dir)
                },
                Err(_) => {
                    let config_dir = dirs::config_dir()
                        .context("Could not determine the config directory")?
                        .join(TANKOBON_DIR_NAME);
                    debug!("`${TANKOBON_CONFIG_DIR_VAR}` not set, using {config_dir:?}");
                    config_dir
                },
            };
            fs::create_dir_all(&config_dir)
                .with_context(|| format!("Could not create config directory: {config_dir:?}"))?;

            let mut builder = HierarchicalConfig::builder()
                .set_default("api_url", DEFAULT_API_URL)?
                .set_default("cover_base_url", DEFAULT_COVER_BASE_URL)?
                .set_default("data_dir", data_dir.to_string_lossy().as_ref())?
                // Config dir is added to the config for completeness;
                // the config file cannot change the config dir.
                .set_override("config_dir", config_dir.to_string_lossy().as_ref())?;

            // read from /etc
            builder = builder.add_source(
                config::File::from(PathBuf::from("/etc").join(TANKOBON_CONFIG_FILE))
                    .format(config::FileFormat::Toml)
                    .required(false),
            );

            // then from the user's config dir
            builder = builder.add_source(
                config::File::from(config_dir.join(TANKOBON_CONFIG_FILE))
                    .format(config::FileFormat::Toml)
                    .required(false),
            );

            // override via TANKOBON_* environment variables
            let tankobon_envs = env::vars()
                .filter_map(|(key, value)| {
                    key.strip_prefix("TANKOBON_").map(|key| (key.to_owned(), value))
                })
                .collect::<HashMap<_, _>>();

            let builder = builder.add_source(
                Environment::default()
                    .source(Some(tankobon_envs))
                    .try_parsing(true),
            );

            let final_config = builder.build()?;
            Ok(final_config)
        }

        let instance = INSTANCE.get_or_try_init(|| {
            // If we are initializing the config for the first time,
            // we don't need to reload right after
            reload = false;
            let config = read_raw_config()?;

            Ok::<_, anyhow::Error>(Mutex::new(config))
        })?;

        let mut config_guard = instance.lock().expect("config mutex poisoned");
        if reload {
            *config_guard = read_raw_config()?;
        }

        Ok(config_guard.deref().clone())
    }

    /// Creates a [Config] from the environment and config file
    ///
    /// When running in tests, the config is reloaded on every call.
    pub fn parse() -> Result<Config> {
        #[cfg(test)]
        let reload = true;

        #[cfg(not(test))]
        let reload = false;

        let final_config = Self::raw_config(reload)?;
        let config: TankobonConfig = final_config
            .try_deserialize()
            .context("Could not parse config")?;
        Ok(Config { tankobon: config })
    }

    /// Path of the persisted session file.
    pub fn session_file(&self) -> PathBuf {
        self.tankobon.data_dir.join("session.json")
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn defaults_apply_without_a_config_file() {
        let config = temp_env::with_vars_unset(["TANKOBON_API_URL", "TANKOBON_TOKEN"], || {
            Config::parse().unwrap()
        });
        assert_eq!(config.tankobon.api_url, DEFAULT_API_URL);
        assert_eq!(config.tankobon.cover_base_url, DEFAULT_COVER_BASE_URL);
        assert_eq!(config.tankobon.token, None);
        assert!(config.session_file().ends_with("tankobon/session.json"));
    }

    #[test]
    fn environment_overrides_defaults() {
        let config = temp_env::with_vars(
            [
                ("TANKOBON_API_URL", Some("https://manga.example.com/api")),
                ("TANKOBON_ITEMS_PER_PAGE", Some("48")),
            ],
            || Config::parse().unwrap(),
        );
        assert_eq!(config.tankobon.api_url, "https://manga.example.com/api");
        assert_eq!(config.tankobon.items_per_page, Some(48));
    }
}
