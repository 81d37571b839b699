use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};

use crate::token::TokenManager;
use crate::CLIENT_NAME;

const CONFIG_NAME: &str = "config.toml";
const ENV_PREFIX: &str = "BURNRATE";

pub(crate) const DEFAULT_API_BASE_URL: &str =
    "https://webapi.developers.erstegroup.com/api/csas/public/sandbox/v3/accounts";
pub(crate) const DEFAULT_IDP_BASE_URL: &str =
    "https://webapi.developers.erstegroup.com/api/csas/sandbox/v1/sandbox-idp";
pub(crate) const DEFAULT_PAYDAY: u32 = 1;
const DEFAULT_UPDATE_INTERVAL_SECS: u64 = 600;
const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub(crate) struct Conf {
    pub(crate) api_key: String,
    pub(crate) client_id: String,
    pub(crate) client_secret: String,
    #[serde(default)]
    pub(crate) refresh_token: String,
    pub(crate) api_base_url: String,
    pub(crate) idp_base_url: String,
    pub(crate) payday: u32,
    #[serde(default)]
    pub(crate) scopes: Vec<String>,
    pub(crate) update_interval_secs: u64,
    pub(crate) timeout_secs: u64,
}

impl Conf {
    pub(crate) fn new(api_key: String, client_id: String, client_secret: String, payday: u32) -> Self {
        Self {
            api_key,
            client_id,
            client_secret,
            refresh_token: String::new(),
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            idp_base_url: DEFAULT_IDP_BASE_URL.to_string(),
            payday,
            scopes: vec![],
            update_interval_secs: DEFAULT_UPDATE_INTERVAL_SECS,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    fn validate(&self) -> Result<()> {
        if !(1..=31).contains(&self.payday) {
            return Err(anyhow!("payday must be a day of month between 1 and 31, got {}", self.payday));
        }

        if self.update_interval_secs == 0 {
            return Err(anyhow!("update_interval_secs must be greater than zero"));
        }

        Ok(())
    }
}

#[derive(Debug, Clone)]
pub(crate) struct ConfigFile {
    path: PathBuf,
    conf: Conf,
}

impl ConfigFile {
    pub(crate) fn default_config_path() -> Result<PathBuf> {
        Ok(dirs::config_dir()
            .unwrap_or(std::env::current_dir()?)
            .join(CLIENT_NAME)
            .join(CONFIG_NAME))
    }

    /// Reads the config file, layered over defaults and under `BURNRATE_*`
    /// environment overrides.
    pub(crate) fn read(path: Option<&str>) -> Result<Self> {
        let p = match path {
            Some(p) => p.into(),
            None => ConfigFile::default_config_path()?,
        };

        if !p.exists() {
            return Err(anyhow!(
                "no configuration file found at {}, run `{} init` first",
                p.display(),
                CLIENT_NAME
            ));
        }

        let conf: Conf = Config::builder()
            .set_default("api_base_url", DEFAULT_API_BASE_URL)?
            .set_default("idp_base_url", DEFAULT_IDP_BASE_URL)?
            .set_default("payday", i64::from(DEFAULT_PAYDAY))?
            .set_default("update_interval_secs", DEFAULT_UPDATE_INTERVAL_SECS as i64)?
            .set_default("timeout_secs", DEFAULT_TIMEOUT_SECS as i64)?
            .add_source(File::from(p.as_path()).format(FileFormat::Toml))
            .add_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()?
            .try_deserialize()
            .with_context(|| format!("failed to read configuration {}", p.display()))?;
        conf.validate()?;

        Ok(ConfigFile { path: p, conf })
    }

    /// Writes a brand new config file, creating its directory if needed.
    pub(crate) fn create(path: PathBuf, conf: Conf) -> Result<Self> {
        conf.validate()?;

        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        fs::write(&path, toml::to_string_pretty(&conf)?)?;

        Ok(ConfigFile { path, conf })
    }

    /// Rewrites only the `refresh_token` key, leaving the rest of the file as is.
    pub(crate) fn update_refresh_token(&mut self, token: &str) -> Result<()> {
        let content = fs::read_to_string(&self.path)?;
        let mut table: toml::Table = content
            .parse()
            .with_context(|| format!("failed to parse {}", self.path.display()))?;
        table.insert(
            "refresh_token".to_string(),
            toml::Value::String(token.to_string()),
        );

        fs::write(&self.path, toml::to_string_pretty(&table)?)?;
        self.conf.refresh_token = token.to_string();

        Ok(())
    }

    /// Persists a refresh token the token manager was issued, if any. The
    /// token stays pending in `tokens` until the write succeeds. Returns
    /// whether anything was written.
    pub(crate) fn persist_rotation(&mut self, tokens: &mut TokenManager) -> Result<bool> {
        let token = match tokens.rotated_refresh_token() {
            Some(token) => token.to_string(),
            None => return Ok(false),
        };

        self.update_refresh_token(&token)
            .with_context(|| format!("failed to save new refresh token to {}", self.path.display()))?;
        tokens.take_rotated_refresh_token();

        Ok(true)
    }

    pub(crate) fn config(&self) -> &Conf {
        &self.conf
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }
}
