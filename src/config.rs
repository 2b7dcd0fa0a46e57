use crate::error::AppError;
use figment::{
    Figment,
    providers::{Env, Format, Yaml},
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

pub const DEFAULT_CONFIG_FILES: [&str; 2] = ["config/db_config.yaml", "config/app_config.yaml"];
pub const CONFIG_FILES_ENV: &str = "ANIMAL_LOGGER_CONFIG";

/// Application configuration, merged from YAML files and the environment.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    pub database: String,

    /// Fallback login, used when none is typed in.
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default, skip_serializing)]
    pub password: Option<String>,

    #[serde(default)]
    pub animal_classes: Vec<String>,
    #[serde(default = "default_assets_dir")]
    pub assets_dir: PathBuf,

    #[serde(default = "default_loglevel")]
    pub loglevel: String,
    #[serde(default)]
    pub logs_path: Option<PathBuf>,

    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

fn default_port() -> u16 {
    5432
}

fn default_assets_dir() -> PathBuf {
    PathBuf::from("assets/img")
}

fn default_loglevel() -> String {
    "info".to_string()
}

fn default_batch_size() -> usize {
    10_000
}

fn default_connect_timeout_secs() -> u64 {
    5
}

/// Username and password typed into the login page.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Config view for one login: the credentials in use and the URL built from them.
#[derive(Debug, Clone)]
pub struct ConnectionInfo {
    pub config: Config,
    pub credentials: Credentials,
    pub db_url: Url,
}

impl Config {
    pub fn figment<P: AsRef<Path>>(files: &[P]) -> Figment {
        let mut figment = Figment::new();
        for file in files {
            figment = figment.merge(Yaml::file(file.as_ref()));
        }
        figment
            .merge(
                Env::prefixed("ANIMAL_LOGGER_")
                    .ignore(&["CONFIG"])
                    .map(|key| match key.as_str() {
                        k if k.eq_ignore_ascii_case("username") => "user".into(),
                        k => k.into(),
                    }),
            )
            .merge(Env::raw().only(&["USERNAME"]).map(|_| "user".into()))
            .merge(Env::raw().only(&["PASSWORD"]).map(|_| "password".into()))
            .merge(Env::raw().only(&["LOGS_PATH"]).map(|_| "logs_path".into()))
    }

    /// Load the given YAML files in order; later files override earlier ones.
    pub fn load<P: AsRef<Path>>(files: &[P]) -> Result<Self, AppError> {
        if files.is_empty() {
            return Err(AppError::ConfigNotLoaded);
        }
        for file in files {
            if !file.as_ref().is_file() {
                return Err(AppError::Io(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("config file not found: {}", file.as_ref().display()),
                )));
            }
        }
        let config: Config = Self::figment(files).extract()?;
        Ok(config)
    }

    /// Config files named by `ANIMAL_LOGGER_CONFIG`, else the defaults that exist.
    pub fn default_files() -> Vec<PathBuf> {
        if let Ok(list) = std::env::var(CONFIG_FILES_ENV) {
            return list
                .split(':')
                .filter(|s| !s.trim().is_empty())
                .map(PathBuf::from)
                .collect();
        }
        DEFAULT_CONFIG_FILES
            .iter()
            .map(PathBuf::from)
            .filter(|p| p.is_file())
            .collect()
    }

    /// Credentials from the config itself, if both halves are present.
    pub fn default_credentials(&self) -> Option<Credentials> {
        match (&self.user, &self.password) {
            (Some(u), Some(p)) => Some(Credentials::new(u.clone(), p.clone())),
            _ => None,
        }
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs.max(1))
    }

    /// Connection URL for `creds`; rebuilt on every call.
    pub fn db_url(&self, creds: &Credentials) -> Result<Url, AppError> {
        let mut url = Url::parse(&format!("postgres://{}:{}", self.host, self.port))?;
        url.set_path(&format!("/{}", self.database));
        url.set_username(&creds.username)
            .map_err(|_| AppError::InvalidIdentifier(creds.username.clone()))?;
        url.set_password(Some(&creds.password))
            .map_err(|_| AppError::InvalidIdentifier("password".to_string()))?;
        Ok(url)
    }

    pub fn connection_info(&self, creds: &Credentials) -> Result<ConnectionInfo, AppError> {
        let mut config = self.clone();
        config.user = Some(creds.username.clone());
        config.password = Some(creds.password.clone());
        let db_url = self.db_url(creds)?;
        Ok(ConnectionInfo {
            config,
            credentials: creds.clone(),
            db_url,
        })
    }
}
