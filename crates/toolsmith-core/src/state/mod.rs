//! Running environment and configuration.

use crate::{error::Error, extension::TomlTableExt};
use std::{
    fs, io,
    path::{Path, PathBuf},
};
use toml::value::Table;

mod env;

pub use self::env::Env;

/// Configuration of the running environment, backed by a TOML table.
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Environment.
    env: Env,
    /// Configuration table.
    table: Table,
}

impl Config {
    /// Creates an empty config for the environment.
    #[inline]
    pub fn new(env: Env) -> Self {
        Self {
            env,
            table: Table::new(),
        }
    }

    /// Creates a config from an existing table.
    #[inline]
    pub fn with_table(env: Env, table: Table) -> Self {
        Self { env, table }
    }

    /// Parses the config from a TOML document.
    pub fn parse(env: Env, source: &str) -> Result<Self, Error> {
        let table = source
            .parse::<Table>()
            .map_err(|err| Error::from(err).wrap("fail to parse the toml config"))?;
        Ok(Self { env, table })
    }

    /// Loads `config/config.{env}.toml` under the project directory.
    /// A missing file yields an empty config.
    pub fn load(env: Env, project_dir: &Path) -> Result<Self, Error> {
        let config_file = Self::config_file(env, project_dir);
        match fs::read_to_string(&config_file) {
            Ok(source) => {
                let config = Self::parse(env, &source)?;
                tracing::info!(env = env.as_str(), "`{}` loaded", config_file.display());
                Ok(config)
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                tracing::info!(
                    env = env.as_str(),
                    "`{}` does not exist, using the default config",
                    config_file.display()
                );
                Ok(Self::new(env))
            }
            Err(err) => {
                let message = format!("fail to read the config file `{}`", config_file.display());
                Err(Error::from(err).wrap(message))
            }
        }
    }

    /// Loads the config for the environment selected by `TOOLSMITH_ENV`,
    /// relative to the current working directory.
    pub fn from_env() -> Result<Self, Error> {
        let project_dir = std::env::current_dir()
            .map_err(|err| Error::from(err).wrap("fail to get the project directory"))?;
        Self::load(Env::from_env(), &project_dir)
    }

    /// Returns the path of the config file for the environment.
    pub fn config_file(env: Env, project_dir: &Path) -> PathBuf {
        project_dir.join("config").join(format!("config.{env}.toml"))
    }

    /// Returns the environment.
    #[inline]
    pub fn env(&self) -> Env {
        self.env
    }

    /// Returns a reference to the config table.
    #[inline]
    pub fn table(&self) -> &Table {
        &self.table
    }

    /// Returns the sub-table corresponding to the key.
    #[inline]
    pub fn get_table(&self, key: &str) -> Option<&Table> {
        self.table.get_table(key)
    }
}
