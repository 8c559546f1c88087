//! Runtime configuration loaded from the environment

use std::{env, path::PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
  #[error("Invalid value for the environment variable {0}: {1}")]
  InvalidValue(&'static str, String),
  #[error("{0} is set but {1} is missing")]
  Incomplete(&'static str, &'static str),
}

#[derive(Debug, Clone)]
pub struct AdminAccount {
  pub username: String,
  pub password: String,
}

#[derive(Debug, Clone)]
pub struct Config {
  pub database_url: String,
  pub port: u16,
  pub media_root: PathBuf,
  pub rate_per_second: u64,
  pub rate_burst: u32,
  pub admin: Option<AdminAccount>,
}

impl Default for Config {
  fn default() -> Self {
    Self {
      database_url: String::from("sqlite:academy.db?mode=rwc"),
      port: 3000,
      media_root: PathBuf::from("./media"),
      rate_per_second: 2,
      rate_burst: 100,
      admin: None,
    }
  }
}

fn parsed<T: std::str::FromStr>(
  name: &'static str,
  default: T,
) -> Result<T, ConfigError>
where
  T::Err: std::fmt::Display,
{
  match env::var(name) {
    Ok(raw) => raw
      .trim()
      .parse()
      .map_err(|err: T::Err| ConfigError::InvalidValue(name, err.to_string())),
    Err(_) => Ok(default),
  }
}

impl Config {
  pub fn from_env() -> Result<Self, ConfigError> {
    let defaults = Self::default();

    let admin = match (env::var("ADMIN_USERNAME"), env::var("ADMIN_PASSWORD")) {
      (Ok(username), Ok(password)) => Some(AdminAccount { username, password }),
      (Ok(_), Err(_)) => {
        return Err(ConfigError::Incomplete("ADMIN_USERNAME", "ADMIN_PASSWORD"));
      }
      (Err(_), Ok(_)) => {
        return Err(ConfigError::Incomplete("ADMIN_PASSWORD", "ADMIN_USERNAME"));
      }
      (Err(_), Err(_)) => None,
    };

    Ok(Self {
      database_url: env::var("DATABASE_URL").unwrap_or(defaults.database_url),
      port: parsed("PORT", defaults.port)?,
      media_root: env::var("MEDIA_ROOT")
        .map(PathBuf::from)
        .unwrap_or(defaults.media_root),
      rate_per_second: parsed("RATE_PER_SECOND", defaults.rate_per_second)?,
      rate_burst: parsed("RATE_BURST", defaults.rate_burst)?,
      admin,
    })
  }
}
