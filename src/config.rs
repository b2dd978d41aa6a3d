use crate::auth::AuthSettings;
use anyhow::{anyhow, bail, Context, Result};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

#[derive(Clone)]
pub struct Config {
    pub port: u16,
    pub admin_username: String,
    pub admin_password: String,
    pub uploads_dir: PathBuf,
    pub data_dir: PathBuf,
    pub max_upload_bytes: usize,
    /// `None` disables the background sweep.
    pub sweep_interval: Option<Duration>,
    pub session_ttl_hours: i64,
    pub bcrypt_cost: u32,
}

impl Config {
    /// Reads settings from the process environment. Call `dotenvy::dotenv()`
    /// first to pick up a local `.env`.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let admin_password = lookup("DEFAULT_ADMIN_PASSWORD")
            .filter(|p| !p.is_empty())
            .ok_or_else(|| anyhow!("DEFAULT_ADMIN_PASSWORD is not set"))?;

        let bcrypt_cost: u32 = parse_var(&lookup, "BCRYPT_COST", 10)?;
        if !(4..=31).contains(&bcrypt_cost) {
            bail!("BCRYPT_COST must be between 4 and 31, got {}", bcrypt_cost);
        }

        let session_ttl_hours: i64 = parse_var(&lookup, "SESSION_TTL_HOURS", 24)?;
        if session_ttl_hours <= 0 {
            bail!("SESSION_TTL_HOURS must be positive");
        }

        let sweep_secs: u64 = parse_var(&lookup, "SWEEP_INTERVAL_SECS", 3600)?;

        Ok(Self {
            port: parse_var(&lookup, "PORT", 3000)?,
            admin_username: lookup("ADMIN_USERNAME").unwrap_or_else(|| "admin".to_string()),
            admin_password,
            uploads_dir: lookup("UPLOADS_DIR").unwrap_or_else(|| "uploads".to_string()).into(),
            data_dir: lookup("DATA_DIR").unwrap_or_else(|| "data".to_string()).into(),
            max_upload_bytes: parse_var(&lookup, "MAX_UPLOAD_BYTES", 10 * 1024 * 1024)?,
            sweep_interval: (sweep_secs > 0).then(|| Duration::from_secs(sweep_secs)),
            session_ttl_hours,
            bcrypt_cost,
        })
    }

    pub fn metadata_path(&self) -> PathBuf {
        self.data_dir.join("uploads.json")
    }

    pub fn password_file(&self) -> PathBuf {
        self.data_dir.join("password.json")
    }

    pub fn auth_settings(&self) -> AuthSettings {
        AuthSettings {
            username: self.admin_username.clone(),
            default_password: self.admin_password.clone(),
            password_file: self.password_file(),
            bcrypt_cost: self.bcrypt_cost,
            session_ttl: chrono::Duration::hours(self.session_ttl_hours),
        }
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("port", &self.port)
            .field("admin_username", &self.admin_username)
            .field("admin_password", &"<redacted>")
            .field("uploads_dir", &self.uploads_dir)
            .field("data_dir", &self.data_dir)
            .field("max_upload_bytes", &self.max_upload_bytes)
            .field("sweep_interval", &self.sweep_interval)
            .field("session_ttl_hours", &self.session_ttl_hours)
            .field("bcrypt_cost", &self.bcrypt_cost)
            .finish()
    }
}

fn parse_var<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .with_context(|| format!("Invalid value for {}: {:?}", key, raw)),
        _ => Ok(default),
    }
}
