//! Single-account admin authentication.
//!
//! The password hash comes from `password.json` once the admin has changed it,
//! otherwise from the configured default password hashed at startup. Sessions
//! are opaque bearer tokens kept in memory; a restart logs everyone out.

use crate::clock::Clock;
use crate::error::{AuthError, AuthResult};
use crate::models::LoginResponse;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::fs;
use tokio::sync::RwLock;
use tracing::{info, warn};
use uuid::Uuid;

pub const MIN_PASSWORD_LEN: usize = 6;

#[derive(Clone)]
pub struct AuthSettings {
    pub username: String,
    pub default_password: String,
    pub password_file: PathBuf,
    pub bcrypt_cost: u32,
    pub session_ttl: Duration,
}

#[derive(Debug, Serialize, Deserialize)]
struct PasswordFile {
    hash: String,
}

struct Credentials {
    hash: String,
    changed: bool,
}

pub struct AdminAuth {
    username: String,
    password_file: PathBuf,
    bcrypt_cost: u32,
    session_ttl: Duration,
    credentials: RwLock<Credentials>,
    sessions: RwLock<HashMap<String, DateTime<Utc>>>,
    clock: Arc<dyn Clock>,
}

impl AdminAuth {
    pub async fn new(settings: AuthSettings, clock: Arc<dyn Clock>) -> AuthResult<Self> {
        let path = settings.password_file;
        let credentials = match fs::read_to_string(&path).await {
            Ok(data) => {
                let stored: PasswordFile = serde_json::from_str(&data).map_err(|source| {
                    AuthError::PasswordFileCorrupt {
                        path: path.clone(),
                        source,
                    }
                })?;
                Credentials {
                    hash: stored.hash,
                    changed: true,
                }
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Credentials {
                hash: hash_password(settings.default_password, settings.bcrypt_cost).await?,
                changed: false,
            },
            Err(source) => return Err(AuthError::PasswordFileIo { path, source }),
        };

        if !credentials.changed {
            warn!("admin is using the default password; a change will be requested on login");
        }

        Ok(Self {
            username: settings.username,
            password_file: path,
            bcrypt_cost: settings.bcrypt_cost,
            session_ttl: settings.session_ttl,
            credentials: RwLock::new(credentials),
            sessions: RwLock::new(HashMap::new()),
            clock,
        })
    }

    pub async fn login(&self, username: &str, password: &str) -> AuthResult<LoginResponse> {
        if username != self.username {
            warn!(username, "login rejected: unknown user");
            return Err(AuthError::InvalidCredentials);
        }

        let (hash, changed) = {
            let credentials = self.credentials.read().await;
            (credentials.hash.clone(), credentials.changed)
        };
        if !verify_password(password.to_string(), hash).await? {
            warn!(username, "login rejected: wrong password");
            return Err(AuthError::InvalidCredentials);
        }

        let now = self.clock.now();
        let token = Uuid::new_v4().to_string();
        let mut sessions = self.sessions.write().await;
        sessions.retain(|_, expires_at| *expires_at > now);
        sessions.insert(token.clone(), now + self.session_ttl);

        info!(username, "admin logged in");
        Ok(LoginResponse {
            token,
            must_change_password: !changed,
        })
    }

    pub async fn authorize(&self, token: &str) -> AuthResult<()> {
        let now = self.clock.now();
        match self.sessions.read().await.get(token) {
            Some(expires_at) if *expires_at > now => Ok(()),
            _ => Err(AuthError::Unauthorized),
        }
    }

    /// Returns whether the token was an active session.
    pub async fn logout(&self, token: &str) -> bool {
        self.sessions.write().await.remove(token).is_some()
    }

    pub async fn change_password(&self, new_password: &str, confirm_password: &str) -> AuthResult<()> {
        if new_password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AuthError::WeakPassword(MIN_PASSWORD_LEN));
        }
        if new_password != confirm_password {
            return Err(AuthError::PasswordMismatch);
        }

        let hash = hash_password(new_password.to_string(), self.bcrypt_cost).await?;
        let json = serde_json::to_string(&PasswordFile { hash: hash.clone() }).map_err(|source| {
            AuthError::PasswordFileCorrupt {
                path: self.password_file.clone(),
                source,
            }
        })?;

        if let Some(parent) = self.password_file.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .await
                .map_err(|source| AuthError::PasswordFileIo {
                    path: self.password_file.clone(),
                    source,
                })?;
        }
        fs::write(&self.password_file, json)
            .await
            .map_err(|source| AuthError::PasswordFileIo {
                path: self.password_file.clone(),
                source,
            })?;

        *self.credentials.write().await = Credentials {
            hash,
            changed: true,
        };
        info!("admin password changed");
        Ok(())
    }
}

// bcrypt runs on the blocking pool.
async fn hash_password(password: String, cost: u32) -> AuthResult<String> {
    Ok(tokio::task::spawn_blocking(move || bcrypt::hash(password, cost)).await??)
}

async fn verify_password(password: String, hash: String) -> AuthResult<bool> {
    Ok(tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash)).await??)
}
