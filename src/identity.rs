//! The locally cached identity: bearer token and the acting user's id.
//!
//! Written by whatever logged the user in, read here. Shape:
//! `{"token": "...", "user": {"id": 17, ...}}`.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde_json::Value;

use crate::api::TOKEN_ENV;

/// Keys that may carry the user id, in lookup order.
const USER_ID_KEYS: [&str; 6] = ["id", "_id", "userId", "uid", "UsuarioId", "usuario_id"];

#[derive(Debug, Default, Deserialize)]
struct CachedIdentity {
    #[serde(default)]
    token: Option<String>,
    #[serde(default)]
    user: Option<Value>,
}

/// Reader for the identity file.
#[derive(Debug, Clone)]
pub struct IdentityCache {
    path: PathBuf,
}

impl IdentityCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Cache at the default location.
    pub fn at_default_path() -> Self {
        Self::new(default_path())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Bearer token. `SQUAT_COACH_TOKEN` takes precedence over the file.
    pub fn token(&self) -> Result<String, IdentityError> {
        self.resolve_token(std::env::var(TOKEN_ENV).ok())
    }

    fn resolve_token(&self, env_token: Option<String>) -> Result<String, IdentityError> {
        if let Some(token) = env_token.filter(|t| !t.trim().is_empty()) {
            log::debug!("Using token from {}", TOKEN_ENV);
            return Ok(token);
        }

        self.read()
            .and_then(|cached| cached.token)
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| IdentityError::MissingToken(self.path.clone()))
    }

    /// The acting user's id, read fresh from the file on every call.
    ///
    /// # Errors
    ///
    /// `IdentityError::MissingUserId` when the file is absent, unreadable, or
    /// carries no usable id.
    pub fn user_id(&self) -> Result<String, IdentityError> {
        self.read()
            .and_then(|cached| cached.user)
            .as_ref()
            .and_then(extract_user_id)
            .ok_or_else(|| IdentityError::MissingUserId(self.path.clone()))
    }

    fn read(&self) -> Option<CachedIdentity> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) => {
                log::debug!("No identity at '{}': {}", self.path.display(), e);
                return None;
            }
        };
        match serde_json::from_str(&content) {
            Ok(cached) => Some(cached),
            Err(e) => {
                log::warn!("Identity file '{}' is malformed: {}", self.path.display(), e);
                None
            }
        }
    }
}

/// The first key holding a non-null value decides; an unusable value there
/// is not rescued by later keys.
fn extract_user_id(user: &Value) -> Option<String> {
    let value = USER_ID_KEYS
        .iter()
        .filter_map(|key| user.get(key))
        .find(|value| !value.is_null())?;
    match value {
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        _ => None,
    }
}

/// `<config_dir>/squat-coach/identity.json`
pub fn default_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("squat-coach")
        .join("identity.json")
}

#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    #[error("No bearer token in '{}' and {} is not set", .0.display(), TOKEN_ENV)]
    MissingToken(PathBuf),

    #[error("No user id in '{}'; log in again", .0.display())]
    MissingUserId(PathBuf),
}
