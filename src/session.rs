// src/session.rs

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::error::{io_context, PayrollError};
use crate::models::User;

/// Which login/current-user endpoints the backend exposes.
///
/// Deployments disagree on this, and the two are treated as distinct
/// contracts: the client never probes one after the other fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthContract {
    #[default]
    Auth,
    Users,
}

impl AuthContract {
    pub fn login_path(&self) -> &'static str {
        match self {
            AuthContract::Auth => "/auth/login",
            AuthContract::Users => "/users/login",
        }
    }

    pub fn current_user_path(&self) -> &'static str {
        match self {
            AuthContract::Auth => "/auth/me",
            AuthContract::Users => "/users/me",
        }
    }
}

/// An authenticated session. Immutable once issued; a new login yields a new one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    token: String,
    #[serde(default)]
    user: Option<User>,
}

#[derive(Debug, Deserialize)]
struct TokenClaims {
    exp: Option<i64>,
}

impl Session {
    pub fn new(token: impl Into<String>, user: Option<User>) -> Self {
        Self {
            token: token.into(),
            user,
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    pub fn bearer_header(&self) -> String {
        format!("Bearer {}", self.token)
    }

    /// Expiry from the `exp` claim when the token is a JWT. Opaque tokens have none.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        let payload = self.token.split('.').nth(1)?;
        let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')).ok()?;
        let claims: TokenClaims = serde_json::from_slice(&bytes).ok()?;
        DateTime::<Utc>::from_timestamp(claims.exp?, 0)
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at().map_or(false, |exp| now >= exp)
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }
}

/// File-backed persistence for the CLI's session.
#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<Option<Session>, PayrollError> {
        if !self.path.exists() {
            debug!("No session file at {:?}", self.path);
            return Ok(None);
        }

        let json_string = fs::read_to_string(&self.path)
            .map_err(|e| io_context(e, format!("Failed to read session file: {:?}", self.path)))?;
        match serde_json::from_str::<Session>(&json_string) {
            Ok(session) => Ok(Some(session)),
            Err(e) => {
                // A corrupt file is the same as being logged out
                warn!(
                    "Session file {:?} is not valid JSON ({}), ignoring it",
                    self.path, e
                );
                Ok(None)
            }
        }
    }

    pub fn save(&self, session: &Session) -> Result<(), PayrollError> {
        let json_string = serde_json::to_string_pretty(session)?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| {
                    io_context(
                        e,
                        format!("Failed to create directory for session file: {:?}", parent),
                    )
                })?;
            }
        }

        let mut file = File::create(&self.path).map_err(|e| {
            io_context(e, format!("Failed to create session file: {:?}", self.path))
        })?;
        file.write_all(json_string.as_bytes()).map_err(|e| {
            io_context(e, format!("Failed to write session file: {:?}", self.path))
        })?;

        info!("Session saved to {:?}", self.path);
        Ok(())
    }

    pub fn clear(&self) -> Result<(), PayrollError> {
        if self.path.exists() {
            fs::remove_file(&self.path).map_err(|e| {
                io_context(e, format!("Failed to remove session file: {:?}", self.path))
            })?;
            info!("Session file {:?} removed", self.path);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn jwt_with_exp(exp: i64) -> String {
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
        let payload = URL_SAFE_NO_PAD.encode(format!(r#"{{"id":"u1","exp":{}}}"#, exp));
        format!("{}.{}.signature", header, payload)
    }

    #[test]
    fn contracts_use_distinct_paths() {
        assert_eq!(AuthContract::Auth.login_path(), "/auth/login");
        assert_eq!(AuthContract::Auth.current_user_path(), "/auth/me");
        assert_eq!(AuthContract::Users.login_path(), "/users/login");
        assert_eq!(AuthContract::Users.current_user_path(), "/users/me");
    }

    #[test]
    fn reads_expiry_from_jwt_claims() {
        let session = Session::new(jwt_with_exp(1_700_000_000), None);
        let expected = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        assert_eq!(session.expires_at(), Some(expected));
        assert!(session.is_expired_at(expected));
        assert!(!session.is_expired_at(expected - chrono::Duration::seconds(1)));
    }

    #[test]
    fn opaque_token_never_expires() {
        let session = Session::new("plain-token", None);
        assert_eq!(session.expires_at(), None);
        assert!(!session.is_expired());
        assert_eq!(session.bearer_header(), "Bearer plain-token");
    }

    #[test]
    fn store_round_trips_and_clears() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path().join("nested").join("session.json"));

        assert_eq!(store.load().unwrap(), None);

        let session = Session::new("abc", None);
        store.save(&session).unwrap();
        assert_eq!(store.load().unwrap(), Some(session));

        store.clear().unwrap();
        assert!(!store.path().exists());
        assert_eq!(store.load().unwrap(), None);
    }

    #[test]
    fn corrupt_session_file_is_treated_as_logged_out() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        fs::write(&path, "{not json").unwrap();

        let store = SessionStore::new(&path);
        assert_eq!(store.load().unwrap(), None);
    }
}
