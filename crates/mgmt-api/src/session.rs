//! Session lifecycle: login, logout and token expiry

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::client::MgmtClient;
use crate::error::{MgmtError, Result};

const LOGIN: &str = "login";
const LOGOUT: &str = "logout";

/// Session name reported to the management server
pub const SESSION_NAME: &str = "cpfeedman-session";
/// Session timeout requested at login, in seconds
pub const SESSION_TIMEOUT_SECS: i64 = 60 * 60;
/// Subtracted from the server-provided timeout when computing expiry
pub const EXPIRY_MARGIN_SECS: i64 = 5 * 60;

/// Authentication state held by the client
///
/// An empty sid means unauthenticated. A non-empty sid is only usable
/// strictly before `expires_at`.
#[derive(Clone, Default)]
pub struct Session {
    sid: String,
    expires_at: Option<DateTime<Utc>>,
}

impl Session {
    /// Current session id, empty when logged out
    pub fn sid(&self) -> &str {
        &self.sid
    }

    /// When the session stops being usable
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    /// Check whether the session may be used at `now`
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        !self.sid.is_empty() && self.expires_at.is_some_and(|expires_at| now < expires_at)
    }

    fn establish(&mut self, sid: String, session_timeout_secs: i64, now: DateTime<Utc>) {
        let usable = session_timeout_secs.clamp(0, i64::from(u32::MAX)) - EXPIRY_MARGIN_SECS;
        self.sid = sid;
        self.expires_at = Some(now + Duration::seconds(usable));
    }

    fn clear(&mut self) {
        self.sid.clear();
        self.expires_at = None;
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("authenticated", &!self.sid.is_empty())
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

#[derive(Serialize)]
struct LoginRequest<'a> {
    #[serde(rename = "api-key")]
    api_key: &'a str,
    #[serde(rename = "session-name")]
    session_name: &'a str,
    #[serde(rename = "session-timeout")]
    session_timeout: i64,
}

/// Response to a successful login
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct LoginResponse {
    #[serde(default)]
    pub uid: String,
    #[serde(default)]
    pub sid: String,
    #[serde(default)]
    pub session_timeout: i64,
    #[serde(default)]
    pub api_server_version: String,
    #[serde(default)]
    pub user_name: String,
}

impl MgmtClient {
    /// Log in with the configured API key and store the returned session
    pub async fn login(&self) -> Result<LoginResponse> {
        let mut session = self.session.lock().await;
        self.login_locked(&mut session).await
    }

    pub(crate) async fn login_locked(&self, session: &mut Session) -> Result<LoginResponse> {
        let request = LoginRequest {
            api_key: &self.config.api_key,
            session_name: SESSION_NAME,
            session_timeout: SESSION_TIMEOUT_SECS,
        };

        // A stale sid must not be presented to login
        let body = self
            .send(LOGIN, &request, None, "")
            .await
            .map_err(|e| MgmtError::auth_with_source("login call failed", e))?;

        let response: LoginResponse = serde_json::from_str(&body).map_err(|e| {
            MgmtError::auth_with_source("login response could not be parsed", MgmtError::decode(LOGIN, e))
        })?;

        if response.sid.is_empty() {
            return Err(MgmtError::auth("login response carried no session id"));
        }

        session.establish(response.sid.clone(), response.session_timeout, Utc::now());
        info!(
            session_timeout = response.session_timeout,
            expires_at = ?session.expires_at(),
            "Logged in to management API"
        );

        Ok(response)
    }

    /// Log out and drop the local session
    ///
    /// The logout call is attempted once; the local session is cleared
    /// whether or not it succeeds.
    pub async fn logout(&self) -> Result<String> {
        let mut session = self.session.lock().await;
        let sid = session.sid().to_string();

        let result = self.send(LOGOUT, &serde_json::json!({}), None, &sid).await;
        session.clear();

        match &result {
            Ok(_) => info!("Logged out from management API"),
            Err(e) => warn!("Logout failed, local session dropped anyway: {}", e),
        }
        result
    }

    /// Snapshot of the current session
    pub async fn session(&self) -> Session {
        self.session.lock().await.clone()
    }
}
