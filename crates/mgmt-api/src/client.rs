//! Management API HTTP client
//!
//! Every method is a JSON POST to `<base_url><method>`. Calls made after a
//! successful login carry the session id in the `X-chkp-sid` header.

use std::fmt;

use reqwest::header::HeaderMap;
use reqwest::{Client, StatusCode};
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::error::{MgmtError, Result};
use crate::session::Session;

/// Header carrying the session id
pub const SID_HEADER: &str = "X-chkp-sid";

/// Connection settings for the management API
#[derive(Clone)]
pub struct MgmtConfig {
    /// Base URL ending in `/web_api/`; method names are appended to it
    pub base_url: String,
    /// API key used by `login`
    pub api_key: String,
    /// Skip TLS certificate validation
    pub insecure_tls: bool,
}

impl MgmtConfig {
    /// Build the config for a management server, optionally scoped to a tenant
    ///
    /// A server value that already contains a scheme is used as-is,
    /// otherwise `https://` is assumed.
    pub fn new(server: &str, tenant_id: Option<&str>, api_key: impl Into<String>) -> Self {
        Self::with_base_url(web_api_url(server, tenant_id), api_key)
    }

    /// Build the config from an explicit base URL
    pub fn with_base_url(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        if !base_url.ends_with('/') {
            base_url.push('/');
        }
        Self {
            base_url,
            api_key: api_key.into(),
            insecure_tls: false,
        }
    }

    /// Enable or disable TLS certificate validation
    pub fn insecure_tls(mut self, insecure: bool) -> Self {
        self.insecure_tls = insecure;
        self
    }
}

impl fmt::Debug for MgmtConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MgmtConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &"<redacted>")
            .field("insecure_tls", &self.insecure_tls)
            .finish()
    }
}

/// Build `https://<server>/[<tenant>/]web_api/`
pub fn web_api_url(server: &str, tenant_id: Option<&str>) -> String {
    let server = server.trim().trim_end_matches('/');
    let root = if server.contains("://") {
        server.to_string()
    } else {
        format!("https://{}", server)
    };

    match tenant_id.map(str::trim).filter(|t| !t.is_empty()) {
        Some(tenant) => format!("{}/{}/web_api/", root, tenant),
        None => format!("{}/web_api/", root),
    }
}

/// Session-authenticated management API client
pub struct MgmtClient {
    pub(crate) config: MgmtConfig,
    http: Client,
    pub(crate) session: Mutex<Session>,
}

impl MgmtClient {
    /// Create a new client; no request is made until the first call
    pub fn new(config: MgmtConfig) -> Result<Self> {
        let mut builder = Client::builder();
        if config.insecure_tls {
            warn!("TLS certificate validation is disabled for the management API");
            builder = builder.danger_accept_invalid_certs(true);
        }
        let http = builder.build().map_err(MgmtError::Client)?;

        Ok(Self {
            config,
            http,
            session: Mutex::new(Session::default()),
        })
    }

    /// Base URL used for every method
    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    /// Call an API method with whatever session is currently held
    ///
    /// Returns the raw response body on HTTP 200.
    pub async fn call<P>(&self, method: &str, payload: &P, headers: Option<&HeaderMap>) -> Result<String>
    where
        P: Serialize + ?Sized,
    {
        let sid = self.session.lock().await.sid().to_string();
        self.send(method, payload, headers, &sid).await
    }

    /// Call an API method, logging in first when the session is empty or expired
    pub async fn call_authenticated<P>(
        &self,
        method: &str,
        payload: &P,
        headers: Option<&HeaderMap>,
    ) -> Result<String>
    where
        P: Serialize + ?Sized,
    {
        let sid = {
            let mut session = self.session.lock().await;
            if !session.is_valid_at(chrono::Utc::now()) {
                info!("Session is empty or expired, logging in");
                self.login_locked(&mut session).await?;
            }
            session.sid().to_string()
        };

        self.send(method, payload, headers, &sid).await
    }

    pub(crate) async fn send<P>(
        &self,
        method: &str,
        payload: &P,
        headers: Option<&HeaderMap>,
        sid: &str,
    ) -> Result<String>
    where
        P: Serialize + ?Sized,
    {
        let url = format!("{}{}", self.config.base_url, method);
        debug!("POST {}", url);

        let mut request = self.http.post(&url).json(payload);
        if !sid.is_empty() {
            request = request.header(SID_HEADER, sid);
        }
        if let Some(headers) = headers {
            request = request.headers(headers.clone());
        }

        let transport = |source| MgmtError::Transport {
            method: method.to_string(),
            source,
        };

        let response = request.send().await.map_err(transport)?;
        let status = response.status();
        let body = response.text().await.map_err(transport)?;

        if status != StatusCode::OK {
            debug!("'{}' returned {}: {}", method, status, body);
            return Err(MgmtError::Api {
                method: method.to_string(),
                status: status.as_u16(),
                body,
            });
        }

        Ok(body)
    }
}
