//! Session authentication material
//!
//! The catalog accepts the same credentials the web client sends: the full
//! cookie jar plus an `Authorization: SAPISIDHASH <ts>_<sha1>` header derived
//! from the `__Secure-3PAPISID` cookie. The user exports their browser
//! request headers once; this module reloads and re-signs them per request.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use chrono::Utc;
use sha1::{Digest, Sha1};

use crate::error::{CatalogError, Result};

/// Origin the hash is bound to.
pub const ORIGIN: &str = "https://music.youtube.com";

/// Cookie names that carry the SAPISID value, in lookup order.
const SAPISID_COOKIES: [&str; 2] = ["__Secure-3PAPISID", "SAPISID"];

/// Parsed contents of the exported headers file.
#[derive(Debug, Clone)]
pub struct CatalogAuth {
    cookie: String,
    user_agent: Option<String>,
}

impl CatalogAuth {
    /// Loads a headers file: a YAML (or JSON) mapping of header names to
    /// values. Only `cookie` is required; header names are matched
    /// case-insensitively.
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)?;
        let headers: BTreeMap<String, String> = serde_yaml::from_str(&raw)
            .map_err(|e| CatalogError::invalid_auth(format!("{}: {e}", path.display())))?;

        let mut cookie = None;
        let mut user_agent = None;
        for (name, value) in headers {
            match name.to_ascii_lowercase().as_str() {
                "cookie" => cookie = Some(value),
                "user-agent" => user_agent = Some(value),
                _ => {}
            }
        }

        let cookie = cookie.ok_or_else(|| {
            CatalogError::invalid_auth(format!("{} has no cookie header", path.display()))
        })?;

        let auth = Self { cookie, user_agent };
        // Fail at load time, not on the first request
        auth.sapisid()?;
        Ok(auth)
    }

    /// Builds auth directly from a cookie string (tests, embedding).
    pub fn from_cookie(cookie: impl Into<String>) -> Self {
        Self {
            cookie: cookie.into(),
            user_agent: None,
        }
    }

    pub fn cookie(&self) -> &str {
        &self.cookie
    }

    pub fn user_agent(&self) -> Option<&str> {
        self.user_agent.as_deref()
    }

    /// Extracts the SAPISID value from the cookie jar.
    pub fn sapisid(&self) -> Result<String> {
        for part in self.cookie.split(';') {
            let part = part.trim();
            if let Some((name, value)) = part.split_once('=') {
                if SAPISID_COOKIES.contains(&name) && !value.is_empty() {
                    return Ok(value.to_string());
                }
            }
        }
        Err(CatalogError::invalid_auth(
            "cookie has no __Secure-3PAPISID / SAPISID entry",
        ))
    }

    /// `Authorization` header value for one request, hashed at `ts`
    /// (seconds since epoch).
    pub fn authorization_at(&self, ts: i64) -> Result<String> {
        let sapisid = self.sapisid()?;

        let mut hasher = Sha1::new();
        hasher.update(format!("{ts} {sapisid} {ORIGIN}").as_bytes());
        let digest = hex::encode(hasher.finalize());

        Ok(format!("SAPISIDHASH {ts}_{digest}"))
    }

    /// [`authorization_at`](Self::authorization_at) against the current clock.
    pub fn authorization(&self) -> Result<String> {
        self.authorization_at(Utc::now().timestamp())
    }
}
