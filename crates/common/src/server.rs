//! Server API configuration derived from settings

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{Error, Result};
use crate::settings::Settings;

/// Key material used when a GPG key payload does not carry its own
pub const DEFAULT_GPG_KEY_FILE: &str = "valid_gpg_key.txt";

/// Connection parameters for the server's API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    pub url: String,
    pub username: String,
    pub password: String,
    pub verify: bool,
}

impl Settings {
    /// Base URL of the deployment, `scheme://hostname[:port]`
    pub fn server_url(&self) -> Result<String> {
        let hostname = self
            .server
            .hostname
            .as_deref()
            .filter(|h| !h.is_empty())
            .ok_or_else(|| Error::SettingNotFound("server.hostname".to_string()))?;

        let authority = match self.server.port {
            Some(port) => format!("{}:{}", hostname, port),
            None => hostname.to_string(),
        };
        Ok(format!("{}://{}", self.server.scheme, authority))
    }

    /// Admin username/password pair
    pub fn credentials(&self) -> (String, String) {
        (
            self.server.admin_username.clone(),
            self.server.admin_password.clone(),
        )
    }

    /// API configuration using the admin credentials
    pub fn admin_server_config(&self) -> Result<ServerConfig> {
        let (username, password) = self.credentials();
        self.user_server_config(&username, &password)
    }

    /// API configuration for an arbitrary user
    pub fn user_server_config(&self, username: &str, password: &str) -> Result<ServerConfig> {
        Ok(ServerConfig {
            url: self.server_url()?,
            username: username.to_string(),
            password: password.to_string(),
            verify: self.server.verify_ca,
        })
    }

    /// Defaults applied to GPG key payloads
    pub fn gpg_key_defaults(&self) -> GpgKeyDefaults {
        GpgKeyDefaults::new(self.data_dir().join(DEFAULT_GPG_KEY_FILE))
    }
}

/// Fields of a GPG key create request
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GpgKeyFields {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organization_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

/// Wraps GPG key payloads and fills in `content` when the caller left it
/// empty, so the API client's own types stay untouched.
#[derive(Debug, Clone)]
pub struct GpgKeyDefaults {
    content: PathBuf,
}

impl GpgKeyDefaults {
    pub fn new(content: impl Into<PathBuf>) -> Self {
        Self {
            content: content.into(),
        }
    }

    pub fn apply(&self, mut fields: GpgKeyFields) -> GpgKeyFields {
        if fields.content.as_deref().map_or(true, str::is_empty) {
            fields.content = Some(self.content.to_string_lossy().into_owned());
        }
        fields
    }
}
