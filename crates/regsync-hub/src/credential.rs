//! Hub connection credentials.
//!
//! A tenant's hub credential is a single string of `;`-separated
//! `Key=Value` pairs:
//!
//! ```text
//! HostName=hub-a.example.net;SharedAccessKeyName=registryOwner;SharedAccessKey=<base64>
//! ```

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

/// Parsed hub connection credential.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionCredential {
    /// Hub endpoint host
    pub host_name: String,
    /// Name of the shared access policy
    pub key_name: String,
    /// Shared access key, base64
    pub key: String,
}

impl ConnectionCredential {
    /// Parse a credential string.
    ///
    /// # Errors
    ///
    /// Returns error on missing properties, malformed pairs, or a key that
    /// is not valid base64.
    pub fn parse(credential: &str) -> Result<Self, CredentialError> {
        let mut host_name = None;
        let mut key_name = None;
        let mut key = None;

        for pair in credential.split(';').filter(|p| !p.is_empty()) {
            let (name, value) = pair
                .split_once('=')
                .ok_or_else(|| CredentialError::MalformedPair(pair.to_string()))?;

            match name {
                "HostName" => host_name = Some(value.to_string()),
                "SharedAccessKeyName" => key_name = Some(value.to_string()),
                // The key itself may contain '=' padding; split_once keeps it.
                "SharedAccessKey" => key = Some(value.to_string()),
                _ => {}
            }
        }

        let host_name = host_name.ok_or(CredentialError::MissingProperty("HostName"))?;
        let key_name = key_name.ok_or(CredentialError::MissingProperty("SharedAccessKeyName"))?;
        let key = key.ok_or(CredentialError::MissingProperty("SharedAccessKey"))?;

        if host_name.is_empty() {
            return Err(CredentialError::MissingProperty("HostName"));
        }

        STANDARD
            .decode(&key)
            .map_err(|e| CredentialError::InvalidKey(e.to_string()))?;

        Ok(Self {
            host_name,
            key_name,
            key,
        })
    }

    /// Base URL of the hub's REST endpoint.
    #[must_use]
    pub fn base_url(&self) -> String {
        format!("https://{}", self.host_name)
    }
}

/// Errors that can occur parsing a connection credential.
#[derive(Debug, Clone, thiserror::Error)]
pub enum CredentialError {
    /// A `Key=Value` pair could not be split
    #[error("malformed credential pair: {0}")]
    MalformedPair(String),
    /// A required property is absent
    #[error("credential is missing {0}")]
    MissingProperty(&'static str),
    /// The shared access key is not valid base64
    #[error("shared access key is not base64: {0}")]
    InvalidKey(String),
}
