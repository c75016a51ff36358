/*!
 * Credential handle for the hosting platform.
 *
 * Acquiring and refreshing OAuth tokens happens elsewhere; this module only
 * picks up an already valid access token from the environment or from a
 * stored token file.
 */

use anyhow::{Context, Result, anyhow};
use log::debug;
use serde::Deserialize;
use std::fmt;
use std::path::Path;

use crate::file_utils::FileManager;

/// Opaque bearer credential
#[derive(Clone)]
pub struct Credential {
    access_token: String,
}

// Token files written by the usual OAuth helpers use either key
#[derive(Deserialize)]
struct TokenFile {
    token: Option<String>,
    access_token: Option<String>,
}

impl Credential {
    pub fn new(access_token: impl Into<String>) -> Self {
        Self { access_token: access_token.into() }
    }

    /// Value for the `Authorization` header
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.access_token)
    }

    /// Read a stored token file
    pub fn from_token_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = FileManager::read_to_string(path)?;
        let parsed: TokenFile = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse token file: {}", path.display()))?;

        parsed
            .access_token
            .or(parsed.token)
            .filter(|t| !t.trim().is_empty())
            .map(Self::new)
            .ok_or_else(|| anyhow!("Token file {} has no access token", path.display()))
    }

    /// Environment variable first, token file second
    pub fn resolve(env_var: &str, token_file: &Path) -> Result<Self> {
        if let Ok(token) = std::env::var(env_var) {
            if !token.trim().is_empty() {
                debug!("Using access token from {}", env_var);
                return Ok(Self::new(token.trim()));
            }
        }

        debug!("Using access token from {}", token_file.display());
        Self::from_token_file(token_file).with_context(|| {
            format!("No credential found: set {} or provide {}", env_var, token_file.display())
        })
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(***)")
    }
}
