//! Engine configuration
//!
//! Everything fixed before the first document is created.

use crate::error::{EngineError, EngineResult};
use docmode_dom::{resolve_mode, DocumentMode};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_URL: &str = "http://winetest.example.org/index.html";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Requested document mode; clamped, quirks when absent
    pub document_mode: Option<i64>,
    /// URL of the first top-level document
    pub url: String,
    /// Overrides `navigator.userAgent` when set
    pub user_agent: Option<String>,
    /// Where localStorage persists; memory only when absent
    pub local_storage_path: Option<PathBuf>,
    /// Timeout every new XMLHttpRequest starts with
    pub xhr_timeout_ms: Option<u64>,
    /// `performance.timing.navigationStart` of the first load
    pub navigation_start_ms: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            document_mode: None,
            url: DEFAULT_URL.to_string(),
            user_agent: None,
            local_storage_path: None,
            xhr_timeout_ms: None,
            navigation_start_ms: 1000.0,
        }
    }
}

impl EngineConfig {
    pub fn with_mode(mode: DocumentMode) -> Self {
        Self {
            document_mode: Some(i64::from(mode.version())),
            ..Self::default()
        }
    }

    pub fn from_json(json: &str) -> EngineResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> EngineResult<Self> {
        let path = path.as_ref();
        let json = fs::read_to_string(path).map_err(|source| EngineError::ConfigFile {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::debug!(path = %path.display(), "loading engine config");
        Self::from_json(&json)
    }

    /// Document mode of top-level documents
    pub fn mode(&self) -> DocumentMode {
        resolve_mode(self.document_mode)
    }

    fn validate(&self) -> EngineResult<()> {
        url::Url::parse(&self.url).map_err(|e| EngineError::Config(format!("url {:?}: {e}", self.url)))?;
        if !self.navigation_start_ms.is_finite() || self.navigation_start_ms < 0.0 {
            return Err(EngineError::Config("navigation_start_ms must be a non-negative number".into()));
        }
        Ok(())
    }
}
