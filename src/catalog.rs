//! Build target catalog client.
//!
//! Fetches the remote manifest of supported (Device OS version,
//! platform) combinations and caches it for the lifetime of the
//! process. The action runs once per CI job, so a fetch failure is
//! surfaced immediately instead of retried.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ActionError, Result};

/// Default build target endpoint.
pub const DEFAULT_CATALOG_URL: &str = "https://api.particle.io/v1/build_targets";

/// One published Device OS release and the platforms it can build for.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildTarget {
    /// Release version (semver string, may carry a prerelease tag).
    pub version: String,

    /// Platform ids this release supports.
    pub platforms: Vec<u32>,

    /// Platform ids for which this release is a prerelease.
    #[serde(default)]
    pub prereleases: Vec<u32>,
}

/// The catalog body returned by the build target endpoint.
///
/// `default_versions` is keyed by platform id; JSON object keys are
/// strings, so the map keeps them as strings and lookups go through
/// [`BuildTargetCatalog::default_version`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildTargetCatalog {
    pub targets: Vec<BuildTarget>,

    #[serde(default)]
    pub default_versions: HashMap<String, String>,
}

impl BuildTargetCatalog {
    /// The recommended version for a platform, if the catalog names one.
    pub fn default_version(&self, platform_id: u32) -> Option<&str> {
        self.default_versions
            .get(&platform_id.to_string())
            .map(String::as_str)
    }

    /// Targets that list `platform_id` among their supported platforms.
    pub fn targets_for_platform(&self, platform_id: u32) -> impl Iterator<Item = &BuildTarget> {
        self.targets
            .iter()
            .filter(move |t| t.platforms.contains(&platform_id))
    }

    /// Look up a target by its literal version string.
    pub fn target_for_version(&self, version: &str) -> Option<&BuildTarget> {
        self.targets.iter().find(|t| t.version == version)
    }
}

/// HTTP client for the build target endpoint with a single-slot,
/// process-lifetime cache.
///
/// The cache is a plain owned slot: the action is single-threaded and
/// sequential, so no locking is needed. A second `fetch` returns the
/// already-cached catalog and makes no network request.
pub struct BuildTargetClient {
    base_url: String,
    http: reqwest::Client,
    cache: Option<BuildTargetCatalog>,
}

impl BuildTargetClient {
    pub fn new() -> Result<Self> {
        Self::with_base_url(DEFAULT_CATALOG_URL)
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("compile-action/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ActionError::Network(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            base_url: base_url.into(),
            http,
            cache: None,
        })
    }

    /// Fetch the catalog, or return the cached copy from an earlier
    /// fetch in this process.
    pub async fn fetch(&mut self) -> Result<&BuildTargetCatalog> {
        if self.cache.is_none() {
            debug!("Fetching build targets from {}", self.base_url);
            let response = self
                .http
                .get(&self.base_url)
                .send()
                .await
                .map_err(|e| ActionError::Network(e.to_string()))?;

            if !response.status().is_success() {
                return Err(ActionError::Network(
                    response.status().as_u16().to_string(),
                ));
            }

            let catalog: BuildTargetCatalog = response
                .json()
                .await
                .map_err(|e| ActionError::Parse(e.to_string()))?;

            debug!("Fetched {} build targets", catalog.targets.len());
            self.cache = Some(catalog);
        }

        Ok(self
            .cache
            .as_ref()
            .expect("catalog cache populated by the branch above"))
    }

    /// Clear the cached catalog. Intended for tests that need to stub
    /// a second response.
    pub fn reset(&mut self) {
        self.cache = None;
    }
}
