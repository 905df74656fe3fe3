//! Device OS version resolution.
//!
//! Turns a fuzzy version specifier (`default`, `latest`, `latest-lts`,
//! a fixed version, or a semver range) into one concrete release
//! version supported by the requested platform. Resolution is pure
//! given a catalog snapshot; the async wrappers only add the cached
//! catalog fetch.

use semver::{Version, VersionReq};
use tracing::debug;

use crate::catalog::{BuildTargetCatalog, BuildTargetClient};
use crate::error::{ActionError, Result};
use crate::platform::platform_id;

/// Version resolver backed by a [`BuildTargetClient`].
pub struct VersionResolver {
    client: BuildTargetClient,
}

impl VersionResolver {
    pub fn new(client: BuildTargetClient) -> Self {
        Self { client }
    }

    /// Resolve `spec` against the catalog for `platform`.
    pub async fn resolve(&mut self, platform: &str, spec: &str) -> Result<String> {
        if spec.is_empty() {
            return Err(ActionError::Validation(
                "Device OS version is required".to_string(),
            ));
        }
        let catalog = self.client.fetch().await?;
        resolve_with(catalog, platform, spec)
    }

    /// Post-resolution sanity check: the literal `version` must exist
    /// in the catalog and list `platform` among its supported platforms.
    pub async fn validate_support(&mut self, platform: &str, version: &str) -> Result<bool> {
        let catalog = self.client.fetch().await?;
        validate_with(catalog, platform, version)
    }
}

/// Sorted, prerelease-free candidate versions supporting a platform.
///
/// Stable ascending sort by semver precedence, so ties keep the
/// original catalog order and resolution stays deterministic.
fn candidate_versions(catalog: &BuildTargetCatalog, pid: u32) -> Vec<Version> {
    let mut versions: Vec<Version> = catalog
        .targets_for_platform(pid)
        .filter_map(|t| Version::parse(&t.version).ok())
        .filter(|v| v.pre.is_empty())
        .collect();
    versions.sort();
    versions
}

/// Resolve a version specifier against a catalog snapshot.
pub fn resolve_with(catalog: &BuildTargetCatalog, platform: &str, spec: &str) -> Result<String> {
    if spec.is_empty() {
        return Err(ActionError::Validation(
            "Device OS version is required".to_string(),
        ));
    }

    let pid = platform_id(platform)?;
    let candidates = candidate_versions(catalog, pid);
    debug!(
        "Resolving '{spec}' for platform '{platform}' against {} candidate versions",
        candidates.len()
    );

    if spec == "default" {
        // The per-platform default is trusted to already be valid for
        // the platform; it is returned verbatim.
        return catalog
            .default_version(pid)
            .map(str::to_string)
            .ok_or_else(|| {
                ActionError::NoCandidate(format!(
                    "No default Device OS version found for platform '{platform}'"
                ))
            });
    }

    let latest = candidates.last().cloned().ok_or_else(|| {
        ActionError::NoCandidate(format!(
            "No Device OS version found for platform '{platform}'"
        ))
    })?;

    if spec == "latest" {
        return Ok(latest.to_string());
    }

    if spec == "latest-lts" {
        // LTS convention: even major version, 2.x or newer.
        return candidates
            .iter()
            .rfind(|v| v.major >= 2 && v.major % 2 == 0)
            .map(Version::to_string)
            .ok_or_else(|| {
                ActionError::NoCandidate(format!(
                    "No latest-lts build target found. The latest Device OS version for '{platform}' is '{latest}'"
                ))
            });
    }

    // A full semver string is an exact match; anything else is treated
    // as a range (tilde, caret, x-wildcard).
    if let Ok(fixed) = Version::parse(spec) {
        return if candidates.contains(&fixed) {
            Ok(fixed.to_string())
        } else {
            Err(no_candidate(spec, platform, &latest))
        };
    }

    let req = VersionReq::parse(spec).map_err(|_| {
        ActionError::Validation(format!("Invalid Device OS version specifier '{spec}'"))
    })?;

    candidates
        .iter()
        .rev()
        .find(|v| req.matches(v))
        .map(Version::to_string)
        .ok_or_else(|| no_candidate(spec, platform, &latest))
}

fn no_candidate(spec: &str, platform: &str, latest: &Version) -> ActionError {
    ActionError::NoCandidate(format!(
        "No Device OS version satisfies '{spec}'. The latest Device OS version for '{platform}' is '{latest}'"
    ))
}

/// Check that a resolved version exists and supports the platform.
pub fn validate_with(catalog: &BuildTargetCatalog, platform: &str, version: &str) -> Result<bool> {
    let pid = platform_id(platform)?;

    let target = catalog.target_for_version(version).ok_or_else(|| {
        ActionError::Validation(format!("Device OS version '{version}' does not exist"))
    })?;

    if !target.platforms.contains(&pid) {
        return Err(ActionError::Validation(format!(
            "Device OS version '{version}' does not support platform '{platform}'"
        )));
    }

    Ok(true)
}
