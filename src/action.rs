//! Build orchestrator.
//!
//! Sequences version resolution, the auto-versioning protocol, the
//! local or cloud build, and artifact renaming, then publishes the CI
//! outputs. All domain errors below bubble up here and become a
//! job-level failure.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::autoversion::{
    increment_version, is_product_firmware, should_increment_version, VersionBump,
};
use crate::catalog::BuildTargetClient;
use crate::cloud::CloudClient;
use crate::docker::{docker_buildpack_compile, docker_check};
use crate::error::{ActionError, Result};
use crate::platform::validate_platform_name;
use crate::repo::{GitCli, RepoInspector};
use crate::resolver::VersionResolver;

/// Inputs of one action invocation.
#[derive(Debug, Clone)]
pub struct ActionInputs {
    /// Cloud API token. When absent, compilation happens locally in a
    /// container.
    pub access_token: Option<String>,
    pub platform: String,
    pub device_os_version: String,
    pub sources_folder: PathBuf,
    /// Run the git-driven version bump before compiling.
    pub auto_version: bool,
    pub version_macro_name: String,
}

/// Outputs published at the end of a successful run.
#[derive(Debug, Clone)]
pub struct ActionOutputs {
    pub artifact_path: PathBuf,
    pub device_os_version: String,
    pub firmware_version: Option<u64>,
    pub firmware_version_file: Option<PathBuf>,
    pub firmware_version_updated: bool,
}

/// Run the whole compile action.
pub async fn compile_action(inputs: &ActionInputs) -> Result<ActionOutputs> {
    validate_platform_name(&inputs.platform)?;

    let mut resolver = VersionResolver::new(BuildTargetClient::new()?);
    let target_version = resolver
        .resolve(&inputs.platform, &inputs.device_os_version)
        .await?;
    resolver
        .validate_support(&inputs.platform, &target_version)
        .await?;
    info!(
        "Resolved Device OS version '{}' to '{target_version}'",
        inputs.device_os_version
    );

    let inspector = GitCli::new();
    let bump = auto_version(&inspector, inputs)?;

    let artifact = match &inputs.access_token {
        None => {
            info!("No access token provided, running local compilation");
            docker_check()?;
            docker_buildpack_compile(
                &std::env::current_dir()?,
                &inputs.sources_folder,
                &inputs.platform,
                &target_version,
            )?
        }
        Some(token) => {
            info!("Access token provided, running cloud compilation");
            let client = CloudClient::new(token.clone())?;
            let binary_id = client
                .compile(&inputs.sources_folder, &inputs.platform, &target_version)
                .await?;
            client
                .download_binary(&binary_id, Path::new("output"))
                .await?
        }
    };

    let artifact_path = rename_artifact(&artifact, &inputs.platform, &target_version)?;

    let outputs = ActionOutputs {
        artifact_path,
        device_os_version: target_version,
        firmware_version: bump.as_ref().map(|b| b.version),
        firmware_version_file: bump.as_ref().map(|b| b.file.clone()),
        firmware_version_updated: bump.is_some(),
    };
    publish_outputs(&outputs)?;

    Ok(outputs)
}

/// Run the auto-versioning protocol when enabled and the tree is
/// product firmware. Returns the bump that was performed, if any.
fn auto_version(inspector: &dyn RepoInspector, inputs: &ActionInputs) -> Result<Option<VersionBump>> {
    if !inputs.auto_version {
        return Ok(None);
    }
    if !is_product_firmware(&inputs.sources_folder, &inputs.version_macro_name) {
        info!("Sources do not carry a version macro; skipping auto-versioning");
        return Ok(None);
    }

    let repo = inspector.find_nearest_root(&inputs.sources_folder)?;
    if !inspector.has_full_history(&repo)? {
        return Err(ActionError::ShallowHistory);
    }

    if !should_increment_version(
        inspector,
        &repo,
        &inputs.sources_folder,
        &inputs.version_macro_name,
    )? {
        return Ok(None);
    }

    let bump = increment_version(
        inspector,
        &repo,
        &inputs.sources_folder,
        &inputs.version_macro_name,
    )?;
    info!(
        "Updated {} to version {}. Commit and push the updated file.",
        bump.file.display(),
        bump.version
    );
    Ok(Some(bump))
}

/// Rename the produced binary to `firmware-<platform>-<version>.bin`
/// beside its original location.
pub fn rename_artifact(artifact: &Path, platform: &str, version: &str) -> Result<PathBuf> {
    let file_name = format!("firmware-{platform}-{version}.bin");
    let renamed = match artifact.parent() {
        Some(parent) => parent.join(&file_name),
        None => PathBuf::from(&file_name),
    };
    std::fs::rename(artifact, &renamed)?;
    Ok(renamed)
}

fn publish_outputs(outputs: &ActionOutputs) -> Result<()> {
    set_output("artifact-path", &outputs.artifact_path.display().to_string())?;
    set_output("device-os-version", &outputs.device_os_version)?;
    set_output(
        "firmware-version-updated",
        if outputs.firmware_version_updated {
            "true"
        } else {
            "false"
        },
    )?;
    if let Some(version) = outputs.firmware_version {
        set_output("firmware-version", &version.to_string())?;
    }
    if let Some(file) = &outputs.firmware_version_file {
        set_output("firmware-version-file", &file.display().to_string())?;
    }
    Ok(())
}

/// Publish one CI output: appended to the `$GITHUB_OUTPUT` file when
/// the runner defines it, logged otherwise.
fn set_output(name: &str, value: &str) -> Result<()> {
    match std::env::var_os("GITHUB_OUTPUT") {
        Some(path) => append_output(Path::new(&path), name, value),
        None => {
            info!("output {name}={value}");
            Ok(())
        }
    }
}

fn append_output(path: &Path, name: &str, value: &str) -> Result<()> {
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    writeln!(file, "{name}={value}")?;
    Ok(())
}
