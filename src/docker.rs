//! Local containerized compilation via the firmware buildpack image.
//!
//! Thin wrapper around the container runtime: pull the buildpack for
//! the resolved (version, platform) pair, bind-mount the sources and
//! an output directory, and run it.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::{info, warn};

use crate::error::{ActionError, Result};
use crate::platform::platform_id;

const OUTPUT_DIR: &str = "output";
const BINARY_NAME: &str = "firmware.bin";

fn buildpack_image(platform: &str, target_version: &str) -> String {
    format!("particle/buildpack-particle-firmware:{target_version}-{platform}")
}

fn docker(args: &[&str]) -> Result<String> {
    let output = Command::new("docker")
        .args(args)
        .output()
        .map_err(|e| ActionError::Docker(format!("failed to run docker: {e}")))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(ActionError::Docker(format!(
            "docker {} failed: {}",
            args.join(" "),
            stderr.trim()
        )));
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Verify the container runtime is installed and reachable.
pub fn docker_check() -> Result<bool> {
    docker(&["version"]).map_err(|_| {
        ActionError::Docker("Docker is not installed or is not available in the path.".to_string())
    })?;
    Ok(true)
}

/// Compile `sources` locally with the buildpack image and return the
/// path of the produced binary.
pub fn docker_buildpack_compile(
    working_dir: &Path,
    sources: &Path,
    platform: &str,
    target_version: &str,
) -> Result<PathBuf> {
    let pid = platform_id(platform)?;
    let image = buildpack_image(platform, target_version);

    info!("Fetching docker buildpack for platform '{platform}' and target '{target_version}'");
    info!("This can take a minute....");
    let pull = docker(&["pull", &image])?;
    info!("{}", pull.trim());

    let dest_dir = working_dir.join(OUTPUT_DIR);
    if dest_dir.exists() {
        warn!(
            "Output directory {OUTPUT_DIR} already exists. Compile will overwrite {BINARY_NAME} if it exists."
        );
    } else {
        info!("Creating output directory {OUTPUT_DIR}...");
        fs::create_dir_all(&dest_dir)?;
    }

    let input_mount = format!("{}:/input", working_dir.join(sources).display());
    let output_mount = format!("{}:/output", dest_dir.display());
    let platform_env = format!("PLATFORM_ID={pid}");

    let run = docker(&[
        "run",
        "--rm",
        "-v",
        &input_mount,
        "-v",
        &output_mount,
        "-e",
        &platform_env,
        &image,
    ])?;
    info!("{}", run.trim());

    Ok(dest_dir.join(BINARY_NAME))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn buildpack_image_tags_version_and_platform() {
        assert_eq!(
            buildpack_image("argon", "4.0.2"),
            "particle/buildpack-particle-firmware:4.0.2-argon"
        );
    }
}
