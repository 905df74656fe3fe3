use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use compile_action::action::{compile_action, ActionInputs};
use compile_action::autoversion::DEFAULT_VERSION_MACRO;

/// Compile embedded firmware in CI, with Device OS version resolution
/// and git-driven product version auto-increment.
#[derive(Parser)]
#[command(name = "compile-action", version)]
struct Cli {
    /// Cloud API access token; omit to compile locally with docker
    #[arg(long, env = "PARTICLE_ACCESS_TOKEN", hide_env_values = true)]
    access_token: Option<String>,

    /// Target platform name (e.g. argon, boron, tracker)
    #[arg(long, env = "PARTICLE_PLATFORM_NAME")]
    platform: String,

    /// Device OS version: default, latest, latest-lts, a fixed version
    /// or a semver range
    #[arg(long, env = "DEVICE_OS_VERSION", default_value = "default")]
    device_os_version: String,

    /// Folder containing the firmware sources
    #[arg(long, env = "SOURCES_FOLDER", default_value = "src")]
    sources_folder: PathBuf,

    /// Auto-increment the product version macro when git history shows
    /// unreleased changes
    #[arg(long, env = "AUTO_VERSION")]
    auto_version: bool,

    /// Name of the embedded version macro
    #[arg(long, env = "VERSION_MACRO_NAME", default_value = DEFAULT_VERSION_MACRO)]
    version_macro_name: String,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let inputs = ActionInputs {
        access_token: cli.access_token.filter(|t| !t.is_empty()),
        platform: cli.platform,
        device_os_version: cli.device_os_version,
        sources_folder: cli.sources_folder,
        auto_version: cli.auto_version,
        version_macro_name: cli.version_macro_name,
    };

    match compile_action(&inputs).await {
        Ok(outputs) => {
            info!("Artifact: {}", outputs.artifact_path.display());
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}
