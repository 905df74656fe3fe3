//! Remote compilation against the cloud build service.
//!
//! Thin client for the two calls the orchestrator needs: submit the
//! source file set for compilation and download the produced binary.
//! When the compiler itself rejects the code, its stdout and error
//! list are surfaced in the failure.

use std::fs;
use std::path::Path;

use reqwest::multipart;
use serde::Deserialize;
use tracing::{error, info};

use crate::error::{ActionError, Result};
use crate::platform::platform_id;
use crate::sources::collect_source_files;

/// Default cloud API endpoint.
pub const DEFAULT_API_URL: &str = "https://api.particle.io";

#[derive(Debug, Deserialize)]
struct CompileResponse {
    #[serde(default)]
    binary_id: Option<String>,
    #[serde(default)]
    output: Option<String>,
    #[serde(default)]
    errors: Option<serde_json::Value>,
}

pub struct CloudClient {
    base_url: String,
    token: String,
    http: reqwest::Client,
}

impl CloudClient {
    pub fn new(token: impl Into<String>) -> Result<Self> {
        Self::with_base_url(DEFAULT_API_URL, token)
    }

    pub fn with_base_url(base_url: impl Into<String>, token: impl Into<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("compile-action/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ActionError::Cloud(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            base_url: base_url.into(),
            token: token.into(),
            http,
        })
    }

    /// Submit the source file set for compilation and return the
    /// binary id of the produced artifact.
    pub async fn compile(
        &self,
        sources: &Path,
        platform: &str,
        target_version: &str,
    ) -> Result<String> {
        info!("Compiling code in {}", sources.display());

        let pid = platform_id(platform)?;
        let files = collect_source_files(sources)?;

        info!("Compiling code for platform '{platform}' with target version '{target_version}'");
        info!("Files: {:?}", files.keys().collect::<Vec<_>>());

        let mut form = multipart::Form::new()
            .text("platform_id", pid.to_string())
            .text("build_target_version", target_version.to_string());

        for (index, (relative, path)) in files.iter().enumerate() {
            let part_name = if index == 0 {
                "file".to_string()
            } else {
                format!("file{}", index + 1)
            };
            let bytes = fs::read(path)?;
            form = form.part(part_name, multipart::Part::bytes(bytes).file_name(relative.clone()));
        }

        let response = self
            .http
            .post(format!("{}/v1/binaries", self.base_url))
            .bearer_auth(&self.token)
            .multipart(form)
            .send()
            .await
            .map_err(|e| ActionError::Cloud(format!("Compile request failed: {e}")))?;

        let status = response.status();
        let body: CompileResponse = response
            .json()
            .await
            .map_err(|e| ActionError::Cloud(format!("Unknown response from the cloud: {e}")))?;

        match body.binary_id {
            Some(binary_id) => {
                info!("Code compiled successfully. Binary ID: '{binary_id}'");
                Ok(binary_id)
            }
            None => {
                // Compiler rejections carry the compiler's stdout and
                // an error list; show them instead of the raw HTTP
                // status.
                if let (Some(output), Some(errors)) = (&body.output, &body.errors) {
                    error!("{output}\n{errors}");
                    Err(ActionError::Cloud(format!("{output}\n{errors}")))
                } else {
                    Err(ActionError::Cloud(format!(
                        "Unknown response from the cloud: HTTP {status}"
                    )))
                }
            }
        }
    }

    /// Download a compiled binary into `dest_dir/firmware.bin` and
    /// return its path.
    pub async fn download_binary(
        &self,
        binary_id: &str,
        dest_dir: &Path,
    ) -> Result<std::path::PathBuf> {
        info!("Downloading binary {binary_id}");

        let response = self
            .http
            .get(format!("{}/v1/binaries/{binary_id}", self.base_url))
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| ActionError::Cloud(format!("Download request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(ActionError::Cloud(format!(
                "Failed to download binary {binary_id}: HTTP {}",
                response.status()
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| ActionError::Cloud(format!("Failed to read binary body: {e}")))?;
        info!("Binary downloaded successfully.");

        if !dest_dir.exists() {
            info!("Creating directory {}...", dest_dir.display());
            fs::create_dir_all(dest_dir)?;
        }
        let output_path = dest_dir.join("firmware.bin");
        fs::write(&output_path, &bytes)?;

        info!("File written to {} successfully.", output_path.display());
        Ok(output_path)
    }
}
