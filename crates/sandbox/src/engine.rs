//! Sandbox execution engine.
//!
//! One container per job: the submitted source is instrumented so `/output`
//! always exists, run with the network disabled and memory/PID caps, and
//! waited on under a hard wall-clock deadline. After exit the stdout/stderr
//! streams are captured and every PNG under `/output` is pulled out of the
//! container as a tar stream; if that fetch fails, the bind-mounted host
//! directory is scanned instead.

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use bollard::container::{
    Config, DownloadFromContainerOptions, KillContainerOptions, LogsOptions,
    RemoveContainerOptions, WaitContainerOptions,
};
use bollard::image::CreateImageOptions;
use bollard::models::HostConfig;
use bollard::Docker;
use futures::StreamExt;

use optiflow_core::codec;
use optiflow_core::error::{Error, Result};
use optiflow_core::messages::{ExecutionReport, ExecutionStatus, SandboxResultMessage};

// =============================================================================
// Sandbox Types
// =============================================================================

/// Configuration for the code sandbox.
#[derive(Debug, Clone)]
pub struct SandboxConfig {
    /// Container image code jobs run in.
    pub image: String,
    /// Hard wall-clock limit for one execution.
    pub timeout: Duration,
    /// Maximum memory in bytes.
    pub memory_limit: i64,
    /// Maximum number of processes.
    pub pids_limit: i64,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            image: "optiflow-sandbox:latest".to_string(),
            timeout: Duration::from_secs(10),
            memory_limit: 256 * 1024 * 1024, // 256MB
            pids_limit: 100,
        }
    }
}

impl SandboxConfig {
    /// Config for the given image, other limits at their defaults.
    pub fn with_image(image: impl Into<String>) -> Self {
        Self {
            image: image.into(),
            ..Default::default()
        }
    }
}

/// Result of executing a code job.
#[derive(Debug, Clone)]
pub struct ExecutionOutcome {
    /// Exit code, -1 for timeouts and runtime-level failures.
    pub status_code: i64,
    pub stdout: String,
    pub stderr: String,
    pub status: ExecutionStatus,
    /// Basename → raw bytes of every PNG written to `/output`.
    pub generated_files: BTreeMap<String, Vec<u8>>,
}

impl ExecutionOutcome {
    /// A runtime-level failure with no streams captured.
    pub fn failure(stderr: impl Into<String>) -> Self {
        Self {
            status_code: -1,
            stdout: String::new(),
            stderr: stderr.into(),
            status: ExecutionStatus::Failed,
            generated_files: BTreeMap::new(),
        }
    }

    /// The wall-clock deadline expired.
    pub fn timeout(limit: Duration) -> Self {
        Self::failure(format!(
            "Timeout error: Code execution exceeded {} seconds.",
            limit.as_secs()
        ))
    }

    /// Encode as the wire reply for `job_id`. Files become base64; an empty
    /// mapping is omitted entirely.
    pub fn into_message(self, job_id: impl Into<String>) -> SandboxResultMessage {
        let generated_files = if self.generated_files.is_empty() {
            None
        } else {
            Some(
                self.generated_files
                    .iter()
                    .map(|(name, bytes)| (name.clone(), codec::encode_file_bytes(bytes)))
                    .collect(),
            )
        };
        SandboxResultMessage {
            job_id: job_id.into(),
            status: self.status,
            generated_code: ExecutionReport {
                status_code: self.status_code,
                stdout: self.stdout,
                stderr: self.stderr,
                generated_files,
            },
        }
    }
}

// =============================================================================
// Code Sandbox
// =============================================================================

/// Docker-backed sandbox. Holds one client to the local daemon; containers
/// are created per job and removed on every exit path.
pub struct CodeSandbox {
    docker: Docker,
    config: SandboxConfig,
}

impl CodeSandbox {
    /// Connect to the local Docker daemon and make sure the configured image
    /// is present, pulling it if needed. Fails fast so a worker never starts
    /// with a sandbox it cannot use.
    pub async fn new(config: SandboxConfig) -> Result<Self> {
        let docker = Docker::connect_with_local_defaults().map_err(|e| {
            Error::sandbox(format!(
                "Failed to connect to Docker daemon: {}. Is Docker running and /var/run/docker.sock accessible?",
                e
            ))
        })?;

        docker
            .ping()
            .await
            .map_err(|e| Error::sandbox(format!("Docker daemon not responding: {}", e)))?;

        let sandbox = Self { docker, config };
        sandbox.ensure_image().await?;
        Ok(sandbox)
    }

    async fn ensure_image(&self) -> Result<()> {
        match self.docker.inspect_image(&self.config.image).await {
            Ok(_) => {
                tracing::info!(image = %self.config.image, "sandbox image found locally");
                Ok(())
            }
            Err(bollard::errors::Error::DockerResponseServerError {
                status_code: 404, ..
            }) => {
                tracing::info!(image = %self.config.image, "sandbox image not found locally, pulling");
                let mut stream = self.docker.create_image(
                    Some(CreateImageOptions {
                        from_image: self.config.image.clone(),
                        ..Default::default()
                    }),
                    None,
                    None,
                );
                while let Some(progress) = stream.next().await {
                    progress.map_err(|e| {
                        Error::sandbox(format!(
                            "Failed to pull image '{}': {}",
                            self.config.image, e
                        ))
                    })?;
                }
                tracing::info!(image = %self.config.image, "sandbox image pulled");
                Ok(())
            }
            Err(e) => Err(Error::sandbox(format!(
                "Failed to inspect image '{}': {}",
                self.config.image, e
            ))),
        }
    }

    /// Execute one code job. Infrastructure failures fold into a
    /// CODE_FAILED outcome rather than an error; the caller always gets a
    /// publishable result.
    pub async fn run(&self, code: &str) -> ExecutionOutcome {
        // Host directory bind-mounted at /output; a fallback artifact path
        // when the tar fetch fails. Deleted on drop.
        let output_dir = match tempfile::Builder::new().prefix("sandbox_").tempdir() {
            Ok(dir) => dir,
            Err(e) => {
                return ExecutionOutcome::failure(format!(
                    "Failed to create output directory: {}",
                    e
                ))
            }
        };

        let container_id = match self.create_container(code, output_dir.path()).await {
            Ok(id) => id,
            Err(e) => return ExecutionOutcome::failure(e.to_string()),
        };

        let outcome = self.execute(&container_id, output_dir.path()).await;

        self.remove_container(&container_id).await;
        outcome
    }

    async fn create_container(&self, code: &str, output_dir: &Path) -> Result<String> {
        let host_config = HostConfig {
            network_mode: Some("none".to_string()),
            memory: Some(self.config.memory_limit),
            pids_limit: Some(self.config.pids_limit),
            binds: Some(vec![format!("{}:/output:rw", output_dir.display())]),
            ..Default::default()
        };

        let container_config = Config {
            image: Some(self.config.image.clone()),
            cmd: Some(vec![
                "python3".to_string(),
                "-c".to_string(),
                instrument_code(code),
            ]),
            host_config: Some(host_config),
            ..Default::default()
        };

        let container = self
            .docker
            .create_container::<String, String>(None, container_config)
            .await
            .map_err(|e| Error::sandbox(format!("Failed to create container: {}", e)))?;

        Ok(container.id)
    }

    async fn execute(&self, container_id: &str, output_dir: &Path) -> ExecutionOutcome {
        if let Err(e) = self
            .docker
            .start_container::<String>(container_id, None)
            .await
        {
            return ExecutionOutcome::failure(format!("Failed to start container: {}", e));
        }

        let mut wait_stream = self
            .docker
            .wait_container(container_id, None::<WaitContainerOptions<String>>);

        let status_code =
            match tokio::time::timeout(self.config.timeout, wait_stream.next()).await {
                Err(_) => {
                    tracing::warn!(container = %container_id, "execution deadline expired, killing container");
                    if let Err(e) = self
                        .docker
                        .kill_container(container_id, None::<KillContainerOptions<String>>)
                        .await
                    {
                        tracing::warn!(error = %e, "kill after timeout failed");
                    }
                    return ExecutionOutcome::timeout(self.config.timeout);
                }
                Ok(None) => -1,
                Ok(Some(Ok(response))) => response.status_code,
                // A non-zero exit code surfaces as a wait "error" carrying it.
                Ok(Some(Err(bollard::errors::Error::DockerContainerWaitError {
                    code, ..
                }))) => code,
                Ok(Some(Err(e))) => {
                    return ExecutionOutcome::failure(format!("Failed to wait for container: {}", e))
                }
            };

        let stdout = self.collect_log(container_id, true).await;
        let stderr = self.collect_log(container_id, false).await;

        let status = if status_code == 0 {
            ExecutionStatus::Executed
        } else {
            ExecutionStatus::Failed
        };

        let generated_files = self.collect_artifacts(container_id, output_dir).await;
        tracing::info!(
            container = %container_id,
            status_code,
            files = generated_files.len(),
            "code job finished"
        );

        ExecutionOutcome {
            status_code,
            stdout,
            stderr,
            status,
            generated_files,
        }
    }

    async fn collect_log(&self, container_id: &str, want_stdout: bool) -> String {
        let options = LogsOptions::<String> {
            stdout: want_stdout,
            stderr: !want_stdout,
            ..Default::default()
        };
        let mut stream = self.docker.logs(container_id, Some(options));
        let mut collected = String::new();
        while let Some(chunk) = stream.next().await {
            match chunk {
                Ok(output) => {
                    collected.push_str(&String::from_utf8_lossy(&output.into_bytes()));
                }
                Err(e) => {
                    tracing::warn!(error = %e, "log stream failed");
                    break;
                }
            }
        }
        collected.trim().to_string()
    }

    /// Primary path: fetch `/output` from the container as a tar stream and
    /// pick out PNG members. Fallback: walk the bind-mounted host directory.
    async fn collect_artifacts(
        &self,
        container_id: &str,
        output_dir: &Path,
    ) -> BTreeMap<String, Vec<u8>> {
        match self.download_output_tar(container_id).await {
            Ok(tar_bytes) => match extract_png_members(&tar_bytes) {
                Ok(files) => files,
                Err(e) => {
                    tracing::warn!(error = %e, "tar extraction failed, scanning bind mount");
                    scan_host_dir(output_dir)
                }
            },
            Err(e) => {
                tracing::warn!(error = %e, "tar fetch failed, scanning bind mount");
                scan_host_dir(output_dir)
            }
        }
    }

    async fn download_output_tar(&self, container_id: &str) -> Result<Vec<u8>> {
        let mut stream = self.docker.download_from_container(
            container_id,
            Some(DownloadFromContainerOptions { path: "/output" }),
        );
        let mut tar_bytes = Vec::new();
        while let Some(chunk) = stream.next().await {
            let chunk =
                chunk.map_err(|e| Error::sandbox(format!("tar download failed: {}", e)))?;
            tar_bytes.extend_from_slice(&chunk);
        }
        Ok(tar_bytes)
    }

    async fn remove_container(&self, container_id: &str) {
        if let Err(e) = self
            .docker
            .remove_container(
                container_id,
                Some(RemoveContainerOptions {
                    force: true,
                    ..Default::default()
                }),
            )
            .await
        {
            tracing::warn!(container = %container_id, error = %e, "container removal failed");
        }
    }
}

/// Prepend a directory-ensure step so `/output` exists even when the user
/// code never creates it.
fn instrument_code(code: &str) -> String {
    format!("import os\nos.makedirs('/output', exist_ok=True)\n\n{}\n", code)
}

/// Collect `basename → bytes` for every regular tar member ending in `.png`
/// (case-insensitive).
fn extract_png_members(tar_bytes: &[u8]) -> std::io::Result<BTreeMap<String, Vec<u8>>> {
    use std::io::Read;

    let mut files = BTreeMap::new();
    let mut archive = tar::Archive::new(tar_bytes);
    for entry in archive.entries()? {
        let mut entry = entry?;
        if !entry.header().entry_type().is_file() {
            continue;
        }
        let path = entry.path()?;
        let Some(name) = path.file_name().and_then(|n| n.to_str()).map(String::from) else {
            continue;
        };
        if !is_png_name(&name) {
            continue;
        }
        let mut bytes = Vec::new();
        entry.read_to_end(&mut bytes)?;
        files.insert(name, bytes);
    }
    Ok(files)
}

/// Walk the host output directory for PNG files.
fn scan_host_dir(dir: &Path) -> BTreeMap<String, Vec<u8>> {
    let mut files = BTreeMap::new();
    let mut pending = vec![dir.to_path_buf()];
    while let Some(current) = pending.pop() {
        let Ok(entries) = std::fs::read_dir(&current) else {
            continue;
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                pending.push(path);
                continue;
            }
            let Some(name) = path.file_name().and_then(|n| n.to_str()).map(String::from) else {
                continue;
            };
            if !is_png_name(&name) {
                continue;
            }
            match std::fs::read(&path) {
                Ok(bytes) => {
                    files.insert(name, bytes);
                }
                Err(e) => {
                    tracing::warn!(file = %path.display(), error = %e, "artifact read failed");
                }
            }
        }
    }
    files
}

fn is_png_name(name: &str) -> bool {
    name.to_ascii_lowercase().ends_with(".png")
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_MAGIC: &[u8] = &[0x89, 0x50, 0x4e, 0x47, 0x0d, 0x0a, 0x1a, 0x0a];

    fn tar_with(entries: &[(&str, &[u8])]) -> Vec<u8> {
        let mut builder = tar::Builder::new(Vec::new());
        for (name, data) in entries {
            let mut header = tar::Header::new_gnu();
            header.set_size(data.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            builder.append_data(&mut header, name, *data).unwrap();
        }
        builder.into_inner().unwrap()
    }

    #[test]
    fn instrumented_code_ensures_output_dir_before_user_code() {
        let code = instrument_code("print('hi')");
        let makedirs = code.find("os.makedirs('/output'").unwrap();
        let user = code.find("print('hi')").unwrap();
        assert!(makedirs < user);
    }

    #[test]
    fn png_member_keys_are_basenames() {
        let tar_bytes = tar_with(&[
            ("output/plots/result.png", PNG_MAGIC),
            ("output/readme.txt", b"not a png"),
            ("output/UPPER.PNG", PNG_MAGIC),
        ]);
        let files = extract_png_members(&tar_bytes).unwrap();
        assert_eq!(files.len(), 2);
        assert!(files.contains_key("result.png"));
        assert!(files.contains_key("UPPER.PNG"));
        assert!(files.keys().all(|k| !k.contains('/')));
        assert!(files["result.png"].starts_with(PNG_MAGIC));
    }

    #[test]
    fn host_dir_scan_finds_nested_pngs() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("nested")).unwrap();
        std::fs::write(dir.path().join("nested/deep.png"), PNG_MAGIC).unwrap();
        std::fs::write(dir.path().join("skip.txt"), b"no").unwrap();

        let files = scan_host_dir(dir.path());
        assert_eq!(files.len(), 1);
        assert_eq!(files["deep.png"], PNG_MAGIC);
    }

    #[test]
    fn outcome_without_files_omits_the_mapping() {
        let outcome = ExecutionOutcome {
            status_code: 0,
            stdout: "done".into(),
            stderr: String::new(),
            status: ExecutionStatus::Executed,
            generated_files: BTreeMap::new(),
        };
        let message = outcome.into_message("job-1");
        assert_eq!(message.status, ExecutionStatus::Executed);
        assert!(message.generated_code.generated_files.is_none());
    }

    #[test]
    fn outcome_files_are_base64_on_the_wire() {
        use base64::Engine as _;

        let mut generated_files = BTreeMap::new();
        generated_files.insert("plot.png".to_string(), PNG_MAGIC.to_vec());
        let outcome = ExecutionOutcome {
            status_code: 0,
            stdout: String::new(),
            stderr: String::new(),
            status: ExecutionStatus::Executed,
            generated_files,
        };
        let message = outcome.into_message("job-2");
        let files = message.generated_code.generated_files.unwrap();
        let decoded = base64::engine::general_purpose::STANDARD
            .decode(&files["plot.png"])
            .unwrap();
        assert_eq!(decoded, PNG_MAGIC);
    }

    #[test]
    fn timeout_outcome_carries_the_limit() {
        let outcome = ExecutionOutcome::timeout(Duration::from_secs(10));
        assert_eq!(outcome.status_code, -1);
        assert_eq!(outcome.status, ExecutionStatus::Failed);
        assert!(outcome
            .stderr
            .contains("Timeout error: Code execution exceeded 10 seconds."));
    }

    #[test]
    fn failure_outcome_shape() {
        let outcome = ExecutionOutcome::failure("boom");
        assert_eq!(outcome.status_code, -1);
        assert!(outcome.stdout.is_empty());
        assert_eq!(outcome.stderr, "boom");
        assert_eq!(outcome.status, ExecutionStatus::Failed);
    }

    #[test]
    fn default_limits() {
        let config = SandboxConfig::default();
        assert_eq!(config.image, "optiflow-sandbox:latest");
        assert_eq!(config.timeout, Duration::from_secs(10));
        assert_eq!(config.memory_limit, 256 * 1024 * 1024);
        assert_eq!(config.pids_limit, 100);
    }
}
