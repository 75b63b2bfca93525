//! Package type classification and technical summary
//!
//! Durations come from an external probe utility (ffprobe by default),
//! run once per file with a timeout.

use avqc_common::config::ProbeConfig;
use avqc_common::models::{PackageType, TechnicalSummary};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use walkdir::WalkDir;

use crate::types::{MediaProbe, ProbeError};

/// ffprobe-backed [`MediaProbe`]
pub struct FfprobeProbe {
    program: String,
    timeout: Duration,
}

impl FfprobeProbe {
    pub fn new(config: &ProbeConfig) -> Self {
        Self {
            program: config.program.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }
}

#[async_trait::async_trait]
impl MediaProbe for FfprobeProbe {
    async fn duration_seconds(&self, path: &Path) -> Result<f64, ProbeError> {
        let child = Command::new(&self.program)
            .args([
                "-v",
                "error",
                "-show_entries",
                "format=duration",
                "-of",
                "default=noprint_wrappers=1:nokey=1",
            ])
            .arg(path)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| ProbeError::Spawn(path.to_path_buf(), e.to_string()))?;

        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| ProbeError::Timeout(path.to_path_buf(), self.timeout.as_secs()))?
            .map_err(|e| ProbeError::Spawn(path.to_path_buf(), e.to_string()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ProbeError::Failed(path.to_path_buf(), stderr.trim().to_string()));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        parse_duration(path, &stdout)
    }
}

/// Parse probe output: one floating-point number of seconds
fn parse_duration(path: &Path, output: &str) -> Result<f64, ProbeError> {
    let text = output.trim();
    match text.parse::<f64>() {
        Ok(seconds) if seconds.is_finite() && seconds >= 0.0 => Ok(seconds),
        _ => Err(ProbeError::Unparsable(path.to_path_buf(), text.to_string())),
    }
}

/// Classify a package by its primary `<refid>.<ext>` file.
///
/// Returns `None` when neither an audio nor a video primary file exists.
pub fn classify_package(entry: &Path, refid: &str) -> Option<PackageType> {
    [PackageType::Audio, PackageType::Video]
        .into_iter()
        .find(|kind| entry.join(format!("{}.{}", refid, kind.primary_extension())).is_file())
}

/// Files directly inside `entry` with the given extension, sorted by path
pub fn matching_files(entry: &Path, extension: &str) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(entry)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| {
            p.extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| ext == extension)
        })
        .collect();
    files.sort();
    files
}

/// Sum of probed durations; any probe failure fails the whole sum
pub async fn total_duration(probe: &dyn MediaProbe, files: &[PathBuf]) -> Result<f64, ProbeError> {
    let mut total = 0.0;
    for file in files {
        let seconds = probe.duration_seconds(file).await?;
        tracing::debug!(file = %file.display(), seconds, "Probed duration");
        total += seconds;
    }
    Ok(total)
}

/// Compute access/master durations and the multiple-master flag
pub async fn technical_summary(
    probe: &dyn MediaProbe,
    entry: &Path,
    package_type: PackageType,
) -> Result<TechnicalSummary, ProbeError> {
    let access_files = matching_files(entry, package_type.access_extension());
    let master_files = matching_files(entry, package_type.master_extension());

    Ok(TechnicalSummary {
        duration_access: total_duration(probe, &access_files).await?,
        duration_master: total_duration(probe, &master_files).await?,
        multiple_masters: master_files.len() > 1,
    })
}
