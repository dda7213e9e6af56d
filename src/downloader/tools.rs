// yt-dlp discovery and version query

use std::path::Path;
use std::process::Command;

use super::errors::DownloadError;
use super::utils::run_output_with_timeout;

const BINARY_NAME: &str = "yt-dlp";

pub struct ToolManager;

impl ToolManager {
    pub fn new() -> Self {
        Self
    }

    /// Path of the yt-dlp binary to run. An explicit override wins;
    /// otherwise common install locations, then `which`, then the bare
    /// name so the OS search path decides.
    pub fn locate(&self, override_path: Option<&str>) -> String {
        if let Some(path) = override_path.filter(|p| !p.trim().is_empty()) {
            return path.trim().to_string();
        }
        self.detect_path().unwrap_or_else(|| BINARY_NAME.to_string())
    }

    fn detect_path(&self) -> Option<String> {
        // 1. Try common paths first
        let common_paths = [
            format!("/opt/homebrew/bin/{}", BINARY_NAME),
            format!("/usr/local/bin/{}", BINARY_NAME),
            format!("/usr/bin/{}", BINARY_NAME),
        ];

        for path in common_paths {
            if Path::new(&path).exists() {
                return Some(path);
            }
        }

        // 2. Try PATH
        if let Ok(output) = Command::new("which").arg(BINARY_NAME).output() {
            if output.status.success() {
                let path = String::from_utf8_lossy(&output.stdout).trim().to_string();
                if !path.is_empty() {
                    return Some(path);
                }
            }
        }

        None
    }
}

impl Default for ToolManager {
    fn default() -> Self {
        Self::new()
    }
}

/// `yt-dlp --version` without blocking the runtime
pub async fn installed_version(program: &str) -> Result<String, DownloadError> {
    let output = run_output_with_timeout(program, &["--version".to_string()], 15).await?;
    if !output.status.success() {
        return Err(DownloadError::from(
            String::from_utf8_lossy(&output.stderr).to_string(),
        ));
    }

    let version = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if version.is_empty() {
        return Err(DownloadError::Parse("empty version output".to_string()));
    }
    Ok(version)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_override_wins() {
        let manager = ToolManager::new();
        assert_eq!(manager.locate(Some("/custom/yt-dlp")), "/custom/yt-dlp");
        assert_ne!(manager.locate(Some("  ")), "  ");
    }

    #[tokio::test]
    async fn test_version_of_missing_binary() {
        let result = installed_version("/nonexistent/yt-dlp").await;
        assert!(matches!(result, Err(DownloadError::ToolNotFound(_))));
    }
}
