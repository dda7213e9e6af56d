// Helper functions shared by the extractor and the shell

use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::io::AsyncReadExt;
use tokio::process::Command as TokioCommand;
use tokio::time::{timeout, Duration as TokioDuration};

use super::errors::DownloadError;

/// Run command with timeout, collecting stdout and stderr
pub async fn run_output_with_timeout(
    program: &str,
    args: &[String],
    timeout_secs: u64,
) -> Result<std::process::Output, DownloadError> {
    tracing::debug!("Running {} {}", program, args.join(" "));

    let mut child = TokioCommand::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|source| spawn_error(program, source))?;

    let mut stdout_pipe = child.stdout.take().ok_or_else(|| DownloadError::Execution {
        program: program.to_string(),
        source: std::io::Error::new(std::io::ErrorKind::Other, "stdout not captured"),
    })?;
    let mut stderr_pipe = child.stderr.take().ok_or_else(|| DownloadError::Execution {
        program: program.to_string(),
        source: std::io::Error::new(std::io::ErrorKind::Other, "stderr not captured"),
    })?;

    let stdout_task = tokio::spawn(async move {
        let mut buf = Vec::new();
        stdout_pipe.read_to_end(&mut buf).await.map(|_| buf)
    });
    let stderr_task = tokio::spawn(async move {
        let mut buf = Vec::new();
        stderr_pipe.read_to_end(&mut buf).await.map(|_| buf)
    });

    let waited = timeout(TokioDuration::from_secs(timeout_secs), child.wait()).await;
    match waited {
        Ok(status_res) => {
            let exec_err = |source| DownloadError::Execution {
                program: program.to_string(),
                source,
            };
            let status = status_res.map_err(exec_err)?;
            let stdout = join_pipe(stdout_task).await.map_err(exec_err)?;
            let stderr = join_pipe(stderr_task).await.map_err(exec_err)?;
            Ok(std::process::Output { status, stdout, stderr })
        }
        Err(_) => {
            tracing::warn!("{} timed out after {}s, killing it", program, timeout_secs);
            let _ = child.kill().await;
            stdout_task.abort();
            stderr_task.abort();
            Err(DownloadError::Timeout(timeout_secs))
        }
    }
}

async fn join_pipe(
    task: tokio::task::JoinHandle<std::io::Result<Vec<u8>>>,
) -> std::io::Result<Vec<u8>> {
    task.await
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?
}

/// Missing binaries become `ToolNotFound`, everything else `Execution`
pub(crate) fn spawn_error(program: &str, source: std::io::Error) -> DownloadError {
    if source.kind() == std::io::ErrorKind::NotFound {
        DownloadError::ToolNotFound(format!("{} ({})", program, source))
    } else {
        DownloadError::Execution {
            program: program.to_string(),
            source,
        }
    }
}

/// Expand a leading `~` to the home directory
pub fn expand_home(path: &str) -> PathBuf {
    let trimmed = path.trim();
    if trimmed == "~" {
        if let Some(home) = dirs::home_dir() {
            return home;
        }
    } else if let Some(rest) = trimmed.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(trimmed)
}

/// Lossy display form of a path, for prompts and args
pub fn display_path(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_home() {
        let home = dirs::home_dir();
        if let Some(home) = home {
            assert_eq!(expand_home("~"), home);
            assert_eq!(expand_home("~/Videos"), home.join("Videos"));
        }
        assert_eq!(expand_home(" /tmp/videos "), PathBuf::from("/tmp/videos"));
        assert_eq!(expand_home("~user/x"), PathBuf::from("~user/x"));
    }

    #[tokio::test]
    async fn test_missing_binary_is_tool_not_found() {
        let result =
            run_output_with_timeout("definitely-not-a-real-binary-vidgrab", &[], 5).await;
        assert!(matches!(result, Err(DownloadError::ToolNotFound(_))));
    }
}
