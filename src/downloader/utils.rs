// Helper functions shared by the resolver and the orchestrator

use std::path::{Path, PathBuf};
use std::process::Command as StdCommand;
use std::process::Stdio;

use tokio::io::AsyncReadExt;
use tokio::process::Command as TokioCommand;
use tokio::time::{timeout, Duration as TokioDuration};

/// Extensions tried when the tool wrote a different container than it reported
pub const FALLBACK_EXTENSIONS: [&str; 4] = ["mp4", "webm", "mkv", "avi"];

/// Run command with timeout (shared utility)
pub async fn run_output_with_timeout(
    program: &str,
    args: Vec<String>,
    timeout_secs: u64,
) -> Result<std::process::Output, String> {
    let mut child = TokioCommand::new(program)
        .args(&args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| format!("Failed to start {}: {}", program, e))?;

    let mut stdout_pipe = child
        .stdout
        .take()
        .ok_or_else(|| format!("Failed to capture stdout from {}", program))?;
    let mut stderr_pipe = child
        .stderr
        .take()
        .ok_or_else(|| format!("Failed to capture stderr from {}", program))?;

    let stdout_task = tokio::spawn(async move {
        let mut buf = Vec::new();
        stdout_pipe
            .read_to_end(&mut buf)
            .await
            .map_err(|e| format!("Failed to read stdout: {}", e))?;
        Ok::<Vec<u8>, String>(buf)
    });
    let stderr_task = tokio::spawn(async move {
        let mut buf = Vec::new();
        stderr_pipe
            .read_to_end(&mut buf)
            .await
            .map_err(|e| format!("Failed to read stderr: {}", e))?;
        Ok::<Vec<u8>, String>(buf)
    });

    let waited = timeout(TokioDuration::from_secs(timeout_secs), child.wait()).await;
    match waited {
        Ok(status_res) => {
            let status = status_res.map_err(|e| format!("Failed to wait for {}: {}", program, e))?;
            let stdout = stdout_task
                .await
                .map_err(|e| format!("stdout task failed: {}", e))??;
            let stderr = stderr_task
                .await
                .map_err(|e| format!("stderr task failed: {}", e))??;
            Ok(std::process::Output { status, stdout, stderr })
        }
        Err(_) => {
            let _ = child.kill().await;
            stdout_task.abort();
            stderr_task.abort();
            Err(format!("Timed out after {}s", timeout_secs))
        }
    }
}

/// Find the yt-dlp binary
pub fn find_ytdlp() -> String {
    let common_paths = [
        "/usr/local/bin/yt-dlp",
        "/usr/bin/yt-dlp",
        "/opt/homebrew/bin/yt-dlp",
    ];

    for path in common_paths {
        if Path::new(path).exists() {
            return path.to_string();
        }
    }

    if let Some(local) = dirs::home_dir().map(|h| h.join(".local/bin/yt-dlp")) {
        if local.exists() {
            return local.to_string_lossy().to_string();
        }
    }

    // Try to find via `which`
    if let Ok(output) = StdCommand::new("which").arg("yt-dlp").output() {
        if output.status.success() {
            if let Ok(path) = String::from_utf8(output.stdout) {
                let trimmed = path.trim();
                if !trimmed.is_empty() {
                    return trimmed.to_string();
                }
            }
        }
    }

    "yt-dlp".to_string()
}

/// Locate a file written as `<stem>.<ext>` in `dir`.
///
/// Tries the reported extension first, then the common containers.
pub fn locate_download(dir: &Path, stem: &str, reported_ext: Option<&str>) -> Option<(PathBuf, String)> {
    let candidates = reported_ext
        .into_iter()
        .chain(FALLBACK_EXTENSIONS.iter().copied());

    for ext in candidates {
        let path = dir.join(format!("{}.{}", stem, ext));
        if path.is_file() {
            return Some((path, ext.to_string()));
        }
    }
    None
}

/// Delete a file, treating "already gone" as success.
/// Returns false only when the file existed and could not be removed.
pub async fn remove_quietly(path: &Path) -> bool {
    match tokio::fs::remove_file(path).await {
        Ok(()) => true,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => true,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Failed to delete file");
            false
        }
    }
}

/// Format seconds as MM:SS, or HH:MM:SS past the hour
pub fn format_duration(seconds: u64) -> String {
    if seconds == 0 {
        return "00:00".to_string();
    }
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;

    if hours > 0 {
        format!("{:02}:{:02}:{:02}", hours, minutes, secs)
    } else {
        format!("{:02}:{:02}", minutes, secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(0), "00:00");
        assert_eq!(format_duration(59), "00:59");
        assert_eq!(format_duration(61), "01:01");
        assert_eq!(format_duration(3725), "01:02:05");
    }

    #[test]
    fn test_locate_prefers_reported_extension() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("abc.mp4"), b"x").unwrap();
        std::fs::write(dir.path().join("abc.webm"), b"x").unwrap();

        let (path, ext) = locate_download(dir.path(), "abc", Some("webm")).unwrap();
        assert_eq!(ext, "webm");
        assert!(path.ends_with("abc.webm"));
    }

    #[test]
    fn test_locate_falls_back_to_known_containers() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("abc.mkv"), b"x").unwrap();

        let (_, ext) = locate_download(dir.path(), "abc", Some("mp4")).unwrap();
        assert_eq!(ext, "mkv");
        assert!(locate_download(dir.path(), "other", None).is_none());
    }

    #[tokio::test]
    async fn test_remove_quietly_tolerates_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gone.mp4");
        assert!(remove_quietly(&path).await);

        std::fs::write(&path, b"x").unwrap();
        assert!(remove_quietly(&path).await);
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_run_output_with_timeout_reports_timeout() {
        let result = run_output_with_timeout("sleep", vec!["5".to_string()], 1).await;
        assert_eq!(result.unwrap_err(), "Timed out after 1s");
    }
}
