use async_trait::async_trait;
use serde::Deserialize;
use tokio::process::Command;
use tracing::debug;

use super::{ProviderError, VideoInfoExtractor};

/// Metadata of a single video as reported by yt-dlp.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct VideoInfo {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub uploader: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

/// Runs the `yt-dlp` executable in metadata-only mode.
pub struct YtDlpExtractor {
    program: String,
}

impl YtDlpExtractor {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

fn parse_info(stdout: &[u8]) -> Result<VideoInfo, ProviderError> {
    Ok(serde_json::from_slice(stdout)?)
}

#[async_trait]
impl VideoInfoExtractor for YtDlpExtractor {
    async fn extract(&self, url: &str) -> Result<VideoInfo, ProviderError> {
        debug!("Extracting video info for {} with {}", url, self.program);

        let output = Command::new(&self.program)
            .args(["--dump-single-json", "--skip-download", "--no-warnings"])
            .arg(url)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| ProviderError::Extractor(format!("failed to run {}: {}", self.program, e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            let message = if stderr.is_empty() {
                format!(
                    "{} exited with code {}",
                    self.program,
                    output.status.code().unwrap_or(-1)
                )
            } else {
                stderr
            };
            return Err(ProviderError::Extractor(message));
        }

        parse_info(&output.stdout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_info_reads_known_fields() {
        let info = parse_info(
            br#"{"id":"abc123","title":"A video","uploader":"Someone","description":"Text","duration":12}"#,
        )
        .unwrap();
        assert_eq!(info.title.as_deref(), Some("A video"));
        assert_eq!(info.uploader.as_deref(), Some("Someone"));
        assert_eq!(info.description.as_deref(), Some("Text"));
    }

    #[test]
    fn test_parse_info_tolerates_missing_fields() {
        let info = parse_info(br#"{"id":"abc123"}"#).unwrap();
        assert_eq!(info, VideoInfo::default());
    }

    #[test]
    fn test_parse_info_rejects_garbage() {
        assert!(matches!(parse_info(b"not json"), Err(ProviderError::Parse(_))));
    }

    #[tokio::test]
    async fn test_missing_program_is_extractor_error() {
        let extractor = YtDlpExtractor::new("definitely-not-a-real-yt-dlp-binary");
        let err = extractor
            .extract("https://www.youtube.com/watch?v=abc123")
            .await
            .unwrap_err();
        match err {
            ProviderError::Extractor(msg) => {
                assert!(msg.contains("failed to run definitely-not-a-real-yt-dlp-binary"))
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_non_zero_exit_is_extractor_error() {
        let extractor = YtDlpExtractor::new("false");
        let err = extractor
            .extract("https://www.youtube.com/watch?v=abc123")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("false exited with code 1"));
    }
}
