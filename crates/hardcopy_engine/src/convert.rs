use std::path::Path;
use std::process::Stdio;

use engine_logging::engine_debug;
use tokio::process::Command;

use crate::PipelineError;

/// Converts a downloaded image into a format the typesetter accepts.
#[async_trait::async_trait]
pub trait ImageConverter: Send + Sync {
    async fn convert(&self, source: &Path, target: &Path) -> Result<(), PipelineError>;
}

/// Runs `ffmpeg -i source target`; the target format follows its extension.
#[derive(Debug, Clone)]
pub struct FfmpegConverter {
    program: String,
}

impl FfmpegConverter {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Default for FfmpegConverter {
    fn default() -> Self {
        Self::new("ffmpeg")
    }
}

#[async_trait::async_trait]
impl ImageConverter for FfmpegConverter {
    async fn convert(&self, source: &Path, target: &Path) -> Result<(), PipelineError> {
        engine_debug!("Converting {:?} to {:?} with {}", source, target, self.program);
        let output = Command::new(&self.program)
            .args(["-hide_banner", "-loglevel", "error", "-i"])
            .arg(source)
            .arg(target)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|err| PipelineError::Conversion {
                path: source.to_path_buf(),
                message: format!("failed to start {}: {err}", self.program),
            })?;

        if output.status.success() {
            Ok(())
        } else {
            Err(PipelineError::Conversion {
                path: source.to_path_buf(),
                message: format!(
                    "{} exited with {}: {}",
                    self.program,
                    output.status,
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            })
        }
    }
}
