//! Document pass-through via pandoc.

use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;
use tokio::time::{timeout, Duration};

use super::config::ConverterConfig;
use super::error::EncodeError;
use super::traits::Encoder;
use super::types::DocumentParams;

/// Converts documents between formats by shelling out to pandoc.
///
/// No parameters vary here; documents never go through the size search.
#[derive(Debug, Clone)]
pub struct PandocConverter {
    config: ConverterConfig,
}

impl PandocConverter {
    pub fn new(config: ConverterConfig) -> Self {
        Self { config }
    }

    pub fn with_defaults() -> Self {
        Self::new(ConverterConfig::default())
    }

    fn build_args(input: &Path, output: &Path, params: &DocumentParams) -> Vec<String> {
        let mut args = vec![input.to_string_lossy().to_string()];
        // pandoc infers most writers from the extension; plain text needs to be explicit.
        if params.format == "txt" {
            args.extend(["-t".to_string(), "plain".to_string()]);
        }
        args.extend(["-o".to_string(), output.to_string_lossy().to_string()]);
        args
    }
}

#[async_trait]
impl Encoder<DocumentParams> for PandocConverter {
    fn name(&self) -> &str {
        "pandoc"
    }

    async fn encode(
        &self,
        source: &Path,
        destination: &Path,
        params: &DocumentParams,
    ) -> Result<u64, EncodeError> {
        if !tokio::fs::try_exists(source).await.unwrap_or(false) {
            return Err(EncodeError::InputNotFound {
                path: source.to_path_buf(),
            });
        }

        let args = Self::build_args(source, destination, params);
        let child = Command::new(&self.config.pandoc_path)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output();

        let output = timeout(Duration::from_secs(self.config.timeout_secs), child)
            .await
            .map_err(|_| EncodeError::Timeout {
                timeout_secs: self.config.timeout_secs,
            })?
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    EncodeError::EncoderNotFound {
                        path: self.config.pandoc_path.clone(),
                    }
                } else {
                    EncodeError::Io(e)
                }
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(EncodeError::encode_failed(
                format!("pandoc exited with code: {:?}", output.status.code()),
                (!stderr.is_empty()).then_some(stderr),
            ));
        }

        let meta = tokio::fs::metadata(destination)
            .await
            .map_err(|_| EncodeError::encode_failed("Output file not created", None))?;
        Ok(meta.len())
    }
}
