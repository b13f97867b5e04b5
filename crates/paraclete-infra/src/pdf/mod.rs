//! wkhtmltopdf plan renderer.
//!
//! Implements [`PlanRenderer`] by piping the HTML document through the
//! `wkhtmltopdf` binary (`wkhtmltopdf - -`): HTML on stdin, PDF bytes on
//! stdout. Nothing touches the filesystem and nothing is persisted.

use std::process::Stdio;

use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

use paraclete_core::plan::renderer::PlanRenderer;
use paraclete_types::error::RenderError;

/// Shells out to wkhtmltopdf for HTML-to-PDF conversion.
pub struct WkhtmltopdfRenderer {
    binary: String,
}

impl WkhtmltopdfRenderer {
    /// Create a renderer using the given binary path (usually just
    /// `wkhtmltopdf`, resolved via PATH).
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

impl PlanRenderer for WkhtmltopdfRenderer {
    async fn render(&self, html: &str) -> Result<Vec<u8>, RenderError> {
        let mut child = Command::new(&self.binary)
            .arg("--quiet")
            .arg("-")
            .arg("-")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| RenderError::Unavailable(format!("{}: {e}", self.binary)))?;

        // Feed the document and close stdin so the process can finish.
        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| RenderError::Failed("child stdin not captured".to_string()))?;
        stdin
            .write_all(html.as_bytes())
            .await
            .map_err(|e| RenderError::Failed(format!("writing to renderer: {e}")))?;
        drop(stdin);

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| RenderError::Failed(format!("waiting for renderer: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(RenderError::Failed(format!(
                "{} exited with {}: {}",
                self.binary,
                output.status,
                stderr.trim()
            )));
        }

        debug!(bytes = output.stdout.len(), "pdf rendered");
        Ok(output.stdout)
    }
}
