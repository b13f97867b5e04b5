//! PlanRenderer trait definition.
//!
//! The boundary to PDF conversion: HTML in, PDF bytes out, no persisted
//! state. The concrete implementation lives in paraclete-infra
//! (`WkhtmltopdfRenderer`).

use paraclete_types::error::RenderError;

/// Converts an HTML document into PDF bytes.
///
/// Uses native async fn in traits (RPITIT, Rust 2024 edition).
pub trait PlanRenderer: Send + Sync {
    fn render(
        &self,
        html: &str,
    ) -> impl std::future::Future<Output = Result<Vec<u8>, RenderError>> + Send;
}
