use thiserror::Error;

/// Report generation failures. Rendering is pure, so retrying with the same
/// input is always safe.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("PDF rendering failed: {0}")]
    Pdf(String),

    #[error("CSV export failed: {0}")]
    Csv(String),
}

impl From<csv::Error> for RenderError {
    fn from(err: csv::Error) -> Self {
        RenderError::Csv(err.to_string())
    }
}
