use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScanError {
    /// File missing or undecodable. Fatal for that image only; the batch
    /// driver skips it and continues.
    #[error("failed to load image: {0}")]
    ImageLoad(String),

    /// A single OCR invocation failed. Recovered inside the strategy runner
    /// by excluding the attempt from scoring.
    #[error("OCR attempt failed: {0}")]
    OcrEngine(String),

    /// Every attempted OCR strategy failed; no transcript exists for the
    /// image and no record is produced.
    #[error("all OCR strategies failed: {0}")]
    OcrUnavailable(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to write output: {0}")]
    Export(String),
}
