use std::io::{Cursor, Write};

use image::{GrayImage, ImageFormat};
use tempfile::NamedTempFile;
use tesseract::{PageSegMode, Tesseract};

use crate::utils::ScanError;

/// How the OCR engine partitions the page into text regions before
/// transcribing. The ids show up in strategy labels and diagnostic dumps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentationMode {
    /// Automatic segmentation with orientation/script detection.
    AutoOsd,
    /// Fully automatic page segmentation.
    Auto,
    /// Assume a single column of text.
    SingleColumn,
    /// Assume a single uniform block of text.
    SingleBlock,
    /// Find sparse text in no particular order.
    SparseText,
}

impl SegmentationMode {
    pub fn id(&self) -> &'static str {
        match self {
            SegmentationMode::AutoOsd => "psm1",
            SegmentationMode::Auto => "psm3",
            SegmentationMode::SingleColumn => "psm4",
            SegmentationMode::SingleBlock => "psm6",
            SegmentationMode::SparseText => "psm11",
        }
    }
}

impl From<SegmentationMode> for PageSegMode {
    fn from(mode: SegmentationMode) -> PageSegMode {
        match mode {
            SegmentationMode::AutoOsd => PageSegMode::PsmAutoOsd,
            SegmentationMode::Auto => PageSegMode::PsmAuto,
            SegmentationMode::SingleColumn => PageSegMode::PsmSingleColumn,
            SegmentationMode::SingleBlock => PageSegMode::PsmSingleBlock,
            SegmentationMode::SparseText => PageSegMode::PsmSparseText,
        }
    }
}

/// The OCR collaborator. The pipeline only ever talks to this trait; the
/// tesseract binding below is the production implementation.
pub trait OcrEngine {
    fn recognize(&self, image: &GrayImage, mode: SegmentationMode) -> Result<String, ScanError>;
}

/// Engine configuration, threaded in at construction time. `datapath` points
/// at the tessdata directory when the system default is not usable.
#[derive(Debug, Clone)]
pub struct OcrConfig {
    pub datapath: Option<String>,
    pub language: String,
}

impl Default for OcrConfig {
    fn default() -> Self {
        OcrConfig {
            datapath: None,
            language: "spa".to_string(),
        }
    }
}

pub struct TesseractEngine {
    config: OcrConfig,
}

impl TesseractEngine {
    pub fn new(config: OcrConfig) -> Self {
        TesseractEngine { config }
    }
}

impl OcrEngine for TesseractEngine {
    fn recognize(&self, image: &GrayImage, mode: SegmentationMode) -> Result<String, ScanError> {
        // Hand the image over through a temp file; leptonica sniffs the
        // format from the content.
        let mut encoded = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut encoded), ImageFormat::Png)
            .map_err(|e| ScanError::OcrEngine(format!("failed to encode image: {}", e)))?;

        let mut temp_file = NamedTempFile::new()
            .map_err(|e| ScanError::OcrEngine(format!("failed to create temp file: {}", e)))?;
        temp_file
            .write_all(&encoded)
            .map_err(|e| ScanError::OcrEngine(format!("failed to write temp file: {}", e)))?;
        let path = temp_file
            .path()
            .to_str()
            .ok_or_else(|| ScanError::OcrEngine("temp path is not valid UTF-8".to_string()))?;

        let mut tess = Tesseract::new(self.config.datapath.as_deref(), Some(&self.config.language))
            .map_err(|e| ScanError::OcrEngine(format!("tesseract init error: {}", e)))?;
        tess.set_page_seg_mode(mode.into());
        let mut tess = tess
            .set_image(path)
            .map_err(|e| ScanError::OcrEngine(format!("tesseract set image error: {}", e)))?;
        let text = tess
            .get_text()
            .map_err(|e| ScanError::OcrEngine(format!("tesseract error: {}", e)))?;
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_segmentation_mode_ids() {
        assert_eq!(SegmentationMode::Auto.id(), "psm3");
        assert_eq!(SegmentationMode::SparseText.id(), "psm11");
        assert_eq!(SegmentationMode::AutoOsd.id(), "psm1");
    }
}
