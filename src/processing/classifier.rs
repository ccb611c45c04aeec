use image::DynamicImage;
use log::warn;

use crate::models::Side;
use crate::processing::ocr::{OcrEngine, SegmentationMode};
use crate::processing::strategy::MultiStrategyOcrRunner;
use crate::utils::text::keyword_score;

const BACK_FILENAME_TOKENS: [&str; 4] = ["reverso", "back", "trasera", "reverse"];

/// Decides which face of the card a photograph shows. Every image resolves
/// to one of the two sides; there is no unknown.
pub struct SideClassifier;

impl SideClassifier {
    pub fn classify(engine: &dyn OcrEngine, image: &DynamicImage, filename: &str) -> Side {
        if Self::filename_suggests_back(filename) {
            return Side::Back;
        }
        let gray = image.to_luma8();
        match engine.recognize(&gray, SegmentationMode::SparseText) {
            Ok(text) => Self::classify_transcript(&text),
            Err(err) => {
                // No text and no filename hint: default to front.
                warn!("exploratory OCR pass failed ({}), assuming front", err);
                Side::Front
            }
        }
    }

    pub fn filename_suggests_back(filename: &str) -> bool {
        let lower = filename.to_lowercase();
        BACK_FILENAME_TOKENS.iter().any(|t| lower.contains(t))
    }

    /// Keyword-density vote against the same side vocabularies the strategy
    /// runner scores with; back wins only when it has strictly more hits.
    pub fn classify_transcript(text: &str) -> Side {
        let back = keyword_score(text, MultiStrategyOcrRunner::side_keywords(Side::Back));
        let front = keyword_score(text, MultiStrategyOcrRunner::side_keywords(Side::Front));
        if back > front {
            Side::Back
        } else {
            Side::Front
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::ScanError;
    use image::GrayImage;

    struct FixedText(&'static str);

    impl OcrEngine for FixedText {
        fn recognize(
            &self,
            _image: &GrayImage,
            _mode: SegmentationMode,
        ) -> Result<String, ScanError> {
            Ok(self.0.to_string())
        }
    }

    #[test]
    fn test_filename_tokens_force_back() {
        assert!(SideClassifier::filename_suggests_back("cedula_REVERSO.jpg"));
        assert!(SideClassifier::filename_suggests_back("id-back.png"));
        assert!(!SideClassifier::filename_suggests_back("cedula_frente.jpg"));

        // Filename wins even when the transcript reads like a front.
        let engine = FixedText("REPUBLICA DE COLOMBIA CEDULA");
        let image = DynamicImage::new_luma8(4, 4);
        assert_eq!(
            SideClassifier::classify(&engine, &image, "foto_reverso.jpg"),
            Side::Back
        );
    }

    #[test]
    fn test_transcript_vote() {
        assert_eq!(
            SideClassifier::classify_transcript("FECHA DE NACIMIENTO SEXO ESTATURA"),
            Side::Back
        );
        assert_eq!(
            SideClassifier::classify_transcript("REPUBLICA DE COLOMBIA CEDULA DE CIUDADANIA"),
            Side::Front
        );
        // A tie resolves to front.
        assert_eq!(SideClassifier::classify_transcript(""), Side::Front);
        assert_eq!(
            SideClassifier::classify_transcript("CEDULA FECHA"),
            Side::Front
        );
    }

    #[test]
    fn test_ocr_failure_defaults_to_front() {
        struct AlwaysFails;
        impl OcrEngine for AlwaysFails {
            fn recognize(
                &self,
                _image: &GrayImage,
                _mode: SegmentationMode,
            ) -> Result<String, ScanError> {
                Err(ScanError::OcrEngine("boom".to_string()))
            }
        }
        let image = DynamicImage::new_luma8(4, 4);
        assert_eq!(
            SideClassifier::classify(&AlwaysFails, &image, "foto.jpg"),
            Side::Front
        );
    }
}
