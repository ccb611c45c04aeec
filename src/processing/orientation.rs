use image::DynamicImage;
use imageproc::contrast::{otsu_level, threshold, ThresholdType};
use log::{debug, warn};

use crate::processing::ocr::{OcrEngine, SegmentationMode};
use crate::utils::text::keyword_score;

/// Vocabulary printed somewhere on either side of the card; a readable
/// transcript of a correctly oriented photo will contain several of these.
const ORIENTATION_KEYWORDS: [&str; 11] = [
    "REPUBLICA",
    "COLOMBIA",
    "CEDULA",
    "CIUDADANIA",
    "IDENTIDAD",
    "PERSONAL",
    "FECHA",
    "NACIMIENTO",
    "EXPEDICION",
    "SEXO",
    "LUGAR",
];

pub struct OrientationSelector;

impl OrientationSelector {
    /// Brute-force search over the axis-aligned rotations plus a full flip.
    /// Each candidate is Otsu-binarized and given a quick sparse-text OCR
    /// pass; the candidate with the most domain keywords wins. Ties keep
    /// the earliest candidate, so an all-zero board returns the input
    /// unrotated. Cost is bounded at five OCR calls.
    pub fn select_best_orientation(engine: &dyn OcrEngine, image: &DynamicImage) -> DynamicImage {
        let mut candidates: Vec<(&'static str, DynamicImage)> = vec![
            ("0", image.clone()),
            ("90", image.rotate90()),
            ("180", image.rotate180()),
            ("270", image.rotate270()),
            ("flip", image.fliph().flipv()),
        ];

        let mut best_index = 0;
        let mut best_score = 0;
        for (index, (label, candidate)) in candidates.iter().enumerate() {
            let score = Self::score_candidate(engine, candidate);
            debug!("orientation candidate {}: {} keywords", label, score);
            if score > best_score {
                best_score = score;
                best_index = index;
            }
        }

        let (label, chosen) = candidates.swap_remove(best_index);
        debug!("selected orientation {} ({} keywords)", label, best_score);
        chosen
    }

    fn score_candidate(engine: &dyn OcrEngine, candidate: &DynamicImage) -> usize {
        let gray = candidate.to_luma8();
        let binary = threshold(&gray, otsu_level(&gray), ThresholdType::BinaryInverted);
        match engine.recognize(&binary, SegmentationMode::SparseText) {
            Ok(text) => keyword_score(&text, &ORIENTATION_KEYWORDS),
            Err(err) => {
                // A failed trial just scores zero; the search goes on.
                warn!("orientation trial OCR failed: {}", err);
                0
            }
        }
    }
}
