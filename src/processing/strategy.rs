use image::GrayImage;
use log::{debug, warn};

use crate::models::{RawTranscript, Side};
use crate::processing::image_processor::PreprocessedImage;
use crate::processing::ocr::{OcrEngine, SegmentationMode};
use crate::utils::text::keyword_score;
use crate::utils::ScanError;

const FRONT_KEYWORDS: [&str; 6] = [
    "REPUBLICA",
    "COLOMBIA",
    "CEDULA",
    "CIUDADANIA",
    "IDENTIDAD",
    "PERSONAL",
];

const BACK_KEYWORDS: [&str; 8] = [
    "FECHA",
    "NACIMIENTO",
    "EXPEDICION",
    "SEXO",
    "LUGAR",
    "ESTATURA",
    "GRUPO",
    "RH",
];

/// Below this many keywords the best transcript counts as weak evidence and
/// the search widens to the extra variants.
const MIN_EVIDENCE: usize = 2;

const PRIMARY_MODES: [SegmentationMode; 4] = [
    SegmentationMode::Auto,
    SegmentationMode::SingleColumn,
    SegmentationMode::SingleBlock,
    SegmentationMode::SparseText,
];

/// Result of one full strategy sweep over an image.
#[derive(Debug)]
pub struct OcrRun {
    pub best: RawTranscript,
    pub attempts: Vec<RawTranscript>,
    pub failed_attempts: usize,
}

struct RunState {
    attempts: Vec<RawTranscript>,
    failed: usize,
    best: Option<usize>,
}

impl RunState {
    fn best_score(&self) -> usize {
        self.best.map(|i| self.attempts[i].keyword_score).unwrap_or(0)
    }

    /// Keep a running best; strictly greater scores replace it, so the
    /// first-seen transcript wins ties.
    fn record(&mut self, transcript: RawTranscript) {
        let score = transcript.keyword_score;
        self.attempts.push(transcript);
        let index = self.attempts.len() - 1;
        match self.best {
            None => self.best = Some(index),
            Some(i) if score > self.attempts[i].keyword_score => self.best = Some(index),
            _ => {}
        }
    }
}

/// Runs the OCR collaborator over every (variant, segmentation mode) pair,
/// scoring each transcript against the side's keyword set.
pub struct MultiStrategyOcrRunner;

impl MultiStrategyOcrRunner {
    pub fn side_keywords(side: Side) -> &'static [&'static str] {
        match side {
            Side::Front => &FRONT_KEYWORDS,
            Side::Back => &BACK_KEYWORDS,
        }
    }

    fn modes_for(side: Side) -> Vec<SegmentationMode> {
        let mut modes = PRIMARY_MODES.to_vec();
        if side == Side::Back {
            // Block-level segmentation helps against the back's security
            // pattern.
            modes.push(SegmentationMode::AutoOsd);
        }
        modes
    }

    /// Sweep all variants and modes, keep the best transcript and the full
    /// attempt log. Failing attempts are excluded from scoring; only a run
    /// in which every attempt failed is an error.
    pub fn run(
        engine: &dyn OcrEngine,
        images: &PreprocessedImage,
        side: Side,
    ) -> Result<OcrRun, ScanError> {
        let keywords = Self::side_keywords(side);
        let modes = Self::modes_for(side);
        let mut state = RunState {
            attempts: Vec::new(),
            failed: 0,
            best: None,
        };

        Self::sweep(engine, &images.binary, "binary", &modes, keywords, side, &mut state);
        if let Some(inverted) = &images.inverted {
            Self::sweep(engine, inverted, "inverted", &modes, keywords, side, &mut state);
        }

        // A low score is a signal that the preprocessing or orientation was
        // wrong for this capture: widen to the unbinarized rotation and the
        // polarity-inverted binary.
        if state.best_score() < MIN_EVIDENCE {
            debug!(
                "only {} keywords after primary pass, widening the search",
                state.best_score()
            );
            let rotated_gray = images.rotated.to_luma8();
            Self::sweep(engine, &rotated_gray, "rotated", &modes, keywords, side, &mut state);
            if images.inverted.is_none() {
                let mut negative = images.binary.clone();
                image::imageops::invert(&mut negative);
                Self::sweep(engine, &negative, "negative", &modes, keywords, side, &mut state);
            }
        }

        match state.best {
            Some(index) => Ok(OcrRun {
                best: state.attempts[index].clone(),
                attempts: state.attempts,
                failed_attempts: state.failed,
            }),
            None => Err(ScanError::OcrUnavailable(format!(
                "{} attempts failed, none produced a transcript",
                state.failed
            ))),
        }
    }

    fn sweep(
        engine: &dyn OcrEngine,
        variant: &GrayImage,
        label: &str,
        modes: &[SegmentationMode],
        keywords: &[&str],
        side: Side,
        state: &mut RunState,
    ) {
        for mode in modes {
            let strategy_id = format!("{}/{}", label, mode.id());
            match engine.recognize(variant, *mode) {
                Ok(text) => {
                    let score = keyword_score(&text, keywords);
                    debug!("strategy {}: {} keywords", strategy_id, score);
                    state.record(RawTranscript {
                        text,
                        strategy_id,
                        keyword_score: score,
                        side_hint: side,
                    });
                }
                Err(err) => {
                    warn!("strategy {} failed: {}", strategy_id, err);
                    state.failed += 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, Luma};

    fn images(inverted: bool) -> PreprocessedImage {
        // Rotated variant is white, binary is black, so a mock engine can
        // tell which variant it was handed.
        PreprocessedImage {
            rotated: DynamicImage::ImageLuma8(GrayImage::from_pixel(8, 8, Luma([255]))),
            binary: GrayImage::from_pixel(8, 8, Luma([0])),
            inverted: inverted.then(|| GrayImage::from_pixel(8, 8, Luma([255]))),
        }
    }

    struct ByMode;

    impl OcrEngine for ByMode {
        fn recognize(
            &self,
            _image: &GrayImage,
            mode: SegmentationMode,
        ) -> Result<String, ScanError> {
            match mode {
                SegmentationMode::SingleBlock => Ok("REPUBLICA DE COLOMBIA CEDULA".to_string()),
                _ => Ok("REPUBLICA".to_string()),
            }
        }
    }

    #[test]
    fn test_best_strategy_by_score() {
        let run = MultiStrategyOcrRunner::run(&ByMode, &images(false), Side::Front).unwrap();
        assert_eq!(run.best.strategy_id, "binary/psm6");
        assert_eq!(run.best.keyword_score, 3);
        // Strong evidence: no escalation beyond the four primary modes.
        assert_eq!(run.attempts.len(), 4);
        assert_eq!(run.failed_attempts, 0);
    }

    struct ConstantText(&'static str);

    impl OcrEngine for ConstantText {
        fn recognize(
            &self,
            _image: &GrayImage,
            _mode: SegmentationMode,
        ) -> Result<String, ScanError> {
            Ok(self.0.to_string())
        }
    }

    #[test]
    fn test_tie_break_keeps_first_attempt() {
        let engine = ConstantText("CEDULA DE CIUDADANIA");
        let run = MultiStrategyOcrRunner::run(&engine, &images(false), Side::Front).unwrap();
        assert_eq!(run.best.strategy_id, "binary/psm3");
        assert_eq!(run.best.keyword_score, 2);
    }

    /// Only reads anything off the white (unbinarized) variant.
    struct WhiteOnly;

    impl OcrEngine for WhiteOnly {
        fn recognize(
            &self,
            image: &GrayImage,
            _mode: SegmentationMode,
        ) -> Result<String, ScanError> {
            if image.get_pixel(0, 0).0[0] == 255 {
                Ok("CEDULA DE CIUDADANIA PERSONAL".to_string())
            } else {
                Ok(String::new())
            }
        }
    }

    #[test]
    fn test_low_score_escalates_to_rotated_variant() {
        let run = MultiStrategyOcrRunner::run(&WhiteOnly, &images(false), Side::Front).unwrap();
        assert_eq!(run.best.strategy_id, "rotated/psm3");
        // 4 binary + 4 rotated + 4 negative attempts.
        assert_eq!(run.attempts.len(), 12);
    }

    #[test]
    fn test_back_side_modes_and_variants() {
        let engine = ConstantText("");
        let run = MultiStrategyOcrRunner::run(&engine, &images(true), Side::Back).unwrap();
        // Primary: (binary + inverted) x 5 modes; escalation adds the
        // rotated sweep but skips the negative (already tried inverted).
        assert_eq!(run.attempts.len(), 15);
        assert!(run.attempts.iter().any(|a| a.strategy_id == "binary/psm1"));
        assert!(run.attempts.iter().any(|a| a.strategy_id == "inverted/psm11"));
        assert!(!run.attempts.iter().any(|a| a.strategy_id.starts_with("negative")));
    }

    struct AlwaysFails;

    impl OcrEngine for AlwaysFails {
        fn recognize(
            &self,
            _image: &GrayImage,
            _mode: SegmentationMode,
        ) -> Result<String, ScanError> {
            Err(ScanError::OcrEngine("engine crashed".to_string()))
        }
    }

    #[test]
    fn test_all_attempts_failing_is_an_error() {
        let err = MultiStrategyOcrRunner::run(&AlwaysFails, &images(false), Side::Front).unwrap_err();
        assert!(matches!(err, ScanError::OcrUnavailable(_)));
    }

    /// Fails on sparse text, succeeds elsewhere.
    struct FlakyMode;

    impl OcrEngine for FlakyMode {
        fn recognize(
            &self,
            _image: &GrayImage,
            mode: SegmentationMode,
        ) -> Result<String, ScanError> {
            if mode == SegmentationMode::SparseText {
                Err(ScanError::OcrEngine("engine crashed".to_string()))
            } else {
                Ok("REPUBLICA DE COLOMBIA".to_string())
            }
        }
    }

    #[test]
    fn test_partial_failures_are_tolerated() {
        let run = MultiStrategyOcrRunner::run(&FlakyMode, &images(false), Side::Front).unwrap();
        assert_eq!(run.best.keyword_score, 2);
        assert_eq!(run.attempts.len(), 3);
        assert_eq!(run.failed_attempts, 1);
    }
}
