use std::path::Path;

use log::{debug, info};

use crate::models::{IdentityRecord, RawTranscript, Side};
use crate::processing::classifier::SideClassifier;
use crate::processing::extractor::FieldExtractor;
use crate::processing::image_processor::{ImagePreprocessor, PreprocessedImage};
use crate::processing::merger::RecordMerger;
use crate::processing::ocr::{OcrConfig, OcrEngine, TesseractEngine};
use crate::processing::orientation::OrientationSelector;
use crate::processing::strategy::MultiStrategyOcrRunner;
use crate::utils::ScanError;

/// Everything produced while processing one image: the record plus the
/// evidence needed for diagnostics.
#[derive(Debug)]
pub struct ScanOutcome {
    pub record: IdentityRecord,
    pub side: Side,
    /// The transcript that fed field extraction.
    pub transcript: RawTranscript,
    /// Every OCR attempt that produced text, in the order tried.
    pub attempts: Vec<RawTranscript>,
    pub failed_attempts: usize,
    /// The image variants the attempts ran against, for intermediate dumps.
    pub images: PreprocessedImage,
}

/// Top-level pipeline: classify the side, fix the orientation, enhance the
/// image, transcribe with the strategy sweep and extract the fields. Each
/// image is a pure function of its own bytes and filename; nothing is
/// shared between calls.
pub struct CardReader {
    engine: Box<dyn OcrEngine>,
}

impl CardReader {
    pub fn new(config: OcrConfig) -> Self {
        CardReader {
            engine: Box::new(TesseractEngine::new(config)),
        }
    }

    /// Run the pipeline against any OCR collaborator.
    pub fn with_engine(engine: Box<dyn OcrEngine>) -> Self {
        CardReader { engine }
    }

    pub fn process_one(&self, path: &Path) -> Result<ScanOutcome, ScanError> {
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.to_string_lossy().into_owned());
        info!("processing {}", filename);

        let image = ImagePreprocessor::decode(path)?;
        let side = SideClassifier::classify(self.engine.as_ref(), &image, &filename);
        debug!("{} classified as {}", filename, side.as_str());

        let oriented = OrientationSelector::select_best_orientation(self.engine.as_ref(), &image);
        let preprocessed = ImagePreprocessor::preprocess(oriented, side);
        let run = MultiStrategyOcrRunner::run(self.engine.as_ref(), &preprocessed, side)?;
        debug!(
            "{}: best strategy {} ({} keywords)",
            filename, run.best.strategy_id, run.best.keyword_score
        );

        let mut record = FieldExtractor::extract(&run.best.text, side);
        record.source_filename = filename;

        Ok(ScanOutcome {
            record,
            side,
            transcript: run.best,
            attempts: run.attempts,
            failed_attempts: run.failed_attempts,
            images: preprocessed,
        })
    }

    /// Merge a front-derived and a back-derived record; see
    /// [`RecordMerger::merge`].
    pub fn merge(
        front: Option<IdentityRecord>,
        back: Option<IdentityRecord>,
    ) -> Option<IdentityRecord> {
        RecordMerger::merge(front, back)
    }
}
