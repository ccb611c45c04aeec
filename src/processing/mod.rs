pub mod classifier;
pub mod extractor;
pub mod image_processor;
pub mod merger;
pub mod ocr;
pub mod orientation;
pub mod strategy;

pub use classifier::SideClassifier;
pub use extractor::FieldExtractor;
pub use image_processor::{ImagePreprocessor, PreprocessedImage};
pub use merger::RecordMerger;
pub use ocr::{OcrConfig, OcrEngine, SegmentationMode, TesseractEngine};
pub use orientation::OrientationSelector;
pub use strategy::{MultiStrategyOcrRunner, OcrRun};
