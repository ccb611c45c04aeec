// Batch OCR extraction for identity card photographs.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use log::{error, warn};

use cedscan::card_reader::{CardReader, ScanOutcome};
use cedscan::models::IdentityRecord;
use cedscan::processing::{ImagePreprocessor, OcrConfig, RecordMerger};
use cedscan::utils::{export, files, ScanError};

#[derive(Parser)]
#[command(name = "cedscan", about = "Extract identity fields from card photographs")]
struct Args {
    /// Directory containing the card photographs.
    #[arg(long, env = "INPUT_DIR", default_value = "input_images")]
    input: PathBuf,

    /// Directory for the CSV table and diagnostic artifacts.
    #[arg(long, env = "OUTPUT_DIR", default_value = "output")]
    output: PathBuf,

    /// OCR language pack.
    #[arg(long, env = "TESSERACT_LANG", default_value = "spa")]
    lang: String,

    /// Tessdata directory, when the system default is not usable.
    #[arg(long, env = "TESSDATA_DIR")]
    tessdata: Option<String>,

    /// Save rotated/binarized/annotated intermediate images.
    #[arg(long)]
    save_intermediate: bool,

    /// Write a JSON dump of every OCR attempt per image.
    #[arg(long)]
    debug_dump: bool,
}

fn main() -> ExitCode {
    env_logger::init();
    let args = Args::parse();
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{}", err);
            eprintln!("error: {}", err);
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<(), ScanError> {
    std::fs::create_dir_all(&args.output)?;
    let reader = CardReader::new(OcrConfig {
        datapath: args.tessdata.clone(),
        language: args.lang.clone(),
    });

    let images = files::image_files(&args.input)?;
    if images.is_empty() {
        println!("No images found in {}", args.input.display());
        return Ok(());
    }
    println!("Found {} images to process", images.len());

    let mut outcomes: Vec<ScanOutcome> = Vec::new();
    let mut failed = 0usize;
    for path in &images {
        match reader.process_one(path) {
            Ok(outcome) => {
                save_diagnostics(args, path, &outcome)?;
                outcomes.push(outcome);
            }
            Err(err) => {
                // Per-image failures never abort the batch.
                warn!("skipping {}: {}", path.display(), err);
                failed += 1;
            }
        }
    }

    let records: Vec<IdentityRecord> =
        RecordMerger::merge_batch(outcomes.iter().map(|o| (o.side, o.record.clone())).collect());

    let csv_path = args.output.join("all_extracted_data.csv");
    export::write_records_csv(&csv_path, &records)?;

    println!(
        "\nProcessed {} images: {} succeeded, {} failed",
        images.len(),
        outcomes.len(),
        failed
    );
    println!("Records written to {}", csv_path.display());
    for record in &records {
        let missing = record.missing_fields();
        if missing.is_empty() {
            println!("  {}: all fields extracted", record.source_filename);
        } else {
            println!("  {}: missing {}", record.source_filename, missing.join(", "));
        }
    }
    Ok(())
}

fn save_diagnostics(args: &Args, path: &Path, outcome: &ScanOutcome) -> Result<(), ScanError> {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "image".to_string());

    export::write_transcripts(&args.output.join(format!("ocr_text_{}.txt", stem)), outcome)?;
    if args.debug_dump {
        export::write_debug_dump(
            &args.output.join(format!("extraction_debug_{}.json", stem)),
            outcome,
        )?;
    }
    if args.save_intermediate {
        let images = &outcome.images;
        images
            .rotated
            .save(args.output.join(format!("rotated_{}.png", stem)))
            .map_err(|e| ScanError::Export(format!("failed to save rotated image: {}", e)))?;
        images
            .binary
            .save(args.output.join(format!("processed_{}.png", stem)))
            .map_err(|e| ScanError::Export(format!("failed to save processed image: {}", e)))?;
        if let Some(inverted) = &images.inverted {
            inverted
                .save(args.output.join(format!("inverted_{}.png", stem)))
                .map_err(|e| ScanError::Export(format!("failed to save inverted image: {}", e)))?;
        }
        ImagePreprocessor::annotate_text_regions(&images.rotated)
            .save(args.output.join(format!("annotated_{}.png", stem)))
            .map_err(|e| ScanError::Export(format!("failed to save annotated image: {}", e)))?;
    }
    Ok(())
}
