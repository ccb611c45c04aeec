use std::io::Write;
use std::path::Path;

use serde_json::json;

use crate::card_reader::ScanOutcome;
use crate::models::IdentityRecord;
use crate::utils::ScanError;

/// Write the final records as one CSV table, headers included.
pub fn write_records_csv(path: &Path, records: &[IdentityRecord]) -> Result<(), ScanError> {
    let mut writer = csv::Writer::from_path(path)
        .map_err(|e| ScanError::Export(format!("failed to open {}: {}", path.display(), e)))?;
    for record in records {
        writer
            .serialize(record)
            .map_err(|e| ScanError::Export(format!("failed to serialize record: {}", e)))?;
    }
    writer
        .flush()
        .map_err(|e| ScanError::Export(format!("failed to flush {}: {}", path.display(), e)))?;
    Ok(())
}

/// Dump one image's full processing evidence as JSON: the record, the side
/// classification, the chosen transcript and every attempt that was made.
pub fn write_debug_dump(path: &Path, outcome: &ScanOutcome) -> Result<(), ScanError> {
    let dump = json!({
        "record": outcome.record,
        "side": outcome.side,
        "transcript": outcome.transcript,
        "attempts": outcome.attempts,
        "failed_attempts": outcome.failed_attempts,
    });
    let body = serde_json::to_string_pretty(&dump)
        .map_err(|e| ScanError::Export(format!("failed to encode debug dump: {}", e)))?;
    std::fs::write(path, body)?;
    Ok(())
}

/// Plain-text dump of the best transcript followed by every attempt, for
/// eyeballing OCR quality.
pub fn write_transcripts(path: &Path, outcome: &ScanOutcome) -> Result<(), ScanError> {
    let mut file = std::fs::File::create(path)?;
    writeln!(
        file,
        "--- BEST ({}, score {}) ---\n{}",
        outcome.transcript.strategy_id, outcome.transcript.keyword_score, outcome.transcript.text
    )?;
    writeln!(file, "\n--- ALL ATTEMPTS ---")?;
    for attempt in &outcome.attempts {
        writeln!(
            file,
            "\n--- {} (score {}) ---\n{}",
            attempt.strategy_id, attempt.keyword_score, attempt.text
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Gender;

    fn sample_record() -> IdentityRecord {
        IdentityRecord {
            given_name: Some("GIANFRANCO".to_string()),
            surname: Some("CASTRO PADILLA".to_string()),
            document_number: Some("1193573490".to_string()),
            gender: Some(Gender::M),
            ..IdentityRecord::default()
        }
    }

    fn sample_outcome() -> ScanOutcome {
        use crate::models::{RawTranscript, Side};
        use crate::processing::image_processor::PreprocessedImage;
        use image::{DynamicImage, GrayImage, Luma};

        let transcript = RawTranscript {
            text: "CEDULA DE CIUDADANIA".to_string(),
            strategy_id: "binary/psm6".to_string(),
            keyword_score: 2,
            side_hint: Side::Front,
        };
        ScanOutcome {
            record: sample_record(),
            side: Side::Front,
            transcript: transcript.clone(),
            attempts: vec![transcript],
            failed_attempts: 1,
            images: PreprocessedImage {
                rotated: DynamicImage::ImageLuma8(GrayImage::from_pixel(2, 2, Luma([255]))),
                binary: GrayImage::from_pixel(2, 2, Luma([0])),
                inverted: None,
            },
        }
    }

    #[test]
    fn test_write_records_csv() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        write_records_csv(&path, &[sample_record()]).unwrap();

        let body = std::fs::read_to_string(&path).unwrap();
        let mut lines = body.lines();
        let header = lines.next().unwrap();
        assert!(header.contains("given_name"));
        assert!(header.contains("blood_type"));
        let row = lines.next().unwrap();
        assert!(row.contains("GIANFRANCO"));
        assert!(row.contains("CASTRO PADILLA"));
        assert!(row.contains("1193573490"));
        assert!(row.contains(",M,"));
    }

    #[test]
    fn test_debug_dump_is_valid_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dump.json");
        write_debug_dump(&path, &sample_outcome()).unwrap();

        let body = std::fs::read_to_string(&path).unwrap();
        let dump: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(dump["side"], "front");
        assert_eq!(dump["failed_attempts"], 1);
        assert_eq!(dump["record"]["document_number"], "1193573490");
        assert_eq!(dump["attempts"][0]["strategy_id"], "binary/psm6");
    }

    #[test]
    fn test_transcript_dump_lists_every_attempt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ocr.txt");
        write_transcripts(&path, &sample_outcome()).unwrap();

        let body = std::fs::read_to_string(&path).unwrap();
        assert!(body.contains("BEST (binary/psm6, score 2)"));
        assert!(body.contains("ALL ATTEMPTS"));
        assert!(body.contains("CEDULA DE CIUDADANIA"));
    }
}
