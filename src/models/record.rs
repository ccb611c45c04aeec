use chrono::{DateTime, Utc};
use serde::Serialize;

/// Which face of the card an image, transcript or record came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Front,
    Back,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Front => "front",
            Side::Back => "back",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Gender {
    M,
    F,
}

impl Gender {
    pub fn from_letter(c: char) -> Option<Gender> {
        match c.to_ascii_uppercase() {
            'M' => Some(Gender::M),
            'F' => Some(Gender::F),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::M => "M",
            Gender::F => "F",
        }
    }
}

/// Structured output of the pipeline.
///
/// A record derived from a single side only carries that side's fields; the
/// rest stay `None` until the front and back records are merged. Records are
/// value objects: once built they are never mutated, merging produces a new
/// one.
#[derive(Debug, Clone, Serialize)]
pub struct IdentityRecord {
    pub given_name: Option<String>,
    pub surname: Option<String>,
    /// Digits only, separators stripped.
    pub document_number: Option<String>,
    /// Normalized to DD/MM/YYYY.
    pub birth_date: Option<String>,
    /// Normalized to DD/MM/YYYY.
    pub expedition_date: Option<String>,
    pub gender: Option<Gender>,
    /// Decimal string with a dot separator, e.g. "1.75".
    pub height_meters: Option<String>,
    /// One of A/B/O plus +/-.
    pub blood_type: Option<String>,
    pub source_filename: String,
    pub extracted_at: DateTime<Utc>,
}

impl Default for IdentityRecord {
    fn default() -> Self {
        IdentityRecord {
            given_name: None,
            surname: None,
            document_number: None,
            birth_date: None,
            expedition_date: None,
            gender: None,
            height_meters: None,
            blood_type: None,
            source_filename: String::new(),
            extracted_at: Utc::now(),
        }
    }
}

impl IdentityRecord {
    /// Names of the extraction fields that are still unpopulated, for the
    /// batch completeness report.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.given_name.is_none() {
            missing.push("given_name");
        }
        if self.surname.is_none() {
            missing.push("surname");
        }
        if self.document_number.is_none() {
            missing.push("document_number");
        }
        if self.birth_date.is_none() {
            missing.push("birth_date");
        }
        if self.expedition_date.is_none() {
            missing.push("expedition_date");
        }
        if self.gender.is_none() {
            missing.push("gender");
        }
        if self.height_meters.is_none() {
            missing.push("height_meters");
        }
        if self.blood_type.is_none() {
            missing.push("blood_type");
        }
        missing
    }

    pub fn is_empty(&self) -> bool {
        self.missing_fields().len() == 8
    }
}

/// OCR output plus provenance for one attempt. The full list of attempts is
/// the diagnostic log; only the best-scoring one feeds field extraction.
#[derive(Debug, Clone, Serialize)]
pub struct RawTranscript {
    pub text: String,
    /// Preprocessing variant plus segmentation mode, e.g. "binary/psm6".
    pub strategy_id: String,
    pub keyword_score: usize,
    pub side_hint: Side,
}
