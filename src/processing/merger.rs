use std::collections::VecDeque;

use log::warn;

use crate::models::{IdentityRecord, Side};

/// Combines a front-derived and a back-derived partial record into one.
/// The field sets are disjoint by construction, so merging is a union with
/// the front checked first on any overlap.
pub struct RecordMerger;

impl RecordMerger {
    pub fn merge(
        front: Option<IdentityRecord>,
        back: Option<IdentityRecord>,
    ) -> Option<IdentityRecord> {
        match (front, back) {
            (None, None) => None,
            (Some(front), None) => Some(front),
            (None, Some(back)) => Some(back),
            (Some(front), Some(back)) => {
                if let (Some(fd), Some(bd)) = (&front.document_number, &back.document_number) {
                    if fd != bd {
                        // Not fatal: the front is the authoritative source
                        // for identity fields and its value is kept.
                        warn!(
                            "document number mismatch between sides: front {} vs back {}",
                            fd, bd
                        );
                    }
                }
                let mut merged = front;
                merged.given_name = merged.given_name.take().or(back.given_name);
                merged.surname = merged.surname.take().or(back.surname);
                merged.document_number = merged.document_number.take().or(back.document_number);
                merged.birth_date = merged.birth_date.take().or(back.birth_date);
                merged.expedition_date = merged.expedition_date.take().or(back.expedition_date);
                merged.gender = merged.gender.take().or(back.gender);
                merged.height_meters = merged.height_meters.take().or(back.height_meters);
                merged.blood_type = merged.blood_type.take().or(back.blood_type);
                if !back.source_filename.is_empty()
                    && merged.source_filename != back.source_filename
                {
                    if merged.source_filename.is_empty() {
                        merged.source_filename = back.source_filename;
                    } else {
                        merged.source_filename =
                            format!("{} + {}", merged.source_filename, back.source_filename);
                    }
                }
                Some(merged)
            }
        }
    }

    /// Pair fronts and backs in encounter order and merge each pair;
    /// unpaired records pass through unchanged.
    pub fn merge_batch(records: Vec<(Side, IdentityRecord)>) -> Vec<IdentityRecord> {
        let mut fronts = VecDeque::new();
        let mut backs = VecDeque::new();
        for (side, record) in records {
            match side {
                Side::Front => fronts.push_back(record),
                Side::Back => backs.push_back(record),
            }
        }
        let mut merged = Vec::new();
        while !fronts.is_empty() || !backs.is_empty() {
            if let Some(record) = Self::merge(fronts.pop_front(), backs.pop_front()) {
                merged.push(record);
            }
        }
        merged
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Gender;

    fn front_record() -> IdentityRecord {
        IdentityRecord {
            given_name: Some("ANA".to_string()),
            document_number: Some("123".to_string()),
            source_filename: "front.jpg".to_string(),
            ..IdentityRecord::default()
        }
    }

    fn back_record(document: &str) -> IdentityRecord {
        IdentityRecord {
            birth_date: Some("01/01/1990".to_string()),
            gender: Some(Gender::F),
            document_number: Some(document.to_string()),
            source_filename: "back.jpg".to_string(),
            ..IdentityRecord::default()
        }
    }

    #[test]
    fn test_merge_is_a_union_without_field_loss() {
        let merged = RecordMerger::merge(Some(front_record()), Some(back_record("123"))).unwrap();
        assert_eq!(merged.given_name.as_deref(), Some("ANA"));
        assert_eq!(merged.document_number.as_deref(), Some("123"));
        assert_eq!(merged.birth_date.as_deref(), Some("01/01/1990"));
        assert_eq!(merged.gender, Some(Gender::F));
        assert_eq!(merged.source_filename, "front.jpg + back.jpg");
    }

    #[test]
    fn test_mismatched_document_numbers_keep_front_value() {
        let merged = RecordMerger::merge(Some(front_record()), Some(back_record("999"))).unwrap();
        assert_eq!(merged.document_number.as_deref(), Some("123"));
        assert_eq!(merged.birth_date.as_deref(), Some("01/01/1990"));
    }

    #[test]
    fn test_single_side_passes_through() {
        let merged = RecordMerger::merge(Some(front_record()), None).unwrap();
        assert_eq!(merged.given_name.as_deref(), Some("ANA"));
        assert!(merged.birth_date.is_none());

        let merged = RecordMerger::merge(None, Some(back_record("123"))).unwrap();
        assert_eq!(merged.birth_date.as_deref(), Some("01/01/1990"));
        assert!(merged.given_name.is_none());

        assert!(RecordMerger::merge(None, None).is_none());
    }

    #[test]
    fn test_batch_pairs_in_encounter_order() {
        let records = vec![
            (Side::Front, front_record()),
            (Side::Back, back_record("123")),
            (Side::Front, front_record()),
        ];
        let merged = RecordMerger::merge_batch(records);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].birth_date.as_deref(), Some("01/01/1990"));
        assert!(merged[1].birth_date.is_none());
    }
}
