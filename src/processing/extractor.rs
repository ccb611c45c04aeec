use lazy_static::lazy_static;
use log::debug;
use regex::Regex;

use crate::models::{Gender, IdentityRecord, Side};
use crate::utils::text::strip_diacritics;

/// Date grammar shared by the labeled patterns and the generic finder:
/// day + Spanish month abbreviation + year with apostrophe/hyphen/space
/// delimiters, ISO, or numeric day-first forms.
const DATE_PATTERN: &str = r"\b\d{1,2}[\s'./-]*(?:ENE|FEB|MAR|ABR|MAY|JUN|JUL|AGO|SEP|OCT|NOV|DIC)[\s'./-]*\d{4}\b|\b\d{4}-\d{1,2}-\d{1,2}\b|\b\d{1,2}[-/.]\d{1,2}[-/.]\d{2,4}\b";

lazy_static! {
    static ref DOCUMENT_LABEL_RE: Regex =
        Regex::new(r"(?i)(?:n[uú]mero|num[eé]ro|numer0|n[uú]m|num)[:.\s]*(\d[\d.,]+\d|\d{6,10})")
            .unwrap();
    static ref DIGIT_RUN_RE: Regex = Regex::new(r"\d+").unwrap();
    static ref SURNAME_LABEL_RE: Regex = Regex::new(r"(?i)apellidos?[:.\s]*").unwrap();
    static ref NAME_LABEL_RE: Regex = Regex::new(r"(?i)nombres?[:.\s]*").unwrap();
    static ref DATE_RE: Regex = Regex::new(&format!("(?i){}", DATE_PATTERN)).unwrap();
    static ref BIRTH_LABEL_RE: Regex = Regex::new(r"(?i)NACIMIENTO|BIRTH").unwrap();
    static ref EXPEDITION_LABEL_RE: Regex = Regex::new(r"(?i)EXPEDICION|ISSUE").unwrap();
    static ref MONTH_DATE_RE: Regex =
        Regex::new(r"^(\d{1,2})[\s'./-]*([A-Z]{3})[\s'./-]*(\d{4})$").unwrap();
    static ref ISO_DATE_RE: Regex = Regex::new(r"^(\d{4})-(\d{1,2})-(\d{1,2})$").unwrap();
    static ref NUMERIC_DATE_RE: Regex =
        Regex::new(r"^(\d{1,2})[-/.](\d{1,2})[-/.](\d{2,4})$").unwrap();
    static ref GENDER_LABEL_RE: Regex = Regex::new(r"(?i)(?:SEXO|SEX)[:.\s]*([MF])\b").unwrap();
    static ref GENDER_TOKEN_RE: Regex = Regex::new(r"\b([MF])\b").unwrap();
    static ref HEIGHT_LABEL_RE: Regex =
        Regex::new(r"(?i)(?:ESTATURA|HEIGHT)[:.\s]*(\d[.,]\d{1,2})").unwrap();
    static ref HEIGHT_TOKEN_RE: Regex =
        Regex::new(r"\b(1[.,][5-9]\d{1,2}|2[.,][0-2]\d{1,2})\b").unwrap();
    static ref BLOOD_LABEL_RE: Regex =
        Regex::new(r"(?i)(?:GRUPO\s+SANGUINEO|RH|BLOOD|G\.S\.)[:.\s]*([ABO][+-])").unwrap();
    static ref BLOOD_TOKEN_RE: Regex = Regex::new(r"\b([ABO][+-])").unwrap();
}

/// Card boilerplate and label tokens that must never be mistaken for a name.
const HEADER_WORDS: [&str; 15] = [
    "COLOMBIA",
    "REPUBLICA",
    "CEDULA",
    "CIUDADANIA",
    "IDENTIDAD",
    "IDENTIFICACION",
    "PERSONAL",
    "APELLIDOS",
    "NOMBRES",
    "NUMERO",
    "FIRMA",
    "DE",
    "DEL",
    "LA",
    "Y",
];

/// Turns one side's best transcript into a partial record. Stateless: every
/// call starts from a fresh record, nothing is carried between images.
///
/// Each field has a label-anchored primary pattern plus ordered fallbacks;
/// the first hit wins. Label matching is accent- and case-insensitive,
/// captured names keep their original casing and diacritics.
pub struct FieldExtractor;

impl FieldExtractor {
    pub fn extract(text: &str, side: Side) -> IdentityRecord {
        let mut record = IdentityRecord::default();
        match side {
            Side::Front => {
                let (given_name, surname) = Self::extract_names(text);
                record.given_name = given_name;
                record.surname = surname;
                record.document_number = Self::extract_document_number(text);
            }
            Side::Back => {
                // Dates, gender, height and blood group carry no diacritics
                // worth preserving, so the whole side works on plain text.
                let plain = strip_diacritics(text);
                record.birth_date = Self::extract_birth_date(&plain);
                record.expedition_date =
                    Self::extract_expedition_date(&plain, record.birth_date.as_deref());
                record.gender = Self::extract_gender(&plain);
                record.height_meters = Self::extract_height(&plain);
                record.blood_type = Self::extract_blood_type(&plain);
            }
        }
        record
    }

    fn extract_document_number(text: &str) -> Option<String> {
        let plain = strip_diacritics(text);
        if let Some(captures) = DOCUMENT_LABEL_RE.captures(&plain) {
            let digits: String = captures[1].chars().filter(|c| c.is_ascii_digit()).collect();
            if digits.len() >= 7 {
                return Some(digits);
            }
            debug!(
                "labeled document number has only {} digits, scanning digit runs",
                digits.len()
            );
        }
        // Longest digit run of plausible length; the first one wins ties.
        let mut best: Option<&str> = None;
        for found in DIGIT_RUN_RE.find_iter(&plain) {
            let run = found.as_str();
            if (7..=12).contains(&run.len()) && best.map_or(true, |b| run.len() > b.len()) {
                best = Some(run);
            }
        }
        best.map(|run| run.to_string())
    }

    /// The surname is printed under an APELLIDOS label, either inline after
    /// the label or on the following line; the given name follows it.
    fn extract_names(text: &str) -> (Option<String>, Option<String>) {
        let lines: Vec<&str> = text.lines().collect();
        let mut surname = None;
        let mut given_name = None;
        let mut surname_line = None;

        for (i, line) in lines.iter().enumerate() {
            if let Some(found) = SURNAME_LABEL_RE.find(line) {
                let inline = Self::clean_name(&line[found.end()..]);
                if !inline.is_empty() {
                    surname = Some(inline);
                    surname_line = Some(i);
                } else if let Some((j, value)) = Self::next_name_line(&lines, i + 1) {
                    surname = Some(value);
                    surname_line = Some(j);
                }
                break;
            }
        }

        // A label-anchored given name takes precedence when present.
        for line in &lines {
            if SURNAME_LABEL_RE.is_match(line) {
                continue;
            }
            if let Some(found) = NAME_LABEL_RE.find(line) {
                let inline = Self::clean_name(&line[found.end()..]);
                if !inline.is_empty() {
                    given_name = Some(inline);
                    break;
                }
            }
        }

        if given_name.is_none() {
            if let Some(j) = surname_line {
                given_name = Self::next_name_line(&lines, j + 1).map(|(_, value)| value);
            }
        }
        if given_name.is_none() {
            given_name = Self::single_token_name(&lines, surname_line);
        }

        (given_name, surname)
    }

    /// First line from `start` that cleans down to a usable name, skipping
    /// blank lines and bare label lines.
    fn next_name_line(lines: &[&str], start: usize) -> Option<(usize, String)> {
        for (i, line) in lines.iter().enumerate().skip(start) {
            if line.trim().is_empty() {
                continue;
            }
            let residue = match NAME_LABEL_RE
                .find(line)
                .or_else(|| SURNAME_LABEL_RE.find(line))
            {
                Some(found) => &line[found.end()..],
                None => line,
            };
            let cleaned = Self::clean_name(residue);
            if cleaned.is_empty() || Self::is_header_line(&cleaned) {
                continue;
            }
            return Some((i, cleaned));
        }
        None
    }

    /// Fallback: a lone alphabetic token that is not boilerplate, skipping
    /// the line already taken as the surname.
    fn single_token_name(lines: &[&str], skip: Option<usize>) -> Option<String> {
        for (i, line) in lines.iter().enumerate() {
            if Some(i) == skip {
                continue;
            }
            let cleaned = Self::clean_name(line.trim());
            if cleaned.is_empty() || cleaned.contains(' ') || cleaned.chars().count() < 3 {
                continue;
            }
            if !cleaned.chars().all(|c| c.is_alphabetic()) {
                continue;
            }
            if Self::is_header_line(&cleaned) {
                continue;
            }
            return Some(cleaned);
        }
        None
    }

    fn is_header_line(value: &str) -> bool {
        let plain = strip_diacritics(value).to_uppercase();
        plain.split_whitespace().all(|token| HEADER_WORDS.contains(&token))
    }

    /// Keep letters (accents included), hyphens and apostrophes; everything
    /// else becomes a separator, then whitespace collapses.
    fn clean_name(value: &str) -> String {
        let kept: String = value
            .chars()
            .map(|c| {
                if c.is_alphabetic() || c == '-' || c == '\'' {
                    c
                } else {
                    ' '
                }
            })
            .collect();
        kept.split_whitespace().collect::<Vec<_>>().join(" ")
    }

    fn extract_birth_date(text: &str) -> Option<String> {
        let lines: Vec<&str> = text.lines().collect();
        if let Some(date) = Self::labeled_date(&lines, &BIRTH_LABEL_RE) {
            return Some(date);
        }
        // Cards print the birth date before the expedition date, so the
        // first date in the transcript is the best remaining guess.
        let dates = Self::find_dates(text);
        if !dates.is_empty() {
            debug!("no labeled birth date, taking the first of {} dates", dates.len());
        }
        dates.into_iter().next()
    }

    fn extract_expedition_date(text: &str, birth_date: Option<&str>) -> Option<String> {
        let lines: Vec<&str> = text.lines().collect();
        if let Some(date) = Self::labeled_date(&lines, &EXPEDITION_LABEL_RE) {
            return Some(date);
        }
        let dates = Self::find_dates(text);
        if dates.len() == 2 {
            if let Some(birth) = birth_date {
                if let Some(other) = dates.iter().find(|d| d.as_str() != birth) {
                    debug!("two dates and a known birth date, taking the other one");
                    return Some(other.clone());
                }
            }
        }
        if dates.len() >= 2 {
            debug!("assuming the second of {} dates is the expedition date", dates.len());
            return Some(dates[1].clone());
        }
        None
    }

    /// A date sitting after the label on the same line, or anywhere on the
    /// following line.
    fn labeled_date(lines: &[&str], label: &Regex) -> Option<String> {
        for (i, line) in lines.iter().enumerate() {
            if let Some(found) = label.find(line) {
                if let Some(date) = Self::find_dates(&line[found.end()..]).into_iter().next() {
                    return Some(date);
                }
                if let Some(next) = lines.get(i + 1) {
                    if let Some(date) = Self::find_dates(next).into_iter().next() {
                        return Some(date);
                    }
                }
            }
        }
        None
    }

    /// Every normalizable date in order of appearance.
    fn find_dates(text: &str) -> Vec<String> {
        DATE_RE
            .find_iter(text)
            .filter_map(|found| Self::normalize_date(found.as_str()))
            .collect()
    }

    /// Normalize any supported date form to DD/MM/YYYY. Unparseable input
    /// yields None, never an error.
    pub fn normalize_date(raw: &str) -> Option<String> {
        let value = strip_diacritics(raw).trim().to_uppercase();
        if let Some(c) = MONTH_DATE_RE.captures(&value) {
            let day = c[1].parse::<u32>().ok()?;
            let month = Self::month_number(&c[2])?;
            let year = c[3].parse::<u32>().ok()?;
            return Self::format_date(day, month, year);
        }
        if let Some(c) = ISO_DATE_RE.captures(&value) {
            let year = c[1].parse::<u32>().ok()?;
            let month = c[2].parse::<u32>().ok()?;
            let day = c[3].parse::<u32>().ok()?;
            return Self::format_date(day, month, year);
        }
        if let Some(c) = NUMERIC_DATE_RE.captures(&value) {
            let day = c[1].parse::<u32>().ok()?;
            let month = c[2].parse::<u32>().ok()?;
            let mut year = c[3].parse::<u32>().ok()?;
            if year < 100 {
                year = if year <= 30 { 2000 + year } else { 1900 + year };
            }
            return Self::format_date(day, month, year);
        }
        None
    }

    fn format_date(day: u32, month: u32, year: u32) -> Option<String> {
        if !(1..=12).contains(&month) || !(1..=31).contains(&day) || year < 1000 {
            return None;
        }
        Some(format!("{:02}/{:02}/{:04}", day, month, year))
    }

    fn month_number(abbrev: &str) -> Option<u32> {
        match abbrev {
            "ENE" => Some(1),
            "FEB" => Some(2),
            "MAR" => Some(3),
            "ABR" => Some(4),
            "MAY" => Some(5),
            "JUN" => Some(6),
            "JUL" => Some(7),
            "AGO" => Some(8),
            "SEP" => Some(9),
            "OCT" => Some(10),
            "NOV" => Some(11),
            "DIC" => Some(12),
            _ => None,
        }
    }

    fn extract_gender(text: &str) -> Option<Gender> {
        if let Some(c) = GENDER_LABEL_RE.captures(text) {
            return c[1].chars().next().and_then(Gender::from_letter);
        }
        for line in text.lines() {
            let trimmed = line.trim();
            if trimmed.eq_ignore_ascii_case("M") || trimmed.eq_ignore_ascii_case("F") {
                return trimmed.chars().next().and_then(Gender::from_letter);
            }
        }
        GENDER_TOKEN_RE
            .captures(text)
            .and_then(|c| c[1].chars().next().and_then(Gender::from_letter))
    }

    fn extract_height(text: &str) -> Option<String> {
        if let Some(c) = HEIGHT_LABEL_RE.captures(text) {
            return Some(c[1].replace(',', "."));
        }
        HEIGHT_TOKEN_RE
            .find(text)
            .map(|found| found.as_str().replace(',', "."))
    }

    fn extract_blood_type(text: &str) -> Option<String> {
        if let Some(c) = BLOOD_LABEL_RE.captures(text) {
            return Some(c[1].to_uppercase());
        }
        BLOOD_TOKEN_RE.find(text).map(|found| found.as_str().to_string())
    }
}
