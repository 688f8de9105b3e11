// src/extractors/heuristic.rs
//! Pattern-based field extraction. Works offline and never fails: anything it
//! cannot find is left blank.

use crate::extractors::record::ExtractedFields;
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;

const TITLE_MAX_CHARS: usize = 100;
const SUMMARY_MAX_CHARS: usize = 500;

const MONTHS: [&str; 12] = [
    "january", "february", "march", "april", "may", "june",
    "july", "august", "september", "october", "november", "december",
];

// --- Field labels as they appear in the AAIB bulletin header table ---
static AIRCRAFT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?im)\bAircraft(?:\s+Type)?(?:\s+and\s+Registration)?\s*:[ \t]*([^\r\n]*)")
        .expect("Failed to compile AIRCRAFT_RE")
});

// Group 1 is set for the combined "... and Registration:" label, which belongs to the aircraft line.
static REGISTRATION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?im)(\band\s+)?\bRegistration\s*:[ \t]*([^\r\n]*)")
        .expect("Failed to compile REGISTRATION_RE")
});

static DATE_LABEL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?im)\bDate(?:\s*(?:&|and)\s*Time)?(?:\s*\((?:UTC|local)\))?\s*:[ \t]*([^\r\n]*)")
        .expect("Failed to compile DATE_LABEL_RE")
});

static LOCATION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?im)\b(?:Location|Place\s+of\s+(?:Accident|Incident|Occurrence))\s*:[ \t]*([^\r\n]*)")
        .expect("Failed to compile LOCATION_RE")
});

static CAUSE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?im)\b(?:Probable\s+)?Causes?\s*:[ \t]*([^\r\n]*)")
        .expect("Failed to compile CAUSE_RE")
});

static SYNOPSIS_HEADING_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?im)^[ \t]*(?:Synopsis|Summary)[ \t]*:?[ \t]*$")
        .expect("Failed to compile SYNOPSIS_HEADING_RE")
});

// Where a single-line value stops: an ellipsis or the next known label.
static NEXT_LABEL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\s*(?:\.\.\.|…|\b(?:Aircraft(?:\s+Type)?(?:\s+and\s+Registration)?|Registration|Date(?:\s*(?:&|and)\s*Time)?(?:\s*\((?:UTC|local)\))?|Location|Place\s+of\s+(?:Accident|Incident|Occurrence)|(?:Probable\s+)?Causes?|No\s*&\s*Type\s+of\s+Engines|Year\s+of\s+Manufacture)\s*:)",
    )
    .expect("Failed to compile NEXT_LABEL_RE")
});

// --- Value patterns ---
static REG_MARK_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b[A-Z]{1,2}-[A-Z]{3,4}\b").expect("Failed to compile REG_MARK_RE")
});

static UK_REG_MARK_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\bG-[A-Z]{4}\b").expect("Failed to compile UK_REG_MARK_RE")
});

static ISO_DATE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(\d{4})-(\d{1,2})-(\d{1,2})\b").expect("Failed to compile ISO_DATE_RE")
});

static LONG_DATE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(\d{1,2})(?:st|nd|rd|th)?\s+(january|february|march|april|may|june|july|august|september|october|november|december)\s+(\d{4})\b",
    )
    .expect("Failed to compile LONG_DATE_RE")
});

static SLASH_DATE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(\d{1,2})/(\d{1,2})/(\d{4})\b").expect("Failed to compile SLASH_DATE_RE")
});

#[derive(Debug, Default, Clone, Copy)]
pub struct HeuristicExtractor;

impl HeuristicExtractor {
    pub fn new() -> Self {
        Self
    }

    pub fn extract(&self, text: &str) -> ExtractedFields {
        let aircraft_line = first_labelled(&AIRCRAFT_RE, text).unwrap_or_default();
        let registration = find_registration(text, &aircraft_line);

        // Cut at any mark embedded in the line, not only the chosen registration
        let embedded = REG_MARK_RE.find(&aircraft_line).map(|m| m.start());
        let chosen = Some(registration.as_str())
            .filter(|r| !r.is_empty())
            .and_then(|r| aircraft_line.find(r));
        let cut = embedded.into_iter().chain(chosen).min().unwrap_or(aircraft_line.len());
        let aircraft_type = trim_value(&aircraft_line[..cut]).to_string();

        let date = labelled_values(&DATE_LABEL_RE, text)
            .find_map(|value| find_date(&value))
            .or_else(|| find_date(text))
            .unwrap_or_default();

        let fields = ExtractedFields {
            title: title_line(text),
            date,
            aircraft_type,
            registration,
            location: first_labelled(&LOCATION_RE, text).unwrap_or_default(),
            summary: summary_of(text),
            cause: first_labelled(&CAUSE_RE, text).unwrap_or_default(),
        };
        tracing::debug!("Heuristic extraction: {:?}", fields);
        fields
    }
}

/// Every value after `label_re`, in document order, cut at the next label on the same line.
fn labelled_values<'t>(label_re: &'t Regex, text: &'t str) -> impl Iterator<Item = String> + 't {
    label_re
        .captures_iter(text)
        .filter_map(|caps| caps.get(1))
        .map(|m| cut_at_next_label(m.as_str()))
}

fn first_labelled(label_re: &Regex, text: &str) -> Option<String> {
    labelled_values(label_re, text).find(|v| !v.is_empty())
}

fn cut_at_next_label(value: &str) -> String {
    let end = NEXT_LABEL_RE.find(value).map_or(value.len(), |m| m.start());
    trim_value(&value[..end]).to_string()
}

fn trim_value(value: &str) -> &str {
    value.trim_matches(|c: char| c.is_whitespace() || matches!(c, ',' | ';' | '.' | '…'))
}

fn find_registration(text: &str, aircraft_line: &str) -> String {
    let labelled = REGISTRATION_RE
        .captures_iter(text)
        .filter(|caps| caps.get(1).is_none())
        .filter_map(|caps| caps.get(2))
        .map(|m| cut_at_next_label(m.as_str()))
        .find(|v| !v.is_empty());

    if let Some(value) = labelled {
        return REG_MARK_RE
            .find(&value)
            .map(|m| m.as_str().to_string())
            .unwrap_or_else(|| value.split_whitespace().next().map(trim_value).unwrap_or_default().to_string());
    }

    REG_MARK_RE
        .find(aircraft_line)
        .or_else(|| UK_REG_MARK_RE.find(text))
        .map(|m| m.as_str().to_string())
        .unwrap_or_default()
}

/// Earliest valid calendar date in `text`, as `YYYY-MM-DD`.
fn find_date(text: &str) -> Option<String> {
    let mut candidates: Vec<(usize, NaiveDate)> = Vec::new();

    for caps in ISO_DATE_RE.captures_iter(text) {
        if let Some(date) = ymd(&caps[1], &caps[2], &caps[3]) {
            candidates.push((caps.get(0).map_or(0, |m| m.start()), date));
        }
    }
    for caps in LONG_DATE_RE.captures_iter(text) {
        let month = caps[2].to_lowercase();
        let Some(index) = MONTHS.iter().position(|m| *m == month) else { continue };
        if let Some(date) = ymd(&caps[3], &(index + 1).to_string(), &caps[1]) {
            candidates.push((caps.get(0).map_or(0, |m| m.start()), date));
        }
    }
    for caps in SLASH_DATE_RE.captures_iter(text) {
        // UK order: day/month/year
        if let Some(date) = ymd(&caps[3], &caps[2], &caps[1]) {
            candidates.push((caps.get(0).map_or(0, |m| m.start()), date));
        }
    }

    candidates
        .into_iter()
        .min_by_key(|(pos, _)| *pos)
        .map(|(_, date)| date.format("%Y-%m-%d").to_string())
}

fn ymd(year: &str, month: &str, day: &str) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year.parse().ok()?, month.parse().ok()?, day.parse().ok()?)
}

fn title_line(text: &str) -> String {
    text.lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(|line| line.chars().take(TITLE_MAX_CHARS).collect::<String>().trim_end().to_string())
        .unwrap_or_default()
}

/// Text after a Synopsis/Summary heading if there is one, otherwise the leading text.
fn summary_of(text: &str) -> String {
    let body = SYNOPSIS_HEADING_RE
        .find(text)
        .map_or(text, |m| &text[m.end()..]);
    let collapsed = body.split_whitespace().collect::<Vec<_>>().join(" ");
    truncate_at_word(&collapsed, SUMMARY_MAX_CHARS)
}

fn truncate_at_word(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let cut: String = text.chars().take(max_chars).collect();
    match cut.rfind(' ') {
        Some(pos) if pos > 0 => cut[..pos].trim_end().to_string(),
        _ => cut,
    }
}
