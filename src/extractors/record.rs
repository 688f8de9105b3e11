// src/extractors/record.rs
use serde::{Deserialize, Deserializer, Serialize};

/// Column order of the aggregated dataset.
pub const COLUMNS: [&str; 9] = [
    "title",
    "date",
    "aircraft_type",
    "registration",
    "location",
    "summary",
    "cause",
    "source_pdf",
    "text_length",
];

/// The seven report fields. A field that could not be found is `""`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedFields {
    #[serde(default, deserialize_with = "blank_if_null")]
    pub title: String,
    #[serde(default, deserialize_with = "blank_if_null")]
    pub date: String,
    #[serde(default, deserialize_with = "blank_if_null")]
    pub aircraft_type: String,
    #[serde(default, deserialize_with = "blank_if_null")]
    pub registration: String,
    #[serde(default, deserialize_with = "blank_if_null")]
    pub location: String,
    #[serde(default, deserialize_with = "blank_if_null")]
    pub summary: String,
    #[serde(default, deserialize_with = "blank_if_null")]
    pub cause: String,
}

/// One persisted record per source document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldRecord {
    #[serde(flatten)]
    pub fields: ExtractedFields,
    #[serde(default, deserialize_with = "blank_if_null")]
    pub source_pdf: String,
    #[serde(default)]
    pub text_length: usize,
}

impl FieldRecord {
    pub fn new(fields: ExtractedFields, source_pdf: impl Into<String>, text_length: usize) -> Self {
        Self {
            fields,
            source_pdf: source_pdf.into(),
            text_length,
        }
    }

    /// String cells in [`COLUMNS`] order, excluding `text_length`.
    pub fn text_cells(&self) -> [&str; 8] {
        let f = &self.fields;
        [
            &f.title,
            &f.date,
            &f.aircraft_type,
            &f.registration,
            &f.location,
            &f.summary,
            &f.cause,
            &self.source_pdf,
        ]
    }
}

pub(crate) fn blank_if_null<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_serializes_flat() {
        let record = FieldRecord::new(
            ExtractedFields {
                title: "Cessna 172S, G-ABCD".into(),
                registration: "G-ABCD".into(),
                ..Default::default()
            },
            "cessna.pdf",
            1234,
        );
        let value = serde_json::to_value(&record).unwrap();
        let keys: Vec<_> = value.as_object().unwrap().keys().cloned().collect();
        for column in COLUMNS {
            assert!(keys.iter().any(|k| k == column), "missing {}", column);
        }
        assert_eq!(value["registration"], "G-ABCD");
        assert_eq!(value["text_length"], 1234);
    }

    #[test]
    fn test_nulls_and_missing_fields_read_as_blank() {
        let record: FieldRecord = serde_json::from_str(
            r#"{"title": null, "date": "2020-01-05", "source_pdf": "x.pdf", "text_length": 10, "error": "ignored"}"#,
        )
        .unwrap();
        assert_eq!(record.fields.title, "");
        assert_eq!(record.fields.date, "2020-01-05");
        assert_eq!(record.fields.cause, "");
        assert_eq!(record.text_cells()[7], "x.pdf");
    }

    #[test]
    fn test_wrong_types_are_rejected() {
        assert!(serde_json::from_str::<FieldRecord>(r#"{"text_length": "long"}"#).is_err());
        assert!(serde_json::from_str::<FieldRecord>(r#"[1, 2, 3]"#).is_err());
    }
}
