//! Crossref response envelope and metadata records
//!
//! Crossref wraps every answer as
//! `{"status": "...", "message-type": "...", "message": ...}`. A single
//! work lookup returns `message-type: work` with the record as `message`;
//! a filtered query returns `work-list` with records under
//! `message.items`. Errors come back as `status: failed` with a list of
//! problems in `message`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use doiline_core::FetchError;

use crate::doi::Doi;

/// Self-identifying field of a Crossref work
pub const DOI_FIELD: &str = "DOI";

/// One work's metadata, passed through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MetadataRecord(Value);

impl MetadataRecord {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    /// The record's own DOI, normalized. `None` when the field is absent,
    /// not a string, or blank.
    pub fn doi(&self) -> Option<Doi> {
        self.0
            .get(DOI_FIELD)
            .and_then(Value::as_str)
            .map(Doi::normalize)
            .filter(|doi| !doi.is_empty())
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }
}

/// Registry answer, resolved once at the fetcher boundary.
#[derive(Debug, Clone, PartialEq)]
pub enum WorksResponse {
    Single(MetadataRecord),
    List(Vec<MetadataRecord>),
}

impl WorksResponse {
    pub fn into_records(self) -> Vec<MetadataRecord> {
        match self {
            Self::Single(record) => vec![record],
            Self::List(records) => records,
        }
    }

    /// Pair each record with its DOI, dropping records without one.
    pub fn into_pairs(self) -> Vec<(Doi, MetadataRecord)> {
        self.into_records()
            .into_iter()
            .filter_map(|record| record.doi().map(|doi| (doi, record)))
            .collect()
    }
}

#[derive(Deserialize)]
struct Envelope {
    status: String,
    #[serde(rename = "message-type", default)]
    message_type: String,
    #[serde(default)]
    message: Value,
}

/// Parse a Crossref response body.
pub fn parse_works_body(body: &str) -> Result<WorksResponse, FetchError> {
    let envelope: Envelope = serde_json::from_str(body)?;

    if envelope.status != "ok" {
        return Err(FetchError::Registry(format!(
            "status '{}' ({}): {}",
            envelope.status,
            envelope.message_type,
            summarize(&envelope.message)
        )));
    }

    match envelope.message_type.as_str() {
        "work" => {
            if !envelope.message.is_object() {
                return Err(FetchError::Decode("work message is not an object".into()));
            }
            Ok(WorksResponse::Single(MetadataRecord(envelope.message)))
        }
        "work-list" => match envelope.message {
            Value::Object(mut message) => match message.remove("items") {
                Some(Value::Array(items)) => Ok(WorksResponse::List(
                    items.into_iter().map(MetadataRecord).collect(),
                )),
                Some(Value::Null) | None => Ok(WorksResponse::List(Vec::new())),
                Some(_) => Err(FetchError::Decode("work-list items is not an array".into())),
            },
            _ => Err(FetchError::Decode("work-list message is not an object".into())),
        },
        other => Err(FetchError::Decode(format!(
            "unexpected message-type '{other}'"
        ))),
    }
}

/// Short, single-line rendering of an error payload for logs
fn summarize(message: &Value) -> String {
    const MAX_LEN: usize = 200;
    let text = match message {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    if text.len() <= MAX_LEN {
        return text;
    }
    let mut end = MAX_LEN;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &text[..end])
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn single_work() {
        let body = json!({
            "status": "ok",
            "message-type": "work",
            "message": {"DOI": "10.1000/ABC", "title": ["T"]}
        })
        .to_string();
        let resp = parse_works_body(&body).unwrap();
        assert!(matches!(resp, WorksResponse::Single(_)));
        let pairs = resp.into_pairs();
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].0.as_str(), "10.1000/abc");
        // record passes through untouched, original case kept
        assert_eq!(pairs[0].1.as_value()["DOI"], "10.1000/ABC");
    }

    #[test]
    fn work_list() {
        let body = json!({
            "status": "ok",
            "message-type": "work-list",
            "message": {"total-results": 2, "items": [{"DOI": "10.1/a"}, {"DOI": "10.1/b"}]}
        })
        .to_string();
        let resp = parse_works_body(&body).unwrap();
        assert_eq!(resp.into_records().len(), 2);
    }

    #[test]
    fn work_list_without_items_is_empty() {
        let body = json!({
            "status": "ok",
            "message-type": "work-list",
            "message": {"total-results": 0}
        })
        .to_string();
        assert_eq!(parse_works_body(&body).unwrap(), WorksResponse::List(vec![]));
    }

    #[test]
    fn records_without_doi_dropped() {
        let resp = WorksResponse::List(vec![
            MetadataRecord::new(json!({"DOI": "10.1/a"})),
            MetadataRecord::new(json!({"title": "no id"})),
            MetadataRecord::new(json!({"DOI": 7})),
            MetadataRecord::new(json!({"DOI": ""})),
        ]);
        let pairs = resp.into_pairs();
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].0.as_str(), "10.1/a");
    }

    #[test]
    fn failed_status_is_registry_error() {
        let body = json!({
            "status": "failed",
            "message-type": "validation-failure",
            "message": [{"type": "parameter-not-allowed", "value": "x"}]
        })
        .to_string();
        let err = parse_works_body(&body).unwrap_err();
        assert!(matches!(err, FetchError::Registry(_)));
        assert!(err.to_string().contains("validation-failure"));
    }

    #[test]
    fn unknown_message_type_is_decode_error() {
        let body = json!({"status": "ok", "message-type": "member", "message": {}}).to_string();
        assert!(matches!(
            parse_works_body(&body).unwrap_err(),
            FetchError::Decode(_)
        ));
    }

    #[test]
    fn non_json_is_decode_error() {
        assert!(matches!(
            parse_works_body("<html>Bad gateway</html>").unwrap_err(),
            FetchError::Decode(_)
        ));
    }

    #[test]
    fn items_not_array_is_decode_error() {
        let body = json!({
            "status": "ok",
            "message-type": "work-list",
            "message": {"items": {"DOI": "10.1/a"}}
        })
        .to_string();
        assert!(parse_works_body(&body).is_err());
    }

    #[test]
    fn summarize_truncates_on_char_boundary() {
        let long = Value::String("é".repeat(300));
        let s = summarize(&long);
        assert!(s.ends_with("..."));
        assert!(s.len() <= 203);
    }
}
