// emrkit/src/types.rs
//
// Wire and domain types for the EMR backend

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::EmrError;

/// Ids arrive as JSON numbers from one backend and strings from another.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Int(i64),
    Text(String),
}

impl From<RawId> for String {
    fn from(raw: RawId) -> Self {
        match raw {
            RawId::Int(n) => n.to_string(),
            RawId::Text(s) => s,
        }
    }
}

/// Server-assigned patient identity. Opaque to the client.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "RawId", into = "String")]
pub struct PatientId(String);

/// Server-assigned note identity. Opaque to the client.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "RawId", into = "String")]
pub struct NoteId(String);

impl From<RawId> for PatientId {
    fn from(raw: RawId) -> Self {
        PatientId(raw.into())
    }
}

impl From<RawId> for NoteId {
    fn from(raw: RawId) -> Self {
        NoteId(raw.into())
    }
}

impl From<PatientId> for String {
    fn from(id: PatientId) -> Self {
        id.0
    }
}

impl From<NoteId> for String {
    fn from(id: NoteId) -> Self {
        id.0
    }
}

impl PatientId {
    pub fn new(id: impl Into<String>) -> Self {
        PatientId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl NoteId {
    pub fn new(id: impl Into<String>) -> Self {
        NoteId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PatientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for NoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    pub id: NoteId,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Patient {
    pub id: PatientId,
    pub name: String,
    pub dob: String,
    #[serde(default)]
    pub gender: String,
    #[serde(default)]
    pub blood_type: String,
    #[serde(default)]
    pub contact_number: String,
    #[serde(default)]
    pub notes: Vec<Note>,
}

impl Patient {
    /// Build the client-side record for a patient the server has just created
    /// when the server only echoed the new id back.
    pub fn from_input(id: PatientId, input: PatientInput) -> Self {
        Self {
            id,
            name: input.name,
            dob: input.dob,
            gender: input.gender,
            blood_type: input.blood_type,
            contact_number: input.contact_number,
            notes: Vec::new(),
        }
    }
}

/// Create-form payload (`POST /patients`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PatientInput {
    pub name: String,
    pub dob: String,
    pub gender: String,
    pub blood_type: String,
    pub contact_number: String,
}

impl PatientInput {
    /// Names of required fields that are empty after trimming, in form order.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        [
            ("name", &self.name),
            ("dob", &self.dob),
            ("gender", &self.gender),
            ("blood_type", &self.blood_type),
            ("contact_number", &self.contact_number),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(field, _)| field)
        .collect()
    }

    pub fn trimmed(&self) -> Self {
        Self {
            name: self.name.trim().to_string(),
            dob: self.dob.trim().to_string(),
            gender: self.gender.trim().to_string(),
            blood_type: self.blood_type.trim().to_string(),
            contact_number: self.contact_number.trim().to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewNote {
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub summary: String,
}

/// Raw `{analysis}` body of the predictive-analysis endpoint.
///
/// `analysis` is normally a JSON-encoded string, but some deployments send the
/// decoded object instead; both are kept as a `Value` until charted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisPayload {
    pub analysis: serde_json::Value,
}

/// Chart input derived from an analysis payload: x = labels, y = data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartSeries {
    pub labels: Vec<String>,
    pub data: Vec<f64>,
}

impl ChartSeries {
    pub fn from_payload(payload: &AnalysisPayload) -> Result<Self, EmrError> {
        let series: ChartSeries = match &payload.analysis {
            serde_json::Value::String(encoded) => serde_json::from_str(encoded)?,
            value @ serde_json::Value::Object(_) => serde_json::from_value(value.clone())?,
            other => {
                return Err(EmrError::MalformedPayload(format!(
                    "analysis must be a JSON string or object, got {}",
                    other
                )))
            }
        };

        if series.labels.len() != series.data.len() {
            return Err(EmrError::MalformedPayload(format!(
                "analysis has {} labels but {} data points",
                series.labels.len(),
                series.data.len()
            )));
        }

        Ok(series)
    }

    pub fn points(&self) -> Vec<(f64, f64)> {
        self.data
            .iter()
            .enumerate()
            .map(|(i, value)| (i as f64, *value))
            .collect()
    }

    pub fn bounds(&self) -> (f64, f64) {
        let min = self.data.iter().copied().fold(f64::INFINITY, f64::min);
        let max = self.data.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        if min.is_finite() && max.is_finite() {
            (min, max)
        } else {
            (0.0, 0.0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_ids_accept_numbers_and_strings() {
        let patient: Patient = serde_json::from_value(json!({
            "id": 7,
            "name": "Jane Doe",
            "dob": "1990-01-01",
            "notes": [{"id": "n-1", "content": "BP stable", "timestamp": "2024-03-01 10:00:00"}]
        }))
        .unwrap();

        assert_eq!(patient.id, PatientId::new("7"));
        assert_eq!(patient.notes[0].id, NoteId::new("n-1"));
        assert_eq!(patient.gender, "");
        assert_eq!(patient.notes[0].timestamp.as_deref(), Some("2024-03-01 10:00:00"));
    }

    #[test]
    fn test_ids_serialize_as_strings() {
        let value = serde_json::to_value(PatientId::new("42")).unwrap();
        assert_eq!(value, json!("42"));
    }

    #[test]
    fn test_missing_fields() {
        let input = PatientInput {
            name: "Jane Doe".into(),
            dob: "  ".into(),
            gender: "Female".into(),
            blood_type: String::new(),
            contact_number: "+1-555-0100".into(),
        };
        assert_eq!(input.missing_fields(), vec!["dob", "blood_type"]);
    }

    #[test]
    fn test_chart_from_encoded_string() {
        let payload = AnalysisPayload {
            analysis: json!(r#"{"labels":["t1","t2"],"data":[1,2]}"#),
        };
        let series = ChartSeries::from_payload(&payload).unwrap();
        assert_eq!(series.labels, vec!["t1", "t2"]);
        assert_eq!(series.data, vec![1.0, 2.0]);
        assert_eq!(series.points(), vec![(0.0, 1.0), (1.0, 2.0)]);
    }

    #[test]
    fn test_chart_from_decoded_object() {
        let payload = AnalysisPayload {
            analysis: json!({"labels": ["2024-01", "2024-02", "2024-03"], "data": [61, 64.5, 70]}),
        };
        let series = ChartSeries::from_payload(&payload).unwrap();
        assert_eq!(series.bounds(), (61.0, 70.0));
    }

    #[test]
    fn test_chart_rejects_garbage() {
        let not_json = AnalysisPayload { analysis: json!("not json") };
        assert!(matches!(ChartSeries::from_payload(&not_json), Err(EmrError::MalformedPayload(_))));

        let ragged = AnalysisPayload {
            analysis: json!(r#"{"labels":["t1"],"data":[1,2]}"#),
        };
        assert!(matches!(ChartSeries::from_payload(&ragged), Err(EmrError::MalformedPayload(_))));

        let number = AnalysisPayload { analysis: json!(12) };
        assert!(ChartSeries::from_payload(&number).is_err());
    }
}
