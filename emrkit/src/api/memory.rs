// emrkit/src/api/memory.rs
//
// In-memory EMR backend for demo mode and tests
//

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{Duration, Local};
use parking_lot::RwLock;
use rand::Rng;
use serde_json::json;

use super::{EmrApi, Operation};
use crate::errors::EmrError;
use crate::types::{AnalysisPayload, Note, NoteId, Patient, PatientId, PatientInput, Summary};

#[derive(Default)]
struct Store {
    patients: Vec<Patient>,
    next_patient_id: u64,
    next_note_id: u64,
    failures: HashMap<Operation, EmrError>,
    analysis_override: Option<serde_json::Value>,
    calls: HashMap<Operation, usize>,
}

impl Store {
    fn patient(&self, id: &PatientId) -> Result<&Patient, EmrError> {
        self.patients
            .iter()
            .find(|p| &p.id == id)
            .ok_or_else(|| EmrError::not_found("Patient not found"))
    }

    fn patient_mut(&mut self, id: &PatientId) -> Result<&mut Patient, EmrError> {
        self.patients
            .iter_mut()
            .find(|p| &p.id == id)
            .ok_or_else(|| EmrError::not_found("Patient not found"))
    }
}

/// Behaves like the real backend: integer ids, 404 for unknown patients,
/// a summary built from notes and a JSON-encoded analysis string.
pub struct MemoryEmr {
    store: RwLock<Store>,
}

impl MemoryEmr {
    pub fn new() -> Self {
        Self {
            store: RwLock::new(Store {
                next_patient_id: 1,
                next_note_id: 1,
                ..Store::default()
            }),
        }
    }

    /// A backend pre-populated with a few patients and notes.
    pub fn with_demo_data() -> Self {
        let emr = Self::new();
        let seed = [
            ("Jane Doe", "1990-01-01", "Female", "O+", "+1-555-0100", vec![
                "Presented with mild hypertension, BP 142/91.",
                "Started lisinopril 10mg daily. Follow-up in 4 weeks.",
            ]),
            ("John Smith", "1975-06-12", "Male", "A-", "+1-555-0101", vec![
                "Type 2 diabetes, HbA1c 7.8%.",
            ]),
            ("Maria Garcia", "1988-11-30", "Female", "B+", "+1-555-0102", vec![]),
            ("Wei Chen", "1962-03-08", "Male", "AB+", "+1-555-0103", vec![
                "Post-op review after knee replacement. Wound healing well.",
                "Physiotherapy twice weekly.",
                "Mobility improved, pain 3/10.",
            ]),
        ];

        {
            let mut store = emr.store.write();
            for (name, dob, gender, blood_type, contact, notes) in seed {
                let id = PatientId::new(store.next_patient_id.to_string());
                store.next_patient_id += 1;

                let mut patient = Patient::from_input(
                    id,
                    PatientInput {
                        name: name.to_string(),
                        dob: dob.to_string(),
                        gender: gender.to_string(),
                        blood_type: blood_type.to_string(),
                        contact_number: contact.to_string(),
                    },
                );
                for content in notes {
                    let note_id = NoteId::new(store.next_note_id.to_string());
                    store.next_note_id += 1;
                    patient.notes.push(Note {
                        id: note_id,
                        content: content.to_string(),
                        timestamp: Some(Local::now().format("%Y-%m-%d %H:%M:%S").to_string()),
                    });
                }
                store.patients.push(patient);
            }
        }

        emr
    }

    /// Make every future call of `operation` fail with `error`.
    pub fn fail(&self, operation: Operation, error: EmrError) {
        self.store.write().failures.insert(operation, error);
    }

    pub fn recover(&self, operation: Operation) {
        self.store.write().failures.remove(&operation);
    }

    /// Answer the analysis endpoint with this raw `analysis` value.
    pub fn set_analysis_payload(&self, analysis: serde_json::Value) {
        self.store.write().analysis_override = Some(analysis);
    }

    /// Number of calls made to `operation`, failed ones included.
    pub fn calls(&self, operation: Operation) -> usize {
        self.store.read().calls.get(&operation).copied().unwrap_or(0)
    }

    fn enter(&self, operation: Operation) -> Result<(), EmrError> {
        let mut store = self.store.write();
        *store.calls.entry(operation).or_insert(0) += 1;
        match store.failures.get(&operation) {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }
}

impl Default for MemoryEmr {
    fn default() -> Self {
        Self::new()
    }
}

fn generated_analysis(note_count: usize) -> String {
    let mut rng = rand::thread_rng();
    let points = note_count.max(5);
    let today = Local::now().date_naive();

    let mut score: f64 = rng.gen_range(55.0..75.0);
    let mut labels = Vec::with_capacity(points);
    let mut data = Vec::with_capacity(points);
    for i in 0..points {
        let date = today - Duration::weeks((points - 1 - i) as i64);
        labels.push(date.format("%Y-%m-%d").to_string());
        score = (score + rng.gen_range(-4.0..6.0)).clamp(1.0, 100.0);
        data.push((score * 10.0).round() / 10.0);
    }

    json!({ "labels": labels, "data": data }).to_string()
}

#[async_trait]
impl EmrApi for MemoryEmr {
    async fn list_patients(&self) -> Result<Vec<Patient>, EmrError> {
        self.enter(Operation::ListPatients)?;
        Ok(self.store.read().patients.clone())
    }

    async fn search_patients(&self, query: &str) -> Result<Vec<Patient>, EmrError> {
        self.enter(Operation::SearchPatients)?;
        let needle = query.to_lowercase();
        Ok(self
            .store
            .read()
            .patients
            .iter()
            .filter(|p| p.name.to_lowercase().contains(&needle))
            .cloned()
            .collect())
    }

    async fn create_patient(&self, input: PatientInput) -> Result<Patient, EmrError> {
        self.enter(Operation::CreatePatient)?;
        if let Some(field) = input.missing_fields().first() {
            return Err(EmrError::Status {
                status: 400,
                message: Some(format!("Missing required field: {}", field)),
            });
        }

        let mut store = self.store.write();
        let id = PatientId::new(store.next_patient_id.to_string());
        store.next_patient_id += 1;
        let patient = Patient::from_input(id, input);
        store.patients.push(patient.clone());
        Ok(patient)
    }

    async fn get_patient(&self, id: &PatientId) -> Result<Patient, EmrError> {
        self.enter(Operation::GetPatient)?;
        self.store.read().patient(id).cloned()
    }

    async fn delete_patient(&self, id: &PatientId) -> Result<(), EmrError> {
        self.enter(Operation::DeletePatient)?;
        let mut store = self.store.write();
        let before = store.patients.len();
        store.patients.retain(|p| &p.id != id);
        if store.patients.len() == before {
            return Err(EmrError::not_found("Patient not found"));
        }
        Ok(())
    }

    async fn add_note(&self, patient_id: &PatientId, content: &str) -> Result<Note, EmrError> {
        self.enter(Operation::AddNote)?;
        let mut store = self.store.write();
        let id = NoteId::new(store.next_note_id.to_string());
        store.next_note_id += 1;

        let note = Note {
            id,
            content: content.to_string(),
            timestamp: Some(Local::now().format("%Y-%m-%d %H:%M:%S").to_string()),
        };
        store.patient_mut(patient_id)?.notes.push(note.clone());
        Ok(note)
    }

    async fn delete_note(&self, patient_id: &PatientId, note_id: &NoteId) -> Result<(), EmrError> {
        self.enter(Operation::DeleteNote)?;
        let mut store = self.store.write();
        let patient = store.patient_mut(patient_id)?;
        let before = patient.notes.len();
        patient.notes.retain(|n| &n.id != note_id);
        if patient.notes.len() == before {
            return Err(EmrError::not_found("Note not found or does not belong to the patient."));
        }
        Ok(())
    }

    async fn get_summary(&self, patient_id: &PatientId) -> Result<Summary, EmrError> {
        self.enter(Operation::GetSummary)?;
        let store = self.store.read();
        let patient = store.patient(patient_id)?;
        if patient.notes.is_empty() {
            return Ok(Summary {
                summary: "No notes found for this patient.".to_string(),
            });
        }

        let history = patient
            .notes
            .iter()
            .map(|n| n.content.trim())
            .collect::<Vec<_>>()
            .join(" ");
        Ok(Summary {
            summary: format!(
                "{} ({}, born {}) has {} clinical note(s) on file. Key history: {}",
                patient.name,
                patient.gender,
                patient.dob,
                patient.notes.len(),
                history
            ),
        })
    }

    async fn get_predictive_analysis(&self, patient_id: &PatientId) -> Result<AnalysisPayload, EmrError> {
        self.enter(Operation::GetAnalysis)?;
        let store = self.store.read();
        let patient = store.patient(patient_id)?;

        if let Some(analysis) = &store.analysis_override {
            return Ok(AnalysisPayload {
                analysis: analysis.clone(),
            });
        }
        if patient.notes.is_empty() {
            return Err(EmrError::Status {
                status: 400,
                message: Some("No notes found for this patient to analyze.".to_string()),
            });
        }

        Ok(AnalysisPayload {
            analysis: serde_json::Value::String(generated_analysis(patient.notes.len())),
        })
    }

    fn backend_name(&self) -> &str {
        "in-memory demo backend"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ChartSeries;

    #[tokio::test]
    async fn test_demo_data_round() {
        let emr = MemoryEmr::with_demo_data();
        let patients = emr.list_patients().await.unwrap();
        assert_eq!(patients.len(), 4);
        assert_eq!(patients[0].id, PatientId::new("1"));

        let jane = emr.get_patient(&patients[0].id).await.unwrap();
        assert_eq!(jane.notes.len(), 2);
    }

    #[tokio::test]
    async fn test_unknown_patient_is_not_found() {
        let emr = MemoryEmr::new();
        let err = emr.get_patient(&PatientId::new("999")).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_generated_analysis_is_chartable() {
        let emr = MemoryEmr::with_demo_data();
        let payload = emr.get_predictive_analysis(&PatientId::new("4")).await.unwrap();
        let series = ChartSeries::from_payload(&payload).unwrap();
        assert_eq!(series.labels.len(), 5);
        assert!(series.data.iter().all(|v| (1.0..=100.0).contains(v)));
    }

    #[tokio::test]
    async fn test_analysis_without_notes_is_rejected() {
        let emr = MemoryEmr::with_demo_data();
        let err = emr.get_predictive_analysis(&PatientId::new("3")).await.unwrap_err();
        assert_eq!(
            err.user_message("fallback"),
            "No notes found for this patient to analyze."
        );
    }

    #[tokio::test]
    async fn test_failure_injection() {
        let emr = MemoryEmr::new();
        emr.fail(Operation::ListPatients, EmrError::Transport("connection refused".into()));
        assert!(emr.list_patients().await.is_err());
        emr.recover(Operation::ListPatients);
        assert!(emr.list_patients().await.is_ok());
        assert_eq!(emr.calls(Operation::ListPatients), 2);
    }

    #[tokio::test]
    async fn test_delete_note_wrong_patient() {
        let emr = MemoryEmr::with_demo_data();
        // note 1 belongs to patient 1
        let err = emr
            .delete_note(&PatientId::new("2"), &NoteId::new("1"))
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }
}
