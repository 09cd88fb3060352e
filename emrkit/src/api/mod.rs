// emrkit/src/api/mod.rs
//
// EmrApi - one method per remote operation, no retries, no caching
//

pub mod factory;
pub mod http;
pub mod memory;

use async_trait::async_trait;

use crate::errors::EmrError;
use crate::types::{AnalysisPayload, Note, NoteId, Patient, PatientId, PatientInput, Summary};

pub use factory::{ApiFactory, ApiMode};
pub use http::HttpEmrClient;
pub use memory::MemoryEmr;

/// Remote operations, used for log fields, failure injection and in-flight keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    ListPatients,
    SearchPatients,
    CreatePatient,
    GetPatient,
    DeletePatient,
    AddNote,
    DeleteNote,
    GetSummary,
    GetAnalysis,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::ListPatients => "list_patients",
            Operation::SearchPatients => "search_patients",
            Operation::CreatePatient => "create_patient",
            Operation::GetPatient => "get_patient",
            Operation::DeletePatient => "delete_patient",
            Operation::AddNote => "add_note",
            Operation::DeleteNote => "delete_note",
            Operation::GetSummary => "get_summary",
            Operation::GetAnalysis => "get_analysis",
        }
    }

    /// Message shown when the operation fails without a server-provided one.
    pub fn fallback_message(&self) -> &'static str {
        match self {
            Operation::ListPatients => "Failed to fetch patients. Make sure the backend server is running.",
            Operation::SearchPatients => "Failed to search patients.",
            Operation::CreatePatient => "Failed to create patient. Please ensure all fields are valid.",
            Operation::GetPatient => "Failed to fetch patient details. The patient might not exist.",
            Operation::DeletePatient => "Failed to delete patient.",
            Operation::AddNote => "Failed to add note.",
            Operation::DeleteNote => "Failed to delete note.",
            Operation::GetSummary => "Failed to get AI summary.",
            Operation::GetAnalysis => "Failed to get predictive analysis.",
        }
    }
}

#[async_trait]
pub trait EmrApi: Send + Sync {
    async fn list_patients(&self) -> Result<Vec<Patient>, EmrError>;
    async fn search_patients(&self, query: &str) -> Result<Vec<Patient>, EmrError>;
    async fn create_patient(&self, input: PatientInput) -> Result<Patient, EmrError>;
    async fn get_patient(&self, id: &PatientId) -> Result<Patient, EmrError>;
    async fn delete_patient(&self, id: &PatientId) -> Result<(), EmrError>;
    async fn add_note(&self, patient_id: &PatientId, content: &str) -> Result<Note, EmrError>;
    async fn delete_note(&self, patient_id: &PatientId, note_id: &NoteId) -> Result<(), EmrError>;
    async fn get_summary(&self, patient_id: &PatientId) -> Result<Summary, EmrError>;
    async fn get_predictive_analysis(&self, patient_id: &PatientId) -> Result<AnalysisPayload, EmrError>;

    fn backend_name(&self) -> &str;
}
