// emrkit/src/api/http.rs
//
// HTTP client for the EMR backend (JSON over reqwest)
//

use std::time::Instant;

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, warn};
use uuid::Uuid;

use super::{EmrApi, Operation};
use crate::config::ApiConfig;
use crate::errors::EmrError;
use crate::types::{AnalysisPayload, NewNote, Note, NoteId, Patient, PatientId, PatientInput, Summary};

/// `GET /patients` has been seen answering both shapes.
#[derive(Deserialize)]
#[serde(untagged)]
enum PatientList {
    Bare(Vec<Patient>),
    Wrapped { patients: Vec<Patient> },
}

impl From<PatientList> for Vec<Patient> {
    fn from(list: PatientList) -> Self {
        match list {
            PatientList::Bare(patients) => patients,
            PatientList::Wrapped { patients } => patients,
        }
    }
}

/// `POST /patients` answers either the full record or just `{id, message}`.
#[derive(Deserialize)]
#[serde(untagged)]
enum Created {
    Full(Patient),
    IdOnly { id: PatientId },
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

pub struct HttpEmrClient {
    client: reqwest::Client,
    base_url: String,
    summary_endpoint: String,
    analysis_endpoint: String,
}

impl HttpEmrClient {
    pub fn new(config: &ApiConfig) -> Result<Self, EmrError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.request_timeout() {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| EmrError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            summary_endpoint: config.summary_endpoint.trim_matches('/').to_string(),
            analysis_endpoint: config.analysis_endpoint.trim_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client.request(method, format!("{}{}", self.base_url, path))
    }

    /// Send, log, and turn non-2xx answers into `EmrError::Status`.
    async fn send(&self, operation: Operation, request: RequestBuilder) -> Result<Response, EmrError> {
        let request_id = Uuid::new_v4();
        let started = Instant::now();

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                warn!(%request_id, operation = operation.as_str(), "Request failed: {}", e);
                return Err(e.into());
            }
        };

        let status = response.status();
        debug!(
            %request_id,
            operation = operation.as_str(),
            status = status.as_u16(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Request completed"
        );

        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&body).ok().map(|b| b.error);
        warn!(
            %request_id,
            operation = operation.as_str(),
            status = status.as_u16(),
            "Backend rejected request: {}",
            message.as_deref().unwrap_or("<no error body>")
        );

        Err(EmrError::Status {
            status: status.as_u16(),
            message,
        })
    }

    async fn json<T: DeserializeOwned>(&self, operation: Operation, request: RequestBuilder) -> Result<T, EmrError> {
        let response = self.send(operation, request).await?;
        Ok(response.json::<T>().await?)
    }
}

#[async_trait]
impl EmrApi for HttpEmrClient {
    async fn list_patients(&self) -> Result<Vec<Patient>, EmrError> {
        let list: PatientList = self
            .json(Operation::ListPatients, self.request(Method::GET, "/patients"))
            .await?;
        Ok(list.into())
    }

    async fn search_patients(&self, query: &str) -> Result<Vec<Patient>, EmrError> {
        let request = self.request(Method::GET, "/patients/search").query(&[("q", query)]);
        let list: PatientList = self.json(Operation::SearchPatients, request).await?;
        Ok(list.into())
    }

    async fn create_patient(&self, input: PatientInput) -> Result<Patient, EmrError> {
        let request = self.request(Method::POST, "/patients").json(&input);
        let created: Created = self.json(Operation::CreatePatient, request).await?;
        Ok(match created {
            Created::Full(patient) => patient,
            Created::IdOnly { id } => Patient::from_input(id, input),
        })
    }

    async fn get_patient(&self, id: &PatientId) -> Result<Patient, EmrError> {
        let path = format!("/patients/{}", id);
        self.json(Operation::GetPatient, self.request(Method::GET, &path)).await
    }

    async fn delete_patient(&self, id: &PatientId) -> Result<(), EmrError> {
        let path = format!("/patients/{}", id);
        self.send(Operation::DeletePatient, self.request(Method::DELETE, &path))
            .await?;
        Ok(())
    }

    async fn add_note(&self, patient_id: &PatientId, content: &str) -> Result<Note, EmrError> {
        let path = format!("/patients/{}/notes", patient_id);
        let body = NewNote {
            content: content.to_string(),
        };
        self.json(Operation::AddNote, self.request(Method::POST, &path).json(&body))
            .await
    }

    async fn delete_note(&self, patient_id: &PatientId, note_id: &NoteId) -> Result<(), EmrError> {
        let path = format!("/patients/{}/notes/{}", patient_id, note_id);
        self.send(Operation::DeleteNote, self.request(Method::DELETE, &path))
            .await?;
        Ok(())
    }

    async fn get_summary(&self, patient_id: &PatientId) -> Result<Summary, EmrError> {
        let path = format!("/patients/{}/{}", patient_id, self.summary_endpoint);
        self.json(Operation::GetSummary, self.request(Method::GET, &path)).await
    }

    async fn get_predictive_analysis(&self, patient_id: &PatientId) -> Result<AnalysisPayload, EmrError> {
        let path = format!("/patients/{}/{}", patient_id, self.analysis_endpoint);
        self.json(Operation::GetAnalysis, self.request(Method::GET, &path)).await
    }

    fn backend_name(&self) -> &str {
        &self.base_url
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_list_shapes_normalize() {
        let bare: PatientList = serde_json::from_value(json!([
            {"id": 1, "name": "Ann", "dob": "1980-02-03"}
        ]))
        .unwrap();
        let wrapped: PatientList = serde_json::from_value(json!({
            "patients": [{"id": 1, "name": "Ann", "dob": "1980-02-03"}]
        }))
        .unwrap();

        let bare: Vec<Patient> = bare.into();
        let wrapped: Vec<Patient> = wrapped.into();
        assert_eq!(bare, wrapped);
    }

    #[test]
    fn test_created_id_only() {
        let created: Created = serde_json::from_value(json!({
            "id": 12,
            "message": "Patient created successfully"
        }))
        .unwrap();
        assert!(matches!(created, Created::IdOnly { ref id } if id.as_str() == "12"));
    }

    #[test]
    fn test_base_url_trimmed() {
        let config = ApiConfig {
            base_url: "http://localhost:5000/api/".to_string(),
            summary_endpoint: "/summary-perplexity/".to_string(),
            ..ApiConfig::default()
        };
        let client = HttpEmrClient::new(&config).unwrap();
        assert_eq!(client.base_url(), "http://localhost:5000/api");
        assert_eq!(client.summary_endpoint, "summary-perplexity");
    }
}
