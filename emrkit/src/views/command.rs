// emrkit/src/views/command.rs
//
// Requests issued by pages and the responses they get back

use tracing::debug;

use crate::api::{EmrApi, Operation};
use crate::errors::EmrError;
use crate::inflight::InFlightTicket;
use crate::types::{ChartSeries, Note, NoteId, Patient, PatientId, PatientInput, Summary};

#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    ListPatients,
    SearchPatients { query: String, seq: u64 },
    CreatePatient(PatientInput),
    GetPatient(PatientId),
    DeletePatient(PatientId),
    AddNote { patient_id: PatientId, content: String },
    DeleteNote { patient_id: PatientId, note_id: NoteId },
    GetSummary(PatientId),
    GetAnalysis(PatientId),
}

impl Request {
    pub fn operation(&self) -> Operation {
        match self {
            Request::ListPatients => Operation::ListPatients,
            Request::SearchPatients { .. } => Operation::SearchPatients,
            Request::CreatePatient(_) => Operation::CreatePatient,
            Request::GetPatient(_) => Operation::GetPatient,
            Request::DeletePatient(_) => Operation::DeletePatient,
            Request::AddNote { .. } => Operation::AddNote,
            Request::DeleteNote { .. } => Operation::DeleteNote,
            Request::GetSummary(_) => Operation::GetSummary,
            Request::GetAnalysis(_) => Operation::GetAnalysis,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    Patients(Result<Vec<Patient>, EmrError>),
    SearchResults { seq: u64, result: Result<Vec<Patient>, EmrError> },
    Created(Result<Patient, EmrError>),
    Patient(Result<Patient, EmrError>),
    PatientDeleted { id: PatientId, result: Result<(), EmrError> },
    NoteAdded(Result<Note, EmrError>),
    NoteDeleted { note_id: NoteId, result: Result<(), EmrError> },
    Summary(Result<Summary, EmrError>),
    Analysis(Result<ChartSeries, EmrError>),
}

/// A request plus the in-flight ticket that keeps duplicates out until it completes.
#[derive(Debug)]
pub struct Command {
    pub request: Request,
    ticket: Option<InFlightTicket>,
}

impl Command {
    pub fn new(request: Request) -> Self {
        Self { request, ticket: None }
    }

    pub fn guarded(request: Request, ticket: InFlightTicket) -> Self {
        Self {
            request,
            ticket: Some(ticket),
        }
    }

    pub fn operation(&self) -> Operation {
        self.request.operation()
    }

    /// Run against `api`. The ticket is released once the response exists.
    pub async fn run(self, api: &dyn EmrApi) -> Response {
        let Command { request, ticket } = self;
        debug!(operation = request.operation().as_str(), "Running command");

        let response = match request {
            Request::ListPatients => Response::Patients(api.list_patients().await),
            Request::SearchPatients { query, seq } => Response::SearchResults {
                seq,
                result: api.search_patients(&query).await,
            },
            Request::CreatePatient(input) => Response::Created(api.create_patient(input).await),
            Request::GetPatient(id) => Response::Patient(api.get_patient(&id).await),
            Request::DeletePatient(id) => {
                let result = api.delete_patient(&id).await;
                Response::PatientDeleted { id, result }
            }
            Request::AddNote { patient_id, content } => {
                Response::NoteAdded(api.add_note(&patient_id, &content).await)
            }
            Request::DeleteNote { patient_id, note_id } => {
                let result = api.delete_note(&patient_id, &note_id).await;
                Response::NoteDeleted { note_id, result }
            }
            Request::GetSummary(id) => Response::Summary(api.get_summary(&id).await),
            Request::GetAnalysis(id) => Response::Analysis(
                api.get_predictive_analysis(&id)
                    .await
                    .and_then(|payload| ChartSeries::from_payload(&payload)),
            ),
        };

        drop(ticket);
        response
    }
}

/// Run every command in order. Handy for tests and for scripted flows.
pub async fn run_all(api: &dyn EmrApi, commands: Vec<Command>) -> Vec<Response> {
    let mut responses = Vec::with_capacity(commands.len());
    for command in commands {
        responses.push(command.run(api).await);
    }
    responses
}
