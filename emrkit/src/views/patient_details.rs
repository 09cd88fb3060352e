// emrkit/src/views/patient_details.rs
//
// Patient detail page: notes CRUD plus on-demand AI summary and analysis
//

use tracing::{info, warn};

use super::command::{Command, Request, Response};
use crate::api::Operation;
use crate::errors::EmrError;
use crate::inflight::{InFlight, InFlightKey};
use crate::types::{ChartSeries, Note, NoteId, Patient, PatientId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetailsStatus {
    Loading,
    Ready,
    NotFound,
    Failed,
}

/// One on-demand panel (summary or analysis).
#[derive(Debug, Clone, PartialEq)]
pub struct Panel<T> {
    pub loading: bool,
    pub value: Option<T>,
    pub error: Option<String>,
}

impl<T> Default for Panel<T> {
    fn default() -> Self {
        Self {
            loading: false,
            value: None,
            error: None,
        }
    }
}

impl<T> Panel<T> {
    fn start(&mut self) {
        self.loading = true;
        self.error = None;
    }

    fn finish(&mut self, result: Result<T, EmrError>, operation: Operation) {
        self.loading = false;
        match result {
            Ok(value) => {
                self.value = Some(value);
                self.error = None;
            }
            Err(e) => {
                warn!("{} failed: {}", operation.as_str(), e);
                self.error = Some(e.user_message(operation.fallback_message()));
            }
        }
    }
}

#[derive(Debug)]
pub struct PatientDetailsView {
    patient_id: PatientId,
    status: DetailsStatus,
    patient: Option<Patient>,
    error: Option<String>,

    note_draft: String,
    adding_note: bool,
    deleting_note: Option<NoteId>,
    pending_note_delete: Option<NoteId>,
    notes_error: Option<String>,

    summary: Panel<String>,
    analysis: Panel<ChartSeries>,

    inflight: InFlight,
}

impl PatientDetailsView {
    pub fn new(patient_id: PatientId, inflight: InFlight) -> Self {
        Self {
            patient_id,
            status: DetailsStatus::Loading,
            patient: None,
            error: None,
            note_draft: String::new(),
            adding_note: false,
            deleting_note: None,
            pending_note_delete: None,
            notes_error: None,
            summary: Panel::default(),
            analysis: Panel::default(),
            inflight,
        }
    }

    /// Only the patient record is fetched on mount; the AI panels wait for the user.
    pub fn mount(&mut self) -> Vec<Command> {
        self.status = DetailsStatus::Loading;
        self.error = None;
        vec![Command::new(Request::GetPatient(self.patient_id.clone()))]
    }

    pub fn patient_id(&self) -> &PatientId {
        &self.patient_id
    }

    pub fn status(&self) -> DetailsStatus {
        self.status
    }

    pub fn patient(&self) -> Option<&Patient> {
        self.patient.as_ref()
    }

    pub fn notes(&self) -> &[Note] {
        self.patient.as_ref().map(|p| p.notes.as_slice()).unwrap_or(&[])
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn note_draft(&self) -> &str {
        &self.note_draft
    }

    pub fn set_note_draft(&mut self, draft: impl Into<String>) {
        if !self.adding_note {
            self.note_draft = draft.into();
        }
    }

    pub fn is_adding_note(&self) -> bool {
        self.adding_note
    }

    pub fn deleting_note(&self) -> Option<&NoteId> {
        self.deleting_note.as_ref()
    }

    pub fn pending_note_delete(&self) -> Option<&Note> {
        let id = self.pending_note_delete.as_ref()?;
        self.notes().iter().find(|n| &n.id == id)
    }

    pub fn notes_error(&self) -> Option<&str> {
        self.notes_error.as_deref()
    }

    pub fn summary(&self) -> &Panel<String> {
        &self.summary
    }

    pub fn analysis(&self) -> &Panel<ChartSeries> {
        &self.analysis
    }

    fn key(&self, operation: Operation) -> InFlightKey {
        InFlightKey::new(Some(&self.patient_id), operation)
    }

    /// Whitespace-only drafts are dropped without touching any state.
    pub fn submit_note(&mut self) -> Option<Command> {
        let content = self.note_draft.trim();
        if content.is_empty() || self.adding_note || self.status != DetailsStatus::Ready {
            return None;
        }
        let content = content.to_string();

        let ticket = self.inflight.try_acquire(self.key(Operation::AddNote))?;
        self.adding_note = true;
        self.notes_error = None;
        Some(Command::guarded(
            Request::AddNote {
                patient_id: self.patient_id.clone(),
                content,
            },
            ticket,
        ))
    }

    pub fn request_delete_note(&mut self, note_id: &NoteId) {
        if self.notes().iter().any(|n| &n.id == note_id) {
            self.pending_note_delete = Some(note_id.clone());
        }
    }

    pub fn cancel_delete_note(&mut self) {
        self.pending_note_delete = None;
    }

    pub fn confirm_delete_note(&mut self) -> Option<Command> {
        // Keep the confirmation pending until the running delete finishes.
        if self.deleting_note.is_some() {
            return None;
        }
        let note_id = self.pending_note_delete.take()?;

        let ticket = self.inflight.try_acquire(self.key(Operation::DeleteNote))?;
        self.deleting_note = Some(note_id.clone());
        self.notes_error = None;
        Some(Command::guarded(
            Request::DeleteNote {
                patient_id: self.patient_id.clone(),
                note_id,
            },
            ticket,
        ))
    }

    pub fn request_summary(&mut self) -> Option<Command> {
        if self.summary.loading || self.status != DetailsStatus::Ready {
            return None;
        }
        let ticket = self.inflight.try_acquire(self.key(Operation::GetSummary))?;
        self.summary.start();
        Some(Command::guarded(Request::GetSummary(self.patient_id.clone()), ticket))
    }

    pub fn request_analysis(&mut self) -> Option<Command> {
        if self.analysis.loading || self.status != DetailsStatus::Ready {
            return None;
        }
        let ticket = self.inflight.try_acquire(self.key(Operation::GetAnalysis))?;
        self.analysis.start();
        Some(Command::guarded(Request::GetAnalysis(self.patient_id.clone()), ticket))
    }

    pub fn apply(&mut self, response: Response) {
        match response {
            Response::Patient(Ok(patient)) => {
                self.patient = Some(patient);
                self.status = DetailsStatus::Ready;
                self.error = None;
            }
            Response::Patient(Err(e)) if e.is_not_found() => {
                info!("Patient {} not found", self.patient_id);
                self.status = DetailsStatus::NotFound;
            }
            Response::Patient(Err(e)) => {
                warn!("Failed to fetch patient {}: {}", self.patient_id, e);
                self.status = DetailsStatus::Failed;
                self.error = Some(e.user_message(Operation::GetPatient.fallback_message()));
            }
            Response::NoteAdded(result) => {
                self.adding_note = false;
                match result {
                    Ok(note) => {
                        if let Some(patient) = self.patient.as_mut() {
                            patient.notes.push(note);
                        }
                        self.note_draft.clear();
                    }
                    Err(e) => {
                        warn!("Add note failed: {}", e);
                        self.notes_error = Some(e.user_message(Operation::AddNote.fallback_message()));
                    }
                }
            }
            Response::NoteDeleted { note_id, result } => {
                self.deleting_note = None;
                match result {
                    Ok(()) => {
                        if let Some(patient) = self.patient.as_mut() {
                            patient.notes.retain(|n| n.id != note_id);
                        }
                    }
                    Err(e) => {
                        warn!("Delete note {} failed: {}", note_id, e);
                        self.notes_error = Some(e.user_message(Operation::DeleteNote.fallback_message()));
                    }
                }
            }
            Response::Summary(result) => {
                self.summary.finish(result.map(|s| s.summary), Operation::GetSummary);
            }
            Response::Analysis(result) => {
                self.analysis.finish(result, Operation::GetAnalysis);
            }
            _ => {}
        }
    }
}
