// emrkit/src/views/dashboard.rs
//
// Patient list: load, search, optimistic delete with rollback

use tracing::{info, warn};

use super::command::{Command, Request, Response};
use super::LoadStatus;
use crate::api::Operation;
use crate::config::SearchMode;
use crate::inflight::{InFlight, InFlightKey};
use crate::types::{Patient, PatientId};

/// Case-insensitive substring match on `name`, original order kept.
pub fn filter_by_name(patients: &[Patient], term: &str) -> Vec<Patient> {
    let needle = term.to_lowercase();
    patients
        .iter()
        .filter(|p| p.name.to_lowercase().contains(&needle))
        .cloned()
        .collect()
}

/// A patient taken out of the lists while its delete is on the wire.
#[derive(Debug, Clone)]
struct Removed {
    patient: Patient,
    base_index: usize,
    visible_index: Option<usize>,
    /// Remote search the visible index refers to.
    search_seq: u64,
}

#[derive(Debug)]
pub struct DashboardView {
    status: LoadStatus,
    patients: Vec<Patient>,
    visible: Vec<Patient>,
    search: String,
    search_mode: SearchMode,
    search_seq: u64,
    searching: bool,
    error: Option<String>,
    pending_delete: Option<PatientId>,
    removed: Vec<Removed>,
    inflight: InFlight,
}

impl DashboardView {
    pub fn new(search_mode: SearchMode, inflight: InFlight) -> Self {
        Self {
            status: LoadStatus::Idle,
            patients: Vec::new(),
            visible: Vec::new(),
            search: String::new(),
            search_mode,
            search_seq: 0,
            searching: false,
            error: None,
            pending_delete: None,
            removed: Vec::new(),
            inflight,
        }
    }

    pub fn mount(&mut self) -> Vec<Command> {
        self.status = LoadStatus::Loading;
        self.error = None;
        vec![Command::new(Request::ListPatients)]
    }

    /// Manual refresh; ignored while a load is already running.
    pub fn reload(&mut self) -> Option<Command> {
        if self.status == LoadStatus::Loading {
            return None;
        }
        self.mount().pop()
    }

    pub fn status(&self) -> LoadStatus {
        self.status
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn patients(&self) -> &[Patient] {
        &self.patients
    }

    /// What the list shows: the full list narrowed by the search term.
    pub fn visible(&self) -> &[Patient] {
        &self.visible
    }

    pub fn search(&self) -> &str {
        &self.search
    }

    pub fn search_mode(&self) -> SearchMode {
        self.search_mode
    }

    pub fn is_searching(&self) -> bool {
        self.searching
    }

    pub fn pending_delete(&self) -> Option<&Patient> {
        let id = self.pending_delete.as_ref()?;
        self.patients.iter().find(|p| &p.id == id)
    }

    pub fn is_deleting(&self, id: &PatientId) -> bool {
        self.removed.iter().any(|r| &r.patient.id == id)
    }

    /// Update the term. In remote mode this issues a search for non-empty terms.
    pub fn set_search(&mut self, term: impl Into<String>) -> Option<Command> {
        self.search = term.into();

        match self.search_mode {
            SearchMode::Local => {
                self.refilter();
                None
            }
            SearchMode::Remote => {
                if self.search.trim().is_empty() {
                    self.searching = false;
                    // Results of an older term must not land on the full list.
                    self.search_seq += 1;
                    self.visible = self.patients.clone();
                    return None;
                }
                self.search_seq += 1;
                self.searching = true;
                Some(Command::new(Request::SearchPatients {
                    query: self.search.trim().to_string(),
                    seq: self.search_seq,
                }))
            }
        }
    }

    fn refilter(&mut self) {
        self.visible = filter_by_name(&self.patients, &self.search);
    }

    /// First step of a delete: ask for confirmation.
    pub fn request_delete(&mut self, id: &PatientId) {
        if self.patients.iter().any(|p| &p.id == id) && !self.is_deleting(id) {
            self.pending_delete = Some(id.clone());
        }
    }

    pub fn cancel_delete(&mut self) {
        self.pending_delete = None;
    }

    /// Confirmed delete: the row disappears now and comes back if the server refuses.
    pub fn confirm_delete(&mut self) -> Option<Command> {
        let id = self.pending_delete.take()?;
        let ticket = self
            .inflight
            .try_acquire(InFlightKey::new(Some(&id), Operation::DeletePatient))?;

        let base_index = self.patients.iter().position(|p| p.id == id)?;
        let patient = self.patients.remove(base_index);
        let visible_index = self.visible.iter().position(|p| p.id == id);
        if let Some(index) = visible_index {
            self.visible.remove(index);
        }

        self.error = None;
        self.removed.push(Removed {
            patient,
            base_index,
            visible_index,
            search_seq: self.search_seq,
        });
        Some(Command::guarded(Request::DeletePatient(id), ticket))
    }

    pub fn apply(&mut self, response: Response) {
        match response {
            Response::Patients(Ok(patients)) => {
                info!("Loaded {} patients", patients.len());
                // A reload can overtake a delete still on the wire.
                self.patients = patients
                    .into_iter()
                    .filter(|p| !self.is_deleting(&p.id))
                    .collect();
                self.status = LoadStatus::Ready;
                self.error = None;
                match self.search_mode {
                    SearchMode::Local => self.refilter(),
                    SearchMode::Remote => {
                        if self.search.trim().is_empty() {
                            self.visible = self.patients.clone();
                        }
                    }
                }
            }
            Response::Patients(Err(e)) => {
                warn!("Failed to load patients: {}", e);
                self.status = LoadStatus::Failed;
                self.error = Some(e.user_message(Operation::ListPatients.fallback_message()));
            }
            Response::SearchResults { seq, result } => {
                if seq != self.search_seq {
                    return;
                }
                self.searching = false;
                match result {
                    Ok(patients) => {
                        self.visible = patients
                            .into_iter()
                            .filter(|p| !self.is_deleting(&p.id))
                            .collect();
                    }
                    Err(e) => {
                        warn!("Search failed: {}", e);
                        self.error = Some(e.user_message(Operation::SearchPatients.fallback_message()));
                    }
                }
            }
            Response::PatientDeleted { id, result } => {
                let Some(position) = self.removed.iter().position(|r| r.patient.id == id) else {
                    return;
                };
                let removed = self.removed.remove(position);
                match result {
                    Ok(()) => info!("Patient {} deleted", id),
                    Err(e) => {
                        warn!("Delete of patient {} failed, restoring row: {}", id, e);
                        self.error = Some(e.user_message(Operation::DeletePatient.fallback_message()));
                        if !self.patients.iter().any(|p| p.id == id) {
                            let base_index = removed.base_index.min(self.patients.len());
                            self.patients.insert(base_index, removed.patient.clone());
                        }
                        match (self.search_mode, removed.visible_index) {
                            (SearchMode::Local, _) => self.refilter(),
                            // Only back into the results it was taken from.
                            (SearchMode::Remote, Some(index))
                                if removed.search_seq == self.search_seq
                                    && !self.visible.iter().any(|p| p.id == id) =>
                            {
                                let index = index.min(self.visible.len());
                                self.visible.insert(index, removed.patient);
                            }
                            (SearchMode::Remote, _) => {}
                        }
                    }
                }
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{EmrApi, MemoryEmr};
    use crate::errors::EmrError;
    use crate::types::PatientInput;
    use crate::views::command::run_all;
    use proptest::prelude::*;

    fn patient(id: &str, name: &str) -> Patient {
        Patient::from_input(
            PatientId::new(id),
            PatientInput {
                name: name.to_string(),
                dob: "1990-01-01".to_string(),
                ..PatientInput::default()
            },
        )
    }

    async fn loaded(emr: &MemoryEmr, mode: SearchMode) -> DashboardView {
        let mut view = DashboardView::new(mode, InFlight::new());
        for response in run_all(emr, view.mount()).await {
            view.apply(response);
        }
        view
    }

    #[tokio::test]
    async fn test_mount_loads_list() {
        let emr = MemoryEmr::with_demo_data();
        let view = loaded(&emr, SearchMode::Local).await;
        assert_eq!(view.status(), LoadStatus::Ready);
        assert_eq!(view.visible().len(), 4);
        assert!(view.error().is_none());
    }

    #[tokio::test]
    async fn test_mount_failure_sets_error() {
        let emr = MemoryEmr::new();
        emr.fail(Operation::ListPatients, EmrError::Transport("connection refused".into()));
        let view = loaded(&emr, SearchMode::Local).await;
        assert_eq!(view.status(), LoadStatus::Failed);
        assert_eq!(
            view.error(),
            Some("Failed to fetch patients. Make sure the backend server is running.")
        );
    }

    #[tokio::test]
    async fn test_local_search_is_case_insensitive() {
        let emr = MemoryEmr::with_demo_data();
        let mut view = loaded(&emr, SearchMode::Local).await;

        assert!(view.set_search("JANE").is_none());
        let names: Vec<_> = view.visible().iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Jane Doe"]);

        view.set_search("");
        assert_eq!(view.visible().len(), 4);
        assert_eq!(emr.calls(Operation::SearchPatients), 0);
    }

    #[tokio::test]
    async fn test_remote_search_applies_latest_only() {
        let emr = MemoryEmr::with_demo_data();
        let mut view = loaded(&emr, SearchMode::Remote).await;

        let first = view.set_search("j").unwrap();
        let second = view.set_search("john").unwrap();

        // The newer answer arrives first, the older one after it.
        let newer = second.run(&emr).await;
        let older = first.run(&emr).await;
        view.apply(newer);
        view.apply(older);

        let names: Vec<_> = view.visible().iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["John Smith"]);
        assert!(!view.is_searching());
    }

    #[tokio::test]
    async fn test_remote_search_cleared_shows_everything() {
        let emr = MemoryEmr::with_demo_data();
        let mut view = loaded(&emr, SearchMode::Remote).await;

        let pending = view.set_search("wei").unwrap();
        assert!(view.set_search("  ").is_none());
        view.apply(pending.run(&emr).await);
        assert_eq!(view.visible().len(), 4);
    }

    #[tokio::test]
    async fn test_delete_removes_exactly_one() {
        let emr = MemoryEmr::with_demo_data();
        let mut view = loaded(&emr, SearchMode::Local).await;
        let before: Vec<_> = view.patients().iter().map(|p| p.id.clone()).collect();

        let target = before[1].clone();
        view.request_delete(&target);
        assert_eq!(view.pending_delete().map(|p| p.name.as_str()), Some("John Smith"));
        let command = view.confirm_delete().unwrap();

        // Removed before the server answers.
        assert_eq!(view.patients().len(), 3);
        assert!(view.is_deleting(&target));

        view.apply(command.run(&emr).await);
        let after: Vec<_> = view.patients().iter().map(|p| p.id.clone()).collect();
        let expected: Vec<_> = before.iter().filter(|id| **id != target).cloned().collect();
        assert_eq!(after, expected);
        assert_eq!(view.visible().len(), 3);
        assert!(!view.is_deleting(&target));
    }

    #[tokio::test]
    async fn test_failed_delete_rolls_back_in_place() {
        let emr = MemoryEmr::with_demo_data();
        emr.fail(Operation::DeletePatient, EmrError::Status { status: 500, message: None });
        let mut view = loaded(&emr, SearchMode::Local).await;
        let before = view.patients().to_vec();

        view.request_delete(&before[2].id);
        let command = view.confirm_delete().unwrap();
        view.apply(command.run(&emr).await);

        assert_eq!(view.patients(), before.as_slice());
        assert_eq!(view.visible(), before.as_slice());
        assert_eq!(view.error(), Some("Failed to delete patient."));
    }

    #[tokio::test]
    async fn test_reload_during_delete_keeps_row_out() {
        let emr = MemoryEmr::with_demo_data();
        let mut view = loaded(&emr, SearchMode::Local).await;
        let id = view.patients()[0].id.clone();

        view.request_delete(&id);
        let delete = view.confirm_delete().unwrap();
        let reload = view.reload().unwrap();

        // The list is served before the delete reaches the server.
        view.apply(reload.run(&emr).await);
        assert!(!view.patients().iter().any(|p| p.id == id));
        assert!(!view.visible().iter().any(|p| p.id == id));

        view.apply(delete.run(&emr).await);
        assert!(!view.patients().iter().any(|p| p.id == id));
        assert_eq!(view.patients().len(), 3);
    }

    #[tokio::test]
    async fn test_reload_then_failed_delete_restores_once() {
        let emr = MemoryEmr::with_demo_data();
        emr.fail(Operation::DeletePatient, EmrError::Status { status: 500, message: None });
        let mut view = loaded(&emr, SearchMode::Local).await;
        let before = view.patients().to_vec();
        let id = before[0].id.clone();

        view.request_delete(&id);
        let delete = view.confirm_delete().unwrap();
        let reload = view.reload().unwrap();
        view.apply(reload.run(&emr).await);
        view.apply(delete.run(&emr).await);

        assert_eq!(view.patients().iter().filter(|p| p.id == id).count(), 1);
        assert_eq!(view.patients(), before.as_slice());
        assert_eq!(view.visible().iter().filter(|p| p.id == id).count(), 1);
    }

    #[tokio::test]
    async fn test_remote_rollback_respects_new_term() {
        let emr = MemoryEmr::with_demo_data();
        emr.fail(Operation::DeletePatient, EmrError::Status { status: 500, message: None });
        let mut view = loaded(&emr, SearchMode::Remote).await;

        let search = view.set_search("jane").unwrap();
        view.apply(search.run(&emr).await);
        let jane = view.visible()[0].id.clone();

        view.request_delete(&jane);
        let delete = view.confirm_delete().unwrap();
        let search = view.set_search("john").unwrap();
        view.apply(search.run(&emr).await);
        view.apply(delete.run(&emr).await);

        let names: Vec<_> = view.visible().iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["John Smith"]);
        assert_eq!(view.patients().iter().filter(|p| p.id == jane).count(), 1);
        assert_eq!(view.error(), Some("Failed to delete patient."));
    }

    #[tokio::test]
    async fn test_remote_rollback_same_term_restores_row() {
        let emr = MemoryEmr::with_demo_data();
        emr.fail(Operation::DeletePatient, EmrError::Status { status: 500, message: None });
        let mut view = loaded(&emr, SearchMode::Remote).await;

        let search = view.set_search("jane").unwrap();
        view.apply(search.run(&emr).await);
        let before = view.visible().to_vec();

        view.request_delete(&before[0].id);
        let delete = view.confirm_delete().unwrap();
        assert!(view.visible().is_empty());
        view.apply(delete.run(&emr).await);

        assert_eq!(view.visible(), before.as_slice());
    }

    #[tokio::test]
    async fn test_delete_requires_confirmation() {
        let emr = MemoryEmr::with_demo_data();
        let mut view = loaded(&emr, SearchMode::Local).await;

        assert!(view.confirm_delete().is_none());
        let id = view.patients()[0].id.clone();
        view.request_delete(&id);
        view.cancel_delete();
        assert!(view.confirm_delete().is_none());
        assert_eq!(view.patients().len(), 4);
    }

    #[test]
    fn test_filter_keeps_order() {
        let patients = vec![patient("1", "Anna"), patient("2", "Bob"), patient("3", "Joanna")];
        let names: Vec<_> = filter_by_name(&patients, "ANN")
            .into_iter()
            .map(|p| p.name)
            .collect();
        assert_eq!(names, vec!["Anna", "Joanna"]);
    }

    proptest! {
        #[test]
        fn prop_filter_matches_definition(
            names in proptest::collection::vec("[a-zA-Z ]{0,12}", 0..20),
            term in "[a-zA-Z]{0,3}",
        ) {
            let patients: Vec<Patient> = names
                .iter()
                .enumerate()
                .map(|(i, name)| patient(&i.to_string(), name))
                .collect();

            let filtered = filter_by_name(&patients, &term);
            let expected: Vec<Patient> = patients
                .iter()
                .filter(|p| p.name.to_lowercase().contains(&term.to_lowercase()))
                .cloned()
                .collect();
            prop_assert_eq!(&filtered, &expected);

            if term.is_empty() {
                prop_assert_eq!(filtered.len(), patients.len());
            }
        }
    }

    #[tokio::test]
    async fn test_created_patient_shows_after_reload() {
        let emr = MemoryEmr::with_demo_data();
        emr.create_patient(PatientInput {
            name: "Ada Lovelace".into(),
            dob: "1815-12-10".into(),
            gender: "Female".into(),
            blood_type: "A+".into(),
            contact_number: "+44-20-0000".into(),
        })
        .await
        .unwrap();

        let view = loaded(&emr, SearchMode::Local).await;
        assert!(view.visible().iter().any(|p| p.name == "Ada Lovelace"));
    }
}
