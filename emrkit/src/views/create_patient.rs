// emrkit/src/views/create_patient.rs
//
// Controlled create-patient form

use tracing::{info, warn};

use super::command::{Command, Request, Response};
use crate::api::Operation;
use crate::errors::EmrError;
use crate::inflight::{InFlight, InFlightKey};
use crate::route::Route;
use crate::types::PatientInput;

pub const GENDERS: &[&str] = &["Male", "Female", "Other"];
pub const BLOOD_TYPES: &[&str] = &["A+", "A-", "B+", "B-", "AB+", "AB-", "O+", "O-"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Name,
    Dob,
    Gender,
    BloodType,
    ContactNumber,
}

impl Field {
    pub const ALL: [Field; 5] = [
        Field::Name,
        Field::Dob,
        Field::Gender,
        Field::BloodType,
        Field::ContactNumber,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Field::Name => "Full Name",
            Field::Dob => "Date of Birth",
            Field::Gender => "Gender",
            Field::BloodType => "Blood Type",
            Field::ContactNumber => "Contact Number",
        }
    }

    pub fn placeholder(&self) -> &'static str {
        match self {
            Field::Name => "e.g., Jane Doe",
            Field::Dob => "YYYY-MM-DD",
            Field::Gender => "Select Gender",
            Field::BloodType => "Select Blood Type",
            Field::ContactNumber => "e.g., +1-555-0100",
        }
    }

    /// Fixed option list for select-style fields.
    pub fn choices(&self) -> Option<&'static [&'static str]> {
        match self {
            Field::Gender => Some(GENDERS),
            Field::BloodType => Some(BLOOD_TYPES),
            _ => None,
        }
    }

    pub fn next(&self) -> Field {
        let i = Field::ALL.iter().position(|f| f == self).unwrap_or(0);
        Field::ALL[(i + 1) % Field::ALL.len()]
    }

    pub fn previous(&self) -> Field {
        let i = Field::ALL.iter().position(|f| f == self).unwrap_or(0);
        Field::ALL[(i + Field::ALL.len() - 1) % Field::ALL.len()]
    }
}

#[derive(Debug)]
pub struct CreatePatientView {
    input: PatientInput,
    focus: Field,
    submitting: bool,
    error: Option<String>,
    inflight: InFlight,
}

impl CreatePatientView {
    pub fn new(inflight: InFlight) -> Self {
        Self {
            input: PatientInput::default(),
            focus: Field::Name,
            submitting: false,
            error: None,
            inflight,
        }
    }

    pub fn input(&self) -> &PatientInput {
        &self.input
    }

    pub fn value(&self, field: Field) -> &str {
        match field {
            Field::Name => &self.input.name,
            Field::Dob => &self.input.dob,
            Field::Gender => &self.input.gender,
            Field::BloodType => &self.input.blood_type,
            Field::ContactNumber => &self.input.contact_number,
        }
    }

    fn value_mut(&mut self, field: Field) -> &mut String {
        match field {
            Field::Name => &mut self.input.name,
            Field::Dob => &mut self.input.dob,
            Field::Gender => &mut self.input.gender,
            Field::BloodType => &mut self.input.blood_type,
            Field::ContactNumber => &mut self.input.contact_number,
        }
    }

    /// Inputs are frozen while a submission is pending.
    pub fn set_value(&mut self, field: Field, value: impl Into<String>) {
        if !self.submitting {
            *self.value_mut(field) = value.into();
        }
    }

    pub fn focus(&self) -> Field {
        self.focus
    }

    pub fn set_focus(&mut self, field: Field) {
        self.focus = field;
    }

    pub fn focus_next(&mut self) {
        self.focus = self.focus.next();
    }

    pub fn focus_previous(&mut self) {
        self.focus = self.focus.previous();
    }

    /// Step a select-style field through its options.
    pub fn cycle_choice(&mut self, field: Field, forward: bool) {
        let Some(choices) = field.choices() else {
            return;
        };
        let current = choices.iter().position(|c| *c == self.value(field));
        let next = match (current, forward) {
            (None, true) => 0,
            (None, false) => choices.len() - 1,
            (Some(i), true) => (i + 1) % choices.len(),
            (Some(i), false) => (i + choices.len() - 1) % choices.len(),
        };
        self.set_value(field, choices[next]);
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Validate and send. Missing fields never reach the network.
    pub fn submit(&mut self) -> Option<Command> {
        if self.submitting {
            return None;
        }

        let missing = self.input.missing_fields();
        if !missing.is_empty() {
            let labels: Vec<&str> = Field::ALL
                .iter()
                .zip(["name", "dob", "gender", "blood_type", "contact_number"])
                .filter(|(_, key)| missing.contains(key))
                .map(|(field, _)| field.label())
                .collect();
            let err = EmrError::Validation(format!("Please fill in: {}", labels.join(", ")));
            self.error = Some(err.user_message(Operation::CreatePatient.fallback_message()));
            return None;
        }

        let ticket = self
            .inflight
            .try_acquire(InFlightKey::new(None, Operation::CreatePatient))?;
        self.submitting = true;
        self.error = None;
        Some(Command::guarded(Request::CreatePatient(self.input.trimmed()), ticket))
    }

    /// On success, the route of the new patient's page.
    pub fn apply(&mut self, response: Response) -> Option<Route> {
        match response {
            Response::Created(Ok(patient)) => {
                info!("Created patient {} ({})", patient.name, patient.id);
                self.submitting = false;
                Some(Route::PatientDetails(patient.id))
            }
            Response::Created(Err(e)) => {
                warn!("Create patient failed: {}", e);
                self.submitting = false;
                self.error = Some(e.user_message(Operation::CreatePatient.fallback_message()));
                None
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{EmrApi, MemoryEmr};

    fn filled() -> CreatePatientView {
        let mut view = CreatePatientView::new(InFlight::new());
        view.set_value(Field::Name, "Jane Doe");
        view.set_value(Field::Dob, "1990-01-01");
        view.set_value(Field::Gender, "Female");
        view.set_value(Field::BloodType, "O+");
        view.set_value(Field::ContactNumber, "+1-555-0100");
        view
    }

    #[test]
    fn test_missing_fields_block_submit() {
        let mut view = CreatePatientView::new(InFlight::new());
        view.set_value(Field::Name, "Jane Doe");
        assert!(view.submit().is_none());
        assert_eq!(
            view.error(),
            Some("Please fill in: Date of Birth, Gender, Blood Type, Contact Number")
        );
        assert!(!view.is_submitting());
    }

    #[tokio::test]
    async fn test_submit_navigates_to_details() {
        let emr = MemoryEmr::with_demo_data();
        let mut view = filled();

        let command = view.submit().unwrap();
        assert!(view.is_submitting());
        assert!(view.submit().is_none());

        let route = view.apply(command.run(&emr).await).unwrap();
        let Route::PatientDetails(id) = route else {
            panic!("expected details route");
        };
        let created = emr.get_patient(&id).await.unwrap();
        assert_eq!(created.name, "Jane Doe");
        assert_eq!(created.blood_type, "O+");
    }

    #[tokio::test]
    async fn test_failure_keeps_values() {
        let emr = MemoryEmr::new();
        emr.fail(Operation::CreatePatient, EmrError::Transport("timed out".into()));
        let mut view = filled();

        let command = view.submit().unwrap();
        assert!(view.apply(command.run(&emr).await).is_none());
        assert!(!view.is_submitting());
        assert_eq!(
            view.error(),
            Some("Failed to create patient. Please ensure all fields are valid.")
        );
        assert_eq!(view.value(Field::Name), "Jane Doe");
        assert_eq!(view.value(Field::ContactNumber), "+1-555-0100");

        // Retry works once the backend is back.
        emr.recover(Operation::CreatePatient);
        let command = view.submit().unwrap();
        assert!(view.apply(command.run(&emr).await).is_some());
    }

    #[test]
    fn test_cycle_choices() {
        let mut view = CreatePatientView::new(InFlight::new());
        view.cycle_choice(Field::Gender, true);
        assert_eq!(view.value(Field::Gender), "Male");
        view.cycle_choice(Field::Gender, false);
        view.cycle_choice(Field::Gender, false);
        assert_eq!(view.value(Field::Gender), "Female");

        view.cycle_choice(Field::BloodType, false);
        assert_eq!(view.value(Field::BloodType), "O-");

        view.cycle_choice(Field::Name, true);
        assert_eq!(view.value(Field::Name), "");
    }

    #[test]
    fn test_focus_wraps() {
        let mut view = CreatePatientView::new(InFlight::new());
        view.focus_previous();
        assert_eq!(view.focus(), Field::ContactNumber);
        view.focus_next();
        assert_eq!(view.focus(), Field::Name);
    }
}
