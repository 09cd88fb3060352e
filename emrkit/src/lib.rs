// emrkit/src/lib.rs
//
// Shared kit for the EMR console: domain types, API clients, view models
//

pub mod api;
pub mod config;
pub mod errors;
pub mod inflight;
pub mod route;
pub mod theme;
pub mod types;
pub mod views;

pub use api::{ApiFactory, ApiMode, EmrApi, Operation};
pub use errors::EmrError;
pub use inflight::{InFlight, InFlightKey};
pub use route::Route;
pub use theme::{PreferenceStore, Theme, ThemeContext};
pub use types::{ChartSeries, Note, NoteId, Patient, PatientId, PatientInput};
