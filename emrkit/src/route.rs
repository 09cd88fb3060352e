// emrkit/src/route.rs
//
// The three logical pages and their paths

use std::fmt;

use crate::types::PatientId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Dashboard,
    CreatePatient,
    PatientDetails(PatientId),
}

impl Route {
    /// Unknown paths land on the dashboard.
    pub fn parse(path: &str) -> Self {
        let path = path.split(['?', '#']).next().unwrap_or_default();
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

        match segments.as_slice() {
            ["create-patient"] => Route::CreatePatient,
            ["patients", id] => Route::PatientDetails(PatientId::new(*id)),
            _ => Route::Dashboard,
        }
    }

    pub fn path(&self) -> String {
        match self {
            Route::Dashboard => "/".to_string(),
            Route::CreatePatient => "/create-patient".to_string(),
            Route::PatientDetails(id) => format!("/patients/{}", id),
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_known_paths() {
        assert_eq!(Route::parse("/"), Route::Dashboard);
        assert_eq!(Route::parse("/create-patient"), Route::CreatePatient);
        assert_eq!(Route::parse("/patients/42"), Route::PatientDetails(PatientId::new("42")));
        assert_eq!(Route::parse("/patients/42/"), Route::PatientDetails(PatientId::new("42")));
        assert_eq!(Route::parse("/patients/42?tab=notes"), Route::PatientDetails(PatientId::new("42")));
    }

    #[test]
    fn test_parse_unknown_paths() {
        assert_eq!(Route::parse(""), Route::Dashboard);
        assert_eq!(Route::parse("/patients"), Route::Dashboard);
        assert_eq!(Route::parse("/settings"), Route::Dashboard);
    }

    #[test]
    fn test_path_inverts_parse() {
        for route in [
            Route::Dashboard,
            Route::CreatePatient,
            Route::PatientDetails(PatientId::new("abc-1")),
        ] {
            assert_eq!(Route::parse(&route.path()), route);
        }
    }
}
