// emrkit/src/views/mod.rs
//
// Page view models and the navigator that mounts them
//

pub mod command;
pub mod create_patient;
pub mod dashboard;
pub mod patient_details;

use tracing::debug;

use crate::config::SearchMode;
use crate::inflight::InFlight;
use crate::route::Route;

pub use command::{Command, Request, Response};
pub use create_patient::{CreatePatientView, Field};
pub use dashboard::{filter_by_name, DashboardView};
pub use patient_details::{DetailsStatus, Panel, PatientDetailsView};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadStatus {
    Idle,
    Loading,
    Ready,
    Failed,
}

#[derive(Debug)]
pub enum Page {
    Dashboard(DashboardView),
    CreatePatient(CreatePatientView),
    PatientDetails(PatientDetailsView),
}

impl Page {
    /// Build the page for `route` and the commands it issues on mount.
    pub fn mount(route: &Route, search_mode: SearchMode, inflight: &InFlight) -> (Page, Vec<Command>) {
        match route {
            Route::Dashboard => {
                let mut view = DashboardView::new(search_mode, inflight.clone());
                let commands = view.mount();
                (Page::Dashboard(view), commands)
            }
            Route::CreatePatient => (Page::CreatePatient(CreatePatientView::new(inflight.clone())), Vec::new()),
            Route::PatientDetails(id) => {
                let mut view = PatientDetailsView::new(id.clone(), inflight.clone());
                let commands = view.mount();
                (Page::PatientDetails(view), commands)
            }
        }
    }

    /// Apply a response; a returned route asks the navigator to move on.
    pub fn apply(&mut self, response: Response) -> Option<Route> {
        match self {
            Page::Dashboard(view) => {
                view.apply(response);
                None
            }
            Page::CreatePatient(view) => view.apply(response),
            Page::PatientDetails(view) => {
                view.apply(response);
                None
            }
        }
    }
}

/// Identifies one mounted page instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PageToken(u64);

#[derive(Debug)]
pub enum Delivery {
    Applied,
    /// The issuing page is gone; the response was dropped.
    Stale,
    /// The page asked to navigate; these are the new page's mount commands.
    Navigated(Vec<Command>),
}

pub struct Navigator {
    route: Route,
    page: Page,
    token: PageToken,
    search_mode: SearchMode,
    inflight: InFlight,
}

impl Navigator {
    pub fn start(route: Route, search_mode: SearchMode, inflight: InFlight) -> (Self, Vec<Command>) {
        let (page, commands) = Page::mount(&route, search_mode, &inflight);
        let navigator = Self {
            route,
            page,
            token: PageToken(0),
            search_mode,
            inflight,
        };
        (navigator, commands)
    }

    pub fn route(&self) -> &Route {
        &self.route
    }

    pub fn page(&self) -> &Page {
        &self.page
    }

    pub fn page_mut(&mut self) -> &mut Page {
        &mut self.page
    }

    pub fn token(&self) -> PageToken {
        self.token
    }

    pub fn inflight(&self) -> &InFlight {
        &self.inflight
    }

    /// Unmount the current page and mount `route`. Pending requests of the old
    /// page keep running; their responses will be reported stale.
    pub fn navigate(&mut self, route: Route) -> Vec<Command> {
        debug!("Navigating {} -> {}", self.route, route);
        let (page, commands) = Page::mount(&route, self.search_mode, &self.inflight);
        self.page = page;
        self.route = route;
        self.token = PageToken(self.token.0 + 1);
        commands
    }

    pub fn deliver(&mut self, token: PageToken, response: Response) -> Delivery {
        if token != self.token {
            debug!("Dropping response for unmounted page {:?}", token);
            return Delivery::Stale;
        }
        match self.page.apply(response) {
            Some(route) => Delivery::Navigated(self.navigate(route)),
            None => Delivery::Applied,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{EmrApi, MemoryEmr};
    use crate::types::PatientId;

    async fn settle(nav: &mut Navigator, api: &dyn EmrApi, commands: Vec<Command>) {
        let mut queue = commands;
        while !queue.is_empty() {
            let token = nav.token();
            let mut next = Vec::new();
            for command in queue {
                let response = command.run(api).await;
                if let Delivery::Navigated(more) = nav.deliver(token, response) {
                    next.extend(more);
                }
            }
            queue = next;
        }
    }

    #[tokio::test]
    async fn test_stale_response_is_dropped() {
        let emr = MemoryEmr::with_demo_data();
        let (mut nav, _) = Navigator::start(
            Route::PatientDetails(PatientId::new("1")),
            SearchMode::Local,
            InFlight::new(),
        );
        let old_token = nav.token();

        let Page::PatientDetails(view) = nav.page_mut() else {
            panic!("expected details page");
        };
        let fetch = view.mount().pop().unwrap();

        // User leaves before the answer comes back.
        let _ = nav.navigate(Route::Dashboard);
        let response = fetch.run(&emr).await;
        assert!(matches!(nav.deliver(old_token, response), Delivery::Stale));
        assert!(matches!(nav.page(), Page::Dashboard(_)));
    }

    #[tokio::test]
    async fn test_create_then_dashboard_lists_patient() {
        let emr = MemoryEmr::new();
        let (mut nav, commands) = Navigator::start(Route::CreatePatient, SearchMode::Local, InFlight::new());
        assert!(commands.is_empty());

        let Page::CreatePatient(form) = nav.page_mut() else {
            panic!("expected create page");
        };
        form.set_value(Field::Name, "Jane Doe");
        form.set_value(Field::Dob, "1990-01-01");
        form.set_value(Field::Gender, "Female");
        form.set_value(Field::BloodType, "O+");
        form.set_value(Field::ContactNumber, "+1-555-0100");
        let submit = form.submit().unwrap();

        settle(&mut nav, &emr, vec![submit]).await;
        let Route::PatientDetails(id) = nav.route().clone() else {
            panic!("expected details route, got {}", nav.route());
        };
        let Page::PatientDetails(details) = nav.page() else {
            panic!("expected details page");
        };
        assert_eq!(details.status(), DetailsStatus::Ready);
        assert_eq!(details.patient().map(|p| &p.id), Some(&id));

        let commands = nav.navigate(Route::Dashboard);
        settle(&mut nav, &emr, commands).await;
        let Page::Dashboard(dashboard) = nav.page() else {
            panic!("expected dashboard");
        };
        assert!(dashboard.visible().iter().any(|p| p.name == "Jane Doe"));
    }

    #[tokio::test]
    async fn test_inflight_survives_navigation() {
        let emr = MemoryEmr::with_demo_data();
        let inflight = InFlight::new();
        let route = Route::PatientDetails(PatientId::new("1"));
        let (mut nav, commands) = Navigator::start(route.clone(), SearchMode::Local, inflight.clone());
        settle(&mut nav, &emr, commands).await;

        let Page::PatientDetails(view) = nav.page_mut() else {
            panic!("expected details page");
        };
        let pending = view.request_summary().unwrap();

        // Re-open the same patient while the summary is still running.
        let commands = nav.navigate(route);
        settle(&mut nav, &emr, commands).await;
        let Page::PatientDetails(view) = nav.page_mut() else {
            panic!("expected details page");
        };
        assert!(view.request_summary().is_none());

        drop(pending.run(&emr).await);
        assert!(inflight.is_empty());
        assert!(view.request_summary().is_some());
    }
}
