// services/emr-console/src/app.rs
//
// Console state: the navigator, completion channel, activity log and key handling

use std::sync::Arc;

use chrono::{DateTime, Local};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use emrkit::config::SearchMode;
use emrkit::views::{
    Command, CreatePatientView, DashboardView, Delivery, DetailsStatus, Navigator, Page, PageToken,
    PatientDetailsView, Response,
};
use emrkit::{EmrApi, EmrError, InFlight, Route, Theme, ThemeContext};

const MAX_LOG_ENTRIES: usize = 100;

#[derive(Debug, Clone)]
pub struct LogEntry {
    pub timestamp: DateTime<Local>,
    pub level: String, // INFO, WARN, ERROR
    pub message: String,
}

/// Where typed characters go on pages that have both shortcuts and text input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Search,
    NoteDraft,
}

enum Action {
    Idle,
    Run(Command),
    Navigate(Route),
    ToggleTheme,
    Quit,
}

pub struct App {
    api: Arc<dyn EmrApi>,
    navigator: Navigator,
    theme: ThemeContext,
    theme_rx: watch::Receiver<Theme>,
    completions_tx: mpsc::UnboundedSender<(PageToken, Response)>,
    completions_rx: mpsc::UnboundedReceiver<(PageToken, Response)>,

    pub activity_log: Vec<LogEntry>,
    pub input_mode: InputMode,
    /// Cursor row in the patient table or the notes list.
    pub selected: usize,
    pub demo: bool,
    pub should_quit: bool,
}

impl App {
    /// Mount `route` and start its initial fetches. Must run inside a tokio runtime.
    pub fn new(
        api: Arc<dyn EmrApi>,
        route: Route,
        search_mode: SearchMode,
        theme: ThemeContext,
        demo: bool,
    ) -> Self {
        let (navigator, commands) = Navigator::start(route, search_mode, InFlight::new());
        let (completions_tx, completions_rx) = mpsc::unbounded_channel();
        let theme_rx = theme.subscribe();

        let mut app = Self {
            api,
            navigator,
            theme,
            theme_rx,
            completions_tx,
            completions_rx,
            activity_log: Vec::new(),
            input_mode: InputMode::Normal,
            selected: 0,
            demo,
            should_quit: false,
        };

        if demo {
            app.add_log("INFO", "EMR console started in DEMO mode");
        } else {
            let backend = app.api.backend_name().to_string();
            app.add_log("INFO", &format!("EMR console started - backend {}", backend));
        }
        app.dispatch(commands);
        app
    }

    pub fn navigator(&self) -> &Navigator {
        &self.navigator
    }

    pub fn backend_name(&self) -> &str {
        self.api.backend_name()
    }

    pub fn theme(&self) -> Theme {
        *self.theme_rx.borrow()
    }

    pub fn pending_requests(&self) -> usize {
        self.navigator.inflight().len()
    }

    pub fn add_log(&mut self, level: &str, message: &str) {
        self.activity_log.push(LogEntry {
            timestamp: Local::now(),
            level: level.to_string(),
            message: message.to_string(),
        });

        if self.activity_log.len() > MAX_LOG_ENTRIES {
            self.activity_log.remove(0);
        }
    }

    /// Run each command on its own task; completions come back tagged with the
    /// page that issued them.
    fn dispatch(&mut self, commands: Vec<Command>) {
        let token = self.navigator.token();
        for command in commands {
            debug!("Dispatching {} for {:?}", command.operation().as_str(), token);
            let api = Arc::clone(&self.api);
            let tx = self.completions_tx.clone();
            tokio::spawn(async move {
                let response = command.run(api.as_ref()).await;
                // Receiver is gone only during shutdown.
                let _ = tx.send((token, response));
            });
        }
    }

    /// Apply everything that finished since the last frame.
    pub fn drain_completions(&mut self) {
        while let Ok((token, response)) = self.completions_rx.try_recv() {
            self.deliver(token, response);
        }
    }

    fn deliver(&mut self, token: PageToken, response: Response) {
        let outcome = describe(&response);
        match self.navigator.deliver(token, response) {
            Delivery::Stale => {}
            Delivery::Applied => {
                if let Some((level, message)) = outcome {
                    self.add_log(level, &message);
                }
            }
            Delivery::Navigated(commands) => {
                if let Some((level, message)) = outcome {
                    self.add_log(level, &message);
                }
                self.input_mode = InputMode::Normal;
                self.selected = 0;
                self.dispatch(commands);
            }
        }
        self.clamp_selection();
    }

    fn clamp_selection(&mut self) {
        let len = match self.navigator.page() {
            Page::Dashboard(view) => view.visible().len(),
            Page::PatientDetails(view) => view.notes().len(),
            Page::CreatePatient(_) => 0,
        };
        self.selected = self.selected.min(len.saturating_sub(1));
    }

    pub fn navigate(&mut self, route: Route) {
        info!("Opening {}", route);
        let commands = self.navigator.navigate(route);
        self.input_mode = InputMode::Normal;
        self.selected = 0;
        self.dispatch(commands);
    }

    fn toggle_theme(&mut self) {
        match self.theme.toggle() {
            Ok(theme) => self.add_log("INFO", &format!("Theme set to {}", theme.as_str())),
            Err(e) => {
                warn!("Theme preference not saved: {}", e);
                self.add_log("WARN", &format!("Theme changed but not saved: {}", e));
            }
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent) {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            self.should_quit = true;
            return;
        }

        let action = match self.navigator.page_mut() {
            Page::Dashboard(view) => dashboard_key(view, &mut self.input_mode, &mut self.selected, key),
            Page::CreatePatient(view) => create_key(view, key),
            Page::PatientDetails(view) => details_key(view, &mut self.input_mode, &mut self.selected, key),
        };

        match action {
            Action::Idle => {}
            Action::Run(command) => self.dispatch(vec![command]),
            Action::Navigate(route) => self.navigate(route),
            Action::ToggleTheme => self.toggle_theme(),
            Action::Quit => self.should_quit = true,
        }
    }
}

fn run_or_idle(command: Option<Command>) -> Action {
    command.map_or(Action::Idle, Action::Run)
}

fn dashboard_key(view: &mut DashboardView, mode: &mut InputMode, selected: &mut usize, key: KeyEvent) -> Action {
    if view.pending_delete().is_some() {
        return match key.code {
            KeyCode::Char('y') | KeyCode::Char('Y') => run_or_idle(view.confirm_delete()),
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                view.cancel_delete();
                Action::Idle
            }
            _ => Action::Idle,
        };
    }

    if *mode == InputMode::Search {
        let mut term = view.search().to_string();
        match key.code {
            KeyCode::Enter | KeyCode::Esc => {
                *mode = InputMode::Normal;
                return Action::Idle;
            }
            KeyCode::Backspace => {
                term.pop();
            }
            KeyCode::Char(c) => term.push(c),
            _ => return Action::Idle,
        }
        *selected = 0;
        return run_or_idle(view.set_search(term));
    }

    match key.code {
        KeyCode::Char('q') => Action::Quit,
        KeyCode::Char('t') => Action::ToggleTheme,
        KeyCode::Char('/') => {
            *mode = InputMode::Search;
            Action::Idle
        }
        KeyCode::Up | KeyCode::Char('k') => {
            *selected = selected.saturating_sub(1);
            Action::Idle
        }
        KeyCode::Down | KeyCode::Char('j') => {
            if *selected + 1 < view.visible().len() {
                *selected += 1;
            }
            Action::Idle
        }
        KeyCode::Enter => view
            .visible()
            .get(*selected)
            .map_or(Action::Idle, |p| Action::Navigate(Route::PatientDetails(p.id.clone()))),
        KeyCode::Char('d') => {
            if let Some(id) = view.visible().get(*selected).map(|p| p.id.clone()) {
                view.request_delete(&id);
            }
            Action::Idle
        }
        KeyCode::Char('n') => Action::Navigate(Route::CreatePatient),
        KeyCode::Char('r') => run_or_idle(view.reload()),
        KeyCode::Esc if !view.search().is_empty() => {
            *selected = 0;
            run_or_idle(view.set_search(""))
        }
        _ => Action::Idle,
    }
}

fn create_key(view: &mut CreatePatientView, key: KeyEvent) -> Action {
    let field = view.focus();
    let is_select = field.choices().is_some();

    match key.code {
        KeyCode::Esc => Action::Navigate(Route::Dashboard),
        KeyCode::Tab | KeyCode::Down => {
            view.focus_next();
            Action::Idle
        }
        KeyCode::BackTab | KeyCode::Up => {
            view.focus_previous();
            Action::Idle
        }
        KeyCode::Left if is_select => {
            view.cycle_choice(field, false);
            Action::Idle
        }
        KeyCode::Right | KeyCode::Char(' ') if is_select => {
            view.cycle_choice(field, true);
            Action::Idle
        }
        KeyCode::Enter => run_or_idle(view.submit()),
        KeyCode::Backspace => {
            let mut value = view.value(field).to_string();
            if is_select {
                value.clear();
            } else {
                value.pop();
            }
            view.set_value(field, value);
            Action::Idle
        }
        KeyCode::Char(c) if !is_select => {
            let value = format!("{}{}", view.value(field), c);
            view.set_value(field, value);
            Action::Idle
        }
        _ => Action::Idle,
    }
}

fn details_key(view: &mut PatientDetailsView, mode: &mut InputMode, selected: &mut usize, key: KeyEvent) -> Action {
    if view.pending_note_delete().is_some() {
        return match key.code {
            KeyCode::Char('y') | KeyCode::Char('Y') => run_or_idle(view.confirm_delete_note()),
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                view.cancel_delete_note();
                Action::Idle
            }
            _ => Action::Idle,
        };
    }

    if *mode == InputMode::NoteDraft {
        let mut draft = view.note_draft().to_string();
        match key.code {
            KeyCode::Esc => *mode = InputMode::Normal,
            KeyCode::Enter => {
                let command = view.submit_note();
                if command.is_some() {
                    *mode = InputMode::Normal;
                }
                return run_or_idle(command);
            }
            KeyCode::Backspace => {
                draft.pop();
                view.set_note_draft(draft);
            }
            KeyCode::Char(c) => {
                draft.push(c);
                view.set_note_draft(draft);
            }
            _ => {}
        }
        return Action::Idle;
    }

    match key.code {
        KeyCode::Char('q') => Action::Quit,
        KeyCode::Char('t') => Action::ToggleTheme,
        KeyCode::Esc | KeyCode::Char('b') => Action::Navigate(Route::Dashboard),
        KeyCode::Char('r') => Action::Navigate(Route::PatientDetails(view.patient_id().clone())),
        KeyCode::Char('a') if view.status() == DetailsStatus::Ready => {
            *mode = InputMode::NoteDraft;
            Action::Idle
        }
        KeyCode::Up | KeyCode::Char('k') => {
            *selected = selected.saturating_sub(1);
            Action::Idle
        }
        KeyCode::Down | KeyCode::Char('j') => {
            if *selected + 1 < view.notes().len() {
                *selected += 1;
            }
            Action::Idle
        }
        KeyCode::Char('x') => {
            if let Some(id) = view.notes().get(*selected).map(|n| n.id.clone()) {
                view.request_delete_note(&id);
            }
            Action::Idle
        }
        KeyCode::Char('s') => run_or_idle(view.request_summary()),
        KeyCode::Char('p') => run_or_idle(view.request_analysis()),
        _ => Action::Idle,
    }
}

fn failure(what: &str, err: &EmrError) -> (&'static str, String) {
    ("ERROR", format!("{}: {}", what, err))
}

/// Activity-log line for a completion, if it is worth one.
fn describe(response: &Response) -> Option<(&'static str, String)> {
    let line = match response {
        Response::Patients(Ok(patients)) => ("INFO", format!("Loaded {} patients", patients.len())),
        Response::Patients(Err(e)) => failure("Fetching patients failed", e),
        Response::SearchResults { result: Ok(found), .. } => ("INFO", format!("Search matched {} patients", found.len())),
        Response::SearchResults { result: Err(e), .. } => failure("Search failed", e),
        Response::Created(Ok(patient)) => ("INFO", format!("Created patient {} ({})", patient.name, patient.id)),
        Response::Created(Err(e)) => failure("Create patient failed", e),
        Response::Patient(Ok(_)) => return None,
        Response::Patient(Err(e)) if e.is_not_found() => ("WARN", "Patient not found".to_string()),
        Response::Patient(Err(e)) => failure("Fetching patient failed", e),
        Response::PatientDeleted { id, result: Ok(()) } => ("INFO", format!("Deleted patient {}", id)),
        Response::PatientDeleted { id, result: Err(e) } => {
            ("ERROR", format!("Delete of patient {} failed, row restored: {}", id, e))
        }
        Response::NoteAdded(Ok(note)) => ("INFO", format!("Added note {}", note.id)),
        Response::NoteAdded(Err(e)) => failure("Add note failed", e),
        Response::NoteDeleted { note_id, result: Ok(()) } => ("INFO", format!("Deleted note {}", note_id)),
        Response::NoteDeleted { result: Err(e), .. } => failure("Delete note failed", e),
        Response::Summary(Ok(_)) => ("INFO", "AI summary ready".to_string()),
        Response::Summary(Err(e)) => failure("AI summary failed", e),
        Response::Analysis(Ok(series)) => ("INFO", format!("Predictive analysis ready ({} points)", series.data.len())),
        Response::Analysis(Err(e)) => failure("Predictive analysis failed", e),
    };
    Some(line)
}
