use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use anyhow::Result;
use chrono::{Local, NaiveDate};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::widgets::{ListState, TableState};
use serde_json::{Map, Value};
use tokio::runtime::Handle;
use tracing::{debug, info, warn};

use crate::{
    comps::{ComparableSource, PendingSearch, SearchQuery, SearchResults, DEFAULT_RADIUS_MILES},
    config::Config,
    error::Error,
    export::{self, Download, Exporter},
    format::value_or,
    history::{HistoryEntry, HistoryStore},
    loan::{LoanAnalysis, LoanParameters},
    roi::{self, RoiAnalysis, RoiInputs},
    schedule::{table_rows, ViewMode},
};

pub const NOTIFICATION_TTL: Duration = Duration::from_secs(4);

pub const MIN_RADIUS_MILES: f64 = 0.1;
pub const MAX_RADIUS_MILES: f64 = 2.0;
const RADIUS_STEP_MILES: f64 = 0.1;

/// Extra monthly payment presets, bound to F1..F4 on the loan screen.
pub const EXTRA_PAYMENT_SCENARIOS: [u32; 4] = [0, 100, 250, 500];

pub const HISTORY_LOAN: &str = "loan";
pub const HISTORY_ROI: &str = "roi";
pub const HISTORY_PROPERTY: &str = "property-tax";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Home,
    Loan,
    Roi,
    PropertyTax,
    History,
}

impl Screen {
    pub const MENU: [Screen; 4] = [Screen::Loan, Screen::Roi, Screen::PropertyTax, Screen::History];

    pub fn title(self) -> &'static str {
        match self {
            Screen::Home => "Home",
            Screen::Loan => "Loan Tool",
            Screen::Roi => "ROI Calculator",
            Screen::PropertyTax => "Property Tax Comparables",
            Screen::History => "Saved Calculations",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Field {
    pub id: &'static str,
    pub label: &'static str,
    pub value: String,
}

/// A column of numeric text inputs with one focused field.
#[derive(Debug, Clone)]
pub struct Form {
    pub fields: Vec<Field>,
    pub focus: usize,
}

impl Form {
    fn new(fields: &[(&'static str, &'static str, &str)]) -> Self {
        Self {
            fields: fields
                .iter()
                .map(|&(id, label, value)| Field {
                    id,
                    label,
                    value: value.to_string(),
                })
                .collect(),
            focus: 0,
        }
    }

    pub fn value(&self, index: usize) -> &str {
        self.fields.get(index).map(|f| f.value.as_str()).unwrap_or("")
    }

    pub fn number(&self, index: usize, default: f64) -> f64 {
        value_or(self.value(index), default)
    }

    pub fn set(&mut self, index: usize, value: impl Into<String>) {
        if let Some(field) = self.fields.get_mut(index) {
            field.value = value.into();
        }
    }

    /// Returns true when the key changed the focused value.
    fn edit(&mut self, key: KeyEvent) -> bool {
        let Some(field) = self.fields.get_mut(self.focus) else {
            return false;
        };
        match key.code {
            KeyCode::Char(c) if c.is_ascii_digit() || c == '.' => {
                field.value.push(c);
                true
            }
            KeyCode::Backspace => field.value.pop().is_some(),
            _ => false,
        }
    }

    fn next(&mut self) {
        self.focus = (self.focus + 1) % self.fields.len().max(1);
    }

    fn prev(&mut self) {
        let len = self.fields.len().max(1);
        self.focus = (self.focus + len - 1) % len;
    }

    /// Moves focus for Tab, BackTab and the arrow keys.
    fn navigate(&mut self, key: KeyEvent) -> bool {
        match key.code {
            KeyCode::Tab | KeyCode::Down => self.next(),
            KeyCode::BackTab | KeyCode::Up => self.prev(),
            _ => return false,
        }
        true
    }

    pub fn to_json(&self) -> Value {
        let map: Map<String, Value> = self
            .fields
            .iter()
            .map(|f| (f.id.to_string(), Value::String(f.value.clone())))
            .collect();
        Value::Object(map)
    }

    /// Fills fields whose ids appear in `data`; others are left alone.
    pub fn restore(&mut self, data: &Value) {
        for field in &mut self.fields {
            match data.get(field.id) {
                Some(Value::String(s)) => field.value = s.clone(),
                Some(Value::Number(n)) => field.value = n.to_string(),
                _ => {}
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    Success,
    Error,
}

#[derive(Debug, Clone)]
pub struct Notification {
    pub message: String,
    pub kind: NotificationKind,
    pub created: Instant,
}

impl Notification {
    pub fn is_expired(&self, now: Instant) -> bool {
        now.duration_since(self.created) >= NOTIFICATION_TTL
    }
}

pub struct HomeState {
    pub menu: ListState,
    /// Quick estimate inputs: loan, rate, price, rent.
    pub form: Form,
}

impl HomeState {
    pub const LOAN: usize = 0;
    pub const RATE: usize = 1;
    pub const PRICE: usize = 2;
    pub const RENT: usize = 3;

    fn new() -> Self {
        Self {
            menu: ListState::default().with_selected(Some(0)),
            form: Form::new(&[
                ("preview-loan", "Loan Amount ($)", "240000"),
                ("preview-rate", "Interest Rate (%)", "6.5"),
                ("preview-price", "Purchase Price ($)", "300000"),
                ("preview-rent", "Monthly Rent ($)", "2500"),
            ]),
        }
    }
}

pub struct LoanState {
    pub form: Form,
    pub analysis: Option<LoanAnalysis>,
    pub view: ViewMode,
    pub table_state: TableState,
}

impl LoanState {
    pub const AMOUNT: usize = 0;
    pub const RATE: usize = 1;
    pub const TERM: usize = 2;
    pub const EXTRA: usize = 3;

    fn new() -> Self {
        Self {
            form: Form::new(&[
                ("loan-amount", "Loan Amount ($)", "240000"),
                ("interest-rate", "Interest Rate (%)", "6.5"),
                ("loan-term", "Loan Term (years)", "30"),
                ("extra-payment", "Extra Monthly Payment ($)", "0"),
            ]),
            analysis: None,
            view: ViewMode::default(),
            table_state: TableState::default(),
        }
    }

    pub fn params(&self) -> LoanParameters {
        LoanParameters::from_inputs(
            self.form.value(Self::AMOUNT),
            self.form.value(Self::RATE),
            self.form.value(Self::TERM),
            self.form.value(Self::EXTRA),
        )
    }

    pub fn row_count(&self) -> usize {
        self.analysis
            .as_ref()
            .map(|a| table_rows(a.schedule(), self.view).len())
            .unwrap_or(0)
    }
}

pub struct RoiState {
    pub form: Form,
    pub analysis: Option<RoiAnalysis>,
}

impl RoiState {
    fn new() -> Self {
        Self {
            form: Form::new(&[
                ("purchase-price", "Purchase Price ($)", "300000"),
                ("down-payment", "Down Payment (%)", "20"),
                ("closing-costs", "Closing Costs ($)", "6000"),
                ("rehab-costs", "Rehab Costs ($)", "0"),
                ("monthly-rent", "Monthly Rent ($)", "2500"),
                ("vacancy-rate", "Vacancy Rate (%)", "5"),
                ("monthly-expenses", "Monthly Expenses ($)", "600"),
                ("mortgage-payment", "Mortgage Payment ($)", "1500"),
            ]),
            analysis: None,
        }
    }

    pub fn inputs(&self) -> RoiInputs {
        let fields: [&str; 8] = std::array::from_fn(|i| self.form.value(i));
        RoiInputs::from_fields(&fields)
    }

    fn recalculate(&mut self) {
        self.analysis = Some(roi::analyze(&self.inputs()));
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyFocus {
    Address,
    Radius,
}

pub struct PropertyState {
    pub address: String,
    pub radius: f64,
    pub focus: PropertyFocus,
    pub pending: Option<PendingSearch>,
    pub results: Option<SearchResults>,
    pub table_state: TableState,
}

impl PropertyState {
    fn new() -> Self {
        Self {
            address: String::new(),
            radius: DEFAULT_RADIUS_MILES,
            focus: PropertyFocus::Address,
            pending: None,
            results: None,
            table_state: TableState::default(),
        }
    }

    pub fn is_searching(&self) -> bool {
        self.pending.is_some()
    }

    fn cancel_search(&mut self) {
        if let Some(pending) = self.pending.take() {
            pending.cancel();
        }
    }

    fn nudge_radius(&mut self, steps: f64) {
        let radius = self.radius + steps * RADIUS_STEP_MILES;
        // Keep one decimal so repeated steps don't drift.
        self.radius = ((radius * 10.0).round() / 10.0).clamp(MIN_RADIUS_MILES, MAX_RADIUS_MILES);
    }

    fn to_json(&self) -> Value {
        serde_json::json!({
            "property-address": self.address,
            "search-radius": self.radius,
        })
    }

    fn restore(&mut self, data: &Value) {
        if let Some(address) = data.get("property-address").and_then(Value::as_str) {
            self.address = address.to_string();
        }
        if let Some(radius) = data.get("search-radius").and_then(Value::as_f64) {
            self.radius = radius.clamp(MIN_RADIUS_MILES, MAX_RADIUS_MILES);
        }
    }
}

pub struct HistoryState {
    pub entries: Vec<HistoryEntry>,
    pub list_state: ListState,
}

pub struct App {
    pub screen: Screen,
    pub home: HomeState,
    pub loan: LoanState,
    pub roi: RoiState,
    pub property: PropertyState,
    pub history: HistoryState,
    pub notification: Option<Notification>,
    exporter: Exporter,
    store: HistoryStore,
    source: Arc<dyn ComparableSource>,
    runtime: Handle,
}

impl App {
    pub fn new(config: &Config, runtime: Handle, source: Arc<dyn ComparableSource>) -> Self {
        let mut roi = RoiState::new();
        roi.recalculate();
        Self {
            screen: Screen::Home,
            home: HomeState::new(),
            loan: LoanState::new(),
            roi,
            property: PropertyState::new(),
            history: HistoryState {
                entries: Vec::new(),
                list_state: ListState::default(),
            },
            notification: None,
            exporter: Exporter::new(&config.output_dir),
            store: HistoryStore::new(&config.data_dir),
            source,
            runtime,
        }
    }

    pub fn notify(&mut self, message: impl Into<String>, kind: NotificationKind) {
        let message = message.into();
        debug!(%message, ?kind, "notification");
        self.notification = Some(Notification {
            message,
            kind,
            created: Instant::now(),
        });
    }

    fn notify_error(&mut self, err: &Error) {
        warn!(%err, "action failed");
        self.notify(err.to_string(), NotificationKind::Error);
    }

    /// Called on every loop iteration: expires notifications and collects a
    /// finished search.
    pub fn tick(&mut self, now: Instant) {
        if self.notification.as_ref().is_some_and(|n| n.is_expired(now)) {
            self.notification = None;
        }

        let outcome = self.property.pending.as_mut().and_then(PendingSearch::poll);
        if let Some(outcome) = outcome {
            self.property.pending = None;
            match outcome {
                Ok(results) => {
                    let found = results.comparables.len();
                    self.property.results = Some(results);
                    self.property.table_state.select(Some(0));
                    self.notify(format!("Found {found} comparable properties!"), NotificationKind::Success);
                }
                Err(err) => self.notify_error(&err),
            }
        }
    }

    pub fn open(&mut self, screen: Screen) {
        if self.screen == Screen::PropertyTax && screen != Screen::PropertyTax {
            self.property.cancel_search();
        }
        if screen == Screen::History {
            self.history.entries = self.store.entries();
            let selected = (!self.history.entries.is_empty()).then_some(0);
            self.history.list_state.select(selected);
        }
        info!(screen = screen.title(), "screen opened");
        self.screen = screen;
    }

    pub fn calculate_loan(&mut self) {
        let analysis = LoanAnalysis::compute(&self.loan.params());
        self.loan.analysis = Some(analysis);
        self.loan.table_state.select(Some(0));
        self.notify("Loan calculated!", NotificationKind::Success);
    }

    pub fn apply_scenario(&mut self, extra: u32) {
        self.loan.form.set(LoanState::EXTRA, extra.to_string());
        self.calculate_loan();
    }

    pub fn start_search(&mut self) {
        if self.property.is_searching() {
            return;
        }
        match SearchQuery::new(&self.property.address, self.property.radius) {
            Ok(query) => {
                self.property.pending = Some(PendingSearch::spawn(&self.runtime, self.source.clone(), query));
            }
            Err(err) => self.notify_error(&err),
        }
    }

    pub fn reset_search(&mut self) {
        self.property.cancel_search();
        self.property.address.clear();
        self.property.radius = DEFAULT_RADIUS_MILES;
        self.property.results = None;
        self.property.table_state = TableState::default();
    }

    fn deliver(&mut self, download: Result<Download, Error>, success: &str) {
        match download.and_then(|d| self.exporter.save(&d)) {
            Ok(path) => self.notify(format!("{success} ({})", path.display()), NotificationKind::Success),
            Err(err) => self.notify_error(&err),
        }
    }

    fn today() -> NaiveDate {
        Local::now().date_naive()
    }

    pub fn export_loan_csv(&mut self) {
        let download = match &self.loan.analysis {
            Some(analysis) if !analysis.schedule().is_empty() => export::schedule_csv(analysis),
            _ => Err(Error::NothingToExport("loan")),
        };
        self.deliver(download, "CSV downloaded!");
    }

    pub fn export_loan_report(&mut self) {
        let download = self
            .loan
            .analysis
            .as_ref()
            .map(|a| export::loan_report(a, Self::today()))
            .ok_or(Error::NothingToExport("loan"));
        self.deliver(download, "Report downloaded!");
    }

    pub fn export_roi_csv(&mut self) {
        let download = match &self.roi.analysis {
            Some(analysis) => export::roi_csv(analysis),
            None => Err(Error::NothingToExport("ROI")),
        };
        self.deliver(download, "CSV downloaded!");
    }

    pub fn export_roi_report(&mut self) {
        let download = self
            .roi
            .analysis
            .as_ref()
            .map(|a| export::roi_report(a, Self::today()))
            .ok_or(Error::NothingToExport("ROI"));
        self.deliver(download, "Report downloaded!");
    }

    pub fn export_comps_csv(&mut self) {
        let download = match &self.property.results {
            Some(results) => export::comps_csv(results),
            None => Err(Error::NoSearchResults),
        };
        self.deliver(download, "CSV downloaded successfully!");
    }

    pub fn export_comps_report(&mut self) {
        let download = self
            .property
            .results
            .as_ref()
            .map(|r| export::comps_report(r, Self::today()))
            .ok_or(Error::NoSearchResults);
        self.deliver(download, "Report downloaded!");
    }

    pub fn save_calculation(&mut self, key: &str) {
        let data = match key {
            HISTORY_LOAN => self.loan.form.to_json(),
            HISTORY_ROI => self.roi.form.to_json(),
            _ => self.property.to_json(),
        };
        match self.store.save(key, &data) {
            Ok(_) => self.notify("Calculation saved!", NotificationKind::Success),
            Err(err) => self.notify_error(&err),
        }
    }

    /// Puts a saved entry's inputs back into its tool and opens it.
    pub fn restore_entry(&mut self, index: usize) {
        let Some(entry) = self.history.entries.get(index).cloned() else {
            return;
        };
        match entry.key.as_str() {
            HISTORY_LOAN => {
                self.loan.form.restore(&entry.data);
                self.open(Screen::Loan);
                self.calculate_loan();
            }
            HISTORY_ROI => {
                self.roi.form.restore(&entry.data);
                self.roi.recalculate();
                self.open(Screen::Roi);
            }
            HISTORY_PROPERTY => {
                self.property.restore(&entry.data);
                self.open(Screen::PropertyTax);
            }
            other => {
                warn!(key = other, "unknown history entry");
                self.notify(format!("Cannot open saved '{other}' entry"), NotificationKind::Error);
            }
        }
    }
}

fn scroll(state: &mut TableState, len: usize, delta: isize) {
    if len == 0 {
        state.select(None);
        return;
    }
    let current = state.selected().unwrap_or(0) as isize;
    let next = (current + delta).clamp(0, len as isize - 1);
    state.select(Some(next as usize));
}

/// Routes a key to the active screen. Returns true when the app should exit.
pub fn handle_key(app: &mut App, key: KeyEvent) -> Result<bool> {
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        return Ok(true);
    }
    match app.screen {
        Screen::Home => handle_home_input(app, key),
        Screen::Loan => handle_loan_input(app, key),
        Screen::Roi => handle_roi_input(app, key),
        Screen::PropertyTax => handle_property_input(app, key),
        Screen::History => handle_history_input(app, key),
    }
}

fn handle_home_input(app: &mut App, key: KeyEvent) -> Result<bool> {
    if app.home.form.edit(key) || app.home.form.navigate(key) {
        return Ok(false);
    }
    let selected = app.home.menu.selected().unwrap_or(0);
    match key.code {
        KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => return Ok(true),
        KeyCode::Char('j') | KeyCode::Right => {
            app.home.menu.select(Some((selected + 1).min(Screen::MENU.len() - 1)));
        }
        KeyCode::Char('k') | KeyCode::Left => {
            app.home.menu.select(Some(selected.saturating_sub(1)));
        }
        KeyCode::Enter => app.open(Screen::MENU[selected.min(Screen::MENU.len() - 1)]),
        KeyCode::Char('l') => app.open(Screen::Loan),
        KeyCode::Char('r') => app.open(Screen::Roi),
        KeyCode::Char('p') => app.open(Screen::PropertyTax),
        KeyCode::Char('h') => app.open(Screen::History),
        _ => {}
    }
    Ok(false)
}

fn handle_loan_input(app: &mut App, key: KeyEvent) -> Result<bool> {
    if app.loan.form.edit(key) || app.loan.form.navigate(key) {
        return Ok(false);
    }
    match key.code {
        KeyCode::Char('q') | KeyCode::Char('Q') => return Ok(true),
        KeyCode::Esc => app.open(Screen::Home),
        KeyCode::Enter => app.calculate_loan(),
        KeyCode::F(n @ 1..=4) => app.apply_scenario(EXTRA_PAYMENT_SCENARIOS[usize::from(n) - 1]),
        KeyCode::Char('v') | KeyCode::Char('V') => {
            app.loan.view = app.loan.view.toggle();
            app.loan.table_state.select(app.loan.analysis.as_ref().map(|_| 0));
        }
        KeyCode::Char('c') | KeyCode::Char('C') => app.export_loan_csv(),
        KeyCode::Char('t') | KeyCode::Char('T') => app.export_loan_report(),
        KeyCode::Char('s') | KeyCode::Char('S') => app.save_calculation(HISTORY_LOAN),
        KeyCode::PageDown | KeyCode::Char('j') => {
            let len = app.loan.row_count();
            let step = if key.code == KeyCode::PageDown { 10 } else { 1 };
            scroll(&mut app.loan.table_state, len, step);
        }
        KeyCode::PageUp | KeyCode::Char('k') => {
            let len = app.loan.row_count();
            let step = if key.code == KeyCode::PageUp { 10 } else { 1 };
            scroll(&mut app.loan.table_state, len, -step);
        }
        KeyCode::Char('g') | KeyCode::Char('G') => {
            let len = app.loan.row_count();
            let delta = if key.code == KeyCode::Char('G') { isize::MAX / 2 } else { isize::MIN / 2 };
            scroll(&mut app.loan.table_state, len, delta);
        }
        _ => {}
    }
    Ok(false)
}

fn handle_roi_input(app: &mut App, key: KeyEvent) -> Result<bool> {
    if app.roi.form.edit(key) {
        app.roi.recalculate();
        return Ok(false);
    }
    if app.roi.form.navigate(key) {
        return Ok(false);
    }
    match key.code {
        KeyCode::Char('q') | KeyCode::Char('Q') => return Ok(true),
        KeyCode::Esc => app.open(Screen::Home),
        KeyCode::Enter => app.roi.recalculate(),
        KeyCode::Char('c') | KeyCode::Char('C') => app.export_roi_csv(),
        KeyCode::Char('t') | KeyCode::Char('T') => app.export_roi_report(),
        KeyCode::Char('s') | KeyCode::Char('S') => app.save_calculation(HISTORY_ROI),
        _ => {}
    }
    Ok(false)
}

/// The address field takes free text, so commands use Ctrl.
fn handle_property_input(app: &mut App, key: KeyEvent) -> Result<bool> {
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        match key.code {
            KeyCode::Char('q') => return Ok(true),
            KeyCode::Char('e') => app.export_comps_csv(),
            KeyCode::Char('t') => app.export_comps_report(),
            KeyCode::Char('r') => app.reset_search(),
            KeyCode::Char('s') => app.save_calculation(HISTORY_PROPERTY),
            _ => {}
        }
        return Ok(false);
    }

    let len = app.property.results.as_ref().map(|r| r.comparables.len()).unwrap_or(0);
    match key.code {
        KeyCode::Esc => app.open(Screen::Home),
        KeyCode::Enter => app.start_search(),
        KeyCode::Tab | KeyCode::BackTab => {
            app.property.focus = match app.property.focus {
                PropertyFocus::Address => PropertyFocus::Radius,
                PropertyFocus::Radius => PropertyFocus::Address,
            };
        }
        KeyCode::Down => scroll(&mut app.property.table_state, len, 1),
        KeyCode::Up => scroll(&mut app.property.table_state, len, -1),
        _ => match app.property.focus {
            PropertyFocus::Address => match key.code {
                KeyCode::Char(c) => app.property.address.push(c),
                KeyCode::Backspace => {
                    app.property.address.pop();
                }
                _ => {}
            },
            PropertyFocus::Radius => match key.code {
                KeyCode::Right | KeyCode::Char('+') | KeyCode::Char('l') => app.property.nudge_radius(1.0),
                KeyCode::Left | KeyCode::Char('-') | KeyCode::Char('h') => app.property.nudge_radius(-1.0),
                _ => {}
            },
        },
    }
    Ok(false)
}

fn handle_history_input(app: &mut App, key: KeyEvent) -> Result<bool> {
    let len = app.history.entries.len();
    let selected = app.history.list_state.selected();
    match key.code {
        KeyCode::Char('q') | KeyCode::Char('Q') => return Ok(true),
        KeyCode::Esc | KeyCode::Char('h') | KeyCode::Left => app.open(Screen::Home),
        KeyCode::Down | KeyCode::Char('j') if len > 0 => {
            app.history.list_state.select(Some(selected.map_or(0, |i| (i + 1).min(len - 1))));
        }
        KeyCode::Up | KeyCode::Char('k') if len > 0 => {
            app.history.list_state.select(Some(selected.map_or(0, |i| i.saturating_sub(1))));
        }
        KeyCode::Enter => {
            if let Some(index) = selected {
                app.restore_entry(index);
            }
        }
        _ => {}
    }
    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::comps::{generate_demo_comps, SearchResults};
    use async_trait::async_trait;
    use crossterm::event::{KeyEventKind, KeyEventState};
    use rand::{rngs::StdRng, SeedableRng};

    struct InstantSource;

    #[async_trait]
    impl ComparableSource for InstantSource {
        async fn search(&self, query: &SearchQuery) -> crate::error::Result<SearchResults> {
            let mut rng = StdRng::seed_from_u64(7);
            Ok(generate_demo_comps(&mut rng, &query.address, query.radius))
        }
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent {
            code,
            modifiers: KeyModifiers::NONE,
            kind: KeyEventKind::Press,
            state: KeyEventState::NONE,
        }
    }

    fn ctrl(c: char) -> KeyEvent {
        KeyEvent {
            modifiers: KeyModifiers::CONTROL,
            ..key(KeyCode::Char(c))
        }
    }

    fn app_in(dir: &std::path::Path, runtime: &tokio::runtime::Runtime) -> App {
        let config = Config {
            output_dir: dir.join("out"),
            data_dir: dir.join("data"),
            search_latency: Duration::ZERO,
        };
        App::new(&config, runtime.handle().clone(), Arc::new(InstantSource))
    }

    fn runtime() -> tokio::runtime::Runtime {
        tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .enable_all()
            .build()
            .unwrap()
    }

    #[test]
    fn form_accepts_digits_and_moves_focus() {
        let mut form = Form::new(&[("a", "A", ""), ("b", "B", "7")]);
        assert!(form.edit(key(KeyCode::Char('1'))));
        assert!(form.edit(key(KeyCode::Char('.'))));
        assert!(!form.edit(key(KeyCode::Char('x'))));
        assert_eq!(form.value(0), "1.");

        assert!(form.navigate(key(KeyCode::Tab)));
        assert_eq!(form.focus, 1);
        assert!(form.navigate(key(KeyCode::Tab)));
        assert_eq!(form.focus, 0);
        assert!(form.navigate(key(KeyCode::BackTab)));
        assert_eq!(form.focus, 1);
    }

    #[test]
    fn form_round_trips_through_json() {
        let mut form = Form::new(&[("loan-amount", "Loan", "100"), ("loan-term", "Term", "30")]);
        let saved = form.to_json();
        form.set(0, "5");
        form.set(1, "15");
        form.restore(&saved);
        assert_eq!(form.value(0), "100");
        assert_eq!(form.value(1), "30");
    }

    #[test]
    fn notifications_expire() {
        let created = Instant::now();
        let note = Notification {
            message: "hi".into(),
            kind: NotificationKind::Success,
            created,
        };
        assert!(!note.is_expired(created + Duration::from_secs(3)));
        assert!(note.is_expired(created + NOTIFICATION_TTL));
    }

    #[test]
    fn roi_is_calculated_on_start_and_on_every_edit() {
        let dir = tempfile::tempdir().unwrap();
        let rt = runtime();
        let mut app = app_in(dir.path(), &rt);
        let before = app.roi.analysis.clone().unwrap();
        assert!((before.noi - 21_300.0).abs() < 1e-6);

        app.open(Screen::Roi);
        handle_key(&mut app, key(KeyCode::Backspace)).unwrap();
        let after = app.roi.analysis.clone().unwrap();
        assert!(after.inputs.purchase_price < before.inputs.purchase_price);
    }

    #[test]
    fn exporting_before_calculating_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let rt = runtime();
        let mut app = app_in(dir.path(), &rt);
        app.open(Screen::Loan);
        handle_key(&mut app, key(KeyCode::Char('c'))).unwrap();

        let note = app.notification.clone().unwrap();
        assert_eq!(note.kind, NotificationKind::Error);
        assert_eq!(note.message, "Calculate loan first");
    }

    #[test]
    fn loan_calculate_export_and_save() {
        let dir = tempfile::tempdir().unwrap();
        let rt = runtime();
        let mut app = app_in(dir.path(), &rt);
        app.open(Screen::Loan);

        handle_key(&mut app, key(KeyCode::Enter)).unwrap();
        assert_eq!(app.loan.analysis.as_ref().unwrap().schedule().len(), 360);
        assert_eq!(app.loan.row_count(), 30);

        handle_key(&mut app, key(KeyCode::Char('v'))).unwrap();
        assert_eq!(app.loan.row_count(), 60);

        handle_key(&mut app, key(KeyCode::Char('c'))).unwrap();
        let csv = dir.path().join("out").join("amortization-schedule.csv");
        assert!(csv.exists());
        let note = app.notification.clone().unwrap();
        assert_eq!(note.message, format!("CSV downloaded! ({})", csv.display()));

        handle_key(&mut app, key(KeyCode::Char('s'))).unwrap();
        app.open(Screen::History);
        assert_eq!(app.history.entries.len(), 1);
        assert_eq!(app.history.entries[0].key, HISTORY_LOAN);
    }

    #[test]
    fn jump_keys_move_to_last_and_first_row() {
        let dir = tempfile::tempdir().unwrap();
        let rt = runtime();
        let mut app = app_in(dir.path(), &rt);
        app.open(Screen::Loan);
        handle_key(&mut app, key(KeyCode::Enter)).unwrap();
        let rows = app.loan.row_count();
        assert_eq!(rows, 30);

        handle_key(&mut app, key(KeyCode::Char('G'))).unwrap();
        assert_eq!(app.loan.table_state.selected(), Some(rows - 1));
        handle_key(&mut app, key(KeyCode::Char('g'))).unwrap();
        assert_eq!(app.loan.table_state.selected(), Some(0));
    }

    #[test]
    fn scenario_key_sets_extra_payment() {
        let dir = tempfile::tempdir().unwrap();
        let rt = runtime();
        let mut app = app_in(dir.path(), &rt);
        app.open(Screen::Loan);
        handle_key(&mut app, key(KeyCode::F(2))).unwrap();
        assert_eq!(app.loan.form.value(LoanState::EXTRA), "100");
        assert!(app.loan.analysis.as_ref().unwrap().months_saved() > 0);
    }

    #[test]
    fn empty_address_is_rejected_without_searching() {
        let dir = tempfile::tempdir().unwrap();
        let rt = runtime();
        let mut app = app_in(dir.path(), &rt);
        app.open(Screen::PropertyTax);
        handle_key(&mut app, key(KeyCode::Enter)).unwrap();
        assert!(!app.property.is_searching());
        assert_eq!(app.notification.unwrap().message, "Please enter a property address");
    }

    #[test]
    fn search_results_arrive_on_tick() {
        let dir = tempfile::tempdir().unwrap();
        let rt = runtime();
        let mut app = app_in(dir.path(), &rt);
        app.open(Screen::PropertyTax);
        for c in "100 Main St".chars() {
            handle_key(&mut app, key(KeyCode::Char(c))).unwrap();
        }
        handle_key(&mut app, key(KeyCode::Enter)).unwrap();
        assert!(app.property.is_searching());

        let deadline = Instant::now() + Duration::from_secs(5);
        while app.property.is_searching() && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(10));
            app.tick(Instant::now());
        }
        let results = app.property.results.as_ref().unwrap();
        assert_eq!(results.subject.address, "100 Main St");
        assert!(app.notification.as_ref().unwrap().message.starts_with("Found "));

        handle_key(&mut app, ctrl('r')).unwrap();
        assert!(app.property.results.is_none());
        assert!(app.property.address.is_empty());
    }

    #[test]
    fn radius_steps_are_clamped() {
        let mut state = PropertyState::new();
        for _ in 0..50 {
            state.nudge_radius(1.0);
        }
        assert_eq!(state.radius, MAX_RADIUS_MILES);
        for _ in 0..50 {
            state.nudge_radius(-1.0);
        }
        assert_eq!(state.radius, MIN_RADIUS_MILES);
    }
}
