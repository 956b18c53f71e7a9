//! Application context: owns every loaded document, the registry and the
//! grid, and implements the operations the UI and the widgets call.

use std::collections::VecDeque;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

use ratatui::prelude::Color;
use serde_json::Value;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::form::{Form, FormKind};
use crate::grid::GridManager;
use crate::model::{AppData, ModelError, Preferences, DEFAULT_ACCENT};
use crate::stats::Ledger;
use crate::storage::{self, StorageError};
use crate::store::KeyValueStore;
use crate::validate::{is_hex_color, is_valid_url, parse_hex_color};
use crate::widgets::{pomodoro, Widget, WidgetRegistry, WidgetState};

const TOAST_TTL: Duration = Duration::from_secs(3);
const MAX_TOASTS: usize = 5;

#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Model(#[from] ModelError),
    #[error("invalid colour (expected #RRGGBB): {0}")]
    InvalidColor(String),
    #[error("unknown widget: {0}")]
    UnknownWidget(String),
    #[error("form not supported here: {0}")]
    UnsupportedForm(String),
    #[error("{0}")]
    Invalid(String),
    #[error("could not access {path:?}: {source}")]
    File { path: PathBuf, source: io::Error },
    #[error("import file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("could not open {url}: {source}")]
    Launch { url: String, source: io::Error },
}

/// Destructive actions that need an explicit yes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmAction {
    ResetApp,
    ResetStats,
}

impl ConfirmAction {
    pub fn prompt(&self) -> &'static str {
        match self {
            ConfirmAction::ResetApp => "Erase all data, layout and preferences?",
            ConfirmAction::ResetStats => "Reset all statistics?",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    pub message: String,
    pub created: Instant,
    pub ttl: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchResult {
    Bookmark {
        category: usize,
        app: usize,
        name: String,
        url: String,
        category_name: String,
    },
    Widget {
        id: &'static str,
        name: &'static str,
        description: &'static str,
    },
}

pub struct AppContext {
    pub store: Box<dyn KeyValueStore>,
    pub config: Config,
    pub data: AppData,
    pub prefs: Preferences,
    pub registry: WidgetRegistry,
    pub grid: GridManager,
    pub state: WidgetState,
    /// Hands a url to the system browser.
    pub open_url: fn(&str) -> io::Result<()>,
    toasts: VecDeque<Toast>,
    last_autosave: Instant,
}

impl AppContext {
    pub fn new(store: Box<dyn KeyValueStore>, config: Config) -> Self {
        let grid = GridManager::new(
            config.grid.columns,
            config.layout_debounce(),
            config.default_widgets.clone(),
        );
        AppContext {
            store,
            config,
            data: AppData::default(),
            prefs: Preferences::default(),
            registry: WidgetRegistry::with_builtins(),
            grid,
            state: WidgetState::default(),
            open_url: system_open,
            toasts: VecDeque::new(),
            last_autosave: Instant::now(),
        }
    }

    /// Loads every document, records the visit and puts the widgets on the
    /// grid.
    pub fn init(&mut self) {
        self.data = storage::load(self.store.as_mut());
        self.prefs = storage::load_preferences(self.store.as_ref());
        if let Err(err) = self.ledger().track_session() {
            warn!(%err, "could not record session");
        }
        self.place_widgets();
        info!(
            widgets = ?self.grid.get_active_widgets(),
            registered = self.registry.len(),
            "dashboard ready"
        );
    }

    fn place_widgets(&mut self) {
        let registry = &self.registry;
        let mut placed: Vec<Widget> = Vec::new();
        self.grid.init(self.store.as_ref(), |grid, placement| {
            let Some(widget) = registry.get(&placement.id) else {
                error!(widget = %placement.id, "unknown widget in layout");
                return;
            };
            if grid.add_widget(
                widget.id(),
                widget.default_size(),
                placement.auto_position,
                placement.node.as_ref(),
            ) {
                placed.push(widget);
            }
        });
        for widget in placed {
            widget.init(self);
        }
    }

    pub fn ledger(&mut self) -> Ledger<'_> {
        Ledger::new(self.store.as_mut())
    }

    /// Bumps a usage counter; failures are logged, never surfaced.
    pub fn track(&mut self, widget: &str, action: &str) {
        if let Err(err) = self.ledger().track_widget(widget, action, 1) {
            warn!(%err, widget, action, "could not record usage");
        }
    }

    pub fn toast(&mut self, message: impl Into<String>) {
        self.toast_for(message, TOAST_TTL);
    }

    pub fn toast_for(&mut self, message: impl Into<String>, ttl: Duration) {
        let message = message.into();
        info!(toast = %message);
        self.toasts.push_back(Toast {
            message,
            created: Instant::now(),
            ttl,
        });
        while self.toasts.len() > MAX_TOASTS {
            self.toasts.pop_front();
        }
    }

    pub fn current_toast(&self, now: Instant) -> Option<&Toast> {
        self.toasts
            .back()
            .filter(|t| now.saturating_duration_since(t.created) < t.ttl)
    }

    #[cfg(test)]
    pub fn last_toast(&self) -> Option<&str> {
        self.toasts.back().map(|t| t.message.as_str())
    }

    pub fn accent_color(&self) -> Color {
        let (r, g, b) = parse_hex_color(&self.prefs.accent)
            .or_else(|| parse_hex_color(DEFAULT_ACCENT))
            .unwrap_or((99, 102, 241));
        Color::Rgb(r, g, b)
    }

    /// Puts a widget on the grid. Returns false when it was already there.
    pub fn add_widget(&mut self, id: &str) -> Result<bool, AppError> {
        let widget = self
            .registry
            .get(id)
            .ok_or_else(|| AppError::UnknownWidget(id.to_string()))?;
        if !self
            .grid
            .add_widget(widget.id(), widget.default_size(), true, None)
        {
            return Ok(false);
        }
        widget.init(self);
        self.grid.save_layout(self.store.as_mut(), true)?;
        Ok(true)
    }

    pub fn remove_widget(&mut self, id: &str) -> Result<bool, AppError> {
        if !self.grid.remove_widget(id) {
            return Ok(false);
        }
        self.grid.save_layout(self.store.as_mut(), true)?;
        Ok(true)
    }

    /// Re-runs the widget's init hook; its card is redrawn on the next frame.
    pub fn refresh_widget(&mut self, id: &str) {
        let Some(widget) = self.registry.get(id) else {
            return;
        };
        if !self.grid.contains(id) {
            return;
        }
        widget.init(self);
        self.toast(format!("Widget \"{}\" refreshed", widget.name()));
    }

    pub fn save_data(&mut self) -> Result<(), AppError> {
        storage::save(self.store.as_mut(), &self.data)?;
        Ok(())
    }

    /// Saves layout and data together.
    pub fn save_all(&mut self, silent: bool) -> Result<(), AppError> {
        self.grid.save_layout(self.store.as_mut(), silent)?;
        self.save_data()?;
        if !silent {
            self.toast("Saved");
        }
        Ok(())
    }

    /// Runs timers: periodic autosave, the debounced layout save and the
    /// pomodoro clock.
    pub fn tick(&mut self, now: Instant) {
        if now.saturating_duration_since(self.last_autosave) >= self.config.autosave_interval() {
            self.last_autosave = now;
            if let Err(err) = self.save_data() {
                warn!(%err, "autosave failed");
            }
        }
        match self.grid.flush_pending(self.store.as_mut(), now) {
            Ok(true) => info!("layout saved after edit"),
            Ok(false) => {}
            Err(err) => warn!(%err, "saving layout failed"),
        }
        pomodoro::tick(self, now);
    }

    /// Bookmarks matching by name or url, then (for a non-blank query)
    /// widgets matching by name or description.
    pub fn search(&self, query: &str) -> Vec<SearchResult> {
        let needle = query.to_lowercase();
        let mut results: Vec<SearchResult> = self
            .data
            .bookmark_entries()
            .into_iter()
            .filter(|(_, _, _, app)| {
                app.name.to_lowercase().contains(&needle) || app.url.to_lowercase().contains(&needle)
            })
            .map(|(c, a, cat, app)| SearchResult::Bookmark {
                category: c,
                app: a,
                name: app.name.clone(),
                url: app.url.clone(),
                category_name: cat.category.clone(),
            })
            .collect();
        if !query.trim().is_empty() {
            results.extend(
                self.registry
                    .all()
                    .into_iter()
                    .filter(|w| {
                        w.name().to_lowercase().contains(&needle)
                            || w.description().to_lowercase().contains(&needle)
                    })
                    .map(|w| SearchResult::Widget {
                        id: w.id(),
                        name: w.name(),
                        description: w.description(),
                    }),
            );
        }
        results
    }

    pub fn activate_result(&mut self, result: &SearchResult) -> Result<(), AppError> {
        match result {
            SearchResult::Bookmark { category, app, .. } => self.open_bookmark(*category, *app),
            SearchResult::Widget { id, name, .. } => {
                if self.add_widget(id)? {
                    self.toast(format!("Added {name}"));
                } else {
                    self.toast(format!("{name} is already on the dashboard"));
                }
                Ok(())
            }
        }
    }

    /// Records the click, then launches the browser.
    pub fn open_bookmark(&mut self, category: usize, app: usize) -> Result<(), AppError> {
        let bookmark = self
            .data
            .bookmarks
            .get(category)
            .and_then(|c| c.apps.get(app))
            .cloned()
            .ok_or(ModelError::BookmarkNotFound(category, app))?;
        if let Err(err) = self.ledger().track_bookmark_click(&bookmark.url, &bookmark.name) {
            warn!(%err, "could not record bookmark click");
        }
        self.launch(&bookmark.url)?;
        self.toast(format!("Opening {}", bookmark.name));
        Ok(())
    }

    pub fn launch(&mut self, url: &str) -> Result<(), AppError> {
        if !is_valid_url(url) {
            return Err(ModelError::InvalidUrl(url.to_string()).into());
        }
        (self.open_url)(url).map_err(|source| AppError::Launch {
            url: url.to_string(),
            source,
        })
    }

    pub fn update_accent(&mut self, hex: &str) -> Result<(), AppError> {
        let hex = hex.trim();
        if !is_hex_color(hex) {
            return Err(AppError::InvalidColor(hex.to_string()));
        }
        self.prefs.accent = hex.to_string();
        storage::save_preferences(self.store.as_mut(), &self.prefs)?;
        self.toast("Accent colour updated");
        Ok(())
    }

    pub fn update_background(&mut self, url: &str) -> Result<(), AppError> {
        let url = url.trim();
        if url.is_empty() {
            return self.remove_background();
        }
        if !is_valid_url(url) {
            return Err(ModelError::InvalidUrl(url.to_string()).into());
        }
        self.prefs.bg_url = url.to_string();
        storage::save_preferences(self.store.as_mut(), &self.prefs)?;
        self.toast("Background updated");
        Ok(())
    }

    pub fn remove_background(&mut self) -> Result<(), AppError> {
        self.prefs.bg_url.clear();
        storage::save_preferences(self.store.as_mut(), &self.prefs)?;
        self.toast("Background removed");
        Ok(())
    }

    pub fn export_to(&mut self, path: &Path) -> Result<(), AppError> {
        self.save_all(true)?;
        let bundle = storage::export_all(self.store.as_ref())?;
        let encoded = serde_json::to_string_pretty(&bundle)?;
        fs::write(path, encoded).map_err(|source| AppError::File {
            path: path.to_path_buf(),
            source,
        })?;
        self.toast(format!("Exported to {}", path.display()));
        Ok(())
    }

    /// Imports a bundle and reloads everything from storage.
    pub fn import_from(&mut self, path: &Path) -> Result<(), AppError> {
        let raw = fs::read_to_string(path).map_err(|source| AppError::File {
            path: path.to_path_buf(),
            source,
        })?;
        let bundle: Value = serde_json::from_str(&raw)?;
        storage::import_all(self.store.as_mut(), &bundle)?;
        self.reload();
        self.toast("Import complete");
        Ok(())
    }

    pub fn reset(&mut self) -> Result<(), AppError> {
        storage::reset(self.store.as_mut())?;
        self.state = WidgetState::default();
        self.reload();
        self.toast("Dashboard reset");
        Ok(())
    }

    fn reload(&mut self) {
        self.data = storage::load(self.store.as_mut());
        self.prefs = storage::load_preferences(self.store.as_ref());
        self.place_widgets();
    }

    pub fn confirm(&mut self, action: ConfirmAction) -> Result<(), AppError> {
        match action {
            ConfirmAction::ResetApp => self.reset(),
            ConfirmAction::ResetStats => {
                self.ledger().reset()?;
                self.toast("Statistics reset");
                Ok(())
            }
        }
    }

    /// Applies a submitted form, routing widget forms to their widget.
    pub fn submit_form(&mut self, form: &Form) -> Result<(), AppError> {
        let values = form.values();
        if let Some(id) = form.widget {
            let widget = self
                .registry
                .get(id)
                .ok_or_else(|| AppError::UnknownWidget(id.to_string()))?;
            return widget.submit(self, &form.kind, &values);
        }
        let value = |idx: usize| values.get(idx).map(String::as_str).unwrap_or("");
        match form.kind {
            FormKind::Settings => {
                let accent = value(0).trim();
                let bg_url = value(1).trim();
                let accent_changed = accent != self.prefs.accent;
                let bg_changed = bg_url != self.prefs.bg_url;
                // Nothing is saved unless both fields are valid.
                if accent_changed && !is_hex_color(accent) {
                    return Err(AppError::InvalidColor(accent.to_string()));
                }
                if bg_changed && !bg_url.is_empty() && !is_valid_url(bg_url) {
                    return Err(ModelError::InvalidUrl(bg_url.to_string()).into());
                }
                if accent_changed {
                    self.update_accent(accent)?;
                }
                if bg_changed {
                    self.update_background(bg_url)?;
                }
                Ok(())
            }
            FormKind::Export => self.export_to(&expand_path(value(0))?),
            FormKind::Import => self.import_from(&expand_path(value(0))?),
            ref other => Err(AppError::UnsupportedForm(format!("{other:?}"))),
        }
    }

    pub fn settings_form(&self) -> Form {
        Form::new(None, FormKind::Settings, "Settings")
            .field("Accent (#RRGGBB)", &self.prefs.accent)
            .field("Background URL", &self.prefs.bg_url)
            .with_hint("Ctrl+E export • Ctrl+I import • Ctrl+R reset")
    }

    pub fn export_form(&self) -> Form {
        Form::new(None, FormKind::Export, "Export data").field("File", &default_export_name())
    }

    pub fn import_form(&self) -> Form {
        Form::new(None, FormKind::Import, "Import data").field("File", "")
    }
}

fn default_export_name() -> String {
    format!("tabdesk-backup-{}.json", chrono::Local::now().format("%Y-%m-%d"))
}

fn expand_path(raw: &str) -> Result<PathBuf, AppError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(ModelError::EmptyField("file").into());
    }
    if let Some(rest) = raw.strip_prefix("~/") {
        if let Some(dirs) = directories::UserDirs::new() {
            return Ok(dirs.home_dir().join(rest));
        }
    }
    Ok(PathBuf::from(raw))
}

/// Opens a url with the platform's default handler.
pub fn system_open(url: &str) -> io::Result<()> {
    let program = if cfg!(target_os = "macos") {
        "open"
    } else if cfg!(target_os = "windows") {
        "explorer"
    } else {
        "xdg-open"
    };
    Command::new(program)
        .arg(url)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map(|_| ())
}
