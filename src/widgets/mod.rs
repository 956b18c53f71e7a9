//! Built-in dashboard widgets and the registry that maps ids to them.

use std::collections::BTreeMap;

use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use tracing::{error, warn};

use crate::app::{AppContext, AppError, ConfirmAction};
use crate::form::{Form, FormKind};
use crate::model::WidgetSize;

pub mod bookmarks;
pub mod calculator;
pub mod emoji;
pub mod git;
pub mod notes;
pub mod password;
pub mod pomodoro;
pub mod px;
pub mod rss;
pub mod snippets;
pub mod statistics;
pub mod tasks;

/// Result of offering a key press to the focused widget.
#[derive(Debug)]
pub enum KeyOutcome {
    Ignored,
    Handled,
    OpenForm(Form),
    Confirm(ConfirmAction),
}

pub trait WidgetDescriptor {
    fn id(&self) -> &'static str;
    fn name(&self) -> &'static str;
    fn icon(&self) -> &'static str;
    fn description(&self) -> &'static str;
    fn default_size(&self) -> WidgetSize;

    /// Card body. `focused` is true when the card has keyboard focus.
    fn render(&self, ctx: &AppContext, focused: bool) -> Vec<Line<'static>>;

    /// Runs when the widget is placed on the grid and when it is refreshed.
    fn init(&self, _ctx: &mut AppContext) {}

    fn handle_key(&self, _ctx: &mut AppContext, _key: KeyEvent) -> KeyOutcome {
        KeyOutcome::Ignored
    }

    fn submit(&self, _ctx: &mut AppContext, kind: &FormKind, _values: &[String]) -> Result<(), AppError> {
        Err(AppError::UnsupportedForm(format!("{kind:?}")))
    }

    /// Key hints shown in the footer while focused.
    fn hints(&self) -> &'static str {
        ""
    }
}

pub type Widget = &'static dyn WidgetDescriptor;

/// Insertion-ordered table of widget descriptors.
#[derive(Default)]
pub struct WidgetRegistry {
    widgets: Vec<Widget>,
}

impl WidgetRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The twelve built-in widgets in their display order.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        for widget in builtins() {
            registry.register(widget);
        }
        registry
    }

    /// Registers a descriptor. An empty id is refused; an existing id is
    /// replaced in place.
    pub fn register(&mut self, widget: Widget) {
        if widget.id().is_empty() {
            error!(name = widget.name(), "refusing widget without an id");
            return;
        }
        match self.widgets.iter().position(|w| w.id() == widget.id()) {
            Some(idx) => self.widgets[idx] = widget,
            None => self.widgets.push(widget),
        }
    }

    pub fn get(&self, id: &str) -> Option<Widget> {
        self.widgets.iter().copied().find(|w| w.id() == id)
    }

    pub fn all(&self) -> Vec<Widget> {
        self.widgets.clone()
    }

    pub fn all_as_map(&self) -> BTreeMap<&'static str, Widget> {
        self.widgets.iter().map(|w| (w.id(), *w)).collect()
    }

    pub fn len(&self) -> usize {
        self.widgets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.widgets.is_empty()
    }
}

fn builtins() -> [Widget; 12] {
    [
        &bookmarks::BOOKMARKS,
        &tasks::TASKS,
        &notes::NOTES,
        &px::TOOLS_PX,
        &password::TOOLS_PASS,
        &snippets::SNIPPETS,
        &calculator::CALCULATOR,
        &pomodoro::POMODORO,
        &git::GIT_CHEATSHEET,
        &emoji::EMOJI_PICKER,
        &rss::RSS_FEEDS,
        &statistics::STATISTICS,
    ]
}

/// Runtime state that lives only while the dashboard is open.
#[derive(Debug, Default)]
pub struct WidgetState {
    pub bookmarks: ListCursor,
    pub tasks: ListCursor,
    pub snippets: ListCursor,
    pub git: ListCursor,
    pub rss: ListCursor,
    pub calculator: calculator::CalcState,
    pub pomodoro: pomodoro::Timer,
    pub password: password::PassState,
    pub px: px::PxState,
    pub emoji: emoji::EmojiState,
}

/// Selection within a list-shaped widget.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ListCursor {
    pub selected: usize,
}

impl ListCursor {
    pub fn clamp(&mut self, len: usize) -> usize {
        self.selected = self.selected.min(len.saturating_sub(1));
        self.selected
    }

    /// Handles up/down style keys; returns true when the key was a move.
    pub fn handle_move(&mut self, key: &KeyEvent, len: usize) -> bool {
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => {
                self.selected = self.selected.saturating_sub(1);
            }
            KeyCode::Down | KeyCode::Char('j') => {
                if self.selected + 1 < len {
                    self.selected += 1;
                }
            }
            KeyCode::Home => self.selected = 0,
            KeyCode::End => self.selected = len.saturating_sub(1),
            _ => return false,
        }
        true
    }
}

pub(crate) fn muted(text: impl Into<String>) -> Line<'static> {
    Line::from(Span::styled(text.into(), Style::default().fg(Color::DarkGray)))
}

pub(crate) fn heading(text: impl Into<String>) -> Line<'static> {
    Line::from(Span::styled(
        text.into(),
        Style::default()
            .fg(Color::Gray)
            .add_modifier(Modifier::BOLD),
    ))
}

/// Marker and style for a list row.
pub(crate) fn row_style(selected: bool, focused: bool) -> (&'static str, Style) {
    if selected && focused {
        (
            "› ",
            Style::default()
                .fg(Color::Black)
                .bg(Color::LightCyan)
                .add_modifier(Modifier::BOLD),
        )
    } else {
        ("  ", Style::default().fg(Color::White))
    }
}

/// Saves AppData after a widget edit and reports the outcome as a toast.
pub(crate) fn persist(ctx: &mut AppContext, message: String) {
    match ctx.save_data() {
        Ok(()) => ctx.toast(message),
        Err(err) => {
            warn!(%err, "saving data failed");
            ctx.toast(format!("Save failed: {err}"));
        }
    }
}

pub(crate) fn is_plain(key: &KeyEvent) -> bool {
    !key.modifiers.intersects(
        crossterm::event::KeyModifiers::CONTROL | crossterm::event::KeyModifiers::ALT,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::AppContext;

    struct Nameless;

    impl WidgetDescriptor for Nameless {
        fn id(&self) -> &'static str {
            ""
        }
        fn name(&self) -> &'static str {
            "nameless"
        }
        fn icon(&self) -> &'static str {
            "?"
        }
        fn description(&self) -> &'static str {
            ""
        }
        fn default_size(&self) -> WidgetSize {
            WidgetSize::new(1, 1)
        }
        fn render(&self, _ctx: &AppContext, _focused: bool) -> Vec<Line<'static>> {
            Vec::new()
        }
    }

    struct BigNotes;

    impl WidgetDescriptor for BigNotes {
        fn id(&self) -> &'static str {
            "notes"
        }
        fn name(&self) -> &'static str {
            "Big notes"
        }
        fn icon(&self) -> &'static str {
            "✎"
        }
        fn description(&self) -> &'static str {
            "notes, but larger"
        }
        fn default_size(&self) -> WidgetSize {
            WidgetSize::new(12, 8)
        }
        fn render(&self, _ctx: &AppContext, _focused: bool) -> Vec<Line<'static>> {
            Vec::new()
        }
    }

    static NAMELESS: Nameless = Nameless;
    static BIG_NOTES: BigNotes = BigNotes;

    #[test]
    fn builtins_are_registered_in_order() {
        let registry = WidgetRegistry::with_builtins();
        let ids: Vec<&str> = registry.all().iter().map(|w| w.id()).collect();
        assert_eq!(
            ids,
            vec![
                "bookmarks",
                "tasks",
                "notes",
                "tools-px",
                "tools-pass",
                "snippets",
                "calculator",
                "pomodoro",
                "git-cheatsheet",
                "emoji-picker",
                "rss-feeds",
                "statistics",
            ]
        );
        assert_eq!(registry.get("bookmarks").map(|w| w.default_size()), Some(WidgetSize::new(8, 4)));
        assert_eq!(registry.get("rss-feeds").map(|w| w.default_size()), Some(WidgetSize::new(6, 5)));
        assert!(registry.get("nope").is_none());
        assert_eq!(registry.all_as_map().len(), 12);
    }

    #[test]
    fn empty_id_is_refused() {
        let mut registry = WidgetRegistry::new();
        registry.register(&NAMELESS);
        assert!(registry.is_empty());
    }

    #[test]
    fn re_registering_replaces_in_place() {
        let mut registry = WidgetRegistry::with_builtins();
        registry.register(&BIG_NOTES);
        assert_eq!(registry.len(), 12);
        assert_eq!(registry.all()[2].name(), "Big notes");
        assert_eq!(registry.get("notes").map(|w| w.default_size()), Some(WidgetSize::new(12, 8)));
    }

    #[test]
    fn list_cursor_stays_in_bounds() {
        let mut cursor = ListCursor::default();
        let down = KeyEvent::from(KeyCode::Down);
        let up = KeyEvent::from(KeyCode::Char('k'));
        assert!(cursor.handle_move(&down, 2));
        assert!(cursor.handle_move(&down, 2));
        assert_eq!(cursor.selected, 1);
        assert!(cursor.handle_move(&up, 2));
        assert!(cursor.handle_move(&up, 2));
        assert_eq!(cursor.selected, 0);
        cursor.selected = 9;
        assert_eq!(cursor.clamp(3), 2);
        assert_eq!(cursor.clamp(0), 0);
    }
}
