use crate::app::{AppContext, ConfirmAction, SearchResult};
use crate::form::{FieldValue, Form, FormKind};
use crate::model::LayoutNode;
use crate::widgets::{KeyOutcome, Widget};
use anyhow::Result;
use chrono::{Local, Timelike};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::prelude::{Alignment, Color, Modifier, Rect, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::block::Title;
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap};
use ratatui::Terminal;
use std::io::{stdout, Stdout};
use std::time::{Duration, Instant};
use tracing::{info, warn};

const SEARCH_LIMIT: usize = 12;

pub fn run(ctx: AppContext) -> Result<()> {
    let mut terminal = setup_terminal()?;
    let mut app = App::new(ctx);
    let result = app.event_loop(&mut terminal);
    teardown_terminal(&mut terminal)?;
    result
}

struct App {
    ctx: AppContext,
    focus: Option<String>,
    scroll: u16,
    status: String,
    mode: Mode,
}

enum Mode {
    Normal,
    Form(Form),
    Confirm(ConfirmAction),
    Search { query: FieldValue, selected: usize },
    Manager { selected: usize },
}

impl App {
    fn new(ctx: AppContext) -> Self {
        let focus = ctx.grid.nodes().first().map(|n| n.id.clone());
        App {
            ctx,
            focus,
            scroll: 0,
            status: "Tab to move between widgets • Ctrl+K search • q quit".into(),
            mode: Mode::Normal,
        }
    }

    fn event_loop(&mut self, terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
        loop {
            self.ctx.tick(Instant::now());
            terminal.draw(|f| self.draw(f))?;
            if event::poll(Duration::from_millis(200))? {
                if let Event::Key(key) = event::read()? {
                    if key.kind != KeyEventKind::Press {
                        continue;
                    }
                    if self.handle_key(key)? {
                        break;
                    }
                }
            }
        }
        if let Err(err) = self.ctx.save_all(true) {
            warn!(%err, "final save failed");
        }
        info!("dashboard closed");
        Ok(())
    }

    fn handle_key(&mut self, key: KeyEvent) -> Result<bool> {
        match self.mode {
            Mode::Normal => self.handle_normal_key(key),
            Mode::Form(_) => self.handle_form_key(key),
            Mode::Confirm(_) => self.handle_confirm_key(key),
            Mode::Search { .. } => self.handle_search_key(key),
            Mode::Manager { .. } => self.handle_manager_key(key),
        }
    }

    fn handle_normal_key(&mut self, key: KeyEvent) -> Result<bool> {
        let control = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Char('c') if control => return Ok(true),
            KeyCode::Char('k') if control => {
                self.mode = Mode::Search {
                    query: FieldValue::new(""),
                    selected: 0,
                };
                self.status = "Search bookmarks and widgets (Enter open, Esc close)".into();
                return Ok(false);
            }
            KeyCode::Char('s') if control => {
                match self.ctx.save_all(false) {
                    Ok(()) => self.status = "Saved".into(),
                    Err(err) => self.status = format!("Save failed: {}", err),
                }
                return Ok(false);
            }
            KeyCode::Tab => {
                self.cycle_focus(1);
                return Ok(false);
            }
            KeyCode::BackTab => {
                self.cycle_focus(-1);
                return Ok(false);
            }
            _ => {}
        }
        if control || key.modifiers.contains(KeyModifiers::ALT) {
            return Ok(false);
        }
        match key.code {
            KeyCode::Char('q') => return Ok(true),
            KeyCode::Char('e') => {
                let message = self.ctx.grid.toggle_edit_mode();
                self.status = message
                    .unwrap_or("Layout locked")
                    .to_string();
                return Ok(false);
            }
            KeyCode::Char('m') => {
                self.mode = Mode::Manager { selected: 0 };
                self.status = "Enter toggles a widget • Esc closes".into();
                return Ok(false);
            }
            KeyCode::Char(',') => {
                self.mode = Mode::Form(self.ctx.settings_form());
                self.status = "Settings (Ctrl+S save, Esc cancel)".into();
                return Ok(false);
            }
            _ => {}
        }
        if self.ctx.grid.is_edit_mode() {
            self.handle_edit_key(key);
            return Ok(false);
        }
        self.forward_to_widget(key);
        Ok(false)
    }

    /// Layout editing: arrows move the focused card, shifted keys resize it.
    fn handle_edit_key(&mut self, key: KeyEvent) {
        let Some(id) = self.focused_id() else {
            return;
        };
        let now = Instant::now();
        let grid = &mut self.ctx.grid;
        let changed = match key.code {
            KeyCode::Left | KeyCode::Char('h') if !shifted(&key) => grid.move_widget(&id, -1, 0, now),
            KeyCode::Right | KeyCode::Char('l') if !shifted(&key) => grid.move_widget(&id, 1, 0, now),
            KeyCode::Up | KeyCode::Char('k') if !shifted(&key) => grid.move_widget(&id, 0, -1, now),
            KeyCode::Down | KeyCode::Char('j') if !shifted(&key) => grid.move_widget(&id, 0, 1, now),
            KeyCode::Left | KeyCode::Char('H') => grid.resize_widget(&id, -1, 0, now),
            KeyCode::Right | KeyCode::Char('L') => grid.resize_widget(&id, 1, 0, now),
            KeyCode::Up | KeyCode::Char('K') => grid.resize_widget(&id, 0, -1, now),
            KeyCode::Down | KeyCode::Char('J') => grid.resize_widget(&id, 0, 1, now),
            KeyCode::Char('x') | KeyCode::Delete => {
                match self.ctx.remove_widget(&id) {
                    Ok(true) => {
                        self.status = format!("Removed {}", id);
                        self.focus = self.ctx.grid.nodes().first().map(|n| n.id.clone());
                    }
                    Ok(false) => {}
                    Err(err) => self.status = format!("Remove failed: {}", err),
                }
                return;
            }
            KeyCode::Esc => {
                self.ctx.grid.set_edit_mode(false);
                self.status = "Layout locked".into();
                return;
            }
            _ => return,
        };
        if changed {
            if let Some(node) = self.ctx.grid.node(&id) {
                self.status = format!("{} at {},{} size {}×{}", id, node.x, node.y, node.w, node.h);
            }
        }
    }

    fn forward_to_widget(&mut self, key: KeyEvent) {
        let Some(widget) = self
            .focused_id()
            .and_then(|id| self.ctx.registry.get(&id))
        else {
            return;
        };
        match widget.handle_key(&mut self.ctx, key) {
            KeyOutcome::Ignored | KeyOutcome::Handled => {}
            KeyOutcome::OpenForm(form) => {
                self.status = format!(
                    "{} (Tab/Shift-Tab move, Ctrl+S save, Esc cancel)",
                    form.title
                );
                self.mode = Mode::Form(form);
            }
            KeyOutcome::Confirm(action) => {
                self.status = format!("{} (y to confirm, n/Esc to cancel)", action.prompt());
                self.mode = Mode::Confirm(action);
            }
        }
    }

    fn handle_form_key(&mut self, key: KeyEvent) -> Result<bool> {
        let mut mode = std::mem::replace(&mut self.mode, Mode::Normal);
        if let Mode::Form(form) = &mut mode {
            if let Some(next) = self.settings_shortcut(form, key) {
                self.mode = next;
                return Ok(false);
            }
            if self.process_form_key(form, key) {
                return Ok(false);
            }
        }
        self.mode = mode;
        Ok(false)
    }

    /// Ctrl+E, Ctrl+I and Ctrl+R jump from the settings form to export,
    /// import and reset.
    fn settings_shortcut(&mut self, form: &Form, key: KeyEvent) -> Option<Mode> {
        if form.kind != FormKind::Settings || !key.modifiers.contains(KeyModifiers::CONTROL) {
            return None;
        }
        match key.code {
            KeyCode::Char('e') => Some(Mode::Form(self.ctx.export_form())),
            KeyCode::Char('i') => Some(Mode::Form(self.ctx.import_form())),
            KeyCode::Char('r') => {
                let action = ConfirmAction::ResetApp;
                self.status = format!("{} (y to confirm, n/Esc to cancel)", action.prompt());
                Some(Mode::Confirm(action))
            }
            _ => None,
        }
    }

    /// Returns true when the form should close.
    fn process_form_key(&mut self, form: &mut Form, key: KeyEvent) -> bool {
        let control = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Esc => {
                self.status = "Canceled".into();
                return true;
            }
            KeyCode::Char('s') if control => return self.try_submit(form),
            KeyCode::Tab => form.next_field(),
            KeyCode::BackTab => form.prev_field(),
            KeyCode::Enter => {
                if form.active_is_multiline() && !control {
                    if let Some(field) = form.active_field_mut() {
                        field.insert_char('\n');
                    }
                } else {
                    return self.try_submit(form);
                }
            }
            code => {
                let Some(field) = form.active_field_mut() else {
                    return false;
                };
                match code {
                    KeyCode::Left => field.move_left(),
                    KeyCode::Right => field.move_right(),
                    KeyCode::Up => field.move_up(),
                    KeyCode::Down => field.move_down(),
                    KeyCode::Backspace => field.backspace(),
                    KeyCode::Char(c) if !key.modifiers.intersects(KeyModifiers::CONTROL | KeyModifiers::ALT) => {
                        field.insert_char(c)
                    }
                    _ => {}
                }
            }
        }
        false
    }

    fn try_submit(&mut self, form: &Form) -> bool {
        match self.ctx.submit_form(form) {
            Ok(()) => {
                self.status = format!("{} saved", form.title);
                self.ensure_focus();
                true
            }
            Err(err) => {
                warn!(%err, form = %form.title, "form rejected");
                self.status = format!("Could not save: {}", err);
                false
            }
        }
    }

    fn handle_confirm_key(&mut self, key: KeyEvent) -> Result<bool> {
        let action = match &self.mode {
            Mode::Confirm(action) => *action,
            _ => return Ok(false),
        };
        match key.code {
            KeyCode::Char('y') | KeyCode::Enter => {
                match self.ctx.confirm(action) {
                    Ok(()) => self.status = "Done".into(),
                    Err(err) => self.status = format!("Failed: {}", err),
                }
                self.ensure_focus();
                self.mode = Mode::Normal;
            }
            KeyCode::Char('n') | KeyCode::Esc => {
                self.status = "Canceled".into();
                self.mode = Mode::Normal;
            }
            _ => {}
        }
        Ok(false)
    }

    fn handle_search_key(&mut self, key: KeyEvent) -> Result<bool> {
        let Mode::Search { query, selected } = &mut self.mode else {
            return Ok(false);
        };
        match key.code {
            KeyCode::Esc => {
                self.mode = Mode::Normal;
                self.status = "Search closed".into();
            }
            KeyCode::Up => *selected = selected.saturating_sub(1),
            KeyCode::Down | KeyCode::Tab => *selected += 1,
            KeyCode::Left => query.move_left(),
            KeyCode::Right => query.move_right(),
            KeyCode::Backspace => {
                query.backspace();
                *selected = 0;
            }
            KeyCode::Enter => {
                let results = self.ctx.search(query.as_str());
                let Some(result) = results.get((*selected).min(results.len().saturating_sub(1))).cloned() else {
                    return Ok(false);
                };
                self.mode = Mode::Normal;
                if let Err(err) = self.ctx.activate_result(&result) {
                    warn!(%err, "search result failed");
                    self.status = err.to_string();
                }
                if let SearchResult::Widget { id, .. } = result {
                    self.focus = Some(id.to_string());
                }
            }
            KeyCode::Char(c) if !key.modifiers.intersects(KeyModifiers::CONTROL | KeyModifiers::ALT) => {
                query.insert_char(c);
                *selected = 0;
            }
            _ => {}
        }
        Ok(false)
    }

    fn handle_manager_key(&mut self, key: KeyEvent) -> Result<bool> {
        let Mode::Manager { selected } = &mut self.mode else {
            return Ok(false);
        };
        let widgets = self.ctx.registry.all();
        match key.code {
            KeyCode::Esc | KeyCode::Char('m') | KeyCode::Char('q') => {
                self.mode = Mode::Normal;
                self.status = "Widget manager closed".into();
            }
            KeyCode::Up | KeyCode::Char('k') => *selected = selected.saturating_sub(1),
            KeyCode::Down | KeyCode::Char('j') => {
                if *selected + 1 < widgets.len() {
                    *selected += 1;
                }
            }
            KeyCode::Enter | KeyCode::Char(' ') => {
                let Some(widget) = widgets.get(*selected).copied() else {
                    return Ok(false);
                };
                self.toggle_widget(widget);
            }
            KeyCode::Char('r') => {
                if let Some(widget) = widgets.get(*selected) {
                    self.ctx.refresh_widget(widget.id());
                }
            }
            _ => {}
        }
        Ok(false)
    }

    fn toggle_widget(&mut self, widget: Widget) {
        let result = if self.ctx.grid.contains(widget.id()) {
            self.ctx
                .remove_widget(widget.id())
                .map(|_| format!("Removed {}", widget.name()))
        } else {
            self.ctx.add_widget(widget.id()).map(|_| {
                self.focus = Some(widget.id().to_string());
                format!("Added {}", widget.name())
            })
        };
        match result {
            Ok(message) => self.status = message,
            Err(err) => self.status = format!("Failed: {}", err),
        }
        self.ensure_focus();
    }

    fn focused_id(&self) -> Option<String> {
        self.focus
            .as_ref()
            .filter(|id| self.ctx.grid.contains(id))
            .cloned()
    }

    fn ensure_focus(&mut self) {
        if self.focused_id().is_none() {
            self.focus = self.ctx.grid.nodes().first().map(|n| n.id.clone());
        }
    }

    fn cycle_focus(&mut self, step: isize) {
        let nodes = self.ctx.grid.nodes();
        if nodes.is_empty() {
            self.focus = None;
            return;
        }
        let len = nodes.len() as isize;
        let next = match self.focused_id() {
            Some(id) => {
                let current = nodes.iter().position(|n| n.id == id).unwrap_or(0) as isize;
                (current + step).rem_euclid(len)
            }
            None => 0,
        };
        self.focus = Some(nodes[next as usize].id.clone());
    }

    fn draw(&mut self, f: &mut ratatui::Frame<'_>) {
        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Min(8),
                Constraint::Length(4),
            ])
            .split(f.size());

        self.draw_header(f, layout[0]);
        self.draw_grid(f, layout[1]);
        self.draw_footer(f, layout[2]);

        match &self.mode {
            Mode::Form(form) => self.draw_form(f, form),
            Mode::Confirm(action) => self.draw_confirm(f, *action),
            Mode::Search { query, selected } => self.draw_search(f, query, *selected),
            Mode::Manager { selected } => self.draw_manager(f, *selected),
            Mode::Normal => {}
        }
    }

    fn draw_header(&self, f: &mut ratatui::Frame<'_>, area: Rect) {
        let now = Local::now();
        let mut spans = vec![
            Span::styled(
                "tabdesk ",
                Style::default()
                    .fg(self.ctx.accent_color())
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled(
                greeting(now.hour()),
                Style::default().add_modifier(Modifier::BOLD),
            ),
            Span::raw("  •  "),
            Span::styled(
                now.format("%H:%M").to_string(),
                Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
            ),
            Span::raw("  •  "),
            Span::styled(
                now.format("%A %e %B").to_string(),
                Style::default().fg(Color::Gray),
            ),
            Span::raw("  •  "),
            Span::styled(
                format!("{} widgets", self.ctx.grid.nodes().len()),
                Style::default().fg(Color::DarkGray),
            ),
        ];
        if self.ctx.grid.is_edit_mode() {
            spans.push(Span::raw("  •  "));
            spans.push(Span::styled(
                "EDIT",
                Style::default()
                    .fg(Color::LightYellow)
                    .add_modifier(Modifier::BOLD),
            ));
        }
        if self.ctx.grid.has_pending_save() {
            spans.push(Span::raw("  •  "));
            spans.push(Span::styled("layout unsaved", Style::default().fg(Color::Magenta)));
        }

        let block = Block::default()
            .borders(Borders::BOTTOM)
            .border_style(Style::default().fg(Color::DarkGray));
        let paragraph = Paragraph::new(Line::from(spans))
            .alignment(Alignment::Center)
            .block(block);
        f.render_widget(paragraph, area);
    }

    fn draw_grid(&mut self, f: &mut ratatui::Frame<'_>, area: Rect) {
        let nodes: Vec<LayoutNode> = self.ctx.grid.nodes().to_vec();
        if nodes.is_empty() {
            let empty = Paragraph::new(vec![
                Line::from(""),
                Line::from(Span::styled(
                    "No widgets on the dashboard",
                    Style::default().fg(Color::Gray),
                )),
                Line::from(Span::styled(
                    "press m to add some",
                    Style::default().fg(Color::DarkGray),
                )),
            ])
            .alignment(Alignment::Center);
            f.render_widget(empty, area);
            return;
        }

        let columns = self.ctx.grid.columns();
        let cell_width = (area.width / columns).max(1);
        let row_height = self.ctx.config.grid.row_height.max(1);
        let focused = self.focused_id();
        if let Some(node) = focused.as_ref().and_then(|id| nodes.iter().find(|n| &n.id == id)) {
            self.scroll = scroll_to_show(node, row_height, area.height, self.scroll);
        }

        for node in &nodes {
            let Some(widget) = self.ctx.registry.get(&node.id) else {
                continue;
            };
            let Some(rect) = card_rect(node, area, cell_width, row_height, self.scroll, columns) else {
                continue;
            };
            let is_focused = focused.as_deref() == Some(node.id.as_str());
            self.draw_card(f, rect, widget, node, is_focused);
        }
    }

    fn draw_card(
        &self,
        f: &mut ratatui::Frame<'_>,
        area: Rect,
        widget: Widget,
        node: &LayoutNode,
        focused: bool,
    ) {
        let accent = self.ctx.accent_color();
        let editing = self.ctx.grid.is_edit_mode();
        let border = match (focused, editing) {
            (true, true) => Color::LightYellow,
            (true, false) => accent,
            (false, _) => Color::DarkGray,
        };
        let title = Line::from(vec![
            Span::styled(format!(" {} ", widget.icon()), Style::default().fg(accent)),
            Span::styled(
                format!("{} ", widget.name()),
                if focused {
                    Style::default().add_modifier(Modifier::BOLD)
                } else {
                    Style::default().fg(Color::Gray)
                },
            ),
        ]);
        let mut block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(border))
            .title(title);
        if editing {
            block = block.title(
                Title::from(Span::styled(
                    format!(" {}×{} ", node.w, node.h),
                    Style::default().fg(Color::DarkGray),
                ))
                .alignment(Alignment::Right),
            );
        }

        let lines = widget.render(&self.ctx, focused);
        let inner_height = area.height.saturating_sub(2);
        let offset = lines
            .iter()
            .position(|l| l.spans.first().is_some_and(|s| s.content == "› "))
            .map_or(0, |row| (row as u16 + 1).saturating_sub(inner_height));
        let body = Paragraph::new(lines)
            .block(block)
            .wrap(Wrap { trim: false })
            .scroll((offset, 0));
        f.render_widget(Clear, area);
        f.render_widget(body, area);
    }

    fn draw_footer(&self, f: &mut ratatui::Frame<'_>, area: Rect) {
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(2), Constraint::Length(2)])
            .split(area);

        let help_bar = Paragraph::new(self.footer_help_line())
            .alignment(Alignment::Center)
            .block(
                Block::default()
                    .borders(Borders::TOP)
                    .border_style(Style::default().fg(Color::DarkGray)),
            );
        f.render_widget(help_bar, rows[0]);

        let bottom = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
            .split(rows[1]);

        let hints = self
            .focused_id()
            .and_then(|id| self.ctx.registry.get(&id))
            .map(|w| format!("{}: {}", w.name(), w.hints()))
            .filter(|_| !self.ctx.grid.is_edit_mode())
            .unwrap_or_else(|| self.status.clone());
        let status = Paragraph::new(hints)
            .wrap(Wrap { trim: true })
            .block(
                Block::default()
                    .borders(Borders::TOP)
                    .border_style(Style::default().fg(Color::DarkGray)),
            );
        f.render_widget(status, bottom[0]);

        let (message, color) = match self.ctx.current_toast(Instant::now()) {
            Some(toast) => (toast.message.clone(), self.ctx.accent_color()),
            None => (self.status.clone(), Color::Gray),
        };
        let toast = Paragraph::new(Span::styled(message, Style::default().fg(color)))
            .alignment(Alignment::Right)
            .wrap(Wrap { trim: true })
            .block(
                Block::default()
                    .borders(Borders::TOP)
                    .border_style(Style::default().fg(Color::DarkGray)),
            );
        f.render_widget(toast, bottom[1]);
    }

    fn footer_help_line(&self) -> Line<'static> {
        let mut spans = Vec::new();
        if self.ctx.grid.is_edit_mode() {
            spans.extend([
                Span::styled("←↑↓→ / h j k l", Style::default().fg(Color::LightCyan)),
                Span::raw(" move  "),
                Span::styled("H J K L", Style::default().fg(Color::LightGreen)),
                Span::raw(" resize  "),
                Span::styled("x", Style::default().fg(Color::LightRed)),
                Span::raw(" remove  "),
                Span::styled("Tab", Style::default().fg(Color::LightCyan)),
                Span::raw(" focus  "),
                Span::styled("e", Style::default().fg(Color::LightYellow)),
                Span::raw(" lock layout"),
            ]);
        } else {
            spans.extend([
                Span::styled("Tab", Style::default().fg(Color::LightCyan)),
                Span::raw(" focus  "),
                Span::styled("Ctrl+K", Style::default().fg(Color::LightCyan)),
                Span::raw(" search  "),
                Span::styled("e", Style::default().fg(Color::LightYellow)),
                Span::raw(" edit layout  "),
                Span::styled("m", Style::default().fg(Color::LightMagenta)),
                Span::raw(" widgets  "),
                Span::styled(",", Style::default().fg(Color::LightMagenta)),
                Span::raw(" settings  "),
                Span::styled("Ctrl+S", Style::default().fg(Color::LightGreen)),
                Span::raw(" save  "),
                Span::styled("q", Style::default().fg(Color::LightRed)),
                Span::raw(" quit"),
            ]);
        }
        Line::from(spans)
    }

    fn draw_form(&self, f: &mut ratatui::Frame<'_>, form: &Form) {
        let height = if form.fields.iter().any(|field| field.multiline) { 70 } else { 50 };
        let area = centered_rect(70, height, f.size());
        let mut fields = Vec::new();
        for (idx, field) in form.fields.iter().enumerate() {
            fields.extend(field_lines(field.label, &field.value, idx == form.active));
        }
        fields.push(Line::from(""));
        if let Some(hint) = &form.hint {
            fields.push(Line::from(Span::styled(
                hint.clone(),
                Style::default().fg(Color::DarkGray),
            )));
        }
        fields.push(Line::from(Span::styled(
            "Ctrl+S to save • Esc to cancel • Tab/Shift-Tab to move",
            Style::default().fg(Color::Gray),
        )));
        let accent = self.ctx.accent_color();
        let dialog = Paragraph::new(fields)
            .block(
                Block::default()
                    .title(Span::styled(
                        form.title.clone(),
                        Style::default().fg(accent).add_modifier(Modifier::BOLD),
                    ))
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(accent)),
            )
            .wrap(Wrap { trim: false });

        f.render_widget(Clear, area);
        f.render_widget(dialog, area);
    }

    fn draw_confirm(&self, f: &mut ratatui::Frame<'_>, action: ConfirmAction) {
        let area = centered_rect(50, 30, f.size());
        let body = vec![
            Line::from(Span::styled(
                action.prompt(),
                Style::default()
                    .fg(Color::LightRed)
                    .add_modifier(Modifier::BOLD),
            )),
            Line::from(""),
            Line::from("Press y to confirm, n or Esc to cancel"),
        ];
        let dialog = Paragraph::new(body).alignment(Alignment::Center).block(
            Block::default()
                .title(Span::styled(
                    "Confirm",
                    Style::default()
                        .fg(Color::LightRed)
                        .add_modifier(Modifier::BOLD),
                ))
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::LightRed)),
        );
        f.render_widget(Clear, area);
        f.render_widget(dialog, area);
    }

    fn draw_search(&self, f: &mut ratatui::Frame<'_>, query: &FieldValue, selected: usize) {
        let area = centered_rect(60, 60, f.size());
        f.render_widget(Clear, area);
        let accent = self.ctx.accent_color();
        let block = Block::default()
            .title(Span::styled(
                "Quick search",
                Style::default().fg(accent).add_modifier(Modifier::BOLD),
            ))
            .borders(Borders::ALL)
            .border_style(Style::default().fg(accent));
        let inner = block.inner(area);
        f.render_widget(block, area);

        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(2), Constraint::Min(1)])
            .split(inner);
        f.render_widget(Paragraph::new(field_lines("Find", query, true)), rows[0]);

        let results = self.ctx.search(query.as_str());
        if results.is_empty() {
            f.render_widget(
                Paragraph::new(Span::styled("No results", Style::default().fg(Color::DarkGray))),
                rows[1],
            );
            return;
        }
        let items: Vec<ListItem> = results
            .iter()
            .take(SEARCH_LIMIT)
            .map(search_item)
            .collect();
        let list = List::new(items).highlight_style(
            Style::default()
                .fg(Color::Black)
                .bg(Color::LightCyan)
                .add_modifier(Modifier::BOLD),
        );
        let mut state = ListState::default();
        state.select(Some(selected.min(results.len().min(SEARCH_LIMIT) - 1)));
        f.render_stateful_widget(list, rows[1], &mut state);
    }

    fn draw_manager(&self, f: &mut ratatui::Frame<'_>, selected: usize) {
        let area = centered_rect(60, 70, f.size());
        let accent = self.ctx.accent_color();
        let items: Vec<ListItem> = self
            .ctx
            .registry
            .all()
            .into_iter()
            .map(|widget| {
                let active = self.ctx.grid.contains(widget.id());
                let size = widget.default_size();
                ListItem::new(Line::from(vec![
                    Span::styled(
                        if active { "[x] " } else { "[ ] " },
                        Style::default().fg(if active { Color::LightGreen } else { Color::DarkGray }),
                    ),
                    Span::styled(format!("{} ", widget.icon()), Style::default().fg(accent)),
                    Span::styled(
                        widget.name().to_string(),
                        Style::default().add_modifier(Modifier::BOLD),
                    ),
                    Span::styled(
                        format!("  {}×{}  {}", size.w, size.h, widget.description()),
                        Style::default().fg(Color::DarkGray),
                    ),
                ]))
            })
            .collect();
        let list = List::new(items)
            .block(
                Block::default()
                    .title(Span::styled(
                        "Widgets (Enter toggle • r refresh • Esc close)",
                        Style::default().fg(accent).add_modifier(Modifier::BOLD),
                    ))
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(accent)),
            )
            .highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD));
        let mut state = ListState::default();
        state.select(Some(selected));
        f.render_widget(Clear, area);
        f.render_stateful_widget(list, area, &mut state);
    }
}

fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let terminal = Terminal::new(backend)?;
    Ok(terminal)
}

fn teardown_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints(
            [
                Constraint::Percentage((100 - percent_y) / 2),
                Constraint::Percentage(percent_y),
                Constraint::Percentage((100 - percent_y) / 2),
            ]
            .as_ref(),
        )
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints(
            [
                Constraint::Percentage((100 - percent_x) / 2),
                Constraint::Percentage(percent_x),
                Constraint::Percentage((100 - percent_x) / 2),
            ]
            .as_ref(),
        )
        .split(popup_layout[1])[1]
}

fn greeting(hour: u32) -> &'static str {
    match hour {
        5..=11 => "Good morning",
        12..=17 => "Good afternoon",
        _ => "Good evening",
    }
}

fn shifted(key: &KeyEvent) -> bool {
    key.modifiers.contains(KeyModifiers::SHIFT)
}

/// Screen rectangle of a card, clipped to `area` after scrolling `scroll`
/// terminal rows. The rightmost column absorbs the division remainder.
fn card_rect(
    node: &LayoutNode,
    area: Rect,
    cell_width: u16,
    row_height: u16,
    scroll: u16,
    columns: u16,
) -> Option<Rect> {
    let top = node.y.saturating_mul(row_height);
    let bottom = node.y.saturating_add(node.h).saturating_mul(row_height);
    if bottom <= scroll || top >= scroll.saturating_add(area.height) {
        return None;
    }
    let left = area.x.saturating_add(node.x.saturating_mul(cell_width));
    let right = if node.x.saturating_add(node.w) >= columns {
        area.x + area.width
    } else {
        area.x
            .saturating_add(node.x.saturating_add(node.w).saturating_mul(cell_width))
            .min(area.x + area.width)
    };
    let start = top.max(scroll) - scroll;
    let end = (bottom - scroll).min(area.height);
    let rect = Rect::new(left, area.y + start, right.saturating_sub(left), end - start);
    (rect.width > 0 && rect.height > 0).then_some(rect)
}

fn scroll_to_show(node: &LayoutNode, row_height: u16, height: u16, current: u16) -> u16 {
    let top = node.y.saturating_mul(row_height);
    let bottom = node.y.saturating_add(node.h).saturating_mul(row_height);
    if top < current {
        top
    } else if bottom > current.saturating_add(height) {
        bottom.saturating_sub(height).min(top)
    } else {
        current
    }
}

fn search_item(result: &SearchResult) -> ListItem<'static> {
    let line = match result {
        SearchResult::Bookmark {
            name,
            url,
            category_name,
            ..
        } => Line::from(vec![
            Span::styled("★ ", Style::default().fg(Color::LightYellow)),
            Span::raw(name.clone()),
            Span::styled(
                format!("  {} • {}", category_name, truncate_text(url, 40)),
                Style::default().fg(Color::DarkGray),
            ),
        ]),
        SearchResult::Widget {
            name, description, ..
        } => Line::from(vec![
            Span::styled("+ ", Style::default().fg(Color::LightGreen)),
            Span::raw(name.to_string()),
            Span::styled(
                format!("  widget • {}", description),
                Style::default().fg(Color::DarkGray),
            ),
        ]),
    };
    ListItem::new(line)
}

fn truncate_text(text: &str, max: usize) -> String {
    if max == 0 {
        return String::new();
    }
    if text.chars().count() <= max {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max.saturating_sub(3)).collect();
    out.push_str("...");
    out
}

fn field_lines(label: &str, field: &FieldValue, active: bool) -> Vec<Line<'static>> {
    let label_style = Style::default()
        .fg(Color::Gray)
        .add_modifier(Modifier::BOLD | Modifier::DIM);
    let value_style = Style::default().fg(if active { Color::Cyan } else { Color::White });
    let prefix = format!("{}: ", label);
    let spacer = " ".repeat(prefix.chars().count());
    let text = if active {
        field.with_caret()
    } else {
        field.as_str().to_string()
    };
    let segments: Vec<&str> = if text.is_empty() {
        vec![""]
    } else {
        text.split('\n').collect()
    };
    segments
        .iter()
        .enumerate()
        .map(|(idx, line)| {
            let mut spans = Vec::new();
            spans.push(Span::styled(
                if idx == 0 {
                    prefix.clone()
                } else {
                    spacer.clone()
                },
                label_style,
            ));
            spans.push(Span::styled((*line).to_string(), value_style));
            Line::from(spans)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::tests::context;
    use ratatui::backend::TestBackend;

    fn app() -> App {
        App::new(context())
    }

    fn press(app: &mut App, code: KeyCode) -> bool {
        app.handle_key(KeyEvent::from(code)).unwrap()
    }

    fn ctrl(app: &mut App, c: char) {
        app.handle_key(KeyEvent::new(KeyCode::Char(c), KeyModifiers::CONTROL))
            .unwrap();
    }

    fn node(x: u16, y: u16, w: u16, h: u16) -> LayoutNode {
        LayoutNode {
            id: "n".into(),
            x,
            y,
            w,
            h,
        }
    }

    #[test]
    fn tab_cycles_focus_in_reading_order() {
        let mut app = app();
        assert_eq!(app.focused_id().as_deref(), Some("bookmarks"));
        press(&mut app, KeyCode::Tab);
        assert_eq!(app.focused_id().as_deref(), Some("tasks"));
        press(&mut app, KeyCode::BackTab);
        press(&mut app, KeyCode::BackTab);
        assert_eq!(app.focused_id().as_deref(), Some("tools-px"));
    }

    #[test]
    fn q_quits_only_from_normal_mode() {
        let mut app = app();
        ctrl(&mut app, 'k');
        assert!(!press(&mut app, KeyCode::Char('q')));
        assert!(matches!(&app.mode, Mode::Search { query, .. } if query.as_str() == "q"));
        press(&mut app, KeyCode::Esc);
        assert!(press(&mut app, KeyCode::Char('q')));
    }

    #[test]
    fn widget_form_submits_through_the_shell() {
        let mut app = app();
        press(&mut app, KeyCode::Tab);
        press(&mut app, KeyCode::Char('a'));
        assert!(matches!(app.mode, Mode::Form(_)));
        for c in "ship it".chars() {
            press(&mut app, KeyCode::Char(c));
        }
        press(&mut app, KeyCode::Enter);
        assert!(matches!(app.mode, Mode::Normal));
        assert_eq!(app.ctx.data.tasks.len(), 1);
        assert_eq!(app.ctx.data.tasks[0].title, "ship it");
    }

    #[test]
    fn rejected_form_stays_open() {
        let mut app = app();
        press(&mut app, KeyCode::Char(','));
        for _ in 0.."#6366f1".len() {
            press(&mut app, KeyCode::Backspace);
        }
        for c in "blue".chars() {
            press(&mut app, KeyCode::Char(c));
        }
        ctrl(&mut app, 's');
        assert!(matches!(app.mode, Mode::Form(_)));
        assert!(app.status.starts_with("Could not save"));
        press(&mut app, KeyCode::Esc);
        assert!(matches!(app.mode, Mode::Normal));
    }

    #[test]
    fn edit_mode_moves_the_focused_card() {
        let mut app = app();
        press(&mut app, KeyCode::Char('e'));
        assert!(app.ctx.grid.is_edit_mode());
        press(&mut app, KeyCode::Tab);
        press(&mut app, KeyCode::Tab);
        assert_eq!(app.focused_id().as_deref(), Some("notes"));
        press(&mut app, KeyCode::Char('L'));
        assert_eq!(app.ctx.grid.node("notes").map(|n| n.w), Some(5));
        press(&mut app, KeyCode::Char('x'));
        assert!(!app.ctx.grid.contains("notes"));
        assert!(app.focused_id().is_some());
    }

    #[test]
    fn manager_toggles_widgets() {
        let mut app = app();
        press(&mut app, KeyCode::Char('m'));
        for _ in 0..6 {
            press(&mut app, KeyCode::Down);
        }
        press(&mut app, KeyCode::Enter);
        assert!(app.ctx.grid.contains("calculator"));
        assert_eq!(app.focused_id().as_deref(), Some("calculator"));
        press(&mut app, KeyCode::Enter);
        assert!(!app.ctx.grid.contains("calculator"));
    }

    #[test]
    fn search_opens_a_bookmark() {
        let mut app = app();
        ctrl(&mut app, 'k');
        for c in "figma".chars() {
            press(&mut app, KeyCode::Char(c));
        }
        press(&mut app, KeyCode::Enter);
        assert!(matches!(app.mode, Mode::Normal));
        assert_eq!(app.ctx.ledger().load().bookmarks["https://figma.com"].clicks, 1);
    }

    #[test]
    fn reset_from_settings_asks_first() {
        let mut app = app();
        app.ctx.data.add_task("keep?", crate::model::Priority::Normal).unwrap();
        app.ctx.save_data().unwrap();
        press(&mut app, KeyCode::Char(','));
        ctrl(&mut app, 'r');
        assert!(matches!(app.mode, Mode::Confirm(ConfirmAction::ResetApp)));
        press(&mut app, KeyCode::Char('y'));
        assert!(app.ctx.data.tasks.is_empty());
        assert_eq!(app.focused_id().as_deref(), Some("bookmarks"));
    }

    #[test]
    fn cards_fill_the_row_and_clip_to_the_viewport() {
        let area = Rect::new(0, 3, 100, 20);
        let rect = card_rect(&node(0, 0, 8, 4), area, 8, 3, 0, 12).unwrap();
        assert_eq!(rect, Rect::new(0, 3, 64, 12));
        let last = card_rect(&node(8, 0, 4, 4), area, 8, 3, 0, 12).unwrap();
        assert_eq!((last.x, last.width), (64, 36));
        let clipped = card_rect(&node(0, 4, 4, 4), area, 8, 3, 0, 12).unwrap();
        assert_eq!((clipped.y, clipped.height), (15, 8));
        assert!(card_rect(&node(0, 0, 4, 2), area, 8, 3, 6, 12).is_none());
    }

    #[test]
    fn scrolling_follows_focus() {
        assert_eq!(scroll_to_show(&node(0, 8, 4, 4), 3, 20, 0), 16);
        assert_eq!(scroll_to_show(&node(0, 1, 4, 4), 3, 20, 16), 3);
        assert_eq!(scroll_to_show(&node(0, 0, 4, 2), 3, 20, 0), 0);
    }

    #[test]
    fn far_rows_do_not_overflow() {
        let area = Rect::new(0, 3, 100, 20);
        let far = node(0, 65534, 4, 65535);
        assert!(card_rect(&far, area, 8, 3, 0, 12).is_none());
        assert_eq!(scroll_to_show(&far, 3, 20, 0), u16::MAX - 20);
    }

    #[test]
    fn greeting_follows_the_clock() {
        assert_eq!(greeting(6), "Good morning");
        assert_eq!(greeting(12), "Good afternoon");
        assert_eq!(greeting(23), "Good evening");
        assert_eq!(greeting(3), "Good evening");
    }

    #[test]
    fn dashboard_draws_every_card() {
        let mut app = app();
        let mut terminal = Terminal::new(TestBackend::new(120, 40)).unwrap();
        terminal.draw(|f| app.draw(f)).unwrap();
        let buffer = terminal.backend().buffer().clone();
        let text: String = buffer.content().iter().map(|c| c.symbol()).collect();
        for name in ["Bookmarks", "Tasks", "Notes", "PX"] {
            assert!(text.contains(name), "missing {name}");
        }
        assert!(text.contains("GitHub"));
    }
}
