use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::{Color, Modifier, Style};
use ratatui::text::{Line, Span};

use super::{is_plain, muted, persist, row_style, KeyOutcome, WidgetDescriptor};
use crate::app::{AppContext, AppError};
use crate::form::{Form, FormKind};
use crate::model::WidgetSize;

const PREVIEW_CHARS: usize = 40;

pub struct SnippetsWidget;

pub static SNIPPETS: SnippetsWidget = SnippetsWidget;

impl WidgetDescriptor for SnippetsWidget {
    fn id(&self) -> &'static str {
        "snippets"
    }

    fn name(&self) -> &'static str {
        "Snippets"
    }

    fn icon(&self) -> &'static str {
        "{}"
    }

    fn description(&self) -> &'static str {
        "Reusable bits of code"
    }

    fn default_size(&self) -> WidgetSize {
        WidgetSize::new(4, 4)
    }

    fn render(&self, ctx: &AppContext, focused: bool) -> Vec<Line<'static>> {
        if ctx.data.snippets.is_empty() {
            return vec![muted("No snippets"), muted("press a to add one")];
        }
        let mut lines = Vec::new();
        for (idx, snippet) in ctx.data.snippets.iter().enumerate() {
            let (marker, style) = row_style(idx == ctx.state.snippets.selected, focused);
            lines.push(Line::from(vec![
                Span::raw(marker),
                Span::styled(snippet.title.clone(), style.add_modifier(Modifier::BOLD)),
            ]));
            let first_line = snippet.code.lines().next().unwrap_or("");
            let mut preview: String = first_line.chars().take(PREVIEW_CHARS).collect();
            if first_line.chars().count() > PREVIEW_CHARS || snippet.code.lines().count() > 1 {
                preview.push('…');
            }
            lines.push(Line::from(Span::styled(
                format!("    {preview}"),
                Style::default().fg(Color::DarkGray),
            )));
        }
        lines
    }

    fn handle_key(&self, ctx: &mut AppContext, key: KeyEvent) -> KeyOutcome {
        let len = ctx.data.snippets.len();
        if ctx.state.snippets.handle_move(&key, len) {
            return KeyOutcome::Handled;
        }
        if !is_plain(&key) {
            return KeyOutcome::Ignored;
        }
        let selected = ctx.state.snippets.clamp(len);
        match key.code {
            KeyCode::Char('a') => KeyOutcome::OpenForm(
                Form::new(Some(self.id()), FormKind::AddSnippet, "New snippet")
                    .field("Title", "")
                    .multiline("Code", ""),
            ),
            KeyCode::Char('y') | KeyCode::Enter if len > 0 => {
                let title = ctx.data.snippets[selected].title.clone();
                ctx.track(self.id(), "copied");
                ctx.toast(format!("Copied \"{title}\""));
                KeyOutcome::Handled
            }
            KeyCode::Char('d') if len > 0 => {
                match ctx.data.delete_snippet(selected) {
                    Ok(removed) => {
                        ctx.state.snippets.clamp(len - 1);
                        persist(ctx, format!("Deleted \"{}\"", removed.title));
                    }
                    Err(err) => ctx.toast(err.to_string()),
                }
                KeyOutcome::Handled
            }
            _ => KeyOutcome::Ignored,
        }
    }

    fn submit(&self, ctx: &mut AppContext, kind: &FormKind, values: &[String]) -> Result<(), AppError> {
        if *kind != FormKind::AddSnippet {
            return Err(AppError::UnsupportedForm(format!("{kind:?}")));
        }
        let value = |idx: usize| values.get(idx).map(String::as_str).unwrap_or("");
        ctx.data.add_snippet(value(0), value(1))?;
        ctx.track(self.id(), "created");
        persist(ctx, "Snippet saved".to_string());
        Ok(())
    }

    fn hints(&self) -> &'static str {
        "a add • y copy • d delete"
    }
}
