use crossterm::event::{KeyCode, KeyEvent};
use ratatui::text::Line;

use super::{is_plain, muted, persist, KeyOutcome, WidgetDescriptor};
use crate::app::{AppContext, AppError};
use crate::form::{Form, FormKind};
use crate::model::WidgetSize;
use crate::validate::MAX_NOTES_CHARS;

pub struct NotesWidget;

pub static NOTES: NotesWidget = NotesWidget;

impl WidgetDescriptor for NotesWidget {
    fn id(&self) -> &'static str {
        "notes"
    }

    fn name(&self) -> &'static str {
        "Notes"
    }

    fn icon(&self) -> &'static str {
        "✎"
    }

    fn description(&self) -> &'static str {
        "Free-form scratchpad"
    }

    fn default_size(&self) -> WidgetSize {
        WidgetSize::new(4, 4)
    }

    fn render(&self, ctx: &AppContext, _focused: bool) -> Vec<Line<'static>> {
        if ctx.data.notes.is_empty() {
            return vec![muted("// type something here (Enter to edit)")];
        }
        ctx.data
            .notes
            .lines()
            .map(|line| Line::from(line.to_string()))
            .collect()
    }

    fn handle_key(&self, ctx: &mut AppContext, key: KeyEvent) -> KeyOutcome {
        if !is_plain(&key) {
            return KeyOutcome::Ignored;
        }
        match key.code {
            KeyCode::Enter | KeyCode::Char('i') => KeyOutcome::OpenForm(
                Form::new(Some(self.id()), FormKind::EditNotes, "Notes")
                    .multiline("Text", &ctx.data.notes)
                    .with_hint("Enter inserts a line • Ctrl+S saves"),
            ),
            _ => KeyOutcome::Ignored,
        }
    }

    fn submit(&self, ctx: &mut AppContext, kind: &FormKind, values: &[String]) -> Result<(), AppError> {
        if *kind != FormKind::EditNotes {
            return Err(AppError::UnsupportedForm(format!("{kind:?}")));
        }
        let text = values.first().cloned().unwrap_or_default();
        if text.chars().count() > MAX_NOTES_CHARS {
            return Err(AppError::Invalid(format!(
                "notes are limited to {MAX_NOTES_CHARS} characters"
            )));
        }
        ctx.data.notes = text;
        ctx.track(self.id(), "edits");
        persist(ctx, "Notes saved".to_string());
        Ok(())
    }

    fn hints(&self) -> &'static str {
        "Enter edit"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::tests::context;
    use crate::storage;

    #[test]
    fn editing_saves_text() {
        let mut ctx = context();
        let form = match NOTES.handle_key(&mut ctx, KeyEvent::from(KeyCode::Enter)) {
            KeyOutcome::OpenForm(form) => form,
            other => panic!("expected a form, got {other:?}"),
        };
        assert!(form.active_is_multiline());
        NOTES
            .submit(&mut ctx, &form.kind, &["line one\nline two".to_string()])
            .unwrap();
        assert_eq!(storage::load(ctx.store.as_mut()).notes, "line one\nline two");
        assert_eq!(NOTES.render(&ctx, false).len(), 2);
        assert_eq!(ctx.last_toast(), Some("Notes saved"));
    }

    #[test]
    fn oversized_notes_are_refused() {
        let mut ctx = context();
        let huge = "x".repeat(MAX_NOTES_CHARS + 1);
        assert!(NOTES.submit(&mut ctx, &FormKind::EditNotes, &[huge]).is_err());
        assert!(ctx.data.notes.is_empty());
    }
}
