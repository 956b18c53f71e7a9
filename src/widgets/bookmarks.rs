use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::{Color, Style};
use ratatui::text::{Line, Span};
use tracing::warn;

use super::{heading, is_plain, muted, persist, row_style, KeyOutcome, WidgetDescriptor};
use crate::app::{AppContext, AppError};
use crate::form::{Form, FormKind};
use crate::model::{WidgetSize, DEFAULT_ACCENT};
use crate::validate::parse_hex_color;

pub struct BookmarksWidget;

pub static BOOKMARKS: BookmarksWidget = BookmarksWidget;

impl WidgetDescriptor for BookmarksWidget {
    fn id(&self) -> &'static str {
        "bookmarks"
    }

    fn name(&self) -> &'static str {
        "Bookmarks"
    }

    fn icon(&self) -> &'static str {
        "★"
    }

    fn description(&self) -> &'static str {
        "Favourite links grouped by category"
    }

    fn default_size(&self) -> WidgetSize {
        WidgetSize::new(8, 4)
    }

    fn render(&self, ctx: &AppContext, focused: bool) -> Vec<Line<'static>> {
        if ctx.data.bookmarks.is_empty() {
            return vec![muted("No bookmarks yet"), muted("press a to add one")];
        }
        let selected = ctx.state.bookmarks.selected;
        let mut lines = Vec::new();
        let mut row = 0;
        for category in &ctx.data.bookmarks {
            lines.push(heading(category.category.to_uppercase()));
            for app in &category.apps {
                let (marker, style) = row_style(row == selected, focused);
                let (r, g, b) = parse_hex_color(&app.color)
                    .or_else(|| parse_hex_color(DEFAULT_ACCENT))
                    .unwrap_or((99, 102, 241));
                lines.push(Line::from(vec![
                    Span::raw(marker),
                    Span::styled("■ ", Style::default().fg(Color::Rgb(r, g, b))),
                    Span::styled(app.name.clone(), style),
                    Span::styled(format!("  {}", app.url), Style::default().fg(Color::DarkGray)),
                ]));
                row += 1;
            }
        }
        lines
    }

    fn handle_key(&self, ctx: &mut AppContext, key: KeyEvent) -> KeyOutcome {
        let entries: Vec<(usize, usize)> = ctx
            .data
            .bookmark_entries()
            .into_iter()
            .map(|(c, a, _, _)| (c, a))
            .collect();
        if ctx.state.bookmarks.handle_move(&key, entries.len()) {
            return KeyOutcome::Handled;
        }
        if !is_plain(&key) {
            return KeyOutcome::Ignored;
        }
        let current = entries.get(ctx.state.bookmarks.clamp(entries.len())).copied();
        match (key.code, current) {
            (KeyCode::Char('a'), _) => {
                let category = current
                    .and_then(|(c, _)| ctx.data.bookmarks.get(c))
                    .map(|c| c.category.clone())
                    .unwrap_or_default();
                KeyOutcome::OpenForm(
                    Form::new(Some(self.id()), FormKind::AddBookmark, "Add bookmark")
                        .field("Name", "")
                        .field("URL", "https://")
                        .field("Category", &category)
                        .with_hint("A new category is created when the name is unknown"),
                )
            }
            (KeyCode::Enter | KeyCode::Char('o'), Some((c, a))) => {
                if let Err(err) = ctx.open_bookmark(c, a) {
                    warn!(%err, "opening bookmark failed");
                    ctx.toast(err.to_string());
                }
                KeyOutcome::Handled
            }
            (KeyCode::Char('u'), Some((c, a))) => {
                let app = &ctx.data.bookmarks[c].apps[a];
                KeyOutcome::OpenForm(
                    Form::new(
                        Some(self.id()),
                        FormKind::EditBookmark { category: c, app: a },
                        "Edit bookmark",
                    )
                    .field("Name", &app.name)
                    .field("URL", &app.url)
                    .field("Icon", &app.icon)
                    .field("Color", &app.color),
                )
            }
            (KeyCode::Char('d'), Some((c, a))) => {
                match ctx.data.delete_bookmark(c, a) {
                    Ok(removed) => {
                        ctx.state.bookmarks.clamp(entries.len() - 1);
                        persist(ctx, format!("Removed {}", removed.name));
                    }
                    Err(err) => ctx.toast(err.to_string()),
                }
                KeyOutcome::Handled
            }
            _ => KeyOutcome::Ignored,
        }
    }

    fn submit(&self, ctx: &mut AppContext, kind: &FormKind, values: &[String]) -> Result<(), AppError> {
        let value = |idx: usize| values.get(idx).map(String::as_str).unwrap_or("");
        match *kind {
            FormKind::AddBookmark => {
                ctx.data.add_bookmark(value(2), value(0), value(1))?;
                persist(ctx, "Bookmark added".to_string());
                Ok(())
            }
            FormKind::EditBookmark { category, app } => {
                ctx.data
                    .update_bookmark(category, app, value(0), value(1), value(2), value(3))?;
                persist(ctx, "Bookmark updated".to_string());
                Ok(())
            }
            ref other => Err(AppError::UnsupportedForm(format!("{other:?}"))),
        }
    }

    fn hints(&self) -> &'static str {
        "j/k select • Enter open • a add • u edit • d delete"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::tests::context;
    use crate::storage;

    #[test]
    fn add_form_creates_category_without_counting_a_click() {
        let mut ctx = context();
        let values = ["Rust".to_string(), "https://rust-lang.org".to_string(), "Docs".to_string()];
        BOOKMARKS.submit(&mut ctx, &FormKind::AddBookmark, &values).unwrap();
        let stored = storage::load(ctx.store.as_mut());
        assert_eq!(stored.bookmarks.len(), 3);
        assert_eq!(stored.bookmarks[2].category, "Docs");
        let today = chrono::Utc::now().date_naive();
        assert_eq!(ctx.ledger().today_stats_on(today).bookmarks, 0);

        let bad = ["Bad".to_string(), "ftp://x".to_string(), "Docs".to_string()];
        assert!(BOOKMARKS.submit(&mut ctx, &FormKind::AddBookmark, &bad).is_err());
    }

    #[test]
    fn edit_sanitizes_colour() {
        let mut ctx = context();
        let values = [
            "Hub".to_string(),
            "https://github.com".to_string(),
            "git".to_string(),
            "red;".to_string(),
        ];
        BOOKMARKS
            .submit(&mut ctx, &FormKind::EditBookmark { category: 0, app: 0 }, &values)
            .unwrap();
        let app = &ctx.data.bookmarks[0].apps[0];
        assert_eq!(app.name, "Hub");
        assert_eq!(app.color, DEFAULT_ACCENT);
    }

    #[test]
    fn delete_drops_empty_category() {
        let mut ctx = context();
        ctx.state.bookmarks.selected = 2;
        let outcome = BOOKMARKS.handle_key(&mut ctx, KeyEvent::from(KeyCode::Char('d')));
        assert!(matches!(outcome, KeyOutcome::Handled));
        assert_eq!(ctx.data.bookmarks.len(), 1);
        assert_eq!(ctx.state.bookmarks.selected, 1);
    }

    #[test]
    fn enter_opens_and_edit_prefills() {
        let mut ctx = context();
        BOOKMARKS.handle_key(&mut ctx, KeyEvent::from(KeyCode::Down));
        BOOKMARKS.handle_key(&mut ctx, KeyEvent::from(KeyCode::Enter));
        assert_eq!(ctx.ledger().load().bookmarks["https://chat.openai.com"].clicks, 1);

        match BOOKMARKS.handle_key(&mut ctx, KeyEvent::from(KeyCode::Char('u'))) {
            KeyOutcome::OpenForm(form) => {
                assert_eq!(form.values()[0], "ChatGPT");
                assert_eq!(form.kind, FormKind::EditBookmark { category: 0, app: 1 });
            }
            other => panic!("expected a form, got {other:?}"),
        }
    }
}
