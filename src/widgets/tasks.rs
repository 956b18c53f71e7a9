use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::{Color, Modifier, Style};
use ratatui::text::{Line, Span};

use super::{is_plain, muted, persist, row_style, KeyOutcome, WidgetDescriptor};
use crate::app::{AppContext, AppError};
use crate::form::{Form, FormKind};
use crate::model::{Priority, WidgetSize};

pub struct TasksWidget;

pub static TASKS: TasksWidget = TasksWidget;

fn priority_color(priority: Priority) -> Color {
    match priority {
        Priority::Urgent => Color::LightRed,
        Priority::Important => Color::LightYellow,
        Priority::Normal => Color::LightBlue,
    }
}

impl WidgetDescriptor for TasksWidget {
    fn id(&self) -> &'static str {
        "tasks"
    }

    fn name(&self) -> &'static str {
        "Tasks"
    }

    fn icon(&self) -> &'static str {
        "✔"
    }

    fn description(&self) -> &'static str {
        "Pending to-dos, urgent first"
    }

    fn default_size(&self) -> WidgetSize {
        WidgetSize::new(4, 4)
    }

    fn render(&self, ctx: &AppContext, focused: bool) -> Vec<Line<'static>> {
        let pending = ctx.data.pending_tasks();
        if pending.is_empty() {
            return vec![muted("All done!")];
        }
        pending
            .iter()
            .enumerate()
            .map(|(idx, task)| {
                let (marker, style) = row_style(idx == ctx.state.tasks.selected, focused);
                Line::from(vec![
                    Span::raw(marker),
                    Span::styled("○ ", Style::default().fg(Color::DarkGray)),
                    Span::styled(task.title.clone(), style),
                    Span::raw(" "),
                    Span::styled(
                        task.priority.label().to_uppercase(),
                        Style::default()
                            .fg(priority_color(task.priority))
                            .add_modifier(Modifier::BOLD),
                    ),
                ])
            })
            .collect()
    }

    fn handle_key(&self, ctx: &mut AppContext, key: KeyEvent) -> KeyOutcome {
        let ids: Vec<String> = ctx
            .data
            .pending_tasks()
            .into_iter()
            .map(|t| t.id.clone())
            .collect();
        if ctx.state.tasks.handle_move(&key, ids.len()) {
            return KeyOutcome::Handled;
        }
        if !is_plain(&key) {
            return KeyOutcome::Ignored;
        }
        let current = ids.get(ctx.state.tasks.clamp(ids.len())).cloned();
        match (key.code, current) {
            (KeyCode::Char('a'), _) => KeyOutcome::OpenForm(
                Form::new(Some(self.id()), FormKind::AddTask, "New task")
                    .field("Title", "")
                    .field("Priority", Priority::Normal.label())
                    .with_hint("Priority: normal, important or urgent"),
            ),
            (KeyCode::Enter | KeyCode::Char('x') | KeyCode::Char(' '), Some(id)) => {
                match ctx.data.complete_task(&id) {
                    Ok(()) => {
                        ctx.track(self.id(), "completed");
                        ctx.state.tasks.clamp(ids.len() - 1);
                        persist(ctx, "Task completed".to_string());
                    }
                    Err(err) => ctx.toast(err.to_string()),
                }
                KeyOutcome::Handled
            }
            (KeyCode::Char('d'), Some(id)) => {
                match ctx.data.delete_task(&id) {
                    Ok(()) => {
                        ctx.track(self.id(), "deleted");
                        ctx.state.tasks.clamp(ids.len() - 1);
                        persist(ctx, "Task deleted".to_string());
                    }
                    Err(err) => ctx.toast(err.to_string()),
                }
                KeyOutcome::Handled
            }
            _ => KeyOutcome::Ignored,
        }
    }

    fn submit(&self, ctx: &mut AppContext, kind: &FormKind, values: &[String]) -> Result<(), AppError> {
        if *kind != FormKind::AddTask {
            return Err(AppError::UnsupportedForm(format!("{kind:?}")));
        }
        let title = values.first().map(String::as_str).unwrap_or("");
        let raw_priority = values.get(1).map(String::as_str).unwrap_or("");
        let priority = Priority::parse(raw_priority)
            .ok_or_else(|| AppError::Invalid(format!("unknown priority: {raw_priority}")))?;
        ctx.data.add_task(title, priority)?;
        ctx.track(self.id(), "created");
        persist(ctx, "Task added".to_string());
        Ok(())
    }

    fn hints(&self) -> &'static str {
        "a add • x done • d delete"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::tests::context;
    use crate::model::TaskStatus;

    fn add(ctx: &mut AppContext, title: &str, priority: &str) -> Result<(), AppError> {
        TASKS.submit(ctx, &FormKind::AddTask, &[title.to_string(), priority.to_string()])
    }

    #[test]
    fn urgent_tasks_render_first() {
        let mut ctx = context();
        add(&mut ctx, "later", "normal").unwrap();
        add(&mut ctx, "now", "URGENT").unwrap();
        let lines = TASKS.render(&ctx, false);
        assert_eq!(lines.len(), 2);
        assert!(lines[0].spans.iter().any(|s| s.content == "now"));
        assert_eq!(ctx.ledger().load().widget_count("tasks", "created"), 2);
    }

    #[test]
    fn bad_input_is_rejected() {
        let mut ctx = context();
        assert!(add(&mut ctx, "  ", "normal").is_err());
        assert!(matches!(add(&mut ctx, "x", "someday"), Err(AppError::Invalid(_))));
        assert!(ctx.data.tasks.is_empty());
    }

    #[test]
    fn completing_hides_and_counts() {
        let mut ctx = context();
        add(&mut ctx, "write docs", "important").unwrap();
        TASKS.handle_key(&mut ctx, KeyEvent::from(KeyCode::Char('x')));
        assert_eq!(ctx.data.tasks[0].status, TaskStatus::Completed);
        assert!(ctx.data.pending_tasks().is_empty());
        assert_eq!(ctx.ledger().load().widget_count("tasks", "completed"), 1);
    }

    #[test]
    fn delete_removes_selected() {
        let mut ctx = context();
        add(&mut ctx, "one", "normal").unwrap();
        add(&mut ctx, "two", "normal").unwrap();
        TASKS.handle_key(&mut ctx, KeyEvent::from(KeyCode::Char('j')));
        TASKS.handle_key(&mut ctx, KeyEvent::from(KeyCode::Char('d')));
        assert_eq!(ctx.data.tasks.len(), 1);
        assert_eq!(ctx.data.tasks[0].title, "one");
        assert_eq!(ctx.state.tasks.selected, 0);
    }
}
