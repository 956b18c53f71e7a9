use chrono::{Duration, Utc};
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::{Color, Modifier, Style};
use ratatui::text::{Line, Span};

use super::{heading, muted, KeyOutcome, WidgetDescriptor};
use crate::app::{AppContext, AppError, ConfirmAction};
use crate::form::{Form, FormKind};
use crate::model::WidgetSize;
use crate::stats::{self, percent_change, DayActivity, GoalProgress};

const BARS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];
const GAUGE_WIDTH: usize = 12;
const POMODORO_GOAL_RANGE: (u64, u64) = (1, 20);
const TASKS_GOAL_RANGE: (u64, u64) = (1, 50);

/// Display names for the ledger's widget counters.
fn counter_label(key: &str) -> &str {
    match key {
        "bookmarks" => "Bookmarks",
        "tasks" => "Tasks",
        "pomodoro" => "Pomodoro",
        "notes" => "Notes",
        "rss" => "RSS",
        "calculator" => "Calculator",
        "snippets" => "Snippets",
        "toolsPx" => "PX↔REM",
        "toolsPass" => "Passwords",
        "gitCheatsheet" => "Git",
        "emojiPicker" => "Emojis",
        other => other,
    }
}

pub fn sparkline(days: &[DayActivity]) -> String {
    let max = days.iter().map(|d| d.total).max().unwrap_or(0).max(1);
    days.iter()
        .map(|d| {
            let height = (d.total as f64 / max as f64 * BARS.len() as f64).round() as usize;
            BARS[height.saturating_sub(1).min(BARS.len() - 1)]
        })
        .collect()
}

fn gauge(progress: &GoalProgress, color: Color) -> Vec<Span<'static>> {
    let filled = (progress.percentage / 100.0 * GAUGE_WIDTH as f64).round() as usize;
    let filled = filled.min(GAUGE_WIDTH);
    vec![
        Span::styled("█".repeat(filled), Style::default().fg(color)),
        Span::styled("░".repeat(GAUGE_WIDTH - filled), Style::default().fg(Color::DarkGray)),
        Span::raw(format!(
            " {}/{} {:.0}%",
            progress.current, progress.goal, progress.percentage
        )),
    ]
}

fn change_span(before: u64, after: u64) -> Span<'static> {
    let change = percent_change(before, after);
    let (arrow, color) = if change >= 0 {
        ("↑", Color::LightGreen)
    } else {
        ("↓", Color::LightRed)
    };
    Span::styled(
        format!(" {arrow}{}%", change.abs()),
        Style::default().fg(color),
    )
}

fn parse_goal(raw: &str, (min, max): (u64, u64), what: &str) -> Result<u64, AppError> {
    raw.trim()
        .parse::<u64>()
        .map(|n| n.clamp(min, max))
        .map_err(|_| AppError::Invalid(format!("{what} goal must be a number")))
}

pub struct StatisticsWidget;

pub static STATISTICS: StatisticsWidget = StatisticsWidget;

impl WidgetDescriptor for StatisticsWidget {
    fn id(&self) -> &'static str {
        "statistics"
    }

    fn name(&self) -> &'static str {
        "Statistics"
    }

    fn icon(&self) -> &'static str {
        "▤"
    }

    fn description(&self) -> &'static str {
        "Usage, goals and weekly activity"
    }

    fn default_size(&self) -> WidgetSize {
        WidgetSize::new(4, 4)
    }

    fn render(&self, ctx: &AppContext, _focused: bool) -> Vec<Line<'static>> {
        let doc = stats::read(ctx.store.as_ref());
        let today = Utc::now().date_naive();
        let now = doc.today_stats_on(today);
        let before = doc.today_stats_on(today - Duration::days(1));
        let goals = doc.goals_progress_on(today);
        let week = doc.last_7_days_on(today);
        let accent = ctx.accent_color();
        let bold = Style::default().add_modifier(Modifier::BOLD);

        let mut lines = vec![
            heading("TODAY"),
            Line::from(vec![
                Span::raw("Pomodoro "),
                Span::styled(now.pomodoro.to_string(), bold),
                change_span(before.pomodoro, now.pomodoro),
                Span::raw("  Tasks "),
                Span::styled(now.tasks.to_string(), bold),
                change_span(before.tasks, now.tasks),
                Span::raw("  Clicks "),
                Span::styled(now.bookmarks.to_string(), bold),
                change_span(before.bookmarks, now.bookmarks),
            ]),
            heading("GOALS"),
        ];
        let mut pomodoro = vec![Span::raw("Pomodoro ")];
        pomodoro.extend(gauge(&goals.pomodoro, accent));
        lines.push(Line::from(pomodoro));
        let mut tasks = vec![Span::raw("Tasks    ")];
        tasks.extend(gauge(&goals.tasks, Color::LightGreen));
        lines.push(Line::from(tasks));

        lines.push(heading("LAST 7 DAYS"));
        lines.push(Line::from(Span::styled(sparkline(&week), Style::default().fg(accent))));
        let labels: Vec<String> = week
            .iter()
            .map(|d| d.day.chars().next().unwrap_or(' ').to_string())
            .collect();
        lines.push(muted(labels.concat()));
        let total: u64 = week.iter().map(|d| d.total).sum();
        lines.push(muted(format!(
            "{total} actions • {} visits",
            doc.sessions.total
        )));

        let most_used: Vec<String> = doc
            .widget_totals()
            .into_iter()
            .filter(|(_, total)| *total > 0)
            .take(3)
            .map(|(name, total)| format!("{} {total}", counter_label(&name)))
            .collect();
        if !most_used.is_empty() {
            lines.push(heading("MOST USED"));
            lines.push(Line::from(most_used.join(" • ")));
        }

        let top = doc.top_bookmarks(3);
        if !top.is_empty() {
            lines.push(heading("TOP SITES"));
            for (rank, bookmark) in top.iter().enumerate() {
                lines.push(Line::from(vec![
                    Span::styled(format!("{}. ", rank + 1), Style::default().fg(Color::DarkGray)),
                    Span::raw(bookmark.name.clone()),
                    Span::styled(
                        format!("  {} clicks", bookmark.clicks),
                        Style::default().fg(Color::DarkGray),
                    ),
                ]));
            }
        }
        lines
    }

    fn handle_key(&self, ctx: &mut AppContext, key: KeyEvent) -> KeyOutcome {
        match key.code {
            KeyCode::Char('g') => {
                let goals = ctx.ledger().load().goals;
                KeyOutcome::OpenForm(
                    Form::new(Some(self.id()), FormKind::Goals, "Daily goals")
                        .field("Pomodoro sessions (1-20)", &goals.pomodoro.to_string())
                        .field("Tasks (1-50)", &goals.tasks.to_string()),
                )
            }
            KeyCode::Char('X') => KeyOutcome::Confirm(ConfirmAction::ResetStats),
            _ => KeyOutcome::Ignored,
        }
    }

    fn submit(&self, ctx: &mut AppContext, kind: &FormKind, values: &[String]) -> Result<(), AppError> {
        if *kind != FormKind::Goals {
            return Err(AppError::UnsupportedForm(format!("{kind:?}")));
        }
        let value = |idx: usize| values.get(idx).map(String::as_str).unwrap_or("");
        let pomodoro = parse_goal(value(0), POMODORO_GOAL_RANGE, "pomodoro")?;
        let tasks = parse_goal(value(1), TASKS_GOAL_RANGE, "task")?;
        ctx.ledger().set_goals(Some(pomodoro), Some(tasks))?;
        ctx.toast("Goals saved");
        Ok(())
    }

    fn hints(&self) -> &'static str {
        "g goals • X reset stats"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::tests::context;
    use chrono::NaiveDate;

    fn day(total: u64) -> DayActivity {
        DayActivity {
            date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            day: "Mon".into(),
            total,
        }
    }

    #[test]
    fn sparkline_scales_to_the_busiest_day() {
        let days = [day(0), day(1), day(4), day(8)];
        assert_eq!(sparkline(&days), "▁▁▄█");
        assert_eq!(sparkline(&[day(0), day(0)]), "▁▁");
    }

    #[test]
    fn goals_are_clamped() {
        let mut ctx = context();
        STATISTICS
            .submit(&mut ctx, &FormKind::Goals, &["99".to_string(), "0".to_string()])
            .unwrap();
        let goals = ctx.ledger().load().goals;
        assert_eq!((goals.pomodoro, goals.tasks), (20, 1));
        assert!(STATISTICS
            .submit(&mut ctx, &FormKind::Goals, &["lots".to_string(), "3".to_string()])
            .is_err());
    }

    #[test]
    fn reset_asks_first() {
        let mut ctx = context();
        let outcome = STATISTICS.handle_key(&mut ctx, KeyEvent::from(KeyCode::Char('X')));
        assert!(matches!(outcome, KeyOutcome::Confirm(ConfirmAction::ResetStats)));
        ctx.confirm(ConfirmAction::ResetStats).unwrap();
        assert_eq!(ctx.ledger().load().sessions.total, 0);
    }

    #[test]
    fn render_lists_top_sites() {
        let mut ctx = context();
        ctx.open_bookmark(0, 0).unwrap();
        let lines = STATISTICS.render(&ctx, false);
        let text: Vec<String> = lines
            .iter()
            .map(|l| l.spans.iter().map(|s| s.content.as_ref()).collect())
            .collect();
        assert!(text.iter().any(|l| l == "TOP SITES"));
        assert!(text.iter().any(|l| l.contains("GitHub") && l.contains("1 clicks")));
        assert!(text.iter().any(|l| l.contains("Bookmarks 1")));
    }
}
