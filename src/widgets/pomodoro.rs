//! Pomodoro timer. The clock advances from [`tick`], which the shell calls
//! on every loop iteration.

use std::time::{Duration, Instant};

use chrono::{Local, NaiveDate};
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::{Alignment, Color, Modifier, Style};
use ratatui::text::{Line, Span};
use tracing::{info, warn};

use super::{is_plain, muted, KeyOutcome, WidgetDescriptor};
use crate::app::AppContext;
use crate::model::WidgetSize;
use crate::store::{KeyValueStore, POMODORO_DATE_KEY, POMODORO_SESSIONS_KEY};

const SESSIONS_PER_LONG_BREAK: u32 = 4;
const BAR_WIDTH: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Work,
    ShortBreak,
    LongBreak,
}

impl Phase {
    pub fn length(&self) -> Duration {
        match self {
            Phase::Work => Duration::from_secs(25 * 60),
            Phase::ShortBreak => Duration::from_secs(5 * 60),
            Phase::LongBreak => Duration::from_secs(15 * 60),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Phase::Work => "Focus",
            Phase::ShortBreak => "Short break",
            Phase::LongBreak => "Long break",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Timer {
    pub phase: Phase,
    pub remaining: Duration,
    pub running: bool,
    last_tick: Option<Instant>,
    /// Work sessions finished today.
    pub sessions: u32,
}

impl Default for Timer {
    fn default() -> Self {
        Timer {
            phase: Phase::Work,
            remaining: Phase::Work.length(),
            running: false,
            last_tick: None,
            sessions: 0,
        }
    }
}

impl Timer {
    pub fn start(&mut self, now: Instant) {
        if !self.running {
            self.running = true;
            self.last_tick = Some(now);
        }
    }

    pub fn pause(&mut self) {
        self.running = false;
        self.last_tick = None;
    }

    pub fn reset(&mut self) {
        self.pause();
        self.remaining = self.phase.length();
    }

    pub fn set_phase(&mut self, phase: Phase) {
        self.phase = phase;
        self.reset();
    }

    /// Advances the clock. Returns the phase that just ran out, if any.
    pub fn advance(&mut self, now: Instant) -> Option<Phase> {
        if !self.running {
            return None;
        }
        let last = self.last_tick.unwrap_or(now);
        self.remaining = self
            .remaining
            .saturating_sub(now.saturating_duration_since(last));
        self.last_tick = Some(now);
        if !self.remaining.is_zero() {
            return None;
        }
        let finished = self.phase;
        self.pause();
        if finished == Phase::Work {
            self.sessions += 1;
            let next = if self.sessions % SESSIONS_PER_LONG_BREAK == 0 {
                Phase::LongBreak
            } else {
                Phase::ShortBreak
            };
            self.set_phase(next);
        } else {
            self.set_phase(Phase::Work);
        }
        Some(finished)
    }

    /// Share of the current phase already elapsed, in `0.0..=1.0`.
    pub fn progress(&self) -> f64 {
        let total = self.phase.length().as_secs_f64();
        1.0 - self.remaining.as_secs_f64() / total
    }

    pub fn clock(&self) -> String {
        let secs = self.remaining.as_secs() + u64::from(self.remaining.subsec_nanos() > 0);
        format!("{:02}:{:02}", secs / 60, secs % 60)
    }
}

/// Today's finished sessions; a stored date other than `today` means zero.
pub fn load_sessions(store: &dyn KeyValueStore, today: NaiveDate) -> u32 {
    let stored_date = store.get(POMODORO_DATE_KEY).ok().flatten();
    if stored_date.as_deref() != Some(today.to_string().as_str()) {
        return 0;
    }
    store
        .get(POMODORO_SESSIONS_KEY)
        .ok()
        .flatten()
        .and_then(|raw| raw.trim().parse().ok())
        .unwrap_or(0)
}

fn save_sessions(store: &mut dyn KeyValueStore, today: NaiveDate, sessions: u32) {
    let result = store
        .set(POMODORO_DATE_KEY, &today.to_string())
        .and_then(|()| store.set(POMODORO_SESSIONS_KEY, &sessions.to_string()));
    if let Err(err) = result {
        warn!(%err, "could not store pomodoro sessions");
    }
}

/// Counts a finished work session against `today`. The stored count is
/// re-read so a dashboard left open past midnight starts the new day at one.
fn record_session(ctx: &mut AppContext, today: NaiveDate) -> u32 {
    let sessions = load_sessions(ctx.store.as_ref(), today).saturating_add(1);
    ctx.state.pomodoro.sessions = sessions;
    save_sessions(ctx.store.as_mut(), today, sessions);
    sessions
}

/// Drives the timer and handles a finished phase.
pub fn tick(ctx: &mut AppContext, now: Instant) {
    let Some(finished) = ctx.state.pomodoro.advance(now) else {
        return;
    };
    if finished == Phase::Work {
        let sessions = record_session(ctx, Local::now().date_naive());
        if let Err(err) = ctx.ledger().track_pomodoro_session(finished.length().as_secs()) {
            warn!(%err, "could not record pomodoro session");
        }
        info!(sessions, "pomodoro session finished");
        ctx.toast_for("Session finished!", Duration::from_secs(5));
    } else {
        ctx.toast_for("Break is over!", Duration::from_secs(5));
    }
}

pub struct PomodoroWidget;

pub static POMODORO: PomodoroWidget = PomodoroWidget;

impl WidgetDescriptor for PomodoroWidget {
    fn id(&self) -> &'static str {
        "pomodoro"
    }

    fn name(&self) -> &'static str {
        "Pomodoro"
    }

    fn icon(&self) -> &'static str {
        "◷"
    }

    fn description(&self) -> &'static str {
        "Focus timer with short and long breaks"
    }

    fn default_size(&self) -> WidgetSize {
        WidgetSize::new(3, 4)
    }

    fn init(&self, ctx: &mut AppContext) {
        let today = Local::now().date_naive();
        let sessions = load_sessions(ctx.store.as_ref(), today);
        if sessions == 0 {
            save_sessions(ctx.store.as_mut(), today, 0);
        }
        ctx.state.pomodoro.sessions = sessions;
    }

    fn render(&self, ctx: &AppContext, _focused: bool) -> Vec<Line<'static>> {
        let timer = &ctx.state.pomodoro;
        let filled = (timer.progress() * BAR_WIDTH as f64).round() as usize;
        let bar = format!(
            "{}{}",
            "█".repeat(filled.min(BAR_WIDTH)),
            "░".repeat(BAR_WIDTH - filled.min(BAR_WIDTH))
        );
        let state = if timer.running { "running" } else { "paused" };
        vec![
            Line::from(Span::styled(
                timer.clock(),
                Style::default()
                    .fg(Color::White)
                    .add_modifier(Modifier::BOLD),
            ))
            .alignment(Alignment::Center),
            Line::from(format!("{} • {state}", timer.phase.label())).alignment(Alignment::Center),
            Line::from(Span::styled(bar, Style::default().fg(ctx.accent_color())))
                .alignment(Alignment::Center),
            muted(format!("Sessions today: {}", timer.sessions)),
        ]
    }

    fn handle_key(&self, ctx: &mut AppContext, key: KeyEvent) -> KeyOutcome {
        if !is_plain(&key) {
            return KeyOutcome::Ignored;
        }
        let timer = &mut ctx.state.pomodoro;
        match key.code {
            KeyCode::Char(' ') | KeyCode::Char('s') | KeyCode::Enter => {
                if timer.running {
                    timer.pause();
                } else {
                    timer.start(Instant::now());
                }
            }
            KeyCode::Char('r') => timer.reset(),
            KeyCode::Char('w') => timer.set_phase(Phase::Work),
            KeyCode::Char('b') => timer.set_phase(Phase::ShortBreak),
            KeyCode::Char('l') => timer.set_phase(Phase::LongBreak),
            _ => return KeyOutcome::Ignored,
        }
        KeyOutcome::Handled
    }

    fn hints(&self) -> &'static str {
        "space start/pause • r reset • w/b/l 25/5/15 min"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::tests::context;
    use crate::store::MemoryStore;

    #[test]
    fn work_phase_rolls_into_breaks() {
        let mut timer = Timer::default();
        let start = Instant::now();
        timer.start(start);
        assert_eq!(timer.advance(start + Duration::from_secs(60)), None);
        assert_eq!(timer.clock(), "24:00");

        let done = timer.advance(start + Duration::from_secs(25 * 60));
        assert_eq!(done, Some(Phase::Work));
        assert_eq!(timer.phase, Phase::ShortBreak);
        assert_eq!(timer.sessions, 1);
        assert!(!timer.running);
        assert_eq!(timer.clock(), "05:00");
    }

    #[test]
    fn every_fourth_session_earns_a_long_break() {
        let mut timer = Timer {
            sessions: 3,
            ..Timer::default()
        };
        let start = Instant::now();
        timer.start(start);
        timer.advance(start + Duration::from_secs(25 * 60));
        assert_eq!(timer.phase, Phase::LongBreak);

        timer.start(start);
        assert_eq!(
            timer.advance(start + Duration::from_secs(15 * 60)),
            Some(Phase::LongBreak)
        );
        assert_eq!(timer.phase, Phase::Work);
        assert_eq!(timer.sessions, 4);
    }

    #[test]
    fn paused_timer_does_not_move() {
        let mut timer = Timer::default();
        let start = Instant::now();
        timer.start(start);
        timer.pause();
        assert_eq!(timer.advance(start + Duration::from_secs(600)), None);
        assert_eq!(timer.remaining, Phase::Work.length());
    }

    #[test]
    fn session_count_resets_on_a_new_day() {
        let mut store = MemoryStore::new();
        let monday = NaiveDate::from_ymd_opt(2024, 3, 4).unwrap();
        save_sessions(&mut store, monday, 3);
        assert_eq!(load_sessions(&store, monday), 3);
        assert_eq!(load_sessions(&store, monday.succ_opt().unwrap()), 0);
    }

    #[test]
    fn finishing_work_is_recorded() {
        let mut ctx = context();
        ctx.add_widget("pomodoro").unwrap();
        let start = Instant::now();
        ctx.state.pomodoro.start(start);
        tick(&mut ctx, start + Duration::from_secs(25 * 60));

        let stats = ctx.ledger().load();
        assert_eq!(stats.widget_count("pomodoro", "sessions"), 1);
        assert_eq!(stats.widget_count("pomodoro", "totalTime"), 1500);
        assert_eq!(load_sessions(ctx.store.as_ref(), Local::now().date_naive()), 1);
        assert_eq!(ctx.last_toast(), Some("Session finished!"));
    }

    #[test]
    fn session_after_midnight_starts_a_new_count() {
        let mut ctx = context();
        ctx.add_widget("pomodoro").unwrap();
        let today = Local::now().date_naive();
        let yesterday = today.pred_opt().unwrap();
        save_sessions(ctx.store.as_mut(), yesterday, 3);
        ctx.state.pomodoro.sessions = 3;

        let start = Instant::now();
        ctx.state.pomodoro.start(start);
        tick(&mut ctx, start + Duration::from_secs(25 * 60));

        assert_eq!(ctx.state.pomodoro.sessions, 1);
        assert_eq!(load_sessions(ctx.store.as_ref(), today), 1);
    }

    #[test]
    fn recording_adds_to_the_stored_count() {
        let mut ctx = context();
        let day = NaiveDate::from_ymd_opt(2024, 3, 4).unwrap();
        save_sessions(ctx.store.as_mut(), day, 2);
        assert_eq!(record_session(&mut ctx, day), 3);
        assert_eq!(record_session(&mut ctx, day.succ_opt().unwrap()), 1);
        assert_eq!(ctx.state.pomodoro.sessions, 1);
    }
}
