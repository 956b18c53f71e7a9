//! Usage ledger: counters per widget and per day, persisted as one document
//! and rewritten whole on every change.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::storage::StorageError;
use crate::store::{KeyValueStore, STATS_KEY};

pub const SESSION_HISTORY_DAYS: usize = 90;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StatsDocument {
    #[serde(default)]
    pub sessions: Sessions,
    #[serde(default = "default_widgets")]
    pub widgets: BTreeMap<String, WidgetCounters>,
    #[serde(default)]
    pub bookmarks: BTreeMap<String, BookmarkClicks>,
    #[serde(default)]
    pub daily_activity: BTreeMap<NaiveDate, BTreeMap<String, u64>>,
    #[serde(default)]
    pub goals: Goals,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct Sessions {
    pub total: u64,
    pub last_visit: Option<DateTime<Utc>>,
    pub history: Vec<SessionDay>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct SessionDay {
    pub date: NaiveDate,
    pub opens: u64,
    #[serde(default)]
    pub duration: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct WidgetCounters {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_used: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub counts: BTreeMap<String, u64>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BookmarkClicks {
    pub name: String,
    pub clicks: u64,
    pub last_click: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct Goals {
    pub pomodoro: u64,
    pub tasks: u64,
}

impl Default for Goals {
    fn default() -> Self {
        Goals {
            pomodoro: 5,
            tasks: 10,
        }
    }
}

impl Default for StatsDocument {
    fn default() -> Self {
        StatsDocument {
            sessions: Sessions::default(),
            widgets: default_widgets(),
            bookmarks: BTreeMap::new(),
            daily_activity: BTreeMap::new(),
            goals: Goals::default(),
        }
    }
}

fn default_widgets() -> BTreeMap<String, WidgetCounters> {
    let seed: [(&str, &[&str]); 11] = [
        ("bookmarks", &["clicks"]),
        ("tasks", &["completed", "created", "deleted"]),
        ("notes", &["edits"]),
        ("pomodoro", &["sessions", "totalTime", "streak"]),
        ("calculator", &["calculations"]),
        ("snippets", &["created", "copied"]),
        ("rss", &["articlesRead", "feedsRefreshed"]),
        ("toolsPx", &["conversions"]),
        ("toolsPass", &["generated"]),
        ("gitCheatsheet", &["copied"]),
        ("emojiPicker", &["copied"]),
    ];
    seed.iter()
        .map(|(widget, actions)| {
            let counts = actions.iter().map(|a| (a.to_string(), 0)).collect();
            (
                widget.to_string(),
                WidgetCounters {
                    last_used: None,
                    counts,
                },
            )
        })
        .collect()
}

impl WidgetCounters {
    pub fn count(&self, action: &str) -> u64 {
        self.counts.get(action).copied().unwrap_or(0)
    }
}

impl StatsDocument {
    pub fn widget_count(&self, widget: &str, action: &str) -> u64 {
        self.widgets.get(widget).map_or(0, |w| w.count(action))
    }

    pub fn activity_on(&self, date: NaiveDate, widget: &str) -> u64 {
        self.daily_activity
            .get(&date)
            .and_then(|day| day.get(widget))
            .copied()
            .unwrap_or(0)
    }

    fn bump_widget(&mut self, widget: &str, action: &str, value: u64, now: DateTime<Utc>) {
        let counters = self.widgets.entry(widget.to_string()).or_default();
        *counters.counts.entry(action.to_string()).or_insert(0) += value;
        counters.last_used = Some(now);
        let today = now.date_naive();
        *self
            .daily_activity
            .entry(today)
            .or_default()
            .entry(widget.to_string())
            .or_insert(0) += value;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TodayStats {
    pub tasks: u64,
    pub pomodoro: u64,
    pub bookmarks: u64,
    pub total: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopBookmark {
    pub url: String,
    pub name: String,
    pub clicks: u64,
    pub last_click: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayActivity {
    pub date: NaiveDate,
    pub day: String,
    pub total: u64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GoalProgress {
    pub current: u64,
    pub goal: u64,
    pub percentage: f64,
}

impl GoalProgress {
    /// `min(100, current / goal * 100)`; a zero goal counts as met.
    pub fn new(current: u64, goal: u64) -> Self {
        let percentage = if goal == 0 {
            100.0
        } else {
            (current as f64 / goal as f64 * 100.0).min(100.0)
        };
        GoalProgress {
            current,
            goal,
            percentage,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GoalsProgress {
    pub pomodoro: GoalProgress,
    pub tasks: GoalProgress,
}

/// Reads the statistics document; anything unreadable starts fresh.
pub fn read(store: &dyn KeyValueStore) -> StatsDocument {
    match store.get(STATS_KEY) {
        Ok(Some(raw)) => serde_json::from_str(&raw).unwrap_or_else(|err| {
            warn!(%err, "statistics unreadable, starting fresh");
            StatsDocument::default()
        }),
        Ok(None) => StatsDocument::default(),
        Err(err) => {
            warn!(%err, "reading statistics failed");
            StatsDocument::default()
        }
    }
}

impl StatsDocument {
    pub fn today_stats_on(&self, today: NaiveDate) -> TodayStats {
        let Some(day) = self.daily_activity.get(&today) else {
            return TodayStats::default();
        };
        let get = |w: &str| day.get(w).copied().unwrap_or(0);
        TodayStats {
            tasks: get("tasks"),
            pomodoro: get("pomodoro"),
            bookmarks: get("bookmarks"),
            total: day.values().sum(),
        }
    }

    pub fn week_stats_on(&self, today: NaiveDate) -> BTreeMap<String, u64> {
        let since = today - Duration::days(6);
        let mut totals = BTreeMap::new();
        for (_, activity) in self.daily_activity.range(since..) {
            for (widget, count) in activity {
                *totals.entry(widget.clone()).or_insert(0) += count;
            }
        }
        totals
    }

    /// Most clicked bookmarks first.
    pub fn top_bookmarks(&self, limit: usize) -> Vec<TopBookmark> {
        let mut top: Vec<TopBookmark> = self
            .bookmarks
            .iter()
            .map(|(url, b)| TopBookmark {
                url: url.clone(),
                name: b.name.clone(),
                clicks: b.clicks,
                last_click: b.last_click,
            })
            .collect();
        top.sort_by(|a, b| b.clicks.cmp(&a.clicks));
        top.truncate(limit);
        top
    }

    pub fn last_7_days_on(&self, today: NaiveDate) -> Vec<DayActivity> {
        (0..7)
            .rev()
            .map(|offset| {
                let date = today - Duration::days(offset);
                let total = self
                    .daily_activity
                    .get(&date)
                    .map_or(0, |day| day.values().sum());
                DayActivity {
                    date,
                    day: date.format("%a").to_string(),
                    total,
                }
            })
            .collect()
    }

    pub fn goals_progress_on(&self, today: NaiveDate) -> GoalsProgress {
        let today_stats = self.today_stats_on(today);
        GoalsProgress {
            pomodoro: GoalProgress::new(today_stats.pomodoro, self.goals.pomodoro),
            tasks: GoalProgress::new(today_stats.tasks, self.goals.tasks),
        }
    }

    /// Sum of every counter a widget has, most used first.
    pub fn widget_totals(&self) -> Vec<(String, u64)> {
        let mut totals: Vec<(String, u64)> = self
            .widgets
            .iter()
            .map(|(name, counters)| (name.clone(), counters.counts.values().sum()))
            .collect();
        totals.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        totals
    }
}

/// Percent change from `before` to `after`, rounded; from zero it is 100
/// when anything happened and 0 otherwise.
pub fn percent_change(before: u64, after: u64) -> i64 {
    if before == 0 {
        return if after > 0 { 100 } else { 0 };
    }
    ((after as f64 - before as f64) / before as f64 * 100.0).round() as i64
}

/// Read-modify-write access to the statistics document.
pub struct Ledger<'a> {
    store: &'a mut dyn KeyValueStore,
}

impl<'a> Ledger<'a> {
    pub fn new(store: &'a mut dyn KeyValueStore) -> Self {
        Ledger { store }
    }

    pub fn load(&self) -> StatsDocument {
        read(&*self.store)
    }

    pub fn save(&mut self, stats: &StatsDocument) -> Result<(), StorageError> {
        self.store.set(STATS_KEY, &serde_json::to_string(stats)?)
    }

    fn update(&mut self, f: impl FnOnce(&mut StatsDocument)) -> Result<(), StorageError> {
        let mut stats = self.load();
        f(&mut stats);
        self.save(&stats)
    }

    pub fn track_session(&mut self) -> Result<(), StorageError> {
        self.track_session_at(Utc::now())
    }

    pub fn track_session_at(&mut self, now: DateTime<Utc>) -> Result<(), StorageError> {
        let today = now.date_naive();
        self.update(|stats| {
            stats.sessions.total += 1;
            stats.sessions.last_visit = Some(now);
            match stats.sessions.history.iter_mut().find(|s| s.date == today) {
                Some(day) => day.opens += 1,
                None => stats.sessions.history.push(SessionDay {
                    date: today,
                    opens: 1,
                    duration: 0,
                }),
            }
            let len = stats.sessions.history.len();
            if len > SESSION_HISTORY_DAYS {
                stats.sessions.history.drain(..len - SESSION_HISTORY_DAYS);
            }
        })
    }

    pub fn track_widget(&mut self, widget: &str, action: &str, value: u64) -> Result<(), StorageError> {
        self.track_widget_at(widget, action, value, Utc::now())
    }

    pub fn track_widget_at(
        &mut self,
        widget: &str,
        action: &str,
        value: u64,
        now: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        self.update(|stats| stats.bump_widget(widget, action, value, now))
    }

    pub fn track_bookmark_click(&mut self, url: &str, name: &str) -> Result<(), StorageError> {
        self.track_bookmark_click_at(url, name, Utc::now())
    }

    pub fn track_bookmark_click_at(
        &mut self,
        url: &str,
        name: &str,
        now: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        self.update(|stats| {
            let entry = stats
                .bookmarks
                .entry(url.to_string())
                .or_insert_with(|| BookmarkClicks {
                    name: name.to_string(),
                    clicks: 0,
                    last_click: None,
                });
            entry.clicks += 1;
            entry.last_click = Some(now);
            stats.bump_widget("bookmarks", "clicks", 1, now);
        })
    }

    /// Records a finished work session. The streak grows when yesterday or
    /// today already had a session, and restarts at one otherwise.
    pub fn track_pomodoro_session(&mut self, duration_secs: u64) -> Result<(), StorageError> {
        self.track_pomodoro_session_at(duration_secs, Utc::now())
    }

    pub fn track_pomodoro_session_at(
        &mut self,
        duration_secs: u64,
        now: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        self.update(|stats| {
            let today = now.date_naive();
            let yesterday = today - Duration::days(1);
            let continuing =
                stats.activity_on(today, "pomodoro") > 0 || stats.activity_on(yesterday, "pomodoro") > 0;
            let counters = stats.widgets.entry("pomodoro".into()).or_default();
            *counters.counts.entry("totalTime".into()).or_insert(0) += duration_secs;
            let streak = counters.counts.entry("streak".into()).or_insert(0);
            *streak = if continuing { *streak + 1 } else { 1 };
            stats.bump_widget("pomodoro", "sessions", 1, now);
        })
    }

    pub fn set_goals(&mut self, pomodoro: Option<u64>, tasks: Option<u64>) -> Result<Goals, StorageError> {
        let mut stats = self.load();
        if let Some(p) = pomodoro {
            stats.goals.pomodoro = p;
        }
        if let Some(t) = tasks {
            stats.goals.tasks = t;
        }
        self.save(&stats)?;
        Ok(stats.goals)
    }

    pub fn get_today_stats(&self) -> TodayStats {
        self.today_stats_on(Utc::now().date_naive())
    }

    pub fn today_stats_on(&self, today: NaiveDate) -> TodayStats {
        self.load().today_stats_on(today)
    }

    /// Per-widget totals for the last seven days, today included.
    pub fn get_week_stats(&self) -> BTreeMap<String, u64> {
        self.week_stats_on(Utc::now().date_naive())
    }

    pub fn week_stats_on(&self, today: NaiveDate) -> BTreeMap<String, u64> {
        self.load().week_stats_on(today)
    }

    pub fn get_top_bookmarks(&self, limit: usize) -> Vec<TopBookmark> {
        self.load().top_bookmarks(limit)
    }

    pub fn get_last_7_days_activity(&self) -> Vec<DayActivity> {
        self.last_7_days_on(Utc::now().date_naive())
    }

    pub fn last_7_days_on(&self, today: NaiveDate) -> Vec<DayActivity> {
        self.load().last_7_days_on(today)
    }

    pub fn get_goals_progress(&self) -> GoalsProgress {
        self.goals_progress_on(Utc::now().date_naive())
    }

    pub fn goals_progress_on(&self, today: NaiveDate) -> GoalsProgress {
        self.load().goals_progress_on(today)
    }

    pub fn reset(&mut self) -> Result<(), StorageError> {
        self.store.remove(STATS_KEY)
    }

    pub fn export(&self) -> StatsDocument {
        self.load()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use chrono::TimeZone;

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap()
    }

    #[test]
    fn track_widget_increments_counter_and_daily_activity() {
        let mut store = MemoryStore::new();
        let mut ledger = Ledger::new(&mut store);
        let now = at(2026, 3, 14);
        for _ in 0..7 {
            ledger.track_widget_at("tasks", "completed", 1, now).unwrap();
        }
        let stats = ledger.load();
        assert_eq!(stats.widget_count("tasks", "completed"), 7);
        assert_eq!(stats.activity_on(now.date_naive(), "tasks"), 7);
        assert_eq!(stats.widgets["tasks"].last_used, Some(now));
    }

    #[test]
    fn track_widget_today_uses_the_clock() {
        let mut store = MemoryStore::new();
        let mut ledger = Ledger::new(&mut store);
        ledger.track_widget("tasks", "completed", 1).unwrap();
        ledger.track_widget("tasks", "completed", 1).unwrap();
        let stats = ledger.load();
        assert_eq!(stats.widget_count("tasks", "completed"), 2);
        let today_total: u64 = stats.daily_activity.values().map(|d| d["tasks"]).sum();
        assert_eq!(today_total, 2);
    }

    #[test]
    fn unknown_widget_gets_created() {
        let mut store = MemoryStore::new();
        let mut ledger = Ledger::new(&mut store);
        ledger.track_widget_at("weather", "checks", 3, at(2026, 1, 1)).unwrap();
        assert_eq!(ledger.load().widget_count("weather", "checks"), 3);
    }

    #[test]
    fn session_history_keeps_ninety_days() {
        let mut store = MemoryStore::new();
        let mut ledger = Ledger::new(&mut store);
        let start = at(2025, 1, 1);
        for day in 0..100 {
            ledger.track_session_at(start + Duration::days(day)).unwrap();
        }
        ledger.track_session_at(start + Duration::days(99)).unwrap();
        let sessions = ledger.load().sessions;
        assert_eq!(sessions.total, 101);
        assert_eq!(sessions.history.len(), SESSION_HISTORY_DAYS);
        assert_eq!(sessions.history[0].date, (start + Duration::days(10)).date_naive());
        assert_eq!(sessions.history.last().unwrap().opens, 2);
    }

    #[test]
    fn bookmark_click_updates_both_counters() {
        let mut store = MemoryStore::new();
        let mut ledger = Ledger::new(&mut store);
        let now = at(2026, 5, 1);
        ledger.track_bookmark_click_at("https://github.com", "GitHub", now).unwrap();
        ledger.track_bookmark_click_at("https://github.com", "GitHub", now).unwrap();
        ledger.track_bookmark_click_at("https://figma.com", "Figma", now).unwrap();

        let stats = ledger.load();
        assert_eq!(stats.widget_count("bookmarks", "clicks"), 3);
        assert_eq!(ledger.today_stats_on(now.date_naive()).bookmarks, 3);
        let top = ledger.get_top_bookmarks(1);
        assert_eq!(top.len(), 1);
        assert_eq!(top[0].name, "GitHub");
        assert_eq!(top[0].clicks, 2);
    }

    #[test]
    fn goal_progress_is_capped() {
        let progress = GoalProgress::new(50, 5);
        assert_eq!(progress.percentage, 100.0);
        assert_eq!(GoalProgress::new(1, 4).percentage, 25.0);
        assert_eq!(GoalProgress::new(0, 0).percentage, 100.0);
    }

    #[test]
    fn goals_progress_reads_today() {
        let mut store = MemoryStore::new();
        let mut ledger = Ledger::new(&mut store);
        let now = at(2026, 2, 2);
        ledger.set_goals(None, Some(4)).unwrap();
        ledger.track_widget_at("tasks", "completed", 1, now).unwrap();
        let progress = ledger.goals_progress_on(now.date_naive());
        assert_eq!(progress.tasks.goal, 4);
        assert_eq!(progress.tasks.percentage, 25.0);
        assert_eq!(progress.pomodoro.goal, 5);
    }

    #[test]
    fn week_and_last_seven_days() {
        let mut store = MemoryStore::new();
        let mut ledger = Ledger::new(&mut store);
        let today = at(2026, 6, 10);
        ledger.track_widget_at("tasks", "created", 2, today).unwrap();
        ledger.track_widget_at("notes", "edits", 1, today - Duration::days(3)).unwrap();
        ledger.track_widget_at("tasks", "created", 5, today - Duration::days(30)).unwrap();

        let week = ledger.week_stats_on(today.date_naive());
        assert_eq!(week.get("tasks"), Some(&2));
        assert_eq!(week.get("notes"), Some(&1));

        let days = ledger.last_7_days_on(today.date_naive());
        assert_eq!(days.len(), 7);
        assert_eq!(days[6].date, today.date_naive());
        assert_eq!(days[6].total, 2);
        assert_eq!(days[3].total, 1);
        assert_eq!(days[0].day, (today - Duration::days(6)).format("%a").to_string());
    }

    #[test]
    fn pomodoro_sessions_count_towards_goal_and_streak() {
        let mut store = MemoryStore::new();
        let mut ledger = Ledger::new(&mut store);
        let day1 = at(2026, 4, 1);
        ledger.track_pomodoro_session_at(1500, day1).unwrap();
        ledger.track_pomodoro_session_at(1500, day1 + Duration::days(1)).unwrap();
        ledger.track_pomodoro_session_at(1500, day1 + Duration::days(5)).unwrap();

        let stats = ledger.load();
        assert_eq!(stats.widget_count("pomodoro", "sessions"), 3);
        assert_eq!(stats.widget_count("pomodoro", "totalTime"), 4500);
        assert_eq!(stats.widget_count("pomodoro", "streak"), 1);
        assert_eq!(ledger.today_stats_on(day1.date_naive()).pomodoro, 1);
        let second = ledger.goals_progress_on((day1 + Duration::days(1)).date_naive());
        assert_eq!(second.pomodoro.current, 1);
    }

    #[test]
    fn corrupt_document_starts_fresh() {
        let mut store = MemoryStore::new();
        store.set(STATS_KEY, "{broken").unwrap();
        let ledger = Ledger::new(&mut store);
        assert_eq!(ledger.load(), StatsDocument::default());
    }

    #[test]
    fn percent_change_from_yesterday() {
        assert_eq!(percent_change(0, 0), 0);
        assert_eq!(percent_change(0, 3), 100);
        assert_eq!(percent_change(4, 2), -50);
        assert_eq!(percent_change(3, 4), 33);
    }

    #[test]
    fn widget_totals_sum_every_counter() {
        let mut store = MemoryStore::new();
        let mut ledger = Ledger::new(&mut store);
        ledger.track_widget("tasks", "created", 2).unwrap();
        ledger.track_widget("tasks", "completed", 1).unwrap();
        ledger.track_widget("notes", "edits", 1).unwrap();
        let totals = read(&store).widget_totals();
        assert_eq!(totals[0], ("tasks".to_string(), 3));
        assert!(totals.contains(&("notes".to_string(), 1)));
    }

    #[test]
    fn reset_removes_document() {
        let mut store = MemoryStore::new();
        let mut ledger = Ledger::new(&mut store);
        ledger.track_session().unwrap();
        ledger.reset().unwrap();
        assert_eq!(ledger.export().sessions.total, 0);
    }
}
