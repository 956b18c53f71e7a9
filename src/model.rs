use chrono::{DateTime, Utc};
use rand::{distributions::Alphanumeric, Rng};
use serde::{Deserialize, Serialize};

use crate::validate::{clean_icon, is_valid_url, sanitize_color};

pub const DEFAULT_ACCENT: &str = "#6366f1";
pub const DEFAULT_FEED_ITEMS: usize = 10;

pub type TaskId = String;

/// The primary user document: everything the widgets edit.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AppData {
    #[serde(default)]
    pub bookmarks: Vec<BookmarkCategory>,
    #[serde(default)]
    pub tasks: Vec<Task>,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub snippets: Vec<Snippet>,
    #[serde(default)]
    pub rss_feeds: Vec<RssFeed>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct BookmarkCategory {
    pub category: String,
    #[serde(default = "default_category_icon")]
    pub icon: String,
    pub apps: Vec<BookmarkApp>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct BookmarkApp {
    pub name: String,
    pub url: String,
    #[serde(default = "default_app_icon")]
    pub icon: String,
    #[serde(default = "default_accent")]
    pub color: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    pub priority: Priority,
    #[serde(default)]
    pub status: TaskStatus,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Normal,
    Important,
    Urgent,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    #[default]
    Pending,
    Completed,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Snippet {
    pub title: String,
    pub code: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RssFeed {
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub category: String,
    #[serde(default = "default_feed_items")]
    pub max_items: usize,
    #[serde(default)]
    pub items: Vec<RssItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_update: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RssItem {
    pub title: String,
    pub link: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pub_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Preferences {
    #[serde(default = "default_accent")]
    pub accent: String,
    #[serde(default)]
    pub bg_url: String,
}

/// One placed widget in the persisted Layout Record.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct LayoutNode {
    pub id: String,
    #[serde(default)]
    pub x: u16,
    #[serde(default)]
    pub y: u16,
    pub w: u16,
    pub h: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WidgetSize {
    pub w: u16,
    pub h: u16,
}

impl WidgetSize {
    pub const fn new(w: u16, h: u16) -> Self {
        WidgetSize { w, h }
    }
}

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum ModelError {
    #[error("{0} is required")]
    EmptyField(&'static str),
    #[error("invalid url: {0}")]
    InvalidUrl(String),
    #[error("task not found: {0}")]
    TaskNotFound(String),
    #[error("bookmark not found: {0}/{1}")]
    BookmarkNotFound(usize, usize),
    #[error("snippet not found: {0}")]
    SnippetNotFound(usize),
    #[error("feed not found: {0}")]
    FeedNotFound(usize),
    #[error("feed already added: {0}")]
    DuplicateFeed(String),
}

fn default_category_icon() -> String {
    "folder".into()
}

fn default_app_icon() -> String {
    "web".into()
}

fn default_accent() -> String {
    DEFAULT_ACCENT.into()
}

fn default_feed_items() -> usize {
    DEFAULT_FEED_ITEMS
}

impl Default for AppData {
    fn default() -> Self {
        AppData {
            bookmarks: default_bookmarks(),
            tasks: Vec::new(),
            notes: String::new(),
            snippets: Vec::new(),
            rss_feeds: Vec::new(),
        }
    }
}

impl Default for Preferences {
    fn default() -> Self {
        Preferences {
            accent: default_accent(),
            bg_url: String::new(),
        }
    }
}

pub fn default_bookmarks() -> Vec<BookmarkCategory> {
    let app = |name: &str, url: &str, icon: &str, color: &str| BookmarkApp {
        name: name.into(),
        url: url.into(),
        icon: icon.into(),
        color: color.into(),
    };
    vec![
        BookmarkCategory {
            category: "Development".into(),
            icon: "code-tags".into(),
            apps: vec![
                app("GitHub", "https://github.com", "github", "#333333"),
                app("ChatGPT", "https://chat.openai.com", "robot", "#10a37f"),
            ],
        },
        BookmarkCategory {
            category: "Design".into(),
            icon: "palette".into(),
            apps: vec![app("Figma", "https://figma.com", "pencil-ruler", "#f24e1e")],
        },
    ]
}

impl Priority {
    pub fn label(&self) -> &'static str {
        match self {
            Priority::Normal => "normal",
            Priority::Important => "important",
            Priority::Urgent => "urgent",
        }
    }

    pub fn next(&self) -> Priority {
        match self {
            Priority::Normal => Priority::Important,
            Priority::Important => Priority::Urgent,
            Priority::Urgent => Priority::Normal,
        }
    }

    pub fn parse(raw: &str) -> Option<Priority> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "normal" | "" => Some(Priority::Normal),
            "important" => Some(Priority::Important),
            "urgent" => Some(Priority::Urgent),
            _ => None,
        }
    }
}

impl AppData {
    /// Pending tasks, urgent ones first, otherwise in insertion order.
    pub fn pending_tasks(&self) -> Vec<&Task> {
        let mut pending: Vec<&Task> = self
            .tasks
            .iter()
            .filter(|t| t.status != TaskStatus::Completed)
            .collect();
        pending.sort_by_key(|t| if t.priority == Priority::Urgent { 0 } else { 1 });
        pending
    }

    pub fn add_task(&mut self, title: &str, priority: Priority) -> Result<TaskId, ModelError> {
        let title = title.trim();
        if title.is_empty() {
            return Err(ModelError::EmptyField("title"));
        }
        let id = loop {
            let candidate = generate_id();
            if !self.tasks.iter().any(|t| t.id == candidate) {
                break candidate;
            }
        };
        self.tasks.push(Task {
            id: id.clone(),
            title: title.to_string(),
            priority,
            status: TaskStatus::Pending,
        });
        Ok(id)
    }

    pub fn complete_task(&mut self, id: &str) -> Result<(), ModelError> {
        let task = self
            .tasks
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| ModelError::TaskNotFound(id.to_string()))?;
        task.status = TaskStatus::Completed;
        Ok(())
    }

    pub fn delete_task(&mut self, id: &str) -> Result<(), ModelError> {
        let before = self.tasks.len();
        self.tasks.retain(|t| t.id != id);
        if self.tasks.len() == before {
            return Err(ModelError::TaskNotFound(id.to_string()));
        }
        Ok(())
    }

    /// Adds a bookmark, creating the category when it does not exist yet.
    pub fn add_bookmark(&mut self, category: &str, name: &str, url: &str) -> Result<(), ModelError> {
        let (category, name, url) = (category.trim(), name.trim(), url.trim());
        if name.is_empty() {
            return Err(ModelError::EmptyField("name"));
        }
        if url.is_empty() {
            return Err(ModelError::EmptyField("url"));
        }
        if !is_valid_url(url) {
            return Err(ModelError::InvalidUrl(url.to_string()));
        }
        let category = if category.is_empty() { "General" } else { category };
        let idx = match self.bookmarks.iter().position(|c| c.category == category) {
            Some(idx) => idx,
            None => {
                self.bookmarks.push(BookmarkCategory {
                    category: category.to_string(),
                    icon: default_category_icon(),
                    apps: Vec::new(),
                });
                self.bookmarks.len() - 1
            }
        };
        self.bookmarks[idx].apps.push(BookmarkApp {
            name: name.to_string(),
            url: url.to_string(),
            icon: default_app_icon(),
            color: default_accent(),
        });
        Ok(())
    }

    pub fn update_bookmark(
        &mut self,
        cat_idx: usize,
        app_idx: usize,
        name: &str,
        url: &str,
        icon: &str,
        color: &str,
    ) -> Result<(), ModelError> {
        let (name, url) = (name.trim(), url.trim());
        if name.is_empty() {
            return Err(ModelError::EmptyField("name"));
        }
        if !is_valid_url(url) {
            return Err(ModelError::InvalidUrl(url.to_string()));
        }
        let app = self
            .bookmarks
            .get_mut(cat_idx)
            .and_then(|c| c.apps.get_mut(app_idx))
            .ok_or(ModelError::BookmarkNotFound(cat_idx, app_idx))?;
        app.name = name.to_string();
        app.url = url.to_string();
        app.icon = clean_icon(icon, "web");
        app.color = sanitize_color(color, DEFAULT_ACCENT);
        Ok(())
    }

    /// Removes a bookmark; a category left empty is removed with it.
    pub fn delete_bookmark(&mut self, cat_idx: usize, app_idx: usize) -> Result<BookmarkApp, ModelError> {
        let category = self
            .bookmarks
            .get_mut(cat_idx)
            .filter(|c| app_idx < c.apps.len())
            .ok_or(ModelError::BookmarkNotFound(cat_idx, app_idx))?;
        let removed = category.apps.remove(app_idx);
        if category.apps.is_empty() {
            self.bookmarks.remove(cat_idx);
        }
        Ok(removed)
    }

    pub fn add_snippet(&mut self, title: &str, code: &str) -> Result<(), ModelError> {
        if title.trim().is_empty() {
            return Err(ModelError::EmptyField("title"));
        }
        if code.trim().is_empty() {
            return Err(ModelError::EmptyField("code"));
        }
        self.snippets.push(Snippet {
            title: title.trim().to_string(),
            code: code.to_string(),
        });
        Ok(())
    }

    pub fn delete_snippet(&mut self, idx: usize) -> Result<Snippet, ModelError> {
        if idx >= self.snippets.len() {
            return Err(ModelError::SnippetNotFound(idx));
        }
        Ok(self.snippets.remove(idx))
    }

    pub fn add_feed(
        &mut self,
        name: &str,
        url: &str,
        category: &str,
        max_items: usize,
    ) -> Result<(), ModelError> {
        let (name, url) = (name.trim(), url.trim());
        if name.is_empty() {
            return Err(ModelError::EmptyField("name"));
        }
        if !is_valid_url(url) {
            return Err(ModelError::InvalidUrl(url.to_string()));
        }
        if self.rss_feeds.iter().any(|f| f.url == url) {
            return Err(ModelError::DuplicateFeed(url.to_string()));
        }
        self.rss_feeds.push(RssFeed {
            name: name.to_string(),
            url: url.to_string(),
            category: category.trim().to_string(),
            max_items: max_items.max(1),
            items: Vec::new(),
            last_update: None,
        });
        Ok(())
    }

    /// Updates a feed. Changing the url or the item cap drops cached items
    /// beyond what the feed should keep.
    pub fn update_feed(
        &mut self,
        idx: usize,
        name: &str,
        url: &str,
        category: &str,
        max_items: usize,
    ) -> Result<(), ModelError> {
        let (name, url) = (name.trim(), url.trim());
        if name.is_empty() {
            return Err(ModelError::EmptyField("name"));
        }
        if !is_valid_url(url) {
            return Err(ModelError::InvalidUrl(url.to_string()));
        }
        if self
            .rss_feeds
            .iter()
            .enumerate()
            .any(|(i, f)| i != idx && f.url == url)
        {
            return Err(ModelError::DuplicateFeed(url.to_string()));
        }
        let feed = self
            .rss_feeds
            .get_mut(idx)
            .ok_or(ModelError::FeedNotFound(idx))?;
        if feed.url != url {
            feed.items.clear();
            feed.last_update = None;
        }
        feed.name = name.to_string();
        feed.url = url.to_string();
        feed.category = category.trim().to_string();
        feed.max_items = max_items.max(1);
        feed.items.truncate(feed.max_items);
        Ok(())
    }

    pub fn delete_feed(&mut self, idx: usize) -> Result<RssFeed, ModelError> {
        if idx >= self.rss_feeds.len() {
            return Err(ModelError::FeedNotFound(idx));
        }
        Ok(self.rss_feeds.remove(idx))
    }

    /// Flattened `(category index, app index, category, app)` view.
    pub fn bookmark_entries(&self) -> Vec<(usize, usize, &BookmarkCategory, &BookmarkApp)> {
        self.bookmarks
            .iter()
            .enumerate()
            .flat_map(|(c_idx, cat)| {
                cat.apps
                    .iter()
                    .enumerate()
                    .map(move |(a_idx, app)| (c_idx, a_idx, cat, app))
            })
            .collect()
    }
}

impl RssFeed {
    pub fn visible_items(&self) -> &[RssItem] {
        let cap = self.max_items.min(self.items.len());
        &self.items[..cap]
    }
}

pub fn generate_id() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(8)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_carry_builtin_bookmarks() {
        let data = AppData::default();
        assert_eq!(data.bookmarks.len(), 2);
        assert_eq!(data.bookmarks[0].category, "Development");
        assert!(data.tasks.is_empty());
        assert!(data.notes.is_empty());
        assert!(data.snippets.is_empty());
    }

    #[test]
    fn add_task_rejects_blank_title() {
        let mut data = AppData::default();
        assert_eq!(
            data.add_task("   ", Priority::Normal),
            Err(ModelError::EmptyField("title"))
        );
        assert!(data.tasks.is_empty());
    }

    #[test]
    fn pending_tasks_puts_urgent_first() {
        let mut data = AppData::default();
        let a = data.add_task("write report", Priority::Normal).unwrap();
        data.add_task("fix prod", Priority::Urgent).unwrap();
        let c = data.add_task("old", Priority::Important).unwrap();
        data.complete_task(&c).unwrap();

        let titles: Vec<_> = data.pending_tasks().iter().map(|t| t.title.clone()).collect();
        assert_eq!(titles, vec!["fix prod", "write report"]);
        data.delete_task(&a).unwrap();
        assert_eq!(data.delete_task(&a), Err(ModelError::TaskNotFound(a)));
    }

    #[test]
    fn add_bookmark_creates_category_and_checks_protocol() {
        let mut data = AppData::default();
        assert!(matches!(
            data.add_bookmark("Tools", "evil", "javascript:alert(1)"),
            Err(ModelError::InvalidUrl(_))
        ));
        data.add_bookmark("Tools", "Docs", "https://docs.rs").unwrap();
        let tools = data.bookmarks.iter().find(|c| c.category == "Tools").unwrap();
        assert_eq!(tools.icon, "folder");
        assert_eq!(tools.apps[0].color, DEFAULT_ACCENT);
    }

    #[test]
    fn deleting_last_app_drops_category() {
        let mut data = AppData::default();
        let before = data.bookmarks.len();
        let removed = data.delete_bookmark(1, 0).unwrap();
        assert_eq!(removed.name, "Figma");
        assert_eq!(data.bookmarks.len(), before - 1);
        assert!(data.delete_bookmark(5, 0).is_err());
    }

    #[test]
    fn update_bookmark_sanitizes_color_and_icon() {
        let mut data = AppData::default();
        data.update_bookmark(0, 0, "Hub", "https://github.com", "git hub!", "red")
            .unwrap();
        let app = &data.bookmarks[0].apps[0];
        assert_eq!(app.icon, "github");
        assert_eq!(app.color, DEFAULT_ACCENT);
    }

    #[test]
    fn feeds_refuse_duplicate_urls() {
        let mut data = AppData::default();
        data.add_feed("LinuxFr", "https://linuxfr.org/news.atom", "Open Source", 10)
            .unwrap();
        assert_eq!(
            data.add_feed("Again", "https://linuxfr.org/news.atom", "", 5),
            Err(ModelError::DuplicateFeed("https://linuxfr.org/news.atom".into()))
        );
    }

    #[test]
    fn update_feed_truncates_cached_items() {
        let mut data = AppData::default();
        data.add_feed("Feed", "https://example.com/rss", "", 10).unwrap();
        data.rss_feeds[0].items = (0..6)
            .map(|i| RssItem {
                title: format!("item {i}"),
                link: format!("https://example.com/{i}"),
                pub_date: None,
                description: None,
            })
            .collect();
        data.update_feed(0, "Feed", "https://example.com/rss", "", 3).unwrap();
        assert_eq!(data.rss_feeds[0].items.len(), 3);
        data.update_feed(0, "Feed", "https://example.com/atom", "", 3).unwrap();
        assert!(data.rss_feeds[0].items.is_empty());
    }

    #[test]
    fn missing_status_defaults_to_pending() {
        let task: Task =
            serde_json::from_str(r#"{"id":"1","title":"t","priority":"urgent"}"#).unwrap();
        assert_eq!(task.status, TaskStatus::Pending);
        assert_eq!(task.priority, Priority::Urgent);
    }
}
