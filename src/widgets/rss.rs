//! Subscribed feeds and their cached items. Fetching is out of scope, so
//! items only arrive through imports.

use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use tracing::warn;

use super::{is_plain, muted, persist, row_style, KeyOutcome, WidgetDescriptor};
use crate::app::{AppContext, AppError};
use crate::form::{Form, FormKind};
use crate::model::{ModelError, WidgetSize, DEFAULT_FEED_ITEMS};

const DEFAULT_CATEGORY: &str = "General";
const MAX_FEED_ITEMS: usize = 50;

pub struct SuggestedFeed {
    pub name: &'static str,
    pub url: &'static str,
    pub category: &'static str,
}

pub static SUGGESTED_FEEDS: [SuggestedFeed; 10] = [
    SuggestedFeed {
        name: "Journal du Hacker",
        url: "https://www.journalduhacker.net/rss",
        category: "Tech news",
    },
    SuggestedFeed {
        name: "LinuxFr",
        url: "https://linuxfr.org/news.atom",
        category: "Open Source",
    },
    SuggestedFeed {
        name: "Atlas: Cybersecurity",
        url: "https://flux.saynete.com/encart_rss_informatique_cybersecurite_fr.xml",
        category: "Security",
    },
    SuggestedFeed {
        name: "Atlas: Data",
        url: "https://flux.saynete.com/encart_rss_informatique_data_fr.xml",
        category: "Data Science",
    },
    SuggestedFeed {
        name: "Atlas: Free Software",
        url: "https://flux.saynete.com/encart_rss_informatique_logiciel_libre_fr.xml",
        category: "Open Source",
    },
    SuggestedFeed {
        name: "Le Monde: AI",
        url: "https://www.lemonde.fr/intelligence-artificielle/rss_full.xml",
        category: "Artificial Intelligence",
    },
    SuggestedFeed {
        name: "Le Figaro: High-Tech",
        url: "https://www.lefigaro.fr/rss/figaro_secteur_high-tech.xml",
        category: "Tech news",
    },
    SuggestedFeed {
        name: "Human Coders: Python",
        url: "https://news.humancoders.com/t/python/items/feed",
        category: "Programming",
    },
    SuggestedFeed {
        name: "Human Coders: JavaScript",
        url: "https://news.humancoders.com/t/javascript/items/feed",
        category: "Programming",
    },
    SuggestedFeed {
        name: "France Info: AI",
        url: "https://www.franceinfo.fr/internet/intelligence-artificielle.rss",
        category: "Artificial Intelligence",
    },
];

/// A selectable row: a feed header, or one of its items.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Row {
    Feed(usize),
    Item(usize, usize),
}

fn rows(ctx: &AppContext) -> Vec<Row> {
    let mut rows = Vec::new();
    for (f_idx, feed) in ctx.data.rss_feeds.iter().enumerate() {
        rows.push(Row::Feed(f_idx));
        rows.extend((0..feed.visible_items().len()).map(|i| Row::Item(f_idx, i)));
    }
    rows
}

fn parse_max_items(raw: &str) -> Result<usize, AppError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(DEFAULT_FEED_ITEMS);
    }
    raw.parse::<usize>()
        .ok()
        .filter(|n| (1..=MAX_FEED_ITEMS).contains(n))
        .ok_or_else(|| AppError::Invalid(format!("max items must be 1-{MAX_FEED_ITEMS}")))
}

fn category_or_default(raw: &str) -> &str {
    let raw = raw.trim();
    if raw.is_empty() {
        DEFAULT_CATEGORY
    } else {
        raw
    }
}

fn add_suggested(ctx: &mut AppContext, idx: usize) {
    let Some(feed) = SUGGESTED_FEEDS.get(idx) else {
        return;
    };
    match ctx
        .data
        .add_feed(feed.name, feed.url, feed.category, DEFAULT_FEED_ITEMS)
    {
        Ok(()) => persist(ctx, format!("Feed \"{}\" added", feed.name)),
        Err(ModelError::DuplicateFeed(_)) => ctx.toast("Feed already added"),
        Err(err) => ctx.toast(err.to_string()),
    }
}

pub struct RssWidget;

pub static RSS_FEEDS: RssWidget = RssWidget;

impl WidgetDescriptor for RssWidget {
    fn id(&self) -> &'static str {
        "rss-feeds"
    }

    fn name(&self) -> &'static str {
        "RSS Feeds"
    }

    fn icon(&self) -> &'static str {
        "◉"
    }

    fn description(&self) -> &'static str {
        "News feeds with their latest articles"
    }

    fn default_size(&self) -> WidgetSize {
        WidgetSize::new(6, 5)
    }

    fn render(&self, ctx: &AppContext, focused: bool) -> Vec<Line<'static>> {
        if ctx.data.rss_feeds.is_empty() {
            let mut lines = vec![muted("No feeds yet"), muted("a add • 1-9, 0 add a suggestion:")];
            lines.extend(SUGGESTED_FEEDS.iter().enumerate().map(|(idx, feed)| {
                muted(format!("  {} {}", (idx + 1) % 10, feed.name))
            }));
            return lines;
        }
        let selected = ctx.state.rss.selected;
        rows(ctx)
            .into_iter()
            .enumerate()
            .map(|(row_idx, row)| {
                let (marker, style) = row_style(row_idx == selected, focused);
                match row {
                    Row::Feed(f) => {
                        let feed = &ctx.data.rss_feeds[f];
                        let updated = feed
                            .last_update
                            .map(|t| format!("  updated {}", t.format("%Y-%m-%d %H:%M")))
                            .unwrap_or_default();
                        Line::from(vec![
                            Span::raw(marker),
                            Span::styled(feed.name.clone(), style.add_modifier(Modifier::BOLD)),
                            Span::styled(
                                format!("  {}{updated}", category_or_default(&feed.category)),
                                Style::default().fg(Color::DarkGray),
                            ),
                        ])
                    }
                    Row::Item(f, i) => {
                        let item = &ctx.data.rss_feeds[f].items[i];
                        let date = item
                            .pub_date
                            .as_deref()
                            .map(|d| format!("  {d}"))
                            .unwrap_or_default();
                        Line::from(vec![
                            Span::raw(marker),
                            Span::styled(format!("  • {}", item.title), style),
                            Span::styled(date, Style::default().fg(Color::DarkGray)),
                        ])
                    }
                }
            })
            .collect()
    }

    fn handle_key(&self, ctx: &mut AppContext, key: KeyEvent) -> KeyOutcome {
        let rows = rows(ctx);
        if ctx.state.rss.handle_move(&key, rows.len()) {
            return KeyOutcome::Handled;
        }
        if !is_plain(&key) {
            return KeyOutcome::Ignored;
        }
        let current = rows.get(ctx.state.rss.clamp(rows.len())).copied();
        let feed_idx = current.map(|row| match row {
            Row::Feed(f) | Row::Item(f, _) => f,
        });
        match key.code {
            KeyCode::Char('a') => KeyOutcome::OpenForm(
                Form::new(Some(self.id()), FormKind::AddFeed, "Add feed")
                    .field("Name", "")
                    .field("URL", "https://")
                    .field("Category", DEFAULT_CATEGORY)
                    .field("Max items", &DEFAULT_FEED_ITEMS.to_string()),
            ),
            KeyCode::Char(c) if c.is_ascii_digit() => {
                let idx = c.to_digit(10).map_or(0, |d| (d as usize + 9) % 10);
                add_suggested(ctx, idx);
                KeyOutcome::Handled
            }
            KeyCode::Char('u') => {
                let Some(f) = feed_idx else {
                    return KeyOutcome::Ignored;
                };
                let feed = &ctx.data.rss_feeds[f];
                KeyOutcome::OpenForm(
                    Form::new(Some(self.id()), FormKind::EditFeed(f), "Edit feed")
                        .field("Name", &feed.name)
                        .field("URL", &feed.url)
                        .field("Category", category_or_default(&feed.category))
                        .field("Max items", &feed.max_items.to_string()),
                )
            }
            KeyCode::Char('d') => {
                let Some(f) = feed_idx else {
                    return KeyOutcome::Ignored;
                };
                match ctx.data.delete_feed(f) {
                    Ok(feed) => {
                        ctx.state.rss.selected = 0;
                        persist(ctx, format!("Feed \"{}\" removed", feed.name));
                    }
                    Err(err) => ctx.toast(err.to_string()),
                }
                KeyOutcome::Handled
            }
            KeyCode::Enter | KeyCode::Char('o') => {
                let (url, article) = match current {
                    Some(Row::Feed(f)) => (ctx.data.rss_feeds[f].url.clone(), false),
                    Some(Row::Item(f, i)) => (ctx.data.rss_feeds[f].items[i].link.clone(), true),
                    None => return KeyOutcome::Ignored,
                };
                match ctx.launch(&url) {
                    Ok(()) if article => ctx.track("rss", "articlesRead"),
                    Ok(()) => {}
                    Err(err) => {
                        warn!(%err, "opening feed link failed");
                        ctx.toast(err.to_string());
                    }
                }
                KeyOutcome::Handled
            }
            _ => KeyOutcome::Ignored,
        }
    }

    fn submit(&self, ctx: &mut AppContext, kind: &FormKind, values: &[String]) -> Result<(), AppError> {
        let value = |idx: usize| values.get(idx).map(String::as_str).unwrap_or("");
        let max_items = parse_max_items(value(3))?;
        let category = category_or_default(value(2));
        match *kind {
            FormKind::AddFeed => {
                ctx.data.add_feed(value(0), value(1), category, max_items)?;
                persist(ctx, format!("Feed \"{}\" added", value(0).trim()));
            }
            FormKind::EditFeed(idx) => {
                ctx.data
                    .update_feed(idx, value(0), value(1), category, max_items)?;
                persist(ctx, format!("Feed \"{}\" updated", value(0).trim()));
            }
            ref other => return Err(AppError::UnsupportedForm(format!("{other:?}"))),
        }
        Ok(())
    }

    fn hints(&self) -> &'static str {
        "Enter open • a add • u edit • d delete • 1-0 suggestions"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::RssItem;
    use crate::app::tests::context;

    fn form_values(name: &str, url: &str, category: &str, max: &str) -> Vec<String> {
        [name, url, category, max].iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn custom_feed_defaults() {
        let mut ctx = context();
        let values = form_values("Blog", "https://blog.example/feed.xml", "", "");
        RSS_FEEDS.submit(&mut ctx, &FormKind::AddFeed, &values).unwrap();
        let feed = &ctx.data.rss_feeds[0];
        assert_eq!(feed.category, DEFAULT_CATEGORY);
        assert_eq!(feed.max_items, DEFAULT_FEED_ITEMS);

        let bad = form_values("Blog", "https://blog.example/feed.xml", "", "500");
        assert!(RSS_FEEDS.submit(&mut ctx, &FormKind::AddFeed, &bad).is_err());
        let dup = form_values("Again", "https://blog.example/feed.xml", "", "5");
        assert!(RSS_FEEDS.submit(&mut ctx, &FormKind::AddFeed, &dup).is_err());
        assert_eq!(ctx.data.rss_feeds.len(), 1);
    }

    #[test]
    fn suggested_feeds_are_added_once() {
        let mut ctx = context();
        RSS_FEEDS.handle_key(&mut ctx, KeyEvent::from(KeyCode::Char('2')));
        assert_eq!(ctx.data.rss_feeds[0].name, "LinuxFr");
        RSS_FEEDS.handle_key(&mut ctx, KeyEvent::from(KeyCode::Char('2')));
        assert_eq!(ctx.data.rss_feeds.len(), 1);
        assert_eq!(ctx.last_toast(), Some("Feed already added"));
        RSS_FEEDS.handle_key(&mut ctx, KeyEvent::from(KeyCode::Char('0')));
        assert_eq!(ctx.data.rss_feeds[1].name, "France Info: AI");
    }

    #[test]
    fn reading_an_item_is_counted() {
        let mut ctx = context();
        add_suggested(&mut ctx, 1);
        ctx.data.rss_feeds[0].items = vec![RssItem {
            title: "Kernel released".into(),
            link: "https://linuxfr.org/news/kernel".into(),
            pub_date: None,
            description: None,
        }];
        assert_eq!(RSS_FEEDS.render(&ctx, true).len(), 2);
        RSS_FEEDS.handle_key(&mut ctx, KeyEvent::from(KeyCode::Down));
        RSS_FEEDS.handle_key(&mut ctx, KeyEvent::from(KeyCode::Enter));
        assert_eq!(ctx.ledger().load().widget_count("rss", "articlesRead"), 1);
    }

    #[test]
    fn editing_the_url_drops_cached_items() {
        let mut ctx = context();
        add_suggested(&mut ctx, 0);
        ctx.data.rss_feeds[0].items = vec![RssItem {
            title: "old".into(),
            link: "https://example.com/old".into(),
            pub_date: None,
            description: None,
        }];
        let values = form_values("JdH", "https://example.com/rss", "News", "3");
        RSS_FEEDS.submit(&mut ctx, &FormKind::EditFeed(0), &values).unwrap();
        let feed = &ctx.data.rss_feeds[0];
        assert!(feed.items.is_empty());
        assert_eq!(feed.max_items, 3);
        assert_eq!(feed.category, "News");
    }
}
