use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use tracing::warn;

use super::{heading, is_plain, muted, KeyOutcome, WidgetDescriptor};
use crate::app::AppContext;
use crate::model::WidgetSize;
use crate::storage::StorageError;
use crate::store::{KeyValueStore, RECENT_EMOJIS_KEY};

pub const MAX_RECENT: usize = 12;
const PER_ROW: usize = 8;

pub struct Category {
    pub name: &'static str,
    pub emojis: &'static [&'static str],
}

pub static CATEGORIES: &[Category] = &[
    Category {
        name: "Smileys",
        emojis: &[
            "😀", "😃", "😄", "😁", "😆", "😅", "🤣", "😂", "🙂", "🙃", "😉", "😊", "😇", "🥰", "😍",
            "🤩", "😘", "😋", "😛", "😜", "🤪", "🤗", "🤔", "🤨", "😐", "😏", "🙄", "😬", "😌", "😴",
            "😷", "🤯", "🤠", "🥳", "😎", "🤓", "🧐",
        ],
    },
    Category {
        name: "Gestures",
        emojis: &[
            "👋", "🤚", "✋", "🖖", "👌", "🤏", "✌️", "🤞", "🤟", "🤘", "🤙", "👈", "👉", "👆", "👇",
            "👍", "👎", "✊", "👊", "👏", "🙌", "🤝", "🙏", "💪", "🧠", "👀",
        ],
    },
    Category {
        name: "Hearts",
        emojis: &[
            "❤️", "🧡", "💛", "💚", "💙", "💜", "🖤", "🤍", "🤎", "💔", "❣️", "💕", "💞", "💓", "💗",
            "💖", "💘", "💝",
        ],
    },
    Category {
        name: "Animals",
        emojis: &[
            "🐶", "🐱", "🐭", "🐹", "🐰", "🦊", "🐻", "🐼", "🐨", "🐯", "🦁", "🐮", "🐷", "🐸", "🐵",
            "🐔", "🐧", "🐦", "🦆", "🦅", "🦉", "🐺", "🐴", "🦄", "🐝", "🦋", "🐢", "🐍", "🐙", "🦀",
            "🐬", "🐳", "🦈", "🐘", "🦒", "🦔",
        ],
    },
    Category {
        name: "Nature",
        emojis: &[
            "💐", "🌸", "🌹", "🥀", "🌺", "🌻", "🌼", "🌷", "🌱", "🌲", "🌳", "🌴", "🌵", "🌾", "🌿",
            "🍀", "🍁", "🍂", "🍃",
        ],
    },
    Category {
        name: "Food",
        emojis: &[
            "🍇", "🍉", "🍊", "🍋", "🍌", "🍍", "🥭", "🍎", "🍐", "🍑", "🍒", "🍓", "🥝", "🍅", "🥑",
            "🥕", "🌽", "🌶", "🥦", "🍄", "🍞", "🥐", "🧀", "🍔", "🍟", "🍕", "🌭", "🌮", "🍣", "🍜",
            "🍩", "🍪", "🎂", "🍫", "☕", "🍵", "🍺", "🍷",
        ],
    },
    Category {
        name: "Activities",
        emojis: &[
            "⚽", "🏀", "🏈", "⚾", "🎾", "🏐", "🏉", "🎱", "🏓", "🏸", "🥊", "🥋", "⛳", "🎣", "🛹",
            "🎿", "🏂", "🏋️", "🧘", "🏊", "🚴", "🧗", "🤹",
        ],
    },
    Category {
        name: "Travel",
        emojis: &[
            "🚗", "🚕", "🚌", "🚓", "🚑", "🚒", "🚚", "🚜", "🚲", "🛵", "🏍", "🚨", "🚄", "🚂", "✈️",
            "🚀", "🛸", "🚁", "⛵", "🚢", "⚓", "🗺", "🗽", "🗼", "🏰", "🎡", "🏖", "🌋", "🏔", "🏕",
            "🏠", "🏢",
        ],
    },
    Category {
        name: "Objects",
        emojis: &[
            "⌚", "📱", "💻", "⌨️", "🖥", "🖨", "🖱", "🕹", "💾", "💿", "📷", "🎥", "📞", "📺", "📻",
            "⏰", "⌛", "🔋", "🔌", "💡", "🔦", "💰", "💳", "💎", "🧰", "🔧", "🔨", "🛠", "⚙️", "🧲",
            "🔬", "🔭", "💊", "🧪", "🔑", "🚪", "🧸",
        ],
    },
    Category {
        name: "Symbols",
        emojis: &[
            "☮️", "☯️", "♻️", "✅", "❌", "⭕", "🛑", "⛔", "🚫", "💯", "❗", "❓", "⚠️", "🔰", "💠",
            "🌀", "💤", "➕", "➖", "➗", "✖️", "♾️", "✔️", "🔴", "🟠", "🟡", "🟢", "🔵", "🟣", "⚫",
            "⚪", "🔔", "💬", "💭",
        ],
    },
];

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct EmojiState {
    pub category: usize,
    pub selected: usize,
    pub recent: Vec<String>,
}

impl EmojiState {
    fn emojis(&self) -> &'static [&'static str] {
        CATEGORIES
            .get(self.category)
            .map(|c| c.emojis)
            .unwrap_or_default()
    }

    pub fn current(&self) -> Option<&'static str> {
        self.emojis().get(self.selected).copied()
    }

    pub fn switch_category(&mut self, forward: bool) {
        let count = CATEGORIES.len();
        self.category = if forward {
            (self.category + 1) % count
        } else {
            (self.category + count - 1) % count
        };
        self.selected = 0;
    }

    fn step(&mut self, delta: isize) {
        let len = self.emojis().len();
        if len == 0 {
            return;
        }
        let next = self.selected as isize + delta;
        if (0..len as isize).contains(&next) {
            self.selected = next as usize;
        }
    }
}

/// Moves `emoji` to the front of the recent list, keeping at most
/// [`MAX_RECENT`] distinct entries.
pub fn push_recent(recent: &mut Vec<String>, emoji: &str) {
    recent.retain(|e| e != emoji);
    recent.insert(0, emoji.to_string());
    recent.truncate(MAX_RECENT);
}

pub fn load_recent(store: &dyn KeyValueStore) -> Vec<String> {
    let raw = match store.get(RECENT_EMOJIS_KEY) {
        Ok(Some(raw)) => raw,
        Ok(None) => return Vec::new(),
        Err(err) => {
            warn!(%err, "reading recent emojis failed");
            return Vec::new();
        }
    };
    let mut recent: Vec<String> = serde_json::from_str(&raw).unwrap_or_else(|err| {
        warn!(%err, "malformed recent emoji list");
        Vec::new()
    });
    recent.truncate(MAX_RECENT);
    recent
}

fn save_recent(store: &mut dyn KeyValueStore, recent: &[String]) {
    let result = serde_json::to_string(recent)
        .map_err(StorageError::from)
        .and_then(|encoded| store.set(RECENT_EMOJIS_KEY, &encoded));
    if let Err(err) = result {
        warn!(%err, "could not store recent emojis");
    }
}

pub struct EmojiWidget;

pub static EMOJI_PICKER: EmojiWidget = EmojiWidget;

fn pick(ctx: &mut AppContext, emoji: &str) {
    push_recent(&mut ctx.state.emoji.recent, emoji);
    let recent = ctx.state.emoji.recent.clone();
    save_recent(ctx.store.as_mut(), &recent);
    ctx.track("emojiPicker", "copied");
    ctx.toast(format!("{emoji} copied!"));
}

impl WidgetDescriptor for EmojiWidget {
    fn id(&self) -> &'static str {
        "emoji-picker"
    }

    fn name(&self) -> &'static str {
        "Emoji Picker"
    }

    fn icon(&self) -> &'static str {
        "☺"
    }

    fn description(&self) -> &'static str {
        "Browse emojis by category"
    }

    fn default_size(&self) -> WidgetSize {
        WidgetSize::new(4, 5)
    }

    fn init(&self, ctx: &mut AppContext) {
        ctx.state.emoji.recent = load_recent(ctx.store.as_ref());
    }

    fn render(&self, ctx: &AppContext, focused: bool) -> Vec<Line<'static>> {
        let state = &ctx.state.emoji;
        let tabs: Vec<Span<'static>> = CATEGORIES
            .iter()
            .enumerate()
            .map(|(idx, cat)| {
                let style = if idx == state.category {
                    Style::default()
                        .fg(ctx.accent_color())
                        .add_modifier(Modifier::BOLD | Modifier::UNDERLINED)
                } else {
                    Style::default().fg(Color::DarkGray)
                };
                Span::styled(format!("{} ", cat.emojis[0]), style)
            })
            .collect();

        let mut lines = vec![Line::from(tabs)];
        if let Some(category) = CATEGORIES.get(state.category) {
            lines.push(heading(category.name.to_uppercase()));
            for (row_idx, row) in category.emojis.chunks(PER_ROW).enumerate() {
                let spans: Vec<Span<'static>> = row
                    .iter()
                    .enumerate()
                    .map(|(col, emoji)| {
                        let selected = focused && row_idx * PER_ROW + col == state.selected;
                        let style = if selected {
                            Style::default().bg(Color::LightCyan)
                        } else {
                            Style::default()
                        };
                        Span::styled(format!("{emoji} "), style)
                    })
                    .collect();
                lines.push(Line::from(spans));
            }
        }
        lines.push(muted("Recently used"));
        if state.recent.is_empty() {
            lines.push(muted("None yet"));
        } else {
            lines.push(Line::from(state.recent.join(" ")));
        }
        lines
    }

    fn handle_key(&self, ctx: &mut AppContext, key: KeyEvent) -> KeyOutcome {
        if !is_plain(&key) {
            return KeyOutcome::Ignored;
        }
        let state = &mut ctx.state.emoji;
        match key.code {
            KeyCode::Char(']') => state.switch_category(true),
            KeyCode::Char('[') => state.switch_category(false),
            KeyCode::Left | KeyCode::Char('h') => state.step(-1),
            KeyCode::Right | KeyCode::Char('l') => state.step(1),
            KeyCode::Up | KeyCode::Char('k') => state.step(-(PER_ROW as isize)),
            KeyCode::Down | KeyCode::Char('j') => state.step(PER_ROW as isize),
            KeyCode::Enter | KeyCode::Char('y') => {
                let Some(emoji) = state.current() else {
                    return KeyOutcome::Ignored;
                };
                pick(ctx, emoji);
            }
            _ => return KeyOutcome::Ignored,
        }
        KeyOutcome::Handled
    }

    fn hints(&self) -> &'static str {
        "[ ] category • arrows move • Enter copy"
    }
}
