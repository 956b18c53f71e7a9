//! Random password generator.

use crossterm::event::{KeyCode, KeyEvent};
use rand::seq::SliceRandom;
use rand::Rng;
use ratatui::prelude::{Color, Modifier, Style};
use ratatui::text::{Line, Span};

use super::{is_plain, muted, KeyOutcome, WidgetDescriptor};
use crate::app::AppContext;
use crate::model::WidgetSize;

pub const MIN_LENGTH: usize = 8;
pub const MAX_LENGTH: usize = 32;
pub const DEFAULT_LENGTH: usize = 16;

const LOWER: &[u8] = b"abcdefghijklmnopqrstuvwxyz";
const UPPER: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const DIGITS: &[u8] = b"0123456789";
const SYMBOLS: &[u8] = b"!@#$%^&*()_+";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PassOptions {
    pub length: usize,
    pub upper: bool,
    pub digits: bool,
    pub symbols: bool,
}

impl Default for PassOptions {
    fn default() -> Self {
        PassOptions {
            length: DEFAULT_LENGTH,
            upper: true,
            digits: true,
            symbols: true,
        }
    }
}

impl PassOptions {
    fn alphabet(&self) -> Vec<u8> {
        let mut chars = LOWER.to_vec();
        if self.upper {
            chars.extend_from_slice(UPPER);
        }
        if self.digits {
            chars.extend_from_slice(DIGITS);
        }
        if self.symbols {
            chars.extend_from_slice(SYMBOLS);
        }
        chars
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PassState {
    pub options: PassOptions,
    pub current: String,
}

/// Lower-case letters are always in the alphabet; the other classes follow
/// the toggles.
pub fn generate<R: Rng + ?Sized>(options: &PassOptions, rng: &mut R) -> String {
    let alphabet = options.alphabet();
    let length = options.length.clamp(MIN_LENGTH, MAX_LENGTH);
    (0..length)
        .filter_map(|_| alphabet.choose(rng).map(|&b| char::from(b)))
        .collect()
}

pub struct PasswordWidget;

pub static TOOLS_PASS: PasswordWidget = PasswordWidget;

fn regenerate(ctx: &mut AppContext) {
    let state = &mut ctx.state.password;
    state.current = generate(&state.options, &mut rand::thread_rng());
}

impl WidgetDescriptor for PasswordWidget {
    fn id(&self) -> &'static str {
        "tools-pass"
    }

    fn name(&self) -> &'static str {
        "Password generator"
    }

    fn icon(&self) -> &'static str {
        "⚿"
    }

    fn description(&self) -> &'static str {
        "Random passwords with selectable character sets"
    }

    fn default_size(&self) -> WidgetSize {
        WidgetSize::new(3, 4)
    }

    fn init(&self, ctx: &mut AppContext) {
        regenerate(ctx);
    }

    fn render(&self, ctx: &AppContext, _focused: bool) -> Vec<Line<'static>> {
        let state = &ctx.state.password;
        let check = |on: bool| if on { "[x]" } else { "[ ]" };
        vec![
            Line::from(Span::styled(
                state.current.clone(),
                Style::default()
                    .fg(ctx.accent_color())
                    .add_modifier(Modifier::BOLD),
            )),
            Line::from(format!("Length: {}", state.options.length)),
            Line::from(vec![
                Span::raw(format!("{} A-Z  ", check(state.options.upper))),
                Span::raw(format!("{} 0-9  ", check(state.options.digits))),
                Span::raw(format!("{} #@!", check(state.options.symbols))),
            ]),
            muted("u/n/s toggle • +/- length"),
        ]
    }

    fn handle_key(&self, ctx: &mut AppContext, key: KeyEvent) -> KeyOutcome {
        if !is_plain(&key) {
            return KeyOutcome::Ignored;
        }
        let options = &mut ctx.state.password.options;
        match key.code {
            KeyCode::Char('+') | KeyCode::Right => {
                options.length = (options.length + 1).min(MAX_LENGTH);
            }
            KeyCode::Char('-') | KeyCode::Left => {
                options.length = options.length.saturating_sub(1).max(MIN_LENGTH);
            }
            KeyCode::Char('u') => options.upper = !options.upper,
            KeyCode::Char('n') => options.digits = !options.digits,
            KeyCode::Char('s') => options.symbols = !options.symbols,
            KeyCode::Char('g') | KeyCode::Enter => {
                regenerate(ctx);
                ctx.track("toolsPass", "generated");
            }
            KeyCode::Char('y') => {
                if ctx.state.password.current.is_empty() {
                    return KeyOutcome::Handled;
                }
                ctx.toast("Password copied");
            }
            _ => return KeyOutcome::Ignored,
        }
        KeyOutcome::Handled
    }

    fn hints(&self) -> &'static str {
        "g generate • y copy • u/n/s sets • +/- length"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::tests::context;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn length_is_clamped() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut options = PassOptions::default();
        assert_eq!(generate(&options, &mut rng).chars().count(), 16);
        options.length = 3;
        assert_eq!(generate(&options, &mut rng).chars().count(), MIN_LENGTH);
        options.length = 99;
        assert_eq!(generate(&options, &mut rng).chars().count(), MAX_LENGTH);
    }

    #[test]
    fn disabled_sets_never_appear() {
        let mut rng = StdRng::seed_from_u64(42);
        let options = PassOptions {
            length: MAX_LENGTH,
            upper: false,
            digits: false,
            symbols: false,
        };
        for _ in 0..20 {
            let pass = generate(&options, &mut rng);
            assert!(pass.chars().all(|c| c.is_ascii_lowercase()));
        }
    }

    #[test]
    fn placing_generates_and_keys_adjust() {
        let mut ctx = context();
        ctx.add_widget("tools-pass").unwrap();
        assert_eq!(ctx.state.password.current.len(), DEFAULT_LENGTH);

        for _ in 0..20 {
            TOOLS_PASS.handle_key(&mut ctx, KeyEvent::from(KeyCode::Char('+')));
        }
        TOOLS_PASS.handle_key(&mut ctx, KeyEvent::from(KeyCode::Char('g')));
        assert_eq!(ctx.state.password.current.len(), MAX_LENGTH);
        assert_eq!(ctx.ledger().load().widget_count("toolsPass", "generated"), 1);
    }
}
