//! px ↔ rem converter with a 16px root size.

use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::{Color, Modifier, Style};
use ratatui::text::{Line, Span};

use super::{is_plain, muted, KeyOutcome, WidgetDescriptor};
use crate::app::AppContext;
use crate::model::WidgetSize;

pub const BASE_PX: f64 = 16.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    PxToRem,
    RemToPx,
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct PxState {
    pub direction: Direction,
    pub input: String,
}

impl PxState {
    /// Converted value, or `None` when the input is not a non-negative
    /// number.
    pub fn output(&self) -> Option<String> {
        convert(&self.input, self.direction)
    }
}

pub fn convert(input: &str, direction: Direction) -> Option<String> {
    let value: f64 = input.trim().parse().ok()?;
    if !value.is_finite() || value < 0.0 {
        return None;
    }
    Some(match direction {
        Direction::PxToRem => format!("{:.4}", value / BASE_PX),
        Direction::RemToPx => format!("{:.2}", value * BASE_PX),
    })
}

pub struct PxWidget;

pub static TOOLS_PX: PxWidget = PxWidget;

impl WidgetDescriptor for PxWidget {
    fn id(&self) -> &'static str {
        "tools-px"
    }

    fn name(&self) -> &'static str {
        "PX ↔ REM"
    }

    fn icon(&self) -> &'static str {
        "⇕"
    }

    fn description(&self) -> &'static str {
        "Convert pixels to rem and back"
    }

    fn default_size(&self) -> WidgetSize {
        WidgetSize::new(3, 3)
    }

    fn render(&self, ctx: &AppContext, focused: bool) -> Vec<Line<'static>> {
        let state = &ctx.state.px;
        let (from, to) = match state.direction {
            Direction::PxToRem => ("px", "rem"),
            Direction::RemToPx => ("rem", "px"),
        };
        let caret = if focused { "▌" } else { "" };
        let input = if state.input.is_empty() && !focused {
            Span::styled(
                if state.direction == Direction::PxToRem { "16" } else { "1" },
                Style::default().fg(Color::DarkGray),
            )
        } else {
            Span::styled(format!("{}{caret}", state.input), Style::default().fg(Color::White))
        };
        vec![
            Line::from(vec![Span::raw(format!("{from:>4}: ")), input]),
            Line::from(vec![
                Span::raw(format!("{to:>4}: ")),
                Span::styled(
                    state.output().unwrap_or_default(),
                    Style::default().fg(Color::LightCyan).add_modifier(Modifier::BOLD),
                ),
            ]),
            muted(format!("Base: {BASE_PX}px")),
        ]
    }

    fn handle_key(&self, ctx: &mut AppContext, key: KeyEvent) -> KeyOutcome {
        if !is_plain(&key) {
            return KeyOutcome::Ignored;
        }
        let state = &mut ctx.state.px;
        match key.code {
            KeyCode::Char(c) if c.is_ascii_digit() || c == '.' || c == '-' => {
                state.input.push(c);
            }
            KeyCode::Backspace => {
                state.input.pop();
            }
            KeyCode::Char('r') => {
                let carried = state.output();
                state.direction = match state.direction {
                    Direction::PxToRem => Direction::RemToPx,
                    Direction::RemToPx => Direction::PxToRem,
                };
                state.input = carried.unwrap_or_default();
            }
            KeyCode::Char('c') => state.input.clear(),
            KeyCode::Enter => {
                if state.output().is_some() {
                    ctx.track("toolsPx", "conversions");
                }
            }
            _ => return KeyOutcome::Ignored,
        }
        KeyOutcome::Handled
    }

    fn hints(&self) -> &'static str {
        "type a value • r swap • c clear"
    }
}
