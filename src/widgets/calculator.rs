use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::{Alignment, Color, Modifier, Style};
use ratatui::text::{Line, Span};
use tracing::debug;

use super::{is_plain, muted, KeyOutcome, WidgetDescriptor};
use crate::app::AppContext;
use crate::expr;
use crate::model::WidgetSize;

const ERROR_TEXT: &str = "Error";

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CalcState {
    pub expression: String,
}

impl CalcState {
    pub fn display(&self) -> &str {
        if self.expression.is_empty() {
            "0"
        } else {
            &self.expression
        }
    }

    pub fn input(&mut self, c: char) {
        if self.expression == ERROR_TEXT {
            self.expression.clear();
        }
        self.expression.push(c);
    }

    /// Replaces the expression with its value. Returns whether it evaluated.
    pub fn evaluate(&mut self) -> bool {
        match expr::evaluate(&self.expression) {
            Ok(value) => {
                self.expression = value;
                true
            }
            Err(err) => {
                debug!(%err, expression = %self.expression, "calculation failed");
                self.expression = ERROR_TEXT.to_string();
                false
            }
        }
    }

    pub fn backspace(&mut self) {
        if self.expression == ERROR_TEXT {
            self.expression.clear();
        } else {
            self.expression.pop();
        }
    }

    pub fn clear(&mut self) {
        self.expression.clear();
    }
}

pub struct CalculatorWidget;

pub static CALCULATOR: CalculatorWidget = CalculatorWidget;

impl WidgetDescriptor for CalculatorWidget {
    fn id(&self) -> &'static str {
        "calculator"
    }

    fn name(&self) -> &'static str {
        "Calculator"
    }

    fn icon(&self) -> &'static str {
        "±"
    }

    fn description(&self) -> &'static str {
        "Arithmetic with + - * / ^ and parentheses"
    }

    fn default_size(&self) -> WidgetSize {
        WidgetSize::new(3, 4)
    }

    fn render(&self, ctx: &AppContext, _focused: bool) -> Vec<Line<'static>> {
        let display = ctx.state.calculator.display().to_string();
        let color = if display == ERROR_TEXT {
            Color::LightRed
        } else {
            Color::White
        };
        vec![
            Line::from(Span::styled(
                display,
                Style::default().fg(color).add_modifier(Modifier::BOLD),
            ))
            .alignment(Alignment::Right),
            Line::default(),
            muted("= evaluate • c clear"),
        ]
    }

    fn handle_key(&self, ctx: &mut AppContext, key: KeyEvent) -> KeyOutcome {
        if !is_plain(&key) {
            return KeyOutcome::Ignored;
        }
        let state = &mut ctx.state.calculator;
        match key.code {
            KeyCode::Char(c) if c.is_ascii_digit() || "+-*/^().".contains(c) => state.input(c),
            KeyCode::Enter | KeyCode::Char('=') => {
                if state.evaluate() {
                    ctx.track(self.id(), "calculations");
                }
            }
            KeyCode::Backspace => state.backspace(),
            KeyCode::Char('c') | KeyCode::Delete => state.clear(),
            _ => return KeyOutcome::Ignored,
        }
        KeyOutcome::Handled
    }

    fn hints(&self) -> &'static str {
        "type an expression • Enter = • c clear"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::tests::context;

    fn type_keys(ctx: &mut AppContext, keys: &str) {
        for c in keys.chars() {
            CALCULATOR.handle_key(ctx, KeyEvent::from(KeyCode::Char(c)));
        }
    }

    #[test]
    fn evaluates_typed_expression() {
        let mut ctx = context();
        type_keys(&mut ctx, "(1+2)*3=");
        assert_eq!(ctx.state.calculator.display(), "9");
        assert_eq!(ctx.ledger().load().widget_count("calculator", "calculations"), 1);
        type_keys(&mut ctx, "+1=");
        assert_eq!(ctx.state.calculator.display(), "10");
    }

    #[test]
    fn error_is_replaced_by_next_input() {
        let mut ctx = context();
        type_keys(&mut ctx, "8/0=");
        assert_eq!(ctx.state.calculator.display(), ERROR_TEXT);
        assert_eq!(ctx.ledger().load().widget_count("calculator", "calculations"), 0);
        type_keys(&mut ctx, "4");
        assert_eq!(ctx.state.calculator.display(), "4");
        type_keys(&mut ctx, "c");
        assert_eq!(ctx.state.calculator.display(), "0");
    }

    #[test]
    fn letters_are_not_input() {
        let mut ctx = context();
        let outcome = CALCULATOR.handle_key(&mut ctx, KeyEvent::from(KeyCode::Char('z')));
        assert!(matches!(outcome, KeyOutcome::Ignored));
        assert_eq!(ctx.state.calculator.display(), "0");
    }
}
