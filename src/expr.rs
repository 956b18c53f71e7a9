//! Arithmetic evaluator for the calculator widget.
//!
//! ```text
//! expr   := term (("+" | "-") term)*
//! term   := unary (("*" | "/") unary)*
//! unary  := "-" unary | "+" unary | power
//! power  := atom ("^" unary)?
//! atom   := number | "(" expr ")"
//! ```
//!
//! Whitespace is ignored. `^` is right associative and binds tighter than a
//! leading sign, so `-2^2` is `-4`.

use std::iter::Peekable;
use std::str::Chars;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CalcError {
    #[error("division by zero")]
    DivisionByZero,
    #[error("unexpected character '{0}'")]
    UnexpectedChar(char),
    #[error("unexpected end of expression")]
    UnexpectedEnd,
    #[error("invalid number '{0}'")]
    InvalidNumber(String),
    #[error("result is not a finite number")]
    NotFinite,
}

pub type CalcResult<T> = Result<T, CalcError>;

/// Evaluates `input` and formats the result for display. Empty input is `0`.
pub fn evaluate(input: &str) -> CalcResult<String> {
    Ok(format_number(eval(input)?))
}

pub fn eval(input: &str) -> CalcResult<f64> {
    let compact: String = input.chars().filter(|c| !c.is_whitespace()).collect();
    if compact.is_empty() {
        return Ok(0.0);
    }
    let mut parser = Parser {
        chars: compact.chars().peekable(),
    };
    let value = parser.expr()?;
    if let Some(c) = parser.chars.next() {
        return Err(CalcError::UnexpectedChar(c));
    }
    if !value.is_finite() {
        return Err(CalcError::NotFinite);
    }
    Ok(value)
}

/// Whole numbers print without a fractional part.
pub fn format_number(value: f64) -> String {
    if value == 0.0 {
        return "0".to_string();
    }
    value.to_string()
}

struct Parser<'a> {
    chars: Peekable<Chars<'a>>,
}

impl Parser<'_> {
    fn expr(&mut self) -> CalcResult<f64> {
        let mut acc = self.term()?;
        while let Some(&op) = self.chars.peek() {
            match op {
                '+' => {
                    self.chars.next();
                    acc += self.term()?;
                }
                '-' => {
                    self.chars.next();
                    acc -= self.term()?;
                }
                _ => break,
            }
        }
        Ok(acc)
    }

    fn term(&mut self) -> CalcResult<f64> {
        let mut acc = self.unary()?;
        while let Some(&op) = self.chars.peek() {
            match op {
                '*' => {
                    self.chars.next();
                    acc *= self.unary()?;
                }
                '/' => {
                    self.chars.next();
                    let divisor = self.unary()?;
                    if divisor == 0.0 {
                        return Err(CalcError::DivisionByZero);
                    }
                    acc /= divisor;
                }
                _ => break,
            }
        }
        Ok(acc)
    }

    fn power(&mut self) -> CalcResult<f64> {
        let base = self.atom()?;
        if self.chars.peek() == Some(&'^') {
            self.chars.next();
            let exponent = self.unary()?;
            return Ok(base.powf(exponent));
        }
        Ok(base)
    }

    fn unary(&mut self) -> CalcResult<f64> {
        match self.chars.peek() {
            Some('-') => {
                self.chars.next();
                Ok(-self.unary()?)
            }
            Some('+') => {
                self.chars.next();
                self.unary()
            }
            _ => self.power(),
        }
    }

    fn atom(&mut self) -> CalcResult<f64> {
        match self.chars.peek().copied() {
            None => Err(CalcError::UnexpectedEnd),
            Some('(') => {
                self.chars.next();
                let inner = self.expr()?;
                match self.chars.next() {
                    Some(')') => Ok(inner),
                    Some(c) => Err(CalcError::UnexpectedChar(c)),
                    None => Err(CalcError::UnexpectedEnd),
                }
            }
            Some(c) if c.is_ascii_digit() || c == '.' => self.number(),
            Some(c) => Err(CalcError::UnexpectedChar(c)),
        }
    }

    fn number(&mut self) -> CalcResult<f64> {
        let mut literal = String::new();
        while let Some(&c) = self.chars.peek() {
            if c.is_ascii_digit() || c == '.' {
                literal.push(c);
                self.chars.next();
            } else {
                break;
            }
        }
        if literal == "." || literal.matches('.').count() > 1 {
            return Err(CalcError::InvalidNumber(literal));
        }
        literal
            .parse::<f64>()
            .map_err(|_| CalcError::InvalidNumber(literal))
    }
}
