//! Modal input forms opened by widgets and by the settings screen.

/// What a submitted form applies to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormKind {
    AddBookmark,
    EditBookmark { category: usize, app: usize },
    AddTask,
    EditNotes,
    AddSnippet,
    AddFeed,
    EditFeed(usize),
    Goals,
    Settings,
    Export,
    Import,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldValue {
    value: String,
    cursor: usize,
}

impl FieldValue {
    pub fn new(value: &str) -> Self {
        FieldValue {
            value: value.to_string(),
            cursor: value.len(),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.value
    }

    pub fn move_left(&mut self) {
        if self.cursor > 0 {
            self.cursor = prev_boundary(&self.value, self.cursor);
        }
    }

    pub fn move_right(&mut self) {
        if self.cursor < self.value.len() {
            self.cursor = next_boundary(&self.value, self.cursor);
        }
    }

    pub fn move_up(&mut self) {
        let (starts, line, col) = line_state(&self.value, self.cursor);
        if line > 0 {
            self.cursor = index_at_col(&self.value, starts[line - 1], col);
        }
    }

    pub fn move_down(&mut self) {
        let (starts, line, col) = line_state(&self.value, self.cursor);
        if line + 1 < starts.len() {
            self.cursor = index_at_col(&self.value, starts[line + 1], col);
        }
    }

    pub fn backspace(&mut self) {
        if self.cursor == 0 {
            return;
        }
        let prev = prev_boundary(&self.value, self.cursor);
        self.value.drain(prev..self.cursor);
        self.cursor = prev;
    }

    pub fn insert_char(&mut self, ch: char) {
        self.value.insert(self.cursor, ch);
        self.cursor += ch.len_utf8();
    }

    pub fn with_caret(&self) -> String {
        let mut text = self.value.clone();
        text.insert(self.cursor, '▌');
        text
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub label: &'static str,
    pub value: FieldValue,
    pub multiline: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Form {
    /// Owning widget id; `None` for shell-level forms.
    pub widget: Option<&'static str>,
    pub kind: FormKind,
    pub title: String,
    pub fields: Vec<Field>,
    pub active: usize,
    pub hint: Option<String>,
}

impl Form {
    pub fn new(widget: Option<&'static str>, kind: FormKind, title: impl Into<String>) -> Self {
        Form {
            widget,
            kind,
            title: title.into(),
            fields: Vec::new(),
            active: 0,
            hint: None,
        }
    }

    pub fn field(mut self, label: &'static str, value: &str) -> Self {
        self.fields.push(Field {
            label,
            value: FieldValue::new(value),
            multiline: false,
        });
        self
    }

    pub fn multiline(mut self, label: &'static str, value: &str) -> Self {
        self.fields.push(Field {
            label,
            value: FieldValue::new(value),
            multiline: true,
        });
        self
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    pub fn next_field(&mut self) {
        if !self.fields.is_empty() {
            self.active = (self.active + 1) % self.fields.len();
        }
    }

    pub fn prev_field(&mut self) {
        if !self.fields.is_empty() {
            self.active = (self.active + self.fields.len() - 1) % self.fields.len();
        }
    }

    pub fn active_field_mut(&mut self) -> Option<&mut FieldValue> {
        self.fields.get_mut(self.active).map(|f| &mut f.value)
    }

    pub fn active_is_multiline(&self) -> bool {
        self.fields.get(self.active).is_some_and(|f| f.multiline)
    }

    pub fn values(&self) -> Vec<String> {
        self.fields
            .iter()
            .map(|f| f.value.as_str().to_string())
            .collect()
    }
}

fn prev_boundary(text: &str, cursor: usize) -> usize {
    text[..cursor]
        .char_indices()
        .next_back()
        .map_or(0, |(idx, _)| idx)
}

fn next_boundary(text: &str, cursor: usize) -> usize {
    text[cursor..]
        .chars()
        .next()
        .map_or(text.len(), |ch| cursor + ch.len_utf8())
}

/// Line start offsets, the cursor's line and its column in chars.
fn line_state(text: &str, cursor: usize) -> (Vec<usize>, usize, usize) {
    let mut starts = vec![0];
    starts.extend(
        text.char_indices()
            .filter(|(_, ch)| *ch == '\n')
            .map(|(idx, _)| idx + 1),
    );
    let line = starts.iter().rposition(|start| *start <= cursor).unwrap_or(0);
    let col = text[starts[line]..cursor].chars().count();
    (starts, line, col)
}

fn index_at_col(text: &str, start: usize, target_col: usize) -> usize {
    let rest = &text[start..];
    let limit = rest.find('\n').unwrap_or(rest.len());
    rest[..limit]
        .char_indices()
        .nth(target_col)
        .map_or(start + limit, |(idx, _)| start + idx)
}
