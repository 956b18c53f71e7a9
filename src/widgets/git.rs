use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::{Color, Style};
use ratatui::text::{Line, Span};

use super::{heading, is_plain, row_style, KeyOutcome, WidgetDescriptor};
use crate::app::AppContext;
use crate::model::WidgetSize;

pub struct GitCommand {
    pub command: &'static str,
    pub summary: &'static str,
}

pub struct Section {
    pub title: &'static str,
    pub commands: &'static [GitCommand],
}

const fn cmd(command: &'static str, summary: &'static str) -> GitCommand {
    GitCommand { command, summary }
}

pub static SECTIONS: &[Section] = &[
    Section {
        title: "Configuration",
        commands: &[
            cmd("git config --global user.name \"Name\"", "Set user name"),
            cmd("git config --global user.email \"email\"", "Set email"),
        ],
    },
    Section {
        title: "Basics",
        commands: &[
            cmd("git init", "Create a repository"),
            cmd("git clone <url>", "Clone a repository"),
            cmd("git status", "Show status"),
            cmd("git add .", "Stage every file"),
            cmd("git commit -m \"message\"", "Commit staged changes"),
            cmd("git push", "Push to the remote"),
            cmd("git pull", "Pull from the remote"),
        ],
    },
    Section {
        title: "Branches",
        commands: &[
            cmd("git branch", "List branches"),
            cmd("git branch <name>", "Create a branch"),
            cmd("git checkout <branch>", "Switch branch"),
            cmd("git merge <branch>", "Merge a branch"),
            cmd("git branch -d <branch>", "Delete a branch"),
        ],
    },
    Section {
        title: "History",
        commands: &[
            cmd("git log", "Show history"),
            cmd("git log --oneline", "Condensed history"),
            cmd("git diff", "Show changes"),
        ],
    },
    Section {
        title: "Undo",
        commands: &[
            cmd("git reset HEAD <file>", "Unstage a file"),
            cmd("git checkout -- <file>", "Discard changes"),
            cmd("git revert <commit>", "Revert a commit"),
        ],
    },
];

fn all_commands() -> impl Iterator<Item = &'static GitCommand> {
    SECTIONS.iter().flat_map(|s| s.commands.iter())
}

pub struct GitWidget;

pub static GIT_CHEATSHEET: GitWidget = GitWidget;

impl WidgetDescriptor for GitWidget {
    fn id(&self) -> &'static str {
        "git-cheatsheet"
    }

    fn name(&self) -> &'static str {
        "Git Cheatsheet"
    }

    fn icon(&self) -> &'static str {
        "⎇"
    }

    fn description(&self) -> &'static str {
        "Everyday git commands"
    }

    fn default_size(&self) -> WidgetSize {
        WidgetSize::new(4, 5)
    }

    fn render(&self, ctx: &AppContext, focused: bool) -> Vec<Line<'static>> {
        let mut lines = Vec::new();
        let mut row = 0;
        for section in SECTIONS {
            lines.push(heading(section.title.to_uppercase()));
            for command in section.commands {
                let (marker, style) = row_style(row == ctx.state.git.selected, focused);
                lines.push(Line::from(vec![
                    Span::raw(marker),
                    Span::styled(command.command, style.fg(ctx.accent_color())),
                    Span::styled(
                        format!("  {}", command.summary),
                        Style::default().fg(Color::DarkGray),
                    ),
                ]));
                row += 1;
            }
        }
        lines
    }

    fn handle_key(&self, ctx: &mut AppContext, key: KeyEvent) -> KeyOutcome {
        let len = all_commands().count();
        if ctx.state.git.handle_move(&key, len) {
            return KeyOutcome::Handled;
        }
        if !is_plain(&key) {
            return KeyOutcome::Ignored;
        }
        match key.code {
            KeyCode::Char('y') | KeyCode::Enter => {
                let Some(command) = all_commands().nth(ctx.state.git.selected) else {
                    return KeyOutcome::Ignored;
                };
                ctx.track("gitCheatsheet", "copied");
                ctx.toast(format!("Copied: {}", command.command));
                KeyOutcome::Handled
            }
            _ => KeyOutcome::Ignored,
        }
    }

    fn hints(&self) -> &'static str {
        "j/k select • y copy"
    }
}
