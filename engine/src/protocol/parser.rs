//! Offline command parser.
//!
//! Parses line commands read from stdin into structured `Command` variants
//! that the tracker main loop dispatches on.

use tracing::warn;

use crate::input::Key;
use crate::roster::{CombatantId, EncounterId, Field};

/// A parsed tracker command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Synchronization ping; the tracker replies `readyok`.
    IsReady,

    /// Set a runtime option: `setoption name <id> [value <x>]`.
    SetOption { name: String, value: Option<String> },

    /// List encounters, marking the current one.
    Encounters,

    /// Switch the current encounter.
    Encounter { id: EncounterId },

    /// Print the current roster in turn order.
    Show,

    /// Print the current roster in manual order with indices.
    Roster,

    /// Append a blank combatant.
    Add,

    /// List the enemy template catalog.
    Enemies,

    /// Append a clone of an enemy template.
    Enemy { template: CombatantId },

    /// Make a combatant active. `force` discards open edits.
    Select { id: CombatantId, force: bool },

    /// Advance the turn.
    Next,

    /// Deliver a key press.
    Key { key: Key },

    /// Open a field for inline editing.
    Edit { id: CombatantId, field: Field },

    /// Replace the edit buffer of a row.
    Type { id: CombatantId, text: String },

    /// Commit a row's open edit.
    Commit { id: CombatantId },

    /// Cancel a row's open edit.
    Cancel { id: CombatantId },

    /// Edit-and-commit in one step.
    Set {
        id: CombatantId,
        field: Field,
        value: String,
    },

    /// Move a combatant in manual order.
    Move { from: usize, to: usize },

    /// Rewrite manual order to turn order.
    Sort,

    /// Search enemy templates by name.
    Search { query: String },

    /// Print the current encounter as JSON.
    Json,

    /// Terminate the tracker.
    Quit,
}

/// Parses a single line of input into a `Command`.
///
/// Returns `None` for empty lines or unrecognized commands. Malformed
/// arguments for known commands also return `None` after logging a warning.
pub fn parse_command(line: &str) -> Option<Command> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return None;
    }

    let tokens: Vec<&str> = trimmed.split_whitespace().collect();

    match tokens[0] {
        "isready" => Some(Command::IsReady),
        "quit" => Some(Command::Quit),
        "encounters" => Some(Command::Encounters),
        "show" => Some(Command::Show),
        "roster" => Some(Command::Roster),
        "add" => Some(Command::Add),
        "enemies" => Some(Command::Enemies),
        "next" => Some(Command::Next),
        "sort" => Some(Command::Sort),
        "json" => Some(Command::Json),

        "setoption" => parse_setoption(&tokens),
        "encounter" => {
            parse_u64(&tokens, 1, "encounter <id>").map(|id| Command::Encounter {
                id: EncounterId(id),
            })
        }
        "enemy" => parse_u64(&tokens, 1, "enemy <template-id>").map(|id| Command::Enemy {
            template: CombatantId(id),
        }),
        "select" => parse_select(&tokens),
        "key" => match tokens.get(1) {
            Some(name) => Some(Command::Key {
                key: Key::from_name(name),
            }),
            None => malformed("key <name>"),
        },
        "edit" => parse_edit(&tokens),
        "type" => parse_type(&tokens, trimmed),
        "commit" => parse_u64(&tokens, 1, "commit <id>").map(|id| Command::Commit {
            id: CombatantId(id),
        }),
        "cancel" => parse_u64(&tokens, 1, "cancel <id>").map(|id| Command::Cancel {
            id: CombatantId(id),
        }),
        "set" => parse_set(&tokens, trimmed),
        "move" => parse_move(&tokens),
        "search" => Some(Command::Search {
            query: rest_after(trimmed, 1).to_string(),
        }),

        other => {
            warn!(command = other, "unknown_command");
            None
        }
    }
}

fn malformed<T>(usage: &str) -> Option<T> {
    warn!(usage, "malformed_command");
    None
}

/// Parses `tokens[index]` as an unsigned integer.
fn parse_u64(tokens: &[&str], index: usize, usage: &str) -> Option<u64> {
    let Some(raw) = tokens.get(index) else {
        return malformed(usage);
    };
    match raw.parse::<u64>() {
        Ok(v) => Some(v),
        Err(_) => {
            warn!(value = *raw, usage, "invalid_number");
            None
        }
    }
}

/// Returns the text of `line` after its first `skip` whitespace-separated
/// tokens, preserving inner spacing.
fn rest_after(line: &str, skip: usize) -> &str {
    let mut rest = line.trim_start();
    for _ in 0..skip {
        rest = match rest.find(char::is_whitespace) {
            Some(i) => rest[i..].trim_start(),
            None => "",
        };
    }
    rest
}

/// Parses `setoption name <id> [value <x>]`.
fn parse_setoption(tokens: &[&str]) -> Option<Command> {
    if tokens.len() < 3 || tokens[1] != "name" {
        return malformed("setoption name <id> [value <x>]");
    }

    let value_idx = tokens.iter().position(|&t| t == "value");

    let (name, value) = match value_idx {
        Some(vi) => {
            let name_parts = &tokens[2..vi];
            let value_parts = &tokens[vi + 1..];
            if name_parts.is_empty() {
                return malformed("setoption name <id> [value <x>]");
            }
            let value = if value_parts.is_empty() {
                None
            } else {
                Some(value_parts.join(" "))
            };
            (name_parts.join(" "), value)
        }
        None => (tokens[2..].join(" "), None),
    };

    Some(Command::SetOption { name, value })
}

/// Parses `select <id> [force]`.
fn parse_select(tokens: &[&str]) -> Option<Command> {
    let id = parse_u64(tokens, 1, "select <id> [force]")?;
    let force = match tokens.get(2) {
        None => false,
        Some(&"force") => true,
        Some(_) => return malformed("select <id> [force]"),
    };
    Some(Command::Select {
        id: CombatantId(id),
        force,
    })
}

fn parse_field(tokens: &[&str], index: usize, usage: &str) -> Option<Field> {
    let Some(raw) = tokens.get(index) else {
        return malformed(usage);
    };
    let field = Field::from_name(raw);
    if field.is_none() {
        warn!(field = *raw, "unknown_field");
    }
    field
}

/// Parses `edit <id> <field>`.
fn parse_edit(tokens: &[&str]) -> Option<Command> {
    const USAGE: &str = "edit <id> <field>";
    let id = parse_u64(tokens, 1, USAGE)?;
    let field = parse_field(tokens, 2, USAGE)?;
    Some(Command::Edit {
        id: CombatantId(id),
        field,
    })
}

/// Parses `type <id> <text...>`. The text may be empty.
fn parse_type(tokens: &[&str], line: &str) -> Option<Command> {
    let id = parse_u64(tokens, 1, "type <id> <text>")?;
    Some(Command::Type {
        id: CombatantId(id),
        text: rest_after(line, 2).to_string(),
    })
}

/// Parses `set <id> <field> <value...>`.
fn parse_set(tokens: &[&str], line: &str) -> Option<Command> {
    const USAGE: &str = "set <id> <field> <value>";
    let id = parse_u64(tokens, 1, USAGE)?;
    let field = parse_field(tokens, 2, USAGE)?;
    if tokens.len() < 4 {
        return malformed(USAGE);
    }
    Some(Command::Set {
        id: CombatantId(id),
        field,
        value: rest_after(line, 3).to_string(),
    })
}

/// Parses `move <from> <to>`.
fn parse_move(tokens: &[&str]) -> Option<Command> {
    const USAGE: &str = "move <from> <to>";
    let from = parse_u64(tokens, 1, USAGE)?;
    let to = parse_u64(tokens, 2, USAGE)?;
    Some(Command::Move {
        from: from as usize,
        to: to as usize,
    })
}
