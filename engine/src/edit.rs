//! Inline field editing.
//!
//! Each combatant row owns a [`FieldEditSession`]: a two-state machine
//! (`Idle`, `Editing`) over one field at a time. A session only produces a
//! [`FieldUpdate`] on commit; the store applies it to the latest snapshot.
//! [`EditSessions`] holds the sessions of every row and answers whether any
//! edit is open, which navigation consults before changing selection.

use std::collections::BTreeMap;

use crate::input::Key;
use crate::roster::{Combatant, CombatantId, Field, FieldUpdate};

/// The state of one row's editor.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum EditState {
    #[default]
    Idle,
    Editing { field: Field, buffer: String },
}

/// Result of routing a key press into a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyOutcome {
    /// The key has no meaning for the session.
    Ignored,
    /// Enter closed the editor. Carries the update, if the buffer produced one.
    Committed(Option<FieldUpdate>),
    /// Escape closed the editor without an update.
    Cancelled,
}

/// Inline edit state for one combatant row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldEditSession {
    combatant: CombatantId,
    state: EditState,
}

impl FieldEditSession {
    pub fn new(combatant: CombatantId) -> Self {
        FieldEditSession {
            combatant,
            state: EditState::Idle,
        }
    }

    pub fn combatant(&self) -> CombatantId {
        self.combatant
    }

    pub fn state(&self) -> &EditState {
        &self.state
    }

    pub fn is_editing(&self) -> bool {
        matches!(self.state, EditState::Editing { .. })
    }

    /// The field currently being edited.
    pub fn editing_field(&self) -> Option<Field> {
        match &self.state {
            EditState::Editing { field, .. } => Some(*field),
            EditState::Idle => None,
        }
    }

    /// The working buffer, if editing.
    pub fn buffer(&self) -> Option<&str> {
        match &self.state {
            EditState::Editing { buffer, .. } => Some(buffer),
            EditState::Idle => None,
        }
    }

    /// Opens `field` for editing, capturing its value from `current`.
    ///
    /// Activating the field already open keeps its buffer. Activating a
    /// different field commits the open one first (focus leaves it), and
    /// that commit's update is returned for the caller to apply.
    pub fn activate(&mut self, field: Field, current: &Combatant) -> Option<FieldUpdate> {
        let pending = match self.editing_field() {
            Some(open) if open == field => return None,
            Some(_) => self.commit(),
            None => None,
        };
        self.state = EditState::Editing {
            field,
            buffer: current.field_text(field),
        };
        pending
    }

    /// Replaces the working buffer. Returns false if no field is open.
    pub fn input(&mut self, text: &str) -> bool {
        match &mut self.state {
            EditState::Editing { buffer, .. } => {
                buffer.clear();
                buffer.push_str(text);
                true
            }
            EditState::Idle => false,
        }
    }

    /// Closes the editor and converts the buffer into an update.
    ///
    /// A blank buffer is discarded. Name keeps the buffer text as typed;
    /// numeric fields go through [`parse_numeric`], which never fails.
    pub fn commit(&mut self) -> Option<FieldUpdate> {
        let EditState::Editing { field, buffer } = std::mem::take(&mut self.state) else {
            return None;
        };
        if buffer.trim().is_empty() {
            return None;
        }
        match field {
            Field::Name => Some(FieldUpdate::Name(buffer)),
            numeric => FieldUpdate::numeric(numeric, parse_numeric(&buffer)),
        }
    }

    /// Closes the editor without an update. Returns false if already idle.
    pub fn cancel(&mut self) -> bool {
        let was_editing = self.is_editing();
        self.state = EditState::Idle;
        was_editing
    }

    /// Enter commits, Escape cancels, everything else is ignored.
    pub fn on_key(&mut self, key: &Key) -> KeyOutcome {
        if !self.is_editing() {
            return KeyOutcome::Ignored;
        }
        match key {
            Key::Enter => KeyOutcome::Committed(self.commit()),
            Key::Escape => {
                self.cancel();
                KeyOutcome::Cancelled
            }
            _ => KeyOutcome::Ignored,
        }
    }
}

/// Parses an edit buffer as a whole number.
///
/// Leading and trailing whitespace is ignored. Decimal and exponent forms
/// truncate toward zero and saturate at the `i32` range. Anything
/// non-numeric, including NaN and infinities, yields 0.
pub fn parse_numeric(buffer: &str) -> i32 {
    let trimmed = buffer.trim();
    if let Ok(v) = trimmed.parse::<i32>() {
        return v;
    }
    match trimmed.parse::<f64>() {
        Ok(v) if v.is_finite() => v.trunc() as i32,
        _ => 0,
    }
}

/// Edit sessions for every row, keyed by combatant.
#[derive(Debug, Clone, Default)]
pub struct EditSessions {
    rows: BTreeMap<CombatantId, FieldEditSession>,
}

impl EditSessions {
    pub fn new() -> Self {
        EditSessions::default()
    }

    /// The session for `combatant`, created idle on first use.
    pub fn row(&mut self, combatant: CombatantId) -> &mut FieldEditSession {
        self.rows
            .entry(combatant)
            .or_insert_with(|| FieldEditSession::new(combatant))
    }

    /// The session for `combatant`, if one was ever opened.
    pub fn get(&self, combatant: CombatantId) -> Option<&FieldEditSession> {
        self.rows.get(&combatant)
    }

    /// Like [`EditSessions::get`], but mutable. Never creates a session.
    pub fn get_mut(&mut self, combatant: CombatantId) -> Option<&mut FieldEditSession> {
        self.rows.get_mut(&combatant)
    }

    /// Number of rows that ever had a session.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// True if any row has a field open.
    pub fn is_editing(&self) -> bool {
        self.rows.values().any(FieldEditSession::is_editing)
    }

    /// Rows with a field open, in id order.
    pub fn editing_rows(&self) -> Vec<CombatantId> {
        self.rows
            .values()
            .filter(|s| s.is_editing())
            .map(FieldEditSession::combatant)
            .collect()
    }

    /// Cancels every open edit. Returns how many were open.
    pub fn cancel_all(&mut self) -> usize {
        self.rows
            .values_mut()
            .map(FieldEditSession::cancel)
            .filter(|was_open| *was_open)
            .count()
    }
}
