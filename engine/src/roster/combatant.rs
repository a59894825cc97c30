//! Combatant identity, stats, and single-field updates.
//!
//! A combatant is never edited through a `&mut` borrow of a live roster.
//! Updates produce a fresh value which the store swaps in by identity.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Process-unique identity of a combatant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CombatantId(pub u64);

impl fmt::Display for CombatantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A tracked participant: player character or enemy.
///
/// `current_hp` is never clamped against `max_hp`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Combatant {
    #[serde(rename = "ID")]
    pub id: CombatantId,
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "ArmorClass")]
    pub armor_class: i32,
    #[serde(rename = "MaxHP")]
    pub max_hp: i32,
    #[serde(rename = "CurrentHP")]
    pub current_hp: i32,
    #[serde(rename = "Initiative")]
    pub initiative: i32,
    #[serde(rename = "IsActive", default)]
    pub is_active: bool,
    #[serde(rename = "OwnerID", default)]
    pub owner_id: String,
}

impl Combatant {
    /// Creates a combatant with zeroed stats and empty text fields.
    pub fn blank(id: CombatantId) -> Self {
        Combatant {
            id,
            name: String::new(),
            armor_class: 0,
            max_hp: 0,
            current_hp: 0,
            initiative: 0,
            is_active: false,
            owner_id: String::new(),
        }
    }

    /// Returns a copy with one field replaced.
    pub fn with_update(&self, update: &FieldUpdate) -> Self {
        let mut next = self.clone();
        match update {
            FieldUpdate::Name(name) => next.name = name.clone(),
            FieldUpdate::ArmorClass(v) => next.armor_class = *v,
            FieldUpdate::MaxHp(v) => next.max_hp = *v,
            FieldUpdate::CurrentHp(v) => next.current_hp = *v,
            FieldUpdate::Initiative(v) => next.initiative = *v,
        }
        next
    }

    /// Returns the current value of `field` rendered as edit-buffer text.
    pub fn field_text(&self, field: Field) -> String {
        match field {
            Field::Name => self.name.clone(),
            Field::ArmorClass => self.armor_class.to_string(),
            Field::MaxHp => self.max_hp.to_string(),
            Field::CurrentHp => self.current_hp.to_string(),
            Field::Initiative => self.initiative.to_string(),
        }
    }
}

/// An inline-editable combatant field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Name,
    ArmorClass,
    MaxHp,
    CurrentHp,
    Initiative,
}

/// All editable fields in display order.
pub const ALL_FIELDS: [Field; 5] = [
    Field::Name,
    Field::ArmorClass,
    Field::CurrentHp,
    Field::MaxHp,
    Field::Initiative,
];

impl Field {
    /// Returns the protocol name of the field.
    pub const fn name(self) -> &'static str {
        match self {
            Field::Name => "name",
            Field::ArmorClass => "ac",
            Field::MaxHp => "maxhp",
            Field::CurrentHp => "hp",
            Field::Initiative => "init",
        }
    }

    /// Parses a field from its protocol name or a common long form.
    pub fn from_name(s: &str) -> Option<Field> {
        match s.to_ascii_lowercase().as_str() {
            "name" => Some(Field::Name),
            "ac" | "armorclass" | "armor_class" => Some(Field::ArmorClass),
            "maxhp" | "max_hp" => Some(Field::MaxHp),
            "hp" | "currenthp" | "current_hp" => Some(Field::CurrentHp),
            "init" | "initiative" => Some(Field::Initiative),
            _ => None,
        }
    }

    /// Whether committed edits are parsed as numbers.
    pub const fn is_numeric(self) -> bool {
        !matches!(self, Field::Name)
    }
}

/// A single-field replacement carrying its already-typed value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldUpdate {
    Name(String),
    ArmorClass(i32),
    MaxHp(i32),
    CurrentHp(i32),
    Initiative(i32),
}

impl FieldUpdate {
    /// Builds a numeric update for `field`. Returns `None` for `Field::Name`.
    pub fn numeric(field: Field, value: i32) -> Option<FieldUpdate> {
        match field {
            Field::Name => None,
            Field::ArmorClass => Some(FieldUpdate::ArmorClass(value)),
            Field::MaxHp => Some(FieldUpdate::MaxHp(value)),
            Field::CurrentHp => Some(FieldUpdate::CurrentHp(value)),
            Field::Initiative => Some(FieldUpdate::Initiative(value)),
        }
    }

    /// The field this update targets.
    pub const fn field(&self) -> Field {
        match self {
            FieldUpdate::Name(_) => Field::Name,
            FieldUpdate::ArmorClass(_) => Field::ArmorClass,
            FieldUpdate::MaxHp(_) => Field::MaxHp,
            FieldUpdate::CurrentHp(_) => Field::CurrentHp,
            FieldUpdate::Initiative(_) => Field::Initiative,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_is_zeroed() {
        let c = Combatant::blank(CombatantId(7));
        assert_eq!(c.id, CombatantId(7));
        assert!(c.name.is_empty());
        assert_eq!((c.armor_class, c.max_hp, c.current_hp, c.initiative), (0, 0, 0, 0));
        assert!(!c.is_active);
        assert!(c.owner_id.is_empty());
    }

    #[test]
    fn with_update_leaves_original_untouched() {
        let c = Combatant::blank(CombatantId(1));
        let renamed = c.with_update(&FieldUpdate::Name("Boromir".to_string()));
        assert_eq!(renamed.name, "Boromir");
        assert!(c.name.is_empty());

        let hurt = renamed.with_update(&FieldUpdate::CurrentHp(-4));
        assert_eq!(hurt.current_hp, -4);
        assert_eq!(hurt.name, "Boromir");
    }

    #[test]
    fn field_names_parse() {
        for field in ALL_FIELDS {
            assert_eq!(Field::from_name(field.name()), Some(field));
        }
        assert_eq!(Field::from_name("Initiative"), Some(Field::Initiative));
        assert_eq!(Field::from_name("speed"), None);
    }

    #[test]
    fn numeric_update_rejects_name() {
        assert_eq!(FieldUpdate::numeric(Field::Name, 3), None);
        assert_eq!(
            FieldUpdate::numeric(Field::MaxHp, 3),
            Some(FieldUpdate::MaxHp(3))
        );
    }

    #[test]
    fn serializes_with_wire_names() {
        let c = Combatant {
            name: "Gimli".to_string(),
            initiative: 10,
            ..Combatant::blank(CombatantId(3))
        };
        let json = serde_json::to_value(&c).unwrap();
        assert_eq!(json["ID"], 3);
        assert_eq!(json["Name"], "Gimli");
        assert_eq!(json["Initiative"], 10);
        assert_eq!(json["IsActive"], false);
    }
}
