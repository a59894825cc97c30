//! JSON request bodies of the synchronized surface.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::roster::{Combatant, CombatantId, EncounterId, FieldUpdate};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RequestError {
    #[error("malformed request line: '{0}'")]
    MalformedLine(String),

    #[error("invalid request body at {path}: {message}")]
    Body { path: String, message: String },

    #[error("Name is required")]
    EmptyName,
}

/// Decodes a JSON body, reporting the failing field path.
pub fn decode<T: DeserializeOwned>(body: &str) -> Result<T, RequestError> {
    let mut deserializer = serde_json::Deserializer::from_str(body);
    serde_path_to_error::deserialize(&mut deserializer).map_err(|error| {
        let path = error.path().to_string();
        RequestError::Body {
            path,
            message: error.into_inner().to_string(),
        }
    })
}

/// `POST /select-character`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectCharacter {
    pub id: CombatantId,
}

/// `POST /select-encounter`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectEncounter {
    pub id: EncounterId,
}

/// `POST /add-enemy`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddEnemy {
    pub template_id: CombatantId,
}

/// `POST /reorder`. Without `encounterId` the move targets the server's
/// current encounter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reorder {
    pub old_index: usize,
    pub new_index: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encounter_id: Option<EncounterId>,
}

/// `POST /save-character`. An id of 0 creates a new combatant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveCharacter {
    pub id: CombatantId,
    pub name: String,
    pub armor_class: i32,
    #[serde(rename = "maxHP")]
    pub max_hp: i32,
    #[serde(rename = "currentHP")]
    pub current_hp: i32,
    pub initiative: i32,
}

impl SaveCharacter {
    /// Captures every editable field of `c`.
    pub fn from_combatant(c: &Combatant) -> Self {
        SaveCharacter {
            id: c.id,
            name: c.name.clone(),
            armor_class: c.armor_class,
            max_hp: c.max_hp,
            current_hp: c.current_hp,
            initiative: c.initiative,
        }
    }

    pub fn is_new(&self) -> bool {
        self.id == CombatantId(0)
    }

    /// Rejects blank names.
    pub fn validate(&self) -> Result<(), RequestError> {
        if self.name.trim().is_empty() {
            return Err(RequestError::EmptyName);
        }
        Ok(())
    }

    /// The stat replacements this save applies, name first.
    pub fn updates(&self) -> [FieldUpdate; 5] {
        [
            FieldUpdate::Name(self.name.clone()),
            FieldUpdate::ArmorClass(self.armor_class),
            FieldUpdate::MaxHp(self.max_hp),
            FieldUpdate::CurrentHp(self.current_hp),
            FieldUpdate::Initiative(self.initiative),
        ]
    }
}
