//! Initial store contents: the built-in demo table or a JSON seed file.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::combatant::{Combatant, CombatantId};
use super::encounter::EncounterId;
use super::templates::{EnemyTemplate, TemplateCatalog};

/// Errors raised while loading a seed file.
#[derive(Debug, Error)]
pub enum SeedError {
    #[error("failed to read seed '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid seed json at {path}: {message}")]
    Parse { path: String, message: String },

    #[error("seed declares no encounters")]
    NoEncounters,
}

/// One encounter as listed in a seed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedEncounter {
    pub id: EncounterId,
    pub name: String,
    #[serde(default)]
    pub roster: Vec<Combatant>,
}

/// Everything a store needs to start.
///
/// Roster entries may repeat identities across encounters; the store
/// re-identifies duplicates on load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Seed {
    pub encounters: Vec<SeedEncounter>,
    #[serde(default)]
    pub templates: TemplateCatalog,
    #[serde(default)]
    pub current: Option<EncounterId>,
}

impl Seed {
    /// Parses a seed from JSON text.
    pub fn from_json(raw: &str) -> Result<Seed, SeedError> {
        let mut deserializer = serde_json::Deserializer::from_str(raw);
        let seed: Seed = serde_path_to_error::deserialize(&mut deserializer).map_err(|error| {
            let path = error.path().to_string();
            SeedError::Parse {
                path,
                message: error.into_inner().to_string(),
            }
        })?;
        if seed.encounters.is_empty() {
            return Err(SeedError::NoEncounters);
        }
        Ok(seed)
    }

    /// Reads and parses a seed file.
    pub fn load(path: &Path) -> Result<Seed, SeedError> {
        let raw = fs::read_to_string(path).map_err(|source| SeedError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Seed::from_json(&raw)
    }

    /// The built-in demo table used by the offline surface.
    pub fn demo() -> Seed {
        let party = vec![
            hero(1, "Aragorn", 16, 45, 38, 12, true, "user1"),
            hero(2, "Legolas", 15, 40, 40, 18, false, "user2"),
            hero(3, "Gimli", 17, 50, 50, 10, false, "user3"),
        ];
        Seed {
            encounters: vec![
                SeedEncounter {
                    id: EncounterId(1),
                    name: "Goblin Ambush".to_string(),
                    roster: party.clone(),
                },
                SeedEncounter {
                    id: EncounterId(2),
                    name: "Dragon's Lair".to_string(),
                    roster: party[..2].to_vec(),
                },
                SeedEncounter {
                    id: EncounterId(3),
                    name: "Bandit Camp".to_string(),
                    roster: party[2..].to_vec(),
                },
            ],
            templates: demo_templates(),
            current: Some(EncounterId(1)),
        }
    }
}

/// Goblin, Orc, and Dragon.
pub fn demo_templates() -> TemplateCatalog {
    TemplateCatalog::new(vec![
        EnemyTemplate::new(hero(101, "Goblin", 13, 7, 7, 14, false, "enemy")),
        EnemyTemplate::new(hero(102, "Orc", 15, 15, 15, 11, false, "enemy")),
        EnemyTemplate::new(hero(103, "Dragon", 19, 200, 200, 20, false, "enemy")),
    ])
}

#[allow(clippy::too_many_arguments)]
fn hero(
    id: u64,
    name: &str,
    armor_class: i32,
    max_hp: i32,
    current_hp: i32,
    initiative: i32,
    is_active: bool,
    owner: &str,
) -> Combatant {
    Combatant {
        id: CombatantId(id),
        name: name.to_string(),
        armor_class,
        max_hp,
        current_hp,
        initiative,
        is_active,
        owner_id: owner.to_string(),
    }
}
