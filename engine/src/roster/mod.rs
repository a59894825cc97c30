//! Roster data model.
//!
//! Contains combatants, encounters and their immutable roster snapshots,
//! the enemy template catalog, identity generation, and seed data.

pub mod combatant;
pub mod encounter;
pub mod factory;
pub mod seed;
pub mod templates;

pub use combatant::{Combatant, CombatantId, Field, FieldUpdate, ALL_FIELDS};
pub use encounter::{Encounter, EncounterId, Roster};
pub use factory::{CombatantFactory, IdSource, MonotonicIds};
pub use seed::{demo_templates, Seed, SeedEncounter, SeedError};
pub use templates::{escape_html, fuzzy_match_fold, EnemyTemplate, TemplateCatalog};
