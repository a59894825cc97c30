//! Combatant construction with fresh identities.
//!
//! Identities come from an injected [`IdSource`]. The default source is a
//! monotonic atomic counter, so two clones requested back to back always
//! receive distinct ids regardless of wall-clock resolution.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use super::combatant::{Combatant, CombatantId};
use super::templates::EnemyTemplate;

/// Hands out combatant identities that are never repeated.
pub trait IdSource: Send + Sync {
    fn next_id(&self) -> CombatantId;
}

/// Monotonic counter starting strictly above a floor.
#[derive(Debug)]
pub struct MonotonicIds {
    next: AtomicU64,
}

impl MonotonicIds {
    /// Creates a source whose first id is `floor + 1`.
    pub fn starting_after(floor: u64) -> Self {
        MonotonicIds {
            next: AtomicU64::new(floor.saturating_add(1)),
        }
    }
}

impl Default for MonotonicIds {
    fn default() -> Self {
        MonotonicIds::starting_after(0)
    }
}

impl IdSource for MonotonicIds {
    fn next_id(&self) -> CombatantId {
        CombatantId(self.next.fetch_add(1, Ordering::Relaxed))
    }
}

/// Builds blank combatants and enemy clones.
#[derive(Clone)]
pub struct CombatantFactory {
    ids: Arc<dyn IdSource>,
}

impl CombatantFactory {
    /// Creates a factory drawing identities from `ids`.
    pub fn new(ids: Arc<dyn IdSource>) -> Self {
        CombatantFactory { ids }
    }

    /// Creates a factory with a monotonic source above `floor`.
    pub fn starting_after(floor: u64) -> Self {
        CombatantFactory::new(Arc::new(MonotonicIds::starting_after(floor)))
    }

    /// Zero stats, empty name and owner, inactive, fresh id.
    pub fn blank(&self) -> Combatant {
        Combatant::blank(self.ids.next_id())
    }

    /// Copies every template field except identity.
    pub fn clone_enemy(&self, template: &EnemyTemplate) -> Combatant {
        self.copy_of(template.prototype())
    }

    /// Copies an arbitrary combatant under a fresh identity.
    pub fn copy_of(&self, source: &Combatant) -> Combatant {
        Combatant {
            id: self.ids.next_id(),
            ..source.clone()
        }
    }
}

impl std::fmt::Debug for CombatantFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CombatantFactory").finish_non_exhaustive()
    }
}
