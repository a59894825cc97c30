//! Encounter store.
//!
//! Owns every encounter's roster and the choice of current encounter. All
//! mutations are [`Mutation`] values run through [`transition`], a pure
//! function from the latest [`StoreState`] to the next one. The store calls
//! it sequentially, so a mutation always reads the state left by the one
//! before it. Roster snapshots handed out earlier are never modified.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::edit::{EditSessions, FieldEditSession, KeyOutcome};
use crate::input::Key;
use crate::roster::{
    Combatant, CombatantFactory, CombatantId, EnemyTemplate, Encounter, EncounterId, Field,
    FieldUpdate, IdSource, Roster, Seed, TemplateCatalog,
};
use crate::sync::{ReorderMove, ReorderSync};
use crate::turn_order::{compute_turn_order, next_active};

/// Every encounter plus the current one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreState {
    encounters: Vec<Encounter>,
    current: EncounterId,
}

impl StoreState {
    /// Builds a state. `current` falls back to the first encounter when it
    /// does not name one; an empty list gets a single empty encounter.
    pub fn new(mut encounters: Vec<Encounter>, current: Option<EncounterId>) -> Self {
        if encounters.is_empty() {
            encounters.push(Encounter::new(EncounterId(1), "Encounter"));
        }
        let current = current
            .filter(|id| encounters.iter().any(|e| e.id == *id))
            .unwrap_or(encounters[0].id);
        StoreState {
            encounters,
            current,
        }
    }

    pub fn encounters(&self) -> &[Encounter] {
        &self.encounters
    }

    pub fn current(&self) -> EncounterId {
        self.current
    }

    pub fn encounter(&self, id: EncounterId) -> Option<&Encounter> {
        self.encounters.iter().find(|e| e.id == id)
    }

    /// The roster of `id`, or an empty roster for an unknown encounter.
    pub fn roster(&self, id: EncounterId) -> Roster {
        self.encounter(id)
            .map(|e| e.roster.clone())
            .unwrap_or_default()
    }

    /// Returns the encounter holding `combatant`.
    pub fn owner_of(&self, combatant: CombatantId) -> Option<EncounterId> {
        self.encounters
            .iter()
            .find(|e| e.roster.contains(combatant))
            .map(|e| e.id)
    }

    fn with_roster<F>(&self, id: EncounterId, f: F) -> StoreState
    where
        F: FnOnce(&Roster) -> Option<Roster>,
    {
        let Some(index) = self.encounters.iter().position(|e| e.id == id) else {
            return self.clone();
        };
        match f(&self.encounters[index].roster) {
            Some(roster) => {
                let mut encounters = self.encounters.clone();
                encounters[index] = encounters[index].with_roster(roster);
                StoreState {
                    encounters,
                    current: self.current,
                }
            }
            None => self.clone(),
        }
    }
}

/// A single store mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    SwitchEncounter(EncounterId),
    Append {
        encounter: EncounterId,
        combatant: Combatant,
    },
    UpdateField {
        encounter: EncounterId,
        combatant: CombatantId,
        update: FieldUpdate,
    },
    SetActive {
        encounter: EncounterId,
        combatant: CombatantId,
    },
    AdvanceTurn {
        encounter: EncounterId,
    },
    Reorder {
        encounter: EncounterId,
        from: usize,
        to: usize,
    },
    SortByInitiative {
        encounter: EncounterId,
    },
}

impl Mutation {
    pub const fn label(&self) -> &'static str {
        match self {
            Mutation::SwitchEncounter(_) => "switch_encounter",
            Mutation::Append { .. } => "append",
            Mutation::UpdateField { .. } => "update_field",
            Mutation::SetActive { .. } => "set_active",
            Mutation::AdvanceTurn { .. } => "advance_turn",
            Mutation::Reorder { .. } => "reorder",
            Mutation::SortByInitiative { .. } => "sort_by_initiative",
        }
    }
}

/// Computes the state that follows `state` under `mutation`.
///
/// Unknown encounter or combatant ids, out-of-range indices, and empty
/// rosters yield a state whose rosters are the very same snapshots.
pub fn transition(state: &StoreState, mutation: &Mutation) -> StoreState {
    match mutation {
        Mutation::SwitchEncounter(id) => {
            if state.encounter(*id).is_none() {
                return state.clone();
            }
            StoreState {
                encounters: state.encounters.clone(),
                current: *id,
            }
        }
        Mutation::Append {
            encounter,
            combatant,
        } => state.with_roster(*encounter, |roster| {
            let mut combatant = combatant.clone();
            combatant.is_active = false;
            Some(roster.appended(combatant))
        }),
        Mutation::UpdateField {
            encounter,
            combatant,
            update,
        } => state.with_roster(*encounter, |roster| {
            roster.find(*combatant)?;
            Some(roster.mapped(|c| {
                if c.id == *combatant {
                    c.with_update(update)
                } else {
                    c.clone()
                }
            }))
        }),
        Mutation::SetActive {
            encounter,
            combatant,
        } => state.with_roster(*encounter, |roster| activate(roster, *combatant)),
        Mutation::AdvanceTurn { encounter } => state.with_roster(*encounter, |roster| {
            let next = next_active(roster)?;
            activate(roster, next)
        }),
        Mutation::Reorder {
            encounter,
            from,
            to,
        } => state.with_roster(*encounter, |roster| roster.moved(*from, *to)),
        Mutation::SortByInitiative { encounter } => state.with_roster(*encounter, |roster| {
            if roster.is_empty() {
                return None;
            }
            Some(compute_turn_order(roster).into_iter().cloned().collect())
        }),
    }
}

/// Marks `target` active and every other combatant inactive.
fn activate(roster: &Roster, target: CombatantId) -> Option<Roster> {
    roster.find(target)?;
    Some(roster.mapped(|c| Combatant {
        is_active: c.id == target,
        ..c.clone()
    }))
}

/// Outcome of a selection request from navigation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectOutcome {
    Selected(Roster),
    /// An inline edit is open on these rows; nothing changed.
    BlockedByEdit(Vec<CombatantId>),
}

/// The roster state engine.
#[derive(Debug)]
pub struct EncounterStore {
    state: StoreState,
    factory: CombatantFactory,
    catalog: TemplateCatalog,
    edits: EditSessions,
    sync: Option<ReorderSync>,
}

impl EncounterStore {
    /// Loads a seed, using a monotonic id source above every seeded id.
    pub fn from_seed(seed: Seed) -> Self {
        let floor = seed
            .encounters
            .iter()
            .flat_map(|e| e.roster.iter())
            .map(|c| c.id.0)
            .chain(std::iter::once(seed.templates.max_id()))
            .max()
            .unwrap_or(0);
        Self::from_seed_with_factory(seed, CombatantFactory::starting_after(floor))
    }

    /// Loads a seed with an injected id source.
    pub fn from_seed_with_ids(seed: Seed, ids: Arc<dyn IdSource>) -> Self {
        Self::from_seed_with_factory(seed, CombatantFactory::new(ids))
    }

    fn from_seed_with_factory(seed: Seed, factory: CombatantFactory) -> Self {
        let mut seen: HashSet<CombatantId> = seed.templates.iter().map(EnemyTemplate::id).collect();
        let mut encounters: Vec<Encounter> = Vec::with_capacity(seed.encounters.len());
        for entry in seed.encounters {
            if encounters.iter().any(|e| e.id == entry.id) {
                warn!(encounter = %entry.id, "duplicate_seed_encounter_skipped");
                continue;
            }
            let mut active_seen = false;
            let roster: Roster = entry
                .roster
                .into_iter()
                .map(|c| {
                    let mut c = if seen.insert(c.id) {
                        c
                    } else {
                        let copy = factory.copy_of(&c);
                        seen.insert(copy.id);
                        copy
                    };
                    if c.is_active && active_seen {
                        c.is_active = false;
                    }
                    active_seen |= c.is_active;
                    c
                })
                .collect();
            encounters.push(Encounter {
                id: entry.id,
                name: entry.name,
                roster,
            });
        }
        let state = StoreState::new(encounters, seed.current);
        info!(
            encounters = state.encounters.len(),
            templates = seed.templates.len(),
            current = %state.current,
            "store_loaded"
        );
        EncounterStore {
            state,
            factory,
            catalog: seed.templates,
            edits: EditSessions::new(),
            sync: None,
        }
    }

    /// Attaches a reorder sync fired by every successful [`reorder`](Self::reorder).
    pub fn with_sync(mut self, sync: ReorderSync) -> Self {
        self.sync = Some(sync);
        self
    }

    pub fn sync(&self) -> Option<&ReorderSync> {
        self.sync.as_ref()
    }

    pub fn state(&self) -> &StoreState {
        &self.state
    }

    pub fn encounters(&self) -> &[Encounter] {
        self.state.encounters()
    }

    pub fn current(&self) -> EncounterId {
        self.state.current()
    }

    pub fn roster(&self, encounter: EncounterId) -> Roster {
        self.state.roster(encounter)
    }

    pub fn current_roster(&self) -> Roster {
        self.state.roster(self.state.current())
    }

    pub fn catalog(&self) -> &TemplateCatalog {
        &self.catalog
    }

    pub fn edits(&self) -> &EditSessions {
        &self.edits
    }

    /// True if any row has an inline edit open.
    pub fn is_editing(&self) -> bool {
        self.edits.is_editing()
    }

    fn apply(&mut self, mutation: Mutation) -> &StoreState {
        debug!(mutation = mutation.label(), "mutation_applied");
        self.state = transition(&self.state, &mutation);
        &self.state
    }

    /// Makes `id` the current encounter. Returns false for unknown ids.
    pub fn switch_encounter(&mut self, id: EncounterId) -> bool {
        self.apply(Mutation::SwitchEncounter(id)).current() == id
    }

    /// Appends a blank combatant to the end of the manual order.
    pub fn add_combatant(&mut self, encounter: EncounterId) -> Roster {
        if self.state.encounter(encounter).is_none() {
            return Roster::empty();
        }
        let combatant = self.factory.blank();
        self.apply(Mutation::Append {
            encounter,
            combatant,
        })
        .roster(encounter)
    }

    /// Appends a clone of `template`. Unknown templates are a no-op.
    pub fn add_enemy_clone(&mut self, encounter: EncounterId, template: CombatantId) -> Roster {
        if self.state.encounter(encounter).is_none() {
            return Roster::empty();
        }
        let Some(template) = self.catalog.get(template) else {
            return self.roster(encounter);
        };
        let combatant = self.factory.clone_enemy(template);
        self.apply(Mutation::Append {
            encounter,
            combatant,
        })
        .roster(encounter)
    }

    /// Replaces one field on `combatant`. Unknown combatants are a no-op.
    pub fn update_field(
        &mut self,
        encounter: EncounterId,
        combatant: CombatantId,
        update: FieldUpdate,
    ) -> Roster {
        self.apply(Mutation::UpdateField {
            encounter,
            combatant,
            update,
        })
        .roster(encounter)
    }

    /// Makes `combatant` the only active combatant of the roster.
    pub fn set_active(&mut self, encounter: EncounterId, combatant: CombatantId) -> Roster {
        self.apply(Mutation::SetActive {
            encounter,
            combatant,
        })
        .roster(encounter)
    }

    /// Hands the turn to the next combatant in initiative order.
    pub fn advance_turn(&mut self, encounter: EncounterId) -> Roster {
        self.apply(Mutation::AdvanceTurn { encounter })
            .roster(encounter)
    }

    /// Moves the combatant at `from` to `to` in manual order.
    ///
    /// Out-of-range indices are a no-op. A move that lands is submitted to
    /// the reorder sync with the original index pair.
    pub fn reorder(&mut self, encounter: EncounterId, from: usize, to: usize) -> Roster {
        let before = self.roster(encounter);
        let after = self
            .apply(Mutation::Reorder {
                encounter,
                from,
                to,
            })
            .roster(encounter);
        if !after.same_snapshot(&before) {
            if let Some(sync) = &self.sync {
                sync.submit(ReorderMove {
                    encounter,
                    from,
                    to,
                });
            }
        }
        after
    }

    /// Rewrites manual order to match turn order.
    pub fn sort_by_initiative(&mut self, encounter: EncounterId) -> Roster {
        self.apply(Mutation::SortByInitiative { encounter })
            .roster(encounter)
    }

    /// Templates whose name fuzzily matches `query`, at most `limit`.
    pub fn search_templates(&self, query: &str, limit: usize) -> Vec<&EnemyTemplate> {
        self.catalog.search(query, limit)
    }

    /// Row selection gated on open edits.
    ///
    /// With `discard_edits` set, open edits are cancelled first.
    pub fn select(
        &mut self,
        encounter: EncounterId,
        combatant: CombatantId,
        discard_edits: bool,
    ) -> SelectOutcome {
        if self.edits.is_editing() {
            if !discard_edits {
                return SelectOutcome::BlockedByEdit(self.edits.editing_rows());
            }
            let dropped = self.edits.cancel_all();
            debug!(dropped, "edits_discarded_for_selection");
        }
        SelectOutcome::Selected(self.set_active(encounter, combatant))
    }

    /// Opens `field` of `combatant` for editing.
    ///
    /// If the row had another field open, that field is committed first.
    /// Returns false if the combatant is not in `encounter`.
    pub fn begin_edit(&mut self, encounter: EncounterId, combatant: CombatantId, field: Field) -> bool {
        let roster = self.roster(encounter);
        let Some(current) = roster.find(combatant) else {
            return false;
        };
        if let Some(pending) = self.edits.row(combatant).activate(field, current) {
            self.update_field(encounter, combatant, pending);
        }
        true
    }

    /// Replaces the working buffer of `combatant`'s open field.
    pub fn edit_input(&mut self, combatant: CombatantId, text: &str) -> bool {
        self.edits
            .get_mut(combatant)
            .is_some_and(|session| session.input(text))
    }

    /// Commits `combatant`'s open field into the latest snapshot of the
    /// encounter that holds it, whichever encounter is current.
    pub fn commit_edit(&mut self, combatant: CombatantId) -> Roster {
        let update = self.edits.get_mut(combatant).and_then(FieldEditSession::commit);
        self.emit_edit(combatant, update)
    }

    /// Commits every open edit. Returns the rows that were open.
    pub fn commit_all_edits(&mut self) -> Vec<CombatantId> {
        let rows = self.edits.editing_rows();
        for &combatant in &rows {
            self.commit_edit(combatant);
        }
        rows
    }

    /// Discards `combatant`'s open field. Returns false if nothing was open.
    pub fn cancel_edit(&mut self, combatant: CombatantId) -> bool {
        self.edits
            .get_mut(combatant)
            .is_some_and(FieldEditSession::cancel)
    }

    /// Routes a key press to `combatant`'s editor.
    pub fn edit_key(&mut self, combatant: CombatantId, key: &Key) -> KeyOutcome {
        let Some(session) = self.edits.get_mut(combatant) else {
            return KeyOutcome::Ignored;
        };
        let outcome = session.on_key(key);
        if let KeyOutcome::Committed(update) = &outcome {
            self.emit_edit(combatant, update.clone());
        }
        outcome
    }

    fn emit_edit(&mut self, combatant: CombatantId, update: Option<FieldUpdate>) -> Roster {
        let Some(encounter) = self.state.owner_of(combatant) else {
            if update.is_some() {
                warn!(id = %combatant, "edit_target_missing");
            }
            return self.current_roster();
        };
        match update {
            Some(update) => self.update_field(encounter, combatant, update),
            None => self.roster(encounter),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::time::Duration;

    use parking_lot::Mutex;

    use super::*;
    use crate::roster::SeedEncounter;
    use crate::sync::{ReorderSink, SyncError};

    const AMBUSH: EncounterId = EncounterId(1);
    const LAIR: EncounterId = EncounterId(2);
    const ARAGORN: CombatantId = CombatantId(1);
    const LEGOLAS: CombatantId = CombatantId(2);
    const GIMLI: CombatantId = CombatantId(3);
    const GOBLIN: CombatantId = CombatantId(101);

    fn demo() -> EncounterStore {
        EncounterStore::from_seed(Seed::demo())
    }

    fn names(roster: &Roster) -> Vec<&str> {
        roster.iter().map(|c| c.name.as_str()).collect()
    }

    fn active_name(roster: &Roster) -> Option<&str> {
        roster.active().map(|c| c.name.as_str())
    }

    #[derive(Default)]
    struct RecordingSink {
        moves: Mutex<Vec<ReorderMove>>,
    }

    impl ReorderSink for RecordingSink {
        fn persist(&self, mv: &ReorderMove) -> Result<(), SyncError> {
            self.moves.lock().push(*mv);
            Ok(())
        }
    }

    struct FailingSink;

    impl ReorderSink for FailingSink {
        fn persist(&self, _mv: &ReorderMove) -> Result<(), SyncError> {
            Err(SyncError::Rejected {
                status: 500,
                body: "db down".to_string(),
            })
        }
    }

    #[test]
    fn demo_seed_ids_are_unique_across_rosters() {
        let store = demo();
        let mut seen = HashSet::new();
        for e in store.encounters() {
            for c in e.roster.iter() {
                assert!(seen.insert(c.id), "duplicate id {}", c.id);
                assert!(store.catalog().get(c.id).is_none());
            }
        }
        assert_eq!(names(&store.roster(LAIR)), ["Aragorn", "Legolas"]);
        assert_eq!(store.current(), AMBUSH);
    }

    #[test]
    fn seed_keeps_only_first_active() {
        let mut a = Combatant::blank(CombatantId(1));
        a.is_active = true;
        let mut b = Combatant::blank(CombatantId(2));
        b.is_active = true;
        let store = EncounterStore::from_seed(Seed {
            encounters: vec![SeedEncounter {
                id: EncounterId(9),
                name: "X".to_string(),
                roster: vec![a, b],
            }],
            templates: TemplateCatalog::default(),
            current: None,
        });
        let roster = store.roster(EncounterId(9));
        assert_eq!(roster.iter().filter(|c| c.is_active).count(), 1);
        assert_eq!(roster.active().map(|c| c.id), Some(CombatantId(1)));
        assert_eq!(store.current(), EncounterId(9));
    }

    #[test]
    fn switch_encounter_leaves_rosters_alone() {
        let mut store = demo();
        let before = store.roster(AMBUSH);
        assert!(store.switch_encounter(LAIR));
        assert_eq!(store.current(), LAIR);
        assert!(store.roster(AMBUSH).same_snapshot(&before));
        assert!(!store.switch_encounter(EncounterId(99)));
        assert_eq!(store.current(), LAIR);
    }

    #[test]
    fn add_combatant_appends_blank_inactive() {
        let mut store = demo();
        let roster = store.add_combatant(AMBUSH);
        assert_eq!(roster.len(), 4);
        let added = &roster[3];
        assert!(added.name.is_empty());
        assert!(!added.is_active);
        assert!(added.id.0 > 103);
        assert_eq!(active_name(&roster), Some("Aragorn"));
    }

    #[test]
    fn add_combatant_unknown_encounter_is_noop() {
        let mut store = demo();
        let before = store.state().clone();
        assert!(store.add_combatant(EncounterId(42)).is_empty());
        assert_eq!(store.state(), &before);
    }

    #[test]
    fn add_enemy_clone_copies_template() {
        let mut store = demo();
        let template_before = store.catalog().get(GOBLIN).cloned();
        let roster = store.add_enemy_clone(AMBUSH, GOBLIN);
        let goblin = &roster[3];
        assert_eq!(goblin.name, "Goblin");
        assert_eq!(goblin.initiative, 14);
        assert_ne!(goblin.id, GOBLIN);
        assert_eq!(store.catalog().get(GOBLIN).cloned(), template_before);

        let again = store.add_enemy_clone(AMBUSH, GOBLIN);
        assert_ne!(again[3].id, again[4].id);
    }

    #[test]
    fn add_enemy_clone_unknown_template_is_noop() {
        let mut store = demo();
        let before = store.roster(AMBUSH);
        let after = store.add_enemy_clone(AMBUSH, CombatantId(555));
        assert!(after.same_snapshot(&before));
    }

    #[test]
    fn cloned_ids_are_absent_from_every_roster() {
        let mut store = demo();
        let existing: HashSet<CombatantId> = store
            .encounters()
            .iter()
            .flat_map(|e| e.roster.ids())
            .collect();
        let roster = store.add_enemy_clone(LAIR, CombatantId(103));
        let clone = roster.last().unwrap();
        assert!(!existing.contains(&clone.id));
    }

    #[test]
    fn update_field_touches_only_target() {
        let mut store = demo();
        let before = store.roster(AMBUSH);
        let after = store.update_field(AMBUSH, LEGOLAS, FieldUpdate::CurrentHp(12));
        assert_eq!(after.ids(), before.ids());
        for (old, new) in before.iter().zip(after.iter()) {
            if new.id == LEGOLAS {
                assert_eq!(new.current_hp, 12);
                assert_eq!(new.name, old.name);
            } else {
                assert_eq!(old, new);
            }
        }
        assert_eq!(before.find(LEGOLAS).unwrap().current_hp, 40);
    }

    #[test]
    fn update_field_unknown_combatant_is_noop() {
        let mut store = demo();
        let before = store.roster(AMBUSH);
        let after = store.update_field(AMBUSH, CombatantId(77), FieldUpdate::Initiative(1));
        assert!(after.same_snapshot(&before));
    }

    #[test]
    fn set_active_is_exclusive() {
        let mut store = demo();
        let roster = store.set_active(AMBUSH, GIMLI);
        assert_eq!(active_name(&roster), Some("Gimli"));
        assert_eq!(roster.iter().filter(|c| c.is_active).count(), 1);
        let unchanged = store.set_active(AMBUSH, CombatantId(404));
        assert!(unchanged.same_snapshot(&roster));
    }

    #[test]
    fn advance_turn_scenario() {
        let mut store = demo();
        let roster = store.advance_turn(AMBUSH);
        assert_eq!(active_name(&roster), Some("Gimli"));
        assert_eq!(names(&roster), ["Aragorn", "Legolas", "Gimli"]);
        let roster = store.advance_turn(AMBUSH);
        assert_eq!(active_name(&roster), Some("Legolas"));
    }

    #[test]
    fn advance_turn_full_cycle_returns_to_holder() {
        let mut store = demo();
        store.add_enemy_clone(AMBUSH, GOBLIN);
        store.add_enemy_clone(AMBUSH, CombatantId(103));
        let start = store.roster(AMBUSH);
        let n = start.len();
        let mut roster = start.clone();
        for _ in 0..n {
            roster = store.advance_turn(AMBUSH);
        }
        assert_eq!(roster.active().map(|c| c.id), start.active().map(|c| c.id));
        assert_eq!(roster.ids(), start.ids());
    }

    #[test]
    fn advance_turn_on_empty_roster_is_noop() {
        let mut store = EncounterStore::from_seed(Seed {
            encounters: vec![SeedEncounter {
                id: EncounterId(5),
                name: "Empty".to_string(),
                roster: Vec::new(),
            }],
            templates: TemplateCatalog::default(),
            current: None,
        });
        let before = store.state().clone();
        assert!(store.advance_turn(EncounterId(5)).is_empty());
        assert_eq!(store.state(), &before);
    }

    #[test]
    fn reorder_moves_and_syncs() {
        let sink = Arc::new(RecordingSink::default());
        let sync = ReorderSync::new(sink.clone(), 1).unwrap();
        let mut store = demo().with_sync(sync);

        let roster = store.reorder(AMBUSH, 0, 2);
        assert_eq!(names(&roster), ["Legolas", "Gimli", "Aragorn"]);
        let order: Vec<&str> = compute_turn_order(&roster).iter().map(|c| c.name.as_str()).collect();
        assert_eq!(order, ["Legolas", "Aragorn", "Gimli"]);

        assert!(store.sync().unwrap().wait_settled(Duration::from_secs(5)));
        assert_eq!(
            *sink.moves.lock(),
            vec![ReorderMove {
                encounter: AMBUSH,
                from: 0,
                to: 2
            }]
        );
    }

    #[test]
    fn reorder_out_of_range_is_noop_and_not_synced() {
        let sink = Arc::new(RecordingSink::default());
        let sync = ReorderSync::new(sink.clone(), 1).unwrap();
        let mut store = demo().with_sync(sync);
        let before = store.roster(AMBUSH);
        assert!(store.reorder(AMBUSH, 0, 3).same_snapshot(&before));
        assert!(store.reorder(AMBUSH, 7, 0).same_snapshot(&before));
        assert!(store.sync().unwrap().wait_settled(Duration::from_secs(1)));
        assert!(sink.moves.lock().is_empty());
    }

    #[test]
    fn reorder_failure_keeps_local_order() {
        let sync = ReorderSync::new(Arc::new(FailingSink), 1).unwrap();
        let mut store = demo().with_sync(sync);
        store.reorder(AMBUSH, 2, 0);
        assert!(store.sync().unwrap().wait_settled(Duration::from_secs(5)));
        assert_eq!(names(&store.roster(AMBUSH)), ["Gimli", "Aragorn", "Legolas"]);
        assert_eq!(store.sync().unwrap().failures().len(), 1);
    }

    #[test]
    fn sort_by_initiative_rewrites_manual_order() {
        let mut store = demo();
        let roster = store.sort_by_initiative(AMBUSH);
        assert_eq!(names(&roster), ["Legolas", "Aragorn", "Gimli"]);
        assert_eq!(active_name(&roster), Some("Aragorn"));
    }

    #[test]
    fn earlier_snapshots_never_change() {
        let mut store = demo();
        let snapshot = store.roster(AMBUSH);
        let copy: Vec<Combatant> = snapshot.to_vec();
        store.advance_turn(AMBUSH);
        store.update_field(AMBUSH, ARAGORN, FieldUpdate::Name("Strider".to_string()));
        store.reorder(AMBUSH, 0, 1);
        store.add_combatant(AMBUSH);
        assert_eq!(snapshot.to_vec(), copy);
    }

    #[test]
    fn edit_commit_reads_latest_snapshot() {
        let mut store = demo();
        assert!(store.begin_edit(AMBUSH, ARAGORN, Field::CurrentHp));
        store.edit_input(ARAGORN, "20");
        // A turn advance lands while the edit is open.
        store.advance_turn(AMBUSH);
        let roster = store.commit_edit(ARAGORN);
        let aragorn = roster.find(ARAGORN).unwrap();
        assert_eq!(aragorn.current_hp, 20);
        assert_eq!(active_name(&roster), Some("Gimli"));
    }

    #[test]
    fn edit_non_numeric_commits_zero() {
        let mut store = demo();
        store.begin_edit(AMBUSH, GIMLI, Field::Initiative);
        store.edit_input(GIMLI, "fast");
        let roster = store.commit_edit(GIMLI);
        assert_eq!(roster.find(GIMLI).unwrap().initiative, 0);
    }

    #[test]
    fn edit_blank_and_cancel_leave_roster() {
        let mut store = demo();
        let before = store.roster(AMBUSH);
        store.begin_edit(AMBUSH, GIMLI, Field::Name);
        store.edit_input(GIMLI, "  ");
        assert!(store.commit_edit(GIMLI).same_snapshot(&before));

        store.begin_edit(AMBUSH, GIMLI, Field::Name);
        store.edit_input(GIMLI, "Gloin");
        assert!(store.cancel_edit(GIMLI));
        assert!(store.roster(AMBUSH).same_snapshot(&before));
    }

    #[test]
    fn begin_edit_on_other_field_commits_pending() {
        let mut store = demo();
        store.begin_edit(AMBUSH, LEGOLAS, Field::ArmorClass);
        store.edit_input(LEGOLAS, "18");
        store.begin_edit(AMBUSH, LEGOLAS, Field::Initiative);
        let roster = store.roster(AMBUSH);
        assert_eq!(roster.find(LEGOLAS).unwrap().armor_class, 18);
        assert_eq!(store.edits().get(LEGOLAS).and_then(|s| s.buffer()), Some("18"));
        assert!(!store.begin_edit(AMBUSH, CombatantId(999), Field::Name));
    }

    #[test]
    fn edit_keys_commit_and_cancel() {
        let mut store = demo();
        store.begin_edit(AMBUSH, ARAGORN, Field::MaxHp);
        store.edit_input(ARAGORN, "50");
        let outcome = store.edit_key(ARAGORN, &Key::Enter);
        assert_eq!(outcome, KeyOutcome::Committed(Some(FieldUpdate::MaxHp(50))));
        assert_eq!(store.roster(AMBUSH).find(ARAGORN).unwrap().max_hp, 50);

        store.begin_edit(AMBUSH, ARAGORN, Field::MaxHp);
        store.edit_input(ARAGORN, "1");
        assert_eq!(store.edit_key(ARAGORN, &Key::Escape), KeyOutcome::Cancelled);
        assert_eq!(store.roster(AMBUSH).find(ARAGORN).unwrap().max_hp, 50);
    }

    #[test]
    fn commit_lands_in_owning_encounter_after_switch() {
        let mut store = demo();
        store.begin_edit(AMBUSH, ARAGORN, Field::Name);
        store.edit_input(ARAGORN, "Strider");
        assert!(store.switch_encounter(LAIR));

        let outcome = store.edit_key(ARAGORN, &Key::Enter);
        assert!(matches!(outcome, KeyOutcome::Committed(Some(_))));
        assert_eq!(store.roster(AMBUSH).find(ARAGORN).unwrap().name, "Strider");
        assert!(store.roster(LAIR).find(ARAGORN).is_none());
        assert_eq!(store.current(), LAIR);
    }

    #[test]
    fn commit_all_edits_closes_every_row() {
        let mut store = demo();
        store.begin_edit(AMBUSH, LEGOLAS, Field::CurrentHp);
        store.edit_input(LEGOLAS, "12");
        store.begin_edit(AMBUSH, GIMLI, Field::Initiative);
        store.edit_input(GIMLI, "19");

        assert_eq!(store.commit_all_edits(), vec![LEGOLAS, GIMLI]);
        assert!(!store.is_editing());
        let roster = store.roster(AMBUSH);
        assert_eq!(roster.find(LEGOLAS).unwrap().current_hp, 12);
        assert_eq!(roster.find(GIMLI).unwrap().initiative, 19);
        assert!(store.commit_all_edits().is_empty());
    }

    #[test]
    fn edits_on_unopened_rows_create_no_sessions() {
        let mut store = demo();
        let stranger = CombatantId(999);
        assert!(!store.edit_input(stranger, "x"));
        assert!(!store.cancel_edit(stranger));
        assert_eq!(store.edit_key(stranger, &Key::Enter), KeyOutcome::Ignored);
        let before = store.roster(AMBUSH);
        assert!(store.commit_edit(stranger).same_snapshot(&before));
        assert!(store.edits().is_empty());
    }

    #[test]
    fn select_is_blocked_while_editing() {
        let mut store = demo();
        store.begin_edit(AMBUSH, LEGOLAS, Field::Name);
        assert_eq!(
            store.select(AMBUSH, GIMLI, false),
            SelectOutcome::BlockedByEdit(vec![LEGOLAS])
        );
        assert_eq!(active_name(&store.roster(AMBUSH)), Some("Aragorn"));

        match store.select(AMBUSH, GIMLI, true) {
            SelectOutcome::Selected(roster) => assert_eq!(active_name(&roster), Some("Gimli")),
            other => panic!("unexpected {other:?}"),
        }
        assert!(!store.is_editing());
    }

    #[test]
    fn transition_is_pure() {
        let state = demo().state().clone();
        let copy = state.clone();
        let next = transition(
            &state,
            &Mutation::Reorder {
                encounter: AMBUSH,
                from: 0,
                to: 1,
            },
        );
        assert_eq!(state, copy);
        assert_ne!(next, state);
    }

    #[test]
    fn owner_of_finds_encounter() {
        let store = demo();
        assert_eq!(store.state().owner_of(GIMLI), Some(AMBUSH));
        assert_eq!(store.state().owner_of(CombatantId(1234)), None);
    }
}
