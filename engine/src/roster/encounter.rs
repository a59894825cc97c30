//! Encounters and immutable roster snapshots.

use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::combatant::{Combatant, CombatantId};

/// Identity of an encounter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EncounterId(pub u64);

impl fmt::Display for EncounterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An immutable snapshot of one encounter's combatants in manual order.
///
/// Cloning is an `Arc` bump. Every mutation builds a new `Roster`; a
/// snapshot handed out earlier never changes.
#[derive(Clone, PartialEq, Eq, Default)]
pub struct Roster {
    combatants: Arc<[Combatant]>,
}

impl Roster {
    /// Creates an empty roster.
    pub fn empty() -> Self {
        Roster::default()
    }

    /// Returns the index of the combatant with `id` in manual order.
    pub fn position(&self, id: CombatantId) -> Option<usize> {
        self.combatants.iter().position(|c| c.id == id)
    }

    /// Returns the combatant with `id`, if present.
    pub fn find(&self, id: CombatantId) -> Option<&Combatant> {
        self.combatants.iter().find(|c| c.id == id)
    }

    /// Returns the active combatant, if any.
    pub fn active(&self) -> Option<&Combatant> {
        self.combatants.iter().find(|c| c.is_active)
    }

    /// Returns true if any combatant in the roster carries `id`.
    pub fn contains(&self, id: CombatantId) -> bool {
        self.position(id).is_some()
    }

    /// Returns the combatant ids in manual order.
    pub fn ids(&self) -> Vec<CombatantId> {
        self.combatants.iter().map(|c| c.id).collect()
    }

    /// Returns a new roster with `combatant` appended.
    pub fn appended(&self, combatant: Combatant) -> Roster {
        let mut next = self.combatants.to_vec();
        next.push(combatant);
        Roster::from(next)
    }

    /// Returns a new roster where every combatant is passed through `f`.
    pub fn mapped<F>(&self, f: F) -> Roster
    where
        F: FnMut(&Combatant) -> Combatant,
    {
        Roster::from(self.combatants.iter().map(f).collect::<Vec<_>>())
    }

    /// Returns a new roster with the element at `from` moved to `to`.
    ///
    /// Returns `None` if either index is out of range.
    pub fn moved(&self, from: usize, to: usize) -> Option<Roster> {
        let len = self.combatants.len();
        if from >= len || to >= len {
            return None;
        }
        let mut next = self.combatants.to_vec();
        let item = next.remove(from);
        next.insert(to, item);
        Some(Roster::from(next))
    }

    /// Returns true if `other` shares this snapshot's allocation.
    pub fn same_snapshot(&self, other: &Roster) -> bool {
        Arc::ptr_eq(&self.combatants, &other.combatants)
    }
}

impl Deref for Roster {
    type Target = [Combatant];

    fn deref(&self) -> &[Combatant] {
        &self.combatants
    }
}

impl From<Vec<Combatant>> for Roster {
    fn from(combatants: Vec<Combatant>) -> Self {
        Roster {
            combatants: combatants.into(),
        }
    }
}

impl FromIterator<Combatant> for Roster {
    fn from_iter<I: IntoIterator<Item = Combatant>>(iter: I) -> Self {
        Roster::from(iter.into_iter().collect::<Vec<_>>())
    }
}

impl fmt::Debug for Roster {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.combatants.iter()).finish()
    }
}

impl Serialize for Roster {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.combatants.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Roster {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Vec::<Combatant>::deserialize(deserializer).map(Roster::from)
    }
}

/// A named container holding one roster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Encounter {
    pub id: EncounterId,
    pub name: String,
    #[serde(default)]
    pub roster: Roster,
}

impl Encounter {
    /// Creates an encounter with an empty roster.
    pub fn new(id: EncounterId, name: impl Into<String>) -> Self {
        Encounter {
            id,
            name: name.into(),
            roster: Roster::empty(),
        }
    }

    /// Returns a copy of this encounter holding `roster`.
    pub fn with_roster(&self, roster: Roster) -> Self {
        Encounter {
            id: self.id,
            name: self.name.clone(),
            roster,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn named(id: u64, name: &str) -> Combatant {
        Combatant {
            name: name.to_string(),
            ..Combatant::blank(CombatantId(id))
        }
    }

    fn names(roster: &Roster) -> Vec<&str> {
        roster.iter().map(|c| c.name.as_str()).collect()
    }

    #[test]
    fn appended_does_not_touch_original() {
        let a = Roster::from(vec![named(1, "Aragorn")]);
        let b = a.appended(named(2, "Legolas"));
        assert_eq!(names(&a), ["Aragorn"]);
        assert_eq!(names(&b), ["Aragorn", "Legolas"]);
        assert!(!a.same_snapshot(&b));
    }

    #[test]
    fn moved_forward_and_back() {
        let r = Roster::from(vec![named(1, "A"), named(2, "B"), named(3, "C")]);
        assert_eq!(names(&r.moved(0, 2).unwrap()), ["B", "C", "A"]);
        assert_eq!(names(&r.moved(2, 0).unwrap()), ["C", "A", "B"]);
        assert_eq!(names(&r.moved(1, 1).unwrap()), ["A", "B", "C"]);
    }

    #[test]
    fn moved_out_of_range_is_none() {
        let r = Roster::from(vec![named(1, "A"), named(2, "B")]);
        assert!(r.moved(2, 0).is_none());
        assert!(r.moved(0, 5).is_none());
        assert!(Roster::empty().moved(0, 0).is_none());
    }

    #[test]
    fn lookup_helpers() {
        let mut active = named(2, "B");
        active.is_active = true;
        let r = Roster::from(vec![named(1, "A"), active]);
        assert_eq!(r.position(CombatantId(2)), Some(1));
        assert_eq!(r.find(CombatantId(1)).map(|c| c.name.as_str()), Some("A"));
        assert_eq!(r.active().map(|c| c.id), Some(CombatantId(2)));
        assert!(!r.contains(CombatantId(9)));
        assert_eq!(r.ids(), vec![CombatantId(1), CombatantId(2)]);
    }

    #[test]
    fn roster_serializes_as_array() {
        let r = Roster::from(vec![named(1, "A")]);
        let json = serde_json::to_string(&r).unwrap();
        assert!(json.starts_with('['));
        let back: Roster = serde_json::from_str(&json).unwrap();
        assert_eq!(back, r);
    }
}
