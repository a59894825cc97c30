//! Initiative turn order and active-turn cycling.
//!
//! Pure functions over a roster slice. Turn order is derived on demand and
//! never stored; the roster itself stays in manual order.

use crate::roster::{Combatant, CombatantId};

/// Returns the roster sorted by initiative, highest first.
///
/// The sort is stable: combatants with equal initiative keep their
/// relative manual-order position.
pub fn compute_turn_order(roster: &[Combatant]) -> Vec<&Combatant> {
    let mut order: Vec<&Combatant> = roster.iter().collect();
    order.sort_by(|a, b| b.initiative.cmp(&a.initiative));
    order
}

/// Returns the id of the combatant whose turn comes after the active one.
///
/// With no active combatant the first combatant in turn order is chosen.
/// The last combatant wraps to the first. Returns `None` for an empty
/// roster, in which case callers must leave state unchanged.
pub fn next_active(roster: &[Combatant]) -> Option<CombatantId> {
    let order = compute_turn_order(roster);
    if order.is_empty() {
        return None;
    }
    let next = match order.iter().position(|c| c.is_active) {
        Some(current) => (current + 1) % order.len(),
        None => 0,
    };
    Some(order[next].id)
}

/// Returns the position of the active combatant within turn order.
pub fn active_turn_index(roster: &[Combatant]) -> Option<usize> {
    compute_turn_order(roster).iter().position(|c| c.is_active)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn c(id: u64, name: &str, initiative: i32, active: bool) -> Combatant {
        Combatant {
            name: name.to_string(),
            initiative,
            is_active: active,
            ..Combatant::blank(CombatantId(id))
        }
    }

    fn names<'a>(order: &[&'a Combatant]) -> Vec<&'a str> {
        order.iter().map(|c| c.name.as_str()).collect()
    }

    fn fellowship() -> Vec<Combatant> {
        vec![
            c(1, "Aragorn", 12, true),
            c(2, "Legolas", 18, false),
            c(3, "Gimli", 10, false),
        ]
    }

    #[test]
    fn sorts_descending_by_initiative() {
        let roster = fellowship();
        assert_eq!(
            names(&compute_turn_order(&roster)),
            ["Legolas", "Aragorn", "Gimli"]
        );
    }

    #[test]
    fn ties_keep_manual_order() {
        let roster = vec![
            c(1, "A", 5, false),
            c(2, "B", 9, false),
            c(3, "C", 5, false),
            c(4, "D", 9, false),
            c(5, "E", 5, false),
        ];
        assert_eq!(names(&compute_turn_order(&roster)), ["B", "D", "A", "C", "E"]);
    }

    #[test]
    fn negative_initiative_sorts_last() {
        let roster = vec![c(1, "Slow", -3, false), c(2, "Zero", 0, false)];
        assert_eq!(names(&compute_turn_order(&roster)), ["Zero", "Slow"]);
    }

    #[test]
    fn next_active_follows_turn_order() {
        // Aragorn is index 1 in turn order, so Gimli (index 2) is next.
        assert_eq!(next_active(&fellowship()), Some(CombatantId(3)));
    }

    #[test]
    fn next_active_wraps() {
        let roster = vec![
            c(1, "Aragorn", 12, false),
            c(2, "Legolas", 18, false),
            c(3, "Gimli", 10, true),
        ];
        assert_eq!(next_active(&roster), Some(CombatantId(2)));
    }

    #[test]
    fn next_active_without_active_picks_top_of_order() {
        let roster = vec![c(1, "A", 3, false), c(2, "B", 15, false)];
        assert_eq!(next_active(&roster), Some(CombatantId(2)));
    }

    #[test]
    fn next_active_single_combatant_stays() {
        let roster = vec![c(1, "Solo", 1, true)];
        assert_eq!(next_active(&roster), Some(CombatantId(1)));
    }

    #[test]
    fn next_active_empty_is_none() {
        assert_eq!(next_active(&[]), None);
    }

    #[test]
    fn active_turn_index_reports_position() {
        assert_eq!(active_turn_index(&fellowship()), Some(1));
        assert_eq!(active_turn_index(&[c(1, "A", 1, false)]), None);
    }
}
