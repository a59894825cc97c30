//! Fragments returned after every mutation.
//!
//! HTML fragments are single-line and escape every user-supplied string.
//! The text views back the offline surface.

use std::fmt::Write as _;

use crate::roster::{escape_html, Combatant, EnemyTemplate, Encounter, EncounterId};
use crate::turn_order::compute_turn_order;

/// One `<div class="character">` row.
pub fn row_fragment(c: &Combatant) -> String {
    let class = if c.is_active {
        "character active"
    } else {
        "character"
    };
    format!(
        r#"<div class="{class}" data-id="{id}" data-owner="{owner}"><span class="name">{name}</span><span class="ac">{ac}</span><span class="hp">{hp}/{max}</span><span class="init">{init}</span></div>"#,
        id = c.id,
        owner = escape_html(&c.owner_id),
        name = escape_html(&c.name),
        ac = c.armor_class,
        hp = c.current_hp,
        max = c.max_hp,
        init = c.initiative,
    )
}

/// Every row in manual order.
pub fn roster_fragment(roster: &[Combatant]) -> String {
    let mut out = String::from(r#"<div class="character-list">"#);
    for c in roster {
        out.push_str(&row_fragment(c));
    }
    out.push_str("</div>");
    out
}

/// Encounter list with the current encounter marked `selected`.
pub fn encounter_list_fragment(encounters: &[Encounter], current: EncounterId) -> String {
    let mut out = String::from(r#"<ul class="encounter-list">"#);
    for e in encounters {
        let class = if e.id == current {
            "encounter selected"
        } else {
            "encounter"
        };
        let _ = write!(
            out,
            r#"<li class="{class}" data-id="{}">{}</li>"#,
            e.id,
            escape_html(&e.name)
        );
    }
    out.push_str("</ul>");
    out
}

/// Template search results.
pub fn search_results_fragment(templates: &[&EnemyTemplate]) -> String {
    let mut out = String::from(r#"<div class="search-results">"#);
    for t in templates {
        let _ = write!(
            out,
            r#"<div class="search-result" data-template-id="{}">{}</div>"#,
            t.id(),
            escape_html(t.name())
        );
    }
    out.push_str("</div>");
    out
}

fn text_row(c: &Combatant) -> String {
    format!(
        "{} {} ac {} hp {}/{} init {}",
        c.id, c.name, c.armor_class, c.current_hp, c.max_hp, c.initiative
    )
}

/// Turn order, one line per combatant, `>` on the active one.
pub fn turn_order_text(roster: &[Combatant]) -> Vec<String> {
    compute_turn_order(roster)
        .into_iter()
        .map(|c| {
            let marker = if c.is_active { '>' } else { ' ' };
            format!("{marker} {}", text_row(c))
        })
        .collect()
}

/// Manual order, one line per combatant prefixed with its index.
pub fn manual_order_text(roster: &[Combatant]) -> Vec<String> {
    roster
        .iter()
        .enumerate()
        .map(|(i, c)| format!("{i}: {}", text_row(c)))
        .collect()
}
