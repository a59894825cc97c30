//! Read-only enemy template catalog and name search.

use serde::{Deserialize, Serialize};

use super::combatant::{Combatant, CombatantId};

/// An immutable prototype combatant used only as a clone source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EnemyTemplate {
    prototype: Combatant,
}

impl EnemyTemplate {
    /// Wraps a prototype. The prototype is never marked active.
    pub fn new(mut prototype: Combatant) -> Self {
        prototype.is_active = false;
        EnemyTemplate { prototype }
    }

    pub fn id(&self) -> CombatantId {
        self.prototype.id
    }

    pub fn name(&self) -> &str {
        &self.prototype.name
    }

    /// The fields every clone copies.
    pub fn prototype(&self) -> &Combatant {
        &self.prototype
    }
}

/// Catalog of enemy templates, in listing order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TemplateCatalog {
    templates: Vec<EnemyTemplate>,
}

impl TemplateCatalog {
    pub fn new(templates: Vec<EnemyTemplate>) -> Self {
        TemplateCatalog { templates }
    }

    /// Looks up a template by id.
    pub fn get(&self, id: CombatantId) -> Option<&EnemyTemplate> {
        self.templates.iter().find(|t| t.id() == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &EnemyTemplate> {
        self.templates.iter()
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    /// Largest template id, or 0 for an empty catalog.
    pub fn max_id(&self) -> u64 {
        self.templates.iter().map(|t| t.id().0).max().unwrap_or(0)
    }

    /// Returns up to `limit` templates whose name fuzzily matches `query`.
    pub fn search(&self, query: &str, limit: usize) -> Vec<&EnemyTemplate> {
        self.templates
            .iter()
            .filter(|t| fuzzy_match_fold(t.name(), query))
            .take(limit)
            .collect()
    }
}

/// Case-insensitive subsequence match: every char of `needle` appears in
/// `haystack` in order. Both sides are HTML-escaped before comparison, so
/// `&` in a query matches the escaped entity in a name. An empty needle
/// matches everything.
pub fn fuzzy_match_fold(haystack: &str, needle: &str) -> bool {
    let haystack = escape_html(haystack).to_lowercase();
    let needle = escape_html(needle).to_lowercase();
    let mut pending = needle.chars().peekable();
    for c in haystack.chars() {
        match pending.peek() {
            Some(&want) if want == c => {
                pending.next();
            }
            Some(_) => {}
            None => break,
        }
    }
    pending.peek().is_none()
}

/// Escapes the five HTML-significant characters.
pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&#34;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}
