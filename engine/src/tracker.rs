//! Offline tracker state.
//!
//! Holds the store, the runtime configuration, and the advance-turn key
//! listener of the mounted encounter view. Every handler writes its
//! response lines to the given writer; mutations answer with the full
//! roster of the current encounter.

use std::io::{self, Write};
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::config::TrackerConfig;
use crate::edit::{parse_numeric, KeyOutcome};
use crate::input::{Key, KeyListeners, ListenerGuard, ViewId};
use crate::protocol::render;
use crate::roster::{CombatantId, EncounterId, Field, FieldUpdate, Seed, SeedError};
use crate::store::{EncounterStore, SelectOutcome};
use crate::sync::{ReorderSink, ReorderSync, SyncStartError};

pub struct Tracker {
    config: TrackerConfig,
    store: EncounterStore,
    listeners: KeyListeners,
    view: Option<ListenerGuard>,
    next_view: u64,
}

impl Tracker {
    /// Creates a tracker and mounts the view of the current encounter.
    pub fn new(config: TrackerConfig, store: EncounterStore) -> Self {
        let mut tracker = Tracker {
            config,
            store,
            listeners: KeyListeners::new(),
            view: None,
            next_view: 1,
        };
        tracker.mount_view();
        tracker
    }

    /// Loads the configured seed, or the demo table when none is set.
    pub fn from_config(config: TrackerConfig) -> Result<Self, SeedError> {
        let seed = match &config.seed_path {
            Some(path) => Seed::load(path)?,
            None => Seed::demo(),
        };
        Ok(Tracker::new(config, EncounterStore::from_seed(seed)))
    }

    /// Forwards manual reorders to `sink` on `sync_threads` workers.
    pub fn with_reorder_sink(mut self, sink: Arc<dyn ReorderSink>) -> Result<Self, SyncStartError> {
        let sync = ReorderSync::new(sink, self.config.sync_threads)?;
        self.store = self.store.with_sync(sync);
        Ok(self)
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    pub fn store(&self) -> &EncounterStore {
        &self.store
    }

    pub fn listeners(&self) -> &KeyListeners {
        &self.listeners
    }

    /// The mounted view, if its listener is installed.
    pub fn view(&self) -> Option<ViewId> {
        self.view.as_ref().map(ListenerGuard::view)
    }

    /// Tears down the current view and mounts a fresh one.
    fn mount_view(&mut self) {
        // Release the old listener before the new one is installed.
        self.view = None;
        let view = ViewId(self.next_view);
        self.next_view += 1;
        match self.listeners.install(view, self.config.advance_key.clone()) {
            Ok(guard) => self.view = Some(guard),
            Err(e) => warn!(error = %e, "view_mount_failed"),
        }
    }

    fn current(&self) -> EncounterId {
        self.store.current()
    }

    pub fn handle_isready<W: Write>(&self, out: &mut W) -> io::Result<()> {
        writeln!(out, "readyok")?;
        out.flush()
    }

    /// Applies a runtime option. Changing the advance key remounts the view.
    pub fn set_option(&mut self, name: &str, value: Option<&str>) {
        let key_before = self.config.advance_key.clone();
        match self.config.set_option(name, value) {
            Ok(()) => {
                info!(name, value = value.unwrap_or(""), "option_set");
                if self.config.advance_key != key_before {
                    self.mount_view();
                }
            }
            Err(e) => warn!(error = %e, "option_rejected"),
        }
    }

    pub fn handle_encounters<W: Write>(&self, out: &mut W) -> io::Result<()> {
        for e in self.store.encounters() {
            let marker = if e.id == self.current() { " *" } else { "" };
            writeln!(out, "encounter {} {}{}", e.id, e.name, marker)?;
        }
        out.flush()
    }

    /// Switches encounter and remounts the view.
    ///
    /// Open edits are committed first, as leaving the view blurs them.
    pub fn handle_encounter<W: Write>(&mut self, id: EncounterId, out: &mut W) -> io::Result<()> {
        if self.store.state().encounter(id).is_none() {
            warn!(encounter = %id, "unknown_encounter");
            return Ok(());
        }
        for row in self.store.commit_all_edits() {
            writeln!(out, "committed {row}")?;
        }
        self.store.switch_encounter(id);
        self.mount_view();
        self.handle_show(out)
    }

    /// Turn order of the current encounter.
    pub fn handle_show<W: Write>(&self, out: &mut W) -> io::Result<()> {
        for line in render::turn_order_text(&self.store.current_roster()) {
            writeln!(out, "{line}")?;
        }
        writeln!(out, "end")?;
        out.flush()
    }

    /// Manual order of the current encounter.
    pub fn handle_roster<W: Write>(&self, out: &mut W) -> io::Result<()> {
        for line in render::manual_order_text(&self.store.current_roster()) {
            writeln!(out, "{line}")?;
        }
        writeln!(out, "end")?;
        out.flush()
    }

    pub fn handle_add<W: Write>(&mut self, out: &mut W) -> io::Result<()> {
        let encounter = self.current();
        let roster = self.store.add_combatant(encounter);
        if let Some(added) = roster.last() {
            debug!(id = %added.id, "combatant_added");
            writeln!(out, "added {}", added.id)?;
        }
        self.handle_show(out)
    }

    pub fn handle_enemies<W: Write>(&self, out: &mut W) -> io::Result<()> {
        for t in self.store.catalog().iter() {
            writeln!(out, "template {} {}", t.id(), t.name())?;
        }
        writeln!(out, "end")?;
        out.flush()
    }

    pub fn handle_enemy<W: Write>(&mut self, template: CombatantId, out: &mut W) -> io::Result<()> {
        if self.store.catalog().get(template).is_none() {
            warn!(template = %template, "unknown_template");
            return self.handle_show(out);
        }
        let encounter = self.current();
        let roster = self.store.add_enemy_clone(encounter, template);
        if let Some(added) = roster.last() {
            debug!(id = %added.id, template = %template, "enemy_cloned");
            writeln!(out, "added {}", added.id)?;
        }
        self.handle_show(out)
    }

    pub fn handle_select<W: Write>(
        &mut self,
        id: CombatantId,
        force: bool,
        out: &mut W,
    ) -> io::Result<()> {
        let encounter = self.current();
        match self.store.select(encounter, id, force) {
            SelectOutcome::Selected(_) => self.handle_show(out),
            SelectOutcome::BlockedByEdit(rows) => write_blocked(out, &rows),
        }
    }

    pub fn handle_next<W: Write>(&mut self, out: &mut W) -> io::Result<()> {
        let encounter = self.current();
        self.store.advance_turn(encounter);
        self.handle_show(out)
    }

    /// Routes a key press.
    ///
    /// While any row is editing, Enter and Escape go to the open editors and
    /// the advance key does nothing. Otherwise the advance key moves the
    /// turn if the mounted view's listener matches it.
    pub fn handle_key<W: Write>(&mut self, key: &Key, out: &mut W) -> io::Result<()> {
        if self.store.is_editing() {
            if !matches!(key, Key::Enter | Key::Escape) {
                writeln!(out, "ignored {key}")?;
                return out.flush();
            }
            let rows = self.store.edits().editing_rows();
            for id in rows {
                match self.store.edit_key(id, key) {
                    KeyOutcome::Committed(_) => writeln!(out, "committed {id}")?,
                    KeyOutcome::Cancelled => writeln!(out, "cancelled {id}")?,
                    KeyOutcome::Ignored => {}
                }
            }
            return self.handle_show(out);
        }
        let fired = match self.view() {
            Some(view) => self.listeners.dispatch(key).contains(&view),
            None => false,
        };
        if fired {
            return self.handle_next(out);
        }
        writeln!(out, "ignored {key}")?;
        out.flush()
    }

    pub fn handle_edit<W: Write>(&mut self, id: CombatantId, field: Field, out: &mut W) -> io::Result<()> {
        let encounter = self.current();
        if !self.store.begin_edit(encounter, id, field) {
            warn!(id = %id, "unknown_combatant");
            return Ok(());
        }
        let buffer = self
            .store
            .edits()
            .get(id)
            .and_then(|s| s.buffer())
            .unwrap_or("");
        writeln!(out, "editing {id} {} {buffer}", field.name())?;
        out.flush()
    }

    pub fn handle_type<W: Write>(&mut self, id: CombatantId, text: &str, out: &mut W) -> io::Result<()> {
        if !self.store.edit_input(id, text) {
            warn!(id = %id, "not_editing");
            return Ok(());
        }
        writeln!(out, "buffer {id} {text}")?;
        out.flush()
    }

    pub fn handle_commit<W: Write>(&mut self, id: CombatantId, out: &mut W) -> io::Result<()> {
        self.store.commit_edit(id);
        self.handle_show(out)
    }

    pub fn handle_cancel<W: Write>(&mut self, id: CombatantId, out: &mut W) -> io::Result<()> {
        if self.store.cancel_edit(id) {
            writeln!(out, "cancelled {id}")?;
        }
        out.flush()
    }

    /// Replaces one field directly. Numeric text that does not parse is 0.
    pub fn handle_set<W: Write>(
        &mut self,
        id: CombatantId,
        field: Field,
        value: &str,
        out: &mut W,
    ) -> io::Result<()> {
        let update = FieldUpdate::numeric(field, parse_numeric(value))
            .unwrap_or_else(|| FieldUpdate::Name(value.to_string()));
        let encounter = self.current();
        self.store.update_field(encounter, id, update);
        self.handle_show(out)
    }

    pub fn handle_move<W: Write>(&mut self, from: usize, to: usize, out: &mut W) -> io::Result<()> {
        let encounter = self.current();
        self.store.reorder(encounter, from, to);
        self.handle_roster(out)
    }

    pub fn handle_sort<W: Write>(&mut self, out: &mut W) -> io::Result<()> {
        let encounter = self.current();
        self.store.sort_by_initiative(encounter);
        self.handle_roster(out)
    }

    pub fn handle_search<W: Write>(&self, query: &str, out: &mut W) -> io::Result<()> {
        for t in self.store.search_templates(query, self.config.search_limit) {
            writeln!(out, "template {} {}", t.id(), t.name())?;
        }
        writeln!(out, "end")?;
        out.flush()
    }

    /// The current encounter as one line of JSON.
    pub fn handle_json<W: Write>(&self, out: &mut W) -> io::Result<()> {
        if let Some(encounter) = self.store.state().encounter(self.current()) {
            let json = serde_json::to_string(encounter).map_err(io::Error::other)?;
            writeln!(out, "{json}")?;
        }
        out.flush()
    }

    /// Unmounts the view and waits for in-flight reorder syncs, up to
    /// `sync_timeout_ms`. Returns false if some were still pending.
    pub fn shutdown(&mut self) -> bool {
        self.view = None;
        let Some(sync) = self.store.sync() else {
            return true;
        };
        let settled = sync.wait_settled(self.config.sync_timeout());
        if !settled {
            warn!(pending = sync.pending(), "reorder_sync_unsettled_at_shutdown");
        }
        settled
    }
}

fn write_blocked<W: Write>(out: &mut W, rows: &[CombatantId]) -> io::Result<()> {
    let ids: Vec<String> = rows.iter().map(CombatantId::to_string).collect();
    writeln!(out, "blocked editing {}", ids.join(" "))?;
    out.flush()
}

impl std::fmt::Debug for Tracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tracker")
            .field("config", &self.config)
            .field("current", &self.store.current())
            .field("view", &self.view())
            .finish_non_exhaustive()
    }
}
