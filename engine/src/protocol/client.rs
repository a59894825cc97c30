//! Client half of the synchronized surface.
//!
//! [`RemoteRoster`] mirrors one encounter held by a server. Row edits are
//! local drafts until saved; a save that fails keeps the row in edit mode
//! with its draft and the error message. Manual reorders apply locally at
//! once and are forwarded through a [`ReorderSync`].

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use thiserror::Error;
use tracing::{debug, warn};

use super::http::{HttpRequest, HttpResponse};
use super::request::{self, Reorder, SaveCharacter, SelectCharacter, SelectEncounter};
use super::server::Server;
use crate::config::TrackerConfig;
use crate::edit::parse_numeric;
use crate::roster::{Combatant, CombatantId, EncounterId, Field, FieldUpdate, Roster};
use crate::store::SelectOutcome;
use crate::sync::{ReorderMove, ReorderSink, ReorderSync, SyncError, SyncStartError};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    #[error("connection failed: {0}")]
    Connection(String),

    #[error("failed to encode request: {0}")]
    Encode(String),
}

/// Carries requests to a server.
pub trait Transport: Send + Sync {
    fn send(&self, req: &HttpRequest) -> Result<HttpResponse, TransportError>;
}

/// In-process transport that hands requests straight to a [`Server`].
#[derive(Debug, Clone)]
pub struct LoopbackTransport {
    server: Arc<Mutex<Server>>,
}

impl LoopbackTransport {
    pub fn new(server: Arc<Mutex<Server>>) -> Self {
        LoopbackTransport { server }
    }
}

impl Transport for LoopbackTransport {
    fn send(&self, req: &HttpRequest) -> Result<HttpResponse, TransportError> {
        Ok(self.server.lock().handle(req))
    }
}

/// Forwards reorder moves as `POST /reorder`.
pub struct HttpReorderSink {
    transport: Arc<dyn Transport>,
}

impl HttpReorderSink {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        HttpReorderSink { transport }
    }
}

impl ReorderSink for HttpReorderSink {
    fn persist(&self, mv: &ReorderMove) -> Result<(), SyncError> {
        let body = Reorder {
            old_index: mv.from,
            new_index: mv.to,
            encounter_id: Some(mv.encounter),
        };
        let req = HttpRequest::post_json("/reorder", &body)
            .map_err(|e| SyncError::Transport(e.to_string()))?;
        let resp = self
            .transport
            .send(&req)
            .map_err(|e| SyncError::Transport(e.to_string()))?;
        if resp.is_success() {
            Ok(())
        } else {
            Err(SyncError::Rejected {
                status: resp.status,
                body: resp.body,
            })
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SaveError {
    #[error("Name is required")]
    EmptyName,

    #[error("no edit open for character {0}")]
    NotEditing(CombatantId),

    #[error("save rejected with status {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error(transparent)]
    Transport(#[from] TransportError),
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ClientError {
    #[error("request rejected with status {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("failed to decode response: {0}")]
    Decode(String),

    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Per-row form state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowForm {
    Viewing,
    Editing {
        draft: Combatant,
        error: Option<String>,
    },
}

pub struct RemoteRoster {
    transport: Arc<dyn Transport>,
    encounter: EncounterId,
    roster: Roster,
    fragment: String,
    forms: BTreeMap<CombatantId, RowForm>,
    sync: ReorderSync,
    sync_timeout: Duration,
}

impl RemoteRoster {
    /// Creates a client for `encounter` whose reorders are forwarded on
    /// `sync_threads` workers.
    pub fn new(
        transport: Arc<dyn Transport>,
        encounter: EncounterId,
        sync_threads: usize,
    ) -> Result<Self, SyncStartError> {
        let sink = Arc::new(HttpReorderSink::new(Arc::clone(&transport)));
        let sync = ReorderSync::new(sink, sync_threads)?;
        Ok(RemoteRoster {
            transport,
            encounter,
            roster: Roster::empty(),
            fragment: String::new(),
            forms: BTreeMap::new(),
            sync,
            sync_timeout: TrackerConfig::default().sync_timeout(),
        })
    }

    /// Creates a client whose reorder sync is sized by `sync_threads` and
    /// whose shutdown waits at most `sync_timeout_ms`.
    pub fn from_config(
        transport: Arc<dyn Transport>,
        encounter: EncounterId,
        config: &TrackerConfig,
    ) -> Result<Self, SyncStartError> {
        let mut client = Self::new(transport, encounter, config.sync_threads)?;
        client.sync_timeout = config.sync_timeout();
        Ok(client)
    }

    /// Waits for in-flight reorders up to the configured timeout. Returns
    /// false if some were still pending.
    pub fn shutdown(&self) -> bool {
        let settled = self.sync.wait_settled(self.sync_timeout);
        if !settled {
            warn!(pending = self.sync.pending(), "reorder_sync_unsettled_at_shutdown");
        }
        settled
    }

    pub fn encounter(&self) -> EncounterId {
        self.encounter
    }

    /// Last roster fetched from the server, with local reorders applied.
    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    /// Last fragment the server returned.
    pub fn fragment(&self) -> &str {
        &self.fragment
    }

    pub fn sync(&self) -> &ReorderSync {
        &self.sync
    }

    pub fn form(&self, id: CombatantId) -> &RowForm {
        self.forms.get(&id).unwrap_or(&RowForm::Viewing)
    }

    /// Error message shown on a row in edit mode.
    pub fn error(&self, id: CombatantId) -> Option<&str> {
        match self.forms.get(&id) {
            Some(RowForm::Editing { error, .. }) => error.as_deref(),
            _ => None,
        }
    }

    pub fn is_editing(&self) -> bool {
        self.forms
            .values()
            .any(|f| matches!(f, RowForm::Editing { .. }))
    }

    fn editing_rows(&self) -> Vec<CombatantId> {
        self.forms
            .iter()
            .filter(|(_, f)| matches!(f, RowForm::Editing { .. }))
            .map(|(id, _)| *id)
            .collect()
    }

    fn send(&self, req: &HttpRequest) -> Result<HttpResponse, ClientError> {
        let resp = self.transport.send(req)?;
        if resp.is_success() {
            Ok(resp)
        } else {
            Err(ClientError::Rejected {
                status: resp.status,
                body: resp.body,
            })
        }
    }

    fn post_json<T: serde::Serialize>(&self, path: &str, body: &T) -> Result<HttpResponse, ClientError> {
        let req = HttpRequest::post_json(path, body)
            .map_err(|e| TransportError::Encode(e.to_string()))?;
        self.send(&req)
    }

    /// Re-reads the roster and its fragment from the server.
    pub fn refresh(&mut self) -> Result<&Roster, ClientError> {
        let json = self.send(&HttpRequest::get("/characters.json"))?;
        let combatants: Vec<Combatant> =
            request::decode(&json.body).map_err(|e| ClientError::Decode(e.to_string()))?;
        self.roster = Roster::from(combatants);
        self.fragment = self.send(&HttpRequest::get("/characters"))?.body;
        Ok(&self.roster)
    }

    /// Switches the server to `encounter` and reloads.
    pub fn select_encounter(&mut self, encounter: EncounterId) -> Result<&Roster, ClientError> {
        self.post_json("/select-encounter", &SelectEncounter { id: encounter })?;
        self.encounter = encounter;
        self.forms.clear();
        self.refresh()
    }

    /// Asks the server to make `id` active.
    ///
    /// Refused while any row is in edit mode unless `discard_edits` is set.
    pub fn select(&mut self, id: CombatantId, discard_edits: bool) -> Result<SelectOutcome, ClientError> {
        if self.is_editing() {
            if !discard_edits {
                return Ok(SelectOutcome::BlockedByEdit(self.editing_rows()));
            }
            self.forms.clear();
        }
        self.post_json("/select-character", &SelectCharacter { id })?;
        self.refresh().map(|r| SelectOutcome::Selected(r.clone()))
    }

    /// Asks the server to advance the turn.
    pub fn advance(&mut self) -> Result<&Roster, ClientError> {
        self.send(&HttpRequest::post("/next", ""))?;
        self.refresh()
    }

    /// Opens `id` in edit mode with its current values as draft.
    pub fn begin_edit(&mut self, id: CombatantId) -> bool {
        let Some(current) = self.roster.find(id) else {
            return false;
        };
        if !matches!(self.form(id), RowForm::Editing { .. }) {
            self.forms.insert(
                id,
                RowForm::Editing {
                    draft: current.clone(),
                    error: None,
                },
            );
        }
        true
    }

    /// Updates one draft field from typed text. Numeric text that does not
    /// parse becomes 0.
    pub fn edit_field(&mut self, id: CombatantId, field: Field, text: &str) -> bool {
        let Some(RowForm::Editing { draft, .. }) = self.forms.get_mut(&id) else {
            return false;
        };
        let update = match FieldUpdate::numeric(field, parse_numeric(text)) {
            Some(update) => update,
            None => FieldUpdate::Name(text.to_string()),
        };
        *draft = draft.with_update(&update);
        true
    }

    /// Leaves edit mode, dropping the draft.
    pub fn cancel_edit(&mut self, id: CombatantId) -> bool {
        matches!(self.forms.remove(&id), Some(RowForm::Editing { .. }))
    }

    /// Saves the draft of `id`.
    ///
    /// A blank name fails before anything is sent. On any failure the row
    /// stays in edit mode with its draft and the error message recorded.
    pub fn save(&mut self, id: CombatantId) -> Result<String, SaveError> {
        let Some(RowForm::Editing { draft, error }) = self.forms.get_mut(&id) else {
            return Err(SaveError::NotEditing(id));
        };
        let body = SaveCharacter::from_combatant(draft);
        if body.validate().is_err() {
            *error = Some(SaveError::EmptyName.to_string());
            return Err(SaveError::EmptyName);
        }
        let outcome = HttpRequest::post_json("/save-character", &body)
            .map_err(|e| TransportError::Encode(e.to_string()))
            .and_then(|req| self.transport.send(&req));
        let failure = match outcome {
            Ok(resp) if resp.is_success() => {
                debug!(id = %id, "character_saved");
                self.forms.remove(&id);
                if let Err(e) = self.refresh() {
                    warn!(error = %e, "refresh_after_save_failed");
                }
                return Ok(resp.body);
            }
            Ok(resp) => SaveError::Rejected {
                status: resp.status,
                body: resp.body,
            },
            Err(e) => SaveError::Transport(e),
        };
        warn!(id = %id, error = %failure, "character_save_failed");
        if let Some(RowForm::Editing { error, .. }) = self.forms.get_mut(&id) {
            *error = Some(failure.to_string());
        }
        Err(failure)
    }

    /// Applies a manual move locally and forwards it without waiting.
    /// The move names this client's encounter, so it lands there even if
    /// the server has switched. Returns false for out-of-range indices.
    pub fn reorder(&mut self, from: usize, to: usize) -> bool {
        let Some(moved) = self.roster.moved(from, to) else {
            return false;
        };
        self.roster = moved;
        self.sync.submit(ReorderMove {
            encounter: self.encounter,
            from,
            to,
        });
        true
    }
}

impl std::fmt::Debug for RemoteRoster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteRoster")
            .field("encounter", &self.encounter)
            .field("roster", &self.roster)
            .field("forms", &self.forms)
            .field("sync", &self.sync)
            .finish_non_exhaustive()
    }
}
